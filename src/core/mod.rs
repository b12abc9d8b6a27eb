pub mod device;
pub mod driver;
pub mod event;
pub mod observer;
pub mod state;

pub use device::Device;
pub use driver::SchedCore;
pub use event::{ProcReport, ProcSample, RunReport, TickSnapshot};
pub use state::{CpuState, DeviceId, Fifo, Pcb, ProcId, ProcState, QueueSite, SimCtx, Ticks};
