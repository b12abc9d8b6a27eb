pub mod core;
pub mod sim;
pub mod workload;

pub use crate::core::{ProcState, RunReport, TickSnapshot};
pub use crate::sim::{Sim, SimConfig, TraceSink};
pub use crate::workload::{Cycle, ProcessSpec, Workload, WorkloadError};
