pub mod driver;
pub mod trace;

pub use driver::{DEFAULT_QUANTUM, DEFAULT_TICK_CEILING, Sim, SimConfig};
pub use trace::{NullSink, RecordingSink, TraceSink};
