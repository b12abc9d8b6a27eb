use super::state::{DeviceId, ProcId, ProcState, Ticks};

/// One process's state at the end of a tick. `device` is set while the
/// process is blocked on (or queued for) a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcSample {
    pub proc: ProcId,
    pub state: ProcState,
    pub device: Option<DeviceId>,
}

/// End-of-tick snapshot covering every process, in ascending process id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSnapshot {
    pub tick: Ticks,
    pub procs: Vec<ProcSample>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcReport {
    pub proc: ProcId,
    pub device_time: Vec<Ticks>,
    pub waiting_time: Ticks,
    pub throughput_time: Ticks,
}

/// End-of-run counters. `converged == false` means the tick ceiling was hit
/// with `unfinished` processes still non-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub procs: Vec<ProcReport>,
    pub cpu_idle_time: Ticks,
    pub ticks: Ticks,
    pub converged: bool,
    pub unfinished: Vec<ProcId>,
}
