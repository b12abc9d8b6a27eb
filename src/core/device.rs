use super::state::{DeviceId, Fifo, ProcId, Ticks};

/// A single-server I/O device: fixed deterministic service time, at most one
/// request in service, FIFO wait queue. Never preempts an in-service request.
#[derive(Debug)]
pub struct Device {
    pub id: DeviceId,
    pub service_time: Ticks,
    pub in_service: Option<ProcId>,
    pub countdown: Ticks,
    pub queue: Fifo,
}

impl Device {
    pub fn new(id: DeviceId, service_time: Ticks) -> Self {
        Self {
            id,
            service_time,
            in_service: None,
            countdown: 0,
            queue: Fifo::default(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_service.is_some()
    }
}
