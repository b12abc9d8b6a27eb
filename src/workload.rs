use std::sync::Arc;

use thiserror::Error;

use crate::core::state::{DeviceId, Ticks};

/// One "do CPU work, then optionally request I/O" step of a process's life.
/// The last cycle of every process is a pure burst (`device == None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub burst: Ticks,
    pub device: Option<DeviceId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub arrival: Ticks,
    pub cycles: Vec<Cycle>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("device {device}: service time must be at least one tick")]
    ZeroServiceTime { device: DeviceId },
    #[error("process {proc}: cycle list is empty")]
    EmptyCycles { proc: usize },
    #[error("process {proc}: cycle {cycle} references device {device}, but only {devices} devices exist")]
    DeviceOutOfRange {
        proc: usize,
        cycle: usize,
        device: DeviceId,
        devices: usize,
    },
    #[error("process {proc}: last cycle must be a pure cpu burst, found device {device}")]
    TrailingDevice { proc: usize, device: DeviceId },
    #[error("process {proc}: cycle {cycle} has a zero-length cpu burst")]
    ZeroBurst { proc: usize, cycle: usize },
}

/// Immutable description of a run: device service times plus every process's
/// arrival tick and cycle list. Construction validates everything the engine
/// relies on; a `Workload` that exists is runnable.
#[derive(Debug, Clone)]
pub struct Workload {
    device_service: Vec<Ticks>,
    arrivals: Vec<Ticks>,
    cycles: Vec<Arc<[Cycle]>>,
}

impl Workload {
    pub fn new(
        device_service: Vec<Ticks>,
        procs: Vec<ProcessSpec>,
    ) -> Result<Self, WorkloadError> {
        for (device, &service) in device_service.iter().enumerate() {
            if service == 0 {
                return Err(WorkloadError::ZeroServiceTime { device });
            }
        }

        for (proc, spec) in procs.iter().enumerate() {
            let Some(last) = spec.cycles.last() else {
                return Err(WorkloadError::EmptyCycles { proc });
            };
            if let Some(device) = last.device {
                return Err(WorkloadError::TrailingDevice { proc, device });
            }
            for (cycle, c) in spec.cycles.iter().enumerate() {
                if c.burst == 0 {
                    return Err(WorkloadError::ZeroBurst { proc, cycle });
                }
                if let Some(device) = c.device {
                    if device >= device_service.len() {
                        return Err(WorkloadError::DeviceOutOfRange {
                            proc,
                            cycle,
                            device,
                            devices: device_service.len(),
                        });
                    }
                }
            }
        }

        let (arrivals, cycles): (Vec<_>, Vec<_>) = procs
            .into_iter()
            .map(|spec| (spec.arrival, Arc::from(spec.cycles)))
            .unzip();

        Ok(Self {
            device_service,
            arrivals,
            cycles,
        })
    }

    pub fn process_count(&self) -> usize {
        self.arrivals.len()
    }

    pub fn device_count(&self) -> usize {
        self.device_service.len()
    }

    pub fn device_services(&self) -> &[Ticks] {
        &self.device_service
    }

    pub fn arrival(&self, proc: usize) -> Ticks {
        self.arrivals[proc]
    }

    pub fn cycles(&self, proc: usize) -> Arc<[Cycle]> {
        Arc::clone(&self.cycles[proc])
    }
}
