use std::num::NonZeroU64;

use super::trace::TraceSink;
use crate::core::{
    driver::SchedCore,
    event::{ProcReport, RunReport},
    state::{ProcState, Ticks},
};
use crate::workload::Workload;

// Reference constants: quantum 4, hard stop at 10_000 ticks.
pub const DEFAULT_QUANTUM: NonZeroU64 = NonZeroU64::new(4).unwrap();
pub const DEFAULT_TICK_CEILING: Ticks = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    pub quantum: NonZeroU64,
    pub tick_ceiling: Ticks,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            tick_ceiling: DEFAULT_TICK_CEILING,
        }
    }
}

pub struct Sim {
    core: SchedCore,
    config: SimConfig,
}

impl Sim {
    pub fn new(workload: &Workload, config: SimConfig) -> Self {
        Self {
            core: SchedCore::new(workload, config.quantum.get()),
            config,
        }
    }

    pub fn core(&self) -> &SchedCore {
        &self.core
    }

    /// Drive the simulation to completion: tick until every process is
    /// Terminated or the ceiling is hit. Non-convergence is reported in the
    /// `RunReport`, never raised.
    pub fn run(&mut self, sink: &mut dyn TraceSink) -> RunReport {
        while !self.core.all_terminated() && self.core.now() <= self.config.tick_ceiling {
            let snapshot = self.core.tick();
            sink.on_tick(&snapshot);
        }
        let report = self.report();
        sink.on_run_end(&report);
        report
    }

    fn report(&self) -> RunReport {
        let ctx = &self.core.ctx;
        let unfinished: Vec<_> = ctx
            .pcbs
            .iter()
            .filter(|pcb| pcb.state != ProcState::Terminated)
            .map(|pcb| pcb.id)
            .collect();

        RunReport {
            procs: ctx
                .pcbs
                .iter()
                .map(|pcb| ProcReport {
                    proc: pcb.id,
                    device_time: pcb.device_time.clone(),
                    waiting_time: pcb.waiting_time,
                    throughput_time: pcb.throughput_time,
                })
                .collect(),
            cpu_idle_time: ctx.cpu_idle_time,
            ticks: self.core.now(),
            converged: unfinished.is_empty(),
            unfinished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::trace::NullSink;
    use crate::workload::{Cycle, ProcessSpec};

    #[test]
    fn default_config_matches_reference_constants() {
        let config = SimConfig::default();
        assert_eq!(config.quantum.get(), 4);
        assert_eq!(config.tick_ceiling, 10_000);
    }

    #[test]
    fn ceiling_reports_non_convergence_with_unfinished_ids() {
        let workload = Workload::new(
            vec![],
            vec![
                ProcessSpec {
                    arrival: 0,
                    cycles: vec![Cycle {
                        burst: 3,
                        device: None,
                    }],
                },
                ProcessSpec {
                    arrival: 0,
                    cycles: vec![Cycle {
                        burst: 50,
                        device: None,
                    }],
                },
            ],
        )
        .unwrap();
        let config = SimConfig {
            quantum: NonZeroU64::new(4).unwrap(),
            tick_ceiling: 10,
        };
        let mut sim = Sim::new(&workload, config);
        let report = sim.run(&mut NullSink);

        assert!(!report.converged);
        assert_eq!(report.unfinished, [1]);
        // ticks 0..=10 ran before the stop
        assert_eq!(report.ticks, 11);
    }

    #[test]
    fn empty_workload_converges_immediately() {
        let workload = Workload::new(vec![], vec![]).unwrap();
        let mut sim = Sim::new(&workload, SimConfig::default());
        let report = sim.run(&mut NullSink);
        assert!(report.converged);
        assert_eq!(report.ticks, 0);
        assert_eq!(report.cpu_idle_time, 0);
    }
}
