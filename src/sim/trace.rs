use crate::core::event::{RunReport, TickSnapshot};

/// External collaborator receiving the per-tick snapshots and the end-of-run
/// counters. The engine never formats or persists anything itself.
pub trait TraceSink {
    fn on_tick(&mut self, snapshot: &TickSnapshot);
    fn on_run_end(&mut self, report: &RunReport);
}

pub struct NullSink;

impl TraceSink for NullSink {
    fn on_tick(&mut self, _snapshot: &TickSnapshot) {}
    fn on_run_end(&mut self, _report: &RunReport) {}
}

/// Captures the whole trace. Used by tests and determinism checks.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub ticks: Vec<TickSnapshot>,
    pub report: Option<RunReport>,
}

impl TraceSink for RecordingSink {
    fn on_tick(&mut self, snapshot: &TickSnapshot) {
        self.ticks.push(snapshot.clone());
    }

    fn on_run_end(&mut self, report: &RunReport) {
        self.report = Some(report.clone());
    }
}
