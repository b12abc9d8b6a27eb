use super::{
    event::{ProcSample, TickSnapshot},
    observer::Observer,
    state::{ProcId, ProcState, SimCtx, Ticks},
};
use crate::workload::Workload;

pub struct SchedCore {
    pub ctx: SimCtx,
    observer: Observer,
}

impl SchedCore {
    pub fn new(workload: &Workload, quantum: Ticks) -> Self {
        Self {
            ctx: SimCtx::new(workload, quantum),
            observer: Observer::new(),
        }
    }

    /// One simulated time unit. Fixed intra-tick order: arrivals, device and
    /// CPU advance, device admission, dispatch, deferred ready flush,
    /// idle/wait accounting, snapshot.
    pub fn tick(&mut self) -> TickSnapshot {
        self.admit_arrivals();

        let mut woke = self.advance_devices();
        if let Some(proc) = self.advance_cpu() {
            woke.push(proc);
        }

        self.admit_device_queues();
        self.dispatch();

        // Processes that turned Ready during the advance step miss this
        // tick's dispatch; flush them afterwards, ties in ascending id.
        woke.sort_unstable();
        for proc in woke {
            self.ctx.mark_ready(proc);
            self.ctx.ready_push(proc);
        }

        if self.ctx.cpu_is_idle() {
            self.ctx.cpu_idle_time += 1;
        }
        self.account();
        self.observer.observe(&self.ctx);

        let snapshot = self.snapshot();
        self.ctx.now += 1;
        snapshot
    }

    pub fn now(&self) -> Ticks {
        self.ctx.now
    }

    pub fn all_terminated(&self) -> bool {
        self.ctx.all_terminated()
    }

    fn admit_arrivals(&mut self) {
        let now = self.ctx.now;
        for proc in 0..self.ctx.pcbs.len() {
            let pcb = &self.ctx.pcbs[proc];
            if pcb.state == ProcState::New && pcb.arrival == now {
                self.ctx.mark_ready(proc);
                self.ctx.ready_push(proc);
            }
        }
    }

    fn advance_devices(&mut self) -> Vec<ProcId> {
        let mut completed = Vec::new();
        for dev in 0..self.ctx.devices.len() {
            if let Some(proc) = self.ctx.device_advance(dev) {
                completed.push(proc);
            }
        }
        completed
    }

    // One unit of CPU work for the running process, then resolve its outcome
    // in priority order: terminate, block on a device, preempt on an
    // exhausted slice. Returns the preempted process, if any.
    fn advance_cpu(&mut self) -> Option<ProcId> {
        let proc = self.ctx.cpu.current?;
        {
            let pcb = self.ctx.pcb_mut(proc);
            pcb.remaining_burst -= 1;
            pcb.slice_remaining -= 1;
        }

        let pcb = self.ctx.pcb(proc);
        let burst_done = pcb.remaining_burst == 0;
        let slice_done = pcb.slice_remaining == 0;
        let next_device = pcb.current_cycle().device;

        if burst_done {
            self.ctx.clear_cpu();
            match next_device {
                None => self.ctx.mark_terminated(proc),
                Some(dev) => {
                    self.ctx.enter_next_cycle(proc);
                    // A freed device with waiters must serve FIFO; the
                    // newcomer only jumps straight into service when nothing
                    // else is waiting.
                    if self.ctx.devices[dev].is_busy()
                        || !self.ctx.devices[dev].queue.is_empty()
                    {
                        self.ctx.device_queue_push(dev, proc);
                    } else {
                        self.ctx.device_start(dev, proc);
                    }
                }
            }
            return None;
        }

        if slice_done {
            // Quantum exhausted mid-burst: back to Ready with the burst
            // progress kept. The state flips at the flush.
            self.ctx.clear_cpu();
            return Some(proc);
        }

        None
    }

    fn admit_device_queues(&mut self) {
        for dev in 0..self.ctx.devices.len() {
            self.ctx.device_admit(dev);
        }
    }

    fn dispatch(&mut self) {
        if !self.ctx.cpu_is_idle() {
            return;
        }
        if let Some(proc) = self.ctx.ready_pop() {
            self.ctx.set_running(proc);
        }
    }

    // Counters follow the end-of-tick state: every non-terminal tick after
    // arrival accrues throughput; every such tick off the CPU accrues wait.
    fn account(&mut self) {
        for pcb in &mut self.ctx.pcbs {
            match pcb.state {
                ProcState::New | ProcState::Terminated => {}
                ProcState::Running => pcb.throughput_time += 1,
                ProcState::Ready | ProcState::Blocked | ProcState::BlockedQueued => {
                    pcb.waiting_time += 1;
                    pcb.throughput_time += 1;
                }
            }
        }
    }

    fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            tick: self.ctx.now,
            procs: self
                .ctx
                .pcbs
                .iter()
                .map(|pcb| ProcSample {
                    proc: pcb.id,
                    state: pcb.state,
                    device: pcb.current_device,
                })
                .collect(),
        }
    }
}
