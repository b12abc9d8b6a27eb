use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use super::device::Device;
use crate::workload::{Cycle, Workload};

// Index into the Pcb Vec
pub type ProcId = usize;
pub type DeviceId = usize;
pub type Ticks = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    New,
    Ready,
    Running,
    Blocked,
    BlockedQueued,
    Terminated,
}

#[derive(Debug)]
pub struct Pcb {
    pub id: ProcId,
    pub arrival: Ticks,
    pub cycles: Arc<[Cycle]>,
    pub cycle_index: usize,
    pub remaining_burst: Ticks,
    pub slice_remaining: Ticks,
    pub state: ProcState,
    pub current_device: Option<DeviceId>,
    pub waiting_time: Ticks,
    pub throughput_time: Ticks,
    pub device_time: Vec<Ticks>,
}

impl Pcb {
    pub fn current_cycle(&self) -> Cycle {
        self.cycles[self.cycle_index]
    }
}

#[derive(Debug)]
pub struct CpuState {
    pub current: Option<ProcId>,
}

/// Strict arrival-order queue of process references. Used for the ready
/// queue and for every device's wait queue.
#[derive(Debug, Default)]
pub struct Fifo {
    procs: VecDeque<ProcId>,
}

impl Fifo {
    pub fn push_back(&mut self, proc: ProcId) {
        self.procs.push_back(proc);
    }

    pub fn pop_front(&mut self) -> Option<ProcId> {
        self.procs.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn contains(&self, proc: ProcId) -> bool {
        self.procs.contains(&proc)
    }

    pub fn iter(&self) -> impl Iterator<Item = ProcId> + '_ {
        self.procs.iter().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSite {
    Ready,
    Device(DeviceId),
}

/// The whole mutable simulation state: process table, single CPU slot,
/// ready queue, device bank, and a queue-membership map guarding against
/// the same process sitting in two places at once.
#[derive(Debug)]
pub struct SimCtx {
    pub now: Ticks,
    pub quantum: Ticks,
    pub cpu: CpuState,
    pub pcbs: Vec<Pcb>,
    pub ready: Fifo,
    pub devices: Vec<Device>,
    pub proc_site: FxHashMap<ProcId, QueueSite>,
    pub cpu_idle_time: Ticks,
}

impl SimCtx {
    pub fn new(workload: &Workload, quantum: Ticks) -> Self {
        let device_count = workload.device_count();

        let pcbs = (0..workload.process_count())
            .map(|id| {
                let cycles = workload.cycles(id);
                let first_burst = cycles[0].burst;
                Pcb {
                    id,
                    arrival: workload.arrival(id),
                    cycles,
                    cycle_index: 0,
                    remaining_burst: first_burst,
                    slice_remaining: 0,
                    state: ProcState::New,
                    current_device: None,
                    waiting_time: 0,
                    throughput_time: 0,
                    device_time: vec![0; device_count],
                }
            })
            .collect();

        let devices = workload
            .device_services()
            .iter()
            .enumerate()
            .map(|(id, &service_time)| Device::new(id, service_time))
            .collect();

        Self {
            now: 0,
            quantum,
            cpu: CpuState { current: None },
            pcbs,
            ready: Fifo::default(),
            devices,
            proc_site: FxHashMap::default(),
            cpu_idle_time: 0,
        }
    }

    pub fn pcb(&self, proc: ProcId) -> &Pcb {
        &self.pcbs[proc]
    }

    pub fn pcb_mut(&mut self, proc: ProcId) -> &mut Pcb {
        &mut self.pcbs[proc]
    }

    pub fn cpu_is_idle(&self) -> bool {
        self.cpu.current.is_none()
    }

    pub fn all_terminated(&self) -> bool {
        self.pcbs
            .iter()
            .all(|pcb| pcb.state == ProcState::Terminated)
    }

    pub fn ready_push(&mut self, proc: ProcId) {
        assert!(
            !self.proc_site.contains_key(&proc),
            "process {proc} already present in a queue"
        );
        let pcb = &self.pcbs[proc];
        debug_assert_eq!(
            pcb.state,
            ProcState::Ready,
            "process {proc} must be Ready when entering the ready queue"
        );
        self.ready.push_back(proc);
        self.proc_site.insert(proc, QueueSite::Ready);
    }

    pub fn ready_pop(&mut self) -> Option<ProcId> {
        let proc = self.ready.pop_front()?;
        let removed = self.proc_site.remove(&proc);
        debug_assert_eq!(
            removed,
            Some(QueueSite::Ready),
            "process {proc} missing ready-queue membership"
        );
        Some(proc)
    }

    pub fn device_queue_push(&mut self, dev: DeviceId, proc: ProcId) {
        assert!(
            !self.proc_site.contains_key(&proc),
            "process {proc} already present in a queue"
        );
        let pcb = &mut self.pcbs[proc];
        debug_assert_ne!(
            pcb.state,
            ProcState::Terminated,
            "Terminated process {proc} cannot wait for a device"
        );
        pcb.state = ProcState::BlockedQueued;
        pcb.current_device = Some(dev);
        self.devices[dev].queue.push_back(proc);
        self.proc_site.insert(proc, QueueSite::Device(dev));
    }

    pub fn device_queue_pop(&mut self, dev: DeviceId) -> Option<ProcId> {
        let proc = self.devices[dev].queue.pop_front()?;
        let removed = self.proc_site.remove(&proc);
        debug_assert_eq!(
            removed,
            Some(QueueSite::Device(dev)),
            "process {proc} missing device-queue membership"
        );
        Some(proc)
    }

    pub fn mark_ready(&mut self, proc: ProcId) {
        let pcb = &mut self.pcbs[proc];
        debug_assert_ne!(
            pcb.state,
            ProcState::Terminated,
            "Terminated process {proc} cannot become Ready"
        );
        pcb.state = ProcState::Ready;
        pcb.current_device = None;
    }

    pub fn set_running(&mut self, proc: ProcId) {
        debug_assert!(
            !self.proc_site.contains_key(&proc),
            "running process {proc} must not be enqueued"
        );
        assert!(self.cpu.current.is_none(), "cpu already running a process");
        self.cpu.current = Some(proc);
        let pcb = &mut self.pcbs[proc];
        debug_assert_eq!(
            pcb.state,
            ProcState::Ready,
            "process {proc} must be dispatched from Ready"
        );
        debug_assert!(
            pcb.remaining_burst > 0,
            "process {proc} dispatched with an exhausted burst"
        );
        pcb.state = ProcState::Running;
        pcb.slice_remaining = self.quantum;
    }

    pub fn clear_cpu(&mut self) {
        self.cpu.current = None;
    }

    pub fn mark_terminated(&mut self, proc: ProcId) {
        debug_assert!(
            !self.proc_site.contains_key(&proc),
            "terminating process {proc} that is still enqueued"
        );
        let pcb = &mut self.pcbs[proc];
        debug_assert_eq!(
            pcb.state,
            ProcState::Running,
            "process {proc} must have been Running before termination"
        );
        pcb.state = ProcState::Terminated;
        pcb.current_device = None;
    }

    // The exhausted cycle's burst is done; arm the next cycle's burst so the
    // process resumes it after its I/O completes.
    pub fn enter_next_cycle(&mut self, proc: ProcId) {
        let pcb = &mut self.pcbs[proc];
        debug_assert!(
            pcb.cycle_index + 1 < pcb.cycles.len(),
            "process {proc} has no cycle after {}",
            pcb.cycle_index
        );
        pcb.cycle_index += 1;
        pcb.remaining_burst = pcb.cycles[pcb.cycle_index].burst;
    }

    /// Put `proc` directly into service on `dev`. The admission tick consumes
    /// no service time; the countdown starts dropping next tick.
    pub fn device_start(&mut self, dev: DeviceId, proc: ProcId) {
        debug_assert!(
            !self.proc_site.contains_key(&proc),
            "in-service process {proc} must not be enqueued"
        );
        let device = &mut self.devices[dev];
        assert!(
            device.in_service.is_none(),
            "device {dev} already serving a process"
        );
        device.in_service = Some(proc);
        device.countdown = device.service_time;
        let pcb = &mut self.pcbs[proc];
        pcb.state = ProcState::Blocked;
        pcb.current_device = Some(dev);
    }

    /// If `dev` is idle, admit the head of its wait queue into service.
    pub fn device_admit(&mut self, dev: DeviceId) {
        if self.devices[dev].is_busy() {
            return;
        }
        if let Some(proc) = self.device_queue_pop(dev) {
            self.device_start(dev, proc);
        }
    }

    /// One service tick on `dev`. Returns the served process when its request
    /// completes; the device is freed and the caller moves the process on.
    pub fn device_advance(&mut self, dev: DeviceId) -> Option<ProcId> {
        let proc = self.devices[dev].in_service?;
        self.devices[dev].countdown -= 1;
        self.pcbs[proc].device_time[dev] += 1;
        if self.devices[dev].countdown == 0 {
            self.devices[dev].in_service = None;
            Some(proc)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::ProcessSpec;

    fn ctx() -> SimCtx {
        let workload = Workload::new(
            vec![2],
            vec![
                ProcessSpec {
                    arrival: 0,
                    cycles: vec![
                        Cycle {
                            burst: 1,
                            device: Some(0),
                        },
                        Cycle {
                            burst: 1,
                            device: None,
                        },
                    ],
                },
                ProcessSpec {
                    arrival: 0,
                    cycles: vec![Cycle {
                        burst: 3,
                        device: None,
                    }],
                },
            ],
        )
        .unwrap();
        SimCtx::new(&workload, 4)
    }

    #[test]
    fn fifo_preserves_order() {
        let mut fifo = Fifo::default();
        fifo.push_back(2);
        fifo.push_back(0);
        fifo.push_back(1);
        assert_eq!(fifo.len(), 3);
        assert!(fifo.contains(0));
        assert_eq!(fifo.pop_front(), Some(2));
        assert_eq!(fifo.pop_front(), Some(0));
        assert_eq!(fifo.pop_front(), Some(1));
        assert_eq!(fifo.pop_front(), None);
        assert!(fifo.is_empty());
    }

    #[test]
    #[should_panic(expected = "already present in a queue")]
    fn double_enqueue_panics() {
        let mut ctx = ctx();
        ctx.mark_ready(0);
        ctx.ready_push(0);
        ctx.ready_push(0);
    }

    #[test]
    #[should_panic(expected = "already present in a queue")]
    fn enqueue_on_two_queues_panics() {
        let mut ctx = ctx();
        ctx.mark_ready(0);
        ctx.ready_push(0);
        ctx.device_queue_push(0, 0);
    }

    #[test]
    fn device_service_frees_after_countdown() {
        let mut ctx = ctx();
        ctx.device_start(0, 0);
        assert!(ctx.devices[0].is_busy());
        assert_eq!(ctx.device_advance(0), None);
        assert_eq!(ctx.device_advance(0), Some(0));
        assert!(!ctx.devices[0].is_busy());
        assert_eq!(ctx.pcb(0).device_time[0], 2);
    }

    #[test]
    fn device_admit_takes_queue_head() {
        let mut ctx = ctx();
        ctx.device_queue_push(0, 1);
        ctx.device_queue_push(0, 0);
        ctx.device_admit(0);
        assert_eq!(ctx.devices[0].in_service, Some(1));
        assert_eq!(ctx.pcb(1).state, ProcState::Blocked);
        assert_eq!(ctx.pcb(0).state, ProcState::BlockedQueued);
        // busy device leaves the queue untouched
        ctx.device_admit(0);
        assert!(ctx.devices[0].queue.contains(0));
    }
}
