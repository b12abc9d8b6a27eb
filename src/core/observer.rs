use super::state::{ProcState, QueueSite, SimCtx};

#[derive(Debug)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn observe(&mut self, ctx: &SimCtx) {
        self.step += 1;

        if let Some(proc) = ctx.cpu.current {
            debug_assert_eq!(
                ctx.pcb(proc).state,
                ProcState::Running,
                "cpu current process {proc} must be Running"
            );
        }
        let running = ctx
            .pcbs
            .iter()
            .filter(|pcb| pcb.state == ProcState::Running)
            .count();
        debug_assert!(
            running <= 1,
            "at most one process may be Running, found {running}"
        );
        debug_assert_eq!(
            running == 1,
            ctx.cpu.current.is_some(),
            "Running count and cpu slot disagree"
        );

        for device in &ctx.devices {
            if let Some(proc) = device.in_service {
                let pcb = ctx.pcb(proc);
                debug_assert_eq!(
                    pcb.state,
                    ProcState::Blocked,
                    "device {} in-service process {proc} must be Blocked",
                    device.id
                );
                debug_assert_eq!(
                    pcb.current_device,
                    Some(device.id),
                    "process {proc} device marker mismatch"
                );
                debug_assert!(
                    device.countdown >= 1 && device.countdown <= device.service_time,
                    "device {} countdown {} outside 1..={}",
                    device.id,
                    device.countdown,
                    device.service_time
                );
            }
        }

        for (&proc, &site) in &ctx.proc_site {
            let pcb = ctx.pcb(proc);
            debug_assert_ne!(
                pcb.state,
                ProcState::Terminated,
                "Terminated process {proc} still present in a queue"
            );
            match site {
                QueueSite::Ready => {
                    debug_assert_eq!(
                        pcb.state,
                        ProcState::Ready,
                        "ready-queued process {proc} has wrong state"
                    );
                    debug_assert!(
                        ctx.ready.contains(proc),
                        "proc_site claims process {proc} in ready queue, queue disagrees"
                    );
                }
                QueueSite::Device(dev) => {
                    debug_assert_eq!(
                        pcb.state,
                        ProcState::BlockedQueued,
                        "device-queued process {proc} has wrong state"
                    );
                    debug_assert!(
                        ctx.devices[dev].queue.contains(proc),
                        "proc_site claims process {proc} in device {dev} queue, queue disagrees"
                    );
                }
            }
        }

        // Each state implies exactly one location
        for pcb in &ctx.pcbs {
            match pcb.state {
                ProcState::Ready => debug_assert_eq!(
                    ctx.proc_site.get(&pcb.id),
                    Some(&QueueSite::Ready),
                    "Ready process {} missing from the ready queue",
                    pcb.id
                ),
                ProcState::BlockedQueued => {
                    let dev = pcb.current_device;
                    debug_assert!(
                        matches!(ctx.proc_site.get(&pcb.id), Some(QueueSite::Device(d)) if Some(*d) == dev),
                        "BlockedQueued process {} not in its device queue",
                        pcb.id
                    );
                }
                ProcState::New | ProcState::Running | ProcState::Blocked | ProcState::Terminated => {
                    debug_assert!(
                        !ctx.proc_site.contains_key(&pcb.id),
                        "process {} in state {:?} must not be queued",
                        pcb.id,
                        pcb.state
                    );
                }
            }
        }
    }
}
