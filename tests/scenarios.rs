use std::num::NonZeroU64;

use proptest::prelude::*;

use rrsim::core::{ProcState, RunReport, TickSnapshot, Ticks};
use rrsim::sim::{RecordingSink, Sim, SimConfig};
use rrsim::workload::{Cycle, ProcessSpec, Workload};

fn run(workload: &Workload, config: SimConfig) -> (Vec<TickSnapshot>, RunReport) {
    let mut sim = Sim::new(workload, config);
    let mut sink = RecordingSink::default();
    let report = sim.run(&mut sink);
    (sink.ticks, report)
}

fn config(quantum: u64, tick_ceiling: Ticks) -> SimConfig {
    SimConfig {
        quantum: NonZeroU64::new(quantum).unwrap(),
        tick_ceiling,
    }
}

fn mixed_workload() -> Workload {
    Workload::new(
        vec![3, 2],
        vec![
            ProcessSpec {
                arrival: 0,
                cycles: vec![
                    Cycle {
                        burst: 6,
                        device: Some(0),
                    },
                    Cycle {
                        burst: 2,
                        device: None,
                    },
                ],
            },
            ProcessSpec {
                arrival: 1,
                cycles: vec![
                    Cycle {
                        burst: 2,
                        device: Some(1),
                    },
                    Cycle {
                        burst: 1,
                        device: Some(0),
                    },
                    Cycle {
                        burst: 3,
                        device: None,
                    },
                ],
            },
            ProcessSpec {
                arrival: 4,
                cycles: vec![Cycle {
                    burst: 9,
                    device: None,
                }],
            },
        ],
    )
    .unwrap()
}

#[test]
fn replaying_a_workload_yields_an_identical_trace() {
    let workload = mixed_workload();
    let first = run(&workload, config(4, 10_000));
    let second = run(&workload, config(4, 10_000));
    assert_eq!(first, second);
}

#[test]
fn idle_and_running_ticks_cover_the_whole_run() {
    let workload = mixed_workload();
    let (trace, report) = run(&workload, config(4, 10_000));
    assert!(report.converged);

    let running_ticks = trace
        .iter()
        .filter(|snap| {
            snap.procs
                .iter()
                .any(|sample| sample.state == ProcState::Running)
        })
        .count() as Ticks;
    assert_eq!(report.cpu_idle_time + running_ticks, report.ticks);
}

#[test]
fn turnaround_freezes_at_termination() {
    let workload = mixed_workload();
    let (trace, report) = run(&workload, config(4, 10_000));

    for proc in 0..workload.process_count() {
        let non_terminal = trace
            .iter()
            .filter(|snap| {
                !matches!(
                    snap.procs[proc].state,
                    ProcState::New | ProcState::Terminated
                )
            })
            .count() as Ticks;
        assert_eq!(report.procs[proc].throughput_time, non_terminal);
    }
}

fn workload_strategy() -> impl Strategy<Value = Workload> {
    let service = proptest::collection::vec(1u64..=5, 0..3);
    let proc = (
        0u64..10,                                               // arrival
        proptest::collection::vec((1u64..=6, 0usize..8), 0..3), // io cycles
        1u64..=6,                                               // closing burst
    );
    (service, proptest::collection::vec(proc, 1..5)).prop_map(|(service, procs)| {
        let devices = service.len();
        let procs = procs
            .into_iter()
            .map(|(arrival, io, last)| {
                let mut cycles = Vec::new();
                if devices > 0 {
                    for (burst, pick) in io {
                        cycles.push(Cycle {
                            burst,
                            device: Some(pick % devices),
                        });
                    }
                }
                cycles.push(Cycle {
                    burst: last,
                    device: None,
                });
                ProcessSpec { arrival, cycles }
            })
            .collect();
        Workload::new(service, procs).expect("generated workload must validate")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_workloads_converge_deterministically(
        workload in workload_strategy(),
        quantum in 1u64..=6,
    ) {
        let cfg = config(quantum, 10_000);
        let (trace, report) = run(&workload, cfg);
        let (replay, replay_report) = run(&workload, cfg);
        prop_assert_eq!(&trace, &replay);
        prop_assert_eq!(&report, &replay_report);
        prop_assert!(report.converged);

        // Single CPU, single server per device, every tick.
        let mut running_ticks = 0;
        for snap in &trace {
            let running = snap
                .procs
                .iter()
                .filter(|sample| sample.state == ProcState::Running)
                .count();
            prop_assert!(running <= 1);
            running_ticks += running as Ticks;

            for dev in 0..workload.device_count() {
                let in_service = snap
                    .procs
                    .iter()
                    .filter(|sample| {
                        sample.state == ProcState::Blocked && sample.device == Some(dev)
                    })
                    .count();
                prop_assert!(in_service <= 1);
            }
        }
        prop_assert_eq!(report.cpu_idle_time + running_ticks, report.ticks);

        // Wait plus CPU occupancy accounts for every non-terminal tick.
        for proc_report in &report.procs {
            let running = trace
                .iter()
                .filter(|snap| snap.procs[proc_report.proc].state == ProcState::Running)
                .count() as Ticks;
            prop_assert_eq!(
                proc_report.throughput_time,
                proc_report.waiting_time + running
            );

            let serviced: Ticks = proc_report.device_time.iter().sum();
            let requested: Ticks = workload
                .cycles(proc_report.proc)
                .iter()
                .filter_map(|cycle| cycle.device)
                .map(|dev| workload.device_services()[dev])
                .sum();
            prop_assert_eq!(serviced, requested);
        }
    }
}
