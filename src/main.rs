use std::fs;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroU64;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use average::{Estimate, Mean};
use clap::Parser;
use log::{debug, info, warn};
use rand::prelude::*;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use rrsim::core::{ProcState, RunReport, TickSnapshot, Ticks};
use rrsim::sim::{DEFAULT_QUANTUM, DEFAULT_TICK_CEILING, Sim, SimConfig, TraceSink};
use rrsim::workload::{Cycle, ProcessSpec, Workload};

#[derive(Debug, Parser)]
#[command(
    name = "rrsim",
    about = "Round-robin uniprocessor scheduling simulator with I/O devices"
)]
struct Opts {
    /// Workload file; omit to generate a random workload
    input: Option<PathBuf>,

    /// Trace output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Round-robin quantum, in ticks
    #[arg(short, long, default_value_t = DEFAULT_QUANTUM)]
    quantum: NonZeroU64,

    /// Hard stop for workloads that never terminate
    #[arg(long, default_value_t = DEFAULT_TICK_CEILING)]
    tick_ceiling: Ticks,

    /// Processes to generate when no input file is given
    #[arg(long, default_value_t = 4)]
    random_processes: usize,

    /// Devices to generate when no input file is given
    #[arg(long, default_value_t = 2)]
    random_devices: usize,

    /// Seed for the generated workload
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let workload = match &opts.input {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_workload(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => {
            info!("no input file given, generating a workload (seed {})", opts.seed);
            random_workload(opts.random_processes, opts.random_devices, opts.seed)?
        }
    };

    info!(
        "{} processes, {} devices, quantum {}",
        workload.process_count(),
        workload.device_count(),
        opts.quantum
    );

    let config = SimConfig {
        quantum: opts.quantum,
        tick_ceiling: opts.tick_ceiling,
    };
    let mut sim = Sim::new(&workload, config);

    let report = match &opts.output {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut sink = TextTrace::new(BufWriter::new(file));
            let report = sim.run(&mut sink);
            sink.finish().context("writing trace")?;
            report
        }
        None => {
            let mut sink = TextTrace::new(io::stdout().lock());
            let report = sim.run(&mut sink);
            sink.finish().context("writing trace")?;
            report
        }
    };

    log_summary(&report);
    Ok(())
}

fn log_summary(report: &RunReport) {
    let waiting: Mean = report
        .procs
        .iter()
        .map(|p| p.waiting_time as f64)
        .collect();
    let turnaround: Mean = report
        .procs
        .iter()
        .map(|p| p.throughput_time as f64)
        .collect();

    info!(
        "simulated {} ticks, cpu idle {} ticks",
        report.ticks, report.cpu_idle_time
    );
    if !report.procs.is_empty() {
        info!("average waiting time: {:.2} ticks", waiting.estimate());
        info!("average turnaround time: {:.2} ticks", turnaround.estimate());
    }
    if !report.converged {
        warn!(
            "did not converge within the tick ceiling; unfinished processes: {:?}",
            report.unfinished.iter().map(|p| p + 1).collect::<Vec<_>>()
        );
    }
}

/// Reference workload file format: `process_count device_count` on the first
/// line, the device service times on the second (when devices exist), then one
/// line per process: `arrival burst [device burst]...` with 1-based device
/// ids. Blank lines and `#` comments are skipped.
fn parse_workload(text: &str) -> Result<Workload> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let header = lines.next().context("missing header line")?;
    let mut fields = header.split_whitespace();
    let processes: usize = fields
        .next()
        .context("missing process count")?
        .parse()
        .context("bad process count")?;
    let devices: usize = fields
        .next()
        .context("missing device count")?
        .parse()
        .context("bad device count")?;

    let device_service: Vec<Ticks> = if devices > 0 {
        let line = lines.next().context("missing device service-time line")?;
        let service = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .context("bad device service time")?;
        if service.len() != devices {
            bail!(
                "expected {devices} device service times, found {}",
                service.len()
            );
        }
        service
    } else {
        Vec::new()
    };

    let mut procs = Vec::with_capacity(processes);
    for i in 0..processes {
        let line = lines
            .next()
            .with_context(|| format!("missing line for process {}", i + 1))?;
        let tokens: Vec<u64> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .with_context(|| format!("process {}: bad number", i + 1))?;
        let [arrival, rest @ ..] = &tokens[..] else {
            bail!("process {}: empty description", i + 1);
        };

        let mut cycles = Vec::new();
        for chunk in rest.chunks(2) {
            match chunk {
                &[burst, device] => {
                    if device == 0 {
                        bail!("process {}: device ids are 1-based", i + 1);
                    }
                    cycles.push(Cycle {
                        burst,
                        device: Some(device as usize - 1),
                    });
                }
                &[burst] => cycles.push(Cycle {
                    burst,
                    device: None,
                }),
                _ => unreachable!("chunks(2) yields one or two tokens"),
            }
        }
        debug!("process {}: arrival {arrival}, {} cycles", i + 1, cycles.len());
        procs.push(ProcessSpec {
            arrival: *arrival,
            cycles,
        });
    }

    Ok(Workload::new(device_service, procs)?)
}

/// Seeded Bernoulli-style workload for experiments: staggered arrivals, a few
/// I/O cycles against random devices, one closing burst.
fn random_workload(processes: usize, devices: usize, seed: u64) -> Result<Workload> {
    let mut rng = StdRng::seed_from_u64(seed);

    let device_service: Vec<Ticks> = (0..devices).map(|_| rng.random_range(2..=6)).collect();

    let mut procs = Vec::with_capacity(processes);
    let mut arrival = 0;
    for _ in 0..processes {
        arrival += rng.random_range(0..4);
        let mut cycles = Vec::new();
        if devices > 0 {
            for _ in 0..rng.random_range(0..=3) {
                cycles.push(Cycle {
                    burst: rng.random_range(1..=8),
                    device: Some(rng.random_range(0..devices)),
                });
            }
        }
        cycles.push(Cycle {
            burst: rng.random_range(1..=8),
            device: None,
        });
        procs.push(ProcessSpec { arrival, cycles });
    }

    Ok(Workload::new(device_service, procs)?)
}

/// Writes the reference trace format: one `<NN> | P01 state: ready | ... |`
/// line per tick, then the idle-time and per-process summary block. Write
/// errors are held and surfaced at `finish`.
struct TextTrace<W: Write> {
    out: W,
    err: Option<io::Error>,
}

impl<W: Write> TextTrace<W> {
    fn new(out: W) -> Self {
        Self { out, err: None }
    }

    fn finish(mut self) -> io::Result<()> {
        match self.err.take() {
            Some(err) => Err(err),
            None => self.out.flush(),
        }
    }

    fn write_tick(&mut self, snapshot: &TickSnapshot) -> io::Result<()> {
        write!(self.out, "<{:02}>", snapshot.tick)?;
        for sample in &snapshot.procs {
            write!(
                self.out,
                " | P{:02} state: {}",
                sample.proc + 1,
                state_name(sample.state)
            )?;
        }
        writeln!(self.out, " |")
    }

    fn write_report(&mut self, report: &RunReport) -> io::Result<()> {
        if !report.converged {
            let unfinished: Vec<_> = report.unfinished.iter().map(|p| p + 1).collect();
            writeln!(
                self.out,
                "| did not converge after {} ticks, unfinished: {:?} |",
                report.ticks, unfinished
            )?;
        }
        writeln!(self.out, "| CPU idle time: {} |", report.cpu_idle_time)?;
        for proc in &report.procs {
            write!(
                self.out,
                "| P{:02} waiting: {} turnaround: {}",
                proc.proc + 1,
                proc.waiting_time,
                proc.throughput_time
            )?;
            for (dev, time) in proc.device_time.iter().enumerate() {
                write!(self.out, " d{}: {}", dev + 1, time)?;
            }
            writeln!(self.out, " |")?;
        }
        Ok(())
    }
}

impl<W: Write> TraceSink for TextTrace<W> {
    fn on_tick(&mut self, snapshot: &TickSnapshot) {
        if self.err.is_some() {
            return;
        }
        if let Err(err) = self.write_tick(snapshot) {
            self.err = Some(err);
        }
    }

    fn on_run_end(&mut self, report: &RunReport) {
        if self.err.is_some() {
            return;
        }
        if let Err(err) = self.write_report(report) {
            self.err = Some(err);
        }
    }
}

fn state_name(state: ProcState) -> &'static str {
    match state {
        ProcState::New => "new",
        ProcState::Ready => "ready",
        ProcState::Running => "running",
        ProcState::Blocked => "blocked",
        ProcState::BlockedQueued => "queued",
        ProcState::Terminated => "terminated",
    }
}
