use anyhow::{bail, Context, Result};
use clap::Parser;
use regping_probe::{
    fetch_registry, load_registry_file, run_cycles, select_targets, CancelFlag, CycleEvent,
    HttpProber, ProbeSettings, RunSettings, CLOUD_REGIONS_URL,
};
use regping_render::{
    format_avg, render_csv, render_region_list, render_text, sort_reports, TargetReport,
};
use regping_stats::{winsorized_mean, WinsorLimits, DEFAULT_LOWER_LIMIT, DEFAULT_UPPER_LIMIT};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(
    name = "regping",
    version,
    about = "Measure round-trip latency to cloud region endpoints"
)]
struct Cli {
    /// Region ids to probe or list; defaults to every registry entry.
    regions: Vec<String>,

    /// Emit the report (and --list output) in CSV format.
    #[arg(long)]
    csv: bool,

    /// Number of probe cycles; 0 runs until interrupted.
    #[arg(short = 'c', long, default_value_t = 64)]
    cycles: u32,

    /// Interval in seconds between probe cycles.
    #[arg(short = 'i', long, default_value_t = 1.0)]
    interval: f64,

    /// Sort the report by average RTT, ascending, unavailable last.
    #[arg(short = 's', long)]
    sort: bool,

    /// List matching regions without probing.
    #[arg(short = 'l', long)]
    list: bool,

    /// Per-probe timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Targets probed in parallel within one cycle.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Registry endpoint returning the region table.
    #[arg(long, default_value = CLOUD_REGIONS_URL)]
    endpoints_url: String,

    /// Read the region table from a JSON file instead of the network.
    #[arg(long)]
    endpoints_file: Option<PathBuf>,

    /// Fraction of samples clamped up from the low tail.
    #[arg(long, default_value_t = DEFAULT_LOWER_LIMIT)]
    winsor_lower: f64,

    /// Fraction of samples clamped down from the high tail.
    #[arg(long, default_value_t = DEFAULT_UPPER_LIMIT)]
    winsor_upper: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let limits = winsor_limits(&cli)?;
    if !cli.interval.is_finite() || cli.interval < 0.0 {
        bail!("--interval must be a non-negative number of seconds");
    }
    if cli.timeout_ms == 0 {
        bail!("--timeout-ms must be positive");
    }
    if cli.concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }

    let registry = match &cli.endpoints_file {
        Some(path) => load_registry_file(path)?,
        None => fetch_registry(&cli.endpoints_url, Duration::from_millis(cli.timeout_ms))?,
    };

    let selection = select_targets(&registry, &cli.regions);
    for name in &selection.unknown {
        warn!("unknown region {name:?} skipped");
    }
    if selection.targets.is_empty() {
        bail!("no regions found matching the criteria");
    }

    if cli.list {
        println!("{}", render_region_list(&selection.targets, cli.csv));
        return Ok(());
    }

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel())
            .context("failed to install interrupt handler")?;
    }

    let prober = Arc::new(HttpProber::new(&ProbeSettings {
        timeout: Duration::from_millis(cli.timeout_ms),
    })?);

    let settings = RunSettings {
        cycles: cli.cycles,
        interval: Duration::from_secs_f64(cli.interval),
        concurrency: cli.concurrency,
    };

    let targets = selection.targets;
    match settings.cycles {
        0 => info!(
            "probing {} regions every {:.1}s until interrupted",
            targets.len(),
            cli.interval
        ),
        n => info!("probing {} regions for {} cycles", targets.len(), n),
    }

    let outcome = run_cycles(&targets, &settings, prober, &cancel, |event| match event {
        CycleEvent::Probe {
            cycle,
            target,
            outcome,
        } => match outcome {
            Ok(rtt_ms) => debug!("cycle {}: {} {rtt_ms:.1} ms", cycle + 1, target.id),
            Err(err) => warn!("cycle {}: probe failed for {}: {err:#}", cycle + 1, target.id),
        },
        CycleEvent::CycleEnd { cycle, sample_sets } => {
            for (target, samples) in targets.iter().zip(sample_sets) {
                info!(
                    "cycle {}: {} cur {} avg {} ({}/{} ok)",
                    cycle + 1,
                    target.id,
                    format_avg(samples.last().flatten()),
                    format_avg(winsorized_mean(&samples.rtt_ms, &limits)),
                    samples.ok_count(),
                    samples.len()
                );
            }
        }
    });

    if outcome.cancelled {
        info!(
            "interrupted after {} completed cycles; reporting partial results",
            outcome.cycles_run
        );
    }

    let mut reports: Vec<TargetReport> = targets
        .iter()
        .zip(&outcome.sample_sets)
        .map(|(target, samples)| TargetReport {
            id: target.id.clone(),
            name: target.name.clone(),
            avg_ms: winsorized_mean(&samples.rtt_ms, &limits),
            ok: samples.ok_count(),
            total: samples.len(),
        })
        .collect();
    if cli.sort {
        sort_reports(&mut reports);
    }

    if cli.csv {
        println!("{}", render_csv(&reports));
    } else {
        println!("{}", render_text(&reports));
    }
    Ok(())
}

fn winsor_limits(cli: &Cli) -> Result<WinsorLimits> {
    for (flag, value) in [
        ("--winsor-lower", cli.winsor_lower),
        ("--winsor-upper", cli.winsor_upper),
    ] {
        if !(0.0..1.0).contains(&value) {
            bail!("{flag} must lie in [0, 1), got {value}");
        }
    }
    if cli.winsor_lower + cli.winsor_upper > 1.0 {
        bail!("--winsor-lower and --winsor-upper together must not exceed 1");
    }
    Ok(WinsorLimits::new(cli.winsor_lower, cli.winsor_upper))
}
