//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "binary"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Binary entrypoint for the BMS dashboard driver."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
mod clock;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use bms_analytics::{PackSummary, SummaryRow};
use bms_common::logging::init_tracing;
use bms_common::time::wall_now;
use bms_common::{AppConfig, CellId, LogStream};
use bms_core::Session;
use bms_records::{write_csv, write_history_csv, RecordFilter, SortOrder};
use bms_sim::ParamKind;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

use crate::clock::TickClock;

const DEFAULT_CONFIG_PATH: &str = "configs/bms.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "BMS dashboard driver",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Drive the session tick loop and optionally export the result")]
    Run(RunArgs),
    #[command(about = "Drive the session, then print comparison statistics as JSON")]
    Compare(CompareArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Number of ticks to run
    #[arg(long, default_value_t = 60)]
    ticks: u64,

    /// Interval between ticks in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Advance a virtual clock by the interval instead of waiting
    #[arg(long)]
    simulated_clock: bool,

    /// Start the charge/idle/discharge cycle on the first tick
    #[arg(long)]
    start: bool,

    /// Override the generator seed from configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Write the latest snapshot as CSV
    #[arg(long, value_name = "FILE")]
    export_csv: Option<PathBuf>,

    /// Write the whole retained history as CSV
    #[arg(long, value_name = "FILE")]
    history_csv: Option<PathBuf>,

    /// Write the JSON export bundle ('-' for stdout)
    #[arg(long, value_name = "FILE")]
    export_json: Option<PathBuf>,

    /// Print store metrics in Prometheus text format when finished
    #[arg(long)]
    metrics: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            ticks: 60,
            interval_ms: 1000,
            simulated_clock: false,
            start: false,
            seed: None,
            export_csv: None,
            history_csv: None,
            export_json: None,
            metrics: false,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOrder {
    NewestFirst,
    OldestFirst,
}

impl From<CliOrder> for SortOrder {
    fn from(value: CliOrder) -> Self {
        match value {
            CliOrder::NewestFirst => SortOrder::NewestFirst,
            CliOrder::OldestFirst => SortOrder::OldestFirst,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CompareArgs {
    #[command(flatten)]
    run: RunArgs,

    /// Cells to compare (e.g. Cell_1); defaults to every cell
    #[arg(long = "cell", value_name = "CELL")]
    cells: Vec<String>,

    /// Parameters to compare (voltage, current, temperature, capacity, soc, soh)
    #[arg(long = "param", value_name = "PARAM", default_value = "voltage")]
    params: Vec<String>,

    /// Restrict the window to one phase ('all' for every phase)
    #[arg(long)]
    phase: Option<String>,

    /// Number of records in the window
    #[arg(long, allow_negative_numbers = true)]
    limit: Option<i64>,

    #[arg(long, value_enum, default_value_t = CliOrder::NewestFirst)]
    order: CliOrder,
}

#[derive(Debug, Serialize)]
struct ReportRow {
    #[serde(flatten)]
    summary: SummaryRow,
    unit: &'static str,
}

#[derive(Debug, Serialize)]
struct ComparisonReport {
    pack: Option<PackSummary>,
    rows: Vec<ReportRow>,
}

impl ComparisonReport {
    fn build(
        session: &Session,
        cells: &[CellId],
        params: &[ParamKind],
        filter: &RecordFilter,
    ) -> Self {
        let rows = session
            .summarize(cells, params, filter)
            .into_iter()
            .map(|summary| ReportRow {
                unit: summary.parameter.unit(),
                summary,
            })
            .collect();
        Self {
            pack: session.pack_summary(),
            rows,
        }
    }

    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

impl RunArgs {
    fn writes_stdout(&self) -> bool {
        let dash = |path: &Option<PathBuf>| {
            path.as_deref()
                .is_some_and(|path| path.as_os_str() == "-")
        };
        self.metrics
            || dash(&self.export_csv)
            || dash(&self.history_csv)
            || dash(&self.export_json)
    }
}

impl Commands {
    /// Console logs move to stderr whenever stdout carries data.
    fn log_stream(&self, configured: LogStream) -> LogStream {
        match self {
            Commands::Compare(_) => LogStream::Stderr,
            Commands::Run(args) if args.writes_stdout() => LogStream::Stderr,
            Commands::Run(_) => configured,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", version_string());
        return Ok(());
    }

    let mut config = load_config(cli.config.as_deref())?;
    let command = cli.command.unwrap_or(Commands::Run(RunArgs::default()));
    config.logging.stream = command.log_stream(config.logging.stream);
    init_tracing("bms-dashd", &config.logging)?;

    match command {
        Commands::Run(args) => {
            apply_overrides(&mut config, &args);
            let registry = Arc::new(Registry::new());
            let session = drive_session(&config, &args, registry.clone()).await?;
            write_exports(&session, &args)?;
            if args.metrics {
                print_metrics(&registry)?;
            }
        }
        Commands::Compare(args) => {
            apply_overrides(&mut config, &args.run);
            let filter = RecordFilter::parse(args.phase.as_deref(), args.limit, args.order.into())?;
            let cells = parse_cells(&args.cells, &config)?;
            let params = parse_params(&args.params)?;
            let registry = Arc::new(Registry::new());
            let session = drive_session(&config, &args.run, registry.clone()).await?;
            write_exports(&session, &args.run)?;
            ComparisonReport::build(&session, &cells, &params, &filter)
                .write_to(io::stdout().lock())?;
            if args.run.metrics {
                print_metrics(&registry)?;
            }
        }
    }

    Ok(())
}

fn version_string() -> String {
    let profile = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    format!(
        "bms-dashd {} ({} build)",
        env!("CARGO_PKG_VERSION"),
        profile
    )
}

/// Explicit paths must exist; otherwise fall back to defaults when no
/// configuration file is present.
fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::load(&[path]);
    }
    let env_set = std::env::var(AppConfig::ENV_CONFIG_PATH)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    if env_set || Path::new(DEFAULT_CONFIG_PATH).exists() {
        return AppConfig::load(&[DEFAULT_CONFIG_PATH]);
    }
    Ok(AppConfig::default())
}

fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    if let Some(seed) = args.seed {
        config.simulation.random_seed = Some(seed);
    }
}

fn parse_cells(raw: &[String], config: &AppConfig) -> Result<Vec<CellId>> {
    if raw.is_empty() {
        return Ok(config.cell_ids());
    }
    raw.iter()
        .map(|value| {
            let id: CellId = value.parse()?;
            if id.number() > config.simulation.cell_count {
                return Err(anyhow!(
                    "{} is outside the configured pack of {} cells",
                    id,
                    config.simulation.cell_count
                ));
            }
            Ok(id)
        })
        .collect()
}

fn parse_params(raw: &[String]) -> Result<Vec<ParamKind>> {
    raw.iter()
        .map(|value| {
            value
                .parse::<ParamKind>()
                .map_err(|_| anyhow!("unknown parameter '{}'", value))
        })
        .collect()
}

async fn drive_session(
    config: &AppConfig,
    args: &RunArgs,
    registry: Arc<Registry>,
) -> Result<Session> {
    if args.interval_ms == 0 {
        return Err(anyhow!("interval-ms must be greater than zero"));
    }
    let period = Duration::from_millis(args.interval_ms);
    let mut session = Session::from_config(config, Some(registry))?;
    let mut clock = if args.simulated_clock {
        TickClock::simulated(wall_now(), period)
    } else {
        TickClock::wall(period)
    };

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);
    for tick in 0..args.ticks {
        let now = tokio::select! {
            now = clock.tick() => now?,
            _ = &mut shutdown => {
                warn!(tick, "interrupted, stopping tick loop");
                break;
            }
        };
        if tick == 0 && args.start {
            session.start(now);
        }
        let report = session.tick(now);
        let alerting = report.readings.values().filter(|r| r.has_alerts()).count();
        if report.outcome.phase_changed {
            info!(tick, phase = %report.phase, "phase changed");
        }
        info!(
            tick,
            phase = %report.phase,
            active = session.workflow().active,
            appended = ?report.appended,
            alerting,
            "tick processed"
        );
    }

    info!(
        records = session.store().len(),
        phase_log = session.store().phase_log_len(),
        "tick loop finished"
    );
    Ok(session)
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdout()));
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    Ok(Box::new(file))
}

fn write_exports(session: &Session, args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.export_csv {
        match session.store().latest() {
            Some(record) => {
                write_csv(record, open_output(path)?)?;
                info!(path = %path.display(), "snapshot csv written");
            }
            None => warn!(path = %path.display(), "no snapshot recorded, csv export skipped"),
        }
    }
    if let Some(path) = &args.history_csv {
        write_history_csv(session.store().records(), open_output(path)?)?;
        info!(path = %path.display(), records = session.store().len(), "history csv written");
    }
    if let Some(path) = &args.export_json {
        session
            .export_bundle(wall_now())
            .write_json(open_output(path)?)?;
        info!(path = %path.display(), "export bundle written");
    }
    Ok(())
}

fn print_metrics(registry: &Registry) -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    io::stdout().write_all(&buffer)?;
    Ok(())
}
