//! ZoneLab CLI: single runs and parameter sweeps.
//!
//! Commands:
//! - `run`: one backtest from a TOML config, a CSV file or synthetic bars
//! - `cap-sweep`: uncapped baseline against ATR-capped stop variants
//! - `gate-compare`: single-threshold regime gate against the deadband gate

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use zonelab_runner::{
    cap_sweep, gate_compare, load_data, run_from_data, save_artifacts, save_sweep_artifacts,
    DataConfig, RunConfig, RunReport, SweepReport, DEFAULT_CAPS,
};

#[derive(Parser)]
#[command(
    name = "zonelab",
    about = "ZoneLab CLI: multi-timeframe zone-window backtester"
)]
struct Cli {
    /// Log window, order and exit transitions.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest and save its artifacts.
    Run {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Compare ATR stop caps against the uncapped baseline.
    CapSweep {
        #[command(flatten)]
        source: SourceArgs,

        /// Caps in ATR(anchor) multiples, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_CAPS)]
        caps: Vec<f64>,
    },
    /// Compare the threshold regime gate with the hysteresis gate.
    GateCompare {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value_t = 0.0022)]
        enter_coef: f64,

        #[arg(long, default_value_t = 0.0018)]
        exit_coef: f64,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Path to a TOML run config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Headerless bar CSV; overrides the config's data source.
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Keep only the last N bars of the CSV.
    #[arg(long, requires = "data")]
    tail: Option<usize>,

    /// Reject malformed CSV rows instead of skipping them.
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Use N seeded synthetic one-minute bars.
    #[arg(long, value_name = "BARS")]
    synthetic: Option<usize>,

    /// Seed for synthetic bars.
    #[arg(long, default_value = "zonelab")]
    seed: String,

    /// Output directory for artifacts.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
}

impl SourceArgs {
    fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => RunConfig::default(),
        };
        if let Some(path) = &self.data {
            config.data = DataConfig::Csv {
                path: path.clone(),
                strict: self.strict,
                tail: self.tail,
            };
        } else if let Some(bars) = self.synthetic {
            config.data = DataConfig::Synthetic {
                bars,
                seed: self.seed.clone(),
                start_price: 150.0,
            };
        }
        Ok(config)
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Run { source } => run_cmd(&source),
        Commands::CapSweep { source, caps } => cap_sweep_cmd(&source, &caps),
        Commands::GateCompare {
            source,
            enter_coef,
            exit_coef,
        } => gate_compare_cmd(&source, enter_coef, exit_coef),
    }
}

fn run_cmd(source: &SourceArgs) -> Result<()> {
    let config = source.resolve()?;
    let data = load_data(&config.data).context("loading bars")?;
    let report = run_from_data(&data, &config.engine, &config.display_label())?;

    print_summary(&report);
    let run_dir = save_artifacts(&report, &source.output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn cap_sweep_cmd(source: &SourceArgs, caps: &[f64]) -> Result<()> {
    let config = source.resolve()?;
    let data = load_data(&config.data).context("loading bars")?;
    let sweep = cap_sweep(&data, &config.engine, caps)?;
    finish_sweep(&sweep, source)
}

fn gate_compare_cmd(source: &SourceArgs, enter_coef: f64, exit_coef: f64) -> Result<()> {
    let config = source.resolve()?;
    let data = load_data(&config.data).context("loading bars")?;
    let sweep = gate_compare(&data, &config.engine, enter_coef, exit_coef)?;
    for run in &sweep.runs {
        println!(
            "{:<28} gate switches {:>5}  TREND {:>5.1}%",
            run.label, run.gate.switches, run.gate.trend_pct
        );
    }
    finish_sweep(&sweep, source)
}

fn finish_sweep(sweep: &SweepReport, source: &SourceArgs) -> Result<()> {
    print_table(&sweep.runs);
    if let Some(best) = sweep.best_by_total_r() {
        println!("Best total R: {} ({:.2})", best.label, best.summary.total_r);
    }
    let dir = save_sweep_artifacts(sweep, &source.output_dir)?;
    println!("Artifacts saved to: {}", dir.display());
    Ok(())
}

fn print_summary(report: &RunReport) {
    let s = &report.summary;
    println!("=== {} ===", report.label);
    if report.has_synthetic {
        println!("  (synthetic data)");
    }
    println!("  Bars:           {} ({} .. {})", report.bar_count, report.start, report.end);
    println!("  Trades:         {}", s.total_trades);
    println!("  Win rate:       {:.2}%", s.win_rate_pct);
    println!("  Total R:        {:.3}", s.total_r);
    println!("  Avg / median R: {:.3} / {:.3}", s.avg_r, s.median_r);
    println!("  Best / worst R: {:.3} / {:.3}", s.best_r, s.worst_r);
    println!("  Max DD (R):     {:.3}", s.max_drawdown_r);
    println!("  Profit factor:  {:.3}", s.profit_factor);
    println!("  Avg bars held:  {:.1}", s.avg_bars_held);
    println!("  Avg stop pips:  {:.1}", s.avg_stop_pips);
    println!(
        "  Exits:          STRUCT {}  BURST {}  EDGE {}  SL {}  END {}",
        s.reason_counts.structure,
        s.reason_counts.burst,
        s.reason_counts.edge,
        s.reason_counts.stop_loss,
        s.reason_counts.end
    );
    println!(
        "  Regime:         TREND {:.1}% of {} anchor bars, {} switches",
        report.gate.trend_pct, report.gate.anchor_bars, report.gate.switches
    );
    println!(
        "  Events:         {} zone rebuilds, {} windows, {} orders armed, {} unfilled",
        report.counters.zone_rebuilds,
        report.counters.windows_opened,
        report.counters.orders_armed,
        report.counters.orders_unfilled
    );
}

fn print_table(runs: &[RunReport]) {
    println!(
        "{:<28} {:>7} {:>8} {:>9} {:>8} {:>8} {:>7}",
        "variant", "trades", "win %", "total R", "avg R", "max DD", "PF"
    );
    for r in runs {
        let s = &r.summary;
        println!(
            "{:<28} {:>7} {:>8.2} {:>9.3} {:>8.3} {:>8.3} {:>7.3}",
            r.label, s.total_trades, s.win_rate_pct, s.total_r, s.avg_r, s.max_drawdown_r, s.profit_factor
        );
    }
}
