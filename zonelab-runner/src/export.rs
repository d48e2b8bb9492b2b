//! Export of run reports: JSON, CSV and on-disk artifact bundles.
//!
//! - **JSON**: full report round trip with schema versioning
//! - **CSV**: trade tape, equity curve, and one summary row per run
//!
//! Persisted reports carry a `schema_version`; newer versions are rejected on
//! load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use zonelab_core::domain::{ExitReason, Trade};
use zonelab_core::engine::equity_curve_r;

use crate::runner::{RunReport, SCHEMA_VERSION};
use crate::sweep::SweepReport;

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

/// Parse a report, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Trade tape, one row per trade in exit order.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "kind",
        "regime",
        "order_time",
        "entry_time",
        "entry_bar",
        "entry_price",
        "stop",
        "exit_time",
        "exit_bar",
        "exit_price",
        "reason",
        "result_r",
        "spread_r",
        "pnl_pips",
        "stop_pips",
        "bars_held",
    ])?;
    for t in trades {
        wtr.write_record([
            &t.side.to_string(),
            &format!("{:?}", t.kind).to_uppercase(),
            &t.regime.to_string(),
            &t.order_time.to_string(),
            &t.entry_time.to_string(),
            &t.entry_bar.to_string(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.stop),
            &t.exit_time.to_string(),
            &t.exit_bar.to_string(),
            &format!("{:.6}", t.exit_price),
            t.reason.as_str(),
            &format!("{:.4}", t.result_r),
            &format!("{:.4}", t.spread_r),
            &format!("{:.1}", t.pnl_pips),
            &format!("{:.1}", t.stop_pips),
            &t.bars_held.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Cumulative R after each trade.
pub fn export_equity_csv(trades: &[Trade]) -> Result<String> {
    let results: Vec<f64> = trades.iter().map(|t| t.result_r).collect();
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trade", "exit_time", "equity_r"])?;
    for (i, (eq, t)) in equity_curve_r(&results).iter().zip(trades).enumerate() {
        wtr.write_record([
            &(i + 1).to_string(),
            &t.exit_time.to_string(),
            &format!("{eq:.4}"),
        ])?;
    }
    finish(wtr)
}

/// One summary row per report, for side-by-side comparison.
pub fn export_summary_csv(reports: &[RunReport]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec![
        "label",
        "trades",
        "win_rate_pct",
        "total_r",
        "avg_r",
        "median_r",
        "max_dd_r",
        "profit_factor",
        "best_r",
        "worst_r",
        "avg_bars_held",
        "avg_stop_pips",
        "trend_pct",
        "gate_switches",
    ];
    header.extend(ExitReason::ALL.iter().map(|r| r.as_str()));
    wtr.write_record(&header)?;

    for r in reports {
        let s = &r.summary;
        let mut row = vec![
            r.label.clone(),
            s.total_trades.to_string(),
            format!("{:.2}", s.win_rate_pct),
            format!("{:.3}", s.total_r),
            format!("{:.3}", s.avg_r),
            format!("{:.3}", s.median_r),
            format!("{:.3}", s.max_drawdown_r),
            format!("{:.3}", s.profit_factor),
            format!("{:.3}", s.best_r),
            format!("{:.3}", s.worst_r),
            format!("{:.1}", s.avg_bars_held),
            format!("{:.1}", s.avg_stop_pips),
            format!("{:.1}", r.gate.trend_pct),
            r.gate.switches.to_string(),
        ];
        row.extend(
            ExitReason::ALL
                .iter()
                .map(|&reason| s.reason_counts.get(reason).to_string()),
        );
        wtr.write_record(&row)?;
    }
    finish(wtr)
}

// ─── Artifact bundles ───────────────────────────────────────────────

fn dir_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Directory name for a report: `{label}_{fingerprint prefix}`.
pub fn artifact_dir_name(report: &RunReport) -> String {
    let short = report
        .config_fingerprint
        .get(..12)
        .unwrap_or(&report.config_fingerprint);
    format!("{}_{}", dir_safe(&report.label), short)
}

fn write(path: PathBuf, content: &str) -> Result<()> {
    std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Save one run under `output_dir`.
///
/// The run directory holds:
/// - `report.json`: the full `RunReport`
/// - `trades.csv`: trade tape
/// - `equity.csv`: cumulative R per trade
///
/// Returns the created directory.
pub fn save_artifacts(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(report));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(run_dir.join("report.json"), &export_json(report)?)?;
    write(run_dir.join("trades.csv"), &export_trades_csv(&report.trades)?)?;
    write(run_dir.join("equity.csv"), &export_equity_csv(&report.trades)?)?;
    Ok(run_dir)
}

/// Save a sweep: `summary.csv` plus one run directory per variant.
pub fn save_sweep_artifacts(sweep: &SweepReport, output_dir: &Path) -> Result<PathBuf> {
    let sweep_dir = output_dir.join(dir_safe(&sweep.name));
    std::fs::create_dir_all(&sweep_dir)
        .with_context(|| format!("failed to create artifact dir: {}", sweep_dir.display()))?;

    write(sweep_dir.join("summary.csv"), &export_summary_csv(&sweep.runs)?)?;
    for report in &sweep.runs {
        save_artifacts(report, &sweep_dir)?;
    }
    Ok(sweep_dir)
}
