//! Today's metrics: refresh, trend and diet notifications.

use clap::Subcommand;
use vitalsync_core::{MetricEvent, MetricsView, TrendSummary};

use crate::context::{AppContext, CliResult};

#[derive(Subcommand)]
pub enum DietAction {
    /// Record today's total intake after saving a diet entry
    Log {
        /// Total intake for today in kcal
        kcal: f64,
    },
}

pub async fn today(json: bool) -> CliResult {
    let ctx = AppContext::load()?;
    let refresher = ctx.refresher(ctx.config.dashboard.trend_days);

    refresher.refresh_local().await?;
    if let Err(e) = refresher.refresh_trend().await {
        tracing::warn!(error = %e, "trend refresh failed, showing local values");
    }
    let view = refresher.cache().view().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }
    Ok(())
}

pub async fn trend(days: Option<u32>, json: bool) -> CliResult {
    let ctx = AppContext::load()?;
    let refresher = ctx.refresher(days.unwrap_or(ctx.config.dashboard.trend_days));
    let summary = refresher.refresh_trend().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_trend(&summary);
    }
    Ok(())
}

pub async fn diet(action: DietAction) -> CliResult {
    let ctx = AppContext::load()?;
    match action {
        DietAction::Log { kcal } => {
            if !kcal.is_finite() || kcal < 0.0 {
                return Err(format!("invalid intake: {kcal}").into());
            }
            let refresher = ctx.refresher(ctx.config.dashboard.trend_days);
            let snapshot = refresher
                .handle_event(MetricEvent::DietEntrySaved { intake_kcal: kcal })
                .await?;
            println!("intake today: {} kcal", fmt_kcal(snapshot.intake_kcal));
        }
    }
    Ok(())
}

fn fmt_kcal(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.0}"))
}

fn fmt_value(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn print_view(view: &MetricsView) {
    let snap = &view.snapshot;
    println!("{}", view.day_key);
    println!("  Steps            {}", snap.steps);
    println!("  Heart rate       {} bpm", fmt_value(snap.latest_heart_rate, 0));
    println!("  Blood oxygen     {} %", fmt_value(snap.latest_spo2, 1));
    println!("  Sleep            {} h", fmt_value(snap.sleep_hours, 1));
    println!("  Workout          {} min", fmt_value(snap.workout_minutes, 0));
    println!("  Intake           {} kcal", fmt_kcal(snap.intake_kcal));
    println!("  Burned           {} kcal", fmt_kcal(snap.burned_kcal));
    println!("  Net              {} kcal", fmt_kcal(view.net_kcal));
}

fn print_trend(summary: &TrendSummary) {
    println!("{} .. {}", summary.start, summary.end);
    println!(
        "  {:<10} {:>7} {:>9} {:>7} {:>9} {:>8}",
        "date", "steps", "burned", "sleep", "intake", "net"
    );
    for day in &summary.days {
        println!(
            "  {:<10} {:>7} {:>9.0} {:>7.1} {:>9.0} {:>8.0}",
            day.date,
            day.steps,
            day.workout_energy_kcal,
            day.sleep_hours,
            day.diet_intake_kcal,
            day.net_kcal
        );
    }
    for warning in &summary.warnings {
        println!("  warning: {warning}");
    }
}
