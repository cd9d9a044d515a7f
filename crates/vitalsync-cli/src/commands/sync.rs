//! Sync subcommand: explicit uploads and sync diagnostics.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;
use vitalsync_core::{
    AutoSyncState, DeviceSummary, HealthDataType, PlanSummary, SyncError, SyncPhase, SyncProgress,
    SyncWindow, UserProfile,
};

use crate::context::{AppContext, CliResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Run a sync pass now
    Run {
        /// Comma-separated data types (steps, heart-rate, resting-heart-rate, spo2, sleep, workouts)
        #[arg(long, value_delimiter = ',')]
        types: Vec<HealthDataType>,
        /// Days of history to upload, ending now
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Show last sync, device id and auto-sync state
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Also fetch server-side totals, the signed-in account and its exercise plan
        #[arg(long)]
        remote: bool,
    },
    /// List uploads the server has recorded for this device
    History,
}

#[derive(Serialize)]
struct StatusReport {
    device_id: String,
    remote: String,
    last_sync_at: Option<DateTime<Utc>>,
    auto_sync: AutoSyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<DeviceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exercise_plan: Option<PlanSummary>,
}

pub async fn run(action: SyncAction) -> CliResult {
    let ctx = AppContext::load()?;
    match action {
        SyncAction::Run { types, days } => run_pass(&ctx, types, days).await,
        SyncAction::Status { json, remote } => show_status(&ctx, json, remote).await,
        SyncAction::History => show_history(&ctx).await,
    }
}

async fn run_pass(ctx: &AppContext, types: Vec<HealthDataType>, days: u32) -> CliResult {
    let types = if types.is_empty() {
        HealthDataType::ALL.to_vec()
    } else {
        types
    };
    let window = SyncWindow::trailing(ctx.clock.now(), days)
        .ok_or_else(|| format!("--days {days} reaches past the supported date range"))?;

    let result = ctx
        .coordinator()
        .perform_sync(&types, window, print_progress)
        .await?;

    println!("{}", result.message);
    for kind in &types {
        println!("  {:<20} {}", kind.display_name(), result.received(*kind));
    }
    println!("sync id: {}", result.sync_id);
    Ok(())
}

fn print_progress(progress: &SyncProgress) {
    let percent = (progress.fraction_completed() * 100.0).round();
    match (progress.phase, progress.current_type) {
        (SyncPhase::Querying, Some(kind)) => {
            eprintln!("[{percent:>3}%] reading {}", kind.display_name());
        }
        (SyncPhase::Uploading, _) => eprintln!("[{percent:>3}%] uploading"),
        (SyncPhase::Done, _) => eprintln!("[{percent:>3}%] done"),
        _ => {}
    }
}

async fn show_status(ctx: &AppContext, json: bool, remote: bool) -> CliResult {
    let mut report = StatusReport {
        device_id: ctx.device_id.clone(),
        remote: ctx.config.remote.base_url.clone(),
        last_sync_at: ctx.coordinator().last_sync_at(),
        auto_sync: ctx.scheduler().state(),
        server: None,
        account: None,
        exercise_plan: None,
    };
    if remote {
        report.server = Some(ctx.remote.device_summary(&ctx.device_id).await?);
        report.account = match ctx.remote.me().await {
            Ok(user) => Some(user),
            Err(SyncError::ServerError { status: 401 | 403, .. }) => None,
            Err(e) => return Err(e.into()),
        };
        if let Some(user) = &report.account {
            report.exercise_plan = ctx.remote.exercise_plan(&user.id).await?;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let instant = |value: Option<DateTime<Utc>>| {
        value.map_or_else(|| "never".to_string(), |t| ctx.codec.iso_string(t))
    };
    println!("Device:        {}", report.device_id);
    println!("Remote:        {}", report.remote);
    println!("Last sync:     {}", instant(report.last_sync_at));
    println!(
        "Auto-sync:     {}",
        if report.auto_sync.enabled { "enabled" } else { "disabled" }
    );
    println!("  attempted:   {}", instant(report.auto_sync.last_attempt_at));
    println!("  succeeded:   {}", instant(report.auto_sync.last_success_at));
    if let Some(error) = &report.auto_sync.last_error {
        println!("  last error:  {error}");
    }

    if let Some(server) = &report.server {
        println!("Server syncs:  {}", server.total_syncs);
        println!("  first:       {}", server.first_sync.as_deref().unwrap_or("never"));
        println!("  last:        {}", server.last_sync.as_deref().unwrap_or("never"));
        for (field, count) in &server.total_counts {
            println!("  {field:<20} {count}");
        }
    }
    if remote {
        match &report.account {
            Some(user) => println!("Account:       {}", user.email),
            None => println!("Account:       not signed in"),
        }
    }
    if let Some(plan) = &report.exercise_plan {
        println!(
            "Exercise plan: {}",
            plan.title.as_deref().unwrap_or(&plan.plan_id)
        );
        println!("  {}", plan.summary);
    }
    Ok(())
}

async fn show_history(ctx: &AppContext) -> CliResult {
    let history = ctx.remote.sync_history(&ctx.device_id).await?;
    if history.is_empty() {
        println!("No syncs recorded for {}", ctx.device_id);
        return Ok(());
    }

    for record in history {
        println!(
            "{}  {}  {} records",
            record.synced_at.as_deref().unwrap_or("-"),
            record.sync_id,
            record.total()
        );
    }
    Ok(())
}
