use clap::Subcommand;
use vitalsync_core::TriggerOutcome;

use crate::context::{AppContext, CliResult};

#[derive(Subcommand)]
pub enum AutoSyncAction {
    /// Allow unattended syncs
    Enable,
    /// Stop unattended syncs
    Disable,
    /// Run an unattended sync if one is due
    Trigger {
        /// Ignore the minimum interval since the last attempt
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(action: AutoSyncAction) -> CliResult {
    let ctx = AppContext::load()?;
    let scheduler = ctx.scheduler();

    match action {
        AutoSyncAction::Enable => {
            scheduler.set_enabled(true)?;
            println!("auto-sync enabled");
        }
        AutoSyncAction::Disable => {
            scheduler.set_enabled(false)?;
            println!("auto-sync disabled");
        }
        AutoSyncAction::Trigger { force } => match scheduler.trigger(force) {
            TriggerOutcome::Started(task) => {
                task.await?;
                let state = scheduler.state();
                match state.last_error {
                    Some(error) => println!("auto-sync failed: {error}"),
                    None => println!("auto-sync completed"),
                }
            }
            TriggerOutcome::AlreadyRunning => println!("auto-sync already running"),
            TriggerOutcome::Disabled => println!("auto-sync is disabled"),
            TriggerOutcome::TooSoon { next_eligible_at } => {
                println!(
                    "auto-sync skipped, next eligible at {}",
                    ctx.codec.iso_string(next_eligible_at)
                );
            }
            TriggerOutcome::InvalidWindow => {
                return Err("auto_sync.window_days reaches past the supported date range".into());
            }
        },
    }
    Ok(())
}
