use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use vitalsync_core::Config;

mod commands;
mod context;
mod logging;

#[derive(Parser)]
#[command(name = "vitalsync", version, about = "VitalSync health metrics CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload health samples to the remote store
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Unattended sync control
    AutoSync {
        #[command(subcommand)]
        action: commands::auto_sync::AutoSyncAction,
    },
    /// Refresh and show today's metrics
    Today {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the remote trend summary
    Trend {
        /// Number of days ending today
        #[arg(long)]
        days: Option<u32>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Diet log notifications
    Diet {
        #[command(subcommand)]
        action: commands::metrics::DietAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate the completion script for
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&Config::load_or_default().logging.level);

    let result = match cli.command {
        Commands::Sync { action } => commands::sync::run(action).await,
        Commands::AutoSync { action } => commands::auto_sync::run(action).await,
        Commands::Today { json } => commands::metrics::today(json).await,
        Commands::Trend { days, json } => commands::metrics::trend(days, json).await,
        Commands::Diet { action } => commands::metrics::diet(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "vitalsync", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
