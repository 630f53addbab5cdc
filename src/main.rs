use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tickview::core::log::init_logging;
use tickview::core::section::ViewMode;
use tickview::refresh::AutoRefresh;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for tickview::AppCommand {
    fn from(cmd: Commands) -> tickview::AppCommand {
        match cmd {
            Commands::Snapshot { view } => tickview::AppCommand::Snapshot { view },
            Commands::Watch { view, auto } => tickview::AppCommand::Watch {
                view,
                auto_refresh: auto,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch every section of a view once and print it
    Snapshot {
        /// View mode: crypto or stock
        #[arg(long)]
        view: Option<ViewMode>,
    },
    /// Keep a view refreshed; type `h` for the interactive commands
    Watch {
        /// View mode: crypto or stock
        #[arg(long)]
        view: Option<ViewMode>,
        /// Auto-refresh interval: 30s, 1m or 5m
        #[arg(long)]
        auto: Option<AutoRefresh>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => tickview::cli::setup::setup(),
        Some(cmd) => tickview::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
