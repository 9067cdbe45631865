//! audiotracer - Daily microphone recorder
//!
//! Entry point for the audiotracer CLI application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use audiotracer::cli::commands;
use audiotracer::cli::{Cli, Commands};
use audiotracer::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        commands::print_completions(shell);
        return Ok(());
    }

    // Load configuration only for runtime commands.
    let settings = Settings::load()?;
    init_logging(&settings, cli.verbose);

    match cli.command {
        Commands::Start => commands::start_recording(&settings).await?,
        Commands::Pause => commands::pause_recording(&settings).await?,
        Commands::Resume => commands::resume_recording(&settings).await?,
        Commands::Stop => commands::stop_recording(&settings).await?,
        Commands::Status => commands::show_status(&settings).await?,
        Commands::Storage => commands::show_storage(&settings).await?,
        Commands::List { limit } => commands::list_recordings(&settings, limit)?,
        Commands::Permissions => commands::show_permissions(&settings)?,
        Commands::Daemon(daemon_cmd) => {
            commands::daemon_command(&settings, daemon_cmd).await?;
        }
        Commands::Tui => audiotracer::tui::run(&settings).await?,
        Commands::Config(config_cmd) => commands::config_command(&settings, config_cmd)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn init_logging(settings: &Settings, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        settings.general.log_level.as_str()
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
