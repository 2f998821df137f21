mod bootstrap;
mod cli;
mod commands;
mod config;
mod dev_backend;
mod status;
mod time_utils;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use stint_core::{
    adapters::outbound::{clock::SystemClock, state_store::FileStateStore},
    domain::ports::outbound::Clock,
    TimerEngine,
};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::Settings;
use dev_backend::DevBackendFile;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_tracing(&settings.log_level);

    if let Commands::ConfigPath = cli.command {
        let path = Settings::config_path()?;
        if Settings::write_default(&path)? {
            println!("Created default config at {}", path.display());
        } else {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let data_dir = Settings::data_dir()?;
    let workspace = settings.workspace()?;
    tracing::debug!(workspace = %workspace.display(), data_dir = %data_dir.display(), "starting");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let dev_backend = DevBackendFile::in_dir(&data_dir);
    let backend = Arc::new(dev_backend.load(clock.clone(), settings.backend_policy())?);
    let store = Arc::new(FileStateStore::for_workspace(&data_dir, &workspace));
    let engine = TimerEngine::new(
        backend.clone(),
        store,
        clock.clone(),
        settings.engine_settings(),
    );

    bootstrap::initialize_timer(&engine).await;

    let result = match cli.command {
        Commands::Start {
            description,
            project,
            task,
        } => commands::start(&engine, &description, project, task).await,
        Commands::Stop => commands::stop(&engine).await,
        Commands::Status { json } => commands::status(&engine, clock.as_ref(), json),
        Commands::Sync => commands::sync(&engine, clock.as_ref()).await,
        Commands::Watch { seconds } => commands::watch(&engine, clock.clone(), seconds).await,
        Commands::ConfigPath => Ok(()),
    };

    engine.shutdown();
    dev_backend.save(&backend)?;
    result
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stint={level},stint_core={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
