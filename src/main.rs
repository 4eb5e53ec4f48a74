mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use cli::args::{Cli, Commands};
use cli::handlers;
use hijra::config::AppConfig;
use hijra::db::LocalStore;
use hijra::remote::SqliteRemote;
use hijra::sync::{Connectivity, DayTracker, SyncService, watch_connectivity};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Loading config")?;

    let command = match cli.command {
        // Config doesn't need the databases
        Some(Commands::Config { online }) => {
            return handlers::handle_config(&mut config, cli.user, online);
        }
        Some(cmd) => cmd,
        // No subcommand → today's prayers
        None => Commands::Show { date: None },
    };

    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let local = LocalStore::open(&db_path).with_context(|| format!("Opening database at {:?}", db_path))?;

    let remote_path = config.remote_db_path()?;
    let remote = SqliteRemote::open(&remote_path)
        .with_context(|| format!("Opening remote store at {:?}", remote_path))?;

    let connectivity = Connectivity::new(config.sync.online && !cli.offline);
    let service = Arc::new(SyncService::new(
        Arc::new(local),
        Arc::new(remote),
        connectivity.clone(),
        config.sync.policy,
    ));
    let scheduler = Arc::new(service.debounced(config.sync.debounce()));
    let watcher = watch_connectivity(&connectivity, &scheduler);

    let user = handlers::resolve_user(cli.user.as_deref(), &config);

    match command {
        Commands::Show { date } => {
            handlers::handle_show(&service, &user?, date.as_deref()).await?;
        }
        Commands::Mark { prayer, date, times } => {
            let user = user?;
            let mut tracker = DayTracker::new(Arc::clone(&service), Arc::clone(&scheduler));
            handlers::handle_mark(&mut tracker, &user, &prayer, date.as_deref(), times).await?;
            // The process exits before the debounce window would elapse
            if scheduler.is_pending() {
                scheduler.flush().await;
            }
        }
        Commands::Sync => {
            handlers::handle_sync(&service).await?;
        }
        Commands::Pending => {
            handlers::handle_pending(service.local())?;
        }
        Commands::Stats => {
            handlers::handle_stats(&service, &user?, &config)?;
        }
        Commands::Heatmap { days } => {
            let days = days.map(usize::from).unwrap_or(config.sync.heatmap_days);
            handlers::handle_heatmap(&service, &user?, days)?;
        }
        Commands::Config { online } => {
            handlers::handle_config(&mut config, cli.user.clone(), online)?;
        }
    }

    watcher.abort();
    Ok(())
}
