// File: manager/src/main.rs
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use maintenance_manager::constants::defaults;
use maintenance_manager::services::{
    BroadcastEventSink, EventSink, FanoutEventSink, WebhookEventSink,
};
use maintenance_manager::web::start_web_server;
use maintenance_manager::{
    ConfigManager, Database, DeviceMaintenanceTracker, MaintenanceScheduler, StaticTopology,
};

const CONFIG_DIR_ENV: &str = "MAINTENANCE_CONFIG_DIR";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with reduced verbosity
    let env_filter = EnvFilter::from_default_env()
        .add_directive("maintenance_manager=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("tokio_cron_scheduler=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting Maintenance Window Manager");

    // Load configuration
    let config_dir = std::env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| "config".to_string());
    let config_manager = ConfigManager::new(config_dir).await?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded: {} switches, {} links, store retry {:?}",
        config.topology.switches.len(),
        config.topology.links.len(),
        config.store_retry
    );

    // Initialize database
    let database = Arc::new(Database::new(&config.database_path, config.store_retry.clone()).await?);
    info!("Database initialized");

    let topology = StaticTopology::from_config(&config.topology);
    info!(
        "Topology initialized: {} switches, {} interfaces, {} links",
        topology.switch_count(),
        topology.interface_count(),
        topology.link_count()
    );

    // Event sinks: always in-process, optionally a webhook
    let broadcast = BroadcastEventSink::new(config.event_channel_capacity);
    let mut sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(broadcast.clone())];
    match &config.event_webhook_url {
        Some(url) => {
            let webhook = WebhookEventSink::new(
                url.clone(),
                Duration::from_secs(defaults::WEBHOOK_TIMEOUT_SECONDS),
            )?;
            info!("Interruption events will be sent to: {}", webhook.get_webhook_url());
            sinks.push(Arc::new(webhook));
        }
        None => warn!("No event_webhook_url configured, interruption events stay in-process"),
    }

    let mut events = broadcast.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let devices = event.devices();
                    info!(
                        "{}: switches={:?} interfaces={:?} links={:?}",
                        event.name, devices.switches, devices.interfaces, devices.links
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event log subscriber lagged, {} events skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Initialize maintenance tracker
    let tracker = Arc::new(DeviceMaintenanceTracker::new(
        Arc::new(topology),
        Arc::new(FanoutEventSink::new(sinks)),
    ));
    info!("Device maintenance tracker initialized");

    // Initialize and start scheduler
    let scheduler = MaintenanceScheduler::new(database, tracker).await?;
    scheduler.start().await?;
    info!("Maintenance scheduler started");

    // Serve until ctrl-c
    let served = start_web_server(config, scheduler.clone(), shutdown_signal()).await;
    if let Err(e) = &served {
        error!("Web server stopped with error: {}", e);
    }

    scheduler.shutdown().await?;
    info!("Maintenance Window Manager stopped");

    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
