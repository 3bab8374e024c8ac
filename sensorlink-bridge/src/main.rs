//! Serial display bridge for hardware sensor telemetry.
//!
//! Polls the sensor endpoint and streams formatted metrics to the
//! peripheral until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use sensorlink_bridge::{
    BridgeArgs, BridgeConfig, ConnectionManager, Forwarder, HttpSource, MetricRules, PortScanner,
    SerialOpener, SysinfoMemory, SystemPorts, compose_block,
};
use sensorlink_common::LoggingConfig;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = BridgeArgs::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => BridgeConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => BridgeConfig::default(),
    };
    if let Some(target) = &args.target {
        config.serial.target = target.clone();
    }
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    sensorlink_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    if args.list_ports {
        return list_ports();
    }

    let source = HttpSource::new(&config.telemetry).context("Failed to build HTTP client")?;
    let rules = MetricRules::from_config(&config.metrics);

    if args.once {
        let mut memory = SysinfoMemory::new();
        let block = compose_block(&source, &mut memory, &rules)
            .await
            .with_context(|| format!("Failed to fetch from {}", source.endpoint()))?;
        println!("{}", block);
        return Ok(());
    }

    info!("Starting sensorlink-bridge");
    match &args.config {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("Using built-in configuration"),
    }
    info!(
        "Polling {} every {}ms, looking for '{}' at {} baud",
        source.endpoint(),
        config.poll_interval_ms,
        config.serial.target,
        config.serial.baud_rate
    );

    let link = ConnectionManager::new(SystemPorts, SerialOpener, &config.serial);
    let forwarder = Forwarder::new(
        link,
        source,
        SysinfoMemory::new(),
        rules,
        config.poll_interval(),
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let stats = forwarder.run(shutdown).await;
    info!(
        "sensorlink-bridge stopped ({} sent, {} skipped, {} link losses)",
        stats.sent, stats.skipped, stats.link_lost
    );

    Ok(())
}

/// Print every visible serial port and its description.
fn list_ports() -> Result<()> {
    let ports = SystemPorts
        .scan()
        .context("Failed to enumerate serial ports")?;

    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}\t{}", port.path, port.description);
    }

    Ok(())
}
