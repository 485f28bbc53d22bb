use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use wispmq::broker::{BrokerConfig, MqttBroker};

#[derive(Parser)]
#[command(name = "wispmq")]
#[command(about = "Lightweight MQTT 3.1.1 QoS-0 broker")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:1883")]
    bind: SocketAddr,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = BrokerConfig::default().with_bind_address(cli.bind);
    let mut broker = MqttBroker::with_config(config).await?;
    let shutdown = broker.shutdown_handle();

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("termination signal received");
        shutdown.shutdown();
    });

    broker.run().await?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
