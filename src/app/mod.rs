pub mod config;
pub mod host;
pub mod logging_system;
pub mod plugin;
pub mod service;
pub mod shutdown;

pub use config::{Config, ConfigError, LogLevel};
pub use host::{PluginHandle, PluginHost};
pub use logging_system::{InitializationError, LoggingSystem, setup_logging_safe};
pub use plugin::OutputPlugin;
pub use service::{ServiceError, ServiceManager, ServiceSummary};
pub use shutdown::{spawn_signal_listener, wait_for_signal};

use tokio::fs::File;
use tokio::io::BufReader;
use tracing::info;

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let config = Config::from_args_and_file(std::env::args_os())?;
    setup_logging_safe(config.effective_log_level(), config.json_logs)?;

    info!("Starting rask-firehose-forwarder v{}", crate::VERSION);
    info!(
        "Configuration: delivery_stream={}, region={}, simple_aggregation={}, oversize_policy={:?}",
        config.delivery_stream, config.region, config.simple_aggregation, config.oversize_policy
    );
    if config.role_arn.is_some() || config.sts_endpoint.is_some() {
        info!("role_arn/sts_endpoint are set; requests are sent unsigned to the configured endpoint");
    }

    let mut service = ServiceManager::new(config.clone())?;
    let signals = spawn_signal_listener(service.shutdown_token());

    let summary = match &config.input {
        Some(path) => service.run(BufReader::new(File::open(path).await?)).await?,
        None => service.run(BufReader::new(tokio::io::stdin())).await?,
    };
    signals.abort();

    info!(
        lines_read = summary.lines_read,
        malformed_lines = summary.malformed_lines,
        status = %summary.final_status,
        "rask-firehose-forwarder stopped"
    );
    Ok(())
}
