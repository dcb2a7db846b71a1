//! Service bootstrap
//!
//! Command-line arguments, logging setup, the startup banner and shutdown
//! signal handling.

use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{ServiceConfig, DEFAULT_CONFIG_PATH};
use crate::error::Result;
use crate::store::DeviceStore;

/// Command-line arguments for scalesrv
#[derive(Parser, Clone, Debug)]
#[command(
    name = "scalesrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Weighing scale protocol gateway",
    long_about = None
)]
pub struct Args {
    /// Path to the service configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override the API port from the configuration
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Override the device file path from the configuration
    #[arg(long)]
    pub devices: Option<String>,

    /// Log directives (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "SCALESRV_LOG", default_value = "info")]
    pub log_level: String,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Validate configuration and device file, then exit
    #[arg(long)]
    pub validate: bool,
}

fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Console event format: `timestamp [LEVEL] message`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.3fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the tracing subscriber. Bad directives fall back to `info`.
pub fn init_logging(directives: &str, no_color: bool) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_ansi(!no_color)
        .event_format(BracketedLevelFormat);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .init();
}

const BANNER: &str = r#"
███████╗ ██████╗ █████╗ ██╗     ███████╗███████╗██████╗ ██╗   ██╗
██╔════╝██╔════╝██╔══██╗██║     ██╔════╝██╔════╝██╔══██╗██║   ██║
███████╗██║     ███████║██║     █████╗  ███████╗██████╔╝██║   ██║
╚════██║██║     ██╔══██║██║     ██╔══╝  ╚════██║██╔══██╗╚██╗ ██╔╝
███████║╚██████╗██║  ██║███████╗███████╗███████║██║  ██║ ╚████╔╝
╚══════╝ ╚═════╝╚═╝  ╚═╝╚══════╝╚══════╝╚══════╝╚═╝  ╚═╝  ╚═══╝
"#;

/// Startup banner in the service logs
pub fn print_banner(bind_address: &str) {
    info!("{}", BANNER);
    info!("");
    info!(" SCALESRV v{}", env!("CARGO_PKG_VERSION"));
    info!(" Weighing Scale Protocol Gateway");
    info!(" Listening on {}", bind_address);
    info!("");
}

/// Bind address priority: CLI port > configuration (which already merged
/// environment overrides)
pub fn determine_bind_address(cli_port: Option<u16>, config: &ServiceConfig) -> String {
    match cli_port {
        Some(port) => {
            info!("Using API port from command line: {}", port);
            format!("{}:{}", config.api.host, port)
        }
        None => config.bind_address(),
    }
}

/// Validation mode: load everything, report, but start nothing
pub fn run_validation(config_path: &str, devices_override: Option<&str>) -> Result<()> {
    info!("Validating configuration from {}", config_path);

    let mut config = ServiceConfig::load(config_path)?;
    if let Some(path) = devices_override {
        config.devices_file = path.to_string();
    }
    info!("API: {} (prefix {})", config.bind_address(), config.api.prefix);

    let store = DeviceStore::load(&config.devices_file)?;
    info!("Found {} device(s)", store.len());
    for descriptor in store.snapshot() {
        info!(
            "  {}: {} ({}, {}, timeout {}ms{})",
            descriptor.id,
            descriptor.name,
            descriptor.protocol,
            descriptor.connection.endpoint(),
            descriptor.timeout_ms,
            if descriptor.enabled { "" } else { ", disabled" }
        );
    }

    info!("Configuration validation completed successfully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM on Unix)
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!(
                    "Failed to install SIGTERM handler: {}. Service will only respond to Ctrl+C",
                    e
                );
                None
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(mut sig) = term_signal {
                    sig.recv().await;
                } else {
                    std::future::pending::<()>().await
                }
            } => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn args_defaults() {
        let args = Args::try_parse_from(["scalesrv"]).unwrap();
        assert_eq!(args.config, "config/scalesrv.yaml");
        assert_eq!(args.log_level, "info");
        assert!(args.port.is_none());
        assert!(args.devices.is_none());
        assert!(!args.validate);
        assert!(!args.no_color);
    }

    #[test]
    fn args_accept_overrides() {
        let args = Args::try_parse_from([
            "scalesrv",
            "-c",
            "/etc/scalesrv.yaml",
            "-p",
            "9000",
            "--devices",
            "/etc/scales.json",
            "-l",
            "debug,scalewire=trace",
            "--validate",
        ])
        .unwrap();
        assert_eq!(args.config, "/etc/scalesrv.yaml");
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.devices.as_deref(), Some("/etc/scales.json"));
        assert_eq!(args.log_level, "debug,scalewire=trace");
        assert!(args.validate);
    }

    #[test]
    fn cli_port_beats_config() {
        let config = ServiceConfig::default();
        assert_eq!(determine_bind_address(None, &config), "0.0.0.0:8090");
        assert_eq!(determine_bind_address(Some(9100), &config), "0.0.0.0:9100");
    }

    #[test]
    fn validation_reports_devices() {
        let dir = tempfile::tempdir().unwrap();
        let devices_path = dir.path().join("devices.json");
        std::fs::write(
            &devices_path,
            r#"{"devices": [{
                "id": "dock-1",
                "name": "Dock scale",
                "protocol": "DFW_ASCII",
                "connection": {"connection_type": "tcp", "host": "10.0.0.9", "port": 4001}
            }]}"#,
        )
        .unwrap();

        let config_path = dir.path().join("scalesrv.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "devices_file: {}", devices_path.display()).unwrap();

        run_validation(config_path.to_str().unwrap(), None).unwrap();

        // Override pointing at a missing file is still fine: empty store
        let missing = dir.path().join("nope.json");
        run_validation(config_path.to_str().unwrap(), missing.to_str()).unwrap();

        // A corrupt device file fails validation
        std::fs::write(&devices_path, "{not json").unwrap();
        assert!(run_validation(config_path.to_str().unwrap(), None).is_err());
    }
}
