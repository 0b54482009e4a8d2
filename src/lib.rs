use std::env;
use std::path::PathBuf;
use clap::Parser;
use log::{info, warn};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::device::connection::run_client;
use crate::error::AppRunError;
use crate::panel::indicator::{indicator_task, LogIndicator};
use crate::panel::keys::stdin_task;

pub mod device;
pub mod error;
pub mod config;
pub mod panel;

/// Control the preset of a Spark 40 amp over Bluetooth LE.
///
/// Keys (followed by enter): 1-4 select a preset, 5-8 send a config value,
/// 9 requests the hardware id, space toggles between preset 1 and 2.
#[derive(Parser, Debug, Clone, Default)]
#[command(version)]
pub struct Args {
    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Advertised name (prefix) of the amp
    #[arg(long)]
    pub device_name: Option<String>,

    /// Give up on a connection when a discovery step takes longer than this
    #[arg(long)]
    pub discovery_timeout_ms: Option<u64>,

    /// Hex dump every frame sent and notification received
    #[arg(long)]
    pub log_messages: bool,

    /// Save the effective configuration to the config file
    #[arg(long)]
    pub write_default_config: bool,

    /// More output, repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    /// Applies command line overrides on top of the config file.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(device_name) = &self.device_name {
            config.device_name = device_name.clone();
        }
        if self.discovery_timeout_ms.is_some() {
            config.discovery_timeout_ms = self.discovery_timeout_ms;
        }
        if self.log_messages {
            config.log_messages = true;
        }
        config
    }
}

pub fn init_logging(level: log::LevelFilter) {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

async fn run_async(args: Args) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync(args.config.clone())?;
    let mut locker = config_io.locker()?;
    let _guard = locker.lock()?;

    let config = args.apply(config_io.read().await?);
    if args.write_default_config {
        config_io.save(&config).await?;
        info!("Wrote {}", config_io.path().to_string_lossy());
    }

    let cancel = CancellationToken::new();
    let (indicator, indicator_handle) = indicator_task(cancel.clone(), LogIndicator);
    let (commands, stdin_handle) = stdin_task(cancel.clone());

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let result = run_client(cancel.clone(), config, commands, vec![indicator]).await;

    cancel.cancel();
    if let Err(err) = indicator_handle.await {
        warn!("Indicator task failed: {}", err);
    }
    // stdin reads block; do not wait for the task to notice the cancellation
    stdin_handle.abort();

    Ok(result?)
}

pub fn run(args: Args) -> Result<(), AppRunError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run_async(args));
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "spark-control",
            "--device-name",
            "Spark MINI",
            "--discovery-timeout-ms",
            "4000",
            "--log-messages",
            "-vv",
        ]);
        let config = args.apply(Config::default());
        assert_eq!(config.device_name, "Spark MINI");
        assert_eq!(config.discovery_timeout_ms, Some(4000));
        assert!(config.log_messages);
        assert_eq!(args.log_level(), log::LevelFilter::Trace);
    }

    #[test]
    fn test_no_args_keep_config() {
        let args = Args::parse_from(["spark-control"]);
        let config = Config { discovery_timeout_ms: Some(1000), ..Config::default() };
        assert_eq!(args.apply(config.clone()), config);
        assert_eq!(args.log_level(), log::LevelFilter::Info);
    }
}
