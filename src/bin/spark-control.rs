use clap::Parser;
use log::{error, info};
use spark_control::{init_logging, run, Args};
use spark_control::error::{AppRunError, ConfigError};

fn main() -> Result<(), AppRunError> {
    let args = Args::parse();
    init_logging(args.log_level());
    info!(concat!("Spark Control ", env!("CARGO_PKG_VERSION")));

    match run(args) {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            error!("Spark Control has already been started");
            Ok(())
        },
        Err(err) => {
            error!("Unexpected error: {}", err);
            Err(err)
        },
        Ok(_) => Ok(())
    }
}
