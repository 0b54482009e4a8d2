use std::io;
use thiserror::Error;
use std::str::Utf8Error;
use btleplug;
use serde_json;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

impl ConfigError {
    pub fn is_file_not_found_error(&self) -> bool {
        match self {
            ConfigError::IOError { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Failed to start application (device): {source}")]
    DeviceError { #[from] source: DeviceError },

    #[error("Failed to start application (runtime): {source}")]
    Runtime { #[from] source: io::Error },
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No bluetooth adapter available")]
    NoAdapter,

    #[error("No peripheral with address {0}")]
    UnknownPeripheral(String),

    #[error("Not connected to a peripheral")]
    NotConnected,

    #[error("A required bluetooth characteristic is not available")]
    MissingCharacteristic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found() {
        let err = ConfigError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_file_not_found_error());
        assert!(!ConfigError::NoConfigPath.is_file_not_found_error());
    }

    #[test]
    fn test_messages() {
        let err = AppRunError::from(DeviceError::NoAdapter);
        assert_eq!(err.to_string(), "Failed to start application (device): No bluetooth adapter available");
    }
}
