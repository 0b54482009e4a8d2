use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::device::constants::{
    SCAN_INTERVAL, SCAN_WINDOW, SPARK_40_CHARACTERISTIC_RX_UUID, SPARK_40_CHARACTERISTIC_TX_UUID, SPARK_40_DEVICE_NAME,
    SPARK_40_SERVICE_UUID,
};
use crate::device::session::SessionSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub device_name: String,
    pub service_uuid: u16,
    pub rx_characteristic_uuid: u16,
    pub tx_characteristic_uuid: u16,
    pub scan_interval: u16,
    pub scan_window: u16,
    pub active_scan: bool,
    /// How long each discovery step after connecting may take. `None` waits forever.
    pub discovery_timeout_ms: Option<u64>,
    pub log_messages: bool,
}

impl Config {
    pub fn discovery_timeout(&self) -> Option<Duration> {
        self.discovery_timeout_ms.map(Duration::from_millis)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            device_name: self.device_name.clone(),
            service_uuid: self.service_uuid,
            rx_uuid: self.rx_characteristic_uuid,
            tx_uuid: self.tx_characteristic_uuid,
            scan_interval: self.scan_interval,
            scan_window: self.scan_window,
            active_scan: self.active_scan,
            log_messages: self.log_messages,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_name: SPARK_40_DEVICE_NAME.to_string(),
            service_uuid: SPARK_40_SERVICE_UUID,
            rx_characteristic_uuid: SPARK_40_CHARACTERISTIC_RX_UUID,
            tx_characteristic_uuid: SPARK_40_CHARACTERISTIC_TX_UUID,
            scan_interval: SCAN_INTERVAL,
            scan_window: SCAN_WINDOW,
            active_scan: true,
            discovery_timeout_ms: None,
            log_messages: false,
        }
    }
}
