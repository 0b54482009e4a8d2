/**
 * How long (milliseconds) to wait before scanning again after a failed connection attempt.
 */
pub const CONNECT_DELAY: u64 = 1000;

/**
 * How long (milliseconds) a write to a characteristic may take.
 */
pub const WRITE_DEADLINE: u64 = 2000;

/**
 * The local name the Spark 40 advertises.
 */
pub const SPARK_40_DEVICE_NAME: &str = "Spark 40 BLE";

/**
 * 16 bit UUID of the primary service carrying the Spark protocol.
 */
pub const SPARK_40_SERVICE_UUID: u16 = 0xFFC0;

/**
 * 16 bit UUID of the characteristic commands are written to.
 */
pub const SPARK_40_CHARACTERISTIC_TX_UUID: u16 = 0xFFC1;

/**
 * 16 bit UUID of the characteristic the amp notifies on.
 */
pub const SPARK_40_CHARACTERISTIC_RX_UUID: u16 = 0xFFC2;

/**
 * Scan interval and window, in units of 0.625 ms.
 */
pub const SCAN_INTERVAL: u16 = 0x0030;
pub const SCAN_WINDOW: u16 = 0x0030;

/**
 * Largest attribute value we ever write in one go.
 */
pub const MAX_WRITE_LEN: usize = 100;
