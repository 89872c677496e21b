//! # Settings
//!
//! The node is configured with a single TOML file. Every key has a stock
//! default, so a missing file is perfectly fine.
//!
//! ## Example
//!
//! ```toml
//! device_id = "esp8266-001"
//! http_port = 8080
//!
//! [sensor]
//! base_temp_c = 21.0
//! base_rh_pct = 45.0
//!
//! [cloud]
//! host = "air-manager-ccdf4-default-rtdb.firebaseio.com"
//! path = "/sensor_readings.json"
//! auth = ""
//! period_ms = 30000
//! ```

use std::fs;
use std::path::Path;

use crate::prelude::*;

/// Read the settings file, falling back to the defaults when it is missing.
pub fn read(path: &Path) -> Result<Settings> {
    if !path.exists() {
        info!("`{}` is missing, using the default settings", path.display());
        return Ok(Settings::default());
    }
    toml::from_str(&fs::read_to_string(path)?)
        .with_context(|| format!("failed to parse `{}`", path.display()))
}

/// Represents a root settings object.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Device identity reported in every metrics record.
    pub device_id: String,

    /// Web server port.
    pub http_port: u16,

    /// Network name reported by the info and diagnostics endpoints.
    pub network_name: String,

    /// Period of the local reading log, in milliseconds.
    pub log_period_ms: u64,

    pub sensor: SensorSettings,
    pub cloud: CloudSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_id: "esp8266-001".into(),
            http_port: 80,
            network_name: "local".into(),
            log_period_ms: 2500,
            sensor: SensorSettings::default(),
            cloud: CloudSettings::default(),
        }
    }
}

/// Simulated transducer settings.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SensorSettings {
    /// Temperature the simulation drifts around, in °C.
    pub base_temp_c: f64,

    /// Relative humidity the simulation drifts around, in percent.
    pub base_rh_pct: f64,

    /// Probability of a failed measurement, `0.0` to `1.0`.
    pub fault_rate: f64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            base_temp_c: 21.0,
            base_rh_pct: 45.0,
            fault_rate: 0.0,
        }
    }
}

/// Remote JSON store settings.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct CloudSettings {
    /// Store host, without a scheme or path.
    pub host: String,

    /// Resource path where the readings are written.
    pub path: String,

    /// Authorization token. Empty means anonymous access.
    pub auth: String,

    /// Upload period, in milliseconds.
    pub period_ms: u64,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            host: "air-manager-ccdf4-default-rtdb.firebaseio.com".into(),
            path: "/sensor_readings.json".into(),
            auth: String::new(),
            period_ms: 30000,
        }
    }
}
