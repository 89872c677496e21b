//! Encodes a reading into the wire metrics record.

use crate::sensor::Reading;

/// Serialize one reading into the fixed five-field record:
///
/// ```json
/// {"device_id":"esp8266-001","ts":"2024-01-01T00:00:00Z","temp_c":21.50,"rh":40.3,"aqi":null}
/// ```
///
/// Field order and numeric precision are part of the schema: `temp_c` always
/// carries two decimals and `rh` one, whatever the magnitude. An absent
/// timestamp encodes as `null`, never as an empty string. `aqi` is reserved
/// for a future air-quality sensor and stays `null` for now.
///
/// Callers must not pass an invalid reading; validity is checked before the
/// codec, not inside it.
pub fn encode(device_id: &str, timestamp: Option<&str>, reading: &Reading, aqi: Option<f64>) -> String {
    debug_assert!(reading.is_valid());
    let ts = match timestamp {
        Some(ts) => format!(r#""{}""#, ts),
        None => "null".to_string(),
    };
    let aqi = match aqi {
        Some(aqi) => aqi.to_string(),
        None => "null".to_string(),
    };
    format!(
        r#"{{"device_id":"{}","ts":{},"temp_c":{:.2},"rh":{:.1},"aqi":{}}}"#,
        device_id,
        ts,
        round_to(reading.temp_c, 2),
        round_to(reading.rh_pct, 1),
        aqi,
    )
}

/// Round half away from zero to the given number of decimals.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
