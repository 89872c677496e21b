//! The local HTTP API.
//!
//! Thin plumbing around the node: every handler synchronously asks the node
//! for whatever it needs and wraps the answer into JSON.

use std::time::Instant;

use rouille::{Request, Response};

use crate::prelude::*;
use crate::scheduler::Node;

/// Dispatch one request. The caller holds the node for the whole call, so a
/// handler never interleaves with a periodic task.
pub fn route(request: &Request, node: &mut Node) -> Response {
    let url = request.url();
    let response = match (request.method(), url.as_str()) {
        ("GET", "/") => index(node),
        ("GET", "/api/temp") => temp(node),
        ("GET", "/api/metrics") => metrics(node),
        ("POST", "/api/push") => push(node),
        ("GET", "/api/info") => info(node),
        ("GET", "/diag") => diag(node),
        ("GET", "/ping") => Response::text("pong"),
        _ => {
            warn!("404: {}", request.raw_url());
            Response::text("Not found").with_status_code(404)
        }
    };
    // The frontend is external, serve everything CORS-enabled.
    response.with_additional_header("Access-Control-Allow-Origin", "*")
}

#[derive(Serialize)]
struct Banner<'a> {
    ok: bool,
    msg: &'a str,
    ip: String,
}

fn index(node: &Node) -> Response {
    Response::json(&Banner {
        ok: true,
        msg: "airnode API running (frontend is external)",
        ip: node_ip(node),
    })
}

#[derive(Serialize)]
struct Temperatures {
    ok: bool,
    temp_c: f64,
    temp_f: f64,
}

/// Legacy quick test, temperature only.
fn temp(node: &mut Node) -> Response {
    let reading = node.sample();
    if reading.temp_c.is_nan() {
        return sensor_failed();
    }
    Response::json(&Temperatures {
        ok: true,
        temp_c: reading.temp_c,
        temp_f: reading.temp_c * 9.0 / 5.0 + 32.0,
    })
}

/// The unified schema endpoint: serves the exact wire record.
fn metrics(node: &mut Node) -> Response {
    match node.metrics_record() {
        Some(record) => Response::from_data("application/json", record),
        None => sensor_failed(),
    }
}

#[derive(Serialize)]
struct Pushed {
    ok: bool,
}

/// Manual cloud upload trigger. An upload failure is still a 200: the caller
/// asked for an attempt and learns its outcome.
fn push(node: &mut Node) -> Response {
    match node.push() {
        Some(ok) => Response::json(&Pushed { ok }),
        None => sensor_failed(),
    }
}

#[derive(Serialize)]
struct Info<'a> {
    device_id: &'a str,
    ip: String,
    ssid: &'a str,
}

fn info(node: &Node) -> Response {
    Response::json(&Info {
        device_id: &node.device_id,
        ip: node_ip(node),
        ssid: &node.network_name,
    })
}

#[derive(Serialize)]
struct Diagnostics<'a> {
    status: &'a str,
    ssid: &'a str,
    ip: String,
    gateway: Option<String>,
    subnet: Option<String>,
    dns: Option<String>,
    rssi: Option<i32>,
    uptime_s: u64,
    clock_synced: bool,
}

/// Link status and addressing. The fields a host process cannot observe stay
/// in the schema as nulls.
fn diag(node: &Node) -> Response {
    Response::json(&Diagnostics {
        status: "up",
        ssid: &node.network_name,
        ip: node_ip(node),
        gateway: None,
        subnet: None,
        dns: None,
        rssi: None,
        uptime_s: node.uptime(Instant::now()).as_secs(),
        clock_synced: node.clock.is_synced(),
    })
}

#[derive(Serialize)]
struct SensorError<'a> {
    ok: bool,
    err: &'a str,
}

fn sensor_failed() -> Response {
    Response::json(&SensorError {
        ok: false,
        err: "sensor_read_failed",
    })
    .with_status_code(500)
}

fn node_ip(node: &Node) -> String {
    node.local_addr
        .map(|address| address.ip().to_string())
        .unwrap_or_else(|| "0.0.0.0".to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::time::Instant;

    use super::*;
    use crate::clock::{ClockSource, TimestampProvider};
    use crate::cloud::Uploader;
    use crate::sensor::{Reading, Sensor};
    use crate::settings::Settings;

    struct FixedSensor(Reading);

    impl Sensor for FixedSensor {
        fn read(&mut self) -> Reading {
            self.0
        }
    }

    struct FixedUploader(bool);

    impl Uploader for FixedUploader {
        fn upload(&mut self, _record: &str) -> bool {
            self.0
        }
    }

    struct FixedClock(i64);

    impl ClockSource for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp(self.0, 0).unwrap()
        }
    }

    fn test_node(reading: Reading, upload_outcome: bool) -> Node {
        Node::new(
            &Settings::default(),
            Box::new(FixedSensor(reading)),
            TimestampProvider::new(Box::new(FixedClock(1_704_067_200))),
            Box::new(FixedUploader(upload_outcome)),
            Instant::now(),
        )
    }

    fn body_of(response: Response) -> String {
        let (mut reader, _) = response.data.into_reader_and_size();
        let mut body = String::new();
        reader.read_to_string(&mut body).unwrap();
        body
    }

    fn get(url: &str) -> Request {
        Request::fake_http("GET", url, vec![], vec![])
    }

    #[test]
    fn metrics_returns_the_exact_record() {
        let mut node = test_node(Reading::new(22.0, 55.0), true);
        let response = route(&get("/api/metrics"), &mut node);
        assert_eq!(response.status_code, 200);
        assert_eq!(
            body_of(response),
            r#"{"device_id":"esp8266-001","ts":"2024-01-01T00:00:00Z","temp_c":22.00,"rh":55.0,"aqi":null}"#
        );
    }

    #[test]
    fn metrics_reports_the_sensor_fault() -> Result {
        let mut node = test_node(Reading::invalid(), true);
        let response = route(&get("/api/metrics"), &mut node);
        assert_eq!(response.status_code, 500);
        let parsed: serde_json::Value = serde_json::from_str(&body_of(response))?;
        assert_eq!(parsed["ok"], false);
        assert_eq!(parsed["err"], "sensor_read_failed");
        Ok(())
    }

    #[test]
    fn temp_converts_to_fahrenheit() -> Result {
        let mut node = test_node(Reading::new(0.0, 55.0), true);
        let response = route(&get("/api/temp"), &mut node);
        assert_eq!(response.status_code, 200);
        let parsed: serde_json::Value = serde_json::from_str(&body_of(response))?;
        assert_eq!(parsed["ok"], true);
        assert_eq!(parsed["temp_f"].as_f64(), Some(32.0));
        Ok(())
    }

    #[test]
    fn failed_push_is_still_a_200() -> Result {
        let mut node = test_node(Reading::new(22.0, 55.0), false);
        let response = route(&Request::fake_http("POST", "/api/push", vec![], vec![]), &mut node);
        assert_eq!(response.status_code, 200);
        let parsed: serde_json::Value = serde_json::from_str(&body_of(response))?;
        assert_eq!(parsed["ok"], false);
        Ok(())
    }

    #[test]
    fn push_requires_post() {
        let mut node = test_node(Reading::new(22.0, 55.0), true);
        let response = route(&get("/api/push"), &mut node);
        assert_eq!(response.status_code, 404);
    }

    #[test]
    fn index_serves_the_banner() -> Result {
        let mut node = test_node(Reading::new(22.0, 55.0), true);
        let response = route(&get("/"), &mut node);
        assert_eq!(response.status_code, 200);
        let parsed: serde_json::Value = serde_json::from_str(&body_of(response))?;
        assert_eq!(parsed["ok"], true);
        assert!(parsed["msg"].is_string());
        assert_eq!(parsed["ip"], "0.0.0.0");
        Ok(())
    }

    #[test]
    fn info_reports_the_device_identity() -> Result {
        let mut node = test_node(Reading::new(22.0, 55.0), true);
        let response = route(&get("/api/info"), &mut node);
        assert_eq!(response.status_code, 200);
        let parsed: serde_json::Value = serde_json::from_str(&body_of(response))?;
        assert_eq!(parsed["device_id"], "esp8266-001");
        assert_eq!(parsed["ip"], "0.0.0.0");
        assert_eq!(parsed["ssid"], "local");
        Ok(())
    }

    #[test]
    fn diag_keeps_the_unobservable_fields_as_nulls() -> Result {
        let mut node = test_node(Reading::new(22.0, 55.0), true);
        // A served record engages the clock latch; diagnostics report it.
        route(&get("/api/metrics"), &mut node);
        let response = route(&get("/diag"), &mut node);
        assert_eq!(response.status_code, 200);
        let parsed: serde_json::Value = serde_json::from_str(&body_of(response))?;
        assert_eq!(parsed["status"], "up");
        assert_eq!(parsed["ssid"], "local");
        assert_eq!(parsed["ip"], "0.0.0.0");
        for field in ["gateway", "subnet", "dns", "rssi"] {
            assert!(parsed[field].is_null(), "`{}` must stay in the schema as null", field);
        }
        assert_eq!(parsed["clock_synced"], true);
        Ok(())
    }

    #[test]
    fn ping_pongs_in_plaintext() {
        let mut node = test_node(Reading::new(22.0, 55.0), true);
        let response = route(&get("/ping"), &mut node);
        assert_eq!(response.status_code, 200);
        assert_eq!(body_of(response), "pong");
    }

    #[test]
    fn unknown_route_is_a_404() {
        let mut node = test_node(Reading::new(22.0, 55.0), true);
        let response = route(&get("/api/nope"), &mut node);
        assert_eq!(response.status_code, 404);
        assert_eq!(body_of(response), "Not found");
    }

    #[test]
    fn responses_are_cors_enabled() {
        let mut node = test_node(Reading::new(22.0, 55.0), true);
        let response = route(&get("/ping"), &mut node);
        assert!(response
            .headers
            .iter()
            .any(|(header, value)| header == "Access-Control-Allow-Origin" && value == "*"));
    }
}
