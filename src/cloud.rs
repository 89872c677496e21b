//! Best-effort delivery of metrics records to the remote JSON store.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

use crate::prelude::*;
use crate::settings::CloudSettings;

/// Keep the node responsive even when the cloud is slow.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("airnode/", env!("CARGO_PKG_VERSION"), " (Rust)");

/// Delivers one serialized record and reports the outcome. Implementations
/// never panic and never retry: the next scheduled tick is the only retry
/// mechanism, and it uses a fresh reading.
pub trait Uploader: Send {
    fn upload(&mut self, record: &str) -> bool;
}

pub struct CloudUploader {
    client: Client,
    url: Url,
}

impl CloudUploader {
    pub fn new(settings: &CloudSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            // One fresh connection per delivery, nothing kept alive in between.
            .pool_max_idle_per_host(0)
            // Known accepted weakness: the store certificate is not validated.
            .danger_accept_invalid_certs(true)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: endpoint_url(&settings.host, &settings.path, &settings.auth)?,
        })
    }
}

impl Uploader for CloudUploader {
    /// One fresh connection, one POST, one boolean. Success is any 2xx status;
    /// connection failures, timeouts and non-2xx statuses all collapse to
    /// `false` after a log entry.
    fn upload(&mut self, record: &str) -> bool {
        debug!("POST {}", self.url);
        match self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(record.to_owned())
            .send()
        {
            Ok(response) => {
                let status = response.status();
                let body = response.text().unwrap_or_default();
                if status.is_success() {
                    debug!("cloud replied {}: {}", status, body);
                    true
                } else {
                    warn!("cloud rejected the record: {} {}", status, body);
                    false
                }
            }
            Err(error) => {
                warn!("upload failed: {}", error);
                false
            }
        }
    }
}

/// `https://{host}{path}`, with the `auth` query parameter appended only when
/// a token is configured.
fn endpoint_url(host: &str, path: &str, auth: &str) -> Result<Url> {
    let base = format!("https://{}{}", host, path);
    let url = if auth.is_empty() {
        Url::parse(&base)?
    } else {
        Url::parse_with_params(&base, &[("auth", auth)])?
    };
    Ok(url)
}
