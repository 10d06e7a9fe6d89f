//! HTTP client for the hub's Maker API.

use std::sync::Mutex;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::device::DeviceRecord;

/// Failure of the bulk device listing.
///
/// Everything else the client does is fail-soft and reports through its
/// return value, never through an error.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("transport error talking to hub: {0}")]
    Network(#[source] reqwest::Error),

    #[error("unexpected device listing payload: {0}")]
    Protocol(#[source] reqwest::Error),
}

/// Client for the Maker API of a single hub.
///
/// Holds one lazily-created `reqwest::Client` that is reused across calls
/// until [`HubClient::close`] drops it. Calls are single-shot: no retry, no
/// timeout beyond the transport default.
#[derive(Debug)]
pub struct HubClient {
    base_url: String,
    access_token: String,
    session: Mutex<Option<reqwest::Client>>,
}

impl HubClient {
    pub fn new(hub_address: &str, app_id: &str, access_token: &str) -> Self {
        let address = hub_address.trim_end_matches('/');
        Self {
            base_url: format!("http://{address}/apps/api/{app_id}"),
            access_token: access_token.to_string(),
            session: Mutex::new(None),
        }
    }

    /// Get or create the shared session. The client handle is an `Arc`
    /// internally, so cloning it out of the guard is cheap.
    fn session(&self) -> reqwest::Client {
        match self.session.lock() {
            Ok(mut guard) => guard.get_or_insert_with(reqwest::Client::new).clone(),
            // Poisoned lock: fall back to a fresh session rather than failing
            // the call.
            Err(_) => reqwest::Client::new(),
        }
    }

    /// Release the connection session. Safe to call when no session was ever
    /// created; a later call re-creates one on demand.
    pub fn close(&self) {
        if let Ok(mut guard) = self.session.lock() {
            guard.take();
        }
    }

    /// List all devices with full details.
    ///
    /// The bulk endpoint only returns id/name/type, so each device is fetched
    /// individually afterwards, sequentially. A device whose detail fetch
    /// fails keeps its bulk entry as a degraded fallback. A non-200 bulk
    /// response yields an empty list, not an error; only transport failure or
    /// an undecodable listing body surface as [`HubError`].
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, HubError> {
        let url = format!("{}/devices?access_token={}", self.base_url, self.access_token);

        let response = self
            .session()
            .get(&url)
            .send()
            .await
            .map_err(HubError::Network)?;

        if response.status() != StatusCode::OK {
            error!("failed to get devices: HTTP {}", response.status());
            return Ok(Vec::new());
        }

        let basic_devices: Vec<DeviceRecord> =
            response.json().await.map_err(HubError::Protocol)?;
        debug!("retrieved {} devices from hub", basic_devices.len());

        let mut full_devices = Vec::with_capacity(basic_devices.len());
        for basic in basic_devices {
            match self.get_device(&basic.id).await {
                Some(full) => full_devices.push(full),
                None => full_devices.push(basic),
            }
        }

        info!("retrieved full details for {} devices", full_devices.len());
        Ok(full_devices)
    }

    /// Fetch one device's full record. Any failure, including a missing
    /// device, yields `None`.
    pub async fn get_device(&self, device_id: &str) -> Option<DeviceRecord> {
        let url = format!(
            "{}/devices/{}?access_token={}",
            self.base_url, device_id, self.access_token
        );

        match self.session().get(&url).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                match response.json().await {
                    Ok(device) => Some(device),
                    Err(e) => {
                        error!("undecodable record for device {device_id}: {e}");
                        None
                    }
                }
            }
            Ok(response) => {
                error!("failed to get device {}: HTTP {}", device_id, response.status());
                None
            }
            Err(e) => {
                error!("error getting device {device_id}: {e}");
                None
            }
        }
    }

    /// Send a command to a device, with parameters joined into the request
    /// path. Returns true only on HTTP 200; command failures never propagate
    /// as errors.
    pub async fn send_command(
        &self,
        device_id: &str,
        command: &str,
        parameters: &[Value],
    ) -> bool {
        let url = if parameters.is_empty() {
            format!(
                "{}/devices/{}/{}?access_token={}",
                self.base_url, device_id, command, self.access_token
            )
        } else {
            let params = parameters
                .iter()
                .map(param_segment)
                .collect::<Vec<_>>()
                .join("/");
            format!(
                "{}/devices/{}/{}/{}?access_token={}",
                self.base_url, device_id, command, params, self.access_token
            )
        };

        match self.session().get(&url).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!("command {command} sent to device {device_id}");
                true
            }
            Ok(response) => {
                error!("failed to send command {}: HTTP {}", command, response.status());
                false
            }
            Err(e) => {
                error!("error sending command {command}: {e}");
                false
            }
        }
    }

    /// Reachability probe: true iff the device listing can be fetched. An
    /// empty listing still counts as reachable.
    pub async fn test_connection(&self) -> bool {
        match self.list_devices().await {
            Ok(_) => true,
            Err(e) => {
                warn!("connection test failed: {e}");
                false
            }
        }
    }
}

/// One path segment per parameter: strings go in verbatim, anything else as
/// its JSON text (the combined `{hue, saturation}` color payload rides in a
/// single segment this way).
fn param_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
