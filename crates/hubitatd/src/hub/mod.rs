//! Hub-facing side of the bridge: wire records and the Maker API client.

mod client;
mod device;

pub use client::{HubClient, HubError};
pub use device::DeviceRecord;

use async_trait::async_trait;
use serde_json::Value;

/// Command dispatch seam between the router and the hub transport.
///
/// `HubClient` is the live implementation; tests substitute a recording fake.
#[async_trait]
pub trait CommandSender: Send + Sync {
    /// Send a device command; true only when the hub acknowledged with 200.
    async fn send_command(&self, device_id: &str, command: &str, parameters: &[Value]) -> bool;
}

#[async_trait]
impl CommandSender for HubClient {
    async fn send_command(&self, device_id: &str, command: &str, parameters: &[Value]) -> bool {
        HubClient::send_command(self, device_id, command, parameters).await
    }
}
