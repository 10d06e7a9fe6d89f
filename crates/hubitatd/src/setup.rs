//! Setup flow: validate user-provided connection fields, probe the hub, and
//! persist the configuration.

use tracing::{error, info};

use crate::config::{ConfigStore, HubConfig};
use crate::hub::HubClient;

/// The three free-text fields collected by the host runtime's setup UI.
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub hub_address: String,
    pub maker_api_id: String,
    pub access_token: String,
}

/// Structured setup failure reported back through the host's setup flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    /// Validation or persistence failure.
    #[error("setup failed")]
    Other,

    /// The hub could not be reached with the provided settings.
    #[error("could not connect to hub")]
    ConnectionRefused,
}

/// Run the setup sequence: validate, test-connect, persist.
///
/// The connectivity probe uses a throwaway client that is closed before
/// returning. On success the validated config has been written through
/// `store` and a client ready for live use is returned.
pub async fn complete_setup(
    store: &ConfigStore,
    request: &SetupRequest,
) -> Result<HubClient, SetupError> {
    if request.hub_address.is_empty()
        || request.maker_api_id.is_empty()
        || request.access_token.is_empty()
    {
        error!("missing required configuration fields");
        return Err(SetupError::Other);
    }

    let probe = HubClient::new(
        &request.hub_address,
        &request.maker_api_id,
        &request.access_token,
    );
    let reachable = probe.test_connection().await;
    probe.close();
    if !reachable {
        error!("failed to connect to hub at {}", request.hub_address);
        return Err(SetupError::ConnectionRefused);
    }

    let config = HubConfig {
        hub_address: request.hub_address.clone(),
        maker_api_id: request.maker_api_id.clone(),
        access_token: request.access_token.clone(),
    };
    if !store.save(&config) {
        error!("failed to persist configuration");
        return Err(SetupError::Other);
    }

    info!("setup completed successfully");
    Ok(HubClient::new(
        &config.hub_address,
        &config.maker_api_id,
        &config.access_token,
    ))
}
