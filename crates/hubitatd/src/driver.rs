//! Process-wide session state, threaded explicitly instead of living in
//! globals: the hub client (once configured), the entity map, and the config
//! store handle.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::config::ConfigStore;
use crate::entity::{self, Entity};
use crate::hub::HubClient;
use crate::router::{self, StatusCode};
use crate::setup::{self, SetupError, SetupRequest};

/// Bridge state shared by discovery, command handling, and setup.
///
/// Constructed once at startup and passed to every handler. Entity attribute
/// maps are the only mutable state, owned here and patched in place by
/// whichever handler currently has the command.
pub struct Driver {
    client: Option<HubClient>,
    entities: HashMap<String, Entity>,
    store: ConfigStore,
}

impl Driver {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            client: None,
            entities: HashMap::new(),
            store,
        }
    }

    /// Build a driver from the persisted config, if a complete one exists.
    pub fn from_saved_config(store: ConfigStore) -> Self {
        let mut driver = Self::new(store);

        if let Some(config) = driver.store.load() {
            if config.is_complete() {
                info!("loading configuration");
                driver.client = Some(HubClient::new(
                    &config.hub_address,
                    &config.maker_api_id,
                    &config.access_token,
                ));
            } else {
                warn!("persisted configuration is incomplete, ignoring it");
            }
        }

        driver
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Discovery: fetch all devices, classify them, and (re)build entity
    /// representations. Unsupported devices are skipped. Fail-soft: listing
    /// failures leave the entity map as it was.
    pub async fn load_devices(&mut self) {
        let devices = {
            let Some(client) = &self.client else {
                error!("hub client not initialized");
                return;
            };
            match client.list_devices().await {
                Ok(devices) => devices,
                Err(e) => {
                    error!("error loading devices: {e}");
                    return;
                }
            }
        };

        for device in devices {
            let kind = entity::classify(&device);
            let Some(entity) = entity::build_entity(&device, kind) else {
                continue;
            };
            info!("Added {} entity: {} ({})", kind, entity.name, entity.id);
            self.entities.insert(entity.id.clone(), entity);
        }

        info!("Loaded {} entities", self.entities.len());
    }

    /// Handle an inbound command from the host runtime.
    pub async fn handle_command(
        &mut self,
        entity_id: &str,
        cmd_id: &str,
        params: Option<&Map<String, Value>>,
    ) -> StatusCode {
        let Some(client) = &self.client else {
            error!("hub client not initialized");
            return StatusCode::ServiceUnavailable;
        };

        let Some(entity) = self.entities.get_mut(entity_id) else {
            // Commands for entities we never built are ignored, matching the
            // treatment of unrecognized command ids.
            warn!("received command {cmd_id} for unknown entity {entity_id}");
            return StatusCode::Ok;
        };

        info!("received command {} for entity {}", cmd_id, entity_id);
        router::handle_command(client, entity, cmd_id, params).await
    }

    /// Re-pull one device's record from the hub and patch the entity's
    /// cached attributes. Fetch failures leave the cached state as is.
    pub async fn refresh_entity(&mut self, entity_id: &str) {
        let device = {
            let Some(client) = &self.client else {
                return;
            };
            client.get_device(entity_id).await
        };

        if let (Some(device), Some(entity)) = (device, self.entities.get_mut(entity_id)) {
            entity::refresh_state(entity, &device);
        }
    }

    /// Complete the setup flow and bring the bridge online: persist the
    /// config, swap in the new client, and run discovery.
    pub async fn complete_setup(&mut self, request: &SetupRequest) -> Result<(), SetupError> {
        let client = setup::complete_setup(&self.store, request).await?;

        if let Some(old) = self.client.replace(client) {
            old.close();
        }
        self.load_devices().await;

        Ok(())
    }

    /// Reconfiguration request: drop the stored secrets before a fresh setup.
    pub fn reconfigure(&self) {
        info!("reconfiguring driver");
        self.store.clear();
    }

    pub fn entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entities.get(entity_id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Release the hub connection session.
    pub fn close(&self) {
        if let Some(client) = &self.client {
            client.close();
        }
    }
}
