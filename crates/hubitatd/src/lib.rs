pub mod config;
pub mod driver;
pub mod entity;
pub mod hub;
pub mod router;
pub mod setup;

pub use config::ConfigStore;
pub use config::HubConfig;
pub use driver::Driver;
pub use entity::Entity;
pub use entity::EntityKind;
pub use entity::Feature;
pub use hub::HubClient;
pub use router::StatusCode;
pub use setup::SetupError;
pub use setup::SetupRequest;
