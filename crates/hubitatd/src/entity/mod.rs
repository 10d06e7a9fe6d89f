//! Controllable entities exposed to the host runtime.

mod mapper;

pub use mapper::{build_entity, classify, refresh_state};

use std::str::FromStr;

use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// What kind of controllable entity a hub device becomes.
///
/// Locks and sensor-only devices are recognized but not exposed yet, so they
/// classify as `Unsupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Light,
    Switch,
    Climate,
    Unsupported,
}

/// A capability an entity claims to support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Feature {
    OnOff,
    Dim,
    Color,
    ColorTemperature,
    Heat,
    Cool,
}

/// On/off state of lights and switches, stored as "ON"/"OFF" strings in the
/// attribute map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum PowerState {
    On,
    #[default]
    Off,
}

/// Operating state of a climate entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ClimateState {
    #[default]
    Off,
    Heat,
    Cool,
    Auto,
}

pub const ATTR_STATE: &str = "state";
pub const ATTR_BRIGHTNESS: &str = "brightness";
pub const ATTR_HUE: &str = "hue";
pub const ATTR_SATURATION: &str = "saturation";
pub const ATTR_COLOR_TEMPERATURE: &str = "color_temperature";
pub const ATTR_CURRENT_TEMPERATURE: &str = "current_temperature";
pub const ATTR_TARGET_TEMPERATURE: &str = "target_temperature";
pub const ATTR_TARGET_TEMPERATURE_HEAT: &str = "target_temperature_heat";
pub const ATTR_TARGET_TEMPERATURE_COOL: &str = "target_temperature_cool";

/// A controllable entity mirrored from a hub device.
///
/// `attributes` is the host-visible state: the `"state"` key plus whatever
/// numeric attributes the entity's features call for. It is built once from
/// the device record and afterwards patched optimistically by command
/// handling or by a fresh fetch.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Hub device id, stable and unique.
    pub id: String,

    pub name: String,

    pub kind: EntityKind,

    /// Features in the order they were derived from the capability list.
    pub features: Vec<Feature>,

    pub attributes: Map<String, Value>,
}

impl Entity {
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn set_state(&mut self, state: impl ToString) {
        self.attributes
            .insert(ATTR_STATE.to_string(), Value::String(state.to_string()));
    }

    /// Cached on/off state; anything unset or unrecognized reads as OFF.
    pub fn power_state(&self) -> PowerState {
        self.state_parse().unwrap_or_default()
    }

    /// Cached climate state; anything unset or unrecognized reads as OFF.
    pub fn climate_state(&self) -> ClimateState {
        self.state_parse().unwrap_or_default()
    }

    fn state_parse<T: FromStr>(&self) -> Option<T> {
        self.attributes
            .get(ATTR_STATE)
            .and_then(Value::as_str)
            .and_then(|s| T::from_str(s).ok())
    }
}
