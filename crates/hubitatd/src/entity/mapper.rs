//! Capability-to-entity mapping.
//!
//! Classifies raw device records into entity kinds and translates between the
//! hub's attribute vocabulary (`switch`, `level`, `thermostatMode`, ...) and
//! the host runtime's (`state`, `brightness`, `target_temperature`, ...).

use serde_json::{json, Map, Value};
use tracing::debug;

use super::{
    ClimateState, Entity, EntityKind, Feature, PowerState, ATTR_BRIGHTNESS,
    ATTR_COLOR_TEMPERATURE, ATTR_CURRENT_TEMPERATURE, ATTR_HUE, ATTR_SATURATION, ATTR_STATE,
    ATTR_TARGET_TEMPERATURE, ATTR_TARGET_TEMPERATURE_COOL, ATTR_TARGET_TEMPERATURE_HEAT,
};
use crate::hub::DeviceRecord;

/// Capability names in the hub's vocabulary, matched case-sensitively.
pub mod caps {
    pub const SWITCH: &str = "Switch";
    pub const SWITCH_LEVEL: &str = "SwitchLevel";
    pub const COLOR_CONTROL: &str = "ColorControl";
    pub const COLOR_TEMPERATURE: &str = "ColorTemperature";
    pub const LIGHT: &str = "Light";
    pub const LOCK: &str = "Lock";
    pub const THERMOSTAT: &str = "Thermostat";
}

/// Classify a device into the kind of entity it becomes.
///
/// Precedence matters: thermostats often also advertise switch-like
/// capabilities, so climate is checked first, and dimmable switches are
/// promoted to light before falling through to plain switch.
pub fn classify(device: &DeviceRecord) -> EntityKind {
    if device.has_capability(caps::THERMOSTAT) {
        return EntityKind::Climate;
    }

    if device.has_capability(caps::LIGHT)
        || device.has_capability(caps::COLOR_CONTROL)
        || (device.has_capability(caps::SWITCH) && device.has_capability(caps::SWITCH_LEVEL))
    {
        return EntityKind::Light;
    }

    if device.has_capability(caps::SWITCH) {
        return EntityKind::Switch;
    }

    // Locks are recognized but not exposed as controllable entities yet;
    // sensor-only devices have nothing to control at all.
    debug!(
        "device {} has no supported entity type",
        device.display_name()
    );
    EntityKind::Unsupported
}

/// Build the entity representation for a device of the given kind.
/// `Unsupported` yields no entity.
pub fn build_entity(device: &DeviceRecord, kind: EntityKind) -> Option<Entity> {
    match kind {
        EntityKind::Light => Some(build_light(device)),
        EntityKind::Switch => Some(build_switch(device)),
        EntityKind::Climate => Some(build_climate(device)),
        EntityKind::Unsupported => None,
    }
}

fn build_light(device: &DeviceRecord) -> Entity {
    let mut features = vec![Feature::OnOff];
    if device.has_capability(caps::SWITCH_LEVEL) {
        features.push(Feature::Dim);
    }
    if device.has_capability(caps::COLOR_CONTROL) {
        features.push(Feature::Color);
    }
    if device.has_capability(caps::COLOR_TEMPERATURE) {
        features.push(Feature::ColorTemperature);
    }

    let raw = device.attribute_map();
    let mut attributes = Map::new();
    attributes.insert(
        ATTR_STATE.to_string(),
        json!(power_state(&raw).to_string()),
    );

    if features.contains(&Feature::Dim) {
        attributes.insert(ATTR_BRIGHTNESS.to_string(), json!(int_attr(&raw, "level")));
    }
    if features.contains(&Feature::Color) {
        attributes.insert(ATTR_HUE.to_string(), json!(float_attr(&raw, "hue", 0.0)));
        attributes.insert(
            ATTR_SATURATION.to_string(),
            json!(float_attr(&raw, "saturation", 0.0)),
        );
    }
    if features.contains(&Feature::ColorTemperature) {
        attributes.insert(
            ATTR_COLOR_TEMPERATURE.to_string(),
            json!(int_attr(&raw, "colorTemperature")),
        );
    }

    Entity {
        id: device.id.clone(),
        name: device.display_name(),
        kind: EntityKind::Light,
        features,
        attributes,
    }
}

fn build_switch(device: &DeviceRecord) -> Entity {
    let raw = device.attribute_map();
    let mut attributes = Map::new();
    attributes.insert(
        ATTR_STATE.to_string(),
        json!(power_state(&raw).to_string()),
    );

    Entity {
        id: device.id.clone(),
        name: device.display_name(),
        kind: EntityKind::Switch,
        features: vec![Feature::OnOff],
        attributes,
    }
}

fn build_climate(device: &DeviceRecord) -> Entity {
    let raw = device.attribute_map();

    let mut features = vec![Feature::OnOff];
    let modes = supported_modes(&raw);
    if modes.iter().any(|m| m == "heat") {
        features.push(Feature::Heat);
    }
    if modes.iter().any(|m| m == "cool") {
        features.push(Feature::Cool);
    }

    let state = match raw.get("thermostatMode").and_then(Value::as_str) {
        Some("heat") => ClimateState::Heat,
        Some("cool") => ClimateState::Cool,
        Some("auto") => ClimateState::Auto,
        _ => ClimateState::Off,
    };

    let mut attributes = Map::new();
    attributes.insert(ATTR_STATE.to_string(), json!(state.to_string()));
    attributes.insert(
        ATTR_CURRENT_TEMPERATURE.to_string(),
        json!(float_attr(&raw, "temperature", 20.0)),
    );
    attributes.insert(
        ATTR_TARGET_TEMPERATURE.to_string(),
        json!(float_attr(&raw, "thermostatSetpoint", 20.0)),
    );

    if features.contains(&Feature::Heat) {
        if let Some(setpoint) = float_attr_opt(&raw, "heatingSetpoint") {
            attributes.insert(ATTR_TARGET_TEMPERATURE_HEAT.to_string(), json!(setpoint));
        }
    }
    if features.contains(&Feature::Cool) {
        if let Some(setpoint) = float_attr_opt(&raw, "coolingSetpoint") {
            attributes.insert(ATTR_TARGET_TEMPERATURE_COOL.to_string(), json!(setpoint));
        }
    }

    Entity {
        id: device.id.clone(),
        name: device.display_name(),
        kind: EntityKind::Climate,
        features,
        attributes,
    }
}

/// Patch an entity's attributes from a freshly fetched device record.
///
/// Only the attributes relevant to the entity's kind are touched, and numeric
/// light attributes only when the raw key is actually present, so partial
/// updates are expected. Climate state is refreshed by a full rebuild instead.
pub fn refresh_state(entity: &mut Entity, device: &DeviceRecord) {
    let raw = device.attribute_map();

    match entity.kind {
        EntityKind::Light => {
            entity.set_state(power_state(&raw));

            if raw.contains_key("level") {
                entity
                    .attributes
                    .insert(ATTR_BRIGHTNESS.to_string(), json!(int_attr(&raw, "level")));
            }
            if raw.contains_key("hue") {
                entity
                    .attributes
                    .insert(ATTR_HUE.to_string(), json!(float_attr(&raw, "hue", 0.0)));
            }
            if raw.contains_key("saturation") {
                entity.attributes.insert(
                    ATTR_SATURATION.to_string(),
                    json!(float_attr(&raw, "saturation", 0.0)),
                );
            }
            if raw.contains_key("colorTemperature") {
                entity.attributes.insert(
                    ATTR_COLOR_TEMPERATURE.to_string(),
                    json!(int_attr(&raw, "colorTemperature")),
                );
            }
        }
        EntityKind::Switch => {
            entity.set_state(power_state(&raw));
        }
        EntityKind::Climate | EntityKind::Unsupported => {}
    }
}

/// ON iff the raw `switch` attribute is the string "on".
fn power_state(raw: &Map<String, Value>) -> PowerState {
    match raw.get("switch").and_then(Value::as_str) {
        Some("on") => PowerState::On,
        _ => PowerState::Off,
    }
}

/// `supportedThermostatModes` arrives either as an already-decoded list or as
/// a JSON-encoded string. A parse failure or any other shape yields an empty
/// list.
fn supported_modes(raw: &Map<String, Value>) -> Vec<String> {
    match raw.get("supportedThermostatModes") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(encoded)) => serde_json::from_str(encoded).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Integer value of a raw attribute that may arrive as a number or a numeric
/// string; 0 when absent, null, or unparsable.
fn int_attr(raw: &Map<String, Value>, key: &str) -> i64 {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        Some(Value::String(s)) => s
            .parse()
            .or_else(|_| s.parse::<f64>().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn float_attr(raw: &Map<String, Value>, key: &str, default: f64) -> f64 {
    float_attr_opt(raw, key).unwrap_or(default)
}

fn float_attr_opt(raw: &Map<String, Value>, key: &str) -> Option<f64> {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn device(capabilities: Value, attributes: Value) -> DeviceRecord {
        serde_json::from_value(json!({
            "id": "10",
            "name": "Test Device",
            "capabilities": capabilities,
            "attributes": attributes,
        }))
        .unwrap()
    }

    #[test]
    fn test_thermostat_takes_precedence() {
        let device = device(json!(["Switch", "SwitchLevel", "Thermostat", "Lock"]), json!({}));
        assert_eq!(classify(&device), EntityKind::Climate);
    }

    #[test]
    fn test_dimmable_switch_is_promoted_to_light() {
        let device = device(json!(["Switch", "SwitchLevel"]), json!({}));
        assert_eq!(classify(&device), EntityKind::Light);
    }

    #[test]
    fn test_plain_switch_stays_switch() {
        let device = device(json!(["Switch", "ContactSensor"]), json!({}));
        assert_eq!(classify(&device), EntityKind::Switch);
    }

    #[test]
    fn test_lock_and_sensors_are_unsupported() {
        assert_eq!(
            classify(&device(json!(["Lock"]), json!({}))),
            EntityKind::Unsupported
        );
        assert_eq!(
            classify(&device(json!(["MotionSensor"]), json!({}))),
            EntityKind::Unsupported
        );
    }

    #[test]
    fn test_capability_match_is_case_sensitive() {
        let device = device(json!(["switch"]), json!({}));
        assert_eq!(classify(&device), EntityKind::Unsupported);
    }

    #[test]
    fn test_build_dimmable_light() {
        let device = device(
            json!(["Switch", "SwitchLevel"]),
            json!({"switch": "on", "level": "50"}),
        );
        let entity = build_entity(&device, EntityKind::Light).unwrap();

        assert_eq!(entity.features, vec![Feature::OnOff, Feature::Dim]);
        assert_eq!(entity.power_state(), PowerState::On);
        assert_eq!(entity.attributes.get(ATTR_BRIGHTNESS), Some(&json!(50)));
        assert!(!entity.attributes.contains_key(ATTR_HUE));
    }

    #[test]
    fn test_build_color_light_defaults() {
        let device = device(
            json!(["Light", "ColorControl", "ColorTemperature"]),
            json!({}),
        );
        let entity = build_entity(&device, EntityKind::Light).unwrap();

        assert_eq!(
            entity.features,
            vec![Feature::OnOff, Feature::Color, Feature::ColorTemperature]
        );
        assert_eq!(entity.power_state(), PowerState::Off);
        assert_eq!(entity.attributes.get(ATTR_HUE), Some(&json!(0.0)));
        assert_eq!(entity.attributes.get(ATTR_SATURATION), Some(&json!(0.0)));
        assert_eq!(entity.attributes.get(ATTR_COLOR_TEMPERATURE), Some(&json!(0)));
    }

    #[test]
    fn test_build_switch() {
        let device = device(json!(["Switch"]), json!({"switch": "off"}));
        let entity = build_entity(&device, EntityKind::Switch).unwrap();
        assert_eq!(entity.features, vec![Feature::OnOff]);
        assert_eq!(entity.power_state(), PowerState::Off);
    }

    #[test]
    fn test_climate_modes_from_encoded_string() {
        let device = device(
            json!(["Thermostat"]),
            json!({
                "supportedThermostatModes": "[\"heat\",\"cool\"]",
                "thermostatMode": "cool",
                "temperature": 21.5,
                "thermostatSetpoint": 22,
                "heatingSetpoint": 20,
                "coolingSetpoint": 24,
            }),
        );
        let entity = build_entity(&device, EntityKind::Climate).unwrap();

        assert_eq!(
            entity.features,
            vec![Feature::OnOff, Feature::Heat, Feature::Cool]
        );
        assert_eq!(entity.climate_state(), ClimateState::Cool);
        assert_eq!(
            entity.attributes.get(ATTR_CURRENT_TEMPERATURE),
            Some(&json!(21.5))
        );
        assert_eq!(
            entity.attributes.get(ATTR_TARGET_TEMPERATURE),
            Some(&json!(22.0))
        );
        assert_eq!(
            entity.attributes.get(ATTR_TARGET_TEMPERATURE_HEAT),
            Some(&json!(20.0))
        );
        assert_eq!(
            entity.attributes.get(ATTR_TARGET_TEMPERATURE_COOL),
            Some(&json!(24.0))
        );
    }

    #[test]
    fn test_climate_modes_from_decoded_list() {
        let device = device(
            json!(["Thermostat"]),
            json!({"supportedThermostatModes": ["heat"]}),
        );
        let entity = build_entity(&device, EntityKind::Climate).unwrap();
        assert_eq!(entity.features, vec![Feature::OnOff, Feature::Heat]);
    }

    #[test]
    fn test_climate_unparsable_modes_yield_on_off_only() {
        let device = device(
            json!(["Thermostat"]),
            json!({"supportedThermostatModes": "not json", "thermostatMode": "emergency"}),
        );
        let entity = build_entity(&device, EntityKind::Climate).unwrap();

        assert_eq!(entity.features, vec![Feature::OnOff]);
        // Unknown mode reads as OFF.
        assert_eq!(entity.climate_state(), ClimateState::Off);
        // Setpoint attributes are omitted without the matching feature.
        assert!(!entity.attributes.contains_key(ATTR_TARGET_TEMPERATURE_HEAT));
        assert!(!entity.attributes.contains_key(ATTR_TARGET_TEMPERATURE_COOL));
        // Temperature defaults still apply.
        assert_eq!(
            entity.attributes.get(ATTR_CURRENT_TEMPERATURE),
            Some(&json!(20.0))
        );
    }

    #[test]
    fn test_unsupported_kind_builds_nothing() {
        let device = device(json!(["Lock"]), json!({}));
        assert!(build_entity(&device, EntityKind::Unsupported).is_none());
    }

    #[test]
    fn test_refresh_patches_present_light_attributes_only() {
        let full = device(
            json!(["Switch", "SwitchLevel", "ColorControl"]),
            json!({"switch": "off", "level": 10, "hue": 1.0, "saturation": 2.0}),
        );
        let mut entity = build_entity(&full, EntityKind::Light).unwrap();

        // Partial update: only switch and level arrive this time.
        let partial = device(
            json!(["Switch", "SwitchLevel", "ColorControl"]),
            json!([
                {"name": "switch", "currentValue": "on"},
                {"name": "level", "currentValue": 80},
            ]),
        );
        refresh_state(&mut entity, &partial);

        assert_eq!(entity.power_state(), PowerState::On);
        assert_eq!(entity.attributes.get(ATTR_BRIGHTNESS), Some(&json!(80)));
        // Untouched by the partial update.
        assert_eq!(entity.attributes.get(ATTR_HUE), Some(&json!(1.0)));
        assert_eq!(entity.attributes.get(ATTR_SATURATION), Some(&json!(2.0)));
    }

    #[test]
    fn test_refresh_switch_state() {
        let device_off = device(json!(["Switch"]), json!({"switch": "off"}));
        let mut entity = build_entity(&device_off, EntityKind::Switch).unwrap();

        let device_on = device(json!(["Switch"]), json!({"switch": "on"}));
        refresh_state(&mut entity, &device_on);
        assert_eq!(entity.power_state(), PowerState::On);
    }
}
