//! Raw device records as returned by the Maker API.
//!
//! The API is loose about shapes: `id` may be a JSON number or a string,
//! `capabilities` entries may be bare strings or `{"name": ...}` objects, and
//! `attributes` may be a mapping or a list of `{"name", "currentValue"}`
//! objects. Everything is normalized here before the rest of the crate sees it.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// A device record fetched from the hub.
///
/// The bulk listing endpoint only fills `id`, `name`, and `label`; the
/// per-device endpoint adds `capabilities` and `attributes`. A record from
/// either source deserializes cleanly, so a bulk entry can stand in when the
/// detail fetch for that device fails.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRecord {
    #[serde(deserialize_with = "id_from_value")]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    capabilities: Vec<CapabilityEntry>,

    #[serde(default)]
    attributes: Value,
}

/// One entry of a device's capability list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CapabilityEntry {
    Name(String),
    Object {
        #[serde(default)]
        name: String,
    },
}

impl CapabilityEntry {
    fn name(&self) -> &str {
        match self {
            CapabilityEntry::Name(name) => name,
            CapabilityEntry::Object { name } => name,
        }
    }
}

impl DeviceRecord {
    /// Display name: label, falling back to the default device name, falling
    /// back to "Device {id}". Empty strings count as absent.
    pub fn display_name(&self) -> String {
        self.label
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.name.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Device {}", self.id))
    }

    /// Capability names as bare strings, in listing order.
    pub fn capability_names(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(CapabilityEntry::name)
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capability_names().any(|cap| cap == name)
    }

    /// Attributes normalized to a single mapping keyed by attribute name.
    ///
    /// List entries missing either `name` or `currentValue` are dropped, and
    /// anything that is neither a mapping nor a list yields an empty map.
    pub fn attribute_map(&self) -> Map<String, Value> {
        match &self.attributes {
            Value::Object(map) => map.clone(),
            Value::Array(entries) => {
                let mut normalized = Map::new();
                for entry in entries {
                    let Value::Object(obj) = entry else { continue };
                    if let (Some(Value::String(name)), Some(value)) =
                        (obj.get("name"), obj.get("currentValue"))
                    {
                        normalized.insert(name.clone(), value.clone());
                    }
                }
                normalized
            }
            _ => Map::new(),
        }
    }
}

/// The hub reports device ids as strings in some payloads and numbers in
/// others; accept both.
fn id_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "device id must be a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> DeviceRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_numeric_id_is_stringified() {
        let device = record(json!({"id": 42, "name": "Lamp"}));
        assert_eq!(device.id, "42");
    }

    #[test]
    fn test_display_name_fallback_chain() {
        let device = record(json!({"id": "7", "name": "Generic Switch", "label": "Porch"}));
        assert_eq!(device.display_name(), "Porch");

        let device = record(json!({"id": "7", "name": "Generic Switch", "label": ""}));
        assert_eq!(device.display_name(), "Generic Switch");

        let device = record(json!({"id": "7"}));
        assert_eq!(device.display_name(), "Device 7");
    }

    #[test]
    fn test_capabilities_accept_strings_and_objects() {
        let device = record(json!({
            "id": "1",
            "capabilities": ["Switch", {"name": "SwitchLevel"}, {"attributes": []}],
        }));
        let names: Vec<&str> = device.capability_names().collect();
        assert_eq!(names, vec!["Switch", "SwitchLevel", ""]);
        assert!(device.has_capability("SwitchLevel"));
        assert!(!device.has_capability("Thermostat"));
    }

    #[test]
    fn test_attribute_list_is_normalized_to_map() {
        let device = record(json!({
            "id": "1",
            "attributes": [
                {"name": "switch", "currentValue": "on", "dataType": "ENUM"},
                {"name": "level", "currentValue": 50},
                {"currentValue": "orphaned"},
            ],
        }));
        let attrs = device.attribute_map();
        assert_eq!(attrs.get("switch"), Some(&json!("on")));
        assert_eq!(attrs.get("level"), Some(&json!(50)));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_attribute_mapping_passes_through() {
        let device = record(json!({
            "id": "1",
            "attributes": {"switch": "off", "level": 10},
        }));
        let attrs = device.attribute_map();
        assert_eq!(attrs.get("switch"), Some(&json!("off")));
        assert_eq!(attrs.get("level"), Some(&json!(10)));
    }

    #[test]
    fn test_missing_attributes_yield_empty_map() {
        let device = record(json!({"id": "1"}));
        assert!(device.attribute_map().is_empty());
    }
}
