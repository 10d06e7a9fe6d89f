//! Inbound command handling.
//!
//! Translates host-runtime commands into hub device commands and patches
//! entity state optimistically: attributes are updated as soon as the hub
//! command is issued, without read-back verification.

use std::str::FromStr;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::entity::{
    ClimateState, Entity, EntityKind, PowerState, ATTR_BRIGHTNESS, ATTR_COLOR_TEMPERATURE,
    ATTR_HUE, ATTR_SATURATION, ATTR_TARGET_TEMPERATURE, ATTR_TARGET_TEMPERATURE_COOL,
    ATTR_TARGET_TEMPERATURE_HEAT,
};
use crate::hub::CommandSender;

/// Host-visible outcome of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    /// No hub client is configured yet.
    ServiceUnavailable,
    /// Command processing itself failed (e.g. a malformed parameter value).
    ServerError,
}

/// Command ids delivered by the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
enum Command {
    On,
    Off,
    Toggle,
    HvacMode,
    TargetTemperature,
    TargetTemperatureHeat,
    TargetTemperatureCool,
}

/// Handle one inbound command for an entity.
///
/// Unrecognized command ids, and commands that do not apply to the entity's
/// kind, are silently ignored and still report `Ok`.
pub async fn handle_command(
    client: &dyn CommandSender,
    entity: &mut Entity,
    cmd_id: &str,
    params: Option<&Map<String, Value>>,
) -> StatusCode {
    let Ok(command) = Command::from_str(cmd_id) else {
        debug!("ignoring unrecognized command {cmd_id} for entity {}", entity.id);
        return StatusCode::Ok;
    };

    match entity.kind {
        EntityKind::Light => light_command(client, entity, command, params).await,
        EntityKind::Switch => switch_command(client, entity, command).await,
        EntityKind::Climate => climate_command(client, entity, command, params).await,
        EntityKind::Unsupported => StatusCode::Ok,
    }
}

async fn light_command(
    client: &dyn CommandSender,
    entity: &mut Entity,
    command: Command,
    params: Option<&Map<String, Value>>,
) -> StatusCode {
    match command {
        Command::On => {
            if let Some(params) = params {
                if let Some(brightness) = params.get(ATTR_BRIGHTNESS) {
                    client
                        .send_command(&entity.id, "setLevel", &[brightness.clone()])
                        .await;
                    entity
                        .attributes
                        .insert(ATTR_BRIGHTNESS.to_string(), brightness.clone());
                }

                if let (Some(hue), Some(saturation)) =
                    (params.get(ATTR_HUE), params.get(ATTR_SATURATION))
                {
                    // The hub takes hue and saturation as one combined payload.
                    client
                        .send_command(
                            &entity.id,
                            "setColor",
                            &[json!({"hue": hue, "saturation": saturation})],
                        )
                        .await;
                    entity.attributes.insert(ATTR_HUE.to_string(), hue.clone());
                    entity
                        .attributes
                        .insert(ATTR_SATURATION.to_string(), saturation.clone());
                }

                if let Some(color_temp) = params.get(ATTR_COLOR_TEMPERATURE) {
                    client
                        .send_command(&entity.id, "setColorTemperature", &[color_temp.clone()])
                        .await;
                    entity
                        .attributes
                        .insert(ATTR_COLOR_TEMPERATURE.to_string(), color_temp.clone());
                }
            }

            // Always turn on, even when attribute commands were sent.
            client.send_command(&entity.id, "on", &[]).await;
            entity.set_state(PowerState::On);
        }
        Command::Off => {
            client.send_command(&entity.id, "off", &[]).await;
            entity.set_state(PowerState::Off);
        }
        Command::Toggle => toggle_power(client, entity).await,
        _ => {}
    }

    StatusCode::Ok
}

async fn switch_command(
    client: &dyn CommandSender,
    entity: &mut Entity,
    command: Command,
) -> StatusCode {
    match command {
        Command::On => {
            client.send_command(&entity.id, "on", &[]).await;
            entity.set_state(PowerState::On);
        }
        Command::Off => {
            client.send_command(&entity.id, "off", &[]).await;
            entity.set_state(PowerState::Off);
        }
        Command::Toggle => toggle_power(client, entity).await,
        _ => {}
    }

    StatusCode::Ok
}

async fn toggle_power(client: &dyn CommandSender, entity: &mut Entity) {
    match entity.power_state() {
        PowerState::On => {
            client.send_command(&entity.id, "off", &[]).await;
            entity.set_state(PowerState::Off);
        }
        PowerState::Off => {
            client.send_command(&entity.id, "on", &[]).await;
            entity.set_state(PowerState::On);
        }
    }
}

async fn climate_command(
    client: &dyn CommandSender,
    entity: &mut Entity,
    command: Command,
    params: Option<&Map<String, Value>>,
) -> StatusCode {
    match command {
        Command::On => {
            // Resume the last non-off mode, defaulting to heat.
            let mode = match entity.climate_state() {
                ClimateState::Off => ClimateState::Heat,
                mode => mode,
            };
            client
                .send_command(&entity.id, mode_command(mode), &[])
                .await;
            entity.set_state(mode);
        }
        Command::Off => {
            client.send_command(&entity.id, "off", &[]).await;
            entity.set_state(ClimateState::Off);
        }
        Command::HvacMode => {
            let mode = params
                .and_then(|p| p.get("hvac_mode"))
                .and_then(Value::as_str)
                .and_then(|s| ClimateState::from_str(s).ok());
            if let Some(mode) = mode {
                client
                    .send_command(&entity.id, mode_command(mode), &[])
                    .await;
                entity.set_state(mode);
            }
        }
        Command::TargetTemperature => {
            let Some(raw) = params.and_then(|p| p.get("temperature")) else {
                return StatusCode::Ok;
            };
            let Some(temperature) = as_temperature(raw) else {
                return StatusCode::ServerError;
            };

            match entity.climate_state() {
                ClimateState::Heat => {
                    client
                        .send_command(&entity.id, "setHeatingSetpoint", &[raw.clone()])
                        .await;
                    entity
                        .attributes
                        .insert(ATTR_TARGET_TEMPERATURE_HEAT.to_string(), json!(temperature));
                    entity
                        .attributes
                        .insert(ATTR_TARGET_TEMPERATURE.to_string(), json!(temperature));
                }
                ClimateState::Cool => {
                    client
                        .send_command(&entity.id, "setCoolingSetpoint", &[raw.clone()])
                        .await;
                    entity
                        .attributes
                        .insert(ATTR_TARGET_TEMPERATURE_COOL.to_string(), json!(temperature));
                    entity
                        .attributes
                        .insert(ATTR_TARGET_TEMPERATURE.to_string(), json!(temperature));
                }
                // In auto or off mode, default to the heating setpoint and
                // patch only the generic target.
                ClimateState::Auto | ClimateState::Off => {
                    client
                        .send_command(&entity.id, "setHeatingSetpoint", &[raw.clone()])
                        .await;
                    entity
                        .attributes
                        .insert(ATTR_TARGET_TEMPERATURE.to_string(), json!(temperature));
                }
            }
        }
        Command::TargetTemperatureHeat => {
            return set_specific_setpoint(
                client,
                entity,
                params,
                "setHeatingSetpoint",
                ATTR_TARGET_TEMPERATURE_HEAT,
            )
            .await;
        }
        Command::TargetTemperatureCool => {
            return set_specific_setpoint(
                client,
                entity,
                params,
                "setCoolingSetpoint",
                ATTR_TARGET_TEMPERATURE_COOL,
            )
            .await;
        }
        Command::Toggle => {}
    }

    StatusCode::Ok
}

/// Heat/cool-specific setpoint commands apply regardless of the current mode
/// and patch both the specific and the generic target attribute.
async fn set_specific_setpoint(
    client: &dyn CommandSender,
    entity: &mut Entity,
    params: Option<&Map<String, Value>>,
    hub_command: &str,
    attr: &str,
) -> StatusCode {
    let Some(raw) = params.and_then(|p| p.get("temperature")) else {
        return StatusCode::Ok;
    };
    let Some(temperature) = as_temperature(raw) else {
        return StatusCode::ServerError;
    };

    client
        .send_command(&entity.id, hub_command, &[raw.clone()])
        .await;
    entity
        .attributes
        .insert(attr.to_string(), json!(temperature));
    entity
        .attributes
        .insert(ATTR_TARGET_TEMPERATURE.to_string(), json!(temperature));

    StatusCode::Ok
}

fn mode_command(mode: ClimateState) -> &'static str {
    match mode {
        ClimateState::Off => "off",
        ClimateState::Heat => "heat",
        ClimateState::Cool => "cool",
        ClimateState::Auto => "auto",
    }
}

fn as_temperature(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
