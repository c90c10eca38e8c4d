//! JSON text frames exchanged with the simulation server.
//!
//! Every frame is an object carrying a string `type`. Outbound frames are
//! built from a type plus a flat payload; inbound frames are split into the
//! type and the remaining fields before dispatch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::state::Snapshot;

/// Handler key that receives every inbound frame.
pub const WILDCARD: &str = "*";
/// Local event emitted on socket errors and failed connects.
pub const ERROR_EVENT: &str = "error";
/// Local event emitted when an open link closes.
pub const DISCONNECT_EVENT: &str = "disconnect";
pub const RECONNECTING_EVENT: &str = "reconnecting";

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Pause,
    Resume,
    Stop,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Stop => "stop",
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlAction {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pause" => Ok(ControlAction::Pause),
            "resume" => Ok(ControlAction::Resume),
            "stop" => Ok(ControlAction::Stop),
            other => Err(Error::Cli(format!(
                "unknown control action '{}' (expected pause, resume or stop)",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    Ping,
    RequestPositions,
    SimulationEvent {
        event_type: String,
        rake_id: String,
        details: Map<String, Value>,
    },
    SimulationControl {
        action: ControlAction,
    },
}

impl ClientMessage {
    pub fn message_type(&self) -> &'static str {
        match self {
            ClientMessage::Ping => "ping",
            ClientMessage::RequestPositions => "request_positions",
            ClientMessage::SimulationEvent { .. } => "simulation_event",
            ClientMessage::SimulationControl { .. } => "simulation_control",
        }
    }

    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        match self {
            ClientMessage::Ping | ClientMessage::RequestPositions => {}
            ClientMessage::SimulationEvent {
                event_type,
                rake_id,
                details,
            } => {
                payload.extend(details.clone());
                payload.insert("eventType".to_string(), json!(event_type));
                payload.insert("rakeId".to_string(), json!(rake_id));
            }
            ClientMessage::SimulationControl { action } => {
                payload.insert("action".to_string(), json!(action.as_str()));
            }
        }
        payload
    }

    pub fn encode(&self) -> String {
        encode(self.message_type(), self.payload())
    }
}

/// Serializes `{type, ...payload}`; the explicit type wins over a `type` key
/// inside the payload.
pub fn encode(message_type: &str, mut payload: Map<String, Value>) -> String {
    payload.insert("type".to_string(), json!(message_type));
    Value::Object(payload).to_string()
}

/// An inbound frame split for dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub message_type: String,
    /// The frame as received, `type` included.
    pub message: Value,
    /// The frame without its `type` key.
    pub payload: Value,
}

impl Envelope {
    pub fn parse(text: &str) -> Result<Self> {
        let message: Value =
            serde_json::from_str(text).map_err(|err| Error::MalformedFrame(err.to_string()))?;
        Self::from_value(message)
    }

    pub fn from_value(message: Value) -> Result<Self> {
        let Value::Object(fields) = &message else {
            return Err(Error::MalformedFrame("frame is not an object".to_string()));
        };
        let Some(Value::String(message_type)) = fields.get("type") else {
            return Err(Error::MalformedFrame("missing string 'type'".to_string()));
        };
        let message_type = message_type.clone();
        let mut payload = fields.clone();
        payload.remove("type");

        Ok(Self {
            message_type,
            message,
            payload: Value::Object(payload),
        })
    }
}

/// Typed view of the frames the server is known to send.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SimulationUpdate { rakes: Vec<Value> },
    SimulationError { message: String },
    SimulationStatus { is_running: bool, speed: f64 },
    Reconnecting,
    Error { message: String },
    Pong,
}

impl ServerMessage {
    /// Decodes a full frame; `None` when the type is unknown or the shape
    /// does not match.
    pub fn decode(message: &Value) -> Option<Self> {
        serde_json::from_value(message.clone()).ok()
    }

    pub fn update(snapshot: &Snapshot) -> Self {
        let rakes = snapshot
            .rakes
            .iter()
            .filter_map(|rake| serde_json::to_value(rake).ok())
            .collect();
        ServerMessage::SimulationUpdate { rakes }
    }

    pub fn status(snapshot: &Snapshot) -> Self {
        ServerMessage::SimulationStatus {
            is_running: snapshot.is_running && !snapshot.is_paused,
            speed: snapshot.speed,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_event_flattens_details() {
        let mut details = Map::new();
        details.insert("station".to_string(), json!("Bokaro"));
        let message = ClientMessage::SimulationEvent {
            event_type: "arrival".to_string(),
            rake_id: "R-01".to_string(),
            details,
        };

        let frame: Value = serde_json::from_str(&message.encode()).unwrap();
        assert_eq!(
            frame,
            json!({
                "type": "simulation_event",
                "eventType": "arrival",
                "rakeId": "R-01",
                "station": "Bokaro",
            })
        );
    }

    #[test]
    fn explicit_type_overrides_payload_type() {
        let mut payload = Map::new();
        payload.insert("type".to_string(), json!("spoofed"));
        payload.insert("action".to_string(), json!("pause"));

        let frame: Value = serde_json::from_str(&encode("simulation_control", payload)).unwrap();
        assert_eq!(frame, json!({"type": "simulation_control", "action": "pause"}));
        assert_eq!(
            ClientMessage::Ping.encode(),
            r#"{"type":"ping"}"#.to_string()
        );
    }

    #[test]
    fn envelope_strips_type_from_payload() {
        let envelope = Envelope::parse(r#"{"type":"simulation_update","rakes":[]}"#).unwrap();
        assert_eq!(envelope.message_type, "simulation_update");
        assert_eq!(envelope.payload, json!({"rakes": []}));
        assert_eq!(envelope.message["type"], json!("simulation_update"));
    }

    #[test]
    fn envelope_rejects_malformed_frames() {
        for text in ["not json", "[1,2]", r#"{"rakes":[]}"#, r#"{"type":7}"#] {
            assert!(
                matches!(Envelope::parse(text), Err(Error::MalformedFrame(_))),
                "accepted {}",
                text
            );
        }
    }

    #[test]
    fn server_messages_decode_by_shape() {
        assert_eq!(
            ServerMessage::decode(&json!({"type": "simulation_status", "is_running": true, "speed": 2.0})),
            Some(ServerMessage::SimulationStatus {
                is_running: true,
                speed: 2.0
            })
        );
        assert_eq!(
            ServerMessage::decode(&json!({"type": "pong", "timestamp": 5})),
            Some(ServerMessage::Pong)
        );
        assert_eq!(
            ServerMessage::decode(&json!({"type": "simulation_error"})),
            None
        );
        assert_eq!(ServerMessage::decode(&json!({"type": "custom"})), None);
    }

    #[test]
    fn snapshot_maps_to_update_and_status_frames() {
        let mut config = crate::models::SimConfig::default();
        config.rake_count = 2;
        let mut engine = crate::engine::SimulationEngine::from_config(config).unwrap();
        engine.start();
        engine.pause();
        let snapshot = engine.snapshot();

        let update = ServerMessage::update(&snapshot).to_value();
        assert_eq!(update["type"], "simulation_update");
        assert_eq!(update["rakes"][1]["id"], "R-02");
        assert_eq!(update["rakes"][0]["status"], "available");

        assert_eq!(
            ServerMessage::status(&snapshot),
            ServerMessage::SimulationStatus {
                is_running: false,
                speed: 1.0
            }
        );
    }

    #[test]
    fn control_actions_parse() {
        assert_eq!("resume".parse::<ControlAction>().unwrap(), ControlAction::Resume);
        assert!("rewind".parse::<ControlAction>().is_err());
    }
}
