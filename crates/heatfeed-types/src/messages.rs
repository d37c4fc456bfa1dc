//! Messages exchanged over the heat-map `WebSocket`.
//!
//! Both directions use internally tagged JSON objects with a `type` field:
//!
//! | Direction | `type` | Payload |
//! |-----------|--------|---------|
//! | server -> viewer | `full_update` | `data`, optional `message` |
//! | server -> viewer | `heatmap_update` | `data`, `timestamp`, `somnathIntensity`, `crowdCount`, `tick` |
//! | viewer -> server | `request_data` | `region` |
//! | viewer -> server | `set_crowd_intensity` | `intensity` |
//! | viewer -> server | `toggle_gathering` | `active` |

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::places::DEFAULT_REGION;
use crate::point::WeightedPoint;

/// A message pushed from the feed server to its viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The complete current point set, sent on connect and on request.
    FullUpdate {
        /// Every point currently in the feed.
        data: Vec<WeightedPoint>,
        /// Optional human-readable note.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        message: Option<String>,
    },
    /// The point set produced by a periodic tick.
    HeatmapUpdate {
        /// Every point in the feed after this tick.
        data: Vec<WeightedPoint>,
        /// RFC 3339 timestamp of the tick.
        timestamp: String,
        /// Point-of-interest intensity, formatted with two decimals.
        #[serde(rename = "somnathIntensity")]
        somnath_intensity: String,
        /// Estimated crowd size, `floor(intensity * 1000)`.
        #[serde(rename = "crowdCount")]
        crowd_count: u64,
        /// Value of the feed's update counter for this tick.
        #[serde(default)]
        tick: u64,
    },
}

impl ServerMessage {
    /// The points carried by this message.
    pub fn points(&self) -> &[WeightedPoint] {
        match self {
            Self::FullUpdate { data, .. } | Self::HeatmapUpdate { data, .. } => data,
        }
    }
}

/// A message sent from a viewer to the feed server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the full current point set.
    RequestData {
        /// Region of interest (informational).
        #[serde(default = "default_region")]
        region: String,
    },
    /// Override the point-of-interest intensity. Clamped to `[0, 1]`.
    SetCrowdIntensity {
        /// Requested intensity.
        intensity: f64,
    },
    /// Turn the simulated gathering on or off.
    ToggleGathering {
        /// Whether the gathering is active.
        active: bool,
    },
}

impl ClientMessage {
    /// A `request_data` message for the given region.
    pub fn request_data(region: impl Into<String>) -> Self {
        Self::RequestData {
            region: region.into(),
        }
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn heatmap_update_uses_camel_case_fields() {
        let msg = ServerMessage::HeatmapUpdate {
            data: vec![WeightedPoint::new(20.888, 70.4012, 0.5)],
            timestamp: "2026-01-01T00:00:00.000Z".to_owned(),
            somnath_intensity: "0.50".to_owned(),
            crowd_count: 500,
            tick: 7,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "heatmap_update");
        assert_eq!(value["somnathIntensity"], "0.50");
        assert_eq!(value["crowdCount"], 500);
        assert_eq!(value["data"][0], json!([20.888, 70.4012, 0.5]));
    }

    #[test]
    fn full_update_omits_missing_message() {
        let msg = ServerMessage::FullUpdate {
            data: Vec::new(),
            message: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "full_update", "data": []}));
    }

    #[test]
    fn client_messages_parse() {
        let set: ClientMessage =
            serde_json::from_str(r#"{"type":"set_crowd_intensity","intensity":2.5}"#).unwrap();
        assert!(matches!(set, ClientMessage::SetCrowdIntensity { intensity } if intensity > 2.0));

        let toggle: ClientMessage =
            serde_json::from_str(r#"{"type":"toggle_gathering","active":false}"#).unwrap();
        assert_eq!(toggle, ClientMessage::ToggleGathering { active: false });
    }

    #[test]
    fn request_data_region_defaults() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"request_data"}"#).unwrap();
        assert_eq!(msg, ClientMessage::request_data(DEFAULT_REGION));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"type":"reboot"}"#);
        assert!(result.is_err());
    }
}
