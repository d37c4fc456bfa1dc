//! Classification of inbound feed messages.
//!
//! The viewer accepts several payload shapes, tried in precedence order:
//!
//! 1. `{"type": "full_update", "data": [...]}`
//! 2. `{"type": "heatmap_update", "data": [...]}`
//! 3. a bare array of points
//! 4. nested data: `{"data": [...]}`, `{"data": {"points": [...]}}` or
//!    `{"kind": "full" | "incremental", "points": [...]}`
//!
//! Every shape normalizes to the same `Vec<WeightedPoint>`. Incremental
//! payloads still replace the overlay wholesale.

use heatfeed_types::WeightedPoint;
use serde_json::Value;

use crate::error::ViewerError;

/// The payload shape a message was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageShape {
    /// Tagged `full_update`.
    FullUpdate,
    /// Tagged `heatmap_update`.
    HeatmapUpdate,
    /// A bare array of points.
    BareArray,
    /// Points nested under `data`, `data.points` or `points`.
    NestedData,
}

/// A recognized message and its normalized points.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUpdate {
    /// Which shape matched.
    pub shape: MessageShape,
    /// The normalized points.
    pub points: Vec<WeightedPoint>,
}

/// Parse and classify a text frame.
///
/// # Errors
///
/// Returns [`ViewerError::MalformedMessage`] if the text is not JSON, no
/// shape matches, or the matched array is not a list of
/// `[lat, lng, intensity]` triples.
pub fn parse_update(text: &str) -> Result<ParsedUpdate, ViewerError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ViewerError::MalformedMessage(format!("invalid JSON: {e}")))?;

    let (shape, raw) = classify(&value).ok_or_else(|| {
        ViewerError::MalformedMessage("unrecognized message shape".to_owned())
    })?;

    let points = normalize(raw)?;
    Ok(ParsedUpdate { shape, points })
}

/// Find the point array in `value`, respecting shape precedence.
pub fn classify(value: &Value) -> Option<(MessageShape, &Value)> {
    let tagged_data = |tag: &str| {
        value
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| *t == tag)
            .and_then(|_| value.get("data"))
            .filter(|d| d.is_array())
    };

    if let Some(data) = tagged_data("full_update") {
        return Some((MessageShape::FullUpdate, data));
    }
    if let Some(data) = tagged_data("heatmap_update") {
        return Some((MessageShape::HeatmapUpdate, data));
    }
    if value.is_array() {
        return Some((MessageShape::BareArray, value));
    }
    nested_points(value).map(|points| (MessageShape::NestedData, points))
}

fn nested_points(value: &Value) -> Option<&Value> {
    let object = value.as_object()?;

    if let Some(data) = object.get("data") {
        if data.is_array() {
            return Some(data);
        }
        if let Some(points) = data.get("points").filter(|p| p.is_array()) {
            return Some(points);
        }
    }

    let kind = object.get("kind").and_then(Value::as_str)?;
    if kind == "full" || kind == "incremental" {
        return object.get("points").filter(|p| p.is_array());
    }
    None
}

fn normalize(raw: &Value) -> Result<Vec<WeightedPoint>, ViewerError> {
    let points: Vec<WeightedPoint> = serde_json::from_value(raw.clone())
        .map_err(|e| ViewerError::MalformedMessage(format!("bad point list: {e}")))?;
    Ok(points
        .into_iter()
        .map(|p| WeightedPoint::new(p.lat(), p.lng(), p.intensity()))
        .collect())
}
