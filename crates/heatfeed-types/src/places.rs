//! Fixed places around the feed region.
//!
//! The background set doubles as the viewer's fallback overlay, so the map
//! never renders empty while the live feed is unavailable.

use crate::point::{GeoPoint, WeightedPoint};

/// Region name sent with `request_data`.
pub const DEFAULT_REGION: &str = "gujarat";

/// Somnath temple, the default point of interest.
pub const SOMNATH: GeoPoint = GeoPoint::new(20.888, 70.4012);

/// Static heat points for the major cities of the region.
pub const BACKGROUND_POINTS: [WeightedPoint; 10] = [
    WeightedPoint(20.888, 70.4012, 0.9),   // Somnath
    WeightedPoint(20.9077, 70.3679, 0.6),  // Veraval
    WeightedPoint(21.5222, 70.4579, 0.5),  // Junagadh
    WeightedPoint(21.6417, 69.6293, 0.4),  // Porbandar
    WeightedPoint(22.2442, 68.9685, 0.7),  // Dwarka
    WeightedPoint(22.3039, 70.8022, 0.6),  // Rajkot
    WeightedPoint(22.4707, 70.0577, 0.4),  // Jamnagar
    WeightedPoint(23.0225, 72.5714, 0.8),  // Ahmedabad
    WeightedPoint(22.3072, 73.1812, 0.5),  // Vadodara
    WeightedPoint(21.1702, 72.8311, 0.7),  // Surat
];

/// The background point set as an owned vector.
pub fn background_points() -> Vec<WeightedPoint> {
    BACKGROUND_POINTS.to_vec()
}
