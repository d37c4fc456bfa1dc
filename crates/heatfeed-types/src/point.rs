//! Geographic points and weighted heat points.
//!
//! A [`WeightedPoint`] travels over the wire as a bare JSON triple
//! `[lat, lng, intensity]`, which is the shape heat-layer renderers accept
//! directly. Points carry no identity: a full set replaces whatever was
//! rendered before.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new geographic point.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Attach an intensity to this location.
    pub fn weighted(self, intensity: f64) -> WeightedPoint {
        WeightedPoint::new(self.lat, self.lng, intensity)
    }
}

/// A single heat point: `(latitude, longitude, intensity)`.
///
/// Intensity is kept in `[0, 1]`; [`WeightedPoint::new`] clamps its input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WeightedPoint(pub f64, pub f64, pub f64);

impl WeightedPoint {
    /// Create a point, clamping `intensity` into `[0, 1]`.
    pub fn new(lat: f64, lng: f64, intensity: f64) -> Self {
        Self(lat, lng, clamp_unit(intensity))
    }

    /// Latitude in decimal degrees.
    pub const fn lat(&self) -> f64 {
        self.0
    }

    /// Longitude in decimal degrees.
    pub const fn lng(&self) -> f64 {
        self.1
    }

    /// Heat intensity in `[0, 1]`.
    pub const fn intensity(&self) -> f64 {
        self.2
    }

    /// The location of this point without its weight.
    pub const fn location(&self) -> GeoPoint {
        GeoPoint::new(self.0, self.1)
    }
}

/// Clamp a value into `[0, 1]`. `NaN` maps to `0`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
