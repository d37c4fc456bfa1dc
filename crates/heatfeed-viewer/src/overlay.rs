//! The rendering surface the overlay sync draws into.
//!
//! Map creation, tile layers, markers and pointer events belong to the
//! rendering library and stay behind [`OverlaySurface`]. The sync only needs
//! to know the surface can be mounted and that its heat overlay can be
//! replaced.

use heatfeed_types::WeightedPoint;
use tracing::debug;

use crate::error::ViewerError;

/// A surface with a single replaceable heat overlay.
pub trait OverlaySurface {
    /// Prepare the surface for drawing.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::ContainerMissing`] if there is nothing to
    /// render into.
    fn mount(&mut self) -> Result<(), ViewerError> {
        Ok(())
    }

    /// Replace the overlay's entire point set.
    fn replace_overlay(&mut self, points: Vec<WeightedPoint>);
}

/// In-memory heat layer.
///
/// Holds the last point set it was given and counts replacements. Used by
/// the headless viewer and by tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatLayer {
    points: Vec<WeightedPoint>,
    replacements: u64,
}

impl HeatLayer {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current point set.
    pub fn points(&self) -> &[WeightedPoint] {
        &self.points
    }

    /// How many times the overlay has been replaced.
    pub const fn replacements(&self) -> u64 {
        self.replacements
    }

    /// The highest intensity in the current set.
    pub fn peak_intensity(&self) -> Option<f64> {
        self.points
            .iter()
            .map(WeightedPoint::intensity)
            .reduce(f64::max)
    }
}

impl OverlaySurface for HeatLayer {
    fn replace_overlay(&mut self, points: Vec<WeightedPoint>) {
        self.points = points;
        self.replacements = self.replacements.saturating_add(1);
        debug!(
            points = self.points.len(),
            peak = self.peak_intensity().unwrap_or(0.0),
            "overlay replaced"
        );
    }
}

impl<S: OverlaySurface + ?Sized> OverlaySurface for &mut S {
    fn mount(&mut self) -> Result<(), ViewerError> {
        (**self).mount()
    }

    fn replace_overlay(&mut self, points: Vec<WeightedPoint>) {
        (**self).replace_overlay(points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_is_wholesale() {
        let mut layer = HeatLayer::new();
        layer.replace_overlay(vec![
            WeightedPoint::new(1.0, 1.0, 0.2),
            WeightedPoint::new(2.0, 2.0, 0.4),
        ]);
        layer.replace_overlay(vec![WeightedPoint::new(3.0, 3.0, 0.9)]);
        assert_eq!(layer.points(), &[WeightedPoint::new(3.0, 3.0, 0.9)]);
        assert_eq!(layer.replacements(), 2);
    }

    #[test]
    fn peak_of_empty_layer() {
        assert_eq!(HeatLayer::new().peak_intensity(), None);
    }
}
