//! Simulated crowd generator.
//!
//! Pure functions over an injected [`Rng`] so the tick loop stays
//! deterministic under a seeded generator:
//!
//! - [`next_intensity`] advances the point-of-interest intensity while a
//!   gathering is active
//! - [`generate_cluster`] places the center point and its satellites
//! - [`jitter_background`] perturbs the static background set

use heatfeed_types::{GeoPoint, WeightedPoint, clamp_unit};
use rand::Rng;

/// Smallest cluster, reached at intensity `0`.
pub const MIN_CLUSTER_POINTS: usize = 5;

/// Largest cluster, reached at intensity `1`.
pub const MAX_CLUSTER_POINTS: usize = 20;

/// Half-width in degrees of the box satellites are scattered in (~1 km box).
pub const CLUSTER_SPREAD_DEG: f64 = 0.005;

/// Lower bound for intensity while a gathering is active.
pub const GATHERING_FLOOR: f64 = 0.3;

/// Amplitude of the per-tick intensity jitter.
pub const INTENSITY_JITTER: f64 = 0.05;

/// Probability per tick of a surge.
pub const SURGE_PROBABILITY: f64 = 0.1;

/// Intensity added by a surge.
pub const SURGE_BOOST: f64 = 0.2;

/// Amplitude of the background jitter.
pub const BACKGROUND_JITTER: f64 = 0.05;

/// Lower bound for background intensities.
pub const BACKGROUND_FLOOR: f64 = 0.1;

/// Compute the next intensity for an active gathering.
///
/// `base = min(1, 0.5 + (tick / 100) * 0.5)`, perturbed by uniform jitter
/// in `[-0.05, 0.05)` and floored at `0.3`. With probability `0.1` a surge
/// adds `0.2`. The result is always in `[0, 1]`.
pub fn next_intensity<R: Rng>(tick: u64, rng: &mut R) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let progress = tick as f64 / 100.0;
    let base = 0.5_f64.mul_add(progress, 0.5).min(1.0);
    let jitter = rng.random_range(-INTENSITY_JITTER..INTENSITY_JITTER);
    let mut intensity = clamp_unit((base + jitter).max(GATHERING_FLOOR));
    if rng.random_bool(SURGE_PROBABILITY) {
        intensity = clamp_unit(intensity + SURGE_BOOST);
    }
    intensity
}

/// Number of points in a cluster of the given intensity, center included.
pub fn cluster_size(intensity: f64) -> usize {
    let extra = (clamp_unit(intensity) * 15.0).round();
    // `extra` is a whole number in [0, 15].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let extra = extra as usize;
    MIN_CLUSTER_POINTS
        .saturating_add(extra)
        .min(MAX_CLUSTER_POINTS)
}

/// Generate the point-of-interest cluster.
///
/// The first point is always `center` carrying exactly `intensity`.
/// Satellites sit at uniform offsets within [`CLUSTER_SPREAD_DEG`] of the
/// center and carry `min(1, intensity * (0.7 + 0.3 * rand))`.
pub fn generate_cluster<R: Rng>(
    center: GeoPoint,
    intensity: f64,
    rng: &mut R,
) -> Vec<WeightedPoint> {
    let intensity = clamp_unit(intensity);
    let total = cluster_size(intensity);
    let mut points = Vec::with_capacity(total);
    points.push(center.weighted(intensity));

    for _ in 1..total {
        let lat = center.lat + rng.random_range(-CLUSTER_SPREAD_DEG..CLUSTER_SPREAD_DEG);
        let lng = center.lng + rng.random_range(-CLUSTER_SPREAD_DEG..CLUSTER_SPREAD_DEG);
        let weight = intensity * 0.3_f64.mul_add(rng.random::<f64>(), 0.7);
        points.push(WeightedPoint::new(lat, lng, weight));
    }

    points
}

/// Jitter every background point by up to ±[`BACKGROUND_JITTER`] around its
/// base value, floored at [`BACKGROUND_FLOOR`] and capped at `1`.
pub fn jitter_background<R: Rng>(
    base: &[WeightedPoint],
    rng: &mut R,
) -> Vec<WeightedPoint> {
    base.iter()
        .map(|point| {
            let delta = rng.random_range(-BACKGROUND_JITTER..=BACKGROUND_JITTER);
            let intensity = (point.intensity() + delta).max(BACKGROUND_FLOOR);
            WeightedPoint::new(point.lat(), point.lng(), intensity)
        })
        .collect()
}

/// Whether `point` lies inside the cluster box around `center`.
pub fn within_cluster(center: GeoPoint, point: &WeightedPoint) -> bool {
    (point.lat() - center.lat).abs() <= CLUSTER_SPREAD_DEG
        && (point.lng() - center.lng).abs() <= CLUSTER_SPREAD_DEG
}

#[cfg(test)]
mod tests {
    use heatfeed_types::{SOMNATH, background_points};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn full_intensity_cluster_has_exact_center() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let cluster = generate_cluster(SOMNATH, 1.0, &mut rng);
            assert!(cluster.contains(&WeightedPoint(SOMNATH.lat, SOMNATH.lng, 1.0)));
            assert!((MIN_CLUSTER_POINTS..=MAX_CLUSTER_POINTS).contains(&cluster.len()));
        }
    }

    #[test]
    fn cluster_size_scales_with_intensity() {
        assert_eq!(cluster_size(0.0), 5);
        assert_eq!(cluster_size(1.0), 20);
        assert_eq!(cluster_size(7.0), 20);
        assert_eq!(cluster_size(-1.0), 5);
        assert!(cluster_size(0.5) > cluster_size(0.1));
    }

    #[test]
    fn satellites_stay_in_box_and_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let cluster = generate_cluster(SOMNATH, 0.8, &mut rng);
        for point in &cluster {
            assert!(within_cluster(SOMNATH, point));
            assert!(point.intensity() <= 0.8 + f64::EPSILON);
            assert!(point.intensity() >= 0.8 * 0.7 - f64::EPSILON);
        }
    }

    #[test]
    fn next_intensity_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for tick in 0..500 {
            let value = next_intensity(tick, &mut rng);
            assert!((GATHERING_FLOOR..=1.0).contains(&value), "tick {tick}: {value}");
        }
    }

    #[test]
    fn next_intensity_trends_upward() {
        let mut rng = StdRng::seed_from_u64(5);
        // Past tick 100 the base is pinned at 1.0; only jitter pulls it down.
        for tick in 100..200 {
            assert!(next_intensity(tick, &mut rng) >= 1.0 - INTENSITY_JITTER - f64::EPSILON);
        }
    }

    #[test]
    fn background_jitter_is_bounded() {
        let base = background_points();
        let mut rng = StdRng::seed_from_u64(9);
        let jittered = jitter_background(&base, &mut rng);
        assert_eq!(jittered.len(), base.len());
        for (before, after) in base.iter().zip(&jittered) {
            assert_eq!(before.location(), after.location());
            assert!(after.intensity() >= BACKGROUND_FLOOR);
            assert!(after.intensity() <= 1.0);
            assert!((after.intensity() - before.intensity()).abs() <= BACKGROUND_JITTER + 1e-9);
        }
    }
}
