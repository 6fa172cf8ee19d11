//! The Track Builder.
//!
//! Turns a sparse, timestamped sample sequence into a dense, evenly sampled
//! 3D curve plus the matching dense time index. Derived arrays are built once
//! and never change; only the playback state (`cursor_index`, `reveal_length`,
//! `elapsed`, `visible`) is mutated afterwards, by the Playback Clock.

use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;

use crate::config::TrackParams;
use crate::error::{KillcamError, Result};
use crate::spline::{parameters, CatmullRomCurve, MonotoneCubic};
use crate::types::Sample;

/// Steps shorter than this have no usable direction.
const MIN_STEP: f64 = 1e-9;

/// Dense path and playback state of one entity.
///
/// Only built through [`build_track`], so the derived arrays always have
/// equal, non-zero length. Serializable for inspection, never deserialized.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    curve_points: Vec<Vector3<f64>>,
    look_points: Vec<Vector3<f64>>,
    time_steps: Vec<f64>,
    orientations: Vec<UnitQuaternion<f64>>,

    /// Loop start
    pub(crate) min_time: f64,
    /// Loop end
    pub(crate) max_time: f64,

    pub(crate) cursor_index: usize,
    pub(crate) reveal_length: usize,
    pub(crate) elapsed: f64,
    pub(crate) visible: bool,
}

/// Builds a track from samples.
///
/// See [`build_entity_track`]; the entity is reported as `unnamed`.
pub fn build_track(samples: &[Sample], params: &TrackParams) -> Result<Track> {
    build_entity_track("unnamed", samples, params)
}

/// Builds the track of the entity called `entity`.
///
/// # Arguments
/// * `entity` - Label used in errors
/// * `samples` - Time-ordered samples, at least two
/// * `params` - Oversampling factor, lookahead distance and curve type
///
/// # Errors
/// * `InsufficientSamples` for fewer than two samples
/// * `InvalidConfig` for an oversample of 0 or a non-positive lookahead
pub fn build_entity_track(entity: &str, samples: &[Sample], params: &TrackParams) -> Result<Track> {
    params.validate()?;

    let insufficient = || KillcamError::InsufficientSamples {
        entity: entity.to_string(),
        count: samples.len(),
    };

    let positions: Vec<Vector3<f64>> = samples.iter().map(|s| s.position).collect();
    let times: Vec<f64> = samples.iter().map(|s| s.time).collect();
    let curve = CatmullRomCurve::new(positions, params.curve_type).ok_or_else(insufficient)?;
    let time_curve = MonotoneCubic::new(times).ok_or_else(insufficient)?;

    let count = samples.len() * params.oversample;

    let curve_points = curve.sample(count);
    let look_points = look_points(&curve_points, params.lookahead_distance);

    // Running max absorbs rounding noise at segment joints
    let mut time_steps = time_curve.sample(count);
    for i in 1..time_steps.len() {
        if time_steps[i] < time_steps[i - 1] {
            time_steps[i] = time_steps[i - 1];
        }
    }

    let last_sample = samples.len() - 1;
    let orientations = parameters(count)
        .map(|t| {
            let owner = ((last_sample as f64 * t).floor() as usize).min(last_sample);
            samples[owner].orientation()
        })
        .collect();

    let min_time = time_steps[0];
    let max_time = time_steps[count - 1];

    Ok(Track {
        curve_points,
        look_points,
        time_steps,
        orientations,
        min_time,
        max_time,
        cursor_index: 0,
        reveal_length: 0,
        elapsed: min_time,
        visible: false,
    })
}

/// Look points one `distance` back along each curve step.
///
/// A zero-length step borrows the nearest earlier direction, failing that
/// the nearest later one; a curve with no direction at all looks along +X.
fn look_points(curve: &[Vector3<f64>], distance: f64) -> Vec<Vector3<f64>> {
    let n = curve.len();
    let mut directions: Vec<Option<Vector3<f64>>> = curve
        .windows(2)
        .map(|w| (w[0] - w[1]).try_normalize(MIN_STEP))
        .collect();

    let mut carry = None;
    for dir in directions.iter_mut() {
        match dir {
            Some(d) => carry = Some(*d),
            None => *dir = carry,
        }
    }
    let first_valid = directions.iter().flatten().next().copied();
    let fallback = first_valid.unwrap_or_else(Vector3::x);

    let mut points: Vec<Vector3<f64>> = curve
        .iter()
        .zip(&directions)
        .map(|(p, dir)| p + dir.unwrap_or(fallback) * distance)
        .collect();

    if let Some(&previous) = points.last() {
        points.push(previous);
    }
    debug_assert_eq!(points.len(), n);
    points
}

impl Track {
    /// Number of dense points.
    pub fn len(&self) -> usize {
        self.curve_points.len()
    }

    /// Always false for a built track.
    pub fn is_empty(&self) -> bool {
        self.curve_points.is_empty()
    }

    pub fn curve_points(&self) -> &[Vector3<f64>] {
        &self.curve_points
    }

    pub fn look_points(&self) -> &[Vector3<f64>] {
        &self.look_points
    }

    pub fn time_steps(&self) -> &[f64] {
        &self.time_steps
    }

    pub fn orientations(&self) -> &[UnitQuaternion<f64>] {
        &self.orientations
    }

    pub fn cursor_index(&self) -> usize {
        self.cursor_index
    }

    pub fn reveal_length(&self) -> usize {
        self.reveal_length
    }

    /// Seconds of replay time played so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Whether the entity has started moving in the current loop.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn min_time(&self) -> f64 {
        self.min_time
    }

    pub fn max_time(&self) -> f64 {
        self.max_time
    }

    /// Replaces the loop bounds, typically with the replay-wide ones.
    pub fn with_loop_bounds(mut self, min_time: f64, max_time: f64) -> Self {
        self.min_time = min_time;
        self.max_time = max_time;
        self
    }

    /// Position at the cursor.
    pub fn position(&self) -> Vector3<f64> {
        self.curve_points[self.cursor_index]
    }

    /// Look point at the cursor.
    pub fn look_point(&self) -> Vector3<f64> {
        self.look_points[self.cursor_index]
    }

    /// Orientation at the cursor.
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientations[self.cursor_index]
    }

    /// Last point of the curve.
    pub fn final_position(&self) -> Vector3<f64> {
        self.curve_points[self.len() - 1]
    }

    /// Fraction of the track played, in `[0, 1)`.
    pub fn progress(&self) -> f64 {
        self.cursor_index as f64 / self.len() as f64
    }

    /// Size of the full trailing-ribbon draw range for `stride` vertices per point.
    pub fn ribbon_index_count(&self, stride: usize) -> usize {
        (self.len() - 1) * stride
    }

    /// Back to the state right after construction.
    pub fn reset_to_start(&mut self) {
        self.cursor_index = 0;
        self.reveal_length = 0;
        self.elapsed = self.time_steps.first().copied().unwrap_or(self.min_time);
        self.visible = false;
    }

    /// A track with no points, which `build_track` never produces.
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self {
            curve_points: Vec::new(),
            look_points: Vec::new(),
            time_steps: Vec::new(),
            orientations: Vec::new(),
            min_time: 0.0,
            max_time: 10.0,
            cursor_index: 0,
            reveal_length: 0,
            elapsed: 0.0,
            visible: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::CurveType;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn straight(times: &[f64]) -> Vec<Sample> {
        times
            .iter()
            .enumerate()
            .map(|(i, &t)| Sample::new(Vector3::new(0.0, 0.0, 500.0 * i as f64), t))
            .collect()
    }

    #[test]
    fn test_build_straight_track() {
        let track = build_track(&straight(&[0.0, 5.0, 10.0]), &TrackParams::default()).unwrap();

        assert_eq!(track.len(), 9);
        assert_eq!(track.look_points().len(), 9);
        assert_eq!(track.time_steps().len(), 9);
        assert_eq!(track.orientations().len(), 9);

        assert_eq!(track.time_steps()[0], 0.0);
        assert_relative_eq!(track.time_steps()[8], 10.0, epsilon = 1e-9);
        assert_relative_eq!(track.curve_points()[4].z, 500.0, epsilon = 1e-9);

        assert_eq!(track.cursor_index(), 0);
        assert_eq!(track.elapsed(), 0.0);
        assert!(!track.is_visible());
    }

    #[test]
    fn test_look_points_trail_the_motion() {
        let track = build_track(&straight(&[0.0, 5.0, 10.0]), &TrackParams::default()).unwrap();
        // Moving along +Z, so look points sit 10 units behind
        assert_relative_eq!(
            track.look_points()[0],
            Vector3::new(0.0, 0.0, -10.0),
            epsilon = 1e-9
        );
        assert_eq!(track.look_points()[8], track.look_points()[7]);
    }

    #[test]
    fn test_single_sample_is_insufficient() {
        let err = build_entity_track("weapon", &straight(&[0.0]), &TrackParams::default())
            .unwrap_err();
        match err {
            KillcamError::InsufficientSamples { entity, count } => {
                assert_eq!(entity, "weapon");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(build_track(&[], &TrackParams::default()).is_err());
    }

    #[test]
    fn test_invalid_params() {
        let params = TrackParams {
            oversample: 0,
            ..TrackParams::default()
        };
        assert!(matches!(
            build_track(&straight(&[0.0, 1.0]), &params),
            Err(KillcamError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_stationary_entity_keeps_lookahead_distance() {
        let samples: Vec<Sample> = [0.0, 5.0, 10.0]
            .iter()
            .map(|&t| Sample::new(Vector3::new(0.0, 0.0, 1500.0), t))
            .collect();
        let track = build_track(&samples, &TrackParams::default()).unwrap();
        for i in 0..track.len() - 1 {
            let d = (track.look_points()[i] - track.curve_points()[i]).norm();
            assert_relative_eq!(d, 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_pause_in_recording_reuses_direction() {
        let samples = vec![
            Sample::new(Vector3::new(0.0, 0.0, 0.0), 0.0),
            Sample::new(Vector3::new(100.0, 0.0, 0.0), 1.0),
            Sample::new(Vector3::new(100.0, 0.0, 0.0), 2.0),
            Sample::new(Vector3::new(100.0, 0.0, 0.0), 3.0),
        ];
        let params = TrackParams {
            curve_type: CurveType::Uniform,
            ..TrackParams::default()
        };
        let track = build_track(&samples, &params).unwrap();
        for i in 0..track.len() - 1 {
            let d = (track.look_points()[i] - track.curve_points()[i]).norm();
            assert_relative_eq!(d, 10.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_orientation_follows_segment_start() {
        let samples = vec![
            Sample::with_rotation(Vector3::zeros(), [0.0, 0.0, 0.0], 0.0),
            Sample::with_rotation(Vector3::new(0.0, 0.0, 10.0), [0.0, 0.0, 90.0], 1.0),
        ];
        let track = build_track(&samples, &TrackParams::default()).unwrap();
        assert_eq!(track.len(), 6);
        assert_relative_eq!(track.orientations()[0].angle(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(track.orientations()[4].angle(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(
            track.orientations()[5].angle(),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_loop_bounds_and_ribbon() {
        let track = build_track(&straight(&[2.0, 5.0, 9.9]), &TrackParams::default())
            .unwrap()
            .with_loop_bounds(0.0, 10.0);
        assert_eq!(track.min_time(), 0.0);
        assert_eq!(track.max_time(), 10.0);
        assert_eq!(track.elapsed(), 2.0);
        assert_eq!(track.ribbon_index_count(6), 48);
    }

    fn arb_samples() -> impl Strategy<Value = Vec<Sample>> {
        prop::collection::vec(
            ((-5000.0f64..5000.0, -500.0f64..500.0, -5000.0f64..5000.0), 0.0f64..3.0),
            2..12,
        )
        .prop_map(|raw| {
            let mut t = 0.0;
            raw.into_iter()
                .map(|((x, y, z), dt)| {
                    t += dt;
                    Sample::new(Vector3::new(x, y, z), t)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_track_lengths_and_time_order(
            samples in arb_samples(),
            oversample in 1usize..6,
        ) {
            let params = TrackParams { oversample, ..TrackParams::default() };
            let track = build_track(&samples, &params).unwrap();

            let expected = samples.len() * oversample;
            prop_assert_eq!(track.curve_points().len(), expected);
            prop_assert_eq!(track.look_points().len(), expected);
            prop_assert_eq!(track.time_steps().len(), expected);
            prop_assert_eq!(track.time_steps()[0], samples[0].time);
            for w in track.time_steps().windows(2) {
                prop_assert!(w[1] >= w[0]);
            }
        }

        #[test]
        fn prop_look_points_at_lookahead_distance(
            samples in arb_samples(),
            distance in 0.5f64..50.0,
        ) {
            let params = TrackParams { lookahead_distance: distance, ..TrackParams::default() };
            let track = build_track(&samples, &params).unwrap();
            let n = track.len();
            for i in 0..n - 1 {
                let d = (track.look_points()[i] - track.curve_points()[i]).norm();
                prop_assert!((d - distance).abs() < 1e-6 * distance.max(1.0));
            }
            prop_assert_eq!(track.look_points()[n - 1], track.look_points()[n - 2]);
        }
    }
}
