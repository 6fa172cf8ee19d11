//! Curve math for the Track Builder.
//!
//! Two interpolants share one parameterization: an open Catmull-Rom curve
//! through the raw positions, and a monotone cubic (PCHIP) through the raw
//! timestamps. Both map a global parameter `t ∈ [0, 1]` onto segment
//! `floor((n - 1) * t)`, so dense index `i` of the position curve and dense
//! index `i` of the time curve describe the same instant.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Knot spacing used by the Catmull-Rom curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveType {
    /// Knot spacing |Δp|^0.5; no cusps or self-intersections within a segment
    #[default]
    Centripetal,
    /// Knot spacing |Δp|
    Chordal,
    /// Equal knot spacing, tension 0.5
    Uniform,
}

/// Below this knot spacing a segment is treated as degenerate.
const MIN_KNOT_SPACING: f64 = 1e-4;

/// Maps a global parameter onto `(segment, weight)` for `n` control points.
///
/// The final parameter `t = 1` lands at the end of the last segment rather
/// than the start of a non-existent one.
pub fn segment_at(n: usize, t: f64) -> (usize, f64) {
    debug_assert!(n >= 2);
    let p = (n - 1) as f64 * t.clamp(0.0, 1.0);
    let mut segment = p.floor() as usize;
    let mut weight = p - segment as f64;

    if segment >= n - 1 {
        segment = n - 2;
        weight = 1.0;
    }

    (segment, weight)
}

/// Evenly spaced parameters `i / (count - 1)` for `i in 0..count`.
pub fn parameters(count: usize) -> impl Iterator<Item = f64> {
    let divisions = count.saturating_sub(1).max(1) as f64;
    (0..count).map(move |i| i as f64 / divisions)
}

/// Cubic polynomial `c0 + c1 t + c2 t² + c3 t³` in Hermite form.
#[derive(Debug, Clone, Copy)]
struct HermiteCubic {
    c0: Vector3<f64>,
    c1: Vector3<f64>,
    c2: Vector3<f64>,
    c3: Vector3<f64>,
}

impl HermiteCubic {
    /// Cubic from `x0` to `x1` with end tangents `t0`, `t1`.
    fn new(x0: Vector3<f64>, x1: Vector3<f64>, t0: Vector3<f64>, t1: Vector3<f64>) -> Self {
        Self {
            c0: x0,
            c1: t0,
            c2: -3.0 * x0 + 3.0 * x1 - 2.0 * t0 - t1,
            c3: 2.0 * x0 - 2.0 * x1 + t0 + t1,
        }
    }

    fn eval(&self, t: f64) -> Vector3<f64> {
        let t2 = t * t;
        let t3 = t2 * t;
        self.c0 + self.c1 * t + self.c2 * t2 + self.c3 * t3
    }
}

/// Open Catmull-Rom curve through a sequence of control points.
///
/// The missing outer control points of the first and last segment are
/// extrapolated by reflecting the neighbouring point.
#[derive(Debug, Clone)]
pub struct CatmullRomCurve {
    points: Vec<Vector3<f64>>,
    curve_type: CurveType,
}

impl CatmullRomCurve {
    /// Creates a curve. Returns `None` for fewer than two control points.
    pub fn new(points: Vec<Vector3<f64>>, curve_type: CurveType) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self { points, curve_type })
    }

    /// Number of control points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; a curve has at least two control points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point at global parameter `t ∈ [0, 1]`.
    pub fn point_at(&self, t: f64) -> Vector3<f64> {
        let n = self.points.len();
        let (segment, weight) = segment_at(n, t);

        let p1 = self.points[segment];
        let p2 = self.points[segment + 1];
        let p0 = if segment > 0 {
            self.points[segment - 1]
        } else {
            2.0 * p1 - p2
        };
        let p3 = if segment + 2 < n {
            self.points[segment + 2]
        } else {
            2.0 * p2 - p1
        };

        self.segment_cubic(p0, p1, p2, p3).eval(weight)
    }

    /// Samples `count` evenly spaced points, endpoints included.
    pub fn sample(&self, count: usize) -> Vec<Vector3<f64>> {
        parameters(count).map(|t| self.point_at(t)).collect()
    }

    fn segment_cubic(
        &self,
        p0: Vector3<f64>,
        p1: Vector3<f64>,
        p2: Vector3<f64>,
        p3: Vector3<f64>,
    ) -> HermiteCubic {
        let exponent = match self.curve_type {
            CurveType::Uniform => {
                return HermiteCubic::new(p1, p2, 0.5 * (p2 - p0), 0.5 * (p3 - p1));
            }
            CurveType::Centripetal => 0.25,
            CurveType::Chordal => 0.5,
        };

        // Knot spacing from squared distances.
        let mut dt1 = (p2 - p1).norm_squared().powf(exponent);
        if dt1 < MIN_KNOT_SPACING {
            dt1 = 1.0;
        }
        let mut dt0 = (p1 - p0).norm_squared().powf(exponent);
        if dt0 < MIN_KNOT_SPACING {
            dt0 = dt1;
        }
        let mut dt2 = (p3 - p2).norm_squared().powf(exponent);
        if dt2 < MIN_KNOT_SPACING {
            dt2 = dt1;
        }

        // Non-uniform tangents, rescaled to the [0, 1] segment parameter
        let t1 = ((p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1) * dt1;
        let t2 = ((p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2) * dt1;

        HermiteCubic::new(p1, p2, t1, t2)
    }
}

/// Monotone piecewise-cubic Hermite interpolant over unit-spaced knots.
///
/// Slopes follow Fritsch–Carlson: zero at local extrema, harmonic mean of
/// the neighbouring secants elsewhere, and a shape-preserving one-sided
/// estimate at the ends. Non-decreasing input yields non-decreasing output.
#[derive(Debug, Clone)]
pub struct MonotoneCubic {
    values: Vec<f64>,
    slopes: Vec<f64>,
}

impl MonotoneCubic {
    /// Fits the interpolant. Returns `None` for fewer than two values.
    pub fn new(values: Vec<f64>) -> Option<Self> {
        let n = values.len();
        if n < 2 {
            return None;
        }

        let secants: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let mut slopes = vec![0.0; n];

        if n == 2 {
            slopes[0] = secants[0];
            slopes[1] = secants[0];
            return Some(Self { values, slopes });
        }

        for k in 1..n - 1 {
            let (a, b) = (secants[k - 1], secants[k]);
            slopes[k] = if a * b <= 0.0 { 0.0 } else { 2.0 * a * b / (a + b) };
        }
        slopes[0] = end_slope(secants[0], secants[1]);
        slopes[n - 1] = end_slope(secants[n - 2], secants[n - 3]);

        Some(Self { values, slopes })
    }

    /// Value at global parameter `t ∈ [0, 1]`.
    pub fn value_at(&self, t: f64) -> f64 {
        let (k, s) = segment_at(self.values.len(), t);
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * self.values[k]
            + h10 * self.slopes[k]
            + h01 * self.values[k + 1]
            + h11 * self.slopes[k + 1]
    }

    /// Samples `count` evenly spaced values, endpoints included.
    pub fn sample(&self, count: usize) -> Vec<f64> {
        parameters(count).map(|t| self.value_at(t)).collect()
    }
}

/// One-sided three-point slope estimate, clamped to keep the end monotone.
fn end_slope(near: f64, far: f64) -> f64 {
    let slope = (3.0 * near - far) / 2.0;
    if slope.signum() != near.signum() || near == 0.0 {
        0.0
    } else if near.signum() != far.signum() && slope.abs() > (3.0 * near).abs() {
        3.0 * near
    } else {
        slope
    }
}
