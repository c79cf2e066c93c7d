//! Brush falloff kernels.

use serde::{Deserialize, Serialize};

/// Shape of the weight curve from brush center to rim
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FalloffKind {
    Linear,
    /// Smoothstep
    #[default]
    Smooth,
    Gaussian,
    /// Full strength inside the inner 20% of the radius, nothing outside it
    Sharp,
}

/// Threshold on `t = 1 - d/r` above which the sharp kernel is fully on.
const SHARP_THRESHOLD: f32 = 0.8;

/// Weight in `[0, 1]` for a point `distance` away from the brush center.
///
/// Zero at and beyond `radius`. Total over `distance >= 0`, `radius > 0`; degenerate
/// inputs (non-positive or non-finite radius, NaN distance) yield zero.
pub fn weight(distance: f32, radius: f32, kind: FalloffKind) -> f32 {
    if !(radius > 0.0) || !radius.is_finite() || !(distance >= 0.0) || distance >= radius {
        return 0.0;
    }

    let t = 1.0 - distance / radius;
    let w = match kind {
        FalloffKind::Linear => t,
        FalloffKind::Smooth => t * t * (3.0 - 2.0 * t),
        FalloffKind::Gaussian => {
            let sigma = radius * 0.5;
            (-(distance * distance) / (2.0 * sigma * sigma)).exp()
        }
        FalloffKind::Sharp => {
            if t > SHARP_THRESHOLD {
                1.0
            } else {
                0.0
            }
        }
    };
    w.clamp(0.0, 1.0)
}
