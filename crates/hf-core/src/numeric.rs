use crate::{HfError, HfResult};

/// Floating point type used throughout system
pub type Real = f64;

/// Pass `v` through if finite, otherwise report `what` as non-finite.
pub fn ensure_finite(v: Real, what: &'static str) -> HfResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HfError::NonFinite { what, value: v })
    }
}

/// Clamp a value between min and max.
///
/// Unlike `f64::clamp` this never panics on inverted bounds; `min` wins.
pub fn clamp(value: Real, min: Real, max: Real) -> Real {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Linear interpolation from `a` to `b`. `t` is clamped to [0, 1], so the
/// result never leaves the segment.
pub fn lerp(a: Real, b: Real, t: Real) -> Real {
    a + (b - a) * clamp(t, 0.0, 1.0)
}

/// Quadratic ease-in-out on [0, 1].
///
/// ```text
/// ease(t) = 2t²               for t < 0.5
///         = 1 - (-2t + 2)² / 2 otherwise
/// ```
///
/// Input is clamped, so the result always lies in [0, 1] and is monotonic.
pub fn ease_in_out(t: Real) -> Real {
    let t = clamp(t, 0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Inverse of [`ease_in_out`]: the progress `t` at which the curve reaches `y`.
pub fn inverse_ease_in_out(y: Real) -> Real {
    let y = clamp(y, 0.0, 1.0);
    if y < 0.5 {
        (y / 2.0).sqrt()
    } else {
        1.0 - (2.0 * (1.0 - y)).sqrt() / 2.0
    }
}

/// Exponent of the equal-percentage valve characteristic.
pub const EQUAL_PERCENTAGE_EXPONENT: Real = 1.5;

/// Equal-percentage flow factor for an opening fraction in [0, 1].
///
/// `factor = fraction^1.5`, clamped, so a closed valve gives exactly 0 and a
/// fully open one exactly 1.
pub fn equal_percentage(fraction: Real) -> Real {
    let f = clamp(fraction, 0.0, 1.0);
    if f.is_nan() {
        return 0.0;
    }
    f.powf(EQUAL_PERCENTAGE_EXPONENT)
}
