//! Rate-limited valve position controller.
//!
//! The valve chases a commanded target at a bounded rate and snaps exactly onto
//! it once the remaining distance fits in a single step, so `is_actuating`
//! clears on a precise equality rather than an approach tolerance.

use crate::error::{ControlError, ControlResult};
use hf_core::numeric::{clamp, equal_percentage};
use serde::{Deserialize, Serialize};

/// Tolerance for `is_open` / `is_closed`, in position units.
pub const POSITION_EPSILON: f64 = 0.1;

/// Static parameters of a valve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValveSpec {
    /// Fully closed position
    pub min_position: f64,
    /// Fully open position, must exceed `min_position`
    pub max_position: f64,
    /// Maximum travel (position units per second), must be positive
    pub rate_per_s: f64,
}

impl Default for ValveSpec {
    fn default() -> Self {
        Self {
            min_position: 0.0,
            max_position: 100.0,
            rate_per_s: 50.0,
        }
    }
}

impl ValveSpec {
    pub fn with_rate(rate_per_s: f64) -> ControlResult<Self> {
        let spec = Self {
            rate_per_s,
            ..Self::default()
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> ControlResult<()> {
        if !(self.min_position.is_finite()
            && self.max_position.is_finite()
            && self.min_position >= 0.0
            && self.max_position > self.min_position)
        {
            return Err(ControlError::InvalidRange {
                min: self.min_position,
                max: self.max_position,
            });
        }
        if !(self.rate_per_s.is_finite() && self.rate_per_s > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "valve rate must be positive",
            });
        }
        Ok(())
    }
}

/// Read-only view of a valve for snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValveStatus {
    pub current_position: f64,
    pub target_position: f64,
    pub is_actuating: bool,
    pub flow_factor: f64,
}

/// Target-seeking valve with an equal-percentage characteristic.
#[derive(Debug, Clone, PartialEq)]
pub struct ValveActuator {
    spec: ValveSpec,
    current_position: f64,
    target_position: f64,
    is_actuating: bool,
}

impl ValveActuator {
    /// Create a valve at rest at `initial_position` (clamped).
    pub fn new(spec: ValveSpec, initial_position: f64) -> ControlResult<Self> {
        spec.validate()?;
        let mut valve = Self {
            current_position: spec.min_position,
            target_position: spec.min_position,
            is_actuating: false,
            spec,
        };
        valve.reset(initial_position);
        Ok(valve)
    }

    pub fn spec(&self) -> &ValveSpec {
        &self.spec
    }

    pub fn current_position(&self) -> f64 {
        self.current_position
    }

    pub fn target_position(&self) -> f64 {
        self.target_position
    }

    pub fn is_actuating(&self) -> bool {
        self.is_actuating
    }

    /// Command a new target. Returns the clamped target actually applied.
    ///
    /// Non-finite commands are ignored and the existing target is returned.
    pub fn set_position(&mut self, position: f64) -> f64 {
        if !position.is_finite() {
            return self.target_position;
        }
        let target = clamp(position, self.spec.min_position, self.spec.max_position);
        self.target_position = target;
        self.is_actuating = target != self.current_position;
        target
    }

    pub fn open(&mut self) -> f64 {
        self.set_position(self.spec.max_position)
    }

    pub fn close(&mut self) -> f64 {
        self.set_position(self.spec.min_position)
    }

    /// Close if the target is above the closed position, open otherwise.
    pub fn toggle(&mut self) -> f64 {
        if self.target_position > self.spec.min_position + POSITION_EPSILON {
            self.close()
        } else {
            self.open()
        }
    }

    /// Jump to `position` (clamped) with no travel in progress.
    pub fn reset(&mut self, position: f64) {
        let p = if position.is_finite() {
            clamp(position, self.spec.min_position, self.spec.max_position)
        } else {
            self.spec.min_position
        };
        self.current_position = p;
        self.target_position = p;
        self.is_actuating = false;
    }

    /// Move toward the target by at most `rate × dt_s`. Returns whether the
    /// position changed.
    pub fn tick(&mut self, dt_s: f64) -> bool {
        if !self.is_actuating {
            return false;
        }
        let dt_s = if dt_s.is_finite() { dt_s.max(0.0) } else { 0.0 };
        let max_step = self.spec.rate_per_s * dt_s;
        let remaining = self.target_position - self.current_position;

        if remaining.abs() <= max_step {
            self.current_position = self.target_position;
            self.is_actuating = false;
        } else {
            self.current_position += max_step.copysign(remaining);
        }
        max_step > 0.0
    }

    /// Opening fraction in [0, 1].
    pub fn opening_fraction(&self) -> f64 {
        self.current_position / self.spec.max_position
    }

    /// `(position / max)^1.5`
    pub fn flow_factor(&self) -> f64 {
        equal_percentage(self.opening_fraction())
    }

    pub fn is_open(&self) -> bool {
        self.current_position >= self.spec.max_position - POSITION_EPSILON
    }

    pub fn is_closed(&self) -> bool {
        self.current_position <= self.spec.min_position + POSITION_EPSILON
    }

    pub fn status(&self) -> ValveStatus {
        ValveStatus {
            current_position: self.current_position,
            target_position: self.target_position,
            is_actuating: self.is_actuating,
            flow_factor: self.flow_factor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valve() -> ValveActuator {
        ValveActuator::new(ValveSpec::with_rate(50.0).unwrap(), 0.0).unwrap()
    }

    #[test]
    fn rate_limiting() {
        let mut v = valve();
        v.set_position(100.0);
        v.tick(0.5);
        assert_eq!(v.current_position(), 25.0);
        assert!(v.is_actuating());
    }

    #[test]
    fn snaps_onto_target() {
        let mut v = valve();
        v.set_position(30.0);
        v.tick(0.5);
        v.tick(0.5);
        assert_eq!(v.current_position(), 30.0);
        assert!(!v.is_actuating());
    }

    #[test]
    fn position_clamped() {
        let mut v = valve();
        assert_eq!(v.set_position(250.0), 100.0);
        assert_eq!(v.set_position(-3.0), 0.0);
        // already at 0, nothing to do
        assert!(!v.is_actuating());
    }

    #[test]
    fn nan_command_ignored() {
        let mut v = valve();
        v.set_position(40.0);
        assert_eq!(v.set_position(f64::NAN), 40.0);
        assert_eq!(v.target_position(), 40.0);
    }

    #[test]
    fn closing_moves_down() {
        let mut v = ValveActuator::new(ValveSpec::with_rate(10.0).unwrap(), 100.0).unwrap();
        assert!(v.is_open());
        v.close();
        v.tick(1.0);
        assert_eq!(v.current_position(), 90.0);
        for _ in 0..20 {
            v.tick(1.0);
        }
        assert!(v.is_closed());
        assert_eq!(v.current_position(), 0.0);
    }

    #[test]
    fn flow_factor_equal_percentage() {
        let mut v = valve();
        assert_eq!(v.flow_factor(), 0.0);
        v.reset(100.0);
        assert_eq!(v.flow_factor(), 1.0);
        v.reset(50.0);
        assert!((v.flow_factor() - 0.5_f64.powf(1.5)).abs() < 1e-12);
    }

    #[test]
    fn open_close_tolerance() {
        let mut v = valve();
        v.reset(99.95);
        assert!(v.is_open());
        v.reset(0.05);
        assert!(v.is_closed());
        v.reset(50.0);
        assert!(!v.is_open() && !v.is_closed());
    }

    #[test]
    fn toggle_follows_target() {
        let mut v = valve();
        assert_eq!(v.toggle(), 100.0);
        assert_eq!(v.toggle(), 0.0);
    }

    #[test]
    fn invalid_parameters() {
        assert!(ValveSpec::with_rate(0.0).is_err());
        assert!(ValveSpec::with_rate(f64::INFINITY).is_err());
        let inverted = ValveSpec {
            min_position: 50.0,
            max_position: 10.0,
            rate_per_s: 1.0,
        };
        assert!(inverted.validate().is_err());
    }
}
