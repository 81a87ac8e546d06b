//! Start/stop ramp shared by the discharge pump and the inlet fill motor.
//!
//! The machine moves through `Idle → Starting → Running → Stopping → Idle`.
//! While transitioning, the output ratio follows [`ease_in_out`] over the
//! configured duration:
//!
//! ```text
//! Starting: ratio = ease(elapsed / startup)
//! Stopping: ratio = 1 - ease(elapsed / shutdown)
//! ```
//!
//! Progress is tracked as elapsed time inside the current transition, not as a
//! start timestamp, so the ramp depends only on the deltas it is ticked with.
//! `Fault` is reachable from any state but nothing here drives into it; it is
//! entered only through [`ActuatorStateMachine::fault`].

use crate::error::{ControlError, ControlResult};
use hf_core::numeric::{clamp, ease_in_out, inverse_ease_in_out, lerp};
use serde::{Deserialize, Serialize};

/// Elapsed time within this distance of the duration completes a transition.
const COMPLETION_EPS_MS: f64 = 1e-6;

/// Lifecycle state of a pump or motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    Fault,
}

impl ActuatorState {
    pub fn is_transitioning(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Fault => "fault",
        }
    }
}

/// Static parameters of a pump or motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorSpec {
    /// Volumetric capacity at full output (m³/h)
    pub max_capacity_m3_per_h: f64,
    /// Time to ramp from 0 to full output (ms), must be positive
    pub startup_duration_ms: f64,
    /// Time to ramp from full output to 0 (ms), must be positive
    pub shutdown_duration_ms: f64,
    /// Pressure added at full output (Pa); zero for the inlet motor
    pub pressure_rating_pa: f64,
}

impl ActuatorSpec {
    /// Create a validated spec.
    pub fn new(
        max_capacity_m3_per_h: f64,
        startup_duration_ms: f64,
        shutdown_duration_ms: f64,
        pressure_rating_pa: f64,
    ) -> ControlResult<Self> {
        let spec = Self {
            max_capacity_m3_per_h,
            startup_duration_ms,
            shutdown_duration_ms,
            pressure_rating_pa,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> ControlResult<()> {
        if !(self.max_capacity_m3_per_h.is_finite() && self.max_capacity_m3_per_h >= 0.0) {
            return Err(ControlError::InvalidArg {
                what: "max capacity must be finite and non-negative",
            });
        }
        if !(self.startup_duration_ms.is_finite() && self.startup_duration_ms > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "startup duration must be positive",
            });
        }
        if !(self.shutdown_duration_ms.is_finite() && self.shutdown_duration_ms > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "shutdown duration must be positive",
            });
        }
        if !(self.pressure_rating_pa.is_finite() && self.pressure_rating_pa >= 0.0) {
            return Err(ControlError::InvalidArg {
                what: "pressure rating must be finite and non-negative",
            });
        }
        Ok(())
    }
}

/// Read-only view of an actuator for snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorStatus {
    pub state: ActuatorState,
    pub output_ratio: f64,
    pub flow_rate_m3_per_h: f64,
    pub pressure_contribution_pa: f64,
    pub transition_elapsed_ms: f64,
}

/// Eased start/stop state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorStateMachine {
    spec: ActuatorSpec,
    state: ActuatorState,
    output_ratio: f64,
    transition_elapsed_ms: f64,
}

impl ActuatorStateMachine {
    /// Create an idle actuator.
    pub fn new(spec: ActuatorSpec) -> ControlResult<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            state: ActuatorState::Idle,
            output_ratio: 0.0,
            transition_elapsed_ms: 0.0,
        })
    }

    pub fn spec(&self) -> &ActuatorSpec {
        &self.spec
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn output_ratio(&self) -> f64 {
        self.output_ratio
    }

    pub fn transition_elapsed_ms(&self) -> f64 {
        self.transition_elapsed_ms
    }

    pub fn is_running(&self) -> bool {
        self.state == ActuatorState::Running
    }

    /// `true` while running or ramping up, i.e. when a toggle would stop it.
    pub fn is_engaged(&self) -> bool {
        matches!(self.state, ActuatorState::Starting | ActuatorState::Running)
    }

    /// Delivered flow (m³/h) = capacity × ratio.
    pub fn flow_rate(&self) -> f64 {
        self.spec.max_capacity_m3_per_h * self.output_ratio
    }

    /// Pressure contribution (Pa) = rating × ratio.
    pub fn pressure_contribution(&self) -> f64 {
        self.spec.pressure_rating_pa * self.output_ratio
    }

    /// Begin ramping up. Accepted from `Idle` or `Stopping`.
    ///
    /// Reversing out of `Stopping` resumes the startup curve at the current
    /// ratio instead of restarting it from zero.
    pub fn start(&mut self) -> bool {
        match self.state {
            ActuatorState::Idle => {
                self.state = ActuatorState::Starting;
                self.output_ratio = 0.0;
                self.transition_elapsed_ms = 0.0;
                true
            }
            ActuatorState::Stopping => {
                self.state = ActuatorState::Starting;
                self.transition_elapsed_ms =
                    inverse_ease_in_out(self.output_ratio) * self.spec.startup_duration_ms;
                true
            }
            _ => false,
        }
    }

    /// Begin ramping down. Accepted from `Running` or `Starting`.
    pub fn stop(&mut self) -> bool {
        match self.state {
            ActuatorState::Running => {
                self.state = ActuatorState::Stopping;
                self.output_ratio = 1.0;
                self.transition_elapsed_ms = 0.0;
                true
            }
            ActuatorState::Starting => {
                self.state = ActuatorState::Stopping;
                self.transition_elapsed_ms =
                    inverse_ease_in_out(1.0 - self.output_ratio) * self.spec.shutdown_duration_ms;
                true
            }
            _ => false,
        }
    }

    /// Stop if engaged, start otherwise. Returns whether the command was accepted.
    pub fn toggle(&mut self) -> bool {
        if self.is_engaged() {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Force the fault state. Output drops to zero.
    pub fn fault(&mut self) {
        self.state = ActuatorState::Fault;
        self.output_ratio = 0.0;
        self.transition_elapsed_ms = 0.0;
    }

    /// Leave `Fault` for `Idle`. Returns `false` if not faulted.
    pub fn clear_fault(&mut self) -> bool {
        if self.state != ActuatorState::Fault {
            return false;
        }
        self.reset();
        true
    }

    /// Return to the initial idle state.
    pub fn reset(&mut self) {
        self.state = ActuatorState::Idle;
        self.output_ratio = 0.0;
        self.transition_elapsed_ms = 0.0;
    }

    /// Advance by `dt_ms`. Returns the new state if the tick changed it.
    pub fn tick(&mut self, dt_ms: f64) -> Option<ActuatorState> {
        let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        let before = self.state;

        match self.state {
            ActuatorState::Idle | ActuatorState::Fault => {
                self.output_ratio = 0.0;
            }
            ActuatorState::Running => {
                self.output_ratio = 1.0;
            }
            ActuatorState::Starting => {
                self.transition_elapsed_ms += dt_ms;
                let duration = self.spec.startup_duration_ms;
                if self.transition_elapsed_ms >= duration - COMPLETION_EPS_MS {
                    self.state = ActuatorState::Running;
                    self.output_ratio = 1.0;
                    self.transition_elapsed_ms = 0.0;
                } else {
                    let progress = clamp(self.transition_elapsed_ms / duration, 0.0, 1.0);
                    // never step backwards across a reversal seam
                    self.output_ratio = ease_in_out(progress).max(self.output_ratio);
                }
            }
            ActuatorState::Stopping => {
                self.transition_elapsed_ms += dt_ms;
                let duration = self.spec.shutdown_duration_ms;
                if self.transition_elapsed_ms >= duration - COMPLETION_EPS_MS {
                    self.state = ActuatorState::Idle;
                    self.output_ratio = 0.0;
                    self.transition_elapsed_ms = 0.0;
                } else {
                    let progress = clamp(self.transition_elapsed_ms / duration, 0.0, 1.0);
                    let ramp = lerp(1.0, 0.0, ease_in_out(progress));
                    self.output_ratio = ramp.min(self.output_ratio);
                }
            }
        }

        (self.state != before).then_some(self.state)
    }

    pub fn status(&self) -> ActuatorStatus {
        ActuatorStatus {
            state: self.state,
            output_ratio: self.output_ratio,
            flow_rate_m3_per_h: self.flow_rate(),
            pressure_contribution_pa: self.pressure_contribution(),
            transition_elapsed_ms: self.transition_elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump() -> ActuatorStateMachine {
        let spec = ActuatorSpec::new(50.0, 2000.0, 1000.0, 50_000.0).unwrap();
        ActuatorStateMachine::new(spec).unwrap()
    }

    #[test]
    fn starts_idle_with_zero_output() {
        let p = pump();
        assert_eq!(p.state(), ActuatorState::Idle);
        assert_eq!(p.output_ratio(), 0.0);
        assert_eq!(p.flow_rate(), 0.0);
    }

    #[test]
    fn full_startup_reaches_running() {
        let mut p = pump();
        assert!(p.start());
        for _ in 0..125 {
            p.tick(16.0);
        }
        assert_eq!(p.state(), ActuatorState::Running);
        assert_eq!(p.output_ratio(), 1.0);
        assert_eq!(p.flow_rate(), 50.0);
        assert_eq!(p.pressure_contribution(), 50_000.0);
    }

    #[test]
    fn halfway_through_startup_is_half_output() {
        let mut p = pump();
        p.start();
        p.tick(1000.0);
        assert_eq!(p.state(), ActuatorState::Starting);
        assert!((p.output_ratio() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn second_start_is_rejected() {
        let mut p = pump();
        assert!(p.start());
        let before = p.clone();
        assert!(!p.start());
        assert_eq!(p, before);
    }

    #[test]
    fn stop_rejected_when_idle() {
        let mut p = pump();
        assert!(!p.stop());
        assert_eq!(p.state(), ActuatorState::Idle);
    }

    #[test]
    fn shutdown_returns_to_idle() {
        let mut p = pump();
        p.start();
        p.tick(2000.0);
        assert!(p.stop());
        assert_eq!(p.tick(500.0), None);
        assert!((p.output_ratio() - 0.5).abs() < 1e-12);
        assert_eq!(p.tick(500.0), Some(ActuatorState::Idle));
        assert_eq!(p.output_ratio(), 0.0);
    }

    #[test]
    fn reversal_keeps_ratio_continuous() {
        let mut p = pump();
        p.start();
        p.tick(2000.0);
        p.stop();
        p.tick(300.0);
        let mid = p.output_ratio();
        assert!(p.start());
        assert!((p.output_ratio() - mid).abs() < 1e-12);
        p.tick(1.0);
        assert!(p.output_ratio() >= mid);
    }

    #[test]
    fn fault_is_sticky_until_cleared() {
        let mut p = pump();
        p.start();
        p.tick(500.0);
        p.fault();
        assert_eq!(p.state(), ActuatorState::Fault);
        assert_eq!(p.output_ratio(), 0.0);
        assert!(!p.start());
        assert!(!p.stop());
        p.tick(10_000.0);
        assert_eq!(p.state(), ActuatorState::Fault);
        assert!(p.clear_fault());
        assert_eq!(p.state(), ActuatorState::Idle);
        assert!(!p.clear_fault());
    }

    #[test]
    fn toggle_alternates() {
        let mut p = pump();
        assert!(p.toggle());
        assert_eq!(p.state(), ActuatorState::Starting);
        assert!(p.toggle());
        assert_eq!(p.state(), ActuatorState::Stopping);
    }

    #[test]
    fn negative_and_nan_deltas_do_not_move() {
        let mut p = pump();
        p.start();
        p.tick(-50.0);
        p.tick(f64::NAN);
        assert_eq!(p.transition_elapsed_ms(), 0.0);
        assert_eq!(p.output_ratio(), 0.0);
    }

    #[test]
    fn invalid_parameters() {
        assert!(ActuatorSpec::new(-1.0, 100.0, 100.0, 0.0).is_err());
        assert!(ActuatorSpec::new(1.0, 0.0, 100.0, 0.0).is_err());
        assert!(ActuatorSpec::new(1.0, 100.0, -5.0, 0.0).is_err());
        assert!(ActuatorSpec::new(1.0, 100.0, 100.0, f64::NAN).is_err());
    }
}
