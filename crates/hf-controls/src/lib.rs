//! Component state machines for the hydroflow rig.
//!
//! Two kinds of controlled component live here:
//! - [`ActuatorStateMachine`]: a start/stop ramp shared by the discharge pump and
//!   the inlet fill motor. Output follows an eased curve over a configured
//!   startup or shutdown duration.
//! - [`ValveActuator`]: a target-seeking valve position with a bounded
//!   actuation rate and an equal-percentage flow characteristic.
//!
//! Both advance only when ticked with an elapsed time, so replaying the same
//! sequence of deltas reproduces the same trajectory.

pub mod actuator;
pub mod error;
pub mod valve;

pub use actuator::{ActuatorSpec, ActuatorState, ActuatorStateMachine, ActuatorStatus};
pub use error::{ControlError, ControlResult};
pub use valve::{POSITION_EPSILON, ValveActuator, ValveSpec, ValveStatus};
