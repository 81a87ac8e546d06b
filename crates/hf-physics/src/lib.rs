//! hf-physics: closed-form hydraulics for a gravity-drained tank.
//!
//! Provides:
//! - [`FluidProperties`]: density, viscosity, gravity, ambient pressure
//! - [`calculators`]: Torricelli exit velocity, volumetric flow, point
//!   pressure, Darcy-Weisbach head loss, Reynolds number and regime, tank
//!   volume and drain time
//! - [`BernoulliStateComputer`]: composes the calculators into one derived
//!   state per tick from tank geometry and outlet valve openings
//!
//! Nothing in here returns an error. Degenerate geometry (empty tank, closed
//! outlets, zero area) resolves to zero or to an explicit "no flow" value.
//!
//! # Example
//!
//! ```
//! use hf_physics::{calculators, FluidProperties};
//!
//! let water = FluidProperties::water();
//! let v = calculators::exit_velocity(&water, 5.0);
//! assert!((v - (2.0_f64 * 9.81 * 5.0).sqrt()).abs() < 1e-9);
//! ```

pub mod bernoulli;
pub mod calculators;
pub mod fluid;

pub use bernoulli::{
    BernoulliInputs, BernoulliState, BernoulliStateComputer, SubPipeFlow, SubPipeInput,
};
pub use calculators::FlowRegime;
pub use fluid::FluidProperties;
