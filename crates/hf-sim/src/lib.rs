//! Real-time simulation of a small water rig: a tank drained by up to three
//! valved sub-pipes, filled by an inlet motor and assisted by a pump.
//!
//! Provides:
//! - YAML-loadable [`EngineConfig`] with validation
//! - [`SimulationEngine`] owning every component and the per-tick update
//! - Immutable [`SystemSnapshot`] publications with change-filtered subscriptions
//! - Fixed-step and wall-clock drivers
//!
//! ```
//! use hf_sim::{EngineConfig, SimulationEngine};
//! use hf_core::SubPipeId;
//!
//! let mut engine = SimulationEngine::new(EngineConfig::default())?;
//! engine.enable_flow();
//! engine.open_sub_pipe(SubPipeId::from_index(0));
//! for _ in 0..60 {
//!     engine.advance(0.05);
//! }
//! assert!(engine.tank_level() < 50.0);
//! # Ok::<(), hf_sim::SimError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod runner;
pub mod snapshot;
pub mod sub_pipe;
pub mod subscription;
pub mod tank;

pub use config::{
    ActuatorConfig, EngineConfig, FluidConfig, IntegrationConfig, MAX_SUB_PIPES, MIN_TICK_HZ,
    PumpConfig, SubPipeConfig, TankConfig, ValveConfig,
};
pub use engine::SimulationEngine;
pub use error::{SimError, SimResult};
pub use runner::{FixedStepOptions, RunRecord, StopHandle, TickLoop, TickStats, run_fixed};
pub use snapshot::{SectionView, SnapshotSection, SystemSnapshot, SystemState};
pub use sub_pipe::{SubPipe, SubPipeStatus};
pub use subscription::{SubscriptionId, Subscribers};
pub use tank::TankState;
