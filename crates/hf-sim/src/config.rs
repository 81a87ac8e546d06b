//! Engine configuration.
//!
//! Every section has defaults, so a YAML file only needs the values it
//! changes:
//!
//! ```yaml
//! tank:
//!   initial_level_percent: 80.0
//! sub_pipes:
//!   - id: sub-pipe-1
//!     radius_m: 0.03
//! ```

use crate::error::{SimError, SimResult};
use hf_controls::{ActuatorSpec, ValveSpec};
use hf_core::SubPipeId;
use hf_core::units::{constants, pa_s};
use hf_physics::FluidProperties;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// The rig has at most three parallel outlets.
pub const MAX_SUB_PIPES: usize = 3;

/// Slowest accepted tick cadence (one tick every ten seconds).
pub const MIN_TICK_HZ: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tank: TankConfig,
    pub pump: PumpConfig,
    pub inlet_motor: ActuatorConfig,
    pub main_valve: ValveConfig,
    pub main_pipe_radius_m: f64,
    pub sub_pipes: Vec<SubPipeConfig>,
    pub fluid: FluidConfig,
    pub integration: IntegrationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tank: TankConfig::default(),
            pump: PumpConfig::default(),
            inlet_motor: ActuatorConfig::default(),
            main_valve: ValveConfig::default(),
            main_pipe_radius_m: 0.05,
            sub_pipes: (0..MAX_SUB_PIPES as u32)
                .map(|i| SubPipeConfig::new(SubPipeId::from_index(i)))
                .collect(),
            fluid: FluidConfig::default(),
            integration: IntegrationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TankConfig {
    pub height_m: f64,
    pub radius_m: f64,
    pub outlet_height_m: f64,
    pub initial_level_percent: f64,
    pub min_level_percent: f64,
    pub max_level_percent: f64,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            height_m: 4.0,
            radius_m: 1.0,
            outlet_height_m: 0.0,
            initial_level_percent: 50.0,
            min_level_percent: 0.0,
            max_level_percent: 100.0,
        }
    }
}

/// Start/stop ramp parameters of a motor-driven component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub max_capacity_m3_per_h: f64,
    pub startup_duration_ms: f64,
    pub shutdown_duration_ms: f64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            max_capacity_m3_per_h: 60.0,
            startup_duration_ms: 1500.0,
            shutdown_duration_ms: 1000.0,
        }
    }
}

impl ActuatorConfig {
    pub fn spec(&self) -> ActuatorSpec {
        ActuatorSpec {
            max_capacity_m3_per_h: self.max_capacity_m3_per_h,
            startup_duration_ms: self.startup_duration_ms,
            shutdown_duration_ms: self.shutdown_duration_ms,
            pressure_rating_pa: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    pub max_capacity_m3_per_h: f64,
    pub startup_duration_ms: f64,
    pub shutdown_duration_ms: f64,
    /// Pressure contribution at full output, scaled by the ramp (Pa)
    pub pressure_rating_pa: f64,
    /// Pressure folded into the outflow head while running (Pa)
    pub assist_pressure_pa: f64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            max_capacity_m3_per_h: 50.0,
            startup_duration_ms: 2000.0,
            shutdown_duration_ms: 1500.0,
            pressure_rating_pa: 50_000.0,
            assist_pressure_pa: 50_000.0,
        }
    }
}

impl PumpConfig {
    pub fn spec(&self) -> ActuatorSpec {
        ActuatorSpec {
            max_capacity_m3_per_h: self.max_capacity_m3_per_h,
            startup_duration_ms: self.startup_duration_ms,
            shutdown_duration_ms: self.shutdown_duration_ms,
            pressure_rating_pa: self.pressure_rating_pa,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValveConfig {
    pub rate_per_s: f64,
    pub initial_position: f64,
}

impl Default for ValveConfig {
    fn default() -> Self {
        Self {
            rate_per_s: 50.0,
            initial_position: 0.0,
        }
    }
}

impl ValveConfig {
    pub fn spec(&self) -> ValveSpec {
        ValveSpec {
            rate_per_s: self.rate_per_s,
            ..ValveSpec::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPipeConfig {
    pub id: SubPipeId,
    #[serde(default = "default_sub_pipe_radius")]
    pub radius_m: f64,
    #[serde(default = "default_sub_pipe_length")]
    pub length_m: f64,
    #[serde(default)]
    pub valve: ValveConfig,
}

fn default_sub_pipe_radius() -> f64 {
    0.025
}

fn default_sub_pipe_length() -> f64 {
    2.0
}

impl SubPipeConfig {
    pub fn new(id: SubPipeId) -> Self {
        Self {
            id,
            radius_m: default_sub_pipe_radius(),
            length_m: default_sub_pipe_length(),
            valve: ValveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    pub viscosity_pa_s: f64,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            viscosity_pa_s: constants::WATER_VISCOSITY_PA_S,
        }
    }
}

impl FluidConfig {
    /// Density, gravity and ambient pressure are fixed constants.
    pub fn properties(&self) -> FluidProperties {
        FluidProperties::water().with_viscosity(pa_s(self.viscosity_pa_s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Multiplier on the level change per tick so the tank visibly moves
    /// within a short session.
    pub amplification_factor: f64,
    /// Cadence of the real-time tick loop (Hz)
    pub target_tick_hz: f64,
    /// Steps longer than this are logged as catch-up steps (s)
    pub catch_up_warn_s: f64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            amplification_factor: 10.0,
            target_tick_hz: 60.0,
            catch_up_warn_s: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> SimResult<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_yaml(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SimError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn sub_pipe(&self, id: SubPipeId) -> Option<&SubPipeConfig> {
        self.sub_pipes.iter().find(|p| p.id == id)
    }

    pub fn validate(&self) -> SimResult<()> {
        let t = &self.tank;
        positive(t.height_m, "tank.height_m")?;
        positive(t.radius_m, "tank.radius_m")?;
        if !(t.outlet_height_m.is_finite()
            && t.outlet_height_m >= 0.0
            && t.outlet_height_m <= t.height_m)
        {
            return Err(SimError::config(format!(
                "tank.outlet_height_m must lie in [0, {}], got {}",
                t.height_m, t.outlet_height_m
            )));
        }
        if !(t.min_level_percent.is_finite()
            && t.max_level_percent.is_finite()
            && 0.0 <= t.min_level_percent
            && t.min_level_percent < t.max_level_percent
            && t.max_level_percent <= 100.0)
        {
            return Err(SimError::config(format!(
                "tank level bounds must satisfy 0 <= min < max <= 100, got [{}, {}]",
                t.min_level_percent, t.max_level_percent
            )));
        }
        if !(t.initial_level_percent.is_finite()
            && t.initial_level_percent >= t.min_level_percent
            && t.initial_level_percent <= t.max_level_percent)
        {
            return Err(SimError::config(format!(
                "tank.initial_level_percent {} is outside [{}, {}]",
                t.initial_level_percent, t.min_level_percent, t.max_level_percent
            )));
        }

        self.pump.spec().validate()?;
        if !(self.pump.assist_pressure_pa.is_finite() && self.pump.assist_pressure_pa >= 0.0) {
            return Err(SimError::config("pump.assist_pressure_pa must be non-negative"));
        }
        self.inlet_motor.spec().validate()?;
        self.main_valve.spec().validate()?;
        positive(self.main_pipe_radius_m, "main_pipe_radius_m")?;

        if self.sub_pipes.is_empty() || self.sub_pipes.len() > MAX_SUB_PIPES {
            return Err(SimError::config(format!(
                "expected 1 to {MAX_SUB_PIPES} sub-pipes, got {}",
                self.sub_pipes.len()
            )));
        }
        let mut seen = HashSet::new();
        for pipe in &self.sub_pipes {
            if !seen.insert(pipe.id) {
                return Err(SimError::config(format!("duplicate sub-pipe id {}", pipe.id)));
            }
            positive(pipe.radius_m, "sub_pipes[].radius_m")?;
            if !(pipe.length_m.is_finite() && pipe.length_m >= 0.0) {
                return Err(SimError::config(format!(
                    "{}: length_m must be non-negative",
                    pipe.id
                )));
            }
            pipe.valve.spec().validate()?;
        }

        positive(self.fluid.viscosity_pa_s, "fluid.viscosity_pa_s")?;
        let i = &self.integration;
        if !(i.amplification_factor.is_finite() && i.amplification_factor >= 0.0) {
            return Err(SimError::config(
                "integration.amplification_factor must be non-negative",
            ));
        }
        if !(i.target_tick_hz.is_finite() && i.target_tick_hz >= MIN_TICK_HZ) {
            return Err(SimError::config(format!(
                "integration.target_tick_hz must be at least {MIN_TICK_HZ}, got {}",
                i.target_tick_hz
            )));
        }
        positive(i.catch_up_warn_s, "integration.catch_up_warn_s")?;
        Ok(())
    }
}

fn positive(v: f64, what: &str) -> SimResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(SimError::config(format!("{what} must be positive, got {v}")))
    }
}
