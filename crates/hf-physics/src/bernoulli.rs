//! Per-tick derived hydraulic state of the tank and its outlet sub-pipes.
//!
//! All sub-pipes share one exit velocity, set by the water column above the
//! outlet (plus pump head when assisting). Each pipe takes a fraction of that
//! velocity given by the equal-percentage factor of its valve opening, and
//! carries flow through its own cross-section:
//!
//! ```text
//! h_eff = max(0, level/100 · H - h_outlet)
//! v     = sqrt(2·g·(h_eff + P_pump/(ρ·g)))       pump running
//! v_i   = v · (opening_i)^1.5
//! Q_i   = π·r_i²·v_i
//! ```
//!
//! The computation is memoryless and recomputed from component state on every
//! tick.

use crate::calculators::{self, FlowRegime};
use crate::fluid::FluidProperties;
use hf_core::numeric::{clamp, equal_percentage};
use serde::{Deserialize, Serialize};

/// One outlet sub-pipe as seen by the hydraulics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubPipeInput {
    pub radius_m: f64,
    pub length_m: f64,
    /// Valve opening in [0, 1]; zero when flow is cut off upstream
    pub opening_fraction: f64,
}

/// Geometry and component state feeding one computation.
#[derive(Debug, Clone, PartialEq)]
pub struct BernoulliInputs {
    /// Tank fill in percent of height
    pub tank_level_percent: f64,
    pub tank_height_m: f64,
    pub tank_radius_m: f64,
    pub outlet_height_m: f64,
    pub main_pipe_radius_m: f64,
    pub sub_pipes: Vec<SubPipeInput>,
    pub pump_running: bool,
    pub pump_pressure_pa: f64,
}

/// Derived flow through one sub-pipe.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubPipeFlow {
    pub is_open: bool,
    pub valve_factor: f64,
    pub velocity_mps: f64,
    pub flow_rate_m3_per_s: f64,
    pub reynolds: f64,
    pub regime: FlowRegime,
    pub head_loss_m: f64,
}

/// Derived hydraulic state for one tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BernoulliState {
    pub water_height_m: f64,
    pub effective_height_m: f64,
    pub pump_assisted: bool,
    pub exit_velocity_mps: f64,
    pub sub_pipes: Vec<SubPipeFlow>,
    pub total_flow_rate_m3_per_s: f64,
    pub main_pipe_velocity_mps: f64,
    pub main_pipe_reynolds: f64,
    pub main_pipe_regime: FlowRegime,
    pub tank_bottom_pressure_pa: f64,
    pub outlet_pressure_pa: f64,
    pub remaining_volume_m3: f64,
    /// `None` when nothing can drain: no open outlet or no head above it.
    pub estimated_drain_time_s: Option<f64>,
}

impl BernoulliState {
    pub fn is_flowing(&self) -> bool {
        self.total_flow_rate_m3_per_s > 0.0
    }
}

/// Composes the calculators for one fluid.
#[derive(Debug, Clone, Default)]
pub struct BernoulliStateComputer {
    fluid: FluidProperties,
}

impl BernoulliStateComputer {
    pub fn new(fluid: FluidProperties) -> Self {
        Self { fluid }
    }

    pub fn fluid(&self) -> &FluidProperties {
        &self.fluid
    }

    pub fn compute(&self, inputs: &BernoulliInputs) -> BernoulliState {
        let fluid = &self.fluid;
        let level_fraction = clamp(inputs.tank_level_percent, 0.0, 100.0) / 100.0;
        let water_height_m = level_fraction * inputs.tank_height_m.max(0.0);
        let effective_height_m = (water_height_m - inputs.outlet_height_m).max(0.0);

        // a running pump has nothing to push once the tank is dry
        let pump_pressure = (inputs.pump_running && water_height_m > 0.0)
            .then_some(inputs.pump_pressure_pa.max(0.0));
        let exit_velocity_mps =
            calculators::exit_velocity_with_pump(fluid, effective_height_m, pump_pressure);

        let mut total_flow = 0.0;
        let mut open_area = 0.0;
        let sub_pipes: Vec<SubPipeFlow> = inputs
            .sub_pipes
            .iter()
            .map(|pipe| {
                let flow = self.sub_pipe_flow(pipe, exit_velocity_mps);
                total_flow += flow.flow_rate_m3_per_s;
                if flow.is_open {
                    open_area += calculators::circle_area(pipe.radius_m);
                }
                flow
            })
            .collect();

        let main_area = calculators::circle_area(inputs.main_pipe_radius_m);
        let main_pipe_velocity_mps = if main_area > 0.0 {
            total_flow / main_area
        } else {
            0.0
        };
        let main_pipe_reynolds = calculators::reynolds_number(
            fluid,
            main_pipe_velocity_mps,
            2.0 * inputs.main_pipe_radius_m,
        );

        let drain = calculators::drain_time(
            fluid,
            calculators::circle_area(inputs.tank_radius_m),
            open_area,
            effective_height_m,
        );

        BernoulliState {
            water_height_m,
            effective_height_m,
            pump_assisted: pump_pressure.is_some(),
            exit_velocity_mps,
            sub_pipes,
            total_flow_rate_m3_per_s: total_flow,
            main_pipe_velocity_mps,
            main_pipe_reynolds,
            main_pipe_regime: FlowRegime::classify(main_pipe_reynolds),
            tank_bottom_pressure_pa: calculators::pressure_at(fluid, water_height_m, 0.0),
            outlet_pressure_pa: calculators::pressure_at(fluid, 0.0, exit_velocity_mps),
            remaining_volume_m3: calculators::cylinder_volume(inputs.tank_radius_m, water_height_m),
            estimated_drain_time_s: drain.is_finite().then_some(drain),
        }
    }

    fn sub_pipe_flow(&self, pipe: &SubPipeInput, exit_velocity_mps: f64) -> SubPipeFlow {
        let opening = clamp(pipe.opening_fraction, 0.0, 1.0);
        if opening.is_nan() || opening <= 0.0 {
            return SubPipeFlow::default();
        }
        let valve_factor = equal_percentage(opening);
        let velocity_mps = exit_velocity_mps * valve_factor;
        let diameter = 2.0 * pipe.radius_m;
        let reynolds = calculators::reynolds_number(&self.fluid, velocity_mps, diameter);
        let f = calculators::friction_factor(reynolds);

        SubPipeFlow {
            is_open: true,
            valve_factor,
            velocity_mps,
            flow_rate_m3_per_s: calculators::volumetric_flow(pipe.radius_m, velocity_mps),
            reynolds,
            regime: FlowRegime::classify(reynolds),
            head_loss_m: calculators::friction_head_loss(
                &self.fluid,
                f,
                pipe.length_m,
                diameter,
                velocity_mps,
            ),
        }
    }
}
