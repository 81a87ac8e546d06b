//! Outlet sub-pipes. Only the valve persists between ticks; open state and
//! flow are rederived from the hydraulics every tick.

use crate::config::SubPipeConfig;
use crate::error::SimResult;
use hf_controls::ValveActuator;
use hf_core::SubPipeId;
use hf_core::units::per_second_to_per_hour;
use hf_physics::{FlowRegime, SubPipeFlow, SubPipeInput};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct SubPipe {
    id: SubPipeId,
    radius_m: f64,
    length_m: f64,
    initial_position: f64,
    valve: ValveActuator,
}

/// Snapshot view of a sub-pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPipeStatus {
    pub id: SubPipeId,
    pub radius_m: f64,
    pub valve_position: f64,
    pub target_position: f64,
    pub is_actuating: bool,
    /// Valve off its seat and flow enabled upstream
    pub is_open: bool,
    pub flow_rate_m3_per_s: f64,
    pub flow_rate_m3_per_h: f64,
    pub exit_velocity_mps: f64,
    pub reynolds: f64,
    pub regime: FlowRegime,
    pub head_loss_m: f64,
}

impl SubPipe {
    pub fn from_config(cfg: &SubPipeConfig) -> SimResult<Self> {
        Ok(Self {
            id: cfg.id,
            radius_m: cfg.radius_m,
            length_m: cfg.length_m,
            initial_position: cfg.valve.initial_position,
            valve: ValveActuator::new(cfg.valve.spec(), cfg.valve.initial_position)?,
        })
    }

    pub fn id(&self) -> SubPipeId {
        self.id
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn valve(&self) -> &ValveActuator {
        &self.valve
    }

    pub fn valve_mut(&mut self) -> &mut ValveActuator {
        &mut self.valve
    }

    pub fn reset(&mut self) {
        self.valve.reset(self.initial_position);
    }

    /// Hydraulic view; a disabled flow path contributes nothing regardless of
    /// the valve.
    pub fn hydraulic_input(&self, flow_enabled: bool) -> SubPipeInput {
        SubPipeInput {
            radius_m: self.radius_m,
            length_m: self.length_m,
            opening_fraction: if flow_enabled {
                self.valve.opening_fraction()
            } else {
                0.0
            },
        }
    }

    pub fn status(&self, flow: &SubPipeFlow, flow_enabled: bool) -> SubPipeStatus {
        SubPipeStatus {
            id: self.id,
            radius_m: self.radius_m,
            valve_position: self.valve.current_position(),
            target_position: self.valve.target_position(),
            is_actuating: self.valve.is_actuating(),
            is_open: flow_enabled && self.valve.current_position() > 0.0,
            flow_rate_m3_per_s: flow.flow_rate_m3_per_s,
            flow_rate_m3_per_h: per_second_to_per_hour(flow.flow_rate_m3_per_s),
            exit_velocity_mps: flow.velocity_mps,
            reynolds: flow.reynolds,
            regime: flow.regime,
            head_loss_m: flow.head_loss_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe() -> SubPipe {
        SubPipe::from_config(&SubPipeConfig::new(SubPipeId::from_index(0))).unwrap()
    }

    #[test]
    fn cutoff_masks_valve() {
        let mut p = pipe();
        p.valve_mut().reset(100.0);
        assert_eq!(p.hydraulic_input(false).opening_fraction, 0.0);
        assert_eq!(p.hydraulic_input(true).opening_fraction, 1.0);
    }

    #[test]
    fn status_open_needs_flow_enabled() {
        let mut p = pipe();
        p.valve_mut().reset(40.0);
        let flow = SubPipeFlow::default();
        assert!(!p.status(&flow, false).is_open);
        assert!(p.status(&flow, true).is_open);
    }

    #[test]
    fn reset_restores_initial_position() {
        let mut p = pipe();
        p.valve_mut().set_position(80.0);
        p.valve_mut().tick(10.0);
        p.reset();
        assert_eq!(p.valve().current_position(), 0.0);
        assert!(!p.valve().is_actuating());
    }
}
