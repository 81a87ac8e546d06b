//! Published engine state.

use crate::sub_pipe::SubPipeStatus;
use crate::tank::TankState;
use hf_controls::{ActuatorState, ActuatorStatus, ValveStatus};
use hf_core::SubPipeId;
use hf_physics::BernoulliState;
use serde::{Deserialize, Serialize};

/// Aggregate state of the whole rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    Fault,
}

impl SystemState {
    /// Aggregate rule, in priority order:
    /// 1. any actuator faulted → `Fault`
    /// 2. (pump running or flow enabled) and water leaving → `Running`
    /// 3. pump ramping → `Starting` / `Stopping`
    /// 4. otherwise `Idle`
    pub fn derive(
        pump: ActuatorState,
        inlet_motor: ActuatorState,
        flow_enabled: bool,
        outflow_m3_per_s: f64,
    ) -> Self {
        if pump == ActuatorState::Fault || inlet_motor == ActuatorState::Fault {
            return Self::Fault;
        }
        if (pump == ActuatorState::Running || flow_enabled) && outflow_m3_per_s > 0.0 {
            return Self::Running;
        }
        match pump {
            ActuatorState::Starting => Self::Starting,
            ActuatorState::Stopping => Self::Stopping,
            _ => Self::Idle,
        }
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

/// One immutable, fully-derived publication of engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub tick: u64,
    pub elapsed_simulated_s: f64,
    pub system_state: SystemState,
    pub pump: ActuatorStatus,
    pub inlet_motor: ActuatorStatus,
    pub main_valve: ValveStatus,
    pub flow_enabled: bool,
    pub bypass_enabled: bool,
    pub tank: TankState,
    pub sub_pipes: Vec<SubPipeStatus>,
    pub bernoulli: BernoulliState,
    pub inlet_flow_m3_per_h: f64,
    pub outlet_flow_m3_per_h: f64,
    /// Pump delivery through the main valve (or bypass), m³/h
    pub flow_value_m3_per_h: f64,
    /// Gauge pressure: tank column plus pump contribution through the main
    /// valve (or bypass), Pa
    pub pressure_value_pa: f64,
}

impl SystemSnapshot {
    pub fn sub_pipe(&self, id: SubPipeId) -> Option<&SubPipeStatus> {
        self.sub_pipes.iter().find(|p| p.id == id)
    }

    pub fn section(&self, section: SnapshotSection) -> SectionView {
        match section {
            SnapshotSection::Pump => SectionView::Pump(self.pump),
            SnapshotSection::InletMotor => SectionView::InletMotor(self.inlet_motor),
            SnapshotSection::MainValve => SectionView::MainValve(self.main_valve),
            SnapshotSection::FlowControls => SectionView::FlowControls {
                flow_enabled: self.flow_enabled,
                bypass_enabled: self.bypass_enabled,
                flow_value_m3_per_h: self.flow_value_m3_per_h,
                pressure_value_pa: self.pressure_value_pa,
            },
            SnapshotSection::Tank => SectionView::Tank(self.tank),
            SnapshotSection::SubPipes => SectionView::SubPipes(self.sub_pipes.clone()),
            SnapshotSection::Bernoulli => SectionView::Bernoulli(self.bernoulli.clone()),
            SnapshotSection::SystemState => SectionView::SystemState(self.system_state),
        }
    }
}

/// Named part of a snapshot that can be subscribed to on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSection {
    Pump,
    InletMotor,
    MainValve,
    FlowControls,
    Tank,
    SubPipes,
    Bernoulli,
    SystemState,
}

impl SnapshotSection {
    pub const ALL: [SnapshotSection; 8] = [
        Self::Pump,
        Self::InletMotor,
        Self::MainValve,
        Self::FlowControls,
        Self::Tank,
        Self::SubPipes,
        Self::Bernoulli,
        Self::SystemState,
    ];
}

/// Owned copy of one snapshot section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "section", content = "value", rename_all = "snake_case")]
pub enum SectionView {
    Pump(ActuatorStatus),
    InletMotor(ActuatorStatus),
    MainValve(ValveStatus),
    FlowControls {
        flow_enabled: bool,
        bypass_enabled: bool,
        flow_value_m3_per_h: f64,
        pressure_value_pa: f64,
    },
    Tank(TankState),
    SubPipes(Vec<SubPipeStatus>),
    Bernoulli(BernoulliState),
    SystemState(SystemState),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActuatorState as A;

    #[test]
    fn fault_wins() {
        assert_eq!(SystemState::derive(A::Running, A::Fault, true, 1.0), SystemState::Fault);
        assert_eq!(SystemState::derive(A::Fault, A::Idle, false, 0.0), SystemState::Fault);
    }

    #[test]
    fn running_needs_outflow() {
        assert_eq!(SystemState::derive(A::Idle, A::Idle, true, 0.01), SystemState::Running);
        assert_eq!(SystemState::derive(A::Running, A::Idle, false, 0.01), SystemState::Running);
        assert_eq!(SystemState::derive(A::Idle, A::Idle, true, 0.0), SystemState::Idle);
    }

    #[test]
    fn transitional_pump_is_mirrored() {
        assert_eq!(SystemState::derive(A::Starting, A::Idle, false, 0.0), SystemState::Starting);
        assert_eq!(SystemState::derive(A::Stopping, A::Running, false, 0.0), SystemState::Stopping);
        // inlet motor ramps are not mirrored
        assert_eq!(SystemState::derive(A::Idle, A::Starting, false, 0.0), SystemState::Idle);
    }
}
