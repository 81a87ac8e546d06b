//! Simulation engine: owns every component and runs the per-tick update.
//!
//! One tick, in order:
//! 1. take the elapsed time (wall clock for [`SimulationEngine::tick`], given
//!    for [`SimulationEngine::advance`])
//! 2. accumulate simulated time
//! 3. advance pump, inlet motor, main valve and sub-pipe valves
//! 4. recompute the hydraulics from tank level and valve openings
//! 5. integrate inlet minus outlet flow into the tank level
//! 6. derive the aggregate [`SystemState`]
//! 7. publish a new [`SystemSnapshot`] to subscribers
//!
//! Control commands only change component targets. Their effect shows up in
//! the snapshot published by the next tick. The single exception is
//! [`SimulationEngine::reset`], which rebuilds the initial state and publishes
//! it immediately.

use std::sync::Arc;
use std::time::Instant;

use hf_controls::{ActuatorStateMachine, ActuatorStatus, ValveActuator, ValveStatus};
use hf_core::SubPipeId;
use hf_core::units::per_second_to_per_hour;
use hf_physics::{BernoulliInputs, BernoulliState, BernoulliStateComputer};
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::SimResult;
use crate::snapshot::{SectionView, SnapshotSection, SystemSnapshot, SystemState};
use crate::sub_pipe::{SubPipe, SubPipeStatus};
use crate::subscription::{SubscriptionId, Subscribers};
use crate::tank::TankState;

pub struct SimulationEngine {
    config: EngineConfig,
    hydraulics: BernoulliStateComputer,
    pump: ActuatorStateMachine,
    inlet_motor: ActuatorStateMachine,
    main_valve: ValveActuator,
    sub_pipes: Vec<SubPipe>,
    tank: TankState,
    flow_enabled: bool,
    bypass_enabled: bool,
    elapsed_s: f64,
    tick_count: u64,
    last_wall_tick: Option<Instant>,
    snapshot: Arc<SystemSnapshot>,
    subscribers: Subscribers,
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("tick", &self.tick_count)
            .field("elapsed_s", &self.elapsed_s)
            .field("system_state", &self.snapshot.system_state)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

impl SimulationEngine {
    /// Build an engine in its initial state from a config.
    pub fn new(config: EngineConfig) -> SimResult<Self> {
        config.validate()?;

        let sub_pipes = config
            .sub_pipes
            .iter()
            .map(SubPipe::from_config)
            .collect::<SimResult<Vec<_>>>()?;
        let hydraulics = BernoulliStateComputer::new(config.fluid.properties());
        let pump = ActuatorStateMachine::new(config.pump.spec())?;
        let inlet_motor = ActuatorStateMachine::new(config.inlet_motor.spec())?;
        let main_valve =
            ValveActuator::new(config.main_valve.spec(), config.main_valve.initial_position)?;
        let tank = TankState::from_config(&config.tank);

        let mut engine = Self {
            hydraulics,
            pump,
            inlet_motor,
            main_valve,
            sub_pipes,
            tank,
            flow_enabled: false,
            bypass_enabled: false,
            elapsed_s: 0.0,
            tick_count: 0,
            last_wall_tick: None,
            snapshot: Arc::new(placeholder_snapshot(tank)),
            subscribers: Subscribers::new(),
            config,
        };
        engine.snapshot = Arc::new(engine.settled_snapshot());

        info!(
            sub_pipes = engine.sub_pipes.len(),
            level_percent = engine.tank.level_percent,
            "simulation engine ready"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Tick
    // ---------------------------------------------------------------------

    /// Advance by the wall time elapsed since the previous `tick`.
    ///
    /// The first tick after construction, reset or [`Self::resync_clock`]
    /// advances by zero. There is no upper bound: a stalled host produces one
    /// large catch-up step.
    pub fn tick(&mut self) -> Arc<SystemSnapshot> {
        let now = Instant::now();
        let dt_s = self
            .last_wall_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_wall_tick = Some(now);
        self.advance(dt_s)
    }

    /// Forget the last wall-clock sample so paused time is not replayed.
    pub fn resync_clock(&mut self) {
        self.last_wall_tick = None;
    }

    /// Advance by an explicit `dt_s` seconds. Negative or non-finite deltas
    /// count as zero.
    pub fn advance(&mut self, dt_s: f64) -> Arc<SystemSnapshot> {
        let dt_s = if dt_s.is_finite() { dt_s.max(0.0) } else { 0.0 };
        if dt_s > self.config.integration.catch_up_warn_s {
            warn!(dt_s, "large catch-up step");
        }

        self.elapsed_s += dt_s;
        self.tick_count += 1;

        let dt_ms = dt_s * 1000.0;
        if let Some(state) = self.pump.tick(dt_ms) {
            debug!(state = state.name(), "pump transition complete");
        }
        if let Some(state) = self.inlet_motor.tick(dt_ms) {
            debug!(state = state.name(), "inlet motor transition complete");
        }
        self.main_valve.tick(dt_s);
        for pipe in &mut self.sub_pipes {
            pipe.valve_mut().tick(dt_s);
        }

        let bernoulli = self.hydraulics.compute(&self.bernoulli_inputs());

        let inflow = self.inlet_motor.flow_rate();
        let outflow = per_second_to_per_hour(bernoulli.total_flow_rate_m3_per_s);
        let delta = self.tank.integrate(
            inflow,
            outflow,
            dt_s,
            self.config.integration.amplification_factor,
        );

        trace!(
            tick = self.tick_count,
            dt_s,
            level_percent = self.tank.level_percent,
            level_delta = delta,
            exit_velocity_mps = bernoulli.exit_velocity_mps,
            "tick"
        );

        let snapshot = Arc::new(self.build_snapshot(bernoulli, inflow, outflow));
        let previous = std::mem::replace(&mut self.snapshot, Arc::clone(&snapshot));
        if previous.system_state != snapshot.system_state {
            debug!(
                from = previous.system_state.name(),
                to = snapshot.system_state.name(),
                "system state changed"
            );
        }
        self.subscribers.publish(&snapshot);
        snapshot
    }

    fn bernoulli_inputs(&self) -> BernoulliInputs {
        BernoulliInputs {
            tank_level_percent: self.tank.level_percent,
            tank_height_m: self.tank.height_m,
            tank_radius_m: self.tank.radius_m,
            outlet_height_m: self.tank.outlet_height_m,
            main_pipe_radius_m: self.config.main_pipe_radius_m,
            sub_pipes: self
                .sub_pipes
                .iter()
                .map(|p| p.hydraulic_input(self.flow_enabled))
                .collect(),
            pump_running: self.pump.is_running(),
            pump_pressure_pa: self.config.pump.assist_pressure_pa,
        }
    }

    /// Snapshot of the current state without advancing time.
    fn settled_snapshot(&self) -> SystemSnapshot {
        let bernoulli = self.hydraulics.compute(&self.bernoulli_inputs());
        let inflow = self.inlet_motor.flow_rate();
        let outflow = per_second_to_per_hour(bernoulli.total_flow_rate_m3_per_s);
        self.build_snapshot(bernoulli, inflow, outflow)
    }

    fn build_snapshot(
        &self,
        bernoulli: BernoulliState,
        inflow_m3_per_h: f64,
        outflow_m3_per_h: f64,
    ) -> SystemSnapshot {
        let sub_pipes = self
            .sub_pipes
            .iter()
            .zip(&bernoulli.sub_pipes)
            .map(|(pipe, flow)| pipe.status(flow, self.flow_enabled))
            .collect();

        // bypass routes pump delivery around the main valve
        let valve_factor = if self.bypass_enabled {
            1.0
        } else {
            self.main_valve.flow_factor()
        };
        let flow_value = if self.flow_enabled {
            self.pump.flow_rate() * valve_factor
        } else {
            0.0
        };
        let pressure_value = self.hydraulics.fluid().specific_weight() * bernoulli.water_height_m
            + self.pump.pressure_contribution() * valve_factor;

        SystemSnapshot {
            tick: self.tick_count,
            elapsed_simulated_s: self.elapsed_s,
            system_state: SystemState::derive(
                self.pump.state(),
                self.inlet_motor.state(),
                self.flow_enabled,
                bernoulli.total_flow_rate_m3_per_s,
            ),
            pump: self.pump.status(),
            inlet_motor: self.inlet_motor.status(),
            main_valve: self.main_valve.status(),
            flow_enabled: self.flow_enabled,
            bypass_enabled: self.bypass_enabled,
            tank: self.tank,
            sub_pipes,
            bernoulli,
            inlet_flow_m3_per_h: inflow_m3_per_h,
            outlet_flow_m3_per_h: outflow_m3_per_h,
            flow_value_m3_per_h: flow_value,
            pressure_value_pa: pressure_value,
        }
    }

    // ---------------------------------------------------------------------
    // Control surface
    // ---------------------------------------------------------------------

    pub fn start_pump(&mut self) -> bool {
        let accepted = self.pump.start();
        debug!(accepted, "start pump");
        accepted
    }

    pub fn stop_pump(&mut self) -> bool {
        let accepted = self.pump.stop();
        debug!(accepted, "stop pump");
        accepted
    }

    pub fn toggle_pump(&mut self) -> bool {
        if self.pump.is_engaged() {
            self.stop_pump()
        } else {
            self.start_pump()
        }
    }

    pub fn start_inlet_motor(&mut self) -> bool {
        let accepted = self.inlet_motor.start();
        debug!(accepted, "start inlet motor");
        accepted
    }

    pub fn stop_inlet_motor(&mut self) -> bool {
        let accepted = self.inlet_motor.stop();
        debug!(accepted, "stop inlet motor");
        accepted
    }

    pub fn toggle_inlet_motor(&mut self) -> bool {
        if self.inlet_motor.is_engaged() {
            self.stop_inlet_motor()
        } else {
            self.start_inlet_motor()
        }
    }

    /// Returns the clamped target actually applied.
    pub fn set_main_valve_position(&mut self, percent: f64) -> f64 {
        let target = self.main_valve.set_position(percent);
        debug!(requested = percent, target, "main valve position");
        target
    }

    pub fn open_main_valve(&mut self) -> f64 {
        self.main_valve.open()
    }

    pub fn close_main_valve(&mut self) -> f64 {
        self.main_valve.close()
    }

    /// Returns `true` if flow was previously disabled.
    pub fn enable_flow(&mut self) -> bool {
        self.set_flow_enabled(true)
    }

    /// Returns `true` if flow was previously enabled.
    pub fn disable_flow(&mut self) -> bool {
        self.set_flow_enabled(false)
    }

    /// Returns the new flow-enable state.
    pub fn toggle_flow(&mut self) -> bool {
        self.set_flow_enabled(!self.flow_enabled);
        self.flow_enabled
    }

    fn set_flow_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.flow_enabled != enabled;
        self.flow_enabled = enabled;
        if changed {
            debug!(enabled, "flow enable");
        }
        changed
    }

    /// Returns the clamped target, or `None` for an unknown sub-pipe.
    pub fn set_sub_pipe_valve(&mut self, id: SubPipeId, percent: f64) -> Option<f64> {
        self.with_sub_pipe(id, |valve| valve.set_position(percent))
    }

    pub fn open_sub_pipe(&mut self, id: SubPipeId) -> Option<f64> {
        self.with_sub_pipe(id, ValveActuator::open)
    }

    pub fn close_sub_pipe(&mut self, id: SubPipeId) -> Option<f64> {
        self.with_sub_pipe(id, ValveActuator::close)
    }

    pub fn toggle_sub_pipe(&mut self, id: SubPipeId) -> Option<f64> {
        self.with_sub_pipe(id, ValveActuator::toggle)
    }

    fn with_sub_pipe(
        &mut self,
        id: SubPipeId,
        command: impl FnOnce(&mut ValveActuator) -> f64,
    ) -> Option<f64> {
        match self.sub_pipes.iter_mut().find(|p| p.id() == id) {
            Some(pipe) => {
                let target = command(pipe.valve_mut());
                debug!(%id, target, "sub-pipe valve");
                Some(target)
            }
            None => {
                debug!(%id, "ignoring command for unknown sub-pipe");
                None
            }
        }
    }

    /// Operator override of the level; returns the clamped value.
    pub fn set_tank_level(&mut self, percent: f64) -> f64 {
        let level = self.tank.set_level(percent);
        debug!(requested = percent, level, "tank level override");
        level
    }

    /// Returns the outlet height clamped to `[0, tank height]`.
    pub fn set_outlet_height(&mut self, meters: f64) -> f64 {
        let height = self.tank.set_outlet_height(meters);
        debug!(requested = meters, height, "outlet height");
        height
    }

    /// Returns the new bypass state.
    pub fn toggle_bypass(&mut self) -> bool {
        self.set_bypass(!self.bypass_enabled);
        self.bypass_enabled
    }

    /// Returns `true` if the bypass state changed.
    pub fn set_bypass(&mut self, enabled: bool) -> bool {
        let changed = self.bypass_enabled != enabled;
        self.bypass_enabled = enabled;
        if changed {
            debug!(enabled, "bypass");
        }
        changed
    }

    /// Force the pump into `Fault`. Nothing inside the engine calls this.
    pub fn inject_pump_fault(&mut self) {
        warn!("pump fault injected");
        self.pump.fault();
    }

    /// Force the inlet motor into `Fault`.
    pub fn inject_inlet_fault(&mut self) {
        warn!("inlet motor fault injected");
        self.inlet_motor.fault();
    }

    /// Return faulted actuators to `Idle`. Returns `true` if any was faulted.
    pub fn clear_faults(&mut self) -> bool {
        let pump = self.pump.clear_fault();
        let inlet = self.inlet_motor.clear_fault();
        pump || inlet
    }

    /// Return every component to its configured initial state, zero the
    /// simulated clock and publish the initial snapshot. Subscriptions are
    /// kept.
    pub fn reset(&mut self) -> Arc<SystemSnapshot> {
        self.pump.reset();
        self.inlet_motor.reset();
        self.main_valve.reset(self.config.main_valve.initial_position);
        for pipe in &mut self.sub_pipes {
            pipe.reset();
        }
        self.tank = TankState::from_config(&self.config.tank);
        self.flow_enabled = false;
        self.bypass_enabled = false;
        self.elapsed_s = 0.0;
        self.tick_count = 0;
        self.last_wall_tick = None;

        let snapshot = Arc::new(self.settled_snapshot());
        self.snapshot = Arc::clone(&snapshot);
        info!("simulation engine reset");
        self.subscribers.publish(&snapshot);
        snapshot
    }

    // ---------------------------------------------------------------------
    // Read surface (latest published snapshot)
    // ---------------------------------------------------------------------

    pub fn snapshot(&self) -> &SystemSnapshot {
        &self.snapshot
    }

    pub fn full_state(&self) -> Arc<SystemSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn pump_status(&self) -> ActuatorStatus {
        self.snapshot.pump
    }

    pub fn inlet_motor_status(&self) -> ActuatorStatus {
        self.snapshot.inlet_motor
    }

    /// Main valve position in percent.
    pub fn valve_position(&self) -> f64 {
        self.snapshot.main_valve.current_position
    }

    pub fn flow_value(&self) -> f64 {
        self.snapshot.flow_value_m3_per_h
    }

    pub fn pressure_value(&self) -> f64 {
        self.snapshot.pressure_value_pa
    }

    pub fn tank_level(&self) -> f64 {
        self.snapshot.tank.level_percent
    }

    pub fn system_state(&self) -> SystemState {
        self.snapshot.system_state
    }

    pub fn sub_pipes(&self) -> &[SubPipeStatus] {
        &self.snapshot.sub_pipes
    }

    pub fn bernoulli_state(&self) -> &BernoulliState {
        &self.snapshot.bernoulli
    }

    pub fn elapsed_simulated_s(&self) -> f64 {
        self.snapshot.elapsed_simulated_s
    }

    pub fn is_flow_enabled(&self) -> bool {
        self.flow_enabled
    }

    pub fn is_bypass_enabled(&self) -> bool {
        self.bypass_enabled
    }

    pub fn sub_pipe_ids(&self) -> Vec<SubPipeId> {
        self.sub_pipes.iter().map(SubPipe::id).collect()
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&SystemSnapshot) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn subscribe_select<T, S, L>(&mut self, selector: S, listener: L) -> SubscriptionId
    where
        T: PartialEq + 'static,
        S: Fn(&SystemSnapshot) -> T + 'static,
        L: FnMut(&T) + 'static,
    {
        self.subscribers.subscribe_select(selector, listener)
    }

    /// Deliver one named section, only when it changes.
    pub fn subscribe_section(
        &mut self,
        section: SnapshotSection,
        listener: impl FnMut(&SectionView) + 'static,
    ) -> SubscriptionId {
        self.subscribers
            .subscribe_select(move |snapshot| snapshot.section(section), listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Stand-in used only while the engine is being assembled.
fn placeholder_snapshot(tank: TankState) -> SystemSnapshot {
    SystemSnapshot {
        tick: 0,
        elapsed_simulated_s: 0.0,
        system_state: SystemState::Idle,
        pump: ActuatorStatus::default(),
        inlet_motor: ActuatorStatus::default(),
        main_valve: ValveStatus::default(),
        flow_enabled: false,
        bypass_enabled: false,
        tank,
        sub_pipes: Vec::new(),
        bernoulli: BernoulliState::default(),
        inlet_flow_m3_per_h: 0.0,
        outlet_flow_m3_per_h: 0.0,
        flow_value_m3_per_h: 0.0,
        pressure_value_pa: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_controls::ActuatorState;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine() -> SimulationEngine {
        SimulationEngine::new(EngineConfig::default()).unwrap()
    }

    fn pipe(n: u32) -> SubPipeId {
        SubPipeId::from_number(n).unwrap()
    }

    fn run_for(engine: &mut SimulationEngine, seconds: f64, dt: f64) {
        let steps = (seconds / dt).round() as usize;
        for _ in 0..steps {
            engine.advance(dt);
        }
    }

    #[test]
    fn fresh_engine_is_idle() {
        let e = engine();
        assert_eq!(e.system_state(), SystemState::Idle);
        assert_eq!(e.tank_level(), 50.0);
        assert_eq!(e.elapsed_simulated_s(), 0.0);
        assert_eq!(e.sub_pipes().len(), 3);
        assert_eq!(e.pump_status().state, ActuatorState::Idle);
    }

    #[test]
    fn commands_show_up_on_next_tick() {
        let mut e = engine();
        assert!(e.start_pump());
        assert_eq!(e.pump_status().state, ActuatorState::Idle);
        e.advance(0.0);
        assert_eq!(e.pump_status().state, ActuatorState::Starting);
    }

    #[test]
    fn unknown_sub_pipe_is_ignored() {
        let mut e = engine();
        assert_eq!(e.open_sub_pipe(pipe(7)), None);
        assert_eq!(e.open_sub_pipe(pipe(2)), Some(100.0));
    }

    #[test]
    fn flow_disabled_masks_sub_pipes() {
        let mut e = engine();
        e.open_sub_pipe(pipe(1));
        run_for(&mut e, 3.0, 0.05);
        assert_eq!(e.sub_pipes()[0].valve_position, 100.0);
        assert!(!e.sub_pipes()[0].is_open);
        assert_eq!(e.bernoulli_state().total_flow_rate_m3_per_s, 0.0);
        assert_eq!(e.tank_level(), 50.0);
    }

    #[test]
    fn draining_lowers_level() {
        let mut e = engine();
        e.enable_flow();
        e.open_sub_pipe(pipe(1));
        run_for(&mut e, 5.0, 0.1);
        assert!(e.tank_level() < 50.0);
        assert_eq!(e.system_state(), SystemState::Running);
    }

    #[test]
    fn pump_running_raises_exit_velocity() {
        let mut plain = engine();
        plain.enable_flow();
        plain.open_sub_pipe(pipe(1));
        let mut pumped = engine();
        pumped.enable_flow();
        pumped.open_sub_pipe(pipe(1));
        pumped.start_pump();
        for _ in 0..30 {
            plain.advance(0.1);
            pumped.advance(0.1);
        }
        assert!(pumped.bernoulli_state().pump_assisted);
        assert!(
            pumped.bernoulli_state().exit_velocity_mps > plain.bernoulli_state().exit_velocity_mps
        );
    }

    #[test]
    fn legacy_flow_value_follows_main_valve_and_bypass() {
        let mut e = engine();
        e.enable_flow();
        e.start_pump();
        run_for(&mut e, 3.0, 0.1);
        // main valve closed
        assert_eq!(e.flow_value(), 0.0);
        e.set_bypass(true);
        e.advance(0.0);
        assert_eq!(e.flow_value(), 50.0);
        e.set_bypass(false);
        e.open_main_valve();
        run_for(&mut e, 3.0, 0.1);
        assert_eq!(e.flow_value(), 50.0);
        assert!(e.pressure_value() > 50_000.0);
    }

    #[test]
    fn fault_injection_dominates() {
        let mut e = engine();
        e.enable_flow();
        e.open_sub_pipe(pipe(1));
        run_for(&mut e, 2.0, 0.1);
        e.inject_inlet_fault();
        e.advance(0.1);
        assert_eq!(e.system_state(), SystemState::Fault);
        assert!(e.clear_faults());
        e.advance(0.1);
        assert_eq!(e.system_state(), SystemState::Running);
    }

    #[test]
    fn toggles_report_new_state() {
        let mut e = engine();
        assert!(e.toggle_flow());
        assert!(!e.toggle_flow());
        assert!(e.toggle_bypass());
        assert!(!e.set_bypass(true));
        assert_eq!(e.toggle_sub_pipe(pipe(3)), Some(100.0));
        assert_eq!(e.toggle_sub_pipe(pipe(3)), Some(0.0));
    }

    #[test]
    fn negative_dt_counts_as_zero() {
        let mut e = engine();
        e.advance(-1.0);
        e.advance(f64::NAN);
        assert_eq!(e.elapsed_simulated_s(), 0.0);
        assert_eq!(e.snapshot().tick, 2);
    }

    #[test]
    fn wall_clock_tick_starts_at_zero() {
        let mut e = engine();
        let first = e.tick();
        assert_eq!(first.elapsed_simulated_s, 0.0);
        let second = e.tick();
        assert!(second.elapsed_simulated_s >= 0.0);
    }

    #[test]
    fn listeners_see_each_tick() {
        let mut e = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = e.subscribe(move |s| sink.borrow_mut().push(s.tick));
        e.advance(0.1);
        e.advance(0.1);
        assert!(e.unsubscribe(id));
        e.advance(0.1);
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert!(!e.unsubscribe(id));
    }
}
