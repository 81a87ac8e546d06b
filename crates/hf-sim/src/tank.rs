//! Reservoir level state and mass-balance integration.

use crate::config::TankConfig;
use hf_core::numeric::clamp;
use hf_core::units::per_hour_to_per_second;
use hf_physics::calculators::cylinder_volume;
use serde::{Deserialize, Serialize};

/// Vertical cylindrical tank. Geometry is fixed; level and outlet height move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TankState {
    pub level_percent: f64,
    pub min_level_percent: f64,
    pub max_level_percent: f64,
    pub capacity_m3: f64,
    pub height_m: f64,
    pub radius_m: f64,
    pub outlet_height_m: f64,
}

impl TankState {
    /// Build from a validated config.
    pub fn from_config(cfg: &TankConfig) -> Self {
        Self {
            level_percent: clamp(
                cfg.initial_level_percent,
                cfg.min_level_percent,
                cfg.max_level_percent,
            ),
            min_level_percent: cfg.min_level_percent,
            max_level_percent: cfg.max_level_percent,
            capacity_m3: cylinder_volume(cfg.radius_m, cfg.height_m),
            height_m: cfg.height_m,
            radius_m: cfg.radius_m,
            outlet_height_m: clamp(cfg.outlet_height_m, 0.0, cfg.height_m),
        }
    }

    pub fn water_height_m(&self) -> f64 {
        self.level_percent / 100.0 * self.height_m
    }

    pub fn volume_m3(&self) -> f64 {
        self.level_percent / 100.0 * self.capacity_m3
    }

    pub fn free_volume_m3(&self) -> f64 {
        self.capacity_m3 - self.volume_m3()
    }

    pub fn is_full(&self) -> bool {
        self.level_percent >= self.max_level_percent
    }

    pub fn is_empty(&self) -> bool {
        self.level_percent <= self.min_level_percent
    }

    /// Override the level, bypassing integration. Returns the clamped level.
    /// Non-finite input leaves the level unchanged.
    pub fn set_level(&mut self, percent: f64) -> f64 {
        if percent.is_finite() {
            self.level_percent = clamp(percent, self.min_level_percent, self.max_level_percent);
        }
        self.level_percent
    }

    /// Move the outlet, clamped to `[0, height]`. Returns the applied height.
    pub fn set_outlet_height(&mut self, meters: f64) -> f64 {
        if meters.is_finite() {
            self.outlet_height_m = clamp(meters, 0.0, self.height_m);
        }
        self.outlet_height_m
    }

    /// Integrate net flow over `dt_s`:
    ///
    /// ```text
    /// ΔV = (Q_in - Q_out) · dt_h
    /// Δlevel = ΔV / capacity · 100 · amplification
    /// ```
    ///
    /// Flows are in m³/h. Returns the level change actually applied after
    /// clamping.
    pub fn integrate(
        &mut self,
        inflow_m3_per_h: f64,
        outflow_m3_per_h: f64,
        dt_s: f64,
        amplification: f64,
    ) -> f64 {
        let before = self.level_percent;
        let net_volume_m3 = per_hour_to_per_second(inflow_m3_per_h - outflow_m3_per_h) * dt_s;
        let delta = net_volume_m3 / self.capacity_m3 * 100.0 * amplification;
        if delta.is_finite() {
            self.level_percent = clamp(
                before + delta,
                self.min_level_percent,
                self.max_level_percent,
            );
        }
        self.level_percent - before
    }
}
