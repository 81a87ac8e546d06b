//! Pure hydraulic calculators. Every function is total: inputs that would make
//! a formula undefined (negative head, zero area) map to a defined value.

use crate::fluid::FluidProperties;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Upper Reynolds bound of laminar flow.
pub const RE_LAMINAR_MAX: f64 = 2300.0;
/// Upper Reynolds bound of transitional flow.
pub const RE_TRANSITIONAL_MAX: f64 = 4000.0;

/// Flow regime from Reynolds number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowRegime {
    #[default]
    Laminar,
    Transitional,
    Turbulent,
}

impl FlowRegime {
    pub fn classify(reynolds: f64) -> Self {
        if reynolds < RE_LAMINAR_MAX {
            Self::Laminar
        } else if reynolds < RE_TRANSITIONAL_MAX {
            Self::Transitional
        } else {
            Self::Turbulent
        }
    }
}

/// Torricelli exit velocity `v = sqrt(2·g·h)`; zero for `h <= 0`.
pub fn exit_velocity(fluid: &FluidProperties, head_m: f64) -> f64 {
    if head_m > 0.0 {
        (2.0 * fluid.g() * head_m).sqrt()
    } else {
        0.0
    }
}

/// Head with a pump pressure folded in as equivalent column: `h + P/(ρ·g)`.
///
/// This treats the pump as extra static head rather than combining two
/// independent pressure sources.
pub fn pump_assisted_head(fluid: &FluidProperties, head_m: f64, pump_pressure_pa: f64) -> f64 {
    head_m + pump_pressure_pa / fluid.specific_weight()
}

/// Exit velocity with optional pump assistance.
pub fn exit_velocity_with_pump(
    fluid: &FluidProperties,
    head_m: f64,
    pump_pressure_pa: Option<f64>,
) -> f64 {
    match pump_pressure_pa {
        Some(p) => exit_velocity(fluid, pump_assisted_head(fluid, head_m, p)),
        None => exit_velocity(fluid, head_m),
    }
}

/// Circular cross-section `π·r²`.
pub fn circle_area(radius_m: f64) -> f64 {
    PI * radius_m.max(0.0).powi(2)
}

/// Volumetric flow `Q = π·r²·v` (m³/s).
pub fn volumetric_flow(radius_m: f64, velocity_mps: f64) -> f64 {
    circle_area(radius_m) * velocity_mps
}

/// Absolute pressure at `depth_m` below a free surface moving at `velocity_mps`:
/// `P = P_atm + ρ·g·h + ½·ρ·v²`.
pub fn pressure_at(fluid: &FluidProperties, depth_m: f64, velocity_mps: f64) -> f64 {
    fluid.p_atm()
        + fluid.specific_weight() * depth_m.max(0.0)
        + 0.5 * fluid.rho() * velocity_mps * velocity_mps
}

/// Reynolds number `Re = ρ·v·D/μ`.
pub fn reynolds_number(fluid: &FluidProperties, velocity_mps: f64, diameter_m: f64) -> f64 {
    let mu = fluid.mu();
    if mu <= 0.0 {
        return 0.0;
    }
    fluid.rho() * velocity_mps.abs() * diameter_m.max(0.0) / mu
}

/// Darcy friction factor for a smooth pipe.
///
/// Laminar: `64/Re`. Otherwise Blasius `0.316·Re^-0.25`. Zero when there is
/// no flow.
pub fn friction_factor(reynolds: f64) -> f64 {
    if reynolds <= 0.0 {
        0.0
    } else if reynolds < RE_LAMINAR_MAX {
        64.0 / reynolds
    } else {
        0.316 * reynolds.powf(-0.25)
    }
}

/// Darcy-Weisbach head loss `h_f = f·(L/D)·(v²/(2g))` in metres.
pub fn friction_head_loss(
    fluid: &FluidProperties,
    friction_factor: f64,
    length_m: f64,
    diameter_m: f64,
    velocity_mps: f64,
) -> f64 {
    if diameter_m <= 0.0 {
        return 0.0;
    }
    friction_factor * (length_m.max(0.0) / diameter_m) * (velocity_mps * velocity_mps)
        / (2.0 * fluid.g())
}

/// Volume of a vertical cylinder `π·r²·h` (m³).
pub fn cylinder_volume(radius_m: f64, height_m: f64) -> f64 {
    circle_area(radius_m) * height_m.max(0.0)
}

/// Time to drain a tank through an outlet: `(A_tank/A_outlet)·sqrt(2h/g)`.
///
/// `f64::INFINITY` when the outlet area or the head is zero: nothing drains.
pub fn drain_time(
    fluid: &FluidProperties,
    tank_area_m2: f64,
    outlet_area_m2: f64,
    head_m: f64,
) -> f64 {
    if outlet_area_m2 <= 0.0 || head_m <= 0.0 {
        return f64::INFINITY;
    }
    (tank_area_m2 / outlet_area_m2) * (2.0 * head_m / fluid.g()).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> FluidProperties {
        FluidProperties::water()
    }

    #[test]
    fn torricelli_five_metres() {
        let v = exit_velocity(&water(), 5.0);
        assert!((v - (2.0_f64 * 9.81 * 5.0).sqrt()).abs() < 1e-6);
        assert!((v - 9.9045).abs() < 1e-3);
    }

    #[test]
    fn no_head_no_velocity() {
        assert_eq!(exit_velocity(&water(), 0.0), 0.0);
        assert_eq!(exit_velocity(&water(), -1.0), 0.0);
    }

    #[test]
    fn pump_pressure_adds_head() {
        let w = water();
        // 9810 Pa is one metre of water
        assert!((pump_assisted_head(&w, 2.0, 9810.0) - 3.0).abs() < 1e-12);
        let assisted = exit_velocity_with_pump(&w, 2.0, Some(9810.0));
        assert!((assisted - exit_velocity(&w, 3.0)).abs() < 1e-12);
        assert_eq!(exit_velocity_with_pump(&w, 2.0, None), exit_velocity(&w, 2.0));
    }

    #[test]
    fn pump_alone_drives_empty_tank() {
        let v = exit_velocity_with_pump(&water(), 0.0, Some(19_620.0));
        assert!((v - exit_velocity(&water(), 2.0)).abs() < 1e-12);
    }

    #[test]
    fn flow_through_circle() {
        let q = volumetric_flow(0.1, 2.0);
        assert!((q - PI * 0.01 * 2.0).abs() < 1e-12);
        assert_eq!(volumetric_flow(0.0, 10.0), 0.0);
    }

    #[test]
    fn point_pressure() {
        let w = water();
        assert_eq!(pressure_at(&w, 0.0, 0.0), 101_325.0);
        let p = pressure_at(&w, 1.0, 2.0);
        assert!((p - (101_325.0 + 9810.0 + 2000.0)).abs() < 1e-9);
    }

    #[test]
    fn regime_boundaries() {
        assert_eq!(FlowRegime::classify(0.0), FlowRegime::Laminar);
        assert_eq!(FlowRegime::classify(2299.9), FlowRegime::Laminar);
        assert_eq!(FlowRegime::classify(2300.0), FlowRegime::Transitional);
        assert_eq!(FlowRegime::classify(3999.0), FlowRegime::Transitional);
        assert_eq!(FlowRegime::classify(4000.0), FlowRegime::Turbulent);
    }

    #[test]
    fn reynolds_for_water_pipe() {
        // 1 m/s in a 50 mm pipe: Re = 1000 * 1 * 0.05 / 1e-3 = 50_000
        let re = reynolds_number(&water(), 1.0, 0.05);
        assert!((re - 50_000.0).abs() < 1e-6);
        assert_eq!(FlowRegime::classify(re), FlowRegime::Turbulent);
    }

    #[test]
    fn friction_factor_branches() {
        assert_eq!(friction_factor(0.0), 0.0);
        assert!((friction_factor(1000.0) - 0.064).abs() < 1e-12);
        let f = friction_factor(100_000.0);
        assert!((f - 0.316 / 100_000.0_f64.powf(0.25)).abs() < 1e-12);
    }

    #[test]
    fn darcy_weisbach_head_loss() {
        let w = water();
        // f=0.02, L/D=100, v=2 -> 0.02 * 100 * 4 / 19.62
        let hf = friction_head_loss(&w, 0.02, 5.0, 0.05, 2.0);
        assert!((hf - 0.02 * 100.0 * 4.0 / 19.62).abs() < 1e-12);
        assert_eq!(friction_head_loss(&w, 0.02, 5.0, 0.0, 2.0), 0.0);
    }

    #[test]
    fn drain_time_edge_cases() {
        let w = water();
        assert!(drain_time(&w, 1.0, 0.0, 2.0).is_infinite());
        assert!(drain_time(&w, 1.0, 0.01, 0.0).is_infinite());
        let t = drain_time(&w, 1.0, 0.01, 2.0);
        assert!((t - 100.0 * (4.0_f64 / 9.81).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn cylinder() {
        assert!((cylinder_volume(1.0, 2.0) - 2.0 * PI).abs() < 1e-12);
        assert_eq!(cylinder_volume(1.0, -2.0), 0.0);
    }
}
