//! Working fluid properties.

use hf_core::units::{Accel, Density, DynVisc, Pressure, constants};

/// Constant properties of the working fluid and its surroundings.
///
/// Stored as SI quantities; calculators read the raw `.value`.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidProperties {
    pub density: Density,
    pub viscosity: DynVisc,
    pub gravity: Accel,
    pub atmospheric: Pressure,
}

impl Default for FluidProperties {
    fn default() -> Self {
        Self::water()
    }
}

impl FluidProperties {
    /// Water at room temperature under standard gravity and atmosphere.
    pub fn water() -> Self {
        Self {
            density: constants::water_density(),
            viscosity: constants::water_viscosity(),
            gravity: constants::gravity(),
            atmospheric: constants::atmospheric_pressure(),
        }
    }

    /// Water with a different dynamic viscosity.
    pub fn with_viscosity(mut self, viscosity: DynVisc) -> Self {
        self.viscosity = viscosity;
        self
    }

    /// ρ in kg/m³
    #[inline]
    pub fn rho(&self) -> f64 {
        self.density.value
    }

    /// μ in Pa·s
    #[inline]
    pub fn mu(&self) -> f64 {
        self.viscosity.value
    }

    /// g in m/s²
    #[inline]
    pub fn g(&self) -> f64 {
        self.gravity.value
    }

    /// Ambient pressure in Pa
    #[inline]
    pub fn p_atm(&self) -> f64 {
        self.atmospheric.value
    }

    /// ρ·g, the pressure per metre of head (Pa/m)
    #[inline]
    pub fn specific_weight(&self) -> f64 {
        self.rho() * self.g()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_core::units::pa_s;

    #[test]
    fn water_defaults() {
        let w = FluidProperties::water();
        assert_eq!(w.rho(), 1000.0);
        assert_eq!(w.g(), 9.81);
        assert_eq!(w.p_atm(), 101_325.0);
        assert!((w.specific_weight() - 9810.0).abs() < 1e-9);
    }

    #[test]
    fn viscosity_override() {
        let w = FluidProperties::water().with_viscosity(pa_s(2.0e-3));
        assert_eq!(w.mu(), 2.0e-3);
    }
}
