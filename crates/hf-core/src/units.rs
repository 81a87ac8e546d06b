// hf-core/src/units.rs

use uom::si::f64::{
    Acceleration as UomAcceleration, DynamicViscosity as UomDynamicViscosity,
    MassDensity as UomMassDensity, Pressure as UomPressure,
};

// Public canonical unit types (SI, f64)
pub type Accel = UomAcceleration;
pub type DynVisc = UomDynamicViscosity;
pub type Density = UomMassDensity;
pub type Pressure = UomPressure;

/// Seconds per hour, for m³/h <-> m³/s conversions.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn kg_per_m3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn pa_s(v: f64) -> DynVisc {
    use uom::si::dynamic_viscosity::pascal_second;
    DynVisc::new::<pascal_second>(v)
}

/// m³/h -> m³/s
#[inline]
pub fn per_hour_to_per_second(v: f64) -> f64 {
    v / SECONDS_PER_HOUR
}

/// m³/s -> m³/h
#[inline]
pub fn per_second_to_per_hour(v: f64) -> f64 {
    v * SECONDS_PER_HOUR
}

/// Fixed physical constants. These are configuration, never derived.
pub mod constants {
    use super::*;

    pub const GRAVITY_MPS2: f64 = 9.81;
    pub const WATER_DENSITY_KG_M3: f64 = 1000.0;
    pub const ATMOSPHERIC_PRESSURE_PA: f64 = 101_325.0;
    /// Water at ~20 °C.
    pub const WATER_VISCOSITY_PA_S: f64 = 1.0e-3;

    #[inline]
    pub fn gravity() -> Accel {
        use uom::si::acceleration::meter_per_second_squared;
        Accel::new::<meter_per_second_squared>(GRAVITY_MPS2)
    }

    #[inline]
    pub fn water_density() -> Density {
        kg_per_m3(WATER_DENSITY_KG_M3)
    }

    #[inline]
    pub fn atmospheric_pressure() -> Pressure {
        pa(ATMOSPHERIC_PRESSURE_PA)
    }

    #[inline]
    pub fn water_viscosity() -> DynVisc {
        pa_s(WATER_VISCOSITY_PA_S)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_hold_raw_value() {
        assert_eq!(pa(250.0).value, 250.0);
        assert_eq!(kg_per_m3(998.0).value, 998.0);
        assert_eq!(pa_s(2.0e-3).value, 2.0e-3);
    }

    #[test]
    fn constants_hold_si_values() {
        assert_eq!(constants::gravity().value, 9.81);
        assert_eq!(constants::water_density().value, 1000.0);
        assert_eq!(constants::atmospheric_pressure().value, 101_325.0);
        assert_eq!(constants::water_viscosity().value, 1.0e-3);
    }

    #[test]
    fn hourly_conversion() {
        assert_eq!(per_second_to_per_hour(1.0), 3600.0);
        assert_eq!(per_hour_to_per_second(3600.0), 1.0);
    }
}
