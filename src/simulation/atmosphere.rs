//! Air mass and pressure helpers.

/// Standard sea-level pressure in Pa
pub const SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;

/// Relative (not pressure-corrected) air mass, Kasten & Young (1989).
///
/// Returns `None` when the sun is at or below the horizon.
pub fn relative_airmass(zenith_deg: f64) -> Option<f64> {
    if !zenith_deg.is_finite() || zenith_deg >= 90.0 {
        return None;
    }
    let z = zenith_deg.to_radians();
    Some(1.0 / (z.cos() + 0.50572 * (6.07995 + (90.0 - zenith_deg)).powf(-1.6364)))
}

/// Average atmospheric pressure at an altitude above sea level, in Pa
pub fn altitude_to_pressure(altitude_m: f64) -> f64 {
    100.0 * ((44_331.514 - altitude_m) / 11_880.516).powf(1.0 / 0.1902632)
}

/// Air mass corrected for site pressure
pub fn absolute_airmass(relative: f64, pressure_pa: f64) -> f64 {
    relative * pressure_pa / SEA_LEVEL_PRESSURE_PA
}
