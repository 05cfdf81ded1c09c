//! # Irradiance
//!
//! Clear-sky irradiance (Ineichen/Perez) and transposition onto a tilted
//! surface (Hay & Davies sky diffuse, isotropic ground reflection).

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::solar_position::SolarPosition;

/// Solar constant used for the extraterrestrial estimate, W/m²
pub const SOLAR_CONSTANT: f64 = 1367.0;

/// Default ground reflectance
pub const DEFAULT_ALBEDO: f64 = 0.25;

/// Clear-sky irradiance components, W/m²
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearSky {
    pub ghi: f64,
    pub dni: f64,
    pub dhi: f64,
}

/// Fixed surface orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOrientation {
    /// Tilt from horizontal in degrees
    pub tilt_deg: f64,
    /// Facing direction, clockwise from north (180 = south)
    pub azimuth_deg: f64,
}

/// Irradiance on the plane of array, W/m²
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaneOfArray {
    pub poa_global: f64,
    pub poa_direct: f64,
    pub poa_diffuse: f64,
    pub poa_sky_diffuse: f64,
    pub poa_ground_diffuse: f64,
}

/// Extraterrestrial irradiance corrected for Earth-Sun distance (Spencer 1971)
pub fn extraterrestrial_irradiance(day_of_year: u32) -> f64 {
    let b = 2.0 * PI * (f64::from(day_of_year) - 1.0) / 365.0;
    let correction = 1.00011
        + 0.034221 * b.cos()
        + 0.00128 * b.sin()
        + 0.000719 * (2.0 * b).cos()
        + 0.000077 * (2.0 * b).sin();
    SOLAR_CONSTANT * correction
}

/// Ineichen/Perez clear-sky model.
///
/// `airmass_absolute` is `None` at night, which yields zero irradiance.
pub fn ineichen_clear_sky(
    apparent_zenith_deg: f64,
    airmass_absolute: Option<f64>,
    linke_turbidity: f64,
    altitude_m: f64,
    dni_extra: f64,
) -> ClearSky {
    let Some(am) = airmass_absolute else {
        return ClearSky::default();
    };
    if apparent_zenith_deg >= 90.0 || !am.is_finite() {
        return ClearSky::default();
    }

    let tl = linke_turbidity;
    let cos_zenith = apparent_zenith_deg.to_radians().cos().max(0.0);

    let fh1 = (-altitude_m / 8000.0).exp();
    let fh2 = (-altitude_m / 1250.0).exp();
    let cg1 = 5.09e-5 * altitude_m + 0.868;
    let cg2 = 3.92e-5 * altitude_m + 0.0387;

    let ghi_factor = (-cg2 * am * (fh1 + fh2 * (tl - 1.0))).exp().max(0.0);
    let ghi = cg1 * dni_extra * cos_zenith * ghi_factor;

    let b = 0.664 + 0.163 / fh1;
    let bnci = dni_extra * (b * (-0.09 * am * (tl - 1.0)).exp()).max(0.0);

    // DNI bounded by what GHI allows for this turbidity
    let bnci_limit = if cos_zenith > 0.0 {
        ((1.0 - (0.1 - 0.2 * (-tl).exp()) / (0.1 + 0.882 / fh1)) / cos_zenith).clamp(0.0, 1e20)
    } else {
        0.0
    };
    let dni = bnci.min(ghi * bnci_limit);
    let dhi = (ghi - dni * cos_zenith).max(0.0);

    ClearSky { ghi, dni, dhi }
}

/// Cosine of the angle between the sun and the surface normal
pub fn aoi_projection(surface: &SurfaceOrientation, zenith_deg: f64, azimuth_deg: f64) -> f64 {
    let tilt = surface.tilt_deg.to_radians();
    let zenith = zenith_deg.to_radians();
    let projection = tilt.cos() * zenith.cos()
        + tilt.sin() * zenith.sin() * (azimuth_deg - surface.azimuth_deg).to_radians().cos();
    projection.clamp(-1.0, 1.0)
}

/// Angle of incidence in degrees (0 = sun perpendicular to the surface)
pub fn angle_of_incidence(surface: &SurfaceOrientation, zenith_deg: f64, azimuth_deg: f64) -> f64 {
    aoi_projection(surface, zenith_deg, azimuth_deg)
        .acos()
        .to_degrees()
}

/// Transpose clear-sky irradiance onto the plane of array.
///
/// Sky diffuse follows Hay & Davies (circumsolar share proportional to the
/// anisotropy index DNI / DNI_extra), ground reflection is isotropic.
pub fn hay_davies_poa(
    surface: &SurfaceOrientation,
    sun: &SolarPosition,
    clear_sky: &ClearSky,
    dni_extra: f64,
    albedo: f64,
) -> PlaneOfArray {
    if !sun.is_above_horizon() {
        return PlaneOfArray::default();
    }

    let projection = aoi_projection(surface, sun.apparent_zenith_deg, sun.azimuth_deg);
    let tilt = surface.tilt_deg.to_radians();

    let poa_direct = (clear_sky.dni * projection).max(0.0);

    let cos_zenith = sun.apparent_zenith_deg.to_radians().cos();
    let rb = projection.max(0.0) / cos_zenith.max(0.01745);
    let anisotropy = if dni_extra > 0.0 {
        clear_sky.dni / dni_extra
    } else {
        0.0
    };
    let isotropic = clear_sky.dhi * (1.0 - anisotropy) * (1.0 + tilt.cos()) / 2.0;
    let circumsolar = clear_sky.dhi * anisotropy * rb;
    let poa_sky_diffuse = (isotropic + circumsolar).max(0.0);

    let poa_ground_diffuse = (clear_sky.ghi * albedo * (1.0 - tilt.cos()) / 2.0).max(0.0);

    let poa_diffuse = poa_sky_diffuse + poa_ground_diffuse;
    PlaneOfArray {
        poa_global: poa_direct + poa_diffuse,
        poa_direct,
        poa_diffuse,
        poa_sky_diffuse,
        poa_ground_diffuse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOUTH_45: SurfaceOrientation = SurfaceOrientation {
        tilt_deg: 45.0,
        azimuth_deg: 180.0,
    };

    #[test]
    fn test_extraterrestrial_irradiance_range() {
        let jan = extraterrestrial_irradiance(3);
        let jul = extraterrestrial_irradiance(185);
        assert!(jan > jul);
        assert!(jan > 1400.0 && jan < 1420.0, "january {jan}");
        assert!(jul > 1315.0 && jul < 1330.0, "july {jul}");
    }

    #[test]
    fn test_clear_sky_high_sun() {
        let cs = ineichen_clear_sky(30.0, Some(1.15), 3.0, 0.0, 1367.0);
        assert!(cs.ghi > 700.0 && cs.ghi < 1100.0, "ghi {}", cs.ghi);
        assert!(cs.dni > 700.0 && cs.dni < 1100.0, "dni {}", cs.dni);
        assert!(cs.dhi > 0.0 && cs.dhi < 200.0, "dhi {}", cs.dhi);

        let closure = cs.dni * 30.0_f64.to_radians().cos() + cs.dhi;
        assert!((closure - cs.ghi).abs() < 1e-6);
    }

    #[test]
    fn test_clear_sky_turbidity_reduces_beam() {
        let clean = ineichen_clear_sky(40.0, Some(1.3), 2.0, 447.0, 1367.0);
        let hazy = ineichen_clear_sky(40.0, Some(1.3), 6.0, 447.0, 1367.0);
        assert!(hazy.dni < clean.dni);
    }

    #[test]
    fn test_clear_sky_night() {
        assert_eq!(ineichen_clear_sky(95.0, None, 3.0, 0.0, 1367.0), ClearSky::default());
        assert_eq!(ineichen_clear_sky(95.0, Some(2.0), 3.0, 0.0, 1367.0), ClearSky::default());
    }

    #[test]
    fn test_angle_of_incidence() {
        // Sun perpendicular to the panel
        assert!(angle_of_incidence(&SOUTH_45, 45.0, 180.0).abs() < 1e-6);

        // cos(aoi) = cos45*cos45 + sin45*sin45*cos90 = 0.5
        let side = angle_of_incidence(&SOUTH_45, 45.0, 90.0);
        assert!((side - 60.0).abs() < 1e-6, "aoi {side}");

        // Sun behind the panel: cos(aoi) = cos45*cos60 - sin45*sin60
        let behind = angle_of_incidence(&SOUTH_45, 60.0, 0.0);
        assert!((behind - 105.0).abs() < 0.01, "aoi {behind}");

        // Grazing light lands on 90 only up to rounding
        assert!((angle_of_incidence(&SOUTH_45, 45.0, 0.0) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_poa_components_add_up() {
        let sun = SolarPosition {
            zenith_deg: 40.0,
            apparent_zenith_deg: 40.0,
            elevation_deg: 50.0,
            azimuth_deg: 170.0,
        };
        let cs = ineichen_clear_sky(40.0, Some(1.3), 3.0, 447.0, 1367.0);
        let poa = hay_davies_poa(&SOUTH_45, &sun, &cs, 1367.0, DEFAULT_ALBEDO);

        assert!(poa.poa_direct > 0.0);
        assert!(poa.poa_sky_diffuse > 0.0);
        assert!(poa.poa_ground_diffuse > 0.0);
        assert!((poa.poa_global - poa.poa_direct - poa.poa_diffuse).abs() < 1e-9);
        // A south-facing tilt near the sun direction collects more than the horizontal
        assert!(poa.poa_global > cs.ghi);
    }

    #[test]
    fn test_poa_night_is_zero() {
        let sun = SolarPosition {
            zenith_deg: 110.0,
            apparent_zenith_deg: 110.0,
            elevation_deg: -20.0,
            azimuth_deg: 0.0,
        };
        let poa = hay_davies_poa(&SOUTH_45, &sun, &ClearSky::default(), 1367.0, DEFAULT_ALBEDO);
        assert_eq!(poa, PlaneOfArray::default());
    }
}
