//! # Solar Position
//!
//! NOAA general solar position algorithm. Accurate to well under a degree
//! between 1800 and 2100, which is plenty for clear-sky PV estimates.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Sun position as seen from a site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarPosition {
    /// Geometric zenith angle in degrees
    pub zenith_deg: f64,
    /// Zenith angle corrected for atmospheric refraction
    pub apparent_zenith_deg: f64,
    /// Geometric elevation above the horizon in degrees
    pub elevation_deg: f64,
    /// Azimuth in degrees, clockwise from north (90 = east, 180 = south)
    pub azimuth_deg: f64,
}

impl SolarPosition {
    pub fn apparent_elevation_deg(&self) -> f64 {
        90.0 - self.apparent_zenith_deg
    }

    pub fn is_above_horizon(&self) -> bool {
        self.apparent_zenith_deg < 90.0
    }
}

/// Calculate the sun position at `time` for the given coordinates.
///
/// `latitude_deg` is positive north, `longitude_deg` positive east.
pub fn solar_position<T: TimeZone>(
    time: &DateTime<T>,
    latitude_deg: f64,
    longitude_deg: f64,
) -> SolarPosition {
    let utc = time.with_timezone(&Utc);
    let julian_day = utc.timestamp() as f64 / 86_400.0 + 2_440_587.5;
    let jc = (julian_day - 2_451_545.0) / 36_525.0;

    let mean_long = (280.46646 + jc * (36_000.76983 + jc * 0.0003032)).rem_euclid(360.0);
    let mean_anom = 357.52911 + jc * (35_999.05029 - 0.0001537 * jc);
    let eccentricity = 0.016708634 - jc * (0.000042037 + 0.0000001267 * jc);

    let m = mean_anom.to_radians();
    let center = m.sin() * (1.914602 - jc * (0.004817 + 0.000014 * jc))
        + (2.0 * m).sin() * (0.019993 - 0.000101 * jc)
        + (3.0 * m).sin() * 0.000289;
    let true_long = mean_long + center;

    let omega = (125.04 - 1934.136 * jc).to_radians();
    let apparent_long = true_long - 0.00569 - 0.00478 * omega.sin();

    let mean_obliquity =
        23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.00059 - jc * 0.001813))) / 60.0) / 60.0;
    let obliquity = (mean_obliquity + 0.00256 * omega.cos()).to_radians();

    let declination = (obliquity.sin() * apparent_long.to_radians().sin()).asin();

    // Equation of time in minutes
    let y = (obliquity / 2.0).tan().powi(2);
    let l0 = mean_long.to_radians();
    let eq_time = 4.0
        * (y * (2.0 * l0).sin() - 2.0 * eccentricity * m.sin()
            + 4.0 * eccentricity * y * m.sin() * (2.0 * l0).cos()
            - 0.5 * y * y * (4.0 * l0).sin()
            - 1.25 * eccentricity * eccentricity * (2.0 * m).sin())
        .to_degrees();

    let minutes = f64::from(utc.hour()) * 60.0
        + f64::from(utc.minute())
        + f64::from(utc.second()) / 60.0;
    let true_solar_time = (minutes + eq_time + 4.0 * longitude_deg).rem_euclid(1440.0);
    let hour_angle_deg = true_solar_time / 4.0 - 180.0;

    let lat = latitude_deg.to_radians();
    let hour_angle = hour_angle_deg.to_radians();
    let cos_zenith = (lat.sin() * declination.sin()
        + lat.cos() * declination.cos() * hour_angle.cos())
    .clamp(-1.0, 1.0);
    let zenith = cos_zenith.acos();
    let zenith_deg = zenith.to_degrees();

    let denom = lat.cos() * zenith.sin();
    let azimuth_deg = if denom.abs() < 1e-9 {
        // Sun at zenith or observer at a pole
        180.0
    } else {
        let cos_az = ((lat.sin() * cos_zenith - declination.sin()) / denom).clamp(-1.0, 1.0);
        let az = cos_az.acos().to_degrees();
        if hour_angle_deg > 0.0 {
            (az + 180.0).rem_euclid(360.0)
        } else {
            (540.0 - az).rem_euclid(360.0)
        }
    };

    let elevation_deg = 90.0 - zenith_deg;
    let apparent_zenith_deg = zenith_deg - refraction_correction_deg(elevation_deg);

    SolarPosition {
        zenith_deg,
        apparent_zenith_deg,
        elevation_deg,
        azimuth_deg,
    }
}

/// Approximate atmospheric refraction for a geometric elevation, in degrees
fn refraction_correction_deg(elevation_deg: f64) -> f64 {
    if elevation_deg > 85.0 {
        return 0.0;
    }
    let tan_e = elevation_deg.to_radians().tan();
    let arc_seconds = if elevation_deg > 5.0 {
        58.1 / tan_e - 0.07 / tan_e.powi(3) + 0.000086 / tan_e.powi(5)
    } else if elevation_deg > -0.575 {
        1735.0
            + elevation_deg
                * (-518.2 + elevation_deg * (103.4 + elevation_deg * (-12.79 + elevation_deg * 0.711)))
    } else {
        -20.772 / tan_e
    };
    arc_seconds / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    const MUNICH: (f64, f64) = (48.3, 11.8);

    fn cet(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        Tz::CET.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_summer_solstice_noon_munich() {
        // Solar noon in Munich is around 13:20 CEST
        let pos = solar_position(&cet(2017, 6, 21, 13, 20), MUNICH.0, MUNICH.1);

        // 90 - 48.3 + 23.44 = 65.1
        assert!((pos.elevation_deg - 65.1).abs() < 0.5, "elevation {}", pos.elevation_deg);
        assert!((pos.azimuth_deg - 180.0).abs() < 5.0, "azimuth {}", pos.azimuth_deg);
    }

    #[test]
    fn test_winter_solstice_noon_munich() {
        let pos = solar_position(&cet(2017, 12, 21, 12, 15), MUNICH.0, MUNICH.1);
        // 90 - 48.3 - 23.44 = 18.3
        assert!((pos.elevation_deg - 18.3).abs() < 0.5, "elevation {}", pos.elevation_deg);
    }

    #[test]
    fn test_midnight_below_horizon() {
        let pos = solar_position(&cet(2017, 4, 22, 0, 0), MUNICH.0, MUNICH.1);
        assert!(pos.elevation_deg < -10.0);
        assert!(!pos.is_above_horizon());
    }

    #[test]
    fn test_morning_sun_in_east_evening_in_west() {
        let morning = solar_position(&cet(2017, 4, 22, 8, 0), MUNICH.0, MUNICH.1);
        let evening = solar_position(&cet(2017, 4, 22, 18, 0), MUNICH.0, MUNICH.1);
        assert!(morning.azimuth_deg > 45.0 && morning.azimuth_deg < 135.0);
        assert!(evening.azimuth_deg > 225.0 && evening.azimuth_deg < 315.0);
    }

    #[test]
    fn test_refraction_lifts_low_sun() {
        let pos = solar_position(&cet(2017, 4, 22, 6, 30), MUNICH.0, MUNICH.1);
        assert!(pos.apparent_zenith_deg <= pos.zenith_deg);
        assert!(refraction_correction_deg(0.0) > 0.4);
        assert_eq!(refraction_correction_deg(89.0), 0.0);
    }
}
