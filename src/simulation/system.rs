use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::atmosphere::{absolute_airmass, altitude_to_pressure, relative_airmass};
use super::irradiance::{
    angle_of_incidence, extraterrestrial_irradiance, hay_davies_poa, ineichen_clear_sky,
    ClearSky, PlaneOfArray, SurfaceOrientation,
};
use super::module::{
    cell_temperature, effective_irradiance, sapm, MaxPowerPoint, ModuleParameters,
    TemperatureModel,
};
use super::solar_position::{solar_position, SolarPosition};
use crate::domain::{PvSeries, SampleClock};

/// Geographic site of the array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            name: "Munich".to_string(),
            latitude_deg: 48.3,
            longitude_deg: 11.8,
            altitude_m: 447.0,
        }
    }
}

/// Array layout and the fixed ambient conditions it is simulated under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayLayout {
    pub orientation: SurfaceOrientation,
    pub module_count: u32,
    pub albedo: f64,
    pub linke_turbidity: f64,
    pub wind_speed_ms: f64,
    pub ambient_temp_c: f64,
}

impl ArrayLayout {
    /// South-facing array tilted at the site latitude
    pub fn latitude_tilt(site: &Site) -> Self {
        Self {
            orientation: SurfaceOrientation {
                tilt_deg: site.latitude_deg.abs(),
                azimuth_deg: 180.0,
            },
            module_count: 20,
            albedo: super::irradiance::DEFAULT_ALBEDO,
            linke_turbidity: 3.0,
            wind_speed_ms: 0.0,
            ambient_temp_c: 15.0,
        }
    }
}

/// Every intermediate value of the model for one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PvSample {
    pub sun: SolarPosition,
    pub airmass_absolute: Option<f64>,
    pub clear_sky: ClearSky,
    pub poa: PlaneOfArray,
    pub aoi_deg: f64,
    pub cell_temp_c: f64,
    pub effective_irradiance: f64,
    pub module: MaxPowerPoint,
    /// Array output, W
    pub power_w: f64,
}

/// Fixed-tilt PV array simulated under clear-sky conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvSystem {
    pub site: Site,
    pub layout: ArrayLayout,
    pub module: ModuleParameters,
    pub temperature_model: TemperatureModel,
}

impl Default for PvSystem {
    fn default() -> Self {
        let site = Site::default();
        let layout = ArrayLayout::latitude_tilt(&site);
        Self {
            site,
            layout,
            module: ModuleParameters::default(),
            temperature_model: TemperatureModel::default(),
        }
    }
}

impl PvSystem {
    pub fn new(site: Site, layout: ArrayLayout, module: ModuleParameters) -> Self {
        Self {
            site,
            layout,
            module,
            temperature_model: TemperatureModel::default(),
        }
    }

    /// Array output in watts at `time`
    pub fn power_at<T: TimeZone>(&self, time: &DateTime<T>) -> f64 {
        self.sample_at(time).power_w
    }

    /// Run the full model chain for one instant
    pub fn sample_at<T: TimeZone>(&self, time: &DateTime<T>) -> PvSample {
        let utc = time.with_timezone(&Utc);
        let sun = solar_position(&utc, self.site.latitude_deg, self.site.longitude_deg);

        let dni_extra = extraterrestrial_irradiance(utc.ordinal());
        let pressure = altitude_to_pressure(self.site.altitude_m);
        let airmass_absolute =
            relative_airmass(sun.apparent_zenith_deg).map(|rel| absolute_airmass(rel, pressure));

        let clear_sky = ineichen_clear_sky(
            sun.apparent_zenith_deg,
            airmass_absolute,
            self.layout.linke_turbidity,
            self.site.altitude_m,
            dni_extra,
        );
        let poa = hay_davies_poa(
            &self.layout.orientation,
            &sun,
            &clear_sky,
            dni_extra,
            self.layout.albedo,
        );
        let aoi_deg =
            angle_of_incidence(&self.layout.orientation, sun.apparent_zenith_deg, sun.azimuth_deg);

        let cell_temp_c = cell_temperature(
            poa.poa_global,
            self.layout.wind_speed_ms,
            self.layout.ambient_temp_c,
            &self.temperature_model,
        );
        let effective_irradiance = effective_irradiance(
            poa.poa_direct,
            poa.poa_diffuse,
            airmass_absolute,
            aoi_deg,
            &self.module,
        );
        let module = sapm(effective_irradiance, cell_temp_c, &self.module);
        let power_w = (module.p_mp * f64::from(self.layout.module_count)).max(0.0);

        PvSample {
            sun,
            airmass_absolute,
            clear_sky,
            poa,
            aoi_deg,
            cell_temp_c,
            effective_irradiance,
            module,
            power_w,
        }
    }

    /// Simulate every timestamp of the clock
    pub fn simulate_day(&self, clock: &SampleClock) -> PvSeries {
        let series: PvSeries = clock
            .timestamps()
            .map(|t| {
                let watts = self.power_at(&t);
                (t, watts)
            })
            .collect();

        debug!(
            samples = series.len(),
            site = %self.site.name,
            modules = self.layout.module_count,
            "simulated PV day"
        );
        series
    }
}
