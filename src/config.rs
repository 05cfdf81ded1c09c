use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::broker::BrokerKind;
use crate::error::ConfigError;
use crate::meter::MeterKind;
use crate::pipeline::OutputFormat;
use crate::simulation::{ArrayLayout, ModuleParameters, PvSystem, Site, SurfaceOrientation};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "PVSIM__";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub simulation: SimulationConfig,
    #[validate(nested)]
    pub site: SiteConfig,
    #[validate(nested)]
    pub array: ArrayConfig,
    #[validate(nested)]
    pub broker: BrokerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulationConfig {
    /// Seconds between samples
    #[validate(range(min = 1, max = 3600))]
    pub frequency_seconds: u32,
    /// IANA timezone the start time is given in
    pub timezone: String,
    pub meter: MeterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frequency_seconds: 3,
            timezone: "CET".to_string(),
            meter: MeterKind::Uniform,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SiteConfig {
    pub name: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude_deg: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude_deg: f64,
    #[validate(range(min = -500.0, max = 9000.0))]
    pub altitude_m: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let site = Site::default();
        Self {
            name: site.name,
            latitude_deg: site.latitude_deg,
            longitude_deg: site.longitude_deg,
            altitude_m: site.altitude_m,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ArrayConfig {
    /// Tilt from horizontal; the site latitude when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 90.0))]
    pub surface_tilt_deg: Option<f64>,
    #[validate(range(min = 0.0, max = 360.0))]
    pub surface_azimuth_deg: f64,
    #[validate(range(min = 1, max = 100000))]
    pub module_count: u32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub albedo: f64,
    #[validate(range(min = 1.0, max = 10.0))]
    pub linke_turbidity: f64,
    #[validate(range(min = 0.0, max = 60.0))]
    pub wind_speed_ms: f64,
    #[validate(range(min = -60.0, max = 60.0))]
    pub ambient_temp_c: f64,
    pub module: ModuleParameters,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        let layout = ArrayLayout::latitude_tilt(&Site::default());
        Self {
            surface_tilt_deg: None,
            surface_azimuth_deg: layout.orientation.azimuth_deg,
            module_count: layout.module_count,
            albedo: layout.albedo,
            linke_turbidity: layout.linke_turbidity,
            wind_speed_ms: layout.wind_speed_ms,
            ambient_temp_c: layout.ambient_temp_c,
            module: ModuleParameters::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BrokerConfig {
    pub kind: BrokerKind,
    #[validate(length(min = 1))]
    pub queue: String,
    pub host: String,
    pub port: u16,
    pub vhost: String,
    pub username: String,
    pub password: String,
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
    /// Unacknowledged deliveries the broker pushes ahead of the consumer
    #[validate(range(min = 1))]
    pub prefetch: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: BrokerKind::Memory,
            queue: "pv_meter".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5672,
            vhost: "/".to_string(),
            username: "guest".to_string(),
            password: "guest".to_string(),
            timeout_seconds: 10,
            prefetch: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Values given on the command line; unset fields leave lower layers alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    pub simulation: SimulationOverrides,
    pub broker: BrokerOverrides,
    pub output: OutputOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter: Option<MeterKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BrokerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<BrokerKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vhost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Layer defaults, the TOML file, `PVSIM__*` environment variables and
    /// command line overrides, then validate the result.
    ///
    /// Without an explicit `path` a missing `config/default.toml` is skipped.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::MissingFile(p.to_path_buf())),
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_PATH),
        };

        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.simulation
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Timezone(self.simulation.timezone.clone()))
    }

    pub fn pv_system(&self) -> PvSystem {
        let site = Site {
            name: self.site.name.clone(),
            latitude_deg: self.site.latitude_deg,
            longitude_deg: self.site.longitude_deg,
            altitude_m: self.site.altitude_m,
        };
        let layout = ArrayLayout {
            orientation: SurfaceOrientation {
                tilt_deg: self
                    .array
                    .surface_tilt_deg
                    .unwrap_or_else(|| site.latitude_deg.abs()),
                azimuth_deg: self.array.surface_azimuth_deg,
            },
            module_count: self.array.module_count,
            albedo: self.array.albedo,
            linke_turbidity: self.array.linke_turbidity,
            wind_speed_ms: self.array.wind_speed_ms,
            ambient_temp_c: self.array.ambient_temp_c,
        };
        PvSystem::new(site, layout, self.array.module.clone())
    }
}
