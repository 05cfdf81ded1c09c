//! # Consumption Meters
//!
//! Sources of simulated household consumption readings, in whole watts.
//!
//! - [`UniformMeter`]: uniformly random load, no daily pattern
//! - [`HouseholdMeter`]: time-of-day household profile with gaussian noise

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lowest reading a meter reports, W
pub const MIN_READING_W: u32 = 1;
/// Readings stay strictly below this, W
pub const MAX_READING_W: u32 = 9000;

/// Which meter the producer reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MeterKind {
    #[default]
    Uniform,
    Household,
}

/// A source of consumption readings
pub trait ConsumptionMeter: Send {
    /// Consumption in watts at `at`, within `[MIN_READING_W, MAX_READING_W)`
    fn read(&mut self, at: &DateTime<chrono_tz::Tz>) -> u32;
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn build_meter(kind: MeterKind, seed: Option<u64>) -> Box<dyn ConsumptionMeter> {
    match kind {
        MeterKind::Uniform => Box::new(UniformMeter::new(seed)),
        MeterKind::Household => Box::new(HouseholdMeter::new(HouseholdProfile::default(), seed)),
    }
}

/// Uniformly random consumption between 1 W and 9 kW
pub struct UniformMeter {
    rng: StdRng,
}

impl UniformMeter {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng_from_seed(seed),
        }
    }
}

impl ConsumptionMeter for UniformMeter {
    fn read(&mut self, _at: &DateTime<chrono_tz::Tz>) -> u32 {
        self.rng.gen_range(MIN_READING_W..MAX_READING_W)
    }
}

/// Shape of the household load profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdProfile {
    /// Load at a time-of-day multiplier of 1.0, W
    pub base_load_w: f64,
    /// Cap on the time-of-day multiplier
    pub peak_multiplier: f64,
    /// Noise standard deviation as a fraction of the base load
    pub noise_std_dev: f64,
}

impl Default for HouseholdProfile {
    fn default() -> Self {
        Self {
            base_load_w: 1200.0,
            peak_multiplier: 5.0,
            noise_std_dev: 0.25,
        }
    }
}

/// Household load following morning and evening peaks, more uniform on weekends
pub struct HouseholdMeter {
    profile: HouseholdProfile,
    noise: Option<Normal<f64>>,
    rng: StdRng,
}

impl HouseholdMeter {
    pub fn new(profile: HouseholdProfile, seed: Option<u64>) -> Self {
        let noise = Normal::new(0.0, profile.base_load_w * profile.noise_std_dev).ok();
        Self {
            profile,
            noise,
            rng: rng_from_seed(seed),
        }
    }

    /// Time-of-day multiplier for the local wall clock at `at`
    pub fn tod_multiplier<T: TimeZone>(&self, at: &DateTime<T>) -> f64 {
        let hour = f64::from(at.hour()) + f64::from(at.minute()) / 60.0;
        let is_weekend = at.weekday().num_days_from_monday() >= 5;

        let base = if hour < 6.0 {
            0.5
        } else if hour < 9.0 {
            // breakfast, showers
            2.5 + (hour - 6.0) * 0.5
        } else if hour < 16.0 {
            1.0
        } else if hour < 21.0 {
            // cooking, appliances
            3.5 + (hour - 16.0) * 0.3
        } else {
            4.0 - (hour - 21.0) * 0.5
        };

        let multiplier = match (is_weekend, hour) {
            (true, h) if h < 9.0 => base * 0.7,
            (true, h) if h < 22.0 => base * 1.2,
            _ => base,
        };
        multiplier.min(self.profile.peak_multiplier)
    }
}

impl ConsumptionMeter for HouseholdMeter {
    fn read(&mut self, at: &DateTime<chrono_tz::Tz>) -> u32 {
        let noise = match &self.noise {
            Some(normal) => normal.sample(&mut self.rng),
            None => 0.0,
        };
        let load = self.profile.base_load_w * self.tod_multiplier(at) + noise;
        let clamped = load.round().clamp(f64::from(MIN_READING_W), f64::from(MAX_READING_W - 1));
        clamped as u32
    }
}
