//! # PV Production Simulation
//!
//! Clear-sky model of a fixed-tilt PV array, evaluated per timestamp:
//!
//! 1. **Solar position**: NOAA algorithm with refraction correction
//! 2. **Atmosphere**: Kasten-Young air mass, pressure from site altitude
//! 3. **Irradiance**: Ineichen/Perez clear sky, Hay-Davies transposition
//! 4. **Module**: Sandia cell temperature, effective irradiance and SAPM power
//!
//! ## Usage
//!
//! ```rust
//! use chrono::TimeZone;
//! use pv_simulator::simulation::PvSystem;
//!
//! let system = PvSystem::default(); // 20 modules in Munich, tilted at latitude
//! let noon = chrono_tz::Tz::CET.with_ymd_and_hms(2017, 4, 22, 13, 0, 0).unwrap();
//! assert!(system.power_at(&noon) > 0.0);
//! ```

pub mod atmosphere;
pub mod irradiance;
pub mod module;
pub mod solar_position;
pub mod system;

pub use irradiance::{ClearSky, PlaneOfArray, SurfaceOrientation};
pub use module::{MaxPowerPoint, ModuleParameters, TemperatureModel};
pub use solar_position::{solar_position, SolarPosition};
pub use system::{ArrayLayout, PvSample, PvSystem, Site};
