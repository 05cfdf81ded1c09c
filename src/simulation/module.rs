//! # PV Module Model
//!
//! Sandia Array Performance Model (SAPM): cell temperature, effective
//! irradiance and the maximum power point of a single module.

use serde::{Deserialize, Serialize};

/// Boltzmann constant, J/K
const BOLTZMANN: f64 = 1.38066e-23;
/// Elementary charge, C
const ELEMENTARY_CHARGE: f64 = 1.60218e-19;
/// Reference cell temperature, °C
const T_REF_C: f64 = 25.0;
/// Irradiance that defines one "sun", W/m²
const E_REF: f64 = 1000.0;

/// SAPM coefficients for one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleParameters {
    pub name: String,
    pub cells_in_series: u32,
    /// Short-circuit current at reference conditions, A
    pub isco: f64,
    /// Open-circuit voltage at reference conditions, V
    pub voco: f64,
    /// Max-power current at reference conditions, A
    pub impo: f64,
    /// Max-power voltage at reference conditions, V
    pub vmpo: f64,
    /// Isc temperature coefficient, 1/°C
    pub alpha_isc: f64,
    /// Imp temperature coefficient, 1/°C
    pub alpha_imp: f64,
    /// Voc temperature coefficient, V/°C
    pub beta_voco: f64,
    /// Vmp temperature coefficient, V/°C
    pub beta_vmpo: f64,
    /// Diode factor
    pub n: f64,
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    /// Air mass modifier polynomial A0..A4
    pub a: [f64; 5],
    /// Angle-of-incidence modifier polynomial B0..B5
    pub b: [f64; 6],
    /// Fraction of diffuse irradiance used by the module
    pub fd: f64,
}

impl Default for ModuleParameters {
    /// A 96-cell, ~300 W heterojunction module
    fn default() -> Self {
        Self {
            name: "Silevo Triex U300 Black".to_string(),
            cells_in_series: 96,
            isco: 5.771,
            voco: 68.5,
            impo: 5.383,
            vmpo: 55.4,
            alpha_isc: 0.0003,
            alpha_imp: -0.0001,
            beta_voco: -0.1559,
            beta_vmpo: -0.1667,
            n: 1.2,
            c0: 1.0137,
            c1: -0.0137,
            c2: -0.2,
            c3: -6.5,
            a: [0.9431, 0.0408, -0.0071, 0.0005, -0.000012],
            b: [1.0, -0.002438, 0.0003103, -1.246e-5, 2.112e-7, -1.359e-9],
            fd: 1.0,
        }
    }
}

impl ModuleParameters {
    /// Nameplate power at reference conditions, W
    pub fn rated_power_w(&self) -> f64 {
        self.impo * self.vmpo
    }
}

/// Sandia cell temperature coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureModel {
    pub a: f64,
    pub b: f64,
    /// Cell to back-of-module temperature difference at 1000 W/m², °C
    pub delta_t: f64,
}

impl Default for TemperatureModel {
    /// Open rack, glass/cell/glass
    fn default() -> Self {
        Self {
            a: -3.47,
            b: -0.0594,
            delta_t: 3.0,
        }
    }
}

/// Module operating point at maximum power
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaxPowerPoint {
    pub i_sc: f64,
    pub v_oc: f64,
    pub i_mp: f64,
    pub v_mp: f64,
    pub p_mp: f64,
}

/// Cell temperature in °C from plane-of-array irradiance
pub fn cell_temperature(
    poa_global: f64,
    wind_speed_ms: f64,
    ambient_c: f64,
    model: &TemperatureModel,
) -> f64 {
    let poa = poa_global.max(0.0);
    let module_temp = poa * (model.a + model.b * wind_speed_ms).exp() + ambient_c;
    module_temp + poa / E_REF * model.delta_t
}

/// Irradiance actually converted by the cells, in suns.
///
/// `airmass_absolute` is `None` when the sun is down.
pub fn effective_irradiance(
    poa_direct: f64,
    poa_diffuse: f64,
    airmass_absolute: Option<f64>,
    aoi_deg: f64,
    module: &ModuleParameters,
) -> f64 {
    let Some(am) = airmass_absolute else {
        return 0.0;
    };
    let f1 = polynomial(&module.a, am).max(0.0);
    let f2 = if aoi_deg < 90.0 {
        polynomial(&module.b, aoi_deg).max(0.0)
    } else {
        0.0
    };
    (f1 * (poa_direct.max(0.0) * f2 + module.fd * poa_diffuse.max(0.0)) / E_REF).max(0.0)
}

/// Maximum power point for an effective irradiance (suns) and cell temperature
pub fn sapm(effective_irradiance: f64, cell_temp_c: f64, module: &ModuleParameters) -> MaxPowerPoint {
    let ee = effective_irradiance;
    if !ee.is_finite() || ee <= 0.0 {
        return MaxPowerPoint::default();
    }

    let dt = cell_temp_c - T_REF_C;
    let ns = f64::from(module.cells_in_series);
    let thermal_voltage = module.n * BOLTZMANN * (cell_temp_c + 273.15) / ELEMENTARY_CHARGE;
    let log_ee = ee.ln();

    let i_sc = module.isco * ee * (1.0 + module.alpha_isc * dt);
    let i_mp = (module.impo * (module.c0 * ee + module.c1 * ee * ee) * (1.0 + module.alpha_imp * dt))
        .max(0.0);
    let v_oc = (module.voco + ns * thermal_voltage * log_ee + module.beta_voco * dt).max(0.0);
    let v_mp = (module.vmpo
        + module.c2 * ns * thermal_voltage * log_ee
        + module.c3 * ns * (thermal_voltage * log_ee).powi(2)
        + module.beta_vmpo * dt)
        .max(0.0);

    MaxPowerPoint {
        i_sc,
        v_oc,
        i_mp,
        v_mp,
        p_mp: i_mp * v_mp,
    }
}

fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
