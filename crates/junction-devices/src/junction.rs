//! PN-junction helpers shared by semiconductor models.

use std::f64::consts::SQRT_2;

pub use junction_core::options::REFTEMP;

/// Offset between the Celsius and Kelvin scales.
pub const CELSIUS_TO_KELVIN: f64 = 273.15;
/// Boltzmann constant (J/K).
pub const K_BOLTZMANN: f64 = 1.380649e-23;
/// Elementary charge (C).
pub const Q_ELECTRON: f64 = 1.602176634e-19;
/// k/q (V/K).
pub const K_OVER_Q: f64 = K_BOLTZMANN / Q_ELECTRON;

/// Thermal voltage at a given temperature.
pub fn thermal_voltage(temp_k: f64) -> f64 {
    K_OVER_Q * temp_k
}

/// Voltage above which the diode current curvature makes Newton overshoot.
///
/// `vt` is the (emission-scaled) thermal voltage, `is` the saturation current.
pub fn critical_voltage(vt: f64, is: f64) -> f64 {
    vt * (vt / (SQRT_2 * is)).ln()
}

/// Limit the change of a junction voltage between Newton iterations.
///
/// Above `vcrit`, a step larger than two thermal voltages is replaced by the
/// logarithm of the step, which follows the exponential's inverse. Returns
/// the limited voltage and whether limiting happened.
pub fn pnjlim(vnew: f64, vold: f64, vt: f64, vcrit: f64) -> (f64, bool) {
    if vnew > vcrit && (vnew - vold).abs() > vt + vt {
        let limited = if vold > 0.0 {
            let arg = 1.0 + (vnew - vold) / vt;
            if arg > 0.0 {
                vold + vt * arg.ln()
            } else {
                vcrit
            }
        } else {
            vt * (vnew / vt).ln()
        };
        (limited, true)
    } else {
        (vnew, false)
    }
}
