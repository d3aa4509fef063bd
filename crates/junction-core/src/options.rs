//! Simulator options relevant to device evaluation.

use serde::{Deserialize, Serialize};

use crate::integrate::IntegrationMethod;

/// Reference temperature of model parameters (K), 27 degrees Celsius.
pub const REFTEMP: f64 = 300.15;

/// Options set by `.options` or a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Circuit temperature (K).
    pub temp: f64,
    /// Nominal temperature of model parameters (K).
    pub tnom: f64,
    /// Relative tolerance.
    pub reltol: f64,
    /// Absolute current tolerance (A).
    pub abstol: f64,
    /// Absolute voltage tolerance (V).
    pub vntol: f64,
    /// Minimum junction conductance (S).
    pub gmin: f64,
    /// Allow devices to skip evaluation when their inputs have not moved.
    pub bypass: bool,
    /// Integration method.
    pub method: IntegrationMethod,
    /// Maximum integration order.
    pub max_order: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            temp: REFTEMP,
            tnom: REFTEMP,
            reltol: 1e-3,
            abstol: 1e-12,
            vntol: 1e-6,
            gmin: 1e-12,
            bypass: true,
            method: IntegrationMethod::Trapezoidal,
            max_order: 2,
        }
    }
}

/// Numerical tolerances for convergence and bypass decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Relative tolerance.
    pub reltol: f64,
    /// Absolute current tolerance (A).
    pub abstol: f64,
    /// Absolute voltage tolerance (V).
    pub voltol: f64,
    /// Minimum conductance (S).
    pub gmin: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances::from(&SimOptions::default())
    }
}

impl From<&SimOptions> for Tolerances {
    fn from(opts: &SimOptions) -> Self {
        Self {
            reltol: opts.reltol,
            abstol: opts.abstol,
            voltol: opts.vntol,
            gmin: opts.gmin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tol = Tolerances::default();
        assert_eq!(tol.reltol, 1e-3);
        assert_eq!(tol.abstol, 1e-12);
        assert_eq!(tol.voltol, 1e-6);
        assert_eq!(tol.gmin, 1e-12);
    }

    #[test]
    fn test_partial_config() {
        let opts: SimOptions =
            serde_json::from_str(r#"{ "temp": 350.0, "method": "gear", "bypass": false }"#)
                .unwrap();
        assert_eq!(opts.temp, 350.0);
        assert_eq!(opts.method, IntegrationMethod::Gear);
        assert!(!opts.bypass);
        assert_eq!(opts.tnom, REFTEMP);
        assert_eq!(opts.reltol, 1e-3);
    }
}
