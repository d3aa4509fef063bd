//! Numerical integration of device charges.
//!
//! Converts a charge history into the companion model used in the
//! linearized system: a conductance `geq = ag[0] * C` and the capacitor
//! current `dq/dt`, which is written into the state slot following the
//! charge slot.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::state::StateVectors;

/// Integration method for transient analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationMethod {
    /// Trapezoidal rule. Order 1 is backward Euler.
    #[default]
    Trapezoidal,
    /// Backward differentiation (Gear).
    Gear,
}

impl IntegrationMethod {
    fn name(self) -> &'static str {
        match self {
            IntegrationMethod::Trapezoidal => "trapezoidal",
            IntegrationMethod::Gear => "gear",
        }
    }
}

/// Trapezoidal weighting between the new and previous derivative.
const TRAP_XMU: f64 = 0.5;

/// Highest order supported with three state layers.
pub const MAX_ORDER: usize = 2;

/// Integration formula and its coefficients for the present step.
#[derive(Debug, Clone, PartialEq)]
pub struct Integrator {
    pub method: IntegrationMethod,
    pub order: usize,
    /// Ceiling for [`Integrator::raise_order`].
    pub max_order: usize,
    /// Derivative coefficients: dq/dt ~= sum(ag[i] * q[n - i]).
    pub ag: [f64; 3],
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::Trapezoidal,
            order: 1,
            max_order: MAX_ORDER,
            ag: [0.0; 3],
        }
    }
}

impl Integrator {
    pub fn new(method: IntegrationMethod, order: usize) -> Self {
        Self {
            method,
            order,
            max_order: MAX_ORDER,
            ag: [0.0; 3],
        }
    }

    /// Limit the order reachable by [`Integrator::raise_order`].
    pub fn with_max_order(mut self, max_order: usize) -> Self {
        self.max_order = max_order.clamp(1, MAX_ORDER);
        self.order = self.order.min(self.max_order);
        self
    }

    /// Step the order up by one after an accepted time point, up to
    /// `max_order`. Returns whether the order changed.
    pub fn raise_order(&mut self) -> bool {
        if self.order < self.max_order {
            self.order += 1;
            true
        } else {
            false
        }
    }

    /// Drop back to first order, as after a breakpoint.
    pub fn reset_order(&mut self) {
        self.order = 1;
    }

    fn unsupported(&self) -> Error {
        Error::UnsupportedIntegrationOrder {
            method: self.method.name(),
            order: self.order,
        }
    }

    /// Compute `ag` for a step of `delta` following a step of `delta_prev`.
    pub fn compute_coefficients(&mut self, delta: f64, delta_prev: f64) -> Result<()> {
        self.ag = match (self.method, self.order) {
            (_, 1) => [1.0 / delta, -1.0 / delta, 0.0],
            (IntegrationMethod::Trapezoidal, 2) => {
                [1.0 / delta / (1.0 - TRAP_XMU), TRAP_XMU / (1.0 - TRAP_XMU), 0.0]
            }
            (IntegrationMethod::Gear, 2) => {
                let h = delta;
                let hp = delta_prev;
                [
                    (2.0 * h + hp) / (h * (h + hp)),
                    -(h + hp) / (h * hp),
                    h / (hp * (h + hp)),
                ]
            }
            _ => return Err(self.unsupported()),
        };
        Ok(())
    }

    /// Integrate the charge stored at `q` with capacitance `cap`.
    ///
    /// Writes the charge current into slot `q + 1` of the present layer and
    /// returns `(geq, ceq)` where `ceq = i - geq_q` is the companion source
    /// relative to the present charge.
    pub fn integrate(&self, states: &mut StateVectors, cap: f64, q: usize) -> Result<(f64, f64)> {
        let ag = &self.ag;
        let ccap = match (self.method, self.order) {
            (_, 1) => ag[0] * states.s0[q] + ag[1] * states.s1[q],
            (IntegrationMethod::Trapezoidal, 2) => {
                -states.s1[q + 1] * ag[1] + ag[0] * (states.s0[q] - states.s1[q])
            }
            (IntegrationMethod::Gear, 2) => {
                ag[0] * states.s0[q] + ag[1] * states.s1[q] + ag[2] * states.s2[q]
            }
            _ => return Err(self.unsupported()),
        };
        states.s0[q + 1] = ccap;
        Ok((ag[0] * cap, ccap - ag[0] * states.s0[q]))
    }
}
