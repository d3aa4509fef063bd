//! Third-order multivariate dual numbers.
//!
//! A [`Dual3`] carries a value together with every partial derivative up
//! to third order with respect to three independent variables. Arithmetic
//! propagates the derivatives with the Leibniz rule; elementary functions
//! use the third-order chain rule (Faà di Bruno), so distortion
//! coefficients fall out of the same expressions the large-signal model is
//! written with.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// Number of independent variables.
pub const NVARS: usize = 3;

/// Value and partial derivatives of a function of three variables.
///
/// Derivative arrays are symmetric: `d2[i][j] == d2[j][i]` and `d3` is
/// symmetric under every permutation of its indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual3 {
    pub value: f64,
    pub d1: [f64; NVARS],
    pub d2: [[f64; NVARS]; NVARS],
    pub d3: [[[f64; NVARS]; NVARS]; NVARS],
}

impl Default for Dual3 {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

impl From<f64> for Dual3 {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl Dual3 {
    /// A constant: every derivative is zero.
    pub fn constant(value: f64) -> Self {
        Self {
            value,
            d1: [0.0; NVARS],
            d2: [[0.0; NVARS]; NVARS],
            d3: [[[0.0; NVARS]; NVARS]; NVARS],
        }
    }

    /// Independent variable number `index` at `value`.
    pub fn variable(value: f64, index: usize) -> Self {
        let mut d = Self::constant(value);
        d.d1[index] = 1.0;
        d
    }

    /// Apply a scalar function given its value and first three derivatives
    /// at `self.value`.
    pub fn compose(self, f0: f64, f1: f64, f2: f64, f3: f64) -> Self {
        let u = &self;
        let mut out = Self::constant(f0);
        for i in 0..NVARS {
            out.d1[i] = f1 * u.d1[i];
            for j in 0..NVARS {
                out.d2[i][j] = f2 * u.d1[i] * u.d1[j] + f1 * u.d2[i][j];
                for k in 0..NVARS {
                    out.d3[i][j][k] = f3 * u.d1[i] * u.d1[j] * u.d1[k]
                        + f2 * (u.d2[i][j] * u.d1[k]
                            + u.d2[i][k] * u.d1[j]
                            + u.d2[j][k] * u.d1[i])
                        + f1 * u.d3[i][j][k];
                }
            }
        }
        out
    }

    pub fn exp(self) -> Self {
        let e = self.value.exp();
        self.compose(e, e, e, e)
    }

    pub fn ln(self) -> Self {
        let x = self.value;
        self.compose(x.ln(), 1.0 / x, -1.0 / (x * x), 2.0 / (x * x * x))
    }

    pub fn sqrt(self) -> Self {
        let s = self.value.sqrt();
        let x = self.value;
        self.compose(
            s,
            0.5 / s,
            -0.25 / (x * s),
            0.375 / (x * x * s),
        )
    }

    pub fn tan(self) -> Self {
        let t = self.value.tan();
        let sec2 = 1.0 + t * t;
        self.compose(
            t,
            sec2,
            2.0 * t * sec2,
            2.0 * sec2 * (1.0 + 3.0 * t * t),
        )
    }

    pub fn recip(self) -> Self {
        let x = self.value;
        let r = 1.0 / x;
        self.compose(r, -r * r, 2.0 * r * r * r, -6.0 * r * r * r * r)
    }

    /// `self` raised to a constant power.
    pub fn powf(self, p: f64) -> Self {
        let x = self.value;
        self.compose(
            x.powf(p),
            p * x.powf(p - 1.0),
            p * (p - 1.0) * x.powf(p - 2.0),
            p * (p - 1.0) * (p - 2.0) * x.powf(p - 3.0),
        )
    }

    /// Larger of `self` and a constant; the constant branch has no derivatives.
    pub fn max_const(self, floor: f64) -> Self {
        if self.value >= floor {
            self
        } else {
            Self::constant(floor)
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        let mut out = self;
        out.value = f(self.value);
        for i in 0..NVARS {
            out.d1[i] = f(self.d1[i]);
            for j in 0..NVARS {
                out.d2[i][j] = f(self.d2[i][j]);
                for k in 0..NVARS {
                    out.d3[i][j][k] = f(self.d3[i][j][k]);
                }
            }
        }
        out
    }

    fn zip(self, rhs: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let mut out = self;
        out.value = f(self.value, rhs.value);
        for i in 0..NVARS {
            out.d1[i] = f(self.d1[i], rhs.d1[i]);
            for j in 0..NVARS {
                out.d2[i][j] = f(self.d2[i][j], rhs.d2[i][j]);
                for k in 0..NVARS {
                    out.d3[i][j][k] = f(self.d3[i][j][k], rhs.d3[i][j][k]);
                }
            }
        }
        out
    }
}

impl Add for Dual3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a + b)
    }
}

impl Sub for Dual3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a - b)
    }
}

impl Neg for Dual3 {
    type Output = Self;
    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

impl Mul for Dual3 {
    type Output = Self;
    fn mul(self, g: Self) -> Self {
        let f = &self;
        let mut out = Self::constant(f.value * g.value);
        for i in 0..NVARS {
            out.d1[i] = f.d1[i] * g.value + f.value * g.d1[i];
            for j in 0..NVARS {
                out.d2[i][j] = f.d2[i][j] * g.value
                    + f.d1[i] * g.d1[j]
                    + f.d1[j] * g.d1[i]
                    + f.value * g.d2[i][j];
                for k in 0..NVARS {
                    out.d3[i][j][k] = f.d3[i][j][k] * g.value
                        + f.d2[i][j] * g.d1[k]
                        + f.d2[i][k] * g.d1[j]
                        + f.d2[j][k] * g.d1[i]
                        + f.d1[i] * g.d2[j][k]
                        + f.d1[j] * g.d2[i][k]
                        + f.d1[k] * g.d2[i][j]
                        + f.value * g.d3[i][j][k];
                }
            }
        }
        out
    }
}

impl Div for Dual3 {
    type Output = Self;
    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, rhs: Self) -> Self {
        self * rhs.recip()
    }
}

impl Add<f64> for Dual3 {
    type Output = Self;
    fn add(mut self, rhs: f64) -> Self {
        self.value += rhs;
        self
    }
}

impl Sub<f64> for Dual3 {
    type Output = Self;
    fn sub(mut self, rhs: f64) -> Self {
        self.value -= rhs;
        self
    }
}

impl Mul<f64> for Dual3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        self.map(|a| a * rhs)
    }
}

impl Div<f64> for Dual3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        self.map(|a| a / rhs)
    }
}

impl Add<Dual3> for f64 {
    type Output = Dual3;
    fn add(self, rhs: Dual3) -> Dual3 {
        rhs + self
    }
}

impl Sub<Dual3> for f64 {
    type Output = Dual3;
    fn sub(self, rhs: Dual3) -> Dual3 {
        -rhs + self
    }
}

impl Mul<Dual3> for f64 {
    type Output = Dual3;
    fn mul(self, rhs: Dual3) -> Dual3 {
        rhs * self
    }
}

impl Div<Dual3> for f64 {
    type Output = Dual3;
    fn div(self, rhs: Dual3) -> Dual3 {
        rhs.recip() * self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
    }

    #[test]
    fn test_product_of_variables() {
        // f = x^2 y z
        let x = Dual3::variable(2.0, 0);
        let y = Dual3::variable(3.0, 1);
        let z = Dual3::variable(5.0, 2);
        let f = x * x * y * z;
        assert!(close(f.value, 60.0));
        assert!(close(f.d1[0], 2.0 * 2.0 * 15.0));
        assert!(close(f.d1[1], 4.0 * 5.0));
        assert!(close(f.d2[0][0], 2.0 * 15.0));
        assert!(close(f.d2[0][1], 2.0 * 2.0 * 5.0));
        assert!(close(f.d3[0][1][2], 2.0 * 2.0));
        assert!(close(f.d3[0][0][1], 2.0 * 5.0));
        assert!(close(f.d3[1][1][2], 0.0));
    }

    #[test]
    fn test_exp_of_sum() {
        // f = exp(a x + b y)
        let (a, b) = (0.7, -1.3);
        let x = Dual3::variable(0.2, 0);
        let y = Dual3::variable(0.4, 1);
        let f = (x * a + y * b).exp();
        let e = (a * 0.2 + b * 0.4).exp();
        assert!(close(f.value, e));
        assert!(close(f.d1[1], b * e));
        assert!(close(f.d2[0][1], a * b * e));
        assert!(close(f.d3[0][0][1], a * a * b * e));
        assert!(close(f.d3[1][1][1], b * b * b * e));
    }

    #[test]
    fn test_quotient_matches_closed_form() {
        // f = x / y: f_y = -x/y^2, f_yy = 2x/y^3, f_xyy = 2/y^3, f_yyy = -6x/y^4
        let (xv, yv) = (1.5, 0.8);
        let f = Dual3::variable(xv, 0) / Dual3::variable(yv, 1);
        assert!(close(f.value, xv / yv));
        assert!(close(f.d1[1], -xv / (yv * yv)));
        assert!(close(f.d2[1][1], 2.0 * xv / yv.powi(3)));
        assert!(close(f.d3[0][1][1], 2.0 / yv.powi(3)));
        assert!(close(f.d3[1][1][1], -6.0 * xv / yv.powi(4)));
    }

    #[test]
    fn test_sqrt_and_powf_agree() {
        let x = Dual3::variable(2.3, 2);
        let s = (x * 3.0 + 1.0).sqrt();
        let p = (x * 3.0 + 1.0).powf(0.5);
        assert!(close(s.value, p.value));
        assert!(close(s.d1[2], p.d1[2]));
        assert!(close(s.d2[2][2], p.d2[2][2]));
        assert!(close(s.d3[2][2][2], p.d3[2][2][2]));
    }

    #[test]
    fn test_tan_derivatives() {
        let xv = 0.6_f64;
        let f = Dual3::variable(xv, 0).tan();
        let t = xv.tan();
        let sec2 = 1.0 / xv.cos().powi(2);
        assert!(close(f.d1[0], sec2));
        assert!(close(f.d2[0][0], 2.0 * t * sec2));
        assert!(close(f.d3[0][0][0], 2.0 * sec2 * sec2 + 4.0 * t * t * sec2));
    }

    #[test]
    fn test_ln_inverts_exp() {
        let x = Dual3::variable(0.3, 0);
        let y = Dual3::variable(-0.2, 1);
        let f = (x * y + x).exp().ln();
        let g = x * y + x;
        assert!(close(f.value, g.value));
        assert!(close(f.d2[0][1], g.d2[0][1]));
        assert!(close(f.d3[0][0][1], g.d3[0][0][1]));
    }

    #[test]
    fn test_max_const_drops_derivatives() {
        let x = Dual3::variable(-1.0, 0);
        let clamped = x.max_const(0.0);
        assert_eq!(clamped, Dual3::constant(0.0));
        assert_eq!(x.max_const(-2.0), x);
    }
}
