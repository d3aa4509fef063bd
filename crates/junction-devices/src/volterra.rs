//! Multinomial Taylor coefficients and their Volterra-series responses.
//!
//! A weakly nonlinear branch `f(x, y, z)` is expanded around the operating
//! point as
//!
//! ```text
//! f = x1*x + ... + xx*x^2 + xy*x*y + ... + xxx*x^3 + xxy*x^2*y + ... + xyz*x*y*z
//! ```
//!
//! Given the phasors of the three controlling variables at each tone, the
//! response at an intermodulation frequency follows from the symmetric
//! bilinear and trilinear forms of the quadratic and cubic parts. Phasors
//! follow the convention `u(t) = Re(U e^{jwt})`.

use junction_core::DistoMode;
use num_complex::Complex;

use crate::dual::Dual3;

/// Phasors of the three controlling variables at one frequency.
pub type Phasor3 = [Complex<f64>; 3];

const ZERO3: Phasor3 = [Complex::new(0.0, 0.0); 3];

/// Normalized expansion coefficients through third order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaylorCoeffs {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub xx: f64,
    pub yy: f64,
    pub zz: f64,
    pub xy: f64,
    pub yz: f64,
    pub xz: f64,
    pub xxx: f64,
    pub yyy: f64,
    pub zzz: f64,
    pub xxy: f64,
    pub xxz: f64,
    pub xyy: f64,
    pub yyz: f64,
    pub xzz: f64,
    pub yzz: f64,
    pub xyz: f64,
}

impl TaylorCoeffs {
    /// Coefficients from the partial derivatives held by a dual number.
    pub fn from_dual(f: &Dual3) -> Self {
        let d1 = &f.d1;
        let d2 = &f.d2;
        let d3 = &f.d3;
        Self {
            x: d1[0],
            y: d1[1],
            z: d1[2],
            xx: d2[0][0] / 2.0,
            yy: d2[1][1] / 2.0,
            zz: d2[2][2] / 2.0,
            xy: d2[0][1],
            yz: d2[1][2],
            xz: d2[0][2],
            xxx: d3[0][0][0] / 6.0,
            yyy: d3[1][1][1] / 6.0,
            zzz: d3[2][2][2] / 6.0,
            xxy: d3[0][0][1] / 2.0,
            xxz: d3[0][0][2] / 2.0,
            xyy: d3[0][1][1] / 2.0,
            yyz: d3[1][1][2] / 2.0,
            xzz: d3[0][2][2] / 2.0,
            yzz: d3[1][2][2] / 2.0,
            xyz: d3[0][1][2],
        }
    }

    /// Symmetric bilinear form of the quadratic part.
    pub fn bilinear(&self, u: &Phasor3, v: &Phasor3) -> Complex<f64> {
        let [ux, uy, uz] = *u;
        let [vx, vy, vz] = *v;
        ux * vx * self.xx
            + uy * vy * self.yy
            + uz * vz * self.zz
            + (ux * vy + uy * vx) * (self.xy / 2.0)
            + (uy * vz + uz * vy) * (self.yz / 2.0)
            + (ux * vz + uz * vx) * (self.xz / 2.0)
    }

    /// Symmetric trilinear form of the cubic part.
    pub fn trilinear(&self, u: &Phasor3, v: &Phasor3, w: &Phasor3) -> Complex<f64> {
        // Sum of a_i b_i c_j over the three placements of the odd index.
        let pair = |i: usize, j: usize| u[i] * v[i] * w[j] + u[i] * v[j] * w[i] + u[j] * v[i] * w[i];
        let xyz = u[0] * v[1] * w[2]
            + u[0] * v[2] * w[1]
            + u[1] * v[0] * w[2]
            + u[1] * v[2] * w[0]
            + u[2] * v[0] * w[1]
            + u[2] * v[1] * w[0];
        u[0] * v[0] * w[0] * self.xxx
            + u[1] * v[1] * w[1] * self.yyy
            + u[2] * v[2] * w[2] * self.zzz
            + pair(0, 1) * (self.xxy / 3.0)
            + pair(0, 2) * (self.xxz / 3.0)
            + pair(1, 0) * (self.xyy / 3.0)
            + pair(1, 2) * (self.yyz / 3.0)
            + pair(2, 0) * (self.xzz / 3.0)
            + pair(2, 1) * (self.yzz / 3.0)
            + xyz * (self.xyz / 6.0)
    }

    /// Phasor of the output component at the frequency of `mode`.
    pub fn response(&self, mode: DistoMode, tones: &Tones) -> Complex<f64> {
        let h1 = &tones.h1;
        match mode {
            DistoMode::TwoF1 => self.bilinear(h1, h1) * 0.5,
            DistoMode::ThreeF1 => {
                self.trilinear(h1, h1, h1) * 0.25 + self.bilinear(h1, &tones.h11)
            }
            DistoMode::F1PlusF2 => self.bilinear(h1, &tones.h2),
            DistoMode::F1MinusF2 => self.bilinear(h1, &conj3(&tones.h2)),
            DistoMode::TwoF1MinusF2 => {
                let h2c = conj3(&tones.h2);
                self.trilinear(h1, h1, &h2c) * 0.75
                    + self.bilinear(h1, &tones.h1m2)
                    + self.bilinear(&h2c, &tones.h11)
            }
        }
    }
}

/// Controlling-variable phasors of one branch for every kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tones {
    /// First order at f1.
    pub h1: Phasor3,
    /// First order at f2.
    pub h2: Phasor3,
    /// Second order at 2f1.
    pub h11: Phasor3,
    /// Second order at f1 - f2.
    pub h1m2: Phasor3,
}

impl Default for Tones {
    fn default() -> Self {
        Self {
            h1: ZERO3,
            h2: ZERO3,
            h11: ZERO3,
            h1m2: ZERO3,
        }
    }
}

impl Tones {
    /// Apply `f` to every kernel, passing each kernel's angular frequency.
    pub fn map(&self, omega1: f64, omega2: f64, f: impl Fn(&Phasor3, f64) -> Phasor3) -> Self {
        Self {
            h1: f(&self.h1, omega1),
            h2: f(&self.h2, omega2),
            h11: f(&self.h11, 2.0 * omega1),
            h1m2: f(&self.h1m2, omega1 - omega2),
        }
    }
}

fn conj3(u: &Phasor3) -> Phasor3 {
    [u[0].conj(), u[1].conj(), u[2].conj()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const W1: f64 = 3.0;
    const W2: f64 = 5.0;
    const N: usize = 64;

    fn coeffs() -> TaylorCoeffs {
        TaylorCoeffs {
            xx: 0.9,
            yy: -0.4,
            zz: 0.25,
            xy: 1.3,
            yz: -0.7,
            xz: 0.5,
            xxx: 0.3,
            yyy: -0.2,
            zzz: 0.15,
            xxy: 0.8,
            xxz: -0.35,
            xyy: 0.45,
            yyz: 0.6,
            xzz: -0.55,
            yzz: 0.1,
            xyz: 1.1,
            ..Default::default()
        }
    }

    fn quadratic_only(c: TaylorCoeffs) -> TaylorCoeffs {
        TaylorCoeffs {
            xxx: 0.0,
            yyy: 0.0,
            zzz: 0.0,
            xxy: 0.0,
            xxz: 0.0,
            xyy: 0.0,
            yyz: 0.0,
            xzz: 0.0,
            yzz: 0.0,
            xyz: 0.0,
            ..c
        }
    }

    fn eval(c: &TaylorCoeffs, v: [f64; 3]) -> f64 {
        let [x, y, z] = v;
        c.xx * x * x
            + c.yy * y * y
            + c.zz * z * z
            + c.xy * x * y
            + c.yz * y * z
            + c.xz * x * z
            + c.xxx * x * x * x
            + c.yyy * y * y * y
            + c.zzz * z * z * z
            + c.xxy * x * x * y
            + c.xxz * x * x * z
            + c.xyy * x * y * y
            + c.yyz * y * y * z
            + c.xzz * x * z * z
            + c.yzz * y * z * z
            + c.xyz * x * y * z
    }

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    /// Phasor of `f(u(t))` at `omega`, found by sampling one period.
    fn dft(coeffs: &TaylorCoeffs, tones: &Tones, omega: f64) -> Complex<f64> {
        let components = [
            (tones.h1, W1),
            (tones.h2, W2),
            (tones.h11, 2.0 * W1),
            (tones.h1m2, W1 - W2),
        ];
        let mut acc = Complex::new(0.0, 0.0);
        for n in 0..N {
            let t = 2.0 * PI * n as f64 / N as f64;
            let mut v = [0.0; 3];
            for (phasor, w) in &components {
                let rot = Complex::from_polar(1.0, w * t);
                for i in 0..3 {
                    v[i] += (phasor[i] * rot).re;
                }
            }
            acc += Complex::from_polar(1.0, -omega * t) * eval(coeffs, v);
        }
        acc * (2.0 / N as f64)
    }

    fn first_order_tones() -> Tones {
        Tones {
            h1: [c(0.3, 0.1), c(-0.2, 0.25), c(0.15, -0.05)],
            h2: [c(-0.1, 0.2), c(0.05, 0.3), c(0.2, 0.1)],
            ..Default::default()
        }
    }

    fn assert_close(a: Complex<f64>, b: Complex<f64>) {
        assert!((a - b).norm() < 1e-12, "{} != {}", a, b);
    }

    #[test]
    fn test_from_dual_normalization() {
        let x = Dual3::variable(0.5, 0);
        let y = Dual3::variable(-0.3, 1);
        // f = 2x^3 + x^2 y
        let f = x * x * x * 2.0 + x * x * y;
        let t = TaylorCoeffs::from_dual(&f);
        assert!((t.xxx - 2.0).abs() < 1e-12);
        assert!((t.xxy - 1.0).abs() < 1e-12);
        assert!((t.xx - (6.0 * 0.5 + (-0.3))).abs() < 1e-12);
        assert!(t.xyz.abs() < 1e-12);
    }

    #[test]
    fn test_forms_reduce_to_polynomial() {
        let coeffs = coeffs();
        let v = [0.3, -0.7, 1.1];
        let u = [c(v[0], 0.0), c(v[1], 0.0), c(v[2], 0.0)];
        let direct = eval(&coeffs, v);
        let forms = coeffs.bilinear(&u, &u) + coeffs.trilinear(&u, &u, &u);
        assert!((forms.re - direct).abs() < 1e-12);
    }

    #[test]
    fn test_two_tone_products_match_dft() {
        let coeffs = coeffs();
        let tones = first_order_tones();
        for mode in DistoMode::ALL {
            let expected = dft(&coeffs, &tones, mode.omega(W1, W2));
            assert_close(coeffs.response(mode, &tones), expected);
        }
    }

    #[test]
    fn test_second_order_kernels_feed_third_order_products() {
        let coeffs = quadratic_only(coeffs());
        let tones = Tones {
            h11: [c(0.05, -0.02), c(0.01, 0.04), c(-0.03, 0.02)],
            h1m2: [c(-0.02, 0.01), c(0.03, 0.0), c(0.01, -0.04)],
            ..first_order_tones()
        };
        for mode in [DistoMode::ThreeF1, DistoMode::TwoF1MinusF2] {
            let expected = dft(&coeffs, &tones, mode.omega(W1, W2));
            assert_close(coeffs.response(mode, &tones), expected);
        }
    }
}
