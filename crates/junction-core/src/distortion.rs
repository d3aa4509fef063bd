//! Volterra kernels handed to devices during distortion analysis.

use nalgebra::DVector;
use num_complex::Complex;

use crate::error::{Error, Result};

/// Intermodulation product being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistoMode {
    /// Second harmonic of f1.
    TwoF1,
    /// Third harmonic of f1.
    ThreeF1,
    /// Sum frequency f1 + f2.
    F1PlusF2,
    /// Difference frequency f1 - f2.
    F1MinusF2,
    /// Third-order intermodulation 2f1 - f2.
    TwoF1MinusF2,
}

impl DistoMode {
    pub const ALL: [DistoMode; 5] = [
        DistoMode::TwoF1,
        DistoMode::ThreeF1,
        DistoMode::F1PlusF2,
        DistoMode::F1MinusF2,
        DistoMode::TwoF1MinusF2,
    ];

    /// Angular frequency of the product for tones `omega1` and `omega2`.
    pub fn omega(self, omega1: f64, omega2: f64) -> f64 {
        match self {
            DistoMode::TwoF1 => 2.0 * omega1,
            DistoMode::ThreeF1 => 3.0 * omega1,
            DistoMode::F1PlusF2 => omega1 + omega2,
            DistoMode::F1MinusF2 => omega1 - omega2,
            DistoMode::TwoF1MinusF2 => 2.0 * omega1 - omega2,
        }
    }
}

/// Node-indexed kernels of a distortion run.
///
/// Kernels not needed by a mode may be left at zero.
#[derive(Debug, Clone)]
pub struct DistortionJob {
    /// First tone (rad/s).
    pub omega1: f64,
    /// Second tone (rad/s).
    pub omega2: f64,
    /// First-order response at f1.
    pub h1: DVector<Complex<f64>>,
    /// First-order response at f2.
    pub h2: DVector<Complex<f64>>,
    /// Second-order response at 2f1.
    pub h11: DVector<Complex<f64>>,
    /// Second-order response at f1 - f2.
    pub h1m2: DVector<Complex<f64>>,
}

impl DistortionJob {
    /// Zero kernels for a solution vector of length `size`.
    pub fn new(size: usize, omega1: f64, omega2: f64) -> Self {
        let zero = DVector::from_element(size, Complex::new(0.0, 0.0));
        Self {
            omega1,
            omega2,
            h1: zero.clone(),
            h2: zero.clone(),
            h11: zero.clone(),
            h1m2: zero,
        }
    }

    /// Check that every kernel covers a solution vector of length `size`.
    pub fn check_size(&self, size: usize) -> Result<()> {
        for kernel in [&self.h1, &self.h2, &self.h11, &self.h1m2] {
            if kernel.len() != size {
                return Err(Error::DimensionMismatch {
                    expected: size,
                    actual: kernel.len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_frequencies() {
        let (w1, w2) = (3.0, 5.0);
        let omegas: Vec<f64> = DistoMode::ALL.iter().map(|m| m.omega(w1, w2)).collect();
        assert_eq!(omegas, vec![6.0, 9.0, 8.0, -2.0, 1.0]);
    }

    #[test]
    fn test_kernel_length_is_checked() {
        let job = DistortionJob::new(4, 1.0, 2.0);
        job.check_size(4).unwrap();
        assert!(matches!(
            job.check_size(6),
            Err(Error::DimensionMismatch {
                expected: 6,
                actual: 4
            })
        ));

        let mut job = DistortionJob::new(6, 1.0, 2.0);
        job.h1m2 = DVector::from_element(3, Complex::new(0.0, 0.0));
        assert!(job.check_size(6).is_err());
    }
}
