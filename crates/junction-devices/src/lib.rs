//! Device models for Junction.
//!
//! This crate provides:
//! - The [`Device`] trait: the entry points a circuit solver calls per
//!   topology change, temperature, Newton iteration, AC point and
//!   distortion product
//! - PN-junction helpers shared by semiconductor models
//! - A third-order multivariate dual number for Taylor coefficients
//! - Volterra-series evaluation of intermodulation currents
//! - The Gummel-Poon bipolar junction transistor

pub mod bjt;
pub mod device;
pub mod dual;
pub mod error;
pub mod junction;
pub mod param;
pub mod volterra;

pub use bjt::{Bjt, BjtInstance, BjtModelParams, BjtType};
pub use device::{BackupMode, Device};
pub use dual::Dual3;
pub use error::{Error, Result};
pub use param::{Access, ParamInfo, ParamKind, ParamValue};
pub use volterra::TaylorCoeffs;
