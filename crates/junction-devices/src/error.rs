//! Error types for junction-devices.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bad parameter tag: {tag}")]
    BadParameter { tag: u32 },

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("parameter {0} is read-only")]
    ReadOnlyParameter(&'static str),

    #[error("parameter {name} cannot take value {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("device {0} has not been set up")]
    NotSetUp(String),

    #[error("device {0} has no temperature-adjusted parameters")]
    NotTemperatureUpdated(String),

    #[error("device {0} has no distortion coefficients")]
    MissingDistortionSetup(String),

    #[error(transparent)]
    Core(#[from] junction_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
