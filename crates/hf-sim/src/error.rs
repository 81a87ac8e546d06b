//! Error types for engine construction and configuration.
//!
//! Ticking and the control surface never fail; only building an engine from a
//! configuration can.

use std::path::PathBuf;
use thiserror::Error;

/// Errors encountered while configuring or constructing a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid config: {what}")]
    InvalidConfig { what: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Component error: {0}")]
    Control(#[from] hf_controls::ControlError),

    #[error("Core error: {0}")]
    Core(#[from] hf_core::HfError),

    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        SimError::InvalidConfig { what: what.into() }
    }
}
