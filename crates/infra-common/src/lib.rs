//! # RVoIP Infra Common
//!
//! Shared plumbing for the presence modules:
//!
//! - `errors`: the infrastructure error type
//! - `logging`: tracing subscriber setup
//! - `config`: layered configuration loading (file + environment)

pub mod config;
pub mod errors;
pub mod logging;

pub use errors::types::{Error, Result};
pub use logging::setup::{LoggingConfig, setup_logging};
