//! Error types.
//!
//! Cache operations themselves are total: a missing key or an unresolved
//! scope is an ordinary outcome, returned as `Option` or an empty result.
//! The only fallible surface is configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be an unsigned integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("cache '{name}' must have a capacity of at least 1")]
    ZeroCapacity { name: &'static str },
}
