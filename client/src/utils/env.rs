//! Validated access to environment variables.

use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EnvVarError {
    #[error("Environment variable '{name}' not found. Set it in your .env file or environment.")]
    NotFound { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8 characters.")]
    InvalidUtf8 { name: String },

    /// Set, but only whitespace
    #[error("Environment variable '{name}' is empty. Please provide a valid value.")]
    Empty { name: String },

    #[error("Environment variable '{name}' has an invalid value '{value}': {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

/// Reads environment variables, trimming whitespace and rejecting empty values.
pub struct EnvUtils;

impl EnvUtils {
    pub fn has_non_empty_var(name: &str) -> bool {
        match std::env::var(name) {
            Ok(value) => !value.trim().is_empty(),
            Err(_) => false,
        }
    }

    /// Returns the trimmed value of `name`.
    ///
    /// # Errors
    ///
    /// [`EnvVarError::NotFound`] when unset, [`EnvVarError::Empty`] when blank
    /// and [`EnvVarError::InvalidUtf8`] when the value is not valid UTF-8.
    pub fn get_validated_var(name: &str) -> Result<String, EnvVarError> {
        match std::env::var(name) {
            Ok(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Err(EnvVarError::Empty {
                        name: name.to_string(),
                    })
                } else {
                    Ok(trimmed.to_string())
                }
            }
            Err(std::env::VarError::NotPresent) => Err(EnvVarError::NotFound {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(EnvVarError::InvalidUtf8 {
                name: name.to_string(),
            }),
        }
    }

    /// Like [`get_validated_var`](Self::get_validated_var) but missing or blank values are `None`.
    pub fn get_optional_var(name: &str) -> Option<String> {
        Self::get_validated_var(name).ok()
    }

    /// Parses an optional variable. Unset is `Ok(None)`; a value that does not
    /// parse is an error rather than silently ignored.
    pub fn get_parsed_var<T>(name: &str) -> Result<Option<T>, EnvVarError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = Self::get_optional_var(name) else {
            return Ok(None);
        };

        raw.parse::<T>()
            .map(Some)
            .map_err(|e| EnvVarError::Invalid {
                name: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
    }
}
