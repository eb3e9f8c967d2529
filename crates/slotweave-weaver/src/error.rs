//! Fatal weaver errors
//!
//! Problems with individual declarations are [`Diagnostic`]s, not errors.
//! These are the failures that stop a weaver from being constructed at all.
//!
//! [`Diagnostic`]: crate::diagnostic::Diagnostic

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up a weaver
#[derive(Debug, Error)]
pub enum WeaveError {
    /// The eligibility list could not be read or created
    #[error("Failed to access eligibility list {path}: {source}")]
    Eligibility {
        /// Path of the eligibility file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}
