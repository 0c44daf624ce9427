// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for conversion runs
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Why a conversion stopped
///
/// The message is the underlying error text, unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Import failed: {0}")]
    Import(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl PipelineError {
    /// Underlying error text
    pub fn message(&self) -> &str {
        match self {
            PipelineError::Import(message) | PipelineError::Export(message) => message,
        }
    }
}

/// Rejected dashboard input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Nozzle diameter {value} mm is outside {min}..={max} mm")]
    NozzleOutOfRange { value: f64, min: f64, max: f64 },
}
