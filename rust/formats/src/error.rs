// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for mesh encoding and decoding
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while writing or reading mesh files
#[derive(Error, Debug)]
pub enum Error {
    /// The mesh cannot be expressed in the target format
    #[error("Mesh cannot be written as {format}: {message}")]
    Unrepresentable {
        format: &'static str,
        message: String,
    },

    /// Input bytes are not a valid file of the given format
    #[error("Invalid {format} content: {message}")]
    InvalidContent {
        format: &'static str,
        message: String,
    },

    #[error("Unknown mesh format: {0}")]
    UnknownFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn unrepresentable(format: &'static str, message: impl Into<String>) -> Self {
        Error::Unrepresentable {
            format,
            message: message.into(),
        }
    }

    pub fn invalid(format: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidContent {
            format,
            message: message.into(),
        }
    }
}
