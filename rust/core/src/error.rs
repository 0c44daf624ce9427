// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for STEP parsing

use thiserror::Error;

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading a STEP physical file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Not a STEP file: {0}")]
    NotStep(String),

    #[error("Entity #{0} not found")]
    EntityNotFound(u32),

    #[error("Entity #{id} is {found}, expected {expected}")]
    UnexpectedType {
        id: u32,
        expected: &'static str,
        found: String,
    },

    #[error("Entity #{id} ({type_name}) is missing attribute {index}")]
    MissingAttribute {
        id: u32,
        type_name: String,
        index: usize,
    },
}

impl Error {
    /// Build a parse error at a byte offset
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            position,
            message: message.into(),
        }
    }
}
