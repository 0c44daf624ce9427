// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a STEP model into a mesh
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("File is not readable as STEP text: {0}")]
    Unreadable(String),

    #[error("No tessellatable geometry: {0}")]
    NoGeometry(String),

    #[error("Unsupported {kind} type {type_name}")]
    Unsupported {
        kind: &'static str,
        type_name: String,
    },

    #[error("Invalid topology at #{id}: {message}")]
    InvalidTopology { id: u32, message: String },

    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("{0}")]
    Core(#[from] curiosity_core::Error),
}

impl Error {
    /// Topology error for a specific entity
    pub fn topology(id: u32, message: impl Into<String>) -> Self {
        Error::InvalidTopology {
            id,
            message: message.into(),
        }
    }
}
