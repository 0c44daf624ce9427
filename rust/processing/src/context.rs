// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-request inputs: the uploaded file and the printer settings

use crate::error::ConfigError;
use curiosity_formats::MeshFormat;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Accepted nozzle diameters (mm)
pub const NOZZLE_RANGE: RangeInclusive<f64> = 0.2..=1.2;

/// Default nozzle diameter (mm)
pub const DEFAULT_NOZZLE_MM: f64 = 0.4;

/// Extensions accepted by the upload control
pub const STEP_EXTENSIONS: [&str; 2] = ["step", "stp"];

/// A file received from the browser
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// File name without directories
    pub fn display_name(&self) -> &str {
        self.file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file_name)
    }

    /// Name without its last extension: `bracket.v2.step` -> `bracket.v2`
    pub fn base_name(&self) -> &str {
        let name = self.display_name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }

    /// Lower-cased last extension, empty when there is none
    pub fn extension(&self) -> String {
        let name = self.display_name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => name[dot + 1..].to_ascii_lowercase(),
            _ => String::new(),
        }
    }

    /// `.step` or `.stp`, any case
    pub fn is_step(&self) -> bool {
        STEP_EXTENSIONS.contains(&self.extension().as_str())
    }
}

/// Sidebar printer settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrinterConfig {
    pub nozzle_mm: f64,
    pub export_format: MeshFormat,
}

impl PrinterConfig {
    /// Validated settings
    pub fn new(nozzle_mm: f64, export_format: MeshFormat) -> Result<Self, ConfigError> {
        Ok(Self {
            nozzle_mm: validate_nozzle(nozzle_mm)?,
            export_format,
        })
    }

    /// Re-check settings that arrived without going through `new`
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_nozzle(self.nozzle_mm).map(|_| ())
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            nozzle_mm: DEFAULT_NOZZLE_MM,
            export_format: MeshFormat::Stl,
        }
    }
}

pub(crate) fn validate_nozzle(nozzle_mm: f64) -> Result<f64, ConfigError> {
    if NOZZLE_RANGE.contains(&nozzle_mm) {
        Ok(nozzle_mm)
    } else {
        Err(ConfigError::NozzleOutOfRange {
            value: nozzle_mm,
            min: *NOZZLE_RANGE.start(),
            max: *NOZZLE_RANGE.end(),
        })
    }
}

/// Everything one conversion consumes
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub upload: UploadedFile,
    pub printer: PrinterConfig,
}

impl RequestContext {
    pub fn new(upload: UploadedFile, printer: PrinterConfig) -> Self {
        Self { upload, printer }
    }
}
