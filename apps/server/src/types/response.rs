// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response types for the API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use curiosity_processing::{
    AnalysisResult, Conversion, DashboardState, ExportArtifact, Figure, PageView, PipelineState,
};
use serde::Serialize;

/// Successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertResponse {
    /// Uploaded file name, without directories.
    pub file_name: String,
    /// Pipeline states visited, ending in `done`.
    pub states: Vec<PipelineState>,
    pub analysis: AnalysisView,
    /// Plotly figure (`data` + `layout`).
    pub preview: Figure,
    pub download: DownloadView,
}

impl ConvertResponse {
    pub fn new(file_name: String, states: Vec<PipelineState>, conversion: &Conversion) -> Self {
        Self {
            file_name,
            states,
            analysis: AnalysisView::from(&conversion.analysis),
            preview: conversion.preview.clone(),
            download: DownloadView::from(&conversion.artifact),
        }
    }
}

/// Mesh analysis, formatted for display plus raw values.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    /// `12.3 cm³`
    pub volume: String,
    /// `10x20x5 mm`
    pub bounding_box: String,
    pub volume_mm3: f64,
    pub extents: [f64; 3],
    pub watertight: bool,
    pub warning: Option<&'static str>,
}

impl From<&AnalysisResult> for AnalysisView {
    fn from(analysis: &AnalysisResult) -> Self {
        Self {
            volume: analysis.volume_label(),
            bounding_box: analysis.bounding_box_label(),
            volume_mm3: analysis.volume,
            extents: analysis.extents,
            watertight: analysis.watertight,
            warning: analysis.warning(),
        }
    }
}

/// Exported file, base64 encoded.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadView {
    pub file_name: String,
    /// Button text, e.g. `Download .STL`
    pub label: String,
    pub content_type: &'static str,
    /// Size in bytes before encoding.
    pub size: usize,
    pub data: String,
}

impl From<&ExportArtifact> for DownloadView {
    fn from(artifact: &ExportArtifact) -> Self {
        Self {
            file_name: artifact.file_name.clone(),
            label: artifact.label(),
            content_type: artifact.content_type(),
            size: artifact.bytes.len(),
            data: STANDARD.encode(&artifact.bytes),
        }
    }
}

/// Dashboard state after an event, with the page to show.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub state: DashboardState,
    pub view: PageView,
}
