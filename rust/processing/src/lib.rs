// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curiosity Processing
//!
//! The conversion pipeline (upload, tessellation, analysis, preview, export)
//! and the dashboard view models served next to it.

pub mod content;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod figure;
pub mod pipeline;
pub mod preview;

pub use content::{market_chart, Article, NewsSource, StaticNews, MARKET_GROWTH};
pub use context::{
    PrinterConfig, RequestContext, UploadedFile, DEFAULT_NOZZLE_MM, NOZZLE_RANGE, STEP_EXTENSIONS,
};
pub use dashboard::{render, DashboardEvent, DashboardState, Page, PageBody, PageView};
pub use error::{ConfigError, PipelineError, Result};
pub use figure::Figure;
pub use pipeline::{
    Conversion, ConversionPipeline, ExportArtifact, PipelineRun, PipelineState, INTERMEDIATE_FILE,
};
pub use preview::{render_preview, POINT_OVERLAY_LIMIT};

// Re-exported for callers that only depend on this crate
pub use curiosity_formats::MeshFormat;
pub use curiosity_geometry::AnalysisResult;
