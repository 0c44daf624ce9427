// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion pipeline
//!
//! ```text
//! Idle -> Importing -> Tessellated -> AnalyzingAndRendering -> Exporting -> Done
//!            |                                                     |
//!            +------------------------> Failed <-------------------+
//! ```
//!
//! Each run owns a `curiosity-*` scratch directory, created under the system
//! temp directory or a configured parent, that is removed when the run returns.
//! The STEP model is tessellated, written to `temp.stl` and read back; the
//! mesh read back from that file is what gets analyzed, previewed and
//! exported.

use crate::context::RequestContext;
use crate::error::{PipelineError, Result};
use crate::figure::Figure;
use crate::preview::render_preview;
use curiosity_formats::{export, import, MeshFormat};
use curiosity_geometry::{analyze, AnalysisResult, Mesh, StepImporter};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Intermediate hand-off file inside the scratch directory
pub const INTERMEDIATE_FILE: &str = "temp.stl";

/// Name prefix of per-run scratch directories
pub const SCRATCH_PREFIX: &str = "curiosity-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Importing,
    Tessellated,
    AnalyzingAndRendering,
    Exporting,
    Done,
    Failed,
}

impl PipelineState {
    /// Legal successor states
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Importing)
                | (Importing, Tessellated)
                | (Importing, Failed)
                | (Tessellated, AnalyzingAndRendering)
                | (AnalyzingAndRendering, Exporting)
                | (Exporting, Done)
                | (Exporting, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// The downloadable file
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub format: MeshFormat,
    /// `<base>.<ext>`
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn label(&self) -> String {
        self.format.label()
    }

    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Everything a successful run produces
#[derive(Debug, Clone)]
pub struct Conversion {
    pub analysis: AnalysisResult,
    pub preview: Figure,
    pub artifact: ExportArtifact,
    pub mesh: Mesh,
}

/// One run: the states visited and the outcome
#[derive(Debug)]
pub struct PipelineRun {
    pub states: Vec<PipelineState>,
    pub result: Result<Conversion>,
}

impl PipelineRun {
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Idle)
    }
}

/// Records and logs state transitions
struct StateLog {
    states: Vec<PipelineState>,
}

impl StateLog {
    fn new() -> Self {
        Self {
            states: vec![PipelineState::Idle],
        }
    }

    fn current(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Idle)
    }

    fn enter(&mut self, next: PipelineState) {
        let from = self.current();
        debug_assert!(
            from.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            from,
            next
        );
        tracing::debug!(?from, to = ?next, "pipeline transition");
        self.states.push(next);
    }
}

/// Runs uploads through import, analysis, preview and export
pub struct ConversionPipeline {
    importer: StepImporter,
    scratch_parent: Option<PathBuf>,
}

impl ConversionPipeline {
    pub fn new() -> Self {
        Self {
            importer: StepImporter::new(),
            scratch_parent: None,
        }
    }

    /// Create scratch directories under `parent` instead of the system temp dir
    pub fn with_scratch_dir(mut self, parent: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(parent.into());
        self
    }

    fn scratch_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        match &self.scratch_parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
    }

    /// Run to completion and keep only the outcome
    pub fn run(&self, ctx: &RequestContext) -> Result<Conversion> {
        self.execute(ctx).result
    }

    /// Run to completion, recording every state
    pub fn execute(&self, ctx: &RequestContext) -> PipelineRun {
        let start = Instant::now();
        let mut log = StateLog::new();
        let result = self.drive(ctx, &mut log);

        match &result {
            Ok(conversion) => tracing::info!(
                file = ctx.upload.display_name(),
                format = conversion.artifact.format.tag(),
                vertices = conversion.mesh.vertex_count(),
                triangles = conversion.mesh.triangle_count(),
                volume = conversion.analysis.volume,
                watertight = conversion.analysis.watertight,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "conversion done"
            ),
            Err(e) => tracing::warn!(
                file = ctx.upload.display_name(),
                error = %e,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "conversion failed"
            ),
        }

        PipelineRun {
            states: log.states,
            result,
        }
    }

    fn drive(&self, ctx: &RequestContext, log: &mut StateLog) -> Result<Conversion> {
        log.enter(PipelineState::Importing);

        // Removed on every return path when `scratch` drops
        let scratch = match self.scratch_dir() {
            Ok(dir) => dir,
            Err(e) => {
                log.enter(PipelineState::Failed);
                return Err(PipelineError::Import(e.to_string()));
            }
        };

        let (mesh, intermediate) = match self.import_stage(ctx, scratch.path()) {
            Ok(imported) => imported,
            Err(message) => {
                log.enter(PipelineState::Failed);
                return Err(PipelineError::Import(message));
            }
        };
        log.enter(PipelineState::Tessellated);

        log.enter(PipelineState::AnalyzingAndRendering);
        let analysis = analyze(&mesh);
        let preview = render_preview(&mesh);

        log.enter(PipelineState::Exporting);
        let format = ctx.printer.export_format;
        let bytes = if format == MeshFormat::Stl {
            intermediate
        } else {
            match export(&mesh, format) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log.enter(PipelineState::Failed);
                    return Err(PipelineError::Export(e.to_string()));
                }
            }
        };

        let artifact = ExportArtifact {
            format,
            file_name: format!("{}.{}", ctx.upload.base_name(), format.extension()),
            bytes,
        };
        log.enter(PipelineState::Done);

        Ok(Conversion {
            analysis,
            preview,
            artifact,
            mesh,
        })
    }

    /// Upload -> tessellated mesh -> `temp.stl` -> mesh read back
    fn import_stage(
        &self,
        ctx: &RequestContext,
        scratch: &Path,
    ) -> std::result::Result<(Mesh, Vec<u8>), String> {
        let input_name = match ctx.upload.display_name() {
            "" | "." | ".." => "upload.step",
            name => name,
        };
        let input_path = scratch.join(input_name);
        fs::write(&input_path, &ctx.upload.bytes).map_err(|e| e.to_string())?;

        let source = fs::read(&input_path).map_err(|e| e.to_string())?;
        let tessellated = self.importer.import(&source).map_err(|e| e.to_string())?;

        let stl_path = scratch.join(INTERMEDIATE_FILE);
        let encoded = export(&tessellated, MeshFormat::Stl).map_err(|e| e.to_string())?;
        fs::write(&stl_path, &encoded).map_err(|e| e.to_string())?;

        let intermediate = fs::read(&stl_path).map_err(|e| e.to_string())?;
        let mesh = import(&intermediate, MeshFormat::Stl).map_err(|e| e.to_string())?;

        tracing::debug!(
            path = %stl_path.display(),
            bytes = intermediate.len(),
            vertices = mesh.vertex_count(),
            "intermediate STL written"
        );
        Ok((mesh, intermediate))
    }
}

impl Default for ConversionPipeline {
    fn default() -> Self {
        Self::new()
    }
}
