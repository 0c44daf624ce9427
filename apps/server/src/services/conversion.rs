// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runs the conversion pipeline off the async executor.

use crate::error::ApiError;
use curiosity_processing::{Conversion, ConversionPipeline, PipelineRun, PipelineState, RequestContext};
use std::sync::Arc;

/// Run one conversion on the blocking thread pool (CPU-intensive).
///
/// Returns the visited states alongside the outcome; pipeline failures map
/// to `ApiError::Import` / `ApiError::Export`.
pub async fn run_conversion(
    pipeline: Arc<ConversionPipeline>,
    ctx: RequestContext,
) -> Result<(Vec<PipelineState>, Conversion), ApiError> {
    let PipelineRun { states, result } =
        tokio::task::spawn_blocking(move || pipeline.execute(&ctx)).await?;

    match result {
        Ok(conversion) => Ok((states, conversion)),
        Err(e) => {
            tracing::debug!(states = ?states, "Conversion stopped");
            Err(e.into())
        }
    }
}
