// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dashboard interaction endpoint.

use crate::error::ApiError;
use crate::types::{DashboardRequest, DashboardResponse};
use crate::AppState;
use axum::{extract::State, Json};
use curiosity_processing::render;

/// POST /api/v1/dashboard - Apply one input event and render the new page.
///
/// The client holds the state and sends it back with every event.
pub async fn apply_event(
    State(state): State<AppState>,
    Json(request): Json<DashboardRequest>,
) -> Result<Json<DashboardResponse>, ApiError> {
    request.state.printer.validate()?;
    let next = request.state.apply(request.event)?;

    Ok(Json(DashboardResponse {
        view: render(&next, state.news.as_ref()),
        state: next,
    }))
}
