// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dashboard page endpoints.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use curiosity_processing::{render, DashboardState, Page, PageView};

/// GET /api/v1/pages/:page - Page view with default printer settings.
pub async fn get_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PageView>, ApiError> {
    let page = Page::from_slug(&slug).ok_or_else(|| ApiError::NotFound(format!("page '{}'", slug)))?;
    let dashboard = DashboardState {
        page,
        ..DashboardState::default()
    };
    Ok(Json(render(&dashboard, state.news.as_ref())))
}
