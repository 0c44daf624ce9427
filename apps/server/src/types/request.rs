// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request types for the API.

use curiosity_processing::{DashboardEvent, DashboardState};
use serde::Deserialize;

/// Dashboard interaction: current state plus one input event.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardRequest {
    /// Defaults to the initial dashboard state.
    #[serde(default)]
    pub state: DashboardState,
    pub event: DashboardEvent,
}
