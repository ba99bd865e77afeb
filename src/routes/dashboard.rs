use axum::extract::State;
use chrono::Local;

use crate::auth::Identity;
use crate::dashboard::{self, DashboardSnapshot};
use crate::error::AppError;
use crate::extract::Json;
use crate::state::SharedState;

/// Any signed-in user may read the dashboard; non-Admin callers see only
/// their own movements.
pub async fn summary(
    identity: Identity,
    State(state): State<SharedState>,
) -> Result<Json<DashboardSnapshot>, AppError> {
    let snapshot = dashboard::compute(&state.pool, &identity, Local::now()).await?;
    Ok(Json(snapshot))
}
