use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{permissions, Identity};
use crate::db;
use crate::error::AppError;
use crate::extract::Json;
use crate::middleware::audit;
use crate::models::Role;
use crate::routes::{non_blank, ListQuery, Paging};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateRole {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub description: Option<String>,
}

fn checked_permissions(requested: &[String]) -> Result<Vec<String>, AppError> {
    permissions::normalize(requested).map_err(|unknown| {
        AppError::BadRequest(format!("Unknown permissions: {}", unknown.join(", ")))
    })
}

fn role_taken(e: sqlx::Error) -> AppError {
    AppError::from_constraint(e, "Role already exists", "Role is still referenced")
}

pub async fn list(
    identity: Identity,
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::MANAGE_ROLES)?;

    let paging = Paging::new(params.page, params.limit);
    let pattern = db::like_pattern(params.search.as_deref());

    let (roles, total) = tokio::try_join!(
        db::roles::list(&state.pool, pattern.as_deref(), paging.limit, paging.offset()),
        db::roles::count(&state.pool, pattern.as_deref()),
    )?;

    Ok(Json(serde_json::json!({
        "roles": roles,
        "page": paging.page,
        "pages": paging.pages(total),
        "total": total,
    })))
}

/// The registry of permission tokens a role may hold.
pub async fn list_permissions(identity: Identity) -> Result<Json<Vec<&'static str>>, AppError> {
    identity.require(permissions::MANAGE_ROLES)?;
    Ok(Json(permissions::ALL.to_vec()))
}

pub async fn create(
    identity: Identity,
    State(state): State<SharedState>,
    Json(req): Json<CreateRole>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    identity.require(permissions::MANAGE_ROLES)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Role name is required".to_string()));
    }
    let perms = checked_permissions(&req.permissions)?;

    let role = db::roles::create(&state.pool, name, &perms, non_blank(&req.description))
        .await
        .map_err(role_taken)?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "role.created",
        "role",
        Some(role.id),
        Some(serde_json::json!({ "permissions": role.permissions })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn update(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRole>,
) -> Result<Json<Role>, AppError> {
    identity.require(permissions::MANAGE_ROLES)?;

    let perms = req
        .permissions
        .as_deref()
        .map(checked_permissions)
        .transpose()?;

    let role = db::roles::update(
        &state.pool,
        id,
        non_blank(&req.name),
        perms.as_deref(),
        non_blank(&req.description),
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::NotFound("Role not found".to_string()),
        e => role_taken(e),
    })?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "role.updated",
        "role",
        Some(role.id),
        Some(serde_json::json!({ "permissions": role.permissions })),
    )
    .await;

    Ok(Json(role))
}

/// Refuses while any user still holds the role.
pub async fn delete(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::MANAGE_ROLES)?;

    let assigned = db::users::count_by_role(&state.pool, id).await?;
    if assigned > 0 {
        return Err(AppError::BadRequest(format!(
            "Role is assigned to {assigned} user(s) and cannot be deleted"
        )));
    }

    let deleted = db::roles::delete(&state.pool, id)
        .await
        .map_err(|e| {
            AppError::from_constraint(e, "Role already exists", "Role is still assigned to users")
        })?;
    if deleted == 0 {
        return Err(AppError::NotFound("Role not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "role.deleted",
        "role",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Role removed" })))
}
