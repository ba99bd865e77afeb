use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{permissions, Identity};
use crate::db;
use crate::error::AppError;
use crate::extract::Json;
use crate::middleware::audit;
use crate::models::Category;
use crate::routes::{non_blank, ListQuery, Paging};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
}

fn code_taken(e: sqlx::Error) -> AppError {
    AppError::from_constraint(e, "Category code already exists", "Category is still referenced")
}

pub async fn list(
    identity: Identity,
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::VIEW_CATEGORIES)?;

    let paging = Paging::new(params.page, params.limit);
    let pattern = db::like_pattern(params.search.as_deref());

    let (categories, total) = tokio::try_join!(
        db::categories::list(&state.pool, pattern.as_deref(), paging.limit, paging.offset()),
        db::categories::count(&state.pool, pattern.as_deref()),
    )?;

    Ok(Json(serde_json::json!({
        "categories": categories,
        "page": paging.page,
        "pages": paging.pages(total),
        "total": total,
    })))
}

pub async fn create(
    identity: Identity,
    State(state): State<SharedState>,
    Json(req): Json<CreateCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    identity.require(permissions::MANAGE_CATEGORIES)?;

    let name = req.name.trim();
    let code = req.code.trim();
    if name.is_empty() || code.is_empty() {
        return Err(AppError::BadRequest(
            "Category name and code are required".to_string(),
        ));
    }

    let category = db::categories::create(&state.pool, name, code, non_blank(&req.description))
        .await
        .map_err(code_taken)?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "category.created",
        "category",
        Some(category.id),
        Some(serde_json::json!({ "code": category.code })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCategory>,
) -> Result<Json<Category>, AppError> {
    identity.require(permissions::MANAGE_CATEGORIES)?;

    let category = db::categories::update(
        &state.pool,
        id,
        non_blank(&req.name),
        non_blank(&req.code),
        non_blank(&req.description),
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::NotFound("Category not found".to_string()),
        e => code_taken(e),
    })?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "category.updated",
        "category",
        Some(category.id),
        None,
    )
    .await;

    Ok(Json(category))
}

pub async fn delete(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::MANAGE_CATEGORIES)?;

    let deleted = db::categories::delete(&state.pool, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "category.deleted",
        "category",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Category removed" })))
}
