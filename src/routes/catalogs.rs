use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{permissions, Identity};
use crate::db;
use crate::error::AppError;
use crate::extract::Json;
use crate::middleware::audit;
use crate::models::Catalog;
use crate::routes::{non_blank, ListQuery, Paging};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateCatalog {
    pub name: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct UpdateCatalog {
    pub name: Option<String>,
    pub code: Option<String>,
}

fn code_taken(e: sqlx::Error) -> AppError {
    AppError::from_constraint(e, "Catalog code already exists", "Catalog is still referenced")
}

pub async fn list(
    identity: Identity,
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::VIEW_CATALOGS)?;

    let paging = Paging::new(params.page, params.limit);
    let pattern = db::like_pattern(params.search.as_deref());

    let (catalogs, total) = tokio::try_join!(
        db::catalogs::list(&state.pool, pattern.as_deref(), paging.limit, paging.offset()),
        db::catalogs::count(&state.pool, pattern.as_deref()),
    )?;

    Ok(Json(serde_json::json!({
        "catalogs": catalogs,
        "page": paging.page,
        "pages": paging.pages(total),
        "total": total,
    })))
}

pub async fn create(
    identity: Identity,
    State(state): State<SharedState>,
    Json(req): Json<CreateCatalog>,
) -> Result<(StatusCode, Json<Catalog>), AppError> {
    identity.require(permissions::MANAGE_CATALOGS)?;

    let name = req.name.trim();
    let code = req.code.trim();
    if name.is_empty() || code.is_empty() {
        return Err(AppError::BadRequest(
            "Catalog name and code are required".to_string(),
        ));
    }

    let catalog = db::catalogs::create(&state.pool, name, code)
        .await
        .map_err(code_taken)?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "catalog.created",
        "catalog",
        Some(catalog.id),
        Some(serde_json::json!({ "code": catalog.code })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(catalog)))
}

pub async fn update(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCatalog>,
) -> Result<Json<Catalog>, AppError> {
    identity.require(permissions::MANAGE_CATALOGS)?;

    let catalog = db::catalogs::update(&state.pool, id, non_blank(&req.name), non_blank(&req.code))
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Catalog not found".to_string()),
            e => code_taken(e),
        })?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "catalog.updated",
        "catalog",
        Some(catalog.id),
        None,
    )
    .await;

    Ok(Json(catalog))
}

/// Refuses while products still belong to the catalog.
pub async fn delete(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::MANAGE_CATALOGS)?;

    let products = db::products::count_by_catalog(&state.pool, id).await?;
    if products > 0 {
        return Err(AppError::BadRequest(format!(
            "Catalog has {products} product(s) and cannot be deleted"
        )));
    }

    let deleted = db::catalogs::delete(&state.pool, id)
        .await
        .map_err(code_taken)?;
    if deleted == 0 {
        return Err(AppError::NotFound("Catalog not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "catalog.deleted",
        "catalog",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Catalog removed" })))
}
