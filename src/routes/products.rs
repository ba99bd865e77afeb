use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{permissions, Identity};
use crate::db;
use crate::db::products::{NewProduct, ProductChanges};
use crate::error::AppError;
use crate::extract::Json;
use crate::ledger;
use crate::middleware::audit;
use crate::models::{ProductListing, StockTransaction};
use crate::routes::{non_blank, ListQuery, Paging};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub catalog: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub name: String,
    pub sku: String,
    pub catalog: Uuid,
    pub description: Option<String>,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub cost_price: Decimal,
    pub stock_quantity: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub catalog: Option<Uuid>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub stock_quantity: Option<serde_json::Value>,
}

/// Cached quantity next to the quantity replayed from the ledger.
#[derive(Serialize)]
pub struct LedgerView {
    pub product_id: Uuid,
    pub stock_quantity: i64,
    pub ledger_quantity: i64,
    pub consistent: bool,
    pub transactions: Vec<StockTransaction>,
}

fn check_price(field: &str, price: Decimal) -> Result<(), AppError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(())
}

/// A blank or null quantity counts as absent.
fn requested_quantity(raw: Option<&serde_json::Value>) -> Result<Option<i64>, AppError> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => Ok(Some(ledger::parse_quantity(value)?)),
    }
}

fn sku_taken(e: sqlx::Error) -> AppError {
    AppError::from_constraint(e, "Product SKU already exists", "Catalog not found")
}

async fn load_listing(state: &SharedState, id: Uuid) -> Result<ProductListing, AppError> {
    db::products::find_listing(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

pub async fn list(
    identity: Identity,
    State(state): State<SharedState>,
    Query(params): Query<ProductQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::VIEW_PRODUCTS)?;

    let paging = Paging::new(params.page, params.limit);
    let pattern = db::like_pattern(params.search.as_deref());

    let (products, total) = tokio::try_join!(
        db::products::list(
            &state.pool,
            pattern.as_deref(),
            params.catalog,
            paging.limit,
            paging.offset(),
        ),
        db::products::count(&state.pool, pattern.as_deref(), params.catalog),
    )?;

    Ok(Json(serde_json::json!({
        "products": products,
        "page": paging.page,
        "pages": paging.pages(total),
        "total": total,
    })))
}

pub async fn get(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductListing>, AppError> {
    identity.require(permissions::VIEW_PRODUCTS)?;
    Ok(Json(load_listing(&state, id).await?))
}

/// Creates the product at zero and records any opening quantity as an
/// ADJUSTMENT in the same database transaction.
pub async fn create(
    identity: Identity,
    State(state): State<SharedState>,
    Json(req): Json<CreateProduct>,
) -> Result<(StatusCode, Json<ProductListing>), AppError> {
    identity.require(permissions::CREATE_PRODUCT)?;

    let name = req.name.trim();
    let sku = req.sku.trim();
    if name.is_empty() || sku.is_empty() {
        return Err(AppError::BadRequest(
            "Product name and SKU are required".to_string(),
        ));
    }
    check_price("unitPrice", req.unit_price)?;
    check_price("costPrice", req.cost_price)?;
    let opening = requested_quantity(req.stock_quantity.as_ref())?;

    let new = NewProduct {
        name,
        sku,
        catalog_id: req.catalog,
        description: non_blank(&req.description),
        unit_price: req.unit_price,
        cost_price: req.cost_price,
        user_id: identity.user_id,
    };

    let mut tx = state.pool.begin().await?;
    let product = db::products::create(&mut *tx, &new)
        .await
        .map_err(sku_taken)?;
    if let Some(target) = opening {
        ledger::adjust_to(&mut *tx, product.id, identity.user_id, target, "Initial stock").await?;
    }
    tx.commit().await?;

    tracing::info!(product_id = %product.id, sku = %product.sku, "product created");
    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "product.created",
        "product",
        Some(product.id),
        Some(serde_json::json!({ "sku": product.sku })),
    )
    .await;

    let listing = load_listing(&state, product.id).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// A changed `stockQuantity` is recorded as an ADJUSTMENT, never written
/// directly.
pub async fn update(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProduct>,
) -> Result<Json<ProductListing>, AppError> {
    identity.require(permissions::EDIT_PRODUCT)?;

    if let Some(price) = req.unit_price {
        check_price("unitPrice", price)?;
    }
    if let Some(price) = req.cost_price {
        check_price("costPrice", price)?;
    }
    let target = requested_quantity(req.stock_quantity.as_ref())?;

    let changes = ProductChanges {
        name: non_blank(&req.name),
        sku: non_blank(&req.sku),
        catalog_id: req.catalog,
        description: non_blank(&req.description),
        unit_price: req.unit_price,
        cost_price: req.cost_price,
    };

    let mut tx = state.pool.begin().await?;
    db::products::lock_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    db::products::update(&mut *tx, id, &changes)
        .await
        .map_err(sku_taken)?;
    let adjustment = match target {
        Some(target) => {
            ledger::adjust_to(&mut *tx, id, identity.user_id, target, "Product edit").await?
        }
        None => None,
    };
    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "product.updated",
        "product",
        Some(id),
        adjustment
            .as_ref()
            .map(|t| serde_json::json!({ "adjustment": t.quantity, "transaction_id": t.id })),
    )
    .await;

    Ok(Json(load_listing(&state, id).await?))
}

/// Refuses once the product has ledger history.
pub async fn delete(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::DELETE_PRODUCT)?;

    let history = db::stock::count_for_product(&state.pool, id).await?;
    if history > 0 {
        return Err(AppError::BadRequest(
            "Product has stock history and cannot be deleted".to_string(),
        ));
    }

    let deleted = db::products::delete(&state.pool, id)
        .await
        .map_err(|e| {
            AppError::from_constraint(
                e,
                "Product SKU already exists",
                "Product has stock history and cannot be deleted",
            )
        })?;
    if deleted == 0 {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "product.deleted",
        "product",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Product removed" })))
}

pub async fn ledger(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LedgerView>, AppError> {
    identity.require(permissions::VIEW_PRODUCTS)?;

    let (product, transactions) = tokio::try_join!(
        db::products::find_by_id(&state.pool, id),
        db::stock::list_for_product(&state.pool, id),
    )?;
    let product = product.ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let ledger_quantity = ledger::replay(&transactions);
    if ledger_quantity != product.stock_quantity {
        tracing::warn!(
            product_id = %id,
            stock_quantity = product.stock_quantity,
            ledger_quantity,
            "cached quantity diverges from ledger"
        );
    }

    Ok(Json(LedgerView {
        product_id: id,
        stock_quantity: product.stock_quantity,
        ledger_quantity,
        consistent: ledger_quantity == product.stock_quantity,
        transactions,
    }))
}

pub async fn barcodes(
    identity: Identity,
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::VIEW_BARCODES)?;

    let paging = Paging::new(params.page, params.limit);
    let pattern = db::like_pattern(params.search.as_deref());

    let (products, total) = tokio::try_join!(
        db::products::list_barcodes(&state.pool, pattern.as_deref(), paging.limit, paging.offset()),
        db::products::count(&state.pool, pattern.as_deref(), None),
    )?;

    Ok(Json(serde_json::json!({
        "products": products,
        "page": paging.page,
        "pages": paging.pages(total),
        "total": total,
    })))
}
