use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{BarcodeProduct, Product, ProductListing};

pub struct NewProduct<'a> {
    pub name: &'a str,
    pub sku: &'a str,
    pub catalog_id: Uuid,
    pub description: Option<&'a str>,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
    pub user_id: Uuid,
}

/// Inserts with a zero quantity; any opening stock goes through the ledger.
pub async fn create(conn: &mut PgConnection, new: &NewProduct<'_>) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, sku, catalog_id, description, unit_price, cost_price, user_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(new.name)
    .bind(new.sku)
    .bind(new.catalog_id)
    .bind(new.description)
    .bind(new.unit_price)
    .bind(new.cost_price)
    .bind(new.user_id)
    .fetch_one(conn)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Row-lock the product for the rest of the surrounding transaction.
pub async fn lock_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_listing(pool: &PgPool, id: Uuid) -> Result<Option<ProductListing>, sqlx::Error> {
    sqlx::query_as::<_, ProductListing>(
        "SELECT p.*, c.name AS catalog_name
         FROM products p LEFT JOIN catalogs c ON c.id = p.catalog_id
         WHERE p.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    pattern: Option<&str>,
    catalog_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ProductListing>, sqlx::Error> {
    sqlx::query_as::<_, ProductListing>(
        "SELECT p.*, c.name AS catalog_name
         FROM products p LEFT JOIN catalogs c ON c.id = p.catalog_id
         WHERE ($1::text IS NULL OR p.name ILIKE $1 OR p.sku ILIKE $1)
           AND ($2::uuid IS NULL OR p.catalog_id = $2)
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(pattern)
    .bind(catalog_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count(
    pool: &PgPool,
    pattern: Option<&str>,
    catalog_id: Option<Uuid>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products
         WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
           AND ($2::uuid IS NULL OR catalog_id = $2)",
    )
    .bind(pattern)
    .bind(catalog_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    count(pool, None, None).await
}

pub async fn count_by_catalog(pool: &PgPool, catalog_id: Uuid) -> Result<i64, sqlx::Error> {
    count(pool, None, Some(catalog_id)).await
}

pub async fn list_barcodes(
    pool: &PgPool,
    pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<BarcodeProduct>, sqlx::Error> {
    sqlx::query_as::<_, BarcodeProduct>(
        "SELECT id, name, sku, unit_price FROM products
         WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
         ORDER BY created_at DESC, id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub struct ProductChanges<'a> {
    pub name: Option<&'a str>,
    pub sku: Option<&'a str>,
    pub catalog_id: Option<Uuid>,
    pub description: Option<&'a str>,
    pub unit_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
}

/// Catalog fields only. `stock_quantity` is owned by the ledger.
pub async fn update(
    conn: &mut PgConnection,
    id: Uuid,
    changes: &ProductChanges<'_>,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET
            name = COALESCE($2, name),
            sku = COALESCE($3, sku),
            catalog_id = COALESCE($4, catalog_id),
            description = COALESCE($5, description),
            unit_price = COALESCE($6, unit_price),
            cost_price = COALESCE($7, cost_price),
            updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.sku)
    .bind(changes.catalog_id)
    .bind(changes.description)
    .bind(changes.unit_price)
    .bind(changes.cost_price)
    .fetch_one(conn)
    .await
}

/// Add `delta` to the cached quantity. Only the ledger calls this.
pub async fn apply_delta(
    conn: &mut PgConnection,
    id: Uuid,
    delta: i64,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(delta)
    .fetch_one(conn)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
