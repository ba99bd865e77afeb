use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{StockTransaction, TransactionDetailRow, TransactionType};

const SELECT_DETAIL: &str = "SELECT t.id, t.type, t.quantity, t.reason, t.created_at,
        t.product_id, p.name AS product_name, p.sku AS product_sku,
        c.id AS catalog_id, c.name AS catalog_name,
        t.user_id, u.name AS user_name
     FROM stock_transactions t
     LEFT JOIN products p ON p.id = t.product_id
     LEFT JOIN catalogs c ON c.id = p.catalog_id
     LEFT JOIN users u ON u.id = t.user_id";

const FILTER: &str = "WHERE ($1::transaction_type IS NULL OR t.type = $1)
       AND ($2::timestamptz IS NULL OR t.created_at >= $2)
       AND ($3::timestamptz IS NULL OR t.created_at < $3)
       AND ($4::text IS NULL OR t.product_id IN (
            SELECT id FROM products WHERE name ILIKE $4 OR sku ILIKE $4))
       AND ($5::uuid IS NULL OR t.user_id = $5)";

/// Conditions for ledger listings and counts. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct StockFilter {
    pub kind: Option<TransactionType>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub until: Option<DateTime<Utc>>,
    /// ILIKE pattern over product name or SKU.
    pub product_pattern: Option<String>,
    pub user_id: Option<Uuid>,
}

pub async fn insert(
    conn: &mut PgConnection,
    product_id: Uuid,
    user_id: Uuid,
    kind: TransactionType,
    quantity: i64,
    reason: Option<&str>,
) -> Result<StockTransaction, sqlx::Error> {
    sqlx::query_as::<_, StockTransaction>(
        "INSERT INTO stock_transactions (id, product_id, user_id, type, quantity, reason)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .bind(user_id)
    .bind(kind)
    .bind(quantity)
    .bind(reason)
    .fetch_one(conn)
    .await
}

/// The full ledger of one product, oldest first.
pub async fn list_for_product(
    pool: &PgPool,
    product_id: Uuid,
) -> Result<Vec<StockTransaction>, sqlx::Error> {
    sqlx::query_as::<_, StockTransaction>(
        "SELECT * FROM stock_transactions WHERE product_id = $1
         ORDER BY created_at ASC, id ASC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
}

pub async fn count_for_product(pool: &PgPool, product_id: Uuid) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM stock_transactions WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

/// Newest first.
pub async fn list(
    pool: &PgPool,
    filter: &StockFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<TransactionDetailRow>, sqlx::Error> {
    sqlx::query_as::<_, TransactionDetailRow>(&format!(
        "{SELECT_DETAIL} {FILTER}
         ORDER BY t.created_at DESC, t.id DESC
         LIMIT $6 OFFSET $7"
    ))
    .bind(filter.kind)
    .bind(filter.from)
    .bind(filter.until)
    .bind(filter.product_pattern.as_deref())
    .bind(filter.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool, filter: &StockFilter) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM stock_transactions t {FILTER}"
    ))
    .bind(filter.kind)
    .bind(filter.from)
    .bind(filter.until)
    .bind(filter.product_pattern.as_deref())
    .bind(filter.user_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// IN and OUT movements in `[from, until)`, for charting.
pub async fn movements_between(
    pool: &PgPool,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    user_id: Option<Uuid>,
) -> Result<Vec<(DateTime<Utc>, TransactionType, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT created_at, type, quantity FROM stock_transactions
         WHERE created_at >= $1 AND created_at < $2
           AND type IN ('IN', 'OUT')
           AND ($3::uuid IS NULL OR user_id = $3)",
    )
    .bind(from)
    .bind(until)
    .bind(user_id)
    .fetch_all(pool)
    .await
}
