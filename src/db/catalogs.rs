use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Catalog;

pub async fn create(pool: &PgPool, name: &str, code: &str) -> Result<Catalog, sqlx::Error> {
    sqlx::query_as::<_, Catalog>(
        "INSERT INTO catalogs (name, code) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(code)
    .fetch_one(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Catalog>, sqlx::Error> {
    sqlx::query_as::<_, Catalog>(
        "SELECT * FROM catalogs
         WHERE ($1::text IS NULL OR name ILIKE $1 OR code ILIKE $1)
         ORDER BY created_at DESC, id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool, pattern: Option<&str>) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM catalogs
         WHERE ($1::text IS NULL OR name ILIKE $1 OR code ILIKE $1)",
    )
    .bind(pattern)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    count(pool, None).await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    code: Option<&str>,
) -> Result<Catalog, sqlx::Error> {
    sqlx::query_as::<_, Catalog>(
        "UPDATE catalogs SET
            name = COALESCE($2, name),
            code = COALESCE($3, code),
            updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(code)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM catalogs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
