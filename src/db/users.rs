use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{User, UserRoleRow};

const SELECT_WITH_ROLE: &str = "SELECT u.*,
        r.name AS role_name,
        r.permissions AS role_permissions,
        r.description AS role_description,
        r.created_at AS role_created_at,
        r.updated_at AS role_updated_at
     FROM users u
     LEFT JOIN roles r ON r.id = u.role_id";

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    name: &str,
    email: &str,
    password_hash: &str,
    role_id: Uuid,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, password_hash, role_id)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role_id)
    .fetch_one(executor)
    .await
}

/// Exact, case-sensitive email match.
pub async fn find_by_email_with_role(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRoleRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRoleRow>(&format!("{SELECT_WITH_ROLE} WHERE u.email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_with_role(pool: &PgPool, id: Uuid) -> Result<Option<UserRoleRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRoleRow>(&format!("{SELECT_WITH_ROLE} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count_all<'e, E: sqlx::PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}

pub async fn count_by_role(pool: &PgPool, role_id: Uuid) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role_id = $1")
        .bind(role_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// `pattern` is an ILIKE pattern matched against name or email.
pub async fn list(
    pool: &PgPool,
    pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<UserRoleRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRoleRow>(&format!(
        "{SELECT_WITH_ROLE}
         WHERE ($1::text IS NULL OR u.name ILIKE $1 OR u.email ILIKE $1)
         ORDER BY u.created_at DESC, u.id DESC
         LIMIT $2 OFFSET $3"
    ))
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool, pattern: Option<&str>) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM users
         WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)",
    )
    .bind(pattern)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub struct UserChanges<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub role_id: Option<Uuid>,
}

/// Apply the given changes; `None` keeps the stored value.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &UserChanges<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            password_hash = COALESCE($4, password_hash),
            role_id = COALESCE($5, role_id),
            updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.email)
    .bind(changes.password_hash)
    .bind(changes.role_id)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
