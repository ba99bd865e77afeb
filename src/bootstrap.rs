use sqlx::PgPool;

use crate::auth::{password, ADMIN_ROLE};
use crate::config::BootstrapAdmin;
use crate::db;
use crate::error::AppError;

/// Create the first Admin user when no user exists yet.
///
/// Returns whether a user was created. Safe to call from several instances
/// at once: the check and insert run under a transaction-scoped advisory lock.
pub async fn ensure_admin(pool: &PgPool, admin: &BootstrapAdmin) -> Result<bool, AppError> {
    let pw_hash = password::hash(&admin.password).map_err(AppError::Internal)?;

    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    if db::users::count_all(&mut *tx).await? > 0 {
        return Ok(false);
    }

    let (role_id,): (uuid::Uuid,) = sqlx::query_as("SELECT id FROM roles WHERE name = $1")
        .bind(ADMIN_ROLE)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Role '{ADMIN_ROLE}' is missing")))?;

    let user = db::users::create(&mut *tx, "Administrator", &admin.email, &pw_hash, role_id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");
    Ok(true)
}
