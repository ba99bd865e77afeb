use sqlx::PgPool;

use crate::auth::{jwt, password, AuthError, Identity};
use crate::db;

/// Verify credentials and issue a bearer token.
///
/// An unknown email and a wrong password both produce `InvalidCredentials`,
/// and both pay for one Argon2 verification.
pub async fn login(
    pool: &PgPool,
    secret: &str,
    ttl_days: i64,
    email: &str,
    candidate: &str,
) -> Result<(Identity, String), AuthError> {
    let Some(row) = db::users::find_by_email_with_role(pool, email).await? else {
        password::verify_dummy(candidate);
        return Err(AuthError::InvalidCredentials);
    };

    let valid = password::verify(candidate, &row.password_hash).unwrap_or_else(|e| {
        tracing::warn!(user_id = %row.id, "Stored password hash unusable: {e}");
        false
    });
    if !valid {
        return Err(AuthError::InvalidCredentials);
    }

    let identity = Identity::from(row);
    let token = jwt::issue(identity.user_id, secret, ttl_days).map_err(AuthError::Signing)?;

    Ok((identity, token))
}
