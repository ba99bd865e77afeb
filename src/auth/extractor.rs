use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderValue};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{authorize, jwt, AuthError, Decision};
use crate::db;
use crate::error::AppError;
use crate::models::{Role, UserRoleRow};
use crate::state::SharedState;

pub const ADMIN_ROLE: &str = "Admin";

/// The resolved caller of a request, passed explicitly to every handler
/// that needs it.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
}

impl Identity {
    /// Authorization gate: reject with 403 unless the role holds `permission`.
    pub fn require(&self, permission: &str) -> Result<(), AppError> {
        match authorize(self, permission) {
            Decision::Allow => Ok(()),
            Decision::Deny => {
                tracing::debug!(user_id = %self.user_id, permission, "permission denied");
                Err(AppError::Forbidden(format!(
                    "Not authorized, missing permission: {permission}"
                )))
            }
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role
            .as_ref()
            .is_some_and(|role| role.name == ADMIN_ROLE)
    }
}

impl From<UserRoleRow> for Identity {
    fn from(row: UserRoleRow) -> Self {
        let role = row.role();
        Identity {
            user_id: row.id,
            name: row.name,
            email: row.email,
            role,
        }
    }
}

/// Resolve a bearer token to a stored user and its role.
///
/// A token whose subject no longer exists is reported as `InvalidToken`, the
/// same as a bad signature, so callers learn nothing about which users exist.
pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    bearer: Option<&str>,
) -> Result<Identity, AuthError> {
    let token = bearer.ok_or(AuthError::MissingToken)?;

    let claims = jwt::decode_token(token, secret).map_err(|e| {
        tracing::debug!("Rejected bearer token: {e}");
        AuthError::InvalidToken
    })?;

    let row = db::users::find_with_role(pool, claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    Ok(Identity::from(row))
}

/// Whether an `Authorization` value names the Bearer scheme, whatever follows.
fn has_bearer_scheme(value: Option<&HeaderValue>) -> bool {
    value
        .and_then(|v| v.as_bytes().get(..7))
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(b"Bearer "))
}

impl FromRequestParts<SharedState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let bearer =
            match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
                Ok(TypedHeader(Authorization(bearer))) => Some(bearer),
                Err(rejection) if rejection.is_missing() => None,
                // Some other scheme carries no bearer token at all
                Err(_) if !has_bearer_scheme(parts.headers.get(header::AUTHORIZATION)) => None,
                Err(_) => return Err(AuthError::InvalidToken.into()),
            };

        let identity = authenticate(
            &state.pool,
            &state.config.jwt_secret,
            bearer.as_ref().map(|b| b.token()),
        )
        .await?;

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme(raw: &str) -> bool {
        has_bearer_scheme(Some(&HeaderValue::from_str(raw).unwrap()))
    }

    #[test]
    fn only_bearer_scheme_counts_as_a_token() {
        assert!(scheme("Bearer abc.def"));
        assert!(scheme("bearer abc"));
        assert!(!scheme("Basic dXNlcjpwdw=="));
        assert!(!scheme("Bearer"));
        assert!(!scheme("Token abc"));
        assert!(!has_bearer_scheme(None));
    }
}
