use std::sync::LazyLock;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{self, jwt, password, permissions, AuthError, Identity};
use crate::db;
use crate::db::users::UserChanges;
use crate::error::AppError;
use crate::extract::Json;
use crate::middleware::audit;
use crate::models::{Role, UserResponse};
use crate::routes::{non_blank, ListQuery, Paging};
use crate::state::SharedState;

pub const DEFAULT_ROLE: &str = "Stock Manager";
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Returned by login, user creation and profile updates.
#[derive(Serialize)]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
    pub token: String,
}

impl AuthResponse {
    fn new(identity: Identity, token: String) -> Self {
        AuthResponse {
            id: identity.user_id,
            name: identity.name,
            email: identity.email,
            role: identity.role,
            token,
        }
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid email address".to_string()))
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn email_taken(e: sqlx::Error) -> AppError {
    AppError::from_constraint(e, "User already exists", "Role not found")
}

/// An explicit role must exist; no role means the default role, which must
/// also exist.
async fn resolve_role(state: &SharedState, role_id: Option<Uuid>) -> Result<Role, AppError> {
    match role_id {
        Some(id) => db::roles::find_by_id(&state.pool, id)
            .await?
            .ok_or_else(|| AppError::BadRequest("Role not found".to_string())),
        None => db::roles::find_by_name(&state.pool, DEFAULT_ROLE)
            .await?
            .ok_or_else(|| AppError::BadRequest("Role is required".to_string())),
    }
}

async fn load_identity(state: &SharedState, id: Uuid) -> Result<Identity, AppError> {
    db::users::find_with_role(&state.pool, id)
        .await?
        .map(Identity::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

fn issue_token(state: &SharedState, user_id: Uuid) -> Result<String, AppError> {
    jwt::issue(user_id, &state.config.jwt_secret, state.config.token_ttl_days)
        .map_err(AppError::Internal)
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if state.login_limiter.check(&req.email).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let result = auth::login(
        &state.pool,
        &state.config.jwt_secret,
        state.config.token_ttl_days,
        &req.email,
        &req.password,
    )
    .await;

    let (identity, token) = match result {
        Ok(ok) => ok,
        Err(AuthError::InvalidCredentials) => {
            state.login_limiter.record_failure(&req.email);
            return Err(AuthError::InvalidCredentials.into());
        }
        Err(e) => return Err(e.into()),
    };
    state.login_limiter.reset(&req.email);

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "user.login",
        "user",
        Some(identity.user_id),
        None,
    )
    .await;

    Ok(Json(AuthResponse::new(identity, token)))
}

pub async fn create(
    identity: Identity,
    State(state): State<SharedState>,
    Json(req): Json<CreateUser>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    identity.require(permissions::CREATE_USER)?;

    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Name, email and password are required".to_string(),
        ));
    }
    validate_email(email)?;
    validate_password(&req.password)?;

    let role = resolve_role(&state, req.role).await?;
    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(&state.pool, name, email, &pw_hash, role.id)
        .await
        .map_err(email_taken)?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "user.created",
        "user",
        Some(user.id),
        Some(serde_json::json!({ "role": role.name })),
    )
    .await;

    let created = load_identity(&state, user.id).await?;
    let token = issue_token(&state, user.id)?;
    Ok((StatusCode::CREATED, Json(AuthResponse::new(created, token))))
}

pub async fn list(
    identity: Identity,
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::VIEW_USERS)?;

    let paging = Paging::new(params.page, params.limit);
    let pattern = db::like_pattern(params.search.as_deref());

    let (rows, total) = tokio::try_join!(
        db::users::list(&state.pool, pattern.as_deref(), paging.limit, paging.offset()),
        db::users::count(&state.pool, pattern.as_deref()),
    )?;
    let users: Vec<UserResponse> = rows.into_iter().map(UserResponse::from).collect();

    Ok(Json(serde_json::json!({
        "users": users,
        "page": paging.page,
        "pages": paging.pages(total),
        "total": total,
    })))
}

pub async fn update(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUser>,
) -> Result<Json<UserResponse>, AppError> {
    identity.require(permissions::EDIT_USER)?;

    let email = non_blank(&req.email);
    if let Some(email) = email {
        validate_email(email)?;
    }
    let pw_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(pw) => {
            validate_password(pw)?;
            Some(password::hash(pw).map_err(AppError::Internal)?)
        }
        None => None,
    };
    if let Some(role_id) = req.role {
        resolve_role(&state, Some(role_id)).await?;
    }

    let changes = UserChanges {
        name: non_blank(&req.name),
        email,
        password_hash: pw_hash.as_deref(),
        role_id: req.role,
    };
    db::users::update(&state.pool, id, &changes)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("User not found".to_string()),
            e => email_taken(e),
        })?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "user.updated",
        "user",
        Some(id),
        None,
    )
    .await;

    let row = db::users::find_with_role(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(UserResponse::from(row)))
}

pub async fn delete(
    identity: Identity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::DELETE_USER)?;

    if id == identity.user_id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let deleted = db::users::delete(&state.pool, id)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(
                    "User has recorded products or stock transactions and cannot be deleted"
                        .to_string(),
                )
            }
            e => AppError::Database(e),
        })?;
    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "user.deleted",
        "user",
        Some(id),
        None,
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "User removed" })))
}

/// Self-service update. Needs no permission beyond being signed in, and
/// cannot change the caller's role.
pub async fn update_profile(
    identity: Identity,
    State(state): State<SharedState>,
    Json(req): Json<UpdateProfile>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = non_blank(&req.email);
    if let Some(email) = email {
        validate_email(email)?;
    }
    let pw_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(pw) => {
            validate_password(pw)?;
            Some(password::hash(pw).map_err(AppError::Internal)?)
        }
        None => None,
    };

    let changes = UserChanges {
        name: non_blank(&req.name),
        email,
        password_hash: pw_hash.as_deref(),
        role_id: None,
    };
    db::users::update(&state.pool, identity.user_id, &changes)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("User not found".to_string()),
            e => email_taken(e),
        })?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "user.profile_updated",
        "user",
        Some(identity.user_id),
        None,
    )
    .await;

    let updated = load_identity(&state, identity.user_id).await?;
    let token = issue_token(&state, identity.user_id)?;
    Ok(Json(AuthResponse::new(updated, token)))
}
