pub mod authorize;
pub mod extractor;
pub mod jwt;
pub mod login;
pub mod password;
pub mod permissions;

pub use authorize::{authorize, Decision};
pub use extractor::{authenticate, Identity, ADMIN_ROLE};
pub use login::login;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not authorized, no token")]
    MissingToken,

    #[error("Not authorized, token failed")]
    InvalidToken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
