use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub token_ttl_days: i64,
    pub max_body_size: usize,
    pub db_max_connections: u32,
    pub log_level: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials for the first Admin user, created at start-up when the
/// users table is empty.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("STOCKROOM_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid STOCKROOM_HOST: {e}"))?;

        let port: u16 = env_or("PORT", "5000")
            .parse()
            .map_err(|e| format!("Invalid PORT: {e}"))?;

        let token_ttl_days: i64 = env_or("STOCKROOM_TOKEN_TTL_DAYS", "30")
            .parse()
            .map_err(|e| format!("Invalid STOCKROOM_TOKEN_TTL_DAYS: {e}"))?;
        if token_ttl_days <= 0 {
            return Err("STOCKROOM_TOKEN_TTL_DAYS must be positive".to_string());
        }

        let max_body_size: usize = env_or("STOCKROOM_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid STOCKROOM_MAX_BODY_SIZE: {e}"))?;

        let db_max_connections: u32 = env_or("STOCKROOM_DB_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|e| format!("Invalid STOCKROOM_DB_MAX_CONNECTIONS: {e}"))?;

        let log_level = env_or("STOCKROOM_LOG_LEVEL", "info");

        let bootstrap_admin = match (
            std::env::var("STOCKROOM_ADMIN_EMAIL").ok(),
            std::env::var("STOCKROOM_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            token_ttl_days,
            max_body_size,
            db_max_connections,
            log_level,
            bootstrap_admin,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
