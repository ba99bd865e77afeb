use std::net::SocketAddr;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use stockroom::config::{BootstrapAdmin, Config};

pub const ADMIN_EMAIL: &str = "admin@test.com";
pub const ADMIN_PASSWORD: &str = "password123";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Login and return the auth response body + status.
    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/users/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Login as the bootstrap admin, return the token.
    pub async fn admin_token(&self) -> String {
        let (body, status) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Create a role, return the role JSON.
    pub async fn create_role(&self, token: &str, name: &str, permissions: &[&str]) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/roles",
                token,
                &json!({ "name": name, "permissions": permissions }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create role failed: {body}");
        body
    }

    /// Create a user holding `role_id` and log them in, return their token.
    pub async fn user_with_role(&self, admin: &str, email: &str, role_id: &str) -> String {
        let (body, status) = self
            .post_auth(
                "/api/users",
                admin,
                &json!({
                    "name": "Test User",
                    "email": email,
                    "password": "password123",
                    "role": role_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {body}");

        let (body, status) = self.login(email, "password123").await;
        assert_eq!(status, StatusCode::OK, "user login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Create a role with `permissions` plus a user holding it, return the
    /// user's token.
    pub async fn user_with_permissions(
        &self,
        admin: &str,
        email: &str,
        permissions: &[&str],
    ) -> String {
        let role_name = format!("role-{}", Uuid::now_v7());
        let role = self.create_role(admin, &role_name, permissions).await;
        self.user_with_role(admin, email, role["id"].as_str().unwrap())
            .await
    }

    /// Create a catalog, return the catalog JSON.
    pub async fn create_catalog(&self, token: &str, name: &str, code: &str) -> Value {
        let (body, status) = self
            .post_auth("/api/catalogs", token, &json!({ "name": name, "code": code }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create catalog failed: {body}");
        body
    }

    /// Create a product in `catalog_id` with no opening stock.
    pub async fn create_product(&self, token: &str, catalog_id: &str, sku: &str) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/products",
                token,
                &json!({
                    "name": format!("Product {sku}"),
                    "sku": sku,
                    "catalog": catalog_id,
                    "unitPrice": "19.99",
                    "costPrice": "12.50",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
        body
    }

    /// Catalog plus one product, return the product id.
    pub async fn seed_product(&self, token: &str, sku: &str) -> String {
        let catalog = self
            .create_catalog(token, &format!("Catalog {sku}"), &format!("CAT-{sku}"))
            .await;
        let product = self
            .create_product(token, catalog["id"].as_str().unwrap(), sku)
            .await;
        product["id"].as_str().unwrap().to_string()
    }

    /// Record a stock movement, return (body, status).
    pub async fn record_stock(
        &self,
        token: &str,
        product_id: &str,
        kind: &str,
        quantity: Value,
    ) -> (Value, StatusCode) {
        self.post_auth(
            "/api/stock",
            token,
            &json!({
                "productId": product_id,
                "type": kind,
                "quantity": quantity,
                "reason": "test",
            }),
        )
        .await
    }

    pub async fn stock_quantity(&self, token: &str, product_id: &str) -> i64 {
        let (body, status) = self
            .get_auth(&format!("/api/products/{product_id}"), token)
            .await;
        assert_eq!(status, StatusCode::OK, "get product failed: {body}");
        body["stock_quantity"].as_i64().unwrap()
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// Spawn a test app with a fresh temporary database and a bootstrap admin.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!("stockroom_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let admin = BootstrapAdmin {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    };
    stockroom::bootstrap::ensure_admin(&pool, &admin)
        .await
        .expect("Failed to create bootstrap admin");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        token_ttl_days: 30,
        max_body_size: 1_048_576,
        db_max_connections: 10,
        log_level: "warn".to_string(),
        bootstrap_admin: Some(admin),
    };

    let (app, _state) = stockroom::build_app(pool.clone(), config);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        client: Client::new(),
        db_name,
    }
}

/// Drop stale test databases (useful after test crashes).
#[allow(dead_code)]
pub async fn cleanup_stale_test_dbs() {
    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    if let Ok(admin_pool) = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
    {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT datname FROM pg_database WHERE datname LIKE 'stockroom_test_%'",
        )
        .fetch_all(&admin_pool)
        .await
        .unwrap_or_default();

        for db_name in rows {
            let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
                .execute(&admin_pool)
                .await;
        }
        admin_pool.close().await;
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
