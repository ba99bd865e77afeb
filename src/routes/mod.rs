pub mod catalogs;
pub mod categories;
pub mod dashboard;
pub mod products;
pub mod roles;
pub mod stock;
pub mod users;

use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;

use crate::state::SharedState;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Users
        .route("/api/users/login", post(users::login))
        .route("/api/users/profile", put(users::update_profile))
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/{id}",
            put(users::update).delete(users::delete),
        )
        // Roles
        .route("/api/roles", get(roles::list).post(roles::create))
        .route("/api/roles/permissions", get(roles::list_permissions))
        .route(
            "/api/roles/{id}",
            put(roles::update).delete(roles::delete),
        )
        // Catalogs
        .route("/api/catalogs", get(catalogs::list).post(catalogs::create))
        .route(
            "/api/catalogs/{id}",
            put(catalogs::update).delete(catalogs::delete),
        )
        // Categories
        .route(
            "/api/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        // Products
        .route("/api/products", get(products::list).post(products::create))
        .route("/api/products/barcodes", get(products::barcodes))
        .route(
            "/api/products/{id}",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/api/products/{id}/ledger", get(products::ledger))
        // Stock ledger
        .route("/api/stock", get(stock::list).post(stock::record))
        // Dashboard
        .route("/api/dashboard", get(dashboard::summary))
}

/// Common `page`, `limit` and `search` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub limit: i64,
}

impl Paging {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

/// Treat a blank optional string as absent.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_clamps() {
        assert_eq!(Paging::new(None, None), Paging { page: 1, limit: 10 });
        assert_eq!(Paging::new(Some(0), Some(0)), Paging { page: 1, limit: 1 });
        assert_eq!(Paging::new(Some(3), Some(500)).limit, MAX_PAGE_SIZE);
        assert_eq!(Paging::new(Some(3), Some(20)).offset(), 40);
        assert!(Paging::new(Some(i64::MAX), Some(100)).offset() > 0);
    }

    #[test]
    fn pages_rounds_up() {
        let paging = Paging::new(None, Some(10));
        assert_eq!(paging.pages(0), 0);
        assert_eq!(paging.pages(10), 1);
        assert_eq!(paging.pages(11), 2);
    }
}
