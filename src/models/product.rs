use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub catalog_id: Uuid,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
    /// Cached running sum of the product's ledger.
    pub stock_quantity: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProductListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub catalog_name: Option<String>,
}

/// Slim projection used for printing barcode labels.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BarcodeProduct {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit_price: Decimal,
}
