use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    In,
    Out,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
            TransactionType::Adjustment => "ADJUSTMENT",
        }
    }

    /// Signed change this movement applies to the cached quantity.
    /// ADJUSTMENT carries its own sign.
    pub fn effective_delta(&self, quantity: i64) -> i64 {
        match self {
            TransactionType::In | TransactionType::Adjustment => quantity,
            TransactionType::Out => -quantity,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(TransactionType::In),
            "OUT" => Ok(TransactionType::Out),
            "ADJUSTMENT" => Ok(TransactionType::Adjustment),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A ledger row joined with the names a listing needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionDetailRow {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub kind: TransactionType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub product_sku: Option<String>,
    pub catalog_id: Option<Uuid>,
    pub catalog_name: Option<String>,
    pub user_id: Uuid,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetail {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub product: ProductRef,
    pub user: UserRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductRef {
    pub id: Uuid,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub catalog: Option<CatalogRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: Option<String>,
}

impl From<TransactionDetailRow> for TransactionDetail {
    fn from(row: TransactionDetailRow) -> Self {
        let catalog = match (row.catalog_id, row.catalog_name) {
            (Some(id), Some(name)) => Some(CatalogRef { id, name }),
            _ => None,
        };
        TransactionDetail {
            id: row.id,
            kind: row.kind,
            quantity: row.quantity,
            reason: row.reason,
            created_at: row.created_at,
            product: ProductRef {
                id: row.product_id,
                name: row.product_name,
                sku: row.product_sku,
                catalog,
            },
            user: UserRef {
                id: row.user_id,
                name: row.user_name,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_delta_follows_type() {
        assert_eq!(TransactionType::In.effective_delta(10), 10);
        assert_eq!(TransactionType::Out.effective_delta(3), -3);
        assert_eq!(TransactionType::Adjustment.effective_delta(-5), -5);
        assert_eq!(TransactionType::Adjustment.effective_delta(4), 4);
    }

    #[test]
    fn parses_only_exact_uppercase_names() {
        assert_eq!("IN".parse::<TransactionType>(), Ok(TransactionType::In));
        assert_eq!("OUT".parse::<TransactionType>(), Ok(TransactionType::Out));
        assert_eq!(
            "ADJUSTMENT".parse::<TransactionType>(),
            Ok(TransactionType::Adjustment)
        );
        assert!("in".parse::<TransactionType>().is_err());
        assert!("TRANSFER".parse::<TransactionType>().is_err());
        assert!("".parse::<TransactionType>().is_err());
    }
}
