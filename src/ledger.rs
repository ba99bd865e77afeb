//! Stock ledger: the only write path for a product's cached quantity.
//!
//! Each movement is recorded inside one database transaction that first
//! row-locks the product, then inserts the ledger row, then applies the
//! signed delta to `products.stock_quantity`. Concurrent movements on the
//! same product queue on the row lock; a failure at any step rolls back
//! both writes. Negative stock is allowed.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db;
use crate::models::{Product, StockTransaction, TransactionType};

/// Largest absolute quantity a single movement may carry.
pub const MAX_QUANTITY: i64 = 1_000_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Invalid transaction type '{0}', expected IN, OUT or ADJUSTMENT")]
    InvalidTransactionType(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub product_id: Uuid,
    pub actor_id: Uuid,
    pub kind: TransactionType,
    pub quantity: i64,
    pub reason: Option<String>,
}

pub fn parse_kind(raw: &str) -> Result<TransactionType, LedgerError> {
    raw.parse().map_err(LedgerError::InvalidTransactionType)
}

/// Accept a JSON number or numeric string holding a whole number.
pub fn parse_quantity(raw: &serde_json::Value) -> Result<i64, LedgerError> {
    let quantity = match raw {
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i),
            None => n.as_f64().and_then(whole_number),
        },
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
        }
        _ => None,
    }
    .ok_or_else(|| LedgerError::InvalidQuantity(format!("{raw} is not a whole number")))?;

    if quantity.unsigned_abs() > MAX_QUANTITY as u64 {
        return Err(LedgerError::InvalidQuantity(format!(
            "magnitude must not exceed {MAX_QUANTITY}"
        )));
    }
    Ok(quantity)
}

fn whole_number(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_QUANTITY as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Running sum of effective deltas, starting from zero.
pub fn replay(transactions: &[StockTransaction]) -> i64 {
    transactions
        .iter()
        .map(|t| t.kind.effective_delta(t.quantity))
        .sum()
}

/// Record one movement in its own database transaction.
pub async fn record_transaction(
    pool: &PgPool,
    new: &NewTransaction,
) -> Result<(StockTransaction, Product), LedgerError> {
    let mut tx = pool.begin().await?;
    let recorded = record_in(&mut *tx, new).await?;
    tx.commit().await?;

    tracing::info!(
        transaction_id = %recorded.0.id,
        product_id = %new.product_id,
        kind = %new.kind,
        quantity = new.quantity,
        stock_quantity = recorded.1.stock_quantity,
        "stock transaction recorded"
    );

    Ok(recorded)
}

/// Record one movement on a connection that is already inside a database
/// transaction. The caller commits.
pub async fn record_in(
    conn: &mut PgConnection,
    new: &NewTransaction,
) -> Result<(StockTransaction, Product), LedgerError> {
    db::products::lock_for_update(&mut *conn, new.product_id)
        .await?
        .ok_or(LedgerError::ProductNotFound)?;

    let transaction = db::stock::insert(
        &mut *conn,
        new.product_id,
        new.actor_id,
        new.kind,
        new.quantity,
        new.reason.as_deref(),
    )
    .await?;

    let delta = new.kind.effective_delta(new.quantity);
    let product = db::products::apply_delta(&mut *conn, new.product_id, delta).await?;

    Ok((transaction, product))
}

/// Signed quantity an ADJUSTMENT from `current` to `target` must carry. Held
/// to the same magnitude limit as any other movement.
pub fn adjustment_delta(current: i64, target: i64) -> Result<i64, LedgerError> {
    target
        .checked_sub(current)
        .filter(|delta| delta.unsigned_abs() <= MAX_QUANTITY as u64)
        .ok_or_else(|| {
            LedgerError::InvalidQuantity(format!(
                "adjustment from {current} to {target} exceeds {MAX_QUANTITY}"
            ))
        })
}

/// Bring the cached quantity to `target` by recording an ADJUSTMENT for the
/// difference. Records nothing when the quantity already matches.
pub async fn adjust_to(
    conn: &mut PgConnection,
    product_id: Uuid,
    actor_id: Uuid,
    target: i64,
    reason: &str,
) -> Result<Option<StockTransaction>, LedgerError> {
    let current = db::products::lock_for_update(&mut *conn, product_id)
        .await?
        .ok_or(LedgerError::ProductNotFound)?;

    let delta = adjustment_delta(current.stock_quantity, target)?;
    if delta == 0 {
        return Ok(None);
    }

    let new = NewTransaction {
        product_id,
        actor_id,
        kind: TransactionType::Adjustment,
        quantity: delta,
        reason: Some(reason.to_string()),
    };
    let (transaction, _) = record_in(conn, &new).await?;
    Ok(Some(transaction))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn txn(kind: TransactionType, quantity: i64) -> StockTransaction {
        StockTransaction {
            id: Uuid::now_v7(),
            product_id: Uuid::nil(),
            user_id: Uuid::nil(),
            kind,
            quantity,
            reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn replay_in_then_out_then_adjustment() {
        let mut ledger = vec![txn(TransactionType::In, 10), txn(TransactionType::Out, 3)];
        assert_eq!(replay(&ledger), 7);

        ledger.push(txn(TransactionType::Adjustment, -5));
        assert_eq!(replay(&ledger), 2);
    }

    #[test]
    fn adjustment_delta_is_capped_and_overflow_safe() {
        assert_eq!(adjustment_delta(7, 2).unwrap(), -5);
        assert_eq!(adjustment_delta(-MAX_QUANTITY, 0).unwrap(), MAX_QUANTITY);
        assert!(matches!(
            adjustment_delta(-MAX_QUANTITY, MAX_QUANTITY),
            Err(LedgerError::InvalidQuantity(_))
        ));
        assert!(adjustment_delta(i64::MIN, i64::MAX).is_err());
    }

    #[test]
    fn replay_allows_negative_stock() {
        let ledger = vec![txn(TransactionType::Out, 4)];
        assert_eq!(replay(&ledger), -4);
        assert_eq!(replay(&[]), 0);
    }

    #[test]
    fn quantity_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_quantity(&json!(5)).unwrap(), 5);
        assert_eq!(parse_quantity(&json!(-5)).unwrap(), -5);
        assert_eq!(parse_quantity(&json!(0)).unwrap(), 0);
        assert_eq!(parse_quantity(&json!(12.0)).unwrap(), 12);
        assert_eq!(parse_quantity(&json!(" 42 ")).unwrap(), 42);
        assert_eq!(parse_quantity(&json!("7.0")).unwrap(), 7);
    }

    #[test]
    fn quantity_rejects_fractions_and_junk() {
        assert!(parse_quantity(&json!(1.5)).is_err());
        assert!(parse_quantity(&json!("abc")).is_err());
        assert!(parse_quantity(&json!("NaN")).is_err());
        assert!(parse_quantity(&json!(null)).is_err());
        assert!(parse_quantity(&json!(true)).is_err());
        assert!(parse_quantity(&json!(MAX_QUANTITY + 1)).is_err());
        assert!(parse_quantity(&json!(i64::MIN)).is_err());
    }

    #[test]
    fn kind_parsing_reports_the_bad_value() {
        assert_eq!(parse_kind("OUT").unwrap(), TransactionType::Out);
        match parse_kind("MOVE") {
            Err(LedgerError::InvalidTransactionType(v)) => assert_eq!(v, "MOVE"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
