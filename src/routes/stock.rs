use axum::extract::{Query, State};
use axum::http::StatusCode;
use chrono::Local;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{permissions, Identity};
use crate::dashboard::local_midnight;
use crate::db;
use crate::db::stock::StockFilter;
use crate::error::AppError;
use crate::extract::Json;
use crate::ledger::{self, LedgerError, NewTransaction};
use crate::middleware::audit;
use crate::models::{StockTransaction, TransactionDetail, TransactionType};
use crate::routes::{non_blank, Paging};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStock {
    pub product_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub quantity: serde_json::Value,
    pub reason: Option<String>,
}

/// `ALL` or blank means every type.
fn kind_filter(raw: Option<&str>) -> Result<Option<TransactionType>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("ALL") => Ok(None),
        Some(raw) => Ok(Some(ledger::parse_kind(raw)?)),
    }
}

/// Builds the filter for `GET /api/stock` as of local `today`.
fn build_filter(params: &StockQuery, today: chrono::NaiveDate) -> Result<StockFilter, AppError> {
    let mut filter = StockFilter {
        kind: kind_filter(params.kind.as_deref())?,
        product_pattern: db::like_pattern(params.search.as_deref()),
        ..Default::default()
    };

    match params.date.as_deref().map(str::trim) {
        None | Some("") => {}
        Some("today") => {
            filter.from = Some(local_midnight(today));
            filter.until = today.succ_opt().map(local_midnight);
        }
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Invalid date filter '{other}', expected 'today'"
            )));
        }
    }
    Ok(filter)
}

pub async fn list(
    identity: Identity,
    State(state): State<SharedState>,
    Query(params): Query<StockQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    identity.require(permissions::MANAGE_STOCK)?;

    let paging = Paging::new(params.page, params.limit);
    let filter = build_filter(&params, Local::now().date_naive())?;

    let (rows, total) = tokio::try_join!(
        db::stock::list(&state.pool, &filter, paging.limit, paging.offset()),
        db::stock::count(&state.pool, &filter),
    )?;
    let transactions: Vec<TransactionDetail> =
        rows.into_iter().map(TransactionDetail::from).collect();

    Ok(Json(serde_json::json!({
        "transactions": transactions,
        "page": paging.page,
        "pages": paging.pages(total),
        "total": total,
    })))
}

/// Records one movement. A `productId` that is not a valid id cannot name a
/// product, so it is reported as not found.
pub async fn record(
    identity: Identity,
    State(state): State<SharedState>,
    Json(req): Json<RecordStock>,
) -> Result<(StatusCode, Json<StockTransaction>), AppError> {
    identity.require(permissions::MANAGE_STOCK)?;

    let product_id =
        Uuid::parse_str(req.product_id.trim()).map_err(|_| LedgerError::ProductNotFound)?;
    let kind = ledger::parse_kind(&req.kind)?;
    let quantity = ledger::parse_quantity(&req.quantity)?;

    let new = NewTransaction {
        product_id,
        actor_id: identity.user_id,
        kind,
        quantity,
        reason: non_blank(&req.reason).map(str::to_string),
    };
    let (transaction, product) = ledger::record_transaction(&state.pool, &new).await?;

    audit::log_event(
        &state.pool,
        Some(identity.user_id),
        "stock.recorded",
        "stock_transaction",
        Some(transaction.id),
        Some(serde_json::json!({
            "product_id": product.id,
            "type": transaction.kind,
            "quantity": transaction.quantity,
            "stock_quantity": product.stock_quantity,
        })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(transaction)))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn query(kind: Option<&str>, date: Option<&str>) -> StockQuery {
        StockQuery {
            kind: kind.map(str::to_string),
            date: date.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn all_and_blank_types_do_not_filter() {
        assert_eq!(kind_filter(None).unwrap(), None);
        assert_eq!(kind_filter(Some("")).unwrap(), None);
        assert_eq!(kind_filter(Some("ALL")).unwrap(), None);
        assert_eq!(kind_filter(Some("OUT")).unwrap(), Some(TransactionType::Out));
        assert!(kind_filter(Some("out")).is_err());
        assert!(kind_filter(Some("TRANSFER")).is_err());
    }

    #[test]
    fn today_filter_spans_one_local_day() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let filter = build_filter(&query(None, Some("today")), today).unwrap();

        let from = filter.from.unwrap();
        let until = filter.until.unwrap();
        assert_eq!(from, local_midnight(today));
        assert!(until > from);
        assert_eq!(until.with_timezone(&Local).date_naive(), today.succ_opt().unwrap());
    }

    #[test]
    fn unknown_date_filter_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert!(build_filter(&query(None, Some("yesterday")), today).is_err());

        let open = build_filter(&query(Some("IN"), Some("")), today).unwrap();
        assert!(open.from.is_none() && open.until.is_none());
        assert_eq!(open.kind, Some(TransactionType::In));
    }
}
