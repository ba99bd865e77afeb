use std::collections::HashMap;

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::auth::Identity;
use crate::db;
use crate::db::stock::StockFilter;
use crate::models::{TransactionDetail, TransactionType};

pub const CHART_DAYS: u64 = 7;
pub const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub counts: DashboardCounts,
    pub recent_transactions: Vec<TransactionDetail>,
    pub chart_data: Vec<ChartPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub products: i64,
    pub catalogs: i64,
    pub today_in: i64,
    pub today_out: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    /// Short weekday label, e.g. "Mon".
    pub name: String,
    pub date: NaiveDate,
    #[serde(rename = "in")]
    pub inbound: i64,
    #[serde(rename = "out")]
    pub outbound: i64,
}

/// UTC instant of local midnight at the start of `date`.
pub fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // midnight skipped by a DST jump; fall back to the wall-clock reading
        None => Local.from_utc_datetime(&naive).with_timezone(&Utc),
    }
}

/// Seven points from `today - 6` to `today`, oldest first. Days without
/// movements get zeros. `movements` are (local date, type, quantity); types
/// other than IN and OUT are ignored.
pub fn build_chart(
    today: NaiveDate,
    movements: &[(NaiveDate, TransactionType, i64)],
) -> Vec<ChartPoint> {
    let mut sums: HashMap<(NaiveDate, TransactionType), i64> = HashMap::new();
    for (date, kind, quantity) in movements {
        *sums.entry((*date, *kind)).or_default() += quantity;
    }

    (0..CHART_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| ChartPoint {
            name: date.format("%a").to_string(),
            date,
            inbound: sums.get(&(date, TransactionType::In)).copied().unwrap_or(0),
            outbound: sums.get(&(date, TransactionType::Out)).copied().unwrap_or(0),
        })
        .collect()
}

/// Build the dashboard for `identity` as of `now`.
///
/// Non-Admin callers only see their own transactions in the ledger-derived
/// figures. The six reads are independent and run concurrently.
pub async fn compute(
    pool: &PgPool,
    identity: &Identity,
    now: DateTime<Local>,
) -> Result<DashboardSnapshot, sqlx::Error> {
    let scope = if identity.is_admin() {
        None
    } else {
        Some(identity.user_id)
    };

    let today = now.date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);
    let window_start = today
        .checked_sub_days(Days::new(CHART_DAYS - 1))
        .unwrap_or(today);

    let today_start = local_midnight(today);
    let today_end = local_midnight(tomorrow);

    let today_filter = |kind| StockFilter {
        kind: Some(kind),
        from: Some(today_start),
        until: Some(today_end),
        user_id: scope,
        ..Default::default()
    };
    let today_in = today_filter(TransactionType::In);
    let today_out = today_filter(TransactionType::Out);
    let recent = StockFilter {
        user_id: scope,
        ..Default::default()
    };

    let (products, catalogs, today_in, today_out, recent, movements) = tokio::try_join!(
        db::products::count_all(pool),
        db::catalogs::count_all(pool),
        db::stock::count(pool, &today_in),
        db::stock::count(pool, &today_out),
        db::stock::list(pool, &recent, RECENT_LIMIT, 0),
        db::stock::movements_between(pool, local_midnight(window_start), today_end, scope),
    )?;

    let movements: Vec<(NaiveDate, TransactionType, i64)> = movements
        .into_iter()
        .map(|(at, kind, quantity)| (at.with_timezone(&Local).date_naive(), kind, quantity))
        .collect();

    Ok(DashboardSnapshot {
        counts: DashboardCounts {
            products,
            catalogs,
            today_in,
            today_out,
        },
        recent_transactions: recent.into_iter().map(TransactionDetail::from).collect(),
        chart_data: build_chart(today, &movements),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_window_yields_seven_zero_points_oldest_first() {
        let today = day(2025, 3, 9);
        let chart = build_chart(today, &[]);

        assert_eq!(chart.len(), 7);
        assert_eq!(chart.first().unwrap().date, day(2025, 3, 3));
        assert_eq!(chart.last().unwrap().date, today);
        assert!(chart.iter().all(|p| p.inbound == 0 && p.outbound == 0));
        assert!(chart.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn sums_per_day_and_type_and_ignores_adjustments() {
        let today = day(2025, 3, 9);
        let movements = vec![
            (day(2025, 3, 9), TransactionType::In, 10),
            (day(2025, 3, 9), TransactionType::In, 5),
            (day(2025, 3, 9), TransactionType::Out, 3),
            (day(2025, 3, 7), TransactionType::Out, 2),
            (day(2025, 3, 7), TransactionType::Adjustment, 100),
            // outside the window
            (day(2025, 3, 1), TransactionType::In, 99),
        ];
        let chart = build_chart(today, &movements);

        let last = chart.last().unwrap();
        assert_eq!((last.inbound, last.outbound), (15, 3));

        let mar7 = chart.iter().find(|p| p.date == day(2025, 3, 7)).unwrap();
        assert_eq!((mar7.inbound, mar7.outbound), (0, 2));

        let mar8 = chart.iter().find(|p| p.date == day(2025, 3, 8)).unwrap();
        assert_eq!((mar8.inbound, mar8.outbound), (0, 0));

        let total_in: i64 = chart.iter().map(|p| p.inbound).sum();
        assert_eq!(total_in, 15);
    }

    #[test]
    fn labels_are_short_weekdays() {
        // 2025-03-09 is a Sunday
        let chart = build_chart(day(2025, 3, 9), &[]);
        let names: Vec<&str> = chart.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
    }

    #[test]
    fn chart_point_serializes_in_and_out_keys() {
        let point = ChartPoint {
            name: "Mon".to_string(),
            date: day(2025, 3, 3),
            inbound: 4,
            outbound: 1,
        };
        let value = serde_json::to_value(&point).unwrap();
        assert_eq!(value["in"], 4);
        assert_eq!(value["out"], 1);
        assert_eq!(value["date"], "2025-03-03");
    }

    #[test]
    fn local_midnight_round_trips_to_the_same_local_date() {
        let date = day(2025, 6, 15);
        let instant = local_midnight(date);
        assert_eq!(instant.with_timezone(&Local).date_naive(), date);
    }
}
