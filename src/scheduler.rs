//! Scheduled summaries
//!
//! The two recurring computations, exposed as plain async functions taking
//! the trigger's fire time. The cron mechanism that invokes them is an
//! external collaborator.

use chrono::{Datelike, Days, NaiveDate};
use tokio::sync::Mutex;
use tracing::info;

use crate::cache::DailyCache;
use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::models::DateRange;
use crate::reports::{summary_text, today_text};

/// End-of-day summary. Served from the daily cache; if the cache is empty
/// for today (e.g. after a restart), falls back to a direct store query.
/// `None` when there is nothing to report — the job then produces no
/// output.
pub async fn end_of_day_summary(
    store: &LedgerStore,
    cache: &Mutex<DailyCache>,
    today: NaiveDate,
    currency: &str,
) -> Result<Option<String>> {
    {
        let mut cache = cache.lock().await;
        let entries = cache.entries(today);
        if let Some(text) = today_text(entries, currency) {
            return Ok(Some(text));
        }
    }

    info!(%today, "daily cache empty, falling back to store for end-of-day summary");
    let transactions = store.query(Some(DateRange::single(today)), None).await?;
    if transactions.is_empty() {
        return Ok(None);
    }

    let mut report = String::from("📅 **Chi tiêu hôm nay:**\n\n");
    let mut total = 0i64;
    for tx in &transactions {
        total += tx.amount;
        report.push_str(&format!(
            "• {} {} - {}\n",
            crate::reports::format_thousands(tx.amount),
            currency,
            tx.description
        ));
    }
    report.push_str(&format!(
        "\n💰 **Tổng cộng: {} {}**",
        crate::reports::format_thousands(total),
        currency
    ));
    Ok(Some(report))
}

/// Month-end report for the calendar month preceding the fire date, one
/// message per configured recipient. Empty when the previous month has no
/// transactions.
pub async fn month_end_report(
    store: &LedgerStore,
    fire_date: NaiveDate,
    recipients: &[i64],
    currency: &str,
) -> Result<Vec<(i64, String)>> {
    let last_of_previous = fire_date
        .with_day(1)
        .and_then(|first| first.checked_sub_days(Days::new(1)))
        .expect("every month has a previous day");

    let summary = store
        .monthly_summary(last_of_previous.month(), last_of_previous.year(), None)
        .await?;
    let Some(summary) = summary else {
        return Ok(Vec::new());
    };

    let heading = format!(
        "📢 **BÁO CÁO TỔNG KẾT THÁNG {}/{}**",
        summary.month, summary.year
    );
    let text = summary_text(&summary, &heading, currency);
    Ok(recipients
        .iter()
        .map(|user_id| (*user_id, text.clone()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryBackend;
    use crate::models::{DraftTransaction, SELF_PAYEE, Transaction};
    use crate::classifier::classify;
    use chrono::NaiveTime;
    use std::sync::Arc;

    fn store() -> LedgerStore {
        LedgerStore::new(Arc::new(InMemoryBackend::new()))
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seed(store: &LedgerStore, amount: i64, desc: &str, date: NaiveDate) {
        store
            .append(
                DraftTransaction {
                    amount,
                    description: desc.to_string(),
                    payee: SELF_PAYEE.to_string(),
                    date,
                },
                date.and_hms_opt(9, 0, 0).unwrap(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_end_of_day_prefers_cache() {
        let store = store();
        let today = day(2024, 3, 2);
        let cache = Mutex::new(DailyCache::new(today));
        cache.lock().await.record(
            &Transaction {
                id: 1,
                date: today,
                time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                payee: SELF_PAYEE.to_string(),
                category: classify("cơm"),
                amount: 100,
                description: "cơm".to_string(),
            },
            today,
        );

        let text = end_of_day_summary(&store, &cache, today, "đ")
            .await
            .unwrap()
            .unwrap();
        assert!(text.contains("cơm"));
    }

    #[tokio::test]
    async fn test_end_of_day_falls_back_to_store() {
        let store = store();
        let today = day(2024, 3, 2);
        seed(&store, 100, "cơm", today).await;

        // Empty cache (fresh process) still produces a summary.
        let cache = Mutex::new(DailyCache::new(today));
        let text = end_of_day_summary(&store, &cache, today, "đ")
            .await
            .unwrap()
            .unwrap();
        assert!(text.contains("cơm"));
    }

    #[tokio::test]
    async fn test_end_of_day_silent_when_nothing_happened() {
        let store = store();
        let today = day(2024, 3, 2);
        let cache = Mutex::new(DailyCache::new(today));
        assert!(end_of_day_summary(&store, &cache, today, "đ")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_month_end_reports_previous_month() {
        let store = store();
        seed(&store, 100, "cơm", day(2024, 2, 15)).await;

        let reports = month_end_report(&store, day(2024, 3, 5), &[7, 8], "đ")
            .await
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].0, 7);
        assert!(reports[0].1.contains("THÁNG 2/2024"));
    }

    #[tokio::test]
    async fn test_month_end_empty_previous_month() {
        let store = store();
        seed(&store, 100, "cơm", day(2024, 3, 1)).await;
        let reports = month_end_report(&store, day(2024, 3, 5), &[7], "đ")
            .await
            .unwrap();
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn test_month_end_crosses_year_boundary() {
        let store = store();
        seed(&store, 100, "cơm", day(2023, 12, 20)).await;
        let reports = month_end_report(&store, day(2024, 1, 5), &[7], "đ")
            .await
            .unwrap();
        assert!(reports[0].1.contains("THÁNG 12/2023"));
    }
}
