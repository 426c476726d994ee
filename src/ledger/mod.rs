//! Ledger store — durable, partitioned record of all transactions
//!
//! One partition per calendar month, resolved from the transaction's date
//! (not the recording time). Every operation survives one transient
//! connectivity failure by reconnecting and retrying once; a second failure
//! surfaces.
//!
//! Read results follow a stable combined order: ascending partition key,
//! then ascending row index within a partition. "Most recent N" means the
//! last N of that order.

pub mod backend;
pub mod remote;
pub mod schema;

pub use backend::{InMemoryBackend, LedgerBackend};
pub use remote::RemoteBackend;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::error::{BotError, Result};
use crate::models::{DateRange, DraftTransaction, MonthKey, MonthlySummary, Transaction};
use schema::{Column, ColumnMap, CANONICAL_HEADER};

/// Convenience running-sum over the canonical amount column, provisioned on
/// partition creation. Nothing reads it back.
const AGGREGATE_FORMULA: &str = "=SUM(F2:F)";

/// Write-side date format. Reads accept this and the year-first form.
const DATE_WRITE_FORMAT: &str = "%d/%m/%Y";
const TIME_WRITE_FORMAT: &str = "%H:%M:%S";

struct RowLocation {
    partition: String,
    row_index: usize,
    map: ColumnMap,
}

pub struct LedgerStore {
    backend: Arc<dyn LedgerBackend>,
}

impl LedgerStore {
    pub fn new(backend: Arc<dyn LedgerBackend>) -> Self {
        Self { backend }
    }

    /// Run a backend call, reconnecting and retrying exactly once on a
    /// transient connectivity failure.
    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match op().await {
            Err(BotError::Connectivity(reason)) => {
                warn!(%reason, "store call failed, reconnecting once");
                self.backend.reconnect().await?;
                op().await
            }
            other => other,
        }
    }

    /// Persist a draft: classify it, assign an id from the creation
    /// wall-clock, write one row to the home partition (creating the
    /// partition lazily), and return the persisted view.
    pub async fn append(
        &self,
        draft: DraftTransaction,
        now: chrono::NaiveDateTime,
    ) -> Result<Transaction> {
        let category = classify(&draft.description);
        let tx = Transaction {
            id: now.and_utc().timestamp_millis(),
            date: draft.date,
            time: now.time(),
            payee: draft.payee,
            category,
            amount: draft.amount,
            description: draft.description,
        };

        let partition = MonthKey::from_date(tx.date).title();
        self.ensure_partition(&partition).await?;

        let row = to_row(&tx);
        self.with_retry(|| self.backend.append_row(&partition, &row))
            .await?;

        info!(id = tx.id, %partition, amount = tx.amount, "transaction appended");
        Ok(tx)
    }

    async fn ensure_partition(&self, partition: &str) -> Result<()> {
        let existing = self.with_retry(|| self.backend.list_partitions()).await?;
        if existing.iter().any(|title| title == partition) {
            return Ok(());
        }
        let header: Vec<String> = CANONICAL_HEADER.iter().map(|s| s.to_string()).collect();
        self.with_retry(|| {
            self.backend
                .create_partition(partition, &header, AGGREGATE_FORMULA)
        })
        .await
    }

    /// Partition titles overlapping `range`, ascending. Titles that are not
    /// month keys belong to someone else and are skipped.
    async fn partitions_for(&self, range: Option<DateRange>) -> Result<Vec<String>> {
        let mut titles: Vec<String> = self
            .with_retry(|| self.backend.list_partitions())
            .await?
            .into_iter()
            .filter(|title| match MonthKey::parse_title(title) {
                Some(key) => range.map_or(true, |r| r.overlaps_month(key)),
                None => {
                    debug!(%title, "skipping non-month partition");
                    false
                }
            })
            .collect();
        titles.sort();
        Ok(titles)
    }

    /// Read transactions, oldest partition first. Rows with unparsable
    /// dates are dropped; partitions whose schema cannot be resolved
    /// contribute nothing.
    pub async fn query(
        &self,
        range: Option<DateRange>,
        payee: Option<&str>,
    ) -> Result<Vec<Transaction>> {
        let mut result = Vec::new();

        for partition in self.partitions_for(range).await? {
            let rows = self.with_retry(|| self.backend.read_rows(&partition)).await?;
            let Some((header, data)) = rows.split_first() else {
                continue;
            };
            let Some(map) = ColumnMap::resolve(header) else {
                // One malformed partition must not blank out the rest.
                continue;
            };

            for row in data {
                let Some(tx) = map.row_to_transaction(row) else {
                    continue;
                };
                if let Some(r) = range {
                    if !r.contains(tx.date) {
                        continue;
                    }
                }
                if let Some(p) = payee {
                    if tx.payee != p {
                        continue;
                    }
                }
                result.push(tx);
            }
        }

        Ok(result)
    }

    /// Locate the unique row holding `id`, searching newest partitions
    /// first.
    async fn find_row(&self, id: i64) -> Result<Option<RowLocation>> {
        let id_text = id.to_string();
        let mut partitions = self.partitions_for(None).await?;
        partitions.reverse();

        for partition in partitions {
            let rows = self.with_retry(|| self.backend.read_rows(&partition)).await?;
            let Some((header, data)) = rows.split_first() else {
                continue;
            };
            let Some(map) = ColumnMap::resolve(header) else {
                continue;
            };
            let Some(id_index) = map.get(Column::Id) else {
                continue;
            };

            for (offset, row) in data.iter().enumerate() {
                if row.get(id_index).map(|cell| cell.trim()) == Some(id_text.as_str()) {
                    return Ok(Some(RowLocation {
                        partition,
                        row_index: offset + 1,
                        map,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Update amount and/or description in place. A new description is
    /// re-classified so the stored category never goes stale. `Ok(false)`
    /// when no row matches.
    pub async fn edit(
        &self,
        id: i64,
        new_amount: Option<i64>,
        new_description: Option<&str>,
    ) -> Result<bool> {
        let Some(loc) = self.find_row(id).await? else {
            return Ok(false);
        };

        if let Some(amount) = new_amount {
            if let Some(col) = loc.map.get(Column::Amount) {
                let value = amount.to_string();
                self.with_retry(|| {
                    self.backend
                        .update_cell(&loc.partition, loc.row_index, col, &value)
                })
                .await?;
            }
        }

        if let Some(description) = new_description {
            if let Some(col) = loc.map.get(Column::Description) {
                self.with_retry(|| {
                    self.backend
                        .update_cell(&loc.partition, loc.row_index, col, description)
                })
                .await?;
            }
            let category = classify(description);
            if let Some(col) = loc.map.get(Column::Category) {
                self.with_retry(|| {
                    self.backend
                        .update_cell(&loc.partition, loc.row_index, col, category.label())
                })
                .await?;
            }
        }

        info!(id, partition = %loc.partition, "transaction edited");
        Ok(true)
    }

    /// Remove the unique row holding `id`. `Ok(false)` when absent.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let Some(loc) = self.find_row(id).await? else {
            return Ok(false);
        };
        self.with_retry(|| self.backend.delete_row(&loc.partition, loc.row_index))
            .await?;
        info!(id, partition = %loc.partition, "transaction deleted");
        Ok(true)
    }

    /// Per-category totals for one calendar month. `None` when the filtered
    /// set is empty — not a zero-valued summary.
    pub async fn monthly_summary(
        &self,
        month: u32,
        year: i32,
        payee: Option<&str>,
    ) -> Result<Option<MonthlySummary>> {
        let key = MonthKey { year, month };
        let transactions = self.query(Some(key.date_range()), payee).await?;
        if transactions.is_empty() {
            return Ok(None);
        }

        let mut categories: BTreeMap<_, i64> = BTreeMap::new();
        let mut total = 0i64;
        for tx in &transactions {
            *categories.entry(tx.category).or_default() += tx.amount;
            total += tx.amount;
        }

        Ok(Some(MonthlySummary {
            month,
            year,
            payee: payee.map(|p| p.to_string()),
            categories: categories.into_iter().collect(),
            total,
        }))
    }

    /// Raw rows of one month's partition, header included, for the export
    /// command. `None` when the partition does not exist yet.
    pub async fn export_partition(&self, key: MonthKey) -> Result<Option<Vec<Vec<String>>>> {
        let title = key.title();
        let existing = self.with_retry(|| self.backend.list_partitions()).await?;
        if !existing.iter().any(|t| *t == title) {
            return Ok(None);
        }
        let rows = self.with_retry(|| self.backend.read_rows(&title)).await?;
        Ok(Some(rows))
    }
}

fn to_row(tx: &Transaction) -> Vec<String> {
    vec![
        tx.id.to_string(),
        tx.date.format(DATE_WRITE_FORMAT).to_string(),
        tx.time.format(TIME_WRITE_FORMAT).to_string(),
        tx.payee.clone(),
        tx.category.label().to_string(),
        tx.amount.to_string(),
        tx.description.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, SELF_PAYEE};
    use chrono::{NaiveDate, NaiveDateTime};

    fn store() -> (Arc<InMemoryBackend>, LedgerStore) {
        let backend = Arc::new(InMemoryBackend::new());
        (backend.clone(), LedgerStore::new(backend))
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn draft(amount: i64, description: &str, date: chrono::NaiveDate) -> DraftTransaction {
        DraftTransaction {
            amount,
            description: description.to_string(),
            payee: SELF_PAYEE.to_string(),
            date,
        }
    }

    #[tokio::test]
    async fn test_append_then_query_roundtrip() {
        let (_, store) = store();
        let now = at(2024, 3, 2, 12, 30, 0);
        let tx = store.append(draft(100_000, "cơm", now.date()), now).await.unwrap();
        assert_eq!(tx.category, Category::AnUong);

        let range = DateRange::single(now.date());
        let found = store.query(Some(range), None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, tx.id);
        assert_eq!(found[0].amount, 100_000);
        assert_eq!(found[0].category, Category::AnUong);
        assert_eq!(found[0].description, "cơm");
    }

    #[tokio::test]
    async fn test_partition_created_lazily_with_canonical_header() {
        let (backend, store) = store();
        let now = at(2024, 3, 2, 9, 0, 0);
        store.append(draft(50, "xăng", now.date()), now).await.unwrap();

        let rows = backend.read_rows("2024-03").await.unwrap();
        assert_eq!(rows[0], CANONICAL_HEADER.map(|s| s.to_string()).to_vec());
        assert_eq!(rows.len(), 2);

        // Second append reuses the partition, no second header.
        store
            .append(draft(70, "cafe", now.date()), at(2024, 3, 2, 9, 5, 0))
            .await
            .unwrap();
        assert_eq!(backend.read_rows("2024-03").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_backdated_transaction_lands_in_home_partition() {
        let (backend, store) = store();
        // Recorded in March, attributed to February.
        let now = at(2024, 3, 2, 9, 0, 0);
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        store.append(draft(200, "bỉm", date), now).await.unwrap();

        assert_eq!(backend.list_partitions().await.unwrap(), vec!["2024-02"]);
    }

    #[tokio::test]
    async fn test_query_order_is_partition_then_row() {
        let (_, store) = store();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let mar = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        store.append(draft(1, "một", mar), at(2024, 3, 1, 8, 0, 0)).await.unwrap();
        store.append(draft(2, "hai", feb), at(2024, 3, 1, 8, 1, 0)).await.unwrap();
        store.append(draft(3, "ba", feb), at(2024, 3, 1, 8, 2, 0)).await.unwrap();

        let all = store.query(None, None).await.unwrap();
        let amounts: Vec<i64> = all.iter().map(|tx| tx.amount).collect();
        // February partition first, rows in append order, then March.
        assert_eq!(amounts, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_query_filters_by_payee() {
        let (_, store) = store();
        let now = at(2024, 3, 2, 9, 0, 0);
        let mut d = draft(100, "cơm", now.date());
        d.payee = "vợ".to_string();
        store.append(d, now).await.unwrap();
        store
            .append(draft(50, "xăng", now.date()), at(2024, 3, 2, 9, 1, 0))
            .await
            .unwrap();

        let mine = store.query(None, Some(SELF_PAYEE)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].description, "xăng");
    }

    #[tokio::test]
    async fn test_delete_semantics() {
        let (_, store) = store();
        let now = at(2024, 3, 2, 9, 0, 0);
        let tx = store.append(draft(100, "cơm", now.date()), now).await.unwrap();

        assert!(store.delete(tx.id).await.unwrap());
        assert!(store.query(None, None).await.unwrap().is_empty());

        // Unknown id is a negative result, not an error, and a no-op.
        assert!(!store.delete(123).await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_reclassifies_on_new_description() {
        let (_, store) = store();
        let now = at(2024, 3, 2, 9, 0, 0);
        let tx = store.append(draft(100, "cơm", now.date()), now).await.unwrap();

        assert!(store.edit(tx.id, Some(80), Some("xăng")).await.unwrap());
        let found = store.query(None, None).await.unwrap();
        assert_eq!(found[0].amount, 80);
        assert_eq!(found[0].description, "xăng");
        assert_eq!(found[0].category, Category::XangXe);

        assert!(!store.edit(999, Some(1), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_amount_only_keeps_category() {
        let (_, store) = store();
        let now = at(2024, 3, 2, 9, 0, 0);
        let tx = store.append(draft(100, "cơm", now.date()), now).await.unwrap();

        assert!(store.edit(tx.id, Some(120), None).await.unwrap());
        let found = store.query(None, None).await.unwrap();
        assert_eq!(found[0].amount, 120);
        assert_eq!(found[0].category, Category::AnUong);
    }

    #[tokio::test]
    async fn test_monthly_summary_groups_and_sums() {
        let (_, store) = store();
        let d = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        store.append(draft(100, "cơm", d), at(2024, 3, 2, 8, 0, 0)).await.unwrap();
        store.append(draft(50, "phở", d), at(2024, 3, 2, 8, 1, 0)).await.unwrap();
        store.append(draft(30, "xăng", d), at(2024, 3, 2, 8, 2, 0)).await.unwrap();

        let summary = store.monthly_summary(3, 2024, None).await.unwrap().unwrap();
        assert_eq!(summary.total, 180);
        assert_eq!(
            summary.categories,
            vec![(Category::AnUong, 150), (Category::XangXe, 30)]
        );
    }

    #[tokio::test]
    async fn test_monthly_summary_empty_is_none() {
        let (_, store) = store();
        assert!(store.monthly_summary(3, 2024, None).await.unwrap().is_none());

        // Data in another month still yields None for this one.
        let now = at(2024, 2, 2, 8, 0, 0);
        store.append(draft(100, "cơm", now.date()), now).await.unwrap();
        assert!(store.monthly_summary(3, 2024, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_connectivity_failure_is_retried() {
        let (backend, store) = store();
        let now = at(2024, 3, 2, 9, 0, 0);
        store.append(draft(100, "cơm", now.date()), now).await.unwrap();

        backend.inject_failures(1).await;
        let found = store.query(None, None).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_second_connectivity_failure_surfaces() {
        let (backend, store) = store();
        backend.inject_failures(2).await;
        assert!(matches!(
            store.query(None, None).await,
            Err(BotError::Connectivity(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_partition_fails_closed() {
        let (backend, store) = store();
        // A partition whose columns cannot be resolved.
        backend
            .create_partition(
                "2024-01",
                &["x".to_string(), "y".to_string()],
                "",
            )
            .await
            .unwrap();
        backend
            .append_row("2024-01", &["junk".to_string(), "junk".to_string()])
            .await
            .unwrap();

        let now = at(2024, 3, 2, 9, 0, 0);
        store.append(draft(100, "cơm", now.date()), now).await.unwrap();

        // The malformed January partition contributes nothing; March is
        // unaffected.
        let all = store.query(None, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "cơm");
    }

    #[tokio::test]
    async fn test_foreign_partition_titles_are_skipped() {
        let (backend, store) = store();
        backend
            .create_partition("Tổng hợp", &["a".to_string()], "")
            .await
            .unwrap();
        assert!(store.query(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_with_unparsable_dates_are_dropped() {
        let (backend, store) = store();
        let now = at(2024, 3, 2, 9, 0, 0);
        store.append(draft(100, "cơm", now.date()), now).await.unwrap();
        backend
            .append_row(
                "2024-03",
                &[
                    "42".to_string(),
                    "không rõ".to_string(),
                    "09:00:00".to_string(),
                    SELF_PAYEE.to_string(),
                    "Khác".to_string(),
                    "500".to_string(),
                    "hàng lỗi".to_string(),
                ],
            )
            .await
            .unwrap();

        let all = store.query(None, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "cơm");
    }

    #[tokio::test]
    async fn test_export_partition() {
        let (_, store) = store();
        let key = MonthKey { year: 2024, month: 3 };
        assert!(store.export_partition(key).await.unwrap().is_none());

        let now = at(2024, 3, 2, 9, 0, 0);
        store.append(draft(100, "cơm", now.date()), now).await.unwrap();
        let rows = store.export_partition(key).await.unwrap().unwrap();
        assert_eq!(rows.len(), 2);
    }
}
