//! Tabular backend trait and the in-memory implementation
//!
//! The backend is the raw partition container: rows of strings, no schema
//! knowledge. All schema handling lives in the store on top of it.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{BotError, Result};

/// One month's container. Row 0 is the header; data rows follow in append
/// order. `row_index` arguments below index into this full list.
#[async_trait::async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Titles of every existing partition, in no particular order.
    async fn list_partitions(&self) -> Result<Vec<String>>;

    /// All rows of a partition, header included.
    async fn read_rows(&self, partition: &str) -> Result<Vec<Vec<String>>>;

    /// Create a partition seeded with a header row and a convenience
    /// aggregate cell (a running-sum formula; no operation depends on it).
    async fn create_partition(
        &self,
        partition: &str,
        header: &[String],
        aggregate: &str,
    ) -> Result<()>;

    /// Append one row after the existing rows, preserving their order.
    async fn append_row(&self, partition: &str, row: &[String]) -> Result<()>;

    async fn update_cell(
        &self,
        partition: &str,
        row_index: usize,
        col_index: usize,
        value: &str,
    ) -> Result<()>;

    async fn delete_row(&self, partition: &str, row_index: usize) -> Result<()>;

    /// Re-establish the connection after a transient failure.
    async fn reconnect(&self) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
struct PartitionData {
    rows: Vec<Vec<String>>,
    aggregate: String,
}

/// In-memory backend for development and tests.
///
/// `inject_failures(n)` makes the next `n` operations fail with a
/// connectivity error, which is how the retry path is exercised.
pub struct InMemoryBackend {
    partitions: Arc<RwLock<BTreeMap<String, PartitionData>>>,
    pending_failures: Arc<RwLock<u32>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            partitions: Arc::new(RwLock::new(BTreeMap::new())),
            pending_failures: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn inject_failures(&self, count: u32) {
        *self.pending_failures.write().await = count;
    }

    async fn check_connectivity(&self) -> Result<()> {
        let mut pending = self.pending_failures.write().await;
        if *pending > 0 {
            *pending -= 1;
            return Err(BotError::Connectivity("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LedgerBackend for InMemoryBackend {

    async fn list_partitions(&self) -> Result<Vec<String>> {
        self.check_connectivity().await?;
        let partitions = self.partitions.read().await;
        Ok(partitions.keys().cloned().collect())
    }

    async fn read_rows(&self, partition: &str) -> Result<Vec<Vec<String>>> {
        self.check_connectivity().await?;
        let partitions = self.partitions.read().await;
        partitions
            .get(partition)
            .map(|data| data.rows.clone())
            .ok_or_else(|| BotError::Backend(format!("no such partition: {partition}")))
    }

    async fn create_partition(
        &self,
        partition: &str,
        header: &[String],
        aggregate: &str,
    ) -> Result<()> {
        self.check_connectivity().await?;
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(partition.to_string())
            .or_insert_with(|| PartitionData {
                rows: vec![header.to_vec()],
                aggregate: aggregate.to_string(),
            });
        Ok(())
    }

    async fn append_row(&self, partition: &str, row: &[String]) -> Result<()> {
        self.check_connectivity().await?;
        let mut partitions = self.partitions.write().await;
        let data = partitions
            .get_mut(partition)
            .ok_or_else(|| BotError::Backend(format!("no such partition: {partition}")))?;
        data.rows.push(row.to_vec());
        Ok(())
    }

    async fn update_cell(
        &self,
        partition: &str,
        row_index: usize,
        col_index: usize,
        value: &str,
    ) -> Result<()> {
        self.check_connectivity().await?;
        let mut partitions = self.partitions.write().await;
        let data = partitions
            .get_mut(partition)
            .ok_or_else(|| BotError::Backend(format!("no such partition: {partition}")))?;
        let row = data
            .rows
            .get_mut(row_index)
            .ok_or_else(|| BotError::Backend(format!("row {row_index} out of range")))?;
        if row.len() <= col_index {
            row.resize(col_index + 1, String::new());
        }
        row[col_index] = value.to_string();
        Ok(())
    }

    async fn delete_row(&self, partition: &str, row_index: usize) -> Result<()> {
        self.check_connectivity().await?;
        let mut partitions = self.partitions.write().await;
        let data = partitions
            .get_mut(partition)
            .ok_or_else(|| BotError::Backend(format!("no such partition: {partition}")))?;
        if row_index >= data.rows.len() {
            return Err(BotError::Backend(format!("row {row_index} out of range")));
        }
        data.rows.remove(row_index);
        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        Ok(())
    }
}
