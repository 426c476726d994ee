//! HTTP backend for the hosted tabular service
//!
//! Implements [`LedgerBackend`] against the service's JSON row API.
//! Uses a long-lived reqwest::Client for connection pooling; transport-level
//! failures map to `BotError::Connectivity` so the store's single
//! reconnect-and-retry applies.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use super::backend::LedgerBackend;
use crate::error::{BotError, Result};

pub struct RemoteBackend {
    client: Client,
    base_url: String,
    token: String,
    container: String,
}

#[derive(Debug, Serialize)]
struct CreatePartitionRequest<'a> {
    title: &'a str,
    header: &'a [String],
    aggregate: &'a str,
}

#[derive(Debug, Serialize)]
struct AppendRowRequest<'a> {
    row: &'a [String],
}

#[derive(Debug, Serialize)]
struct UpdateCellRequest<'a> {
    row: usize,
    col: usize,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct PartitionListResponse {
    partitions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<Vec<String>>,
}

impl RemoteBackend {
    pub fn new(base_url: String, token: String, container: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url,
            token,
            container,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/containers/{}{}",
            self.base_url.trim_end_matches('/'),
            self.container,
            path
        )
    }

    /// Transport errors (connect, timeout) are transient; everything else
    /// is a hard backend error.
    fn map_transport(err: reqwest::Error) -> BotError {
        if err.is_connect() || err.is_timeout() {
            BotError::Connectivity(err.to_string())
        } else {
            BotError::HttpError(err)
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(%status, "tabular service error response: {}", body);
        Err(BotError::Backend(format!("{status}: {body}")))
    }
}

#[async_trait::async_trait]
impl LedgerBackend for RemoteBackend {

    async fn list_partitions(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("/partitions"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::map_transport)?;
        let parsed: PartitionListResponse = Self::check_status(response).await?.json().await?;
        Ok(parsed.partitions)
    }

    async fn read_rows(&self, partition: &str) -> Result<Vec<Vec<String>>> {
        let response = self
            .client
            .get(self.url(&format!("/partitions/{partition}/rows")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::map_transport)?;
        let parsed: RowsResponse = Self::check_status(response).await?.json().await?;
        Ok(parsed.rows)
    }

    async fn create_partition(
        &self,
        partition: &str,
        header: &[String],
        aggregate: &str,
    ) -> Result<()> {
        info!(partition, "creating ledger partition");
        let response = self
            .client
            .post(self.url("/partitions"))
            .bearer_auth(&self.token)
            .json(&CreatePartitionRequest {
                title: partition,
                header,
                aggregate,
            })
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn append_row(&self, partition: &str, row: &[String]) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/partitions/{partition}/rows")))
            .bearer_auth(&self.token)
            .json(&AppendRowRequest { row })
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn update_cell(
        &self,
        partition: &str,
        row_index: usize,
        col_index: usize,
        value: &str,
    ) -> Result<()> {
        let response = self
            .client
            .patch(self.url(&format!("/partitions/{partition}/cells")))
            .bearer_auth(&self.token)
            .json(&UpdateCellRequest {
                row: row_index,
                col: col_index,
                value,
            })
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete_row(&self, partition: &str, row_index: usize) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/partitions/{partition}/rows/{row_index}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        // The pooled client re-establishes transport on the next request;
        // a session ping verifies the service is reachable again.
        info!("revalidating tabular service session");
        let response = self
            .client
            .get(format!(
                "{}/session",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(response).await?;
        Ok(())
    }
}
