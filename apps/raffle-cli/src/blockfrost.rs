use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use raffle_engine::snapshot::{AccountHistoryEntry, PoolDelegator, RemoteDelegator};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const MAX_RETRIES: u32 = 5;
const RETRY_DELAY_MS: u64 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Paginated Blockfrost reader for a pool's delegators and their stake history.
pub struct BlockfrostClient {
    http: Client,
    base_url: String,
    project_id: String,
    retry_delay: Duration,
}

pub fn page_url(base_url: &str, path: &str, page: u32) -> String {
    format!("{}/api/v0/{}?page={}", base_url.trim_end_matches('/'), path, page)
}

/// Run `op` until it succeeds, at most `MAX_RETRIES` times, sleeping `delay * attempt` in between.
pub async fn with_retries<T, F, Fut>(what: &str, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_RETRIES => {
                warn!(what, attempt, error = %e, "request failed, retrying");
                sleep(delay * attempt).await;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("{} failed after {} attempts", what, attempt));
            }
        }
    }
}

impl BlockfrostClient {
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            project_id: project_id.into(),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    async fn get_page<T: DeserializeOwned>(&self, path: &str, page: u32) -> Result<Vec<T>> {
        let url = page_url(&self.base_url, path, page);
        let (http, url_ref, project_id) = (&self.http, &url, &self.project_id);
        with_retries(&url, self.retry_delay, move || async move {
            let response = http
                .get(url_ref)
                .header("project_id", project_id)
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, anyhow::Error>(response.json::<Vec<T>>().await?)
        })
        .await
    }

    /// Every page of `path`, stopping at the first empty one.
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1.. {
            let batch: Vec<T> = self.get_page(path, page).await?;
            if batch.is_empty() {
                break;
            }
            debug!(path, page, count = batch.len(), "page fetched");
            items.extend(batch);
        }
        Ok(items)
    }

    pub async fn pool_delegators(&self, pool_id: &str) -> Result<Vec<PoolDelegator>> {
        self.get_all(&format!("pools/{}/delegators", pool_id)).await
    }

    pub async fn account_history(&self, stake_address: &str) -> Result<Vec<AccountHistoryEntry>> {
        self.get_all(&format!("accounts/{}/history", stake_address)).await
    }

    /// Delegator listing plus each delegator's history, fetched one account at a time.
    pub async fn remote_delegators(&self, pool_id: &str) -> Result<Vec<RemoteDelegator>> {
        let delegators = self.pool_delegators(pool_id).await?;
        info!(pool_id, count = delegators.len(), "delegators listed");

        let mut out = Vec::with_capacity(delegators.len());
        for delegator in delegators {
            let history = self.account_history(&delegator.address).await?;
            out.push(RemoteDelegator { delegator, history });
        }
        Ok(out)
    }
}
