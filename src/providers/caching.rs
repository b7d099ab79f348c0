use crate::core::cache::{KeyValueCollection, get_json, put_json};
use crate::core::company::{CompanyData, CompanyDataProvider};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Name of the collection holding fetched company data.
pub const COMPANY_COLLECTION: &str = "company_data";

/// Memoizes a provider per ticker for a fixed time-to-live.
///
/// Misses are serialized so two callers asking for the same ticker inside the
/// window trigger a single upstream fetch. Failed fetches are not cached.
pub struct CachingCompanyProvider<T: CompanyDataProvider> {
    inner: T,
    cache: Arc<dyn KeyValueCollection>,
    ttl: Duration,
    fetch_guard: Mutex<()>,
}

impl<T: CompanyDataProvider> CachingCompanyProvider<T> {
    pub fn new(inner: T, cache: Arc<dyn KeyValueCollection>, ttl: Duration) -> Self {
        Self {
            inner,
            cache,
            ttl,
            fetch_guard: Mutex::new(()),
        }
    }

    pub async fn invalidate(&self, symbol: &str) {
        self.cache.remove(symbol).await;
    }
}

#[async_trait]
impl<T: CompanyDataProvider> CompanyDataProvider for CachingCompanyProvider<T> {
    async fn fetch_company(&self, symbol: &str) -> Result<CompanyData> {
        if let Some(cached) = get_json::<CompanyData>(self.cache.as_ref(), symbol).await {
            debug!("Cache hit for company data: {}", symbol);
            return Ok(cached);
        }

        let _guard = self.fetch_guard.lock().await;
        // Another caller may have filled the entry while we waited.
        if let Some(cached) = get_json::<CompanyData>(self.cache.as_ref(), symbol).await {
            return Ok(cached);
        }

        debug!("Cache miss for company data: {}", symbol);
        let data = self.inner.fetch_company(symbol).await?;
        put_json(self.cache.as_ref(), symbol, &data, Some(self.ttl)).await;
        Ok(data)
    }
}
