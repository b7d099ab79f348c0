pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::dashboard::{self, Page};
use crate::core::cache::{KeyValueCollection, Store};
use crate::core::company::{ViewMode, normalize_ticker};
use crate::core::config::AppConfig;
use crate::providers::caching::COMPANY_COLLECTION;
use crate::providers::{CachingCompanyProvider, YahooFinanceProvider};
use crate::store::KeyValueStore;
use crate::store::memory::MemoryCollection;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Dashboard {
        page: Page,
        ticker: String,
        view: ViewMode,
    },
    ClearCache {
        ticker: Option<String>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("stocklens starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = open_store(&config)?;
    let collection = company_collection(&store, config.cache.persist);

    match command {
        AppCommand::Dashboard { page, ticker, view } => {
            let yahoo = YahooFinanceProvider::new(config.yahoo_base_url())?
                .with_cookie_url(config.yahoo_cookie_url());
            let provider = CachingCompanyProvider::new(yahoo, collection, config.cache.ttl());
            dashboard::run(&provider, &ticker, view, page).await
        }
        AppCommand::ClearCache { ticker } => {
            match ticker.as_deref().map(normalize_ticker) {
                Some(symbol) if !symbol.is_empty() => {
                    collection.remove(&symbol).await;
                    println!("Cleared cached data for {symbol}");
                }
                _ => {
                    collection.clear().await;
                    println!("Cleared all cached company data");
                }
            }
            Ok(())
        }
    }
}

fn open_store(config: &AppConfig) -> Result<KeyValueStore> {
    if config.cache.persist {
        let data_path = config.default_data_path()?;
        debug!("Opening cache under {}", data_path.display());
        Ok(KeyValueStore::open(&data_path))
    } else {
        Ok(KeyValueStore::in_memory())
    }
}

/// The company data collection, memory-backed when the disk cache is unavailable.
fn company_collection(store: &KeyValueStore, persist: bool) -> Arc<dyn KeyValueCollection> {
    store
        .get_collection(COMPANY_COLLECTION, persist, true)
        .unwrap_or_else(|| Arc::new(MemoryCollection::new()))
}
