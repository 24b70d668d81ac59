//! HTTP tile provider.
//!
//! Downloads `{base}/{zoom}/{x}/{y}.png` tiles with a pooled reqwest client.
//! Batches run concurrently on a tokio runtime owned by the provider, so
//! callers stay synchronous. Each tile gets exactly one attempt; failures
//! surface as [`TileError`] and the mosaic falls back to a placeholder.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::Client;
use tokio::runtime::{Builder, Runtime};

use crate::config::HeatmapConfig;
use crate::error::TileError;
use crate::projection::TileCoord;
use crate::tiles::{tile_url, TileImage, TileProvider};

// Public tile servers reject requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0";
const MAX_CONCURRENCY: usize = 8;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fetches tiles from a slippy-map tile server.
pub struct HttpTileProvider {
    client: Client,
    base_url: String,
    runtime: Runtime,
}

impl HttpTileProvider {
    /// Provider for a `{base}/{zoom}/{x}/{y}.png` server.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TileError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(MAX_CONCURRENCY)
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            runtime,
        })
    }

    /// Provider for the configured tile server.
    pub fn from_config(config: &HeatmapConfig) -> Result<Self, TileError> {
        Self::new(config.tile_base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Download several tiles, at most `MAX_CONCURRENCY` in flight.
    /// Results come back in completion order.
    pub async fn fetch_tiles(&self, coords: &[TileCoord]) -> Vec<(TileCoord, Result<TileImage, TileError>)> {
        use futures::stream::{self, StreamExt};

        let total = coords.len() as u32;
        let completed = AtomicU32::new(0);
        let start = Instant::now();

        info!("[TileFetcher] Fetching {} tiles from {}", total, self.base_url);

        let results: Vec<(TileCoord, Result<TileImage, TileError>)> = stream::iter(coords.iter().copied())
            .map(|coord| {
                let client = &self.client;
                let base_url = self.base_url.as_str();
                let completed = &completed;
                async move {
                    let result = fetch_tile(client, base_url, coord).await;
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!("[TileFetcher] {}/{} {} ok={}", done, total, coord, result.is_ok());
                    (coord, result)
                }
            })
            .buffer_unordered(MAX_CONCURRENCY)
            .collect()
            .await;

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!(
            "[TileFetcher] DONE: {}/{} tiles ({} failed) in {:.2}s",
            results.len() - failed,
            total,
            failed,
            start.elapsed().as_secs_f64()
        );

        results
    }
}

/// Download and decode one tile.
pub async fn fetch_tile(client: &Client, base_url: &str, coord: TileCoord) -> Result<TileImage, TileError> {
    let url = tile_url(base_url, coord);
    let response = client.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        warn!("[TileFetcher] {} -> HTTP {}", url, status);
        return Err(TileError::Unavailable {
            coord,
            reason: format!("HTTP {}", status),
        });
    }

    let bytes = response.bytes().await?;
    TileImage::decode(&bytes)
}

impl TileProvider for HttpTileProvider {
    /// Blocks on the provider's runtime; must not be called from inside
    /// another tokio runtime.
    fn tile(&self, coord: TileCoord) -> Result<TileImage, TileError> {
        self.runtime.block_on(fetch_tile(&self.client, &self.base_url, coord))
    }

    fn tiles(&self, coords: &[TileCoord]) -> Vec<(TileCoord, Result<TileImage, TileError>)> {
        self.runtime.block_on(self.fetch_tiles(coords))
    }
}
