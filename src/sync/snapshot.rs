//! Bulk load of pool reserves at a fixed block.

use std::time::{Duration, Instant};

use alloy::primitives::U256;
use eyre::{bail, Result};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use super::chain::ChainClient;
use crate::arb::pool::PoolStore;
use crate::arb::types::{OrderingKey, PoolId};

/// Loads the reserves of every tracked pool at one block.
///
/// Pools are fetched `rate_limit` at a time. Every batch is padded to at least
/// `1.1 × base_period` of wall-clock time, so the node never sees more than
/// `rate_limit` calls per period.
pub struct SnapshotFetcher<'c, C: ChainClient + ?Sized> {
    /// Node to read from
    chain: &'c C,
    /// Pools fetched concurrently per batch
    rate_limit: usize,
    /// Period the rate limit applies to
    base_period: Duration,
    /// Extra attempts for the pools of a batch that failed
    max_retries: u32,
}

impl<'c, C: ChainClient + ?Sized> SnapshotFetcher<'c, C> {
    /// Creates a fetcher
    #[must_use]
    pub fn new(chain: &'c C, rate_limit: usize, base_period: Duration, max_retries: u32) -> Self {
        Self {
            chain,
            rate_limit: rate_limit.max(1),
            base_period,
            max_retries,
        }
    }

    /// Fetches every pool of `store` at `at_block` and writes the result with the
    /// ordering key of the end of that block. Returns the number of pools loaded.
    ///
    /// The store is only written once every pool has been fetched.
    ///
    /// # Errors
    /// * If a pool still fails after `max_retries` retries
    pub async fn initial_load(&self, store: &mut PoolStore, at_block: u64) -> Result<usize> {
        let pools: Vec<PoolId> = store.records().iter().map(|record| record.id).collect();
        info!(
            "sync::snapshot: loading {} pools at block {at_block}, {} per batch",
            pools.len(),
            self.rate_limit
        );

        let progress = ProgressBar::new(pools.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} pools")?,
        );

        let mut fetched = Vec::with_capacity(pools.len());
        for batch in pools.chunks(self.rate_limit) {
            let mut reserves = self.fetch_batch(batch, at_block).await?;
            progress.inc(reserves.len() as u64);
            fetched.append(&mut reserves);
        }
        progress.finish_and_clear();

        let key = OrderingKey::end_of_block(at_block);
        for (pool, reserve0, reserve1) in &fetched {
            store.set_snapshot(pool, *reserve0, *reserve1, key)?;
        }
        info!("sync::snapshot: loaded {} pools", fetched.len());
        Ok(fetched.len())
    }

    /// Fetches one batch, retrying the pools that failed
    async fn fetch_batch(
        &self,
        batch: &[PoolId],
        at_block: u64,
    ) -> Result<Vec<(PoolId, U256, U256)>> {
        let mut fetched = Vec::with_capacity(batch.len());
        let mut pending = batch.to_vec();
        let mut attempt = 0;

        loop {
            let started = Instant::now();
            let results = join_all(
                pending
                    .iter()
                    .map(|pool| self.chain.reserves(*pool, at_block)),
            )
            .await;

            let mut failed = Vec::new();
            for (pool, result) in pending.iter().zip(results) {
                match result {
                    Ok((reserve0, reserve1)) => fetched.push((*pool, reserve0, reserve1)),
                    Err(e) => {
                        warn!("sync::snapshot: reserves of {pool} failed: {e:#}");
                        failed.push(*pool);
                    }
                }
            }
            self.throttle(started).await;

            if failed.is_empty() {
                return Ok(fetched);
            }
            if attempt >= self.max_retries {
                bail!(
                    "Reserves of {} pools still failing after {} retries, first: {}",
                    failed.len(),
                    self.max_retries,
                    failed[0]
                );
            }
            attempt += 1;
            info!(
                "sync::snapshot: retrying {} pools (attempt {attempt}/{})",
                failed.len(),
                self.max_retries
            );
            pending = failed;
        }
    }

    /// Sleeps out the rest of the batch window
    async fn throttle(&self, started: Instant) {
        let window = self.base_period.mul_f64(1.1);
        let elapsed = started.elapsed();
        if elapsed < window {
            tokio::time::sleep(window - elapsed).await;
        }
    }
}
