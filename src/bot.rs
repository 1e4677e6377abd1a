//! The steady-state loop: poll `Sync` logs, reconcile them, and whenever a pool
//! changed, persist the table and look for arbitrage from the anchor token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eyre::{eyre, Result};
use log::{debug, error, info};

use crate::arb::cycle::Cycle;
use crate::arb::detector::CycleDetector;
use crate::arb::graph::RateGraph;
use crate::arb::pool::PoolStore;
use crate::arb::router::Routers;
use crate::arb::sizing::SizingEngine;
use crate::arb::types::TokenId;
use crate::notify::{ArbLog, ArbRecord};
use crate::persist::pool_table::PoolTable;
use crate::sync::{reconciler, ChainClient, LogPoller};

/// Cycles from `anchor`, or `None` when the graph holds no negative cycle at all and
/// the single-source search was skipped
fn find_cycles(detector: &CycleDetector<'_>, anchor: &TokenId) -> Option<Vec<Cycle>> {
    if !detector.has_any_negative_cycle() {
        return None;
    }
    Some(detector.search(anchor))
}

/// Searches the current pool state for cycles from `anchor` and sizes them.
/// Cycles without a profitable input are left out.
///
/// # Errors
/// * If a found cycle does not match the graph it was found in
/// * If the start token of a cycle has no known decimals
pub async fn detection_pass(
    store: &PoolStore,
    anchor: &TokenId,
    sizing: &SizingEngine,
    routers: &Routers,
) -> Result<Vec<ArbRecord>> {
    let graph = RateGraph::build(store.records());
    let detector = CycleDetector::new(&graph);
    let block_number = store.latest_block();
    let Some(cycles) = find_cycles(&detector, anchor) else {
        debug!("bot: no negative cycle at block {block_number}, search skipped");
        return Ok(Vec::new());
    };

    let mut found = Vec::new();
    for cycle in &cycles {
        let profit = detector.profit(cycle)?;
        let Some(sized) = sizing.size(&graph, cycle, routers).await? else {
            continue;
        };
        let decimals = store
            .decimals(&cycle.start())
            .ok_or_else(|| eyre!("No decimals for {}", cycle.start()))?;
        found.push(ArbRecord::new(
            &graph,
            cycle,
            profit,
            &sized,
            decimals,
            block_number,
        )?);
    }

    debug!(
        "bot: {} cycles, {} sized at block {block_number}",
        cycles.len(),
        found.len()
    );
    Ok(found)
}

/// What the bot does with the state it keeps
pub struct BotSettings {
    /// Token cycles are searched from
    pub anchor: TokenId,
    /// Sizing of found cycles
    pub sizing: SizingEngine,
    /// Sleep between polls when nothing changed
    pub idle_interval: Duration,
    /// Where the pool table is persisted
    pub pool_table: PoolTable,
    /// Where opportunities are written
    pub arb_log: ArbLog,
}

/// Single-threaded monitor loop. It is the only writer of its pool store.
pub struct Bot<C: ChainClient> {
    /// Node to poll
    chain: C,
    /// Routers for real output quotes
    routers: Routers,
    /// Current pool state
    store: PoolStore,
    /// Position in the log stream
    poller: LogPoller,
    /// Fixed settings
    settings: BotSettings,
    /// Set to stop the loop after the current iteration
    shutdown: Arc<AtomicBool>,
    /// Reconciled updates not yet persisted and searched
    dirty: bool,
}

impl<C: ChainClient> Bot<C> {
    /// Creates a bot resuming from `store`, polling from the poller's cursor
    #[must_use]
    pub fn new(
        chain: C,
        routers: Routers,
        store: PoolStore,
        poller: LogPoller,
        settings: BotSettings,
    ) -> Self {
        Self {
            chain,
            routers,
            store,
            poller,
            settings,
            shutdown: Arc::new(AtomicBool::new(false)),
            dirty: false,
        }
    }

    /// Flag that stops [`Bot::run`] between two iterations once set
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Current pool state
    #[must_use]
    pub const fn store(&self) -> &PoolStore {
        &self.store
    }

    /// Runs until the shutdown flag is set. A failing iteration is logged and the next
    /// one starts from the last reconciled state.
    ///
    /// # Errors
    /// * Never at the moment, iteration failures are only logged
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "bot: started with {} pools from block {}",
            self.store.len(),
            self.poller.cursor()
        );

        let mut first = true;
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.tick(first).await {
                Ok(true) => first = false,
                Ok(false) => tokio::time::sleep(self.settings.idle_interval).await,
                Err(e) => {
                    error!("bot: iteration failed: {e:#}");
                    tokio::time::sleep(self.settings.idle_interval).await;
                }
            }
        }

        info!("bot: stopped at block {}", self.poller.cursor());
        Ok(())
    }

    /// One iteration. Returns whether the state was recomputed.
    ///
    /// Updates stay pending until they have been persisted and searched, so an
    /// iteration that fails after reconciling is redone by the next one.
    ///
    /// # Errors
    /// * If polling, persisting or detecting fails
    pub async fn tick(&mut self, first: bool) -> Result<bool> {
        let logs = self.poller.new_entries(&self.chain).await?;
        if reconciler::update(&mut self.store, &logs) > 0 {
            self.dirty = true;
        }
        if !first && !self.dirty {
            return Ok(false);
        }

        self.settings.pool_table.save(&self.store)?;
        let found = detection_pass(
            &self.store,
            &self.settings.anchor,
            &self.settings.sizing,
            &self.routers,
        )
        .await?;
        for record in &found {
            self.settings.arb_log.write(record)?;
        }
        self.dirty = false;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use alloy::primitives::U256;
    use async_trait::async_trait;

    use super::*;
    use crate::arb::test_helpers::*;
    use crate::arb::types::{OrderingKey, PoolId};
    use crate::sync::RawLog;
    use crate::utils::constants::SYNC_TOPIC;

    /// Serves a fixed list of logs up to a head the test controls
    #[derive(Default)]
    struct FakeChain {
        head: Mutex<u64>,
        logs: Mutex<Vec<RawLog>>,
    }

    #[async_trait]
    impl ChainClient for FakeChain {
        async fn block_number(&self) -> Result<u64> {
            Ok(*self.head.lock().unwrap())
        }

        async fn sync_logs(&self, from: u64, to: u64) -> Result<Vec<RawLog>> {
            Ok(self
                .logs
                .lock()
                .unwrap()
                .iter()
                .filter(|log| log.block_number.is_some_and(|block| (from..=to).contains(&block)))
                .cloned()
                .collect())
        }

        async fn reserves(&self, _pool: PoolId, _at_block: u64) -> Result<(U256, U256)> {
            Err(eyre!("not used"))
        }
    }

    fn sync_log(pool: &str, block: u64, reserve0: u64, reserve1: u64) -> RawLog {
        let mut data = U256::from(reserve0).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(&U256::from(reserve1).to_be_bytes::<32>());
        RawLog {
            address: address_from_str(pool),
            topics: vec![SYNC_TOPIC],
            data,
            block_number: Some(block),
            transaction_index: Some(0),
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "arbwatch-bot-{name}-{}-{}",
            std::process::id(),
            fastrand::u64(..)
        ))
    }

    /// Three pools priced at exactly 1: no cycle
    fn balanced_store() -> PoolStore {
        PoolStore::new(vec![
            record("Pool1", "A", "B", 1_000_000, 1_000_000),
            record("Pool2", "B", "C", 1_000_000, 1_000_000),
            record("Pool3", "C", "A", 1_000_000, 1_000_000),
        ])
        .unwrap()
    }

    fn bot(chain: FakeChain, dir: &Path) -> Bot<FakeChain> {
        let settings = BotSettings {
            anchor: token_id("A"),
            sizing: SizingEngine::default(),
            idle_interval: Duration::from_millis(1),
            pool_table: PoolTable::new(dir.join("pool_table.json")),
            arb_log: ArbLog::new(dir).unwrap(),
        };
        Bot::new(chain, Routers::new(), balanced_store(), LogPoller::new(2, 100), settings)
    }

    #[tokio::test]
    async fn test_detection_pass_sizes_profitable_cycle() {
        // Quotes 1.1, 1.1 and 0.9 with enough depth to pay the fees
        let store = PoolStore::new(vec![
            record("Pool1", "A", "B", 110_000_000, 100_000_000),
            record("Pool2", "B", "C", 110_000_000, 100_000_000),
            record("Pool3", "C", "A", 90_000_000, 100_000_000),
        ])
        .unwrap();
        let found = detection_pass(
            &store,
            &token_id("A"),
            &SizingEngine::default(),
            &Routers::new(),
        )
        .await
        .unwrap();

        assert_eq!(found.len(), 1);
        let record = &found[0];
        assert_eq!(
            record.path,
            vec![token_id("A"), token_id("C"), token_id("B"), token_id("A")]
        );
        // floor of the closed form optimum for these reserves
        assert!((record.amount_in - 1_352_693.0).abs() < 1e-6);
        assert!(record.profit > 0.0);
        assert!(record.approx_amount_out > record.amount_in);
        // No router configured, so no real quote
        assert_eq!(record.real_amount_out, 0.0);
    }

    #[test]
    fn test_fair_market_skips_the_search() {
        let graph = RateGraph::build(balanced_store().records());
        assert_eq!(find_cycles(&CycleDetector::new(&graph), &token_id("A")), None);
    }

    #[test]
    fn test_search_runs_when_a_negative_cycle_exists() {
        // The loop on C-D-E exists but cannot be reached from A
        let records = quoted_records(&[
            ("Pool1", "A", "B", 1.0, 100, 100, "Ex1"),
            ("Pool2", "C", "D", 1.1, 100, 110, "Ex1"),
            ("Pool3", "D", "E", 1.1, 100, 110, "Ex1"),
            ("Pool4", "E", "C", 0.9, 100, 90, "Ex1"),
        ]);
        let graph = RateGraph::build(&records);
        let detector = CycleDetector::new(&graph);
        assert_eq!(find_cycles(&detector, &token_id("A")), Some(Vec::new()));
        assert_eq!(find_cycles(&detector, &token_id("C")).map(|cycles| cycles.len()), Some(1));
    }

    #[tokio::test]
    async fn test_detection_pass_on_fair_market_finds_nothing() {
        let found = detection_pass(
            &balanced_store(),
            &token_id("A"),
            &SizingEngine::default(),
            &Routers::new(),
        )
        .await
        .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_tick_recomputes_only_on_first_or_update() {
        let dir = temp_dir("tick");
        let chain = FakeChain::default();
        *chain.head.lock().unwrap() = 2;
        let mut bot = bot(chain, &dir);

        // First iteration always persists and recomputes
        assert!(bot.tick(true).await.unwrap());
        assert!(dir.join("pool_table.json").exists());
        // Nothing new
        assert!(!bot.tick(false).await.unwrap());

        // A swap on Pool1 opens a cycle
        bot.chain
            .logs
            .lock()
            .unwrap()
            .push(sync_log("Pool1", 3, 1_000_000, 1_500_000));
        *bot.chain.head.lock().unwrap() = 3;
        assert!(bot.tick(false).await.unwrap());

        let pool = bot.store().get(&pool_id("Pool1")).unwrap();
        assert_eq!(pool.last_seen, OrderingKey::new(3, 0));
        let arbs = std::fs::read_to_string(bot.settings.arb_log.path()).unwrap();
        assert_eq!(arbs.lines().count(), 1);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_failed_save_is_retried_without_new_logs() {
        let dir = temp_dir("retry");
        let chain = FakeChain::default();
        *chain.head.lock().unwrap() = 2;
        let mut bot = bot(chain, &dir);
        // A regular file where the table's directory should be
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let table = blocker.join("pool_table.json");
        bot.settings.pool_table = PoolTable::new(&table);
        assert!(!bot.tick(false).await.unwrap());

        bot.chain
            .logs
            .lock()
            .unwrap()
            .push(sync_log("Pool1", 3, 1_000_000, 1_500_000));
        *bot.chain.head.lock().unwrap() = 3;
        assert!(bot.tick(false).await.is_err());
        assert_eq!(
            bot.store().get(&pool_id("Pool1")).unwrap().last_seen,
            OrderingKey::new(3, 0)
        );

        // Nothing new on chain, the pending update is still persisted and searched
        std::fs::remove_file(&blocker).unwrap();
        assert!(bot.tick(false).await.unwrap());
        assert!(table.exists());
        let arbs = std::fs::read_to_string(bot.settings.arb_log.path()).unwrap();
        assert_eq!(arbs.lines().count(), 1);
        assert!(!bot.tick(false).await.unwrap());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = temp_dir("shutdown");
        let mut bot = bot(FakeChain::default(), &dir);
        bot.shutdown_handle().store(true, Ordering::SeqCst);
        bot.run().await.unwrap();
        // Stopped before the first iteration
        assert!(!dir.join("pool_table.json").exists());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
