//! Cursor over the `Sync` log stream of the node.

use eyre::Result;
use log::debug;

use super::chain::{ChainClient, RawLog};
use super::reconciler;
use crate::arb::pool::PoolStore;

/// Polls `Sync` logs block range by block range.
///
/// The cursor is the first block not yet delivered. It only moves once a whole range
/// has been fetched, so a failed query is simply retried on the next poll and no log
/// is skipped or delivered twice.
#[derive(Debug, Clone)]
pub struct LogPoller {
    /// First block the poller was created for
    from_block: u64,
    /// Next block to deliver
    next_block: u64,
    /// Widest range asked from the node in one query
    max_block_range: u64,
}

impl LogPoller {
    /// Creates a poller delivering logs from `from_block` onwards
    #[must_use]
    pub fn new(from_block: u64, max_block_range: u64) -> Self {
        Self {
            from_block,
            next_block: from_block,
            max_block_range: max_block_range.max(1),
        }
    }

    /// Next block that will be delivered
    #[must_use]
    pub const fn cursor(&self) -> u64 {
        self.next_block
    }

    /// Every log from the first block up to the head, whatever was delivered before.
    ///
    /// # Errors
    /// * If the head or a range of logs cannot be fetched
    pub async fn all_entries<C: ChainClient + ?Sized>(&mut self, chain: &C) -> Result<Vec<RawLog>> {
        self.poll_from(chain, self.from_block).await
    }

    /// Merges every log since the first block into a freshly loaded `store`.
    /// Returns the number of pools updated.
    ///
    /// # Errors
    /// * If the head or a range of logs cannot be fetched, the store is then untouched
    pub async fn catch_up<C: ChainClient + ?Sized>(
        &mut self,
        chain: &C,
        store: &mut PoolStore,
    ) -> Result<usize> {
        let historical = self.all_entries(chain).await?;
        Ok(reconciler::catch_up(store, &historical))
    }

    /// Logs emitted since the last successful poll.
    ///
    /// # Errors
    /// * If the head or a range of logs cannot be fetched
    pub async fn new_entries<C: ChainClient + ?Sized>(&mut self, chain: &C) -> Result<Vec<RawLog>> {
        self.poll_from(chain, self.next_block).await
    }

    /// Fetches `start..=head` in windows and moves the cursor past head
    async fn poll_from<C: ChainClient + ?Sized>(
        &mut self,
        chain: &C,
        start: u64,
    ) -> Result<Vec<RawLog>> {
        let head = chain.block_number().await?;
        if head < start {
            return Ok(Vec::new());
        }

        let mut logs = Vec::new();
        let mut from = start;
        while from <= head {
            let to = head.min(from.saturating_add(self.max_block_range - 1));
            let mut window = chain.sync_logs(from, to).await?;
            debug!("sync::poller: {} logs in blocks {from}..={to}", window.len());
            logs.append(&mut window);
            from = to + 1;
        }

        self.next_block = head + 1;
        Ok(logs)
    }
}
