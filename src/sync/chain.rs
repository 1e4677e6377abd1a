//! The node as seen by the sync workers.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use eyre::Result;

use crate::arb::types::{OrderingKey, PoolId};

/// A log entry as returned by the node, before any decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Contract that emitted the log
    pub address: Address,
    /// Indexed topics, the event signature first
    pub topics: Vec<B256>,
    /// Non-indexed data
    pub data: Vec<u8>,
    /// Block the log was included in, missing for pending logs
    pub block_number: Option<u64>,
    /// Index of the emitting transaction in its block, missing for pending logs
    pub transaction_index: Option<u64>,
}

impl RawLog {
    /// Where the log sits in the chain, `None` unless it is mined
    #[must_use]
    pub fn ordering_key(&self) -> Option<OrderingKey> {
        Some(OrderingKey::new(self.block_number?, self.transaction_index?))
    }
}

/// Read access to the chain the pools live on
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current head block
    async fn block_number(&self) -> Result<u64>;

    /// Every `Sync` log emitted in blocks `from..=to`
    async fn sync_logs(&self, from: u64, to: u64) -> Result<Vec<RawLog>>;

    /// Reserves of `pool` (token0, token1) at the end of block `at_block`
    async fn reserves(&self, pool: PoolId, at_block: u64) -> Result<(U256, U256)>;
}
