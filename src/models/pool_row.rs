use alloy::primitives::U256;
use eyre::Result;
use serde::{Deserialize, Serialize};

use super::token::Decimals;
use crate::arb::pool::PoolRecord;
use crate::arb::types::{Exchange, OrderingKey, PoolId, TokenId};

/// One pool as stored on disk.
///
/// The same shape is used for the initial pool list, where reserves are still
/// unknown, and for the pool table rewritten after every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRow {
    /// Pool contract
    pub pool: PoolId,
    /// The pair's token0
    pub token0: TokenId,
    /// The pair's token1
    pub token1: TokenId,
    /// Reserve of token0, absent until synced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve0: Option<U256>,
    /// Reserve of token1, absent until synced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve1: Option<U256>,
    /// Price of token1 in token0
    #[serde(default)]
    pub quote: f64,
    /// Exchange the pool belongs to
    pub exchange: Exchange,
    /// Block of the last applied state
    #[serde(default)]
    pub block_number: u64,
    /// Transaction index of the last applied state
    #[serde(default)]
    pub transaction_index: u64,
}

impl PoolRow {
    /// Turns the row into a store record, looking up both tokens' decimals. The quote
    /// is recomputed from the reserves rather than trusted from disk.
    ///
    /// # Errors
    /// * If either token has no decimals
    pub fn into_record(self, decimals: &Decimals) -> Result<PoolRecord> {
        let mut record = PoolRecord::new(
            self.pool,
            self.token0,
            self.token1,
            decimals.get(&self.token0)?,
            decimals.get(&self.token1)?,
            self.exchange,
        );
        if let (Some(reserve0), Some(reserve1)) = (self.reserve0, self.reserve1) {
            record.set_reserves(
                reserve0,
                reserve1,
                OrderingKey::new(self.block_number, self.transaction_index),
            );
        }
        Ok(record)
    }
}

impl From<&PoolRecord> for PoolRow {
    fn from(record: &PoolRecord) -> Self {
        let synced = record.last_seen > OrderingKey::default();
        Self {
            pool: record.id,
            token0: record.token_a,
            token1: record.token_b,
            reserve0: synced.then_some(record.reserve_a),
            reserve1: synced.then_some(record.reserve_b),
            quote: record.quote,
            exchange: record.exchange.clone(),
            block_number: record.last_seen.block_number,
            transaction_index: record.last_seen.transaction_index,
        }
    }
}
