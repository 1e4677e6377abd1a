//! In-memory table of pool state.
//!
//! The store is the single source of truth for reserves. It is written in bulk by the
//! snapshot fetcher and incrementally by the event reconciler; everything else only
//! reads it.

use std::collections::HashMap;
use std::fmt::{self, Debug};

use alloy::primitives::U256;
use eyre::{bail, Result};

use super::types::{Exchange, OrderingKey, PoolId, TokenId};

/// Price of `token_b` expressed in `token_a`, with both reserves scaled down by their
/// token decimals. A pool with an empty side has no price and yields `0.0`.
#[must_use]
pub fn quote(reserve_a: U256, reserve_b: U256, decimals_a: u8, decimals_b: u8) -> f64 {
    if reserve_a.is_zero() || reserve_b.is_zero() {
        return 0.0;
    }
    let scaled_a = f64::from(reserve_a) / 10f64.powi(i32::from(decimals_a));
    let scaled_b = f64::from(reserve_b) / 10f64.powi(i32::from(decimals_b));
    scaled_a / scaled_b
}

/// A constant-product pool as mirrored from the chain
#[derive(Clone, PartialEq)]
pub struct PoolRecord {
    /// Pool contract address
    pub id: PoolId,
    /// The pair's token0
    pub token_a: TokenId,
    /// The pair's token1
    pub token_b: TokenId,
    /// Decimals of `token_a`
    pub decimals_a: u8,
    /// Decimals of `token_b`
    pub decimals_b: u8,
    /// Reserve of `token_a` in native units
    pub reserve_a: U256,
    /// Reserve of `token_b` in native units
    pub reserve_b: U256,
    /// Exchange the pool belongs to
    pub exchange: Exchange,
    /// Price of `token_b` in `token_a`, `0.0` when there is no liquidity
    pub quote: f64,
    /// Position of the last state written into this record
    pub last_seen: OrderingKey,
}

impl Debug for PoolRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pool({}, {} {} / {} {} @ {} [{}] #{}:{})",
            self.id,
            self.reserve_a,
            self.token_a,
            self.reserve_b,
            self.token_b,
            self.quote,
            self.exchange,
            self.last_seen.block_number,
            self.last_seen.transaction_index
        )
    }
}

impl PoolRecord {
    /// A pool with no reserves yet. It stays out of the rate graph until synced.
    #[must_use]
    pub const fn new(
        id: PoolId,
        token_a: TokenId,
        token_b: TokenId,
        decimals_a: u8,
        decimals_b: u8,
        exchange: Exchange,
    ) -> Self {
        Self {
            id,
            token_a,
            token_b,
            decimals_a,
            decimals_b,
            reserve_a: U256::ZERO,
            reserve_b: U256::ZERO,
            exchange,
            quote: 0.0,
            last_seen: OrderingKey::new(0, 0),
        }
    }

    /// Overwrites reserves and ordering key and recomputes the quote
    pub fn set_reserves(&mut self, reserve_a: U256, reserve_b: U256, key: OrderingKey) {
        self.reserve_a = reserve_a;
        self.reserve_b = reserve_b;
        self.quote = quote(reserve_a, reserve_b, self.decimals_a, self.decimals_b);
        self.last_seen = key;
    }

    /// Whether the pool has liquidity on both sides
    #[must_use]
    pub fn has_liquidity(&self) -> bool {
        self.quote > 0.0
    }
}

/// Pool table keyed by pool address, iterated in insertion order
#[derive(Debug, Default, Clone)]
pub struct PoolStore {
    /// Records in insertion order
    records: Vec<PoolRecord>,
    /// Pool address to position in `records`
    index: HashMap<PoolId, usize>,
}

impl PoolStore {
    /// Builds the store from a list of records.
    ///
    /// # Errors
    /// * If the same pool appears twice
    pub fn new(records: Vec<PoolRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.id, position).is_some() {
                bail!("Pool {} is listed more than once", record.id);
            }
        }
        Ok(Self { records, index })
    }

    /// Number of tracked pools
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no pool is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the pool is tracked
    #[must_use]
    pub fn contains(&self, pool: &PoolId) -> bool {
        self.index.contains_key(pool)
    }

    /// Looks up a pool
    #[must_use]
    pub fn get(&self, pool: &PoolId) -> Option<&PoolRecord> {
        self.index.get(pool).map(|&position| &self.records[position])
    }

    /// All records in insertion order
    #[must_use]
    pub fn records(&self) -> &[PoolRecord] {
        &self.records
    }

    /// Highest block any record has been synced to
    #[must_use]
    pub fn latest_block(&self) -> u64 {
        self.records
            .iter()
            .map(|record| record.last_seen.block_number)
            .max()
            .unwrap_or_default()
    }

    /// Decimals of `token`, taken from any pool trading it
    #[must_use]
    pub fn decimals(&self, token: &TokenId) -> Option<u8> {
        self.records.iter().find_map(|record| {
            if record.token_a == *token {
                Some(record.decimals_a)
            } else if record.token_b == *token {
                Some(record.decimals_b)
            } else {
                None
            }
        })
    }

    /// Writes new reserves if `key` is strictly newer than what the pool already holds.
    /// Returns whether the record changed.
    pub fn apply(
        &mut self,
        pool: &PoolId,
        reserve_a: U256,
        reserve_b: U256,
        key: OrderingKey,
    ) -> bool {
        let Some(&position) = self.index.get(pool) else {
            return false;
        };
        let record = &mut self.records[position];
        if key <= record.last_seen {
            return false;
        }
        record.set_reserves(reserve_a, reserve_b, key);
        true
    }

    /// Unconditionally writes reserves read from a snapshot.
    ///
    /// # Errors
    /// * If the pool is not tracked
    pub fn set_snapshot(
        &mut self,
        pool: &PoolId,
        reserve_a: U256,
        reserve_b: U256,
        key: OrderingKey,
    ) -> Result<()> {
        let Some(&position) = self.index.get(pool) else {
            bail!("Pool {pool} is not tracked");
        };
        self.records[position].set_reserves(reserve_a, reserve_b, key);
        Ok(())
    }
}
