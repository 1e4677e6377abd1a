//! Applies `Sync` events to the pool store.
//!
//! A batch of logs may arrive in any order and may repeat entries that were already
//! applied. Only the latest entry per pool, by `(block_number, transaction_index)`,
//! is decoded, and the store only accepts it if it is newer than what it holds.

use std::collections::HashMap;

use alloy::primitives::U256;
use log::{info, trace};

use super::chain::RawLog;
use crate::arb::pool::PoolStore;
use crate::arb::types::{OrderingKey, PoolId};
use crate::utils::constants::SYNC_TOPIC;

/// Largest value a `uint112` reserve can hold
const MAX_RESERVE_BITS: usize = 112;

/// Applies every historical `Sync` log since the store was last synced.
/// Returns the number of pools updated.
pub fn catch_up(store: &mut PoolStore, historical: &[RawLog]) -> usize {
    let updated = reconcile(store, historical);
    info!(
        "sync::reconciler: caught up {updated} pools from {} logs",
        historical.len()
    );
    updated
}

/// Applies newly polled `Sync` logs. Returns the number of pools updated, so the
/// same batch applied twice returns 0 the second time.
pub fn update(store: &mut PoolStore, new_entries: &[RawLog]) -> usize {
    let updated = reconcile(store, new_entries);
    if updated > 0 {
        info!(
            "sync::reconciler: updated {updated} pools from {} logs",
            new_entries.len()
        );
    }
    updated
}

/// Keeps the latest decodable entry of every tracked pool and writes it to the store
fn reconcile(store: &mut PoolStore, logs: &[RawLog]) -> usize {
    let mut latest: HashMap<PoolId, (OrderingKey, U256, U256)> = HashMap::new();

    for log in logs {
        let pool = PoolId(log.address);
        if !store.contains(&pool) {
            trace!("sync::reconciler: skipping log of untracked pool {pool}");
            continue;
        }
        if log.topics.first() != Some(&SYNC_TOPIC) {
            trace!("sync::reconciler: skipping non Sync log of {pool}");
            continue;
        }
        let Some(key) = log.ordering_key() else {
            trace!("sync::reconciler: skipping unmined log of {pool}");
            continue;
        };
        if latest.get(&pool).is_some_and(|(seen, _, _)| *seen >= key) {
            continue;
        }
        let Some((reserve0, reserve1)) = decode_reserves(&log.data) else {
            trace!(
                "sync::reconciler: skipping malformed Sync of {pool} ({} bytes)",
                log.data.len()
            );
            continue;
        };
        latest.insert(pool, (key, reserve0, reserve1));
    }

    latest
        .into_iter()
        .filter(|(pool, (key, reserve0, reserve1))| store.apply(pool, *reserve0, *reserve1, *key))
        .count()
}

/// Decodes the data of `Sync(uint112 reserve0, uint112 reserve1)`: two 32-byte
/// big-endian words, each fitting in 112 bits
fn decode_reserves(data: &[u8]) -> Option<(U256, U256)> {
    if data.len() != 64 {
        return None;
    }
    let reserve0 = U256::from_be_slice(&data[..32]);
    let reserve1 = U256::from_be_slice(&data[32..]);
    if reserve0.bit_len() > MAX_RESERVE_BITS || reserve1.bit_len() > MAX_RESERVE_BITS {
        return None;
    }
    Some((reserve0, reserve1))
}
