#![allow(dead_code)]
use std::str::FromStr;

use alloy::primitives::{Address, U256};

use super::cycle::{Cycle, Hop};
use super::pool::PoolRecord;
use super::types::{Exchange, OrderingKey, PoolId, TokenId};

/// Turns a short label ("A", "Pool1") into a stable address. Real hex addresses are
/// parsed as they are.
pub fn address_from_str(label: &str) -> Address {
    if label.starts_with("0x") {
        if let Ok(address) = Address::from_str(label) {
            return address;
        }
    }
    Address::left_padding_from(label.as_bytes())
}

pub fn token_id(label: &str) -> TokenId {
    TokenId(address_from_str(label))
}

pub fn pool_id(label: &str) -> PoolId {
    PoolId(address_from_str(label))
}

/// A synced pool with zero decimals on both sides, so the quote is `reserve_a / reserve_b`
pub fn record(id: &str, token_a: &str, token_b: &str, reserve_a: u64, reserve_b: u64) -> PoolRecord {
    let mut record = PoolRecord::new(
        pool_id(id),
        token_id(token_a),
        token_id(token_b),
        0,
        0,
        Exchange::from("Ex1"),
    );
    record.set_reserves(
        U256::from(reserve_a),
        U256::from(reserve_b),
        OrderingKey::new(1, 0),
    );
    record
}

/// Pools with an explicit quote, independent of their reserves
pub fn quoted_records(pools: &[(&str, &str, &str, f64, u64, u64, &str)]) -> Vec<PoolRecord> {
    pools
        .iter()
        .map(|(id, token_a, token_b, quote, reserve_a, reserve_b, exchange)| {
            let mut record = PoolRecord::new(
                pool_id(id),
                token_id(token_a),
                token_id(token_b),
                0,
                0,
                Exchange::from(*exchange),
            );
            record.reserve_a = U256::from(*reserve_a);
            record.reserve_b = U256::from(*reserve_b);
            record.quote = *quote;
            record.last_seen = OrderingKey::new(1, 0);
            record
        })
        .collect()
}

pub fn hop(from: &str, to: &str, pool: &str) -> Hop {
    Hop::new(token_id(from), token_id(to), pool_id(pool))
}

pub fn cycle(hops: &[(&str, &str, &str)]) -> Cycle {
    Cycle::new(hops.iter().map(|(from, to, pool)| hop(from, to, pool)).collect()).unwrap()
}
