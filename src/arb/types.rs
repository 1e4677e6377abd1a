use std::cmp::Ordering;

use alloy::primitives::Address;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Address of a pool contract. Pools are keyed by it everywhere.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display("{_0}")]
#[serde(transparent)]
pub struct PoolId(pub Address);

impl From<Address> for PoolId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

/// Address of an ERC20 token. Tokens are the nodes of the rate graph.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display("{_0}")]
#[serde(transparent)]
pub struct TokenId(pub Address);

impl From<Address> for TokenId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

/// Name of the exchange a pool belongs to, e.g. `uniswapV2` or `sushiswapV2`.
/// Routers are looked up by it when quoting real output.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display("{_0}")]
#[serde(transparent)]
pub struct Exchange(pub String);

impl From<&str> for Exchange {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Chain-canonical position of an event: block height first, then the index of the
/// transaction inside that block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderingKey {
    /// Block height
    pub block_number: u64,
    /// Transaction index inside the block
    pub transaction_index: u64,
}

impl OrderingKey {
    /// Creates a key for a transaction inside a block
    #[must_use]
    pub const fn new(block_number: u64, transaction_index: u64) -> Self {
        Self {
            block_number,
            transaction_index,
        }
    }

    /// Key for state read at the end of `block_number`: every event in that block
    /// is already reflected and must not be applied again.
    #[must_use]
    pub const fn end_of_block(block_number: u64) -> Self {
        Self::new(block_number, u64::MAX)
    }
}

impl PartialOrd for OrderingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.block_number
            .cmp(&other.block_number)
            .then(self.transaction_index.cmp(&other.transaction_index))
    }
}
