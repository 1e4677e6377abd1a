use std::collections::HashMap;

use alloy::primitives::U256;
use async_trait::async_trait;
use eyre::Result;

use super::types::{Exchange, TokenId};

/// An exchange router able to quote a multi-hop swap along a token path, the way
/// `getAmountsOut` does on Uniswap V2 style routers.
#[async_trait]
pub trait QuoteRouter: Send + Sync {
    /// Amounts after each hop of `path`, starting with `amount_in` itself.
    ///
    /// # Errors
    /// * If the call reverts or the node cannot be reached
    async fn amounts_out(&self, amount_in: U256, path: &[TokenId]) -> Result<Vec<U256>>;
}

/// Routers by the exchange they quote for
pub type Routers = HashMap<Exchange, Box<dyn QuoteRouter>>;
