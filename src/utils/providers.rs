use alloy::{
    eips::BlockId,
    network::Ethereum,
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::Filter,
    sol,
    sol_types::SolEvent,
};
use async_trait::async_trait;
use eyre::{Error, Result};
use url::Url;

use crate::arb::router::QuoteRouter;
use crate::arb::types::{PoolId, TokenId};
use crate::sync::chain::{ChainClient, RawLog};

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        event Sync(uint112 reserve0, uint112 reserve1);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }
}

/// Creates an HTTP provider for `rpc_url`.
///
/// # Errors
/// * If the URL cannot be parsed
pub fn http_provider(rpc_url: &str) -> Result<RootProvider<Ethereum>, Error> {
    let url = Url::parse(rpc_url)?;
    let provider = ProviderBuilder::new().on_http(url);
    Ok((*provider.root()).clone())
}

/// Chain access through an alloy provider
#[derive(Debug, Clone)]
pub struct AlloyChain {
    /// Node connection
    provider: RootProvider<Ethereum>,
}

impl AlloyChain {
    /// Wraps a provider
    #[must_use]
    pub const fn new(provider: RootProvider<Ethereum>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChainClient for AlloyChain {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn sync_logs(&self, from: u64, to: u64) -> Result<Vec<RawLog>> {
        let filter = Filter::new()
            .event_signature(IUniswapV2Pair::Sync::SIGNATURE_HASH)
            .from_block(from)
            .to_block(to);
        let logs = self.provider.get_logs(&filter).await?;
        Ok(logs
            .into_iter()
            .map(|log| RawLog {
                address: log.address(),
                topics: log.topics().to_vec(),
                data: log.data().data.to_vec(),
                block_number: log.block_number,
                transaction_index: log.transaction_index,
            })
            .collect())
    }

    async fn reserves(&self, pool: PoolId, at_block: u64) -> Result<(U256, U256)> {
        let pair = IUniswapV2Pair::new(pool.0, &self.provider);
        let reserves = pair
            .getReserves()
            .block(BlockId::number(at_block))
            .call()
            .await?;
        Ok((U256::from(reserves.reserve0), U256::from(reserves.reserve1)))
    }
}

/// Quotes through a Uniswap V2 style router contract
#[derive(Debug, Clone)]
pub struct AlloyRouter {
    /// Node connection
    provider: RootProvider<Ethereum>,
    /// Router contract
    address: Address,
}

impl AlloyRouter {
    /// Creates a router client for the contract at `address`
    #[must_use]
    pub const fn new(provider: RootProvider<Ethereum>, address: Address) -> Self {
        Self { provider, address }
    }
}

#[async_trait]
impl QuoteRouter for AlloyRouter {
    async fn amounts_out(&self, amount_in: U256, path: &[TokenId]) -> Result<Vec<U256>> {
        let router = IUniswapV2Router02::new(self.address, &self.provider);
        let path: Vec<Address> = path.iter().map(|token| token.0).collect();
        Ok(router.getAmountsOut(amount_in, path).call().await?.amounts)
    }
}
