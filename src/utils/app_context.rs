//! Application context: configuration plus the chain connections built from it.

use alloy::{network::Ethereum, providers::RootProvider};
use eyre::{Error, Result};
use log::info;

use crate::arb::router::{QuoteRouter, Routers};
use crate::config::Config;
use crate::models::Decimals;
use crate::utils::providers::{http_provider, AlloyChain, AlloyRouter};

/// Shared state of a run
pub struct AppContext {
    /// Runtime configuration
    pub config: Config,
    /// Node connection
    pub provider: RootProvider<Ethereum>,
    /// Token decimals
    pub decimals: Decimals,
}

impl AppContext {
    /// Creates the context from a configuration.
    ///
    /// # Errors
    /// * If the RPC URL cannot be parsed
    /// * If the decimals file cannot be read
    pub fn new(config: Config) -> Result<Self, Error> {
        let provider = http_provider(&config.rpc_url)?;
        let decimals = Decimals::load(&config.decimals_path)?;
        info!(
            "utils::app_context: node {}, anchor {}, {} routers",
            config.rpc_url,
            config.anchor_token,
            config.routers.len()
        );
        Ok(Self {
            config,
            provider,
            decimals,
        })
    }

    /// Chain client over the context's provider
    #[must_use]
    pub fn chain(&self) -> AlloyChain {
        AlloyChain::new(self.provider.clone())
    }

    /// One router client per configured exchange
    #[must_use]
    pub fn routers(&self) -> Routers {
        self.config
            .routers
            .iter()
            .map(|(exchange, address)| {
                let router: Box<dyn QuoteRouter> =
                    Box::new(AlloyRouter::new(self.provider.clone(), *address));
                (exchange.clone(), router)
            })
            .collect()
    }
}
