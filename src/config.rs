//! Runtime configuration, read from the environment (and a `.env` file if present).

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};

use crate::arb::sizing::FeeRate;
use crate::arb::types::{Exchange, TokenId};

/// Everything the monitor needs to run
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP endpoint of the node
    pub rpc_url: String,
    /// Token cycles are searched from, usually WETH
    pub anchor_token: TokenId,
    /// Initial pool list
    pub pools_path: PathBuf,
    /// Pool table rewritten after every update
    pub pool_table_path: PathBuf,
    /// Token decimals
    pub decimals_path: PathBuf,
    /// Directory of the arbitrage log
    pub arb_log_dir: PathBuf,
    /// Router contract of every exchange
    pub routers: HashMap<Exchange, Address>,
    /// Pools fetched concurrently during the snapshot
    pub rate_limit: usize,
    /// Period the snapshot rate limit applies to
    pub batch_period: Duration,
    /// Retries of a failing pool during the snapshot
    pub snapshot_retries: u32,
    /// Sleep between polls when nothing changed
    pub idle_interval: Duration,
    /// Widest block range of one log query
    pub max_block_range: u64,
    /// Pool fee
    pub fee: FeeRate,
}

impl Config {
    /// Reads the configuration from the process environment, after loading `.env`.
    ///
    /// # Errors
    /// * If `RPC_URL` or `ANCHOR_TOKEN` is not set
    /// * If a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a variable
    /// if it is set.
    ///
    /// # Errors
    /// * If a required variable is missing or a variable cannot be parsed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| lookup(name).ok_or_else(|| eyre!("{name} must be set"));

        let anchor = required("ANCHOR_TOKEN")?;
        let anchor_token = TokenId(
            Address::from_str(&anchor).wrap_err_with(|| format!("Invalid ANCHOR_TOKEN {anchor}"))?,
        );

        Ok(Self {
            rpc_url: required("RPC_URL")?,
            anchor_token,
            pools_path: lookup("POOLS_PATH").unwrap_or_else(|| "data/pools.json".into()).into(),
            pool_table_path: lookup("POOL_TABLE_PATH")
                .unwrap_or_else(|| "data/pool_table.json".into())
                .into(),
            decimals_path: lookup("DECIMALS_PATH")
                .unwrap_or_else(|| "data/decimals.json".into())
                .into(),
            arb_log_dir: lookup("ARB_LOG_DIR").unwrap_or_else(|| "logs".into()).into(),
            routers: parse_routers(&lookup("ROUTERS").unwrap_or_default())?,
            rate_limit: parse_or(&lookup, "RATE_LIMIT", 10)?,
            batch_period: Duration::from_millis(parse_or(&lookup, "BATCH_PERIOD_MS", 1000)?),
            snapshot_retries: parse_or(&lookup, "SNAPSHOT_RETRIES", 3)?,
            idle_interval: Duration::from_millis(parse_or(&lookup, "IDLE_INTERVAL_MS", 1000)?),
            max_block_range: parse_or(&lookup, "MAX_BLOCK_RANGE", 2000)?,
            fee: FeeRate::new(
                parse_or(&lookup, "FEE_NUMERATOR", 997)?,
                parse_or(&lookup, "FEE_DENOMINATOR", 1000)?,
            )?,
        })
    }
}

/// Parses `name` if it is set, `default` otherwise
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .wrap_err_with(|| format!("Invalid {name} {value}")),
        None => Ok(default),
    }
}

/// Parses `uniswapV2=0x...,sushiswapV2=0x...`
fn parse_routers(raw: &str) -> Result<HashMap<Exchange, Address>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (exchange, router) = entry
                .split_once('=')
                .ok_or_else(|| eyre!("Invalid router entry {entry}, expected exchange=address"))?;
            let router = Address::from_str(router.trim())
                .wrap_err_with(|| format!("Invalid router address for {exchange}"))?;
            Ok((Exchange::from(exchange.trim()), router))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
    const UNI_ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("RPC_URL", "http://localhost:8545"), ("ANCHOR_TOKEN", WETH)]))
                .unwrap();
        assert_eq!(config.rate_limit, 10);
        assert_eq!(config.batch_period, Duration::from_secs(1));
        assert_eq!(config.snapshot_retries, 3);
        assert_eq!(config.max_block_range, 2000);
        assert_eq!(config.fee, FeeRate::default());
        assert!(config.routers.is_empty());
    }

    #[test]
    fn test_missing_rpc_url() {
        let err = Config::from_lookup(lookup(&[("ANCHOR_TOKEN", WETH)])).unwrap_err();
        assert_eq!(err.to_string(), "RPC_URL must be set");
    }

    #[test]
    fn test_routers_and_overrides() {
        let routers = format!("uniswapV2={UNI_ROUTER}, sushiswapV2=0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F");
        let config = Config::from_lookup(lookup(&[
            ("RPC_URL", "http://localhost:8545"),
            ("ANCHOR_TOKEN", WETH),
            ("ROUTERS", routers.as_str()),
            ("RATE_LIMIT", "25"),
            ("FEE_NUMERATOR", "9975"),
            ("FEE_DENOMINATOR", "10000"),
        ]))
        .unwrap();
        assert_eq!(config.rate_limit, 25);
        assert_eq!(config.fee, FeeRate::new(9975, 10000).unwrap());
        assert_eq!(
            config.routers[&Exchange::from("uniswapV2")],
            Address::from_str(UNI_ROUTER).unwrap()
        );
        assert_eq!(config.routers.len(), 2);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("RPC_URL", "http://localhost:8545"),
            ("ANCHOR_TOKEN", WETH),
            ("RATE_LIMIT", "ten"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("Invalid RATE_LIMIT"));
    }
}
