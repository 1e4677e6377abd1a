use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy::primitives::U256;
use chrono::Local;
use eyre::{eyre, Result, WrapErr};
use log::info;
use serde::Serialize;

use crate::arb::cycle::Cycle;
use crate::arb::graph::RateGraph;
use crate::arb::sizing::Sizing;
use crate::arb::types::{Exchange, PoolId, TokenId};

/// A sized opportunity, as written to the arbitrage log.
///
/// Amounts are in units of the start token, scaled down by its decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbRecord {
    /// Local time the opportunity was found, RFC 3339
    pub timestamp: String,
    /// Block the pool state was synced to
    pub block_number: u64,
    /// Pools in trading order
    pub pools: Vec<PoolId>,
    /// Exchange of every pool
    pub exchanges: Vec<Exchange>,
    /// Tokens visited, start token first and last
    pub path: Vec<TokenId>,
    /// Oriented (`reserve_in`, `reserve_out`) of every hop
    pub reserves: Vec<(U256, U256)>,
    /// Relative profit at current prices, before fees
    pub profit: f64,
    /// Optimal input
    pub amount_in: f64,
    /// Output predicted by the virtual pool
    pub approx_amount_out: f64,
    /// Output quoted by the routers, 0 when unavailable
    pub real_amount_out: f64,
}

impl ArbRecord {
    /// Describes a sized cycle.
    ///
    /// # Errors
    /// * If a hop of `cycle` has no edge in `graph`
    pub fn new(
        graph: &RateGraph,
        cycle: &Cycle,
        profit: f64,
        sizing: &Sizing,
        start_decimals: u8,
        block_number: u64,
    ) -> Result<Self> {
        let mut exchanges = Vec::with_capacity(cycle.len());
        let mut reserves = Vec::with_capacity(cycle.len());
        for hop in cycle.hops() {
            let edge = graph
                .edge(&hop.from, &hop.to, &hop.pool)
                .ok_or_else(|| eyre!("No edge {} -> {} via {}", hop.from, hop.to, hop.pool))?;
            exchanges.push(edge.exchange.clone());
            reserves.push((edge.reserve_in, edge.reserve_out));
        }

        Ok(Self {
            timestamp: Local::now().to_rfc3339(),
            block_number,
            pools: cycle.pools(),
            exchanges,
            path: cycle.path(),
            reserves,
            profit,
            amount_in: scale(sizing.amount_in, start_decimals),
            approx_amount_out: scale(sizing.approx_amount_out, start_decimals),
            real_amount_out: scale(sizing.real_amount_out.unwrap_or_default(), start_decimals),
        })
    }
}

/// Native units to human units
fn scale(amount: U256, decimals: u8) -> f64 {
    f64::from(amount) / 10f64.powi(i32::from(decimals))
}

/// Append-only opportunity log, one JSON object per line
#[derive(Debug, Clone)]
pub struct ArbLog {
    /// File appended to
    path: PathBuf,
}

impl ArbLog {
    /// Opens the log of the current day inside `dir`, creating the directory.
    ///
    /// # Errors
    /// * If the directory cannot be created
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Cannot create arb log dir {}", dir.display()))?;
        let path = dir.join(format!("arbs-{}.jsonl", Local::now().format("%Y-%m-%d")));
        Ok(Self { path })
    }

    /// File appended to
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record` and summarizes it in the application log.
    ///
    /// # Errors
    /// * If the file cannot be opened or written
    pub fn write(&self, record: &ArbRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .wrap_err_with(|| format!("Cannot open {}", self.path.display()))?;
        file.write_all(line.as_bytes())?;

        info!(
            "notify::arb_log: {:.4}% via {} pools at block {}: in {} out {} (real {})",
            record.profit * 100.0,
            record.pools.len(),
            record.block_number,
            record.amount_in,
            record.approx_amount_out,
            record.real_amount_out
        );
        Ok(())
    }
}
