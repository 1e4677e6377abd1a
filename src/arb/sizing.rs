//! Trade sizing for a detected cycle.
//!
//! All hops of a cycle are folded into one equivalent constant-product pool (the
//! virtual pool). The profit-maximizing input of that pool has a closed form, and its
//! output approximates what the whole cycle returns. The real output is then asked
//! from the exchanges' routers.
//!
//! Reserves can exceed 64 bits and the fold divides at every hop, so the virtual pool
//! is kept in `BigDecimal`.

use std::fmt::{self, Debug};
use std::str::FromStr;

use alloy::primitives::U256;
use bigdecimal::{BigDecimal, RoundingMode};
use eyre::{bail, eyre, Result, WrapErr};
use itertools::Itertools;
use log::{debug, warn};

use super::cycle::Cycle;
use super::graph::{Edge, RateGraph};
use super::router::Routers;
use super::types::{Exchange, TokenId};

/// Pool fee as the fraction of the input that is kept, `numerator / denominator`.
/// Uniswap V2 keeps 997/1000 of every input (a 0.3% fee).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRate {
    /// Part of the input that reaches the curve
    pub numerator: u32,
    /// Scale of `numerator`
    pub denominator: u32,
}

impl Default for FeeRate {
    fn default() -> Self {
        Self {
            numerator: 997,
            denominator: 1000,
        }
    }
}

impl FeeRate {
    /// Creates a fee rate.
    ///
    /// # Errors
    /// * If the numerator is zero or not below the denominator
    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 || numerator >= denominator {
            bail!("Invalid fee rate {numerator}/{denominator}");
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// `1 - fee` as a decimal
    #[must_use]
    pub fn gamma(&self) -> BigDecimal {
        BigDecimal::from(self.numerator) / BigDecimal::from(self.denominator)
    }
}

/// Two-token pool equivalent to a whole path of pools
#[derive(Clone, PartialEq)]
pub struct VirtualPool {
    /// Effective reserve of the start token
    pub e0: BigDecimal,
    /// Effective reserve of the end token
    pub e1: BigDecimal,
}

impl Debug for VirtualPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VirtualPool({} / {})",
            self.e0.with_scale_round(6, RoundingMode::HalfUp),
            self.e1.with_scale_round(6, RoundingMode::HalfUp)
        )
    }
}

/// Outcome of sizing a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Sizing {
    /// Composed pool of the cycle
    pub virtual_pool: VirtualPool,
    /// Profit-maximizing input, in native units of the start token
    pub amount_in: U256,
    /// Output predicted by the virtual pool
    pub approx_amount_out: U256,
    /// Output quoted by the routers, `None` when a quote failed
    pub real_amount_out: Option<U256>,
}

/// Sizes cycles for a given fee rate
#[derive(Debug, Clone, Copy, Default)]
pub struct SizingEngine {
    /// Fee charged by every hop
    fee: FeeRate,
}

impl SizingEngine {
    /// Creates an engine charging `fee` on every hop
    #[must_use]
    pub const fn new(fee: FeeRate) -> Self {
        Self { fee }
    }

    /// Folds the hops of `cycle` into a single virtual pool.
    ///
    /// # Errors
    /// * If a hop has no edge in `graph`
    pub fn compose_virtual_pool(&self, graph: &RateGraph, cycle: &Cycle) -> Result<VirtualPool> {
        let edges = cycle_edges(graph, cycle)?;
        let gamma = self.fee.gamma();

        let (first, rest) = edges
            .split_first()
            .ok_or_else(|| eyre!("Cannot compose an empty cycle"))?;
        let mut e0 = to_decimal(first.reserve_in)?;
        let mut e1 = to_decimal(first.reserve_out)?;

        for edge in rest {
            let r1_prime = to_decimal(edge.reserve_in)?;
            let r2 = to_decimal(edge.reserve_out)?;
            let denominator = &r1_prime + &e1 * &gamma;
            if denominator == BigDecimal::from(0) {
                bail!("Hop through {} has no liquidity", edge.pool);
            }
            let next_e0 = &e0 * &r1_prime / &denominator;
            let next_e1 = &gamma * &e1 * &r2 / &denominator;
            e0 = next_e0;
            e1 = next_e1;
        }

        Ok(VirtualPool { e0, e1 })
    }

    /// Input maximizing `output - input` on the virtual pool:
    /// `floor((sqrt(e0 * e1 * gamma) - e0) / gamma)`. `None` when no positive input
    /// makes a profit.
    ///
    /// # Errors
    /// * If the result does not fit a `U256`
    pub fn optimal_input(&self, pool: &VirtualPool) -> Result<Option<U256>> {
        let gamma = self.fee.gamma();
        let Some(root) = (&pool.e0 * &pool.e1 * &gamma).sqrt() else {
            return Ok(None);
        };
        let amount = floor(&((root - &pool.e0) / &gamma));
        if amount <= BigDecimal::from(0) {
            return Ok(None);
        }
        to_u256(&amount).map(Some)
    }

    /// Output of the virtual pool for `amount_in`, with the fee applied in fixed point:
    /// `floor(amount_in * num * e1 / (e0 * den + amount_in * num))`.
    ///
    /// # Errors
    /// * If the result does not fit a `U256`
    pub fn approx_output(&self, amount_in: U256, pool: &VirtualPool) -> Result<U256> {
        let amount_in_with_fee = to_decimal(amount_in)? * BigDecimal::from(self.fee.numerator);
        let numerator = &amount_in_with_fee * &pool.e1;
        let denominator = &pool.e0 * BigDecimal::from(self.fee.denominator) + &amount_in_with_fee;
        if denominator == BigDecimal::from(0) {
            return Ok(U256::ZERO);
        }
        to_u256(&floor(&(numerator / denominator)))
    }

    /// Asks the routers what the cycle really returns for `amount_in`.
    ///
    /// Consecutive hops on the same exchange are quoted in one multi-hop call; the
    /// output of each call is the input of the next.
    ///
    /// # Errors
    /// * If an exchange has no router
    /// * If a router call fails or returns nothing
    pub async fn real_output(
        &self,
        graph: &RateGraph,
        cycle: &Cycle,
        amount_in: U256,
        routers: &Routers,
    ) -> Result<U256> {
        let edges = cycle_edges(graph, cycle)?;
        let mut amount = amount_in;
        for (exchange, path) in exchange_runs(&edges) {
            let router = routers
                .get(&exchange)
                .ok_or_else(|| eyre!("No router for exchange {exchange}"))?;
            let amounts = router
                .amounts_out(amount, &path)
                .await
                .wrap_err_with(|| format!("Quote on {exchange} failed"))?;
            amount = *amounts
                .last()
                .ok_or_else(|| eyre!("Router for {exchange} returned no amounts"))?;
        }
        Ok(amount)
    }

    /// Sizes `cycle`. `None` when the cycle has no profitable input.
    ///
    /// A failing router quote does not fail the sizing: the real output is left
    /// unavailable and the rest is still returned.
    ///
    /// # Errors
    /// * If the cycle does not match the graph
    pub async fn size(
        &self,
        graph: &RateGraph,
        cycle: &Cycle,
        routers: &Routers,
    ) -> Result<Option<Sizing>> {
        let virtual_pool = self.compose_virtual_pool(graph, cycle)?;
        let Some(amount_in) = self.optimal_input(&virtual_pool)? else {
            debug!("arb::sizing: {cycle:?} has no profitable input ({virtual_pool:?})");
            return Ok(None);
        };
        let approx_amount_out = self.approx_output(amount_in, &virtual_pool)?;

        let real_amount_out = match self.real_output(graph, cycle, amount_in, routers).await {
            Ok(amount) => Some(amount),
            Err(e) => {
                warn!("arb::sizing: real output unavailable for {cycle}: {e:#}");
                None
            }
        };

        Ok(Some(Sizing {
            virtual_pool,
            amount_in,
            approx_amount_out,
            real_amount_out,
        }))
    }
}

/// Looks up the edge of every hop
fn cycle_edges<'g>(graph: &'g RateGraph, cycle: &Cycle) -> Result<Vec<&'g Edge>> {
    cycle
        .hops()
        .iter()
        .map(|hop| {
            graph
                .edge(&hop.from, &hop.to, &hop.pool)
                .ok_or_else(|| eyre!("No edge {} -> {} via {}", hop.from, hop.to, hop.pool))
        })
        .collect()
}

/// Splits a walk into maximal runs on the same exchange, each with its token path
fn exchange_runs(edges: &[&Edge]) -> Vec<(Exchange, Vec<TokenId>)> {
    let grouped = edges.iter().chunk_by(|edge| edge.exchange.clone());
    let mut runs = Vec::new();
    for (exchange, run) in &grouped {
        let mut path = Vec::new();
        for edge in run {
            if path.is_empty() {
                path.push(edge.from);
            }
            path.push(edge.to);
        }
        runs.push((exchange, path));
    }
    runs
}

/// Rounds toward negative infinity to an integer
fn floor(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(0, RoundingMode::Floor)
}

/// Converts a native amount to a decimal
fn to_decimal(value: U256) -> Result<BigDecimal> {
    Ok(BigDecimal::from_str(&value.to_string())?)
}

/// Converts a non-negative integral decimal to a native amount
fn to_u256(value: &BigDecimal) -> Result<U256> {
    let (digits, scale) = value.with_scale(0).into_bigint_and_exponent();
    debug_assert_eq!(scale, 0);
    U256::from_str(&digits.to_string()).wrap_err_with(|| format!("{digits} does not fit a U256"))
}
