//! # Arbitrage Module
//!
//! Pure arbitrage logic: the pool table, the rate graph built from it, negative
//! cycle detection and trade sizing. Nothing here talks to a chain directly; real
//! output quotes go through the [`router::QuoteRouter`] seam.

/// Closed walks through the rate graph
pub mod cycle;
/// Bellman-Ford negative cycle search
pub mod detector;
/// Log-weighted directed multigraph of pools
pub mod graph;
/// Pool records and the in-memory pool store
pub mod pool;
/// Router quoting seam
pub mod router;
/// Virtual pool composition and optimal input
pub mod sizing;
#[cfg(test)]
pub(crate) mod test_helpers;
/// Common type definitions
pub mod types;
