/*!
 * # Arbwatch - Constant-product cycle arbitrage monitor
 *
 * Arbwatch mirrors the reserves of a fixed set of Uniswap V2 style pools across
 * several exchanges, keeps them current from `Sync` events, and looks for cycles of
 * swaps that return more of the anchor token than they consume.
 *
 * ## Module Structure
 *
 * - `arb`: Rate graph, negative cycle detection and trade sizing
 * - `bot`: The sequential monitor loop
 * - `config`: Configuration from the environment
 * - `models`: On-disk pool rows and token decimals
 * - `notify`: Arbitrage log
 * - `persist`: Pool table persistence
 * - `sync`: Reserve snapshot, log polling and event reconciliation
 * - `utils`: Logger, providers and the application context
 */

/// Arbitrage detection and sizing
pub mod arb;
/// Monitor loop
pub mod bot;
/// Configuration management
pub mod config;
/// Data models for the application
pub mod models;
/// Opportunity output
pub mod notify;
/// Pool table persistence
pub mod persist;
/// Blockchain synchronization components
pub mod sync;
/// Utility functions and helpers
pub mod utils;
