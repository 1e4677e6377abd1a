/// Newline-delimited JSON log of found opportunities
pub mod arb_log;

pub use arb_log::{ArbLog, ArbRecord};
