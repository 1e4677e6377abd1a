/// Persisted pool table row
pub mod pool_row;
/// Token metadata
pub mod token;

pub use pool_row::PoolRow;
pub use token::Decimals;
