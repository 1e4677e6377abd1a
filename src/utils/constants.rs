use alloy::primitives::{b256, B256};

/// Topic of `Sync(uint112 reserve0, uint112 reserve1)`, emitted by Uniswap V2 pairs
/// on every reserve change
pub const SYNC_TOPIC: B256 =
    b256!("1c411e9a96e071241c2f21f7726b17ae89e3cab4c78be50e062b03a9fffbbad1");
