//! Chain synchronization: the initial reserve snapshot, then `Sync` events polled
//! and reconciled into the pool store.

/// Chain access seam and raw log type
pub mod chain;
/// Block-range log polling with a persistent cursor
pub mod poller;
/// Event ordering and reserve decoding
pub mod reconciler;
/// Rate-limited bulk reserve loading
pub mod snapshot;

pub use chain::{ChainClient, RawLog};
pub use poller::LogPoller;
pub use snapshot::SnapshotFetcher;
