//! Synchronisation of a cryptarchia follower with its peers: pulling
//! blocks by slot, backfilling forks and starting from a checkpoint.

pub mod bootstrap;
pub mod fetcher;
pub mod source;
mod sync;

pub use bootstrap::BootstrapPolicy;
pub use fetcher::{BlockFetcher, PeerId};
pub use source::BlockSource;
pub use sync::{backfill_fork, checkpoint_sync, find_missing_part, sync, BackfillError, SyncStats};
