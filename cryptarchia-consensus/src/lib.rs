//! Cryptarchia proof of stake consensus
//!
//! The [`Follower`] receives block headers, validates the leader proof of
//! each against the epoch state of its branch and chooses the local chain
//! among the known forks. The [`Leader`] runs the slot lottery for a note.

pub mod chain_selection;
pub mod checkpoint;
pub mod config;
pub mod epoch;
pub mod error;
pub mod follower;
pub mod header;
pub mod key;
pub mod leadership;
pub mod ledger;
pub mod multiverse;
pub mod note;

#[cfg(any(test, feature = "property-test-api"))]
pub mod testing;

pub use checkpoint::Checkpoint;
pub use config::{Config, ConfigError, TimeConfig};
pub use epoch::EpochState;
pub use error::{Error, LifecycleError};
pub use follower::{Applied, Follower, Lifecycle};
pub use header::Header;
pub use key::{Hash, HeaderId};
pub use leadership::{Leader, LeaderProof};
pub use ledger::LedgerState;
pub use note::{Commitment, Note, Nullifier, SecretKey};
