use crate::{key::HeaderId, ledger::ApplyError};
use thiserror::Error;

/// Reasons for a block to be refused by the follower
///
/// A refused block leaves the follower untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("parent {parent} of block {block} is unknown")]
    ParentNotFound { block: HeaderId, parent: HeaderId },

    #[error("block {block} forks off below the last immutable block {lib}")]
    ImmutableFork { block: HeaderId, lib: HeaderId },

    #[error("block {0} carries an invalid leader proof")]
    InvalidLeaderProof(HeaderId),

    #[error("block {block} imports the proof of {orphan}, a block never seen")]
    MissingOrphanProof { block: HeaderId, orphan: HeaderId },

    #[error("block {block} imports the invalid or already spent proof of {orphan}")]
    InvalidOrphanProof { block: HeaderId, orphan: HeaderId },
}

impl Error {
    /// the refused block
    pub fn block(&self) -> HeaderId {
        match self {
            Error::ParentNotFound { block, .. } => *block,
            Error::ImmutableFork { block, .. } => *block,
            Error::InvalidLeaderProof(block) => *block,
            Error::MissingOrphanProof { block, .. } => *block,
            Error::InvalidOrphanProof { block, .. } => *block,
        }
    }

    /// A missing parent can be fetched and the block submitted again,
    /// every other refusal is final. Orphans are older than the block
    /// importing them and come first in slot order.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ParentNotFound { .. })
    }
}

impl From<ApplyError> for Error {
    fn from(error: ApplyError) -> Self {
        match error {
            ApplyError::NotTheParentBlock { block, parent, .. } => {
                Error::ParentNotFound { block, parent }
            }
            ApplyError::MissingLeaderProof(block) => Error::InvalidLeaderProof(block),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("the follower is already online")]
    AlreadyOnline,
}
