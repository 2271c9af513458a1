//! Engine error taxonomy.
//!
//! Every mutating call either succeeds in full or fails with one of these
//! variants and no partial state change. [`ErrorKind`] collapses the
//! variants into the coarse categories callers branch on: caller-fault
//! input problems, transient transfer failures, and everything in between.

use crate::transfer::TransferError;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by the registry, distribution engine and withdrawal
/// ledger.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("work {0} is not registered")]
    WorkNotFound(Uuid),

    #[error("work {0} is already registered")]
    AlreadyRegistered(Uuid),

    #[error("owner must not be the nil identity")]
    InvalidOwner,

    #[error("caller {caller} is not the owner of work {work_id}")]
    Unauthorized { work_id: Uuid, caller: Uuid },

    #[error("caller {0} is not the engine operator")]
    NotOperator(Uuid),

    #[error("recipients and shares must be non-empty and equal in length")]
    MalformedSplitInput,

    #[error("recipient must not be the nil identity")]
    NilRecipient,

    #[error("recipient {0} appears more than once in the split set")]
    DuplicateRecipient(Uuid),

    #[error("split shares sum to {total} bps, expected exactly 10000")]
    SplitSumMismatch { total: u32 },

    #[error("work {0} has no split set installed")]
    NoRecipients(Uuid),

    #[error("deposit amount must be positive")]
    InvalidAmount,

    #[error("balance arithmetic would overflow")]
    Overflow,

    #[error("identity {0} has no pending balance")]
    NoPendingBalance(Uuid),

    #[error("requested {requested} exceeds custodied total {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error("a claim for identity {0} is already in flight")]
    Reentrant(Uuid),
}

/// Coarse error categories, one per row of the propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidInput,
    Conflict,
    InsufficientState,
    TransferFailed,
    Reentrant,
}

impl ErrorKind {
    /// Wire name used in API error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InsufficientState => "insufficient_state",
            ErrorKind::TransferFailed => "transfer_failed",
            ErrorKind::Reentrant => "reentrant",
        }
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::WorkNotFound(_) => ErrorKind::NotFound,
            EngineError::Unauthorized { .. } | EngineError::NotOperator(_) => {
                ErrorKind::Unauthorized
            }
            EngineError::InvalidOwner
            | EngineError::MalformedSplitInput
            | EngineError::NilRecipient
            | EngineError::InvalidAmount
            | EngineError::Overflow => ErrorKind::InvalidInput,
            EngineError::AlreadyRegistered(_)
            | EngineError::DuplicateRecipient(_)
            | EngineError::SplitSumMismatch { .. } => ErrorKind::Conflict,
            EngineError::NoRecipients(_)
            | EngineError::NoPendingBalance(_)
            | EngineError::InsufficientFunds { .. } => ErrorKind::InsufficientState,
            EngineError::TransferFailed(_) => ErrorKind::TransferFailed,
            EngineError::Reentrant(_) => ErrorKind::Reentrant,
        }
    }

    /// True only for failures of the external payment step, which the
    /// caller may retry; every other error is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransferFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferError;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(
            EngineError::AlreadyRegistered(Uuid::from_u128(1)).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EngineError::SplitSumMismatch { total: 9000 }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EngineError::NoPendingBalance(Uuid::from_u128(2)).kind(),
            ErrorKind::InsufficientState
        );
        assert_eq!(EngineError::InvalidAmount.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn only_transfer_failures_are_retryable() {
        let transfer = EngineError::TransferFailed(TransferError::Rejected { status: 503 });
        assert!(transfer.is_retryable());
        assert!(!EngineError::InvalidOwner.is_retryable());
        assert!(!EngineError::Reentrant(Uuid::from_u128(3)).is_retryable());
    }
}
