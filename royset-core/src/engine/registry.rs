//! Split sets and their validation rules.

use crate::error::EngineError;
use itertools::Itertools;
use uuid::Uuid;

/// A full allocation: 10000 basis points = 100%.
pub const TOTAL_BPS: u16 = 10_000;

/// One recipient and their share of every future deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitEntry {
    pub recipient: Uuid,
    pub share_bps: u16,
}

/// The ordered, validated allocation list of one work.
///
/// A `SplitSet` can only be constructed through [`SplitSet::new`], so every
/// value of this type satisfies the registry invariants: non-empty, no nil
/// or duplicate recipients, shares summing to exactly [`TOTAL_BPS`].
/// Replacing a work's split set swaps the whole value in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSet {
    entries: Vec<SplitEntry>,
}

impl SplitSet {
    /// Validate and build a split set from parallel arrays.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MalformedSplitInput`] if the arrays are empty or
    ///   differ in length
    /// - [`EngineError::NilRecipient`] if any recipient is the nil identity
    /// - [`EngineError::DuplicateRecipient`] if a recipient appears twice
    ///   (last-write-wins collapsing is not permitted)
    /// - [`EngineError::SplitSumMismatch`] unless the shares sum to 10000
    pub fn new(recipients: Vec<Uuid>, shares_bps: Vec<u16>) -> Result<Self, EngineError> {
        if recipients.is_empty() || recipients.len() != shares_bps.len() {
            return Err(EngineError::MalformedSplitInput);
        }
        if recipients.iter().any(Uuid::is_nil) {
            return Err(EngineError::NilRecipient);
        }
        if let Some(dup) = recipients.iter().duplicates().next() {
            return Err(EngineError::DuplicateRecipient(*dup));
        }
        let total: u32 = shares_bps.iter().map(|s| u32::from(*s)).sum();
        if total != u32::from(TOTAL_BPS) {
            return Err(EngineError::SplitSumMismatch { total });
        }
        let entries = recipients
            .into_iter()
            .zip(shares_bps)
            .map(|(recipient, share_bps)| SplitEntry {
                recipient,
                share_bps,
            })
            .collect();
        Ok(Self { entries })
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[SplitEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recipients in entry order, for event payloads.
    pub fn recipients(&self) -> Vec<Uuid> {
        self.entries.iter().map(|e| e.recipient).collect()
    }

    /// Shares in entry order, for event payloads.
    pub fn shares_bps(&self) -> Vec<u16> {
        self.entries.iter().map(|e| e.share_bps).collect()
    }
}

/// Registry state of one work. Guarded by the per-work mutex in the engine.
#[derive(Debug)]
pub(crate) struct WorkState {
    pub owner: Uuid,
    pub splits: Option<SplitSet>,
}
