//! Accounting error taxonomy.
//!
//! Every operation in the core either returns a fully-updated set of
//! account structures or fails with exactly one of these errors, leaving
//! no partial mutation visible to the caller. Transport failures (network,
//! signatures, stale ledger state) are not part of this taxonomy; they are
//! mapped by the calling layer into a reread-and-retry loop.

use thiserror::Error;

use crate::address::{Address, DerivationError};

/// Errors produced by the accounting core.
///
/// All variants are local, typed, and non-retryable by the core itself.
/// `Corruption` is special: it indicates the in-memory snapshot is stale
/// or a prior operation's result was miscomputed, never a legal rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AccountingError {
    /// Creation attempted where a unique-per-key record already exists.
    #[error("{kind} already exists at {address}")]
    AlreadyExists {
        /// The kind of account that already exists.
        kind: &'static str,
        /// The address of the existing account.
        address: Address,
    },

    /// A referenced root, clan, member, or membership does not exist.
    #[error("{kind} not found: {address}")]
    NotFound {
        /// The kind of record that was looked up.
        kind: &'static str,
        /// The address that was looked up.
        address: Address,
    },

    /// The member already holds an entry (active or leaving) for this clan.
    #[error("member {member} already has a membership entry for clan {clan}")]
    DuplicateClan {
        /// The member holding the entry.
        member: Address,
        /// The clan the duplicate entry points at.
        clan: Address,
    },

    /// The sum of active shares would exceed 10000 basis points.
    #[error(
        "share of {requested_bp}bp exceeds the member's remaining allocation of {available_bp}bp"
    )]
    ShareExceeded {
        /// The member whose allocation would overflow.
        member: Address,
        /// The share requested for the new entry.
        requested_bp: u16,
        /// Basis points still unallocated across active entries.
        available_bp: u16,
    },

    /// `finish_exit` invoked before the exit timer elapsed.
    #[error("too early to exit clan {clan}: now={now}, exitable at {exitable_at}")]
    TooEarly {
        /// The clan being exited.
        clan: Address,
        /// The caller-observed current time (Unix seconds).
        now: i64,
        /// When the exit becomes legal (boundary inclusive).
        exitable_at: i64,
    },

    /// The signing authority does not match the required owner or delegate.
    #[error("authority {authority} is not allowed to mutate {kind} {address}")]
    Unauthorized {
        /// The kind of account being mutated.
        kind: &'static str,
        /// The account being mutated.
        address: Address,
        /// The rejected authority.
        authority: Address,
    },

    /// The member's certified weight is below the clan's join threshold.
    #[error("voting weight {weight} is below clan {clan} minimum of {minimum}")]
    BelowMinimumWeight {
        /// The clan being joined.
        clan: Address,
        /// The member's certified weight.
        weight: u64,
        /// The clan's configured minimum.
        minimum: u64,
    },

    /// The clan does not accept temporary (epoch-bound) members.
    #[error("clan {clan} does not accept temporary members")]
    TemporaryNotAccepted {
        /// The refusing clan.
        clan: Address,
    },

    /// Ownership transfer refused while a delegate is still set.
    #[error("clan {clan} delegate must be reset before changing the owner")]
    DelegateStillSet {
        /// The clan whose owner change was refused.
        clan: Address,
    },

    /// A membership share outside the valid 1..=10000 range.
    #[error("invalid membership share: {share_bp}bp")]
    InvalidShare {
        /// The rejected share.
        share_bp: u16,
    },

    /// A weight-reset schedule that cannot take effect.
    #[error("invalid voter weight reset schedule: {reason}")]
    InvalidResetSchedule {
        /// Why the schedule was rejected.
        reason: String,
    },

    /// An invariant (non-negative counters and weights, consistent sums)
    /// would be violated by the requested mutation.
    #[error("accounting invariant violated: {detail}")]
    Corruption {
        /// Which invariant failed and where.
        detail: String,
    },
}

impl From<DerivationError> for AccountingError {
    fn from(err: DerivationError) -> Self {
        // A failed bump search means the seed inputs themselves are bad;
        // surface it as a non-retryable invariant failure.
        Self::Corruption {
            detail: err.to_string(),
        }
    }
}
