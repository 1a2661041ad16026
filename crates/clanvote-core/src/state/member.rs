//! Member account: one token holder's delegation record under a root.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Full allocation in basis points (100%).
pub const MAX_SHARE_BP: u16 = 10_000;

/// Lifecycle state of one (member, clan) relationship.
///
/// The state machine is `Active → Leaving → removed`; no transition
/// skips a state and there is no path back from `Leaving` to `Active`
/// (re-joining requires the entry to be removed first, and a new entry
/// for the same clan is blocked while a leaving one still exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Membership {
    /// The share is committed to the clan.
    Active {
        /// Share of the member's certified weight, in basis points.
        share_bp: u16,
    },
    /// Exit requested; the weight is already removed from the clan's
    /// committed aggregate but the entry occupies its slot until the
    /// timer elapses.
    Leaving {
        /// Share the entry held while active.
        share_bp: u16,
        /// When `finish_exit` becomes legal (Unix seconds, inclusive).
        exitable_at: i64,
    },
}

impl Membership {
    /// The share this entry holds, regardless of lifecycle state.
    #[must_use]
    pub const fn share_bp(&self) -> u16 {
        match self {
            Self::Active { share_bp } | Self::Leaving { share_bp, .. } => *share_bp,
        }
    }

    /// Returns `true` for an active (non-leaving) entry.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// One entry in a member's membership list.
///
/// A member never holds two simultaneous entries for the same clan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEntry {
    /// The clan this entry points at.
    pub clan: Address,
    /// Lifecycle state and share.
    pub state: Membership,
}

/// One governing-token holder's aggregation identity under a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The root this member belongs to.
    pub root: Address,
    /// The token holder.
    pub owner: Address,
    /// Optional authority allowed to act on the owner's behalf.
    pub delegate: Option<Address>,
    /// Certified voting weight, as read from the certifying plugin.
    pub voter_weight: u64,
    /// The record the weight was read from, once certified.
    pub voter_weight_record: Option<Address>,
    /// When the certified weight expires, if it decays.
    pub voter_weight_expiry: Option<i64>,
    /// The reset boundary the weight was certified under.
    pub next_voter_weight_reset_time: Option<i64>,
    /// Ordered membership entries, at most one per clan.
    pub membership: Vec<MembershipEntry>,
}

impl Member {
    /// Creates a member with zero weight and no memberships.
    #[must_use]
    pub fn new(root: Address, owner: Address, next_voter_weight_reset_time: Option<i64>) -> Self {
        Self {
            root,
            owner,
            delegate: None,
            voter_weight: 0,
            voter_weight_record: None,
            voter_weight_expiry: None,
            next_voter_weight_reset_time,
            membership: Vec::new(),
        }
    }

    /// Sum of shares across active entries, in basis points.
    ///
    /// Always ≤ [`MAX_SHARE_BP`]; `add_membership` enforces the bound.
    #[must_use]
    pub fn active_share_bp(&self) -> u16 {
        self.membership
            .iter()
            .filter(|e| e.state.is_active())
            .map(|e| e.state.share_bp())
            .sum()
    }

    /// The entry for a clan, active or leaving.
    #[must_use]
    pub fn entry(&self, clan: &Address) -> Option<&MembershipEntry> {
        self.membership.iter().find(|e| e.clan == *clan)
    }

    /// Returns `true` if any entry (active or leaving) points at `clan`.
    #[must_use]
    pub fn has_entry(&self, clan: &Address) -> bool {
        self.entry(clan).is_some()
    }

    /// Returns `true` if the caller may act for this member.
    #[must_use]
    pub fn is_authority(&self, authority: &Address) -> bool {
        *authority == self.owner || self.delegate.as_ref() == Some(authority)
    }
}
