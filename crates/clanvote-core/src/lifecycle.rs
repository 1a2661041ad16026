//! Membership lifecycle policy.
//!
//! The membership state machine itself lives in the type system
//! ([`crate::state::Membership`]); the operations in [`crate::ops`]
//! perform the transitions. This module holds the policy knobs around
//! the machine: how a membership is classified into a permanence class,
//! and when an exit timer may be waived.
//!
//! # Permanence
//!
//! A clan's aggregates are split by permanence class: the committed
//! component comes from `Permanent` memberships, the provisional
//! component from `Temporary` (epoch-bound) ones. The classification
//! rule is a configurable policy rather than a hard-coded invariant, so
//! deployments without weight decay can run everything as permanent.

use serde::{Deserialize, Serialize};

use crate::state::{Member, Root};

/// Whether a membership's weight counts toward the clan's committed or
/// provisional aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permanence {
    /// The weight does not expire; counts toward the committed aggregate.
    Permanent,
    /// The weight is epoch-bound; counts toward the provisional aggregate
    /// until the next reset.
    Temporary,
}

/// Classification rule for [`PermanencePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PermanenceRule {
    /// Temporary iff the root runs a reset schedule and the member's
    /// certified weight carries an expiry. The default.
    #[default]
    WeightExpiry,
    /// Every membership is permanent. For domains without weight decay.
    AlwaysPermanent,
}

/// Decides the permanence class of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermanencePolicy {
    rule: PermanenceRule,
}

impl PermanencePolicy {
    /// Creates a policy with the given rule.
    #[must_use]
    pub const fn new(rule: PermanenceRule) -> Self {
        Self { rule }
    }

    /// Classifies a member's memberships under a root.
    #[must_use]
    pub fn classify(&self, member: &Member, root: &Root) -> Permanence {
        match self.rule {
            PermanenceRule::AlwaysPermanent => Permanence::Permanent,
            PermanenceRule::WeightExpiry => {
                if root.voter_weight_reset.is_some() && member.voter_weight_expiry.is_some() {
                    Permanence::Temporary
                } else {
                    Permanence::Permanent
                }
            }
        }
    }

    /// Returns `true` if the member's certified weight is valid for the
    /// root's current reset epoch.
    ///
    /// Permanent weight never goes stale. Temporary weight is current
    /// only while the member's recorded reset boundary matches the
    /// root's.
    #[must_use]
    pub fn weight_is_current(&self, member: &Member, root: &Root) -> bool {
        match self.classify(member, root) {
            Permanence::Permanent => true,
            Permanence::Temporary => {
                member.next_voter_weight_reset_time == root.next_voter_weight_reset_time()
            }
        }
    }
}

/// Observed voting activity of a clan inside the external governance
/// protocol.
///
/// When a clan has no outstanding votes or proposals, a leaving member's
/// exit timer may be waived; the timer only exists to stop weight from
/// escaping a vote it already backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClanVotingStatus {
    /// Votes cast but not yet relinquished.
    pub unrelinquished_votes: u64,
    /// Proposals created and still open.
    pub outstanding_proposals: u64,
}

impl ClanVotingStatus {
    /// Returns `true` if the clan has no governance activity in flight.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.unrelinquished_votes == 0 && self.outstanding_proposals == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::state::VoterWeightReset;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    fn root_with_reset() -> Root {
        let mut r = Root::new(addr(1), addr(2), addr(3), addr(4), 3600);
        r.voter_weight_reset = Some(VoterWeightReset {
            step: 100,
            next_reset_time: 1_000,
        });
        r
    }

    #[test]
    fn test_no_reset_schedule_means_permanent() {
        let root = Root::new(addr(1), addr(2), addr(3), addr(4), 3600);
        let mut member = Member::new(addr(5), addr(6), None);
        member.voter_weight_expiry = Some(500);
        let policy = PermanencePolicy::default();
        assert_eq!(policy.classify(&member, &root), Permanence::Permanent);
    }

    #[test]
    fn test_expiring_weight_under_schedule_is_temporary() {
        let root = root_with_reset();
        let mut member = Member::new(addr(5), addr(6), Some(1_000));
        member.voter_weight_expiry = Some(500);
        let policy = PermanencePolicy::default();
        assert_eq!(policy.classify(&member, &root), Permanence::Temporary);
    }

    #[test]
    fn test_non_expiring_weight_under_schedule_is_permanent() {
        let root = root_with_reset();
        let member = Member::new(addr(5), addr(6), Some(1_000));
        let policy = PermanencePolicy::default();
        assert_eq!(policy.classify(&member, &root), Permanence::Permanent);
    }

    #[test]
    fn test_always_permanent_rule() {
        let root = root_with_reset();
        let mut member = Member::new(addr(5), addr(6), Some(1_000));
        member.voter_weight_expiry = Some(500);
        let policy = PermanencePolicy::new(PermanenceRule::AlwaysPermanent);
        assert_eq!(policy.classify(&member, &root), Permanence::Permanent);
    }

    #[test]
    fn test_weight_currency_tracks_epoch() {
        let mut root = root_with_reset();
        let mut member = Member::new(addr(5), addr(6), Some(1_000));
        member.voter_weight_expiry = Some(500);
        let policy = PermanencePolicy::default();
        assert!(policy.weight_is_current(&member, &root));

        root.advance_reset_schedule(1_000);
        assert!(!policy.weight_is_current(&member, &root));
    }

    #[test]
    fn test_voting_status_idle() {
        assert!(ClanVotingStatus::default().is_idle());
        assert!(!ClanVotingStatus {
            unrelinquished_votes: 1,
            outstanding_proposals: 0
        }
        .is_idle());
    }
}
