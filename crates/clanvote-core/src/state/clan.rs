//! Clan account: a voting collective aggregating delegated weight.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::AccountingError;
use crate::lifecycle::Permanence;
use crate::state::Root;

/// A voting collective.
///
/// Aggregate invariant: `permanent_voter_weight` equals the sum of every
/// active permanent membership's contribution, and
/// `potential_voter_weight` the sum of every active, currently-certified
/// temporary membership's contribution (`certified_weight * share_bp /
/// 10000` each). Recomputing from a snapshot must reproduce the
/// maintained aggregates exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clan {
    /// The root this clan belongs to.
    pub root: Address,
    /// Owning identity.
    pub owner: Address,
    /// Optional delegate allowed to configure the clan and cast its votes.
    pub delegate: Option<Address>,
    /// Derived authority that signs governance actions for the clan.
    pub voter_authority: Address,
    /// The clan's token owner record in the external governance program.
    pub token_owner_record: Address,
    /// The record publishing the clan's effective weight to governance.
    pub voter_weight_record: Address,
    /// Minimum certified weight required to join.
    pub min_voting_weight_to_join: u64,
    /// Whether epoch-bound (temporary) members may join.
    pub accept_temporary_members: bool,
    /// Members whose weight does not expire.
    pub permanent_members: u64,
    /// Members whose weight is epoch-bound.
    pub temporary_members: u64,
    /// Temporary members re-certified in the current reset epoch.
    pub updated_temporary_members: u64,
    /// Members mid-exit; their weight is already released.
    pub leaving_members: u64,
    /// Committed weight from permanent memberships.
    pub permanent_voter_weight: u64,
    /// Provisional weight from currently-certified temporary memberships.
    pub potential_voter_weight: u64,
    /// The reset epoch the provisional aggregate was computed in.
    pub next_voter_weight_reset_time: Option<i64>,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

impl Clan {
    /// Creates a zero-initialized clan for a root.
    #[must_use]
    pub fn new(
        root: Address,
        owner: Address,
        voter_authority: Address,
        token_owner_record: Address,
        voter_weight_record: Address,
        next_voter_weight_reset_time: Option<i64>,
    ) -> Self {
        Self {
            root,
            owner,
            delegate: None,
            voter_authority,
            token_owner_record,
            voter_weight_record,
            min_voting_weight_to_join: 0,
            accept_temporary_members: true,
            permanent_members: 0,
            temporary_members: 0,
            updated_temporary_members: 0,
            leaving_members: 0,
            permanent_voter_weight: 0,
            potential_voter_weight: 0,
            next_voter_weight_reset_time,
            name: String::new(),
            description: String::new(),
        }
    }

    /// The clan's effective (governance-visible) voting weight.
    #[must_use]
    pub const fn total_voter_weight(&self) -> u64 {
        self.permanent_voter_weight + self.potential_voter_weight
    }

    /// Members with a committed (non-leaving) entry.
    #[must_use]
    pub const fn active_members(&self) -> u64 {
        self.permanent_members + self.temporary_members
    }

    /// Returns `true` if the caller may configure this clan.
    #[must_use]
    pub fn is_authority(&self, authority: &Address) -> bool {
        *authority == self.owner || self.delegate.as_ref() == Some(authority)
    }

    /// Drops the expiring weight component when the reset epoch rolls over.
    ///
    /// Temporary contributions certified in a previous epoch no longer
    /// count; members restore them by re-certifying. Permanent weight is
    /// untouched. A no-op when the clan is already in the root's epoch.
    pub fn reset_weight_if_stale(&mut self, root: &Root) {
        let root_epoch = root.next_voter_weight_reset_time();
        if self.next_voter_weight_reset_time != root_epoch {
            self.potential_voter_weight = 0;
            self.updated_temporary_members = 0;
            self.next_voter_weight_reset_time = root_epoch;
        }
    }

    /// Absorbs one membership's contribution when it becomes active.
    ///
    /// `weight_current` is false when a temporary member's certification
    /// belongs to a previous epoch; the member is counted but contributes
    /// no weight until re-certified.
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if a weight aggregate, or the combined total,
    /// would exceed `u64::MAX`. The clan is left partially updated; the
    /// caller discards the scratch copy.
    pub(crate) fn absorb_member(
        &mut self,
        share_of_weight: u64,
        permanence: Permanence,
        weight_current: bool,
    ) -> Result<(), AccountingError> {
        match permanence {
            Permanence::Permanent => {
                self.permanent_members += 1;
                self.permanent_voter_weight = checked_add(
                    self.permanent_voter_weight,
                    share_of_weight,
                    "permanent voter weight",
                )?;
            }
            Permanence::Temporary => {
                self.temporary_members += 1;
                if weight_current {
                    self.updated_temporary_members += 1;
                    self.potential_voter_weight = checked_add(
                        self.potential_voter_weight,
                        share_of_weight,
                        "potential voter weight",
                    )?;
                }
            }
        }
        self.check_total()
    }

    /// Releases one membership's contribution when it starts exiting.
    ///
    /// `weight_current` is false when a temporary contribution already
    /// expired with the epoch and must not be subtracted again.
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if a counter or weight aggregate would go
    /// negative.
    pub(crate) fn release_member(
        &mut self,
        share_of_weight: u64,
        permanence: Permanence,
        weight_current: bool,
    ) -> Result<(), AccountingError> {
        match permanence {
            Permanence::Permanent => {
                self.permanent_members = checked_dec(self.permanent_members, "permanent members")?;
                self.permanent_voter_weight = checked_sub(
                    self.permanent_voter_weight,
                    share_of_weight,
                    "permanent voter weight",
                )?;
            }
            Permanence::Temporary => {
                self.temporary_members = checked_dec(self.temporary_members, "temporary members")?;
                if weight_current {
                    self.updated_temporary_members =
                        checked_dec(self.updated_temporary_members, "updated temporary members")?;
                    self.potential_voter_weight = checked_sub(
                        self.potential_voter_weight,
                        share_of_weight,
                        "potential voter weight",
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Replaces one membership's contribution as a single delta.
    ///
    /// Equivalent to release-then-absorb for the weight aggregates, but
    /// expressed as one step so no transient invalid state exists and the
    /// member counters stay untouched. `old_current` is false when the
    /// old temporary contribution already expired with the epoch; the
    /// member is then counted as newly re-certified.
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if the aggregate would go negative or
    /// overflow.
    pub(crate) fn reweight(
        &mut self,
        old_share_of_weight: u64,
        new_share_of_weight: u64,
        permanence: Permanence,
        old_current: bool,
    ) -> Result<(), AccountingError> {
        match permanence {
            Permanence::Permanent => {
                let reduced = checked_sub(
                    self.permanent_voter_weight,
                    old_share_of_weight,
                    "permanent voter weight",
                )?;
                self.permanent_voter_weight =
                    checked_add(reduced, new_share_of_weight, "permanent voter weight")?;
            }
            Permanence::Temporary => {
                let old_effective = if old_current { old_share_of_weight } else { 0 };
                let reduced = checked_sub(
                    self.potential_voter_weight,
                    old_effective,
                    "potential voter weight",
                )?;
                self.potential_voter_weight =
                    checked_add(reduced, new_share_of_weight, "potential voter weight")?;
                if !old_current {
                    self.updated_temporary_members += 1;
                }
            }
        }
        self.check_total()
    }

    /// Keeps `total_voter_weight` representable after a mutation.
    fn check_total(&self) -> Result<(), AccountingError> {
        checked_add(
            self.permanent_voter_weight,
            self.potential_voter_weight,
            "total voter weight",
        )?;
        Ok(())
    }

    /// Records a membership entering the leaving state.
    pub(crate) fn note_member_leaving(&mut self) {
        self.leaving_members += 1;
    }

    /// Records a leaving membership being retired.
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if no membership is recorded as leaving.
    pub(crate) fn note_member_left(&mut self) -> Result<(), AccountingError> {
        self.leaving_members = checked_dec(self.leaving_members, "leaving members")?;
        Ok(())
    }
}

fn checked_sub(value: u64, delta: u64, what: &str) -> Result<u64, AccountingError> {
    value
        .checked_sub(delta)
        .ok_or_else(|| AccountingError::Corruption {
            detail: format!("{what} {value} cannot absorb removal of {delta}"),
        })
}

fn checked_add(value: u64, delta: u64, what: &str) -> Result<u64, AccountingError> {
    value
        .checked_add(delta)
        .ok_or_else(|| AccountingError::Corruption {
            detail: format!("{what} {value} cannot absorb addition of {delta}"),
        })
}

fn checked_dec(value: u64, what: &str) -> Result<u64, AccountingError> {
    checked_sub(value, 1, what)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VoterWeightReset;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    fn clan() -> Clan {
        Clan::new(addr(1), addr(2), addr(3), addr(4), addr(5), None)
    }

    #[test]
    fn test_absorb_permanent() {
        let mut c = clan();
        c.absorb_member(600, Permanence::Permanent, true).unwrap();
        assert_eq!(c.permanent_members, 1);
        assert_eq!(c.permanent_voter_weight, 600);
        assert_eq!(c.potential_voter_weight, 0);
        assert_eq!(c.total_voter_weight(), 600);
    }

    #[test]
    fn test_absorb_temporary() {
        let mut c = clan();
        c.absorb_member(400, Permanence::Temporary, true).unwrap();
        assert_eq!(c.temporary_members, 1);
        assert_eq!(c.updated_temporary_members, 1);
        assert_eq!(c.potential_voter_weight, 400);
        assert_eq!(c.permanent_voter_weight, 0);
    }

    #[test]
    fn test_absorb_overflow_is_corruption() {
        let mut c = clan();
        c.absorb_member(u64::MAX, Permanence::Permanent, true)
            .unwrap();
        let err = c
            .absorb_member(1, Permanence::Permanent, true)
            .unwrap_err();
        assert!(matches!(err, AccountingError::Corruption { .. }));

        // The combined total must stay representable too.
        let mut c = clan();
        c.absorb_member(u64::MAX, Permanence::Permanent, true)
            .unwrap();
        let err = c
            .absorb_member(1, Permanence::Temporary, true)
            .unwrap_err();
        assert!(matches!(err, AccountingError::Corruption { .. }));
    }

    #[test]
    fn test_reweight_overflow_is_corruption() {
        let mut c = clan();
        c.absorb_member(u64::MAX, Permanence::Permanent, true)
            .unwrap();
        let err = c.reweight(0, 1, Permanence::Permanent, true).unwrap_err();
        assert!(matches!(err, AccountingError::Corruption { .. }));
    }

    #[test]
    fn test_release_is_symmetric_to_absorb() {
        let mut c = clan();
        c.absorb_member(600, Permanence::Permanent, true).unwrap();
        c.release_member(600, Permanence::Permanent, true).unwrap();
        assert_eq!(c.permanent_members, 0);
        assert_eq!(c.permanent_voter_weight, 0);
    }

    #[test]
    fn test_release_underflow_is_corruption() {
        let mut c = clan();
        let err = c.release_member(1, Permanence::Permanent, true).unwrap_err();
        assert!(matches!(err, AccountingError::Corruption { .. }));
    }

    #[test]
    fn test_release_stale_temporary_skips_weight() {
        let mut c = clan();
        c.absorb_member(400, Permanence::Temporary, true).unwrap();
        // Epoch rolled over: contribution already dropped.
        c.potential_voter_weight = 0;
        c.updated_temporary_members = 0;
        c.release_member(400, Permanence::Temporary, false).unwrap();
        assert_eq!(c.temporary_members, 0);
        assert_eq!(c.potential_voter_weight, 0);
    }

    #[test]
    fn test_reweight_single_delta() {
        let mut c = clan();
        c.absorb_member(600, Permanence::Permanent, true).unwrap();
        c.reweight(600, 900, Permanence::Permanent, true).unwrap();
        assert_eq!(c.permanent_voter_weight, 900);
        assert_eq!(c.permanent_members, 1);
    }

    #[test]
    fn test_reweight_stale_temporary_counts_as_updated() {
        let mut c = clan();
        c.absorb_member(400, Permanence::Temporary, true).unwrap();
        c.potential_voter_weight = 0;
        c.updated_temporary_members = 0;
        c.reweight(400, 500, Permanence::Temporary, false).unwrap();
        assert_eq!(c.potential_voter_weight, 500);
        assert_eq!(c.updated_temporary_members, 1);
    }

    #[test]
    fn test_reset_weight_if_stale() {
        let mut root = Root::new(addr(1), addr(2), addr(3), addr(4), 3600);
        root.voter_weight_reset = Some(VoterWeightReset {
            step: 100,
            next_reset_time: 1_000,
        });
        let mut c = clan();
        c.absorb_member(400, Permanence::Temporary, true).unwrap();
        c.absorb_member(600, Permanence::Permanent, true).unwrap();

        c.reset_weight_if_stale(&root);
        assert_eq!(c.potential_voter_weight, 0);
        assert_eq!(c.updated_temporary_members, 0);
        assert_eq!(c.permanent_voter_weight, 600);
        assert_eq!(c.next_voter_weight_reset_time, Some(1_000));

        // Already in the root's epoch: no-op.
        c.potential_voter_weight = 77;
        c.reset_weight_if_stale(&root);
        assert_eq!(c.potential_voter_weight, 77);
    }

    #[test]
    fn test_leaving_counters() {
        let mut c = clan();
        c.note_member_leaving();
        assert_eq!(c.leaving_members, 1);
        c.note_member_left().unwrap();
        assert_eq!(c.leaving_members, 0);
        assert!(matches!(
            c.note_member_left(),
            Err(AccountingError::Corruption { .. })
        ));
    }
}
