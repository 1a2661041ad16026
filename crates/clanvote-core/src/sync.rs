//! Weight resynchronization.
//!
//! Whenever a member's certified weight is replaced, every clan holding
//! an active membership entry for that member must be reweighted and the
//! root's max-weight mirror updated as one consistent batch. This module
//! computes the batch ([`WeightDeltas`]) and applies it to scratch
//! copies; the caller commits the copies only on full success, so either
//! every clan and the root reflect the new weight or none do.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::AccountingError;
use crate::lifecycle::Permanence;
use crate::state::{Clan, MaxVoterWeightRecord, Member, MAX_SHARE_BP};

/// Scales a certified weight by a basis-point share.
///
/// Integer division truncates; the remainder loss is accepted and not
/// redistributed. The u128 intermediate keeps `u64::MAX * 10000` exact.
#[must_use]
pub fn scale_weight(weight: u64, share_bp: u16) -> u64 {
    let scaled = u128::from(weight) * u128::from(share_bp) / u128::from(MAX_SHARE_BP);
    // share_bp <= 10000, so the quotient always fits back into u64.
    scaled as u64
}

/// One clan's contribution change within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClanReweight {
    /// The clan to reweight.
    pub clan: Address,
    /// Contribution under the old certified weight.
    pub old_contribution: u64,
    /// Contribution under the new certified weight.
    pub new_contribution: u64,
}

/// A consistent batch of weight deltas for one member.
///
/// Idempotent: recomputed from the same inputs it always produces the
/// same batch, so a caller's retry-after-reread is trivially correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightDeltas {
    /// Per-clan contribution changes, one per active membership entry.
    pub clan_deltas: Vec<ClanReweight>,
    /// The member's old certified weight (root-mirror delta, old side).
    pub old_weight: u64,
    /// The member's new certified weight (root-mirror delta, new side).
    pub new_weight: u64,
    /// Permanence class of the memberships before re-certification.
    pub old_permanence: Permanence,
    /// Permanence class after re-certification. Differs from the old
    /// class when an expiry appears on, or disappears from, the weight.
    pub new_permanence: Permanence,
    /// Whether the old weight was still valid for the current epoch.
    pub old_current: bool,
}

/// Computes the delta batch for replacing a member's certified weight.
///
/// Leaving entries are skipped: their contribution was already released
/// when the exit began. A member with no active entries still produces a
/// (clan-empty) batch carrying the root-mirror delta.
#[must_use]
pub fn compute_deltas(
    member: &Member,
    new_weight: u64,
    old_permanence: Permanence,
    new_permanence: Permanence,
    old_current: bool,
) -> WeightDeltas {
    let old_weight = member.voter_weight;
    let clan_deltas = member
        .membership
        .iter()
        .filter(|e| e.state.is_active())
        .map(|e| ClanReweight {
            clan: e.clan,
            old_contribution: scale_weight(old_weight, e.state.share_bp()),
            new_contribution: scale_weight(new_weight, e.state.share_bp()),
        })
        .collect();
    WeightDeltas {
        clan_deltas,
        old_weight,
        new_weight,
        old_permanence,
        new_permanence,
        old_current,
    }
}

impl WeightDeltas {
    /// Applies the batch to scratch copies of the affected accounts.
    ///
    /// When the permanence class is unchanged the contribution moves as a
    /// single delta inside one aggregate; when it flips, the membership
    /// is released from the old class and absorbed into the new one, so
    /// the per-class member counters follow the weight. The root mirror
    /// receives exactly one delta regardless of how many clans are
    /// affected. On error the scratch copies must be discarded by the
    /// caller; partial application is not rolled back here.
    ///
    /// # Errors
    ///
    /// `NotFound` if a delta references a clan missing from `clans`;
    /// `Corruption` if any aggregate would go negative or overflow.
    pub fn apply(
        &self,
        clans: &mut BTreeMap<Address, Clan>,
        max_vwr: &mut MaxVoterWeightRecord,
    ) -> Result<(), AccountingError> {
        for delta in &self.clan_deltas {
            let clan = clans
                .get_mut(&delta.clan)
                .ok_or(AccountingError::NotFound {
                    kind: "clan",
                    address: delta.clan,
                })?;
            if self.old_permanence == self.new_permanence {
                clan.reweight(
                    delta.old_contribution,
                    delta.new_contribution,
                    self.new_permanence,
                    self.old_current,
                )?;
            } else {
                clan.release_member(
                    delta.old_contribution,
                    self.old_permanence,
                    self.old_current,
                )?;
                clan.absorb_member(delta.new_contribution, self.new_permanence, true)?;
            }
        }
        max_vwr.apply_weight_delta(self.old_weight, self.new_weight)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Membership, MembershipEntry};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    fn member_with_weight(weight: u64) -> Member {
        let mut m = Member::new(addr(1), addr(2), None);
        m.voter_weight = weight;
        m
    }

    #[test]
    fn test_scale_weight_truncates() {
        assert_eq!(scale_weight(1_000_000, 6_000), 600_000);
        assert_eq!(scale_weight(1_000_000, 4_000), 400_000);
        assert_eq!(scale_weight(3, 5_000), 1); // 1.5 truncated
        assert_eq!(scale_weight(0, 10_000), 0);
        assert_eq!(scale_weight(u64::MAX, 10_000), u64::MAX);
    }

    #[test]
    fn test_compute_deltas_skips_leaving_entries() {
        let mut m = member_with_weight(1_000_000);
        m.membership.push(MembershipEntry {
            clan: addr(10),
            state: Membership::Active { share_bp: 6_000 },
        });
        m.membership.push(MembershipEntry {
            clan: addr(11),
            state: Membership::Leaving {
                share_bp: 4_000,
                exitable_at: 99,
            },
        });

        let deltas = compute_deltas(
            &m,
            2_000_000,
            Permanence::Permanent,
            Permanence::Permanent,
            true,
        );
        assert_eq!(deltas.clan_deltas.len(), 1);
        assert_eq!(deltas.clan_deltas[0].clan, addr(10));
        assert_eq!(deltas.clan_deltas[0].old_contribution, 600_000);
        assert_eq!(deltas.clan_deltas[0].new_contribution, 1_200_000);
        assert_eq!(deltas.old_weight, 1_000_000);
        assert_eq!(deltas.new_weight, 2_000_000);
    }

    #[test]
    fn test_apply_updates_clans_and_root_once() {
        let mut m = member_with_weight(1_000_000);
        m.membership.push(MembershipEntry {
            clan: addr(10),
            state: Membership::Active { share_bp: 6_000 },
        });
        m.membership.push(MembershipEntry {
            clan: addr(11),
            state: Membership::Active { share_bp: 4_000 },
        });

        let mut clans = BTreeMap::new();
        let mut clan_a = Clan::new(addr(1), addr(2), addr(3), addr(4), addr(5), None);
        clan_a
            .absorb_member(600_000, Permanence::Permanent, true)
            .unwrap();
        let mut clan_b = Clan::new(addr(1), addr(2), addr(3), addr(4), addr(5), None);
        clan_b
            .absorb_member(400_000, Permanence::Permanent, true)
            .unwrap();
        clans.insert(addr(10), clan_a);
        clans.insert(addr(11), clan_b);

        let mut max_vwr = MaxVoterWeightRecord::new(addr(2), addr(3));
        max_vwr.max_voter_weight = 1_000_000;

        let deltas = compute_deltas(
            &m,
            500_000,
            Permanence::Permanent,
            Permanence::Permanent,
            true,
        );
        deltas.apply(&mut clans, &mut max_vwr).unwrap();

        assert_eq!(clans[&addr(10)].permanent_voter_weight, 300_000);
        assert_eq!(clans[&addr(11)].permanent_voter_weight, 200_000);
        assert_eq!(max_vwr.max_voter_weight, 500_000);
    }

    #[test]
    fn test_apply_moves_membership_between_classes() {
        let mut m = member_with_weight(1_000);
        m.membership.push(MembershipEntry {
            clan: addr(10),
            state: Membership::Active { share_bp: 10_000 },
        });

        let mut clans = BTreeMap::new();
        let mut clan = Clan::new(addr(1), addr(2), addr(3), addr(4), addr(5), None);
        clan.absorb_member(1_000, Permanence::Permanent, true)
            .unwrap();
        clans.insert(addr(10), clan);

        let mut max_vwr = MaxVoterWeightRecord::new(addr(2), addr(3));
        max_vwr.max_voter_weight = 1_000;

        // Re-certification added an expiry: permanent -> temporary.
        let deltas = compute_deltas(
            &m,
            2_000,
            Permanence::Permanent,
            Permanence::Temporary,
            true,
        );
        deltas.apply(&mut clans, &mut max_vwr).unwrap();

        let clan = &clans[&addr(10)];
        assert_eq!(clan.permanent_members, 0);
        assert_eq!(clan.permanent_voter_weight, 0);
        assert_eq!(clan.temporary_members, 1);
        assert_eq!(clan.updated_temporary_members, 1);
        assert_eq!(clan.potential_voter_weight, 2_000);
        assert_eq!(max_vwr.max_voter_weight, 2_000);
    }

    #[test]
    fn test_apply_missing_clan_is_not_found() {
        let mut m = member_with_weight(100);
        m.membership.push(MembershipEntry {
            clan: addr(10),
            state: Membership::Active { share_bp: 10_000 },
        });
        let deltas = compute_deltas(&m, 200, Permanence::Permanent, Permanence::Permanent, true);

        let mut clans = BTreeMap::new();
        let mut max_vwr = MaxVoterWeightRecord::new(addr(2), addr(3));
        let err = deltas.apply(&mut clans, &mut max_vwr).unwrap_err();
        assert!(matches!(err, AccountingError::NotFound { kind: "clan", .. }));
    }

    #[test]
    fn test_no_memberships_still_updates_root() {
        let m = member_with_weight(700);
        let deltas = compute_deltas(&m, 900, Permanence::Permanent, Permanence::Permanent, true);
        assert!(deltas.clan_deltas.is_empty());

        let mut clans = BTreeMap::new();
        let mut max_vwr = MaxVoterWeightRecord::new(addr(2), addr(3));
        max_vwr.max_voter_weight = 700;
        deltas.apply(&mut clans, &mut max_vwr).unwrap();
        assert_eq!(max_vwr.max_voter_weight, 900);
    }
}
