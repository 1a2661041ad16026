//! Root account: the aggregation domain for one (realm, token) pair.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::AccountingError;

/// Periodic voter-weight reset configuration.
///
/// When set, every certified weight in the domain expires at
/// `next_reset_time` and must be re-certified; the schedule then advances
/// by whole multiples of `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterWeightReset {
    /// Seconds between resets. Always nonzero.
    pub step: u64,
    /// Next reset boundary (Unix seconds).
    pub next_reset_time: i64,
}

/// The aggregation domain for one (realm, governing token mint) pair.
///
/// Exactly one root exists per pair; it is created once by the realm
/// authority and only reconfigured by that authority afterward. The
/// clan and member counters are monotonic; no deletion path exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    /// The external governance program this root aggregates under.
    pub governance_program: Address,
    /// The governance realm.
    pub realm: Address,
    /// The governing token mint.
    pub governing_token_mint: Address,
    /// The external plugin certifying member voting weight.
    pub voting_weight_plugin: Address,
    /// Maximum proposal lifetime in seconds; also the exit-timer length.
    pub max_proposal_lifetime: u64,
    /// Optional periodic weight-reset schedule.
    pub voter_weight_reset: Option<VoterWeightReset>,
    /// Number of clans ever created under this root.
    pub clan_count: u64,
    /// Number of members ever created under this root.
    pub member_count: u64,
}

impl Root {
    /// Creates a root with zero counters.
    #[must_use]
    pub const fn new(
        governance_program: Address,
        realm: Address,
        governing_token_mint: Address,
        voting_weight_plugin: Address,
        max_proposal_lifetime: u64,
    ) -> Self {
        Self {
            governance_program,
            realm,
            governing_token_mint,
            voting_weight_plugin,
            max_proposal_lifetime,
            voter_weight_reset: None,
            clan_count: 0,
            member_count: 0,
        }
    }

    /// The next weight-reset boundary, if a schedule is configured.
    #[must_use]
    pub fn next_voter_weight_reset_time(&self) -> Option<i64> {
        self.voter_weight_reset.map(|r| r.next_reset_time)
    }

    /// Rolls the reset schedule forward past `now`.
    ///
    /// Advances `next_reset_time` by whole steps until it is strictly in
    /// the future. Pure clock maintenance; no counter effects. A no-op
    /// when no schedule is configured or the boundary has not passed.
    pub fn advance_reset_schedule(&mut self, now: i64) {
        if let Some(reset) = &mut self.voter_weight_reset {
            if now >= reset.next_reset_time {
                // A ledger-decoded schedule may carry a step the codec
                // never validated; such a schedule cannot advance.
                let step = match i64::try_from(reset.step) {
                    Ok(step) if step > 0 => step,
                    _ => return,
                };
                let missed = (now - reset.next_reset_time) / step + 1;
                reset.next_reset_time += missed * step;
            }
        }
    }

    /// Records one successful clan creation.
    pub fn increment_clan_count(&mut self) {
        self.clan_count += 1;
    }

    /// Records one successful member creation.
    pub fn increment_member_count(&mut self) {
        self.member_count += 1;
    }
}

/// Mirror of the domain-wide maximum voting weight record.
///
/// Tracks the sum of every member's certified weight (not a per-clan
/// sum). Published to the external governance protocol so it can compute
/// vote thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxVoterWeightRecord {
    /// The realm this record belongs to.
    pub realm: Address,
    /// The governing token mint this record is associated with.
    pub governing_token_mint: Address,
    /// Sum of all members' certified weight.
    pub max_voter_weight: u64,
    /// When the aggregate expires, if the certifying source decays.
    pub max_voter_weight_expiry: Option<u64>,
}

impl MaxVoterWeightRecord {
    /// Creates a zeroed record for a root.
    #[must_use]
    pub const fn new(realm: Address, governing_token_mint: Address) -> Self {
        Self {
            realm,
            governing_token_mint,
            max_voter_weight: 0,
            max_voter_weight_expiry: None,
        }
    }

    /// Replaces one member's contribution: aggregate − old + new.
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if the aggregate would go negative or
    /// overflow; certified weights come from an external plugin, so the
    /// sum of all members' weights is not bounded by construction.
    pub fn apply_weight_delta(
        &mut self,
        old_weight: u64,
        new_weight: u64,
    ) -> Result<(), AccountingError> {
        let reduced = self.max_voter_weight.checked_sub(old_weight).ok_or_else(|| {
            AccountingError::Corruption {
                detail: format!(
                    "max voter weight {} cannot absorb removal of {old_weight}",
                    self.max_voter_weight
                ),
            }
        })?;
        self.max_voter_weight = reduced.checked_add(new_weight).ok_or_else(|| {
            AccountingError::Corruption {
                detail: format!("max voter weight {reduced} cannot absorb addition of {new_weight}"),
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    fn root() -> Root {
        Root::new(addr(1), addr(2), addr(3), addr(4), 3600)
    }

    #[test]
    fn test_new_root_is_zeroed() {
        let r = root();
        assert_eq!(r.clan_count, 0);
        assert_eq!(r.member_count, 0);
        assert!(r.voter_weight_reset.is_none());
    }

    #[test]
    fn test_advance_reset_schedule_noop_without_schedule() {
        let mut r = root();
        r.advance_reset_schedule(1_000_000);
        assert!(r.voter_weight_reset.is_none());
    }

    #[test]
    fn test_advance_reset_schedule_noop_before_boundary() {
        let mut r = root();
        r.voter_weight_reset = Some(VoterWeightReset {
            step: 100,
            next_reset_time: 1_000,
        });
        r.advance_reset_schedule(999);
        assert_eq!(r.next_voter_weight_reset_time(), Some(1_000));
    }

    #[test]
    fn test_advance_reset_schedule_rolls_whole_steps() {
        let mut r = root();
        r.voter_weight_reset = Some(VoterWeightReset {
            step: 100,
            next_reset_time: 1_000,
        });
        // Exactly at the boundary: the boundary has been reached, advance.
        r.advance_reset_schedule(1_000);
        assert_eq!(r.next_voter_weight_reset_time(), Some(1_100));
        // Several missed steps at once.
        r.advance_reset_schedule(1_450);
        assert_eq!(r.next_voter_weight_reset_time(), Some(1_500));
    }

    #[test]
    fn test_advance_reset_schedule_skips_unvalidated_step() {
        let mut r = root();
        r.voter_weight_reset = Some(VoterWeightReset {
            step: 0,
            next_reset_time: 1_000,
        });
        r.advance_reset_schedule(5_000);
        assert_eq!(r.next_voter_weight_reset_time(), Some(1_000));

        r.voter_weight_reset = Some(VoterWeightReset {
            step: u64::MAX,
            next_reset_time: 1_000,
        });
        r.advance_reset_schedule(5_000);
        assert_eq!(r.next_voter_weight_reset_time(), Some(1_000));
    }

    #[test]
    fn test_apply_weight_delta() {
        let mut mvwr = MaxVoterWeightRecord::new(addr(2), addr(3));
        mvwr.apply_weight_delta(0, 500).unwrap();
        assert_eq!(mvwr.max_voter_weight, 500);
        mvwr.apply_weight_delta(500, 200).unwrap();
        assert_eq!(mvwr.max_voter_weight, 200);
    }

    #[test]
    fn test_apply_weight_delta_underflow_is_corruption() {
        let mut mvwr = MaxVoterWeightRecord::new(addr(2), addr(3));
        mvwr.apply_weight_delta(0, 100).unwrap();
        let err = mvwr.apply_weight_delta(101, 0).unwrap_err();
        assert!(matches!(err, AccountingError::Corruption { .. }));
        // Failed application leaves the aggregate untouched.
        assert_eq!(mvwr.max_voter_weight, 100);
    }

    #[test]
    fn test_apply_weight_delta_overflow_is_corruption() {
        let mut mvwr = MaxVoterWeightRecord::new(addr(2), addr(3));
        mvwr.max_voter_weight = u64::MAX;
        let err = mvwr.apply_weight_delta(0, 1).unwrap_err();
        assert!(matches!(err, AccountingError::Corruption { .. }));
        assert_eq!(mvwr.max_voter_weight, u64::MAX);
    }
}
