//! Voter weight record read from the external certifying plugin.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Externally-certified voting weight for one token owner.
///
/// Produced by the root's voting-weight plugin (for example a
/// staking/locking program). The core only reads these records; it never
/// computes or mutates the weight itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterWeightRecord {
    /// The realm the record belongs to.
    pub realm: Address,
    /// The governing token mint the record is associated with.
    pub governing_token_mint: Address,
    /// The certified token owner.
    pub governing_token_owner: Address,
    /// The certified weight.
    pub voter_weight: u64,
    /// When the weight expires; `None` if it never does.
    pub voter_weight_expiry: Option<i64>,
}

impl VoterWeightRecord {
    /// Returns `true` if the weight is epoch-bound (carries an expiry).
    #[must_use]
    pub const fn expires(&self) -> bool {
        self.voter_weight_expiry.is_some()
    }
}
