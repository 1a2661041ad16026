//! Deterministic account identity derivation.
//!
//! Maps `(purpose tag, ordered seed bytes, program id)` to a stable
//! 32-byte account address plus a disambiguation bump. The derivation is
//! byte-identical to the external ledger's own: SHA-256 over
//! `seeds || [bump] || program_id || "ProgramDerivedAddress"`, searching
//! the bump downward from 255 and rejecting any candidate that
//! decompresses to a point on the Ed25519 curve. Client-predicted
//! addresses therefore match ledger-assigned addresses exactly.
//!
//! Derivation fails only if no bump in the search range produces an
//! off-curve candidate. That is a fatal configuration error and is never
//! retried.

use std::fmt;

use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Size of an account address in bytes.
pub const ADDRESS_SIZE: usize = 32;

/// Domain separator appended to every derivation preimage.
const DERIVATION_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Well-known purpose tags used as the leading derivation seed.
pub mod seeds {
    /// Root account: `["root", realm, governing_token_mint]`.
    pub const ROOT: &[u8] = b"root";
    /// Member account: `["member", root, owner]`.
    pub const MEMBER: &[u8] = b"member";
    /// Clan voter authority: `["voter-authority", clan]`.
    pub const VOTER_AUTHORITY: &[u8] = b"voter-authority";
    /// Voter weight record: `["voter-weight", clan]`.
    pub const VOTER_WEIGHT: &[u8] = b"voter-weight";
    /// Max voter weight record: `["max-voter-weight", root]`.
    pub const MAX_VOTER_WEIGHT: &[u8] = b"max-voter-weight";
    /// Root lock authority: `["lock-authority", root]`.
    pub const LOCK_AUTHORITY: &[u8] = b"lock-authority";
    /// Token owner record in the external governance program:
    /// `["governance", realm, governing_token_mint, owner]`.
    pub const TOKEN_OWNER_RECORD: &[u8] = b"governance";
}

/// A 32-byte account address.
///
/// Immutable, `Copy`, safe as a map key, and stable under serde.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a byte slice, if it is exactly 32 bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; ADDRESS_SIZE] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Returns the inner bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// Encodes the address as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 hex chars are enough to tell accounts apart in logs.
        let hex = self.to_hex();
        write!(f, "{}..", &hex[..8])
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

/// Errors that can occur during address derivation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    /// Every bump in the search range produced an on-curve candidate.
    ///
    /// This is a fatal configuration error: the seed set itself must
    /// change, retrying cannot help.
    #[error("no valid bump for seed set starting with {purpose:?}")]
    BumpExhausted {
        /// The leading purpose tag of the failed seed set.
        purpose: String,
    },
}

/// Derives a program address and bump from an ordered seed set.
///
/// # Errors
///
/// Returns [`DerivationError::BumpExhausted`] if no bump in `255..=0`
/// yields an off-curve address.
pub fn derive_address(
    seed_set: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), DerivationError> {
    for bump in (0..=u8::MAX).rev() {
        let candidate = derive_with_bump(seed_set, bump, program_id);
        if !is_on_curve(candidate.as_bytes()) {
            return Ok((candidate, bump));
        }
    }
    Err(DerivationError::BumpExhausted {
        purpose: String::from_utf8_lossy(seed_set.first().copied().unwrap_or_default())
            .into_owned(),
    })
}

/// Recomputes the address for a known bump without searching.
///
/// Used to verify a ledger-provided bump against the client's own
/// derivation.
#[must_use]
pub fn derive_with_bump(seed_set: &[&[u8]], bump: u8, program_id: &Address) -> Address {
    let mut hasher = Sha256::new();
    for seed in seed_set {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id.as_bytes());
    hasher.update(DERIVATION_MARKER);
    Address::new(hasher.finalize().into())
}

fn is_on_curve(bytes: &[u8; ADDRESS_SIZE]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

/// Root account address for a (realm, governing token mint) pair.
///
/// # Errors
///
/// Propagates [`DerivationError`] from the bump search.
pub fn root_address(
    program_id: &Address,
    realm: &Address,
    governing_token_mint: &Address,
) -> Result<(Address, u8), DerivationError> {
    derive_address(
        &[
            seeds::ROOT,
            realm.as_bytes(),
            governing_token_mint.as_bytes(),
        ],
        program_id,
    )
}

/// Member account address for a (root, owner) pair.
///
/// # Errors
///
/// Propagates [`DerivationError`] from the bump search.
pub fn member_address(
    program_id: &Address,
    root: &Address,
    owner: &Address,
) -> Result<(Address, u8), DerivationError> {
    derive_address(
        &[seeds::MEMBER, root.as_bytes(), owner.as_bytes()],
        program_id,
    )
}

/// Voter authority address for a clan.
///
/// # Errors
///
/// Propagates [`DerivationError`] from the bump search.
pub fn voter_authority_address(
    program_id: &Address,
    clan: &Address,
) -> Result<(Address, u8), DerivationError> {
    derive_address(&[seeds::VOTER_AUTHORITY, clan.as_bytes()], program_id)
}

/// Voter weight record address for a clan.
///
/// # Errors
///
/// Propagates [`DerivationError`] from the bump search.
pub fn voter_weight_record_address(
    program_id: &Address,
    clan: &Address,
) -> Result<(Address, u8), DerivationError> {
    derive_address(&[seeds::VOTER_WEIGHT, clan.as_bytes()], program_id)
}

/// Max voter weight record address for a root.
///
/// # Errors
///
/// Propagates [`DerivationError`] from the bump search.
pub fn max_voter_weight_address(
    program_id: &Address,
    root: &Address,
) -> Result<(Address, u8), DerivationError> {
    derive_address(&[seeds::MAX_VOTER_WEIGHT, root.as_bytes()], program_id)
}

/// Token owner record address inside the external governance program.
///
/// # Errors
///
/// Propagates [`DerivationError`] from the bump search.
pub fn token_owner_record_address(
    governance_program: &Address,
    realm: &Address,
    governing_token_mint: &Address,
    owner: &Address,
) -> Result<(Address, u8), DerivationError> {
    derive_address(
        &[
            seeds::TOKEN_OWNER_RECORD,
            realm.as_bytes(),
            governing_token_mint.as_bytes(),
            owner.as_bytes(),
        ],
        governance_program,
    )
}

/// Utility module for hex encoding (used in display and error text).
mod hex {
    use std::fmt::Write;

    /// Encodes bytes as a lowercase hex string.
    pub fn encode(bytes: &[u8]) -> String {
        bytes
            .iter()
            .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            })
    }
}
