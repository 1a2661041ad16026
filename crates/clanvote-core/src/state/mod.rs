//! Mirrored account state.
//!
//! These structs are the client-side mirror of the ledger accounts the
//! core operates on. They carry data and small invariant helpers only;
//! all state transitions live in [`crate::ops`] and all aggregate
//! resynchronization in [`crate::sync`]. The authoritative state lives in
//! the external ledger; the core decodes it, computes an intended new
//! state, and hands that back for submission.

mod clan;
mod member;
mod root;
mod voter_weight;

pub use clan::Clan;
pub use member::{Member, Membership, MembershipEntry, MAX_SHARE_BP};
pub use root::{MaxVoterWeightRecord, Root, VoterWeightReset};
pub use voter_weight::VoterWeightRecord;
