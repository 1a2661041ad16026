//! clanvote-core - Governance vote-aggregation accounting
//!
//! This library implements the accounting core of a vote-aggregation
//! system: token holders (members) delegate basis-point shares of their
//! externally-certified voting weight to voting collectives (clans),
//! which vote in an external governance protocol with the pooled
//! weight. The core is pure and deterministic; it takes account
//! snapshots in, applies one operation, and hands fully-updated copies
//! back. Persistence, signatures, and transport are the embedding
//! runtime's business.
//!
//! # Modules
//!
//! - [`address`]: Deterministic account address derivation (seeds, bump
//!   search, curve rejection)
//! - [`state`]: Account structures (root, clan, member, weight records)
//!   and their local aggregate maintenance
//! - [`lifecycle`]: Permanence classification and the exit-timer waiver
//!   policy
//! - [`sync`]: Batched weight resynchronization across a member's clans
//!   and the root mirror
//! - [`ops`]: The operations themselves, validate-then-mutate over owned
//!   snapshots
//! - [`events`]: Facts recorded by successful operations
//! - [`codec`]: Versioned account framing for storage
//! - [`ledger`]: The account-store seam and an in-memory implementation
//!
//! # Consistency model
//!
//! Every operation either returns a complete outcome or an
//! [`error::AccountingError`]; no partial mutation ever escapes. Within
//! one outcome the cross-account invariants hold: each clan's aggregates
//! equal the sum of its members' scaled contributions, and the root's
//! published ceiling equals the sum of all certified member weights.

pub mod address;
pub mod codec;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod ops;
pub mod state;
pub mod sync;

pub use address::Address;
pub use error::AccountingError;
pub use events::Event;
pub use lifecycle::{ClanVotingStatus, Permanence, PermanencePolicy, PermanenceRule};
pub use state::{
    Clan, MaxVoterWeightRecord, Member, Membership, MembershipEntry, Root, VoterWeightRecord,
    VoterWeightReset, MAX_SHARE_BP,
};
