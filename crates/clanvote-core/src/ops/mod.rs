//! Account operations.
//!
//! Each operation takes owned snapshots of the accounts it touches,
//! validates every precondition, mutates the copies, and returns them in
//! an outcome struct together with the events describing the change. On
//! error nothing is returned, so the caller's live state is never
//! half-updated; committing an outcome replaces the snapshots
//! wholesale.
//!
//! Callers are responsible for fetching fresh snapshots and for
//! persisting outcomes. An outcome computed from stale snapshots is
//! detected downstream as a `Corruption` or rejected by the ledger's own
//! compare-and-swap; the fix is always reread-and-retry, never partial
//! repair.

mod clan;
mod member;
mod root;

pub use clan::{
    create_clan, set_accept_temporary_members, set_clan_delegate, set_clan_description,
    set_clan_name, set_clan_owner, set_min_voting_weight_to_join, ClanOutcome, CreateClanOutcome,
};
pub use member::{
    begin_exit, create_member, finish_exit, join_clan, set_certified_weight, set_member_delegate,
    set_voter_weight_reset_schedule, BeginExitOutcome, CertifyOutcome, CreateMemberOutcome,
    FinishExitOutcome, JoinClanOutcome, MemberOutcome,
};
pub use root::{
    create_root, set_max_proposal_lifetime, set_voter_weight_reset, set_voting_weight_plugin,
    ConfigureRootOutcome, CreateRootOutcome, RootParams,
};
