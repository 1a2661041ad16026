//! Domain events.
//!
//! Every successful operation returns the events describing what it
//! changed, in the order the changes were applied. Callers forward them
//! to whatever audit or notification channel the embedding runtime
//! provides; the core itself never buffers or replays them.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::state::VoterWeightReset;

/// A fact recorded by a successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Event {
    /// A root was registered for a realm.
    RootCreated {
        root: Address,
        governance_program: Address,
        realm: Address,
        governing_token_mint: Address,
        voting_weight_plugin: Address,
    },
    /// The root's maximum proposal lifetime was changed.
    MaxProposalLifetimeChanged {
        root: Address,
        old_max_proposal_lifetime: u64,
        new_max_proposal_lifetime: u64,
    },
    /// The root's weight reset schedule was changed.
    VoterWeightResetChanged {
        root: Address,
        old_voter_weight_reset: Option<VoterWeightReset>,
        new_voter_weight_reset: Option<VoterWeightReset>,
    },
    /// The root's certifying plugin was replaced.
    VotingWeightPluginChanged {
        root: Address,
        old_voting_weight_plugin: Address,
        new_voting_weight_plugin: Address,
    },
    /// A clan was created under a root.
    ClanCreated {
        clan: Address,
        root: Address,
        clan_index: u64,
        owner: Address,
    },
    /// A clan's owner was handed over.
    ClanOwnerChanged {
        clan: Address,
        old_owner: Address,
        new_owner: Address,
    },
    /// A clan's configuration delegate was changed.
    ClanDelegateChanged {
        clan: Address,
        old_delegate: Option<Address>,
        new_delegate: Option<Address>,
    },
    /// A clan was renamed.
    ClanNameChanged { clan: Address, new_name: String },
    /// A clan's description was replaced.
    ClanDescriptionChanged {
        clan: Address,
        new_description: String,
    },
    /// A clan's join threshold was changed.
    ClanMinVotingWeightToJoinChanged {
        clan: Address,
        old_min_voting_weight_to_join: u64,
        new_min_voting_weight_to_join: u64,
    },
    /// A clan opened or closed to epoch-bound members.
    ClanAcceptTemporaryMembersChanged {
        clan: Address,
        accept_temporary_members: bool,
    },
    /// A member identity was created under a root.
    MemberCreated {
        member: Address,
        root: Address,
        member_index: u64,
        owner: Address,
    },
    /// A member's acting delegate was changed.
    MemberDelegateChanged {
        member: Address,
        old_delegate: Option<Address>,
        new_delegate: Option<Address>,
    },
    /// A member committed a share to a clan.
    ClanMemberAdded {
        clan: Address,
        member: Address,
        root: Address,
        owner: Address,
        share_bp: u16,
    },
    /// A member started the timed exit from a clan.
    StartedLeavingClan {
        member: Address,
        clan: Address,
        root: Address,
        owner: Address,
        exitable_at: i64,
    },
    /// A leaving membership was retired.
    ClanMemberLeft {
        member: Address,
        clan: Address,
        root: Address,
        owner: Address,
    },
    /// A member's certified weight was replaced.
    MemberVoterWeightChanged {
        member: Address,
        root: Address,
        old_voter_weight: u64,
        new_voter_weight: u64,
    },
    /// A clan's effective weight changed.
    ClanVoterWeightChanged {
        clan: Address,
        root: Address,
        old_voter_weight: u64,
        new_voter_weight: u64,
    },
    /// The root's published weight ceiling changed.
    MaxVoterWeightChanged {
        root: Address,
        old_max_voter_weight: u64,
        new_max_voter_weight: u64,
    },
}
