//! Clan creation and configuration.

use crate::address::{self, Address};
use crate::error::AccountingError;
use crate::events::Event;
use crate::state::{Clan, Root};

/// Result of [`create_clan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateClanOutcome {
    /// The new clan account.
    pub clan: Clan,
    /// The root with its clan counter advanced.
    pub root: Root,
    /// Creation index of the clan (previous value of the counter).
    pub clan_index: u64,
    /// Events describing the change.
    pub events: Vec<Event>,
}

/// Result of any clan configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClanOutcome {
    /// The updated clan account.
    pub clan: Clan,
    /// Events describing the change; empty for a no-op update.
    pub events: Vec<Event>,
}

/// Creates a clan under a root.
///
/// The clan address itself is caller-chosen; the voter authority, voter
/// weight record, and token owner record addresses are derived from it
/// so the whole account family is predictable from the clan address
/// alone. The clan starts empty, in the root's current reset epoch.
///
/// # Errors
///
/// `AlreadyExists` if an account already lives at `clan_address`;
/// `Corruption` if a derivation exhausts its bump search.
pub fn create_clan(
    program_id: &Address,
    root_address: &Address,
    mut root: Root,
    clan_address: Address,
    owner: Address,
    existing: Option<&Clan>,
) -> Result<CreateClanOutcome, AccountingError> {
    if existing.is_some() {
        return Err(AccountingError::AlreadyExists {
            kind: "clan",
            address: clan_address,
        });
    }

    let (voter_authority, _) = address::voter_authority_address(program_id, &clan_address)?;
    let (voter_weight_record, _) = address::voter_weight_record_address(program_id, &clan_address)?;
    let (token_owner_record, _) = address::token_owner_record_address(
        &root.governance_program,
        &root.realm,
        &root.governing_token_mint,
        &clan_address,
    )?;

    let clan = Clan::new(
        *root_address,
        owner,
        voter_authority,
        token_owner_record,
        voter_weight_record,
        root.next_voter_weight_reset_time(),
    );
    let clan_index = root.clan_count;
    root.increment_clan_count();

    tracing::info!(clan = %clan_address, root = %root_address, index = clan_index, "created clan");

    Ok(CreateClanOutcome {
        clan,
        root,
        clan_index,
        events: vec![Event::ClanCreated {
            clan: clan_address,
            root: *root_address,
            clan_index,
            owner,
        }],
    })
}

/// Hands clan ownership to a new owner.
///
/// Only the current owner may do this, and only after clearing the
/// delegate, so a newly-installed owner never inherits an acting
/// delegate it did not choose.
///
/// # Errors
///
/// `Unauthorized` if `signer` is not the owner; `DelegateStillSet` if a
/// delegate is still configured.
pub fn set_clan_owner(
    clan_address: &Address,
    mut clan: Clan,
    signer: &Address,
    new_owner: Address,
) -> Result<ClanOutcome, AccountingError> {
    if *signer != clan.owner {
        return Err(unauthorized(clan_address, signer));
    }
    if clan.delegate.is_some() {
        return Err(AccountingError::DelegateStillSet {
            clan: *clan_address,
        });
    }

    let old_owner = clan.owner;
    clan.owner = new_owner;

    let mut events = Vec::new();
    if new_owner != old_owner {
        tracing::info!(clan = %clan_address, old = %old_owner, new = %new_owner, "changed clan owner");
        events.push(Event::ClanOwnerChanged {
            clan: *clan_address,
            old_owner,
            new_owner,
        });
    }
    Ok(ClanOutcome { clan, events })
}

/// Sets or clears the clan's configuration delegate.
///
/// # Errors
///
/// `Unauthorized` if `signer` is neither owner nor current delegate.
pub fn set_clan_delegate(
    clan_address: &Address,
    mut clan: Clan,
    signer: &Address,
    new_delegate: Option<Address>,
) -> Result<ClanOutcome, AccountingError> {
    if !clan.is_authority(signer) {
        return Err(unauthorized(clan_address, signer));
    }

    let old_delegate = clan.delegate;
    clan.delegate = new_delegate;

    let mut events = Vec::new();
    if new_delegate != old_delegate {
        tracing::info!(clan = %clan_address, new = ?new_delegate, "changed clan delegate");
        events.push(Event::ClanDelegateChanged {
            clan: *clan_address,
            old_delegate,
            new_delegate,
        });
    }
    Ok(ClanOutcome { clan, events })
}

/// Renames the clan.
///
/// # Errors
///
/// `Unauthorized` if `signer` is neither owner nor delegate.
pub fn set_clan_name(
    clan_address: &Address,
    mut clan: Clan,
    signer: &Address,
    new_name: String,
) -> Result<ClanOutcome, AccountingError> {
    if !clan.is_authority(signer) {
        return Err(unauthorized(clan_address, signer));
    }

    let mut events = Vec::new();
    if new_name != clan.name {
        events.push(Event::ClanNameChanged {
            clan: *clan_address,
            new_name: new_name.clone(),
        });
    }
    clan.name = new_name;
    Ok(ClanOutcome { clan, events })
}

/// Replaces the clan's description.
///
/// # Errors
///
/// `Unauthorized` if `signer` is neither owner nor delegate.
pub fn set_clan_description(
    clan_address: &Address,
    mut clan: Clan,
    signer: &Address,
    new_description: String,
) -> Result<ClanOutcome, AccountingError> {
    if !clan.is_authority(signer) {
        return Err(unauthorized(clan_address, signer));
    }

    let mut events = Vec::new();
    if new_description != clan.description {
        events.push(Event::ClanDescriptionChanged {
            clan: *clan_address,
            new_description: new_description.clone(),
        });
    }
    clan.description = new_description;
    Ok(ClanOutcome { clan, events })
}

/// Changes the minimum certified weight required to join.
///
/// Applies to future joins only; current members are never evicted by a
/// raised threshold.
///
/// # Errors
///
/// `Unauthorized` if `signer` is neither owner nor delegate.
pub fn set_min_voting_weight_to_join(
    clan_address: &Address,
    mut clan: Clan,
    signer: &Address,
    new_min_voting_weight_to_join: u64,
) -> Result<ClanOutcome, AccountingError> {
    if !clan.is_authority(signer) {
        return Err(unauthorized(clan_address, signer));
    }

    let old_min_voting_weight_to_join = clan.min_voting_weight_to_join;
    clan.min_voting_weight_to_join = new_min_voting_weight_to_join;

    let mut events = Vec::new();
    if new_min_voting_weight_to_join != old_min_voting_weight_to_join {
        events.push(Event::ClanMinVotingWeightToJoinChanged {
            clan: *clan_address,
            old_min_voting_weight_to_join,
            new_min_voting_weight_to_join,
        });
    }
    Ok(ClanOutcome { clan, events })
}

/// Opens or closes the clan to epoch-bound members.
///
/// Closing does not evict temporary members already inside; it only
/// blocks new temporary joins.
///
/// # Errors
///
/// `Unauthorized` if `signer` is neither owner nor delegate.
pub fn set_accept_temporary_members(
    clan_address: &Address,
    mut clan: Clan,
    signer: &Address,
    accept_temporary_members: bool,
) -> Result<ClanOutcome, AccountingError> {
    if !clan.is_authority(signer) {
        return Err(unauthorized(clan_address, signer));
    }

    let mut events = Vec::new();
    if accept_temporary_members != clan.accept_temporary_members {
        events.push(Event::ClanAcceptTemporaryMembersChanged {
            clan: *clan_address,
            accept_temporary_members,
        });
    }
    clan.accept_temporary_members = accept_temporary_members;
    Ok(ClanOutcome { clan, events })
}

fn unauthorized(clan_address: &Address, signer: &Address) -> AccountingError {
    AccountingError::Unauthorized {
        kind: "clan",
        address: *clan_address,
        authority: *signer,
    }
}
