//! Member lifecycle: creation, delegation, joining, weight
//! certification, and the two-step exit.

use std::collections::BTreeMap;

use crate::address::{self, Address};
use crate::error::AccountingError;
use crate::events::Event;
use crate::lifecycle::{ClanVotingStatus, Permanence, PermanencePolicy};
use crate::state::{
    Clan, MaxVoterWeightRecord, Member, Membership, MembershipEntry, Root, VoterWeightRecord,
    MAX_SHARE_BP,
};
use crate::sync::{compute_deltas, scale_weight};

/// Result of [`create_member`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMemberOutcome {
    /// Derived address of the new member.
    pub member_address: Address,
    /// Bump found for the member derivation.
    pub bump: u8,
    /// The new member account.
    pub member: Member,
    /// The root with its member counter advanced.
    pub root: Root,
    /// Creation index of the member (previous value of the counter).
    pub member_index: u64,
    /// Events describing the change.
    pub events: Vec<Event>,
}

/// Result of a member-only change (delegation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberOutcome {
    /// The updated member account.
    pub member: Member,
    /// Events describing the change; empty for a no-op update.
    pub events: Vec<Event>,
}

/// Result of [`join_clan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClanOutcome {
    /// The root with its reset schedule advanced.
    pub root: Root,
    /// The member with the new entry appended.
    pub member: Member,
    /// The clan with the contribution absorbed.
    pub clan: Clan,
    /// Events describing the change.
    pub events: Vec<Event>,
}

/// Result of [`set_certified_weight`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertifyOutcome {
    /// The root with its reset schedule advanced.
    pub root: Root,
    /// The member with the new weight recorded.
    pub member: Member,
    /// Every clan holding an active entry, reweighted.
    pub clans: BTreeMap<Address, Clan>,
    /// The root's max-weight mirror with the single root delta applied.
    pub max_voter_weight_record: MaxVoterWeightRecord,
    /// Events describing the change.
    pub events: Vec<Event>,
}

/// Result of [`begin_exit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginExitOutcome {
    /// The root with its reset schedule advanced.
    pub root: Root,
    /// The member with the entry flipped to leaving.
    pub member: Member,
    /// The clan with the contribution released.
    pub clan: Clan,
    /// Events describing the change.
    pub events: Vec<Event>,
}

/// Result of [`finish_exit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishExitOutcome {
    /// The member with the entry removed.
    pub member: Member,
    /// The clan with its leaving counter decremented.
    pub clan: Clan,
    /// Events describing the change.
    pub events: Vec<Event>,
}

/// Creates a member identity for a token owner under a root.
///
/// The member starts with zero weight and no memberships; its address is
/// derived from the (root, owner) pair so each owner holds exactly one
/// member per root.
///
/// # Errors
///
/// `AlreadyExists` if a member is already present at the derived
/// address; `Corruption` if the derivation exhausts its bump search.
pub fn create_member(
    program_id: &Address,
    root_address: &Address,
    mut root: Root,
    owner: Address,
    existing: Option<&Member>,
) -> Result<CreateMemberOutcome, AccountingError> {
    let (member_address, bump) = address::member_address(program_id, root_address, &owner)?;
    if existing.is_some() {
        return Err(AccountingError::AlreadyExists {
            kind: "member",
            address: member_address,
        });
    }

    let member = Member::new(*root_address, owner, root.next_voter_weight_reset_time());
    let member_index = root.member_count;
    root.increment_member_count();

    tracing::info!(member = %member_address, root = %root_address, index = member_index, "created member");

    Ok(CreateMemberOutcome {
        member_address,
        bump,
        member,
        root,
        member_index,
        events: vec![Event::MemberCreated {
            member: member_address,
            root: *root_address,
            member_index,
            owner,
        }],
    })
}

/// Sets or clears the member's acting delegate.
///
/// # Errors
///
/// `Unauthorized` if `signer` is neither owner nor current delegate.
pub fn set_member_delegate(
    member_address: &Address,
    mut member: Member,
    signer: &Address,
    new_delegate: Option<Address>,
) -> Result<MemberOutcome, AccountingError> {
    if !member.is_authority(signer) {
        return Err(member_unauthorized(member_address, signer));
    }

    let old_delegate = member.delegate;
    member.delegate = new_delegate;

    let mut events = Vec::new();
    if new_delegate != old_delegate {
        tracing::info!(member = %member_address, new = ?new_delegate, "changed member delegate");
        events.push(Event::MemberDelegateChanged {
            member: *member_address,
            old_delegate,
            new_delegate,
        });
    }
    Ok(MemberOutcome { member, events })
}

/// Commits a basis-point share of the member's weight to a clan.
///
/// The clan absorbs `voter_weight * share_bp / 10000` using the member's
/// current certification; a temporary certification from a previous
/// epoch contributes nothing until re-certified. The root's published
/// ceiling does not move here, only at certification.
///
/// # Errors
///
/// `Unauthorized`, `InvalidShare` (zero or above 10000), `DuplicateClan`
/// (an entry for this clan exists, active or leaving), `ShareExceeded`,
/// `TemporaryNotAccepted`, or `BelowMinimumWeight`. A member or clan
/// snapshot from a different root is `Corruption`, as is an overflowing
/// clan aggregate.
#[allow(clippy::too_many_arguments)]
pub fn join_clan(
    now: i64,
    root_address: &Address,
    mut root: Root,
    member_address: &Address,
    mut member: Member,
    clan_address: &Address,
    mut clan: Clan,
    share_bp: u16,
    signer: &Address,
    policy: &PermanencePolicy,
) -> Result<JoinClanOutcome, AccountingError> {
    if !member.is_authority(signer) {
        return Err(member_unauthorized(member_address, signer));
    }
    check_member_root(root_address, member_address, &member)?;
    check_clan_root(root_address, clan_address, &clan)?;
    if share_bp == 0 || share_bp > MAX_SHARE_BP {
        return Err(AccountingError::InvalidShare { share_bp });
    }
    if member.has_entry(clan_address) {
        return Err(AccountingError::DuplicateClan {
            member: *member_address,
            clan: *clan_address,
        });
    }
    let available_bp = MAX_SHARE_BP - member.active_share_bp();
    if share_bp > available_bp {
        return Err(AccountingError::ShareExceeded {
            member: *member_address,
            requested_bp: share_bp,
            available_bp,
        });
    }

    root.advance_reset_schedule(now);
    clan.reset_weight_if_stale(&root);

    let permanence = policy.classify(&member, &root);
    let weight_current = policy.weight_is_current(&member, &root);
    let effective_weight = if weight_current { member.voter_weight } else { 0 };

    if permanence == Permanence::Temporary && !clan.accept_temporary_members {
        return Err(AccountingError::TemporaryNotAccepted {
            clan: *clan_address,
        });
    }
    if effective_weight < clan.min_voting_weight_to_join {
        return Err(AccountingError::BelowMinimumWeight {
            clan: *clan_address,
            weight: effective_weight,
            minimum: clan.min_voting_weight_to_join,
        });
    }

    let contribution = scale_weight(effective_weight, share_bp);
    let old_clan_weight = clan.total_voter_weight();
    clan.absorb_member(contribution, permanence, weight_current)?;
    member.membership.push(MembershipEntry {
        clan: *clan_address,
        state: Membership::Active { share_bp },
    });

    tracing::info!(
        member = %member_address,
        clan = %clan_address,
        share_bp,
        contribution,
        "member joined clan"
    );

    let events = vec![
        Event::ClanMemberAdded {
            clan: *clan_address,
            member: *member_address,
            root: member.root,
            owner: member.owner,
            share_bp,
        },
        Event::ClanVoterWeightChanged {
            clan: *clan_address,
            root: member.root,
            old_voter_weight: old_clan_weight,
            new_voter_weight: clan.total_voter_weight(),
        },
    ];
    Ok(JoinClanOutcome {
        root,
        member,
        clan,
        events,
    })
}

/// Replaces the member's certified weight from a plugin record and
/// resynchronizes every clan holding an active entry plus the root's
/// published ceiling, as one batch.
///
/// `clans` must contain a snapshot for every clan the member is active
/// in. The root mirror receives exactly one delta regardless of how many
/// clans are touched, so repeating the certification converges to the
/// same state as certifying the final weight directly.
///
/// # Errors
///
/// `Unauthorized` if `signer` may not act for the member; `NotFound` if
/// an active entry's clan is missing from `clans`; `Corruption` if the
/// record does not belong to this root and member, if a supplied
/// snapshot belongs to a different root, or if an aggregate would go
/// negative or overflow.
#[allow(clippy::too_many_arguments)]
pub fn set_certified_weight(
    now: i64,
    root_address: &Address,
    mut root: Root,
    member_address: &Address,
    mut member: Member,
    record_address: Address,
    record: &VoterWeightRecord,
    mut clans: BTreeMap<Address, Clan>,
    mut max_voter_weight_record: MaxVoterWeightRecord,
    signer: &Address,
    policy: &PermanencePolicy,
) -> Result<CertifyOutcome, AccountingError> {
    if !member.is_authority(signer) {
        return Err(member_unauthorized(member_address, signer));
    }
    check_member_root(root_address, member_address, &member)?;
    check_clan_roots(root_address, &clans)?;
    if record.realm != root.realm
        || record.governing_token_mint != root.governing_token_mint
        || record.governing_token_owner != member.owner
    {
        return Err(AccountingError::Corruption {
            detail: format!(
                "voter weight record {record_address} does not certify member {member_address} under root {root_address}"
            ),
        });
    }

    root.advance_reset_schedule(now);
    for clan in clans.values_mut() {
        clan.reset_weight_if_stale(&root);
    }

    let old_permanence = policy.classify(&member, &root);
    let old_current = policy.weight_is_current(&member, &root);
    let old_weight = member.voter_weight;
    let old_max = max_voter_weight_record.max_voter_weight;
    let old_clan_weights: BTreeMap<Address, u64> = clans
        .iter()
        .map(|(a, c)| (*a, c.total_voter_weight()))
        .collect();

    // The new permanence class depends on the expiry the record carries.
    member.voter_weight_expiry = record.voter_weight_expiry;
    let new_permanence = policy.classify(&member, &root);

    let deltas = compute_deltas(
        &member,
        record.voter_weight,
        old_permanence,
        new_permanence,
        old_current,
    );
    deltas.apply(&mut clans, &mut max_voter_weight_record)?;

    member.voter_weight = record.voter_weight;
    member.voter_weight_record = Some(record_address);
    member.next_voter_weight_reset_time = root.next_voter_weight_reset_time();

    tracing::info!(
        member = %member_address,
        old_weight,
        new_weight = record.voter_weight,
        clans = deltas.clan_deltas.len(),
        "certified member weight"
    );

    let mut events = vec![Event::MemberVoterWeightChanged {
        member: *member_address,
        root: *root_address,
        old_voter_weight: old_weight,
        new_voter_weight: record.voter_weight,
    }];
    for (clan_address, clan) in &clans {
        let old_voter_weight = old_clan_weights.get(clan_address).copied().unwrap_or(0);
        let new_voter_weight = clan.total_voter_weight();
        if new_voter_weight != old_voter_weight {
            events.push(Event::ClanVoterWeightChanged {
                clan: *clan_address,
                root: *root_address,
                old_voter_weight,
                new_voter_weight,
            });
        }
    }
    events.push(Event::MaxVoterWeightChanged {
        root: *root_address,
        old_max_voter_weight: old_max,
        new_max_voter_weight: max_voter_weight_record.max_voter_weight,
    });

    Ok(CertifyOutcome {
        root,
        member,
        clans,
        max_voter_weight_record,
        events,
    })
}

/// Re-registers the member's existing certified weight under the root's
/// current reset epoch.
///
/// After an epoch rollover a temporary member's contribution has been
/// dropped from its clans' provisional aggregates; this restores it
/// without requiring a fresh plugin record. Permanent members are
/// unaffected beyond the recorded boundary. The root's published
/// ceiling never moves here, since the weight itself is unchanged.
///
/// # Errors
///
/// `Unauthorized` if `signer` may not act for the member; `NotFound` if
/// an active entry's clan is missing from `clans`; `Corruption` if a
/// supplied snapshot belongs to a different root or an aggregate would
/// go negative or overflow.
#[allow(clippy::too_many_arguments)]
pub fn set_voter_weight_reset_schedule(
    now: i64,
    root_address: &Address,
    mut root: Root,
    member_address: &Address,
    mut member: Member,
    mut clans: BTreeMap<Address, Clan>,
    mut max_voter_weight_record: MaxVoterWeightRecord,
    signer: &Address,
    policy: &PermanencePolicy,
) -> Result<CertifyOutcome, AccountingError> {
    if !member.is_authority(signer) {
        return Err(member_unauthorized(member_address, signer));
    }
    check_member_root(root_address, member_address, &member)?;
    check_clan_roots(root_address, &clans)?;

    root.advance_reset_schedule(now);
    for clan in clans.values_mut() {
        clan.reset_weight_if_stale(&root);
    }

    let permanence = policy.classify(&member, &root);
    let old_current = policy.weight_is_current(&member, &root);
    let old_clan_weights: BTreeMap<Address, u64> = clans
        .iter()
        .map(|(a, c)| (*a, c.total_voter_weight()))
        .collect();

    let deltas = compute_deltas(&member, member.voter_weight, permanence, permanence, old_current);
    deltas.apply(&mut clans, &mut max_voter_weight_record)?;

    member.next_voter_weight_reset_time = root.next_voter_weight_reset_time();

    tracing::debug!(
        member = %member_address,
        epoch = ?member.next_voter_weight_reset_time,
        "refreshed member reset schedule"
    );

    let mut events = Vec::new();
    for (clan_address, clan) in &clans {
        let old_voter_weight = old_clan_weights.get(clan_address).copied().unwrap_or(0);
        let new_voter_weight = clan.total_voter_weight();
        if new_voter_weight != old_voter_weight {
            events.push(Event::ClanVoterWeightChanged {
                clan: *clan_address,
                root: *root_address,
                old_voter_weight,
                new_voter_weight,
            });
        }
    }

    Ok(CertifyOutcome {
        root,
        member,
        clans,
        max_voter_weight_record,
        events,
    })
}

/// Starts the timed exit from a clan.
///
/// The contribution leaves the clan's aggregates immediately; the entry
/// stays, marked leaving, until the timer elapses. The timer length is
/// the root's maximum proposal lifetime, so weight cannot escape a vote
/// it already backed.
///
/// # Errors
///
/// `Unauthorized` if `signer` may not act for the member; `NotFound` if
/// no entry exists for the clan or the entry is already leaving;
/// `Corruption` if a snapshot belongs to a different root or the release
/// underflows an aggregate.
#[allow(clippy::too_many_arguments)]
pub fn begin_exit(
    now: i64,
    root_address: &Address,
    mut root: Root,
    member_address: &Address,
    mut member: Member,
    clan_address: &Address,
    mut clan: Clan,
    signer: &Address,
    policy: &PermanencePolicy,
) -> Result<BeginExitOutcome, AccountingError> {
    if !member.is_authority(signer) {
        return Err(member_unauthorized(member_address, signer));
    }
    check_member_root(root_address, member_address, &member)?;
    check_clan_root(root_address, clan_address, &clan)?;
    let position = member
        .membership
        .iter()
        .position(|e| e.clan == *clan_address)
        .ok_or(AccountingError::NotFound {
            kind: "membership",
            address: *clan_address,
        })?;
    let share_bp = match member.membership[position].state {
        Membership::Active { share_bp } => share_bp,
        Membership::Leaving { .. } => {
            return Err(AccountingError::NotFound {
                kind: "active membership",
                address: *clan_address,
            });
        }
    };

    root.advance_reset_schedule(now);
    clan.reset_weight_if_stale(&root);

    let permanence = policy.classify(&member, &root);
    let weight_current = policy.weight_is_current(&member, &root);
    let contribution = scale_weight(member.voter_weight, share_bp);

    let lifetime =
        i64::try_from(root.max_proposal_lifetime).map_err(|_| AccountingError::Corruption {
            detail: format!(
                "max proposal lifetime {} does not fit a timestamp",
                root.max_proposal_lifetime
            ),
        })?;
    let exitable_at = now + lifetime;

    let old_clan_weight = clan.total_voter_weight();
    clan.release_member(contribution, permanence, weight_current)?;
    clan.note_member_leaving();
    member.membership[position].state = Membership::Leaving {
        share_bp,
        exitable_at,
    };

    tracing::info!(
        member = %member_address,
        clan = %clan_address,
        exitable_at,
        "member started leaving clan"
    );

    let events = vec![
        Event::StartedLeavingClan {
            member: *member_address,
            clan: *clan_address,
            root: member.root,
            owner: member.owner,
            exitable_at,
        },
        Event::ClanVoterWeightChanged {
            clan: *clan_address,
            root: member.root,
            old_voter_weight: old_clan_weight,
            new_voter_weight: clan.total_voter_weight(),
        },
    ];
    Ok(BeginExitOutcome {
        root,
        member,
        clan,
        events,
    })
}

/// Retires a leaving entry once its timer has elapsed.
///
/// The boundary is inclusive: the exit is legal at exactly
/// `exitable_at`. An idle clan (no unrelinquished votes, no outstanding
/// proposals) waives the timer, since there is no vote the departing
/// weight could still be backing.
///
/// # Errors
///
/// `Unauthorized` if `signer` may not act for the member; `NotFound` if
/// no leaving entry exists for the clan; `TooEarly` if the timer has not
/// elapsed and the clan is not idle; `Corruption` if the clan belongs to
/// a different root or records no leaving member.
pub fn finish_exit(
    now: i64,
    member_address: &Address,
    mut member: Member,
    clan_address: &Address,
    mut clan: Clan,
    voting_status: &ClanVotingStatus,
    signer: &Address,
) -> Result<FinishExitOutcome, AccountingError> {
    if !member.is_authority(signer) {
        return Err(member_unauthorized(member_address, signer));
    }
    check_clan_root(&member.root, clan_address, &clan)?;
    let exitable_at = match member.entry(clan_address).map(|e| e.state) {
        Some(Membership::Leaving { exitable_at, .. }) => exitable_at,
        _ => {
            return Err(AccountingError::NotFound {
                kind: "leaving membership",
                address: *clan_address,
            });
        }
    };

    if now < exitable_at && !voting_status.is_idle() {
        return Err(AccountingError::TooEarly {
            clan: *clan_address,
            now,
            exitable_at,
        });
    }

    member.membership.retain(|e| e.clan != *clan_address);
    clan.note_member_left()?;

    tracing::info!(member = %member_address, clan = %clan_address, "member left clan");

    let events = vec![Event::ClanMemberLeft {
        member: *member_address,
        clan: *clan_address,
        root: member.root,
        owner: member.owner,
    }];
    Ok(FinishExitOutcome {
        member,
        clan,
        events,
    })
}

fn member_unauthorized(member_address: &Address, signer: &Address) -> AccountingError {
    AccountingError::Unauthorized {
        kind: "member",
        address: *member_address,
        authority: *signer,
    }
}

fn foreign_root(
    kind: &'static str,
    address: &Address,
    found: &Address,
    expected: &Address,
) -> AccountingError {
    AccountingError::Corruption {
        detail: format!("{kind} {address} belongs to root {found}, expected {expected}"),
    }
}

fn check_member_root(
    root_address: &Address,
    member_address: &Address,
    member: &Member,
) -> Result<(), AccountingError> {
    if member.root != *root_address {
        return Err(foreign_root(
            "member",
            member_address,
            &member.root,
            root_address,
        ));
    }
    Ok(())
}

fn check_clan_root(
    root_address: &Address,
    clan_address: &Address,
    clan: &Clan,
) -> Result<(), AccountingError> {
    if clan.root != *root_address {
        return Err(foreign_root("clan", clan_address, &clan.root, root_address));
    }
    Ok(())
}

fn check_clan_roots(
    root_address: &Address,
    clans: &BTreeMap<Address, Clan>,
) -> Result<(), AccountingError> {
    for (clan_address, clan) in clans {
        check_clan_root(root_address, clan_address, clan)?;
    }
    Ok(())
}
