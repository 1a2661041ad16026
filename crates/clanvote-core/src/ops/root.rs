//! Root creation and reconfiguration.

use crate::address::{self, Address};
use crate::error::AccountingError;
use crate::events::Event;
use crate::state::{MaxVoterWeightRecord, Root, VoterWeightReset};

/// Immutable identity of a root, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootParams {
    /// The external governance program.
    pub governance_program: Address,
    /// The governance realm.
    pub realm: Address,
    /// The governing token mint.
    pub governing_token_mint: Address,
    /// The plugin certifying member voting weight.
    pub voting_weight_plugin: Address,
    /// Maximum proposal lifetime in seconds; also the exit-timer length.
    pub max_proposal_lifetime: u64,
}

/// Result of [`create_root`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRootOutcome {
    /// Derived address of the new root.
    pub root_address: Address,
    /// Bump found for the root derivation.
    pub bump: u8,
    /// The new root account.
    pub root: Root,
    /// The root's zeroed max-weight mirror.
    pub max_voter_weight_record: MaxVoterWeightRecord,
    /// Events describing the change.
    pub events: Vec<Event>,
}

/// Result of any root reconfiguration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureRootOutcome {
    /// The updated root account.
    pub root: Root,
    /// Events describing the change; empty for a no-op update.
    pub events: Vec<Event>,
}

/// Creates the root for a (realm, governing token mint) pair.
///
/// Only the realm authority may create a root; `realm_authority` is the
/// authority read from the realm itself and `signer` the caller's
/// identity. At most one root exists per pair, enforced by the derived
/// address.
///
/// # Errors
///
/// `Unauthorized` if `signer` is not the realm authority;
/// `AlreadyExists` if a root is already present at the derived address.
pub fn create_root(
    program_id: &Address,
    params: RootParams,
    realm_authority: &Address,
    signer: &Address,
    existing: Option<&Root>,
) -> Result<CreateRootOutcome, AccountingError> {
    let (root_address, bump) =
        address::root_address(program_id, &params.realm, &params.governing_token_mint)?;

    if signer != realm_authority {
        return Err(AccountingError::Unauthorized {
            kind: "root",
            address: root_address,
            authority: *signer,
        });
    }
    if existing.is_some() {
        return Err(AccountingError::AlreadyExists {
            kind: "root",
            address: root_address,
        });
    }

    let root = Root::new(
        params.governance_program,
        params.realm,
        params.governing_token_mint,
        params.voting_weight_plugin,
        params.max_proposal_lifetime,
    );
    let max_voter_weight_record =
        MaxVoterWeightRecord::new(params.realm, params.governing_token_mint);

    tracing::info!(root = %root_address, realm = %params.realm, "created root");

    Ok(CreateRootOutcome {
        root_address,
        bump,
        root,
        max_voter_weight_record,
        events: vec![Event::RootCreated {
            root: root_address,
            governance_program: params.governance_program,
            realm: params.realm,
            governing_token_mint: params.governing_token_mint,
            voting_weight_plugin: params.voting_weight_plugin,
        }],
    })
}

/// Changes the root's maximum proposal lifetime.
///
/// The new value applies to exits begun after the change; timers already
/// running keep their original deadline.
///
/// # Errors
///
/// `Unauthorized` if `signer` is not the realm authority.
pub fn set_max_proposal_lifetime(
    root_address: &Address,
    mut root: Root,
    realm_authority: &Address,
    signer: &Address,
    new_max_proposal_lifetime: u64,
) -> Result<ConfigureRootOutcome, AccountingError> {
    check_realm_authority(root_address, realm_authority, signer)?;

    let old_max_proposal_lifetime = root.max_proposal_lifetime;
    root.max_proposal_lifetime = new_max_proposal_lifetime;

    let mut events = Vec::new();
    if new_max_proposal_lifetime != old_max_proposal_lifetime {
        tracing::info!(
            root = %root_address,
            old = old_max_proposal_lifetime,
            new = new_max_proposal_lifetime,
            "changed max proposal lifetime"
        );
        events.push(Event::MaxProposalLifetimeChanged {
            root: *root_address,
            old_max_proposal_lifetime,
            new_max_proposal_lifetime,
        });
    }
    Ok(ConfigureRootOutcome { root, events })
}

/// Replaces the root's weight-certifying plugin.
///
/// Weights already certified stay valid; new certifications are read
/// from records owned by the new plugin.
///
/// # Errors
///
/// `Unauthorized` if `signer` is not the realm authority.
pub fn set_voting_weight_plugin(
    root_address: &Address,
    mut root: Root,
    realm_authority: &Address,
    signer: &Address,
    new_voting_weight_plugin: Address,
) -> Result<ConfigureRootOutcome, AccountingError> {
    check_realm_authority(root_address, realm_authority, signer)?;

    let old_voting_weight_plugin = root.voting_weight_plugin;
    root.voting_weight_plugin = new_voting_weight_plugin;

    let mut events = Vec::new();
    if new_voting_weight_plugin != old_voting_weight_plugin {
        tracing::info!(
            root = %root_address,
            old = %old_voting_weight_plugin,
            new = %new_voting_weight_plugin,
            "changed voting weight plugin"
        );
        events.push(Event::VotingWeightPluginChanged {
            root: *root_address,
            old_voting_weight_plugin,
            new_voting_weight_plugin,
        });
    }
    Ok(ConfigureRootOutcome { root, events })
}

/// Configures or adjusts the periodic weight-reset schedule.
///
/// Once a schedule exists only its step may change; the next boundary
/// stays where it was scheduled so members cannot be reset earlier than
/// announced. When no schedule exists yet, `new_next_reset_time` picks
/// the first boundary (defaulting to one step from `now`) and must lie
/// in the future.
///
/// # Errors
///
/// `Unauthorized` if `signer` is not the realm authority;
/// `InvalidResetSchedule` for a zero step, a first boundary not in the
/// future, or an attempt to move an already-scheduled boundary.
pub fn set_voter_weight_reset(
    root_address: &Address,
    mut root: Root,
    realm_authority: &Address,
    signer: &Address,
    new_step: u64,
    new_next_reset_time: Option<i64>,
    now: i64,
) -> Result<ConfigureRootOutcome, AccountingError> {
    check_realm_authority(root_address, realm_authority, signer)?;

    if new_step == 0 {
        return Err(AccountingError::InvalidResetSchedule {
            reason: "reset step must be nonzero".to_string(),
        });
    }
    let step = i64::try_from(new_step).map_err(|_| AccountingError::InvalidResetSchedule {
        reason: format!("reset step {new_step} does not fit a timestamp"),
    })?;

    let old_voter_weight_reset = root.voter_weight_reset;
    if let Some(reset) = &mut root.voter_weight_reset {
        if new_next_reset_time.is_some() {
            return Err(AccountingError::InvalidResetSchedule {
                reason: "next reset time cannot be changed once scheduled".to_string(),
            });
        }
        reset.step = new_step;
    } else {
        let next_reset_time = new_next_reset_time.unwrap_or(now + step);
        if next_reset_time <= now {
            return Err(AccountingError::InvalidResetSchedule {
                reason: format!("next reset time {next_reset_time} is not in the future"),
            });
        }
        root.voter_weight_reset = Some(VoterWeightReset {
            step: new_step,
            next_reset_time,
        });
    }

    tracing::info!(
        root = %root_address,
        step = new_step,
        next_reset_time = ?root.next_voter_weight_reset_time(),
        "configured voter weight reset"
    );

    let new_voter_weight_reset = root.voter_weight_reset;
    Ok(ConfigureRootOutcome {
        root,
        events: vec![Event::VoterWeightResetChanged {
            root: *root_address,
            old_voter_weight_reset,
            new_voter_weight_reset,
        }],
    })
}

fn check_realm_authority(
    root_address: &Address,
    realm_authority: &Address,
    signer: &Address,
) -> Result<(), AccountingError> {
    if signer == realm_authority {
        Ok(())
    } else {
        Err(AccountingError::Unauthorized {
            kind: "root",
            address: *root_address,
            authority: *signer,
        })
    }
}
