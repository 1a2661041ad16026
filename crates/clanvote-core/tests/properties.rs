//! Property tests for the aggregate bookkeeping: however a member's
//! weight history unfolds, the maintained aggregates must equal what a
//! from-scratch recomputation over the final state produces.

use std::collections::BTreeMap;

use proptest::prelude::*;

use clanvote_core::lifecycle::PermanencePolicy;
use clanvote_core::ops::{self, RootParams};
use clanvote_core::sync::scale_weight;
use clanvote_core::{Address, VoterWeightRecord};

const PROGRAM: Address = Address::new([7; 32]);
const REALM: Address = Address::new([2; 32]);
const MINT: Address = Address::new([3; 32]);
const AUTHORITY: Address = Address::new([8; 32]);
const OWNER: Address = Address::new([20; 32]);
const RECORD: Address = Address::new([60; 32]);

fn clan_address(index: usize) -> Address {
    let mut bytes = [0x40u8; 32];
    bytes[31] = index as u8;
    Address::new(bytes)
}

/// Shares for up to four clans, each small enough that any four fit
/// into the 10000bp allocation.
fn arb_shares() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(1u16..=2_500, 1..=4)
}

fn arb_weights() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..=1_000_000_000_000, 1..=5)
}

proptest! {
    // =================================================================
    // scale_weight bounds
    // =================================================================

    #[test]
    fn scale_weight_never_exceeds_input(weight in any::<u64>(), share in 0u16..=10_000) {
        prop_assert!(scale_weight(weight, share) <= weight);
    }

    #[test]
    fn scale_weight_is_monotone_in_share(weight in any::<u64>(), share in 0u16..10_000) {
        prop_assert!(scale_weight(weight, share) <= scale_weight(weight, share + 1));
    }

    #[test]
    fn full_share_is_identity(weight in any::<u64>()) {
        prop_assert_eq!(scale_weight(weight, 10_000), weight);
    }

    // =================================================================
    // No drift under arbitrary re-certification histories
    // =================================================================

    #[test]
    fn aggregates_match_recomputation(
        shares in arb_shares(),
        initial_weight in 0u64..=1_000_000_000_000,
        weights in arb_weights(),
    ) {
        let policy = PermanencePolicy::default();
        let created = ops::create_root(
            &PROGRAM,
            RootParams {
                governance_program: Address::new([1; 32]),
                realm: REALM,
                governing_token_mint: MINT,
                voting_weight_plugin: Address::new([4; 32]),
                max_proposal_lifetime: 3_600,
            },
            &AUTHORITY,
            &AUTHORITY,
            None,
        )
        .unwrap();
        let root_address = created.root_address;
        let mut root = created.root;
        let mut max_vwr = created.max_voter_weight_record;

        let mut clans = BTreeMap::new();
        for i in 0..shares.len() {
            let out = ops::create_clan(
                &PROGRAM,
                &root_address,
                root,
                clan_address(i),
                OWNER,
                None,
            )
            .unwrap();
            root = out.root;
            clans.insert(clan_address(i), out.clan);
        }

        let out = ops::create_member(&PROGRAM, &root_address, root, OWNER, None).unwrap();
        let member_address = out.member_address;
        let mut member = out.member;
        root = out.root;

        let certify = |now: i64,
                       weight: u64,
                       root: clanvote_core::Root,
                       member: clanvote_core::Member,
                       clans: BTreeMap<Address, clanvote_core::Clan>,
                       max_vwr: clanvote_core::MaxVoterWeightRecord| {
            let record = VoterWeightRecord {
                realm: REALM,
                governing_token_mint: MINT,
                governing_token_owner: OWNER,
                voter_weight: weight,
                voter_weight_expiry: None,
            };
            ops::set_certified_weight(
                now,
                &root_address,
                root,
                &member_address,
                member,
                RECORD,
                &record,
                clans,
                max_vwr,
                &OWNER,
                &policy,
            )
            .unwrap()
        };

        let out = certify(0, initial_weight, root, member, clans, max_vwr);
        root = out.root;
        member = out.member;
        clans = out.clans;
        max_vwr = out.max_voter_weight_record;

        for (i, share) in shares.iter().enumerate() {
            let joined = ops::join_clan(
                0,
                &root_address,
                root,
                &member_address,
                member,
                &clan_address(i),
                clans[&clan_address(i)].clone(),
                *share,
                &OWNER,
                &policy,
            )
            .unwrap();
            root = joined.root;
            member = joined.member;
            clans.insert(clan_address(i), joined.clan);
        }

        let mut final_weight = initial_weight;
        for (step, weight) in weights.iter().enumerate() {
            let out = certify(step as i64, *weight, root, member, clans, max_vwr);
            root = out.root;
            member = out.member;
            clans = out.clans;
            max_vwr = out.max_voter_weight_record;
            final_weight = *weight;
        }

        // Recompute every aggregate from the final flat state.
        prop_assert_eq!(member.voter_weight, final_weight);
        prop_assert_eq!(max_vwr.max_voter_weight, final_weight);
        for (i, share) in shares.iter().enumerate() {
            let clan = &clans[&clan_address(i)];
            prop_assert_eq!(
                clan.total_voter_weight(),
                scale_weight(final_weight, *share),
                "clan {} drifted from its recomputed aggregate",
                i
            );
            prop_assert_eq!(clan.active_members(), 1);
        }
    }
}
