//! Account storage seam.
//!
//! The core never talks to the ledger directly; callers hand it
//! snapshots and persist outcomes. [`AccountStore`] is the minimal
//! read surface those callers implement, and [`MemoryStore`] is the
//! in-process implementation used by tests and by embedders that keep a
//! local account cache.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::address::Address;
use crate::codec::{self, AccountKind, CodecError};
use crate::state::{Clan, MaxVoterWeightRecord, Member, Root, VoterWeightRecord};

/// Read access to stored account blobs.
pub trait AccountStore {
    /// Returns the framed blob at `address`, if any.
    fn account(&self, address: &Address) -> Option<Vec<u8>>;
}

/// Errors from typed account reads.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No account exists at the address.
    #[error("no account at {0}")]
    Missing(Address),

    /// The blob exists but fails to unframe as the requested kind.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

fn read<T: serde::de::DeserializeOwned>(
    store: &impl AccountStore,
    kind: AccountKind,
    address: &Address,
) -> Result<T, LedgerError> {
    let bytes = store
        .account(address)
        .ok_or(LedgerError::Missing(*address))?;
    Ok(codec::decode_account(kind, &bytes)?)
}

/// Reads a root account.
///
/// # Errors
///
/// `Missing` if no account exists; `Codec` if the blob is not a root.
pub fn read_root(store: &impl AccountStore, address: &Address) -> Result<Root, LedgerError> {
    read(store, AccountKind::Root, address)
}

/// Reads a clan account.
///
/// # Errors
///
/// `Missing` if no account exists; `Codec` if the blob is not a clan.
pub fn read_clan(store: &impl AccountStore, address: &Address) -> Result<Clan, LedgerError> {
    read(store, AccountKind::Clan, address)
}

/// Reads a member account.
///
/// # Errors
///
/// `Missing` if no account exists; `Codec` if the blob is not a member.
pub fn read_member(store: &impl AccountStore, address: &Address) -> Result<Member, LedgerError> {
    read(store, AccountKind::Member, address)
}

/// Reads the max-weight mirror for a root.
///
/// # Errors
///
/// `Missing` if no account exists; `Codec` on a kind or body mismatch.
pub fn read_max_voter_weight(
    store: &impl AccountStore,
    address: &Address,
) -> Result<MaxVoterWeightRecord, LedgerError> {
    read(store, AccountKind::MaxVoterWeight, address)
}

/// Reads a plugin-issued voter weight record.
///
/// # Errors
///
/// `Missing` if no account exists; `Codec` on a kind or body mismatch.
pub fn read_voter_weight(
    store: &impl AccountStore,
    address: &Address,
) -> Result<VoterWeightRecord, LedgerError> {
    read(store, AccountKind::VoterWeight, address)
}

/// In-memory account store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    accounts: BTreeMap<Address, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames and stores an account, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// `Body` if serialization fails.
    pub fn put<T: serde::Serialize>(
        &mut self,
        kind: AccountKind,
        address: Address,
        value: &T,
    ) -> Result<(), CodecError> {
        let bytes = codec::encode_account(kind, value)?;
        self.accounts.insert(address, bytes);
        Ok(())
    }

    /// Removes the account at `address`, if present.
    pub fn remove(&mut self, address: &Address) {
        self.accounts.remove(address);
    }

    /// Number of stored accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if the store holds no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for MemoryStore {
    fn account(&self, address: &Address) -> Option<Vec<u8>> {
        self.accounts.get(address).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    #[test]
    fn test_put_then_read_typed() {
        let mut store = MemoryStore::new();
        let root = Root::new(addr(1), addr(2), addr(3), addr(4), 3600);
        store.put(AccountKind::Root, addr(10), &root).unwrap();

        assert_eq!(read_root(&store, &addr(10)).unwrap(), root);
    }

    #[test]
    fn test_missing_account() {
        let store = MemoryStore::new();
        let err = read_root(&store, &addr(10)).unwrap_err();
        assert!(matches!(err, LedgerError::Missing(a) if a == addr(10)));
    }

    #[test]
    fn test_wrong_kind_read_fails() {
        let mut store = MemoryStore::new();
        let member = Member::new(addr(1), addr(2), None);
        store.put(AccountKind::Member, addr(10), &member).unwrap();

        let err = read_root(&store, &addr(10)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Codec(CodecError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_put_replaces() {
        let mut store = MemoryStore::new();
        let mut root = Root::new(addr(1), addr(2), addr(3), addr(4), 3600);
        store.put(AccountKind::Root, addr(10), &root).unwrap();
        root.increment_clan_count();
        store.put(AccountKind::Root, addr(10), &root).unwrap();

        assert_eq!(read_root(&store, &addr(10)).unwrap().clan_count, 1);
        assert_eq!(store.len(), 1);
    }
}
