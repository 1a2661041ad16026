//! Versioned account serialization.
//!
//! Every stored account is framed as `[kind tag][codec version][bincode
//! body]`. The tag catches reads through the wrong typed accessor before
//! bincode gets a chance to misinterpret the bytes; the version byte
//! leaves room for layout migrations without guessing from body length.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Current body layout version.
pub const CODEC_VERSION: u8 = 1;

/// Discriminates the account type behind a byte blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AccountKind {
    /// A [`crate::state::Root`].
    Root = 0,
    /// A [`crate::state::Clan`].
    Clan = 1,
    /// A [`crate::state::Member`].
    Member = 2,
    /// A [`crate::state::MaxVoterWeightRecord`].
    MaxVoterWeight = 3,
    /// A [`crate::state::VoterWeightRecord`].
    VoterWeight = 4,
}

impl AccountKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Root),
            1 => Some(Self::Clan),
            2 => Some(Self::Member),
            3 => Some(Self::MaxVoterWeight),
            4 => Some(Self::VoterWeight),
            _ => None,
        }
    }
}

/// Errors produced when framing or unframing an account.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The account blob is shorter than the two-byte header.
    #[error("account data truncated")]
    Truncated,

    /// The leading tag byte names no known account kind.
    #[error("unknown account kind tag {tag:#04x}")]
    UnknownKind {
        /// The rejected tag byte.
        tag: u8,
    },

    /// The version byte is newer than this build understands.
    #[error("unsupported codec version {version}")]
    UnsupportedVersion {
        /// The rejected version byte.
        version: u8,
    },

    /// The blob holds a different account kind than the accessor expects.
    #[error("expected {expected:?} account, found {found:?}")]
    KindMismatch {
        /// The kind the caller asked for.
        expected: AccountKind,
        /// The kind the tag byte names.
        found: AccountKind,
    },

    /// The body failed to (de)serialize.
    #[error("malformed account body")]
    Body(#[from] bincode::Error),
}

/// Frames an account value for storage.
///
/// # Errors
///
/// `Body` if serialization fails.
pub fn encode_account<T: Serialize>(kind: AccountKind, value: &T) -> Result<Vec<u8>, CodecError> {
    let body = bincode::serialize(value)?;
    let mut framed = Vec::with_capacity(body.len() + 2);
    framed.push(kind as u8);
    framed.push(CODEC_VERSION);
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Unframes an account blob, checking tag and version first.
///
/// # Errors
///
/// `Truncated`, `UnknownKind`, `UnsupportedVersion`, `KindMismatch`, or
/// `Body` if the payload fails to deserialize.
pub fn decode_account<T: DeserializeOwned>(
    expected: AccountKind,
    bytes: &[u8],
) -> Result<T, CodecError> {
    let [tag, version, body @ ..] = bytes else {
        return Err(CodecError::Truncated);
    };
    let found = AccountKind::from_tag(*tag).ok_or(CodecError::UnknownKind { tag: *tag })?;
    if found != expected {
        return Err(CodecError::KindMismatch { expected, found });
    }
    if *version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion { version: *version });
    }
    Ok(bincode::deserialize(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::state::{Member, Root};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 32])
    }

    #[test]
    fn test_roundtrip_preserves_account() {
        let root = Root::new(addr(1), addr(2), addr(3), addr(4), 3600);
        let bytes = encode_account(AccountKind::Root, &root).unwrap();
        let decoded: Root = decode_account(AccountKind::Root, &bytes).unwrap();
        assert_eq!(decoded, root);
    }

    #[test]
    fn test_kind_mismatch_is_caught_before_body() {
        let member = Member::new(addr(1), addr(2), None);
        let bytes = encode_account(AccountKind::Member, &member).unwrap();
        let err = decode_account::<Root>(AccountKind::Root, &bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::KindMismatch {
                expected: AccountKind::Root,
                found: AccountKind::Member,
            }
        ));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = decode_account::<Root>(AccountKind::Root, &[0xFF, CODEC_VERSION]).unwrap_err();
        assert!(matches!(err, CodecError::UnknownKind { tag: 0xFF }));
    }

    #[test]
    fn test_future_version_rejected() {
        let root = Root::new(addr(1), addr(2), addr(3), addr(4), 3600);
        let mut bytes = encode_account(AccountKind::Root, &root).unwrap();
        bytes[1] = CODEC_VERSION + 1;
        let err = decode_account::<Root>(AccountKind::Root, &bytes).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let err = decode_account::<Root>(AccountKind::Root, &[0]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated));
    }
}
