//! Store key layout
//!
//! Every record kind lives under its own one-byte prefix so it can be
//! iterated in isolation. Integers are big-endian fixed width, which keeps
//! prefix iteration in numeric order.
//!
//! | Prefix | Key                                   | Value                 |
//! |--------|---------------------------------------|-----------------------|
//! | 0x01   | params                                | bincode `Params`      |
//! | 0x02   | challenge-id sequence                 | u64                   |
//! | 0x10   | id:u64                                | expired height: u64   |
//! | 0x11   | id:u64                                | bincode target        |
//! | 0x12   | expired height:u64 ‖ id:u64           | empty                 |
//! | 0x20   | operator:u32 ‖ object:u256            | slash height: u64     |
//! | 0x21   | operator:u32                          | amount: u128          |
//! | 0x30   | ring capacity                         | u64                   |
//! | 0x31   | ring cursor                           | i64                   |
//! | 0x32   | slot:u64                              | bincode attested      |
//! | 0x33   | latest attested id                    | u64                   |
//! | 0x40   | challenges opened in current block    | u64                   |

use crate::error::{ChallengeError, ChallengeResult};
use shared_types::{BlockHeight, ObjectId, OperatorId};

pub const PARAMS_KEY: &[u8] = &[0x01];
pub const CHALLENGE_ID_SEQUENCE_KEY: &[u8] = &[0x02];
pub const CHALLENGE_PREFIX: &[u8] = &[0x10];
pub const CHALLENGE_TARGET_PREFIX: &[u8] = &[0x11];
pub const EXPIRY_INDEX_PREFIX: &[u8] = &[0x12];
pub const RECENT_SLASH_PREFIX: &[u8] = &[0x20];
pub const SP_SLASH_AMOUNT_PREFIX: &[u8] = &[0x21];
pub const ATTESTED_CAPACITY_KEY: &[u8] = &[0x30];
pub const ATTESTED_CURSOR_KEY: &[u8] = &[0x31];
pub const ATTESTED_SLOT_PREFIX: &[u8] = &[0x32];
pub const LATEST_ATTESTED_ID_KEY: &[u8] = &[0x33];
pub const OPENED_THIS_BLOCK_KEY: &[u8] = &[0x40];

fn with_prefix(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let len = prefix.len() + parts.iter().map(|p| p.len()).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.extend_from_slice(prefix);
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

pub fn challenge_key(id: u64) -> Vec<u8> {
    with_prefix(CHALLENGE_PREFIX, &[&id.to_be_bytes()])
}

pub fn challenge_target_key(id: u64) -> Vec<u8> {
    with_prefix(CHALLENGE_TARGET_PREFIX, &[&id.to_be_bytes()])
}

pub fn expiry_index_key(expired_height: BlockHeight, id: u64) -> Vec<u8> {
    with_prefix(
        EXPIRY_INDEX_PREFIX,
        &[&expired_height.to_be_bytes(), &id.to_be_bytes()],
    )
}

pub fn recent_slash_key(operator_id: OperatorId, object_id: &ObjectId) -> Vec<u8> {
    with_prefix(
        RECENT_SLASH_PREFIX,
        &[&operator_id.to_be_bytes(), &object_id.to_be_bytes()],
    )
}

pub fn sp_slash_amount_key(operator_id: OperatorId) -> Vec<u8> {
    with_prefix(SP_SLASH_AMOUNT_PREFIX, &[&operator_id.to_be_bytes()])
}

pub fn attested_slot_key(slot: u64) -> Vec<u8> {
    with_prefix(ATTESTED_SLOT_PREFIX, &[&slot.to_be_bytes()])
}

fn suffix<'k>(key: &'k [u8], prefix: &[u8], expected: usize) -> ChallengeResult<&'k [u8]> {
    match key.strip_prefix(prefix) {
        Some(rest) if rest.len() == expected => Ok(rest),
        _ => Err(ChallengeError::corruption(format!(
            "malformed key {:?} under prefix {:?}",
            key, prefix
        ))),
    }
}

pub fn decode_challenge_key(key: &[u8]) -> ChallengeResult<u64> {
    decode_u64(suffix(key, CHALLENGE_PREFIX, 8)?)
}

pub fn decode_expiry_index_key(key: &[u8]) -> ChallengeResult<(BlockHeight, u64)> {
    let rest = suffix(key, EXPIRY_INDEX_PREFIX, 16)?;
    Ok((decode_u64(&rest[..8])?, decode_u64(&rest[8..])?))
}

pub fn decode_recent_slash_key(key: &[u8]) -> ChallengeResult<(OperatorId, ObjectId)> {
    let rest = suffix(key, RECENT_SLASH_PREFIX, 36)?;
    let operator_id = decode_u32(&rest[..4])?;
    let object_bytes: [u8; 32] = rest[4..]
        .try_into()
        .map_err(|_| ChallengeError::corruption("recent slash key object id"))?;
    Ok((operator_id, ObjectId::from_be_bytes(&object_bytes)))
}

pub fn decode_sp_slash_amount_key(key: &[u8]) -> ChallengeResult<OperatorId> {
    decode_u32(suffix(key, SP_SLASH_AMOUNT_PREFIX, 4)?)
}

// =============================================================================
// Fixed-width value codecs
// =============================================================================

fn codec_error(what: &str, len: usize) -> ChallengeError {
    ChallengeError::Codec {
        reason: format!("{} expects fixed-width bytes, got {} bytes", what, len),
    }
}

pub fn decode_u32(bytes: &[u8]) -> ChallengeResult<u32> {
    let array: [u8; 4] = bytes.try_into().map_err(|_| codec_error("u32", bytes.len()))?;
    Ok(u32::from_be_bytes(array))
}

pub fn decode_u64(bytes: &[u8]) -> ChallengeResult<u64> {
    let array: [u8; 8] = bytes.try_into().map_err(|_| codec_error("u64", bytes.len()))?;
    Ok(u64::from_be_bytes(array))
}

pub fn decode_i64(bytes: &[u8]) -> ChallengeResult<i64> {
    let array: [u8; 8] = bytes.try_into().map_err(|_| codec_error("i64", bytes.len()))?;
    Ok(i64::from_be_bytes(array))
}

pub fn decode_u128(bytes: &[u8]) -> ChallengeResult<u128> {
    let array: [u8; 16] = bytes
        .try_into()
        .map_err(|_| codec_error("u128", bytes.len()))?;
    Ok(u128::from_be_bytes(array))
}
