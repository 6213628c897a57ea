//! Block header: fixed 84-byte layout, compact proof-of-work target,
//! cumulative-work derivation, and timestamp validity.

use crate::codec::{write_bytes, write_u32_le, ByteReader, Decode, Encode};
use crate::crypto::dhash;
use crate::error::{DecodeError, Result};
use crate::hash::Hash;
use crate::u256::U256;

/// `version:u32, height:u32, time:u32, bits:u32, prevHash:[32], merkleRoot:[32], nonce:u32`.
pub const HEADER_LEN: usize = 4 + 4 + 4 + 4 + 32 + 32 + 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u32,
    pub height: u32,
    pub time: u32,
    pub bits: u32,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub nonce: u32,
}

impl Encode for BlockHeader {
    fn encode(&self, out: &mut Vec<u8>) {
        write_u32_le(out, self.version);
        write_u32_le(out, self.height);
        write_u32_le(out, self.time);
        write_u32_le(out, self.bits);
        write_bytes(out, self.prev_hash.as_le_bytes());
        write_bytes(out, self.merkle_root.as_le_bytes());
        write_u32_le(out, self.nonce);
    }
}

impl Decode for BlockHeader {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(decode_header(r)?)
    }
}

fn decode_header(r: &mut ByteReader<'_>) -> core::result::Result<BlockHeader, DecodeError> {
    Ok(BlockHeader {
        version: r.read_u32_le()?,
        height: r.read_u32_le()?,
        time: r.read_u32_le()?,
        bits: r.read_u32_le()?,
        prev_hash: Hash::from_le_bytes(r.read_array32()?),
        merkle_root: Hash::from_le_bytes(r.read_array32()?),
        nonce: r.read_u32_le()?,
    })
}

impl BlockHeader {
    /// Identity hash: `dhash(serialization)`, stored little-endian.
    pub fn hash(&self) -> Hash {
        Hash::from_le_bytes(dhash(&self.to_bytes()))
    }

    pub fn id(&self) -> String {
        self.hash().to_hex_be()
    }

    /// Bumps the nonce. Since [`Self::hash`] always recomputes from the
    /// current field values there is no cache to invalidate.
    pub fn increase_nonce(&mut self) {
        self.nonce = self.nonce.wrapping_add(1);
    }

    /// Decodes the compact `bits` target: low 24 bits are the mantissa, the
    /// high 8 bits give the shift exponent `e` such that
    /// `target = mantissa << (8 * (e - 3))`.
    pub fn target_difficulty(bits: u32) -> U256 {
        let exponent = bits >> 24;
        let mantissa = U256::from_u32(bits & 0x00FF_FFFF);
        if exponent <= 3 {
            mantissa.shr(8 * (3 - exponent))
        } else {
            mantissa.shl(8 * (exponent - 3))
        }
    }

    /// `true` iff the big-endian integer value of this header's hash is at
    /// most the decoded target for `bits`.
    pub fn valid_proof_of_work(&self) -> bool {
        let target = Self::target_difficulty(self.bits);
        let hash_value = U256::from_be_bytes(self.hash().to_be_bytes());
        hash_value <= target
    }

    /// Rejects headers timestamped more than [`crate::config::MAX_TIME_OFFSET`]
    /// seconds into the future relative to `now`.
    pub fn valid_timestamp(&self, now: u32) -> bool {
        self.time <= now.saturating_add(crate::config::MAX_TIME_OFFSET)
    }

    /// Cumulative work contributed by a single block with this `bits` value:
    /// `floor(2^256 / (target + 1))`.
    pub fn work_for(bits: u32) -> U256 {
        let target = Self::target_difficulty(bits);
        match target.checked_add_one() {
            // target + 1 overflows 256 bits only when target == U256::MAX;
            // the divisor is then conceptually 2^256, and
            // floor(2^256 / 2^256) == 1.
            None => U256::from_u8(1),
            Some(divisor) => U256::div_two_pow_256(divisor),
        }
    }
}
