//! 32-byte hash newtype.
//!
//! Two string conventions exist for the same 32 bytes: the *internal*
//! little-endian form used on the wire and in storage, and the *display*
//! big-endian hex form used for external transaction/block ids. [`Hash`]
//! always stores the internal (little-endian) bytes; [`Hash::to_hex_be`] and
//! [`Hash::from_hex_be`] cross to the display form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

pub const HASH_LEN: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    pub const NULL: Hash = Hash([0u8; HASH_LEN]);

    pub fn from_le_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Hash(bytes)
    }

    pub fn as_le_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_be_bytes(self) -> [u8; HASH_LEN] {
        let mut be = self.0;
        be.reverse();
        be
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    /// Display form: big-endian hex, as used for external transaction/block ids.
    pub fn to_hex_be(&self) -> String {
        hex::encode(self.to_be_bytes())
    }

    pub fn from_hex_be(s: &str) -> Result<Self, DecodeError> {
        let mut bytes = hex::decode(s).map_err(|_| DecodeError::BadHash)?;
        if bytes.len() != HASH_LEN {
            return Err(DecodeError::BadHash);
        }
        bytes.reverse();
        let mut arr = [0u8; HASH_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Hash(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex_be())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_be())
    }
}
