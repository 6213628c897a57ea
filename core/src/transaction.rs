//! Pixel-transfer transaction: the only kind of value transfer this chain
//! knows. A transaction mints a pixel (coinbase, `input == NULL_HASH`) or
//! moves an already-mined pixel to a new owner, proven by a signature
//! chaining from the previous holder.

use ed25519_dalek::{Keypair, PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::codec::{
    write_bytes, write_i32_le, write_u32_le, write_u8, ByteReader, Decode, Encode,
};
use crate::config::CURRENT_VERSION;
use crate::crypto::{self, dhash};
use crate::error::{DecodeError, Error, Result, TransactionError};
use crate::hash::Hash;

/// Integer grid coordinate of a single pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan_distance(&self, other: &Position) -> i64 {
        (self.x as i64 - other.x as i64).abs() + (self.y as i64 - other.y as i64).abs()
    }

    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.manhattan_distance(other) == 1
    }
}

/// `0xRRGGBBAA` packed pixel color. Non-zero is enforced by the builder on
/// mint, not by the wire codec — decoders must accept color `0` inbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

/// A single pixel mint or transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u8,
    /// Hash of the transaction that previously held this pixel, or
    /// [`Hash::NULL`] for a coinbase (mint).
    pub input: Hash,
    pub position: Position,
    pub color: Color,
    pub owner: PublicKey,
    pub signature: Option<Signature>,
}

impl Encode for Transaction {
    fn encode(&self, out: &mut Vec<u8>) {
        self.encode_preimage(out);
        match &self.signature {
            Some(sig) => {
                let bytes = sig.to_bytes();
                write_u8(out, bytes.len() as u8);
                write_bytes(out, &bytes);
            }
            None => write_u8(out, 0),
        }
    }
}

impl Decode for Transaction {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let version = r.read_u8()?;
        let input = Hash::from_le_bytes(r.read_array32()?);
        let x = r.read_i32_le()?;
        let y = r.read_i32_le()?;
        let color = r.read_u32_le()?;
        let owner_bytes = r.read_bytes(32)?;
        let owner = crypto::decode_public_key(owner_bytes)?;
        let sig_len = r.read_u8()? as usize;
        let signature = if sig_len == 0 {
            None
        } else {
            let sig_bytes = r.read_bytes(sig_len)?;
            Some(crypto::decode_signature(sig_bytes)?)
        };
        Ok(Transaction {
            version,
            input,
            position: Position::new(x, y),
            color: Color(color),
            owner,
            signature,
        })
    }
}

impl Transaction {
    /// Writes the layout up to (not including) the signature length/bytes —
    /// shared by the full encoding and the sighash preimage.
    fn encode_preimage(&self, out: &mut Vec<u8>) {
        write_u8(out, self.version);
        write_bytes(out, self.input.as_le_bytes());
        write_i32_le(out, self.position.x);
        write_i32_le(out, self.position.y);
        write_u32_le(out, self.color.0);
        write_bytes(out, self.owner.as_bytes());
    }

    /// Serialization with `sigLen == 0`, i.e. the signature bytes omitted.
    pub fn sighash_preimage(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_preimage(&mut out);
        write_u8(&mut out, 0);
        out
    }

    /// `dhash` of [`Self::sighash_preimage`] — the message that gets signed.
    pub fn sighash(&self) -> [u8; 32] {
        dhash(&self.sighash_preimage())
    }

    /// Identity hash: `dhash` of the full serialization, little-endian.
    pub fn hash(&self) -> Hash {
        Hash::from_le_bytes(dhash(&self.to_bytes()))
    }

    /// Display id: big-endian hex of [`Self::hash`].
    pub fn id(&self) -> String {
        self.hash().to_hex_be()
    }

    pub fn is_coinbase(&self) -> bool {
        self.input.is_null()
    }

    /// Signs the sighash digest with `keypair`, setting [`Self::signature`].
    pub fn sign(&mut self, keypair: &Keypair) {
        let digest = self.sighash();
        self.signature = Some(crypto::sign(keypair, &digest));
    }

    /// Validates this transaction's signature against `previous_owner`,
    /// returning the specific reason it failed.
    pub fn check_signature(
        &self,
        previous_owner: &PublicKey,
    ) -> core::result::Result<(), TransactionError> {
        match &self.signature {
            None => Err(TransactionError::MissingSignature),
            Some(sig) => {
                if crypto::verify(previous_owner, &self.sighash(), sig) {
                    Ok(())
                } else {
                    Err(TransactionError::InvalidSignature)
                }
            }
        }
    }

    /// `true` iff this transaction carries a signature that verifies
    /// against `previous_owner` for this transaction's sighash.
    pub fn is_valid_signature(&self, previous_owner: &PublicKey) -> bool {
        self.check_signature(previous_owner).is_ok()
    }

    /// Returns the first of `positions` that is Manhattan-adjacent to this
    /// transaction's position, if any.
    pub fn is_adjacent(&self, positions: &[Position]) -> Option<Position> {
        positions
            .iter()
            .copied()
            .find(|p| self.position.is_adjacent(p))
    }
}

/// Builder enforcing the chaining contract: `from(prev)` (transfer) or
/// `at(x, y)` (mint), then `to(owner)` and `colored(c)`.
#[derive(Default)]
pub struct TransactionBuilder {
    input: Option<Hash>,
    position: Option<Position>,
    color: Option<Color>,
    owner: Option<PublicKey>,
    from_set: bool,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks this as a coinbase mint at a fixed position. Rejected once
    /// [`Self::from`] has already been called.
    pub fn at(mut self, x: i32, y: i32) -> Self {
        assert!(!self.from_set, "`at` cannot follow `from` on the same builder");
        self.position = Some(Position::new(x, y));
        self
    }

    /// Chains this transaction from a previously mined pixel: copies its
    /// position and references its hash as `input`.
    pub fn from(mut self, prev: &Transaction) -> Self {
        self.from_set = true;
        self.position = Some(prev.position);
        self.input = Some(prev.hash());
        self
    }

    pub fn to(mut self, owner: PublicKey) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn colored(mut self, color: u32) -> core::result::Result<Self, TransactionError> {
        if color == 0 {
            return Err(TransactionError::InvalidColor);
        }
        self.color = Some(Color(color));
        Ok(self)
    }

    /// Finalizes the unsigned transaction. Panics if `position` or `owner`
    /// were never set — a programming defect in the caller, not a runtime
    /// validation failure.
    pub fn build(self) -> Transaction {
        Transaction {
            version: CURRENT_VERSION,
            input: self.input.unwrap_or(Hash::NULL),
            position: self.position.expect("transaction position not set"),
            color: self.color.expect("transaction color not set"),
            owner: self.owner.expect("transaction owner not set"),
            signature: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_from_slice;
    use ed25519_dalek::SecretKey;

    fn keypair(seed: u8) -> Keypair {
        let secret = SecretKey::from_bytes(&[seed; 32]).expect("secret");
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn coinbase(owner: &Keypair) -> Transaction {
        TransactionBuilder::new()
            .at(0, 0)
            .to(owner.public)
            .colored(0x1337_1337)
            .unwrap()
            .build()
    }

    #[test]
    fn coinbase_has_null_input() {
        let owner = keypair(1);
        let tx = coinbase(&owner);
        assert!(tx.is_coinbase());
    }

    #[test]
    fn codec_round_trips() {
        let owner = keypair(1);
        let mut tx = coinbase(&owner);
        tx.sign(&owner); // coinbases aren't normally signed, but the codec must not care
        let bytes = tx.to_bytes();
        let back: Transaction = decode_from_slice(&bytes).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let alice = keypair(1);
        let bob = keypair(2);
        let genesis = coinbase(&alice);
        let mut transfer = TransactionBuilder::new()
            .from(&genesis)
            .to(bob.public)
            .colored(0x1337_1337)
            .unwrap()
            .build();
        transfer.sign(&alice);
        assert!(transfer.is_valid_signature(&alice.public));
        assert!(!transfer.is_valid_signature(&bob.public));
    }

    #[test]
    fn from_copies_position_and_links_input() {
        let alice = keypair(1);
        let bob = keypair(2);
        let genesis = coinbase(&alice);
        let transfer = TransactionBuilder::new()
            .from(&genesis)
            .to(bob.public)
            .colored(0x1337_1337)
            .unwrap()
            .build();
        assert_eq!(transfer.position, genesis.position);
        assert_eq!(transfer.input, genesis.hash());
    }

    #[test]
    fn colored_rejects_zero() {
        let owner = keypair(1);
        let err = TransactionBuilder::new()
            .at(1, 1)
            .to(owner.public)
            .colored(0)
            .unwrap_err();
        assert_eq!(err, TransactionError::InvalidColor);
    }

    #[test]
    #[should_panic(expected = "`at` cannot follow `from`")]
    fn at_after_from_panics() {
        let owner = keypair(1);
        let genesis = coinbase(&owner);
        let _ = TransactionBuilder::new().from(&genesis).at(5, 5);
    }

    #[test]
    fn is_adjacent_finds_first_match() {
        let owner = keypair(1);
        let tx = TransactionBuilder::new()
            .at(1, 0)
            .to(owner.public)
            .colored(1)
            .unwrap()
            .build();
        let candidates = [Position::new(5, 5), Position::new(0, 0), Position::new(9, 9)];
        assert_eq!(tx.is_adjacent(&candidates), Some(Position::new(0, 0)));
        assert_eq!(tx.is_adjacent(&[Position::new(5, 5)]), None);
    }

    #[test]
    fn decode_accepts_zero_color_inbound() {
        let owner = keypair(1);
        let tx = Transaction {
            version: CURRENT_VERSION,
            input: Hash::NULL,
            position: Position::new(0, 0),
            color: Color(0),
            owner: owner.public,
            signature: None,
        };
        let bytes = tx.to_bytes();
        let back: Transaction = decode_from_slice(&bytes).unwrap();
        assert_eq!(back.color, Color(0));
    }

    #[test]
    fn decode_rejects_truncated_bytes() {
        let owner = keypair(1);
        let tx = coinbase(&owner);
        let mut bytes = tx.to_bytes();
        bytes.truncate(bytes.len() - 1);
        let err = decode_from_slice::<Transaction>(&bytes).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::TruncatedInput)));
    }
}
