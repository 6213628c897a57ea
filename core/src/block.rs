//! A block: an ordered, variable-count list of transactions plus a header.
//! The header's Merkle root must match the transaction list, and the first
//! transaction must be the coinbase.

use crate::codec::{write_varint, ByteReader, Decode, Encode};
use crate::config::{GENESIS_BITS, GENESIS_COLOR, GENESIS_NONCE, GENESIS_OWNER_SEED, GENESIS_POSITION, GENESIS_TIME, MAX_BLOCK_SIZE};
use crate::crypto::dhash;
use crate::error::{BlockError, Error, Result};
use crate::hash::Hash;
use crate::header::BlockHeader;
use crate::transaction::{Transaction, TransactionBuilder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Encode for Block {
    fn encode(&self, out: &mut Vec<u8>) {
        self.header.encode(out);
        write_varint(out, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.encode(out);
        }
    }
}

impl Decode for Block {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let header = BlockHeader::decode(r)?;
        let count = r.read_varint().map_err(Error::from)?;
        let mut transactions = Vec::with_capacity(count.min(1_000_000) as usize);
        for _ in 0..count {
            transactions.push(Transaction::decode(r)?);
        }
        Ok(Block { header, transactions })
    }
}

impl Block {
    /// Decodes a block, rejecting wire payloads over [`MAX_BLOCK_SIZE`]
    /// before doing any further parsing work.
    pub fn decode_checked(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_BLOCK_SIZE {
            return Err(BlockError::OversizeBlock.into());
        }
        let mut r = ByteReader::new(bytes);
        Block::decode(&mut r)
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn id(&self) -> String {
        self.header.id()
    }

    /// Bitcoin-style pairwise Merkle reduction: odd tails duplicate the last
    /// node. The empty list's root is the all-zero hash.
    pub fn merkle_root(transactions: &[Transaction]) -> Hash {
        if transactions.is_empty() {
            return Hash::NULL;
        }
        let mut level: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let left = pair[0];
                let right = if pair.len() == 2 { pair[1] } else { pair[0] };
                let mut buf = Vec::with_capacity(64);
                buf.extend_from_slice(left.as_le_bytes());
                buf.extend_from_slice(right.as_le_bytes());
                next.push(Hash::from_le_bytes(dhash(&buf)));
            }
            level = next;
        }
        level[0]
    }

    /// `true` iff `header.merkle_root` matches the recomputed root.
    pub fn valid_merkle_root(&self) -> bool {
        self.header.merkle_root == Self::merkle_root(&self.transactions)
    }

    /// Appends a transaction and recomputes the header's Merkle root.
    /// A miner-side convenience; not on the validation path.
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
        self.header.merkle_root = Self::merkle_root(&self.transactions);
    }

    /// Structural self-consistency: non-empty, coinbase first, Merkle root
    /// matches. Chain-level rules (adjacency, ancestry, signatures) are the
    /// engine's job, not this type's.
    pub fn check_structure(&self) -> core::result::Result<(), BlockError> {
        let coinbase = self.transactions.first().ok_or(BlockError::EmptyTransactions)?;
        if !coinbase.is_coinbase() {
            return Err(BlockError::CoinbaseNotFirst);
        }
        if !self.valid_merkle_root() {
            return Err(BlockError::InvalidMerkleRoot);
        }
        Ok(())
    }

    /// The fixed genesis block: a coinbase at
    /// `(0, 0)` with a known owner and color, height 0, `prevHash` null.
    pub fn genesis() -> Block {
        use ed25519_dalek::{PublicKey, SecretKey};

        let secret = SecretKey::from_bytes(&GENESIS_OWNER_SEED).expect("valid genesis seed");
        let owner = PublicKey::from(&secret);
        let coinbase = TransactionBuilder::new()
            .at(GENESIS_POSITION.0, GENESIS_POSITION.1)
            .to(owner)
            .colored(GENESIS_COLOR)
            .expect("genesis color is non-zero")
            .build();
        let merkle_root = Self::merkle_root(std::slice::from_ref(&coinbase));
        Block {
            header: BlockHeader {
                version: 1,
                height: 0,
                time: GENESIS_TIME,
                bits: GENESIS_BITS,
                prev_hash: Hash::NULL,
                merkle_root,
                nonce: GENESIS_NONCE,
            },
            transactions: vec![coinbase],
        }
    }
}
