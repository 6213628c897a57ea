//! Content-addressed lookup of blocks and transactions by hash.
//!
//! `BlockStore`/`TransactionStore` are the abstract seam this crate
//! needs: the engine only ever calls `get`/`set`/`has` and performs no
//! cache eviction of its own. The `Memory*` implementations below are the
//! reference store used by the engine's own tests; file-backed or networked
//! stores are out of scope for this crate and implement the
//! same traits.

use std::collections::HashMap;

use crate::block::Block;
use crate::hash::Hash;
use crate::transaction::Transaction;

pub trait BlockStore {
    fn get(&self, hash: &Hash) -> Option<Block>;
    fn set(&mut self, block: Block);
    fn has(&self, hash: &Hash) -> bool;
}

pub trait TransactionStore {
    fn get(&self, hash: &Hash) -> Option<Transaction>;
    fn set(&mut self, tx: Transaction);
    fn has(&self, hash: &Hash) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: HashMap<Hash, Block>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryBlockStore {
    fn get(&self, hash: &Hash) -> Option<Block> {
        self.blocks.get(hash).cloned()
    }

    fn set(&mut self, block: Block) {
        self.blocks.insert(block.header.hash(), block);
    }

    fn has(&self, hash: &Hash) -> bool {
        self.blocks.contains_key(hash)
    }
}

#[derive(Debug, Default)]
pub struct MemoryTransactionStore {
    transactions: HashMap<Hash, Transaction>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn get(&self, hash: &Hash) -> Option<Transaction> {
        self.transactions.get(hash).cloned()
    }

    fn set(&mut self, tx: Transaction) {
        self.transactions.insert(tx.hash(), tx);
    }

    fn has(&self, hash: &Hash) -> bool {
        self.transactions.contains_key(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CURRENT_VERSION;
    use crate::transaction::{Color, Position};
    use ed25519_dalek::{PublicKey, SecretKey};

    fn sample_tx() -> Transaction {
        let secret = SecretKey::from_bytes(&[9u8; 32]).unwrap();
        let owner = PublicKey::from(&secret);
        Transaction {
            version: CURRENT_VERSION,
            input: Hash::NULL,
            position: Position::new(0, 0),
            color: Color(1),
            owner,
            signature: None,
        }
    }

    #[test]
    fn memory_transaction_store_round_trips() {
        let mut store = MemoryTransactionStore::new();
        let tx = sample_tx();
        let hash = tx.hash();
        assert!(!store.has(&hash));
        store.set(tx.clone());
        assert!(store.has(&hash));
        assert_eq!(store.get(&hash), Some(tx));
    }
}
