//! The blockchain engine: a reorg-aware tree of blocks, fork choice by
//! cumulative work, and the live pixel map the active chain implies.
//!
//! Everything here is single-writer and synchronous: callers
//! serialize access to a `Blockchain` themselves, typically behind one
//! queue or mutex per chain instance.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::config::Config;
use crate::error::{BlockError, ChainError, Result, TransactionError};
use crate::hash::Hash;
use crate::store::{BlockStore, TransactionStore};
use crate::transaction::{Position, Transaction};
use crate::u256::U256;

/// Seconds since the Unix epoch, used to reject headers timestamped too far
/// into the future.
fn now_unix() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs() as u32
}

/// Resolves a non-coinbase transaction's chaining contract against the
/// transaction that currently holds its position: the referenced `input`
/// hash must match, and the signature must verify against that holder.
fn check_chained_transaction(
    tx: &Transaction,
    previous: &Transaction,
) -> core::result::Result<(), TransactionError> {
    if tx.input != previous.hash() {
        return Err(TransactionError::PositionConflict);
    }
    tx.check_signature(&previous.owner)
}

/// Observes confirm/unconfirm transitions as the active chain changes.
/// Invoked strictly after the corresponding mutation of the pixel map, in
/// the order blocks are confirmed or unconfirmed.
pub trait ChainListener {
    fn on_confirm(&mut self, _block: &Block) {}
    fn on_unconfirm(&mut self, _block: &Block) {}
}

/// The hashes unconfirmed and confirmed by a single [`Blockchain::propose_new_block`]
/// call, in the order the transitions happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposeResult {
    pub unconfirmed: Vec<Hash>,
    pub confirmed: Vec<Hash>,
}

/// Serializable snapshot of everything a [`Blockchain`] tracks beyond its
/// stores — suitable for persisting and later restoring chain state without
/// replaying every block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainSnapshot {
    pub work: HashMap<Hash, U256>,
    pub prev: HashMap<Hash, Hash>,
    pub height: HashMap<Hash, u32>,
    pub hash_by_height: HashMap<u32, Hash>,
    pub next: HashMap<Hash, Hash>,
    pub tip: Hash,
    pub pixels: HashMap<Position, Transaction>,
    pub undo_log: HashMap<Hash, Vec<(Position, Option<Transaction>)>>,
}

/// A block tree plus the pixel map the active chain (the path from the
/// genesis to [`Self::tip`]) implies. Blocks that lose a fork stay in
/// `block_store`/`tx_store` and in the `work`/`prev` indices, but are no
/// longer reachable through `next`/`hash_by_height`.
pub struct Blockchain<B: BlockStore, T: TransactionStore> {
    block_store: B,
    tx_store: T,
    config: Config,

    work: HashMap<Hash, U256>,
    prev: HashMap<Hash, Hash>,
    height: HashMap<Hash, u32>,
    hash_by_height: HashMap<u32, Hash>,
    next: HashMap<Hash, Hash>,
    tip: Hash,

    pixels: HashMap<Position, Transaction>,
    undo_log: HashMap<Hash, Vec<(Position, Option<Transaction>)>>,

    listeners: Vec<Box<dyn ChainListener>>,
}

impl<B: BlockStore, T: TransactionStore> Blockchain<B, T> {
    pub fn new(block_store: B, tx_store: T, config: Config) -> Self {
        Blockchain {
            block_store,
            tx_store,
            config,
            work: HashMap::new(),
            prev: HashMap::new(),
            height: HashMap::new(),
            hash_by_height: HashMap::new(),
            next: HashMap::new(),
            tip: Hash::NULL,
            pixels: HashMap::new(),
            undo_log: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn register_listener(&mut self, listener: Box<dyn ChainListener>) {
        self.listeners.push(listener);
    }

    /// `true` iff `hash` is [`Hash::NULL`] or a block this chain already has
    /// work/parent data for (not necessarily on the active chain).
    pub fn has_data(&self, hash: &Hash) -> bool {
        hash.is_null() || self.work.contains_key(hash)
    }

    pub fn get_current_height(&self) -> i64 {
        self.height_of(&self.tip)
    }

    pub fn get_block(&self, hash: &Hash) -> Option<Block> {
        self.block_store.get(hash)
    }

    pub fn get_tip_block(&self) -> Option<Block> {
        if self.tip.is_null() {
            None
        } else {
            self.block_store.get(&self.tip)
        }
    }

    pub fn pixel_at(&self, position: &Position) -> Option<&Transaction> {
        self.pixels.get(position)
    }

    /// Hashes of the 10 most recent active-chain blocks, then hashes at
    /// exponentially increasing height gaps (1, 2, 4, 8, ...) down to height
    /// zero. Used to describe this chain's tip to a peer without sending
    /// every height.
    pub fn get_block_locator(&self) -> Vec<Hash> {
        let mut locator = Vec::new();
        if self.tip.is_null() {
            return locator;
        }
        let mut height = self.height_of(&self.tip);
        let mut step: i64 = 1;
        let mut emitted = 0u32;
        while height >= 0 {
            if let Some(hash) = self.hash_by_height.get(&(height as u32)) {
                locator.push(*hash);
            }
            if height == 0 {
                break;
            }
            emitted += 1;
            if emitted < 10 {
                height -= 1;
            } else {
                height -= step.min(height);
                step *= 2;
            }
        }
        locator
    }

    /// Validates and, on success, admits `block`: stores it, records its
    /// cumulative work, and reorganizes the active chain if the new block's
    /// branch now outweighs the current tip.
    pub fn propose_new_block(&mut self, block: Block) -> Result<ProposeResult> {
        let hash = block.hash();
        if self.work.contains_key(&hash) {
            tracing::debug!(block = %hash, "block already admitted, ignoring");
            return Ok(ProposeResult::default());
        }

        self.check_valid_block(&block)?;

        let prev_hash = block.header.prev_hash;
        let work = self
            .work_of(&prev_hash)
            .add(crate::header::BlockHeader::work_for(block.header.bits));

        // Resolve any reorg before recording anything: if it fails (e.g. the
        // common ancestor lies deeper than the configured rewind limit), the
        // block is refused with no trace left in the store or indices.
        let result = if work > self.work_of(&self.tip) {
            let (unconfirmed, confirmed) = self.reorg_to(hash, &block)?;
            ProposeResult { unconfirmed, confirmed }
        } else {
            ProposeResult::default()
        };

        self.block_store.set(block.clone());
        for tx in &block.transactions {
            self.tx_store.set(tx.clone());
        }
        self.prev.insert(hash, prev_hash);
        self.work.insert(hash, work);
        tracing::debug!(block = %hash, height = block.header.height, ?work, "admitted block");

        Ok(result)
    }

    pub fn is_valid_block(&self, block: &Block) -> bool {
        self.check_valid_block(block).is_ok()
    }

    /// Structural checks plus everything that depends on chain state: known
    /// parent, coinbase adjacency (except for height-zero bootstrap blocks),
    /// unmined coinbase position, and a valid chained signature for every
    /// other transaction.
    pub fn check_valid_block(&self, block: &Block) -> Result<()> {
        block.check_structure()?;
        if block.to_bytes().len() > self.config.max_block_size {
            return Err(crate::error::BlockError::OversizeBlock.into());
        }

        let prev_hash = block.header.prev_hash;
        if !self.has_data(&prev_hash) {
            return Err(ChainError::UnknownParent.into());
        }

        let coinbase = &block.transactions[0];
        if self.pixels.contains_key(&coinbase.position) {
            return Err(ChainError::PixelAlreadyMined.into());
        }
        if block.header.height != 0 {
            let existing: Vec<Position> = self.pixels.keys().copied().collect();
            if coinbase.is_adjacent(&existing).is_none() {
                return Err(ChainError::NonAdjacentCoinbase.into());
            }

            // The genesis bootstrap block is a fixed, trusted constant
            // rather than an actually-mined header; only non-genesis blocks
            // are held to their declared proof-of-work target.
            if !block.header.valid_proof_of_work() {
                return Err(BlockError::InvalidProofOfWork.into());
            }
        }
        if !block.header.valid_timestamp(now_unix()) {
            return Err(BlockError::InvalidTimestamp.into());
        }

        // Previous holder for a position resolves either to an earlier
        // transaction in this same block, or to the pixel's current holder.
        let mut scratch: HashMap<Position, Transaction> = HashMap::new();
        scratch.insert(coinbase.position, coinbase.clone());
        for tx in block.transactions.iter().skip(1) {
            let previous = scratch
                .get(&tx.position)
                .cloned()
                .or_else(|| self.pixels.get(&tx.position).cloned())
                .ok_or(TransactionError::MissingPreviousTx)
                .map_err(|_| ChainError::SignatureMismatch)?;
            check_chained_transaction(tx, &previous).map_err(|_| ChainError::SignatureMismatch)?;
            scratch.insert(tx.position, tx.clone());
        }
        Ok(())
    }

    /// Discards `work`/`prev` entries for blocks that have fallen more than
    /// `MAX_REWIND` behind the tip and are not on the path back to the
    /// cutoff height — they can no longer become a reorg's common ancestor.
    pub fn prune(&mut self) {
        if self.tip.is_null() {
            return;
        }
        let tip_height = self.height_of(&self.tip);
        let cutoff = tip_height - self.config.max_rewind as i64;

        let mut keep: HashSet<Hash> = HashSet::new();
        let mut cursor = self.tip;
        loop {
            keep.insert(cursor);
            if cursor.is_null() {
                break;
            }
            if self.height_of(&cursor) <= cutoff {
                break;
            }
            match self.prev.get(&cursor) {
                Some(p) => cursor = *p,
                None => break,
            }
        }

        let stale: Vec<Hash> = self
            .work
            .keys()
            .filter(|h| !keep.contains(h))
            .copied()
            .collect();
        for h in stale {
            self.work.remove(&h);
            self.prev.remove(&h);
        }
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            work: self.work.clone(),
            prev: self.prev.clone(),
            height: self.height.clone(),
            hash_by_height: self.hash_by_height.clone(),
            next: self.next.clone(),
            tip: self.tip,
            pixels: self.pixels.clone(),
            undo_log: self.undo_log.clone(),
        }
    }

    pub fn restore(snapshot: ChainSnapshot, block_store: B, tx_store: T, config: Config) -> Self {
        Blockchain {
            block_store,
            tx_store,
            config,
            work: snapshot.work,
            prev: snapshot.prev,
            height: snapshot.height,
            hash_by_height: snapshot.hash_by_height,
            next: snapshot.next,
            tip: snapshot.tip,
            pixels: snapshot.pixels,
            undo_log: snapshot.undo_log,
            listeners: Vec::new(),
        }
    }

    fn work_of(&self, hash: &Hash) -> U256 {
        if hash.is_null() {
            U256::ZERO
        } else {
            self.work.get(hash).copied().unwrap_or(U256::ZERO)
        }
    }

    /// -1 for [`Hash::NULL`] (the implicit parent of height 0), the tracked
    /// height otherwise.
    fn height_of(&self, hash: &Hash) -> i64 {
        if hash.is_null() {
            -1
        } else {
            *self
                .height
                .get(hash)
                .expect("height_of called on a block outside the active chain") as i64
        }
    }

    /// Walks the new block's branch back to its first ancestor already on
    /// the active chain, then unconfirms the old branch (newest first) and
    /// confirms the new one (oldest first) down to that common ancestor.
    fn reorg_to(&mut self, new_tip: Hash, new_tip_block: &Block) -> Result<(Vec<Hash>, Vec<Hash>)> {
        let mut new_branch = vec![new_tip];
        let mut cursor = new_tip_block.header.prev_hash;
        while !cursor.is_null() && !self.height.contains_key(&cursor) {
            new_branch.push(cursor);
            cursor = *self
                .prev
                .get(&cursor)
                .ok_or(ChainError::UnknownParent)?;
        }
        let ancestor = cursor;

        let ancestor_height = self.height_of(&ancestor);
        let tip_height = self.height_of(&self.tip);
        if tip_height - ancestor_height > self.config.max_rewind as i64 {
            return Err(ChainError::ReorgTooDeep.into());
        }

        let mut old_branch = Vec::new();
        let mut old_cursor = self.tip;
        while old_cursor != ancestor {
            old_branch.push(old_cursor);
            old_cursor = *self
                .prev
                .get(&old_cursor)
                .expect("prev must be recorded for every active-chain block");
        }

        let mut unconfirmed = Vec::with_capacity(old_branch.len());
        for h in &old_branch {
            let block = self
                .block_store
                .get(h)
                .expect("stored block for every active-chain hash");
            self.unconfirm(&block)?;
            unconfirmed.push(*h);
        }

        let mut confirmed = Vec::with_capacity(new_branch.len());
        for h in new_branch.iter().rev() {
            let block = if *h == new_tip {
                new_tip_block.clone()
            } else {
                self.block_store
                    .get(h)
                    .expect("stored block for every block on the new branch")
            };
            self.confirm(&block)?;
            confirmed.push(*h);
        }

        Ok((unconfirmed, confirmed))
    }

    /// Extends the active chain by one block: `block.header.prev_hash` must
    /// be the current tip.
    fn confirm(&mut self, block: &Block) -> Result<()> {
        let hash = block.hash();
        let prev = block.header.prev_hash;
        if self.tip != prev {
            return Err(ChainError::NonContiguousConfirm.into());
        }

        let new_height = self.height_of(&prev) + 1;
        self.tip = hash;
        self.height.insert(hash, new_height as u32);
        self.next.insert(prev, hash);
        self.hash_by_height.insert(new_height as u32, hash);

        let mut undo = Vec::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            let previous = self.pixels.insert(tx.position, tx.clone());
            undo.push((tx.position, previous));
        }
        self.undo_log.insert(hash, undo);

        tracing::debug!(block = %hash, height = new_height, "confirmed block");
        for listener in &mut self.listeners {
            listener.on_confirm(block);
        }
        Ok(())
    }

    /// Retracts the active chain's current tip by one block: `block` must
    /// be that tip.
    fn unconfirm(&mut self, block: &Block) -> Result<()> {
        let hash = block.hash();
        if self.tip != hash {
            return Err(ChainError::NonTipUnconfirm.into());
        }

        let prev = block.header.prev_hash;
        let old_height = self
            .height
            .remove(&hash)
            .expect("height must be recorded for the current tip");
        self.next.remove(&prev);
        self.hash_by_height.remove(&old_height);
        self.tip = prev;

        let undo = self
            .undo_log
            .remove(&hash)
            .expect("undo log must be recorded for a confirmed block");
        for (position, previous) in undo.into_iter().rev() {
            match previous {
                Some(tx) => {
                    self.pixels.insert(position, tx);
                }
                None => {
                    self.pixels.remove(&position);
                }
            }
        }

        tracing::debug!(block = %hash, height = old_height, "unconfirmed block");
        for listener in &mut self.listeners {
            listener.on_unconfirm(block);
        }
        Ok(())
    }
}
