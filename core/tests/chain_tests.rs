//! End-to-end scenarios against the public `Blockchain` API: genesis
//! bootstrap, adjacency/double-mine/signature rejection, transfers, and
//! reorgs.

use ed25519_dalek::{Keypair, PublicKey, SecretKey};
use pixelchain_core::config::{Config, CURRENT_VERSION, GENESIS_OWNER_SEED, MIN_DIFFICULTY_BITS};
use pixelchain_core::{
    Block, BlockHeader, Blockchain, ChainError, Error, MemoryBlockStore, MemoryTransactionStore,
    Position, Transaction, TransactionBuilder,
};

fn keypair(seed: u8) -> Keypair {
    let secret = SecretKey::from_bytes(&[seed; 32]).unwrap();
    let public = PublicKey::from(&secret);
    Keypair { secret, public }
}

fn genesis_keypair() -> Keypair {
    let secret = SecretKey::from_bytes(&GENESIS_OWNER_SEED).unwrap();
    let public = PublicKey::from(&secret);
    Keypair { secret, public }
}

fn new_chain() -> Blockchain<MemoryBlockStore, MemoryTransactionStore> {
    Blockchain::new(MemoryBlockStore::new(), MemoryTransactionStore::new(), Config::default())
}

/// Builds a single-coinbase block on top of `parent`, at `(x, y)`, owned by
/// `owner`, using an easy fixed target so tests never need real mining.
fn coinbase_block(parent: &Block, owner: &Keypair, x: i32, y: i32, nonce: u32) -> Block {
    let coinbase = TransactionBuilder::new()
        .at(x, y)
        .to(owner.public)
        .colored(0xFF00_00FF)
        .unwrap()
        .build();
    let merkle_root = Block::merkle_root(std::slice::from_ref(&coinbase));
    Block {
        header: BlockHeader {
            version: CURRENT_VERSION as u32,
            height: parent.header.height + 1,
            time: parent.header.time + 1,
            bits: MIN_DIFFICULTY_BITS,
            prev_hash: parent.hash(),
            merkle_root,
            nonce,
        },
        transactions: vec![coinbase],
    }
}

/// S1 — genesis: the fixed genesis block admits cleanly and becomes the tip
/// at height zero with no prior chain.
#[test]
fn s1_genesis_admits() {
    let mut chain = new_chain();
    let genesis = Block::genesis();
    let result = chain.propose_new_block(genesis.clone()).unwrap();
    assert_eq!(result.confirmed, vec![genesis.hash()]);
    assert_eq!(chain.get_current_height(), 0);
    assert_eq!(chain.pixel_at(&Position::new(0, 0)).unwrap().color, genesis.transactions[0].color);
}

/// S2 — adjacency reject: a coinbase mined at a position not adjacent to
/// any existing pixel is refused.
#[test]
fn s2_non_adjacent_coinbase_rejected() {
    let mut chain = new_chain();
    let genesis = Block::genesis();
    chain.propose_new_block(genesis.clone()).unwrap();

    let stray = coinbase_block(&genesis, &keypair(1), 7, 7, 1);
    let err = chain.propose_new_block(stray).unwrap_err();
    assert!(matches!(err, Error::Chain(ChainError::NonAdjacentCoinbase)));
}

/// S3 — double-mine reject: once a position has been mined it cannot be
/// mined again by a later block.
#[test]
fn s3_double_mine_rejected() {
    let mut chain = new_chain();
    let genesis = Block::genesis();
    chain.propose_new_block(genesis.clone()).unwrap();

    let first = coinbase_block(&genesis, &keypair(1), 1, 0, 1);
    chain.propose_new_block(first).unwrap();

    let second = coinbase_block(&genesis, &keypair(2), 1, 0, 2);
    let err = chain.propose_new_block(second).unwrap_err();
    assert!(matches!(err, Error::Chain(ChainError::PixelAlreadyMined)));
}

/// S4 — transfer: a signed transaction moves an already-mined pixel to a
/// new owner and the chain's pixel map reflects it after confirmation.
#[test]
fn s4_transfer_moves_ownership() {
    let mut chain = new_chain();
    let genesis = Block::genesis();
    chain.propose_new_block(genesis.clone()).unwrap();

    let owner = genesis_keypair();
    let recipient = keypair(2);
    let filler = TransactionBuilder::new()
        .at(1, 0)
        .to(keypair(1).public)
        .colored(1)
        .unwrap()
        .build();
    let mut transfer = TransactionBuilder::new()
        .from(&genesis.transactions[0])
        .to(recipient.public)
        .colored(genesis.transactions[0].color.0)
        .unwrap()
        .build();
    transfer.sign(&owner);

    let merkle_root = Block::merkle_root(&[filler.clone(), transfer.clone()]);
    let block = Block {
        header: BlockHeader {
            version: CURRENT_VERSION as u32,
            height: 1,
            time: genesis.header.time + 1,
            bits: MIN_DIFFICULTY_BITS,
            prev_hash: genesis.hash(),
            merkle_root,
            nonce: 1,
        },
        transactions: vec![filler, transfer],
    };
    chain.propose_new_block(block).unwrap();

    let owned = chain.pixel_at(&Position::new(0, 0)).unwrap();
    assert_eq!(owned.owner, recipient.public);
}

/// S5 — reorg: a competing branch with strictly more cumulative work
/// displaces the current tip, unconfirming the losing branch's pixels and
/// confirming the winner's.
#[test]
fn s5_reorg_switches_active_chain() {
    let mut chain = new_chain();
    let genesis = Block::genesis();
    chain.propose_new_block(genesis.clone()).unwrap();

    let light = coinbase_block(&genesis, &keypair(1), 1, 0, 1);
    chain.propose_new_block(light.clone()).unwrap();
    assert_eq!(chain.get_tip_block().unwrap(), light);

    // A competing two-block branch off genesis carries strictly more
    // cumulative work than `light` alone, even at the same target.
    let heavy1 = coinbase_block(&genesis, &keypair(2), 0, 1, 2);
    chain.propose_new_block(heavy1.clone()).unwrap();
    assert_eq!(chain.get_tip_block().unwrap(), light); // tied work, no reorg yet

    let heavy2 = coinbase_block(&heavy1, &keypair(3), 0, -1, 3);
    let result = chain.propose_new_block(heavy2.clone()).unwrap();

    assert_eq!(result.unconfirmed, vec![light.hash()]);
    assert_eq!(result.confirmed, vec![heavy1.hash(), heavy2.hash()]);
    assert!(chain.pixel_at(&Position::new(1, 0)).is_none());
    assert!(chain.pixel_at(&Position::new(0, 1)).is_some());
    assert!(chain.pixel_at(&Position::new(0, -1)).is_some());
}

/// S6 — bad signature: a transfer signed by anyone other than the pixel's
/// current owner is refused, and the block never confirms.
#[test]
fn s6_bad_signature_rejected() {
    let mut chain = new_chain();
    let genesis = Block::genesis();
    chain.propose_new_block(genesis.clone()).unwrap();

    let impostor = keypair(66);
    let recipient = keypair(2);
    let filler = TransactionBuilder::new()
        .at(1, 0)
        .to(keypair(1).public)
        .colored(1)
        .unwrap()
        .build();
    let mut transfer = TransactionBuilder::new()
        .from(&genesis.transactions[0])
        .to(recipient.public)
        .colored(genesis.transactions[0].color.0)
        .unwrap()
        .build();
    transfer.sign(&impostor);

    let merkle_root = Block::merkle_root(&[filler.clone(), transfer.clone()]);
    let block = Block {
        header: BlockHeader {
            version: CURRENT_VERSION as u32,
            height: 1,
            time: genesis.header.time + 1,
            bits: MIN_DIFFICULTY_BITS,
            prev_hash: genesis.hash(),
            merkle_root,
            nonce: 1,
        },
        transactions: vec![filler, transfer],
    };
    let err = chain.propose_new_block(block).unwrap_err();
    assert!(matches!(err, Error::Chain(ChainError::SignatureMismatch)));
    assert_eq!(chain.get_current_height(), 0);
}

/// Invariant: a confirmed-then-unconfirmed block leaves the pixel map
/// exactly as it was before the block was ever seen (reorg idempotence).
#[test]
fn reorg_restores_exact_prior_pixel_state() {
    let mut chain = new_chain();
    let genesis = Block::genesis();
    chain.propose_new_block(genesis.clone()).unwrap();

    let before: Vec<(Position, Transaction)> = vec![(
        Position::new(0, 0),
        chain.pixel_at(&Position::new(0, 0)).unwrap().clone(),
    )];

    let light = coinbase_block(&genesis, &keypair(1), 1, 0, 1);
    chain.propose_new_block(light.clone()).unwrap();

    let heavy1 = coinbase_block(&genesis, &keypair(2), 0, 1, 2);
    chain.propose_new_block(heavy1.clone()).unwrap();
    let heavy2 = coinbase_block(&heavy1, &keypair(3), 0, -1, 3);
    chain.propose_new_block(heavy2).unwrap();

    // (1, 0), only ever touched by the losing branch, must be gone again.
    assert!(chain.pixel_at(&Position::new(1, 0)).is_none());
    for (position, tx) in before {
        assert_eq!(chain.pixel_at(&position), Some(&tx));
    }
}

/// Invariant: the active chain's height always equals the number of
/// confirmed blocks back to genesis, and every height in that range
/// resolves to a real stored block.
#[test]
fn active_chain_heights_are_contiguous() {
    let mut chain = new_chain();
    let genesis = Block::genesis();
    chain.propose_new_block(genesis.clone()).unwrap();
    let mut tip = genesis;
    for i in 0..5 {
        let next = coinbase_block(&tip, &keypair(i + 10), i as i32 + 1, 0, i as u32 + 1);
        chain.propose_new_block(next.clone()).unwrap();
        tip = next;
    }
    assert_eq!(chain.get_current_height(), 5);
    let locator = chain.get_block_locator();
    assert_eq!(locator.first(), Some(&tip.hash()));
    for hash in &locator {
        assert!(chain.get_block(hash).is_some());
    }
}
