//! Error types for the **pixelchain** core crate.
//!
//! Every high-level operation returns [`crate::Result`], a convenient alias
//! for `core::result::Result<T, Error>`. `Error` aggregates one family per
//! layer (codec, transaction, block, chain, crypto); lower-level errors are
//! mapped into their family before bubbling up to callers.

use thiserror::Error;

/// Errors raised while decoding the binary wire format.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("truncated input")]
    TruncatedInput,

    #[error("non-minimal or malformed varint encoding")]
    BadVarInt,

    #[error("invalid public key encoding")]
    BadPublicKey,

    #[error("invalid hash encoding")]
    BadHash,
}

/// Errors raised while building or validating a single transaction.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TransactionError {
    #[error("transaction is missing a signature")]
    MissingSignature,

    #[error("transaction signature does not verify")]
    InvalidSignature,

    #[error("referenced previous transaction was not found")]
    MissingPreviousTx,

    #[error("pixel color must be non-zero")]
    InvalidColor,

    #[error("position already mutated earlier in this block")]
    PositionConflict,
}

/// Errors raised while validating a block's internal structure.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BlockError {
    #[error("merkle root does not match the transaction list")]
    InvalidMerkleRoot,

    #[error("block has no transactions")]
    EmptyTransactions,

    #[error("first transaction in block is not a coinbase")]
    CoinbaseNotFirst,

    #[error("block exceeds the maximum serialized size")]
    OversizeBlock,

    #[error("block hash does not satisfy its declared proof-of-work target")]
    InvalidProofOfWork,

    #[error("block timestamp is too far in the future")]
    InvalidTimestamp,
}

/// Errors raised by the blockchain engine while admitting or reorganizing.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ChainError {
    #[error("parent block is unknown")]
    UnknownParent,

    #[error("coinbase pixel is not adjacent to an existing pixel")]
    NonAdjacentCoinbase,

    #[error("pixel is already mined")]
    PixelAlreadyMined,

    #[error("transaction signature does not match the previous owner")]
    SignatureMismatch,

    #[error("confirm target is not contiguous with the current tip")]
    NonContiguousConfirm,

    #[error("unconfirm target is not the current tip")]
    NonTipUnconfirm,

    #[error("reorg common ancestor lies deeper than MAX_REWIND")]
    ReorgTooDeep,
}

/// Errors raised by the signature/digest adapter.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CryptoError {
    #[error("invalid signature encoding")]
    BadSignatureEncoding,
}

/// Crate-wide error, aggregating every family above.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
