//! Consensus constants and runtime configuration for the **pixelchain**
//! core crate.
//!
//! The numeric constants are fixed consensus rules; [`Config`]
//! bundles the handful of values a host process may reasonably want to
//! override (network name, reorg depth, block size ceiling) behind the same
//! fluent builder pattern used for its own tunables.

use serde::{Deserialize, Serialize};

/// Current transaction/wire version.
pub const CURRENT_VERSION: u8 = 1;

/// Compact-target `bits` used when a caller does not specify one.
pub const DEFAULT_BITS: u32 = 0x207f_ffff;

/// The loosest target this `bits` encoding can express (exponent 32,
/// mantissa `0xFFFFFF`): every hash except those in the bottom `1/2^24` of
/// the 256-bit space satisfies it. Used by fixture blocks that need a
/// proof-of-work check to pass without actually mining.
pub const MIN_DIFFICULTY_BITS: u32 = 0x20ff_ffff;

/// A header timestamped more than this many seconds in the future is invalid.
pub const MAX_TIME_OFFSET: u32 = 7_200;

/// Reorgs whose common ancestor lies deeper than this are refused.
pub const MAX_REWIND: u32 = 100;

/// Maximum serialized block size, in bytes.
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

/// Genesis block constants.
pub const GENESIS_BITS: u32 = 0x1e0f_ffff;
pub const GENESIS_TIME: u32 = 1_433_037_823;
pub const GENESIS_NONCE: u32 = 586_081;
pub const GENESIS_COLOR: u32 = 0x1337_1337;
pub const GENESIS_POSITION: (i32, i32) = (0, 0);

/// Seed for the genesis coinbase's owner keypair. Ed245519 keys are raw
/// 32-byte curve points, not a compressed-secp256k1 encoding some chains'
/// example literal (`0x0300...9fa02`) uses, so this crate fixes a
/// deterministic seed instead of reproducing that exact byte string — see
/// DESIGN.md.
pub const GENESIS_OWNER_SEED: [u8; 32] = [0x13; 32];

/// Runtime configuration shared across the crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Human-readable name identifying the network (e.g. "main", "test").
    pub network: String,

    /// Reorgs deeper than this are refused (defaults to [`MAX_REWIND`]).
    pub max_rewind: u32,

    /// Maximum serialized block size in bytes (defaults to [`MAX_BLOCK_SIZE`]).
    pub max_block_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: "main".into(),
            max_rewind: MAX_REWIND,
            max_block_size: MAX_BLOCK_SIZE,
        }
    }
}

/// Fluent builder for [`Config`].
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    /// Starts a new builder pre-populated with [`Config::default`].
    pub fn new() -> Self {
        Self {
            inner: Config::default(),
        }
    }

    pub fn network<S: Into<String>>(mut self, name: S) -> Self {
        self.inner.network = name.into();
        self
    }

    pub fn max_rewind(mut self, blocks: u32) -> Self {
        self.inner.max_rewind = blocks;
        self
    }

    pub fn max_block_size(mut self, bytes: usize) -> Self {
        self.inner.max_block_size = bytes;
        self
    }

    /// Consumes the builder returning an immutable configuration value.
    pub fn finish(self) -> Config {
        self.inner
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .network("test")
            .max_rewind(10)
            .max_block_size(2_000)
            .finish();
        assert_eq!(cfg.network, "test");
        assert_eq!(cfg.max_rewind, 10);
        assert_eq!(cfg.max_block_size, 2_000);
    }

    #[test]
    fn default_matches_consensus_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.max_rewind, MAX_REWIND);
        assert_eq!(cfg.max_block_size, MAX_BLOCK_SIZE);
    }
}
