//! Signature/digest adapter. The curve and signature encoding are fixed to
//! Ed25519 (`ed25519-dalek`); every other component treats
//! `PublicKey`/`Signature` as opaque.

use ed25519_dalek::{Keypair, PublicKey, Signature, Signer, Verifier};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// `SHA256(SHA256(bytes))`.
pub fn dhash(bytes: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(bytes);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Deterministic Ed25519 signature over a 32-byte message digest.
pub fn sign(keypair: &Keypair, digest: &[u8; 32]) -> Signature {
    keypair.sign(digest)
}

/// `true` iff `signature` verifies against `public` for `digest`.
pub fn verify(public: &PublicKey, digest: &[u8; 32], signature: &Signature) -> bool {
    public.verify_strict(digest, signature).is_ok()
}

pub fn decode_signature(bytes: &[u8]) -> Result<Signature, CryptoError> {
    Signature::from_bytes(bytes).map_err(|_| CryptoError::BadSignatureEncoding)
}

pub fn decode_public_key(bytes: &[u8]) -> Result<PublicKey, crate::error::DecodeError> {
    PublicKey::from_bytes(bytes).map_err(|_| crate::error::DecodeError::BadPublicKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SecretKey;

    fn deterministic_keypair(seed: u8) -> Keypair {
        let secret = SecretKey::from_bytes(&[seed; 32]).expect("secret");
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    #[test]
    fn dhash_is_deterministic() {
        assert_eq!(dhash(b"pixel"), dhash(b"pixel"));
        assert_ne!(dhash(b"pixel"), dhash(b"pixels"));
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = deterministic_keypair(1);
        let digest = dhash(b"a transfer of one pixel");
        let sig = sign(&kp, &digest);
        assert!(verify(&kp.public, &digest, &sig));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let kp = deterministic_keypair(1);
        let other = deterministic_keypair(2);
        let digest = dhash(b"a transfer of one pixel");
        let sig = sign(&kp, &digest);
        assert!(!verify(&other.public, &digest, &sig));
    }

    #[test]
    fn deterministic_secret_produces_same_public_key() {
        let seed = [42u8; 32];
        let secret = SecretKey::from_bytes(&seed).unwrap();
        let public_a = PublicKey::from(&secret);
        let secret_b = SecretKey::from_bytes(&seed).unwrap();
        let public_b = PublicKey::from(&secret_b);
        assert_eq!(public_a.as_bytes(), public_b.as_bytes());
    }
}
