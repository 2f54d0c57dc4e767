//! The guardian signature engine.
//!
//! Guardians sign the double-Keccak digest of a VAA body with secp256k1. Signatures
//! use deterministic (RFC6979) nonce generation with low-S normalization, so signing
//! the same digest with the same key always yields the same `(r, s, recovery_id)`
//! triple and test vectors stay reproducible.
//!
//! Key custody is an injected capability: anything that can produce a recoverable
//! signature over a 32-byte digest (an in-memory key, a hardware wallet, an HSM)
//! implements [`GuardianSigner`]. [`GuardianKey`] is the in-memory implementation.

use k256::{
    ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use sha3::{Digest as Sha3Digest, Keccak256};

use crate::{Error, GuardianAddress, Signature};

/// A recoverable ECDSA signature over a 32-byte digest, scalars big-endian and zero
/// padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

/// Signing capability of a single guardian.
pub trait GuardianSigner {
    /// Produce a canonical recoverable signature over `digest`.
    fn sign_digest(&self, digest: [u8; 32]) -> Result<RecoverableSignature, Error>;

    /// The guardian's derived 20-byte address.
    fn address(&self) -> GuardianAddress;
}

/// An in-memory guardian secret key.
#[derive(Debug, Clone)]
pub struct GuardianKey {
    key: SigningKey,
}

impl GuardianKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let key =
            SigningKey::from_slice(bytes).map_err(|e| Error::InvalidGuardianKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Parse a hex-encoded secret key, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| Error::InvalidGuardianKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.key.verifying_key()
    }
}

impl GuardianSigner for GuardianKey {
    fn sign_digest(&self, digest: [u8; 32]) -> Result<RecoverableSignature, Error> {
        let (sig, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| Error::Signing(e.to_string()))?;

        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }

    fn address(&self) -> GuardianAddress {
        derive_address(&self.verifying_key())
    }
}

/// Derive a guardian's 20-byte address from its public key: Keccak256 over the
/// uncompressed (x, y) coordinates, low 20 bytes kept. Bit-for-bit identical to
/// Ethereum address derivation, which is how guardian identities are shared across
/// chains.
pub fn derive_address(key: &VerifyingKey) -> GuardianAddress {
    let point = key.to_encoded_point(false);
    let mut h = Keccak256::new();
    // Skip the 0x04 SEC1 tag, hash x || y.
    h.update(&point.as_bytes()[1..]);
    let hash: [u8; 32] = h.finalize().into();

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    GuardianAddress(address)
}

/// Sign `digest` with every signer in order, assigning guardian indices by
/// position. Fails if the set exceeds the single-byte index space.
pub fn sign_all<S: GuardianSigner>(
    digest: [u8; 32],
    signers: &[S],
) -> Result<Vec<Signature>, Error> {
    if signers.len() > u8::MAX.into() {
        return Err(Error::TooManySigners(signers.len()));
    }

    signers
        .iter()
        .enumerate()
        .map(|(index, signer)| {
            let sig = signer.sign_digest(digest)?;
            Ok(Signature {
                index: index as u8,
                r: sig.r,
                s: sig.s,
                recovery_id: sig.recovery_id,
            })
        })
        .collect()
}

/// Recover the address of the guardian that signed `digest`.
pub fn recover_signer(digest: [u8; 32], sig: &Signature) -> Result<GuardianAddress, Error> {
    let signature = EcdsaSignature::from_scalars(sig.r, sig.s)
        .map_err(|e| Error::Signing(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(sig.recovery_id)
        .ok_or_else(|| Error::Signing(format!("invalid recovery id {}", sig.recovery_id)))?;

    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| Error::Signing(e.to_string()))?;

    Ok(derive_address(&key))
}
