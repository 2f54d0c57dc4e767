//! VAA assembly and the chunked verification dispatch.
//!
//! Assembly packs version, guardian set index, signature count, the 66-byte
//! signature records and the body into the canonical wire buffer. On the consuming
//! side, some target virtual machines cap per-call argument size and compute, so a
//! signature set is split into contiguous chunks and verified one call at a time; a
//! final aggregation step checks the accumulated results against quorum before the
//! payload action is allowed to execute.
//!
//! Per VAA the flow is: `Unsigned -> Signed -> planned into steps ->
//! partially verified -> Verified | Rejected`. Both outcomes are terminal here;
//! retry policy, if any, lives with the chain submission collaborator.

use serde::{Deserialize, Serialize};
use wormhole_codec::Writer;

use crate::{
    sign, vaa, Address, Body, Chain, Error, GuardianAddress, GuardianSetInfo, Signature, Vaa,
};

/// What the consuming dispatch layer should do with a VAA once verified. Carried
/// through signing so consumers can match on it exhaustively.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Bootstrap a verifier with its initial guardian set.
    Init,
    /// Execute the governance action carried in the payload.
    Governance,
}

/// One logical message spread across a guardian set, ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedVaa {
    pub command: Command,
    pub version: u8,
    pub guardian_set_index: u32,
    pub body: Body,
}

impl UnsignedVaa {
    pub fn new(command: Command, guardian_set_index: u32, body: Body) -> Self {
        Self {
            command,
            version: vaa::VERSION,
            guardian_set_index,
            body,
        }
    }

    /// Sign with every signer in order (position == guardian index) and assemble
    /// the wire buffer.
    pub fn sign<S: sign::GuardianSigner>(&self, signers: &[S]) -> Result<SignedVaa, Error> {
        let body = self.body.serialize()?;
        let digest = vaa::digest(&body);

        let signatures = sign::sign_all(digest.secp256k_hash, signers)?;
        let keys = signers.iter().map(|s| s.address()).collect();
        let data = assemble(self.version, self.guardian_set_index, &signatures, &body)?;

        Ok(SignedVaa {
            command: self.command,
            guardian_set_index: self.guardian_set_index,
            signatures,
            keys,
            hash: digest.secp256k_hash,
            data,
            sequence: self.body.sequence,
            emitter_chain: self.body.emitter_chain,
            emitter_address: self.body.emitter_address,
        })
    }
}

/// A fully signed, wire-ready VAA. Produced once, immutable; consumed by the
/// dispatch layer to build verification call batches, then discarded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedVaa {
    pub command: Command,
    pub guardian_set_index: u32,
    /// Ascending by guardian index.
    pub signatures: Vec<Signature>,
    /// Signer addresses, same order as `signatures`.
    pub keys: Vec<GuardianAddress>,
    /// Double-Keccak digest of the body.
    pub hash: [u8; 32],
    /// The assembled wire buffer.
    pub data: Vec<u8>,
    pub sequence: u64,
    pub emitter_chain: Chain,
    pub emitter_address: Address,
}

impl SignedVaa {
    pub fn parse(&self) -> Result<Vaa, Error> {
        Vaa::parse(&self.data)
    }
}

/// Assemble the canonical wire buffer:
/// `version | guardian_set_index:u32 | count:u8 | signatures | body`.
///
/// Signatures supplied out of guardian index order are sorted; a duplicate index is
/// an error. The buffer is never assembled with an unsorted signature list, since
/// verifiers reject (or worse, mis-verify) out-of-order indices.
pub fn assemble(
    version: u8,
    guardian_set_index: u32,
    signatures: &[Signature],
    body: &[u8],
) -> Result<Vec<u8>, Error> {
    if signatures.len() > u8::MAX.into() {
        return Err(Error::TooManySigners(signatures.len()));
    }

    let mut ordered = signatures.to_vec();
    ordered.sort_by_key(|s| s.index);
    for pair in ordered.windows(2) {
        if pair[0].index == pair[1].index {
            return Err(Error::DuplicateGuardianIndex(pair[0].index));
        }
    }

    let mut w =
        Writer::with_capacity(Vaa::HEADER_LEN + ordered.len() * Signature::LEN + body.len());
    w.write_u8(version);
    w.write_u32(guardian_set_index);
    w.write_u8(ordered.len() as u8);
    for sig in &ordered {
        w.write_bytes(&sig.to_bytes());
    }
    w.write_bytes(body);
    Ok(w.into_vec())
}

/// One chunk of a signature set, sized for a single verifier call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationStep {
    /// Contiguous slice of the VAA's signatures.
    pub signatures: Vec<Signature>,
    /// The registered guardian keys matching `signatures`, same length and order.
    pub keys: Vec<GuardianAddress>,
    /// Size of the full guardian set, so the verifier can compute quorum
    /// independently of how the set was chunked.
    pub guardian_count: usize,
}

/// Split a signed VAA into `ceil(n / chunk_size)` verification steps against the
/// registered guardian set.
///
/// Each step receives a contiguous signature slice and the matching key slice; a
/// short final chunk is emitted as-is, never padded. Deterministic given the same
/// signature set and chunk size.
pub fn plan_verification_steps(
    vaa: &SignedVaa,
    guardian_set: &GuardianSetInfo,
    chunk_size: usize,
) -> Result<Vec<VerificationStep>, Error> {
    if chunk_size == 0 {
        return Err(Error::InvalidChunkSize);
    }

    let guardian_count = guardian_set.addresses.len();
    let mut keys = Vec::with_capacity(vaa.signatures.len());
    for sig in &vaa.signatures {
        let key = guardian_set
            .addresses
            .get(usize::from(sig.index))
            .copied()
            .ok_or(Error::GuardianIndexOutOfRange {
                index: sig.index,
                len: guardian_count,
            })?;
        keys.push(key);
    }

    let steps: Vec<VerificationStep> = vaa
        .signatures
        .chunks(chunk_size)
        .zip(keys.chunks(chunk_size))
        .map(|(signatures, keys)| VerificationStep {
            signatures: signatures.to_vec(),
            keys: keys.to_vec(),
            guardian_count,
        })
        .collect();

    tracing::debug!(
        steps = steps.len(),
        chunk_size,
        signatures = vaa.signatures.len(),
        guardians = guardian_count,
        "planned verification steps"
    );

    Ok(steps)
}

/// Verify one step locally: recover each signature against `hash` and count the
/// ones matching their expected guardian key. Mirrors what an on-chain verifier
/// does with a single chunk.
pub fn verify_step(step: &VerificationStep, hash: [u8; 32]) -> usize {
    step.signatures
        .iter()
        .zip(&step.keys)
        .filter(|(sig, key)| match sig.recover(hash) {
            Ok(address) => address == **key,
            Err(_) => false,
        })
        .count()
}

/// Aggregates chunk results and renders the terminal verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSession {
    total: usize,
    quorum: usize,
    steps_remaining: usize,
    verified: usize,
}

impl VerificationSession {
    pub fn new(guardian_set: &GuardianSetInfo, steps: usize) -> Self {
        Self {
            total: guardian_set.addresses.len(),
            quorum: guardian_set.quorum(),
            steps_remaining: steps,
            verified: 0,
        }
    }

    /// Record the verified-signature count of one completed step.
    pub fn record_step(&mut self, verified: usize) {
        self.verified += verified;
        self.steps_remaining = self.steps_remaining.saturating_sub(1);
    }

    pub fn is_complete(&self) -> bool {
        self.steps_remaining == 0
    }

    /// Terminal verdict once all steps have reported. Returns the verified count,
    /// or the quorum rejection — a protocol-level outcome, not a transport failure.
    pub fn finalize(self) -> Result<usize, Error> {
        if self.verified >= self.quorum {
            tracing::debug!(verified = self.verified, quorum = self.quorum, "quorum met");
            Ok(self.verified)
        } else {
            tracing::debug!(
                verified = self.verified,
                quorum = self.quorum,
                "quorum not met"
            );
            Err(Error::QuorumNotMet {
                verified: self.verified,
                total: self.total,
                quorum: self.quorum,
            })
        }
    }
}

impl GuardianSetInfo {
    /// Full local verification of a parsed VAA against this guardian set.
    ///
    /// Checks that signatures are in strictly ascending guardian index order, that
    /// every index is registered, that each signature recovers to its guardian's
    /// key, and that the set meets quorum.
    pub fn verify_vaa(&self, vaa: &Vaa) -> Result<(), Error> {
        if vaa.signatures.len() < self.quorum() {
            return Err(Error::QuorumNotMet {
                verified: vaa.signatures.len(),
                total: self.addresses.len(),
                quorum: self.quorum(),
            });
        }

        let mut last_index: Option<u8> = None;
        for sig in &vaa.signatures {
            if last_index.is_some_and(|last| sig.index <= last) {
                return Err(Error::UnsortedSignatures);
            }
            last_index = Some(sig.index);

            let expected = self.addresses.get(usize::from(sig.index)).ok_or(
                Error::GuardianIndexOutOfRange {
                    index: sig.index,
                    len: self.addresses.len(),
                },
            )?;
            if sig.recover(vaa.hash)? != *expected {
                return Err(Error::InvalidSignature(sig.index));
            }
        }

        Ok(())
    }
}
