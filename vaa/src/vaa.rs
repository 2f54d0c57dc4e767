//! The canonical VAA model: body serialization, digests and parsing of full signed
//! buffers.
//!
//! A VAA is a collection of guardian signatures combined with a message and its
//! metadata. By submitting a VAA to a receiving contract, that contract can make
//! assumptions about the validity of state on the source chain. The wire format is
//! consumed by independently-implemented verifiers on several chains, so every field
//! order, width and padding choice here is load-bearing:
//!
//! ```markdown
//! header (length 6):
//! 0   uint8   version (0x01)
//! 1   uint32  guardian set index
//! 5   uint8   len signatures
//!
//! per signature (length 66):
//! 0   uint8       index of the signer (in guardian keys)
//! 1   [32]uint8   r
//! 33  [32]uint8   s
//! 65  uint8       recovery id
//!
//! body:
//! 0   uint32      timestamp (unix in seconds)
//! 4   uint32      nonce
//! 8   uint16      emitter_chain
//! 10  [32]uint8   emitter_address
//! 42  uint64      sequence
//! 50  uint8       consistency_level
//! 51  []uint8     payload
//! ```

use serde::{Deserialize, Serialize};
use sha3::{Digest as Sha3Digest, Keccak256};
use wormhole_codec::{Reader, Writer};

use crate::{Address, Chain, Error, GuardianAddress, Payload};

/// Current VAA envelope version.
pub const VERSION: u8 = 1;

/// A guardian signature: a 65-byte recoverable ECDSA signature prefixed with the
/// guardian's position in the set.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub index: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl Signature {
    pub const LEN: usize = 66;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0] = self.index;
        out[1..33].copy_from_slice(&self.r);
        out[33..65].copy_from_slice(&self.s);
        out[65] = self.recovery_id;
        out
    }

    pub fn from_bytes(data: [u8; Self::LEN]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&data[1..33]);
        s.copy_from_slice(&data[33..65]);
        Signature {
            index: data[0],
            r,
            s,
            recovery_id: data[65],
        }
    }

    /// Recover the address of the guardian that produced this signature over
    /// `secp256k_hash`.
    pub fn recover(&self, secp256k_hash: [u8; 32]) -> Result<GuardianAddress, Error> {
        crate::sign::recover_signer(secp256k_hash, self)
    }
}

/// Digest data for a VAA body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest {
    /// Guardians identify a VAA by the Keccak256 hash of its body; on-chain
    /// components only ever submit the hash, which keeps costs down.
    pub hash: [u8; 32],

    /// The hash of the hash. secp256k1 signing conventions hash the payload before
    /// signing, so recovery functions such as `ecrecover` operate on this value
    /// rather than on `hash`.
    pub secp256k_hash: [u8; 32],
}

/// Calculates and returns the digest for `body` to be used in VAA operations.
pub fn digest(body: &[u8]) -> Digest {
    let hash: [u8; 32] = {
        let mut h = Keccak256::new();
        h.update(body);
        h.finalize().into()
    };

    let secp256k_hash: [u8; 32] = {
        let mut h = Keccak256::new();
        h.update(hash);
        h.finalize().into()
    };

    Digest {
        hash,
        secp256k_hash,
    }
}

/// The unsigned portion of a VAA: message metadata plus the payload. This is the
/// exact byte range guardians hash and sign.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Body {
    /// Seconds since UNIX epoch.
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: Chain,
    /// Always 32 bytes; shorter native addresses are left zero padded.
    pub emitter_address: Address,
    /// Caller-assigned, must be monotonically increasing per (chain, emitter) for
    /// downstream acceptance. Not enforced here.
    pub sequence: u64,
    /// Source-chain finality hint, interpreted by collaborators.
    pub consistency_level: u8,
    pub payload: Payload,
}

impl Body {
    /// Serialize the body. The payload runs to the end of the buffer with no length
    /// prefix; any deviation in field order or width changes the digest and breaks
    /// signature compatibility.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let payload = self.payload.encode()?;

        let mut w = Writer::with_capacity(Vaa::BODY_MIN_LEN + payload.len());
        w.write_u32(self.timestamp);
        w.write_u32(self.nonce);
        w.write_u16(self.emitter_chain.into());
        w.write_bytes(&self.emitter_address.0);
        w.write_u64(self.sequence);
        w.write_u8(self.consistency_level);
        w.write_bytes(&payload);
        Ok(w.into_vec())
    }

    /// Double-Keccak digest of the serialized body.
    pub fn digest(&self) -> Result<Digest, Error> {
        Ok(digest(&self.serialize()?))
    }
}

/// A parsed VAA: envelope, signatures and body fields, with the payload kept as
/// opaque bytes for deferred interpretation.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Vaa {
    pub version: u8,
    pub guardian_set_index: u32,
    /// In ascending guardian index order.
    pub signatures: Vec<Signature>,
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: Chain,
    pub emitter_address: Address,
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,

    /// Double-Keccak digest of the body, as recovery functions expect it.
    pub hash: [u8; 32],
}

impl Vaa {
    pub const HEADER_LEN: usize = 6;
    pub const SIGNATURE_LEN: usize = Signature::LEN;
    /// Body length up to and including the consistency level.
    pub const BODY_MIN_LEN: usize = 51;

    /// Parse a full signed VAA buffer.
    ///
    /// Fails with a malformed-VAA error whenever the buffer is shorter than the
    /// declared signature count implies; truncated input never yields partial data.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);

        let version = r
            .read_u8()
            .map_err(|_| Error::MalformedVaa("missing version"))?;
        let guardian_set_index = r
            .read_u32()
            .map_err(|_| Error::MalformedVaa("truncated header"))?;
        let len_signers = r
            .read_u8()
            .map_err(|_| Error::MalformedVaa("truncated header"))?;

        let mut signatures = Vec::with_capacity(len_signers.into());
        for _ in 0..len_signers {
            let raw = r
                .read_fixed::<{ Signature::LEN }>()
                .map_err(|_| Error::MalformedVaa("truncated signature block"))?;
            signatures.push(Signature::from_bytes(raw));
        }

        if r.remaining() < Self::BODY_MIN_LEN {
            return Err(Error::MalformedVaa("truncated body"));
        }
        let body = &data[r.offset()..];

        let timestamp = r.read_u32().map_err(|_| Error::MalformedVaa("body"))?;
        let nonce = r.read_u32().map_err(|_| Error::MalformedVaa("body"))?;
        let emitter_chain = r
            .read_u16()
            .map_err(|_| Error::MalformedVaa("body"))?
            .into();
        let emitter_address = Address(r.read_fixed::<32>().map_err(|_| Error::MalformedVaa("body"))?);
        let sequence = r.read_u64().map_err(|_| Error::MalformedVaa("body"))?;
        let consistency_level = r.read_u8().map_err(|_| Error::MalformedVaa("body"))?;
        let payload = r.rest().to_vec();

        Ok(Vaa {
            version,
            guardian_set_index,
            signatures,
            timestamp,
            nonce,
            emitter_chain,
            emitter_address,
            sequence,
            consistency_level,
            payload,
            hash: digest(body).secp256k_hash,
        })
    }

    /// The body portion of this VAA with the payload left raw.
    pub fn body(&self) -> Body {
        Body {
            timestamp: self.timestamp,
            nonce: self.nonce,
            emitter_chain: self.emitter_chain,
            emitter_address: self.emitter_address,
            sequence: self.sequence,
            consistency_level: self.consistency_level,
            payload: Payload::Raw(self.payload.clone()),
        }
    }

    /// Check if this VAA carries a governance message.
    pub fn is_governance(&self) -> bool {
        self.emitter_address == crate::GOVERNANCE_EMITTER && self.emitter_chain == Chain::Solana
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn signature_bytes_round_trip() {
        let sig = Signature {
            index: 7,
            r: [0xaa; 32],
            s: [0xbb; 32],
            recovery_id: 1,
        };
        let bytes = sig.to_bytes();
        assert_eq!(bytes[0], 7);
        assert_eq!(bytes[65], 1);
        assert_eq!(Signature::from_bytes(bytes), sig);
    }

    #[test]
    fn body_layout() {
        let body = Body {
            timestamp: 1,
            nonce: 2,
            emitter_chain: Chain::Ethereum,
            emitter_address: Address([0x11; 32]),
            sequence: 3,
            consistency_level: 32,
            payload: Payload::Raw(vec![0xde, 0xad]),
        };

        let data = body.serialize().unwrap();
        assert_eq!(data.len(), Vaa::BODY_MIN_LEN + 2);
        assert_eq!(&data[..4], &[0, 0, 0, 1]);
        assert_eq!(&data[4..8], &[0, 0, 0, 2]);
        assert_eq!(&data[8..10], &[0, 2]);
        assert_eq!(&data[10..42], &[0x11; 32]);
        assert_eq!(&data[42..50], &[0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(data[50], 32);
        assert_eq!(&data[51..], &[0xde, 0xad]);
    }

    /// Known-good digest produced by the reference implementations.
    #[test]
    fn stable_digest() {
        let data = [
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04,
            0x00, 0x00, 0x00, 0x00, 0x03, 0xb4, 0x56, 0xb8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x54, 0x6f, 0x6b, 0x65, 0x6e, 0x42, 0x72, 0x69, 0x64, 0x67, 0x65, 0x01,
            0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x02, 0x90, 0xfb, 0x16, 0x72, 0x08, 0xaf, 0x45, 0x5b, 0xb1, 0x37, 0x78,
            0x01, 0x63, 0xb7, 0xb7, 0xa9, 0xa1, 0x0c, 0x16,
        ];

        let expected = [
            0x05, 0xd1, 0xfc, 0xc5, 0x31, 0x74, 0x6c, 0x7e, 0xfd, 0x7f, 0xee, 0xa2, 0x0a, 0x81,
            0xd2, 0x79, 0x9f, 0x77, 0x7f, 0x30, 0x2b, 0x8a, 0x6a, 0x64, 0x24, 0xb8, 0x12, 0x09,
            0xdc, 0x3f, 0x51, 0x1f,
        ];

        assert_eq!(expected, digest(&data).secp256k_hash);
    }

    #[test]
    fn parse_rejects_truncated_signature_block() {
        // Declares two signatures but carries only part of the first.
        let mut data = vec![1u8, 0, 0, 0, 0, 2];
        data.extend_from_slice(&[0u8; 40]);
        assert!(matches!(
            Vaa::parse(&data),
            Err(Error::MalformedVaa("truncated signature block"))
        ));
    }

    #[test]
    fn parse_rejects_truncated_body() {
        // Valid header and signature block, body cut short.
        let mut data = vec![1u8, 0, 0, 0, 0, 1];
        data.extend_from_slice(&[0u8; Signature::LEN]);
        data.extend_from_slice(&[0u8; 20]);
        assert!(matches!(
            Vaa::parse(&data),
            Err(Error::MalformedVaa("truncated body"))
        ));
    }

    #[test]
    fn vaa_json_round_trip() {
        let vaa = Vaa {
            version: VERSION,
            guardian_set_index: 2,
            signatures: vec![Signature {
                index: 0,
                r: [0x01; 32],
                s: [0x02; 32],
                recovery_id: 1,
            }],
            timestamp: 1_656_354_705,
            nonce: 5,
            emitter_chain: Chain::Algorand,
            emitter_address: Address([0x33; 32]),
            sequence: 12,
            consistency_level: 1,
            payload: vec![0xca, 0xfe],
            hash: [0x44; 32],
        };

        let json = serde_json::to_string(&vaa).unwrap();
        assert_eq!(serde_json::from_str::<Vaa>(&json).unwrap(), vaa);
    }

    #[test]
    fn parse_round_trip() {
        let body = Body {
            timestamp: 1_656_354_705,
            nonce: 0,
            emitter_chain: Chain::Ethereum,
            emitter_address: Address([0x22; 32]),
            sequence: 9,
            consistency_level: 1,
            payload: Payload::Raw(b"From: evm0\\nMsg: Hello World!".to_vec()),
        };
        let body_bytes = body.serialize().unwrap();

        let mut data = Writer::new();
        data.write_u8(VERSION);
        data.write_u32(3);
        data.write_u8(1);
        data.write_bytes(
            &Signature {
                index: 0,
                r: [0xcc; 32],
                s: [0xdd; 32],
                recovery_id: 0,
            }
            .to_bytes(),
        );
        data.write_bytes(&body_bytes);

        let vaa = Vaa::parse(&data.into_vec()).unwrap();
        assert_eq!(vaa.version, VERSION);
        assert_eq!(vaa.guardian_set_index, 3);
        assert_eq!(vaa.signatures.len(), 1);
        assert_eq!(vaa.timestamp, body.timestamp);
        assert_eq!(vaa.emitter_chain, Chain::Ethereum);
        assert_eq!(vaa.emitter_address, Address([0x22; 32]));
        assert_eq!(vaa.sequence, 9);
        assert_eq!(vaa.payload, b"From: evm0\\nMsg: Hello World!");
        assert_eq!(vaa.hash, digest(&body_bytes).secp256k_hash);
    }
}
