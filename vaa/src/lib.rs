//! Pure Rust Wormhole VAA primitives.
//!
//! This crate provides the chain-agnostic core of the cross-chain message attestation
//! protocol, for consumption by chain-specific SDKs and submission tooling. It
//! includes:
//!
//! - The canonical VAA body model and its deterministic wire encoding.
//! - Typed payload encoders for governance and chain-registration actions.
//! - The guardian signature engine: double-Keccak256 digests, deterministic
//!   recoverable secp256k1 signatures and Ethereum-style address derivation.
//! - VAA assembly and the chunked verification dispatch used by verifiers running on
//!   resource-constrained virtual machines.
//!
//! Everything here is pure and stateless; collecting signatures over the guardian
//! network and submitting verification transactions belong to the surrounding layers.

use std::fmt;

use serde::{Deserialize, Serialize};

mod chain;
mod error;
pub mod payload;
pub mod sign;
pub mod vaa;
pub mod verify;

pub use chain::Chain;
pub use error::Error;
pub use payload::{GovernanceAction, GovernancePacket, Payload};
pub use vaa::{digest, Body, Digest, Signature, Vaa};
pub use verify::{SignedVaa, UnsignedVaa};

/// The `GOVERNANCE_EMITTER` is a special address guardians trust to observe
/// governance actions from. The value is
/// "0000000000000000000000000000000000000000000000000000000000000004".
pub const GOVERNANCE_EMITTER: Address = Address([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04,
]);

/// A guardian's identity: the low 20 bytes of the Keccak256 hash of its uncompressed
/// public key, mirroring Ethereum address derivation.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct GuardianAddress(pub [u8; 20]);

impl fmt::Display for GuardianAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }

        Ok(())
    }
}

/// Addresses are always 32 bytes. Addresses that are shorter, for example 20 byte
/// Ethereum addresses, are left zero padded to 32.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Address(pub [u8; 32]);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }

        Ok(())
    }
}

/// A versioned set of guardian keys. The index increments when membership changes
/// via a governance action.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GuardianSetInfo {
    /// Guardian addresses, position == guardian index.
    pub addresses: Vec<GuardianAddress>,
}

impl GuardianSetInfo {
    /// Minimum number of valid guardian signatures required to accept a VAA.
    pub fn quorum(&self) -> usize {
        (self.addresses.len() * 2) / 3 + 1
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quorum() {
        let tests = [
            (0, 1),
            (1, 1),
            (2, 2),
            (3, 3),
            (4, 3),
            (5, 4),
            (6, 5),
            (7, 5),
            (8, 6),
            (9, 7),
            (10, 7),
            (11, 8),
            (12, 9),
            (13, 9),
            (14, 10),
            (15, 11),
            (16, 11),
            (17, 12),
            (18, 13),
            (19, 13),
            (50, 34),
            (100, 67),
            (1000, 667),
        ];

        for (count, quorum) in tests {
            let gs = GuardianSetInfo {
                addresses: vec![Default::default(); count],
            };

            assert_eq!(quorum, gs.quorum());
        }
    }

    #[test]
    fn address_display() {
        assert_eq!(
            GOVERNANCE_EMITTER.to_string(),
            "0000000000000000000000000000000000000000000000000000000000000004"
        );
    }
}
