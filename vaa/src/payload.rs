//! Typed payload encoders.
//!
//! Payloads are opaque to the envelope: the body serializer appends whatever bytes
//! these encoders produce, and the result is what gets hashed and signed. Encoders
//! are therefore pure functions; identical input must always yield byte-identical
//! output.
//!
//! Governance payloads are namespaced by a fixed 32-byte module tag followed by a
//! 1-byte action type and the 2-byte chain the action targets. The tag is part of
//! the signed digest and must byte-match what on-chain verifiers expect.

use serde::{Deserialize, Serialize};
use wormhole_codec::{Reader, Writer};

use crate::{Address, Chain, Error, GuardianAddress};

/// Module tag for core governance actions: ASCII "Core", left zero padded to 32
/// bytes.
pub const CORE_MODULE: [u8; 32] = module_tag(b"Core");

/// Module tag for token bridge actions: ASCII "TokenBridge", left zero padded to 32
/// bytes.
pub const TOKEN_BRIDGE_MODULE: [u8; 32] = module_tag(b"TokenBridge");

/// Version byte carried by chain registration payloads.
pub const REGISTER_CHAIN_VERSION: u8 = 1;

const fn module_tag(name: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < name.len() {
        out[32 - name.len() + i] = name[i];
        i += 1;
    }
    out
}

/// The payload variants this core understands.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Opaque bytes, passed through without interpretation.
    Raw(Vec<u8>),
    /// A core governance action.
    Governance(GovernancePacket),
    /// Registration of a foreign emitter with a bridge endpoint.
    RegisterChain {
        target_chain: Chain,
        emitter_chain: Chain,
        emitter_address: Address,
    },
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Raw(Vec::new())
    }
}

impl Payload {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        match self {
            Payload::Raw(bytes) => Ok(bytes.clone()),
            Payload::Governance(packet) => packet.encode(),
            Payload::RegisterChain {
                target_chain,
                emitter_chain,
                emitter_address,
            } => {
                let mut w = Writer::with_capacity(101);
                w.write_bytes(&[0u8; 32]);
                w.write_bytes(&TOKEN_BRIDGE_MODULE);
                w.write_u8(REGISTER_CHAIN_VERSION);
                w.write_u16((*target_chain).into());
                w.write_u16((*emitter_chain).into());
                w.write_bytes(&emitter_address.0);
                Ok(w.into_vec())
            }
        }
    }

    /// Decode a chain registration payload. Structural inverse of the
    /// `RegisterChain` arm of [`Payload::encode`].
    pub fn decode_register_chain(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let _reserved = r.read_fixed::<32>()?;
        if r.read_fixed::<32>()? != TOKEN_BRIDGE_MODULE {
            return Err(Error::InvalidGovernanceModule);
        }
        if r.read_u8()? != REGISTER_CHAIN_VERSION {
            return Err(Error::MalformedVaa("unsupported registration version"));
        }
        let target_chain = r.read_u16()?.into();
        let emitter_chain = r.read_u16()?.into();
        let emitter_address = Address(r.read_fixed::<32>()?);
        r.finish()?;

        Ok(Payload::RegisterChain {
            target_chain,
            emitter_chain,
            emitter_address,
        })
    }
}

/// A governance message: the chain it targets and the action to execute there.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GovernancePacket {
    /// The chain the action is directed at; `Chain::Any` addresses every chain.
    pub target_chain: Chain,
    pub action: GovernanceAction,
}

/// Core governance actions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceAction {
    /// Commit to the hash of an upcoming contract upgrade.
    ContractUpgrade { new_contract: [u8; 32] },

    /// Replace the guardian set.
    GuardianSetUpgrade {
        new_guardian_set_index: u32,
        guardians: Vec<GuardianAddress>,
    },

    /// Set the fee charged for posting a message.
    SetMessageFee { fee: u64 },

    /// Pay accumulated fees out to a recipient.
    TransferFees { amount: u64, recipient: Address },
}

impl GovernanceAction {
    pub fn action_type(&self) -> u8 {
        match self {
            GovernanceAction::ContractUpgrade { .. } => 1,
            GovernanceAction::GuardianSetUpgrade { .. } => 2,
            GovernanceAction::SetMessageFee { .. } => 3,
            GovernanceAction::TransferFees { .. } => 4,
        }
    }
}

impl GovernancePacket {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut w = Writer::new();
        w.write_bytes(&CORE_MODULE);
        w.write_u8(self.action.action_type());
        w.write_u16(self.target_chain.into());

        match &self.action {
            GovernanceAction::ContractUpgrade { new_contract } => {
                w.write_bytes(new_contract);
            }
            GovernanceAction::GuardianSetUpgrade {
                new_guardian_set_index,
                guardians,
            } => {
                if guardians.len() > u8::MAX.into() {
                    return Err(Error::TooManySigners(guardians.len()));
                }
                w.write_u32(*new_guardian_set_index);
                w.write_u8(guardians.len() as u8);
                for g in guardians {
                    w.write_bytes(&g.0);
                }
            }
            // Fees are carried as 32-byte big-endian amounts of which only the low
            // 8 bytes are meaningful here.
            GovernanceAction::SetMessageFee { fee } => {
                w.write_bytes(&[0u8; 24]);
                w.write_u64(*fee);
            }
            GovernanceAction::TransferFees { amount, recipient } => {
                w.write_bytes(&[0u8; 24]);
                w.write_u64(*amount);
                w.write_bytes(&recipient.0);
            }
        }

        Ok(w.into_vec())
    }

    /// Decode a governance payload. Fails with an unrecognized-action error for
    /// unknown type tags and refuses fee amounts that overflow 64 bits.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);

        if r.read_fixed::<32>()? != CORE_MODULE {
            return Err(Error::InvalidGovernanceModule);
        }
        let action_type = r.read_u8()?;
        let target_chain = Chain::from(r.read_u16()?);

        let action = match action_type {
            1 => GovernanceAction::ContractUpgrade {
                new_contract: r.read_fixed::<32>()?,
            },
            2 => {
                let new_guardian_set_index = r.read_u32()?;
                let count = r.read_u8()?;
                let mut guardians = Vec::with_capacity(count.into());
                for _ in 0..count {
                    guardians.push(GuardianAddress(r.read_fixed::<20>()?));
                }
                GovernanceAction::GuardianSetUpgrade {
                    new_guardian_set_index,
                    guardians,
                }
            }
            3 => GovernanceAction::SetMessageFee {
                fee: read_fee(&mut r)?,
            },
            4 => GovernanceAction::TransferFees {
                amount: read_fee(&mut r)?,
                recipient: Address(r.read_fixed::<32>()?),
            },
            other => return Err(Error::UnknownGovernanceAction(other)),
        };

        r.finish()?;
        Ok(GovernancePacket {
            target_chain,
            action,
        })
    }
}

fn read_fee(r: &mut Reader<'_>) -> Result<u64, Error> {
    if r.read_fixed::<24>()? != [0u8; 24] {
        return Err(Error::MalformedVaa("fee amount exceeds 64 bits"));
    }
    Ok(r.read_u64()?)
}
