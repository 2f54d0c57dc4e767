use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Chain maps supported chains to their u16 wire representation. These ids are
/// universally defined among all contracts in the network; ids this crate does not
/// know about are preserved as [`Chain::Unknown`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Chain {
    #[default]
    Any,
    Solana,
    Ethereum,
    Terra,
    Bsc,
    Polygon,
    Avalanche,
    Oasis,
    Algorand,
    Unknown(u16),
}

impl From<u16> for Chain {
    fn from(other: u16) -> Chain {
        match other {
            0 => Chain::Any,
            1 => Chain::Solana,
            2 => Chain::Ethereum,
            3 => Chain::Terra,
            4 => Chain::Bsc,
            5 => Chain::Polygon,
            6 => Chain::Avalanche,
            7 => Chain::Oasis,
            8 => Chain::Algorand,
            c => Chain::Unknown(c),
        }
    }
}

impl From<Chain> for u16 {
    fn from(other: Chain) -> u16 {
        match other {
            Chain::Any => 0,
            Chain::Solana => 1,
            Chain::Ethereum => 2,
            Chain::Terra => 3,
            Chain::Bsc => 4,
            Chain::Polygon => 5,
            Chain::Avalanche => 6,
            Chain::Oasis => 7,
            Chain::Algorand => 8,
            Chain::Unknown(c) => c,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Any => f.write_str("Any"),
            Chain::Solana => f.write_str("Solana"),
            Chain::Ethereum => f.write_str("Ethereum"),
            Chain::Terra => f.write_str("Terra"),
            Chain::Bsc => f.write_str("Bsc"),
            Chain::Polygon => f.write_str("Polygon"),
            Chain::Avalanche => f.write_str("Avalanche"),
            Chain::Oasis => f.write_str("Oasis"),
            Chain::Algorand => f.write_str("Algorand"),
            Chain::Unknown(c) => write!(f, "Unknown({c})"),
        }
    }
}

impl Serialize for Chain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16((*self).into())
    }
}

impl<'de> Deserialize<'de> for Chain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        <u16 as Deserialize>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_round_trip() {
        for id in 0u16..32 {
            assert_eq!(u16::from(Chain::from(id)), id);
        }
    }

    #[test]
    fn known_ids() {
        assert_eq!(Chain::from(1), Chain::Solana);
        assert_eq!(Chain::from(8), Chain::Algorand);
        assert_eq!(Chain::from(999), Chain::Unknown(999));
    }
}
