use thiserror::Error;

/// Errors raised by the VAA core.
///
/// The first group is encoding/parsing trouble, the second covers signer-set input
/// problems the caller must fix before resubmission, and `QuorumNotMet` is a
/// protocol-level rejection: expected behavior for insufficient signatures, reported
/// distinctly so callers do not confuse it with transport failures and retry blindly.
#[derive(Debug, Error)]
pub enum Error {
    #[error("encoding error: {0}")]
    Codec(#[from] wormhole_codec::CodecError),

    #[error("malformed VAA: {0}")]
    MalformedVaa(&'static str),

    #[error("unknown governance action {0}")]
    UnknownGovernanceAction(u8),

    #[error("invalid governance module tag")]
    InvalidGovernanceModule,

    #[error("signer set of {0} exceeds the 255 guardian limit")]
    TooManySigners(usize),

    #[error("duplicate guardian index {0}")]
    DuplicateGuardianIndex(u8),

    #[error("guardian index {index} out of range for a set of {len}")]
    GuardianIndexOutOfRange { index: u8, len: usize },

    #[error("signatures are not in ascending guardian index order")]
    UnsortedSignatures,

    #[error("signature from guardian {0} does not match its registered key")]
    InvalidSignature(u8),

    #[error("invalid guardian key: {0}")]
    InvalidGuardianKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("verification chunk size must be nonzero")]
    InvalidChunkSize,

    #[error("VAA verification failed: {verified}/{total} signatures, quorum {quorum} required")]
    QuorumNotMet {
        verified: usize,
        total: usize,
        quorum: usize,
    },
}
