use thiserror::Error;

/// Errors raised while encoding or decoding. Always local and fatal to the single
/// call that produced them; nothing in this crate retries or substitutes defaults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("value {value} does not fit in {width} bytes")]
    ValueOutOfRange { value: u64, width: usize },

    #[error("invalid integer width {0}, expected 1..=8")]
    InvalidWidth(usize),

    #[error("unexpected end of input at offset {offset}, {needed} more bytes needed")]
    UnexpectedEnd { offset: usize, needed: usize },

    #[error("data consumed ({consumed} bytes) did not match input length ({len} bytes)")]
    TrailingBytes { consumed: usize, len: usize },

    #[error("unknown type tag {0}")]
    UnknownTypeTag(u8),

    #[error("{what} length {len} exceeds the limit of 127")]
    CountTooLarge { what: &'static str, len: usize },

    #[error("field {field}: expected {expected} bytes, got {got}")]
    InvalidLength {
        field: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid address length {0}, expected 20 or 32")]
    InvalidAddressLength(usize),

    #[error("field {field}: expected a {expected} value")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("field {0} missing from record")]
    MissingField(String),

    #[error("field {0}: constant bytes do not match the schema")]
    FixedMismatch(String),

    #[error("field {0}: invalid base64")]
    InvalidBase64(String),

    #[error("field name is not valid utf-8")]
    InvalidFieldName,
}
