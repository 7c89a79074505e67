use crate::types::AttributeType;
use thiserror::Error;

pub type Result<T, E = CodecError> = core::result::Result<T, E>;

/// Failures of lookup, decode and encode. None of them affect the registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("unknown attribute {id} in profile {profile}")]
    UnknownAttribute { profile: String, id: u16 },
    #[error("attribute {id}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        id: u16,
        expected: usize,
        actual: usize,
    },
    #[error("attribute {id}: invalid UTF-8 after {valid_up_to} bytes")]
    InvalidEncoding { id: u16, valid_up_to: usize },
    #[error("attribute {id}: value {value} out of range for {ty}")]
    ValueOutOfRange {
        id: u16,
        ty: AttributeType,
        value: String,
    },
    #[error("attribute {id}: {actual} bytes exceeds maximum of {max}")]
    SizeExceeded { id: u16, max: usize, actual: usize },
    #[error("attribute {id}: {ty} cannot carry a {kind} value")]
    TypeMismatch {
        id: u16,
        ty: AttributeType,
        kind: &'static str,
    },
    #[error("attribute {id}: cannot parse {literal:?} as {ty}")]
    InvalidLiteral {
        id: u16,
        ty: AttributeType,
        literal: String,
    },
}

/// Problems found while building profile tables.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unsupported schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },
    #[error("profile {profile}: attribute {id} declared more than once")]
    DuplicateAttribute { profile: String, id: u16 },
    #[error("attribute {id}: {ty} requires {expected} bytes, declared {size}")]
    SizeTypeMismatch {
        id: u16,
        ty: AttributeType,
        expected: usize,
        size: u16,
    },
    #[error("attribute {id}: declared size is zero")]
    ZeroSize { id: u16 },
    #[error("header line {line}: {reason}")]
    Header { line: usize, reason: String },
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
