//! Error types

/// A settings override that could not be applied
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid numeric tolerance: {0:?}")]
    InvalidTolerance(String),

    #[error("malformed string comparison policy: {0:?}")]
    MalformedPolicy(String),

    #[error("similarity threshold {0} is outside 0..=100")]
    ThresholdOutOfRange(i64),

    #[error("unknown sequence matching: {0:?}")]
    UnknownMatching(String),
}
