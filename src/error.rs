//! Errors raised while loading or switching levels

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// Level has no physics-world snapshot
    MissingSnapshot { level: String },
    /// Snapshot data is malformed or physically invalid
    InvalidSnapshot { reason: String },
    /// Level pack JSON could not be parsed
    InvalidLevelPack { reason: String },
    /// Level pack contains no levels
    EmptyLevelPack,
    /// Requested level index does not exist
    LevelOutOfRange { index: usize, len: usize },
    /// Shape target id is not one of the supported families
    UnsupportedTarget { id: String },
    /// Settings JSON is malformed or out of range
    InvalidSettings { reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSnapshot { level } => {
                write!(f, "level '{level}' has no physics world snapshot")
            }
            Self::InvalidSnapshot { reason } => write!(f, "invalid world snapshot: {reason}"),
            Self::InvalidLevelPack { reason } => write!(f, "invalid level pack: {reason}"),
            Self::EmptyLevelPack => write!(f, "level pack contains no levels"),
            Self::LevelOutOfRange { index, len } => {
                write!(f, "level index {index} out of range (pack has {len} levels)")
            }
            Self::UnsupportedTarget { id } => write!(f, "unsupported shape target: '{id}'"),
            Self::InvalidSettings { reason } => write!(f, "invalid settings: {reason}"),
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SessionError::LevelOutOfRange { index: 7, len: 4 };
        assert_eq!(err.to_string(), "level index 7 out of range (pack has 4 levels)");

        let err = SessionError::UnsupportedTarget { id: "Z".into() };
        assert_eq!(err.to_string(), "unsupported shape target: 'Z'");
    }
}
