//! Normalized domain models shared by every component.

mod comment;
mod issue;
mod sync_record;

pub use comment::Comment;
pub use issue::{FieldDiff, Issue};
pub use sync_record::{CommentSyncRecord, IssueSyncRecord, SyncDirection, SyncStatus};

/// One of the two peer instances. Generalizes the source's hard-coded
/// instance "1"/"2" split into a single tag with identical code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = crate::error::SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" | "1" => Ok(Side::Left),
            "right" | "2" => Ok(Side::Right),
            other => Err(crate::error::SyncError::invalid_input(format!("unknown side: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_is_involution() {
        assert_eq!(Side::Left.other(), Side::Right);
        assert_eq!(Side::Right.other(), Side::Left);
        assert_eq!(Side::Left.other().other(), Side::Left);
    }

    #[test]
    fn parses_header_values() {
        assert_eq!("1".parse::<Side>().unwrap(), Side::Left);
        assert_eq!("2".parse::<Side>().unwrap(), Side::Right);
        assert!("3".parse::<Side>().is_err());
    }
}
