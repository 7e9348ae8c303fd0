// ABOUTME: Source revision identifier (full or abbreviated commit hash).
// ABOUTME: Validated once at the edge; the short form names the revision image tag.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Length of the abbreviated form used for image tags.
pub const SHORT_LEN: usize = 7;

/// Longest accepted form (SHA-256 object format).
const MAX_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevisionError {
    #[error("revision cannot be empty")]
    Empty,

    #[error("revision must be at least {SHORT_LEN} characters, got {0}")]
    TooShort(usize),

    #[error("revision exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("invalid character in revision: '{0}' (expected lowercase hex)")]
    InvalidChar(char),
}

/// An immutable commit identifier naming exactly one build input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn parse(value: &str) -> Result<Self, RevisionError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RevisionError::Empty);
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_digit() && !('a'..='f').contains(c))
        {
            return Err(RevisionError::InvalidChar(c));
        }

        if value.len() < SHORT_LEN {
            return Err(RevisionError::TooShort(value.len()));
        }

        if value.len() > MAX_LEN {
            return Err(RevisionError::TooLong);
        }

        Ok(Self(value.to_string()))
    }

    /// The revision exactly as it was given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form, used as the immutable image tag.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LEN]
    }

    /// Whether a fully resolved commit hash names this revision.
    pub fn matches(&self, full: &str) -> bool {
        full.starts_with(&self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Revision {
    type Err = RevisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_is_first_seven() {
        let rev = Revision::parse("a1b2c3d4e5f60718293a4b5c6d7e8f9012345678").unwrap();
        assert_eq!(rev.short(), "a1b2c3d");
    }

    #[test]
    fn abbreviated_input_is_its_own_short_form() {
        let rev = Revision::parse("a1b2c3d").unwrap();
        assert_eq!(rev.short(), "a1b2c3d");
        assert_eq!(rev.as_str(), "a1b2c3d");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let rev = Revision::parse("  e4f5a6b\n").unwrap();
        assert_eq!(rev.as_str(), "e4f5a6b");
    }

    #[test]
    fn rejects_uppercase_and_non_hex() {
        assert_eq!(
            Revision::parse("A1B2C3D"),
            Err(RevisionError::InvalidChar('A'))
        );
        assert_eq!(
            Revision::parse("main-branch"),
            Err(RevisionError::InvalidChar('m'))
        );
    }

    #[test]
    fn rejects_too_short() {
        assert_eq!(Revision::parse("abc12"), Err(RevisionError::TooShort(5)));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Revision::parse("   "), Err(RevisionError::Empty));
    }

    #[test]
    fn matches_resolved_hash_by_prefix() {
        let rev = Revision::parse("a1b2c3d").unwrap();
        assert!(rev.matches("a1b2c3d4e5f60718293a4b5c6d7e8f9012345678"));
        assert!(!rev.matches("e4f5a6b4e5f60718293a4b5c6d7e8f9012345678"));
    }
}
