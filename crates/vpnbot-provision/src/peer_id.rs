//! Peer Identity
//!
//! The opaque name of a peer. It doubles as the config file stem, so it is
//! restricted to a filename-safe alphabet.

use std::fmt;
use std::str::FromStr;

const MAX_LEN: usize = 64;

/// Peer identity (derived from the messenger user id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    /// Validate and wrap an identity string
    pub fn new(id: impl Into<String>) -> Result<Self, PeerIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(PeerIdError::Empty);
        }
        if id.len() > MAX_LEN {
            return Err(PeerIdError::TooLong(id.len()));
        }
        if id.starts_with('.') {
            return Err(PeerIdError::InvalidChars(id));
        }
        let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
        if !id.chars().all(allowed) {
            return Err(PeerIdError::InvalidChars(id));
        }

        Ok(Self(id))
    }

    /// Identity for a messenger user
    pub fn from_user(user_id: i64) -> Self {
        Self(user_id.to_string())
    }

    /// Borrow as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Config file name (`{id}.conf`)
    pub fn file_name(&self) -> String {
        format!("{}.conf", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PeerId {
    type Err = PeerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identity validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerIdError {
    #[error("Peer identity is empty")]
    Empty,

    #[error("Peer identity too long ({0} bytes, max 64)")]
    TooLong(usize),

    #[error("Peer identity contains forbidden characters: {0:?}")]
    InvalidChars(String),
}
