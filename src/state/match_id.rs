use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest identifier accepted from a scanned code or a request path.
pub const MIN_MATCH_ID_LEN: usize = 6;
/// Longest identifier accepted from a scanned code or a request path.
pub const MAX_MATCH_ID_LEN: usize = 32;

/// Opaque token binding a keeper and its displays to the same match record.
///
/// Identifiers are ASCII alphanumeric so they can be used verbatim as storage
/// keys, URL path segments and query values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchId(String);

/// Rejection reason for a string that does not look like a match identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidMatchId {
    /// Too short or too long.
    #[error("match id must be 6-32 characters long (got {0})")]
    Length(usize),
    /// Contains something other than ASCII letters and digits.
    #[error("match id must only contain ASCII letters and digits")]
    Charset,
}

impl MatchId {
    /// Validate a candidate identifier.
    pub fn parse(raw: &str) -> Result<Self, InvalidMatchId> {
        let len = raw.chars().count();
        if !(MIN_MATCH_ID_LEN..=MAX_MATCH_ID_LEN).contains(&len) {
            return Err(InvalidMatchId::Length(len));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(InvalidMatchId::Charset);
        }
        Ok(Self(raw.to_string()))
    }

    /// Wrap a freshly minted identifier; callers guarantee the shape.
    pub(crate) fn from_minted(raw: String) -> Self {
        debug_assert!(Self::parse(&raw).is_ok(), "minted id `{raw}` is malformed");
        Self(raw)
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MatchId {
    type Err = InvalidMatchId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MatchId {
    type Error = InvalidMatchId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MatchId> for String {
    fn from(value: MatchId) -> Self {
        value.0
    }
}

impl AsRef<str> for MatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
