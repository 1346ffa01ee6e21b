//! Upstream disaster providers and their collection names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// A provider whose records live in a collection of the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Usgs,
    Eonet,
    Gdacs,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Usgs, Source::Eonet, Source::Gdacs];

    /// Collection name in the store (`usgs`, `eonet`, `gdacs`).
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Usgs => "usgs",
            Source::Eonet => "eonet",
            Source::Gdacs => "gdacs",
        }
    }

    /// Uppercase tag written into normalized records.
    pub fn tag(self) -> &'static str {
        match self {
            Source::Usgs => "USGS",
            Source::Eonet => "EONET",
            Source::Gdacs => "GDACS",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = QueryError;

    /// Exact, case-sensitive match against the collection names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|src| src.as_str() == s)
            .ok_or_else(|| QueryError::InvalidSource(s.to_string()))
    }
}
