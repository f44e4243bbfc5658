//! Key selection criteria of a bulk action.
//!
//! A filter is fixed when the bulk action is created and never changes.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Pattern used when the client does not supply one.
pub const DEFAULT_MATCH: &str = "*";

/// Maximum accepted length of a match pattern.
const MAX_MATCH_LEN: usize = 1024;

/// Redis data type a key must have to be selected.
///
/// Serialized as the name Redis reports from `TYPE` and accepts in
/// `SCAN ... TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "hash")]
    Hash,
    #[serde(rename = "list")]
    List,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "zset")]
    ZSet,
    #[serde(rename = "stream")]
    Stream,
    #[serde(rename = "ReJSON-RL")]
    Json,
    #[serde(rename = "graphdata")]
    Graph,
    #[serde(rename = "TSDB-TYPE")]
    TimeSeries,
}

impl KeyType {
    /// Name used in the `SCAN ... TYPE` argument.
    pub fn redis_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Hash => "hash",
            Self::List => "list",
            Self::Set => "set",
            Self::ZSet => "zset",
            Self::Stream => "stream",
            Self::Json => "ReJSON-RL",
            Self::Graph => "graphdata",
            Self::TimeSeries => "TSDB-TYPE",
        }
    }
}

/// Immutable selection criteria: an optional key type and a glob pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionFilter {
    #[serde(rename = "type", default)]
    key_type: Option<KeyType>,
    #[serde(rename = "match", default = "default_match")]
    pattern: String,
}

fn default_match() -> String {
    DEFAULT_MATCH.to_string()
}

/// Serializable view of a filter, included in every overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOverview {
    #[serde(rename = "type")]
    pub key_type: Option<KeyType>,
    #[serde(rename = "match")]
    pub pattern: String,
}

impl BulkActionFilter {
    /// Build a filter, validating the pattern.
    ///
    /// An empty pattern is normalized to [`DEFAULT_MATCH`].
    pub fn new(key_type: Option<KeyType>, pattern: impl Into<String>) -> Result<Self, CoreError> {
        let mut pattern = pattern.into();
        if pattern.is_empty() {
            pattern = default_match();
        }
        if pattern.len() > MAX_MATCH_LEN {
            return Err(CoreError::Validation(format!(
                "Match pattern must not exceed {MAX_MATCH_LEN} characters"
            )));
        }
        Ok(Self { key_type, pattern })
    }

    /// Re-validate a filter that arrived through deserialization.
    pub fn validated(self) -> Result<Self, CoreError> {
        Self::new(self.key_type, self.pattern)
    }

    pub fn key_type(&self) -> Option<KeyType> {
        self.key_type
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn overview(&self) -> FilterOverview {
        FilterOverview {
            key_type: self.key_type,
            pattern: self.pattern.clone(),
        }
    }
}

impl Default for BulkActionFilter {
    fn default() -> Self {
        Self {
            key_type: None,
            pattern: default_match(),
        }
    }
}
