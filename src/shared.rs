use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// AS identifiers are kept as opaque tokens exactly as they appear in the dump.
pub type ASN = String;

/// Record type accepted by the path parser unless configured otherwise.
pub const DEFAULT_RECORD_TYPE: &str = "TABLE_DUMP2";

/// Zero-based field holding the AS path in a table dump record.
pub const DEFAULT_PATH_FIELD: usize = 6;

/// How much larger (in degree) a provider must be than its customer.
pub const DEFAULT_PROVIDER_RATIO: f64 = 4.0;

pub const DEFAULT_TOP_N: usize = 50;

/// Which side of an AS a neighbor was observed on, in path order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborSide {
    /// Immediately before the AS in the path (upstream).
    Left,
    /// Immediately after the AS in the path (downstream).
    Right,
}

impl fmt::Display for NeighborSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NeighborSide::Left => "left",
            NeighborSide::Right => "right",
        };
        write!(f, "{}", s)
    }
}

/// Inferred relationship of the first endpoint of a link towards the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relationship {
    ProviderToCustomer,
    CustomerToProvider,
    PeerToPeer,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relationship::ProviderToCustomer => "PROVIDER_TO_CUSTOMER",
            Relationship::CustomerToProvider => "CUSTOMER_TO_PROVIDER",
            Relationship::PeerToPeer => "PEER_TO_PEER",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AsRankError {
    #[error("failed to open input {path:?}: {source}")]
    OpenInput { path: PathBuf, source: io::Error },

    #[error("failed to read input: {0}")]
    Read(#[source] io::Error),

    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("aggregation thread panicked: {0}")]
    ThreadPanicked(&'static str),

    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid progress template: {0}")]
    Progress(#[from] indicatif::style::TemplateError),
}

impl AsRankError {
    pub fn config(msg: impl Into<String>) -> Self {
        AsRankError::Config(msg.into())
    }

    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AsRankError::Write {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AsRankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AsRankError::config("workers must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid configuration: workers must be at least 1"
        );
        assert_eq!(NeighborSide::Right.to_string(), "right");
        assert_eq!(Relationship::PeerToPeer.to_string(), "PEER_TO_PEER");
    }
}
