//! Contract-facing types shared between the dispatcher, the host capability
//! surface, and the wire codec.
//!
//! Everything here crosses the contract/peer boundary, so the types are
//! serde-serializable and carry no references into host-owned storage.

use serde::Deserialize;
use serde::Serialize;

/// Page size used when a paginated query is called with zero.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Hard cap on results per page for paginated queries.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Maximum length of a state key in bytes.
pub const MAX_KEY_LEN: usize = 512;

/// Maximum length of an emitted event name in bytes.
pub const MAX_EVENT_NAME_LEN: usize = 64;

/// A single lifecycle call as seen by a contract.
///
/// Produced once per call from the host-supplied argument list and discarded
/// when the call completes. The function name selects a handler; the
/// arguments are an ordered, opaque parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Handler name the contract dispatches on.
    pub function: String,
    /// Ordered parameters for the handler.
    pub args: Vec<String>,
}

impl Invocation {
    /// Create an invocation from a function name and parameter list.
    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}

/// Outcome of a lifecycle call, surfaced verbatim to the peer.
///
/// Exactly two outcomes exist: success with an optional byte payload, or
/// failure with a human-readable message. Handlers return failure responses
/// instead of raising; the peer forwards whatever it receives to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// The call succeeded, optionally carrying a result payload.
    Success {
        /// Result bytes, or `None` for an empty payload.
        payload: Option<Vec<u8>>,
    },
    /// The call failed with a diagnostic message.
    Failure {
        /// Human-readable failure description.
        message: String,
    },
}

impl Response {
    /// Success carrying a payload.
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self::Success {
            payload: Some(payload.into()),
        }
    }

    /// Success with no payload.
    pub fn success_empty() -> Self {
        Self::Success { payload: None }
    }

    /// Failure with a diagnostic message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Whether this is a success response.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The success payload, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Success { payload } => payload.as_deref(),
            Self::Failure { .. } => None,
        }
    }

    /// The failure message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message } => Some(message),
        }
    }
}

/// One key/value row yielded by a range or rich query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
}

/// One historical write or delete of a key, yielded by a history query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyModification {
    /// Transaction id that committed the modification.
    pub tx_id: String,
    /// Value written, empty for deletes.
    pub value: Vec<u8>,
    /// Commit timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Whether this modification deleted the key.
    pub is_delete: bool,
}

/// Pagination metadata returned alongside a paginated result iterator.
///
/// An empty bookmark means the result set is exhausted; otherwise passing
/// the bookmark back resumes the query at the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetadata {
    /// Number of rows in the returned page.
    pub fetched_count: u32,
    /// Continuation token for the next page, empty when exhausted.
    pub bookmark: String,
}

/// An event emitted by a contract, surfaced to subscribers outside the
/// transaction once it commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

/// Host log severities, ordered from least to most verbose.
///
/// Parses from the upper-case names the peer CLI uses
/// (`CRITICAL < ERROR < WARNING < NOTICE < INFO < DEBUG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoggingLevel {
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl LoggingLevel {
    /// Map onto the nearest `tracing` level.
    ///
    /// `Critical` collapses into `ERROR` and `Notice` into `INFO` since
    /// `tracing` has no counterparts for them.
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            Self::Critical | Self::Error => tracing::Level::ERROR,
            Self::Warning => tracing::Level::WARN,
            Self::Notice | Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
        }
    }
}

impl std::str::FromStr for LoggingLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRITICAL" => Ok(Self::Critical),
            "ERROR" => Ok(Self::Error),
            "WARNING" => Ok(Self::Warning),
            "NOTICE" => Ok(Self::Notice),
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            other => Err(anyhow::anyhow!("unknown logging level '{other}'")),
        }
    }
}

impl std::fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Critical => "CRITICAL",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Notice => "NOTICE",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        };
        f.write_str(name)
    }
}
