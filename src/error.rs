use std::fmt;

/// Result alias used throughout the agent.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Everything that can go wrong between fetching a snapshot and
/// handing a record to the sink.
#[derive(Debug)]
pub enum AgentError {
    /// HTTP-level fetch failure (connect, timeout, bad status, bad body).
    Http(reqwest::Error),
    /// File-provider read failure.
    Io(std::io::Error),
    /// Snapshot body was not the JSON we expected.
    Json(serde_json::Error),
    /// A compound key did not split into the declared number of tags.
    Arity {
        key: String,
        expected: usize,
        got: usize,
    },
    /// A declared field is absent from this cycle's snapshot.
    MissingField(String),
    /// The sink refused a record.
    Sink(String),
    /// Startup configuration was unusable.
    Config(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "snapshot fetch failed: {e}"),
            Self::Io(e) => write!(f, "snapshot read failed: {e}"),
            Self::Json(e) => write!(f, "snapshot is not valid JSON: {e}"),
            Self::Arity { key, expected, got } => write!(
                f,
                "key '{key}' split into {got} segments, tag schema wants {expected}"
            ),
            Self::MissingField(name) => {
                write!(f, "field '{name}' missing from snapshot")
            }
            Self::Sink(msg) => write!(f, "sink dispatch failed: {msg}"),
            Self::Config(msg) => write!(f, "bad configuration: {msg}"),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
