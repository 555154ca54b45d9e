use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};
use serde_json::Value;

use crate::error::Result;
use crate::snapshot::Snapshot;

/// Per-request deadline for the vars endpoint.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where one poll cycle's snapshot comes from. HTTP against the live
/// process, or a local file for development and tests. Timeout policy
/// lives here; retry policy deliberately does not exist — a failed
/// fetch abandons the cycle and the next tick starts clean.
#[derive(Debug, Clone)]
pub enum SnapshotProvider {
    Url { client: reqwest::Client, url: String },
    File { path: PathBuf },
}

impl SnapshotProvider {
    pub fn url(host: &str, port: u16, path: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self::Url {
            client,
            url: format!("http://{host}:{port}{path}"),
        })
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    pub async fn fetch(&self) -> Result<Snapshot> {
        let value = match self {
            Self::Url { client, url } => {
                info!("fetching vars from {url}");
                client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Value>()
                    .await?
            }
            Self::File { path } => {
                debug!("reading vars from {}", path.display());
                let body = tokio::fs::read_to_string(path).await?;
                serde_json::from_str(&body)?
            }
        };
        Snapshot::from_value(value)
    }
}
