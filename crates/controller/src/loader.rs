use std::future::Future;

use formats::{Dataset, DatasetError};

#[derive(Debug)]
pub enum LoadError {
    Fetch { url: String, reason: String },
    Decode { url: String, source: DatasetError },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Fetch { url, reason } => write!(f, "failed to fetch {url}: {reason}"),
            LoadError::Decode { url, source } => write!(f, "failed to decode {url}: {source}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Decode { source, .. } => Some(source),
            LoadError::Fetch { .. } => None,
        }
    }
}

/// Raw byte transport for the dataset file (HTTP in the browser and CLI,
/// the filesystem in tests).
pub trait DatasetFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, String>>;
}

pub async fn fetch_dataset<F: DatasetFetcher>(fetcher: &F, url: &str) -> Result<Dataset, LoadError> {
    let bytes = fetcher.fetch(url).await.map_err(|reason| LoadError::Fetch {
        url: url.to_string(),
        reason,
    })?;
    tracing::debug!(url, bytes = bytes.len(), "dataset fetched");
    Dataset::from_bytes(&bytes).map_err(|source| LoadError::Decode {
        url: url.to_string(),
        source,
    })
}
