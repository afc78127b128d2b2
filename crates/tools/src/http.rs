use std::path::PathBuf;
use std::time::Duration;

use controller::DatasetFetcher;
use reqwest::Client;
use results::{ImageLoadError, ImageLoader, LookupError, TaxonLookup, Timer};
use results::{parse_taxa_response, taxa_query_url};

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

async fn get_bytes(client: &Client, url: &str) -> Result<Vec<u8>, String> {
    let resp = client.get(url).send().await.map_err(|e| e.to_string())?;
    let status = resp.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status.as_u16()));
    }
    let body = resp.bytes().await.map_err(|e| e.to_string())?;
    Ok(body.to_vec())
}

/// Reads `http(s)://` locations over the network and anything else from disk.
pub struct AnyFetcher {
    pub client: Client,
}

impl DatasetFetcher for AnyFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, String> {
        if is_remote(location) {
            get_bytes(&self.client, location).await
        } else {
            tokio::fs::read(location).await.map_err(|e| e.to_string())
        }
    }
}

pub struct ReqwestTaxonLookup {
    pub client: Client,
    pub endpoint: String,
}

impl TaxonLookup for ReqwestTaxonLookup {
    async fn lookup(&self, scientific_name: &str) -> Result<Option<String>, LookupError> {
        let url = taxa_query_url(&self.endpoint, scientific_name)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        parse_taxa_response(&body)
    }
}

/// `--offline`: every species resolves to the default image.
pub struct OfflineLookup;

impl TaxonLookup for OfflineLookup {
    async fn lookup(&self, _scientific_name: &str) -> Result<Option<String>, LookupError> {
        Ok(None)
    }
}

/// Remote images must answer a GET with success; relative ones must exist
/// under `assets`.
pub struct CheckingImageLoader {
    pub client: Client,
    pub assets: PathBuf,
}

impl ImageLoader for CheckingImageLoader {
    async fn load(&self, url: &str) -> Result<(), ImageLoadError> {
        let fail = |reason: String| ImageLoadError {
            url: url.to_string(),
            reason,
        };
        if is_remote(url) {
            get_bytes(&self.client, url).await.map(|_| ()).map_err(fail)
        } else {
            let path = self.assets.join(url.trim_start_matches("./"));
            tokio::fs::metadata(&path)
                .await
                .map(|_| ())
                .map_err(|e| fail(format!("{}: {e}", path.display())))
        }
    }
}

pub struct TokioTimer;

impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
