use std::future::Future;

use serde::Deserialize;
use url::Url;

pub const DEFAULT_TAXA_ENDPOINT: &str = "https://api.inaturalist.org/v1/taxa";

#[derive(Debug, Clone, PartialEq)]
pub enum LookupError {
    InvalidEndpoint(String),
    Transport(String),
    Status(u16),
    Decode(String),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::InvalidEndpoint(e) => write!(f, "invalid taxa endpoint: {e}"),
            LookupError::Transport(e) => write!(f, "taxa request failed: {e}"),
            LookupError::Status(status) => write!(f, "taxa request returned HTTP {status}"),
            LookupError::Decode(e) => write!(f, "taxa response decode failed: {e}"),
        }
    }
}

impl std::error::Error for LookupError {}

/// Species photo lookup by scientific name.
pub trait TaxonLookup {
    /// Representative thumbnail of the best match, if the service has one.
    fn lookup(
        &self,
        scientific_name: &str,
    ) -> impl Future<Output = Result<Option<String>, LookupError>>;
}

#[derive(Debug, Deserialize)]
struct TaxaResponse {
    #[serde(default)]
    results: Vec<Taxon>,
}

#[derive(Debug, Deserialize)]
struct Taxon {
    #[serde(default)]
    default_photo: Option<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    #[serde(default)]
    square_url: Option<String>,
}

/// `GET {endpoint}?q={scientific_name}` with the name percent-encoded.
pub fn taxa_query_url(endpoint: &str, scientific_name: &str) -> Result<Url, LookupError> {
    Url::parse_with_params(endpoint, &[("q", scientific_name)])
        .map_err(|e| LookupError::InvalidEndpoint(format!("{endpoint}: {e}")))
}

/// Photo of the first result only; later results are never consulted.
pub fn parse_taxa_response(body: &[u8]) -> Result<Option<String>, LookupError> {
    let response: TaxaResponse =
        serde_json::from_slice(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    Ok(response
        .results
        .into_iter()
        .next()
        .and_then(|t| t.default_photo)
        .and_then(|p| p.square_url)
        .filter(|url| !url.trim().is_empty()))
}
