use std::time::Duration;

use layers::cluster::DEFAULT_CLUSTER_DISTANCE_PX;
use results::{CardRendererConfig, DEFAULT_CARD_TIMEOUT, DEFAULT_IMAGE, DEFAULT_TAXA_ENDPOINT};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ZOOM: f64 = 13.0;
pub const DEFAULT_MAX_CARDS: usize = 10;
pub const DEFAULT_DATASET_URL: &str = "./data/macaulaylibrary.geojson.gz";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    /// Initial view center as `[lon, lat]` degrees.
    pub center_lon_lat: [f64; 2],
    pub initial_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub cluster_distance_px: f64,
    pub max_cards: usize,
    pub dataset_url: String,
    pub taxa_endpoint: String,
    pub default_image: String,
    pub card_timeout_ms: u64,
    pub fit_duration_ms: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lon_lat: [0.0, 0.0],
            initial_zoom: 1.0,
            min_zoom: 0.0,
            max_zoom: DEFAULT_MAX_ZOOM,
            cluster_distance_px: DEFAULT_CLUSTER_DISTANCE_PX,
            max_cards: DEFAULT_MAX_CARDS,
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            taxa_endpoint: DEFAULT_TAXA_ENDPOINT.to_string(),
            default_image: DEFAULT_IMAGE.to_string(),
            card_timeout_ms: DEFAULT_CARD_TIMEOUT.as_millis() as u64,
            fit_duration_ms: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: String,
    pub reason: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.key, self.reason)
    }
}

impl std::error::Error for ConfigError {}

impl MapConfig {
    pub fn renderer_config(&self) -> CardRendererConfig {
        CardRendererConfig {
            default_image: self.default_image.clone(),
            card_timeout: Duration::from_millis(self.card_timeout_ms),
        }
    }

    /// Applies `AUDIOMNIA_*` overrides read through `get` (usually
    /// `std::env::var(..).ok()`).
    pub fn with_env_overrides<F>(mut self, get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("AUDIOMNIA_TAXA_URL") {
            self.taxa_endpoint = v;
        }
        if let Some(v) = get("AUDIOMNIA_DATASET_URL") {
            self.dataset_url = v;
        }
        if let Some(v) = get("AUDIOMNIA_DEFAULT_IMAGE") {
            self.default_image = v;
        }
        if let Some(v) = get("AUDIOMNIA_CARD_TIMEOUT_MS") {
            self.card_timeout_ms = parse_key("AUDIOMNIA_CARD_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("AUDIOMNIA_MAX_CARDS") {
            self.max_cards = parse_key("AUDIOMNIA_MAX_CARDS", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite()) || self.min_zoom > self.max_zoom
        {
            return Err(ConfigError {
                key: "zoom range".to_string(),
                reason: format!("{}..{}", self.min_zoom, self.max_zoom),
            });
        }
        if self.max_cards == 0 {
            return Err(ConfigError {
                key: "maxCards".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.cluster_distance_px.is_finite() || self.cluster_distance_px < 0.0 {
            return Err(ConfigError {
                key: "clusterDistancePx".to_string(),
                reason: format!("{}", self.cluster_distance_px),
            });
        }
        Ok(())
    }
}

fn parse_key<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_published_map() {
        let c = MapConfig::default();
        assert_eq!(c.max_zoom, 13.0);
        assert_eq!(c.initial_zoom, 1.0);
        assert_eq!(c.cluster_distance_px, 83.0);
        assert_eq!(c.max_cards, 10);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("AUDIOMNIA_TAXA_URL", "http://127.0.0.1:9000/taxa"),
            ("AUDIOMNIA_CARD_TIMEOUT_MS", " 2500 "),
        ]
        .into_iter()
        .collect();
        let c = MapConfig::default()
            .with_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(c.taxa_endpoint, "http://127.0.0.1:9000/taxa");
        assert_eq!(c.renderer_config().card_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn bad_numbers_name_their_key() {
        let err = MapConfig::default()
            .with_env_overrides(|k| (k == "AUDIOMNIA_MAX_CARDS").then(|| "ten".to_string()))
            .unwrap_err();
        assert_eq!(err.key, "AUDIOMNIA_MAX_CARDS");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: MapConfig = serde_json::from_str(r#"{"maxZoom": 15, "maxCards": 4}"#).unwrap();
        assert_eq!(c.max_zoom, 15.0);
        assert_eq!(c.max_cards, 4);
        assert_eq!(c.cluster_distance_px, 83.0);
    }
}
