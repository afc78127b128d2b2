use std::io::Read;

use flate2::read::GzDecoder;
use foundation::bounds::Extent;
use foundation::math::lon_lat_to_mercator;
use serde::Serialize;
use serde_json::{Map, Value};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One bird-call recording.
///
/// `coordinate` is the EPSG:3857 projection of `lon_lat`; `index` is the
/// feature's position in the source collection, counting features skipped
/// for having no geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointFeature {
    pub index: usize,
    pub lon_lat: [f64; 2],
    pub coordinate: [f64; 2],
    pub common_name: String,
    pub scientific_name: String,
    pub date_created: String,
    pub audio: String,
    pub url: String,
    pub creator: String,
    pub content_location: Option<String>,
}

impl PointFeature {
    /// Trailing path segment of the source URL (`.../asset/1234` -> `1234`).
    pub fn asset_id(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or_default()
    }

    /// The free-text location when present, else `"{lat}, {lon}"` at 4 decimals.
    pub fn location_label(&self) -> String {
        match self.content_location.as_deref() {
            Some(loc) if !loc.is_empty() => loc.to_string(),
            _ => format!(
                "{}, {}",
                fixed4(self.lon_lat[1]),
                fixed4(self.lon_lat[0])
            ),
        }
    }
}

fn fixed4(v: f64) -> String {
    // -0.0 would otherwise print as "-0.0000".
    let v = if v == 0.0 { 0.0 } else { v };
    format!("{v:.4}")
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub features: Vec<PointFeature>,
}

#[derive(Debug)]
pub enum DatasetError {
    Decompress(String),
    Utf8(String),
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Decompress(e) => write!(f, "gzip decode failed: {e}"),
            DatasetError::Utf8(e) => write!(f, "dataset is not valid UTF-8: {e}"),
            DatasetError::Json(e) => write!(f, "JSON parse error: {e}"),
            DatasetError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            DatasetError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for DatasetError {}

impl Dataset {
    /// Decodes a dataset payload; gzip is detected by its magic bytes, anything
    /// else is treated as plain GeoJSON text.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DatasetError> {
        if bytes.starts_with(&GZIP_MAGIC) {
            return Self::from_gzip_bytes(bytes);
        }
        let text = std::str::from_utf8(bytes).map_err(|e| DatasetError::Utf8(e.to_string()))?;
        Self::from_geojson_str(text)
    }

    pub fn from_gzip_bytes(bytes: &[u8]) -> Result<Self, DatasetError> {
        let mut decoder = GzDecoder::new(bytes);
        let mut inflated = Vec::new();
        decoder
            .read_to_end(&mut inflated)
            .map_err(|e| DatasetError::Decompress(e.to_string()))?;
        let text = String::from_utf8(inflated).map_err(|e| DatasetError::Utf8(e.to_string()))?;
        Self::from_geojson_str(&text)
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, DatasetError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| DatasetError::Json(e.to_string()))?;
        Self::from_geojson_value(value)
    }

    pub fn from_geojson_value(value: Value) -> Result<Self, DatasetError> {
        let obj = value
            .as_object()
            .ok_or(DatasetError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(DatasetError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(DatasetError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(DatasetError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            match parse_feature(index, feat_val)
                .map_err(|reason| DatasetError::InvalidFeature { index, reason })?
            {
                Some(feature) => features.push(feature),
                None => tracing::warn!(index, "skipping feature without geometry"),
            }
        }

        tracing::info!(features = features.len(), "dataset decoded");
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PointFeature> {
        self.features.get(index)
    }

    /// Projected extent of every feature.
    pub fn extent(&self) -> Extent {
        Extent::from_points(self.features.iter().map(|f| f.coordinate))
    }
}

/// `Ok(None)` for a feature whose geometry is `null`.
fn parse_feature(index: usize, value: &Value) -> Result<Option<PointFeature>, String> {
    let obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("feature missing type".to_string())?;
    if ty != "Feature" {
        return Err(format!("unexpected feature type: {ty}"));
    }

    let geometry = obj
        .get("geometry")
        .ok_or("feature missing geometry".to_string())?;
    if geometry.is_null() {
        return Ok(None);
    }
    let lon_lat = parse_point_geometry(geometry)?;

    let empty = Map::new();
    let props = obj
        .get("properties")
        .and_then(|v| v.as_object())
        .unwrap_or(&empty);

    let description = props.get("description").and_then(|v| v.as_array());
    let describe = |i: usize| {
        description
            .and_then(|d| d.get(i))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    Ok(Some(PointFeature {
        index,
        lon_lat,
        coordinate: lon_lat_to_mercator(lon_lat),
        common_name: describe(0),
        scientific_name: describe(1),
        date_created: string_prop(props, "dateCreated"),
        audio: string_prop(props, "audio"),
        url: string_prop(props, "url"),
        creator: creator_prop(props),
        content_location: props
            .get("contentLocation")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    }))
}

fn parse_point_geometry(value: &Value) -> Result<[f64; 2], String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;
    if ty != "Point" {
        return Err(format!("unsupported geometry type: {ty}"));
    }
    let arr = obj
        .get("coordinates")
        .and_then(|v| v.as_array())
        .ok_or("Point coordinates must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("Point coordinates must have [lon, lat]".to_string());
    }
    let lon = arr[0]
        .as_f64()
        .ok_or("Point lon must be a number".to_string())?;
    let lat = arr[1]
        .as_f64()
        .ok_or("Point lat must be a number".to_string())?;
    if !lon.is_finite() || !lat.is_finite() {
        return Err("Point coordinates must be finite".to_string());
    }
    Ok([lon, lat])
}

fn string_prop(props: &Map<String, Value>, key: &str) -> String {
    props
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

// Creators are plain strings in the export, but schema.org style objects show
// up in hand-edited files.
fn creator_prop(props: &Map<String, Value>) -> String {
    match props.get("creator") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(o)) => o
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Dataset, DatasetError};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const DEMO: &str = include_str!("../../apps/web/assets/data/macaulaylibrary.geojson");

    fn gzip(payload: &[u8]) -> Vec<u8> {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        enc.write_all(payload).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn parses_demo_dataset() {
        let ds = Dataset::from_geojson_str(DEMO).expect("parse dataset");
        assert_eq!(ds.len(), 16);

        let first = &ds.features[0];
        assert_eq!(first.index, 0);
        assert_eq!(first.common_name, "American Robin");
        assert_eq!(first.scientific_name, "Turdus migratorius");
        assert_eq!(first.creator, "Wil Hershberger");
        assert_eq!(first.asset_id(), "100001");
        assert_eq!(first.lon_lat, [-76.4497, 42.4799]);
    }

    #[test]
    fn gzip_and_plain_payloads_decode_identically() {
        let plain = Dataset::from_bytes(DEMO.as_bytes()).expect("plain");
        let packed = Dataset::from_bytes(&gzip(DEMO.as_bytes())).expect("gzip");
        assert_eq!(plain, packed);
    }

    #[test]
    fn truncated_gzip_is_a_decompress_error() {
        let mut bytes = gzip(DEMO.as_bytes());
        bytes.truncate(bytes.len() / 2);
        let err = Dataset::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DatasetError::Decompress(_)), "{err}");
    }

    #[test]
    fn rejects_non_point_geometry() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}}
        ]}"#;
        let err = Dataset::from_geojson_str(payload).unwrap_err();
        match err {
            DatasetError::InvalidFeature { index, reason } => {
                assert_eq!(index, 0);
                assert!(reason.contains("LineString"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn skips_features_without_geometry() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"description":["Wren","Troglodytes"]},"geometry":null},
            {"type":"Feature","properties":{"description":["Robin","Turdus migratorius"]},"geometry":{"type":"Point","coordinates":[1,2]}},
            {"type":"Feature","properties":{},"geometry":null}
        ]}"#;
        let dataset = Dataset::from_geojson_str(payload).unwrap();
        assert_eq!(dataset.len(), 1);
        let robin = dataset.get(0).unwrap();
        assert_eq!(robin.index, 1);
        assert_eq!(robin.common_name, "Robin");
        assert_eq!(robin.lon_lat, [1.0, 2.0]);
    }

    #[test]
    fn rejects_bare_feature() {
        let payload = r#"{"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[0,0]}}"#;
        assert!(matches!(
            Dataset::from_geojson_str(payload),
            Err(DatasetError::NotAFeatureCollection)
        ));
    }

    #[test]
    fn location_label_falls_back_to_coordinates() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"contentLocation":""},"geometry":{"type":"Point","coordinates":[0,0]}},
            {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[-0.0,-12.345678]}},
            {"type":"Feature","properties":{"contentLocation":"Ithaca"},"geometry":{"type":"Point","coordinates":[1,2]}}
        ]}"#;
        let ds = Dataset::from_geojson_str(payload).expect("parse");
        assert_eq!(ds.features[0].location_label(), "0.0000, 0.0000");
        assert_eq!(ds.features[1].location_label(), "-12.3457, 0.0000");
        assert_eq!(ds.features[2].location_label(), "Ithaca");
    }

    #[test]
    fn creator_accepts_object_form() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"creator":{"name":"Lang Elliott"}},"geometry":{"type":"Point","coordinates":[0,0]}}
        ]}"#;
        let ds = Dataset::from_geojson_str(payload).expect("parse");
        assert_eq!(ds.features[0].creator, "Lang Elliott");
        assert_eq!(ds.features[0].common_name, "");
    }
}
