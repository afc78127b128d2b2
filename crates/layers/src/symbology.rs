use crate::cluster::Cluster;
use crate::point::PointLayer;

pub const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
/// `#77CCC7`
pub const MARKER_FILL: [f32; 4] = [119.0 / 255.0, 204.0 / 255.0, 199.0 / 255.0, 1.0];

pub const MARKER_RADIUS_PX: f32 = 17.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CircleStyle {
    pub radius_px: f32,
    pub fill: [f32; 4],
    pub stroke: [f32; 4],
    pub stroke_width_px: f32,
}

impl Default for CircleStyle {
    fn default() -> Self {
        Self {
            radius_px: MARKER_RADIUS_PX,
            fill: MARKER_FILL,
            stroke: WHITE,
            stroke_width_px: 2.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub text: String,
    /// CSS font shorthand.
    pub font: &'static str,
    pub align: TextAlign,
    pub offset_px: [f32; 2],
    pub fill: [f32; 4],
    pub halo: Option<([f32; 4], f32)>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MarkerText {
    /// Member count drawn inside the marker.
    Count,
    /// Location label drawn beside the marker.
    Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStyle {
    pub circle: CircleStyle,
    pub kind: MarkerText,
    pub text: TextStyle,
}

/// Whether `zoom` sits at the view's zoom ceiling.
pub fn at_max_zoom(zoom: f64, max_zoom: f64) -> bool {
    zoom >= max_zoom
}

/// Style for one cluster at `zoom`.
///
/// A lone feature at max zoom gets its location label; everything else shows
/// the member count.
pub fn cluster_style(
    cluster: &Cluster,
    source: &PointLayer,
    zoom: f64,
    max_zoom: f64,
) -> ClusterStyle {
    let single = match cluster.members.as_slice() {
        [only] => source.feature(*only),
        _ => None,
    };

    match single {
        Some(feature) if at_max_zoom(zoom, max_zoom) => ClusterStyle {
            circle: CircleStyle::default(),
            kind: MarkerText::Location,
            text: TextStyle {
                text: feature.location_label(),
                font: "bold 12px sans-serif",
                align: TextAlign::Left,
                offset_px: [16.0, 0.0],
                fill: BLACK,
                halo: Some((WHITE, 5.0)),
            },
        },
        _ => ClusterStyle {
            circle: CircleStyle::default(),
            kind: MarkerText::Count,
            text: TextStyle {
                text: cluster.len().to_string(),
                font: "10px sans-serif",
                align: TextAlign::Center,
                offset_px: [0.0, 1.0],
                fill: BLACK,
                halo: None,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::cluster_features;
    use crate::cluster::tests::{demo_layer, layer_from_lon_lats};
    use foundation::math::resolution_for_zoom;
    use pretty_assertions::assert_eq;

    const MAX_ZOOM: f64 = 13.0;

    #[test]
    fn lone_feature_at_origin_shows_coordinates() {
        let source = layer_from_lon_lats(&[[0.0, 0.0]]);
        let clusters = cluster_features(&source, 83.0 * resolution_for_zoom(MAX_ZOOM));
        let style = cluster_style(&clusters[0], &source, MAX_ZOOM, MAX_ZOOM);
        assert_eq!(style.kind, MarkerText::Location);
        assert_eq!(style.text.text, "0.0000, 0.0000");
        assert_eq!(style.text.align, TextAlign::Left);
        assert_eq!(style.text.halo, Some((WHITE, 5.0)));
    }

    #[test]
    fn lone_feature_prefers_free_text_location() {
        let source = demo_layer();
        let clusters = cluster_features(&source, 83.0 * resolution_for_zoom(MAX_ZOOM));
        let london = clusters
            .iter()
            .find(|c| c.members == vec![15])
            .expect("london cluster");
        let style = cluster_style(london, &source, MAX_ZOOM, MAX_ZOOM);
        assert_eq!(style.text.text, "London, England");
    }

    #[test]
    fn below_max_zoom_every_cluster_shows_its_count() {
        let source = demo_layer();
        for zoom in [1.0, 5.0, 12.0, 12.999] {
            for cluster in cluster_features(&source, 83.0 * resolution_for_zoom(zoom)) {
                let style = cluster_style(&cluster, &source, zoom, MAX_ZOOM);
                assert_eq!(style.kind, MarkerText::Count);
                assert_eq!(style.text.text, cluster.len().to_string());
            }
        }
    }

    #[test]
    fn multi_feature_cluster_shows_count_at_max_zoom() {
        let source = demo_layer();
        let clusters = cluster_features(&source, 83.0 * resolution_for_zoom(MAX_ZOOM));
        let style = cluster_style(&clusters[0], &source, MAX_ZOOM, MAX_ZOOM);
        assert_eq!(style.kind, MarkerText::Count);
        assert_eq!(style.text.text, "12");
        assert_eq!(style.circle, CircleStyle::default());
    }
}
