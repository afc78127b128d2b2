use crate::cluster::Cluster;
use crate::symbology::MARKER_RADIUS_PX;

/// Maps projected coordinates (meters) to screen pixels.
pub trait MapProjector {
    fn project(&self, coordinate: [f64; 2]) -> Option<[f64; 2]>;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HitOptions {
    /// Pick radius around each cluster anchor.
    pub tolerance_px: f64,
}

impl Default for HitOptions {
    fn default() -> Self {
        Self {
            // Marker radius plus half of its white stroke.
            tolerance_px: MARKER_RADIUS_PX as f64 + 1.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClusterHit {
    /// Index into the slice passed to [`clusters_at_pixel`].
    pub cluster: usize,
    pub distance_px: f64,
}

/// Clusters whose markers cover `pixel`, nearest first.
///
/// Ties keep the lower cluster index first.
pub fn clusters_at_pixel<P: MapProjector>(
    clusters: &[Cluster],
    projector: &P,
    pixel: [f64; 2],
    opts: HitOptions,
) -> Vec<ClusterHit> {
    let mut hits = Vec::new();
    for (i, cluster) in clusters.iter().enumerate() {
        if cluster.is_empty() {
            continue;
        }
        let Some(screen) = projector.project(cluster.anchor) else {
            continue;
        };
        let dx = screen[0] - pixel[0];
        let dy = screen[1] - pixel[1];
        let d = (dx * dx + dy * dy).sqrt();
        if d.is_finite() && d <= opts.tolerance_px {
            hits.push(ClusterHit {
                cluster: i,
                distance_px: d,
            });
        }
    }
    hits.sort_by(|a, b| {
        a.distance_px
            .total_cmp(&b.distance_px)
            .then_with(|| a.cluster.cmp(&b.cluster))
    });
    hits
}
