use std::collections::HashMap;

use formats::PointFeature;
use foundation::bounds::Extent;

use crate::layer::{Layer, LayerId};
use crate::point::PointLayer;

/// Default clustering threshold in screen pixels.
pub const DEFAULT_CLUSTER_DISTANCE_PX: f64 = 83.0;

/// A transient group of nearby features.
///
/// `members` are feature indices in source order; `anchor` is the members'
/// centroid in projected meters.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub members: Vec<usize>,
    pub anchor: [f64; 2],
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Union extent of the member geometries.
    pub fn member_extent(&self, source: &PointLayer) -> Extent {
        Extent::from_points(
            self.members
                .iter()
                .filter_map(|&i| source.feature(i))
                .map(|f| f.coordinate),
        )
    }

    pub fn member_features<'a>(
        &'a self,
        source: &'a PointLayer,
    ) -> impl Iterator<Item = &'a PointFeature> + 'a {
        self.members.iter().filter_map(|&i| source.feature(i))
    }
}

/// Distance-based clustering over a [`PointLayer`].
///
/// Features are visited in source order. Each feature not yet claimed seeds a
/// cluster with every unclaimed feature inside its pixel-distance box, so a
/// feature belongs to exactly one cluster. Results are cached per resolution.
#[derive(Debug, Clone)]
pub struct ClusterLayer {
    id: LayerId,
    source: PointLayer,
    distance_px: f64,
    cached: Option<(f64, Vec<Cluster>)>,
}

impl ClusterLayer {
    pub fn new(id: u64, source: PointLayer, distance_px: f64) -> Self {
        Self {
            id: LayerId(id),
            source,
            distance_px: distance_px.max(0.0),
            cached: None,
        }
    }

    pub fn source(&self) -> &PointLayer {
        &self.source
    }

    pub fn distance_px(&self) -> f64 {
        self.distance_px
    }

    /// Clusters at `resolution` (meters per pixel), recomputed when it changes.
    pub fn clusters_at(&mut self, resolution: f64) -> &[Cluster] {
        let stale = !matches!(&self.cached, Some((r, _)) if *r == resolution);
        if stale {
            let clusters = cluster_features(&self.source, self.distance_px * resolution);
            tracing::debug!(resolution, clusters = clusters.len(), "reclustered");
            self.cached = Some((resolution, clusters));
        }
        match &self.cached {
            Some((_, clusters)) => clusters,
            None => &[],
        }
    }
}

impl Layer for ClusterLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn data_extent(&self) -> Extent {
        self.source.extent()
    }
}

/// Groups features whose coordinates fall within `map_distance` (meters, per
/// axis) of a seed feature.
pub fn cluster_features(source: &PointLayer, map_distance: f64) -> Vec<Cluster> {
    let features = source.features();
    if features.is_empty() {
        return Vec::new();
    }

    let map_distance = if map_distance.is_nan() {
        0.0
    } else {
        map_distance.max(0.0)
    };
    // Cells at least as wide as the search radius: a seed's box only ever
    // overlaps its own cell and the 8 around it.
    let cell = map_distance.max(1.0);
    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, f) in features.iter().enumerate() {
        grid.entry(cell_of(f.coordinate, cell)).or_default().push(i);
    }

    let mut claimed = vec![false; features.len()];
    let mut out = Vec::new();

    for (seed, feature) in features.iter().enumerate() {
        if claimed[seed] {
            continue;
        }
        let search = Extent::from_point(feature.coordinate).buffered(map_distance);
        let (cx, cy) = cell_of(feature.coordinate, cell);

        let mut members = Vec::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                let Some(bucket) = grid.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &i in bucket {
                    if !claimed[i] && search.contains_point(features[i].coordinate) {
                        members.push(i);
                    }
                }
            }
        }
        members.sort_unstable();
        for &i in &members {
            claimed[i] = true;
        }

        let anchor = centroid(members.iter().map(|&i| features[i].coordinate));
        out.push(Cluster { members, anchor });
    }

    out
}

fn cell_of(p: [f64; 2], cell: f64) -> (i64, i64) {
    ((p[0] / cell).floor() as i64, (p[1] / cell).floor() as i64)
}

fn centroid(points: impl Iterator<Item = [f64; 2]>) -> [f64; 2] {
    let mut sum = [0.0, 0.0];
    let mut n = 0.0_f64;
    for p in points {
        sum[0] += p[0];
        sum[1] += p[1];
        n += 1.0;
    }
    if n <= 0.0 {
        return sum;
    }
    [sum[0] / n, sum[1] / n]
}
