use formats::Dataset;
use foundation::bounds::Extent;
use layers::cluster::{Cluster, ClusterLayer};
use layers::point::PointLayer;
use layers::query::{HitOptions, clusters_at_pixel};
use layers::symbology::{ClusterStyle, at_max_zoom, cluster_style};
use results::{RenderRequest, RenderedBatch};

use crate::config::MapConfig;
use crate::panel::ResultsPanel;
use crate::view::{FitPadding, View, ViewState, Viewport};

const POINT_LAYER_ID: u64 = 1;
const CLUSTER_LAYER_ID: u64 = 2;

/// Golden-ratio split used to push a fitted single point to the right-hand
/// side of the screen, clear of the results panel.
const GOLDEN_RATIO: f64 = 1.61803844258;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    DatasetAlreadyLoaded,
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerError::DatasetAlreadyLoaded => write!(f, "dataset already loaded"),
        }
    }
}

impl std::error::Error for ControllerError {}

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetState {
    Loading,
    Ready,
    Failed(String),
}

/// View animation requested by a click.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewFit {
    pub target: ViewState,
    pub padding: FitPadding,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Nothing under the pointer, or no dataset yet.
    Ignored,
    /// Several locations: zoom in, panel untouched.
    ZoomToExtent(ViewFit),
    /// One location: the host renders `request` and hands the batch back to
    /// [`MapController::complete_render`].
    ShowResults { fit: ViewFit, request: RenderRequest },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledCluster {
    pub cluster: Cluster,
    pub style: ClusterStyle,
    /// Anchor in screen pixels.
    pub pixel: [f64; 2],
}

pub struct MapController {
    config: MapConfig,
    viewport: Viewport,
    view: View,
    layer: Option<ClusterLayer>,
    panel: ResultsPanel,
    state: DatasetState,
    hit_options: HitOptions,
}

impl MapController {
    pub fn new(config: MapConfig, viewport: Viewport) -> Self {
        let view = View::new(
            config.center_lon_lat,
            config.initial_zoom,
            config.min_zoom,
            config.max_zoom,
        );
        Self {
            config,
            viewport,
            view,
            layer: None,
            panel: ResultsPanel::new(),
            state: DatasetState::Loading,
            hit_options: HitOptions::default(),
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn panel(&self) -> &ResultsPanel {
        &self.panel
    }

    pub fn dataset_state(&self) -> &DatasetState {
        &self.state
    }

    pub fn source(&self) -> Option<&PointLayer> {
        self.layer.as_ref().map(|l| l.source())
    }

    /// Builds the point and cluster layers. A dataset is accepted once;
    /// a failed load is final too.
    pub fn load_dataset(&mut self, dataset: Dataset) -> Result<(), ControllerError> {
        if self.state != DatasetState::Loading {
            return Err(ControllerError::DatasetAlreadyLoaded);
        }
        tracing::info!(features = dataset.len(), "dataset ready");
        let points = PointLayer::new(POINT_LAYER_ID, dataset);
        self.layer = Some(ClusterLayer::new(
            CLUSTER_LAYER_ID,
            points,
            self.config.cluster_distance_px,
        ));
        self.state = DatasetState::Ready;
        Ok(())
    }

    pub fn fail_dataset(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.panel.show_error(format!("Unable to load recordings: {message}"));
        self.state = DatasetState::Failed(message);
    }

    /// Clusters at the current resolution. Empty until a dataset is loaded.
    pub fn clusters(&mut self) -> Vec<Cluster> {
        let resolution = self.view.resolution();
        match self.layer.as_mut() {
            Some(layer) => layer.clusters_at(resolution).to_vec(),
            None => Vec::new(),
        }
    }

    pub fn styled_clusters(&mut self) -> Vec<StyledCluster> {
        let clusters = self.clusters();
        let Some(source) = self.source() else {
            return Vec::new();
        };
        let zoom = self.view.zoom();
        let max_zoom = self.view.max_zoom();
        clusters
            .into_iter()
            .map(|cluster| StyledCluster {
                style: cluster_style(&cluster, source, zoom, max_zoom),
                pixel: self.view.coordinate_to_pixel(cluster.anchor, self.viewport),
                cluster,
            })
            .collect()
    }

    /// Below max zoom the panel is cleared and hidden.
    pub fn move_end(&mut self) {
        if self.state != DatasetState::Ready {
            return;
        }
        if !at_max_zoom(self.view.zoom(), self.view.max_zoom()) {
            self.panel.clear();
        }
    }

    pub fn click(&mut self, pixel: [f64; 2]) -> ClickOutcome {
        if self.state != DatasetState::Ready {
            return ClickOutcome::Ignored;
        }
        let clusters = self.clusters();
        let hits = clusters_at_pixel(
            &clusters,
            &self.view.projector(self.viewport),
            pixel,
            self.hit_options,
        );
        let Some(cluster) = hits.first().and_then(|h| clusters.get(h.cluster)) else {
            return ClickOutcome::Ignored;
        };
        let Some(source) = self.source() else {
            return ClickOutcome::Ignored;
        };

        let extent = cluster.member_extent(source);
        let vp = self.viewport;
        if extent.is_degenerate() {
            let padding = FitPadding::new(40.0, 0.0, vp.height_px - 40.0, vp.width_px / GOLDEN_RATIO);
            let features: Vec<_> = cluster
                .member_features(source)
                .take(self.config.max_cards)
                .cloned()
                .collect();
            let truncated = (cluster.len() > self.config.max_cards).then_some(self.config.max_cards);
            let fit = self.start_fit(&extent, padding);
            let generation = self.panel.begin_render(truncated);
            tracing::debug!(
                generation,
                members = cluster.len(),
                cards = features.len(),
                "rendering results"
            );
            ClickOutcome::ShowResults {
                fit,
                request: RenderRequest {
                    generation,
                    features,
                },
            }
        } else {
            let padding = FitPadding::new(80.0, 60.0, vp.height_px / 4.0, 60.0);
            ClickOutcome::ZoomToExtent(self.start_fit(&extent, padding))
        }
    }

    fn start_fit(&mut self, extent: &Extent, padding: FitPadding) -> ViewFit {
        let target = self.view.fit_target(extent, padding, self.viewport);
        let duration_ms = self.config.fit_duration_ms;
        self.view.animate_to(target, duration_ms);
        ViewFit {
            target,
            padding,
            duration_ms,
        }
    }

    /// Lands a rendered batch. `false` means it was stale and dropped.
    pub fn complete_render(&mut self, batch: RenderedBatch) -> bool {
        self.panel.complete(batch)
    }

    /// `true` on the frame an animation finishes; the host follows up with
    /// [`MapController::move_end`].
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.view.tick(now_ms)
    }

    pub fn is_animating(&self) -> bool {
        self.view.is_animating()
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.view.pan_by([dx, dy]);
    }

    pub fn zoom_by(&mut self, delta: f64, anchor_px: [f64; 2]) {
        self.view.zoom_by(delta, anchor_px, self.viewport);
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.view.cancel_animation();
        self.viewport = viewport;
    }
}
