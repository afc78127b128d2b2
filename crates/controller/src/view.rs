use foundation::bounds::Extent;
use foundation::math::{WORLD_WIDTH_M, lon_lat_to_mercator, resolution_for_zoom, zoom_for_resolution};
use layers::query::MapProjector;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width_px: f64,
    pub height_px: f64,
}

impl Viewport {
    pub fn new(width_px: f64, height_px: f64) -> Self {
        Self {
            width_px: width_px.max(1.0),
            height_px: height_px.max(1.0),
        }
    }
}

/// Screen-space margins kept clear when fitting an extent.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct FitPadding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl FitPadding {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewState {
    /// EPSG:3857 meters.
    pub center: [f64; 2],
    pub zoom: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewAnimation {
    pub from: ViewState,
    pub to: ViewState,
    pub duration_ms: f64,
    /// Set by the first tick.
    start_ms: Option<f64>,
}

impl ViewAnimation {
    pub fn new(from: ViewState, to: ViewState, duration_ms: f64) -> Self {
        Self {
            from,
            to,
            duration_ms: duration_ms.max(0.0),
            start_ms: None,
        }
    }

    /// State at `now_ms`, plus whether the animation has finished.
    pub fn sample(&mut self, now_ms: f64) -> (ViewState, bool) {
        let start = *self.start_ms.get_or_insert(now_ms);
        if self.duration_ms <= 0.0 {
            return (self.to, true);
        }
        let t = ((now_ms - start) / self.duration_ms).clamp(0.0, 1.0);
        if t >= 1.0 {
            return (self.to, true);
        }
        let e = ease_out(t);
        let lerp = |a: f64, b: f64| a + (b - a) * e;
        let state = ViewState {
            center: [
                lerp(self.from.center[0], self.to.center[0]),
                lerp(self.from.center[1], self.to.center[1]),
            ],
            zoom: lerp(self.from.zoom, self.to.zoom),
        };
        (state, false)
    }
}

fn ease_out(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// 2D slippy-map view over Web Mercator.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    center: [f64; 2],
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    animation: Option<ViewAnimation>,
}

impl View {
    pub fn new(center_lon_lat: [f64; 2], zoom: f64, min_zoom: f64, max_zoom: f64) -> Self {
        let mut view = Self {
            center: lon_lat_to_mercator(center_lon_lat),
            zoom: min_zoom,
            min_zoom,
            max_zoom,
            animation: None,
        };
        view.set_zoom(zoom);
        view
    }

    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn state(&self) -> ViewState {
        ViewState {
            center: self.center,
            zoom: self.zoom,
        }
    }

    /// Meters per pixel.
    pub fn resolution(&self) -> f64 {
        resolution_for_zoom(self.zoom)
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    pub fn set_center(&mut self, center: [f64; 2]) {
        if center[0].is_finite() && center[1].is_finite() {
            let half = 0.5 * WORLD_WIDTH_M;
            self.center = [center[0].clamp(-half, half), center[1].clamp(-half, half)];
        }
    }

    pub fn set_state(&mut self, state: ViewState) {
        self.set_zoom(state.zoom);
        self.set_center(state.center);
    }

    /// View that shows `extent` inside the padded viewport.
    ///
    /// A degenerate extent (or no room left after padding) resolves to the
    /// max zoom. The center shifts so the extent sits in the middle of the
    /// padded area rather than the middle of the screen.
    pub fn fit_target(&self, extent: &Extent, padding: FitPadding, viewport: Viewport) -> ViewState {
        let Some(center) = extent.center() else {
            return self.state();
        };
        let avail_w = viewport.width_px - padding.left - padding.right;
        let avail_h = viewport.height_px - padding.top - padding.bottom;
        let rx = axis_resolution(extent.width(), avail_w);
        let ry = axis_resolution(extent.height(), avail_h);
        let fitted = rx.max(ry);

        let zoom = if fitted > 0.0 && fitted.is_finite() {
            zoom_for_resolution(fitted).clamp(self.min_zoom, self.max_zoom)
        } else {
            self.max_zoom
        };
        let res = resolution_for_zoom(zoom);

        ViewState {
            center: [
                center[0] + 0.5 * (padding.right - padding.left) * res,
                center[1] + 0.5 * (padding.top - padding.bottom) * res,
            ],
            zoom,
        }
    }

    pub fn animate_to(&mut self, target: ViewState, duration_ms: f64) {
        self.animation = Some(ViewAnimation::new(self.state(), target, duration_ms));
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn cancel_animation(&mut self) {
        self.animation = None;
    }

    /// Advances a running animation; returns `true` on the tick it finishes.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        let (state, done) = animation.sample(now_ms);
        self.set_state(state);
        if done {
            self.animation = None;
        }
        done
    }

    pub fn coordinate_to_pixel(&self, coordinate: [f64; 2], viewport: Viewport) -> [f64; 2] {
        let res = self.resolution();
        [
            0.5 * viewport.width_px + (coordinate[0] - self.center[0]) / res,
            0.5 * viewport.height_px - (coordinate[1] - self.center[1]) / res,
        ]
    }

    pub fn pixel_to_coordinate(&self, pixel: [f64; 2], viewport: Viewport) -> [f64; 2] {
        let res = self.resolution();
        [
            self.center[0] + (pixel[0] - 0.5 * viewport.width_px) * res,
            self.center[1] - (pixel[1] - 0.5 * viewport.height_px) * res,
        ]
    }

    /// Drags the map content by a screen delta.
    pub fn pan_by(&mut self, delta_px: [f64; 2]) {
        self.cancel_animation();
        let res = self.resolution();
        self.set_center([
            self.center[0] - delta_px[0] * res,
            self.center[1] + delta_px[1] * res,
        ]);
    }

    /// Zooms by `delta` levels keeping the coordinate under `anchor_px` fixed.
    pub fn zoom_by(&mut self, delta: f64, anchor_px: [f64; 2], viewport: Viewport) {
        self.cancel_animation();
        let anchor = self.pixel_to_coordinate(anchor_px, viewport);
        self.set_zoom(self.zoom + delta);
        let res = self.resolution();
        self.set_center([
            anchor[0] - (anchor_px[0] - 0.5 * viewport.width_px) * res,
            anchor[1] + (anchor_px[1] - 0.5 * viewport.height_px) * res,
        ]);
    }

    pub fn projector(&self, viewport: Viewport) -> ViewProjector<'_> {
        ViewProjector {
            view: self,
            viewport,
        }
    }
}

fn axis_resolution(extent_m: f64, avail_px: f64) -> f64 {
    if extent_m <= 0.0 {
        0.0
    } else if avail_px <= 0.0 {
        f64::INFINITY
    } else {
        extent_m / avail_px
    }
}

pub struct ViewProjector<'a> {
    view: &'a View,
    viewport: Viewport,
}

impl MapProjector for ViewProjector<'_> {
    fn project(&self, coordinate: [f64; 2]) -> Option<[f64; 2]> {
        let p = self.view.coordinate_to_pixel(coordinate, self.viewport);
        (p[0].is_finite() && p[1].is_finite()).then_some(p)
    }
}
