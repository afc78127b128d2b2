/// Axis-aligned bounding box in projected map coordinates.
///
/// An empty extent has `min = +inf` and `max = -inf`, so extending it with the
/// first point yields a degenerate box around that point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Default for Extent {
    fn default() -> Self {
        Self::empty()
    }
}

impl Extent {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Extent { min, max }
    }

    pub fn empty() -> Self {
        Extent {
            min: [f64::INFINITY, f64::INFINITY],
            max: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        }
    }

    pub fn from_point(p: [f64; 2]) -> Self {
        Extent { min: p, max: p }
    }

    /// Union of the given points. Empty input yields an empty extent.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let mut extent = Self::empty();
        for p in points {
            extent.extend_point(p);
        }
        extent
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    /// True for a non-empty extent that collapses to a single point.
    pub fn is_degenerate(&self) -> bool {
        !self.is_empty() && self.min[0] == self.max[0] && self.min[1] == self.max[1]
    }

    pub fn extend_point(&mut self, p: [f64; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    pub fn extend(&mut self, other: &Extent) {
        if other.is_empty() {
            return;
        }
        self.extend_point(other.min);
        self.extend_point(other.max);
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max[0] - self.min[0]
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max[1] - self.min[1]
        }
    }

    pub fn center(&self) -> Option<[f64; 2]> {
        if self.is_empty() {
            return None;
        }
        Some([
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
        ])
    }

    /// Grows the extent by `d` on every side.
    pub fn buffered(&self, d: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        Extent {
            min: [self.min[0] - d, self.min[1] - d],
            max: [self.max[0] + d, self.max[1] + d],
        }
    }

    /// Inclusive on all edges.
    pub fn contains_point(&self, p: [f64; 2]) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }
}
