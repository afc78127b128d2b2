use formats::{Dataset, PointFeature};
use foundation::bounds::Extent;

use crate::layer::{Layer, LayerId};

/// Vector source holding the loaded recordings in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLayer {
    id: LayerId,
    dataset: Dataset,
}

impl PointLayer {
    pub fn new(id: u64, dataset: Dataset) -> Self {
        Self {
            id: LayerId(id),
            dataset,
        }
    }

    pub fn features(&self) -> &[PointFeature] {
        &self.dataset.features
    }

    pub fn feature(&self, index: usize) -> Option<&PointFeature> {
        self.dataset.get(index)
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn extent(&self) -> Extent {
        self.dataset.extent()
    }
}

impl Layer for PointLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn data_extent(&self) -> Extent {
        self.extent()
    }
}
