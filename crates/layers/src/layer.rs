use foundation::bounds::Extent;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// A map layer over projected (EPSG:3857) data.
pub trait Layer {
    fn id(&self) -> LayerId;

    /// Extent of everything the layer draws; empty without data.
    fn data_extent(&self) -> Extent;
}
