pub mod cluster;
pub mod layer;
pub mod point;
pub mod query;
pub mod symbology;

pub use layer::*;
