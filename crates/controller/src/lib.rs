pub mod config;
pub mod controller;
pub mod loader;
pub mod panel;
pub mod view;

pub use config::*;
pub use controller::*;
pub use loader::*;
pub use panel::*;
pub use view::*;
