//! Result cards for clicked recordings.
//!
//! A card pairs one recording with a species photo resolved through an
//! external taxonomy lookup. Network, image decoding and timers are behind
//! small traits so the same renderer runs in the browser and natively.

pub mod card;
pub mod render;
pub mod taxa;

pub use card::*;
pub use render::*;
pub use taxa::*;
