//! Driver model, namespace resolution and overlay lifecycle.

pub mod default;
pub mod driver;
pub mod gpio;
pub mod handle;
pub mod info;
pub mod intc;
pub mod ipmap;
pub mod mmio;
pub mod overlay;
pub mod platform;
