//! fabric: typed, lazily bound access to the IP blocks of a programmable-logic overlay.
//!
//! An [Overlay](dev::overlay::Overlay) reads the flat description of a configuration image
//! and exposes its IP blocks, hierarchies and pins by name. Each name is bound to the most
//! specific registered driver the first time it is resolved.

pub mod boards;
pub mod config;
pub mod dev;
pub mod drivers;
pub mod error;
#[macro_use]
pub mod logging;

pub use config::FabricConfig;
pub use dev::{
    driver::{DriverContext, DriverRegistry},
    ipmap::Child,
    overlay::{Overlay, OverlayState},
    platform::{ImageId, Platform},
};
pub use error::{Error, Result};
