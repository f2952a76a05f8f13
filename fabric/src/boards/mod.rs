//! Overlays of specific boards.

pub mod base;
