//! Flat hardware description of a configuration image.
//!
//! The toolchain describes a design as tables keyed by `/`-separated paths. This crate holds
//! those tables ([DescriptionTables]), folds them into a [Description] whose records carry
//! their own GPIO and interrupt pins, and cuts a description into the slice seen below a
//! hierarchy prefix.

pub mod node;
pub mod prop;

pub use node::{ChildKind, Description};
pub use prop::{
    AttributeRecord, ClockEntry, DescriptionError, DescriptionTables, GpioEntry,
    InterruptController, InterruptPin,
};
