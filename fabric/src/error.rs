//! Error types shared by the resolver, the overlay and the drivers.

use desc::DescriptionError;
use std::fmt::{Display, Formatter};

pub type Result<T> = core::result::Result<T, Error>;

/// Errors returned by every fallible operation of this crate.
///
/// None of them are retried internally; they reach the caller of the offending operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The overlay's image is not the one active on the hardware.
    NotLoaded,
    /// No child called `name` exists below `hierarchy` (empty for the root).
    NotFound { hierarchy: String, name: String },
    /// A value does not fit the addressed bit slice.
    ValueTooLarge { value: u32, bits: u32 },
    /// A bit index or range outside the channel's meaningful length.
    IndexOutOfRange { index: u32, length: u32 },
    /// A channel length outside `1..=max`.
    InvalidLength { length: u32, max: u32 },
    /// Only contiguous bit ranges are supported.
    UnsupportedSliceStep(u32),
    /// A direction name that is not one of `in`, `out`, `inout`.
    InvalidDirection(String),
    /// The image push was rejected by the configuration collaborator.
    Configuration(String),
    /// Read on an output-only slice or write on an input-only slice.
    DirectionMismatch { expected: &'static str },
    Mmio(MmioError),
    /// The description source could not produce the tables of an image.
    Description(String),
    /// A driver refused to bind to the record it was given.
    Probe { driver: &'static str, reason: String },
}

// region: Error Types

/// MMIO-related failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmioError {
    /// MMIO space is not enough.
    NotEnoughSpace,
    /// MMIO address is invalid or out of supported range.
    InvalidAddress,
    /// Device did not specify MMIO resources.
    AddressNotSpecified,
    /// A register access falls outside the mapped window.
    OutOfBounds { offset: usize, len: usize },
}

// endregion

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotLoaded => write!(f, "overlay not currently loaded"),
            Error::NotFound { hierarchy, name } if hierarchy.is_empty() => {
                write!(f, "could not find IP or hierarchy '{}' in overlay", name)
            }
            Error::NotFound { hierarchy, name } => {
                write!(f, "could not find IP or hierarchy '{}' in '{}'", name, hierarchy)
            }
            Error::ValueTooLarge { value, bits } => {
                write!(f, "{} too large for {} bits", value, bits)
            }
            Error::IndexOutOfRange { index, length } => {
                write!(f, "index {} out of range for length {}", index, length)
            }
            Error::InvalidLength { length, max } => {
                write!(f, "channel length {} not in 1..={}", length, max)
            }
            Error::UnsupportedSliceStep(step) => {
                write!(f, "steps other than 1 not supported (got {})", step)
            }
            Error::InvalidDirection(dir) => {
                write!(f, "direction should be one of in, out, inout (got '{}')", dir)
            }
            Error::Configuration(msg) => write!(f, "configuration failed: {}", msg),
            Error::DirectionMismatch { expected } => {
                write!(f, "slice does not support {} access", expected)
            }
            Error::Mmio(err) => write!(f, "mmio error: {:?}", err),
            Error::Description(msg) => write!(f, "description unavailable: {}", msg),
            Error::Probe { driver, reason } => write!(f, "driver {} rejected IP: {}", driver, reason),
        }
    }
}

impl std::error::Error for Error {}

impl From<MmioError> for Error {
    fn from(err: MmioError) -> Self {
        Error::Mmio(err)
    }
}

impl From<DescriptionError> for Error {
    fn from(err: DescriptionError) -> Self {
        Error::Description(err.to_string())
    }
}
