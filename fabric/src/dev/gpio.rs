//! Direction of a GPIO line or bit slice, and the processing-system GPIO line handle.

use crate::error::{Error, Result};
use core::{fmt::Debug, str::FromStr};

/// What a line or slice may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
    InOut,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "in",
            Direction::Output => "out",
            Direction::InOut => "inout",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Direction> {
        match s {
            "in" => Ok(Direction::Input),
            "out" => Ok(Direction::Output),
            "inout" => Ok(Direction::InOut),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

/// A processing-system GPIO line wired into the fabric.
///
/// Lines are created by the platform's I/O provider from a platform line number; the resolver
/// only constructs and caches them.
pub trait GpioLine: Debug + Send + Sync {
    /// Platform line number.
    fn number(&self) -> u32;
    fn direction(&self) -> Direction;
    fn read(&self) -> Result<bool>;
    fn write(&self, value: bool) -> Result<()>;
}
