//! Attribute records attached to the names of a flat hardware description.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// One addressable hardware block.
///
/// `gpio` and `interrupts` are never read from the toolchain tables; they are filled in by
/// [crate::node::Description::build] with the pins whose parent path is this block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Full path of the block from the root, stamped in when the block is bound to a driver.
    #[serde(default)]
    pub fullpath: Option<String>,
    #[serde(default)]
    pub phys_addr: Option<u64>,
    #[serde(default)]
    pub addr_range: Option<u64>,
    /// Vendor-qualified interface identifier (VLNV), the key of the IP driver table.
    #[serde(rename = "type", default)]
    pub type_tag: Option<String>,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(skip)]
    pub gpio: BTreeMap<String, GpioEntry>,
    #[serde(skip)]
    pub interrupts: BTreeMap<String, InterruptPin>,
}

impl AttributeRecord {
    pub fn with_type(type_tag: impl Into<String>) -> AttributeRecord {
        AttributeRecord {
            type_tag: Some(type_tag.into()),
            ..Default::default()
        }
    }

    pub fn with_address(mut self, phys_addr: u64, addr_range: u64) -> AttributeRecord {
        self.phys_addr = Some(phys_addr);
        self.addr_range = Some(addr_range);
        self
    }
}

/// A GPIO line driven by the processing system into the fabric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpioEntry {
    /// User index of the line, starting from 0.
    pub index: u32,
    /// Full paths of the fabric pins this line is wired to.
    #[serde(default)]
    pub pins: Vec<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// A fabric pin attached to an interrupt controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterruptPin {
    pub controller: String,
    pub index: u32,
}

/// An interrupt controller; `parent` is empty when it feeds the processing system directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterruptController {
    #[serde(default)]
    pub parent: String,
    pub index: u32,
}

/// Clock requirement of an image for one fabric clock line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockEntry {
    pub enable: bool,
    #[serde(default)]
    pub divisor0: u32,
    #[serde(default)]
    pub divisor1: u32,
}

/// The five tables produced for one configuration image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptionTables {
    #[serde(default)]
    pub ip_dict: BTreeMap<String, AttributeRecord>,
    #[serde(default)]
    pub gpio_dict: BTreeMap<String, GpioEntry>,
    #[serde(default)]
    pub interrupt_controllers: BTreeMap<String, InterruptController>,
    #[serde(default)]
    pub interrupt_pins: BTreeMap<String, InterruptPin>,
    #[serde(default)]
    pub clock_dict: BTreeMap<u32, ClockEntry>,
}

impl DescriptionTables {
    pub fn from_json(text: &str) -> Result<DescriptionTables, DescriptionError> {
        serde_json::from_str(text).map_err(|err| DescriptionError::InvalidFormat(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionError {
    InvalidFormat(String),
    /// A path with an empty segment such as `a//b` or `/a`.
    MalformedPath(String),
}

impl Display for DescriptionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptionError::InvalidFormat(msg) => write!(f, "invalid description format: {}", msg),
            DescriptionError::MalformedPath(path) => write!(f, "malformed path '{}'", path),
        }
    }
}

impl std::error::Error for DescriptionError {}
