//! Runtime configuration of the host board.
//!
//! Read from a JSON file; every field falls back to the Pynq-Z1 layout when absent.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

pub const DEFAULT_OVERLAY_ROOT: &str = "/home/xilinx/pynq/bitstream";

/// The processing system exposes its fabric-facing EMIO lines after the 54 MIO lines.
pub const DEFAULT_GPIO_USER_OFFSET: u32 = 54;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Directory holding one sub-directory per image.
    pub overlay_root: PathBuf,
    /// Platform number of the first line of the processing-system GPIO controller.
    pub gpio_base: u32,
    /// Offset of the first fabric GPIO line within that controller.
    pub gpio_user_offset: u32,
}

impl Default for FabricConfig {
    fn default() -> Self {
        FabricConfig {
            overlay_root: PathBuf::from(DEFAULT_OVERLAY_ROOT),
            gpio_base: 0,
            gpio_user_offset: DEFAULT_GPIO_USER_OFFSET,
        }
    }
}

impl FabricConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<FabricConfig> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| Error::Description(format!("{}: {}", path.display(), err)))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<FabricConfig> {
        serde_json::from_str(text).map_err(|err| Error::Description(err.to_string()))
    }

    /// Platform GPIO line number of the fabric GPIO with user index `index`.
    pub fn gpio_line(&self, index: u32) -> u32 {
        self.gpio_base + self.gpio_user_offset + index
    }
}
