//! Collaborators the runtime depends on but does not implement.
//!
//! Responsibilities:
//! - [DescriptionSource] turns an image identity into the tables of its design.
//! - [FabricManager] pushes images to the shared hardware and reports which one is active.
//!   It also arbitrates between processes; the runtime only does local bookkeeping.
//! - [ClockControl] programs the fabric clock lines.
//! - [IoProvider] creates register windows, GPIO lines and interrupt handles.
//!
//! A [Platform] bundles one implementation of each together with the board configuration.
use crate::{
    config::FabricConfig,
    dev::{gpio::Direction, gpio::GpioLine, intc::InterruptLine, mmio::RegisterTransport},
    error::Result,
};
use desc::DescriptionTables;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Identity of a configuration image.
///
/// The fingerprint is a content token (e.g. the build timestamp embedded in the image). When
/// it is absent or empty, the file path identifies the image instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId {
    pub path: PathBuf,
    pub fingerprint: Option<String>,
}

impl ImageId {
    pub fn new(path: impl Into<PathBuf>) -> ImageId {
        ImageId {
            path: path.into(),
            fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> ImageId {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Resolve an image file name against the overlay root: `base.bit` lives in
    /// `<overlay_root>/base/base.bit`. Absolute paths are taken as they are.
    pub fn locate(config: &FabricConfig, name: &str) -> ImageId {
        let file = Path::new(name);
        if file.is_absolute() {
            return ImageId::new(file);
        }
        let stem = name.strip_suffix(".bit").unwrap_or(name);
        ImageId::new(config.overlay_root.join(stem).join(name))
    }

    /// Whether `active`, as reported by the hardware, is this image.
    pub fn matches(&self, active: &ImageId) -> bool {
        match self.fingerprint.as_deref() {
            Some(fingerprint) if !fingerprint.is_empty() => {
                active.fingerprint.as_deref() == Some(fingerprint)
            }
            _ => self.path == active.path,
        }
    }
}

pub trait DescriptionSource: Send + Sync {
    fn load_description(&self, image: &ImageId) -> Result<DescriptionTables>;
}

pub trait FabricManager: Send + Sync {
    /// Program `image` onto the fabric. Fails with [crate::Error::Configuration].
    fn push(&self, image: &ImageId) -> Result<()>;
    /// The image currently active on the hardware, if any.
    fn current_identity(&self) -> Option<ImageId>;
    /// Reset the shared per-hardware state kept for the active image.
    fn reset_hardware(&self);
    /// Load a program or data file into an addressable IP (e.g. a soft processor's memory).
    fn load_ip_data(&self, ip_name: &str, data: &Path) -> Result<()>;
}

pub trait ClockControl: Send + Sync {
    fn set_clock(&self, line: u32, divisor0: u32, divisor1: u32);
    /// Leave `line` at its default frequency.
    fn set_default(&self, line: u32);
}

pub trait IoProvider: Send + Sync {
    fn map(&self, phys_addr: u64, addr_range: u64) -> Result<Arc<dyn RegisterTransport>>;
    fn gpio(&self, line: u32, direction: Direction) -> Result<Arc<dyn GpioLine>>;
    fn interrupt(&self, pin: &str) -> Result<Arc<dyn InterruptLine>>;
}

#[derive(Clone)]
pub struct Platform {
    pub description: Arc<dyn DescriptionSource>,
    pub fabric: Arc<dyn FabricManager>,
    pub clocks: Arc<dyn ClockControl>,
    pub io: Arc<dyn IoProvider>,
    pub config: Arc<FabricConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_takes_precedence() {
        let ours = ImageId::new("/a/base.bit").with_fingerprint("2024/01/01 12:00:00");
        let same_file_rebuilt = ImageId::new("/a/base.bit").with_fingerprint("2024/02/02 08:00:00");
        let copied = ImageId::new("/b/base.bit").with_fingerprint("2024/01/01 12:00:00");
        assert!(!ours.matches(&same_file_rebuilt));
        assert!(ours.matches(&copied));
    }

    #[test]
    fn path_identifies_unstamped_images() {
        let ours = ImageId::new("/a/base.bit").with_fingerprint("");
        assert!(ours.matches(&ImageId::new("/a/base.bit")));
        assert!(!ours.matches(&ImageId::new("/a/other.bit")));
    }

    #[test]
    fn locate_under_overlay_root() {
        let config = FabricConfig {
            overlay_root: PathBuf::from("/opt/overlays"),
            ..Default::default()
        };
        assert_eq!(
            ImageId::locate(&config, "base.bit").path,
            PathBuf::from("/opt/overlays/base/base.bit")
        );
        assert_eq!(
            ImageId::locate(&config, "/tmp/custom.bit").path,
            PathBuf::from("/tmp/custom.bit")
        );
    }
}
