//! Overlays: one configuration image and the namespace of the design it carries.
//!
//! An [Overlay] is [OverlayState::Unbound] until it is downloaded, [OverlayState::Active] while
//! its image is the one on the hardware, and [OverlayState::Stale] once another image has
//! replaced it. Staleness is only noticed when the hardware is asked, i.e. on the next
//! resolution or state query.
//!
//! Names are resolved through the root [IpMap] only while the overlay is active; otherwise
//! resolution fails with [Error::NotLoaded].
use crate::{
    debug_ex,
    dev::{
        driver::DriverContext,
        ipmap::{Child, IpMap},
        platform::ImageId,
    },
    error::{Error, Result},
};
use desc::{
    AttributeRecord, ClockEntry, Description, DescriptionTables, GpioEntry, InterruptController,
    InterruptPin,
};
use log::{error, info};
use spin::RwLock;
use std::{
    collections::BTreeMap,
    fmt::Debug,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    /// Not downloaded by this overlay, and not on the hardware.
    Unbound,
    Active,
    /// Downloaded earlier, since replaced by another image.
    Stale,
}

pub struct Overlay {
    image: ImageId,
    context: DriverContext,
    tables: RwLock<DescriptionTables>,
    ip_map: IpMap,
    downloaded: AtomicBool,
}

impl Overlay {
    /// Read the description of `image` without touching the hardware.
    pub fn new(image: ImageId, context: DriverContext) -> Result<Overlay> {
        let tables = context.platform.description.load_description(&image)?;
        let description = Description::build(&tables)?;
        debug_ex!(
            "Overlay '{}': {} IP, {} clocks.",
            image.path.display(),
            tables.ip_dict.len(),
            tables.clock_dict.len()
        );
        let ip_map = IpMap::new("", description, context.clone());
        Ok(Overlay {
            image,
            context,
            tables: RwLock::new(tables),
            ip_map,
            downloaded: AtomicBool::new(false),
        })
    }

    /// Read the description of `image` and download it.
    pub fn open(image: ImageId, context: DriverContext) -> Result<Overlay> {
        let overlay = Overlay::new(image, context)?;
        overlay.download()?;
        Ok(overlay)
    }

    pub fn image(&self) -> &ImageId {
        &self.image
    }

    /// Configure the clocks, push the image and reset the hardware-side state.
    ///
    /// Either every step completes or the overlay is left as it was; a failed push leaves
    /// whatever the hardware reports as active.
    pub fn download(&self) -> Result<()> {
        let platform = &self.context.platform;
        let clocks: Vec<(u32, ClockEntry)> = self
            .tables
            .read()
            .clock_dict
            .iter()
            .map(|(line, entry)| (*line, *entry))
            .collect();
        for (line, entry) in clocks {
            if entry.enable {
                platform.clocks.set_clock(line, entry.divisor0, entry.divisor1);
            } else {
                platform.clocks.set_default(line);
            }
        }
        platform
            .fabric
            .push(&self.image)
            .inspect_err(|err| error!("Download of '{}' failed: {}", self.image.path.display(), err))?;
        platform.fabric.reset_hardware();
        self.downloaded.store(true, Ordering::Release);
        info!("Downloaded overlay '{}'.", self.image.path.display());
        Ok(())
    }

    /// Whether this overlay's image is the one active on the hardware.
    pub fn is_loaded(&self) -> bool {
        self.context
            .platform
            .fabric
            .current_identity()
            .is_some_and(|active| self.image.matches(&active))
    }

    pub fn state(&self) -> OverlayState {
        if self.is_loaded() {
            OverlayState::Active
        } else if self.downloaded.load(Ordering::Acquire) {
            OverlayState::Stale
        } else {
            OverlayState::Unbound
        }
    }

    /// Rebuild the tables from the description source. The hardware-side state is reset too
    /// when the overlay is active.
    ///
    /// Children already bound stay bound.
    pub fn reset(&self) -> Result<()> {
        let tables = self.context.platform.description.load_description(&self.image)?;
        *self.tables.write() = tables;
        if self.is_loaded() {
            self.context.platform.fabric.reset_hardware();
        } else {
            debug_ex!("Overlay '{}' not loaded; tables only.", self.image.path.display());
        }
        Ok(())
    }

    /// Load `data` into the IP called `ip_name` and record it as the IP's state.
    ///
    /// `ip_name` is a full path into the IP table; unknown names fail before the hardware is
    /// touched.
    pub fn load_ip_data(&self, ip_name: &str, data: &Path) -> Result<()> {
        if !self.tables.read().ip_dict.contains_key(ip_name) {
            return Err(Error::NotFound {
                hierarchy: String::new(),
                name: ip_name.to_string(),
            });
        }
        self.context.platform.fabric.load_ip_data(ip_name, data)?;
        if let Some(record) = self.tables.write().ip_dict.get_mut(ip_name) {
            record.state = Some(data.display().to_string());
        }
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Child> {
        self.ensure_loaded()?;
        self.ip_map.resolve(name)
    }

    /// Resolve a `/`-separated path such as `iop1/mb_bram_ctrl`.
    pub fn resolve_path(&self, path: &str) -> Result<Child> {
        self.ensure_loaded()?;
        self.ip_map.resolve_path(path)
    }

    /// Every name visible at the root, sorted and without duplicates.
    pub fn names(&self) -> Vec<String> {
        self.ip_map.names()
    }

    pub fn describe(&self) -> String {
        let stem = self
            .image
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.ip_map
            .describe(&format!("Default documentation for overlay {}", stem))
    }

    pub fn ip_map(&self) -> &IpMap {
        &self.ip_map
    }

    pub fn ip_dict(&self) -> BTreeMap<String, AttributeRecord> {
        self.tables.read().ip_dict.clone()
    }

    pub fn gpio_dict(&self) -> BTreeMap<String, GpioEntry> {
        self.tables.read().gpio_dict.clone()
    }

    pub fn interrupt_controllers(&self) -> BTreeMap<String, InterruptController> {
        self.tables.read().interrupt_controllers.clone()
    }

    pub fn interrupt_pins(&self) -> BTreeMap<String, InterruptPin> {
        self.tables.read().interrupt_pins.clone()
    }

    pub fn clock_dict(&self) -> BTreeMap<u32, ClockEntry> {
        self.tables.read().clock_dict.clone()
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(Error::NotLoaded)
        }
    }
}

impl Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("image", &self.image)
            .field("ip_map", &self.ip_map)
            .finish()
    }
}
