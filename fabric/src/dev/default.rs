//! Drivers used when the registry has nothing more specific.
use crate::{
    debug_ex,
    dev::{
        driver::{DriverContext, Hierarchy, HierarchyDriver, Ip, IpDriver},
        gpio::{Direction, GpioLine},
        ipmap::{IpMap, join},
        intc::InterruptLine,
        mmio::{IoRange, RegisterTransport},
    },
    error::{Error, MmioError, Result},
};
use desc::{AttributeRecord, Description};
use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

/// Generic IP: raw register access plus the IP's own interrupt and GPIO pins.
///
/// The pins are created when the IP is bound, so they are claimed exactly once per IP.
pub struct DefaultIp {
    record: AttributeRecord,
    mmio: Option<Arc<dyn RegisterTransport>>,
    interrupts: BTreeMap<String, Arc<dyn InterruptLine>>,
    gpio: BTreeMap<String, Arc<dyn GpioLine>>,
}

impl DefaultIp {
    pub fn new(ctx: &DriverContext, record: AttributeRecord) -> Result<DefaultIp> {
        let io = &ctx.platform.io;
        let mmio = match IoRange::from_record(&record) {
            Ok(range) => Some(io.map(range.start, range.len)?),
            Err(_) => None,
        };
        let path = record.fullpath.as_deref().unwrap_or_default();
        let mut interrupts = BTreeMap::new();
        for pin in record.interrupts.keys() {
            interrupts.insert(pin.clone(), io.interrupt(&join(path, pin))?);
        }
        let mut gpio = BTreeMap::new();
        for (pin, entry) in &record.gpio {
            let line = ctx.platform.config.gpio_line(entry.index);
            gpio.insert(pin.clone(), io.gpio(line, Direction::Output)?);
        }
        Ok(DefaultIp {
            record,
            mmio,
            interrupts,
            gpio,
        })
    }

    pub fn mmio(&self) -> Result<&Arc<dyn RegisterTransport>> {
        self.mmio
            .as_ref()
            .ok_or(Error::Mmio(MmioError::AddressNotSpecified))
    }

    pub fn read(&self, offset: usize) -> Result<u32> {
        self.mmio()?.read(offset)
    }

    pub fn write(&self, offset: usize, value: u32) -> Result<()> {
        self.mmio()?.write(offset, value)
    }

    pub fn interrupt(&self, pin: &str) -> Option<&Arc<dyn InterruptLine>> {
        self.interrupts.get(pin)
    }

    pub fn gpio(&self, pin: &str) -> Option<&Arc<dyn GpioLine>> {
        self.gpio.get(pin)
    }
}

impl Ip for DefaultIp {
    fn record(&self) -> &AttributeRecord {
        &self.record
    }
}

impl Debug for DefaultIp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultIp")
            .field("fullpath", &self.record.fullpath)
            .field("type", &self.record.type_tag)
            .field("interrupts", &self.interrupts.keys())
            .field("gpio", &self.gpio.keys())
            .finish()
    }
}

#[derive(Debug)]
pub struct DefaultIpDriver;

impl IpDriver for DefaultIpDriver {
    fn get_name(&self) -> &'static str {
        "DefaultIp"
    }

    /// Never looked up by tag.
    fn get_bindto(&self) -> &'static [&'static str] {
        &[]
    }

    fn probe(&self, ctx: &DriverContext, record: AttributeRecord) -> Result<Arc<dyn Ip>> {
        Ok(Arc::new(DefaultIp::new(ctx, record)?))
    }
}

/// A hierarchy with no behavior of its own: just its namespace.
#[derive(Debug)]
pub struct DefaultHierarchy {
    map: IpMap,
}

impl DefaultHierarchy {
    pub fn new(ctx: &DriverContext, path: &str, description: Description) -> DefaultHierarchy {
        DefaultHierarchy {
            map: IpMap::new(path, description, ctx.clone()),
        }
    }
}

impl Hierarchy for DefaultHierarchy {
    fn ip_map(&self) -> &IpMap {
        &self.map
    }
}

#[derive(Debug)]
pub struct DefaultHierarchyDriver;

impl HierarchyDriver for DefaultHierarchyDriver {
    fn get_name(&self) -> &'static str {
        "DefaultHierarchy"
    }

    fn check_hierarchy(&self, _path: &str, _description: &Description) -> bool {
        false
    }

    fn probe(
        &self,
        ctx: &DriverContext,
        path: &str,
        description: Description,
    ) -> Result<Arc<dyn Hierarchy>> {
        debug_ex!("Generic hierarchy at '{}'.", path);
        Ok(Arc::new(DefaultHierarchy::new(ctx, path, description)))
    }
}
