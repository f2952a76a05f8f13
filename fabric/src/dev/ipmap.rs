//! Lazily bound namespace of one hierarchy level.
//!
//! An [IpMap] owns the slice of the description below its path. At construction it sorts the
//! immediate children by kind and picks a driver for every hierarchy and IP, but binds nothing.
//! A child is bound on its first [IpMap::resolve] and cached for the lifetime of the map, so
//! every later resolution of the same name returns the same object.
use crate::{
    debug_ex,
    dev::{
        driver::{AsAny, DriverContext, Hierarchy, HierarchyDriver, Ip, IpDriver},
        gpio::{Direction, GpioLine},
        handle::Handle,
        intc::InterruptLine,
    },
    error::{Error, Result},
};
use desc::{ChildKind, Description};
use log::warn;
use spin::RwLock;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    sync::Arc,
};

/// A bound child of a namespace node.
#[derive(Clone, Debug)]
pub enum Child {
    Hierarchy(Handle<dyn Hierarchy>),
    Ip(Handle<dyn Ip>),
    Interrupt(Handle<dyn InterruptLine>),
    Gpio(Handle<dyn GpioLine>),
}

impl Child {
    pub fn as_hierarchy(&self) -> Option<&Handle<dyn Hierarchy>> {
        match self {
            Child::Hierarchy(hierarchy) => Some(hierarchy),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<&Handle<dyn Ip>> {
        match self {
            Child::Ip(ip) => Some(ip),
            _ => None,
        }
    }

    pub fn as_interrupt(&self) -> Option<&Handle<dyn InterruptLine>> {
        match self {
            Child::Interrupt(interrupt) => Some(interrupt),
            _ => None,
        }
    }

    pub fn as_gpio(&self) -> Option<&Handle<dyn GpioLine>> {
        match self {
            Child::Gpio(gpio) => Some(gpio),
            _ => None,
        }
    }

    /// The bound IP as its concrete driver type.
    pub fn downcast_ip<T: Ip>(&self) -> Option<Arc<T>> {
        let ip = self.as_ip()?.as_arc().clone();
        AsAny::into_any(ip).downcast::<T>().ok()
    }

    /// The bound hierarchy as its concrete driver type.
    pub fn downcast_hierarchy<T: Hierarchy>(&self) -> Option<Arc<T>> {
        let hierarchy = self.as_hierarchy()?.as_arc().clone();
        AsAny::into_any(hierarchy).downcast::<T>().ok()
    }

    /// Whether both refer to the same bound object.
    pub fn ptr_eq(&self, other: &Child) -> bool {
        match (self, other) {
            (Child::Hierarchy(a), Child::Hierarchy(b)) => a.ptr_eq(b),
            (Child::Ip(a), Child::Ip(b)) => a.ptr_eq(b),
            (Child::Interrupt(a), Child::Interrupt(b)) => a.ptr_eq(b),
            (Child::Gpio(a), Child::Gpio(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn kind(&self) -> ChildKind {
        match self {
            Child::Hierarchy(_) => ChildKind::HIERARCHY,
            Child::Ip(_) => ChildKind::IP,
            Child::Interrupt(_) => ChildKind::INTERRUPT,
            Child::Gpio(_) => ChildKind::GPIO,
        }
    }
}

pub struct IpMap {
    path: String,
    description: Description,
    context: DriverContext,
    hierarchies: BTreeMap<String, Arc<dyn HierarchyDriver>>,
    ips: BTreeMap<String, Arc<dyn IpDriver>>,
    interrupts: BTreeSet<String>,
    gpio: BTreeSet<String>,
    cache: RwLock<BTreeMap<String, Child>>,
}

impl IpMap {
    /// Namespace of the hierarchy at `path` (empty for the root) whose children are
    /// `description`.
    pub fn new(path: &str, description: Description, context: DriverContext) -> IpMap {
        let hierarchies: BTreeMap<_, _> = description
            .hierarchies()
            .into_iter()
            .map(|name| {
                let full = join(path, &name);
                let driver = context
                    .registry
                    .resolve_hierarchy(&full, &description.partition(&name));
                (name, driver)
            })
            .collect();
        let ips: BTreeMap<_, _> = description
            .ip_names()
            .into_iter()
            .filter_map(|name| {
                let tag = description.ips.get(&name)?.type_tag.as_deref()?;
                let driver = context.registry.resolve_ip(tag);
                Some((name, driver))
            })
            .collect();
        let interrupts = description.interrupt_names();
        let gpio = description.gpio_names();
        debug_ex!(
            "Namespace '{}': {} hierarchies, {} IP, {} interrupts, {} GPIO.",
            path,
            hierarchies.len(),
            ips.len(),
            interrupts.len(),
            gpio.len()
        );
        IpMap {
            path: path.to_string(),
            description,
            context,
            hierarchies,
            ips,
            interrupts,
            gpio,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn context(&self) -> &DriverContext {
        &self.context
    }

    /// The child called `name`, bound on first use.
    ///
    /// A name that is both a hierarchy and something else resolves as the hierarchy; after that
    /// IPs take precedence over interrupt pins, and interrupt pins over GPIO pins.
    pub fn resolve(&self, name: &str) -> Result<Child> {
        if let Some(child) = self.cache.read().get(name) {
            return Ok(child.clone());
        }
        let mut cache = self.cache.write();
        if let Some(child) = cache.get(name) {
            return Ok(child.clone());
        }
        let child = self.bind(name)?;
        debug_ex!("Bound '{}' as {:?}.", join(&self.path, name), child.kind());
        cache.insert(name.to_string(), child.clone());
        Ok(child)
    }

    /// Resolve a `/`-separated path through nested hierarchies.
    pub fn resolve_path(&self, path: &str) -> Result<Child> {
        let (head, rest) = match path.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let child = self.resolve(head)?;
        let Some(rest) = rest else {
            return Ok(child);
        };
        match child.as_hierarchy() {
            Some(hierarchy) => hierarchy.ip_map().resolve_path(rest),
            None => Err(Error::NotFound {
                hierarchy: join(&self.path, head),
                name: rest.to_string(),
            }),
        }
    }

    /// Whether `name` has been bound already.
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.read().contains_key(name)
    }

    /// Every name visible at this level, bound or not, sorted and without duplicates.
    pub fn names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.cache.read().keys().cloned().collect();
        names.extend(self.hierarchies.keys().cloned());
        names.extend(self.ips.keys().cloned());
        names.extend(self.interrupts.iter().cloned());
        names.extend(self.gpio.iter().cloned());
        names.into_iter().collect()
    }

    pub fn hierarchy_driver(&self, name: &str) -> Option<&'static str> {
        self.hierarchies.get(name).map(|driver| driver.get_name())
    }

    pub fn ip_driver(&self, name: &str) -> Option<&'static str> {
        self.ips.get(name).map(|driver| driver.get_name())
    }

    /// Human-readable listing of the children at this level and the drivers serving them.
    ///
    /// `title` heads the listing, e.g. `Default documentation for overlay base`.
    pub fn describe(&self, title: &str) -> String {
        let mut lines = vec![title.to_string(), String::new()];
        push_section(
            &mut lines,
            "IP Blocks",
            self.ips
                .iter()
                .map(|(name, driver)| format!("{:<20}: {}", name, driver.get_name())),
        );
        push_section(
            &mut lines,
            "Hierarchies",
            self.hierarchies
                .iter()
                .map(|(name, driver)| format!("{:<20}: {}", name, driver.get_name())),
        );
        push_section(
            &mut lines,
            "Interrupts",
            self.interrupts
                .iter()
                .map(|name| format!("{:<20}: InterruptLine", name)),
        );
        push_section(
            &mut lines,
            "GPIO Outputs",
            self.gpio.iter().map(|name| format!("{:<20}: GpioLine", name)),
        );
        lines.join("\n")
    }

    fn bind(&self, name: &str) -> Result<Child> {
        let full = join(&self.path, name);
        let kind = self.description.kind_of(name);
        if kind.contains(ChildKind::HIERARCHY)
            && let Some(driver) = self.hierarchies.get(name)
        {
            debug_ex!("Binding hierarchy '{}' to '{}'.", full, driver.get_name());
            let hierarchy = driver
                .probe(&self.context, &full, self.description.partition(name))
                .inspect_err(|err| warn!("'{}' failed on '{}': {}", driver.get_name(), full, err))?;
            return Ok(Child::Hierarchy(hierarchy.into()));
        }
        if kind.contains(ChildKind::IP)
            && let Some(driver) = self.ips.get(name)
        {
            debug_ex!("Binding IP '{}' to '{}'.", full, driver.get_name());
            let mut record = self.description.ips.get(name).cloned().unwrap_or_default();
            record.fullpath = Some(full.clone());
            let ip = driver
                .probe(&self.context, record)
                .inspect_err(|err| warn!("'{}' failed on '{}': {}", driver.get_name(), full, err))?;
            return Ok(Child::Ip(ip.into()));
        }
        if kind.contains(ChildKind::INTERRUPT) {
            let interrupt = self.context.platform.io.interrupt(&full)?;
            return Ok(Child::Interrupt(interrupt.into()));
        }
        if kind.contains(ChildKind::GPIO)
            && let Some(entry) = self.description.gpio.get(name)
        {
            let line = self.context.platform.config.gpio_line(entry.index);
            let gpio = self.context.platform.io.gpio(line, Direction::Output)?;
            return Ok(Child::Gpio(gpio.into()));
        }
        Err(Error::NotFound {
            hierarchy: self.path.clone(),
            name: name.to_string(),
        })
    }
}

impl Debug for IpMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpMap")
            .field("path", &self.path)
            .field("names", &self.names())
            .finish()
    }
}

/// `parent/name`, or `name` at the root.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn push_section(lines: &mut Vec<String>, heading: &str, entries: impl Iterator<Item = String>) {
    lines.push(heading.to_string());
    lines.push("-".repeat(heading.len()));
    let before = lines.len();
    lines.extend(entries);
    if lines.len() == before {
        lines.push("None".to_string());
    }
    lines.push(String::new());
}
