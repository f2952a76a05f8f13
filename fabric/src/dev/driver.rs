//! Driver subsystem: registration, discovery and probe orchestration.
//!
//! Responsibilities:
//! - Provide the [IpDriver] trait for drivers of single IP blocks, keyed by the block's type tag
//!   (its VLNV, e.g. `xilinx.com:ip:axi_gpio:2.0`).
//! - Provide the [HierarchyDriver] trait for drivers of whole hierarchies, selected by a
//!   predicate over the hierarchy's description.
//! - Keep both catalogs in a [DriverRegistry]. A process-wide registry is available through
//!   [registry], but every namespace node takes its registry from a [DriverContext], so tests
//!   can build isolated ones.
//!
//! Resolution never fails: unknown type tags resolve to [DefaultIpDriver] and hierarchies no
//! predicate accepts resolve to [DefaultHierarchyDriver].
//!
//! Ownership and concurrency notes:
//! - Both catalogs are protected by an [RwLock]; registration is additive only.
//! - Lookups return owned [Arc] clones so no lock is held while a driver probes.
use crate::{
    debug_ex,
    dev::{
        default::{DefaultHierarchyDriver, DefaultIpDriver},
        ipmap::IpMap,
        platform::Platform,
    },
    drivers,
    error::Result,
};
use desc::{AttributeRecord, Description};
use lazy_static::lazy_static;
use spin::{Once, RwLock};
use std::{
    any::Any,
    collections::{BTreeMap, VecDeque},
    fmt::Debug,
    sync::Arc,
};

/// Type-erased access to a bound driver object.
///
/// Implemented for every `'static` type, so drivers never implement it by hand.
pub trait AsAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A bound IP block.
pub trait Ip: AsAny + Debug {
    /// The record the driver was bound with; `fullpath` is always stamped.
    fn record(&self) -> &AttributeRecord;
}

/// A bound hierarchy.
///
/// Custom hierarchy drivers add their own operations on top; children of the hierarchy stay
/// reachable through [Hierarchy::ip_map].
pub trait Hierarchy: AsAny + Debug {
    fn ip_map(&self) -> &IpMap;
}

/// Driver of a single IP block type.
///
/// Guarantees and expectations:
/// - [IpDriver::get_bindto] lists the type tags the driver serves; the registry indexes the
///   driver under each of them.
/// - [IpDriver::probe] is called at most once per IP and namespace node; the result is cached
///   by the node.
pub trait IpDriver: Send + Sync + Debug {
    fn get_name(&self) -> &'static str;
    fn get_bindto(&self) -> &'static [&'static str];
    fn probe(&self, ctx: &DriverContext, record: AttributeRecord) -> Result<Arc<dyn Ip>>;
}

/// Driver of a hierarchy, recognized by [HierarchyDriver::check_hierarchy].
pub trait HierarchyDriver: Send + Sync + Debug {
    fn get_name(&self) -> &'static str;
    /// Whether this driver serves the hierarchy at `path`, whose children are `description`.
    fn check_hierarchy(&self, path: &str, description: &Description) -> bool;
    fn probe(
        &self,
        ctx: &DriverContext,
        path: &str,
        description: Description,
    ) -> Result<Arc<dyn Hierarchy>>;
}

/// What a driver needs to bind: the registry to resolve its own children and the platform to
/// reach hardware.
#[derive(Clone)]
pub struct DriverContext {
    pub registry: Arc<DriverRegistry>,
    pub platform: Platform,
}

impl DriverContext {
    pub fn new(registry: Arc<DriverRegistry>, platform: Platform) -> DriverContext {
        DriverContext { registry, platform }
    }
}

/// Catalogs of IP and hierarchy drivers.
pub struct DriverRegistry {
    /// Type tag to driver. Last registration wins.
    ip_drivers: RwLock<BTreeMap<&'static str, Arc<dyn IpDriver>>>,
    /// Most recently registered first.
    hierarchy_drivers: RwLock<VecDeque<Arc<dyn HierarchyDriver>>>,
    default_ip: Arc<dyn IpDriver>,
    default_hierarchy: Arc<dyn HierarchyDriver>,
}

impl DriverRegistry {
    /// An empty registry; everything resolves to the default drivers.
    pub fn new() -> DriverRegistry {
        DriverRegistry {
            ip_drivers: RwLock::new(BTreeMap::new()),
            hierarchy_drivers: RwLock::new(VecDeque::new()),
            default_ip: Arc::new(DefaultIpDriver),
            default_hierarchy: Arc::new(DefaultHierarchyDriver),
        }
    }

    /// A registry holding every driver shipped with this crate.
    pub fn with_builtin() -> DriverRegistry {
        let registry = DriverRegistry::new();
        drivers::register_drivers(&registry);
        registry
    }

    /// Register `driver` under each of its type tags, replacing earlier bindings.
    pub fn register_ip_driver(&self, driver: Arc<dyn IpDriver>) {
        debug_ex!("\tRegistered IP driver '{}'.", driver.get_name());
        let mut guard = self.ip_drivers.write();
        for tag in driver.get_bindto() {
            if let Some(old) = guard.insert(*tag, driver.clone()) {
                log::debug!(
                    "Driver '{}' replaces '{}' for '{}'.",
                    driver.get_name(),
                    old.get_name(),
                    tag
                );
            }
        }
    }

    /// Register `driver` ahead of every hierarchy driver registered so far.
    pub fn register_hierarchy_driver(&self, driver: Arc<dyn HierarchyDriver>) {
        debug_ex!("\tRegistered hierarchy driver '{}'.", driver.get_name());
        self.hierarchy_drivers.write().push_front(driver);
    }

    pub fn resolve_ip(&self, type_tag: &str) -> Arc<dyn IpDriver> {
        self.ip_drivers
            .read()
            .get(type_tag)
            .cloned()
            .unwrap_or_else(|| self.default_ip.clone())
    }

    pub fn resolve_hierarchy(&self, path: &str, description: &Description) -> Arc<dyn HierarchyDriver> {
        // Predicates may consult the registry themselves.
        let candidates: Vec<_> = self.hierarchy_drivers.read().iter().cloned().collect();
        candidates
            .into_iter()
            .find(|driver| driver.check_hierarchy(path, description))
            .unwrap_or_else(|| self.default_hierarchy.clone())
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        DriverRegistry::new()
    }
}

impl Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("ip_drivers", &self.ip_drivers.read().keys())
            .field(
                "hierarchy_drivers",
                &self
                    .hierarchy_drivers
                    .read()
                    .iter()
                    .map(|driver| driver.get_name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

lazy_static! {
    static ref REGISTRY: Arc<DriverRegistry> = Arc::new(DriverRegistry::new());
}

static INIT: Once = Once::new();

/// The process-wide registry.
pub fn registry() -> Arc<DriverRegistry> {
    REGISTRY.clone()
}

pub fn register_ip_driver(driver: Arc<dyn IpDriver>) {
    REGISTRY.register_ip_driver(driver);
}

pub fn register_hierarchy_driver(driver: Arc<dyn HierarchyDriver>) {
    REGISTRY.register_hierarchy_driver(driver);
}

/// Register the built-in drivers with the process-wide registry. Later calls do nothing.
pub fn init() {
    INIT.call_once(|| {
        debug_ex!("Registering drivers...");
        drivers::register_drivers(&REGISTRY);
        debug_ex!("Drivers registered.");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Debug)]
    struct Tagged(&'static str, &'static [&'static str]);

    impl IpDriver for Tagged {
        fn get_name(&self) -> &'static str {
            self.0
        }

        fn get_bindto(&self) -> &'static [&'static str] {
            self.1
        }

        fn probe(&self, _ctx: &DriverContext, _record: AttributeRecord) -> Result<Arc<dyn Ip>> {
            Err(Error::Probe {
                driver: self.0,
                reason: "not bindable".into(),
            })
        }
    }

    #[derive(Debug)]
    struct Accepts(&'static str, &'static str);

    impl HierarchyDriver for Accepts {
        fn get_name(&self) -> &'static str {
            self.0
        }

        fn check_hierarchy(&self, _path: &str, description: &Description) -> bool {
            description.ips.contains_key(self.1)
        }

        fn probe(
            &self,
            _ctx: &DriverContext,
            _path: &str,
            _description: Description,
        ) -> Result<Arc<dyn Hierarchy>> {
            Err(Error::Probe {
                driver: self.0,
                reason: "not bindable".into(),
            })
        }
    }

    fn with_ips(names: &[&str]) -> Description {
        let mut description = Description::default();
        for name in names {
            description
                .ips
                .insert(name.to_string(), AttributeRecord::with_type("t"));
        }
        description
    }

    #[test]
    fn ip_resolution_is_exact_and_last_wins() {
        let registry = DriverRegistry::new();
        assert_eq!(registry.resolve_ip("vendor:ip:x:1.0").get_name(), "DefaultIp");

        registry.register_ip_driver(Arc::new(Tagged("First", &["vendor:ip:x:1.0"])));
        registry.register_ip_driver(Arc::new(Tagged("Other", &["vendor:ip:y:1.0"])));
        assert_eq!(registry.resolve_ip("vendor:ip:x:1.0").get_name(), "First");

        registry.register_ip_driver(Arc::new(Tagged("Second", &["vendor:ip:x:1.0"])));
        assert_eq!(registry.resolve_ip("vendor:ip:x:1.0").get_name(), "Second");
        assert_eq!(registry.resolve_ip("vendor:ip:y:1.0").get_name(), "Other");
        assert_eq!(registry.resolve_ip("vendor:ip:x:1.1").get_name(), "DefaultIp");
    }

    #[test]
    fn hierarchy_resolution_prefers_recent() {
        let registry = DriverRegistry::new();
        registry.register_hierarchy_driver(Arc::new(Accepts("Mailbox", "mb")));
        registry.register_hierarchy_driver(Arc::new(Accepts("Video", "vdma")));
        registry.register_hierarchy_driver(Arc::new(Accepts("MailboxV2", "mb")));

        let only_video = with_ips(&["vdma"]);
        assert_eq!(registry.resolve_hierarchy("video", &only_video).get_name(), "Video");

        let mailbox = with_ips(&["mb", "spi"]);
        assert_eq!(registry.resolve_hierarchy("iop1", &mailbox).get_name(), "MailboxV2");

        let plain = with_ips(&["gpio"]);
        assert_eq!(
            registry.resolve_hierarchy("misc", &plain).get_name(),
            "DefaultHierarchy"
        );
    }

    #[test]
    fn builtin_registry_knows_axi_gpio() {
        let registry = DriverRegistry::with_builtin();
        assert_eq!(
            registry.resolve_ip(crate::drivers::axigpio::AXI_GPIO_VLNV).get_name(),
            "AxiGpio"
        );
    }

    #[test]
    fn global_init_is_idempotent() {
        init();
        init();
        let global = registry();
        assert_eq!(
            global.resolve_ip(crate::drivers::axigpio::AXI_GPIO_VLNV).get_name(),
            "AxiGpio"
        );
        assert!(Arc::ptr_eq(&global, &registry()));
    }

    #[test]
    fn free_registration_reaches_global_registry() {
        register_hierarchy_driver(Arc::new(Accepts("GlobalVideo", "global_vdma")));
        register_ip_driver(Arc::new(Tagged("GlobalX", &["vendor:ip:global_x:1.0"])));

        let description = with_ips(&["global_vdma"]);
        assert_eq!(
            registry().resolve_hierarchy("video", &description).get_name(),
            "GlobalVideo"
        );
        assert_eq!(registry().resolve_ip("vendor:ip:global_x:1.0").get_name(), "GlobalX");
    }
}
