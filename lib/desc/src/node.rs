use crate::prop::{AttributeRecord, DescriptionError, DescriptionTables, GpioEntry, InterruptPin};
use bitflags::bitflags;
use std::collections::{BTreeMap, BTreeSet};

bitflags! {
    /// Categories a name can fall into at one level of a description.
    ///
    /// A name may carry several kinds at once: an IP `foo` next to `foo/bar` is both
    /// an IP and a hierarchy.
    pub struct ChildKind: u8 {
        const HIERARCHY = 0b0001;
        const IP        = 0b0010;
        const INTERRUPT = 0b0100;
        const GPIO      = 0b1000;
    }
}

/// A flat description, or the slice of one below a hierarchy prefix.
///
/// Keys are `/`-separated paths relative to the prefix the slice was taken at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Description {
    pub ips: BTreeMap<String, AttributeRecord>,
    /// Fabric pin path to the processing-system GPIO line wired to it.
    pub gpio: BTreeMap<String, GpioEntry>,
    pub interrupts: BTreeMap<String, InterruptPin>,
}

impl Description {
    /// Build the root description of an image from its tables.
    ///
    /// Every GPIO and interrupt pin whose parent path names an IP is also attached to that
    /// IP's record under the pin's own name.
    pub fn build(tables: &DescriptionTables) -> Result<Description, DescriptionError> {
        for path in tables
            .ip_dict
            .keys()
            .chain(tables.interrupt_pins.keys())
            .chain(tables.gpio_dict.values().flat_map(|entry| entry.pins.iter()))
        {
            if path.split('/').any(str::is_empty) {
                return Err(DescriptionError::MalformedPath(path.clone()));
            }
        }

        let mut ips = tables.ip_dict.clone();
        for record in ips.values_mut() {
            record.gpio.clear();
            record.interrupts.clear();
        }

        for (path, pin) in &tables.interrupt_pins {
            if let Some((ip, pin_name)) = path.rsplit_once('/')
                && let Some(record) = ips.get_mut(ip)
            {
                record.interrupts.insert(pin_name.into(), pin.clone());
            }
        }

        let mut gpio = BTreeMap::new();
        for entry in tables.gpio_dict.values() {
            for path in &entry.pins {
                gpio.insert(path.clone(), entry.clone());
                if let Some((ip, pin_name)) = path.rsplit_once('/')
                    && let Some(record) = ips.get_mut(ip)
                {
                    record.gpio.insert(pin_name.into(), entry.clone());
                }
            }
        }

        log::trace!(
            "Built description: {} IP, {} GPIO pins, {} interrupt pins.",
            ips.len(),
            gpio.len(),
            tables.interrupt_pins.len()
        );
        Ok(Description {
            ips,
            gpio,
            interrupts: tables.interrupt_pins.clone(),
        })
    }

    /// The slice of this description below `hierarchy`, with the `hierarchy/` prefix stripped.
    pub fn partition(&self, hierarchy: &str) -> Description {
        Description {
            ips: partition_map(&self.ips, hierarchy),
            gpio: partition_map(&self.gpio, hierarchy),
            interrupts: partition_map(&self.interrupts, hierarchy),
        }
    }

    /// First segments of every multi-segment IP path.
    pub fn hierarchies(&self) -> BTreeSet<String> {
        self.ips
            .keys()
            .filter_map(|path| path.split_once('/'))
            .map(|(head, _)| head.to_string())
            .collect()
    }

    /// Single-segment IP paths that carry a type tag.
    pub fn ip_names(&self) -> BTreeSet<String> {
        self.ips
            .iter()
            .filter(|(path, record)| !path.contains('/') && record.type_tag.is_some())
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn interrupt_names(&self) -> BTreeSet<String> {
        top_level(self.interrupts.keys())
    }

    pub fn gpio_names(&self) -> BTreeSet<String> {
        top_level(self.gpio.keys())
    }

    /// Categories of the immediate child `name`; empty for anything deeper than one level.
    pub fn kind_of(&self, name: &str) -> ChildKind {
        let mut kind = ChildKind::empty();
        if name.is_empty() || name.contains('/') {
            return kind;
        }
        let prefix = format!("{}/", name);
        if self.ips.keys().any(|path| path.starts_with(&prefix)) {
            kind |= ChildKind::HIERARCHY;
        }
        if self.ips.get(name).is_some_and(|record| record.type_tag.is_some()) {
            kind |= ChildKind::IP;
        }
        if self.interrupts.contains_key(name) {
            kind |= ChildKind::INTERRUPT;
        }
        if self.gpio.contains_key(name) {
            kind |= ChildKind::GPIO;
        }
        kind
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty() && self.gpio.is_empty() && self.interrupts.is_empty()
    }
}

fn partition_map<V: Clone>(map: &BTreeMap<String, V>, hierarchy: &str) -> BTreeMap<String, V> {
    let prefix = format!("{}/", hierarchy);
    map.iter()
        .filter_map(|(path, value)| {
            path.strip_prefix(prefix.as_str())
                .map(|rest| (rest.to_string(), value.clone()))
        })
        .collect()
}

fn top_level<'a>(paths: impl Iterator<Item = &'a String>) -> BTreeSet<String> {
    paths.filter(|path| !path.contains('/')).cloned().collect()
}
