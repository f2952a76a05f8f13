//! Drivers for specific IP blocks and hierarchies.

pub mod axigpio;

use crate::dev::driver::DriverRegistry;
use std::sync::Arc;

pub fn register_drivers(registry: &DriverRegistry) {
    registry.register_ip_driver(Arc::new(axigpio::AxiGpioDriver));
}
