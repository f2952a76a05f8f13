//! Mock collaborators recording every call the runtime makes to the platform.

use desc::{AttributeRecord, ClockEntry, DescriptionTables, GpioEntry, InterruptPin};
use fabric::{
    DriverContext, DriverRegistry, Error, FabricConfig, ImageId, Platform, Result,
    dev::{
        gpio::{Direction, GpioLine},
        intc::InterruptLine,
        mmio::RegisterTransport,
        platform::{ClockControl, DescriptionSource, FabricManager, IoProvider},
    },
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Calls made to the mock platform, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    LoadDescription(PathBuf),
    SetClock { line: u32, divisor0: u32, divisor1: u32 },
    DefaultClock(u32),
    Push(PathBuf),
    ResetHardware,
    LoadIpData { ip: String, data: PathBuf },
    Map { phys_addr: u64, addr_range: u64 },
    Gpio { line: u32, direction: Direction },
    Interrupt(String),
    RegisterWrite { phys_addr: u64, offset: usize, value: u32 },
}

#[derive(Debug, Default)]
struct MockState {
    tables: DescriptionTables,
    active: Option<ImageId>,
    /// Fingerprint reported for the next pushed image.
    fingerprint: Option<String>,
    fail_next_push: bool,
    registers: BTreeMap<(u64, usize), u32>,
    operations: Vec<Operation>,
}

/// One object implementing every collaborator, so a test can inspect all calls in one log.
#[derive(Debug, Default, Clone)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub fn new(tables: DescriptionTables) -> MockPlatform {
        let mock = MockPlatform::default();
        mock.set_tables(tables);
        mock
    }

    pub fn platform(&self) -> Platform {
        self.platform_with(FabricConfig::default())
    }

    pub fn platform_with(&self, config: FabricConfig) -> Platform {
        let shared = Arc::new(self.clone());
        Platform {
            description: shared.clone(),
            fabric: shared.clone(),
            clocks: shared.clone(),
            io: shared,
            config: Arc::new(config),
        }
    }

    /// Context with an empty registry.
    pub fn context(&self) -> DriverContext {
        DriverContext::new(Arc::new(DriverRegistry::new()), self.platform())
    }

    /// Context with the built-in drivers registered.
    pub fn builtin_context(&self) -> DriverContext {
        DriverContext::new(Arc::new(DriverRegistry::with_builtin()), self.platform())
    }

    pub fn set_tables(&self, tables: DescriptionTables) {
        self.state.lock().unwrap().tables = tables;
    }

    pub fn set_fingerprint(&self, fingerprint: &str) {
        self.state.lock().unwrap().fingerprint = Some(fingerprint.to_string());
    }

    /// Pretend another process programmed `image`.
    pub fn activate(&self, image: ImageId) {
        self.state.lock().unwrap().active = Some(image);
    }

    pub fn fail_next_push(&self) {
        self.state.lock().unwrap().fail_next_push = true;
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.state.lock().unwrap().operations.clear();
    }

    pub fn count(&self, matches: impl Fn(&Operation) -> bool) -> usize {
        self.operations().iter().filter(|op| matches(op)).count()
    }

    pub fn register(&self, phys_addr: u64, offset: usize) -> u32 {
        let state = self.state.lock().unwrap();
        state.registers.get(&(phys_addr, offset)).copied().unwrap_or(0)
    }

    pub fn set_register(&self, phys_addr: u64, offset: usize, value: u32) {
        let mut state = self.state.lock().unwrap();
        state.registers.insert((phys_addr, offset), value);
    }

    fn record(&self, op: Operation) {
        self.state.lock().unwrap().operations.push(op);
    }
}

impl DescriptionSource for MockPlatform {
    fn load_description(&self, image: &ImageId) -> Result<DescriptionTables> {
        self.record(Operation::LoadDescription(image.path.clone()));
        Ok(self.state.lock().unwrap().tables.clone())
    }
}

impl FabricManager for MockPlatform {
    fn push(&self, image: &ImageId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.operations.push(Operation::Push(image.path.clone()));
        if state.fail_next_push {
            state.fail_next_push = false;
            return Err(Error::Configuration("device busy".into()));
        }
        let mut active = ImageId::new(image.path.clone());
        active.fingerprint = state.fingerprint.clone();
        state.active = Some(active);
        Ok(())
    }

    fn current_identity(&self) -> Option<ImageId> {
        self.state.lock().unwrap().active.clone()
    }

    fn reset_hardware(&self) {
        self.record(Operation::ResetHardware);
    }

    fn load_ip_data(&self, ip_name: &str, data: &Path) -> Result<()> {
        self.record(Operation::LoadIpData {
            ip: ip_name.to_string(),
            data: data.to_path_buf(),
        });
        Ok(())
    }
}

impl ClockControl for MockPlatform {
    fn set_clock(&self, line: u32, divisor0: u32, divisor1: u32) {
        self.record(Operation::SetClock { line, divisor0, divisor1 });
    }

    fn set_default(&self, line: u32) {
        self.record(Operation::DefaultClock(line));
    }
}

impl IoProvider for MockPlatform {
    fn map(&self, phys_addr: u64, addr_range: u64) -> Result<Arc<dyn RegisterTransport>> {
        self.record(Operation::Map { phys_addr, addr_range });
        Ok(Arc::new(MockWindow {
            platform: self.clone(),
            phys_addr,
        }))
    }

    fn gpio(&self, line: u32, direction: Direction) -> Result<Arc<dyn GpioLine>> {
        self.record(Operation::Gpio { line, direction });
        Ok(Arc::new(MockGpio {
            line,
            direction,
            value: Mutex::new(false),
        }))
    }

    fn interrupt(&self, pin: &str) -> Result<Arc<dyn InterruptLine>> {
        self.record(Operation::Interrupt(pin.to_string()));
        Ok(Arc::new(MockInterrupt(pin.to_string())))
    }
}

/// Register window backed by the platform's register table.
pub struct MockWindow {
    platform: MockPlatform,
    phys_addr: u64,
}

impl RegisterTransport for MockWindow {
    fn read(&self, offset: usize) -> Result<u32> {
        Ok(self.platform.register(self.phys_addr, offset))
    }

    fn write(&self, offset: usize, value: u32) -> Result<()> {
        self.platform.record(Operation::RegisterWrite {
            phys_addr: self.phys_addr,
            offset,
            value,
        });
        self.platform.set_register(self.phys_addr, offset, value);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockGpio {
    line: u32,
    direction: Direction,
    value: Mutex<bool>,
}

impl GpioLine for MockGpio {
    fn number(&self) -> u32 {
        self.line
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn read(&self) -> Result<bool> {
        Ok(*self.value.lock().unwrap())
    }

    fn write(&self, value: bool) -> Result<()> {
        *self.value.lock().unwrap() = value;
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockInterrupt(String);

impl InterruptLine for MockInterrupt {
    fn pin(&self) -> &str {
        &self.0
    }
}

/// Builder for description tables.
#[derive(Debug, Default)]
pub struct TablesBuilder {
    tables: DescriptionTables,
}

impl TablesBuilder {
    pub fn new() -> TablesBuilder {
        TablesBuilder::default()
    }

    pub fn ip(mut self, path: &str, type_tag: &str) -> TablesBuilder {
        self.tables
            .ip_dict
            .insert(path.to_string(), AttributeRecord::with_type(type_tag));
        self
    }

    pub fn mapped_ip(mut self, path: &str, type_tag: &str, phys_addr: u64, range: u64) -> TablesBuilder {
        self.tables.ip_dict.insert(
            path.to_string(),
            AttributeRecord::with_type(type_tag).with_address(phys_addr, range),
        );
        self
    }

    pub fn gpio(mut self, name: &str, index: u32, pins: &[&str]) -> TablesBuilder {
        self.tables.gpio_dict.insert(
            name.to_string(),
            GpioEntry {
                index,
                pins: pins.iter().map(|pin| pin.to_string()).collect(),
                state: None,
            },
        );
        self
    }

    pub fn interrupt(mut self, pin: &str, controller: &str, index: u32) -> TablesBuilder {
        self.tables.interrupt_pins.insert(
            pin.to_string(),
            InterruptPin {
                controller: controller.to_string(),
                index,
            },
        );
        self
    }

    pub fn clock(mut self, line: u32, enable: bool, divisor0: u32, divisor1: u32) -> TablesBuilder {
        self.tables.clock_dict.insert(
            line,
            ClockEntry {
                enable,
                divisor0,
                divisor1,
            },
        );
        self
    }

    pub fn build(self) -> DescriptionTables {
        self.tables
    }
}

/// A design shaped like the Pynq-Z1 base overlay.
pub fn base_tables() -> DescriptionTables {
    TablesBuilder::new()
        .mapped_ip("swsleds_gpio", "xilinx.com:ip:axi_gpio:2.0", 0x4121_0000, 0x1_0000)
        .mapped_ip("btns_gpio", "xilinx.com:ip:axi_gpio:2.0", 0x4120_0000, 0x1_0000)
        .mapped_ip("iop1/mb_bram_ctrl", "xilinx.com:ip:axi_bram_ctrl:4.0", 0x4000_0000, 0x1_0000)
        .mapped_ip("iop1/spi", "xilinx.com:ip:axi_quad_spi:3.2", 0x4400_0000, 0x1000)
        .interrupt("iop1/mb_intr", "intr", 0)
        .interrupt("btns_gpio/ip2intc_irpt", "intr", 1)
        .gpio("mb_1_reset", 0, &["iop1/mb_1_reset"])
        .gpio("ps_gpio_led", 2, &["ps_led"])
        .clock(0, true, 10, 1)
        .clock(1, false, 0, 0)
        .build()
}
