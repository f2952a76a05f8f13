//! The base overlay of the Pynq-Z1.

use crate::{
    dev::{
        driver::DriverContext,
        gpio::Direction,
        ipmap::Child,
        overlay::Overlay,
        platform::ImageId,
    },
    drivers::axigpio::{AxiGpio, Channel},
    error::{Error, Result},
};
use std::{ops::Deref, sync::Arc};

/// The on-board peripherals of the base design, bound and configured.
///
/// - `leds`: the green LEDs LD0-3, 4-bit output.
/// - `switches`: SW0 and SW1, 4-bit input.
/// - `buttons`: BTN0-3, 4-bit input.
#[derive(Debug)]
pub struct BaseOverlay {
    overlay: Overlay,
    pub leds: Arc<Channel>,
    pub switches: Arc<Channel>,
    pub buttons: Arc<Channel>,
}

impl BaseOverlay {
    /// Download `image` and bind its GPIO peripherals.
    pub fn open(image: ImageId, context: DriverContext) -> Result<BaseOverlay> {
        let overlay = Overlay::open(image, context)?;
        let swsleds = gpio_block(&overlay, "swsleds_gpio")?;
        let btns = gpio_block(&overlay, "btns_gpio")?;

        let leds = swsleds.channel(2)?.clone();
        let switches = swsleds.channel(1)?.clone();
        let buttons = btns.channel(1)?.clone();
        for (channel, direction) in [
            (&leds, Direction::Output),
            (&switches, Direction::Input),
            (&buttons, Direction::Input),
        ] {
            channel.set_length(4)?;
            channel.set_direction(direction)?;
        }
        Ok(BaseOverlay {
            overlay,
            leds,
            switches,
            buttons,
        })
    }

    /// The I/O processor behind the PMODA connector (`iop1`).
    pub fn pmoda(&self) -> Result<Child> {
        self.overlay.resolve("iop1")
    }

    /// The I/O processor behind the PMODB connector (`iop2`).
    pub fn pmodb(&self) -> Result<Child> {
        self.overlay.resolve("iop2")
    }

    /// The I/O processor behind the Arduino header (`iop3`).
    pub fn arduino(&self) -> Result<Child> {
        self.overlay.resolve("iop3")
    }
}

impl Deref for BaseOverlay {
    type Target = Overlay;

    fn deref(&self) -> &Overlay {
        &self.overlay
    }
}

fn gpio_block(overlay: &Overlay, name: &str) -> Result<Arc<AxiGpio>> {
    overlay
        .resolve(name)?
        .downcast_ip::<AxiGpio>()
        .ok_or_else(|| Error::Probe {
            driver: "AxiGpio",
            reason: format!("'{}' is not bound to an AXI GPIO driver", name),
        })
}
