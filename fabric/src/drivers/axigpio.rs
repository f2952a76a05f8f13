//! AXI GPIO: two 32-bit channels, each split into independently directioned bit slices.
//!
//! Every channel keeps a shadow copy of its data register. A slice write updates only the
//! slice's bits in the shadow and then pushes the whole word, so slices sharing a channel
//! never clobber each other and nothing depends on reading outputs back from the hardware.
use crate::{
    debug_ex,
    dev::{
        default::DefaultIp,
        driver::{DriverContext, Ip, IpDriver},
        gpio::Direction,
        mmio::{IoRange, IoRangeValidationType, RegisterTransport},
    },
    error::{Error, MmioError, Result},
};
use desc::AttributeRecord;
use num_enum::IntoPrimitive;
use spin::Mutex;
use std::{fmt::Debug, sync::Arc};

pub const AXI_GPIO_VLNV: &str = "xilinx.com:ip:axi_gpio:2.0";

const CHANNEL_COUNT: u32 = 2;
const CHANNEL_STRIDE: usize = 8;
const REGISTER_BLOCK_SIZE: u64 = 0x10;

/// Register offsets within one channel.
#[derive(Debug, Clone, Copy, IntoPrimitive)]
#[repr(usize)]
enum GpioRegister {
    Data = 0x0,
    /// Set bits are inputs.
    Tri = 0x4,
}

/// `bits` low bits set.
fn mask_of(bits: u32) -> u32 {
    1u32.checked_shl(bits).map_or(u32::MAX, |bit| bit - 1)
}

struct ChannelState {
    shadow: u32,
    tri_mask: u32,
    length: u32,
    direction: Direction,
}

pub struct Channel {
    mmio: Arc<dyn RegisterTransport>,
    /// Zero-based.
    index: u32,
    state: Mutex<ChannelState>,
}

impl Channel {
    pub fn new(mmio: Arc<dyn RegisterTransport>, index: u32) -> Channel {
        Channel {
            mmio,
            index,
            state: Mutex::new(ChannelState {
                shadow: 0,
                tri_mask: 0,
                length: 32,
                direction: Direction::InOut,
            }),
        }
    }

    fn offset(&self, reg: GpioRegister) -> usize {
        self.index as usize * CHANNEL_STRIDE + usize::from(reg)
    }

    /// Current value of the data register, read from the hardware.
    pub fn read(&self) -> Result<u32> {
        self.mmio.read(self.offset(GpioRegister::Data))
    }

    /// Replace the bits under `mask` with those of `value` and push the whole word.
    pub fn write(&self, value: u32, mask: u32) -> Result<()> {
        let mut state = self.state.lock();
        let shadow = (state.shadow & !mask) | (value & mask);
        self.mmio.write(self.offset(GpioRegister::Data), shadow)?;
        state.shadow = shadow;
        Ok(())
    }

    /// Last value written to the data register.
    pub fn shadow(&self) -> u32 {
        self.state.lock().shadow
    }

    /// Tri-state bits as last programmed.
    pub fn tri_mask(&self) -> u32 {
        self.state.lock().tri_mask
    }

    pub fn len(&self) -> u32 {
        self.state.lock().length
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of meaningful bits, counted from bit 0.
    pub fn set_length(&self, length: u32) -> Result<()> {
        if !(1..=32).contains(&length) {
            return Err(Error::InvalidLength { length, max: 32 });
        }
        self.state.lock().length = length;
        Ok(())
    }

    pub fn direction(&self) -> Direction {
        self.state.lock().direction
    }

    /// Direction of the slices handed out from now on. Input and output also program the
    /// meaningful bits of the tri-state register, starting from what the hardware holds;
    /// bidirectional leaves it as it is.
    pub fn set_direction(&self, direction: Direction) -> Result<()> {
        let mut state = self.state.lock();
        let bits = mask_of(state.length);
        let tri = self.offset(GpioRegister::Tri);
        match direction {
            Direction::Input | Direction::Output => {
                let current = self.mmio.read(tri)?;
                let tri_mask = match direction {
                    Direction::Input => current | bits,
                    _ => current & !bits,
                };
                self.mmio.write(tri, tri_mask)?;
                state.tri_mask = tri_mask;
            }
            Direction::InOut => {}
        }
        debug_ex!("Channel {} set to '{}'.", self.index + 1, direction.as_str());
        state.direction = direction;
        Ok(())
    }

    /// One-bit slice at `index`.
    pub fn get(self: &Arc<Self>, index: u32) -> Result<Slice> {
        let length = self.len();
        if index >= length {
            return Err(Error::IndexOutOfRange { index, length });
        }
        Ok(Slice::new(self.clone(), index, index + 1))
    }

    /// Slice over bits `start..stop`.
    pub fn slice(self: &Arc<Self>, start: u32, stop: u32) -> Result<Slice> {
        let length = self.len();
        if start >= stop {
            return Err(Error::IndexOutOfRange { index: start, length });
        }
        if stop > length {
            return Err(Error::IndexOutOfRange { index: stop, length });
        }
        Ok(Slice::new(self.clone(), start, stop))
    }

    /// Slice over every `step`-th bit of `start..stop`. Only contiguous slices exist.
    pub fn slice_by(self: &Arc<Self>, start: u32, stop: u32, step: u32) -> Result<Slice> {
        if step != 1 {
            return Err(Error::UnsupportedSliceStep(step));
        }
        self.slice(start, stop)
    }
}

impl Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Channel")
            .field("index", &(self.index + 1))
            .field("shadow", &format_args!("{:#x}", state.shadow))
            .field("length", &state.length)
            .field("direction", &state.direction)
            .finish()
    }
}

/// Bit range of a channel, common to every slice type.
#[derive(Clone)]
pub struct SliceRange {
    channel: Arc<Channel>,
    start: u32,
    stop: u32,
    mask: u32,
}

impl Debug for SliceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel{}[{}..{}]", self.channel.index + 1, self.start, self.stop)
    }
}

pub trait BitSlice {
    fn range(&self) -> &SliceRange;

    fn width(&self) -> u32 {
        self.range().stop - self.range().start
    }

    fn mask(&self) -> u32 {
        self.range().mask
    }
}

pub trait ReadSlice: BitSlice {
    fn read(&self) -> Result<u32> {
        let range = self.range();
        Ok((range.channel.read()? >> range.start) & range.mask)
    }
}

pub trait WriteSlice: BitSlice {
    fn write(&self, value: u32) -> Result<()> {
        let range = self.range();
        if value > range.mask {
            return Err(Error::ValueTooLarge {
                value,
                bits: self.width(),
            });
        }
        range.channel.write(value << range.start, range.mask << range.start)
    }

    fn on(&self) -> Result<()> {
        self.write(self.mask())
    }

    fn off(&self) -> Result<()> {
        self.write(0)
    }

    /// Invert the slice's bits as last written.
    fn toggle(&self) -> Result<()> {
        let range = self.range();
        self.write((!range.channel.shadow() >> range.start) & range.mask)
    }
}

#[derive(Debug, Clone)]
pub struct Input(SliceRange);

#[derive(Debug, Clone)]
pub struct Output(SliceRange);

#[derive(Debug, Clone)]
pub struct InOut(SliceRange);

impl BitSlice for Input {
    fn range(&self) -> &SliceRange {
        &self.0
    }
}

impl BitSlice for Output {
    fn range(&self) -> &SliceRange {
        &self.0
    }
}

impl BitSlice for InOut {
    fn range(&self) -> &SliceRange {
        &self.0
    }
}

impl ReadSlice for Input {}
impl WriteSlice for Output {}
impl ReadSlice for InOut {}
impl WriteSlice for InOut {}

/// A slice typed by the direction its channel had when the slice was taken.
#[derive(Debug, Clone)]
pub enum Slice {
    Input(Input),
    Output(Output),
    InOut(InOut),
}

impl Slice {
    fn new(channel: Arc<Channel>, start: u32, stop: u32) -> Slice {
        let direction = channel.direction();
        let range = SliceRange {
            channel,
            start,
            stop,
            mask: mask_of(stop - start),
        };
        match direction {
            Direction::Input => Slice::Input(Input(range)),
            Direction::Output => Slice::Output(Output(range)),
            Direction::InOut => Slice::InOut(InOut(range)),
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Slice::Input(_) => Direction::Input,
            Slice::Output(_) => Direction::Output,
            Slice::InOut(_) => Direction::InOut,
        }
    }

    fn readable(&self) -> Result<&dyn ReadSlice> {
        match self {
            Slice::Input(slice) => Ok(slice),
            Slice::InOut(slice) => Ok(slice),
            Slice::Output(_) => Err(Error::DirectionMismatch { expected: "read" }),
        }
    }

    fn writable(&self) -> Result<&dyn WriteSlice> {
        match self {
            Slice::Output(slice) => Ok(slice),
            Slice::InOut(slice) => Ok(slice),
            Slice::Input(_) => Err(Error::DirectionMismatch { expected: "write" }),
        }
    }

    pub fn read(&self) -> Result<u32> {
        self.readable()?.read()
    }

    pub fn write(&self, value: u32) -> Result<()> {
        self.writable()?.write(value)
    }

    pub fn on(&self) -> Result<()> {
        self.writable()?.on()
    }

    pub fn off(&self) -> Result<()> {
        self.writable()?.off()
    }

    pub fn toggle(&self) -> Result<()> {
        self.writable()?.toggle()
    }
}

impl BitSlice for Slice {
    fn range(&self) -> &SliceRange {
        match self {
            Slice::Input(slice) => slice.range(),
            Slice::Output(slice) => slice.range(),
            Slice::InOut(slice) => slice.range(),
        }
    }
}

/// The AXI GPIO block. Block-level indexing and configuration address channel 1.
#[derive(Debug)]
pub struct AxiGpio {
    base: DefaultIp,
    channels: [Arc<Channel>; CHANNEL_COUNT as usize],
}

impl AxiGpio {
    pub fn new(base: DefaultIp) -> Result<AxiGpio> {
        let mmio = base.mmio()?.clone();
        Ok(AxiGpio {
            base,
            channels: [
                Arc::new(Channel::new(mmio.clone(), 0)),
                Arc::new(Channel::new(mmio, 1)),
            ],
        })
    }

    pub fn base(&self) -> &DefaultIp {
        &self.base
    }

    /// Channel `channel`, counted from 1.
    pub fn channel(&self, channel: u32) -> Result<&Arc<Channel>> {
        channel
            .checked_sub(1)
            .and_then(|index| self.channels.get(index as usize))
            .ok_or(Error::IndexOutOfRange {
                index: channel,
                length: CHANNEL_COUNT,
            })
    }

    pub fn channel1(&self) -> &Arc<Channel> {
        &self.channels[0]
    }

    pub fn channel2(&self) -> &Arc<Channel> {
        &self.channels[1]
    }

    pub fn set_length(&self, length: u32, channel: u32) -> Result<()> {
        self.channel(channel)?.set_length(length)
    }

    pub fn set_direction(&self, direction: Direction, channel: u32) -> Result<()> {
        self.channel(channel)?.set_direction(direction)
    }

    pub fn get(&self, index: u32) -> Result<Slice> {
        self.channel1().get(index)
    }

    pub fn slice(&self, start: u32, stop: u32) -> Result<Slice> {
        self.channel1().slice(start, stop)
    }
}

impl Ip for AxiGpio {
    fn record(&self) -> &AttributeRecord {
        self.base.record()
    }
}

#[derive(Debug)]
pub struct AxiGpioDriver;

impl IpDriver for AxiGpioDriver {
    fn get_name(&self) -> &'static str {
        "AxiGpio"
    }

    fn get_bindto(&self) -> &'static [&'static str] {
        &[AXI_GPIO_VLNV]
    }

    fn probe(&self, ctx: &DriverContext, record: AttributeRecord) -> Result<Arc<dyn Ip>> {
        let range = IoRange::from_record(&record)?;
        if !range.validate(IoRangeValidationType::Compatible(REGISTER_BLOCK_SIZE)) {
            return Err(MmioError::NotEnoughSpace.into());
        }
        debug_ex!("AXI GPIO at {:?}.", range);
        Ok(Arc::new(AxiGpio::new(DefaultIp::new(ctx, record)?)?))
    }
}
