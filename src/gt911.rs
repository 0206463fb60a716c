//! GT911 capacitive touch controller over I2C.
//!
//! Registers are 16-bit, sent big-endian ahead of the payload. Point records and the
//! config block fields are little-endian.
//!
//! ```text
//!  Uninitialized --init()--> Probing --product id ok--> Ready
//!                               |
//!                               +--both addresses fail--> Uninitialized
//! ```

use core::fmt;

use embedded_hal::{delay::DelayNs, i2c::I2c};
use heapless::Vec;
use log::{debug, error, info, warn};

use crate::config::TouchConfig;

/// The controller reports at most five simultaneous touches.
pub const MAX_POINTS: usize = 5;
/// Largest config block (0x8047..=0x8100) this driver will buffer.
pub const MAX_CONFIG_LEN: usize = 186;

const STATUS_BUFFER_READY: u8 = 0x80;
const STATUS_COUNT_MASK: u8 = 0x0F;
const POINT_RECORD_LEN: u16 = 8;

// Config block field offsets
const X_MAX_OFFSET: usize = 1;
const Y_MAX_OFFSET: usize = 3;

pub type Points = Vec<TouchPoint, MAX_POINTS>;

/// One decoded touch, already rotated into panel coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TouchPoint {
    pub track_id: u8,
    pub x: u16,
    pub y: u16,
    /// Contact size as reported by the controller.
    pub magnitude: u16,
}

/// Panel orientation, applied to raw coordinates after decode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Normal,
    Left,
    Inverted,
    Right,
}

impl Rotation {
    /// Map raw `(x, y)` for a `width` x `height` panel.
    pub fn apply(self, x: u16, y: u16, width: u16, height: u16) -> (u16, u16) {
        match self {
            Rotation::Normal => (x, y),
            Rotation::Left => (width.saturating_sub(y), x),
            Rotation::Inverted => (width.saturating_sub(x), height.saturating_sub(y)),
            Rotation::Right => (y, height.saturating_sub(x)),
        }
    }

    /// The mode that undoes this one on a square panel.
    pub fn inverse(self) -> Self {
        match self {
            Rotation::Left => Rotation::Right,
            Rotation::Right => Rotation::Left,
            other => other,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TouchState {
    Uninitialized,
    Probing,
    Ready,
}

/// What happened to the separate apply-register write after a resolution change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResolutionApplied {
    Confirmed,
    /// The block was written but the apply strobe was not acknowledged.
    ApplyUnconfirmed,
}

#[derive(Debug)]
pub enum TouchError<E> {
    Bus(E),
    /// No answer at either address.
    NotFound,
    /// Operation needs a successful `init` first.
    NotReady,
    /// The config block could not be read at init, so resolution is fixed.
    NoConfig,
}

impl<E> From<E> for TouchError<E> {
    fn from(e: E) -> Self {
        TouchError::Bus(e)
    }
}

impl<E: fmt::Debug> fmt::Display for TouchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TouchError::Bus(e) => write!(f, "i2c error: {:?}", e),
            TouchError::NotFound => f.write_str("touch controller not found"),
            TouchError::NotReady => f.write_str("touch controller not initialized"),
            TouchError::NoConfig => f.write_str("touch config block unavailable"),
        }
    }
}

/// Two's-complement negation of the byte sum, as the controller expects.
pub fn config_checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    (!sum).wrapping_add(1)
}

pub struct Gt911<I2C, D> {
    i2c: I2C,
    delay: D,
    config: TouchConfig,
    state: TouchState,
    address: u8,
    product_id: [u8; 4],
    rotation: Rotation,
    width: u16,
    height: u16,
    config_block: Option<Vec<u8, MAX_CONFIG_LEN>>,
}

impl<I2C, D, E> Gt911<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    E: fmt::Debug,
{
    /// No bus traffic until [`Gt911::init`].
    pub fn new(i2c: I2C, delay: D, config: TouchConfig) -> Self {
        Self {
            i2c,
            delay,
            state: TouchState::Uninitialized,
            address: config.primary_address,
            product_id: [0; 4],
            rotation: Rotation::Normal,
            width: config.width,
            height: config.height,
            config_block: None,
            config,
        }
    }

    /// Probe the primary address, then the alternate once.
    pub fn init(&mut self) -> Result<(), TouchError<E>> {
        if self.state == TouchState::Ready {
            return Ok(());
        }
        self.state = TouchState::Probing;
        self.delay.delay_ms(self.config.settle_ms);

        let mut id = [0u8; 4];
        self.address = self.config.primary_address;
        if let Err(e) = self.read_reg(self.config.registers.product_id, &mut id) {
            warn!(
                "no GT911 at 0x{:02X} ({:?}), trying 0x{:02X}",
                self.address, e, self.config.alternate_address
            );
            self.address = self.config.alternate_address;
            self.delay.delay_ms(self.config.retry_settle_ms);
            if let Err(e) = self.read_reg(self.config.registers.product_id, &mut id) {
                error!("GT911 not found on I2C bus: {:?}", e);
                self.state = TouchState::Uninitialized;
                return Err(TouchError::NotFound);
            }
        }

        self.product_id = id;
        self.state = TouchState::Ready;
        info!(
            "GT911 at 0x{:02X}, product id {}",
            self.address,
            core::str::from_utf8(&id).unwrap_or("????")
        );

        // Best effort: without it only set_resolution is lost
        self.config_block = match self.read_config_block() {
            Ok(block) => Some(block),
            Err(e) => {
                warn!("GT911 config block read failed: {:?}", e);
                None
            }
        };
        Ok(())
    }

    /// Poll once. An empty list means "no new data", not an error.
    pub fn read_points(&mut self) -> Result<Points, TouchError<E>> {
        if self.state != TouchState::Ready {
            return Err(TouchError::NotReady);
        }
        let regs = self.config.registers;

        let mut status = [0u8; 1];
        self.read_reg(regs.status, &mut status)?;
        let mut points = Points::new();
        if status[0] & STATUS_BUFFER_READY == 0 {
            return Ok(points);
        }

        let count = status[0] & STATUS_COUNT_MASK;
        if count as usize > MAX_POINTS {
            debug!("GT911 status 0x{:02X}: bad point count", status[0]);
        } else {
            for i in 0..count as u16 {
                let mut rec = [0u8; POINT_RECORD_LEN as usize];
                let reg = regs.point_data + i * POINT_RECORD_LEN;
                if let Err(e) = self.read_reg(reg, &mut rec) {
                    warn!("GT911 point {} read failed: {:?}", i, e);
                    break;
                }
                let raw_x = u16::from_le_bytes([rec[1], rec[2]]);
                let raw_y = u16::from_le_bytes([rec[3], rec[4]]);
                let (x, y) = self.rotation.apply(raw_x, raw_y, self.width, self.height);
                // Capacity is MAX_POINTS and count <= MAX_POINTS
                let _ = points.push(TouchPoint {
                    track_id: rec[0],
                    x,
                    y,
                    magnitude: u16::from_le_bytes([rec[5], rec[6]]),
                });
            }
        }

        // Acknowledge the buffer even when decoding stopped early
        if let Err(e) = self.write_reg(regs.status, &[0]) {
            warn!("GT911 status clear failed: {:?}", e);
        }
        Ok(points)
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    /// Rewrite the output X/Y maxima in the controller config and apply it.
    pub fn set_resolution(
        &mut self,
        width: u16,
        height: u16,
    ) -> Result<ResolutionApplied, TouchError<E>> {
        if self.state != TouchState::Ready {
            return Err(TouchError::NotReady);
        }
        if self.config_block.is_none() {
            return Err(TouchError::NoConfig);
        }
        let regs = self.config.registers;

        let mut block = self.read_config_block()?;
        block[X_MAX_OFFSET..X_MAX_OFFSET + 2].copy_from_slice(&width.to_le_bytes());
        block[Y_MAX_OFFSET..Y_MAX_OFFSET + 2].copy_from_slice(&height.to_le_bytes());
        let ck = regs.checksum_offset();
        block[ck] = config_checksum(&block[..ck]);
        block[regs.apply_offset()] = 1;

        self.write_reg(regs.config, &block)?;

        let applied = match self.write_reg(regs.apply, &[1]) {
            Ok(()) => ResolutionApplied::Confirmed,
            Err(e) => {
                warn!("GT911 apply write not acknowledged: {:?}", e);
                ResolutionApplied::ApplyUnconfirmed
            }
        };
        self.delay.delay_ms(self.config.apply_settle_ms);

        self.width = width;
        self.height = height;
        self.config_block = Some(block);
        info!("GT911 resolution {}x{} ({:?})", width, height, applied);
        Ok(applied)
    }

    #[inline]
    pub fn state(&self) -> TouchState {
        self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == TouchState::Ready
    }

    /// Bus address the controller answered on.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// ASCII product id, e.g. `b"911\0"`.
    pub fn product_id(&self) -> [u8; 4] {
        self.product_id
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn resolution(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Last config image read from or written to the controller.
    pub fn config_block(&self) -> Option<&[u8]> {
        self.config_block.as_deref()
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn read_config_block(&mut self) -> Result<Vec<u8, MAX_CONFIG_LEN>, TouchError<E>> {
        let regs = self.config.registers;
        let mut block = Vec::new();
        block
            .resize(regs.config_len(), 0)
            .map_err(|_| TouchError::NoConfig)?;
        self.read_reg(regs.config, &mut block)?;
        Ok(block)
    }

    fn read_reg(&mut self, reg: u16, buf: &mut [u8]) -> Result<(), E> {
        self.i2c.write_read(self.address, &reg.to_be_bytes(), buf)
    }

    // Register address and payload go out in one transaction
    fn write_reg(&mut self, reg: u16, data: &[u8]) -> Result<(), TouchError<E>> {
        let mut frame: Vec<u8, { MAX_CONFIG_LEN + 2 }> = Vec::new();
        frame
            .extend_from_slice(&reg.to_be_bytes())
            .map_err(|_| TouchError::NoConfig)?;
        frame
            .extend_from_slice(data)
            .map_err(|_| TouchError::NoConfig)?;
        self.i2c.write(self.address, &frame)?;
        Ok(())
    }
}
