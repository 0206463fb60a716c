// ST7701S bring-up over the 3-wire command bus (bit-banged, no D/C pin).
//
// Wiring on the 4" 480x480 RGB board:
//   CS  = GPIO39
//   SCL = GPIO48
//   SDA = GPIO47
//
// Protocol (3-wire, 9-bit):
//   CS low for the whole frame, then 9 bits MSB first, sampled on the rising SCL edge:
//   bit 8 = D/C (0 = command, 1 = data), bits 7..0 = payload.
//   Example: cmd 0x3A, data 0x50 -> [0|0011_1010] [1|0101_0000] (pixel format RGB565)
//
// The panel never answers. A dead panel just stays blank.

use core::fmt;

use embedded_hal::{delay::DelayNs, digital::OutputPin};
use log::{debug, info};

use crate::config::ThreeWireTiming;

/// Command 2 bank select: `FF 77 01 00 00 <page>`.
pub const CMD_PAGE_SELECT: u8 = 0xFF;
const PAGE_SELECT_PREFIX: [u8; 4] = [0x77, 0x01, 0x00, 0x00];

pub const PAGE_0: u8 = 0x00;
pub const PAGE_BK0: u8 = 0x10;
pub const PAGE_BK1: u8 = 0x11;
pub const PAGE_BK3: u8 = 0x13;

pub const CMD_SLEEP_OUT: u8 = 0x11;
pub const CMD_DISPLAY_ON: u8 = 0x29;
pub const CMD_PIXEL_FORMAT: u8 = 0x3A;
/// 16 bpp on the RGB interface.
pub const PIXEL_FORMAT_RGB565: u8 = 0x50;

/// One step of a bring-up table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InitCmd {
    /// Select a register bank (5-byte page-select command).
    Page(u8),
    /// Command byte followed by its parameters.
    Cmd(u8, &'static [u8]),
    /// Blocking wait in milliseconds.
    Delay(u8),
}

/// ST7701S table: bank 0 power and gamma, bank 1 voltages and GIP timing, bank 3
/// VAP/VAN, then RGB565, sleep-out and display-on.
pub const INIT_SEQUENCE: &[InitCmd] = &[
    InitCmd::Page(PAGE_BK0),
    InitCmd::Cmd(0xC0, &[0x3B, 0x00]),
    InitCmd::Cmd(0xC1, &[0x0D, 0x02]),
    InitCmd::Cmd(0xC2, &[0x31, 0x05]),
    InitCmd::Cmd(0xCD, &[0x00]),
    // positive / negative gamma
    InitCmd::Cmd(
        0xB0,
        &[
            0x00, 0x11, 0x18, 0x0E, 0x11, 0x06, 0x07, 0x08, 0x07, 0x22, 0x04, 0x12, 0x0F, 0xAA,
            0x31, 0x18,
        ],
    ),
    InitCmd::Cmd(
        0xB1,
        &[
            0x00, 0x11, 0x19, 0x0E, 0x12, 0x07, 0x08, 0x08, 0x08, 0x22, 0x04, 0x11, 0x11, 0xA9,
            0x32, 0x18,
        ],
    ),
    InitCmd::Page(PAGE_BK1),
    InitCmd::Cmd(0xB0, &[0x60]), // VOP
    InitCmd::Cmd(0xB1, &[0x32]), // VCOM
    InitCmd::Cmd(0xB2, &[0x07]), // VGH
    InitCmd::Cmd(0xB3, &[0x80]),
    InitCmd::Cmd(0xB5, &[0x49]), // VGL
    InitCmd::Cmd(0xB7, &[0x85]),
    InitCmd::Cmd(0xB8, &[0x21]), // AVDD/AVCL
    InitCmd::Cmd(0xC1, &[0x78]),
    InitCmd::Cmd(0xC2, &[0x78]),
    InitCmd::Cmd(0xE0, &[0x00, 0x1B, 0x02]),
    InitCmd::Cmd(
        0xE1,
        &[0x08, 0xA0, 0x00, 0x00, 0x07, 0xA0, 0x00, 0x00, 0x00, 0x44, 0x44],
    ),
    InitCmd::Cmd(
        0xE2,
        &[0x11, 0x11, 0x44, 0x44, 0xED, 0xA0, 0x00, 0x00, 0xEC, 0xA0, 0x00, 0x00],
    ),
    InitCmd::Cmd(0xE3, &[0x00, 0x00, 0x11, 0x11]),
    InitCmd::Cmd(0xE4, &[0x44, 0x44]),
    InitCmd::Cmd(
        0xE5,
        &[
            0x0A, 0xE9, 0xD8, 0xA0, 0x0C, 0xEB, 0xD8, 0xA0, 0x0E, 0xED, 0xD8, 0xA0, 0x10, 0xEF,
            0xD8, 0xA0,
        ],
    ),
    InitCmd::Cmd(0xE6, &[0x00, 0x00, 0x11, 0x11]),
    InitCmd::Cmd(0xE7, &[0x44, 0x44]),
    InitCmd::Cmd(
        0xE8,
        &[
            0x09, 0xE8, 0xD8, 0xA0, 0x0B, 0xEA, 0xD8, 0xA0, 0x0D, 0xEC, 0xD8, 0xA0, 0x0F, 0xEE,
            0xD8, 0xA0,
        ],
    ),
    InitCmd::Cmd(0xEB, &[0x02, 0x00, 0xE4, 0xE4, 0x88, 0x00, 0x40]),
    InitCmd::Cmd(0xEC, &[0x3C, 0x00]),
    InitCmd::Page(PAGE_BK3),
    InitCmd::Cmd(0xE5, &[0xE4]),
    InitCmd::Page(PAGE_0),
    InitCmd::Cmd(CMD_PIXEL_FORMAT, &[PIXEL_FORMAT_RGB565]),
    InitCmd::Delay(10),
    InitCmd::Cmd(CMD_SLEEP_OUT, &[]),
    InitCmd::Delay(120),
    InitCmd::Cmd(CMD_DISPLAY_ON, &[]),
    InitCmd::Delay(20),
];

/// Pin failure while clocking a frame out.
#[derive(Debug)]
pub enum PanelError<E> {
    Pin(E),
}

impl<E: fmt::Debug> From<E> for PanelError<E> {
    fn from(e: E) -> Self {
        Self::Pin(e)
    }
}

/// Bit-banged 3-wire command interface of the ST7701S.
///
/// All three lines idle high. Owns the pins only for the bring-up; call
/// [`St7701::release`] to get them back afterwards.
pub struct St7701<CS, SCL, SDA, D> {
    cs: CS,
    scl: SCL,
    sda: SDA,
    delay: D,
    timing: ThreeWireTiming,
}

impl<CS, SCL, SDA, D, E> St7701<CS, SCL, SDA, D>
where
    CS: OutputPin<Error = E>,
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E>,
    D: DelayNs,
    E: fmt::Debug,
{
    /// Take the pins and drive them to the idle state.
    pub fn new(
        mut cs: CS,
        mut scl: SCL,
        mut sda: SDA,
        delay: D,
        timing: ThreeWireTiming,
    ) -> Result<Self, PanelError<E>> {
        cs.set_high()?;
        scl.set_high()?;
        sda.set_high()?;
        Ok(Self {
            cs,
            scl,
            sda,
            delay,
            timing,
        })
    }

    /// Run the built-in ST7701S table.
    pub fn init(&mut self) -> Result<(), PanelError<E>> {
        info!("ST7701: sending init sequence ({} steps)", INIT_SEQUENCE.len());
        self.run(INIT_SEQUENCE)?;
        info!("ST7701: sleep out, display on");
        Ok(())
    }

    /// Replay any table, in order.
    pub fn run(&mut self, sequence: &[InitCmd]) -> Result<(), PanelError<E>> {
        for &step in sequence {
            match step {
                InitCmd::Page(page) => self.select_page(page)?,
                InitCmd::Cmd(cmd, args) => self.send(cmd, args)?,
                InitCmd::Delay(ms) => self.delay.delay_ms(ms as u32),
            }
        }
        Ok(())
    }

    pub fn select_page(&mut self, page: u8) -> Result<(), PanelError<E>> {
        debug!("ST7701: page 0x{:02X}", page);
        self.command(CMD_PAGE_SELECT)?;
        for &b in PAGE_SELECT_PREFIX.iter() {
            self.data(b)?;
        }
        self.data(page)
    }

    /// Command byte and its parameters.
    pub fn send(&mut self, cmd: u8, args: &[u8]) -> Result<(), PanelError<E>> {
        self.command(cmd)?;
        for &arg in args {
            self.data(arg)?;
        }
        Ok(())
    }

    #[inline]
    pub fn command(&mut self, cmd: u8) -> Result<(), PanelError<E>> {
        self.write9(false, cmd)
    }

    #[inline]
    pub fn data(&mut self, byte: u8) -> Result<(), PanelError<E>> {
        self.write9(true, byte)
    }

    /// Hand the pins and delay back once the panel is running.
    pub fn release(self) -> (CS, SCL, SDA, D) {
        (self.cs, self.scl, self.sda, self.delay)
    }

    // ---- Low-level helpers ----

    // One 9-bit frame: D/C flag, then payload MSB first.
    fn write9(&mut self, is_data: bool, payload: u8) -> Result<(), PanelError<E>> {
        self.cs.set_low()?;
        self.set_sda(is_data)?;
        self.clock()?;
        for i in (0..8).rev() {
            self.set_sda((payload >> i) & 1 != 0)?;
            self.clock()?;
        }
        self.cs.set_high()?;
        self.delay.delay_us(self.timing.inter_byte_us);
        Ok(())
    }

    #[inline]
    fn set_sda(&mut self, high: bool) -> Result<(), PanelError<E>> {
        if high {
            self.sda.set_high()?;
        } else {
            self.sda.set_low()?;
        }
        Ok(())
    }

    // Falling then rising edge; the panel samples SDA on the rising edge.
    fn clock(&mut self) -> Result<(), PanelError<E>> {
        self.scl.set_low()?;
        self.delay.delay_us(self.timing.half_period_us);
        self.scl.set_high()?;
        self.delay.delay_us(self.timing.half_period_us);
        Ok(())
    }
}
