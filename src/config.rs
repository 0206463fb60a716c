//! Board constants as data.
//!
//! Timing, protocol and register constants for the ST7701S 480x480 RGB panel and the
//! GT911 touch controller. Everything here is immutable and handed to the drivers at
//! construction, so tests can run the same protocol code with other values.

/// Active level of one video control signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

/// Polarity flags for the four RGB control lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignalPolarity {
    /// Data is latched on the falling PCLK edge when `ActiveLow`.
    pub pclk: Polarity,
    pub hsync: Polarity,
    pub vsync: Polarity,
    pub de: Polarity,
}

/// Video timing for the scan-out generator. Set once, before scan-out starts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PanelTiming {
    pub pclk_hz: u32,
    pub h_res: u16,
    pub v_res: u16,
    pub hsync_pulse_width: u16,
    pub hsync_back_porch: u16,
    pub hsync_front_porch: u16,
    pub vsync_pulse_width: u16,
    pub vsync_back_porch: u16,
    pub vsync_front_porch: u16,
    pub polarity: SignalPolarity,
}

impl PanelTiming {
    /// 480x480 ST7701S panel, 10 MHz pixel clock.
    pub const ST7701_480X480: Self = Self {
        pclk_hz: 10_000_000,
        h_res: 480,
        v_res: 480,
        hsync_pulse_width: 8,
        hsync_back_porch: 50,
        hsync_front_porch: 10,
        vsync_pulse_width: 8,
        vsync_back_porch: 22,
        vsync_front_porch: 8,
        polarity: SignalPolarity {
            pclk: Polarity::ActiveHigh,
            hsync: Polarity::ActiveLow,
            vsync: Polarity::ActiveLow,
            de: Polarity::ActiveHigh,
        },
    };

    /// Pixel clocks per line, blanking included.
    pub const fn h_total(&self) -> u32 {
        self.hsync_pulse_width as u32
            + self.hsync_back_porch as u32
            + self.h_res as u32
            + self.hsync_front_porch as u32
    }

    /// Lines per frame, blanking included.
    pub const fn v_total(&self) -> u32 {
        self.vsync_pulse_width as u32
            + self.vsync_back_porch as u32
            + self.v_res as u32
            + self.vsync_front_porch as u32
    }

    pub const fn pixels(&self) -> usize {
        self.h_res as usize * self.v_res as usize
    }

    /// RGB565: two bytes per pixel.
    pub const fn frame_bytes(&self) -> usize {
        self.pixels() * 2
    }

    /// Approximate refresh rate in Hz.
    pub fn refresh_hz(&self) -> u32 {
        let per_frame = self.h_total() * self.v_total();
        if per_frame == 0 {
            return 0;
        }
        self.pclk_hz / per_frame
    }
}

impl Default for PanelTiming {
    fn default() -> Self {
        Self::ST7701_480X480
    }
}

/// Bit timing of the 3-wire command bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ThreeWireTiming {
    /// Each SCL level is held this long.
    pub half_period_us: u32,
    /// Idle time after CS is released, between two 9-bit frames.
    pub inter_byte_us: u32,
}

impl ThreeWireTiming {
    pub const ST7701: Self = Self {
        half_period_us: 1,
        inter_byte_us: 2,
    };
}

impl Default for ThreeWireTiming {
    fn default() -> Self {
        Self::ST7701
    }
}

/// Everything the display service needs besides the hardware handles.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DisplayConfig {
    pub timing: PanelTiming,
    /// Period of the renderer clock tick.
    pub tick_period_ms: u32,
    /// Panel power settle before the command sequence.
    pub pre_init_settle_ms: u32,
    /// Settle after the command sequence, before video starts.
    pub post_init_settle_ms: u32,
}

impl DisplayConfig {
    pub const BOARD: Self = Self {
        timing: PanelTiming::ST7701_480X480,
        tick_period_ms: 5,
        pre_init_settle_ms: 500,
        post_init_settle_ms: 500,
    };
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::BOARD
    }
}

/// GT911 register map.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TouchRegisters {
    pub product_id: u16,
    pub config: u16,
    pub checksum: u16,
    pub apply: u16,
    pub status: u16,
    pub point_data: u16,
}

impl TouchRegisters {
    pub const GT911: Self = Self {
        product_id: 0x8140,
        config: 0x8047,
        checksum: 0x80FF,
        apply: 0x8100,
        status: 0x814E,
        point_data: 0x814F,
    };

    /// Bytes from the first config register through the apply flag, inclusive.
    pub const fn config_len(&self) -> usize {
        (self.apply - self.config) as usize + 1
    }

    /// Offset of the checksum byte inside the config block.
    pub const fn checksum_offset(&self) -> usize {
        (self.checksum - self.config) as usize
    }

    /// Offset of the apply flag inside the config block.
    pub const fn apply_offset(&self) -> usize {
        (self.apply - self.config) as usize
    }
}

/// Touch controller addressing, register map and protocol delays.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TouchConfig {
    pub primary_address: u8,
    pub alternate_address: u8,
    pub registers: TouchRegisters,
    /// Bus clock, only used by the board layer to configure the I2C master.
    pub bus_hz: u32,
    /// Wait after the bus comes up, before the first probe.
    pub settle_ms: u32,
    /// Wait before retrying at the alternate address.
    pub retry_settle_ms: u32,
    /// Wait after the apply flag is written.
    pub apply_settle_ms: u32,
    /// Logical size used for rotation until a resolution is set.
    pub width: u16,
    pub height: u16,
}

impl TouchConfig {
    pub const GT911: Self = Self {
        primary_address: 0x5D,
        alternate_address: 0x14,
        registers: TouchRegisters::GT911,
        bus_hz: 400_000,
        settle_ms: 100,
        retry_settle_ms: 50,
        apply_settle_ms: 100,
        width: 480,
        height: 480,
    };
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self::GT911
    }
}
