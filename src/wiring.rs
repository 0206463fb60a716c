// This module handles board-specific pin mappings.
// One profile: ESP32-S3 with a 480x480 ST7701S RGB panel and a GT911 touch controller.
//! The following wiring is assumed:
//! - RGB DE => GPIO18, VSYNC => GPIO17, HSYNC => GPIO16, PCLK => GPIO21
//! - B0..B4 => GPIO4, GPIO5, GPIO6, GPIO7, GPIO15
//! - G0..G5 => GPIO8, GPIO20, GPIO3, GPIO46, GPIO9, GPIO10
//! - R0..R4 => GPIO11, GPIO12, GPIO13, GPIO14, GPIO0
//! - Backlight => GPIO38 (plain on/off)
//! - ST7701 3-wire bus: CS => GPIO39, SCL => GPIO48, SDA => GPIO47
//! - GT911 I2C: SDA => GPIO19, SCL => GPIO45
//! Data lines D0..D15 carry B0..B4, G0..G5, R0..R4 in that order (RGB565, blue in the LSBs).

use esp_hal::gpio::{AnyPin, Level, Output, OutputConfig};
use esp_hal::peripherals::{Peripherals, DMA_CH2, I2C0, LCD_CAM, TIMG0};

/// Parallel RGB lines, still unconfigured; the DPI driver takes them over.
pub struct RgbPins<'a> {
    pub de: AnyPin<'a>,
    pub vsync: AnyPin<'a>,
    pub hsync: AnyPin<'a>,
    pub pclk: AnyPin<'a>,
    /// D0..D15
    pub data: [AnyPin<'a>; 16],
}

pub struct BoardPins<'a> {
    pub backlight: Output<'a>,
    // ST7701 command bus, idle high
    pub lcd_cs: Output<'a>,
    pub lcd_scl: Output<'a>,
    pub lcd_sda: Output<'a>,
    pub rgb: RgbPins<'a>,
    pub touch_sda: AnyPin<'a>,
    pub touch_scl: AnyPin<'a>,
}

/// Split the chip peripherals into pins and the blocks the firmware drives.
pub fn init_board_pins<'a>(
    p: Peripherals,
) -> (BoardPins<'a>, LCD_CAM<'a>, DMA_CH2<'a>, I2C0<'a>, TIMG0<'a>) {
    // Backlight stays off until the display service has brought the panel up
    let backlight = Output::new(p.GPIO38, Level::Low, OutputConfig::default());

    let lcd_cs = Output::new(p.GPIO39, Level::High, OutputConfig::default());
    let lcd_scl = Output::new(p.GPIO48, Level::High, OutputConfig::default());
    let lcd_sda = Output::new(p.GPIO47, Level::High, OutputConfig::default());

    let rgb = RgbPins {
        de: p.GPIO18.into(),
        vsync: p.GPIO17.into(),
        hsync: p.GPIO16.into(),
        pclk: p.GPIO21.into(),
        data: [
            // Blue
            p.GPIO4.into(),
            p.GPIO5.into(),
            p.GPIO6.into(),
            p.GPIO7.into(),
            p.GPIO15.into(),
            // Green
            p.GPIO8.into(),
            p.GPIO20.into(),
            p.GPIO3.into(),
            p.GPIO46.into(),
            p.GPIO9.into(),
            p.GPIO10.into(),
            // Red
            p.GPIO11.into(),
            p.GPIO12.into(),
            p.GPIO13.into(),
            p.GPIO14.into(),
            p.GPIO0.into(),
        ],
    };

    (
        BoardPins {
            backlight,
            lcd_cs,
            lcd_scl,
            lcd_sda,
            rgb,
            touch_sda: p.GPIO19.into(),
            touch_scl: p.GPIO45.into(),
        },
        p.LCD_CAM,
        p.DMA_CH2,
        p.I2C0,
        p.TIMG0,
    )
}
