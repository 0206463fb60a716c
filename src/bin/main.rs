//! RGB panel + touch bring-up
//! ========================================
//! source ~/export-esp.sh
//! cargo run --release --features esp32s3
//! ========================================
//!
//! Brings up the ST7701S 480x480 panel and the GT911 touch controller, then draws a
//! marker under the finger.

//% CHIPS: esp32s3
//% FEATURES: esp-hal/unstable

#![no_std]
#![no_main]

// Define the application description, which is placed in a special section of the binary.
// This is used by the bootloader to verify the application.
esp_bootloader_esp_idf::esp_app_desc!();

use esp32s3_rgb_panel::{
    board::{DpiScanOut, DpiVideo, HeapFrames, TimerTicks, TICKS},
    config::{DisplayConfig, ThreeWireTiming, TouchConfig},
    display::{DisplayError, DisplayService},
    gt911::{Gt911, ResolutionApplied, Rotation},
    input::{PointerEvent, TouchInput},
    st7701::St7701,
    wiring::{init_board_pins, BoardPins},
};

use esp_backtrace as _;

// ESP-HAL imports
use esp_hal::{
    delay::Delay,
    gpio::Output,
    i2c::master::{Config as I2cConfig, I2c},
    main, psram,
    time::Rate,
    Config,
};

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Circle, PrimitiveStyle},
};
use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

type Display = DisplayService<Output<'static>, DpiScanOut>;

const BRIGHTNESS_PCT: u8 = 90;
const MARKER_DIAMETER: u32 = 13;
const STATUS_LOG_MS: u32 = 10_000;

fn draw_marker(display: &mut Display, at: Point, color: Rgb565) {
    let res = Circle::with_center(at, MARKER_DIAMETER)
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(display);
    if let Err(e) = res {
        warn!("marker draw failed: {}", e);
    }
}

#[main]
fn main() -> ! {
    let peripherals = esp_hal::init(Config::default());

    // Internal heap first (fallback frame), then PSRAM (preferred frame)
    esp_alloc::heap_allocator!(size: 96 * 1024);
    esp_alloc::psram_allocator!(&peripherals.PSRAM, psram);
    esp_println::logger::init_logger(log::LevelFilter::Info);

    let (pins, lcd_cam, dma, i2c0, timg0) = init_board_pins(peripherals);
    let BoardPins {
        backlight,
        lcd_cs,
        lcd_scl,
        lcd_sda,
        rgb,
        touch_sda,
        touch_scl,
    } = pins;

    // -------------------- display --------------------
    let mut panel = St7701::new(lcd_cs, lcd_scl, lcd_sda, Delay::new(), ThreeWireTiming::ST7701)
        .expect("ST7701 pins");
    let mut display: Display = DisplayService::new(DisplayConfig::BOARD, backlight);
    let mut ticks = TimerTicks::new(timg0);
    match display.init(
        &mut panel,
        DpiVideo::new(lcd_cam, dma, rgb),
        &mut HeapFrames,
        &mut ticks,
        &mut Delay::new(),
    ) {
        Ok(()) => {}
        Err(DisplayError::VideoGenerator) => panic!("RGB video generator failed, halting"),
        Err(e) => panic!("display init failed: {}", e),
    }
    // Command bus is only needed for bring-up
    let _ = panel.release();

    // -------------------- touch --------------------
    let touch_cfg = TouchConfig::GT911;
    let i2c = I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_hz(touch_cfg.bus_hz)),
    )
    .expect("I2C0 config")
    .with_sda(touch_sda)
    .with_scl(touch_scl);

    let mut touch = Gt911::new(i2c, Delay::new(), touch_cfg);
    match touch.init() {
        Ok(()) => {
            touch.set_rotation(Rotation::Normal);
            match touch.set_resolution(480, 480) {
                Ok(ResolutionApplied::Confirmed) => {}
                Ok(ResolutionApplied::ApplyUnconfirmed) => {
                    warn!("touch resolution written, apply not confirmed")
                }
                Err(e) => warn!("touch resolution unchanged: {}", e),
            }
        }
        Err(e) => warn!("touch unavailable: {}", e),
    }
    let mut input = TouchInput::new(touch);

    if let Err(e) = display.set_brightness(BRIGHTNESS_PCT) {
        error!("backlight: {}", e);
    }
    info!("ready");

    // -------------------- main loop --------------------
    let mut delay = Delay::new();
    let mut marker: Option<Point> = None;
    let mut last_log = TICKS.now_ms();
    loop {
        match input.read() {
            PointerEvent::Pressed { x, y } => {
                let at = Point::new(x as i32, y as i32);
                if marker != Some(at) {
                    if let Some(old) = marker {
                        draw_marker(&mut display, old, Rgb565::BLACK);
                    }
                    draw_marker(&mut display, at, Rgb565::GREEN);
                    marker = Some(at);
                }
            }
            PointerEvent::Released => {
                if let Some(old) = marker.take() {
                    draw_marker(&mut display, old, Rgb565::BLACK);
                }
            }
        }

        let res = match display.flush_dirty() {
            Ok(true) => Ok(()),
            Ok(false) => display.refresh(),
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            error!("scan-out: {}", e);
        }

        if TICKS.elapsed_since(last_log) >= STATUS_LOG_MS {
            last_log = TICKS.now_ms();
            info!("uptime {} ms", last_log);
        }
        delay.delay_ms(DisplayConfig::BOARD.tick_period_ms);
    }
}
