//! ESP32-S3 backends for the display service.
//!
//! - [`DpiVideo`] / [`DpiScanOut`]: LCD_CAM in DPI mode, DMA straight from the frame buffer
//! - [`HeapFrames`]: frame memory from the esp-alloc PSRAM or internal heap
//! - [`TimerTicks`]: TIMG0 periodic interrupt advancing [`TICKS`]

use core::alloc::Layout;
use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;
use esp_alloc::{MemoryCapability, HEAP};
use esp_hal::{
    dma::{DmaDescriptor, DmaTxBuf, CHUNK_SIZE},
    gpio::Level,
    handler,
    lcd_cam::{
        lcd::{
            dpi::{Config, Dpi, Format, FrameTiming},
            ClockMode, Phase, Polarity as ClockPolarity,
        },
        LcdCam,
    },
    peripherals::{DMA_CH2, LCD_CAM, TIMG0},
    time::{Duration, Rate},
    timer::{timg::TimerGroup, PeriodicTimer},
    Blocking,
};
use log::{debug, error, info};

use crate::config::{PanelTiming, Polarity};
use crate::display::{FrameAllocator, MemoryRegion, ScanOut, VideoGenerator};
use crate::tick::{TickCounter, TickSource};
use crate::wiring::RgbPins;

/// Renderer clock, advanced from the timer interrupt.
pub static TICKS: TickCounter = TickCounter::new();
static TICK_PERIOD_MS: AtomicU32 = AtomicU32::new(0);
static TICK_TIMER: Mutex<RefCell<Option<PeriodicTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));

const FRAME_BYTES: usize = PanelTiming::ST7701_480X480.frame_bytes();
const NUM_DMA_DESC: usize = FRAME_BYTES.div_ceil(CHUNK_SIZE);

#[link_section = ".dma"]
static mut TX_DESCRIPTORS: [DmaDescriptor; NUM_DMA_DESC] = [DmaDescriptor::EMPTY; NUM_DMA_DESC];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpiError {
    /// Timing does not match the statically sized DMA descriptors.
    FrameSize,
    Config,
    DmaBuffer,
    Transfer,
    /// A previous transfer never handed the driver back.
    Lost,
}

/// LCD_CAM, its DMA channel and the RGB pins, not yet started.
pub struct DpiVideo<'a> {
    lcd_cam: LCD_CAM<'a>,
    dma: DMA_CH2<'a>,
    pins: RgbPins<'a>,
}

impl<'a> DpiVideo<'a> {
    pub fn new(lcd_cam: LCD_CAM<'a>, dma: DMA_CH2<'a>, pins: RgbPins<'a>) -> Self {
        Self { lcd_cam, dma, pins }
    }
}

fn idle_level(active: Polarity) -> Level {
    match active {
        Polarity::ActiveHigh => Level::Low,
        Polarity::ActiveLow => Level::High,
    }
}

fn clock_mode(pclk: Polarity) -> ClockMode {
    match pclk {
        Polarity::ActiveHigh => ClockMode {
            polarity: ClockPolarity::IdleLow,
            phase: Phase::ShiftLow,
        },
        Polarity::ActiveLow => ClockMode {
            polarity: ClockPolarity::IdleHigh,
            phase: Phase::ShiftHigh,
        },
    }
}

fn dpi_config(timing: &PanelTiming) -> Config {
    Config::default()
        .with_clock_mode(clock_mode(timing.polarity.pclk))
        .with_frequency(Rate::from_hz(timing.pclk_hz))
        .with_format(Format {
            enable_2byte_mode: true,
            ..Default::default()
        })
        .with_timing(FrameTiming {
            horizontal_total_width: timing.h_total() as usize,
            // Blank region before active pixels includes the sync pulse
            horizontal_blank_front_porch: (timing.hsync_pulse_width + timing.hsync_back_porch)
                as usize,
            horizontal_active_width: timing.h_res as usize,
            vertical_total_height: timing.v_total() as usize,
            vertical_blank_front_porch: (timing.vsync_pulse_width + timing.vsync_back_porch)
                as usize,
            vertical_active_height: timing.v_res as usize,
            vsync_width: timing.vsync_pulse_width as usize,
            hsync_width: timing.hsync_pulse_width as usize,
            hsync_position: 0,
        })
        .with_vsync_idle_level(idle_level(timing.polarity.vsync))
        .with_hsync_idle_level(idle_level(timing.polarity.hsync))
        .with_de_idle_level(idle_level(timing.polarity.de))
        .with_disable_black_region(false)
}

impl VideoGenerator for DpiVideo<'static> {
    type ScanOut = DpiScanOut;
    type Error = DpiError;

    fn start(
        self,
        timing: &PanelTiming,
        frame: &'static mut [u16],
    ) -> Result<DpiScanOut, DpiError> {
        if timing.frame_bytes() != FRAME_BYTES || frame.len() * 2 != FRAME_BYTES {
            return Err(DpiError::FrameSize);
        }

        let lcd_cam = LcdCam::new(self.lcd_cam);
        let RgbPins {
            de,
            vsync,
            hsync,
            pclk,
            data,
        } = self.pins;
        let [d0, d1, d2, d3, d4, d5, d6, d7, d8, d9, d10, d11, d12, d13, d14, d15] = data;

        let dpi = Dpi::new(lcd_cam.lcd, self.dma, dpi_config(timing))
            .map_err(|e| {
                error!("DPI config rejected: {:?}", e);
                DpiError::Config
            })?
            .with_vsync(vsync)
            .with_hsync(hsync)
            .with_de(de)
            .with_pclk(pclk)
            .with_data0(d0)
            .with_data1(d1)
            .with_data2(d2)
            .with_data3(d3)
            .with_data4(d4)
            .with_data5(d5)
            .with_data6(d6)
            .with_data7(d7)
            .with_data8(d8)
            .with_data9(d9)
            .with_data10(d10)
            .with_data11(d11)
            .with_data12(d12)
            .with_data13(d13)
            .with_data14(d14)
            .with_data15(d15);

        // The renderer's frame is the DMA source; RGB565 goes out low byte first
        let buf: &'static mut [u8] = bytemuck::cast_slice_mut(frame);
        // SAFETY: only one DpiScanOut is ever started
        let descriptors = unsafe { &mut *core::ptr::addr_of_mut!(TX_DESCRIPTORS) };
        let dma_tx = DmaTxBuf::new(descriptors, buf).map_err(|e| {
            error!("DMA buffer setup failed: {:?}", e);
            DpiError::DmaBuffer
        })?;

        let mut scan_out = DpiScanOut {
            parts: Some((dpi, dma_tx)),
        };
        // First frame: black, cleared by the display service
        scan_out.send_frame()?;
        info!("DPI scan-out running");
        Ok(scan_out)
    }
}

/// Running DPI output. Owns the frame buffer while it scans it out.
pub struct DpiScanOut {
    parts: Option<(Dpi<'static, Blocking>, DmaTxBuf)>,
}

impl DpiScanOut {
    fn send_frame(&mut self) -> Result<(), DpiError> {
        let (dpi, mut dma_tx) = self.parts.take().ok_or(DpiError::Lost)?;
        dma_tx.set_length(FRAME_BYTES);
        match dpi.send(false, dma_tx) {
            Ok(xfer) => {
                let (res, dpi, dma_tx) = xfer.wait();
                self.parts = Some((dpi, dma_tx));
                res.map_err(|e| {
                    error!("DPI transfer error: {:?}", e);
                    DpiError::Transfer
                })
            }
            Err((e, dpi, dma_tx)) => {
                self.parts = Some((dpi, dma_tx));
                error!("DPI send error: {:?}", e);
                Err(DpiError::Transfer)
            }
        }
    }
}

impl ScanOut for DpiScanOut {
    type Error = DpiError;

    fn frame(&self) -> &[u16] {
        match &self.parts {
            Some((_, dma_tx)) => bytemuck::try_cast_slice(dma_tx.as_slice()).unwrap_or(&[]),
            None => &[],
        }
    }

    fn frame_mut(&mut self) -> &mut [u16] {
        match &mut self.parts {
            Some((_, dma_tx)) => {
                bytemuck::try_cast_slice_mut(dma_tx.as_mut_slice()).unwrap_or(&mut [])
            }
            None => &mut [],
        }
    }

    // DPI has no partial update: the whole frame goes out every time
    fn draw_bitmap(
        &mut self,
        _x_start: u16,
        _y_start: u16,
        _x_end: u16,
        _y_end: u16,
    ) -> Result<(), DpiError> {
        self.send_frame()
    }

    fn refresh(&mut self) -> Result<(), DpiError> {
        self.send_frame()
    }
}

/// Frame memory from the global esp-alloc heap, by capability.
pub struct HeapFrames;

impl FrameAllocator for HeapFrames {
    fn allocate(&mut self, region: MemoryRegion, pixels: usize) -> Option<&'static mut [u16]> {
        let caps = match region {
            MemoryRegion::External => MemoryCapability::External,
            MemoryRegion::Internal => MemoryCapability::Internal,
        };
        let layout = Layout::array::<u16>(pixels).ok()?;
        let ptr = unsafe { HEAP.alloc_caps(caps.into(), layout) } as *mut u16;
        if ptr.is_null() {
            debug!("{:?} heap: {} bytes free", region, HEAP.free());
            return None;
        }
        // SAFETY: fresh allocation of `pixels` u16s, zeroed, never freed
        unsafe {
            ptr.write_bytes(0, pixels);
            Some(core::slice::from_raw_parts_mut(ptr, pixels))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickError {
    AlreadyStarted,
    Start,
}

/// TIMG0 timer 0 as the renderer tick.
pub struct TimerTicks {
    timer: Option<PeriodicTimer<'static, Blocking>>,
}

impl TimerTicks {
    pub fn new(timg0: TIMG0<'static>) -> Self {
        let tg = TimerGroup::new(timg0);
        Self {
            timer: Some(PeriodicTimer::new(tg.timer0)),
        }
    }
}

impl TickSource for TimerTicks {
    type Error = TickError;

    fn start_periodic(&mut self, period_ms: u32) -> Result<(), TickError> {
        let mut timer = self.timer.take().ok_or(TickError::AlreadyStarted)?;
        TICK_PERIOD_MS.store(period_ms, Ordering::Relaxed);
        timer.set_interrupt_handler(on_tick);
        timer
            .start(Duration::from_millis(period_ms as u64))
            .map_err(|e| {
                error!("tick timer start failed: {:?}", e);
                TickError::Start
            })?;
        timer.listen();
        critical_section::with(|cs| TICK_TIMER.borrow_ref_mut(cs).replace(timer));
        Ok(())
    }
}

#[handler]
fn on_tick() {
    critical_section::with(|cs| {
        if let Some(timer) = TICK_TIMER.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
    });
    TICKS.advance(TICK_PERIOD_MS.load(Ordering::Relaxed));
}
