//! Display service: panel bring-up, RGB scan-out and the single frame buffer.
//
// - `DisplayService::init` runs the ST7701 table, starts the video generator with the
//   fixed 480x480 timing, allocates one RGB565 frame (PSRAM first, internal RAM as
//   fallback) and starts the renderer tick.
// - The renderer draws through `DrawTarget` (or straight into `frame_buffer_mut`) and
//   asks for a flush; `flush` returning Ok is the "flush ready" acknowledgment.
// - Full-buffer mode: the frame is never double buffered or partially copied.

use core::fmt;

use embedded_graphics::primitives::Rectangle;
use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use embedded_hal::{delay::DelayNs, digital::OutputPin};
use log::{debug, error, info, warn};

use crate::config::{DisplayConfig, PanelTiming};
use crate::st7701::{PanelError, St7701};
use crate::tick::TickSource;

/// Inclusive pixel rectangle, as the renderer reports dirty regions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Area {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
}

impl Area {
    pub const fn new(x1: u16, y1: u16, x2: u16, y2: u16) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Whole screen of `width` x `height`. A zero size gives the single pixel at the origin.
    pub const fn full(width: u16, height: u16) -> Self {
        Self::new(0, 0, width.saturating_sub(1), height.saturating_sub(1))
    }

    pub const fn point(x: u16, y: u16) -> Self {
        Self::new(x, y, x, y)
    }

    /// Zero for an inverted area.
    pub const fn width(&self) -> u16 {
        if self.x2 < self.x1 {
            return 0;
        }
        (self.x2 - self.x1).saturating_add(1)
    }

    /// Zero for an inverted area.
    pub const fn height(&self) -> u16 {
        if self.y2 < self.y1 {
            return 0;
        }
        (self.y2 - self.y1).saturating_add(1)
    }

    /// Smallest area covering both.
    pub fn union(&self, other: &Area) -> Area {
        Area {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    fn fits(&self, width: u16, height: u16) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2 && self.x2 < width && self.y2 < height
    }
}

/// Where a frame buffer may live.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryRegion {
    /// PSRAM: large, slow.
    External,
    /// On-chip SRAM: small, fast.
    Internal,
}

/// Allocates the frame buffer. Returns `None` when the region has no room.
///
/// The buffer lives for the rest of the program; it is never freed.
pub trait FrameAllocator {
    fn allocate(&mut self, region: MemoryRegion, pixels: usize) -> Option<&'static mut [u16]>;
}

/// A running scan-out. It reads pixels straight from the one frame buffer handed to
/// [`VideoGenerator::start`]; the renderer draws into that same memory.
pub trait ScanOut {
    type Error: fmt::Debug;

    fn frame(&self) -> &[u16];

    fn frame_mut(&mut self) -> &mut [u16];

    /// Push `x_start..x_end` x `y_start..y_end` (exclusive ends) of the frame to the panel.
    fn draw_bitmap(
        &mut self,
        x_start: u16,
        y_start: u16,
        x_end: u16,
        y_end: u16,
    ) -> Result<(), Self::Error>;

    /// Re-send the last delivered frame, for outputs that need a steady signal.
    fn refresh(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Creates and starts the continuous video timing generator over `frame`.
pub trait VideoGenerator {
    type ScanOut: ScanOut;
    type Error: fmt::Debug;

    fn start(
        self,
        timing: &PanelTiming,
        frame: &'static mut [u16],
    ) -> Result<Self::ScanOut, Self::Error>;
}

/// Anything that can bring the panel controller up before video starts.
pub trait PanelInit {
    type Error: fmt::Debug;

    fn init(&mut self) -> Result<(), Self::Error>;
}

impl<CS, SCL, SDA, D, E> PanelInit for St7701<CS, SCL, SDA, D>
where
    CS: OutputPin<Error = E>,
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E>,
    D: DelayNs,
    E: fmt::Debug,
{
    type Error = PanelError<E>;

    fn init(&mut self) -> Result<(), Self::Error> {
        St7701::init(self)
    }
}

/// Display service errors. Details are logged where they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    Backlight,
    Panel,
    /// Video generator could not be created or started. Not recoverable.
    VideoGenerator,
    /// Neither PSRAM nor internal RAM could hold a frame.
    OutOfMemory,
    Timer,
    AlreadyInitialized,
    NotInitialized,
    OutOfBounds,
    ScanOut,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Backlight => "backlight pin failed",
            Self::Panel => "panel bring-up failed",
            Self::VideoGenerator => "video generator failed",
            Self::OutOfMemory => "no memory for frame buffer",
            Self::Timer => "tick timer failed",
            Self::AlreadyInitialized => "display already initialized",
            Self::NotInitialized => "display not initialized",
            Self::OutOfBounds => "area outside the panel",
            Self::ScanOut => "scan-out transfer failed",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for DisplayError {}

/// Owns the backlight, the scan-out and the frame buffer.
pub struct DisplayService<BL, SO> {
    config: DisplayConfig,
    backlight: BL,
    backlight_ready: bool,
    scan_out: Option<SO>,
    fb_region: Option<MemoryRegion>,
    dirty: Option<Area>,
}

impl<BL, SO> DisplayService<BL, SO>
where
    BL: OutputPin,
    SO: ScanOut,
{
    pub fn new(config: DisplayConfig, backlight: BL) -> Self {
        Self {
            config,
            backlight,
            backlight_ready: false,
            scan_out: None,
            fb_region: None,
            dirty: None,
        }
    }

    /// Bring the panel up and start scan-out. Call once at startup.
    ///
    /// * `panel` - command-bus sequencer, run before any video signal
    /// * `video` - consumed; its scan-out handle is kept by the service
    /// * `memory` - frame buffer source, asked for PSRAM first
    /// * `ticker` - periodic timer started at `tick_period_ms`
    pub fn init<P, V, M, T, D>(
        &mut self,
        panel: &mut P,
        video: V,
        memory: &mut M,
        ticker: &mut T,
        delay: &mut D,
    ) -> Result<(), DisplayError>
    where
        P: PanelInit,
        V: VideoGenerator<ScanOut = SO>,
        M: FrameAllocator,
        T: TickSource,
        D: DelayNs,
    {
        if self.is_initialized() {
            return Err(DisplayError::AlreadyInitialized);
        }
        let timing = self.config.timing;

        // Backlight is a constant high, no PWM
        self.backlight
            .set_high()
            .map_err(|_| DisplayError::Backlight)?;
        self.backlight_ready = true;

        delay.delay_ms(self.config.pre_init_settle_ms);
        panel.init().map_err(|e| {
            error!("panel init failed: {:?}", e);
            DisplayError::Panel
        })?;
        delay.delay_ms(self.config.post_init_settle_ms);

        let pixels = timing.pixels();
        let (fb, region) = match memory.allocate(MemoryRegion::External, pixels) {
            Some(fb) => (fb, MemoryRegion::External),
            None => {
                warn!("no PSRAM for {} byte frame, trying internal RAM", pixels * 2);
                let fb = memory
                    .allocate(MemoryRegion::Internal, pixels)
                    .ok_or(DisplayError::OutOfMemory)?;
                (fb, MemoryRegion::Internal)
            }
        };
        if fb.len() != pixels {
            error!("frame buffer has {} pixels, need {}", fb.len(), pixels);
            return Err(DisplayError::OutOfMemory);
        }
        fb.fill(0);

        let scan_out = video.start(&timing, fb).map_err(|e| {
            error!("video generator failed: {:?}", e);
            DisplayError::VideoGenerator
        })?;
        info!(
            "scan-out {}x{} @ {} Hz pclk (~{} fps)",
            timing.h_res,
            timing.v_res,
            timing.pclk_hz,
            timing.refresh_hz()
        );

        ticker
            .start_periodic(self.config.tick_period_ms)
            .map_err(|e| {
                error!("tick timer failed: {:?}", e);
                DisplayError::Timer
            })?;

        info!("frame buffer: {} bytes in {:?}", pixels * 2, region);
        self.scan_out = Some(scan_out);
        self.fb_region = Some(region);
        Ok(())
    }

    /// Binary backlight: on for any non-zero percent. No-op before `init`.
    pub fn set_brightness(&mut self, percent: u8) -> Result<(), DisplayError> {
        if !self.backlight_ready {
            debug!("set_brightness({}) before init ignored", percent);
            return Ok(());
        }
        let res = if percent > 0 {
            self.backlight.set_high()
        } else {
            self.backlight.set_low()
        };
        res.map_err(|_| DisplayError::Backlight)
    }

    /// Deliver `area` (inclusive) to the panel. Ok means the renderer may reuse it.
    pub fn flush(&mut self, area: Area) -> Result<(), DisplayError> {
        let (w, h) = (self.config.timing.h_res, self.config.timing.v_res);
        let scan_out = self.scan_out.as_mut().ok_or(DisplayError::NotInitialized)?;
        if !area.fits(w, h) {
            return Err(DisplayError::OutOfBounds);
        }
        scan_out
            .draw_bitmap(area.x1, area.y1, area.x2 + 1, area.y2 + 1)
            .map_err(|e| {
                error!("scan-out of {:?} failed: {:?}", area, e);
                DisplayError::ScanOut
            })?;
        if self.dirty.is_some_and(|d| d.union(&area) == area) {
            self.dirty = None;
        }
        Ok(())
    }

    /// Keep the panel fed between flushes. Call once per loop iteration.
    pub fn refresh(&mut self) -> Result<(), DisplayError> {
        let scan_out = self.scan_out.as_mut().ok_or(DisplayError::NotInitialized)?;
        scan_out.refresh().map_err(|e| {
            error!("scan-out refresh failed: {:?}", e);
            DisplayError::ScanOut
        })
    }

    /// Flush whatever `DrawTarget` calls touched since the last flush.
    pub fn flush_dirty(&mut self) -> Result<bool, DisplayError> {
        match self.dirty {
            Some(area) => {
                self.flush(area)?;
                self.dirty = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mark an area changed after writing through `frame_buffer_mut`.
    pub fn invalidate(&mut self, area: Area) {
        self.dirty = Some(match self.dirty {
            Some(d) => d.union(&area),
            None => area,
        });
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.scan_out.is_some()
    }

    pub fn frame_buffer(&self) -> Option<&[u16]> {
        self.scan_out.as_ref().map(|so| so.frame())
    }

    pub fn frame_buffer_mut(&mut self) -> Option<&mut [u16]> {
        self.scan_out.as_mut().map(|so| so.frame_mut())
    }

    pub fn frame_region(&self) -> Option<MemoryRegion> {
        self.fb_region
    }

    pub fn dirty_area(&self) -> Option<Area> {
        self.dirty
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }
}

// -------------------- embedded-graphics integration --------------------
impl<BL, SO> OriginDimensions for DisplayService<BL, SO> {
    fn size(&self) -> Size {
        Size::new(
            self.config.timing.h_res as u32,
            self.config.timing.v_res as u32,
        )
    }
}

impl<BL, SO> DrawTarget for DisplayService<BL, SO>
where
    BL: OutputPin,
    SO: ScanOut,
{
    type Color = Rgb565;
    type Error = DisplayError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Rgb565>>,
    {
        let (w, h) = (self.config.timing.h_res, self.config.timing.v_res);
        let fb = self.frame_buffer_mut().ok_or(DisplayError::NotInitialized)?;

        // Track dirty rectangle
        let mut touched: Option<Area> = None;
        for Pixel(p, c) in pixels {
            if p.x < 0 || p.y < 0 {
                continue;
            }
            let (x, y) = (p.x as u16, p.y as u16);
            if x >= w || y >= h {
                continue;
            }
            fb[y as usize * w as usize + x as usize] = c.into_storage();
            let px = Area::point(x, y);
            touched = Some(touched.map_or(px, |t| t.union(&px)));
        }

        if let Some(area) = touched {
            self.invalidate(area);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Rgb565) -> Result<(), Self::Error> {
        let (w, h) = (self.config.timing.h_res, self.config.timing.v_res);
        let bounds = Rectangle::new(Point::zero(), Size::new(w as u32, h as u32));
        let clip = area.intersection(&bounds);
        let Some(br) = clip.bottom_right() else {
            return Ok(());
        };
        let fb = self.frame_buffer_mut().ok_or(DisplayError::NotInitialized)?;

        let raw = color.into_storage();
        let (x0, y0) = (clip.top_left.x as usize, clip.top_left.y as usize);
        let (x1, y1) = (br.x as usize, br.y as usize);
        for row in fb.chunks_exact_mut(w as usize).skip(y0).take(y1 - y0 + 1) {
            row[x0..=x1].fill(raw);
        }

        self.invalidate(Area::new(x0 as u16, y0 as u16, x1 as u16, y1 as u16));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_graphics::primitives::PrimitiveStyle;
    use std::boxed::Box;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec;
    use std::vec::Vec;

    #[derive(Default, Clone)]
    struct Log(Rc<RefCell<Vec<&'static str>>>);

    impl Log {
        fn push(&self, s: &'static str) {
            self.0.borrow_mut().push(s);
        }
        fn take(&self) -> Vec<&'static str> {
            core::mem::take(&mut *self.0.borrow_mut())
        }
    }

    struct MockPin {
        high: Option<bool>,
        log: Log,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = Some(false);
            self.log.push("bl_off");
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = Some(true);
            self.log.push("bl_on");
            Ok(())
        }
    }

    struct MockPanel {
        fail: bool,
        log: Log,
    }

    impl PanelInit for MockPanel {
        type Error = &'static str;
        fn init(&mut self) -> Result<(), Self::Error> {
            self.log.push("panel");
            if self.fail {
                Err("no panel")
            } else {
                Ok(())
            }
        }
    }

    type Blit = (u16, u16, u16, u16);

    struct MockScanOut {
        frame: &'static mut [u16],
        blits: Rc<RefCell<Vec<Blit>>>,
    }

    impl ScanOut for MockScanOut {
        type Error = ();
        fn frame(&self) -> &[u16] {
            &*self.frame
        }
        fn frame_mut(&mut self) -> &mut [u16] {
            &mut *self.frame
        }
        fn draw_bitmap(
            &mut self,
            x_start: u16,
            y_start: u16,
            x_end: u16,
            y_end: u16,
        ) -> Result<(), ()> {
            self.blits
                .borrow_mut()
                .push((x_start, y_start, x_end, y_end));
            Ok(())
        }
    }

    struct MockVideo {
        fail: bool,
        log: Log,
        blits: Rc<RefCell<Vec<Blit>>>,
    }

    impl VideoGenerator for MockVideo {
        type ScanOut = MockScanOut;
        type Error = &'static str;
        fn start(
            self,
            timing: &PanelTiming,
            frame: &'static mut [u16],
        ) -> Result<MockScanOut, Self::Error> {
            self.log.push("video");
            assert_eq!((timing.h_res, timing.v_res), (480, 480));
            assert_eq!(frame.len(), timing.pixels());
            if self.fail {
                return Err("LCD_CAM busy");
            }
            Ok(MockScanOut {
                frame,
                blits: self.blits,
            })
        }
    }

    #[derive(Default)]
    struct MockMemory {
        no_external: bool,
        no_internal: bool,
        requests: Vec<(MemoryRegion, usize)>,
        granted: usize,
        last_grant: Option<*const u16>,
    }

    impl FrameAllocator for MockMemory {
        fn allocate(&mut self, region: MemoryRegion, pixels: usize) -> Option<&'static mut [u16]> {
            self.requests.push((region, pixels));
            let refuse = match region {
                MemoryRegion::External => self.no_external,
                MemoryRegion::Internal => self.no_internal,
            };
            if refuse {
                return None;
            }
            self.granted += 1;
            let fb = Box::leak(vec![0xFFFFu16; pixels].into_boxed_slice());
            self.last_grant = Some(fb.as_ptr());
            Some(fb)
        }
    }

    struct MockTicker {
        period: Option<u32>,
    }

    impl TickSource for MockTicker {
        type Error = ();
        fn start_periodic(&mut self, period_ms: u32) -> Result<(), ()> {
            self.period = Some(period_ms);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MsDelay(Vec<u32>);

    impl DelayNs for MsDelay {
        fn delay_ns(&mut self, _ns: u32) {}
        fn delay_ms(&mut self, ms: u32) {
            self.0.push(ms);
        }
    }

    struct Rig {
        log: Log,
        blits: Rc<RefCell<Vec<Blit>>>,
        panel: MockPanel,
        memory: MockMemory,
        ticker: MockTicker,
        delay: MsDelay,
        display: DisplayService<MockPin, MockScanOut>,
    }

    impl Rig {
        fn new() -> Self {
            let log = Log::default();
            Self {
                panel: MockPanel {
                    fail: false,
                    log: log.clone(),
                },
                memory: MockMemory::default(),
                ticker: MockTicker { period: None },
                delay: MsDelay::default(),
                blits: Rc::new(RefCell::new(Vec::new())),
                display: DisplayService::new(
                    DisplayConfig::BOARD,
                    MockPin {
                        high: None,
                        log: log.clone(),
                    },
                ),
                log,
            }
        }

        fn video(&self, fail: bool) -> MockVideo {
            MockVideo {
                fail,
                log: self.log.clone(),
                blits: self.blits.clone(),
            }
        }

        fn init(&mut self, video_fails: bool) -> Result<(), DisplayError> {
            let video = self.video(video_fails);
            self.display.init(
                &mut self.panel,
                video,
                &mut self.memory,
                &mut self.ticker,
                &mut self.delay,
            )
        }
    }

    #[test]
    fn init_allocates_exactly_one_full_frame() {
        let mut rig = Rig::new();
        rig.init(false).unwrap();

        assert_eq!(rig.memory.granted, 1);
        assert_eq!(rig.memory.requests, [(MemoryRegion::External, 480 * 480)]);
        let fb = rig.display.frame_buffer().unwrap();
        assert_eq!(fb.len() * 2, 480 * 480 * 2);
        assert!(fb.iter().all(|&p| p == 0), "frame starts black");
        assert_eq!(rig.display.frame_region(), Some(MemoryRegion::External));
    }

    #[test]
    fn scan_out_reads_the_allocated_frame() {
        let mut rig = Rig::new();
        rig.memory.no_external = true;
        rig.init(false).unwrap();

        let fb = rig.display.frame_buffer().unwrap();
        assert_eq!(Some(fb.as_ptr()), rig.memory.last_grant);

        Pixel(Point::new(1, 0), Rgb565::BLUE)
            .draw(&mut rig.display)
            .unwrap();
        rig.display.flush_dirty().unwrap();
        // drawn straight into the scanned memory, no second copy
        let scanned = rig.display.scan_out.as_ref().unwrap().frame();
        assert_eq!(scanned[1], Rgb565::BLUE.into_storage());
        assert_eq!(scanned.as_ptr(), rig.memory.last_grant.unwrap());
    }

    #[test]
    fn init_order_backlight_panel_video() {
        let mut rig = Rig::new();
        rig.init(false).unwrap();

        assert_eq!(rig.log.take(), ["bl_on", "panel", "video"]);
        assert_eq!(rig.delay.0, [500, 500]);
        assert_eq!(rig.ticker.period, Some(5));
    }

    #[test]
    fn falls_back_to_internal_ram() {
        let mut rig = Rig::new();
        rig.memory.no_external = true;
        rig.init(false).unwrap();

        assert_eq!(
            rig.memory.requests,
            [
                (MemoryRegion::External, 480 * 480),
                (MemoryRegion::Internal, 480 * 480)
            ]
        );
        assert_eq!(rig.memory.granted, 1);
        assert_eq!(rig.display.frame_region(), Some(MemoryRegion::Internal));
    }

    #[test]
    fn no_memory_is_an_error() {
        let mut rig = Rig::new();
        rig.memory.no_external = true;
        rig.memory.no_internal = true;
        assert_eq!(rig.init(false), Err(DisplayError::OutOfMemory));
        assert!(!rig.display.is_initialized());
        assert_eq!(rig.ticker.period, None);
        // video never started without a frame
        assert_eq!(rig.log.take(), ["bl_on", "panel"]);
    }

    #[test]
    fn video_generator_failure_is_reported() {
        let mut rig = Rig::new();
        assert_eq!(rig.init(true), Err(DisplayError::VideoGenerator));
        assert_eq!(rig.memory.granted, 1);
        assert!(!rig.display.is_initialized());
        assert_eq!(rig.ticker.period, None);
    }

    #[test]
    fn panel_failure_stops_before_video() {
        let mut rig = Rig::new();
        rig.panel.fail = true;
        assert_eq!(rig.init(false), Err(DisplayError::Panel));
        assert_eq!(rig.log.take(), ["bl_on", "panel"]);
    }

    #[test]
    fn second_init_is_rejected() {
        let mut rig = Rig::new();
        rig.init(false).unwrap();
        assert_eq!(rig.init(false), Err(DisplayError::AlreadyInitialized));
        assert_eq!(rig.memory.granted, 1);
    }

    #[test]
    fn brightness_is_noop_before_init() {
        let mut rig = Rig::new();
        rig.display.set_brightness(0).unwrap();
        rig.display.set_brightness(50).unwrap();
        assert!(rig.log.take().is_empty());
    }

    #[test]
    fn brightness_is_binary() {
        let mut rig = Rig::new();
        rig.init(false).unwrap();
        rig.log.take();

        rig.display.set_brightness(0).unwrap();
        rig.display.set_brightness(1).unwrap();
        rig.display.set_brightness(90).unwrap();
        rig.display.set_brightness(100).unwrap();
        assert_eq!(rig.log.take(), ["bl_off", "bl_on", "bl_on", "bl_on"]);
    }

    #[test]
    fn flush_uses_exclusive_end_bounds() {
        let mut rig = Rig::new();
        rig.init(false).unwrap();

        rig.display.flush(Area::new(10, 20, 29, 39)).unwrap();
        rig.display.flush(Area::full(480, 480)).unwrap();
        assert_eq!(
            *rig.blits.borrow(),
            [(10, 20, 30, 40), (0, 0, 480, 480)]
        );
    }

    #[test]
    fn flush_rejects_bad_areas() {
        let mut rig = Rig::new();
        assert_eq!(
            rig.display.flush(Area::new(0, 0, 1, 1)),
            Err(DisplayError::NotInitialized)
        );
        rig.init(false).unwrap();
        assert_eq!(
            rig.display.flush(Area::new(0, 0, 480, 10)),
            Err(DisplayError::OutOfBounds)
        );
        assert_eq!(
            rig.display.flush(Area::new(5, 0, 4, 10)),
            Err(DisplayError::OutOfBounds)
        );
        assert!(rig.blits.borrow().is_empty());
    }

    #[test]
    fn drawing_tracks_dirty_area() {
        let mut rig = Rig::new();
        rig.init(false).unwrap();

        Pixel(Point::new(3, 4), Rgb565::RED)
            .draw(&mut rig.display)
            .unwrap();
        Pixel(Point::new(100, 2), Rgb565::GREEN)
            .draw(&mut rig.display)
            .unwrap();
        // off-screen pixels are dropped
        Pixel(Point::new(-1, 600), Rgb565::BLUE)
            .draw(&mut rig.display)
            .unwrap();

        assert_eq!(rig.display.dirty_area(), Some(Area::new(3, 2, 100, 4)));
        let fb = rig.display.frame_buffer().unwrap();
        assert_eq!(fb[4 * 480 + 3], Rgb565::RED.into_storage());

        assert!(rig.display.flush_dirty().unwrap());
        assert_eq!(*rig.blits.borrow(), [(3, 2, 101, 5)]);
        assert!(!rig.display.flush_dirty().unwrap());
    }

    #[test]
    fn fill_solid_is_clipped() {
        let mut rig = Rig::new();
        rig.init(false).unwrap();

        Rectangle::new(Point::new(470, 470), Size::new(20, 20))
            .into_styled(PrimitiveStyle::with_fill(Rgb565::WHITE))
            .draw(&mut rig.display)
            .unwrap();

        assert_eq!(rig.display.dirty_area(), Some(Area::new(470, 470, 479, 479)));
        let fb = rig.display.frame_buffer().unwrap();
        assert_eq!(fb[479 * 480 + 479], 0xFFFF);
        assert_eq!(fb[469 * 480 + 479], 0);
    }

    #[test]
    fn area_sizes_never_underflow() {
        assert_eq!(Area::full(480, 480), Area::new(0, 0, 479, 479));
        assert_eq!(Area::full(0, 0), Area::point(0, 0));
        assert_eq!(Area::new(10, 10, 19, 14).width(), 10);
        assert_eq!(Area::new(10, 10, 19, 14).height(), 5);
        assert_eq!(Area::new(5, 5, 4, 2).width(), 0);
        assert_eq!(Area::new(5, 5, 4, 2).height(), 0);
        assert_eq!(Area::new(0, 0, u16::MAX, u16::MAX).width(), u16::MAX);
    }

    #[test]
    fn drawing_before_init_fails() {
        let mut rig = Rig::new();
        assert_eq!(
            Pixel(Point::new(0, 0), Rgb565::RED).draw(&mut rig.display),
            Err(DisplayError::NotInitialized)
        );
    }
}
