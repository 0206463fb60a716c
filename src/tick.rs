//! Renderer clock.
//!
//! A periodic timer interrupt calls [`TickCounter::advance`]; the main loop only reads.
//! The interrupt is the sole writer, so a relaxed atomic is all the sync needed.

use core::sync::atomic::{AtomicU32, Ordering};

/// Monotonic millisecond counter, wraps after ~49 days.
pub struct TickCounter {
    ms: AtomicU32,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ms: AtomicU32::new(0),
        }
    }

    /// Called from the timer context once per period.
    #[inline]
    pub fn advance(&self, period_ms: u32) {
        self.ms.fetch_add(period_ms, Ordering::Relaxed);
    }

    #[inline]
    pub fn now_ms(&self) -> u32 {
        self.ms.load(Ordering::Relaxed)
    }

    /// Milliseconds since `earlier`, wrap-safe.
    #[inline]
    pub fn elapsed_since(&self, earlier: u32) -> u32 {
        self.now_ms().wrapping_sub(earlier)
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// A periodic timer that will call [`TickCounter::advance`] every `period_ms`.
pub trait TickSource {
    type Error: core::fmt::Debug;

    fn start_periodic(&mut self, period_ms: u32) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_by_period() {
        let t = TickCounter::new();
        t.advance(5);
        t.advance(5);
        assert_eq!(t.now_ms(), 10);
    }

    #[test]
    fn elapsed_survives_wrap() {
        let t = TickCounter::new();
        t.advance(u32::MAX - 2);
        let start = t.now_ms();
        t.advance(5);
        assert_eq!(t.now_ms(), 2);
        assert_eq!(t.elapsed_since(start), 5);
    }
}
