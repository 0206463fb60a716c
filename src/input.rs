//! Touch input adapter for the renderer.
//!
//! The renderer polls once per refresh for a single pointer. Multi-touch data from the
//! controller is reduced to "pressed at the first point" or "released". Each poll is
//! independent: no debounce, no tracking across frames.

use core::fmt;

use embedded_hal::{delay::DelayNs, i2c::I2c};
use log::trace;

use crate::gt911::{Gt911, Points, TouchError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    Pressed { x: u16, y: u16 },
    Released,
}

impl PointerEvent {
    pub fn is_pressed(&self) -> bool {
        matches!(self, PointerEvent::Pressed { .. })
    }
}

/// Something that yields the current set of touch points.
pub trait PointSource {
    type Error: fmt::Debug;

    fn read_points(&mut self) -> Result<Points, Self::Error>;
}

impl<I2C, D, E> PointSource for Gt911<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    E: fmt::Debug,
{
    type Error = TouchError<E>;

    fn read_points(&mut self) -> Result<Points, Self::Error> {
        Gt911::read_points(self)
    }
}

pub struct TouchInput<S> {
    source: S,
}

impl<S: PointSource> TouchInput<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Current pointer state. Read errors count as "released".
    pub fn read(&mut self) -> PointerEvent {
        match self.source.read_points() {
            Ok(points) => match points.first() {
                Some(p) => PointerEvent::Pressed { x: p.x, y: p.y },
                None => PointerEvent::Released,
            },
            Err(e) => {
                trace!("touch read failed: {:?}", e);
                PointerEvent::Released
            }
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gt911::TouchPoint;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Result<&'static [(u16, u16)], ()>>);

    impl PointSource for Scripted {
        type Error = ();

        fn read_points(&mut self) -> Result<Points, ()> {
            let pts = self.0.pop_front().unwrap_or(Ok(&[]))?;
            let mut out = Points::new();
            for (i, (x, y)) in pts.iter().enumerate() {
                out.push(TouchPoint {
                    track_id: i as u8,
                    x: *x,
                    y: *y,
                    magnitude: 1,
                })
                .unwrap();
            }
            Ok(out)
        }
    }

    fn input(script: &[Result<&'static [(u16, u16)], ()>]) -> TouchInput<Scripted> {
        TouchInput::new(Scripted(script.iter().cloned().collect()))
    }

    #[test]
    fn first_point_wins() {
        let mut ti = input(&[Ok(&[(12, 34), (400, 401)])]);
        assert_eq!(ti.read(), PointerEvent::Pressed { x: 12, y: 34 });
    }

    #[test]
    fn no_points_is_released() {
        let mut ti = input(&[Ok(&[])]);
        assert_eq!(ti.read(), PointerEvent::Released);
    }

    #[test]
    fn error_is_released() {
        let mut ti = input(&[Err(())]);
        assert!(!ti.read().is_pressed());
    }

    #[test]
    fn polls_are_independent() {
        let mut ti = input(&[Ok(&[(1, 1)]), Ok(&[]), Err(()), Ok(&[(5, 6)])]);
        let seen: std::vec::Vec<_> = (0..4).map(|_| ti.read()).collect();
        assert_eq!(
            seen,
            [
                PointerEvent::Pressed { x: 1, y: 1 },
                PointerEvent::Released,
                PointerEvent::Released,
                PointerEvent::Pressed { x: 5, y: 6 },
            ]
        );
    }
}
