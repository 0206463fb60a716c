#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod display;
pub mod gt911;
pub mod input;
pub mod st7701;
pub mod tick;

#[cfg(feature = "esp32s3")]
pub mod board;
#[cfg(feature = "esp32s3")]
pub mod wiring;
