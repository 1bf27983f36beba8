//! IR light gun firmware for RP2040.
//!
//! # Overview
//!
//! The firmware runs on a Raspberry Pi Pico (RP2040) and:
//! 1. Polls the IR positioning camera over I2C with torn-read protection
//! 2. Reconstructs the four screen markers, including occluded ones
//! 3. Projects the camera centre onto the calibrated screen
//! 4. Reports the result as a USB HID absolute pointer
//!
//! # Hardware Configuration
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | I2C0 SDA | 4    | Camera data |
//! | I2C0 SCL | 5    | Camera clock (1 MHz) |
//! | LED      | 25   | On-board LED (read error indicator) |
//!
//! # Architecture
//!
//! Embassy tasks:
//!
//! - **USB Task**: Manages the USB device stack
//! - **Camera Task**: Atomic reads on a fixed tick, queued in acquisition order
//! - **Tracking Task**: Runs the [`LightgunBridge`] over the queued frames
//! - **Output Task**: Sends the latest aim as a HID report
//!
//! Frames go through a [`Channel`](embassy_sync::channel::Channel) so the
//! tracker sees every frame in order. Aim updates go through a
//! [`Signal`](embassy_sync::signal::Signal): only the most recent matters.
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)
//! - **`layout-diamond`** (default): Markers at the middle of each screen edge
//! - **`layout-square`**: Markers at the screen corners

#![no_std]

#[cfg(all(feature = "layout-diamond", feature = "layout-square"))]
compile_error!("Cannot enable both `layout-diamond` and `layout-square` features - pick one marker layout");

#[cfg(not(any(feature = "layout-diamond", feature = "layout-square")))]
compile_error!("Enable one of the `layout-diamond` or `layout-square` features");

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Cannot enable both `dev-panic` and `prod-panic` features");

// Re-export core types for convenience
pub use lightgun_core::{
    Acquired, AimSink, AimState, BridgeConfig, BridgeError, Calibration, FrameSource, I2cLink,
    Layout, LightgunBridge, OutputError, PositionCamera, ReadError, TrackerConfig,
    DEFAULT_BRIDGE_CONFIG, DEFAULT_CAMERA_CONFIG, DEFAULT_TRACKER_CONFIG,
};

pub mod pipe;
pub mod usb_output;

pub use pipe::{AimSignal, ChannelSource, FrameChannel, SignalSink};
pub use usb_output::{configure_usb_hid, PointerReport, UsbHidOutput};

/// Marker layout selected at build time.
pub const LAYOUT: Layout = if cfg!(feature = "layout-square") {
    Layout::Square
} else {
    Layout::Diamond
};

pub const TRACKER_CONFIG: TrackerConfig = TrackerConfig {
    layout: LAYOUT,
    ..DEFAULT_TRACKER_CONFIG
};

/// Screen size the default calibration maps onto.
pub const SCREEN_WIDTH: u16 = 1920;
pub const SCREEN_HEIGHT: u16 = 1080;
