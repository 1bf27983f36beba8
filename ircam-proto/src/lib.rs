//! Wire protocol of the IR positioning camera used by the light gun.
//!
//! The camera (the Wiimote sensor, sold by DFRobot as a positioning camera)
//! tracks up to four infrared blobs and reports their positions over I2C.
//! This crate knows nothing about the bus itself, it only describes what
//! goes over it:
//!
//! - [`registers`]: address, register map, [`DataFormat`], [`Sensitivity`]
//!   and the power-up [`init_sequence`]
//! - [`frame`]: report layout, [`unpack`] into a [`RawMarkerFrame`] and the
//!   [`SeenMask`] of slots holding a real blob
//!
//! # Reading positions
//!
//! Write [`REG_POSITION`] to select the report, then read
//! [`DataFormat::frame_len`] bytes:
//!
//! ```
//! use ircam_proto::{unpack, DataFormat, SeenMask};
//!
//! // A basic report with nothing seen: every coordinate reads as 1023.
//! let mut report = [0xFFu8; 11];
//! report[0] = 0x00;
//! let frame = unpack(DataFormat::Basic, &report).unwrap();
//! assert_eq!(frame.seen, SeenMask::NONE);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod frame;
pub mod registers;

pub use frame::{
    payloads_match, unpack, unpack_basic, unpack_extended, CameraPoint, FrameError,
    PositionBuffer, RawMarkerFrame, SeenMask, BASIC_FRAME_LEN, EMPTY_BLOB_SIZE,
    EXTENDED_FRAME_LEN, MARKER_COUNT, MAX_FRAME_LEN, MAX_X, MAX_Y,
};
pub use registers::{
    format_select, init_sequence, DataFormat, RegisterWrite, Sensitivity, CAMERA_ADDRESS,
    CONTROL_CONFIGURE, CONTROL_RUN, INIT_SEQUENCE_LEN, REGISTER_SETTLE_MS, REG_CONTROL,
    REG_FORMAT, REG_POSITION, REG_SENSITIVITY, STARTUP_SETTLE_MS,
};

/// Camera horizontal resolution in pixels.
pub const CAMERA_RES_X: u16 = 1024;

/// Camera vertical resolution in pixels.
pub const CAMERA_RES_Y: u16 = 768;
