//! Platform-agnostic light gun core: camera acquisition, marker tracking
//! and screen mapping.
//!
//! Nothing here touches a specific MCU. The firmware crate wires these
//! pieces to the RP2040 I2C peripheral and USB; host tests drive them with
//! scripted links and frames.
//!
//! # Overview
//!
//! - [`link`]: two-wire transport trait ([`SensorLink`]) and the
//!   `embedded-hal` adapter ([`I2cLink`])
//! - [`camera`]: camera driver with double-buffered atomic reads
//!   ([`PositionCamera`], [`RetryPolicy`])
//! - [`tracker`]: occlusion-tolerant reconstruction of the four markers
//!   ([`QuadTracker`], [`Layout`])
//! - [`perspective`]: quad-to-rectangle mapping ([`Calibration`])
//! - [`input`] / [`output`]: async traits for frame sources and aim sinks
//! - [`bridge`]: acquisition to tracking to mapping to output ([`LightgunBridge`])
//!
//! # Coordinates
//!
//! Camera pixels are 0..1023 by 0..767 with Y pointing down. The tracker
//! works in precision units, camera pixels shifted left by
//! [`PRECISION_SHIFT`], so synthesized markers keep sub-pixel accuracy.
//!
//! # Example
//!
//! ```rust
//! use ircam_proto::{CameraPoint, RawMarkerFrame, EMPTY_BLOB_SIZE};
//! use lightgun_core::{QuadTracker, Role, DEFAULT_TRACKER_CONFIG};
//!
//! let mut tracker = QuadTracker::new(DEFAULT_TRACKER_CONFIG);
//! let frame = RawMarkerFrame::from_points([
//!     CameraPoint::new(512, 100),
//!     CameraPoint::new(900, 384),
//!     CameraPoint::new(512, 668),
//!     CameraPoint::new(124, 384),
//! ], [EMPTY_BLOB_SIZE; 4]);
//! tracker.update(&frame);
//! assert_eq!(tracker.final_position(Role::North).x, 512 * 4);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting and logging (for embedded targets)
//! - **`log`**: Route diagnostics through the `log` facade instead
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod bridge;
pub mod camera;
pub mod input;
pub mod link;
pub mod output;
pub mod perspective;
pub mod tracker;
pub mod types;

pub use bridge::{BridgeConfig, BridgeError, LightgunBridge, DEFAULT_BRIDGE_CONFIG};
pub use camera::{
    request, CameraConfig, PositionCamera, Retries, RetryPolicy, DEFAULT_CAMERA_CONFIG,
};
pub use input::{Acquired, FrameSource, ReadError};
pub use link::{I2cLink, LinkError, SensorLink};
pub use output::{AimSink, AimState, OutputError};
pub use perspective::{Calibration, Homography, PerspectiveError};
pub use tracker::{
    Confidence, GeometryModel, Layout, QuadTracker, Tilt, TrackStatus, TrackerConfig,
    CONFIRMATION_FRAMES, DEFAULT_TRACKER_CONFIG,
};
pub use types::{
    Point, PointF, Role, RoleMap, ScreenPoint, AIM_RES_X, AIM_RES_Y, PRECISION_SCALE, PRECISION_SHIFT,
};

// Re-export the wire types callers need alongside the core.
pub use ircam_proto::{
    CameraPoint, DataFormat, RawMarkerFrame, SeenMask, Sensitivity, CAMERA_ADDRESS,
};
