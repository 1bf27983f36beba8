//! Aim sink trait and the state it receives.

use core::future::Future;
use ircam_proto::SeenMask;

use crate::types::{Point, RoleMap, ScreenPoint};

/// Error type for output operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputError {
    /// USB/communication I/O error.
    Io,
    /// Device not ready (e.g., USB not enumerated).
    NotReady,
    /// Report dropped (e.g., host not polling fast enough).
    Dropped,
}

/// Everything known about the aim after one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AimState {
    /// Aim point on the calibrated screen.
    pub screen: ScreenPoint,
    /// Reconstructed markers in perimeter order, precision units.
    pub corners: RoleMap<Point>,
    pub median: Point,
    pub width: f32,
    pub height: f32,
    /// Roll in radians.
    pub angle: f32,
    /// Camera slots that held a real blob.
    pub seen: SeenMask,
}

/// Async trait for aim outputs (USB HID pointer, debug log, ...).
pub trait AimSink {
    /// Send an aim update.
    ///
    /// May block until the previous report has been sent.
    fn send(&mut self, state: &AimState) -> impl Future<Output = Result<(), OutputError>>;

    /// Check if the output is ready to accept data.
    fn is_ready(&self) -> bool;
}
