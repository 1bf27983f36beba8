//! Frame source trait and acquisition error types.

use core::future::Future;
use ircam_proto::{FrameError, RawMarkerFrame};

use crate::link::LinkError;

/// Error type for position reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError {
    /// The bus failed or returned the wrong number of bytes.
    Iic,
    /// No two consecutive reads agreed within the retry budget.
    DataMismatch,
}

impl From<LinkError> for ReadError {
    fn from(err: LinkError) -> Self {
        warn!("camera link error: {:?}", err);
        ReadError::Iic
    }
}

impl From<FrameError> for ReadError {
    fn from(_: FrameError) -> Self {
        ReadError::Iic
    }
}

/// A successfully acquired frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Acquired {
    /// Two consecutive reads matched byte for byte.
    Consistent(RawMarkerFrame),
    /// Retries ran out; this is the most recent read, accepted anyway.
    Mismatched(RawMarkerFrame),
}

impl Acquired {
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> &RawMarkerFrame {
        match self {
            Acquired::Consistent(f) | Acquired::Mismatched(f) => f,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        matches!(self, Acquired::Consistent(_))
    }
}

/// Async trait for marker frame sources.
///
/// Implemented by the camera driver directly and by the firmware's
/// channel receiver, so tracking can run in its own task.
pub trait FrameSource {
    /// Wait for and receive the next frame.
    fn receive(&mut self) -> impl Future<Output = Result<Acquired, ReadError>>;

    /// Check if the source is connected/ready.
    fn is_connected(&self) -> bool;
}
