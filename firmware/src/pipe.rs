//! Inter-task plumbing: the in-order frame queue and the latest-aim signal.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_sync::signal::Signal;
use lightgun_core::{Acquired, AimSink, AimState, FrameSource, OutputError, ReadError};

/// Frames buffered between the camera and tracking tasks.
pub const FRAME_QUEUE_DEPTH: usize = 4;

/// Acquisition results in the order they were read.
///
/// The camera task blocks when the queue is full rather than dropping,
/// so the tracker never sees a gap or a reordering.
pub type FrameChannel =
    Channel<CriticalSectionRawMutex, Result<Acquired, ReadError>, FRAME_QUEUE_DEPTH>;

/// Latest aim, overwritten by every tracked frame.
pub type AimSignal = Signal<CriticalSectionRawMutex, AimState>;

/// [`FrameSource`] reading the camera task's queue.
pub struct ChannelSource {
    rx: Receiver<'static, CriticalSectionRawMutex, Result<Acquired, ReadError>, FRAME_QUEUE_DEPTH>,
}

impl ChannelSource {
    pub fn new(channel: &'static FrameChannel) -> Self {
        Self {
            rx: channel.receiver(),
        }
    }
}

impl FrameSource for ChannelSource {
    async fn receive(&mut self) -> Result<Acquired, ReadError> {
        self.rx.receive().await
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// [`AimSink`] publishing to the output task.
pub struct SignalSink {
    signal: &'static AimSignal,
}

impl SignalSink {
    pub fn new(signal: &'static AimSignal) -> Self {
        Self { signal }
    }
}

impl AimSink for SignalSink {
    async fn send(&mut self, state: &AimState) -> Result<(), OutputError> {
        self.signal.signal(*state);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }
}
