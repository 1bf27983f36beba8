//! LightgunBridge: one tick from camera frame to published aim.

use crate::input::{FrameSource, ReadError};
use crate::output::{AimSink, AimState, OutputError};
use crate::perspective::{Calibration, PerspectiveError};
use crate::tracker::{QuadTracker, TrackStatus, TrackerConfig};
use crate::types::{Point, RoleMap, ScreenPoint, AIM_RES_X, AIM_RES_Y};

/// Bridge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    /// Camera-space point projected onto the screen, in precision units.
    pub aim_point: Point,
}

/// Aim through the optical centre of the camera.
pub const DEFAULT_BRIDGE_CONFIG: BridgeConfig = BridgeConfig {
    aim_point: Point::new(AIM_RES_X / 2, AIM_RES_Y / 2),
};

impl Default for BridgeConfig {
    fn default() -> Self {
        DEFAULT_BRIDGE_CONFIG
    }
}

/// Drives frames from a source through the tracker and the perspective
/// mapper into a sink.
///
/// The tracker is owned here and fed strictly in the order frames arrive.
///
/// # Error Handling
///
/// Every error skips the tick: nothing is sent and [`last_aim`](Self::last_aim)
/// keeps the previous value.
pub struct LightgunBridge<S, K> {
    source: S,
    sink: K,
    tracker: QuadTracker,
    calibration: Calibration,
    config: BridgeConfig,
    last_aim: Option<AimState>,
}

impl<S: FrameSource, K: AimSink> LightgunBridge<S, K> {
    pub fn new(
        source: S,
        sink: K,
        tracker: TrackerConfig,
        calibration: Calibration,
        config: BridgeConfig,
    ) -> Self {
        Self {
            source,
            sink,
            tracker: QuadTracker::new(tracker),
            calibration,
            config,
            last_aim: None,
        }
    }

    /// Run the bridge indefinitely.
    pub async fn run(&mut self) -> ! {
        loop {
            let _ = self.process_one().await;
        }
    }

    /// Process a single frame.
    ///
    /// Returns the tracker status; nothing is published unless it is
    /// [`TrackStatus::Tracking`].
    pub async fn process_one(&mut self) -> Result<TrackStatus, BridgeError> {
        let acquired = self.source.receive().await.map_err(BridgeError::Read)?;
        if !acquired.is_consistent() {
            trace!("tracking a mismatched frame");
        }

        let status = self.tracker.update(acquired.frame());
        if !matches!(status, TrackStatus::Tracking { .. }) {
            return Ok(status);
        }

        self.publish(self.tracker.corners()).await?;
        Ok(status)
    }

    /// Map `corners` onto the screen and send the resulting aim.
    async fn publish(&mut self, corners: RoleMap<Point>) -> Result<(), BridgeError> {
        let source = corners.0.map(Point::to_f64);
        let mapped = self
            .calibration
            .map(&source, self.config.aim_point.to_f64())
            .map_err(|e| {
                warn!("degenerate marker quad, holding aim");
                BridgeError::Perspective(e)
            })?;

        let aim = AimState {
            screen: ScreenPoint::from_mapped(mapped),
            corners,
            median: self.tracker.median(),
            width: self.tracker.width(),
            height: self.tracker.height(),
            angle: self.tracker.angle(),
            seen: self.tracker.seen(),
        };
        self.last_aim = Some(aim);
        self.sink.send(&aim).await.map_err(BridgeError::Output)
    }

    /// Replace the screen calibration. Learned tracking state is kept.
    pub fn recalibrate(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    /// Most recently published aim.
    pub fn last_aim(&self) -> Option<&AimState> {
        self.last_aim.as_ref()
    }

    pub fn tracker(&self) -> &QuadTracker {
        &self.tracker
    }

    /// Get a reference to the frame source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the frame source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Get a reference to the aim sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Decompose the bridge into its source and sink.
    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }
}

/// Error type for bridge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// Frame acquisition failed.
    Read(ReadError),
    /// Marker quad could not be mapped.
    Perspective(PerspectiveError),
    /// Output error occurred.
    Output(OutputError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Acquired;
    use crate::tracker::DEFAULT_TRACKER_CONFIG;
    use core::future::Future;
    use core::pin::Pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use ircam_proto::{CameraPoint, RawMarkerFrame, EMPTY_BLOB_SIZE};
    use std::sync::{Arc, Mutex};
    use std::vec;
    use std::vec::Vec;

    const DIAMOND: [(u16, u16); 4] = [(512, 0), (1023, 384), (512, 767), (0, 384)];

    fn frame(mask: u8) -> RawMarkerFrame {
        let points = core::array::from_fn(|slot| {
            if mask & (1 << slot) != 0 {
                CameraPoint::new(DIAMOND[slot].0, DIAMOND[slot].1)
            } else {
                CameraPoint::new(1023, 1023)
            }
        });
        RawMarkerFrame::from_points(points, [EMPTY_BLOB_SIZE; 4])
    }

    // Simple mock frame source
    struct MockSource {
        frames: Vec<Result<Acquired, ReadError>>,
        index: usize,
    }

    impl MockSource {
        fn new(frames: Vec<Result<Acquired, ReadError>>) -> Self {
            Self { frames, index: 0 }
        }
    }

    impl FrameSource for MockSource {
        fn receive(&mut self) -> impl Future<Output = Result<Acquired, ReadError>> {
            let result = if self.index < self.frames.len() {
                let r = self.frames[self.index];
                self.index += 1;
                r
            } else {
                Err(ReadError::Iic)
            };
            core::future::ready(result)
        }

        fn is_connected(&self) -> bool {
            self.index < self.frames.len()
        }
    }

    // Simple mock aim sink
    struct MockSink {
        sent: Arc<Mutex<Vec<AimState>>>,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl AimSink for MockSink {
        fn send(&mut self, state: &AimState) -> impl Future<Output = Result<(), OutputError>> {
            self.sent.lock().unwrap().push(*state);
            core::future::ready(Ok(()))
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    // Helper to run a future to completion (simple blocking executor)
    fn block_on<F: Future>(mut f: F) -> F::Output {
        fn noop_raw_waker() -> RawWaker {
            fn noop(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                noop_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(core::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
        let mut cx = Context::from_waker(&waker);

        // SAFETY: We don't move f after pinning
        let mut f = unsafe { Pin::new_unchecked(&mut f) };

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {
                    panic!("Mock future returned Pending unexpectedly");
                }
            }
        }
    }

    type Sent = Arc<Mutex<Vec<AimState>>>;

    fn bridge(frames: Vec<Result<Acquired, ReadError>>) -> (LightgunBridge<MockSource, MockSink>, Sent) {
        let sink = MockSink::new();
        let sent = sink.sent.clone();
        let bridge = LightgunBridge::new(
            MockSource::new(frames),
            sink,
            DEFAULT_TRACKER_CONFIG,
            Calibration::screen(1920.0, 1080.0).unwrap(),
            DEFAULT_BRIDGE_CONFIG,
        );
        (bridge, sent)
    }

    #[test]
    fn test_bridge_publishes_centre_aim() {
        let (mut bridge, sent) = bridge(vec![Ok(Acquired::Consistent(frame(0x0F)))]);

        let result = block_on(bridge.process_one());
        assert_eq!(result, Ok(TrackStatus::Tracking { ground_truth: true }));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!((sent[0].screen.x - 960).abs() <= 1);
        assert!((sent[0].screen.y - 540).abs() <= 1);
        assert_eq!(sent[0].seen.raw(), 0x0F);
        assert_eq!(bridge.last_aim(), Some(&sent[0]));
    }

    #[test]
    fn test_bridge_waits_for_lock() {
        let (mut bridge, sent) = bridge(vec![Ok(Acquired::Consistent(frame(0b0111)))]);

        let result = block_on(bridge.process_one());
        assert_eq!(result, Ok(TrackStatus::AwaitingLock));
        assert!(sent.lock().unwrap().is_empty());
        assert!(bridge.last_aim().is_none());
    }

    #[test]
    fn test_bridge_keeps_last_aim_on_error() {
        let (mut bridge, sent) = bridge(vec![
            Ok(Acquired::Consistent(frame(0x0F))),
            Err(ReadError::DataMismatch),
        ]);

        block_on(bridge.process_one()).unwrap();
        let before = *bridge.last_aim().unwrap();

        let result = block_on(bridge.process_one());
        assert_eq!(result, Err(BridgeError::Read(ReadError::DataMismatch)));
        assert_eq!(bridge.last_aim(), Some(&before));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_bridge_tracks_mismatched_frames() {
        let (mut bridge, sent) = bridge(vec![
            Ok(Acquired::Consistent(frame(0x0F))),
            Ok(Acquired::Mismatched(frame(0b1101))),
        ]);

        block_on(bridge.process_one()).unwrap();
        let result = block_on(bridge.process_one());
        assert_eq!(result, Ok(TrackStatus::Tracking { ground_truth: false }));
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].seen.raw(), 0b1101);
    }

    #[test]
    fn test_degenerate_quad_keeps_last_aim() {
        let (mut bridge, sent) = bridge(vec![Ok(Acquired::Consistent(frame(0x0F)))]);
        block_on(bridge.process_one()).unwrap();
        let before = *bridge.last_aim().unwrap();

        // All four markers on one line.
        let collinear = RoleMap::new([
            Point::new(400, 400),
            Point::new(800, 800),
            Point::new(1200, 1200),
            Point::new(1600, 1600),
        ]);
        let result = block_on(bridge.publish(collinear));
        assert_eq!(
            result,
            Err(BridgeError::Perspective(PerspectiveError::DegenerateQuad))
        );
        assert_eq!(bridge.last_aim(), Some(&before));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_bridge_frozen_publishes_nothing() {
        let (mut bridge, sent) = bridge(vec![
            Ok(Acquired::Consistent(frame(0x0F))),
            Ok(Acquired::Consistent(frame(0))),
        ]);

        block_on(bridge.process_one()).unwrap();
        let result = block_on(bridge.process_one());
        assert_eq!(result, Ok(TrackStatus::Frozen));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_recalibrate_moves_aim() {
        let (mut bridge, sent) = bridge(vec![
            Ok(Acquired::Consistent(frame(0x0F))),
            Ok(Acquired::Consistent(frame(0x0F))),
        ]);

        block_on(bridge.process_one()).unwrap();
        bridge.recalibrate(Calibration::screen(1280.0, 720.0).unwrap());
        block_on(bridge.process_one()).unwrap();

        let sent = sent.lock().unwrap();
        assert!((sent[1].screen.x - 640).abs() <= 1);
        assert!((sent[1].screen.y - 360).abs() <= 1);
    }
}
