//! IR positioning camera driver.
//!
//! The sensor refreshes its report registers asynchronously to the bus, so
//! a single block read can mix two sensor frames. [`PositionCamera::atomic_read`]
//! reads into two alternating buffers and only trusts a report once two
//! consecutive reads agree.

use embedded_hal::delay::DelayNs;
use ircam_proto::{
    format_select, init_sequence, payloads_match, unpack, DataFormat, PositionBuffer,
    RawMarkerFrame, RegisterWrite, Sensitivity, MAX_FRAME_LEN, REGISTER_SETTLE_MS,
    REG_POSITION, STARTUP_SETTLE_MS,
};

use crate::input::{Acquired, FrameSource, ReadError};
use crate::link::{LinkError, SensorLink};

/// Extra reads allowed after the first comparison fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Retries {
    None,
    #[default]
    Once,
    Twice,
}

impl Retries {
    #[inline]
    #[must_use]
    pub const fn count(self) -> u8 {
        match self {
            Retries::None => 0,
            Retries::Once => 1,
            Retries::Twice => 2,
        }
    }
}

/// Retry budget and exhaustion behaviour for [`PositionCamera::atomic_read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    pub retries: Retries,
    /// On exhaustion, return the latest read as [`Acquired::Mismatched`]
    /// instead of failing with [`ReadError::DataMismatch`].
    pub accept_last: bool,
}

impl RetryPolicy {
    pub const NO_RETRY: Self = Self::new(Retries::None, false);
    pub const NO_RETRY_ACCEPT: Self = Self::new(Retries::None, true);
    pub const ONE_RETRY: Self = Self::new(Retries::Once, false);
    pub const ONE_RETRY_ACCEPT: Self = Self::new(Retries::Once, true);
    pub const TWO_RETRIES: Self = Self::new(Retries::Twice, false);
    pub const TWO_RETRIES_ACCEPT: Self = Self::new(Retries::Twice, true);

    #[must_use]
    pub const fn new(retries: Retries, accept_last: bool) -> Self {
        Self {
            retries,
            accept_last,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::ONE_RETRY_ACCEPT
    }
}

/// Camera configuration applied by [`PositionCamera::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CameraConfig {
    pub format: DataFormat,
    pub sensitivity: Sensitivity,
    /// Policy used when the camera acts as a [`FrameSource`].
    pub retry: RetryPolicy,
}

pub const DEFAULT_CAMERA_CONFIG: CameraConfig = CameraConfig {
    format: DataFormat::Basic,
    sensitivity: Sensitivity::Default,
    retry: RetryPolicy::ONE_RETRY_ACCEPT,
};

impl Default for CameraConfig {
    fn default() -> Self {
        DEFAULT_CAMERA_CONFIG
    }
}

/// Read one report in `format` into the front of `buf`.
///
/// Fails with [`ReadError::Iic`] on any link error or when the byte count
/// does not match the format's report length.
pub fn request<L: SensorLink>(
    link: &mut L,
    format: DataFormat,
    buf: &mut [u8],
) -> Result<(), ReadError> {
    let len = format.frame_len();
    let report = buf.get_mut(..len).ok_or(ReadError::Iic)?;
    let received = link.read_block(REG_POSITION, report)?;
    if received != len {
        warn!("short position read: {} of {} bytes", received, len);
        return Err(ReadError::Iic);
    }
    Ok(())
}

/// Driver for the positioning camera on a [`SensorLink`].
pub struct PositionCamera<L> {
    link: L,
    config: CameraConfig,
    buffers: [PositionBuffer; 2],
    connected: bool,
}

impl<L: SensorLink> PositionCamera<L> {
    /// Wrap a link. The sensor is not touched until [`begin`](Self::begin).
    pub fn new(link: L, config: CameraConfig) -> Self {
        Self {
            link,
            config,
            buffers: [[0; MAX_FRAME_LEN]; 2],
            connected: false,
        }
    }

    /// Run the power-up sequence with the configured format and sensitivity.
    pub fn begin<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), LinkError> {
        let sequence = init_sequence(self.config.format, self.config.sensitivity);
        let last = sequence.len() - 1;
        for (i, write) in sequence.into_iter().enumerate() {
            self.link.write(&write.bytes())?;
            delay.delay_ms(if i == last {
                STARTUP_SETTLE_MS
            } else {
                REGISTER_SETTLE_MS
            });
        }
        self.connected = true;
        debug!(
            "camera started: {:?}, {:?}",
            self.config.format, self.config.sensitivity
        );
        Ok(())
    }

    /// Switch the report format.
    pub fn set_format<D: DelayNs>(
        &mut self,
        format: DataFormat,
        delay: &mut D,
    ) -> Result<(), LinkError> {
        self.write_settled(format_select(format), delay)?;
        self.config.format = format;
        Ok(())
    }

    /// Rewrite the sensitivity block.
    pub fn set_sensitivity<D: DelayNs>(
        &mut self,
        sensitivity: Sensitivity,
        delay: &mut D,
    ) -> Result<(), LinkError> {
        for write in sensitivity.register_writes() {
            self.write_settled(write, delay)?;
        }
        self.config.sensitivity = sensitivity;
        Ok(())
    }

    fn write_settled<D: DelayNs>(
        &mut self,
        write: RegisterWrite,
        delay: &mut D,
    ) -> Result<(), LinkError> {
        self.link.write(&write.bytes())?;
        delay.delay_ms(REGISTER_SETTLE_MS);
        Ok(())
    }

    /// Single, unverified read.
    pub fn read(&mut self) -> Result<RawMarkerFrame, ReadError> {
        let format = self.config.format;
        request(&mut self.link, format, &mut self.buffers[0])?;
        Ok(unpack(format, &self.buffers[0])?)
    }

    /// Read until two consecutive reports agree (header byte ignored).
    ///
    /// Makes at most `retries + 2` reads. Each new read goes into the buffer
    /// not holding the previous one. A link failure aborts at once.
    pub fn atomic_read(&mut self, policy: RetryPolicy) -> Result<Acquired, ReadError> {
        let format = self.config.format;
        let len = format.frame_len();

        request(&mut self.link, format, &mut self.buffers[0])?;
        let mut latest = 0;
        for attempt in 0..=policy.retries.count() {
            latest ^= 1;
            request(&mut self.link, format, &mut self.buffers[latest])?;
            if payloads_match(&self.buffers[0], &self.buffers[1], len) {
                return Ok(Acquired::Consistent(unpack(format, &self.buffers[latest])?));
            }
            trace!("position reads disagree (attempt {})", attempt);
        }

        if policy.accept_last {
            debug!("retries exhausted, accepting latest read");
            Ok(Acquired::Mismatched(unpack(format, &self.buffers[latest])?))
        } else {
            Err(ReadError::DataMismatch)
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Change the policy used by [`FrameSource::receive`].
    pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.config.retry = policy;
    }

    /// Get a mutable reference to the link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Release the link.
    pub fn release(self) -> L {
        self.link
    }
}

impl<L: SensorLink> FrameSource for PositionCamera<L> {
    async fn receive(&mut self) -> Result<Acquired, ReadError> {
        self.atomic_read(self.config.retry)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ircam_proto::{CameraPoint, REG_CONTROL, BASIC_FRAME_LEN, EXTENDED_FRAME_LEN};
    use std::collections::VecDeque;
    use std::vec::Vec;

    enum Reply {
        Bytes(Vec<u8>),
        Short(usize),
        Fail(LinkError),
    }

    /// Link that answers block reads from a script and records writes.
    struct ScriptedLink {
        replies: VecDeque<Reply>,
        writes: Vec<Vec<u8>>,
        reads: usize,
    }

    impl ScriptedLink {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: replies.into(),
                writes: Vec::new(),
                reads: 0,
            }
        }
    }

    impl SensorLink for ScriptedLink {
        fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
            self.writes.push(bytes.to_vec());
            Ok(())
        }

        fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, LinkError> {
            assert_eq!(register, REG_POSITION);
            self.reads += 1;
            match self.replies.pop_front().expect("script exhausted") {
                Reply::Bytes(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Reply::Short(n) => Ok(n),
                Reply::Fail(e) => Err(e),
            }
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        total_ms: u32,
        calls: Vec<u32>,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.calls.push(ns / 1_000_000);
            self.total_ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.calls.push(ms);
            self.total_ms += ms;
        }
    }

    /// Basic report with point 0 at (x, y) and the other slots empty.
    fn report(header: u8, x: u16, y: u16) -> Vec<u8> {
        let mut data = std::vec![0xFFu8; BASIC_FRAME_LEN];
        data[0] = header;
        data[1] = (x & 0xFF) as u8;
        data[2] = (y & 0xFF) as u8;
        data[3] = ((((y >> 8) & 3) << 6) | (((x >> 8) & 3) << 4)) as u8 | 0x0F;
        data
    }

    fn camera(replies: Vec<Reply>) -> PositionCamera<ScriptedLink> {
        PositionCamera::new(ScriptedLink::new(replies), DEFAULT_CAMERA_CONFIG)
    }

    #[test]
    fn test_begin_writes_sequence_with_settle_delays() {
        let mut cam = camera(Vec::new());
        let mut delay = RecordingDelay::default();
        cam.begin(&mut delay).unwrap();

        let link = cam.release();
        assert_eq!(link.writes.len(), 6);
        assert_eq!(link.writes[0], [REG_CONTROL, 0x01]);
        assert_eq!(link.writes[1], [0x06, 0x90]);
        assert_eq!(link.writes[4], [0x33, 0x11]);
        assert_eq!(link.writes[5], [REG_CONTROL, 0x08]);
        assert_eq!(delay.calls, [10, 10, 10, 10, 10, 100]);
    }

    #[test]
    fn test_set_format_changes_report_length() {
        let mut cam = camera(std::vec![Reply::Bytes(std::vec![0xFF; 13])]);
        let mut delay = RecordingDelay::default();
        cam.set_format(DataFormat::Extended, &mut delay).unwrap();
        assert_eq!(cam.config().format, DataFormat::Extended);
        let frame = cam.read().unwrap();
        assert!(frame.seen.is_empty());
        assert_eq!(delay.total_ms, 10);
    }

    #[test]
    fn test_matching_reads_are_consistent() {
        let mut cam = camera(std::vec![
            Reply::Bytes(report(0x00, 100, 200)),
            Reply::Bytes(report(0x7F, 100, 200)),
        ]);
        let acquired = cam.atomic_read(RetryPolicy::NO_RETRY).unwrap();
        assert!(acquired.is_consistent());
        assert_eq!(acquired.frame().sample(0), Some(CameraPoint::new(100, 200)));
        assert_eq!(cam.release().reads, 2);
    }

    #[test]
    fn test_mismatch_fails_without_accept() {
        let mut cam = camera(std::vec![
            Reply::Bytes(report(0x00, 100, 200)),
            Reply::Bytes(report(0x00, 101, 200)),
        ]);
        assert_eq!(
            cam.atomic_read(RetryPolicy::NO_RETRY),
            Err(ReadError::DataMismatch)
        );
    }

    #[test]
    fn test_mismatch_accepts_latest_read() {
        let mut cam = camera(std::vec![
            Reply::Bytes(report(0x00, 100, 200)),
            Reply::Bytes(report(0x00, 101, 200)),
        ]);
        let acquired = cam.atomic_read(RetryPolicy::NO_RETRY_ACCEPT).unwrap();
        assert!(!acquired.is_consistent());
        assert_eq!(acquired.frame().sample(0), Some(CameraPoint::new(101, 200)));
    }

    #[test]
    fn test_extended_reports_compare_last_byte() {
        let first = std::vec![0xFFu8; EXTENDED_FRAME_LEN];
        let mut second = first.clone();
        // Only the packed byte of slot 3 differs (blob size 15 -> 14).
        second[12] = 0xFE;

        let config = CameraConfig {
            format: DataFormat::Extended,
            ..DEFAULT_CAMERA_CONFIG
        };
        let mut cam = PositionCamera::new(
            ScriptedLink::new(std::vec![Reply::Bytes(first.clone()), Reply::Bytes(second.clone())]),
            config,
        );
        assert_eq!(
            cam.atomic_read(RetryPolicy::NO_RETRY),
            Err(ReadError::DataMismatch)
        );

        let mut cam = PositionCamera::new(
            ScriptedLink::new(std::vec![Reply::Bytes(second.clone()), Reply::Bytes(second)]),
            config,
        );
        let acquired = cam.atomic_read(RetryPolicy::NO_RETRY).unwrap();
        assert!(acquired.is_consistent());
        assert_eq!(acquired.frame().sizes[3], 14);
    }

    #[test]
    fn test_retry_recovers_from_torn_read() {
        // Second read torn, third agrees with it.
        let mut cam = camera(std::vec![
            Reply::Bytes(report(0x00, 100, 200)),
            Reply::Bytes(report(0x00, 104, 208)),
            Reply::Bytes(report(0x00, 104, 208)),
        ]);
        let acquired = cam.atomic_read(RetryPolicy::ONE_RETRY).unwrap();
        assert!(acquired.is_consistent());
        assert_eq!(acquired.frame().sample(0), Some(CameraPoint::new(104, 208)));
    }

    #[test]
    fn test_retry_budget_bounds_reads() {
        let mut cam = camera(std::vec![
            Reply::Bytes(report(0x00, 1, 1)),
            Reply::Bytes(report(0x00, 2, 2)),
            Reply::Bytes(report(0x00, 3, 3)),
            Reply::Bytes(report(0x00, 4, 4)),
        ]);
        let acquired = cam.atomic_read(RetryPolicy::TWO_RETRIES_ACCEPT).unwrap();
        assert_eq!(acquired.frame().sample(0), Some(CameraPoint::new(4, 4)));
        assert_eq!(cam.release().reads, 4);
    }

    #[test]
    fn test_short_read_is_iic_error() {
        let mut cam = camera(std::vec![
            Reply::Bytes(report(0x00, 100, 200)),
            Reply::Short(7),
        ]);
        assert_eq!(cam.atomic_read(RetryPolicy::TWO_RETRIES), Err(ReadError::Iic));
        assert_eq!(cam.release().reads, 2);
    }

    #[test]
    fn test_link_failure_is_iic_error() {
        let mut cam = camera(std::vec![Reply::Fail(LinkError::Nack)]);
        assert_eq!(cam.read(), Err(ReadError::Iic));
    }
}
