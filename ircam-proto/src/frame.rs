//! Position report layout and unpacking.
//!
//! Every coordinate is 10 bits wide: a low byte plus two high bits that
//! share a packed byte with other fields.
//!
//! ```text
//! basic    [hdr][x1 y1 hi x2 y2][x3 y3 hi x4 y4]      hi = y1:2 x1:2 y2:2 x2:2
//! extended [hdr][x y hs][x y hs][x y hs][x y hs]       hs = y:2 x:2 size:4
//! ```

use core::ops::{BitAnd, BitOr, BitOrAssign};

use crate::registers::DataFormat;

/// Number of blob slots the camera reports.
pub const MARKER_COUNT: usize = 4;

/// Largest valid X coordinate.
pub const MAX_X: u16 = 1023;

/// Largest valid Y coordinate; anything above marks an empty slot.
pub const MAX_Y: u16 = 767;

/// Basic report length, header included.
pub const BASIC_FRAME_LEN: usize = 11;

/// Extended report length, header included.
pub const EXTENDED_FRAME_LEN: usize = 13;

/// Size of a buffer that can hold either report.
pub const MAX_FRAME_LEN: usize = EXTENDED_FRAME_LEN;

/// Blob size reported for an empty slot, and used for basic reports.
pub const EMPTY_BLOB_SIZE: u8 = 0x0F;

/// Receive buffer for one position report.
pub type PositionBuffer = [u8; MAX_FRAME_LEN];

/// Bit mask of slots that hold a real blob. Bit `i` is slot `i`.
///
/// # Example
///
/// ```
/// use ircam_proto::SeenMask;
///
/// let mask = SeenMask::slot(0) | SeenMask::slot(2);
/// assert!(mask.is_seen(2));
/// assert!(!mask.is_seen(1));
/// assert_eq!(mask.count(), 2);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SeenMask(pub u8);

impl SeenMask {
    /// No slot seen.
    pub const NONE: Self = Self(0);

    /// All four slots seen.
    pub const ALL: Self = Self(0x0F);

    /// Mask with only `slot` set.
    #[inline]
    #[must_use]
    pub const fn slot(slot: usize) -> Self {
        Self(1 << slot)
    }

    /// Whether `slot` holds a blob.
    #[inline]
    #[must_use]
    pub const fn is_seen(self, slot: usize) -> bool {
        self.0 & (1 << slot) != 0
    }

    /// Set or clear `slot`.
    #[inline]
    pub fn set(&mut self, slot: usize, seen: bool) {
        if seen {
            self.0 |= 1 << slot;
        } else {
            self.0 &= !(1 << slot);
        }
    }

    /// Number of slots seen.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        (self.0 & Self::ALL.0).count_ones()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & Self::ALL.0 == 0
    }

    /// True when every slot is seen.
    #[inline]
    #[must_use]
    pub const fn is_all(self) -> bool {
        self.0 & Self::ALL.0 == Self::ALL.0
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl BitOr for SeenMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SeenMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SeenMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

/// A point in camera pixels: X in `0..=1023`, Y in `0..=767`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CameraPoint {
    pub x: u16,
    pub y: u16,
}

impl CameraPoint {
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Whether this decodes to a real blob rather than the empty marker.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.y <= MAX_Y
    }
}

/// One decoded position report.
///
/// Coordinates are decoded for every slot, so empty slots keep whatever the
/// sensor put there (normally all ones). `seen` tells which are real.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawMarkerFrame {
    pub points: [CameraPoint; MARKER_COUNT],
    /// Blob sizes (extended format only, [`EMPTY_BLOB_SIZE`] otherwise).
    pub sizes: [u8; MARKER_COUNT],
    pub seen: SeenMask,
}

impl RawMarkerFrame {
    /// A frame with nothing seen.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            points: [CameraPoint::new(MAX_X, MAX_X); MARKER_COUNT],
            sizes: [EMPTY_BLOB_SIZE; MARKER_COUNT],
            seen: SeenMask::NONE,
        }
    }

    /// Build a frame from decoded points, deriving the seen mask.
    #[must_use]
    pub fn from_points(points: [CameraPoint; MARKER_COUNT], sizes: [u8; MARKER_COUNT]) -> Self {
        let mut seen = SeenMask::NONE;
        for (slot, point) in points.iter().enumerate() {
            seen.set(slot, point.is_valid());
        }
        Self {
            points,
            sizes,
            seen,
        }
    }

    /// The point in `slot`, if the camera saw a blob there.
    #[inline]
    #[must_use]
    pub fn sample(&self, slot: usize) -> Option<CameraPoint> {
        self.seen.is_seen(slot).then(|| self.points[slot])
    }

    /// Iterate over `(slot, point)` for every seen slot.
    pub fn visible(&self) -> impl Iterator<Item = (usize, CameraPoint)> + '_ {
        (0..MARKER_COUNT).filter_map(|slot| self.sample(slot).map(|p| (slot, p)))
    }
}

impl Default for RawMarkerFrame {
    fn default() -> Self {
        Self::empty()
    }
}

/// Error unpacking a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Buffer shorter than the report length for the format.
    Length { expected: usize, got: usize },
}

#[inline]
fn join(low: u8, high: u8, mask: u8, shift: u32) -> u16 {
    u16::from(low) | (u16::from(high & mask) << shift)
}

/// Unpack a basic report (11 bytes).
#[must_use]
pub fn unpack_basic(data: &[u8; BASIC_FRAME_LEN]) -> RawMarkerFrame {
    let mut points = [CameraPoint::default(); MARKER_COUNT];
    for (block, pair) in data[1..].chunks_exact(5).zip(points.chunks_exact_mut(2)) {
        let high = block[2];
        pair[0] = CameraPoint::new(join(block[0], high, 0x30, 4), join(block[1], high, 0xC0, 2));
        pair[1] = CameraPoint::new(join(block[3], high, 0x03, 8), join(block[4], high, 0x0C, 6));
    }
    RawMarkerFrame::from_points(points, [EMPTY_BLOB_SIZE; MARKER_COUNT])
}

/// Unpack an extended report (13 bytes).
#[must_use]
pub fn unpack_extended(data: &[u8; EXTENDED_FRAME_LEN]) -> RawMarkerFrame {
    let mut points = [CameraPoint::default(); MARKER_COUNT];
    let mut sizes = [EMPTY_BLOB_SIZE; MARKER_COUNT];
    for (slot, block) in data[1..].chunks_exact(3).enumerate() {
        let packed = block[2];
        points[slot] = CameraPoint::new(join(block[0], packed, 0x30, 4), join(block[1], packed, 0xC0, 2));
        sizes[slot] = packed & 0x0F;
    }
    RawMarkerFrame::from_points(points, sizes)
}

/// Unpack a report in `format` from the front of `data`.
pub fn unpack(format: DataFormat, data: &[u8]) -> Result<RawMarkerFrame, FrameError> {
    let expected = format.frame_len();
    let report = data.get(..expected).ok_or(FrameError::Length {
        expected,
        got: data.len(),
    })?;
    Ok(match format {
        DataFormat::Basic => {
            let mut buf = [0u8; BASIC_FRAME_LEN];
            buf.copy_from_slice(report);
            unpack_basic(&buf)
        }
        DataFormat::Extended => {
            let mut buf = [0u8; EXTENDED_FRAME_LEN];
            buf.copy_from_slice(report);
            unpack_extended(&buf)
        }
    })
}

/// Compare two reports of `len` bytes, ignoring the header byte.
///
/// Identical payloads from back-to-back reads mean the sensor did not
/// refresh its registers in the middle of a transfer.
#[inline]
#[must_use]
pub fn payloads_match(a: &[u8], b: &[u8], len: usize) -> bool {
    match (a.get(1..len), b.get(1..len)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lo(v: u16) -> u8 {
        (v & 0xFF) as u8
    }

    fn hi(v: u16) -> u8 {
        (v >> 8) as u8 & 0x03
    }

    fn basic_report(points: [(u16, u16); 4]) -> [u8; BASIC_FRAME_LEN] {
        let mut data = [0u8; BASIC_FRAME_LEN];
        for (block, pair) in data[1..].chunks_exact_mut(5).zip(points.chunks_exact(2)) {
            let (x1, y1) = pair[0];
            let (x2, y2) = pair[1];
            block[0] = lo(x1);
            block[1] = lo(y1);
            block[2] = (hi(y1) << 6) | (hi(x1) << 4) | (hi(y2) << 2) | hi(x2);
            block[3] = lo(x2);
            block[4] = lo(y2);
        }
        data
    }

    #[test]
    fn test_unpack_basic_all_seen() {
        let data = basic_report([(512, 0), (1023, 384), (512, 767), (0, 384)]);
        let frame = unpack_basic(&data);
        assert_eq!(frame.seen, SeenMask::ALL);
        assert_eq!(frame.points[0], CameraPoint::new(512, 0));
        assert_eq!(frame.points[1], CameraPoint::new(1023, 384));
        assert_eq!(frame.points[2], CameraPoint::new(512, 767));
        assert_eq!(frame.points[3], CameraPoint::new(0, 384));
        assert_eq!(frame.sizes, [EMPTY_BLOB_SIZE; 4]);
    }

    #[test]
    fn test_unpack_basic_empty_slot_is_unseen() {
        let data = basic_report([(100, 200), (1023, 1023), (300, 400), (1023, 1023)]);
        let frame = unpack_basic(&data);
        assert_eq!(frame.seen, SeenMask::slot(0) | SeenMask::slot(2));
        assert_eq!(frame.sample(1), None);
        assert_eq!(frame.sample(2), Some(CameraPoint::new(300, 400)));
        // Raw coordinates are still decoded for analysis.
        assert_eq!(frame.points[1], CameraPoint::new(1023, 1023));
    }

    #[test]
    fn test_unpack_basic_known_bytes() {
        // x1 = 0x2AB, y1 = 0x1CD, x2 = 0x3EF, y2 = 0x012
        let data = [0x00, 0xAB, 0xCD, 0b01_10_00_11, 0xEF, 0x12, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let frame = unpack_basic(&data);
        assert_eq!(frame.points[0], CameraPoint::new(0x2AB, 0x1CD));
        assert_eq!(frame.points[1], CameraPoint::new(0x3EF, 0x012));
        assert_eq!(frame.seen, SeenMask::slot(0) | SeenMask::slot(1));
    }

    #[test]
    fn test_unpack_extended_sizes() {
        let mut data = [0xFFu8; EXTENDED_FRAME_LEN];
        data[0] = 0;
        // slot 0: x = 0x155, y = 0x2AA, size 3
        data[1] = 0x55;
        data[2] = 0xAA;
        data[3] = 0b10_01_0011;
        let frame = unpack_extended(&data);
        assert_eq!(frame.points[0], CameraPoint::new(0x155, 0x2AA));
        assert_eq!(frame.sizes[0], 3);
        assert_eq!(frame.sizes[1], EMPTY_BLOB_SIZE);
        assert_eq!(frame.seen, SeenMask::slot(0));
    }

    #[test]
    fn test_unpack_rejects_short_buffer() {
        let data = [0u8; 9];
        assert_eq!(
            unpack(DataFormat::Basic, &data),
            Err(FrameError::Length { expected: 11, got: 9 })
        );
    }

    #[test]
    fn test_unpack_dispatches_on_format() {
        let mut buf = [0u8; MAX_FRAME_LEN];
        buf[..BASIC_FRAME_LEN].copy_from_slice(&basic_report([(1, 2), (3, 4), (5, 6), (7, 8)]));
        let frame = unpack(DataFormat::Basic, &buf).unwrap();
        assert_eq!(frame.points[3], CameraPoint::new(7, 8));
    }

    #[test]
    fn test_payloads_match_ignores_header() {
        let a = basic_report([(1, 2), (3, 4), (5, 6), (7, 8)]);
        let mut b = a;
        b[0] = 0x55;
        assert!(payloads_match(&a, &b, BASIC_FRAME_LEN));
        b[6] ^= 1;
        assert!(!payloads_match(&a, &b, BASIC_FRAME_LEN));
    }

    #[test]
    fn test_seen_mask_ops() {
        let mut mask = SeenMask::NONE;
        assert!(mask.is_empty());
        mask.set(3, true);
        mask |= SeenMask::slot(1);
        assert_eq!(mask.count(), 2);
        assert!(!mask.is_all());
        mask.set(3, false);
        assert_eq!(mask, SeenMask::slot(1));
        assert!((SeenMask::ALL & SeenMask::slot(2)).is_seen(2));
    }
}
