/// Consecutive sightings before a marker's geometry is trusted.
pub const CONFIRMATION_FRAMES: u8 = 5;

/// Run length of consecutive frames in which a marker was seen.
///
/// Any missed frame resets the run, so a marker that flickers never
/// becomes confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Confidence(u8);

impl Confidence {
    pub const NONE: Self = Self(0);

    /// Shift one frame's visibility into the history.
    #[inline]
    pub fn record(&mut self, seen: bool) {
        self.0 = if seen {
            (self.0 + 1).min(CONFIRMATION_FRAMES)
        } else {
            0
        };
    }

    #[inline]
    #[must_use]
    pub const fn streak(self) -> u8 {
        self.0
    }

    /// Seen in each of the last [`CONFIRMATION_FRAMES`] frames.
    #[inline]
    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        self.0 >= CONFIRMATION_FRAMES
    }
}
