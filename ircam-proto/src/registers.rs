//! Camera register map, data formats and sensitivity tables.
//!
//! Values come from the Wiimote IR camera documentation; the DFRobot
//! positioning camera uses the same sensor.

/// 7-bit I2C address of the camera (0xB0 in 8-bit notation).
pub const CAMERA_ADDRESS: u8 = 0xB0 >> 1;

/// Control register.
pub const REG_CONTROL: u8 = 0x30;

/// Control value that stops the sensor so it can be configured.
pub const CONTROL_CONFIGURE: u8 = 0x01;

/// Control value that starts continuous tracking.
pub const CONTROL_RUN: u8 = 0x08;

/// Data format (mode) register.
pub const REG_FORMAT: u8 = 0x33;

/// First register of the position report; selected before every block read.
pub const REG_POSITION: u8 = 0x36;

/// Sensitivity block registers, written in this order.
pub const REG_SENSITIVITY: [u8; 3] = [0x06, 0x08, 0x1A];

/// Settle time after each configuration write.
pub const REGISTER_SETTLE_MS: u32 = 10;

/// Settle time after the sensor has been started.
pub const STARTUP_SETTLE_MS: u32 = 100;

/// Position report format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataFormat {
    /// 11 bytes: header plus two 5-byte blocks, each packing two points.
    #[default]
    Basic,
    /// 13 bytes: header plus four 3-byte blocks, each a point and blob size.
    Extended,
}

impl DataFormat {
    /// Value written to [`REG_FORMAT`] to select this format.
    #[inline]
    #[must_use]
    pub const fn mode(self) -> u8 {
        match self {
            Self::Basic => 0x11,
            Self::Extended => 0x33,
        }
    }

    /// Number of bytes in one position report, header included.
    #[inline]
    #[must_use]
    pub const fn frame_len(self) -> usize {
        match self {
            Self::Basic => crate::frame::BASIC_FRAME_LEN,
            Self::Extended => crate::frame::EXTENDED_FRAME_LEN,
        }
    }
}

/// Camera sensitivity level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sensitivity {
    /// Stock values (suggested by "Marcan").
    #[default]
    Default,
    /// High sensitivity (suggested by "inio").
    High,
    /// Maximum sensitivity (suggested by "Kestrel").
    Max,
}

impl Sensitivity {
    /// Values for [`REG_SENSITIVITY`], in register order.
    #[must_use]
    pub const fn values(self) -> [u8; 3] {
        match self {
            Self::Default => [0x90, 0xC0, 0x40],
            Self::High => [0x90, 0x41, 0x40],
            Self::Max => [0xFF, 0x0C, 0x00],
        }
    }

    /// The three register writes that apply this level.
    #[must_use]
    pub const fn register_writes(self) -> [RegisterWrite; 3] {
        let values = self.values();
        [
            RegisterWrite::new(REG_SENSITIVITY[0], values[0]),
            RegisterWrite::new(REG_SENSITIVITY[1], values[1]),
            RegisterWrite::new(REG_SENSITIVITY[2], values[2]),
        ]
    }
}

/// A single two-byte configuration write: register, then value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterWrite {
    pub register: u8,
    pub value: u8,
}

impl RegisterWrite {
    #[must_use]
    pub const fn new(register: u8, value: u8) -> Self {
        Self { register, value }
    }

    /// Bytes as they go on the wire.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> [u8; 2] {
        [self.register, self.value]
    }
}

/// Write that selects `format`.
#[inline]
#[must_use]
pub const fn format_select(format: DataFormat) -> RegisterWrite {
    RegisterWrite::new(REG_FORMAT, format.mode())
}

/// Number of writes in [`init_sequence`].
pub const INIT_SEQUENCE_LEN: usize = 6;

/// Full power-up sequence: stop, sensitivity block, format, start.
///
/// Each write must be followed by [`REGISTER_SETTLE_MS`]; the final start
/// write by [`STARTUP_SETTLE_MS`].
#[must_use]
pub const fn init_sequence(
    format: DataFormat,
    sensitivity: Sensitivity,
) -> [RegisterWrite; INIT_SEQUENCE_LEN] {
    let s = sensitivity.register_writes();
    [
        RegisterWrite::new(REG_CONTROL, CONTROL_CONFIGURE),
        s[0],
        s[1],
        s[2],
        format_select(format),
        RegisterWrite::new(REG_CONTROL, CONTROL_RUN),
    ]
}
