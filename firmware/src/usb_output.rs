//! USB HID absolute pointer output.

use defmt::Format;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::hid::{HidWriter, State};
use embassy_usb::Builder;
use lightgun_core::{AimSink, AimState, OutputError};

/// Largest logical coordinate in a report.
pub const LOGICAL_MAX: u16 = 0x7FFF;

/// USB HID pointer report structure.
///
/// This matches the HID report descriptor defined below.
/// Total size: 5 bytes (buttons: 1, x: 2, y: 2)
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Format)]
#[repr(C)]
pub struct PointerReport {
    /// Button bitfield (3 buttons, driven by the trigger subsystem)
    pub buttons: u8,
    /// Absolute X (0 to [`LOGICAL_MAX`])
    pub x: u16,
    /// Absolute Y (0 to [`LOGICAL_MAX`])
    pub y: u16,
}

impl PointerReport {
    /// Size of the report in bytes.
    pub const SIZE: usize = 5;

    /// Convert the report to bytes.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let x = self.x.to_le_bytes();
        let y = self.y.to_le_bytes();
        [self.buttons, x[0], x[1], y[0], y[1]]
    }

    /// Scale a screen-pixel aim to the logical range, clamping off-screen aims to the edge.
    #[must_use]
    pub fn from_aim(aim: &AimState, width: u16, height: u16) -> Self {
        Self {
            buttons: 0,
            x: scale(aim.screen.x, width),
            y: scale(aim.screen.y, height),
        }
    }
}

fn scale(pixel: i32, extent: u16) -> u16 {
    let last = i32::from(extent.max(2)) - 1;
    let clamped = pixel.clamp(0, last);
    (clamped * i32::from(LOGICAL_MAX) / last) as u16
}

/// Absolute pointer report descriptor.
///
/// - 3 buttons plus 5 bits of padding
/// - X/Y absolute, unsigned 16-bit, 0..=32767
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    //
    // --- Buttons (3 buttons) ---
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x03, //     Usage Maximum (Button 3)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x03, //     Report Count (3)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x95, 0x01, //     Report Count (1)
    0x75, 0x05, //     Report Size (5)
    0x81, 0x03, //     Input (Constant) - padding
    //
    // --- Position ---
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0x00, //     Logical Minimum (0)
    0x26, 0xFF, 0x7F, // Logical Maximum (32767)
    0x95, 0x02, //     Report Count (2)
    0x75, 0x10, //     Report Size (16)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// USB HID pointer output.
///
/// Wraps an embassy-usb HID writer and the screen size the aim is
/// expressed in.
pub struct UsbHidOutput<'d> {
    writer: HidWriter<'d, Driver<'d, USB>, 8>,
    width: u16,
    height: u16,
    ready: bool,
}

impl<'d> UsbHidOutput<'d> {
    pub fn new(writer: HidWriter<'d, Driver<'d, USB>, 8>, width: u16, height: u16) -> Self {
        Self {
            writer,
            width,
            height,
            ready: false,
        }
    }

    /// Wait until the device is ready (USB enumerated).
    pub async fn wait_ready(&mut self) {
        self.writer.ready().await;
        self.ready = true;
    }
}

impl<'d> AimSink for UsbHidOutput<'d> {
    async fn send(&mut self, state: &AimState) -> Result<(), OutputError> {
        if !self.ready {
            return Err(OutputError::NotReady);
        }
        let report = PointerReport::from_aim(state, self.width, self.height);
        self.writer
            .write(&report.as_bytes())
            .await
            .map_err(|_| OutputError::Io)
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Configure the USB HID class in the USB builder.
///
/// Returns the HID writer for use by the application.
pub fn configure_usb_hid<'d>(
    builder: &mut Builder<'d, Driver<'d, USB>>,
    state: &'d mut State<'d>,
) -> HidWriter<'d, Driver<'d, USB>, 8> {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: 1,
        max_packet_size: 8,
        hid_subclass: embassy_usb::class::hid::HidSubclass::No,
        hid_boot_protocol: embassy_usb::class::hid::HidBootProtocol::None,
    };

    HidWriter::new(builder, state, config)
}
