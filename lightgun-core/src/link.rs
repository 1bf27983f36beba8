//! Two-wire transport between the MCU and the camera.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// Transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Address or data byte not acknowledged.
    Nack,
    /// Bus error (misplaced start/stop condition).
    Bus,
    /// Lost arbitration to another controller.
    Arbitration,
    /// Data overrun or underrun.
    Overrun,
    /// Any other peripheral error.
    Other,
}

impl From<ErrorKind> for LinkError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => LinkError::Nack,
            ErrorKind::Bus => LinkError::Bus,
            ErrorKind::ArbitrationLoss => LinkError::Arbitration,
            ErrorKind::Overrun => LinkError::Overrun,
            _ => LinkError::Other,
        }
    }
}

/// Register-oriented access to a single peripheral.
///
/// Implementations talk to one fixed device address.
pub trait SensorLink {
    /// Write raw bytes (register followed by value for configuration).
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Select `register`, then read into `buf`.
    ///
    /// Returns the number of bytes actually received, which a short
    /// transfer may leave below `buf.len()`.
    fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, LinkError>;
}

/// [`SensorLink`] over any `embedded-hal` I2C bus.
///
/// The register select and the block read are separate transactions: the
/// camera does not accept a repeated start between them.
pub struct I2cLink<I2C> {
    bus: I2C,
    address: u8,
}

impl<I2C: I2c> I2cLink<I2C> {
    pub fn new(bus: I2C, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release the underlying bus.
    pub fn release(self) -> I2C {
        self.bus
    }
}

impl<I2C: I2c> SensorLink for I2cLink<I2C> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.bus
            .write(self.address, bytes)
            .map_err(|e| LinkError::from(e.kind()))
    }

    fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.bus
            .write(self.address, &[register])
            .map_err(|e| LinkError::from(e.kind()))?;
        self.bus
            .read(self.address, buf)
            .map_err(|e| LinkError::from(e.kind()))?;
        Ok(buf.len())
    }
}
