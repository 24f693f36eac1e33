//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for every hardware capability,
//! enabling development and testing on desktop without driver boards.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockBank`] | [`ServoBank`] | Records angle writes, injects per-channel faults |
//! | [`MockDelay`] | [`DelayNs`] | Records requested delays instead of sleeping |
//! | [`MockPin`] | [`OutputPin`] | Tracks level changes, optional shared journal |
//! | [`MockLed`] | [`StatusLed`] | Records colors shown |
//! | [`MockI2c`] | [`I2c`] | Captures bus writes for driver tests |
//!
//! # Example
//!
//! ```rust
//! use rs_tilewall::{MotionEngine, TileRegistry, Tile, Config};
//! use rs_tilewall::hal::{MockBank, MockDelay};
//! use rs_tilewall::traits::ChannelAddress;
//!
//! let mut registry = TileRegistry::new(vec![
//!     Tile::new(1, ChannelAddress::new(0, 0)),
//!     Tile::new(2, ChannelAddress::new(0, 1)).with_neutral(100),
//! ]).unwrap();
//!
//! let mut engine = MotionEngine::new(MockBank::new(), MockDelay::new(), Config::default().motion);
//! let report = engine.reset_all(&mut registry);
//!
//! assert!(report.is_clean());
//! assert_eq!(engine.bank().angle_at(ChannelAddress::new(0, 1)), Some(100));
//! assert_eq!(engine.delay().pauses_us, vec![50_000, 50_000]);
//! ```
//!
//! [`ServoBank`]: crate::traits::ServoBank
//! [`DelayNs`]: crate::traits::DelayNs
//! [`OutputPin`]: crate::traits::OutputPin
//! [`StatusLed`]: crate::traits::StatusLed
//! [`I2c`]: embedded_hal::i2c::I2c

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;

use embedded_hal::digital::{self, ErrorType as DigitalErrorType};
use embedded_hal::i2c::{self, ErrorKind, Operation, SevenBitAddress};

use crate::traits::{ChannelAddress, DelayNs, OutputPin, Rgb, ServoBank, StatusLed};

// ============================================================================
// Servo Bank
// ============================================================================

/// Simulated hardware fault raised by [`MockBank`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("simulated hardware fault on {0}")]
pub struct MockFault(pub ChannelAddress);

/// Mock servo bank for testing.
///
/// Records every successful write in order. Channels registered with
/// [`fail_channel`](Self::fail_channel) return [`MockFault`] instead.
///
/// # Example
///
/// ```rust
/// use rs_tilewall::hal::MockBank;
/// use rs_tilewall::traits::{ChannelAddress, ServoBank};
///
/// let mut bank = MockBank::new();
/// let addr = ChannelAddress::new(0, 4);
///
/// bank.set_angle(addr, 100).unwrap();
/// bank.fail_channel(addr);
/// assert!(bank.set_angle(addr, 110).is_err());
///
/// assert_eq!(bank.angle_at(addr), Some(100));
/// assert_eq!(bank.writes.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockBank {
    /// Successful writes, oldest first.
    pub writes: Vec<(ChannelAddress, u8)>,
    /// Channels that fail every write.
    pub failing: Vec<ChannelAddress>,
}

impl MockBank {
    /// Creates an empty mock bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future write to `addr` fail.
    pub fn fail_channel(&mut self, addr: ChannelAddress) {
        if !self.failing.contains(&addr) {
            self.failing.push(addr);
        }
    }

    /// Clears all injected faults.
    pub fn clear_faults(&mut self) {
        self.failing.clear();
    }

    /// The last angle written to `addr`.
    pub fn angle_at(&self, addr: ChannelAddress) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|(a, _)| *a == addr)
            .map(|(_, angle)| *angle)
    }

    /// Every angle written to `addr`, oldest first.
    pub fn writes_to(&self, addr: ChannelAddress) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, angle)| *angle)
            .collect()
    }
}

impl ServoBank for MockBank {
    type Error = MockFault;

    fn set_angle(&mut self, addr: ChannelAddress, angle: u8) -> Result<(), MockFault> {
        if self.failing.contains(&addr) {
            return Err(MockFault(addr));
        }
        self.writes.push((addr, angle));
        Ok(())
    }
}

// ============================================================================
// Delay
// ============================================================================

/// Mock delay for testing.
///
/// Every requested pause is recorded in microseconds and returns
/// immediately, so timing can be asserted without slowing the tests.
///
/// # Example
///
/// ```rust
/// use rs_tilewall::hal::MockDelay;
/// use rs_tilewall::traits::DelayNs;
///
/// let mut delay = MockDelay::new();
/// delay.delay_ms(50);
/// delay.delay_us(250);
///
/// assert_eq!(delay.pauses_us, vec![50_000, 250]);
/// assert_eq!(delay.total_us(), 50_250);
/// ```
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Requested pauses, in microseconds.
    pub pauses_us: Vec<u64>,
}

impl MockDelay {
    /// Creates a new mock delay with no recorded pauses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all recorded pauses.
    pub fn total_us(&self) -> u64 {
        self.pauses_us.iter().sum()
    }

    /// Forget all recorded pauses.
    pub fn clear(&mut self) {
        self.pauses_us.clear();
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.pauses_us.push(u64::from(ns) / 1_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.pauses_us.push(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.pauses_us.push(u64::from(ms) * 1_000);
    }
}

// ============================================================================
// GPIO
// ============================================================================

/// One level change seen by a journaled [`MockPin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinEvent {
    /// Name given to the pin.
    pub pin: &'static str,
    /// New level.
    pub high: bool,
}

/// Shared, ordered record of pin changes across several mock pins.
pub type PinJournal = Rc<RefCell<Vec<PinEvent>>>;

/// Simulated GPIO failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockPinError;

impl digital::Error for MockPinError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Mock output pin for testing.
///
/// Tracks its level and every change. Pins sharing a [`PinJournal`]
/// record their changes in global order, which is how power sequencing
/// tests check that the relay comes up before the drivers.
///
/// # Example
///
/// ```rust
/// use rs_tilewall::hal::{MockPin, PinJournal};
/// use rs_tilewall::traits::OutputPin;
///
/// let journal = PinJournal::default();
/// let mut relay = MockPin::named("relay").with_journal(journal.clone());
/// let mut enable = MockPin::named("enable").with_journal(journal.clone());
///
/// relay.set_high().unwrap();
/// enable.set_low().unwrap();
///
/// let order: Vec<_> = journal.borrow().iter().map(|e| e.pin).collect();
/// assert_eq!(order, vec!["relay", "enable"]);
/// ```
#[derive(Debug, Default)]
pub struct MockPin {
    /// Pin name used in journal entries.
    pub name: &'static str,
    /// Current level (`None` until first driven).
    pub level: Option<bool>,
    /// Every level this pin was driven to.
    pub history: Vec<bool>,
    /// When true, every write fails.
    pub fail: bool,
    journal: Option<PinJournal>,
}

impl MockPin {
    /// Creates a named, undriven pin.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Records level changes in `journal`.
    pub fn with_journal(mut self, journal: PinJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Returns true if the pin is currently driven high.
    pub fn is_high(&self) -> bool {
        self.level == Some(true)
    }

    fn drive(&mut self, high: bool) -> Result<(), MockPinError> {
        if self.fail {
            return Err(MockPinError);
        }
        self.level = Some(high);
        self.history.push(high);
        if let Some(journal) = &self.journal {
            journal.borrow_mut().push(PinEvent {
                pin: self.name,
                high,
            });
        }
        Ok(())
    }
}

impl DigitalErrorType for MockPin {
    type Error = MockPinError;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), MockPinError> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), MockPinError> {
        self.drive(true)
    }
}

// ============================================================================
// Status LED
// ============================================================================

/// Mock status LED for testing.
///
/// # Example
///
/// ```
/// use rs_tilewall::hal::MockLed;
/// use rs_tilewall::traits::{Rgb, StatusLed};
///
/// let mut led = MockLed::new();
/// led.set_color(Rgb::BLUE).unwrap();
/// led.off().unwrap();
/// assert_eq!(led.colors, vec![Rgb::BLUE, Rgb::OFF]);
/// ```
#[derive(Debug, Default)]
pub struct MockLed {
    /// Every color shown, oldest first.
    pub colors: Vec<Rgb>,
}

impl MockLed {
    /// Creates a new mock LED.
    pub fn new() -> Self {
        Self::default()
    }

    /// The color currently shown.
    pub fn current(&self) -> Rgb {
        self.colors.last().copied().unwrap_or_default()
    }
}

impl StatusLed for MockLed {
    type Error = Infallible;

    fn set_color(&mut self, color: Rgb) -> Result<(), Infallible> {
        self.colors.push(color);
        Ok(())
    }
}

// ============================================================================
// I2C Bus
// ============================================================================

/// Mock I2C bus for driver tests.
///
/// Captures every write as `(address, bytes)`. Addresses listed in
/// `absent` do not acknowledge.
///
/// # Example
///
/// ```rust
/// use rs_tilewall::hal::MockI2c;
/// use embedded_hal::i2c::I2c;
///
/// let mut bus = MockI2c::new();
/// bus.write(0x40, &[0x00, 0x10]).unwrap();
/// assert_eq!(bus.writes, vec![(0x40, vec![0x00, 0x10])]);
///
/// bus.absent.push(0x41);
/// assert!(bus.write(0x41, &[0x00]).is_err());
/// ```
#[derive(Debug, Default)]
pub struct MockI2c {
    /// Bytes written, per transaction, oldest first.
    pub writes: Vec<(u8, Vec<u8>)>,
    /// Addresses with no device attached.
    pub absent: Vec<u8>,
}

impl MockI2c {
    /// Creates an empty bus with every address present.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes sent to `address`, oldest first.
    pub fn writes_to(&self, address: u8) -> Vec<&[u8]> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, bytes)| bytes.as_slice())
            .collect()
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl i2c::I2c<SevenBitAddress> for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), ErrorKind> {
        if self.absent.contains(&address) {
            return Err(ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address));
        }
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buf) => buf.fill(0),
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    // =========================================================================
    // MockBank Tests
    // =========================================================================

    #[test]
    fn mock_bank_default() {
        let bank = MockBank::new();
        assert!(bank.writes.is_empty());
        assert!(bank.failing.is_empty());
        assert_eq!(bank.angle_at(ChannelAddress::new(0, 0)), None);
    }

    #[test]
    fn mock_bank_records_in_order() {
        let mut bank = MockBank::new();
        let a = ChannelAddress::new(0, 1);
        let b = ChannelAddress::new(2, 3);

        bank.set_angle(a, 90).unwrap();
        bank.set_angle(b, 100).unwrap();
        bank.set_angle(a, 110).unwrap();

        assert_eq!(bank.writes_to(a), vec![90, 110]);
        assert_eq!(bank.angle_at(a), Some(110));
        assert_eq!(bank.angle_at(b), Some(100));
    }

    #[test]
    fn mock_bank_fault_injection() {
        let mut bank = MockBank::new();
        let a = ChannelAddress::new(1, 1);
        bank.fail_channel(a);
        bank.fail_channel(a);
        assert_eq!(bank.failing.len(), 1);

        assert_eq!(bank.set_angle(a, 90), Err(MockFault(a)));

        bank.clear_faults();
        assert!(bank.set_angle(a, 90).is_ok());
    }

    // =========================================================================
    // MockDelay Tests
    // =========================================================================

    #[test]
    fn mock_delay_units() {
        let mut delay = MockDelay::new();
        delay.delay_ns(5_000);
        delay.delay_us(7);
        delay.delay_ms(3);
        assert_eq!(delay.pauses_us, vec![5, 7, 3_000]);

        delay.clear();
        assert_eq!(delay.total_us(), 0);
    }

    // =========================================================================
    // MockPin Tests
    // =========================================================================

    #[test]
    fn mock_pin_tracks_level() {
        let mut pin = MockPin::named("en");
        assert_eq!(pin.level, None);

        pin.set_high().unwrap();
        assert!(pin.is_high());
        pin.set_low().unwrap();
        assert!(!pin.is_high());
        assert_eq!(pin.history, vec![true, false]);
    }

    #[test]
    fn mock_pin_failure() {
        let mut pin = MockPin::named("en");
        pin.fail = true;
        assert_eq!(pin.set_high(), Err(MockPinError));
        assert!(pin.history.is_empty());
    }

    // =========================================================================
    // MockLed Tests
    // =========================================================================

    #[test]
    fn mock_led_current() {
        let mut led = MockLed::new();
        assert_eq!(led.current(), Rgb::OFF);
        led.set_color(Rgb::GREEN).unwrap();
        assert_eq!(led.current(), Rgb::GREEN);
    }

    // =========================================================================
    // MockI2c Tests
    // =========================================================================

    #[test]
    fn mock_i2c_read_zeroes_buffer() {
        use embedded_hal::i2c::I2c;

        let mut bus = MockI2c::new();
        let mut buf = [0xAA; 2];
        bus.write_read(0x40, &[0x00], &mut buf).unwrap();
        assert_eq!(buf, [0, 0]);
        assert_eq!(bus.writes_to(0x40), vec![&[0x00][..]]);
    }
}
