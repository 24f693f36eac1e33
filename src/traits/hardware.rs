//! Hardware abstraction traits for the servo bank and status LED.
//!
//! This module defines the hardware interfaces the tile wall depends on,
//! so the motion routines can run against real PWM boards or desktop mocks.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ServoBank`] | Set one channel on one PWM driver board to an angle |
//! | [`StatusLed`] | Single RGB status pixel used during boot |
//! | [`DelayNs`] | Blocking pacing delays (re-exported from `embedded-hal`) |
//! | [`OutputPin`] | Power sequencing outputs (re-exported from `embedded-hal`) |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For real boards, use
//! [`Pca9685Bank`](crate::hal::Pca9685Bank) over any `embedded-hal` I2C bus.
//!
//! # Example
//!
//! ```rust
//! use rs_tilewall::traits::{ChannelAddress, ServoBank};
//! use rs_tilewall::hal::MockBank;
//!
//! let mut bank = MockBank::new();
//! bank.set_angle(ChannelAddress::new(2, 7), 90).unwrap();
//!
//! assert_eq!(bank.angle_at(ChannelAddress::new(2, 7)), Some(90));
//! ```

use core::fmt;

pub use embedded_hal::delay::DelayNs;
pub use embedded_hal::digital::OutputPin;

/// Number of PWM channels on one driver board.
pub const CHANNELS_PER_BOARD: u8 = 16;

/// Physical location of one actuator: driver board index and pin.
///
/// # Example
///
/// ```rust
/// use rs_tilewall::traits::ChannelAddress;
///
/// let addr = ChannelAddress::new(3, 15);
/// assert_eq!(addr.board, 3);
/// assert_eq!(addr.channel, 15);
/// assert_eq!(format!("{}", addr), "board 3 / ch 15");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelAddress {
    /// PWM driver board index (0-based).
    pub board: u8,
    /// Channel on that board (0-15).
    pub channel: u8,
}

impl ChannelAddress {
    /// Creates a new channel address.
    #[inline]
    pub const fn new(board: u8, channel: u8) -> Self {
        Self { board, channel }
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "board {} / ch {}", self.board, self.channel)
    }
}

/// A bank of PWM driver boards, each exposing independently settable
/// servo channels.
///
/// This is the only capability the tile and motion layers need from the
/// hardware: "set channel C on board B to angle A". The bus protocol and
/// duty cycle conversion live entirely in the implementation.
///
/// # Implementation Notes
///
/// - `angle` is in whole degrees, 0-180. Callers apply the tile safety
///   window before calling, implementations do not re-check it.
/// - Return an error for boards or channels that do not exist.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_tilewall::traits::{ChannelAddress, ServoBank};
///
/// struct MyBoards { /* bus handle */ }
///
/// impl ServoBank for MyBoards {
///     type Error = ();
///
///     fn set_angle(&mut self, addr: ChannelAddress, angle: u8) -> Result<(), ()> {
///         // Convert to a pulse width and write the PWM registers...
///         Ok(())
///     }
/// }
/// ```
pub trait ServoBank {
    /// Error type for hardware writes.
    type Error: fmt::Debug;

    /// Drive the channel at `addr` to `angle` degrees.
    fn set_angle(&mut self, addr: ChannelAddress, angle: u8) -> Result<(), Self::Error>;
}

impl<B: ServoBank + ?Sized> ServoBank for &mut B {
    type Error = B::Error;

    fn set_angle(&mut self, addr: ChannelAddress, angle: u8) -> Result<(), Self::Error> {
        (**self).set_angle(addr, angle)
    }
}

/// 8-bit RGB color for the status pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Pixel off.
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    /// Power-up in progress.
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    /// Boot completed.
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);

    /// Creates a color from its components.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Status indicator trait.
///
/// Used by the boot sequence to show power-up progress. Implement it for
/// an addressable pixel, a plain LED, or a mock.
pub trait StatusLed {
    /// Error type for LED writes.
    type Error: fmt::Debug;

    /// Show `color`.
    fn set_color(&mut self, color: Rgb) -> Result<(), Self::Error>;

    /// Convenience method to turn the indicator off.
    fn off(&mut self) -> Result<(), Self::Error> {
        self.set_color(Rgb::OFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_address_ordering() {
        let a = ChannelAddress::new(0, 15);
        let b = ChannelAddress::new(1, 0);
        assert!(a < b);
        assert_eq!(a, ChannelAddress::new(0, 15));
    }

    #[test]
    fn channel_address_display() {
        assert_eq!(format!("{}", ChannelAddress::new(6, 0)), "board 6 / ch 0");
    }

    #[test]
    fn rgb_constants() {
        assert_eq!(Rgb::default(), Rgb::OFF);
        assert_eq!(Rgb::BLUE, Rgb::new(0, 0, 255));
        assert_eq!(Rgb::GREEN, Rgb::new(0, 255, 0));
    }

    // =========================================================================
    // Default Method Tests
    // =========================================================================

    struct TestLed {
        last: Option<Rgb>,
    }

    impl StatusLed for TestLed {
        type Error = ();

        fn set_color(&mut self, color: Rgb) -> Result<(), ()> {
            self.last = Some(color);
            Ok(())
        }
    }

    #[test]
    fn status_led_off_default_impl() {
        let mut led = TestLed { last: None };
        led.set_color(Rgb::GREEN).unwrap();
        led.off().unwrap();
        assert_eq!(led.last, Some(Rgb::OFF));
    }

    struct CountingBank {
        writes: usize,
    }

    impl ServoBank for CountingBank {
        type Error = ();

        fn set_angle(&mut self, _addr: ChannelAddress, _angle: u8) -> Result<(), ()> {
            self.writes += 1;
            Ok(())
        }
    }

    fn drive<B: ServoBank>(mut bank: B) {
        bank.set_angle(ChannelAddress::new(0, 0), 90).unwrap();
    }

    #[test]
    fn servo_bank_through_mut_ref() {
        let mut bank = CountingBank { writes: 0 };
        drive(&mut bank);
        drive(&mut bank);
        assert_eq!(bank.writes, 2);
    }
}
