//! PCA9685 servo bank built on the `pwm-pca9685` driver.
//!
//! Each PCA9685 16-channel PWM board gets its own driver and I2C handle.
//! Board `n` answers at `base_address + n` (0x40..=0x46 for the seven-board
//! wall). Boards on one physical bus share it through a bus-sharing wrapper
//! such as `embedded_hal_bus::i2c::RefCellDevice`; the driver keeps per-board
//! mode state, so boards must not share one driver instance.
//!
//! Servos are driven at 50 Hz. An angle of 0-180° maps linearly onto a
//! 750-2250 µs pulse:
//!
//! | Angle | Pulse | Ticks (of 4096) |
//! |-------|-------|-----------------|
//! | 0° | 750 µs | 153 |
//! | 90° | 1500 µs | 307 |
//! | 180° | 2250 µs | 460 |

extern crate alloc;

use alloc::vec::Vec;

use embedded_hal::i2c::I2c;
use pwm_pca9685::{Channel, Pca9685};

use crate::traits::{ChannelAddress, DelayNs, ServoBank};

/// round(25 MHz / (4096 * 50 Hz)) - 1
const PRESCALE_50HZ: u8 = 121;

const PERIOD_US: u32 = 20_000;
const MIN_PULSE_US: u32 = 750;
const MAX_PULSE_US: u32 = 2250;
const MAX_ANGLE: u8 = 180;

/// Errors from the PCA9685 bank.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Pca9685Error<E> {
    /// The bus transaction failed.
    #[error("I2C bus error: {0:?}")]
    I2c(E),
    /// The driver rejected an address or register value.
    #[error("invalid PCA9685 address or register value")]
    InvalidInput,
    /// The board index is not part of this bank.
    #[error("no driver board {0}")]
    NoSuchBoard(u8),
    /// The channel is past the last PWM output.
    #[error("channel {0} out of range")]
    NoSuchChannel(u8),
    /// The angle is past the servo's travel.
    #[error("angle {0} exceeds servo range")]
    AngleOutOfRange(u8),
}

impl<E> From<pwm_pca9685::Error<E>> for Pca9685Error<E> {
    fn from(err: pwm_pca9685::Error<E>) -> Self {
        match err {
            pwm_pca9685::Error::I2C(e) => Pca9685Error::I2c(e),
            pwm_pca9685::Error::InvalidInputData => Pca9685Error::InvalidInput,
        }
    }
}

/// A bank of PCA9685 boards, one driver per board.
///
/// # Example
///
/// ```rust
/// use rs_tilewall::hal::{MockDelay, MockI2c, Pca9685Bank};
/// use rs_tilewall::traits::{ChannelAddress, ServoBank};
///
/// let buses = (0..7).map(|_| MockI2c::new());
/// let mut bank = Pca9685Bank::new(buses).unwrap();
/// bank.init(&mut MockDelay::new()).unwrap();
/// bank.set_angle(ChannelAddress::new(2, 5), 90).unwrap();
///
/// let buses = bank.release();
/// let last = buses[2].writes_to(0x42).pop().unwrap().to_vec();
/// // LED5_ON_L, on = 0, off = 307 ticks
/// assert_eq!(last, vec![0x06 + 4 * 5, 0, 0, 0x33, 0x01]);
/// ```
pub struct Pca9685Bank<I2C> {
    drivers: Vec<Pca9685<I2C>>,
    base_address: u8,
}

impl<I2C: I2c> Pca9685Bank<I2C> {
    /// Address of board 0 with all address jumpers open.
    pub const DEFAULT_BASE_ADDRESS: u8 = 0x40;

    /// Creates one driver per bus handle, board 0 at the default address.
    ///
    /// The boards are not touched until [`init`](Self::init).
    pub fn new(buses: impl IntoIterator<Item = I2C>) -> Result<Self, Pca9685Error<I2C::Error>> {
        Self::with_base_address(buses, Self::DEFAULT_BASE_ADDRESS)
    }

    /// Like [`new`](Self::new) with board 0 at `base_address`.
    pub fn with_base_address(
        buses: impl IntoIterator<Item = I2C>,
        base_address: u8,
    ) -> Result<Self, Pca9685Error<I2C::Error>> {
        let mut drivers = Vec::new();
        for (board, bus) in buses.into_iter().enumerate() {
            let Some(address) = u8::try_from(board)
                .ok()
                .and_then(|b| base_address.checked_add(b))
            else {
                return Err(Pca9685Error::InvalidInput);
            };
            drivers.push(Pca9685::new(bus, address)?);
        }

        Ok(Self {
            drivers,
            base_address,
        })
    }

    /// Number of boards in the bank.
    #[inline]
    pub fn boards(&self) -> usize {
        self.drivers.len()
    }

    /// Bus address of `board`, if it is part of the bank.
    pub fn address_of(&self, board: u8) -> Option<u8> {
        if usize::from(board) < self.drivers.len() {
            self.base_address.checked_add(board)
        } else {
            None
        }
    }

    /// Puts every board into 50 Hz servo mode and wakes its oscillator.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Pca9685Error<I2C::Error>> {
        for (board, driver) in self.drivers.iter_mut().enumerate() {
            driver.set_prescale(PRESCALE_50HZ)?;
            driver.enable()?;
            // Oscillator needs 500 µs to stabilize after wake.
            delay.delay_us(500);
            tracing::debug!(board, "PCA9685 configured for 50 Hz");
        }
        Ok(())
    }

    /// Gives back the bus handles, board 0 first.
    pub fn release(self) -> Vec<I2C> {
        self.drivers.into_iter().map(Pca9685::destroy).collect()
    }

    /// PWM off-tick for `angle` degrees (on-tick is always 0).
    pub fn pulse_ticks(angle: u8) -> u16 {
        let angle = u32::from(angle.min(MAX_ANGLE));
        let pulse_us = MIN_PULSE_US + (MAX_PULSE_US - MIN_PULSE_US) * angle / u32::from(MAX_ANGLE);
        (pulse_us * 4096 / PERIOD_US) as u16
    }
}

impl<I2C: I2c> ServoBank for Pca9685Bank<I2C> {
    type Error = Pca9685Error<I2C::Error>;

    fn set_angle(&mut self, addr: ChannelAddress, angle: u8) -> Result<(), Self::Error> {
        let driver = self
            .drivers
            .get_mut(usize::from(addr.board))
            .ok_or(Pca9685Error::NoSuchBoard(addr.board))?;
        let channel = channel(addr.channel).ok_or(Pca9685Error::NoSuchChannel(addr.channel))?;
        if angle > MAX_ANGLE {
            return Err(Pca9685Error::AngleOutOfRange(angle));
        }

        driver.set_channel_on_off(channel, 0, Self::pulse_ticks(angle))?;
        Ok(())
    }
}

fn channel(index: u8) -> Option<Channel> {
    let channel = match index {
        0 => Channel::C0,
        1 => Channel::C1,
        2 => Channel::C2,
        3 => Channel::C3,
        4 => Channel::C4,
        5 => Channel::C5,
        6 => Channel::C6,
        7 => Channel::C7,
        8 => Channel::C8,
        9 => Channel::C9,
        10 => Channel::C10,
        11 => Channel::C11,
        12 => Channel::C12,
        13 => Channel::C13,
        14 => Channel::C14,
        15 => Channel::C15,
        _ => return None,
    };
    Some(channel)
}
