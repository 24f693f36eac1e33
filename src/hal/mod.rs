//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Test doubles for desktop development and tests
//! - `pca9685`: Servo bank over `pwm-pca9685` drivers, one per board
//! - `host`: Blocking delay on the host OS (requires `std` feature)

pub mod mock;
pub mod pca9685;

#[cfg(feature = "std")]
pub mod host;

pub use mock::*;
pub use pca9685::{Pca9685Bank, Pca9685Error};

#[cfg(feature = "std")]
pub use host::StdDelay;
