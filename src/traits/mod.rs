//! Trait definitions for hardware abstraction.
//!
//! This module defines the core abstractions that allow rs-tilewall to
//! run the same tile and motion code on real PWM driver boards and on
//! desktop mocks.
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`ServoBank`]: "set channel C on board B to angle A"
//! - [`StatusLed`]: RGB status pixel used during boot
//! - [`DelayNs`]: blocking delay used to pace actuator motion
//! - [`OutputPin`]: driver-enable and relay outputs for power sequencing
//!
//! `DelayNs` and `OutputPin` are the `embedded-hal` 1.0 traits, so any HAL
//! crate's delay and GPIO types plug in directly.

pub mod hardware;

pub use hardware::*;
