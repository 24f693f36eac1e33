//! # rs-tilewall
//!
//! Controller for a wall of servo-actuated tiles driven by several PWM
//! driver boards.
//!
//! ## Features
//!
//! - **Safe moves**: every angle outside 45-150° is dropped before it
//!   reaches the hardware
//! - **Tile registry**: tiles loaded from a connection table, addressed by
//!   the ID printed on their servo wire
//! - **Group routines**: reset-all, sweep, and a row-by-row wave, each paced
//!   to keep servo current within the power supply's limits
//! - **Fault isolation**: one failing tile never aborts a routine; every
//!   routine returns a per-tile report
//! - **Power sequencing**: the relay settles before the drivers are enabled
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware abstractions (servo bank, status LED, GPIO, delay)
//! - `tile` - A single tile and its safety window
//! - `tables` - Connection and wave table parsing
//! - `registry` - Every tile, addressed by ID
//! - `motion` - Single-tile commands and group routines
//! - `boot` - Power sequencing
//! - `console` - Operator command interpreter
//! - `hal` - Concrete implementations (mock for testing, PCA9685 over I2C)
//!
//! ## Example
//!
//! ```rust
//! use rs_tilewall::{
//!     Config, MotionEngine, TileRegistry,
//!     hal::{MockBank, MockDelay},
//!     tables::{ConnectionTable, WaveTable},
//! };
//!
//! let config = Config::default();
//! let table = ConnectionTable::parse("0x40,1,0,90\n0x40,2,1,95\n0x41,3,0,85\n", config.tables.boards)?;
//! let wave = WaveTable::parse("1,2\n3\n")?;
//!
//! let mut registry = TileRegistry::from_table(&table);
//! registry.validate_wave(&wave)?;
//!
//! let mut engine = MotionEngine::new(MockBank::new(), MockDelay::new(), config.motion);
//! let report = engine.wave(&mut registry, &wave);
//! assert!(report.is_clean());
//!
//! let report = engine.reset_all(&mut registry);
//! assert_eq!(report.moved(), 3);
//! # Ok::<(), rs_tilewall::tables::LoadError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Power sequencing and the startup flow.
pub mod boot;
/// Operator console: command parsing and the manual-mode state machine.
pub mod console;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Single-tile commands and group routines.
pub mod motion;
/// Every tile on the wall, addressed by ID.
pub mod registry;
/// Connection and wave table parsing.
pub mod tables;
/// A single servo-actuated tile.
pub mod tile;
/// Core traits for hardware abstraction.
pub mod traits;

/// Shared configuration system.
pub mod config;

// Re-exports for convenience
pub use boot::{boot, BootError, PowerError, PowerSequencer, PowerState};
pub use console::{Command, Console, Reply};
pub use motion::{
    BatchReport, CancelToken, DegreeSpec, IdRange, MotionEngine, MotionError, ParseError,
    SweepParams, TileFault, TileOutcome, TileResult,
};
pub use registry::TileRegistry;
pub use tables::{ConnectionTable, LoadError, WaveTable};
pub use tile::{Degrees, MoveOutcome, Tile, TileId};
pub use traits::{ChannelAddress, Rgb, ServoBank, StatusLed};

// Config re-exports
pub use config::{BootConfig, Config, DeviceConfig, MotionConfig, TableConfig};
