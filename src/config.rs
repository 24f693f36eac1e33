//! Configuration for the tile wall.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`. Defaults match the reference
//! 107-tile, seven-board wall.
//!
//! # Example
//!
//! ```rust
//! use rs_tilewall::config::{Config, MotionConfig, TableConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.motion.reset_delay_ms, 50);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_tables(TableConfig::default().with_connections_path("wall.csv"))
//!     .with_motion(MotionConfig::default().with_wave_deflection(8));
//! assert_eq!(config.tables.connections_path.as_str(), "wall.csv");
//! ```

use heapless::String as HString;

use crate::tile::Degrees;

/// Maximum length for short config strings (names)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (file paths)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    // Largest char boundary that fits
    let end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= N)
        .last()
        .unwrap_or(0);
    let _ = hs.push_str(&s[..end]);
    hs
}

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    truncated(s)
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Startup table locations and board count
    pub tables: TableConfig,
    /// Motion routine pacing
    pub motion: MotionConfig,
    /// Power-up sequencing delays
    pub boot: BootConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Config {
    /// Set table configuration
    pub fn with_tables(mut self, tables: TableConfig) -> Self {
        self.tables = tables;
        self
    }

    /// Set motion configuration
    pub fn with_motion(mut self, motion: MotionConfig) -> Self {
        self.motion = motion;
        self
    }

    /// Set boot configuration
    pub fn with_boot(mut self, boot: BootConfig) -> Self {
        self.boot = boot;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// Table Config
// ============================================================================

/// Where the startup tables live and how many boards are fitted
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TableConfig {
    /// Connection table (`register,id,pin,neutral` per line)
    pub connections_path: LongString,
    /// Wave grouping table (comma-separated IDs per line)
    pub wave_path: LongString,
    /// Number of PWM driver boards on the bus
    pub boards: u8,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            connections_path: long_string("connections_final.txt"),
            wave_path: long_string("wave.txt"),
            boards: 7,
        }
    }
}

impl TableConfig {
    /// Set the connection table path
    pub fn with_connections_path(mut self, path: &str) -> Self {
        self.connections_path = long_string(path);
        self
    }

    /// Set the wave table path
    pub fn with_wave_path(mut self, path: &str) -> Self {
        self.wave_path = long_string(path);
        self
    }

    /// Set the board count
    pub fn with_boards(mut self, boards: u8) -> Self {
        self.boards = boards;
        self
    }
}

// ============================================================================
// Motion Config
// ============================================================================

/// Pacing and amplitude for the group routines
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionConfig {
    /// Pause after each tile in reset-all (paces power rail current)
    pub reset_delay_ms: u32,
    /// Sweep pause used when the operator's delay is invalid
    pub sweep_default_delay_ms: u32,
    /// Wave deflection magnitude in degrees
    pub wave_deflection: Degrees,
    /// Pause after each tile move inside a wave step
    pub wave_tile_delay_ms: u32,
    /// Pause after each wave step
    pub wave_row_delay_ms: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            reset_delay_ms: 50,
            sweep_default_delay_ms: 250,
            wave_deflection: 10,
            wave_tile_delay_ms: 5,
            wave_row_delay_ms: 100,
        }
    }
}

impl MotionConfig {
    /// Set the reset-all per-tile pause
    pub fn with_reset_delay_ms(mut self, ms: u32) -> Self {
        self.reset_delay_ms = ms;
        self
    }

    /// Set the sweep fallback pause
    pub fn with_sweep_default_delay_ms(mut self, ms: u32) -> Self {
        self.sweep_default_delay_ms = ms;
        self
    }

    /// Set the wave deflection magnitude (sign is ignored)
    pub fn with_wave_deflection(mut self, degrees: Degrees) -> Self {
        self.wave_deflection = degrees.abs();
        self
    }

    /// Set the wave per-tile pause
    pub fn with_wave_tile_delay_ms(mut self, ms: u32) -> Self {
        self.wave_tile_delay_ms = ms;
        self
    }

    /// Set the wave per-step pause
    pub fn with_wave_row_delay_ms(mut self, ms: u32) -> Self {
        self.wave_row_delay_ms = ms;
        self
    }
}

// ============================================================================
// Boot Config
// ============================================================================

/// Delays in the power-up sequence
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BootConfig {
    /// Wait after disabling the drivers
    pub disable_settle_ms: u32,
    /// Wait before closing the servo power relay
    pub pre_relay_ms: u32,
    /// Wait for servo power to stabilize before enabling the drivers
    pub relay_settle_ms: u32,
    /// Wait after enabling the drivers
    pub enable_settle_ms: u32,
    /// How long the "boot complete" color stays on
    pub led_hold_ms: u32,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            disable_settle_ms: 250,
            pre_relay_ms: 2000,
            relay_settle_ms: 3000,
            enable_settle_ms: 1000,
            led_hold_ms: 1000,
        }
    }
}

impl BootConfig {
    /// All delays zero. Handy on simulated hardware.
    pub fn immediate() -> Self {
        Self {
            disable_settle_ms: 0,
            pre_relay_ms: 0,
            relay_settle_ms: 0,
            enable_settle_ms: 0,
            led_hold_ms: 0,
        }
    }

    /// Set the relay stabilization wait
    pub fn with_relay_settle_ms(mut self, ms: u32) -> Self {
        self.relay_settle_ms = ms;
        self
    }

    /// Total time the sequence spends waiting, saturating at `u32::MAX`
    pub fn total_ms(&self) -> u32 {
        [
            self.pre_relay_ms,
            self.relay_settle_ms,
            self.enable_settle_ms,
            self.led_hold_ms,
        ]
        .into_iter()
        .fold(self.disable_settle_ms, u32::saturating_add)
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Human-readable device name
    pub name: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("tilewall"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.tables.boards, 7);
        assert_eq!(config.tables.connections_path.as_str(), "connections_final.txt");
        assert_eq!(config.tables.wave_path.as_str(), "wave.txt");
        assert_eq!(config.device.name.as_str(), "tilewall");
    }

    #[test]
    fn motion_defaults() {
        let motion = MotionConfig::default();
        assert_eq!(motion.reset_delay_ms, 50);
        assert_eq!(motion.sweep_default_delay_ms, 250);
        assert_eq!(motion.wave_deflection, 10);
        assert_eq!(motion.wave_tile_delay_ms, 5);
        assert_eq!(motion.wave_row_delay_ms, 100);
    }

    #[test]
    fn motion_builder() {
        let motion = MotionConfig::default()
            .with_reset_delay_ms(20)
            .with_sweep_default_delay_ms(100)
            .with_wave_deflection(-12)
            .with_wave_tile_delay_ms(1)
            .with_wave_row_delay_ms(40);

        assert_eq!(motion.reset_delay_ms, 20);
        assert_eq!(motion.sweep_default_delay_ms, 100);
        assert_eq!(motion.wave_deflection, 12);
        assert_eq!(motion.wave_tile_delay_ms, 1);
        assert_eq!(motion.wave_row_delay_ms, 40);
    }

    #[test]
    fn boot_defaults_and_total() {
        let boot = BootConfig::default();
        assert_eq!(boot.relay_settle_ms, 3000);
        assert_eq!(boot.total_ms(), 250 + 2000 + 3000 + 1000 + 1000);
        assert_eq!(BootConfig::immediate().total_ms(), 0);
        assert_eq!(BootConfig::immediate().with_relay_settle_ms(5).total_ms(), 5);
        assert_eq!(
            BootConfig::default()
                .with_relay_settle_ms(u32::MAX)
                .total_ms(),
            u32::MAX
        );
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_tables(
                TableConfig::default()
                    .with_connections_path("/data/conn.txt")
                    .with_wave_path("/data/wave.txt")
                    .with_boards(3),
            )
            .with_boot(BootConfig::immediate())
            .with_device(DeviceConfig::default().with_name("Lobby Wall"));

        assert_eq!(config.tables.connections_path.as_str(), "/data/conn.txt");
        assert_eq!(config.tables.wave_path.as_str(), "/data/wave.txt");
        assert_eq!(config.tables.boards, 3);
        assert_eq!(config.boot, BootConfig::immediate());
        assert_eq!(config.device.name.as_str(), "Lobby Wall");
    }

    // =========================================================================
    // String Helper Tests
    // =========================================================================

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 4-byte chars: 17 of them is 68 bytes, only 16 fit
        let input = "🧱".repeat(17);
        let s = short_string(&input);
        assert_eq!(s.len(), 64);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }
}
