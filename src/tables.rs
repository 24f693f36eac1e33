//! Parsers for the two startup tables.
//!
//! # Connection Table
//!
//! One tile per line, in tile ID order:
//!
//! ```text
//! register_address,tile_id,board_pin,neutral_angle
//! 0x40,1,0,90
//! 0x40,2,1,95
//! 0x41,17,0,88
//! ```
//!
//! The last character of the register address selects the board index.
//! Row `i` (1-based, ignoring blank lines) must carry tile ID `i`, so the
//! registry can index tiles by `id - 1` and file order equals registry order.
//!
//! # Wave Table
//!
//! One wave row per line, comma-separated tile IDs:
//!
//! ```text
//! 1,2,3
//! 4,5,6,7
//! ```
//!
//! Both parsers skip blank lines and trim whitespace around fields. Any other
//! irregularity is a [`LoadError`]: an incomplete table makes tile
//! addressing unsafe, so nothing is guessed.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::tile::{is_safe_angle, Degrees, TileId};
use crate::traits::{ChannelAddress, CHANNELS_PER_BOARD};

/// Reasons a table failed to load. Line numbers are 1-based.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// A connection row does not have exactly four fields.
    #[error("line {line}: expected `register,id,pin,neutral`, found {found} field(s)")]
    FieldCount {
        /// Offending line.
        line: usize,
        /// Number of fields present.
        found: usize,
    },
    /// A numeric field did not parse.
    #[error("line {line}: {field} is not a valid number: {value:?}")]
    BadNumber {
        /// Offending line.
        line: usize,
        /// Which field.
        field: &'static str,
        /// Raw text.
        value: String,
    },
    /// The register address does not end in a board digit.
    #[error("line {line}: register address {register:?} does not end in a board digit")]
    BadBoardSelector {
        /// Offending line.
        line: usize,
        /// Raw register address.
        register: String,
    },
    /// The board index is past the last configured board.
    #[error("line {line}: board {board} is outside 0..{boards}")]
    BoardOutOfRange {
        /// Offending line.
        line: usize,
        /// Board index from the register address.
        board: u8,
        /// Configured board count.
        boards: u8,
    },
    /// The pin is past the last PWM channel.
    #[error("line {line}: pin {channel} is outside 0..16")]
    ChannelOutOfRange {
        /// Offending line.
        line: usize,
        /// Pin from the table.
        channel: u32,
    },
    /// A tile ID appears on more than one row.
    #[error("line {line}: tile {id} is listed twice")]
    DuplicateId {
        /// Offending line.
        line: usize,
        /// Repeated ID.
        id: TileId,
    },
    /// A row carries the wrong tile ID for its position (including ID 0).
    #[error("line {line}: expected tile {expected}, found {found} (rows must list IDs 1, 2, 3, ... in order)")]
    OutOfOrder {
        /// Offending line.
        line: usize,
        /// ID this row must carry.
        expected: TileId,
        /// ID actually present.
        found: TileId,
    },
    /// The connection table contains no tiles.
    #[error("connection table has no tiles")]
    Empty,
    /// A wave row references a tile the registry does not have.
    #[error("wave row {row}: tile {id} is not in the registry (1..={count})")]
    UnknownWaveTile {
        /// 0-based wave row.
        row: usize,
        /// Unknown ID.
        id: TileId,
        /// Registry size.
        count: usize,
    },
}

/// One parsed connection table row.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionRecord {
    /// Register address text as written in the table (e.g. `0x42`).
    pub register: String,
    /// Tile wire label.
    pub id: TileId,
    /// Board and pin.
    pub address: ChannelAddress,
    /// Neutral angle.
    pub neutral: Degrees,
}

impl ConnectionRecord {
    /// Parses one non-blank line. `line` is only used for error reporting.
    pub fn parse(text: &str, line: usize, boards: u8) -> Result<Self, LoadError> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(LoadError::FieldCount {
                line,
                found: fields.len(),
            });
        }

        let register = fields[0];
        let board = register
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(|| LoadError::BadBoardSelector {
                line,
                register: register.to_string(),
            })? as u8;
        if board >= boards {
            return Err(LoadError::BoardOutOfRange {
                line,
                board,
                boards,
            });
        }

        let id: TileId = parse_field(fields[1], line, "tile id")?;
        let channel: u32 = parse_field(fields[2], line, "board pin")?;
        if channel >= u32::from(CHANNELS_PER_BOARD) {
            return Err(LoadError::ChannelOutOfRange { line, channel });
        }
        let neutral: Degrees = parse_field(fields[3], line, "neutral angle")?;

        Ok(Self {
            register: register.to_string(),
            id,
            address: ChannelAddress::new(board, channel as u8),
            neutral,
        })
    }
}

/// The validated connection table, in registry order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionTable {
    records: Vec<ConnectionRecord>,
}

impl ConnectionTable {
    /// Parses and validates a whole table.
    ///
    /// `boards` is the number of driver boards fitted; any row selecting a
    /// board at or past it is rejected.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rs_tilewall::tables::{ConnectionTable, LoadError};
    ///
    /// let table = ConnectionTable::parse("0x40,1,0,90\n0x41,2,3,100\n", 7).unwrap();
    /// assert_eq!(table.len(), 2);
    /// assert_eq!(table.records()[1].address.board, 1);
    ///
    /// let err = ConnectionTable::parse("0x40,1,0,90\n0x40,3,1,90\n", 7).unwrap_err();
    /// assert!(matches!(err, LoadError::OutOfOrder { line: 2, expected: 2, found: 3 }));
    /// ```
    pub fn parse(text: &str, boards: u8) -> Result<Self, LoadError> {
        let mut records: Vec<ConnectionRecord> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }

            let record = ConnectionRecord::parse(raw, line, boards)?;
            let expected = (records.len() + 1) as TileId;
            if record.id != expected {
                let duplicate = record.id != 0 && records.iter().any(|r| r.id == record.id);
                return Err(if duplicate {
                    LoadError::DuplicateId {
                        line,
                        id: record.id,
                    }
                } else {
                    LoadError::OutOfOrder {
                        line,
                        expected,
                        found: record.id,
                    }
                });
            }
            if !is_safe_angle(record.neutral) {
                tracing::warn!(
                    line,
                    tile = record.id,
                    neutral = record.neutral,
                    "neutral outside safe window, tile will not return to neutral"
                );
            }
            records.push(record);
        }

        if records.is_empty() {
            return Err(LoadError::Empty);
        }
        Ok(Self { records })
    }

    /// Rows in file order.
    pub fn records(&self) -> &[ConnectionRecord] {
        &self.records
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ordered wave rows, each a group of tile IDs that move together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaveTable {
    rows: Vec<Vec<TileId>>,
}

impl WaveTable {
    /// Builds a table from already-known rows.
    pub fn from_rows(rows: Vec<Vec<TileId>>) -> Self {
        Self { rows }
    }

    /// Parses a wave table.
    ///
    /// IDs are only checked for syntax here; use
    /// [`TileRegistry::validate_wave`](crate::TileRegistry::validate_wave)
    /// once the registry exists.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rs_tilewall::tables::WaveTable;
    ///
    /// let wave = WaveTable::parse("1,2,3\n\n4, 5\n").unwrap();
    /// assert_eq!(wave.rows(), &[vec![1, 2, 3], vec![4, 5]]);
    /// ```
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let mut rows = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let row = raw
                .split(',')
                .map(|field| parse_field::<TileId>(field.trim(), idx + 1, "tile id"))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }

        Ok(Self { rows })
    }

    /// Rows in playback order.
    pub fn rows(&self) -> &[Vec<TileId>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_field<T: core::str::FromStr>(
    value: &str,
    line: usize,
    field: &'static str,
) -> Result<T, LoadError> {
    value.parse().map_err(|_| LoadError::BadNumber {
        line,
        field,
        value: value.to_string(),
    })
}
