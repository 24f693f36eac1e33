//! The ordered collection of every tile on the wall.
//!
//! Tile `id` lives at index `id - 1`. The registry is built once from the
//! connection table and never grows or shrinks; only neutral angles and
//! last-commanded angles change afterwards.
//!
//! # Example
//!
//! ```rust
//! use rs_tilewall::{TileRegistry, tables::ConnectionTable};
//!
//! let table = ConnectionTable::parse("0x40,1,0,90\n0x40,2,1,92\n0x41,3,0,88\n", 7).unwrap();
//! let registry = TileRegistry::from_table(&table);
//!
//! assert_eq!(registry.len(), 3);
//! assert_eq!(registry.by_id(2).unwrap().neutral(), 92);
//! assert!(registry.by_id(0).is_none());
//! assert!(registry.by_id(4).is_none());
//! ```

extern crate alloc;

use alloc::vec::Vec;

use crate::tables::{ConnectionTable, LoadError, WaveTable};
use crate::tile::{is_safe_angle, Degrees, Tile, TileId};

/// Every tile, indexed by `id - 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileRegistry {
    tiles: Vec<Tile>,
}

impl TileRegistry {
    /// Builds a registry from tiles already in ID order.
    ///
    /// Fails if the list is empty or tile `i` (0-based) does not carry ID
    /// `i + 1`. The reported line is the 1-based position in `tiles`.
    pub fn new(tiles: Vec<Tile>) -> Result<Self, LoadError> {
        if tiles.is_empty() {
            return Err(LoadError::Empty);
        }
        for (idx, tile) in tiles.iter().enumerate() {
            let expected = (idx + 1) as TileId;
            if tile.id() != expected {
                return Err(LoadError::OutOfOrder {
                    line: idx + 1,
                    expected,
                    found: tile.id(),
                });
            }
        }
        Ok(Self { tiles })
    }

    /// Builds a registry from a validated connection table.
    ///
    /// A table only comes out of [`ConnectionTable::parse`], which rejects
    /// empty input, so the registry always holds at least one tile.
    pub fn from_table(table: &ConnectionTable) -> Self {
        let tiles = table
            .records()
            .iter()
            .map(|r| Tile::new(r.id, r.address).with_neutral(r.neutral))
            .collect();
        Self { tiles }
    }

    /// Number of tiles (the highest valid ID).
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always false for a constructed registry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Index for `id`, if `id` is in `1..=len`.
    #[inline]
    pub fn index_of(&self, id: TileId) -> Option<usize> {
        let idx = usize::from(id).checked_sub(1)?;
        (idx < self.tiles.len()).then_some(idx)
    }

    /// Returns true if `id` names a tile.
    #[inline]
    pub fn contains(&self, id: TileId) -> bool {
        self.index_of(id).is_some()
    }

    /// Tile at registry position `index`.
    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// Mutable tile at registry position `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Tile> {
        self.tiles.get_mut(index)
    }

    /// Tile with wire label `id`.
    pub fn by_id(&self, id: TileId) -> Option<&Tile> {
        self.index_of(id).map(|idx| &self.tiles[idx])
    }

    /// Mutable tile with wire label `id`.
    pub fn by_id_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        let idx = self.index_of(id)?;
        Some(&mut self.tiles[idx])
    }

    /// Tiles in registry order, as a slice.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tiles in registry order.
    pub fn iter(&self) -> core::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    /// Mutable tiles in registry order.
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, Tile> {
        self.tiles.iter_mut()
    }

    /// Sets the neutral angle of tile `id`.
    ///
    /// The value is stored even when it is outside the safety window, but a
    /// warning is logged: such a tile silently stays put on every
    /// return-to-neutral. Returns `None` for an unknown ID, otherwise
    /// whether the new neutral is reachable.
    pub fn set_neutral(&mut self, id: TileId, neutral: Degrees) -> Option<bool> {
        let tile = self.by_id_mut(id)?;
        tile.set_neutral(neutral);

        let reachable = is_safe_angle(neutral);
        if reachable {
            tracing::info!(tile = id, neutral, "neutral updated");
        } else {
            tracing::warn!(
                tile = id,
                neutral,
                "neutral outside safe window, return-to-neutral will be ignored"
            );
        }
        Some(reachable)
    }

    /// Checks that every ID in `wave` names a tile in this registry.
    pub fn validate_wave(&self, wave: &WaveTable) -> Result<(), LoadError> {
        for (row, ids) in wave.rows().iter().enumerate() {
            if let Some(&id) = ids.iter().find(|&&id| !self.contains(id)) {
                return Err(LoadError::UnknownWaveTile {
                    row,
                    id,
                    count: self.len(),
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TileRegistry {
    type Item = &'a Tile;
    type IntoIter = core::slice::Iter<'a, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
