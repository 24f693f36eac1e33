//! A single servo-actuated tile.
//!
//! A [`Tile`] knows where its actuator is wired ([`ChannelAddress`]) and
//! its neutral resting angle. It does not own the hardware: every move
//! borrows the [`ServoBank`] for the duration of the write.
//!
//! # Safety Window
//!
//! Moves outside [`MIN_SAFE_ANGLE`]..=[`MAX_SAFE_ANGLE`] are dropped
//! without touching the hardware and without an error. This protects the
//! linkage from mechanical overtravel. The caller can still see what
//! happened through the returned [`MoveOutcome`].
//!
//! # Example
//!
//! ```rust
//! use rs_tilewall::{Tile, MoveOutcome};
//! use rs_tilewall::hal::MockBank;
//! use rs_tilewall::traits::ChannelAddress;
//!
//! let mut bank = MockBank::new();
//! let mut tile = Tile::new(12, ChannelAddress::new(0, 11)).with_neutral(95);
//!
//! assert_eq!(tile.move_to(&mut bank, 105).unwrap(), MoveOutcome::Moved(105));
//! assert_eq!(tile.move_to(&mut bank, 170).unwrap(), MoveOutcome::Ignored(170));
//! assert_eq!(bank.writes.len(), 1);
//!
//! tile.return_to_neutral(&mut bank).unwrap();
//! assert_eq!(tile.last_commanded(), Some(95));
//! ```

use crate::traits::{ChannelAddress, ServoBank};

/// Tile identifier, matching the label on the servo wire (1-based).
pub type TileId = u16;

/// Angle in whole degrees. Signed so that `neutral - offset` never wraps.
pub type Degrees = i32;

/// Lowest angle the linkage accepts.
pub const MIN_SAFE_ANGLE: Degrees = 45;

/// Highest angle the linkage accepts.
pub const MAX_SAFE_ANGLE: Degrees = 150;

/// Neutral angle used when the connection table does not override it.
pub const DEFAULT_NEUTRAL: Degrees = 90;

/// Returns true if `angle` is inside the safety window.
///
/// ```
/// use rs_tilewall::tile::is_safe_angle;
///
/// assert!(is_safe_angle(45));
/// assert!(is_safe_angle(150));
/// assert!(!is_safe_angle(44));
/// assert!(!is_safe_angle(151));
/// ```
#[inline]
pub const fn is_safe_angle(angle: Degrees) -> bool {
    angle >= MIN_SAFE_ANGLE && angle <= MAX_SAFE_ANGLE
}

/// Result of a single move request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MoveOutcome {
    /// The angle was written to the hardware.
    Moved(Degrees),
    /// The angle was outside the safety window and was dropped.
    Ignored(Degrees),
}

impl MoveOutcome {
    /// Returns the requested angle regardless of outcome.
    #[inline]
    pub const fn angle(&self) -> Degrees {
        match self {
            MoveOutcome::Moved(a) | MoveOutcome::Ignored(a) => *a,
        }
    }

    /// Returns true if the hardware was written.
    #[inline]
    pub const fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved(_))
    }
}

/// One addressable actuator on the wall.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    id: TileId,
    address: ChannelAddress,
    neutral: Degrees,
    last_commanded: Option<Degrees>,
}

impl Tile {
    /// Creates a tile at the default neutral angle.
    pub fn new(id: TileId, address: ChannelAddress) -> Self {
        Self {
            id,
            address,
            neutral: DEFAULT_NEUTRAL,
            last_commanded: None,
        }
    }

    /// Overrides the neutral angle at construction.
    pub fn with_neutral(mut self, neutral: Degrees) -> Self {
        self.neutral = neutral;
        self
    }

    /// The tile's wire label.
    #[inline]
    pub fn id(&self) -> TileId {
        self.id
    }

    /// Where the actuator is wired.
    #[inline]
    pub fn address(&self) -> ChannelAddress {
        self.address
    }

    /// The resting angle.
    #[inline]
    pub fn neutral(&self) -> Degrees {
        self.neutral
    }

    /// Last angle this tile was told to take. Diagnostic only: the servo
    /// may not have reached it, and out-of-window requests do not update it.
    #[inline]
    pub fn last_commanded(&self) -> Option<Degrees> {
        self.last_commanded
    }

    /// Overwrites the neutral angle without moving the tile.
    ///
    /// Any value is accepted. A neutral outside the safety window makes
    /// [`return_to_neutral`](Self::return_to_neutral) a no-op on the
    /// hardware; [`TileRegistry::set_neutral`](crate::TileRegistry::set_neutral)
    /// warns about that case.
    pub fn set_neutral(&mut self, neutral: Degrees) {
        self.neutral = neutral;
    }

    /// Moves the tile to `angle` if it is inside the safety window.
    ///
    /// Out-of-window angles return [`MoveOutcome::Ignored`] and leave both
    /// the hardware and [`last_commanded`](Self::last_commanded) untouched.
    pub fn move_to<B: ServoBank>(
        &mut self,
        bank: &mut B,
        angle: Degrees,
    ) -> Result<MoveOutcome, B::Error> {
        if !is_safe_angle(angle) {
            tracing::debug!(tile = self.id, angle, "angle outside safe window, ignored");
            return Ok(MoveOutcome::Ignored(angle));
        }

        // Inside the window, so the cast cannot truncate.
        bank.set_angle(self.address, angle as u8)?;
        self.last_commanded = Some(angle);
        Ok(MoveOutcome::Moved(angle))
    }

    /// Moves the tile to its neutral angle.
    ///
    /// After a successful write (or a dropped out-of-window neutral),
    /// [`last_commanded`](Self::last_commanded) equals the neutral.
    pub fn return_to_neutral<B: ServoBank>(
        &mut self,
        bank: &mut B,
    ) -> Result<MoveOutcome, B::Error> {
        let outcome = self.move_to(bank, self.neutral)?;
        self.last_commanded = Some(self.neutral);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockBank;

    fn tile() -> Tile {
        Tile::new(7, ChannelAddress::new(1, 6))
    }

    #[test]
    fn new_tile_defaults() {
        let t = tile();
        assert_eq!(t.id(), 7);
        assert_eq!(t.address(), ChannelAddress::new(1, 6));
        assert_eq!(t.neutral(), DEFAULT_NEUTRAL);
        assert_eq!(t.last_commanded(), None);
    }

    #[test]
    fn move_inside_window_writes_hardware() {
        let mut bank = MockBank::new();
        let mut t = tile();

        assert_eq!(t.move_to(&mut bank, 120).unwrap(), MoveOutcome::Moved(120));
        assert_eq!(bank.angle_at(ChannelAddress::new(1, 6)), Some(120));
        assert_eq!(t.last_commanded(), Some(120));
    }

    #[test]
    fn move_window_edges_are_inclusive() {
        let mut bank = MockBank::new();
        let mut t = tile();

        assert!(t.move_to(&mut bank, MIN_SAFE_ANGLE).unwrap().is_moved());
        assert!(t.move_to(&mut bank, MAX_SAFE_ANGLE).unwrap().is_moved());
        assert_eq!(bank.writes.len(), 2);
    }

    #[test]
    fn move_outside_window_is_dropped() {
        let mut bank = MockBank::new();
        let mut t = tile();
        t.move_to(&mut bank, 100).unwrap();

        for angle in [-10, 0, 44, 151, 180, 1000] {
            assert_eq!(t.move_to(&mut bank, angle).unwrap(), MoveOutcome::Ignored(angle));
        }

        assert_eq!(bank.writes.len(), 1);
        assert_eq!(t.last_commanded(), Some(100));
    }

    #[test]
    fn return_to_neutral_uses_updated_value() {
        let mut bank = MockBank::new();
        let mut t = tile().with_neutral(80);

        t.set_neutral(110);
        t.return_to_neutral(&mut bank).unwrap();

        assert_eq!(bank.angle_at(t.address()), Some(110));
        assert_eq!(t.last_commanded(), Some(t.neutral()));
    }

    #[test]
    fn set_neutral_does_not_move() {
        let mut bank = MockBank::new();
        let mut t = tile();
        t.set_neutral(100);
        assert!(bank.writes.is_empty());
    }

    #[test]
    fn unreachable_neutral_still_tracks_last_commanded() {
        let mut bank = MockBank::new();
        let mut t = tile();
        t.set_neutral(20);

        let outcome = t.return_to_neutral(&mut bank).unwrap();

        assert_eq!(outcome, MoveOutcome::Ignored(20));
        assert!(bank.writes.is_empty());
        assert_eq!(t.last_commanded(), Some(20));
    }

    #[test]
    fn hardware_error_propagates_and_keeps_state() {
        let mut bank = MockBank::new();
        let mut t = tile();
        bank.fail_channel(t.address());

        assert!(t.move_to(&mut bank, 100).is_err());
        assert!(t.return_to_neutral(&mut bank).is_err());
        assert_eq!(t.last_commanded(), None);
    }

    #[test]
    fn move_outcome_accessors() {
        assert_eq!(MoveOutcome::Moved(90).angle(), 90);
        assert_eq!(MoveOutcome::Ignored(200).angle(), 200);
        assert!(!MoveOutcome::Ignored(200).is_moved());
    }
}
