//! Group motion routines over the whole wall.
//!
//! [`MotionEngine`] owns the servo bank and the delay source and drives
//! tiles from a [`TileRegistry`] one at a time. Every routine is a linear
//! sequence of (move, pause) pairs. The pauses keep the shared servo power
//! rail from browning out, so they elapse even after a failed move.
//!
//! # Routines
//!
//! | Routine | Tiles | Pause |
//! |---------|-------|-------|
//! | [`reset_all`](MotionEngine::reset_all) | every tile, registry order | 50 ms after each |
//! | [`sweep`](MotionEngine::sweep) | IDs `lower..upper` | operator-chosen, after each |
//! | [`wave`](MotionEngine::wave) | row by row | 5 ms per tile, 100 ms per step |
//!
//! A fault on one tile never aborts a routine. Each routine returns a
//! [`BatchReport`] with one [`TileResult`] per attempted move.
//!
//! # Example
//!
//! ```rust
//! use rs_tilewall::{MotionEngine, SweepParams, Tile, TileRegistry};
//! use rs_tilewall::config::MotionConfig;
//! use rs_tilewall::hal::{MockBank, MockDelay};
//! use rs_tilewall::traits::ChannelAddress;
//!
//! let tiles = (1..=4).map(|id| Tile::new(id, ChannelAddress::new(0, id as u8 - 1))).collect();
//! let mut registry = TileRegistry::new(tiles).unwrap();
//! let mut engine = MotionEngine::new(MockBank::new(), MockDelay::new(), MotionConfig::default());
//!
//! let params = SweepParams::parse("+10", "0.5", "1-4").unwrap();
//! let report = engine.sweep(&mut registry, &params);
//!
//! assert_eq!(report.ids().collect::<Vec<_>>(), vec![1, 2, 3]);
//! assert_eq!(engine.bank().writes.len(), 3);
//! assert_eq!(engine.delay().total_us(), 3 * 500_000);
//! ```

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::MotionConfig;
use crate::registry::TileRegistry;
use crate::tables::WaveTable;
use crate::tile::{Degrees, MoveOutcome, Tile, TileId};
use crate::traits::{DelayNs, ServoBank};

// ============================================================================
// Errors
// ============================================================================

/// Failure of a single-tile operation.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MotionError<E> {
    /// No tile carries this ID.
    #[error("no tile with id {0}")]
    UnknownTile(TileId),
    /// The servo bank rejected the write.
    #[error("hardware error: {0:?}")]
    Hardware(E),
}

/// Malformed operator input for a routine or command.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Wrong number of comma-separated fields.
    #[error("expected {expected} comma-separated fields, found {found}")]
    FieldCount {
        /// Fields required.
        expected: usize,
        /// Fields present.
        found: usize,
    },
    /// A signed offset whose magnitude is not a whole number.
    #[error("offset `{0}` is not +N or -N")]
    BadOffset(String),
    /// A tile range not of the form `lower-upper`.
    #[error("tile range `{0}` is not lower-upper")]
    BadRange(String),
    /// A tile ID that is not a whole number.
    #[error("`{0}` is not a tile id")]
    BadTileId(String),
    /// Input that matches no command.
    #[error("unrecognized input `{0}`")]
    UnknownCommand(String),
}

// ============================================================================
// Batch Reporting
// ============================================================================

/// Why a tile inside a batch routine was not driven.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TileFault<E> {
    /// The ID is not in the registry.
    #[error("unknown tile")]
    UnknownTile,
    /// The servo bank rejected the write.
    #[error("hardware error: {0:?}")]
    Hardware(E),
}

/// What happened to one tile during a batch routine.
#[derive(Debug, PartialEq, Eq)]
pub enum TileOutcome<E> {
    /// The angle was written.
    Moved(Degrees),
    /// The angle was outside the safety window and was dropped.
    Ignored(Degrees),
    /// The tile could not be driven.
    Failed(TileFault<E>),
}

impl<E> TileOutcome<E> {
    fn from_move(result: Result<MoveOutcome, E>) -> Self {
        match result {
            Ok(MoveOutcome::Moved(angle)) => TileOutcome::Moved(angle),
            Ok(MoveOutcome::Ignored(angle)) => TileOutcome::Ignored(angle),
            Err(e) => TileOutcome::Failed(TileFault::Hardware(e)),
        }
    }

    /// Returns true for [`TileOutcome::Failed`].
    pub fn is_failed(&self) -> bool {
        matches!(self, TileOutcome::Failed(_))
    }
}

/// One entry of a [`BatchReport`].
#[derive(Debug, PartialEq, Eq)]
pub struct TileResult<E> {
    /// The tile that was addressed.
    pub id: TileId,
    /// What happened.
    pub outcome: TileOutcome<E>,
}

/// Per-tile outcomes of a batch routine, in the order they were attempted.
#[derive(Debug, PartialEq, Eq)]
pub struct BatchReport<E> {
    /// Every attempted move.
    pub entries: Vec<TileResult<E>>,
    /// The routine stopped early on a cancel request.
    pub cancelled: bool,
}

impl<E> Default for BatchReport<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cancelled: false,
        }
    }
}

impl<E> BatchReport<E> {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, id: TileId, outcome: TileOutcome<E>) {
        self.entries.push(TileResult { id, outcome });
    }

    /// Number of attempted moves.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was attempted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// IDs in the order they were addressed.
    pub fn ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Entries whose tile could not be driven.
    pub fn failures(&self) -> impl Iterator<Item = &TileResult<E>> + '_ {
        self.entries.iter().filter(|e| e.outcome.is_failed())
    }

    /// Number of writes that reached the hardware.
    pub fn moved(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, TileOutcome::Moved(_)))
            .count()
    }

    /// Number of moves dropped by the safety window.
    pub fn ignored(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, TileOutcome::Ignored(_)))
            .count()
    }

    /// Ran to completion with no failed tile.
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.failures().next().is_none()
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative stop request shared between the operator and the engine.
///
/// The engine checks the token before every tile step. Once cancelled the
/// token stays cancelled until [`reset`](Self::reset).
///
/// ```rust
/// use rs_tilewall::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// token.reset();
/// assert!(!handle.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the running routine stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clears a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ============================================================================
// Sweep Parameters
// ============================================================================

/// Offset from each tile's neutral used by a sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DegreeSpec {
    /// `+N`: neutral plus N.
    Raise(Degrees),
    /// `-N`: neutral minus N.
    Lower(Degrees),
    /// No sign given. Taken as the absolute angle 0, which the safety
    /// window drops, so no tile moves.
    Unsigned,
}

impl DegreeSpec {
    /// Parses `+N`, `-N`, or anything unsigned.
    ///
    /// ```rust
    /// use rs_tilewall::DegreeSpec;
    ///
    /// assert_eq!(DegreeSpec::parse("+10").unwrap().offset(), 10);
    /// assert_eq!(DegreeSpec::parse("-7").unwrap().offset(), -7);
    /// assert_eq!(DegreeSpec::parse("15").unwrap(), DegreeSpec::Unsigned);
    /// assert!(DegreeSpec::parse("+ten").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        let bad = || ParseError::BadOffset(text.to_string());

        if let Some(rest) = text.strip_prefix('+') {
            parse_magnitude(rest).map(DegreeSpec::Raise).ok_or_else(bad)
        } else if let Some(rest) = text.strip_prefix('-') {
            parse_magnitude(rest).map(DegreeSpec::Lower).ok_or_else(bad)
        } else {
            tracing::warn!(spec = text, "sweep offset has no sign, tiles will not move");
            Ok(DegreeSpec::Unsigned)
        }
    }

    /// Signed offset to add to a tile's neutral. Zero when unsigned.
    pub fn offset(&self) -> Degrees {
        match *self {
            DegreeSpec::Raise(n) => n,
            DegreeSpec::Lower(n) => -n,
            DegreeSpec::Unsigned => 0,
        }
    }

    /// Angle a tile with this neutral is sent to.
    ///
    /// ```rust
    /// use rs_tilewall::DegreeSpec;
    ///
    /// assert_eq!(DegreeSpec::Raise(10).target(90), 100);
    /// assert_eq!(DegreeSpec::Lower(10).target(90), 80);
    /// assert_eq!(DegreeSpec::Unsigned.target(90), 0);
    /// ```
    pub fn target(&self, neutral: Degrees) -> Degrees {
        match *self {
            DegreeSpec::Unsigned => 0,
            _ => neutral.saturating_add(self.offset()),
        }
    }
}

fn parse_magnitude(text: &str) -> Option<Degrees> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Half-open range of tile IDs, `lower` inclusive, `upper` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdRange {
    /// First ID addressed.
    pub lower: TileId,
    /// One past the last ID addressed.
    pub upper: TileId,
}

impl IdRange {
    /// Creates a range over `lower..upper`.
    pub fn new(lower: TileId, upper: TileId) -> Self {
        Self { lower, upper }
    }

    /// Every ID of a registry with `count` tiles.
    pub fn all(count: usize) -> Self {
        let upper = TileId::try_from(count)
            .unwrap_or(TileId::MAX)
            .saturating_add(1);
        Self { lower: 1, upper }
    }

    /// Parses `lower-upper`, e.g. `1-108` for a full 107-tile wall.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        let bad = || ParseError::BadRange(text.to_string());

        let (lower, upper) = text.split_once('-').ok_or_else(bad)?;
        let lower = lower.trim().parse().map_err(|_| bad())?;
        let upper = upper.trim().parse().map_err(|_| bad())?;
        Ok(Self { lower, upper })
    }

    /// IDs in ascending order. Empty when `lower >= upper`.
    pub fn ids(&self) -> Range<TileId> {
        self.lower..self.upper
    }
}

/// Everything a sweep needs, parsed from operator text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepParams {
    /// Offset from each tile's neutral.
    pub offset: DegreeSpec,
    /// Pause after each tile in microseconds. `None` uses the configured
    /// default.
    pub delay_us: Option<u32>,
    /// Tiles to sweep.
    pub range: IdRange,
}

impl SweepParams {
    /// Parses the three sweep fields.
    ///
    /// `delay` is in seconds. A delay that is not a positive finite number
    /// is replaced by the configured default with a warning; it never fails
    /// the sweep. A bad offset or range does.
    pub fn parse(degree: &str, delay: &str, range: &str) -> Result<Self, ParseError> {
        Ok(Self {
            offset: DegreeSpec::parse(degree)?,
            delay_us: parse_delay_us(delay),
            range: IdRange::parse(range)?,
        })
    }

    /// Parses `offset,delay,lower-upper`.
    ///
    /// ```rust
    /// use rs_tilewall::{DegreeSpec, IdRange, SweepParams};
    ///
    /// let params = SweepParams::from_line("-5, 0.1, 10-20").unwrap();
    /// assert_eq!(params.offset, DegreeSpec::Lower(5));
    /// assert_eq!(params.delay_us, Some(100_000));
    /// assert_eq!(params.range, IdRange::new(10, 20));
    /// ```
    pub fn from_line(line: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = line.split(',').collect();
        match fields.as_slice() {
            [degree, delay, range] => Self::parse(degree, delay, range),
            _ => Err(ParseError::FieldCount {
                expected: 3,
                found: fields.len(),
            }),
        }
    }
}

fn parse_delay_us(text: &str) -> Option<u32> {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => {
            let us = secs * 1_000_000.0 + 0.5;
            if us >= f64::from(u32::MAX) {
                tracing::warn!(delay = text, max_us = u32::MAX, "sweep delay too long, capped");
                return Some(u32::MAX);
            }
            // Rounded to the nearest microsecond.
            Some(us as u32)
        }
        Ok(_) => {
            tracing::warn!(delay = text, "sweep delay must be positive, using default");
            None
        }
        Err(_) => {
            tracing::warn!(delay = text, "sweep delay is not a number, using default");
            None
        }
    }
}

// ============================================================================
// Wave Deflection
// ============================================================================

/// First tile of the lower reversed block.
pub const REVERSED_BLOCK_START: TileId = 57;

/// Last tile of the lower reversed block.
pub const REVERSED_BLOCK_END: TileId = 70;

/// Every tile from here on is mounted reversed.
pub const REVERSED_FROM: TileId = 82;

/// Returns true for tiles mounted upside down on the grid.
#[inline]
pub const fn is_reversed(id: TileId) -> bool {
    (id >= REVERSED_BLOCK_START && id <= REVERSED_BLOCK_END) || id >= REVERSED_FROM
}

/// Signed wave deflection for tile `id`.
///
/// Reversed tiles deflect the other way so the whole wall ripples in the
/// same visual direction.
///
/// ```rust
/// use rs_tilewall::motion::wave_deflection;
///
/// assert_eq!(wave_deflection(56, 10), 10);
/// assert_eq!(wave_deflection(57, 10), -10);
/// assert_eq!(wave_deflection(71, 10), 10);
/// assert_eq!(wave_deflection(82, 10), -10);
/// ```
#[inline]
pub const fn wave_deflection(id: TileId, magnitude: Degrees) -> Degrees {
    if is_reversed(id) {
        -magnitude
    } else {
        magnitude
    }
}

// ============================================================================
// Motion Engine
// ============================================================================

/// Runs single-tile commands and group routines against a servo bank.
///
/// # Type Parameters
///
/// - `B`: the servo hardware ([`ServoBank`])
/// - `D`: the pause source ([`DelayNs`])
pub struct MotionEngine<B: ServoBank, D: DelayNs> {
    bank: B,
    delay: D,
    config: MotionConfig,
    cancel: Option<CancelToken>,
}

impl<B: ServoBank, D: DelayNs> MotionEngine<B, D> {
    /// Creates an engine with no cancel token.
    pub fn new(bank: B, delay: D, config: MotionConfig) -> Self {
        Self {
            bank,
            delay,
            config,
            cancel: None,
        }
    }

    /// Lets `token` stop routines between tile steps.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The token routines check between tile steps, if any.
    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }

    /// The servo bank.
    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// Mutable servo bank.
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// The pause source.
    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Active pacing.
    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Gives back the bank and the pause source.
    pub fn into_parts(self) -> (B, D) {
        (self.bank, self.delay)
    }

    // ------------------------------------------------------------------------
    // Single tile
    // ------------------------------------------------------------------------

    /// Moves tile `id` to `angle`, subject to the safety window.
    pub fn move_tile(
        &mut self,
        registry: &mut TileRegistry,
        id: TileId,
        angle: Degrees,
    ) -> Result<MoveOutcome, MotionError<B::Error>> {
        let tile = registry.by_id_mut(id).ok_or(MotionError::UnknownTile(id))?;
        tile.move_to(&mut self.bank, angle)
            .map_err(MotionError::Hardware)
    }

    /// Sends tile `id` to its neutral angle.
    pub fn neutral_tile(
        &mut self,
        registry: &mut TileRegistry,
        id: TileId,
    ) -> Result<MoveOutcome, MotionError<B::Error>> {
        let tile = registry.by_id_mut(id).ok_or(MotionError::UnknownTile(id))?;
        tile.return_to_neutral(&mut self.bank)
            .map_err(MotionError::Hardware)
    }

    // ------------------------------------------------------------------------
    // Group routines
    // ------------------------------------------------------------------------

    /// Sends every tile to neutral in registry order.
    ///
    /// Pauses `reset_delay_ms` after every tile, failed or not.
    pub fn reset_all(&mut self, registry: &mut TileRegistry) -> BatchReport<B::Error> {
        tracing::info!(tiles = registry.len(), "resetting tiles");
        let mut report = BatchReport::new();

        for tile in registry.iter_mut() {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let outcome = TileOutcome::from_move(tile.return_to_neutral(&mut self.bank));
            log_outcome(tile.id(), &outcome);
            report.push(tile.id(), outcome);
            self.delay.delay_ms(self.config.reset_delay_ms);
        }

        log_summary("reset", &report);
        report
    }

    /// Moves each tile in `params.range` to its neutral plus the offset,
    /// in ascending ID order.
    ///
    /// IDs with no tile are reported as [`TileFault::UnknownTile`]; the
    /// pause still elapses. An unsigned offset aims every tile at 0°, so
    /// each one is reported as ignored.
    pub fn sweep(
        &mut self,
        registry: &mut TileRegistry,
        params: &SweepParams,
    ) -> BatchReport<B::Error> {
        let delay_us = params
            .delay_us
            .unwrap_or_else(|| self.config.sweep_default_delay_ms.saturating_mul(1000));
        let spec = params.offset;
        let offset = spec.offset();
        tracing::info!(
            lower = params.range.lower,
            upper = params.range.upper,
            offset,
            delay_us,
            "starting sweep"
        );

        let mut report = BatchReport::new();
        for id in params.range.ids() {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let outcome = self.drive(registry, id, |tile| spec.target(tile.neutral()));
            report.push(id, outcome);
            self.delay.delay_us(delay_us);
        }

        log_summary("sweep", &report);
        report
    }

    /// Ripples a deflection across the rows of `wave`.
    ///
    /// Runs `rows + 2` steps. At step `i`, row `i - 2` returns to neutral
    /// and then row `i` deflects by [`wave_deflection`]. Each row therefore
    /// holds its deflection for two steps. Every tile move is followed by
    /// `wave_tile_delay_ms`, every step by `wave_row_delay_ms`.
    pub fn wave(&mut self, registry: &mut TileRegistry, wave: &WaveTable) -> BatchReport<B::Error> {
        let rows = wave.rows();
        let magnitude = self.config.wave_deflection;
        tracing::info!(rows = rows.len(), magnitude, "starting wave");

        let mut report = BatchReport::new();
        'steps: for step in 0..rows.len() + 2 {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if let Some(row) = step.checked_sub(2).and_then(|r| rows.get(r)) {
                for &id in row {
                    if self.is_cancelled() {
                        report.cancelled = true;
                        break 'steps;
                    }
                    let outcome = self.drive(registry, id, Tile::neutral);
                    report.push(id, outcome);
                    self.delay.delay_ms(self.config.wave_tile_delay_ms);
                }
            }

            if let Some(row) = rows.get(step) {
                for &id in row {
                    if self.is_cancelled() {
                        report.cancelled = true;
                        break 'steps;
                    }
                    let outcome = self.drive(registry, id, |tile| {
                        tile.neutral().saturating_add(wave_deflection(id, magnitude))
                    });
                    report.push(id, outcome);
                    self.delay.delay_ms(self.config.wave_tile_delay_ms);
                }
            }

            self.delay.delay_ms(self.config.wave_row_delay_ms);
        }

        log_summary("wave", &report);
        report
    }

    fn drive(
        &mut self,
        registry: &mut TileRegistry,
        id: TileId,
        target: impl FnOnce(&Tile) -> Degrees,
    ) -> TileOutcome<B::Error> {
        let outcome = match registry.by_id_mut(id) {
            Some(tile) => {
                let angle = target(tile);
                TileOutcome::from_move(tile.move_to(&mut self.bank, angle))
            }
            None => TileOutcome::Failed(TileFault::UnknownTile),
        };
        log_outcome(id, &outcome);
        outcome
    }

    fn is_cancelled(&self) -> bool {
        let cancelled = self.cancel.as_ref().is_some_and(CancelToken::is_cancelled);
        if cancelled {
            tracing::info!("routine cancelled");
        }
        cancelled
    }
}

fn log_outcome<E: core::fmt::Debug>(id: TileId, outcome: &TileOutcome<E>) {
    match outcome {
        TileOutcome::Moved(angle) => tracing::info!(tile = id, angle, "moved tile"),
        TileOutcome::Ignored(angle) => tracing::debug!(tile = id, angle, "move ignored"),
        TileOutcome::Failed(fault) => tracing::warn!(tile = id, ?fault, "error moving tile"),
    }
}

fn log_summary<E>(routine: &'static str, report: &BatchReport<E>) {
    let failed = report.failures().count();
    if report.cancelled {
        tracing::info!(routine, attempted = report.len(), failed, "routine stopped early");
    } else if failed > 0 {
        tracing::warn!(routine, attempted = report.len(), failed, "routine completed with failures");
    } else {
        tracing::info!(routine, attempted = report.len(), "routine completed");
    }
}

// ============================================================================
// Tests
// ============================================================================
