//! Line-oriented operator console.
//!
//! The console walks a cursor over the tiles and turns one line of operator
//! input into one action. It does no I/O: the caller prints
//! [`Console::prompt`], reads a line, feeds it to [`Console::handle_line`],
//! and prints the returned [`Reply`].
//!
//! # Manual mode
//!
//! | Input | Action |
//! |-------|--------|
//! | `n` | next tile (quits on the last tile) |
//! | `b` | previous tile |
//! | `q` | quit |
//! | `p` | open the routine menu |
//! | `c` | store the tile's last angle as its neutral, then advance |
//! | `go=ID` | jump to tile `ID` |
//! | `+N` / `-N` | move to neutral plus or minus `N` |
//! | `N` | move to angle `N` |
//!
//! # Routine menu
//!
//! `1` resets every tile, `2` asks for sweep parameters
//! (`+/-deg,delay,lower-upper`), `3` runs the wave. Anything else returns to
//! manual mode.
//!
//! Each routine first clears the engine's
//! [`CancelToken`](crate::motion::CancelToken), so a stop request only ends
//! the routine that is running when it arrives.
//!
//! # Example
//!
//! ```rust
//! use rs_tilewall::console::Console;
//! use rs_tilewall::config::MotionConfig;
//! use rs_tilewall::hal::{MockBank, MockDelay};
//! use rs_tilewall::tables::{ConnectionTable, WaveTable};
//! use rs_tilewall::{MotionEngine, TileRegistry};
//!
//! let table = ConnectionTable::parse("0x40,1,0,90\n0x40,2,1,90\n", 7).unwrap();
//! let registry = TileRegistry::from_table(&table);
//! let engine = MotionEngine::new(MockBank::new(), MockDelay::new(), MotionConfig::default());
//! let mut console = Console::new(engine, registry, WaveTable::default());
//!
//! console.handle_line("+15");
//! console.handle_line("c");
//! assert_eq!(console.registry().by_id(1).unwrap().neutral(), 105);
//! assert_eq!(console.current_tile().id(), 2);
//!
//! let reply = console.handle_line("q");
//! assert!(!reply.keep_running);
//! ```

extern crate alloc;

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str::FromStr;

use crate::motion::{BatchReport, DegreeSpec, MotionEngine, MotionError, ParseError, SweepParams};
use crate::registry::TileRegistry;
use crate::tables::WaveTable;
use crate::tile::{Degrees, MoveOutcome, Tile, TileId};
use crate::traits::{DelayNs, ServoBank};

const MANUAL_HELP: &str = "Type 'n' to continue, any number to set the angle, 'q' to quit, \
'b' to go back, 'c' to set current angle as neutral, 'go=[num]' to go to the specified tile id, \
'+/-[angle]' to go the specified offset from neutral, 'p' to enter function running mode";

const ROUTINE_MENU: &str = "Function Mode Entered\n    1.) resetAll\n    2.) sweep\n    3.) wave";

const SWEEP_HELP: &str =
    "Enter the following parameters '+/-[num],[delay],[range - ie. 1-25 (max 1-108)]'";

// ============================================================================
// Commands
// ============================================================================

/// One manual-mode command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// `n`
    Next,
    /// `b`
    Back,
    /// `q`
    Quit,
    /// `p`
    Routines,
    /// `c`
    CaptureNeutral,
    /// `go=ID`
    GoTo(TileId),
    /// `+N` / `-N`, signed
    Offset(Degrees),
    /// Bare integer
    Angle(Degrees),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        match text {
            "n" => return Ok(Command::Next),
            "b" => return Ok(Command::Back),
            "q" => return Ok(Command::Quit),
            "p" => return Ok(Command::Routines),
            "c" => return Ok(Command::CaptureNeutral),
            _ => {}
        }

        if let Some(rest) = text.strip_prefix("go") {
            return rest
                .trim_start()
                .strip_prefix('=')
                .and_then(|id| id.trim().parse().ok())
                .map(Command::GoTo)
                .ok_or_else(|| ParseError::BadTileId(text.to_string()));
        }

        if text.starts_with(['+', '-']) {
            return DegreeSpec::parse(text).map(|spec| Command::Offset(spec.offset()));
        }

        text.parse()
            .map(Command::Angle)
            .map_err(|_| ParseError::UnknownCommand(text.to_string()))
    }
}

// ============================================================================
// Console
// ============================================================================

/// What the next line of input means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Single-tile commands.
    #[default]
    Manual,
    /// Waiting for a routine number.
    RoutineMenu,
    /// Waiting for sweep parameters.
    SweepEntry,
}

/// Output of one handled line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    /// Messages for the operator, in order.
    pub lines: Vec<String>,
    /// False once the operator quit.
    pub keep_running: bool,
}

impl Reply {
    fn running() -> Self {
        Self {
            lines: Vec::new(),
            keep_running: true,
        }
    }

    fn say(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// Interactive tile console over a motion engine.
pub struct Console<B: ServoBank, D: DelayNs> {
    engine: MotionEngine<B, D>,
    registry: TileRegistry,
    wave: WaveTable,
    cursor: usize,
    mode: Mode,
    neutral_changed: bool,
}

impl<B: ServoBank, D: DelayNs> Console<B, D> {
    /// Starts in manual mode on the first tile.
    pub fn new(engine: MotionEngine<B, D>, registry: TileRegistry, wave: WaveTable) -> Self {
        Self {
            engine,
            registry,
            wave,
            cursor: 0,
            mode: Mode::Manual,
            neutral_changed: false,
        }
    }

    /// The motion engine.
    pub fn engine(&self) -> &MotionEngine<B, D> {
        &self.engine
    }

    /// The tiles.
    pub fn registry(&self) -> &TileRegistry {
        &self.registry
    }

    /// What the next line will be read as.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The tile under the cursor.
    pub fn current_tile(&self) -> &Tile {
        // The cursor only ever moves within 0..len and a registry is never empty.
        &self.registry.tiles()[self.cursor]
    }

    /// Text to show before reading the next line.
    pub fn prompt(&self) -> String {
        match self.mode {
            Mode::Manual => format!(
                "Currently on tile #{}\n{}",
                self.current_tile().id(),
                MANUAL_HELP
            ),
            Mode::RoutineMenu => ROUTINE_MENU.to_string(),
            Mode::SweepEntry => SWEEP_HELP.to_string(),
        }
    }

    /// Handles one line of operator input.
    pub fn handle_line(&mut self, line: &str) -> Reply {
        let mut reply = Reply::running();
        match self.mode {
            Mode::Manual => match line.parse::<Command>() {
                Ok(command) => self.run(command, &mut reply),
                Err(e) => {
                    tracing::debug!(input = line, error = %e, "rejected command");
                    reply.say(format!("Error: {e}"));
                }
            },
            Mode::RoutineMenu => self.choose_routine(line.trim(), &mut reply),
            Mode::SweepEntry => {
                self.mode = Mode::Manual;
                match SweepParams::from_line(line) {
                    Ok(params) => {
                        self.arm_cancel();
                        reply.say("Starting Sweep");
                        let report = self.engine.sweep(&mut self.registry, &params);
                        reply.say(summarize("Sweep", &report));
                    }
                    Err(e) => reply.say(format!("Error: {e}")),
                }
            }
        }

        if !reply.keep_running {
            self.finish(&mut reply);
        }
        reply
    }

    fn run(&mut self, command: Command, reply: &mut Reply) {
        let last = self.registry.len().saturating_sub(1);
        match command {
            Command::Next if self.cursor == last => reply.keep_running = false,
            Command::Next => self.cursor += 1,
            Command::Back => self.cursor = self.cursor.saturating_sub(1),
            Command::Quit => reply.keep_running = false,
            Command::Routines => self.mode = Mode::RoutineMenu,
            Command::GoTo(id) => match self.registry.index_of(id) {
                Some(idx) => self.cursor = idx,
                None => reply.say(format!("Error: no tile #{id}")),
            },
            Command::CaptureNeutral => self.capture_neutral(reply),
            Command::Offset(offset) => {
                let angle = self.current_tile().neutral().saturating_add(offset);
                self.move_current(angle, reply);
            }
            Command::Angle(angle) => self.move_current(angle, reply),
        }
    }

    fn move_current(&mut self, angle: Degrees, reply: &mut Reply) {
        let id = self.current_tile().id();
        match self.engine.move_tile(&mut self.registry, id, angle) {
            Ok(MoveOutcome::Moved(angle)) => {
                reply.say(format!("Moved tile {id} to {angle} degrees"));
            }
            Ok(MoveOutcome::Ignored(angle)) => {
                reply.say(format!("{angle} degrees is outside the safe range, tile {id} not moved"));
            }
            Err(MotionError::UnknownTile(_)) => reply.say(format!("Error: no tile #{id}")),
            Err(MotionError::Hardware(e)) => {
                tracing::warn!(tile = id, error = ?e, "manual move failed");
                reply.say(format!("Error moving tile #{id}"));
            }
        }
    }

    fn capture_neutral(&mut self, reply: &mut Reply) {
        let tile = self.current_tile();
        let (id, captured) = (tile.id(), tile.last_commanded());
        let Some(angle) = captured else {
            reply.say(format!("Tile #{id} has not been moved yet, neutral unchanged"));
            return;
        };

        if self.registry.set_neutral(id, angle) == Some(false) {
            reply.say(format!("Warning: {angle} is outside the safe range"));
        }
        self.neutral_changed = true;
        reply.say(format!("Set tile #{id}'s neutral position to {angle}"));

        if self.cursor + 1 < self.registry.len() {
            self.cursor += 1;
        }
    }

    fn choose_routine(&mut self, choice: &str, reply: &mut Reply) {
        self.mode = Mode::Manual;
        match choice {
            "1" => {
                self.arm_cancel();
                reply.say("Resetting tiles.");
                let report = self.engine.reset_all(&mut self.registry);
                reply.say(summarize("Tile resetting", &report));
            }
            "2" => self.mode = Mode::SweepEntry,
            "3" => {
                self.arm_cancel();
                let report = self.engine.wave(&mut self.registry, &self.wave);
                reply.say(summarize("Wave", &report));
            }
            _ => {}
        }
    }

    /// Clears a stop request left over from before this routine.
    fn arm_cancel(&self) {
        if let Some(token) = self.engine.cancel_token() {
            token.reset();
        }
    }

    fn finish(&self, reply: &mut Reply) {
        if !self.neutral_changed {
            return;
        }
        for tile in &self.registry {
            reply.say(format!("Tile #{} Neutral:{}", tile.id(), tile.neutral()));
        }
    }
}

fn summarize<E>(routine: &str, report: &BatchReport<E>) -> String {
    let failed: Vec<String> = report
        .failures()
        .map(|e| format!("#{}", e.id))
        .collect();
    let status = if report.cancelled { "stopped" } else { "completed" };
    let mut line = format!(
        "{routine} {status}: {} moved, {} ignored, {} failed",
        report.moved(),
        report.ignored(),
        failed.len()
    );
    if !failed.is_empty() {
        line.push_str(&format!(" ({})", failed.join(", ")));
    }
    line
}
