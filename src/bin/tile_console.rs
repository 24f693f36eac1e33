//! Interactive tile wall console on simulated hardware.
//!
//! Loads the connection and wave tables, runs the boot sequence against mock
//! power outputs, then reads operator commands from stdin. Servo writes go to
//! a [`MockBank`], so every routine can be rehearsed without the wall.
//!
//! # Usage
//!
//! ```sh
//! cargo run --bin tile_console --features cli -- \
//!     --connections connections_final.txt --wave wave.txt
//! ```
//!
//! Logging follows `RUST_LOG` (default `info`; `--verbose` for `debug`).
//! Ctrl-C stops a running reset, sweep or wave after the current tile.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rs_tilewall::hal::{MockBank, MockLed, MockPin, StdDelay};
use rs_tilewall::{
    boot, BootConfig, BootError, CancelToken, Config, ConnectionTable, Console, MotionEngine,
    PowerSequencer, ServoBank, TableConfig, TileRegistry, WaveTable,
};

#[derive(Debug, Parser)]
#[command(name = "tile_console", about = "Operator console for the servo tile wall")]
struct Args {
    /// TOML configuration file (defaults apply to anything it leaves out)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Connection table, overrides the configured path
    #[arg(long)]
    connections: Option<String>,

    /// Wave grouping table, overrides the configured path
    #[arg(long)]
    wave: Option<String>,

    /// Number of PWM driver boards, overrides the configured count
    #[arg(long)]
    boards: Option<u8>,

    /// Skip the power-up waits
    #[arg(long)]
    fast_boot: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = load_config(&args)?;
    tracing::info!(device = config.device.name.as_str(), "starting tile console");

    let cancel = CancelToken::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || handler.cancel()).context("installing Ctrl-C handler")?;
    tracing::info!("Ctrl-C stops a running routine, q quits");

    let mut power = PowerSequencer::new(MockPin::named("enable"), MockPin::named("relay"));
    let mut led = MockLed::new();
    let timing = if args.fast_boot {
        BootConfig::immediate()
    } else {
        config.boot.clone()
    };

    tracing::info!(wait_ms = timing.total_ms(), "running power-up sequence");
    let (registry, wave) = boot(&mut power, &mut led, &mut StdDelay, &timing, || {
        load_tables(&config.tables)
    })
    .map_err(|e| match e {
        BootError::Load(e) => e,
        BootError::Power(e) => anyhow::Error::new(e).context("power sequencing failed"),
    })
    .inspect_err(|e| tracing::error!("{e:#}"))?;

    let engine = MotionEngine::new(MockBank::new(), StdDelay, config.motion.clone())
        .with_cancel_token(cancel);
    let mut console = Console::new(engine, registry, wave);
    serve(&mut console, &mut power, io::stdin().lock(), io::stdout())
}

/// Runs the console, then powers down whether or not the session failed.
fn serve<B, R, W>(
    console: &mut Console<B, StdDelay>,
    power: &mut PowerSequencer<MockPin, MockPin>,
    input: R,
    output: W,
) -> Result<()>
where
    B: ServoBank,
    R: BufRead,
    W: Write,
{
    let session = run(console, input, output)
        .inspect_err(|e| tracing::error!("console stopped: {e:#}"));
    let shutdown = power.shutdown().context("power down failed");
    session.and(shutdown)
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => Config::default(),
    };

    let mut tables = config.tables.clone();
    if let Some(path) = &args.connections {
        tables = tables.with_connections_path(path);
    }
    if let Some(path) = &args.wave {
        tables = tables.with_wave_path(path);
    }
    if let Some(boards) = args.boards {
        tables = tables.with_boards(boards);
    }
    config = config.with_tables(tables);
    Ok(config)
}

fn load_tables(tables: &TableConfig) -> Result<(TileRegistry, WaveTable)> {
    tracing::info!("creating tile objects");
    let connections = read(tables.connections_path.as_str())?;
    let table = ConnectionTable::parse(&connections, tables.boards)
        .with_context(|| format!("invalid connection table {}", tables.connections_path))?;
    let registry = TileRegistry::from_table(&table);

    let wave_text = read(tables.wave_path.as_str())?;
    let wave = WaveTable::parse(&wave_text)
        .with_context(|| format!("invalid wave table {}", tables.wave_path))?;
    registry
        .validate_wave(&wave)
        .with_context(|| format!("invalid wave table {}", tables.wave_path))?;

    tracing::info!(tiles = registry.len(), rows = wave.len(), "tables loaded");
    Ok((registry, wave))
}

fn read(path: &str) -> Result<String> {
    fs::read_to_string(Path::new(path)).with_context(|| format!("reading {path}"))
}

fn run<B, R, W>(console: &mut Console<B, StdDelay>, input: R, mut output: W) -> Result<()>
where
    B: ServoBank,
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        writeln!(output, "\n{}", console.prompt())?;
        write!(output, "Enter command > ")?;
        output.flush()?;

        let Some(line) = lines.next().transpose()? else {
            tracing::info!("input closed");
            return Ok(());
        };

        let reply = console.handle_line(&line);
        for message in &reply.lines {
            writeln!(output, "{message}")?;
        }
        if !reply.keep_running {
            return Ok(());
        }
    }
}
