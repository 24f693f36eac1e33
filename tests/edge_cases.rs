//! Edge case and boundary condition tests for loading and moving tiles

use rs_tilewall::{
    boot,
    hal::{MockBank, MockDelay, MockI2c, MockLed, MockPin, Pca9685Bank, PinJournal},
    BootConfig, BootError, ChannelAddress, ConnectionTable, DegreeSpec, IdRange, LoadError,
    MotionConfig, MotionEngine, MotionError, MoveOutcome, ParseError, PowerSequencer, PowerState,
    SweepParams, TileFault, TileOutcome, TileRegistry, WaveTable,
};

fn registry(text: &str) -> TileRegistry {
    TileRegistry::from_table(&ConnectionTable::parse(text, 7).unwrap())
}

fn engine() -> MotionEngine<MockBank, MockDelay> {
    MotionEngine::new(MockBank::new(), MockDelay::new(), MotionConfig::default())
}

// ============================================================================
// Safety Window Boundaries
// ============================================================================

#[test]
fn window_edges_are_inclusive() {
    let mut reg = registry("0x40,1,0,90\n");
    let mut engine = engine();

    assert_eq!(engine.move_tile(&mut reg, 1, 45), Ok(MoveOutcome::Moved(45)));
    assert_eq!(engine.move_tile(&mut reg, 1, 150), Ok(MoveOutcome::Moved(150)));
    assert_eq!(engine.move_tile(&mut reg, 1, 44), Ok(MoveOutcome::Ignored(44)));
    assert_eq!(engine.move_tile(&mut reg, 1, 151), Ok(MoveOutcome::Ignored(151)));

    assert_eq!(engine.bank().writes_to(ChannelAddress::new(0, 0)), vec![45, 150]);
    assert_eq!(reg.by_id(1).unwrap().last_commanded(), Some(150));
}

#[test]
fn extreme_angles_never_reach_hardware() {
    let mut reg = registry("0x40,1,0,90\n");
    let mut engine = engine();

    for angle in [i32::MIN, -1, 0, 255, 256, i32::MAX] {
        assert_eq!(
            engine.move_tile(&mut reg, 1, angle),
            Ok(MoveOutcome::Ignored(angle))
        );
    }
    assert!(engine.bank().writes.is_empty());
}

#[test]
fn id_zero_and_past_end_are_unknown() {
    let mut reg = registry("0x40,1,0,90\n0x40,2,1,90\n");
    let mut engine = engine();

    assert_eq!(engine.move_tile(&mut reg, 0, 90), Err(MotionError::UnknownTile(0)));
    assert_eq!(engine.move_tile(&mut reg, 3, 90), Err(MotionError::UnknownTile(3)));
    assert_eq!(engine.neutral_tile(&mut reg, 2), Ok(MoveOutcome::Moved(90)));
}

// ============================================================================
// Neutral Changes
// ============================================================================

#[test]
fn neutral_change_applies_to_next_reset() {
    let mut reg = registry("0x40,1,0,90\n0x40,2,1,90\n");
    let mut engine = engine();

    assert_eq!(reg.set_neutral(2, 120), Some(true));
    engine.reset_all(&mut reg);

    assert_eq!(engine.bank().angle_at(ChannelAddress::new(0, 1)), Some(120));
}

#[test]
fn unreachable_neutral_is_stored_but_inert() {
    let mut reg = registry("0x40,1,0,90\n");
    let mut engine = engine();

    assert_eq!(reg.set_neutral(1, 170), Some(false));
    assert_eq!(reg.by_id(1).unwrap().neutral(), 170);
    assert_eq!(engine.neutral_tile(&mut reg, 1), Ok(MoveOutcome::Ignored(170)));
    assert!(engine.bank().writes.is_empty());
}

// ============================================================================
// Sweep Parameter Edge Cases
// ============================================================================

#[test]
fn unsigned_offset_moves_no_tile() {
    let mut reg = registry("0x40,1,0,80\n0x40,2,1,100\n");
    let mut engine = engine();

    let params = SweepParams::parse("10", "0.1", "1-3").unwrap();
    assert_eq!(params.offset, DegreeSpec::Unsigned);
    let report = engine.sweep(&mut reg, &params);

    assert_eq!(report.ids().collect::<Vec<_>>(), vec![1, 2]);
    assert!(report
        .entries
        .iter()
        .all(|e| e.outcome == TileOutcome::Ignored(0)));
    assert!(engine.bank().writes.is_empty());
    // Pacing is unchanged.
    assert_eq!(engine.delay().pauses_us, vec![100_000, 100_000]);
    assert_eq!(reg.by_id(1).unwrap().last_commanded(), None);
}

#[test]
fn empty_or_reversed_range_does_nothing() {
    let mut reg = registry("0x40,1,0,90\n0x40,2,1,90\n");
    let mut engine = engine();

    for range in ["2-2", "3-1"] {
        let params = SweepParams::parse("+5", "0.1", range).unwrap();
        let report = engine.sweep(&mut reg, &params);
        assert!(report.is_empty());
        assert!(report.is_clean());
    }
    assert!(engine.bank().writes.is_empty());
    assert!(engine.delay().pauses_us.is_empty());
}

#[test]
fn range_starting_at_zero_reports_tile_zero() {
    let mut reg = registry("0x40,1,0,90\n");
    let mut engine = engine();

    let params = SweepParams::parse("+5", "0.1", "0-2").unwrap();
    let report = engine.sweep(&mut reg, &params);

    assert_eq!(report.entries[0].id, 0);
    assert_eq!(report.entries[0].outcome, TileOutcome::Failed(TileFault::UnknownTile));
    assert_eq!(report.entries[1].outcome, TileOutcome::Moved(95));
}

#[test]
fn malformed_sweep_fields_are_errors() {
    assert!(matches!(
        SweepParams::parse("+ten", "0.1", "1-5"),
        Err(ParseError::BadOffset(_))
    ));
    assert!(matches!(
        SweepParams::parse("+10", "0.1", "1..5"),
        Err(ParseError::BadRange(_))
    ));
    assert!(matches!(
        SweepParams::parse("+10", "0.1", "-5"),
        Err(ParseError::BadRange(_))
    ));
    assert_eq!(IdRange::parse("1-108"), Ok(IdRange::new(1, 108)));
}

// ============================================================================
// Table Loading
// ============================================================================

#[test]
fn connection_table_with_gaps_is_rejected() {
    let err = ConnectionTable::parse("0x40,1,0,90\n0x40,2,1,90\n0x40,4,2,90\n", 7).unwrap_err();
    assert_eq!(
        err,
        LoadError::OutOfOrder {
            line: 3,
            expected: 3,
            found: 4
        }
    );
}

#[test]
fn connection_table_board_limit_follows_config() {
    let text = "0x40,1,0,90\n0x43,2,0,90\n";
    assert!(ConnectionTable::parse(text, 7).is_ok());
    assert_eq!(
        ConnectionTable::parse(text, 3),
        Err(LoadError::BoardOutOfRange {
            line: 2,
            board: 3,
            boards: 3
        })
    );
}

#[test]
fn wave_table_with_unknown_tile_fails_validation() {
    let reg = registry("0x40,1,0,90\n0x40,2,1,90\n");
    let wave = WaveTable::parse("1\n2,3\n").unwrap();

    assert_eq!(
        reg.validate_wave(&wave),
        Err(LoadError::UnknownWaveTile {
            row: 1,
            id: 3,
            count: 2
        })
    );
}

#[test]
fn unvalidated_wave_reports_unknown_tiles() {
    let mut reg = registry("0x40,1,0,90\n");
    let mut engine = engine();

    let report = engine.wave(&mut reg, &WaveTable::from_rows(vec![vec![1, 9]]));

    let failed: Vec<_> = report.failures().map(|e| e.id).collect();
    assert_eq!(failed, vec![9, 9]);
    assert_eq!(engine.bank().writes.len(), 2);
}

#[test]
fn wave_table_trailing_comma_is_an_error() {
    assert!(matches!(
        WaveTable::parse("1,2,\n"),
        Err(LoadError::BadNumber { line: 1, .. })
    ));
}

// ============================================================================
// Hardware Stack
// ============================================================================

#[test]
fn engine_over_pca9685_bank() {
    let mut reg = registry("0x40,1,0,90\n0x41,2,15,135\n");
    let mut bank = Pca9685Bank::new([MockI2c::new(), MockI2c::new()]).unwrap();
    bank.init(&mut MockDelay::new()).unwrap();

    let mut engine = MotionEngine::new(bank, MockDelay::new(), MotionConfig::default());
    assert!(engine.reset_all(&mut reg).is_clean());

    let (bank, _) = engine.into_parts();
    let buses = bank.release();
    // Board 1 channel 15 registers start at 0x06 + 4 * 15
    let last = buses[1].writes_to(0x41).last().map(|w| w.to_vec());
    let ticks = Pca9685Bank::<MockI2c>::pulse_ticks(135).to_le_bytes();
    assert_eq!(last, Some(vec![0x42, 0, 0, ticks[0], ticks[1]]));
}

#[test]
fn engine_over_pca9685_reports_missing_board() {
    let mut reg = registry("0x40,1,0,90\n0x41,2,0,90\n");
    let mut missing = MockI2c::new();
    missing.absent.push(0x41);

    let bank = Pca9685Bank::new([MockI2c::new(), missing]).unwrap();
    let mut engine = MotionEngine::new(bank, MockDelay::new(), MotionConfig::default());
    let report = engine.reset_all(&mut reg);

    assert_eq!(report.failures().map(|e| e.id).collect::<Vec<_>>(), vec![2]);
    assert_eq!(report.moved(), 1);
}

#[test]
fn boot_with_bad_table_never_energizes() {
    let journal = PinJournal::default();
    let mut power = PowerSequencer::new(
        MockPin::named("enable").with_journal(journal.clone()),
        MockPin::named("relay").with_journal(journal.clone()),
    );

    let result = boot(
        &mut power,
        &mut MockLed::new(),
        &mut MockDelay::new(),
        &BootConfig::default(),
        || ConnectionTable::parse("0x40,1,0\n", 7),
    );

    assert_eq!(
        result,
        Err(BootError::Load(LoadError::FieldCount { line: 1, found: 3 }))
    );
    assert_eq!(power.state(), PowerState::DriversDisabled);
    assert!(journal.borrow().iter().all(|e| e.pin != "relay"));
}
