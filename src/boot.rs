//! Power sequencing for the servo driver boards.
//!
//! Two outputs gate the servos: an active-low output-enable shared by every
//! driver board, and a relay between the power supply and the servo rail.
//! The drivers must never be enabled before the relay has closed and the
//! rail has settled, otherwise every servo twitches on power-up.
//!
//! [`boot`] runs the full startup:
//!
//! | Step | Action | Wait (default) |
//! |------|--------|----------------|
//! | 1 | Drivers disabled (enable high) | 250 ms |
//! | 2 | Tables loaded, LED blue | 2 s |
//! | 3 | Relay closed | 3 s |
//! | 4 | Drivers enabled (enable low) | 1 s |
//! | 5 | LED green, then off | 1 s |
//!
//! A failed load stops at step 2: the relay never closes.
//!
//! # Example
//!
//! ```rust
//! use rs_tilewall::boot::{boot, PowerSequencer, PowerState};
//! use rs_tilewall::config::BootConfig;
//! use rs_tilewall::hal::{MockDelay, MockLed, MockPin};
//!
//! let mut power = PowerSequencer::new(MockPin::named("enable"), MockPin::named("relay"));
//! let mut led = MockLed::new();
//! let mut delay = MockDelay::new();
//!
//! let tiles = boot(&mut power, &mut led, &mut delay, &BootConfig::default(), || {
//!     Ok::<_, ()>(107)
//! })
//! .unwrap();
//!
//! assert_eq!(tiles, 107);
//! assert_eq!(power.state(), PowerState::Energized);
//! assert_eq!(delay.total_us(), 7_250_000);
//! ```

use embedded_hal::digital::{Error as _, ErrorKind};

use crate::config::BootConfig;
use crate::traits::{DelayNs, OutputPin, Rgb, StatusLed};

/// Which power output failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerPin {
    /// Driver output-enable.
    Enable,
    /// Servo power relay.
    Relay,
}

/// Power sequencing failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PowerError {
    /// Driving a GPIO failed.
    #[error("{pin:?} output failed: {kind:?}")]
    Pin {
        /// The output that failed.
        pin: PowerPin,
        /// What the GPIO driver reported.
        kind: ErrorKind,
    },
    /// Energize was requested without disabling the drivers first.
    #[error("servo power requested before drivers were disabled")]
    OutOfOrder,
}

/// Startup failure.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BootError<E> {
    /// Power sequencing failed.
    #[error(transparent)]
    Power(#[from] PowerError),
    /// The tables could not be loaded; servo power stayed off.
    #[error("startup load failed: {0:?}")]
    Load(E),
}

/// Where the power sequence stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PowerState {
    /// Outputs not yet driven.
    #[default]
    Unknown,
    /// Drivers held off, relay open or closed.
    DriversDisabled,
    /// Relay closed and drivers enabled.
    Energized,
}

/// Drives the enable and relay outputs in the only safe order.
pub struct PowerSequencer<EN, RELAY> {
    enable: EN,
    relay: RELAY,
    state: PowerState,
}

impl<EN: OutputPin, RELAY: OutputPin> PowerSequencer<EN, RELAY> {
    /// Takes ownership of both outputs. Nothing is driven yet.
    pub fn new(enable: EN, relay: RELAY) -> Self {
        Self {
            enable,
            relay,
            state: PowerState::Unknown,
        }
    }

    /// Current step of the sequence.
    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Holds every driver board off (enable is active low).
    pub fn disable_drivers(&mut self) -> Result<(), PowerError> {
        self.enable.set_high().map_err(|e| PowerError::Pin {
            pin: PowerPin::Enable,
            kind: e.kind(),
        })?;
        self.state = PowerState::DriversDisabled;
        tracing::info!("servo drivers disabled");
        Ok(())
    }

    /// Closes the relay, waits `settle_ms`, then enables the drivers.
    ///
    /// Refuses with [`PowerError::OutOfOrder`] unless
    /// [`disable_drivers`](Self::disable_drivers) ran first.
    pub fn energize<D: DelayNs>(&mut self, delay: &mut D, settle_ms: u32) -> Result<(), PowerError> {
        if self.state != PowerState::DriversDisabled {
            tracing::error!(state = ?self.state, "refusing to energize servos");
            return Err(PowerError::OutOfOrder);
        }

        self.relay.set_high().map_err(|e| PowerError::Pin {
            pin: PowerPin::Relay,
            kind: e.kind(),
        })?;
        tracing::info!(settle_ms, "servo power on");
        delay.delay_ms(settle_ms);

        self.enable.set_low().map_err(|e| PowerError::Pin {
            pin: PowerPin::Enable,
            kind: e.kind(),
        })?;
        self.state = PowerState::Energized;
        tracing::info!("servo drivers enabled");
        Ok(())
    }

    /// Disables the drivers, then opens the relay.
    pub fn shutdown(&mut self) -> Result<(), PowerError> {
        self.disable_drivers()?;
        self.relay.set_low().map_err(|e| PowerError::Pin {
            pin: PowerPin::Relay,
            kind: e.kind(),
        })?;
        tracing::info!("servo power off");
        Ok(())
    }

    /// Gives back `(enable, relay)`.
    pub fn into_pins(self) -> (EN, RELAY) {
        (self.enable, self.relay)
    }
}

/// Runs the startup sequence around `load`.
///
/// `load` runs while the drivers are held off; its value is returned once
/// the servos are powered. LED failures are logged and otherwise ignored.
pub fn boot<EN, RELAY, L, D, T, E>(
    power: &mut PowerSequencer<EN, RELAY>,
    led: &mut L,
    delay: &mut D,
    timing: &BootConfig,
    load: impl FnOnce() -> Result<T, E>,
) -> Result<T, BootError<E>>
where
    EN: OutputPin,
    RELAY: OutputPin,
    L: StatusLed,
    D: DelayNs,
{
    tracing::info!("initializing");
    power.disable_drivers()?;
    delay.delay_ms(timing.disable_settle_ms);

    let loaded = load().map_err(BootError::Load)?;

    show(led, Rgb::BLUE);
    delay.delay_ms(timing.pre_relay_ms);
    power.energize(delay, timing.relay_settle_ms)?;
    delay.delay_ms(timing.enable_settle_ms);

    tracing::info!("boot sequence completed");
    show(led, Rgb::GREEN);
    delay.delay_ms(timing.led_hold_ms);
    show(led, Rgb::OFF);

    Ok(loaded)
}

fn show<L: StatusLed>(led: &mut L, color: Rgb) {
    if let Err(e) = led.set_color(color) {
        tracing::warn!(error = ?e, "status LED update failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockDelay, MockLed, MockPin, PinEvent, PinJournal};
    use alloc::vec;
    use alloc::vec::Vec;

    fn journaled(journal: &PinJournal) -> PowerSequencer<MockPin, MockPin> {
        PowerSequencer::new(
            MockPin::named("enable").with_journal(journal.clone()),
            MockPin::named("relay").with_journal(journal.clone()),
        )
    }

    fn event(pin: &'static str, high: bool) -> PinEvent {
        PinEvent { pin, high }
    }

    #[test]
    fn energize_requires_disable_first() {
        let journal = PinJournal::default();
        let mut power = journaled(&journal);

        assert_eq!(
            power.energize(&mut MockDelay::new(), 0),
            Err(PowerError::OutOfOrder)
        );
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn relay_settles_before_drivers_enable() {
        let journal = PinJournal::default();
        let mut power = journaled(&journal);
        let mut delay = MockDelay::new();

        power.disable_drivers().unwrap();
        power.energize(&mut delay, 3000).unwrap();

        assert_eq!(
            *journal.borrow(),
            vec![
                event("enable", true),
                event("relay", true),
                event("enable", false)
            ]
        );
        assert_eq!(delay.pauses_us, vec![3_000_000]);
        assert_eq!(power.state(), PowerState::Energized);

        // Already energized: a second energize is out of order.
        assert_eq!(power.energize(&mut delay, 0), Err(PowerError::OutOfOrder));
    }

    #[test]
    fn boot_full_sequence() {
        let journal = PinJournal::default();
        let mut power = journaled(&journal);
        let mut led = MockLed::new();
        let mut delay = MockDelay::new();

        let loaded_while_disabled = boot(
            &mut power,
            &mut led,
            &mut delay,
            &BootConfig::default(),
            || Ok::<_, ()>(journal.borrow().clone()),
        )
        .unwrap();

        assert_eq!(loaded_while_disabled, vec![event("enable", true)]);
        assert_eq!(led.colors, vec![Rgb::BLUE, Rgb::GREEN, Rgb::OFF]);
        assert_eq!(
            delay.pauses_us,
            vec![250_000, 2_000_000, 3_000_000, 1_000_000, 1_000_000]
        );
        let (enable, relay) = power.into_pins();
        assert!(!enable.is_high());
        assert!(relay.is_high());
    }

    #[test]
    fn load_failure_keeps_relay_open() {
        let journal = PinJournal::default();
        let mut power = journaled(&journal);
        let mut led = MockLed::new();

        let err = boot(
            &mut power,
            &mut led,
            &mut MockDelay::new(),
            &BootConfig::immediate(),
            || Err::<(), _>("missing table"),
        )
        .unwrap_err();

        assert_eq!(err, BootError::Load("missing table"));
        assert_eq!(*journal.borrow(), vec![event("enable", true)]);
        assert!(led.colors.is_empty());
        assert_eq!(power.state(), PowerState::DriversDisabled);
    }

    #[test]
    fn gpio_failure_is_reported() {
        let mut enable = MockPin::named("enable");
        enable.fail = true;
        let mut power = PowerSequencer::new(enable, MockPin::named("relay"));

        let err = boot(
            &mut power,
            &mut MockLed::new(),
            &mut MockDelay::new(),
            &BootConfig::immediate(),
            || Ok::<_, ()>(()),
        )
        .unwrap_err();

        assert_eq!(
            err,
            BootError::Power(PowerError::Pin {
                pin: PowerPin::Enable,
                kind: ErrorKind::Other
            })
        );
        assert_eq!(power.state(), PowerState::Unknown);
    }

    #[test]
    fn shutdown_disables_before_opening_relay() {
        let journal = PinJournal::default();
        let mut power = journaled(&journal);
        power.disable_drivers().unwrap();
        power.energize(&mut MockDelay::new(), 0).unwrap();
        journal.borrow_mut().clear();

        power.shutdown().unwrap();

        let order: Vec<_> = journal.borrow().iter().copied().collect();
        assert_eq!(order, vec![event("enable", true), event("relay", false)]);
        assert_eq!(power.state(), PowerState::DriversDisabled);
    }
}
