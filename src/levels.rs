//! Temporal level state machines.
//!
//! Raw diagnostic levels are noisy: reporters pause, flap between levels, or
//! recover for a single tick. The three state machines here turn a level
//! sequence over time into something downstream logic can act on:
//!
//! - [`TimeoutLevel`] forces `Stale` after a period of silence.
//! - [`HysteresisLevel`] delays committing a *worse* level until it has
//!   persisted; recovery to a better level commits immediately.
//! - [`LatchLevel`] holds a degraded level for a minimum duration after the
//!   input recovers.
//!
//! Leaf units run Timeout then Hysteresis in series on the reported level;
//! composite units run their combinator's level through Latch. All timing is
//! driven by caller-supplied [`Timestamp`]s, never the wall clock.

use std::time::Duration;

use diagraph_types::{DiagnosticLevel, Timestamp};

/// Forces `Stale` when no report has arrived within the configured duration.
///
/// A zero/unset duration disables the timeout: the level then only ever
/// changes on an explicit report, and a never-reported leaf defaults to `Ok`
/// (used for always-default-OK leaves). With the timeout enabled, a
/// never-reported leaf is `Stale` from the start.
#[derive(Debug)]
pub struct TimeoutLevel {
    duration: Option<Duration>,
    stamp: Option<Timestamp>,
    level: DiagnosticLevel,
}

impl TimeoutLevel {
    /// Create with the given timeout window; `None` or zero disables it.
    pub fn new(duration: Option<Duration>) -> Self {
        let duration = duration.filter(|d| !d.is_zero());
        let level = match duration {
            Some(_) => DiagnosticLevel::Stale,
            None => DiagnosticLevel::Ok,
        };
        Self {
            duration,
            stamp: None,
            level,
        }
    }

    /// Record a fresh report.
    pub fn update_report(&mut self, now: Timestamp, level: DiagnosticLevel) {
        self.stamp = Some(now);
        self.level = level;
    }

    /// Advance time without a report, checking for silence.
    pub fn update(&mut self, now: Timestamp) {
        let Some(duration) = self.duration else {
            return;
        };
        let stale = match self.stamp {
            Some(stamp) => now.saturating_since(stamp) > duration,
            None => true,
        };
        if stale {
            self.level = DiagnosticLevel::Stale;
        }
    }

    /// Current output level.
    pub fn level(&self) -> DiagnosticLevel {
        self.level
    }
}

/// Debounces transitions to worse levels.
///
/// A worse input level is only committed once the input has continuously
/// stayed at-or-above that level for the configured duration. While the
/// window is open the commit candidate is the *minimum* level seen in it, so
/// an input flapping between `Warn` and `Error` commits `Warn` first. A
/// better-or-equal input commits with zero delay and closes the window.
#[derive(Debug)]
pub struct HysteresisLevel {
    duration: Duration,
    level: DiagnosticLevel,
    input: DiagnosticLevel,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    level: DiagnosticLevel,
    since: Timestamp,
}

impl HysteresisLevel {
    /// Create with the given debounce window; zero tracks the input exactly.
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            duration: duration.unwrap_or(Duration::ZERO),
            level: DiagnosticLevel::Stale,
            input: DiagnosticLevel::Stale,
            pending: None,
        }
    }

    /// Feed the next input level.
    pub fn update(&mut self, now: Timestamp, input: DiagnosticLevel) {
        self.input = input;

        if input <= self.level {
            // Recovery (or no change) commits immediately.
            self.level = input;
            self.pending = None;
            return;
        }

        let pending = self.pending.get_or_insert(Pending {
            level: input,
            since: now,
        });
        pending.level = pending.level.best(input);

        if now.saturating_since(pending.since) >= self.duration {
            self.level = pending.level;
            // The input may still be worse than what was just committed;
            // reopen the window for the remainder.
            self.pending = if input > self.level {
                Some(Pending {
                    level: input,
                    since: now,
                })
            } else {
                None
            };
        }
    }

    /// Current committed output level.
    pub fn level(&self) -> DiagnosticLevel {
        self.level
    }

    /// Last input level, before debouncing.
    pub fn input_level(&self) -> DiagnosticLevel {
        self.input
    }
}

/// Holds a degraded level for a minimum duration after the input recovers.
///
/// The latch triggers once the input reaches `Error` or worse. While
/// triggered it remembers the worst level seen; after the input recovers
/// below `Error`, the held level is kept until the hold window has elapsed
/// from the recovery stamp, then the output tracks the input again. A
/// zero/unset duration disables latching entirely.
#[derive(Debug)]
pub struct LatchLevel {
    duration: Option<Duration>,
    input: DiagnosticLevel,
    latch: DiagnosticLevel,
    recovered: Option<Timestamp>,
}

impl LatchLevel {
    /// Create with the given hold duration; `None` or zero disables latching.
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            duration: duration.filter(|d| !d.is_zero()),
            input: DiagnosticLevel::Stale,
            latch: DiagnosticLevel::Ok,
            recovered: None,
        }
    }

    /// Feed the next input level.
    pub fn update(&mut self, now: Timestamp, input: DiagnosticLevel) {
        self.input = input;

        let Some(duration) = self.duration else {
            return;
        };

        if input >= DiagnosticLevel::Error {
            self.latch = self.latch.worst(input);
            self.recovered = None;
        } else if self.latch >= DiagnosticLevel::Error {
            let recovered = *self.recovered.get_or_insert(now);
            if now.saturating_since(recovered) >= duration {
                self.latch = DiagnosticLevel::Ok;
                self.recovered = None;
            }
        }
    }

    /// Clear the latch, releasing any held level.
    pub fn reset(&mut self) {
        self.latch = DiagnosticLevel::Ok;
        self.recovered = None;
    }

    /// Output level: the worst of the input and the held level.
    pub fn level(&self) -> DiagnosticLevel {
        self.input.worst(self.latch)
    }

    /// Last input level, before latching.
    pub fn input_level(&self) -> DiagnosticLevel {
        self.input
    }

    /// Level currently held by the latch, `Ok` when not latched.
    pub fn latch_level(&self) -> DiagnosticLevel {
        self.latch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DiagnosticLevel::*;

    fn at(secs: f64) -> Timestamp {
        Timestamp::from_secs_f64(secs)
    }

    #[test]
    fn test_timeout_goes_stale_after_silence() {
        let mut timeout = TimeoutLevel::new(Some(Duration::from_millis(300)));
        timeout.update_report(at(0.0), Ok);
        timeout.update(at(0.1));
        assert_eq!(timeout.level(), Ok);
        timeout.update(at(0.3));
        assert_eq!(timeout.level(), Ok);
        timeout.update(at(0.4));
        assert_eq!(timeout.level(), Stale);
    }

    #[test]
    fn test_timeout_recovers_on_report() {
        let mut timeout = TimeoutLevel::new(Some(Duration::from_millis(100)));
        assert_eq!(timeout.level(), Stale);
        timeout.update(at(1.0));
        assert_eq!(timeout.level(), Stale);
        timeout.update_report(at(1.1), Warn);
        assert_eq!(timeout.level(), Warn);
    }

    #[test]
    fn test_timeout_disabled_defaults_ok() {
        let mut timeout = TimeoutLevel::new(None);
        assert_eq!(timeout.level(), Ok);
        timeout.update(at(100.0));
        assert_eq!(timeout.level(), Ok);
        timeout.update_report(at(100.1), Error);
        timeout.update(at(200.0));
        assert_eq!(timeout.level(), Error);
    }

    #[test]
    fn test_hysteresis_delays_degradation() {
        let mut hysteresis = HysteresisLevel::new(Some(Duration::from_millis(200)));
        hysteresis.update(at(0.0), Ok);
        assert_eq!(hysteresis.level(), Ok);
        hysteresis.update(at(0.1), Error);
        assert_eq!(hysteresis.level(), Ok);
        hysteresis.update(at(0.2), Error);
        assert_eq!(hysteresis.level(), Ok);
        hysteresis.update(at(0.3), Error);
        assert_eq!(hysteresis.level(), Error);
    }

    #[test]
    fn test_hysteresis_recovery_is_immediate() {
        let mut hysteresis = HysteresisLevel::new(Some(Duration::from_millis(200)));
        hysteresis.update(at(0.0), Error);
        hysteresis.update(at(0.2), Error);
        assert_eq!(hysteresis.level(), Error);
        hysteresis.update(at(0.3), Ok);
        assert_eq!(hysteresis.level(), Ok);
    }

    #[test]
    fn test_hysteresis_short_spike_suppressed() {
        let mut hysteresis = HysteresisLevel::new(Some(Duration::from_millis(200)));
        hysteresis.update(at(0.0), Ok);
        hysteresis.update(at(0.1), Error);
        hysteresis.update(at(0.2), Ok);
        hysteresis.update(at(0.3), Ok);
        assert_eq!(hysteresis.level(), Ok);
    }

    #[test]
    fn test_hysteresis_window_commits_minimum() {
        // Input flaps between ERROR and WARN: the window never closes (both
        // are worse than OK) but only WARN has been held the whole time.
        let mut hysteresis = HysteresisLevel::new(Some(Duration::from_millis(200)));
        hysteresis.update(at(0.0), Ok);
        hysteresis.update(at(0.1), Error);
        hysteresis.update(at(0.2), Warn);
        hysteresis.update(at(0.3), Error);
        assert_eq!(hysteresis.level(), Warn);
    }

    #[test]
    fn test_hysteresis_zero_tracks_input() {
        let mut hysteresis = HysteresisLevel::new(None);
        hysteresis.update(at(0.0), Warn);
        assert_eq!(hysteresis.level(), Warn);
        hysteresis.update(at(0.1), Stale);
        assert_eq!(hysteresis.level(), Stale);
        hysteresis.update(at(0.2), Ok);
        assert_eq!(hysteresis.level(), Ok);
    }

    #[test]
    fn test_latch_holds_after_recovery() {
        let mut latch = LatchLevel::new(Some(Duration::from_millis(300)));
        latch.update(at(0.0), Error);
        assert_eq!(latch.level(), Error);
        latch.update(at(0.1), Ok);
        assert_eq!(latch.level(), Error);
        latch.update(at(0.3), Ok);
        assert_eq!(latch.level(), Error);
        latch.update(at(0.4), Ok);
        assert_eq!(latch.level(), Ok);
    }

    #[test]
    fn test_latch_retriggers_during_hold() {
        let mut latch = LatchLevel::new(Some(Duration::from_millis(300)));
        latch.update(at(0.0), Error);
        latch.update(at(0.1), Ok);
        latch.update(at(0.2), Error);
        latch.update(at(0.3), Ok);
        // Hold restarts from the second recovery.
        latch.update(at(0.5), Ok);
        assert_eq!(latch.level(), Error);
        latch.update(at(0.6), Ok);
        assert_eq!(latch.level(), Ok);
    }

    #[test]
    fn test_latch_disabled_tracks_input() {
        let mut latch = LatchLevel::new(None);
        latch.update(at(0.0), Error);
        assert_eq!(latch.level(), Error);
        latch.update(at(0.1), Ok);
        assert_eq!(latch.level(), Ok);
    }

    #[test]
    fn test_latch_warn_does_not_trigger() {
        let mut latch = LatchLevel::new(Some(Duration::from_millis(300)));
        latch.update(at(0.0), Warn);
        latch.update(at(0.1), Ok);
        assert_eq!(latch.level(), Ok);
        assert_eq!(latch.latch_level(), Ok);
    }

    #[test]
    fn test_latch_reset_releases_hold() {
        let mut latch = LatchLevel::new(Some(Duration::from_secs(60)));
        latch.update(at(0.0), Stale);
        latch.update(at(0.1), Ok);
        assert_eq!(latch.level(), Stale);
        latch.reset();
        assert_eq!(latch.level(), Ok);
    }
}
