//! Overall progress for an analysis run
//!
//! Finished entries (completed or error) each count for a full `1/N` share.
//! The in-flight entry adds a simulated sub-progress scaled by `1/N`: the
//! extraction service reports nothing while it works, so the value only
//! signals that the run is alive. The simulation never reaches 100 and
//! restarts from zero whenever a different entry becomes in-flight.

use rollcall_common::events::EntryStatus;

/// Highest value the simulated sub-progress may reach
pub const SIMULATED_CEILING: u8 = 99;

/// Upper bound (exclusive) of the per-tick jitter
pub const MAX_JITTER: f64 = 3.0;

/// One simulated tick
///
/// `increment = max(1, floor((100 - prev) / 10 + jitter))`, capped at 99.
/// Steps shrink as the value approaches the ceiling.
pub fn next_simulated_step(prev: u8, jitter: f64) -> u8 {
    if prev >= SIMULATED_CEILING {
        return SIMULATED_CEILING;
    }
    let remaining = 100.0 - f64::from(prev);
    let jitter = jitter.clamp(0.0, MAX_JITTER);
    let increment = ((remaining / 10.0) + jitter).floor().max(1.0) as u16;
    (u16::from(prev) + increment).min(u16::from(SIMULATED_CEILING)) as u8
}

/// Simulated sub-progress bound to the current in-flight entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedProgress {
    in_flight: Option<String>,
    value: u8,
}

impl SimulatedProgress {
    /// Follow the in-flight entry, restarting at zero when it changes
    pub fn track(&mut self, in_flight: Option<&str>) {
        if self.in_flight.as_deref() != in_flight {
            self.in_flight = in_flight.map(str::to_string);
            self.value = 0;
        }
    }

    /// Advance by one tick; no-op while nothing is in flight
    pub fn tick(&mut self, jitter: f64) -> u8 {
        if self.in_flight.is_some() {
            self.value = next_simulated_step(self.value, jitter);
        }
        self.value
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Overall percentage for a run
///
/// `floor(100 * finished / N + simulated / N)`, forced to exactly 100 once
/// every entry is terminal. An empty run reports 0.
pub fn overall_percentage(statuses: &[EntryStatus], simulated: u8) -> u8 {
    let total = statuses.len();
    if total == 0 {
        return 0;
    }

    let finished = statuses.iter().filter(|s| s.is_terminal()).count();
    if finished == total {
        return 100;
    }

    let in_flight = statuses.iter().any(|s| *s == EntryStatus::Processing);
    let base = finished as f64 * 100.0 / total as f64;
    let current = if in_flight {
        f64::from(simulated.min(SIMULATED_CEILING)) / total as f64
    } else {
        0.0
    };

    (base + current).floor().clamp(0.0, 99.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_completed_one_processing_at_40() {
        let statuses = [EntryStatus::Completed, EntryStatus::Processing];
        assert_eq!(overall_percentage(&statuses, 40), 70);
    }

    #[test]
    fn test_all_terminal_is_exactly_100() {
        let statuses = [EntryStatus::Completed, EntryStatus::Error, EntryStatus::Completed];
        assert_eq!(overall_percentage(&statuses, 0), 100);
    }

    #[test]
    fn test_empty_run_is_zero() {
        assert_eq!(overall_percentage(&[], 50), 0);
    }

    #[test]
    fn test_simulated_ignored_without_processing_entry() {
        let statuses = [EntryStatus::Completed, EntryStatus::Pending];
        assert_eq!(overall_percentage(&statuses, 80), 50);
    }

    #[test]
    fn test_never_reports_100_while_in_flight() {
        let statuses = [EntryStatus::Completed, EntryStatus::Completed, EntryStatus::Processing];
        assert_eq!(overall_percentage(&statuses, 99), 99);
    }

    #[test]
    fn test_floor_of_thirds() {
        let statuses = [EntryStatus::Completed, EntryStatus::Pending, EntryStatus::Pending];
        assert_eq!(overall_percentage(&statuses, 0), 33);
    }

    #[test]
    fn test_step_decelerates() {
        // remaining 100 → floor(10 + 0) = 10
        assert_eq!(next_simulated_step(0, 0.0), 10);
        // remaining 50 → floor(5 + 2.5) = 7
        assert_eq!(next_simulated_step(50, 2.5), 57);
        // remaining 5 → floor(0.5) = 0 → at least 1
        assert_eq!(next_simulated_step(95, 0.0), 96);
    }

    #[test]
    fn test_step_never_exceeds_ceiling() {
        assert_eq!(next_simulated_step(98, 2.9), 99);
        assert_eq!(next_simulated_step(99, 2.9), 99);

        let mut simulated = SimulatedProgress::default();
        simulated.track(Some("a"));
        for _ in 0..500 {
            simulated.tick(2.99);
        }
        assert_eq!(simulated.value(), SIMULATED_CEILING);
    }

    #[test]
    fn test_steps_are_monotonic() {
        let mut value = 0;
        for i in 0..100 {
            let next = next_simulated_step(value, (i % 3) as f64);
            assert!(next >= value);
            value = next;
        }
    }

    #[test]
    fn test_simulation_resets_on_new_in_flight_entry() {
        let mut sim = SimulatedProgress::default();
        assert_eq!(sim.tick(0.0), 0);

        sim.track(Some("hash-a"));
        sim.tick(0.0);
        sim.tick(0.0);
        assert_eq!(sim.value(), 19);

        // Same entry keeps its value
        sim.track(Some("hash-a"));
        assert_eq!(sim.value(), 19);

        sim.track(Some("hash-b"));
        assert_eq!(sim.value(), 0);
        assert_eq!(sim.in_flight(), Some("hash-b"));

        sim.track(None);
        assert_eq!(sim.value(), 0);
    }
}
