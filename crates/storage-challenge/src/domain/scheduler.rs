//! # In-Turn Submitter Scheduler
//!
//! Round-robin time slicing over the validator set for heartbeat submission.
//!
//! ```text
//! |<- interval ->|<- interval ->|  ...  |<- interval ->|
//! [ validator 0  ][ validator 1  ]  ...  [ validator N-1]   (repeats every N * interval)
//! ```

use crate::error::{ChallengeError, ChallengeResult};
use serde::{Deserialize, Serialize};

/// The current heartbeat turn: `[start, end)` in unix seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InTurnWindow {
    /// Index of the in-turn validator in the snapshot
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl InTurnWindow {
    pub fn contains(&self, time: u64) -> bool {
        self.start <= time && time < self.end
    }
}

/// Compute whose turn it is at `now`.
pub fn in_turn_window(now: u64, interval: u64, validator_count: usize) -> ChallengeResult<InTurnWindow> {
    if interval == 0 {
        return Err(ChallengeError::ZeroCardinality {
            what: "in-turn interval",
        });
    }
    if validator_count == 0 {
        return Err(ChallengeError::ZeroCardinality {
            what: "validator set",
        });
    }

    let total_window = interval.saturating_mul(validator_count as u64);
    let remainder = now % total_window;
    let index = remainder / interval;
    let start = now - (remainder - index * interval);

    Ok(InTurnWindow {
        index: index as usize,
        start,
        end: start.saturating_add(interval),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_over_validators() {
        // 3 validators, 120s turns, full cycle 360s
        assert_eq!(in_turn_window(0, 120, 3).unwrap().index, 0);
        assert_eq!(in_turn_window(119, 120, 3).unwrap().index, 0);
        assert_eq!(in_turn_window(120, 120, 3).unwrap().index, 1);
        assert_eq!(in_turn_window(359, 120, 3).unwrap().index, 2);
        assert_eq!(in_turn_window(360, 120, 3).unwrap().index, 0);
    }

    #[test]
    fn test_window_bounds() {
        let window = in_turn_window(1_000, 120, 3).unwrap();
        // 1000 mod 360 = 280 -> index 2, window [960, 1080)
        assert_eq!(window.index, 2);
        assert_eq!(window.start, 960);
        assert_eq!(window.end, 1_080);
        assert!(window.contains(1_000));
        assert!(!window.contains(1_080));
    }

    #[test]
    fn test_single_validator_always_in_turn() {
        for now in [0, 1, 500, 10_000] {
            assert_eq!(in_turn_window(now, 60, 1).unwrap().index, 0);
        }
    }

    #[test]
    fn test_rejects_empty_inputs() {
        assert!(in_turn_window(10, 0, 3).is_err());
        assert!(in_turn_window(10, 60, 0).is_err());
    }
}
