// src/remote/timing.rs  —  Fixed remote timing (compile-time, not configurable)
use std::time::Duration;

/// Interrupt read timeout.  Also the tick that re-evaluates a held button,
/// so it must stay below HOLD_TIMEOUT.
pub const READ_TIMEOUT:   Duration = Duration::from_millis(150);
/// A Menu/Play press held longer than this fires the hold event.
pub const HOLD_TIMEOUT:   Duration = Duration::from_millis(500);
/// Hardware repeat reports inside this window are coalesced.
pub const REPEAT_TIMEOUT: Duration = Duration::from_millis(500);

const _: () = assert!(READ_TIMEOUT.as_millis() < HOLD_TIMEOUT.as_millis());
