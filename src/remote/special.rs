// src/remote/special.rs  —  Pair / unpair / firmware-update notices
//
// Holding Menu+Right (pair) or Menu+Left (unpair) makes the remote send the
// same special code repeatedly.  A code counts as new when it differs from
// the last one or when REPEAT_TIMEOUT has passed since the last report of
// any special code.
use super::report::DecodedCommand;
use super::timing::REPEAT_TIMEOUT;
use std::time::Instant;

pub const SPECIAL_PAIR:   u8 = 0x02;
pub const SPECIAL_UPDATE: u8 = 0x03;
pub const SPECIAL_UNPAIR: u8 = 0x04;

/// Each variant carries the remote address (pairing id).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialEvent {
    Pair(u8),
    Unpair(u8),
    UpdateNotice(u8),
}

#[derive(Debug, Default)]
pub struct SpecialMachine {
    previous_code: u8,
    last_seen:     Option<Instant>,
}

impl SpecialMachine {
    pub fn new() -> Self { Self::default() }

    pub fn on_command(&mut self, cmd: &DecodedCommand, now: Instant) -> Option<SpecialEvent> {
        let code = cmd.event_code;
        let window_expired = self
            .last_seen
            .map_or(true, |t| now.saturating_duration_since(t) > REPEAT_TIMEOUT);

        let mut event = None;
        if code != self.previous_code || window_expired {
            let addr = cmd.remote_address;
            event = match code {
                SPECIAL_PAIR   => Some(SpecialEvent::Pair(addr)),
                SPECIAL_UNPAIR => Some(SpecialEvent::Unpair(addr)),
                SPECIAL_UPDATE => Some(SpecialEvent::UpdateNotice(addr)),
                other => {
                    log::warn!("[special] unrecognized special code 0x{other:02x} from remote {addr}");
                    None
                }
            };
            self.previous_code = code;
        }
        // Any special report keeps the window open.
        self.last_seen = Some(now);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::report::Category;
    use std::time::Duration;

    fn special(code: u8, addr: u8) -> DecodedCommand {
        DecodedCommand { category: Category::Special, event_code: code, remote_address: addr, flags: 0x25 }
    }

    fn at(base: Instant, ms: u64) -> Instant { base + Duration::from_millis(ms) }

    #[test]
    fn repeated_pair_inside_window_fires_once() {
        let mut m = SpecialMachine::new();
        let t = Instant::now();
        let fired: Vec<_> = [0, 100, 200, 300, 400]
            .iter()
            .filter_map(|ms| m.on_command(&special(SPECIAL_PAIR, 0x5a), at(t, *ms)))
            .collect();
        assert_eq!(fired, vec![SpecialEvent::Pair(0x5a)]);
    }

    #[test]
    fn pair_fires_again_after_window() {
        let mut m = SpecialMachine::new();
        let t = Instant::now();
        assert_eq!(m.on_command(&special(SPECIAL_PAIR, 7), t), Some(SpecialEvent::Pair(7)));
        assert_eq!(m.on_command(&special(SPECIAL_PAIR, 7), at(t, 200)), None);
        // 501 ms after the last report (not the first one).
        assert_eq!(m.on_command(&special(SPECIAL_PAIR, 7), at(t, 701)), Some(SpecialEvent::Pair(7)));
    }

    #[test]
    fn continuous_presence_extends_window() {
        let mut m = SpecialMachine::new();
        let t = Instant::now();
        let fired = (0..10)
            .filter_map(|i| m.on_command(&special(SPECIAL_UNPAIR, 1), at(t, i * 400)))
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn different_code_fires_immediately() {
        let mut m = SpecialMachine::new();
        let t = Instant::now();
        assert_eq!(m.on_command(&special(SPECIAL_PAIR, 3), t), Some(SpecialEvent::Pair(3)));
        assert_eq!(m.on_command(&special(SPECIAL_UNPAIR, 3), at(t, 50)), Some(SpecialEvent::Unpair(3)));
        assert_eq!(m.on_command(&special(SPECIAL_UPDATE, 3), at(t, 100)), Some(SpecialEvent::UpdateNotice(3)));
    }

    #[test]
    fn first_report_with_code_zero_is_new_but_silent() {
        let mut m = SpecialMachine::new();
        let t = Instant::now();
        assert_eq!(m.on_command(&special(0x00, 3), t), None);
        assert_eq!(m.on_command(&special(SPECIAL_PAIR, 3), at(t, 10)), Some(SpecialEvent::Pair(3)));
    }
}
