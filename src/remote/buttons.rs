// src/remote/buttons.rs  —  Button state machine: press / hold / repeat suppression
//
// The receiver sends one report when a button goes down and then a repeat
// report (flags 0x26) roughly every 110 ms while it stays down.  Each physical
// button has two raw codes; the remote toggles between them on successive
// presses so a re-press is distinguishable from a held button.
//
//   Directional  edge-triggered: one event per new press (or per surviving
//                repeat after REPEAT_TIMEOUT), never a hold.
//   Menu / Play  a short tap is only known once the button is released, so the
//                plain event is sent retroactively when the code changes.  A
//                press lasting past HOLD_TIMEOUT fires the hold event once and
//                swallows the plain one.
//
// Release is inferred, never reported: the main loop feeds an idle command
// (code 0) on every read timeout.
use super::report::{DecodedCommand, FLAG_REPEAT};
use super::timing::{HOLD_TIMEOUT, REPEAT_TIMEOUT};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalButton {
    Up,
    Down,
    Left,
    Right,
    Play,
    Menu,
    HoldPlay,
    HoldMenu,
}

impl LogicalButton {
    pub const ALL: [LogicalButton; 8] = [
        LogicalButton::Up,
        LogicalButton::Down,
        LogicalButton::Left,
        LogicalButton::Right,
        LogicalButton::Play,
        LogicalButton::Menu,
        LogicalButton::HoldPlay,
        LogicalButton::HoldMenu,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LogicalButton::Up       => "Up",
            LogicalButton::Down     => "Down",
            LogicalButton::Left     => "Left",
            LogicalButton::Right    => "Right",
            LogicalButton::Play     => "Play/pause",
            LogicalButton::Menu     => "Menu",
            LogicalButton::HoldPlay => "Play/pause hold",
            LogicalButton::HoldMenu => "Menu hold",
        }
    }
}

/// What a raw eventId means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawButton {
    Idle,
    Direction(LogicalButton),
    /// Menu or Play: (plain, hold)
    Holdable(LogicalButton, LogicalButton),
    Unrecognized,
}

fn classify(code: u8) -> RawButton {
    use LogicalButton::*;
    match code {
        0x00        => RawButton::Idle,
        0x0a | 0x0b => RawButton::Direction(Up),
        0x0c | 0x0d => RawButton::Direction(Down),
        0x08 | 0x09 => RawButton::Direction(Left),
        0x06 | 0x07 => RawButton::Direction(Right),
        0x02 | 0x03 => RawButton::Holdable(Menu, HoldMenu),
        0x04 | 0x05 => RawButton::Holdable(Play, HoldPlay),
        _           => RawButton::Unrecognized,
    }
}

/// Button machine state.  One instance for the life of the bridge.
#[derive(Debug, Default)]
pub struct ButtonMachine {
    /// Last eventId seen; 0 = none.
    previous_code: u8,
    hold_sent:     bool,
    press_start:   Option<Instant>,
}

impl ButtonMachine {
    pub fn new() -> Self { Self::default() }

    /// Feed one Button-category command.  Returns the events to dispatch,
    /// in order: at most a retroactive Menu/Play close-out plus one event for
    /// this command.
    pub fn on_command(&mut self, cmd: &DecodedCommand, now: Instant) -> Vec<LogicalButton> {
        let mut out = Vec::new();
        let code = cmd.event_code;
        let changed = code != self.previous_code;

        // Previous Menu/Play released before reaching hold → plain event now.
        // Directional codes were already sent on their leading edge.
        if changed && self.previous_code != 0 && !self.hold_sent {
            if let RawButton::Holdable(plain, _) = classify(self.previous_code) {
                log::debug!("[buttons] 0x{:02x} released → {}", self.previous_code, plain.label());
                out.push(plain);
            }
        }

        if changed {
            self.press_start = Some(now);
        } else if cmd.flags == FLAG_REPEAT && self.held_for(now) < REPEAT_TIMEOUT {
            log::trace!("[buttons] repeat 0x{code:02x} suppressed");
            return out;
        }

        match classify(code) {
            RawButton::Direction(button) => out.push(button),
            RawButton::Holdable(_, hold) => {
                if changed {
                    self.hold_sent = false;
                } else if !self.hold_sent && self.held_for(now) > HOLD_TIMEOUT {
                    log::debug!("[buttons] 0x{code:02x} held {}ms → {}", self.held_for(now).as_millis(), hold.label());
                    out.push(hold);
                    self.hold_sent = true;
                }
            }
            RawButton::Idle => {}
            RawButton::Unrecognized => log::warn!("[buttons] unrecognized button code 0x{code:02x}"),
        }

        self.previous_code = code;
        out
    }

    fn held_for(&self, now: Instant) -> Duration {
        self.press_start
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default()
    }
}
