// src/remote/report.rs  —  5-byte IR report → DecodedCommand
//
//   byte 0  flags     0x25 first report of a press, 0x26 hardware repeat
//   byte 1  unused
//   byte 2  event     0xee button, 0xe0 special (pair/unpair/update)
//   byte 3  address   remote id (pairing id)
//   byte 4  eventId   button / special code

pub const REPORT_LEN: usize = 5;

pub const EVENT_BUTTON:  u8 = 0xee;
pub const EVENT_SPECIAL: u8 = 0xe0;

/// Flags value the receiver sets on auto-repeated reports.
pub const FLAG_REPEAT: u8 = 0x26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawReport {
    pub flags:    u8,
    pub unused:   u8,
    pub event:    u8,
    pub address:  u8,
    pub event_id: u8,
}

impl RawReport {
    pub fn from_bytes(b: [u8; REPORT_LEN]) -> Self {
        Self { flags: b[0], unused: b[1], event: b[2], address: b[3], event_id: b[4] }
    }

    pub fn to_bytes(self) -> [u8; REPORT_LEN] {
        [self.flags, self.unused, self.event, self.address, self.event_id]
    }

    /// "ee 00 ee 5a 03" — for debug logging.
    pub fn hex(&self) -> String {
        self.to_bytes().iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Button,
    Special,
    /// Carries the unrecognised `event` byte for logging.
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedCommand {
    pub category:       Category,
    pub event_code:     u8,
    pub remote_address: u8,
    pub flags:          u8,
}

impl DecodedCommand {
    /// Synthetic "no remote pressed" command fed on read timeout.
    pub fn idle() -> Self {
        Self { category: Category::Button, event_code: 0, remote_address: 0, flags: 0 }
    }
}

pub fn decode(raw: &RawReport) -> DecodedCommand {
    let category = match raw.event {
        EVENT_BUTTON  => Category::Button,
        EVENT_SPECIAL => Category::Special,
        other         => Category::Unknown(other),
    };
    DecodedCommand {
        category,
        event_code:     raw.event_id,
        remote_address: raw.address,
        flags:          raw.flags,
    }
}
