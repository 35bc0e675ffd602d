// src/indicator/mod.rs  —  Status LED + fan via HID output reports
//
// LED report id 0x0d.  Every sequence starts with one 5-byte report
// {0x0d, mode, 0, 0, 0} followed by 3-byte {0x0d, sub, value} reports.  The
// LED firmware expects this exact order, so the tables below are the protocol.
//
// All writes are best-effort: a failed write is logged and the rest of the
// sequence still goes out.
use crate::usb::ReportDevice;
use serde::{Deserialize, Serialize};

pub const LED_REPORT_ID: u8 = 0x0d;
pub const FAN_REPORT_ID: u8 = 0x0f;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorMode {
    Off,
    Amber,
    AmberBlink,
    White,
    WhiteBlink,
    /// Amber and white together
    Both,
}

fn head(mode: u8) -> Vec<u8> { vec![LED_REPORT_ID, mode, 0, 0, 0] }
fn sub(cmd: u8, value: u8) -> Vec<u8> { vec![LED_REPORT_ID, cmd, value] }

/// Output reports for `mode`, in write order.
pub fn mode_reports(mode: IndicatorMode) -> Vec<Vec<u8>> {
    match mode {
        IndicatorMode::Off        => vec![head(0), sub(3, 0), sub(4, 0)],
        IndicatorMode::Amber      => vec![head(1), sub(3, 1), sub(4, 0)],
        IndicatorMode::AmberBlink => vec![head(2), sub(3, 0), sub(4, 0), sub(3, 2)],
        IndicatorMode::White      => vec![head(3), sub(3, 0), sub(4, 1)],
        IndicatorMode::WhiteBlink => vec![head(4), sub(3, 0), sub(4, 0), sub(4, 2)],
        IndicatorMode::Both       => vec![head(7), sub(6, 1)],
    }
}

/// Output reports selecting high or low LED brightness.
pub fn brightness_reports(high: bool) -> Vec<Vec<u8>> {
    if high {
        vec![head(6), sub(5, 1)]
    } else {
        vec![head(5), sub(5, 0)]
    }
}

pub fn fan_report(on: bool) -> [u8; 2] { [FAN_REPORT_ID, on as u8] }

/// True when every report of the sequence went out.
pub fn set_mode(dev: &mut impl ReportDevice, mode: IndicatorMode) -> bool {
    log::debug!("[indicator] mode {mode:?}");
    write_all(dev, &mode_reports(mode)) == 0
}

pub fn set_brightness(dev: &mut impl ReportDevice, high: bool) {
    log::debug!("[indicator] brightness {}", if high { "high" } else { "low" });
    write_all(dev, &brightness_reports(high));
}

pub fn set_fan(dev: &mut impl ReportDevice, on: bool) {
    if let Err(e) = dev.write_report(&fan_report(on)) {
        log::warn!("[indicator] fan report failed: {e}");
    }
}

/// Returns the number of writes that failed.
fn write_all(dev: &mut impl ReportDevice, reports: &[Vec<u8>]) -> usize {
    let mut failed = 0;
    for r in reports {
        log::trace!("[indicator] write {r:02x?}");
        if let Err(e) = dev.write_report(r) {
            log::warn!("[indicator] write {r:02x?} failed: {e}");
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::fake::FakeDevice;

    #[test]
    fn white_sequence_bytes() {
        assert_eq!(
            mode_reports(IndicatorMode::White),
            vec![vec![0x0d, 3, 0, 0, 0], vec![0x0d, 3, 0], vec![0x0d, 4, 1]]
        );
    }

    #[test]
    fn blink_modes_have_four_writes() {
        assert_eq!(
            mode_reports(IndicatorMode::AmberBlink),
            vec![vec![0x0d, 2, 0, 0, 0], vec![0x0d, 3, 0], vec![0x0d, 4, 0], vec![0x0d, 3, 2]]
        );
        assert_eq!(
            mode_reports(IndicatorMode::WhiteBlink),
            vec![vec![0x0d, 4, 0, 0, 0], vec![0x0d, 3, 0], vec![0x0d, 4, 0], vec![0x0d, 4, 2]]
        );
    }

    #[test]
    fn both_uses_mode_seven() {
        assert_eq!(mode_reports(IndicatorMode::Both), vec![vec![0x0d, 7, 0, 0, 0], vec![0x0d, 6, 1]]);
    }

    #[test]
    fn off_and_amber() {
        assert_eq!(mode_reports(IndicatorMode::Off), vec![vec![0x0d, 0, 0, 0, 0], vec![0x0d, 3, 0], vec![0x0d, 4, 0]]);
        assert_eq!(mode_reports(IndicatorMode::Amber), vec![vec![0x0d, 1, 0, 0, 0], vec![0x0d, 3, 1], vec![0x0d, 4, 0]]);
    }

    #[test]
    fn brightness_sequences() {
        assert_eq!(brightness_reports(true), vec![vec![0x0d, 6, 0, 0, 0], vec![0x0d, 5, 1]]);
        assert_eq!(brightness_reports(false), vec![vec![0x0d, 5, 0, 0, 0], vec![0x0d, 5, 0]]);
    }

    #[test]
    fn set_mode_writes_in_order() {
        let mut dev = FakeDevice::default();
        assert!(set_mode(&mut dev, IndicatorMode::Amber));
        assert_eq!(dev.writes, mode_reports(IndicatorMode::Amber));
    }

    #[test]
    fn set_mode_reports_failure() {
        let mut dev = FakeDevice { fail_ids: vec![LED_REPORT_ID], ..Default::default() };
        assert!(!set_mode(&mut dev, IndicatorMode::White));
    }

    #[test]
    fn failed_write_does_not_stop_sequence() {
        let mut dev = FakeDevice { fail_ids: vec![LED_REPORT_ID], ..Default::default() };
        let failed = write_all(&mut dev, &mode_reports(IndicatorMode::WhiteBlink));
        assert_eq!(failed, 4);
        assert_eq!(dev.writes.len(), 4);
    }

    #[test]
    fn fan_report_bytes() {
        let mut dev = FakeDevice::default();
        set_fan(&mut dev, true);
        set_fan(&mut dev, false);
        assert_eq!(dev.writes, vec![vec![0x0f, 1], vec![0x0f, 0]]);
    }
}
