// src/usb/mod.rs  —  ReportDevice trait + USB error taxonomy
//
// The Apple IR receiver (VID 0x05ac / PID 0x8241) is a USB HID device that
// the kernel normally hands to usbhid.  We talk to it raw:
//
//   IN   interrupt endpoint 0x82, 5-byte reports  {flags, unused, event, address, eventId}
//   OUT  HID SET_REPORT control transfers, report id in byte 0
//
// Everything above this module only sees the `ReportDevice` trait, so the
// bridge and indicator can be driven by an in-memory fake in tests.
pub mod session;
pub mod sysfs;

use crate::remote::RawReport;
use std::time::Duration;
use thiserror::Error;

pub use session::DeviceSession;

pub const APPLE_VID: u16 = 0x05ac;
pub const IR_PID:    u16 = 0x8241;

pub const IR_INTERFACE: u8 = 0;
pub const IR_ENDPOINT:  u8 = 0x82;

/// HID class request SET_REPORT
pub const HID_SET_REPORT: u8 = 0x09;
/// wValue high byte for an OUTPUT report
pub const HID_REPORT_TYPE_OUTPUT: u16 = 0x0300;
pub const CONTROL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Driver rebound to the interface on shutdown.
pub const KERNEL_DRIVER: &str = "usbhid";

#[derive(Error, Debug)]
pub enum UsbError {
    #[error("USB enumeration failed: {0}")]
    Enumerate(#[source] rusb::Error),

    #[error("IR receiver {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("cannot claim interface {interface} (are you root?): {source}")]
    ClaimFailed { interface: u8, #[source] source: rusb::Error },

    #[error("read timed out")]
    Timeout,

    #[error("short report: got {0} of {len} bytes", len = crate::remote::REPORT_LEN)]
    ShortRead(usize),

    #[error("interrupt read failed: {0}")]
    Read(#[source] rusb::Error),

    #[error("SET_REPORT 0x{report_id:02x} failed: {source}")]
    ReportWriteFailed { report_id: u8, #[source] source: rusb::Error },

    #[error("SET_REPORT 0x{report_id:02x} short write: {written} of {expected} bytes")]
    ShortWrite { report_id: u8, written: usize, expected: usize },

    #[error("device disconnected")]
    Disconnected,
}

impl UsbError {
    /// True when the session cannot continue (the device went away).
    /// Everything else is per-iteration noise or a startup failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UsbError::Disconnected)
    }
}

/// Blocking report I/O against the claimed receiver.
pub trait ReportDevice {
    /// Read one input report.  `Err(UsbError::Timeout)` is the normal
    /// "no remote active" outcome, not a failure.
    fn read_report(&mut self, timeout: Duration) -> Result<RawReport, UsbError>;

    /// Write one output report; byte 0 is the report id.
    fn write_report(&mut self, data: &[u8]) -> Result<(), UsbError>;
}

/// One line per attached USB device, matching devices flagged (for --list-devices).
pub fn list_devices(vendor_id: u16, product_id: u16) -> Result<Vec<String>, UsbError> {
    let devices = rusb::devices().map_err(UsbError::Enumerate)?;
    let mut out = Vec::new();
    for d in devices.iter() {
        let Ok(desc) = d.device_descriptor() else { continue };
        let hit = desc.vendor_id() == vendor_id && desc.product_id() == product_id;
        out.push(format!(
            "{} bus={:03} addr={:03}  {:04x}:{:04x}",
            if hit { "*" } else { " " },
            d.bus_number(), d.address(),
            desc.vendor_id(), desc.product_id()
        ));
    }
    Ok(out)
}

// Shared in-memory device for unit tests in other modules.
#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted reads, recorded writes.
    #[derive(Default)]
    pub struct FakeDevice {
        pub reads:      VecDeque<Result<RawReport, UsbError>>,
        pub writes:     Vec<Vec<u8>>,
        /// Report ids whose writes should fail.
        pub fail_ids:   Vec<u8>,
    }

    impl ReportDevice for FakeDevice {
        fn read_report(&mut self, _timeout: Duration) -> Result<RawReport, UsbError> {
            self.reads.pop_front().unwrap_or(Err(UsbError::Timeout))
        }

        fn write_report(&mut self, data: &[u8]) -> Result<(), UsbError> {
            self.writes.push(data.to_vec());
            if self.fail_ids.contains(&data[0]) {
                return Err(UsbError::ShortWrite { report_id: data[0], written: 0, expected: data.len() });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_disconnect_is_fatal() {
        assert!(UsbError::Disconnected.is_fatal());
        assert!(!UsbError::Timeout.is_fatal());
        assert!(!UsbError::ShortRead(3).is_fatal());
        assert!(!UsbError::Read(rusb::Error::Pipe).is_fatal());
    }

    #[test]
    fn not_found_message_names_ids() {
        let e = UsbError::DeviceNotFound { vendor_id: APPLE_VID, product_id: IR_PID };
        assert_eq!(e.to_string(), "IR receiver 05ac:8241 not found");
    }
}
