// src/usb/session.rs  —  Exclusive claim on the IR receiver (rusb / libusb)
//
// Lifecycle:
//   acquire()  enumerate → open first VID/PID match → detach usbhid → claim
//   release()  release interface → reattach usbhid (libusb, then sysfs bind)
//
// `Drop` runs release() too, so a session that unwinds out of main() still
// hands the receiver back to the kernel.
//
// ── Linux permissions ─────────────────────────────────────────────────────────
// Claiming needs write access to /dev/bus/usb/BBB/DDD and rebinding needs
// root.  Either run as root or install a udev rule:
//
//   echo 'SUBSYSTEM=="usb", ATTRS{idVendor}=="05ac", \
//         ATTRS{idProduct}=="8241", GROUP="plugdev", MODE="0660"' \
//     | sudo tee /etc/udev/rules.d/99-apple-ir.rules

use super::{
    sysfs, ReportDevice, UsbError, CONTROL_TIMEOUT, HID_REPORT_TYPE_OUTPUT, HID_SET_REPORT,
    IR_ENDPOINT, IR_INTERFACE, KERNEL_DRIVER,
};
use crate::remote::{RawReport, REPORT_LEN};
use rusb::{DeviceHandle, GlobalContext};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Claimed,
    Released,
}

pub struct DeviceSession {
    /// `None` once released.
    handle:    Option<DeviceHandle<GlobalContext>>,
    bus:       u8,
    address:   u8,
    interface: u8,
    /// We detached a resident driver and owe the kernel a reattach.
    detached:  bool,
    state:     SessionState,
}

impl DeviceSession {
    /// Open and claim the first attached device matching `vendor_id:product_id`.
    pub fn acquire(vendor_id: u16, product_id: u16) -> Result<Self, UsbError> {
        let devices = rusb::devices().map_err(UsbError::Enumerate)?;

        let device = devices
            .iter()
            .find(|d| {
                d.device_descriptor()
                    .map(|desc| desc.vendor_id() == vendor_id && desc.product_id() == product_id)
                    .unwrap_or(false)
            })
            .ok_or(UsbError::DeviceNotFound { vendor_id, product_id })?;

        let (bus, address) = (device.bus_number(), device.address());
        log::info!("[session] found {vendor_id:04x}:{product_id:04x} at bus={bus:03} addr={address:03}");

        let interface = IR_INTERFACE;
        // Opening /dev/bus/usb/* is where a missing permission shows up first.
        let handle = device
            .open()
            .map_err(|source| UsbError::ClaimFailed { interface, source })?;

        // Interface is normally owned by usbhid.
        let detached = match handle.kernel_driver_active(interface) {
            Ok(true) => match handle.detach_kernel_driver(interface) {
                Ok(()) => {
                    log::debug!("[session] detached kernel driver from interface {interface}");
                    true
                }
                Err(e) => {
                    log::warn!("[session] detach kernel driver failed: {e}");
                    false
                }
            },
            Ok(false) => false,
            Err(e) => {
                log::debug!("[session] kernel_driver_active unsupported ({e}) — skipping detach");
                false
            }
        };

        let mut session = Self {
            handle: Some(handle),
            bus,
            address,
            interface,
            detached,
            state: SessionState::Released,
        };

        // From here on Drop reattaches the driver even if claiming fails.
        if let Some(h) = session.handle.as_ref() {
            h.claim_interface(interface)
                .map_err(|source| UsbError::ClaimFailed { interface, source })?;
        }
        session.state = SessionState::Claimed;
        log::info!("[session] claimed interface {interface}");

        Ok(session)
    }

    /// Release the interface and hand the device back to usbhid.
    /// Best-effort: failures are logged, never returned.  Idempotent.
    pub fn release(&mut self) {
        let Some(handle) = self.handle.take() else { return };

        if self.state == SessionState::Claimed {
            if let Err(e) = handle.release_interface(self.interface) {
                log::warn!("[session] release interface {} failed: {e}", self.interface);
            }
        }
        self.state = SessionState::Released;

        if !self.detached {
            log::info!("[session] released");
            return;
        }

        match handle.attach_kernel_driver(self.interface) {
            Ok(()) => {
                log::info!("[session] released, {KERNEL_DRIVER} reattached");
                return;
            }
            Err(e) => log::debug!("[session] libusb reattach failed ({e}) — trying sysfs bind"),
        }

        // The bind is refused while our file descriptor is still open.
        drop(handle);
        match sysfs::rebind(sysfs::SYSFS_USB_ROOT, self.bus, self.address, self.interface, KERNEL_DRIVER) {
            Ok(name) => log::info!("[session] released, {KERNEL_DRIVER} rebound to {name}"),
            Err(e)   => log::warn!("[session] could not reattach {KERNEL_DRIVER}: {e:#}"),
        }
    }

    fn handle(&self) -> Result<&DeviceHandle<GlobalContext>, UsbError> {
        self.handle.as_ref().ok_or(UsbError::Disconnected)
    }
}

impl ReportDevice for DeviceSession {
    fn read_report(&mut self, timeout: Duration) -> Result<RawReport, UsbError> {
        let mut buf = [0u8; REPORT_LEN];
        match self.handle()?.read_interrupt(IR_ENDPOINT, &mut buf, timeout) {
            Ok(n) if n == REPORT_LEN => Ok(RawReport::from_bytes(buf)),
            Ok(n)                        => Err(UsbError::ShortRead(n)),
            Err(rusb::Error::Timeout)    => Err(UsbError::Timeout),
            Err(rusb::Error::NoDevice)   => Err(UsbError::Disconnected),
            Err(e)                       => Err(UsbError::Read(e)),
        }
    }

    fn write_report(&mut self, data: &[u8]) -> Result<(), UsbError> {
        let report_id = data.first().copied().unwrap_or(0);
        let request_type = rusb::request_type(
            rusb::Direction::Out,
            rusb::RequestType::Class,
            rusb::Recipient::Interface,
        );
        let written = self
            .handle()?
            .write_control(
                request_type,
                HID_SET_REPORT,
                HID_REPORT_TYPE_OUTPUT | report_id as u16,
                self.interface as u16,
                data,
                CONTROL_TIMEOUT,
            )
            .map_err(|e| match e {
                rusb::Error::NoDevice => UsbError::Disconnected,
                source => UsbError::ReportWriteFailed { report_id, source },
            })?;

        if written != data.len() {
            return Err(UsbError::ShortWrite { report_id, written, expected: data.len() });
        }
        Ok(())
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.release();
    }
}
