// src/usb/sysfs.rs  —  Rebind a kernel driver to a USB interface via sysfs
//
// Kernel interface names look like  <busnum>-<devpath>:<config>.<interface>
// e.g. "3-1.2:1.0".  libusb gives us bus number + device address but not the
// devpath, so we scan /sys/bus/usb/devices/<busnum>-* and match `devnum`.
// Writing the name to /sys/bus/usb/drivers/<driver>/bind reattaches it.
use anyhow::{anyhow, Context, Result};
use std::path::Path;

pub const SYSFS_USB_ROOT: &str = "/sys/bus/usb";

/// Configuration value used in the interface name.
const USB_CONFIG: u8 = 1;

/// Find the kernel name of `interface` on the device at `bus`/`devnum`.
pub fn kernel_name(root: &Path, bus: u8, devnum: u8, interface: u8) -> Option<String> {
    let prefix = format!("{bus}-");
    let entries = std::fs::read_dir(root.join("devices")).ok()?;

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        // Only device nodes on our bus; skip interface nodes ("3-1:1.0").
        if !name.starts_with(&prefix) || name.contains(':') {
            continue;
        }
        let Ok(raw) = std::fs::read_to_string(entry.path().join("devnum")) else { continue };
        if raw.trim().parse::<u8>().ok() == Some(devnum) {
            return Some(format!("{name}:{USB_CONFIG}.{interface}"));
        }
    }
    None
}

/// Bind `driver` to the interface; returns the kernel name that was bound.
pub fn rebind(root: impl AsRef<Path>, bus: u8, devnum: u8, interface: u8, driver: &str) -> Result<String> {
    let root = root.as_ref();
    let name = kernel_name(root, bus, devnum, interface)
        .ok_or_else(|| anyhow!("no sysfs entry for bus={bus} devnum={devnum}"))?;

    let bind = root.join("drivers").join(driver).join("bind");
    std::fs::write(&bind, name.as_bytes())
        .with_context(|| format!("Writing {name} to {}", bind.display()))?;
    Ok(name)
}
