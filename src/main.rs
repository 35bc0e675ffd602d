// src/main.rs  —  atv-remote-bridge  entry point
mod bridge;
mod config;
mod indicator;
mod notify;
mod remote;
mod usb;

use anyhow::Result;
use bridge::Bridge;
use clap::Parser;
use config::{AppConfig, Cli};
use notify::Dispatcher;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use usb::{DeviceSession, UsbError};

// ── Exit codes ────────────────────────────────────────────────────────────────
const EXIT_NOT_FOUND:    u8 = 1;
const EXIT_CLAIM_FAILED: u8 = 2;
const EXIT_DEVICE_LOST:  u8 = 3;
const EXIT_OTHER:        u8 = 4;

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(e: &anyhow::Error) -> u8 {
    match e.chain().find_map(|c| c.downcast_ref::<UsbError>()) {
        Some(UsbError::DeviceNotFound { .. }) => EXIT_NOT_FOUND,
        Some(UsbError::ClaimFailed { .. })    => EXIT_CLAIM_FAILED,
        Some(UsbError::Disconnected)          => EXIT_DEVICE_LOST,
        _                                     => EXIT_OTHER,
    }
}

fn run(cli: &Cli) -> Result<()> {
    // ── --print-config  ───────────────────────────────────────────────────────
    if cli.print_config {
        print!("{}", config::DEFAULT_CONFIG_TOML);
        return Ok(());
    }

    // ── --write-config  ───────────────────────────────────────────────────────
    if cli.write_config {
        let path = AppConfig::write_default_config(cli)?;
        println!("Config written to: {}", path.display());
        return Ok(());
    }

    let cfg = AppConfig::load(cli)?;

    // ── --list-devices  ───────────────────────────────────────────────────────
    if cli.list_devices {
        let lines = usb::list_devices(cfg.vendor_id, cfg.product_id)?;
        if lines.is_empty() {
            println!("No USB devices found.");
        }
        for l in &lines { println!("{l}"); }
        return Ok(());
    }

    // ── --set-led  ────────────────────────────────────────────────────────────
    if let Some(mode) = cli.set_led {
        let mut session = DeviceSession::acquire(cfg.vendor_id, cfg.product_id)?;
        if !indicator::set_mode(&mut session, mode) {
            log::warn!("LED may not show {mode:?}");
        }
        session.release();
        return Ok(());
    }

    // ── Stop flag (Ctrl+C / SIGTERM) ──────────────────────────────────────────
    // The loop wakes at least every READ_TIMEOUT, so the flag is seen quickly
    // and the session is released on the normal path below.
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || stop_handler.store(true, Ordering::SeqCst)) {
        log::warn!("Could not install Ctrl+C handler: {e}");
    }

    // ── Notifier, then device ─────────────────────────────────────────────────
    let notifier = notify::create_notifier(&cfg)?;
    let mut session = DeviceSession::acquire(cfg.vendor_id, cfg.product_id)?;

    let mut bridge = Bridge::new(
        Dispatcher::new(&cfg.device_map),
        notifier,
        cfg.idle_mode,
        cfg.active_mode,
    );

    // ── Main loop ─────────────────────────────────────────────────────────────
    bridge.start(&mut session, cfg.high_brightness, cfg.fan);
    let result = bridge.run(&mut session, &stop);

    // ── Cleanup ───────────────────────────────────────────────────────────────
    if result.is_ok() {
        bridge.shutdown(&mut session);
    }
    session.release();
    log::info!("Shutdown complete");

    result.map_err(anyhow::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_root_cause() {
        let nf = anyhow::Error::new(UsbError::DeviceNotFound { vendor_id: 0x05ac, product_id: 0x8241 });
        assert_eq!(exit_code(&nf), EXIT_NOT_FOUND);

        let claim = anyhow::Error::new(UsbError::ClaimFailed { interface: 0, source: rusb::Error::Access });
        assert_eq!(exit_code(&claim), EXIT_CLAIM_FAILED);

        let lost = anyhow::Error::new(UsbError::Disconnected).context("main loop");
        assert_eq!(exit_code(&lost), EXIT_DEVICE_LOST);

        assert_eq!(exit_code(&anyhow::anyhow!("bad config")), EXIT_OTHER);
    }

    #[test]
    fn print_config_needs_no_device() {
        let cli = Cli { print_config: true, ..Default::default() };
        assert!(run(&cli).is_ok());
    }
}
