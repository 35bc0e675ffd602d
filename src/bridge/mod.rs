// src/bridge/mod.rs  —  Main loop: read → decode → state machines → notifier
//
// Single-threaded.  One blocking read per iteration with READ_TIMEOUT; a
// timeout is turned into the idle command so a held Menu/Play gets its hold
// check and a released one gets its close-out, without any timer thread.
use crate::indicator::{self, IndicatorMode};
use crate::notify::{Dispatcher, Notifier};
use crate::remote::timing::READ_TIMEOUT;
use crate::remote::{
    decode, ButtonMachine, Category, DecodedCommand, RawReport, SpecialEvent, SpecialMachine,
};
use crate::usb::{ReportDevice, UsbError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Ping the listener after this much silence.
pub const KEEP_ALIVE: Duration = Duration::from_secs(30);

pub struct Bridge<N: Notifier> {
    buttons:     ButtonMachine,
    special:     SpecialMachine,
    dispatcher:  Dispatcher,
    notifier:    N,
    idle_mode:   IndicatorMode,
    active_mode: IndicatorMode,
    /// Last mode written in full; the sequence is only re-sent on change.
    /// `None` after a failed write so the next tick retries.
    lit:         Option<IndicatorMode>,
    last_sent:   Instant,
}

impl<N: Notifier> Bridge<N> {
    pub fn new(
        dispatcher:  Dispatcher,
        notifier:    N,
        idle_mode:   IndicatorMode,
        active_mode: IndicatorMode,
    ) -> Self {
        Self {
            buttons: ButtonMachine::new(),
            special: SpecialMachine::new(),
            dispatcher,
            notifier,
            idle_mode,
            active_mode,
            lit: None,
            last_sent: Instant::now(),
        }
    }

    /// Startup writes: optional brightness and fan, then the idle LED.
    pub fn start(&mut self, dev: &mut impl ReportDevice, high_brightness: Option<bool>, fan: Option<bool>) {
        if let Some(high) = high_brightness { indicator::set_brightness(dev, high); }
        if let Some(on) = fan               { indicator::set_fan(dev, on); }
        self.show(dev, self.idle_mode);
        log::info!("[bridge] Ready!");
    }

    /// Poll until `stop` is set or the device goes away.
    pub fn run(&mut self, dev: &mut impl ReportDevice, stop: &AtomicBool) -> Result<(), UsbError> {
        while !stop.load(Ordering::SeqCst) {
            self.poll_once(dev)?;
        }
        log::info!("[bridge] stop requested");
        Ok(())
    }

    /// One loop iteration.  Only fatal device errors are returned.
    pub fn poll_once(&mut self, dev: &mut impl ReportDevice) -> Result<(), UsbError> {
        match dev.read_report(READ_TIMEOUT) {
            Ok(raw)                => self.on_report(dev, &raw, Instant::now()),
            Err(UsbError::Timeout) => self.on_idle(dev, Instant::now()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e)                 => log::warn!("[bridge] {e}"),
        }
        Ok(())
    }

    pub fn on_report(&mut self, dev: &mut impl ReportDevice, raw: &RawReport, now: Instant) {
        self.show(dev, self.active_mode);
        log::debug!("[bridge] report {}", raw.hex());

        let cmd = decode(raw);
        match cmd.category {
            Category::Button     => self.on_button(&cmd, now),
            Category::Special    => self.on_special(&cmd, now),
            Category::Unknown(e) => log::warn!("[bridge] unknown event 0x{e:02x} — dropped"),
        }
    }

    pub fn on_idle(&mut self, dev: &mut impl ReportDevice, now: Instant) {
        self.show(dev, self.idle_mode);
        self.on_button(&DecodedCommand::idle(), now);

        if now.saturating_duration_since(self.last_sent) >= KEEP_ALIVE {
            if let Err(e) = self.notifier.keep_alive() {
                log::warn!("[bridge] keep-alive failed: {e:#}");
            }
            self.last_sent = now;
        }
    }

    fn on_button(&mut self, cmd: &DecodedCommand, now: Instant) {
        for button in self.buttons.on_command(cmd, now) {
            log::debug!("[bridge] {}", button.label());
            if let Err(e) = self.dispatcher.dispatch(&mut self.notifier, button) {
                log::warn!("[bridge] sending {} failed: {e:#}", button.label());
            }
            self.last_sent = now;
        }
    }

    fn on_special(&mut self, cmd: &DecodedCommand, now: Instant) {
        let sent = match self.special.on_command(cmd, now) {
            Some(SpecialEvent::Pair(id)) => {
                log::info!("[bridge] Pairing ID: {id}");
                self.notifier.send_notification("Remote paired", "Your remote is now paired.")
            }
            Some(SpecialEvent::Unpair(id)) => {
                log::info!("[bridge] Unpairing ID: {id}");
                self.notifier.send_notification("Remote unpaired", "Your remote is now unpaired.")
            }
            Some(SpecialEvent::UpdateNotice(id)) => {
                log::info!("[bridge] Updating Remote ID: {id}");
                return;
            }
            None => return,
        };
        if let Err(e) = sent {
            log::warn!("[bridge] notification failed: {e:#}");
        }
        self.last_sent = now;
    }

    /// Turn the LED off and say goodbye.  The session itself is released by
    /// its owner.
    pub fn shutdown(&mut self, dev: &mut impl ReportDevice) {
        self.show(dev, IndicatorMode::Off);
        if let Err(e) = self.notifier.goodbye() {
            log::warn!("[bridge] goodbye failed: {e:#}");
        }
    }

    fn show(&mut self, dev: &mut impl ReportDevice, mode: IndicatorMode) {
        if self.lit != Some(mode) {
            self.lit = indicator::set_mode(dev, mode).then_some(mode);
        }
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &N { &self.notifier }
}
