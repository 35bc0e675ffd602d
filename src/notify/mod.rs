// src/notify/mod.rs  —  Notifier trait + LogicalButton dispatcher
pub mod eventserver;

use crate::config::AppConfig;
use crate::remote::LogicalButton;
use anyhow::Result;
use std::collections::HashMap;

pub use eventserver::EventServerNotifier;

/// EventServer button flags
pub const BTN_DOWN:      u16 = 0x02;
pub const BTN_QUEUE:     u16 = 0x10;
pub const BTN_NO_REPEAT: u16 = 0x20;

/// Outbound side of the bridge (XBMC / Kodi EventServer or a stand-in).
pub trait Notifier {
    /// Press button `code` on the keymap `source` (e.g. "JS0:AppleRemote").
    fn send_button(&mut self, code: u16, source: &str, flags: u16) -> Result<()>;
    /// Pop up a notification on the media center.
    fn send_notification(&mut self, title: &str, body: &str) -> Result<()>;
    /// Called during idle periods so the listener does not drop us.
    fn keep_alive(&mut self) -> Result<()> { Ok(()) }
    /// Called once at orderly shutdown.
    fn goodbye(&mut self) -> Result<()> { Ok(()) }
}

/// Dry-run backend: logs instead of sending (useful without a media center)
pub struct LogNotifier;
impl Notifier for LogNotifier {
    fn send_button(&mut self, code: u16, source: &str, flags: u16) -> Result<()> {
        log::info!("[dry-run] button {code} on {source} flags=0x{flags:02x}");
        Ok(())
    }
    fn send_notification(&mut self, title: &str, body: &str) -> Result<()> {
        log::info!("[dry-run] notification \"{title}\": {body}");
        Ok(())
    }
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn send_button(&mut self, code: u16, source: &str, flags: u16) -> Result<()> {
        (**self).send_button(code, source, flags)
    }
    fn send_notification(&mut self, title: &str, body: &str) -> Result<()> {
        (**self).send_notification(title, body)
    }
    fn keep_alive(&mut self) -> Result<()> { (**self).keep_alive() }
    fn goodbye(&mut self) -> Result<()> { (**self).goodbye() }
}

/// Factory: EventServer client, or the logging stand-in for --dry-run
pub fn create_notifier(cfg: &AppConfig) -> Result<Box<dyn Notifier>> {
    if cfg.dry_run {
        log::info!("[notify] dry run — events are logged, not sent");
        return Ok(Box::new(LogNotifier));
    }
    let n = EventServerNotifier::connect(&cfg.host, cfg.port, &cfg.client_name)?;
    Ok(Box::new(n))
}

/// What one LogicalButton turns into on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonBinding {
    pub code:   u16,
    pub source: String,
    pub flags:  u16,
}

/// LogicalButton → binding table, built once at startup.
pub struct Dispatcher {
    bindings: HashMap<LogicalButton, ButtonBinding>,
}

impl Dispatcher {
    /// Binds Up..HoldMenu to button codes 1..8 on `device_map`.
    pub fn new(device_map: &str) -> Self {
        let flags = BTN_DOWN | BTN_NO_REPEAT | BTN_QUEUE;
        let bindings = LogicalButton::ALL
            .iter()
            .zip(1u16..)
            .map(|(b, code)| (*b, ButtonBinding { code, source: device_map.to_string(), flags }))
            .collect();
        Self { bindings }
    }

    pub fn binding(&self, button: LogicalButton) -> &ButtonBinding {
        // Every variant is inserted by `new`.
        self.bindings
            .get(&button)
            .unwrap_or_else(|| unreachable!("no binding registered for {button:?}"))
    }

    pub fn dispatch(&self, notifier: &mut dyn Notifier, button: LogicalButton) -> Result<()> {
        let b = self.binding(button);
        log::debug!("[dispatch] {} → code {} on {}", button.label(), b.code, b.source);
        notifier.send_button(b.code, &b.source, b.flags)
    }
}


#[cfg(test)]
mod tests {
    use super::recording::{RecordingNotifier, Sent};
    use super::*;

    #[test]
    fn every_button_is_bound_to_its_code() {
        let d = Dispatcher::new("JS0:AppleRemote");
        let codes: Vec<u16> = LogicalButton::ALL.iter().map(|b| d.binding(*b).code).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(d.binding(LogicalButton::HoldMenu).code, 8);
        assert_eq!(d.binding(LogicalButton::Play).code, 5);
    }

    #[test]
    fn dispatch_sends_binding() {
        let d = Dispatcher::new("JS0:AppleRemote");
        let mut n = RecordingNotifier::default();
        d.dispatch(&mut n, LogicalButton::Menu).unwrap();
        assert_eq!(n.sent, vec![Sent::Button(6, "JS0:AppleRemote".into(), 0x32)]);
    }

    #[test]
    fn boxed_notifier_dispatches() {
        let d = Dispatcher::new("JS0:AppleRemote");
        let mut n: Box<RecordingNotifier> = Box::default();
        d.dispatch(&mut n, LogicalButton::HoldPlay).unwrap();
        assert_eq!(n.buttons(), vec![7]);
    }

    #[test]
    fn dry_run_factory_needs_no_listener() {
        let cfg = AppConfig { dry_run: true, host: "no.such.host.invalid".into(), ..Default::default() };
        let mut n = create_notifier(&cfg).unwrap();
        assert!(n.send_button(1, "JS0:AppleRemote", 0x32).is_ok());
        assert!(n.send_notification("Remote paired", "Your remote is now paired.").is_ok());
    }
}
