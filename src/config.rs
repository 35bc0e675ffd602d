// src/config.rs  —  Runtime configuration (CLI + TOML)
use crate::indicator::IndicatorMode;
use crate::notify::eventserver::DEFAULT_PORT;
use crate::usb::{APPLE_VID, IR_PID};
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The example config is embedded directly in the binary at compile time.
/// Users can write it out with:  atv-remote-bridge --write-config
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config.toml.example");

// ── CLI ───────────────────────────────────────────────────────────────────────
#[derive(Parser, Debug, Default)]
#[command(
    name  = "atv-remote-bridge",
    about = "Apple TV IR remote → XBMC/Kodi EventServer bridge",
    version,
)]
pub struct Cli {
    /// Config file path (default: ~/.config/atv-remote-bridge/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// EventServer host (default: 127.0.0.1)
    #[arg(long)]
    pub host: Option<String>,

    /// EventServer UDP port (default: 9777)
    #[arg(long)]
    pub port: Option<u16>,

    /// Keymap device name sent with every button (default: JS0:AppleRemote)
    #[arg(long)]
    pub device_map: Option<String>,

    /// LED while no remote is active: off | amber | amber-blink | white | white-blink | both
    #[arg(long)]
    pub idle_led: Option<IndicatorMode>,

    /// LED while reports are arriving
    #[arg(long)]
    pub active_led: Option<IndicatorMode>,

    /// Log button events instead of sending them
    #[arg(long, action)]
    pub dry_run: bool,

    /// List attached USB devices (receiver marked with *) and exit
    #[arg(long, action)]
    pub list_devices: bool,

    /// Set the receiver LED to MODE and exit
    #[arg(long, value_name = "MODE")]
    pub set_led: Option<IndicatorMode>,

    /// Write the built-in default config.toml to the config path and exit.
    /// Use --config <PATH> to write to a custom location.
    #[arg(long, action)]
    pub write_config: bool,

    /// Print the built-in default config.toml to stdout and exit
    #[arg(long, action)]
    pub print_config: bool,
}

// ── TOML file structure ───────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    pub device:      Option<DeviceCfg>,
    pub eventserver: Option<EventServerCfg>,
    pub indicator:   Option<IndicatorCfg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCfg {
    pub vendor_id:  Option<u16>,
    pub product_id: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventServerCfg {
    pub host:        Option<String>,
    pub port:        Option<u16>,
    pub device_map:  Option<String>,
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorCfg {
    pub idle_mode:       Option<IndicatorMode>,
    pub active_mode:     Option<IndicatorMode>,
    pub high_brightness: Option<bool>,
    pub fan:             Option<bool>,
}

// ── Resolved / merged config ──────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub vendor_id:       u16,
    pub product_id:      u16,
    pub host:            String,
    pub port:            u16,
    /// Keymap name, e.g. "JS0:AppleRemote"
    pub device_map:      String,
    /// Name announced in the HELO packet
    pub client_name:     String,
    pub idle_mode:       IndicatorMode,
    pub active_mode:     IndicatorMode,
    /// None = leave the receiver's brightness alone
    pub high_brightness: Option<bool>,
    /// None = leave the fan alone
    pub fan:             Option<bool>,
    pub dry_run:         bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vendor_id:       APPLE_VID,
            product_id:      IR_PID,
            host:            "127.0.0.1".into(),
            port:            DEFAULT_PORT,
            device_map:      "JS0:AppleRemote".into(),
            client_name:     "Apple Remote".into(),
            idle_mode:       IndicatorMode::White,
            active_mode:     IndicatorMode::Off,
            high_brightness: None,
            fan:             None,
            dry_run:         false,
        }
    }
}

// ── Config loader ─────────────────────────────────────────────────────────────
impl AppConfig {
    /// Write the embedded default config to disk.
    /// Returns the path it was written to.
    pub fn write_default_config(cli: &Cli) -> Result<PathBuf> {
        let path = cli.config.clone().unwrap_or_else(default_config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Creating config directory {:?}", parent))?;
        }
        std::fs::write(&path, DEFAULT_CONFIG_TOML)
            .with_context(|| format!("Writing config to {:?}", path))?;
        Ok(path)
    }

    pub fn load(cli: &Cli) -> Result<Self> {
        let mut cfg = Self::default();

        // 1. Load TOML file
        let path = cli.config.clone().unwrap_or_else(default_config_path);
        if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Reading config {:?}", path))?;
            let fc = Self::parse(&raw)
                .with_context(|| format!("Parsing config {:?}", path))?;
            cfg.apply_file(&fc);
        } else if cli.config.is_some() {
            anyhow::bail!("Config file {} does not exist", path.display());
        } else {
            log::debug!("No config file at {} — using defaults", path.display());
        }

        // 2. Apply CLI overrides
        cfg.apply_cli(cli);
        Ok(cfg)
    }

    fn parse(raw: &str) -> Result<FileConfig> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_file(&mut self, fc: &FileConfig) {
        if let Some(d) = &fc.device {
            if let Some(v) = d.vendor_id  { self.vendor_id  = v; }
            if let Some(v) = d.product_id { self.product_id = v; }
        }
        if let Some(e) = &fc.eventserver {
            if let Some(v) = &e.host        { self.host        = v.clone(); }
            if let Some(v) = e.port         { self.port        = v; }
            if let Some(v) = &e.device_map  { self.device_map  = v.clone(); }
            if let Some(v) = &e.client_name { self.client_name = v.clone(); }
        }
        if let Some(i) = &fc.indicator {
            if let Some(v) = i.idle_mode       { self.idle_mode       = v; }
            if let Some(v) = i.active_mode     { self.active_mode     = v; }
            if let Some(v) = i.high_brightness { self.high_brightness = Some(v); }
            if let Some(v) = i.fan             { self.fan             = Some(v); }
        }
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(v) = &cli.host       { self.host        = v.clone(); }
        if let Some(v) = cli.port        { self.port        = v; }
        if let Some(v) = &cli.device_map { self.device_map  = v.clone(); }
        if let Some(v) = cli.idle_led    { self.idle_mode   = v; }
        if let Some(v) = cli.active_led  { self.active_mode = v; }
        if cli.dry_run                   { self.dry_run     = true; }
    }
}

fn default_config_path() -> PathBuf {
    config_home().join("atv-remote-bridge").join("config.toml")
}

fn config_home() -> PathBuf {
    if let Ok(v) = std::env::var("XDG_CONFIG_HOME") { return PathBuf::from(v); }
    let home = std::env::var("HOME").unwrap_or_default();
    PathBuf::from(home).join(".config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_example_parses_to_defaults() {
        let fc = AppConfig::parse(DEFAULT_CONFIG_TOML).unwrap();
        let mut cfg = AppConfig::default();
        cfg.apply_file(&fc);
        assert_eq!(cfg.vendor_id, 0x05ac);
        assert_eq!(cfg.product_id, 0x8241);
        assert_eq!(cfg.port, 9777);
        assert_eq!(cfg.device_map, "JS0:AppleRemote");
        assert_eq!(cfg.idle_mode, IndicatorMode::White);
        assert_eq!(cfg.active_mode, IndicatorMode::Off);
        assert_eq!(cfg.high_brightness, None);
    }

    #[test]
    fn file_values_apply() {
        let fc = AppConfig::parse(r#"
            [eventserver]
            host = "10.0.0.5"
            port = 9000

            [indicator]
            idle_mode = "amber_blink"
            fan = true
        "#).unwrap();
        let mut cfg = AppConfig::default();
        cfg.apply_file(&fc);
        assert_eq!(cfg.host, "10.0.0.5");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.idle_mode, IndicatorMode::AmberBlink);
        assert_eq!(cfg.fan, Some(true));
        assert_eq!(cfg.device_map, "JS0:AppleRemote");
    }

    #[test]
    fn cli_overrides_file() {
        let fc = AppConfig::parse("[eventserver]\nport = 9000\n").unwrap();
        let mut cfg = AppConfig::default();
        cfg.apply_file(&fc);
        let cli = Cli::parse_from(["atv-remote-bridge", "--port", "9100", "--idle-led", "both", "--dry-run"]);
        cfg.apply_cli(&cli);
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.idle_mode, IndicatorMode::Both);
        assert!(cfg.dry_run);
    }

    #[test]
    fn bad_mode_is_rejected() {
        assert!(AppConfig::parse("[indicator]\nidle_mode = \"purple\"\n").is_err());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let cli = Cli { config: Some(PathBuf::from("/nonexistent/atv.toml")), ..Default::default() };
        assert!(AppConfig::load(&cli).is_err());
    }
}
