// src/notify/eventserver.rs  —  XBMC / Kodi EventServer client (UDP, default port 9777)
//
// Every datagram is a 32-byte header followed by the payload:
//
//   0   "XBMC"            signature
//   4   0x02 0x00         protocol version 2.0
//   6   u16               packet type
//   8   u32               sequence number (1-based)
//   12  u32               total packets (we always send 1)
//   16  u16               payload size
//   18  u32               client uid
//   22  [u8; 10]          reserved
//
// All integers are big-endian; strings are NUL-terminated.  The listener
// forgets a client that stays silent for a minute, so the bridge pings
// during idle periods.
use super::Notifier;
use anyhow::{anyhow, Context, Result};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

pub const DEFAULT_PORT: u16 = 9777;

const HEADER_LEN: usize = 32;
const MAX_PAYLOAD: usize = 1024 - HEADER_LEN;

const PT_HELO:         u16 = 0x01;
const PT_BYE:          u16 = 0x02;
const PT_BUTTON:       u16 = 0x03;
const PT_PING:         u16 = 0x05;
const PT_NOTIFICATION: u16 = 0x07;

const ICON_NONE: u8 = 0x00;

fn push_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

/// Wrap `payload` in a single-packet header.
pub fn packet(kind: u16, uid: u32, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(anyhow!("EventServer payload too large ({} bytes)", payload.len()));
    }
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(b"XBMC");
    buf.extend_from_slice(&[2, 0]);
    buf.extend_from_slice(&kind.to_be_bytes());
    buf.extend_from_slice(&1u32.to_be_bytes());
    buf.extend_from_slice(&1u32.to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    buf.extend_from_slice(&uid.to_be_bytes());
    buf.extend_from_slice(&[0u8; 10]);
    buf.extend_from_slice(payload);
    Ok(buf)
}

pub fn helo_payload(name: &str) -> Vec<u8> {
    let mut p = Vec::new();
    push_str(&mut p, name);
    p.push(ICON_NONE);
    p.extend_from_slice(&0u16.to_be_bytes()); // port (unused)
    p.extend_from_slice(&[0u8; 8]);           // reserved
    p
}

pub fn button_payload(code: u16, source: &str, flags: u16) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&code.to_be_bytes());
    p.extend_from_slice(&flags.to_be_bytes());
    p.extend_from_slice(&0u16.to_be_bytes()); // amount
    push_str(&mut p, source);
    push_str(&mut p, "");                     // button name: sent by code
    p
}

pub fn notification_payload(title: &str, body: &str) -> Vec<u8> {
    let mut p = Vec::new();
    push_str(&mut p, title);
    push_str(&mut p, body);
    p.push(ICON_NONE);
    p.extend_from_slice(&[0u8; 4]); // reserved
    p
}

pub struct EventServerNotifier {
    socket: UdpSocket,
    target: SocketAddr,
    uid:    u32,
}

impl EventServerNotifier {
    /// Resolve `host:port`, open a UDP socket and say HELO as `client_name`.
    pub fn connect(host: &str, port: u16, client_name: &str) -> Result<Self> {
        let target = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("Resolving EventServer {host}:{port}"))?
            .next()
            .ok_or_else(|| anyhow!("EventServer {host}:{port} resolved to no address"))?;

        let bind: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind).context("Creating UDP socket")?;

        let mut n = Self { socket, target, uid: std::process::id() };
        n.send(PT_HELO, &helo_payload(client_name))?;
        log::info!("[eventserver] HELO sent to {target} as \"{client_name}\"");
        Ok(n)
    }

    fn send(&mut self, kind: u16, payload: &[u8]) -> Result<()> {
        let pkt = packet(kind, self.uid, payload)?;
        self.socket
            .send_to(&pkt, self.target)
            .with_context(|| format!("Sending packet type {kind} to {}", self.target))?;
        Ok(())
    }
}

impl Notifier for EventServerNotifier {
    fn send_button(&mut self, code: u16, source: &str, flags: u16) -> Result<()> {
        self.send(PT_BUTTON, &button_payload(code, source, flags))
    }

    fn send_notification(&mut self, title: &str, body: &str) -> Result<()> {
        self.send(PT_NOTIFICATION, &notification_payload(title, body))
    }

    fn keep_alive(&mut self) -> Result<()> {
        log::trace!("[eventserver] ping");
        self.send(PT_PING, &[])
    }

    fn goodbye(&mut self) -> Result<()> {
        log::info!("[eventserver] BYE");
        self.send(PT_BYE, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn header_layout() {
        let pkt = packet(PT_BUTTON, 0x01020304, &[0xaa, 0xbb]).unwrap();
        assert_eq!(pkt.len(), HEADER_LEN + 2);
        assert_eq!(&pkt[0..4], b"XBMC");
        assert_eq!(&pkt[4..6], &[2, 0]);
        assert_eq!(&pkt[6..8], &[0, 3]);
        assert_eq!(&pkt[8..12], &[0, 0, 0, 1]);
        assert_eq!(&pkt[12..16], &[0, 0, 0, 1]);
        assert_eq!(&pkt[16..18], &[0, 2]);
        assert_eq!(&pkt[18..22], &[1, 2, 3, 4]);
        assert!(pkt[22..32].iter().all(|b| *b == 0));
        assert_eq!(&pkt[32..], &[0xaa, 0xbb]);
    }

    #[test]
    fn button_payload_layout() {
        let p = button_payload(6, "JS0:AppleRemote", 0x32);
        let mut want = vec![0, 6, 0, 0x32, 0, 0];
        want.extend_from_slice(b"JS0:AppleRemote\0\0");
        assert_eq!(p, want);
    }

    #[test]
    fn notification_payload_layout() {
        let p = notification_payload("Remote paired", "ok");
        let mut want = b"Remote paired\0ok\0".to_vec();
        want.extend_from_slice(&[ICON_NONE, 0, 0, 0, 0]);
        assert_eq!(p, want);
    }

    #[test]
    fn oversized_payload_rejected() {
        assert!(packet(PT_NOTIFICATION, 1, &vec![b'x'; MAX_PAYLOAD + 1]).is_err());
    }

    #[test]
    fn helo_and_button_reach_listener() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut n = EventServerNotifier::connect("127.0.0.1", port, "Apple Remote").unwrap();
        n.send_button(5, "JS0:AppleRemote", 0x32).unwrap();

        let mut buf = [0u8; 1024];
        let len = listener.recv(&mut buf).unwrap();
        assert_eq!(&buf[6..8], &[0, PT_HELO as u8]);
        assert_eq!(&buf[HEADER_LEN..len], helo_payload("Apple Remote").as_slice());

        let len = listener.recv(&mut buf).unwrap();
        assert_eq!(&buf[6..8], &[0, PT_BUTTON as u8]);
        assert_eq!(&buf[HEADER_LEN..len], button_payload(5, "JS0:AppleRemote", 0x32).as_slice());
    }
}
