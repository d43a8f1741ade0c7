//! [`UdpTransport`]: a [`Transport`] over a pair of UDP sockets.
//!
//! Payloads are sent from a socket bound to the return port to the configured
//! client host and port, and received on a socket bound to the server port.
//! One payload is one datagram.

use crate::transport::Transport;
use async_trait::async_trait;
use rand::Rng;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tokio::net::{UdpSocket, lookup_host};
use tokio::time::timeout;
use tracing::{debug, info};

pub const DEFAULT_CLIENT_HOST: &str = "127.0.0.1";
pub const DEFAULT_CLIENT_PORT: u16 = 8887;
pub const DEFAULT_SERVER_PORT: u16 = 8888;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(25);

/// Largest payload a single UDP datagram can carry over IPv4.
const MAX_DATAGRAM: usize = 65_507;

/// Line ending appended to every written payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    None,
    Cr,
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::None => "",
            LineEnding::Cr => "\r",
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

impl FromStr for LineEnding {
    type Err = String;

    /// Accepts `none`, `cr`, `lf`, `crlf` in any case, or the literal characters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(LineEnding::None),
            "cr" | "\r" => Ok(LineEnding::Cr),
            "lf" | "\n" => Ok(LineEnding::Lf),
            "crlf" | "\r\n" => Ok(LineEnding::CrLf),
            _ => Err(format!(
                "invalid line ending '{s}', expected one of: none, cr, lf, crlf"
            )),
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineEnding::None => "None",
            LineEnding::Cr => "\\r (Carriage Return)",
            LineEnding::Lf => "\\n (Line Feed)",
            LineEnding::CrLf => "\\r\\n (Carriage Return & Line Feed)",
        })
    }
}

/// Which directions the transport opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UdpMode {
    #[default]
    Duplex,
    /// Only the sending socket is opened
    SendOnly,
    /// Only the receiving socket is opened
    ReceiveOnly,
}

/// Addressing and behaviour of a [`UdpTransport`].
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Host datagrams are sent to
    pub client_host: String,
    /// Port datagrams are sent to
    pub client_port: u16,
    /// Local port datagrams are received on
    pub server_port: u16,
    /// Local port datagrams are sent from
    pub return_port: u16,
    pub line_ending: LineEnding,
    /// How long a read waits for a datagram before returning an empty string
    pub read_timeout: Duration,
    pub mode: UdpMode,
}

impl Default for UdpConfig {
    fn default() -> Self {
        UdpConfig {
            client_host: DEFAULT_CLIENT_HOST.to_string(),
            client_port: DEFAULT_CLIENT_PORT,
            server_port: DEFAULT_SERVER_PORT,
            return_port: random_return_port(),
            line_ending: LineEnding::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            mode: UdpMode::default(),
        }
    }
}

/// Pick a return port from the dynamic range.
pub fn random_return_port() -> u16 {
    rand::thread_rng().gen_range(49152..=u16::MAX)
}

/// Exchanges script payloads as UDP datagrams.
pub struct UdpTransport {
    config: UdpConfig,
    sender: Option<UdpSocket>,
    receiver: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn new(config: UdpConfig) -> Self {
        UdpTransport {
            config,
            sender: None,
            receiver: None,
        }
    }

    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    /// The peer address as `host:port`
    pub fn port_name(&self) -> String {
        format!("{}:{}", self.config.client_host, self.config.client_port)
    }

    /// Local address of the receiving socket, once open
    pub fn receive_addr(&self) -> Option<SocketAddr> {
        self.receiver.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Local address of the sending socket, once open
    pub fn send_addr(&self) -> Option<SocketAddr> {
        self.sender.as_ref().and_then(|s| s.local_addr().ok())
    }

    async fn open_sender(&self) -> io::Result<UdpSocket> {
        let peer = lookup_host((self.config.client_host.as_str(), self.config.client_port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("No address found for {}", self.port_name()),
                )
            })?;
        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, self.config.return_port).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, self.config.return_port).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        debug!(%local, %peer, "Bound sending socket");
        Ok(socket)
    }

    async fn open_receiver(&self) -> io::Result<UdpSocket> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.config.server_port)).await?;
        debug!(local = ?socket.local_addr().ok(), "Bound receiving socket");
        Ok(socket)
    }
}

fn not_open(direction: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotConnected,
        format!("UDP transport has no open {direction} socket"),
    )
}

#[async_trait(?Send)]
impl Transport for UdpTransport {
    async fn open(&mut self) -> io::Result<()> {
        let sender = match self.config.mode {
            UdpMode::ReceiveOnly => None,
            _ => Some(self.open_sender().await?),
        };
        let receiver = match self.config.mode {
            UdpMode::SendOnly => None,
            _ => Some(self.open_receiver().await?),
        };
        self.sender = sender;
        self.receiver = receiver;
        info!(peer = %self.port_name(), mode = ?self.config.mode, "Opened UDP transport");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.sender.is_some() || self.receiver.is_some()
    }

    async fn write(&mut self, payload: &str) -> io::Result<()> {
        let sender = self.sender.as_ref().ok_or_else(|| not_open("sending"))?;
        let mut datagram = String::with_capacity(payload.len() + 2);
        datagram.push_str(payload);
        datagram.push_str(self.config.line_ending.as_str());
        sender.send(datagram.as_bytes()).await?;
        Ok(())
    }

    /// Wait up to the read timeout for one datagram. Trailing `\r`/`\n`
    /// characters are removed; a timeout yields an empty string.
    async fn read(&mut self) -> io::Result<String> {
        let receiver = self.receiver.as_ref().ok_or_else(|| not_open("receiving"))?;
        let mut buffer = vec![0u8; MAX_DATAGRAM];
        match timeout(self.config.read_timeout, receiver.recv_from(&mut buffer)).await {
            Ok(received) => {
                let (len, from) = received?;
                debug!(%from, len, "Received datagram");
                let text = String::from_utf8_lossy(&buffer[..len]);
                Ok(text.trim_end_matches(['\r', '\n']).to_string())
            }
            Err(_) => Ok(String::new()),
        }
    }

    /// Drop every datagram already waiting on the receiving socket.
    async fn flush_receive(&mut self) -> io::Result<()> {
        let Some(receiver) = self.receiver.as_ref() else {
            return Ok(());
        };
        let mut buffer = vec![0u8; MAX_DATAGRAM];
        let mut dropped = 0usize;
        loop {
            match receiver.try_recv_from(&mut buffer) {
                Ok(_) => dropped += 1,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        debug!(dropped, "Flushed receiving socket");
        Ok(())
    }

    /// Datagrams leave on `write`, so there is never anything to flush.
    async fn flush_transmit(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.sender = None;
        self.receiver = None;
        debug!(peer = %self.port_name(), "Closed UDP transport");
        Ok(())
    }
}
