//! The [`Transport`] capability a script is executed against.

use crate::event::FlushKind;
use async_trait::async_trait;
use std::io;

/// A bidirectional, line or datagram oriented channel.
///
/// The executor borrows the transport mutably for a whole run, so one
/// transport can never serve two scripts at once. Implementations decide what
/// "open" and "flush" mean for their medium; see
/// [`UdpTransport`](crate::UdpTransport) for the bundled implementation.
#[async_trait(?Send)]
pub trait Transport {
    /// Acquire whatever resources the transport needs to exchange data.
    async fn open(&mut self) -> io::Result<()>;

    fn is_open(&self) -> bool;

    /// Send one payload to the peer.
    async fn write(&mut self, payload: &str) -> io::Result<()>;

    /// Receive one payload from the peer.
    async fn read(&mut self) -> io::Result<String>;

    /// Discard anything received but not yet read.
    async fn flush_receive(&mut self) -> io::Result<()>;

    /// Push out or discard anything written but not yet sent.
    async fn flush_transmit(&mut self) -> io::Result<()>;

    async fn flush_both(&mut self) -> io::Result<()> {
        self.flush_receive().await?;
        self.flush_transmit().await
    }

    /// Release the transport's resources. [`open`](Self::open) may be called again afterwards.
    async fn close(&mut self) -> io::Result<()>;

    /// Perform the flush matching `kind`.
    async fn flush(&mut self, kind: FlushKind) -> io::Result<()> {
        match kind {
            FlushKind::Receive => self.flush_receive().await,
            FlushKind::Transmit => self.flush_transmit().await,
            FlushKind::Both => self.flush_both().await,
        }
    }
}
