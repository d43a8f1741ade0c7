//! # udpscript
//!
//! A scripting engine for replaying send/receive sessions against a UDP peer.
//!
//! udpscript lets you write short scripts that write payloads, read replies,
//! pause, flush buffers and repeat blocks of steps, then replays them against a
//! transport while reporting every step. It is useful for integration tests of
//! datagram services and for scripted device interrogation.
//!
//! ## Quick start
//!
//! ```no_run
//! use udpscript::{ScriptExecutor, Transport, UdpConfig, UdpTransport, parse_str, report};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let script = r#"
//! FLUSH RX
//! LOOP START 3
//!     WRITE "status?"
//!     READ
//!     DELAY MILLISECONDS 250
//! LOOP END
//! "#;
//!
//!     let executor = ScriptExecutor::new(parse_str(script)?);
//!     let mut transport = UdpTransport::new(UdpConfig::default());
//!     executor
//!         .execute(Some(&mut transport), &report::stdout_observers())
//!         .await?;
//!     transport.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Script syntax
//!
//! | Line | Description |
//! |------|-------------|
//! | `WRITE "text"` | Send a payload (`WRITE text` takes the rest of the line unquoted) |
//! | `READ` | Receive one payload |
//! | `DELAY SECONDS 2` | Pause; also `MILLISECONDS` and `MICROSECONDS` |
//! | `FLUSH RX` | Discard pending input; also `TX` and `RX_TX` |
//! | `LOOP START 3` ... `LOOP END` | Repeat the enclosed lines; loops nest |
//! | `# comment` | Full-line or inline comment |
//!
//! Keywords are case-insensitive. Numeric arguments are checked when the
//! script runs, not when it is parsed.
//!
//! ## Loops
//!
//! Before a run, [`expand`] flattens every `LOOP START n` / `LOOP END` block,
//! innermost first, into the body repeated `n` times. Unmatched markers fail
//! with [`ScriptError::MalformedScript`]; infinite loops cannot be expanded
//! and fail with [`ScriptError::InvalidArgument`].
//!
//! ## Observing a run
//!
//! [`Observers`] bundles one callback per kind of step. Everything defaults to
//! a no-op:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use udpscript::{Observers, report};
//!
//! let lines = Arc::new(Mutex::new(Vec::new()));
//! let sink = lines.clone();
//! let observers = Observers::new()
//!     .on_write(move |payload| sink.lock().unwrap().push(report::format_write(payload)));
//! # let _ = observers;
//! ```
//!
//! ## Custom transports
//!
//! Implement [`Transport`] to run scripts over something other than UDP:
//!
//! ```
//! use async_trait::async_trait;
//! use std::io;
//! use udpscript::Transport;
//!
//! /// Replies to every read with whatever was last written.
//! #[derive(Default)]
//! pub struct Echo {
//!     open: bool,
//!     last: String,
//! }
//!
//! #[async_trait(?Send)]
//! impl Transport for Echo {
//!     async fn open(&mut self) -> io::Result<()> {
//!         self.open = true;
//!         Ok(())
//!     }
//!     fn is_open(&self) -> bool { self.open }
//!     async fn write(&mut self, payload: &str) -> io::Result<()> {
//!         self.last = payload.to_string();
//!         Ok(())
//!     }
//!     async fn read(&mut self) -> io::Result<String> { Ok(self.last.clone()) }
//!     async fn flush_receive(&mut self) -> io::Result<()> { Ok(()) }
//!     async fn flush_transmit(&mut self) -> io::Result<()> { Ok(()) }
//!     async fn close(&mut self) -> io::Result<()> {
//!         self.open = false;
//!         Ok(())
//!     }
//! }
//! ```

pub mod command;
pub mod error;
pub mod event;
pub mod executor;
pub mod expander;
pub mod parser;
pub mod report;
pub mod transport;
pub mod udp;

pub use command::{Command, CommandKind};
pub use error::ScriptError;
pub use event::{DelayUnit, FlushKind, LoopBoundary, LoopCount, LoopEvent, Observers};
pub use executor::ScriptExecutor;
pub use expander::{Step, expand, expand_steps};
pub use parser::{parse_file, parse_str};
pub use transport::Transport;
pub use udp::{LineEnding, UdpConfig, UdpMode, UdpTransport};
