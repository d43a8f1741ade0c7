//! Errors raised while expanding or executing a script.

use crate::command::CommandKind;
use std::io;
use thiserror::Error;

/// Everything that can abort a script run.
///
/// Each variant carries enough of the offending command to diagnose the
/// failure without the rest of the script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// No transport was handed to the executor
    #[error("No transport supplied to execute the script against")]
    InvalidTransport,

    /// The transport could not be opened
    #[error("Failed to open transport: {0}")]
    TransportOpen(#[source] io::Error),

    /// Loop markers are unmatched or overlap
    #[error("Malformed script at command {index}: {reason}")]
    MalformedScript { index: usize, reason: &'static str },

    /// A numeric argument did not parse or was out of range
    #[error("Invalid argument '{argument}' for {kind}: {reason}")]
    InvalidArgument {
        kind: CommandKind,
        argument: String,
        reason: String,
    },

    /// A command reached the executor that it cannot dispatch
    #[error("Unsupported command {kind} (argument: '{argument}')")]
    UnsupportedCommand { kind: CommandKind, argument: String },

    /// The transport failed while reading, writing or flushing
    #[error("Transport failure during {kind} '{argument}': {source}")]
    TransportIo {
        kind: CommandKind,
        argument: String,
        #[source]
        source: io::Error,
    },
}

/// Result type alias for script expansion and execution.
pub type Result<T> = std::result::Result<T, ScriptError>;
