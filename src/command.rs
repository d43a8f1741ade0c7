//! The [`Command`] value type and the [`CommandKind`] it is classified by.

use crate::error::{Result, ScriptError};
use crate::event::{DelayUnit, FlushKind, LoopCount};
use std::fmt;

/// The kind of action a [`Command`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Write,
    Read,
    DelaySeconds,
    DelayMilliseconds,
    DelayMicroseconds,
    FlushReceive,
    FlushTransmit,
    FlushBoth,
    LoopStart,
    LoopEnd,
    Unspecified,
}

impl CommandKind {
    /// The delay unit for the three delay kinds, `None` otherwise.
    pub fn delay_unit(self) -> Option<DelayUnit> {
        match self {
            CommandKind::DelaySeconds => Some(DelayUnit::Seconds),
            CommandKind::DelayMilliseconds => Some(DelayUnit::Milliseconds),
            CommandKind::DelayMicroseconds => Some(DelayUnit::Microseconds),
            _ => None,
        }
    }

    /// The flush direction for the three flush kinds, `None` otherwise.
    pub fn flush_kind(self) -> Option<FlushKind> {
        match self {
            CommandKind::FlushReceive => Some(FlushKind::Receive),
            CommandKind::FlushTransmit => Some(FlushKind::Transmit),
            CommandKind::FlushBoth => Some(FlushKind::Both),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    /// Formats the kind as the keyword a script line uses for it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            CommandKind::Write => "WRITE",
            CommandKind::Read => "READ",
            CommandKind::DelaySeconds => "DELAY SECONDS",
            CommandKind::DelayMilliseconds => "DELAY MILLISECONDS",
            CommandKind::DelayMicroseconds => "DELAY MICROSECONDS",
            CommandKind::FlushReceive => "FLUSH RX",
            CommandKind::FlushTransmit => "FLUSH TX",
            CommandKind::FlushBoth => "FLUSH RX_TX",
            CommandKind::LoopStart => "LOOP START",
            CommandKind::LoopEnd => "LOOP END",
            CommandKind::Unspecified => "UNSPECIFIED",
        };
        f.write_str(keyword)
    }
}

/// A single scripted action: a [`CommandKind`] plus its raw string argument.
///
/// Arguments are stored exactly as loaded. Numeric arguments are only checked
/// when something asks for them through [`duration`](Self::duration) or
/// [`loop_count`](Self::loop_count), so a script may carry a bad argument in a
/// loop that never runs without failing to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: CommandKind,
    argument: String,
}

impl Command {
    /// Argument value a `LOOP START` uses to ask for an unbounded loop.
    pub const INFINITE: &'static str = "INFINITE";

    pub fn new(kind: CommandKind, argument: impl Into<String>) -> Self {
        Self {
            kind,
            argument: argument.into(),
        }
    }

    pub fn write(payload: impl Into<String>) -> Self {
        Self::new(CommandKind::Write, payload)
    }

    pub fn read() -> Self {
        Self::new(CommandKind::Read, "")
    }

    /// Create a delay command of the given unit.
    pub fn delay(unit: DelayUnit, amount: u64) -> Self {
        let kind = match unit {
            DelayUnit::Seconds => CommandKind::DelaySeconds,
            DelayUnit::Milliseconds => CommandKind::DelayMilliseconds,
            DelayUnit::Microseconds => CommandKind::DelayMicroseconds,
        };
        Self::new(kind, amount.to_string())
    }

    /// Create a flush command for the given direction.
    pub fn flush(kind: FlushKind) -> Self {
        let kind = match kind {
            FlushKind::Receive => CommandKind::FlushReceive,
            FlushKind::Transmit => CommandKind::FlushTransmit,
            FlushKind::Both => CommandKind::FlushBoth,
        };
        Self::new(kind, "")
    }

    pub fn loop_start(count: usize) -> Self {
        Self::new(CommandKind::LoopStart, count.to_string())
    }

    pub fn loop_end() -> Self {
        Self::new(CommandKind::LoopEnd, "")
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn argument(&self) -> &str {
        &self.argument
    }

    pub fn set_kind(&mut self, kind: CommandKind) {
        self.kind = kind;
    }

    pub fn set_argument(&mut self, argument: impl Into<String>) {
        self.argument = argument.into();
    }

    /// Parse the argument as a non-negative base-10 delay amount.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::InvalidArgument`] if the argument is empty,
    /// negative, or not an integer.
    pub fn duration(&self) -> Result<u64> {
        self.argument
            .trim()
            .parse::<u64>()
            .map_err(|e| self.invalid_argument(format!("expected a non-negative integer ({e})")))
    }

    /// Parse the argument as a loop repeat count.
    ///
    /// [`Command::INFINITE`] (any case) yields [`LoopCount::Infinite`].
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::InvalidArgument`] if the argument is neither the
    /// infinite sentinel nor a non-negative integer.
    pub fn loop_count(&self) -> Result<LoopCount> {
        let argument = self.argument.trim();
        if argument.eq_ignore_ascii_case(Self::INFINITE) {
            return Ok(LoopCount::Infinite);
        }
        argument
            .parse::<usize>()
            .map(LoopCount::Finite)
            .map_err(|e| self.invalid_argument(format!("expected a repeat count ({e})")))
    }

    pub(crate) fn invalid_argument(&self, reason: impl Into<String>) -> ScriptError {
        ScriptError::InvalidArgument {
            kind: self.kind,
            argument: self.argument.clone(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_reclassify() {
        let mut cmd = Command::new(CommandKind::Unspecified, "");
        cmd.set_kind(CommandKind::Write);
        cmd.set_argument("hello");
        assert_eq!(cmd, Command::write("hello"));
    }

    #[test]
    fn test_duration() {
        assert_eq!(Command::delay(DelayUnit::Seconds, 2).duration().unwrap(), 2);
        let padded = Command::new(CommandKind::DelayMilliseconds, " 500 ");
        assert_eq!(padded.duration().unwrap(), 500);
    }

    #[test]
    fn test_duration_rejects_bad_arguments() {
        for bad in ["", "abc", "-5", "1.5", "12ms"] {
            let cmd = Command::new(CommandKind::DelaySeconds, bad);
            assert!(
                matches!(cmd.duration(), Err(ScriptError::InvalidArgument { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_loop_count() {
        assert_eq!(
            Command::loop_start(3).loop_count().unwrap(),
            LoopCount::Finite(3)
        );
        let infinite = Command::new(CommandKind::LoopStart, "infinite");
        assert_eq!(infinite.loop_count().unwrap(), LoopCount::Infinite);
        let negative = Command::new(CommandKind::LoopStart, "-1");
        assert!(negative.loop_count().is_err());
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            CommandKind::DelayMicroseconds.delay_unit(),
            Some(DelayUnit::Microseconds)
        );
        assert_eq!(CommandKind::FlushBoth.flush_kind(), Some(FlushKind::Both));
        assert_eq!(CommandKind::Write.delay_unit(), None);
        assert_eq!(CommandKind::LoopEnd.flush_kind(), None);
    }

    #[test]
    fn test_kind_display_uses_script_keywords() {
        assert_eq!(CommandKind::FlushBoth.to_string(), "FLUSH RX_TX");
        assert_eq!(CommandKind::DelaySeconds.to_string(), "DELAY SECONDS");
    }
}
