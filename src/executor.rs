//! [`ScriptExecutor`]: expands a loaded script and runs it against a transport.

use crate::command::{Command, CommandKind};
use crate::error::{Result, ScriptError};
use crate::event::Observers;
use crate::expander::{Step, expand_steps};
use crate::parser::parse_file;
use crate::transport::Transport;
use std::path::{Path, PathBuf};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Holds one loaded script and replays it on demand.
///
/// The script is kept exactly as loaded; every call to
/// [`execute`](Self::execute) expands it afresh, so nothing carries over
/// between runs.
#[derive(Debug, Clone, Default)]
pub struct ScriptExecutor {
    script_path: Option<PathBuf>,
    commands: Vec<Command>,
}

impl ScriptExecutor {
    /// Create an executor for an in-memory script.
    pub fn new(commands: Vec<Command>) -> Self {
        ScriptExecutor {
            script_path: None,
            commands,
        }
    }

    /// Load the script at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        Ok(ScriptExecutor {
            script_path: Some(path.to_path_buf()),
            commands: parse_file(path)?,
        })
    }

    /// Replace the script with the one at `path`.
    ///
    /// On error the previously loaded script is kept.
    pub fn set_script_file_path(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        *self = Self::from_file(path)?;
        Ok(())
    }

    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn has_commands(&self) -> bool {
        !self.commands.is_empty()
    }

    /// Run the script once against `transport`, reporting each step to
    /// `observers`.
    ///
    /// The transport is opened first if it is not already open. Commands run
    /// strictly in expanded order and the first failure aborts the run;
    /// anything already sent stays sent.
    ///
    /// # Errors
    ///
    /// - [`ScriptError::InvalidTransport`] if `transport` is `None`.
    /// - [`ScriptError::TransportOpen`] if opening the transport fails.
    /// - [`ScriptError::MalformedScript`] or [`ScriptError::InvalidArgument`]
    ///   if the script's loops cannot be expanded.
    /// - [`ScriptError::InvalidArgument`] for an unparseable delay.
    /// - [`ScriptError::TransportIo`] if a read, write or flush fails.
    /// - [`ScriptError::UnsupportedCommand`] for a command with no dispatch.
    pub async fn execute(
        &self,
        transport: Option<&mut dyn Transport>,
        observers: &Observers,
    ) -> Result<()> {
        let transport = transport.ok_or(ScriptError::InvalidTransport)?;
        if !transport.is_open() {
            debug!("Opening transport");
            transport.open().await.map_err(ScriptError::TransportOpen)?;
        }

        let steps = expand_steps(&self.commands)?;
        info!(
            script = ?self.script_path,
            commands = self.commands.len(),
            steps = steps.len(),
            "Executing script"
        );

        for step in steps {
            match step {
                Step::Loop(event) => observers.emit_loop(event),
                Step::Command(command) => {
                    if let Err(err) = dispatch(transport, &command, observers).await {
                        warn!(error = %err, "Script aborted");
                        return Err(err);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Execute a single expanded command.
async fn dispatch(
    transport: &mut dyn Transport,
    command: &Command,
    observers: &Observers,
) -> Result<()> {
    debug!(kind = %command.kind(), argument = command.argument(), "Dispatching");
    let io_error = |source: std::io::Error| ScriptError::TransportIo {
        kind: command.kind(),
        argument: command.argument().to_string(),
        source,
    };

    match command.kind() {
        CommandKind::Write => {
            transport.write(command.argument()).await.map_err(io_error)?;
            observers.emit_write(command.argument());
        }

        CommandKind::Read => {
            let value = transport.read().await.map_err(io_error)?;
            observers.emit_read(&value);
        }

        kind => {
            if let Some(unit) = kind.delay_unit() {
                let amount = command.duration()?;
                // Observers hear about the delay before it starts.
                observers.emit_delay(unit, amount);
                sleep(unit.to_duration(amount)).await;
            } else if let Some(flush) = kind.flush_kind() {
                observers.emit_flush(flush);
                transport.flush(flush).await.map_err(io_error)?;
            } else {
                // Loop markers never survive expansion, so only a bad load gets here.
                return Err(ScriptError::UnsupportedCommand {
                    kind,
                    argument: command.argument().to_string(),
                });
            }
        }
    }

    Ok(())
}
