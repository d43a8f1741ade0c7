//! Loop expansion: flattening `LOOP START n` / `LOOP END` blocks.
//!
//! Loops are resolved innermost first without recursion. On every pass the
//! last `LOOP START` in the current sequence is the innermost unresolved loop,
//! and the first `LOOP END` after it closes that loop. The span is replaced by
//! its body repeated `n` times and the scan restarts on the rebuilt sequence,
//! so nesting depth is bounded only by memory.

use crate::command::{Command, CommandKind};
use crate::error::{Result, ScriptError};
use crate::event::{LoopCount, LoopEvent};

/// One entry of an expanded script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A concrete command to dispatch
    Command(Command),
    /// A loop iteration boundary, kept only for reporting
    Loop(LoopEvent),
}

impl Step {
    fn is(&self, kind: CommandKind) -> bool {
        matches!(self, Step::Command(command) if command.kind() == kind)
    }
}

/// Expand every loop in `commands`, returning a new list with all
/// `LoopStart`/`LoopEnd` markers removed.
///
/// # Errors
///
/// - [`ScriptError::MalformedScript`] for an unmatched `LOOP START` or a
///   `LOOP END` with nothing to close.
/// - [`ScriptError::InvalidArgument`] for a repeat count that is not a
///   non-negative integer, or that asks for an infinite loop.
///
/// # Example
///
/// ```
/// use udpscript::{Command, expand};
///
/// let script = vec![
///     Command::write("A"),
///     Command::loop_start(2),
///     Command::write("B"),
///     Command::loop_end(),
/// ];
/// let flat = expand(&script).unwrap();
/// assert_eq!(
///     flat,
///     vec![Command::write("A"), Command::write("B"), Command::write("B")]
/// );
/// ```
pub fn expand(commands: &[Command]) -> Result<Vec<Command>> {
    Ok(expand_steps(commands)?
        .into_iter()
        .filter_map(|step| match step {
            Step::Command(command) => Some(command),
            Step::Loop(_) => None,
        })
        .collect())
}

/// Expand every loop in `commands`, keeping a [`Step::Loop`] event before and
/// after each repetition of a loop body.
///
/// The commands in the result are exactly those returned by [`expand`].
pub fn expand_steps(commands: &[Command]) -> Result<Vec<Step>> {
    validate_nesting(commands)?;

    let mut steps: Vec<Step> = commands.iter().cloned().map(Step::Command).collect();

    while let Some((start, marker)) = innermost_loop_start(&steps) {
        let end = steps[start + 1..]
            .iter()
            .position(|s| s.is(CommandKind::LoopEnd))
            .map(|offset| start + 1 + offset)
            .ok_or(ScriptError::MalformedScript {
                index: start,
                reason: "LOOP START has no matching LOOP END",
            })?;

        let fragment = repeat_body(marker, &steps[start + 1..end])?;
        steps.splice(start..=end, fragment);
    }

    Ok(steps)
}

/// The last `LOOP START` in `steps`, with its index.
fn innermost_loop_start(steps: &[Step]) -> Option<(usize, &Command)> {
    steps
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, step)| match step {
            Step::Command(command) if command.kind() == CommandKind::LoopStart => {
                Some((index, command))
            }
            _ => None,
        })
}

/// Build the replacement for one loop span: `body` once per iteration, each
/// copy wrapped in start and end events.
fn repeat_body(marker: &Command, body: &[Step]) -> Result<Vec<Step>> {
    let count = match marker.loop_count()? {
        LoopCount::Finite(count) => count,
        LoopCount::Infinite => {
            return Err(marker.invalid_argument("infinite loops cannot be expanded"));
        }
    };
    if body.is_empty() || count == 0 {
        return Ok(Vec::new());
    }

    let size = (body.len() + 2)
        .checked_mul(count)
        .ok_or_else(|| marker.invalid_argument("loop expands beyond addressable size"))?;

    let total = LoopCount::Finite(count);
    let mut fragment = Vec::new();
    fragment
        .try_reserve(size)
        .map_err(|_| marker.invalid_argument("loop expands beyond addressable size"))?;
    for iteration in 0..count {
        fragment.push(Step::Loop(LoopEvent::start(iteration, total)));
        fragment.extend_from_slice(body);
        fragment.push(Step::Loop(LoopEvent::end(iteration, total)));
    }
    Ok(fragment)
}

/// Check that loop markers pair up, reporting the original index of the first
/// offending marker.
fn validate_nesting(commands: &[Command]) -> Result<()> {
    let mut open = Vec::new();
    for (index, command) in commands.iter().enumerate() {
        match command.kind() {
            CommandKind::LoopStart => open.push(index),
            CommandKind::LoopEnd => {
                if open.pop().is_none() {
                    return Err(ScriptError::MalformedScript {
                        index,
                        reason: "LOOP END has no matching LOOP START",
                    });
                }
            }
            _ => {}
        }
    }
    match open.pop() {
        Some(index) => Err(ScriptError::MalformedScript {
            index,
            reason: "LOOP START has no matching LOOP END",
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FlushKind;

    fn loop_start(count: &str) -> Command {
        Command::new(CommandKind::LoopStart, count)
    }

    #[test]
    fn test_no_loops_is_identity() {
        let script = vec![
            Command::write("A"),
            Command::read(),
            Command::flush(FlushKind::Both),
            Command::new(CommandKind::DelaySeconds, "not a number"),
        ];
        assert_eq!(expand(&script).unwrap(), script);
        assert!(expand(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_loop() {
        let script = vec![
            Command::write("A"),
            Command::loop_start(2),
            Command::write("B"),
            Command::read(),
            Command::loop_end(),
            Command::write("C"),
        ];
        assert_eq!(
            expand(&script).unwrap(),
            vec![
                Command::write("A"),
                Command::write("B"),
                Command::read(),
                Command::write("B"),
                Command::read(),
                Command::write("C"),
            ]
        );
    }

    #[test]
    fn test_body_repeated_n_times() {
        for n in 0..5 {
            let script = vec![
                Command::loop_start(n),
                Command::write("x"),
                Command::read(),
                Command::loop_end(),
            ];
            let flat = expand(&script).unwrap();
            assert_eq!(flat.len(), 2 * n);
            for pair in flat.chunks(2) {
                assert_eq!(pair, [Command::write("x"), Command::read()]);
            }
        }
    }

    #[test]
    fn test_zero_count_drops_body() {
        let script = vec![
            Command::write("before"),
            Command::loop_start(0),
            Command::write("never"),
            Command::new(CommandKind::DelaySeconds, "bogus"),
            Command::loop_end(),
            Command::write("after"),
        ];
        assert_eq!(
            expand(&script).unwrap(),
            vec![Command::write("before"), Command::write("after")]
        );
    }

    #[test]
    fn test_empty_body() {
        let script = vec![Command::loop_start(1000), Command::loop_end()];
        assert!(expand(&script).unwrap().is_empty());
        assert!(expand_steps(&script).unwrap().is_empty());
    }

    #[test]
    fn test_nested_loops() {
        let script = vec![
            Command::loop_start(2),
            Command::loop_start(1),
            Command::write("X"),
            Command::loop_end(),
            Command::loop_end(),
        ];
        assert_eq!(
            expand(&script).unwrap(),
            vec![Command::write("X"), Command::write("X")]
        );
    }

    #[test]
    fn test_nested_loops_with_siblings() {
        // 2 x [ a, 2 x [b], 3 x [c] ]
        let script = vec![
            Command::loop_start(2),
            Command::write("a"),
            Command::loop_start(2),
            Command::write("b"),
            Command::loop_end(),
            Command::loop_start(3),
            Command::write("c"),
            Command::loop_end(),
            Command::loop_end(),
        ];
        let payloads: Vec<String> = expand(&script)
            .unwrap()
            .iter()
            .map(|c| c.argument().to_string())
            .collect();
        assert_eq!(
            payloads,
            ["a", "b", "b", "c", "c", "c", "a", "b", "b", "c", "c", "c"]
        );
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 2_000;
        let mut script = Vec::new();
        for _ in 0..depth {
            script.push(Command::loop_start(1));
        }
        script.push(Command::write("core"));
        for _ in 0..depth {
            script.push(Command::loop_end());
        }
        assert_eq!(expand(&script).unwrap(), vec![Command::write("core")]);
    }

    #[test]
    fn test_unmatched_loop_start() {
        let script = vec![
            Command::write("A"),
            Command::loop_start(2),
            Command::write("B"),
        ];
        match expand(&script) {
            Err(ScriptError::MalformedScript { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected MalformedScript, got {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_outer_loop_start() {
        let script = vec![
            Command::loop_start(2),
            Command::loop_start(3),
            Command::write("B"),
            Command::loop_end(),
        ];
        match expand(&script) {
            Err(ScriptError::MalformedScript { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected MalformedScript, got {other:?}"),
        }
    }

    #[test]
    fn test_stray_loop_end() {
        let script = vec![Command::write("A"), Command::loop_end()];
        match expand(&script) {
            Err(ScriptError::MalformedScript { index, reason }) => {
                assert_eq!(index, 1);
                assert!(reason.contains("LOOP END"));
            }
            other => panic!("expected MalformedScript, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_counts() {
        for bad in ["-1", "two", "", "infinite", "INFINITE"] {
            let script = vec![loop_start(bad), Command::write("x"), Command::loop_end()];
            assert!(
                matches!(expand(&script), Err(ScriptError::InvalidArgument { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_oversized_loop_fails() {
        let counts = [
            (usize::MAX / 3).to_string(),
            usize::MAX.to_string(),
            "1000000000000000000".to_string(),
        ];
        for count in counts {
            let script = vec![loop_start(&count), Command::write("x"), Command::loop_end()];
            match expand(&script) {
                Err(ScriptError::InvalidArgument { argument, reason, .. }) => {
                    assert_eq!(argument, count);
                    assert_eq!(reason, "loop expands beyond addressable size");
                }
                other => panic!("expected InvalidArgument for {count}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let script = vec![Command::loop_start(2), Command::read(), Command::loop_end()];
        let copy = script.clone();
        expand(&script).unwrap();
        assert_eq!(script, copy);
    }

    #[test]
    fn test_steps_wrap_each_iteration() {
        let script = vec![Command::loop_start(2), Command::read(), Command::loop_end()];
        let count = LoopCount::Finite(2);
        assert_eq!(
            expand_steps(&script).unwrap(),
            vec![
                Step::Loop(LoopEvent::start(0, count)),
                Step::Command(Command::read()),
                Step::Loop(LoopEvent::end(0, count)),
                Step::Loop(LoopEvent::start(1, count)),
                Step::Command(Command::read()),
                Step::Loop(LoopEvent::end(1, count)),
            ]
        );
    }

    #[test]
    fn test_nested_steps_repeat_inner_events() {
        let script = vec![
            Command::loop_start(2),
            Command::loop_start(1),
            Command::read(),
            Command::loop_end(),
            Command::loop_end(),
        ];
        let steps = expand_steps(&script).unwrap();
        let inner_starts = steps
            .iter()
            .filter(|s| matches!(s, Step::Loop(e) if e.is_first() && e.count == LoopCount::Finite(1)))
            .count();
        assert_eq!(inner_starts, 2);
        assert_eq!(steps.len(), 2 * (1 + 2) + 2 * 2);
    }
}
