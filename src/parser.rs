//! Script loader for the udpscript line format.
//!
//! The top-level entry points are [`parse_str`] and [`parse_file`].

use crate::command::{Command, CommandKind};
use anyhow::{Context as _, Result, anyhow, bail};
use std::path::Path;

/// Turn script text into commands, one per non-blank line.
///
/// A `#` outside a quoted payload starts a comment that runs to the end of the
/// line. Keywords match case-insensitively. Delay amounts and loop counts are
/// kept verbatim; the executor validates them when the script runs.
///
/// # Errors
///
/// Fails on the first line with an unknown keyword or sub-keyword, tokens after
/// an argument-less command, or a bad quoted payload. The error names the
/// 1-based line number.
///
/// # Example
///
/// ```
/// use udpscript::{Command, parse_str};
///
/// let commands = parse_str("WRITE \"hello\"  # greet\nREAD\n").unwrap();
/// assert_eq!(commands, [Command::write("hello"), Command::read()]);
/// ```
pub fn parse_str(content: &str) -> Result<Vec<Command>> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, raw)| {
            let text = strip_inline_comment(raw.trim());
            (!text.is_empty()).then_some((index + 1, text))
        })
        .map(|(number, text)| {
            parse_line(text).with_context(|| format!("Failed to parse line {number}: {text}"))
        })
        .collect()
}

/// Read a script file and hand its text to [`parse_str`].
///
/// # Errors
///
/// Fails when the file is unreadable or its content does not parse. Both
/// errors carry the path.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Command>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;
    parse_str(&content).with_context(|| format!("Invalid script file: {}", path.display()))
}

type ParseFn = fn(&str) -> Result<Command>;

static REGISTRY: &[(&str, ParseFn)] = &[
    ("WRITE", parse_write),
    ("READ", parse_read),
    ("DELAY", parse_delay),
    ("FLUSH", parse_flush),
    ("LOOP", parse_loop),
];

/// Dispatch a single non-empty, non-comment line to the matching keyword's parser.
fn parse_line(line: &str) -> Result<Command> {
    let (name, args) = split_word(line);
    REGISTRY
        .iter()
        .find(|(keyword, _)| keyword.eq_ignore_ascii_case(name))
        .map(|(_, parse)| parse(args))
        .unwrap_or_else(|| Err(anyhow!("Unknown command: {}", line)))
}

/// `WRITE "text"` or `WRITE text`. The unquoted form takes the rest of the line,
/// up to any inline comment.
fn parse_write(args: &str) -> Result<Command> {
    let args = args.trim();
    if args.starts_with('"') {
        Ok(Command::write(parse_quoted_string(args)?))
    } else {
        Ok(Command::write(args))
    }
}

fn parse_read(args: &str) -> Result<Command> {
    expect_no_arguments("READ", args)?;
    Ok(Command::read())
}

/// `DELAY SECONDS n`, `DELAY MILLISECONDS n` or `DELAY MICROSECONDS n`.
fn parse_delay(args: &str) -> Result<Command> {
    let (unit, amount) = split_word(args);
    let kind = match unit.to_ascii_uppercase().as_str() {
        "SECONDS" => CommandKind::DelaySeconds,
        "MILLISECONDS" => CommandKind::DelayMilliseconds,
        "MICROSECONDS" => CommandKind::DelayMicroseconds,
        _ => bail!("DELAY unit must be SECONDS, MILLISECONDS or MICROSECONDS, got: {unit}"),
    };
    Ok(Command::new(kind, amount.trim()))
}

/// `FLUSH RX`, `FLUSH TX` or `FLUSH RX_TX`.
fn parse_flush(args: &str) -> Result<Command> {
    let (direction, rest) = split_word(args);
    let kind = match direction.to_ascii_uppercase().as_str() {
        "RX" => CommandKind::FlushReceive,
        "TX" => CommandKind::FlushTransmit,
        "RX_TX" => CommandKind::FlushBoth,
        _ => bail!("FLUSH direction must be RX, TX or RX_TX, got: {direction}"),
    };
    expect_no_arguments("FLUSH", rest)?;
    Ok(Command::new(kind, ""))
}

/// `LOOP START n`, `LOOP START INFINITE`, `LOOP START` (infinite) or `LOOP END`.
fn parse_loop(args: &str) -> Result<Command> {
    let (which, rest) = split_word(args);
    match which.to_ascii_uppercase().as_str() {
        "START" => {
            let count = rest.trim();
            let count = if count.is_empty() { Command::INFINITE } else { count };
            Ok(Command::new(CommandKind::LoopStart, count))
        }
        "END" => {
            expect_no_arguments("LOOP END", rest)?;
            Ok(Command::loop_end())
        }
        _ => Err(anyhow!("LOOP must be followed by START or END, got: {which}")),
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    s.split_once(char::is_whitespace).unwrap_or((s, ""))
}

fn expect_no_arguments(keyword: &str, rest: &str) -> Result<()> {
    let rest = rest.trim();
    if rest.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{keyword} takes no argument, got: {rest}"))
    }
}

/// Cut `line` at the first `#` that is not inside a quoted payload.
fn strip_inline_comment(line: &str) -> &str {
    let mut quoted = false;
    let mut chars = line.char_indices();
    while let Some((at, ch)) = chars.next() {
        match ch {
            '\\' if quoted => {
                chars.next();
            }
            '"' => quoted = !quoted,
            '#' if !quoted => return line[..at].trim_end(),
            _ => {}
        }
    }
    line
}

/// Decode a double-quoted payload. `\n`, `\r`, `\t`, `\"` and `\\` are
/// unescaped; any other backslash is kept as written. Nothing may follow the
/// closing quote.
pub(crate) fn parse_quoted_string(s: &str) -> Result<String> {
    let body = s
        .trim()
        .strip_prefix('"')
        .ok_or_else(|| anyhow!("Expected string to start with '\"'"))?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((at, ch)) = chars.next() {
        match ch {
            '"' => {
                let rest = body[at + 1..].trim();
                if !rest.is_empty() {
                    bail!("Unexpected text after closing quote: {rest}");
                }
                return Ok(out);
            }
            '\\' => match chars.next().map(|(_, escaped)| escaped) {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            _ => out.push(ch),
        }
    }
    bail!("Expected string to end with '\"'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_string() {
        assert_eq!(parse_quoted_string("\"hello\"").unwrap(), "hello");
        assert_eq!(
            parse_quoted_string("\"hello world\"").unwrap(),
            "hello world"
        );
        assert_eq!(
            parse_quoted_string("\"hello\\nworld\"").unwrap(),
            "hello\nworld"
        );
        assert_eq!(
            parse_quoted_string(r#""say \"hi\"""#).unwrap(),
            r#"say "hi""#
        );
        assert_eq!(parse_quoted_string(r#""C:\\dir""#).unwrap(), r"C:\dir");
    }

    #[test]
    fn test_parse_unclosed_quote() {
        assert!(parse_quoted_string("\"").is_err());
        assert!(parse_quoted_string("\"unclosed").is_err());
        assert!(parse_quoted_string(r#""escaped end\""#).is_err());
        assert!(parse_str("WRITE \"unclosed").is_err());
    }

    #[test]
    fn test_text_after_closing_quote_is_rejected() {
        assert!(parse_quoted_string(r#""a" "b""#).is_err());
        assert!(parse_quoted_string(r#""a"b"#).is_err());
        let err = format!("{:#}", parse_str("READ\nWRITE \"a\" \"b\"").unwrap_err());
        assert!(err.contains("line 2"), "got: {err}");
        assert!(err.contains("after closing quote"), "got: {err}");
        assert_eq!(
            parse_str("WRITE \"a \\\"b\\\"\"  # quoted").unwrap(),
            [Command::write("a \"b\"")]
        );
    }

    #[test]
    fn test_parse_all_commands() {
        let cmds = parse_str(
            "WRITE \"ping\"\nREAD\nDELAY SECONDS 1\nDELAY MILLISECONDS 500\n\
             DELAY MICROSECONDS 20\nFLUSH RX\nFLUSH TX\nFLUSH RX_TX\nLOOP START 3\nLOOP END\n",
        )
        .unwrap();
        let kinds: Vec<CommandKind> = cmds.iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            [
                CommandKind::Write,
                CommandKind::Read,
                CommandKind::DelaySeconds,
                CommandKind::DelayMilliseconds,
                CommandKind::DelayMicroseconds,
                CommandKind::FlushReceive,
                CommandKind::FlushTransmit,
                CommandKind::FlushBoth,
                CommandKind::LoopStart,
                CommandKind::LoopEnd,
            ]
        );
        assert_eq!(cmds[0].argument(), "ping");
        assert_eq!(cmds[3].argument(), "500");
        assert_eq!(cmds[8].argument(), "3");
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let cmds = parse_str("write hi\nDelay Seconds 2\nflush rx_tx\nloop start 2\nloop end\n")
            .unwrap();
        assert_eq!(cmds[0], Command::write("hi"));
        assert_eq!(cmds[1].kind(), CommandKind::DelaySeconds);
        assert_eq!(cmds[2].kind(), CommandKind::FlushBoth);
        assert_eq!(cmds[3], Command::loop_start(2));
    }

    #[test]
    fn test_unquoted_write_takes_rest_of_line() {
        let cmds = parse_str("WRITE  get status now  \n").unwrap();
        assert_eq!(cmds[0].argument(), "get status now");
    }

    #[test]
    fn test_loop_start_without_count_is_infinite() {
        let cmds = parse_str("LOOP START\nLOOP START infinite\n").unwrap();
        assert_eq!(cmds[0].argument(), Command::INFINITE);
        assert_eq!(cmds[1].argument(), "infinite");
    }

    #[test]
    fn test_numeric_arguments_checked_at_run_time() {
        let cmds = parse_str("DELAY SECONDS soon\nLOOP START -4\n").unwrap();
        assert_eq!(cmds[0].argument(), "soon");
        assert_eq!(cmds[1].argument(), "-4");
    }

    #[test]
    fn test_parse_comments_only() {
        assert_eq!(parse_str("# c1\n# c2\n").unwrap().len(), 0);
    }

    #[test]
    fn test_parse_empty_lines() {
        let cmds = parse_str("\n\nREAD\n\nWRITE \"test\"\n\n").unwrap();
        assert_eq!(cmds.len(), 2);
    }

    #[test]
    fn test_parse_invalid_command() {
        let err = format!("{:#}", parse_str("READ\nSEND \"test\"").unwrap_err());
        assert!(err.contains("Unknown command"), "got: {err}");
        assert!(err.contains("line 2"), "got: {err}");
    }

    #[test]
    fn test_parse_invalid_sub_keywords() {
        assert!(parse_str("DELAY HOURS 2").is_err());
        assert!(parse_str("FLUSH BOTH").is_err());
        assert!(parse_str("LOOP AGAIN").is_err());
    }

    #[test]
    fn test_parse_trailing_tokens() {
        assert!(parse_str("READ now").is_err());
        assert!(parse_str("FLUSH RX please").is_err());
        assert!(parse_str("LOOP END 3").is_err());
    }

    #[test]
    fn test_strip_inline_comments() {
        assert_eq!(strip_inline_comment("READ # comment"), "READ");
        assert_eq!(
            strip_inline_comment("WRITE \"test\" # inline"),
            "WRITE \"test\""
        );
        assert_eq!(
            strip_inline_comment("WRITE \"#hashtag\""),
            "WRITE \"#hashtag\""
        );
        assert_eq!(
            strip_inline_comment("WRITE \"test#1\" # comment"),
            "WRITE \"test#1\""
        );
    }

    #[test]
    fn test_parse_with_inline_comments() {
        let cmds =
            parse_str("DELAY SECONDS 1 # settle\nWRITE \"hi\" # greet\nREAD # reply\n").unwrap();
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0].argument(), "1");
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.script");
        std::fs::write(&path, "WRITE \"hello\"\nREAD\n").unwrap();
        assert_eq!(
            parse_file(&path).unwrap(),
            [Command::write("hello"), Command::read()]
        );
        assert!(parse_file(dir.path().join("missing.script")).is_err());

        let bad = dir.path().join("bad.script");
        std::fs::write(&bad, "READ\nPING\n").unwrap();
        let err = format!("{:#}", parse_file(&bad).unwrap_err());
        assert!(err.contains("Invalid script file"), "got: {err}");
        assert!(err.contains("Unknown command"), "got: {err}");
    }
}
