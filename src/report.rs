//! Plain-text renderings of executor events, as the `udpscript` binary prints them.

use crate::event::{DelayUnit, FlushKind, LoopBoundary, LoopCount, LoopEvent, Observers};

const INDENT: &str = "    ";

pub fn format_write(payload: &str) -> String {
    format!("{INDENT}Tx >> {payload}")
}

pub fn format_read(value: &str) -> String {
    format!("{INDENT}Rx << {value}")
}

pub fn format_delay(unit: DelayUnit, amount: u64) -> String {
    let suffix = match unit {
        DelayUnit::Seconds => "sec",
        DelayUnit::Milliseconds => "ms",
        DelayUnit::Microseconds => "us",
    };
    format!("{INDENT}Delay <> {amount}{suffix}")
}

pub fn format_flush(kind: FlushKind) -> String {
    let arrows = match kind {
        FlushKind::Receive => "vv",
        FlushKind::Transmit => "^^",
        FlushKind::Both => "^v",
    };
    format!("{INDENT}Flush {arrows}")
}

/// Lines for one loop event.
///
/// The first iteration's start is preceded by a `***Beginning ...***` banner
/// and the last iteration's end is followed by `***Ending ...***`.
pub fn format_loop(event: LoopEvent) -> Vec<String> {
    let total = match event.count {
        LoopCount::Finite(count) => count.to_string(),
        LoopCount::Infinite => "infinite".to_string(),
    };
    let position = format!("({}/{})", event.iteration + 1, total);

    let mut lines = Vec::with_capacity(2);
    match event.boundary {
        LoopBoundary::Start => {
            if event.is_first() {
                lines.push(match event.count {
                    LoopCount::Finite(count) => format!("{INDENT}***Beginning {count} loops***"),
                    LoopCount::Infinite => format!("{INDENT}***Beginning infinite loop***"),
                });
            }
            lines.push(format!("{INDENT}Begin loop {position}"));
        }
        LoopBoundary::End => {
            lines.push(format!("{INDENT}End loop {position}"));
            if event.is_last() {
                lines.push(format!("{INDENT}***Ending {total} loops***"));
            }
        }
    }
    lines
}

/// Observers that print every event to stdout.
pub fn stdout_observers() -> Observers {
    Observers::new()
        .on_read(|value| println!("{}", format_read(value)))
        .on_write(|payload| println!("{}", format_write(payload)))
        .on_delay(|unit, amount| println!("{}", format_delay(unit, amount)))
        .on_flush(|kind| println!("{}", format_flush(kind)))
        .on_loop(|event| {
            for line in format_loop(event) {
                println!("{line}");
            }
        })
}
