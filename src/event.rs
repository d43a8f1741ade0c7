//! Events the executor reports, and the [`Observers`] that receive them.

use std::time::Duration;

/// Unit of a delay command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayUnit {
    Seconds,
    Milliseconds,
    Microseconds,
}

impl DelayUnit {
    /// Convert an amount of this unit to a [`Duration`]
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            DelayUnit::Seconds => Duration::from_secs(amount),
            DelayUnit::Milliseconds => Duration::from_millis(amount),
            DelayUnit::Microseconds => Duration::from_micros(amount),
        }
    }
}

/// Direction of a flush command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushKind {
    Receive,
    Transmit,
    Both,
}

/// Repeat count of a loop as reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopCount {
    Finite(usize),
    /// Sentinel for a loop with no fixed count
    Infinite,
}

/// Which side of a loop iteration an event marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopBoundary {
    Start,
    End,
}

/// Begin or end of one iteration of an expanded loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopEvent {
    pub boundary: LoopBoundary,
    /// Zero-based index of the iteration
    pub iteration: usize,
    pub count: LoopCount,
}

impl LoopEvent {
    /// Create a start-of-iteration event
    pub fn start(iteration: usize, count: LoopCount) -> Self {
        LoopEvent {
            boundary: LoopBoundary::Start,
            iteration,
            count,
        }
    }

    /// Create an end-of-iteration event
    pub fn end(iteration: usize, count: LoopCount) -> Self {
        LoopEvent {
            boundary: LoopBoundary::End,
            iteration,
            count,
        }
    }

    /// True for the start of the first iteration
    pub fn is_first(&self) -> bool {
        self.boundary == LoopBoundary::Start && self.iteration == 0
    }

    /// True for the end of the last iteration of a finite loop
    pub fn is_last(&self) -> bool {
        match self.count {
            LoopCount::Finite(count) => {
                self.boundary == LoopBoundary::End && self.iteration + 1 == count
            }
            LoopCount::Infinite => false,
        }
    }
}

type ReadObserver = Box<dyn Fn(&str) + Send + Sync>;
type WriteObserver = Box<dyn Fn(&str) + Send + Sync>;
type DelayObserver = Box<dyn Fn(DelayUnit, u64) + Send + Sync>;
type FlushObserver = Box<dyn Fn(FlushKind) + Send + Sync>;
type LoopObserver = Box<dyn Fn(LoopEvent) + Send + Sync>;

/// The five reporting callbacks handed to
/// [`ScriptExecutor::execute`](crate::ScriptExecutor::execute).
///
/// Every callback defaults to a no-op; set the ones you care about with the
/// builder methods. Callbacks only report and cannot influence control flow.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use udpscript::Observers;
///
/// let sent = Arc::new(Mutex::new(Vec::<String>::new()));
/// let sink = sent.clone();
/// let observers = Observers::new().on_write(move |payload| {
///     sink.lock().unwrap().push(payload.to_string());
/// });
/// # let _ = observers;
/// ```
pub struct Observers {
    on_read: ReadObserver,
    on_write: WriteObserver,
    on_delay: DelayObserver,
    on_flush: FlushObserver,
    on_loop: LoopObserver,
}

impl Observers {
    pub fn new() -> Self {
        Observers {
            on_read: Box::new(|_| {}),
            on_write: Box::new(|_| {}),
            on_delay: Box::new(|_, _| {}),
            on_flush: Box::new(|_| {}),
            on_loop: Box::new(|_| {}),
        }
    }

    /// Called with every value returned by a read
    pub fn on_read(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_read = Box::new(f);
        self
    }

    /// Called with every payload after it has been written
    pub fn on_write(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_write = Box::new(f);
        self
    }

    /// Called before each delay starts
    pub fn on_delay(mut self, f: impl Fn(DelayUnit, u64) + Send + Sync + 'static) -> Self {
        self.on_delay = Box::new(f);
        self
    }

    /// Called before each flush is performed
    pub fn on_flush(mut self, f: impl Fn(FlushKind) + Send + Sync + 'static) -> Self {
        self.on_flush = Box::new(f);
        self
    }

    /// Called at the start and end of every loop iteration
    pub fn on_loop(mut self, f: impl Fn(LoopEvent) + Send + Sync + 'static) -> Self {
        self.on_loop = Box::new(f);
        self
    }

    pub(crate) fn emit_read(&self, value: &str) {
        (self.on_read)(value);
    }

    pub(crate) fn emit_write(&self, payload: &str) {
        (self.on_write)(payload);
    }

    pub(crate) fn emit_delay(&self, unit: DelayUnit, amount: u64) {
        (self.on_delay)(unit, amount);
    }

    pub(crate) fn emit_flush(&self, kind: FlushKind) {
        (self.on_flush)(kind);
    }

    pub(crate) fn emit_loop(&self, event: LoopEvent) {
        (self.on_loop)(event);
    }
}

impl Default for Observers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_unit_durations() {
        assert_eq!(DelayUnit::Seconds.to_duration(2), Duration::from_secs(2));
        assert_eq!(
            DelayUnit::Milliseconds.to_duration(250),
            Duration::from_millis(250)
        );
        assert_eq!(
            DelayUnit::Microseconds.to_duration(10),
            Duration::from_micros(10)
        );
    }

    #[test]
    fn test_first_and_last_iteration() {
        let count = LoopCount::Finite(3);
        assert!(LoopEvent::start(0, count).is_first());
        assert!(!LoopEvent::end(0, count).is_first());
        assert!(LoopEvent::end(2, count).is_last());
        assert!(!LoopEvent::start(2, count).is_last());
        assert!(!LoopEvent::end(2, LoopCount::Infinite).is_last());
    }
}
