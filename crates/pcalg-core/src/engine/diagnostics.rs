//! Structured diagnostics for skeleton search and orientation.
//!
//! The estimator and the orienter never log through global state. They report
//! [`Diagnostic`] events to a [`DiagnosticSink`] supplied by the caller:
//!
//! - [`NullSink`] drops everything.
//! - [`RecordingSink`] keeps events in memory (tests, post-hoc inspection).
//! - `TracingSink` forwards events to `tracing` (feature `tracing`, on by default).

use smallvec::SmallVec;

/// Conditioning set carried by an event.
pub type CondSet = SmallVec<[usize; 8]>;

/// Meek orientation rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeekRule {
    /// `k → a – b`, `k` and `b` non-adjacent: orient `a → b`.
    Rule1,
    /// `a → k → b` with `a – b`: orient `a → b`.
    Rule2,
    /// `a – k → b`, `a – l → b`, `k` and `l` non-adjacent: orient `a → b`.
    Rule3,
}

/// One observable step of an estimation run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Diagnostic {
    /// A skeleton pass with conditioning sets of size `depth` begins.
    PassStarted { depth: usize, edges: usize },
    /// One conditional-independence query.
    EdgeTested {
        x: usize,
        y: usize,
        cond: CondSet,
        p_value: f64,
    },
    /// Too few rows for the requested degrees of freedom; the test reported
    /// independence under the lenient policy.
    InsufficientSamples {
        x: usize,
        y: usize,
        cond: CondSet,
        rows: usize,
        required: u64,
    },
    /// Strata of the contingency cube without observations were excluded.
    EmptyStrata {
        x: usize,
        y: usize,
        cond: CondSet,
        empty: usize,
        strata: usize,
    },
    /// `x – y` was removed (or, in stable mode, scheduled for removal).
    EdgeRemoved { x: usize, y: usize, sep: CondSet },
    /// A skeleton pass finished.
    PassFinished { depth: usize, removed: usize },
    /// Collider `i → k ← j` oriented.
    ColliderOriented { i: usize, k: usize, j: usize },
    /// A Meek rule oriented `from → to`.
    RuleFired { rule: MeekRule, from: usize, to: usize },
    /// Orientation reached its fixpoint after `passes` rule passes.
    OrientationConverged { passes: usize },
}

/// Receiver of [`Diagnostic`] events.
pub trait DiagnosticSink {
    /// Called once per event, in the order events happen.
    fn record(&mut self, event: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn record(&mut self, event: Diagnostic) {
        (**self).record(event);
    }
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&mut self, _event: Diagnostic) {}
}

/// Sink that stores every event.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Events in arrival order.
    pub events: Vec<Diagnostic>,
}

impl RecordingSink {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `EdgeTested` events.
    pub fn tests(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Diagnostic::EdgeTested { .. }))
            .count()
    }

    /// `(rule, from, to)` of every `RuleFired` event.
    pub fn rules_fired(&self) -> Vec<(MeekRule, usize, usize)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Diagnostic::RuleFired { rule, from, to } => Some((*rule, *from, *to)),
                _ => None,
            })
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&mut self, event: Diagnostic) {
        self.events.push(event);
    }
}

/// Sink that emits events through `tracing`.
///
/// Inconclusive tests are warnings. Per-test events are trace-level and
/// everything else, empty strata included, is debug-level.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl DiagnosticSink for TracingSink {
    fn record(&mut self, event: Diagnostic) {
        match event {
            Diagnostic::PassStarted { depth, edges } => {
                tracing::debug!(depth, edges, "skeleton pass started");
            }
            Diagnostic::EdgeTested {
                x,
                y,
                cond,
                p_value,
            } => {
                tracing::trace!(x, y, cond = ?cond.as_slice(), p_value, "independence test");
            }
            Diagnostic::InsufficientSamples {
                x,
                y,
                cond,
                rows,
                required,
            } => {
                tracing::warn!(
                    x,
                    y,
                    cond = ?cond.as_slice(),
                    rows,
                    required,
                    "not enough samples, treating pair as independent"
                );
            }
            Diagnostic::EmptyStrata {
                x,
                y,
                cond,
                empty,
                strata,
            } => {
                tracing::debug!(x, y, cond = ?cond.as_slice(), empty, strata, "empty strata skipped");
            }
            Diagnostic::EdgeRemoved { x, y, sep } => {
                tracing::debug!(x, y, sep = ?sep.as_slice(), "edge removed");
            }
            Diagnostic::PassFinished { depth, removed } => {
                tracing::debug!(depth, removed, "skeleton pass finished");
            }
            Diagnostic::ColliderOriented { i, k, j } => {
                tracing::debug!(i, k, j, "collider oriented");
            }
            Diagnostic::RuleFired { rule, from, to } => {
                tracing::debug!(rule = ?rule, from, to, "orientation rule fired");
            }
            Diagnostic::OrientationConverged { passes } => {
                tracing::debug!(passes, "orientation converged");
            }
        }
    }
}

/// Sink used by the convenience entry points.
#[cfg(feature = "tracing")]
pub type DefaultSink = TracingSink;

/// Sink used by the convenience entry points.
#[cfg(not(feature = "tracing"))]
pub type DefaultSink = NullSink;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.record(Diagnostic::PassStarted { depth: 0, edges: 3 });
        sink.record(Diagnostic::EdgeTested {
            x: 0,
            y: 1,
            cond: CondSet::new(),
            p_value: 0.5,
        });
        sink.record(Diagnostic::RuleFired {
            rule: MeekRule::Rule2,
            from: 1,
            to: 2,
        });
        assert_eq!(sink.events.len(), 3);
        assert_eq!(sink.tests(), 1);
        assert_eq!(sink.rules_fired(), vec![(MeekRule::Rule2, 1, 2)]);
    }

    fn emit<S: DiagnosticSink>(mut sink: S) {
        sink.record(Diagnostic::OrientationConverged { passes: 1 });
    }

    #[test]
    fn mutable_reference_forwards() {
        let mut sink = RecordingSink::new();
        emit(&mut sink);
        emit(&mut sink);
        assert_eq!(sink.events.len(), 2);
    }

    #[cfg(feature = "tracing")]
    #[derive(Clone, Default)]
    struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    #[cfg(feature = "tracing")]
    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn tracing_sink_warns_only_on_inconclusive_tests() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut sink = TracingSink;
            sink.record(Diagnostic::EmptyStrata {
                x: 0,
                y: 1,
                cond: CondSet::from_slice(&[2]),
                empty: 1,
                strata: 2,
            });
            sink.record(Diagnostic::InsufficientSamples {
                x: 0,
                y: 1,
                cond: CondSet::from_slice(&[2]),
                rows: 5,
                required: 20,
            });
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("not enough samples"), "{output}");
        assert!(!output.contains("empty strata"), "{output}");
    }
}
