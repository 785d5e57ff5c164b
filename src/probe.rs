//! In-process timing probe
//!
//! The Rust-side counterpart of a generated proxy method: run the wrapped
//! call, measure it, report it to a [`DebugSink`] when it exceeds
//! [`MIN_REPORT_SECONDS`], and hand back the call's result untouched. Rust
//! hosts use it to wrap hook implementations directly instead of going
//! through generated source.

use crate::synth::{report_label, MIN_REPORT_SECONDS};
use std::time::Instant;

/// Receives slow-call reports: elapsed seconds and `<Class>:<method>`
pub trait DebugSink {
    fn report(&self, elapsed_secs: f64, label: &str);
}

impl<S: DebugSink + ?Sized> DebugSink for &S {
    fn report(&self, elapsed_secs: f64, label: &str) {
        (**self).report(elapsed_secs, label)
    }
}

/// Sink forwarding reports to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn report(&self, elapsed_secs: f64, label: &str) {
        tracing::info!(elapsed_secs, label, "slow hook call");
    }
}

/// Times calls and reports the slow ones
#[derive(Debug, Clone)]
pub struct Probe<S> {
    sink: S,
}

impl Default for Probe<TracingSink> {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

impl<S: DebugSink> Probe<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run `call` as `class::method`, reporting it if slower than the threshold
    ///
    /// # Example
    /// ```
    /// use hookcheck::probe::Probe;
    ///
    /// let probe = Probe::default();
    /// let mut fields = vec![1, 2];
    /// let count = probe.measure("Vendor\\Hook", "preProcess", || {
    ///     fields.push(3);
    ///     fields.len()
    /// });
    /// assert_eq!(count, 3);
    /// assert_eq!(fields, vec![1, 2, 3]);
    /// ```
    pub fn measure<T, F: FnOnce() -> T>(&self, class: &str, method: &str, call: F) -> T {
        let start = Instant::now();
        let result = call();
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > MIN_REPORT_SECONDS {
            self.sink.report(elapsed, &report_label(class, method));
        }
        result
    }
}
