//! Lightweight named-section timing.
//!
//! A [`Profiler`] is an ordinary value owned by whoever is measuring; there is
//! no process-wide instance.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;

use serde::Serialize;
use tracing::trace;

/// Accumulated timings for one named section. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub name: String,
    pub call_count: usize,
    pub total_time: f64,
    pub min_time: f64,
    pub max_time: f64,
}

impl PerformanceStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            call_count: 0,
            total_time: 0.0,
            min_time: f64::MAX,
            max_time: 0.0,
        }
    }

    pub fn add_sample(&mut self, seconds: f64) {
        self.call_count += 1;
        self.total_time += seconds;
        self.min_time = self.min_time.min(seconds);
        self.max_time = self.max_time.max(seconds);
    }

    pub fn average_time(&self) -> f64 {
        if self.call_count > 0 {
            self.total_time / self.call_count as f64
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(&self.name);
    }
}

#[derive(Debug, Clone)]
pub struct Profiler {
    stats: BTreeMap<String, PerformanceStats>,
    enabled: bool,
}

impl Default for Profiler {
    fn default() -> Self {
        Self {
            stats: BTreeMap::new(),
            enabled: true,
        }
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A profiler that records nothing until [`enable`](Self::enable) is called.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run `f`, recording its wall-clock duration under `name`.
    pub fn time<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        if !self.enabled {
            return f();
        }
        let start = Instant::now();
        let out = f();
        self.add_sample(name, start.elapsed().as_secs_f64());
        out
    }

    pub fn add_sample(&mut self, name: &str, seconds: f64) {
        if !self.enabled {
            return;
        }
        trace!(section = name, seconds, "Profiler sample");
        self.stats
            .entry(name.to_string())
            .or_insert_with(|| PerformanceStats::new(name))
            .add_sample(seconds);
    }

    pub fn stats(&self, name: &str) -> Option<&PerformanceStats> {
        self.stats.get(name)
    }

    /// All sections, ordered by name.
    pub fn all_stats(&self) -> Vec<&PerformanceStats> {
        self.stats.values().collect()
    }

    /// Forget every section.
    pub fn reset(&mut self) {
        self.stats.clear();
    }

    /// Zero the counters of one section, keeping its entry.
    pub fn reset_stats(&mut self, name: &str) {
        if let Some(s) = self.stats.get_mut(name) {
            s.reset();
        }
    }

    /// Render a fixed-width table of every section.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Performance Report ===");
        let _ = writeln!(
            out,
            "{:<24} {:>8} {:>12} {:>12} {:>12} {:>12}",
            "Section", "Calls", "Total (ms)", "Avg (ms)", "Min (ms)", "Max (ms)"
        );
        for s in self.stats.values() {
            let min = if s.call_count > 0 { s.min_time } else { 0.0 };
            let _ = writeln!(
                out,
                "{:<24} {:>8} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
                s.name,
                s.call_count,
                s.total_time * 1e3,
                s.average_time() * 1e3,
                min * 1e3,
                s.max_time * 1e3
            );
        }
        out
    }
}
