// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format export.
//!
//! [`ChromeTraceSink`] collects refresh events as they happen, stamped with
//! the wall-clock time since the sink was created, and writes them as
//! [Chrome Trace Event Format][format] JSON.
//!
//! Refresh phases become duration (`B`/`E`) events; areas, bands, flushes
//! and summaries become instant events.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};
use std::time::Instant;

use serde_json::{Value, json};

use repaint_core::Area;
use repaint_core::trace::{
    AreaEvent, BandEvent, FlushEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent,
    RefreshStartEvent, TraceSink,
};

/// Collects trace events for export as Chrome Trace Event JSON.
#[derive(Debug)]
pub struct ChromeTraceSink {
    start: Instant,
    events: Vec<Value>,
}

impl Default for ChromeTraceSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromeTraceSink {
    /// Creates an empty sink; timestamps are relative to this call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            events: Vec::new(),
        }
    }

    /// The collected trace event objects.
    #[must_use]
    pub fn events(&self) -> &[Value] {
        &self.events
    }

    /// Drops every collected event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Writes the collected events as a JSON array, suitable for loading
    /// into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
    pub fn write(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.events)?;
        Ok(())
    }

    fn ts(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1_000_000.0
    }

    fn instant(&mut self, name: &str, cat: &str, args: Value) {
        let ts = self.ts();
        self.events.push(json!({
            "ph": "i",
            "name": name,
            "cat": cat,
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "s": "t",
            "args": args,
        }));
    }
}

fn area_json(a: &Area) -> Value {
    json!([a.x1, a.y1, a.x2, a.y2])
}

impl TraceSink for ChromeTraceSink {
    fn on_refresh_start(&mut self, e: &RefreshStartEvent) {
        self.instant(
            "Refresh",
            "Refresh",
            json!({
                "frame_index": e.frame_index,
                "now_ms": e.now.millis(),
                "dirty_areas": e.dirty_areas,
            }),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let ts = self.ts();
        self.events.push(json!({
            "ph": "B",
            "name": e.phase.name(),
            "cat": "Phase",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let ts = self.ts();
        self.events.push(json!({
            "ph": "E",
            "name": e.phase.name(),
            "cat": "Phase",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }));
    }

    fn on_area(&mut self, e: &AreaEvent) {
        self.instant(
            "Area",
            "Render",
            json!({
                "frame_index": e.frame_index,
                "area": area_json(&e.area),
                "last": e.last,
            }),
        );
    }

    fn on_band(&mut self, e: &BandEvent) {
        self.instant(
            "Band",
            "Render",
            json!({
                "frame_index": e.frame_index,
                "band": area_json(&e.band),
                "clip": area_json(&e.clip),
            }),
        );
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        self.instant(
            "Flush",
            "Render",
            json!({
                "frame_index": e.frame_index,
                "area": area_json(&e.area),
                "last": e.last,
            }),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.instant(
            "FrameSummary",
            "Summary",
            json!({
                "frame_index": s.frame_index,
                "now_ms": s.now.millis(),
                "areas": s.areas,
                "bands": s.bands,
                "flushes": s.flushes,
                "skipped": s.skipped.map(|r| format!("{r:?}")),
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repaint_core::Display;
    use repaint_core::buffer::FrameBuffers;
    use repaint_core::color::{Color32, ColorFormat};
    use repaint_core::config::DisplayConfig;
    use repaint_core::testing::{ImmediateUnit, MockTree, RecordingPanel};
    use repaint_core::time::HostTime;
    use repaint_core::trace::Tracer;
    use repaint_core::tree::Screens;

    fn parse(sink: &ChromeTraceSink) -> Vec<Value> {
        let mut out = Vec::new();
        sink.write(&mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn empty_sink_writes_an_empty_array() {
        assert!(parse(&ChromeTraceSink::new()).is_empty());
    }

    #[test]
    fn refresh_is_exported_with_balanced_phases() {
        let config = DisplayConfig::partial(100, 100);
        let buffers = FrameBuffers::single(100 * 40 * 4, ColorFormat::Xrgb8888).unwrap();
        let mut display = Display::new(config, buffers, vec![Box::new(ImmediateUnit::default())])
            .unwrap();
        let mut tree = MockTree::new();
        let root = tree.add_root(config.screen(), Some(Color32::WHITE));
        *display.screens_mut() = Screens::with_active(root);
        display.invalidate(Some(config.screen())).unwrap();

        let mut sink = ChromeTraceSink::new();
        let mut panel = RecordingPanel::new();
        let report = display.refresh_now(
            HostTime(16),
            &mut tree,
            &mut panel,
            &mut Tracer::new(&mut sink),
        );
        assert_eq!(report.flushes, 3);

        let events = parse(&sink);
        assert_eq!(events[0]["name"], "Refresh");
        assert_eq!(events[0]["args"]["now_ms"], 16);

        let count = |ph: &str| events.iter().filter(|e| e["ph"] == ph).count();
        assert_eq!(count("B"), count("E"));
        assert!(count("B") >= 3, "layout, join and render");

        let flushes: Vec<_> = events.iter().filter(|e| e["name"] == "Flush").collect();
        assert_eq!(flushes.len(), 3);
        assert_eq!(flushes[2]["args"]["last"], true);
        assert_eq!(flushes[2]["args"]["area"], json!([0, 80, 99, 99]));

        let summary = events.last().unwrap();
        assert_eq!(summary["name"], "FrameSummary");
        assert_eq!(summary["args"]["flushes"], 3);
        assert_eq!(summary["args"]["skipped"], Value::Null);

        let ts: Vec<f64> = events.iter().map(|e| e["ts"].as_f64().unwrap()).collect();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]), "timestamps are ordered");
    }

    #[test]
    fn skipped_refresh_names_the_reason() {
        let mut sink = ChromeTraceSink::new();
        sink.on_frame_summary(&FrameSummary {
            frame_index: 7,
            now: HostTime(0),
            areas: 0,
            bands: 0,
            flushes: 0,
            skipped: Some(repaint_core::trace::SkipReason::NoActiveScreen),
        });
        let events = parse(&sink);
        assert_eq!(events[0]["args"]["skipped"], "NoActiveScreen");
        sink.clear();
        assert!(sink.events().is_empty());
    }
}
