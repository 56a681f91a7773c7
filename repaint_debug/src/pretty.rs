// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use repaint_core::Area;
use repaint_core::trace::{
    AreaEvent, BandEvent, FlushEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent,
    RefreshStartEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the destination, consuming the sink.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// `x1,y1..x2,y2`, inclusive.
struct Span(Area);

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let a = &self.0;
        write!(f, "{},{}..{},{}", a.x1, a.y1, a.x2, a.y2)
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_refresh_start(&mut self, e: &RefreshStartEvent) {
        let _ = writeln!(
            self.writer,
            "[refresh] frame={} now={}ms dirty={}",
            e.frame_index,
            e.now.millis(),
            e.dirty_areas,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {}",
            e.frame_index,
            e.phase.name(),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {}",
            e.frame_index,
            e.phase.name(),
        );
    }

    fn on_area(&mut self, e: &AreaEvent) {
        let last = if e.last { " last" } else { "" };
        let _ = writeln!(
            self.writer,
            "[area] frame={} {}{last}",
            e.frame_index,
            Span(e.area),
        );
    }

    fn on_band(&mut self, e: &BandEvent) {
        let _ = writeln!(
            self.writer,
            "[band] frame={} buf={} clip={}",
            e.frame_index,
            Span(e.band),
            Span(e.clip),
        );
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        let last = if e.last { " last" } else { "" };
        let _ = writeln!(
            self.writer,
            "[flush] frame={} {}{last}",
            e.frame_index,
            Span(e.area),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = match s.skipped {
            Some(reason) => writeln!(
                self.writer,
                "[summary] frame={} skipped={reason:?}",
                s.frame_index,
            ),
            None => writeln!(
                self.writer,
                "[summary] frame={} areas={} bands={} flushes={}",
                s.frame_index, s.areas, s.bands, s.flushes,
            ),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repaint_core::time::HostTime;
    use repaint_core::trace::{PhaseKind, SkipReason};

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn refresh_start_line() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_refresh_start(&RefreshStartEvent {
            frame_index: 1,
            now: HostTime(250),
            dirty_areas: 3,
        });
        let out = output(sink);
        assert_eq!(out, "[refresh] frame=1 now=250ms dirty=3\n");
    }

    #[test]
    fn phases_use_their_short_names() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 2,
            phase: PhaseKind::Layout,
        });
        sink.on_phase_end(&PhaseEndEvent {
            frame_index: 2,
            phase: PhaseKind::Render,
        });
        let out = output(sink);
        assert!(out.contains("[phase:begin] frame=2 layout"), "got: {out}");
        assert!(out.contains("[phase:end] frame=2 render"), "got: {out}");
    }

    #[test]
    fn flush_marks_the_last_band() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_flush(&FlushEvent {
            frame_index: 0,
            area: Area::new(0, 192, 319, 239).unwrap(),
            last: true,
        });
        assert_eq!(output(sink), "[flush] frame=0 0,192..319,239 last\n");
    }

    #[test]
    fn skipped_summary_names_the_reason() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_summary(&FrameSummary {
            frame_index: 4,
            now: HostTime(0),
            areas: 0,
            bands: 0,
            flushes: 0,
            skipped: Some(SkipReason::NothingDirty),
        });
        let out = output(sink);
        assert!(out.contains("skipped=NothingDirty"), "got: {out}");
    }
}
