//! Command loop: the hexagonal core.
//!
//! [`CommandLoop`] turns each byte from the control channel into exactly
//! one report line.  All I/O flows through port traits injected at call
//! sites, so the whole loop is testable with mock adapters.
//!
//! ```text
//!  Transport ──byte──▶ ┌──────────────────────┐ ──line──▶ Transport
//!                      │     CommandLoop      │
//!  CameraPort ◀────────│ capture·extract·     │──▶ EventSink
//!  InferencePort ◀─────│ invoke·classify      │
//!                      └──────────────────────┘
//! ```
//!
//! A cycle runs to completion before the next byte is read.  Failures
//! inside a cycle are answered with "No capture" on the report channel and
//! described on the diagnostic channel; the loop itself never stops.

use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::diagnostics::CycleStats;
use crate::error::{CycleError, Error};
use crate::link::report::Report;
use crate::link::transport::Transport;
use crate::vision::Sample;
use crate::vision::classify::{Classifier, Label};
use crate::vision::extract::extract;

use super::commands::AppCommand;
use super::context::PipelineContext;
use super::events::AppEvent;
use super::ports::{CameraPort, EventSink, InferencePort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for a byte.
    Idle,
    /// Running capture → classify.
    Cycle,
}

// ───────────────────────────────────────────────────────────────
// CommandLoop
// ───────────────────────────────────────────────────────────────

pub struct CommandLoop {
    trigger: u8,
    classifier: Classifier,
    state: LoopState,
    stats: CycleStats,
}

impl CommandLoop {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            trigger: config.trigger_byte,
            classifier: Classifier::new(config.score_threshold),
            state: LoopState::Idle,
            stats: CycleStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.state = LoopState::Idle;
        sink.emit(&AppEvent::Started {
            trigger: self.trigger,
        });
        info!("command loop started, trigger=0x{:02x}", self.trigger);
    }

    // ── Per-poll orchestration ────────────────────────────────

    /// Consume at most one byte from `link` and answer it.
    ///
    /// Returns the report sent, or `None` if nothing was pending.
    pub fn poll<T, C, S>(
        &mut self,
        link: &mut T,
        ctx: &mut PipelineContext<C, S>,
        sink: &mut impl EventSink,
    ) -> Option<Report>
    where
        T: Transport,
        C: CameraPort,
        S: InferencePort,
    {
        if !link.available() {
            return None;
        }
        let mut byte = [0u8; 1];
        match link.read(&mut byte) {
            Ok(1) => {}
            Ok(_) => return None,
            Err(e) => {
                warn!("control channel read failed: {:?}", e);
                return None;
            }
        }

        let report = self.handle_command(AppCommand::from_byte(byte[0], self.trigger), ctx, sink);
        if let Err(e) = report.write_to(link) {
            warn!("control channel write failed: {:?}", e);
        }
        Some(report)
    }

    // ── Command handling ──────────────────────────────────────

    /// Run one command to completion and decide the report.
    pub fn handle_command<C, S>(
        &mut self,
        cmd: AppCommand,
        ctx: &mut PipelineContext<C, S>,
        sink: &mut impl EventSink,
    ) -> Report
    where
        C: CameraPort,
        S: InferencePort,
    {
        match cmd {
            AppCommand::Ignored(byte) => {
                self.stats.record_ignored();
                sink.emit(&AppEvent::CommandIgnored(byte));
                Report::NoCapture
            }
            AppCommand::Capture => {
                self.state = LoopState::Cycle;
                self.stats.record_trigger();
                let report = match self.run_cycle(ctx) {
                    Ok((label, score)) => {
                        self.stats.record_label(label);
                        sink.emit(&AppEvent::CycleCompleted { label, score });
                        Report::Label(label)
                    }
                    Err(e) => {
                        error!("{}", e);
                        self.stats.record_failure(&e);
                        sink.emit(&AppEvent::Fault(Error::Cycle(e)));
                        Report::NoCapture
                    }
                };
                self.state = LoopState::Idle;
                report
            }
        }
    }

    /// capture → extract → invoke → classify.
    fn run_cycle<C, S>(&self, ctx: &mut PipelineContext<C, S>) -> Result<(Label, i8), CycleError>
    where
        C: CameraPort,
        S: InferencePort,
    {
        let session = ctx.session.session_mut()?;
        let frame = ctx.camera.capture()?;

        let input = session.input_mut().ok_or(CycleError::SessionNotReady)?;
        let len = input.len();
        let sample: &mut Sample = input
            .try_into()
            .map_err(|_| CycleError::InputShapeMismatch { len })?;
        extract(frame, sample);

        session.invoke()?;

        let output = session.output().ok_or(CycleError::EmptyOutput)?;
        self.classifier.decide(output)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn trigger(&self) -> u8 {
        self.trigger
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_loop_is_idle_with_configured_trigger() {
        let config = SystemConfig {
            trigger_byte: b'x',
            ..Default::default()
        };
        let l = CommandLoop::new(&config);
        assert_eq!(l.state(), LoopState::Idle);
        assert_eq!(l.trigger(), b'x');
        assert_eq!(*l.stats(), CycleStats::default());
    }
}
