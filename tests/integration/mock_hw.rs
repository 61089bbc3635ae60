//! Mock hardware adapters for integration tests.
//!
//! Records every camera and inference call so tests can assert on the full
//! history without touching real peripherals.

use std::cell::RefCell;

use petvision::app::events::AppEvent;
use petvision::app::ports::{CameraPort, EventSink, InferencePort};
use petvision::error::{InvokeError, SensorError};
use petvision::sensors::camera::CameraSettings;
use petvision::vision::{RawFrame, SAMPLE_LEN};

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Begin(CameraSettings),
    ReadFrame,
    InputMut,
    Invoke,
    Output,
}

// ── MockCamera ────────────────────────────────────────────────

pub struct MockCamera {
    pub calls: Vec<HwCall>,
    /// Every frame is filled with this value.
    pub fill: u8,
    /// Number of upcoming `begin` calls that fail.
    pub begin_failures: u32,
    /// Number of upcoming `read_frame` calls that fail.
    pub read_failures: u32,
}

#[allow(dead_code)]
impl MockCamera {
    pub fn new(fill: u8) -> Self {
        Self {
            calls: Vec::new(),
            fill,
            begin_failures: 0,
            read_failures: 0,
        }
    }

    pub fn failing_begin(mut self, n: u32) -> Self {
        self.begin_failures = n;
        self
    }

    pub fn failing_reads(mut self, n: u32) -> Self {
        self.read_failures = n;
        self
    }

    pub fn begins(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, HwCall::Begin(_)))
            .count()
    }

    pub fn reads(&self) -> usize {
        self.calls.iter().filter(|c| **c == HwCall::ReadFrame).count()
    }
}

impl CameraPort for MockCamera {
    fn begin(&mut self, settings: &CameraSettings) -> Result<(), SensorError> {
        self.calls.push(HwCall::Begin(*settings));
        if self.begin_failures > 0 {
            self.begin_failures -= 1;
            return Err(SensorError::InitFailed(-1));
        }
        Ok(())
    }

    fn read_frame(&mut self, frame: &mut RawFrame) -> Result<(), SensorError> {
        self.calls.push(HwCall::ReadFrame);
        if self.read_failures > 0 {
            self.read_failures -= 1;
            return Err(SensorError::CaptureFailed);
        }
        frame.pixels_mut().fill(self.fill);
        Ok(())
    }
}

// ── MockSession ───────────────────────────────────────────────

/// Inference session that returns a scripted score and keeps every input
/// it was invoked on.  `output` takes `&self`, so the call log lives in a
/// `RefCell`.
pub struct MockSession {
    log: RefCell<Vec<HwCall>>,
    pub input: Vec<i8>,
    pub output: Vec<i8>,
    pub seen_inputs: Vec<Vec<i8>>,
    pub fail_invoke: bool,
}

#[allow(dead_code)]
impl MockSession {
    pub fn with_score(score: i8) -> Self {
        Self {
            log: RefCell::new(Vec::new()),
            input: vec![0; SAMPLE_LEN],
            output: vec![score],
            seen_inputs: Vec::new(),
            fail_invoke: false,
        }
    }

    pub fn calls(&self) -> Vec<HwCall> {
        self.log.borrow().clone()
    }

    pub fn invokes(&self) -> usize {
        self.log.borrow().iter().filter(|c| **c == HwCall::Invoke).count()
    }
}

impl InferencePort for MockSession {
    fn input_mut(&mut self) -> Option<&mut [i8]> {
        self.log.get_mut().push(HwCall::InputMut);
        Some(&mut self.input)
    }

    fn invoke(&mut self) -> Result<(), InvokeError> {
        self.log.get_mut().push(HwCall::Invoke);
        if self.fail_invoke {
            return Err(InvokeError::NotAllocated);
        }
        self.seen_inputs.push(self.input.clone());
        Ok(())
    }

    fn output(&self) -> Option<&[i8]> {
        self.log.borrow_mut().push(HwCall::Output);
        Some(&self.output)
    }
}

// ── CollectSink ───────────────────────────────────────────────

/// Event sink that keeps every event.
#[derive(Default)]
pub struct CollectSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Fault(_)))
            .count()
    }
}

impl EventSink for CollectSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
