//! Integration tests for the control channel → CommandLoop → report path.
//!
//! Camera and session are mocks; the link is an in-memory loopback, so
//! every test sees exactly the bytes a host on the UART would see.

use crate::mock_hw::{CollectSink, HwCall, MockCamera, MockSession};

use petvision::app::context::{PipelineContext, SessionState};
use petvision::app::events::AppEvent;
use petvision::app::service::{CommandLoop, LoopState};
use petvision::config::SystemConfig;
use petvision::error::{AllocationError, CycleError, Error, SensorError, SetupError};
use petvision::link::report::Report;
use petvision::link::transport::LoopbackTransport;
use petvision::sensors::camera::{Camera, CameraSettings, CameraState};
use petvision::vision::SAMPLE_LEN;
use petvision::vision::classify::Label;

type Ctx = PipelineContext<MockCamera, MockSession>;

fn make_ctx(camera: MockCamera, session: SessionState<MockSession>) -> Ctx {
    PipelineContext::new(Camera::new(camera, CameraSettings::default()), session)
}

fn ready(camera: MockCamera, score: i8) -> Ctx {
    make_ctx(camera, SessionState::Ready(MockSession::with_score(score)))
}

fn make_loop() -> (CommandLoop, CollectSink) {
    let mut sink = CollectSink::new();
    let mut l = CommandLoop::new(&SystemConfig::default());
    l.start(&mut sink);
    (l, sink)
}

/// Feed `bytes`, poll until the link is drained, return the report lines.
fn drive(l: &mut CommandLoop, ctx: &mut Ctx, sink: &mut CollectSink, bytes: &[u8]) -> Vec<String> {
    let mut link = LoopbackTransport::new();
    link.push_rx(bytes);
    while l.poll(&mut link, ctx, sink).is_some() {}
    link.take_lines()
}

// ── Idle behaviour ────────────────────────────────────────────

#[test]
fn start_emits_started_with_trigger() {
    let (_, sink) = make_loop();
    assert_eq!(sink.events, vec![AppEvent::Started { trigger: b'1' }]);
}

#[test]
fn empty_link_produces_nothing() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128), 10);
    let mut link = LoopbackTransport::new();
    assert!(l.poll(&mut link, &mut ctx, &mut sink).is_none());
    assert!(link.tx().is_empty());
    assert!(ctx.camera.port().calls.is_empty());
}

#[test]
fn other_bytes_answer_no_capture_without_hardware() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128), 10);

    let lines = drive(&mut l, &mut ctx, &mut sink, b"0a\n ");

    assert_eq!(lines, vec!["No capture"; 4]);
    assert!(ctx.camera.port().calls.is_empty());
    assert!(ctx.session.session().unwrap().calls().is_empty());
    assert_eq!(ctx.camera.state(), CameraState::Uninitialized);
    assert_eq!(l.stats().ignored, 4);
    assert_eq!(l.stats().triggers, 0);
    assert_eq!(l.state(), LoopState::Idle);
}

// ── Successful cycles ─────────────────────────────────────────

#[test]
fn positive_score_reports_cat() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128), 10);

    assert_eq!(drive(&mut l, &mut ctx, &mut sink, b"1"), vec!["It's a cat"]);
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::CycleCompleted {
            label: Label::Cat,
            score: 10
        })
    );
}

#[test]
fn negative_score_reports_person() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128), -10);
    assert_eq!(drive(&mut l, &mut ctx, &mut sink, b"1"), vec!["It's a person"]);
    assert_eq!(l.stats().persons, 1);
}

#[test]
fn cycle_runs_stages_in_order() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128), 10);
    drive(&mut l, &mut ctx, &mut sink, b"1");

    assert_eq!(
        ctx.camera.port().calls,
        vec![HwCall::Begin(CameraSettings::default()), HwCall::ReadFrame]
    );
    assert_eq!(
        ctx.session.session().unwrap().calls(),
        vec![HwCall::InputMut, HwCall::Invoke, HwCall::Output]
    );
}

#[test]
fn camera_is_started_once() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128), 10);
    let lines = drive(&mut l, &mut ctx, &mut sink, b"111");
    assert_eq!(lines, vec!["It's a cat"; 3]);
    assert_eq!(ctx.camera.port().begins(), 1);
    assert_eq!(ctx.camera.port().reads(), 3);
}

#[test]
fn gray_frame_hands_over_zero_sample() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128), 10);
    drive(&mut l, &mut ctx, &mut sink, b"1");
    let seen = &ctx.session.session().unwrap().seen_inputs;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), SAMPLE_LEN);
    assert!(seen[0].iter().all(|&v| v == 0));
}

#[test]
fn black_frame_hands_over_minimum_sample() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(0), 10);
    drive(&mut l, &mut ctx, &mut sink, b"1");
    let seen = &ctx.session.session().unwrap().seen_inputs;
    assert!(seen[0].iter().all(|&v| v == -128));
}

#[test]
fn identical_frames_give_identical_samples_and_reports() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(77), 10);
    let lines = drive(&mut l, &mut ctx, &mut sink, b"11");
    assert_eq!(lines[0], lines[1]);
    let seen = &ctx.session.session().unwrap().seen_inputs;
    assert_eq!(seen[0], seen[1]);
}

#[test]
fn mixed_stream_answers_every_byte_in_order() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128), 10);
    let lines = drive(&mut l, &mut ctx, &mut sink, b"x1y1");
    assert_eq!(
        lines,
        vec!["No capture", "It's a cat", "No capture", "It's a cat"]
    );
    assert_eq!(l.stats().triggers, 2);
    assert_eq!(l.stats().ignored, 2);
}

#[test]
fn custom_trigger_byte_is_honoured() {
    let mut sink = CollectSink::new();
    let config = SystemConfig {
        trigger_byte: b'c',
        ..Default::default()
    };
    let mut l = CommandLoop::new(&config);
    l.start(&mut sink);
    let mut ctx = ready(MockCamera::new(128), 10);
    assert_eq!(
        drive(&mut l, &mut ctx, &mut sink, b"1c"),
        vec!["No capture", "It's a cat"]
    );
}

// ── Failed cycles ─────────────────────────────────────────────

#[test]
fn camera_init_failure_reports_no_capture_and_retries() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128).failing_begin(1), 10);

    assert_eq!(drive(&mut l, &mut ctx, &mut sink, b"1"), vec!["No capture"]);
    assert_eq!(ctx.camera.state(), CameraState::Failed { attempts: 1 });
    assert_eq!(ctx.camera.port().reads(), 0);
    assert!(ctx.session.session().unwrap().calls().is_empty());
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::Fault(Error::Cycle(CycleError::CameraInit(
            SensorError::InitFailed(-1)
        ))))
    );

    assert_eq!(drive(&mut l, &mut ctx, &mut sink, b"1"), vec!["It's a cat"]);
    assert_eq!(ctx.camera.port().begins(), 2);
    assert_eq!(ctx.camera.state(), CameraState::Ready);
}

#[test]
fn capture_failure_reports_no_capture() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128).failing_reads(1), 10);
    assert_eq!(
        drive(&mut l, &mut ctx, &mut sink, b"11"),
        vec!["No capture", "It's a cat"]
    );
    assert_eq!(l.stats().camera_failures, 1);
    assert_eq!(ctx.camera.port().begins(), 1);
}

#[test]
fn invoke_failure_reports_no_capture() {
    let (mut l, mut sink) = make_loop();
    let mut session = MockSession::with_score(10);
    session.fail_invoke = true;
    let mut ctx = make_ctx(MockCamera::new(128), SessionState::Ready(session));

    assert_eq!(drive(&mut l, &mut ctx, &mut sink, b"1"), vec!["No capture"]);
    assert_eq!(l.stats().invoke_failures, 1);
    assert_eq!(sink.faults(), 1);
    assert_eq!(l.state(), LoopState::Idle);
}

#[test]
fn empty_output_reports_no_capture() {
    let (mut l, mut sink) = make_loop();
    let mut session = MockSession::with_score(10);
    session.output.clear();
    let mut ctx = make_ctx(MockCamera::new(128), SessionState::Ready(session));
    assert_eq!(drive(&mut l, &mut ctx, &mut sink, b"1"), vec!["No capture"]);
}

#[test]
fn wrong_input_size_is_rejected_before_invoke() {
    let (mut l, mut sink) = make_loop();
    let mut session = MockSession::with_score(10);
    session.input = vec![0; 16];
    let mut ctx = make_ctx(MockCamera::new(128), SessionState::Ready(session));

    assert_eq!(drive(&mut l, &mut ctx, &mut sink, b"1"), vec!["No capture"]);
    assert_eq!(ctx.session.session().unwrap().invokes(), 0);
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::Fault(Error::Cycle(
            CycleError::InputShapeMismatch { len: 16 }
        )))
    );
}

#[test]
fn not_ready_session_never_touches_camera() {
    let (mut l, mut sink) = make_loop();
    let setup = SetupError::TensorAllocation(AllocationError::ArenaExhausted {
        required: 200_000,
        available: 139_264,
    });
    let mut ctx = make_ctx(MockCamera::new(128), SessionState::NotReady(setup));

    let lines = drive(&mut l, &mut ctx, &mut sink, b"11");

    assert_eq!(lines, vec!["No capture"; 2]);
    assert!(ctx.camera.port().calls.is_empty());
    assert_eq!(ctx.camera.state(), CameraState::Uninitialized);
    assert_eq!(l.stats().not_ready, 2);
}

#[test]
fn handle_command_returns_report_without_link() {
    let (mut l, mut sink) = make_loop();
    let mut ctx = ready(MockCamera::new(128), -1);
    let report = l.handle_command(
        petvision::app::commands::AppCommand::Capture,
        &mut ctx,
        &mut sink,
    );
    assert_eq!(report, Report::Label(Label::Person));
}
