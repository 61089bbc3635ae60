//! End-to-end: loopback link → CommandLoop → camera → real interpreter.
//!
//! The synthetic perception model outputs the mean brightness of the
//! pooled sample, so bright scenes classify as cat and dark or mid-gray
//! scenes as person.

use crate::mock_hw::{CollectSink, MockCamera};

use petvision::adapters::camera::EspCameraAdapter;
use petvision::app::context::PipelineContext;
use petvision::app::ports::CameraPort;
use petvision::app::service::CommandLoop;
use petvision::config::{ARENA_SIZE, SystemConfig};
use petvision::engine::arena::TensorArena;
use petvision::engine::session::{SchemaPolicy, setup};
use petvision::engine::testing::ModelSpec;
use petvision::link::transport::LoopbackTransport;
use petvision::sensors::camera::{Camera, CameraSettings};

fn run<C: CameraPort>(camera: C, bytes: &[u8]) -> Vec<String> {
    let model = ModelSpec::perception().build();
    let mut sink = CollectSink::new();
    let session = setup(
        &model,
        TensorArena::<ARENA_SIZE>::new(),
        SchemaPolicy::Warn,
        &mut sink,
    );
    assert!(session.is_ready());

    let mut ctx = PipelineContext::new(Camera::new(camera, CameraSettings::default()), session);
    let mut command_loop = CommandLoop::new(&SystemConfig::default());
    command_loop.start(&mut sink);

    let mut link = LoopbackTransport::new();
    link.push_rx(bytes);
    while command_loop.poll(&mut link, &mut ctx, &mut sink).is_some() {}
    link.take_lines()
}

#[test]
fn bright_scene_is_a_cat() {
    assert_eq!(run(MockCamera::new(228), b"1"), vec!["It's a cat"]);
}

#[test]
fn dark_scene_is_a_person() {
    assert_eq!(run(MockCamera::new(0), b"1"), vec!["It's a person"]);
}

#[test]
fn mid_gray_scores_zero_and_is_a_person() {
    assert_eq!(run(MockCamera::new(128), b"1"), vec!["It's a person"]);
}

#[test]
fn just_above_mid_gray_is_a_cat() {
    assert_eq!(run(MockCamera::new(129), b"1"), vec!["It's a cat"]);
}

#[test]
fn simulated_camera_is_deterministic() {
    let lines = run(EspCameraAdapter::default(), b"1x1");
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "No capture");
    assert_eq!(lines[0], lines[2]);
    assert_ne!(lines[0], "No capture");
}
