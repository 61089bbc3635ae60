//! Fuzz target: `CommandLoop::poll` over arbitrary control bytes
//!
//! Runs the full loop against the simulated camera and the synthetic
//! perception model.  Every received byte must produce exactly one report
//! line drawn from the three-line output alphabet.
//!
//! cargo fuzz run fuzz_command_stream

#![no_main]

use libfuzzer_sys::fuzz_target;
use petvision::adapters::camera::EspCameraAdapter;
use petvision::app::context::PipelineContext;
use petvision::app::events::AppEvent;
use petvision::app::ports::EventSink;
use petvision::app::service::CommandLoop;
use petvision::config::{ARENA_SIZE, SystemConfig};
use petvision::engine::arena::TensorArena;
use petvision::engine::session::{SchemaPolicy, setup};
use petvision::engine::testing::ModelSpec;
use petvision::link::transport::LoopbackTransport;
use petvision::sensors::camera::{Camera, CameraSettings};

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(64)];
    let model = ModelSpec::perception().build();
    let session = setup(&model, TensorArena::<ARENA_SIZE>::new(), SchemaPolicy::Warn, &mut Discard);
    let camera = Camera::new(EspCameraAdapter::default(), CameraSettings::default());
    let mut ctx = PipelineContext::new(camera, session);
    let mut command_loop = CommandLoop::new(&SystemConfig::default());

    let mut link = LoopbackTransport::new();
    link.push_rx(data);
    while command_loop.poll(&mut link, &mut ctx, &mut Discard).is_some() {}

    let lines = link.take_lines();
    assert_eq!(lines.len(), data.len());
    for line in &lines {
        assert!(matches!(
            line.as_str(),
            "It's a cat" | "It's a person" | "No capture"
        ));
    }
});
