//! Integration tests for session setup against real model artifacts.
//!
//! Models are built with the engine's flatbuffer writers, so every test
//! exercises verification, op registration and arena planning end to end.

use crate::mock_hw::CollectSink;

use petvision::app::events::AppEvent;
use petvision::config::ARENA_SIZE;
use petvision::engine::arena::TensorArena;
use petvision::engine::session::{SchemaPolicy, setup};
use petvision::engine::testing::ModelSpec;
use petvision::error::{AllocationError, Error, ModelError, SetupError};
use petvision::vision::SAMPLE_LEN;

#[test]
fn perception_model_fits_the_production_arena() {
    let bytes = ModelSpec::perception().build();
    let mut sink = CollectSink::new();
    let mut state = setup(
        &bytes,
        TensorArena::<ARENA_SIZE>::new(),
        SchemaPolicy::Warn,
        &mut sink,
    );

    assert!(state.is_ready());
    let session = state.session_mut().unwrap();
    let used = session.arena_used().unwrap();
    assert!(used > 0 && used <= ARENA_SIZE);
    assert_eq!(session.input_mut().map(|i| i.len()), Some(SAMPLE_LEN));
    assert_eq!(session.output().map(<[i8]>::len), Some(1));

    assert_eq!(
        sink.events,
        vec![AppEvent::SessionReady {
            arena_used: used,
            arena_size: ARENA_SIZE
        }]
    );
}

#[test]
fn undersized_arena_leaves_no_usable_input() {
    let bytes = ModelSpec::perception().build();
    let mut sink = CollectSink::new();
    let mut state = setup(
        &bytes,
        TensorArena::<4096>::new(),
        SchemaPolicy::Warn,
        &mut sink,
    );

    assert!(!state.is_ready());
    assert!(state.session_mut().is_err());
    match state.setup_error() {
        Some(SetupError::TensorAllocation(AllocationError::ArenaExhausted {
            required,
            available,
        })) => {
            assert!(required > available);
            assert_eq!(available, 4096);
        }
        other => panic!("expected ArenaExhausted, got {:?}", other),
    }
    assert_eq!(sink.faults(), 1);
}

#[test]
fn model_without_outputs_is_rejected() {
    let bytes = ModelSpec::perception().without_outputs().build();
    let mut sink = CollectSink::new();
    let state = setup(
        &bytes,
        TensorArena::<ARENA_SIZE>::new(),
        SchemaPolicy::Warn,
        &mut sink,
    );
    assert_eq!(
        state.setup_error(),
        Some(SetupError::Model(ModelError::MissingIo))
    );
}

#[test]
fn empty_artifact_is_malformed() {
    let mut sink = CollectSink::new();
    let state = setup(
        &[],
        TensorArena::<ARENA_SIZE>::new(),
        SchemaPolicy::Warn,
        &mut sink,
    );
    assert_eq!(
        sink.events,
        vec![AppEvent::Fault(Error::Setup(SetupError::Model(
            ModelError::Malformed
        )))]
    );
    assert!(!state.is_ready());
}

#[test]
fn schema_mismatch_policy() {
    let bytes = ModelSpec::perception().version(4).build();

    let mut sink = CollectSink::new();
    let lenient = setup(
        &bytes,
        TensorArena::<ARENA_SIZE>::new(),
        SchemaPolicy::Warn,
        &mut sink,
    );
    assert!(lenient.is_ready());
    assert_eq!(
        sink.events[0],
        AppEvent::SchemaMismatch {
            found: 4,
            supported: 3
        }
    );

    let mut sink = CollectSink::new();
    let strict = setup(
        &bytes,
        TensorArena::<ARENA_SIZE>::new(),
        SchemaPolicy::Strict,
        &mut sink,
    );
    assert_eq!(
        strict.setup_error(),
        Some(SetupError::Model(ModelError::SchemaVersionMismatch {
            found: 4,
            supported: 3
        }))
    );
}
