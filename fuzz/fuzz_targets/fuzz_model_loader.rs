//! Fuzz target: model artifact → session setup → invoke
//!
//! Feeds arbitrary bytes through the flatbuffer verifier, op resolution
//! and the arena planner.  Whatever verifies must allocate inside the
//! arena or fail cleanly, and a ready session must survive an invoke.
//!
//! cargo fuzz run fuzz_model_loader

#![no_main]

use libfuzzer_sys::fuzz_target;
use petvision::app::events::AppEvent;
use petvision::app::ports::EventSink;
use petvision::engine::arena::TensorArena;
use petvision::engine::session::{SchemaPolicy, setup};

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let mut state = setup(data, TensorArena::<16384>::new(), SchemaPolicy::Warn, &mut Discard);

    if let Ok(session) = state.session_mut() {
        let used = session.arena_used().unwrap_or(0);
        assert!(used <= session.arena_size(), "plan exceeds arena");

        if let Some(input) = session.input_mut() {
            input.fill(0x55);
        }
        // Kernels may reject shapes; they must not panic.
        let _ = session.invoke();
        let _ = session.output();
    }
});
