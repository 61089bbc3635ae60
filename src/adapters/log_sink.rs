//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger.  The logger is the diagnostic channel; report
//! lines never go through here.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the diagnostic console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { trigger } => {
                info!("START | trigger=0x{:02x}", trigger);
            }
            AppEvent::SessionReady {
                arena_used,
                arena_size,
            } => {
                info!("SESSION | ready | arena={}/{}B", arena_used, arena_size);
            }
            AppEvent::SchemaMismatch { found, supported } => {
                warn!("SESSION | schema found={} supported={}", found, supported);
            }
            AppEvent::CommandIgnored(byte) => {
                info!("CMD | ignored byte=0x{:02x}", byte);
            }
            AppEvent::CycleCompleted { label, score } => {
                info!("CYCLE | label={} score={}", label.as_str(), score);
            }
            AppEvent::Fault(e) => {
                error!("FAULT | {}", e);
            }
            AppEvent::Stats(s) => {
                info!(
                    "STATS | triggers={} cat={} person={} cam_fail={} invoke_fail={} \
                     not_ready={} ignored={}",
                    s.triggers,
                    s.cats,
                    s.persons,
                    s.camera_failures,
                    s.invoke_failures,
                    s.not_ready,
                    s.ignored,
                );
            }
        }
    }
}
