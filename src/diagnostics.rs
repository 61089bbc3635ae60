//! Cycle counters and runtime diagnostics.
//!
//! [`CycleStats`] is maintained by the command loop and counts what every
//! command led to.  [`RuntimeMetrics`] adds heap figures and uptime and is
//! logged periodically as a JSON line on the diagnostic channel, which
//! stays separate from the report channel.

use serde::{Deserialize, Serialize};

use crate::error::CycleError;
use crate::vision::classify::Label;

/// Counters over the lifetime of the command loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    /// Trigger bytes received.
    pub triggers: u32,
    /// Cycles that produced "It's a cat".
    pub cats: u32,
    /// Cycles that produced "It's a person".
    pub persons: u32,
    /// Cycles abandoned because the camera failed.
    pub camera_failures: u32,
    /// Cycles abandoned because the forward pass failed.
    pub invoke_failures: u32,
    /// Cycles refused because setup never completed.
    pub not_ready: u32,
    /// Non-trigger bytes answered with "No capture".
    pub ignored: u32,
}

impl CycleStats {
    pub fn record_trigger(&mut self) {
        self.triggers = self.triggers.saturating_add(1);
    }

    pub fn record_label(&mut self, label: Label) {
        let slot = match label {
            Label::Cat => &mut self.cats,
            Label::Person => &mut self.persons,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn record_failure(&mut self, err: &CycleError) {
        let slot = match err {
            CycleError::SessionNotReady => &mut self.not_ready,
            CycleError::CameraInit(_) | CycleError::ImageCapture(_) => &mut self.camera_failures,
            CycleError::InputShapeMismatch { .. }
            | CycleError::Invoke(_)
            | CycleError::EmptyOutput => &mut self.invoke_failures,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn record_ignored(&mut self) {
        self.ignored = self.ignored.saturating_add(1);
    }

    /// Cycles that ended with a label.
    pub fn classified(&self) -> u32 {
        self.cats.saturating_add(self.persons)
    }

    /// Cycles that ended with "No capture".
    pub fn failed(&self) -> u32 {
        self.camera_failures
            .saturating_add(self.invoke_failures)
            .saturating_add(self.not_ready)
    }
}

/// Runtime diagnostics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeMetrics {
    pub uptime_secs: u64,
    pub heap_free: u32,
    pub heap_min_free: u32,
    pub arena_used: usize,
    pub arena_size: usize,
    pub cycles: CycleStats,
}

impl RuntimeMetrics {
    #[cfg(target_os = "espidf")]
    pub fn collect(uptime_secs: u64, arena: (usize, usize), cycles: CycleStats) -> Self {
        use esp_idf_svc::sys::*;
        // SAFETY: plain heap-statistics reads with no preconditions.
        let heap_free = unsafe { esp_get_free_heap_size() };
        let heap_min_free = unsafe { esp_get_minimum_free_heap_size() };

        Self {
            uptime_secs,
            heap_free,
            heap_min_free,
            arena_used: arena.0,
            arena_size: arena.1,
            cycles,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect(uptime_secs: u64, arena: (usize, usize), cycles: CycleStats) -> Self {
        // Synthetic values so simulation paths exercise the same branches.
        // The arena is allocated once, so heap stays flat after boot.
        let heap_free: u32 = 180_224;
        Self {
            uptime_secs,
            heap_free,
            heap_min_free: (heap_free as f32 * 0.9) as u32,
            arena_used: arena.0,
            arena_size: arena.1,
            cycles,
        }
    }

    /// One-line JSON rendering for the diagnostic log.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

// ───────────────────────────────────────────────────────────────
// Panic hook: last words on the diagnostic channel
// ───────────────────────────────────────────────────────────────

/// Install a panic hook that logs the reason and the heap state.
///
/// Must be called once during init, after the logger is up.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };

        match info.location() {
            Some(loc) => log::error!("PANIC: {} at {}:{}", reason, loc.file(), loc.line()),
            None => log::error!("PANIC: {}", reason),
        }

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: heap statistics reads are safe from panic context.
            let free = unsafe { esp_idf_svc::sys::esp_get_free_heap_size() };
            log::error!("PANIC: heap_free={}", free);
        }
    }));
}
