//! Outbound application events.
//!
//! The command loop and session setup emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.  The default adapter writes them to
//! the diagnostic log.

use crate::diagnostics::CycleStats;
use crate::error::Error;
use crate::vision::classify::Label;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The command loop is accepting commands.
    Started { trigger: u8 },

    /// Model parsed, ops registered, tensors allocated.
    SessionReady { arena_used: usize, arena_size: usize },

    /// The model was built for another schema version.
    SchemaMismatch { found: u32, supported: u32 },

    /// A non-trigger byte arrived and was answered with "No capture".
    CommandIgnored(u8),

    /// A cycle produced a label.
    CycleCompleted { label: Label, score: i8 },

    /// Setup or a cycle failed.
    Fault(Error),

    /// Periodic counters snapshot.
    Stats(CycleStats),
}
