//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CommandLoop (domain)
//! ```
//!
//! Driven adapters (camera, inference engine, event sinks, storage)
//! implement these traits.  The [`CommandLoop`](super::service::CommandLoop)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::config::SystemConfig;
use crate::error::{InvokeError, SensorError};
use crate::sensors::camera::CameraSettings;
use crate::vision::RawFrame;

// ───────────────────────────────────────────────────────────────
// Camera port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Frame source.  The domain decides *when* to start it and when to read.
pub trait CameraPort {
    /// Bring the sensor up with the given resolution, format and rate.
    fn begin(&mut self, settings: &CameraSettings) -> Result<(), SensorError>;

    /// Fill `frame` with one complete grayscale frame.
    fn read_frame(&mut self, frame: &mut RawFrame) -> Result<(), SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Inference port (driven adapter: domain ↔ model runtime)
// ───────────────────────────────────────────────────────────────

/// A model session whose tensors are already allocated.
///
/// The input slice is the runtime's own tensor storage; writing to it is
/// how a sample is handed over.
pub trait InferencePort {
    /// Mutable view of the input tensor, `None` if tensors are unallocated.
    fn input_mut(&mut self) -> Option<&mut [i8]>;

    /// Run one forward pass over the current input.
    fn invoke(&mut self) -> Result<(), InvokeError>;

    /// View of the output tensor, `None` if tensors are unallocated.
    fn output(&self) -> Option<&[i8]>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ConfigError::NotFound`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
