//! System configuration parameters
//!
//! Runtime-tunable parameters live in [`SystemConfig`] and can be
//! overridden via NVS.  Geometry, arena size and schema version are
//! compile-time constants: the fixed-resource execution model depends on
//! them and they are never changed at runtime.

use serde::{Deserialize, Serialize};

/// Size of the single tensor arena (136 KiB).
pub const ARENA_SIZE: usize = 136 * 1024;

/// Flatbuffer schema version the inference engine understands.
pub const TFLITE_SCHEMA_VERSION: u32 = 3;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Control channel ---
    /// UART baud rate of the command/report channel
    pub uart_baud: u32,
    /// Byte that triggers one capture → classify cycle
    pub trigger_byte: u8,

    // --- Camera ---
    /// Frame-rate setting passed to the camera on first capture
    pub frame_rate: u8,

    // --- Classification ---
    /// Decision threshold applied to the first output value
    pub score_threshold: f32,
    /// Treat a model schema-version mismatch as a fatal setup error
    pub strict_schema_version: bool,

    // --- Timing ---
    /// Delay between control-channel polls (milliseconds)
    pub poll_interval_ms: u32,
    /// Runtime metrics report interval (seconds)
    pub metrics_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Control channel
            uart_baud: 9600,
            trigger_byte: b'1',

            // Camera
            frame_rate: 5,

            // Classification
            score_threshold: 0.5,
            strict_schema_version: false,

            // Timing
            poll_interval_ms: 10,
            metrics_interval_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert_eq!(c.uart_baud, 9600);
        assert_eq!(c.trigger_byte, b'1');
        assert_eq!(c.frame_rate, 5);
        assert!((c.score_threshold - 0.5).abs() < f32::EPSILON);
        assert!(!c.strict_schema_version);
        assert!(c.poll_interval_ms > 0);
    }

    #[test]
    fn arena_is_136_kib() {
        assert_eq!(ARENA_SIZE, 139_264);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.trigger_byte, c2.trigger_byte);
        assert_eq!(c.uart_baud, c2.uart_baud);
        assert!((c.score_threshold - c2.score_threshold).abs() < 0.001);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SystemConfig {
            strict_schema_version: true,
            ..Default::default()
        };
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert!(c2.strict_schema_version);
        assert_eq!(c.frame_rate, c2.frame_rate);
    }
}
