//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `camera`       | CameraPort         | esp32-camera / test card |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `nvs`          | ConfigPort         | NVS / in-memory store    |
//! | `time`         | (uptime queries)   | ESP32 system timer       |
//! | `uart`         | Transport          | UART0 control channel    |
//!
//! The inference session needs no adapter: the engine's interpreter
//! implements `InferencePort` directly.

pub mod camera;
pub mod log_sink;
pub mod nvs;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
