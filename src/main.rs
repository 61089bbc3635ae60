//! PetVision firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UartTransport   EspCameraAdapter   LogEventSink   NvsAdapter  │
//! │  (Transport)     (CameraPort)       (EventSink)    (Config)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             CommandLoop (pure logic)                   │    │
//! │  │  extract · Interpreter (InferencePort) · classify      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Watchdog · RuntimeMetrics                                     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
mod adapters;
mod app;
mod config;
mod diagnostics;
mod drivers;
mod engine;
mod error;
mod link;
mod pins;
mod sensors;
mod vision;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use adapters::camera::EspCameraAdapter;
use adapters::log_sink::LogEventSink;
use adapters::nvs::{NvsAdapter, load_validated};
use adapters::time::{Esp32TimeAdapter, Periodic};
use adapters::uart::UartTransport;
use app::context::PipelineContext;
use app::ports::EventSink;
use app::service::CommandLoop;
use app::events::AppEvent;
use diagnostics::RuntimeMetrics;
use drivers::camera::CameraDriver;
use drivers::watchdog::{self, Watchdog};
use engine::arena::TensorArena;
use engine::session::{self, SchemaPolicy};
use sensors::camera::{Camera, CameraSettings};

/// Model artifact embedded by build.rs.
static MODEL: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/model.tflite"));

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PetVision v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    diagnostics::install_panic_handler();
    let time = Esp32TimeAdapter::new();

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new() {
        Ok(nvs) => load_validated(&nvs),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            config::SystemConfig::default()
        }
    };
    info!(
        "Config: baud={} trigger=0x{:02x} fps={} threshold={}",
        config.uart_baud, config.trigger_byte, config.frame_rate, config.score_threshold
    );
    let watchdog = Watchdog::arm(watchdog::timeout_ms(config.poll_interval_ms));

    // ── 3. Control channel ────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let mut link = UartTransport::new(peripherals.uart0, config.uart_baud)?;

    // ── 4. Inference session (once, never rebuilt) ────────────
    let mut log_sink = LogEventSink::new();
    info!("Model: {} bytes embedded", MODEL.len());
    let session = session::setup(
        MODEL,
        TensorArena::<{ config::ARENA_SIZE }>::new(),
        SchemaPolicy::from_config(&config),
        &mut log_sink,
    );

    // ── 5. Camera (started lazily on the first trigger) ───────
    let camera = Camera::new(
        EspCameraAdapter::new(CameraDriver::new()),
        CameraSettings::qcif_grayscale(config.frame_rate),
    );

    let mut ctx = PipelineContext::new(camera, session);
    let mut command_loop = CommandLoop::new(&config);
    command_loop.start(&mut log_sink);

    info!("System ready. Entering command loop.");

    // ── 6. Poll loop ──────────────────────────────────────────
    let poll_delay = std::time::Duration::from_millis(u64::from(config.poll_interval_ms));
    let mut metrics_due = Periodic::new(config.metrics_interval_secs, time.uptime_secs());

    loop {
        if command_loop.poll(&mut link, &mut ctx, &mut log_sink).is_none() {
            std::thread::sleep(poll_delay);
        }

        watchdog.feed();

        let now = time.uptime_secs();
        if metrics_due.due(now) {
            let arena = match ctx.session.session() {
                Ok(s) => (s.arena_used().unwrap_or(0), s.arena_size()),
                Err(_) => (0, config::ARENA_SIZE),
            };
            let stats = *command_loop.stats();
            log_sink.emit(&AppEvent::Stats(stats));
            info!("METRICS | {}", RuntimeMetrics::collect(now, arena, stats).to_json());
        }
    }
}
