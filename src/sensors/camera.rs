//! Camera lifecycle on top of a [`CameraPort`].
//!
//! ```text
//!   Uninitialized ──begin ok──▶ Ready
//!        │                        ▲
//!        └──begin err──▶ Failed ──┘ (retried on the next capture)
//! ```
//!
//! The camera is started lazily, on the first capture request, and never
//! restarted once `Ready`.  A failed start is retried on every later
//! request.  Reads are refused unless `Ready`.

use log::{info, warn};

use crate::app::ports::CameraPort;
use crate::error::{CycleError, SensorError};
use crate::vision::{FRAME_HEIGHT, FRAME_WIDTH, RawFrame};

/// Sensor output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 176×144.
    Qcif,
}

impl Resolution {
    pub const fn dimensions(self) -> (usize, usize) {
        match self {
            Self::Qcif => (FRAME_WIDTH, FRAME_HEIGHT),
        }
    }
}

/// Sensor pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel, 0 = black.
    Grayscale,
}

/// Parameters handed to [`CameraPort::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraSettings {
    pub resolution: Resolution,
    pub format: PixelFormat,
    pub frame_rate: u8,
}

impl CameraSettings {
    /// QCIF grayscale at the given rate.
    pub const fn qcif_grayscale(frame_rate: u8) -> Self {
        Self {
            resolution: Resolution::Qcif,
            format: PixelFormat::Grayscale,
            frame_rate,
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self::qcif_grayscale(5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Uninitialized,
    Ready,
    /// Start failed `attempts` times so far.
    Failed { attempts: u32 },
}

/// Lazily started camera that owns the reusable frame buffer.
pub struct Camera<P: CameraPort> {
    port: P,
    settings: CameraSettings,
    state: CameraState,
    frame: RawFrame,
}

impl<P: CameraPort> Camera<P> {
    pub fn new(port: P, settings: CameraSettings) -> Self {
        Self {
            port,
            settings,
            state: CameraState::Uninitialized,
            frame: RawFrame::new(),
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Start the sensor unless it already runs.
    pub fn ensure_ready(&mut self) -> Result<(), SensorError> {
        if self.state == CameraState::Ready {
            return Ok(());
        }
        match self.port.begin(&self.settings) {
            Ok(()) => {
                info!(
                    "camera ready: {:?} {:?} @ {} fps",
                    self.settings.resolution, self.settings.format, self.settings.frame_rate
                );
                self.state = CameraState::Ready;
                Ok(())
            }
            Err(e) => {
                let attempts = match self.state {
                    CameraState::Failed { attempts } => attempts.saturating_add(1),
                    _ => 1,
                };
                warn!("Failed to initialize camera! {} (attempt {})", e, attempts);
                self.state = CameraState::Failed { attempts };
                Err(e)
            }
        }
    }

    /// Read one frame into the owned buffer.
    pub fn read_frame(&mut self) -> Result<&RawFrame, SensorError> {
        if self.state != CameraState::Ready {
            return Err(SensorError::NotReady);
        }
        self.port.read_frame(&mut self.frame)?;
        Ok(&self.frame)
    }

    /// Start if needed, then read one frame.
    pub fn capture(&mut self) -> Result<&RawFrame, CycleError> {
        self.ensure_ready().map_err(CycleError::CameraInit)?;
        self.read_frame().map_err(CycleError::ImageCapture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyPort {
        begin_failures: u32,
        begins: u32,
        reads: u32,
    }

    impl CameraPort for FlakyPort {
        fn begin(&mut self, _settings: &CameraSettings) -> Result<(), SensorError> {
            self.begins += 1;
            if self.begins <= self.begin_failures {
                Err(SensorError::InitFailed(-1))
            } else {
                Ok(())
            }
        }

        fn read_frame(&mut self, frame: &mut RawFrame) -> Result<(), SensorError> {
            self.reads += 1;
            frame.pixels_mut().fill(200);
            Ok(())
        }
    }

    fn camera(begin_failures: u32) -> Camera<FlakyPort> {
        Camera::new(
            FlakyPort {
                begin_failures,
                begins: 0,
                reads: 0,
            },
            CameraSettings::default(),
        )
    }

    #[test]
    fn starts_uninitialized_and_begins_once() {
        let mut cam = camera(0);
        assert_eq!(cam.state(), CameraState::Uninitialized);
        cam.capture().unwrap();
        cam.capture().unwrap();
        assert_eq!(cam.state(), CameraState::Ready);
        assert_eq!(cam.port().begins, 1);
        assert_eq!(cam.port().reads, 2);
    }

    #[test]
    fn failed_begin_is_retried() {
        let mut cam = camera(2);
        assert_eq!(
            cam.capture().unwrap_err(),
            CycleError::CameraInit(SensorError::InitFailed(-1))
        );
        assert_eq!(cam.state(), CameraState::Failed { attempts: 1 });
        assert!(cam.capture().is_err());
        assert_eq!(cam.state(), CameraState::Failed { attempts: 2 });
        assert_eq!(cam.capture().unwrap().at(0, 0), 200);
        assert_eq!(cam.state(), CameraState::Ready);
        assert_eq!(cam.port().begins, 3);
    }

    #[test]
    fn read_refused_until_ready() {
        let mut cam = camera(0);
        assert_eq!(cam.read_frame().unwrap_err(), SensorError::NotReady);
        assert_eq!(cam.port().reads, 0);
    }

    #[test]
    fn default_settings_are_qcif_grayscale_5fps() {
        let s = CameraSettings::default();
        assert_eq!(s.resolution.dimensions(), (176, 144));
        assert_eq!(s.format, PixelFormat::Grayscale);
        assert_eq!(s.frame_rate, 5);
    }
}
