//! DVP camera driver (esp32-camera component).
//!
//! Configures the sensor for QCIF grayscale and copies each frame buffer
//! into the caller's [`RawFrame`] before handing it back to the driver.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `esp_camera_init` / `esp_camera_fb_get` over the pins in
//! [`crate::pins`].
//! On host/test: renders a synthetic test card so the whole pipeline runs
//! without hardware.

use crate::error::SensorError;
use crate::sensors::camera::CameraSettings;
#[cfg(target_os = "espidf")]
use crate::sensors::camera::{PixelFormat, Resolution};
use crate::vision::{FRAME_LEN, RawFrame};

#[cfg(target_os = "espidf")]
use crate::pins;
#[cfg(target_os = "espidf")]
use esp_idf_sys::camera;

/// Lowest and highest master clock the sensor accepts.
const XCLK_MIN_HZ: u32 = 6_000_000;
const XCLK_MAX_HZ: u32 = 20_000_000;

/// Master clock for a requested frame rate.
///
/// The sensor derives its frame timing from XCLK, so a lower rate means a
/// slower clock and less PCLK bandwidth.
pub fn xclk_hz(frame_rate: u8) -> u32 {
    (u32::from(frame_rate) * 2_000_000).clamp(XCLK_MIN_HZ, XCLK_MAX_HZ)
}

pub struct CameraDriver {
    initialised: bool,
    #[cfg(not(target_os = "espidf"))]
    frames: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_fail_begin: bool,
}

impl Default for CameraDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver {
    pub fn new() -> Self {
        Self {
            initialised: false,
            #[cfg(not(target_os = "espidf"))]
            frames: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_fail_begin: false,
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Make the next `init` fail like an absent sensor.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_begin(&mut self, fail: bool) {
        self.sim_fail_begin = fail;
    }

    /// Frames delivered so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Start the sensor.  A second call after success is a no-op.
    pub fn init(&mut self, settings: &CameraSettings) -> Result<(), SensorError> {
        if self.initialised {
            return Ok(());
        }
        self.init_hw(settings)?;
        self.initialised = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn init_hw(&mut self, settings: &CameraSettings) -> Result<(), SensorError> {
        let [d0, d1, d2, d3, d4, d5, d6, d7] = pins::CAM_DATA_GPIOS;
        let config = camera::camera_config_t {
            pin_pwdn: pins::CAM_PWDN_GPIO,
            pin_reset: pins::CAM_RESET_GPIO,
            pin_xclk: pins::CAM_XCLK_GPIO,
            __bindgen_anon_1: camera::camera_config_t__bindgen_ty_1 {
                pin_sccb_sda: pins::CAM_SIOD_GPIO,
            },
            __bindgen_anon_2: camera::camera_config_t__bindgen_ty_2 {
                pin_sccb_scl: pins::CAM_SIOC_GPIO,
            },
            pin_d0: d0,
            pin_d1: d1,
            pin_d2: d2,
            pin_d3: d3,
            pin_d4: d4,
            pin_d5: d5,
            pin_d6: d6,
            pin_d7: d7,
            pin_vsync: pins::CAM_VSYNC_GPIO,
            pin_href: pins::CAM_HREF_GPIO,
            pin_pclk: pins::CAM_PCLK_GPIO,
            xclk_freq_hz: xclk_hz(settings.frame_rate) as i32,
            ledc_timer: esp_idf_sys::ledc_timer_t_LEDC_TIMER_0,
            ledc_channel: esp_idf_sys::ledc_channel_t_LEDC_CHANNEL_0,
            pixel_format: pixel_format(settings.format),
            frame_size: frame_size(settings.resolution),
            jpeg_quality: 0,
            fb_count: 1,
            fb_location: camera::camera_fb_location_t_CAMERA_FB_IN_DRAM,
            grab_mode: camera::camera_grab_mode_t_CAMERA_GRAB_WHEN_EMPTY,
            ..Default::default()
        };

        // SAFETY: `config` outlives the call; the driver copies what it keeps.
        let ret = unsafe { camera::esp_camera_init(&config) };
        if ret != esp_idf_sys::ESP_OK {
            return Err(SensorError::InitFailed(ret));
        }
        log::info!(
            "camera: esp32-camera up, QCIF grayscale, xclk={}Hz",
            xclk_hz(settings.frame_rate)
        );
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn init_hw(&mut self, settings: &CameraSettings) -> Result<(), SensorError> {
        if self.sim_fail_begin {
            return Err(SensorError::InitFailed(-1));
        }
        log::info!(
            "camera(sim): test card, xclk={}Hz",
            xclk_hz(settings.frame_rate)
        );
        Ok(())
    }

    /// Block until one complete frame is available and copy it into `frame`.
    pub fn read_frame(&mut self, frame: &mut RawFrame) -> Result<(), SensorError> {
        if !self.initialised {
            return Err(SensorError::NotReady);
        }
        self.read_hw(frame)
    }

    #[cfg(target_os = "espidf")]
    fn read_hw(&mut self, frame: &mut RawFrame) -> Result<(), SensorError> {
        // SAFETY: the driver is initialised; the buffer is returned below on
        // every path before another `fb_get`.
        let fb = unsafe { camera::esp_camera_fb_get() };
        if fb.is_null() {
            return Err(SensorError::CaptureFailed);
        }

        // SAFETY: `fb` is non-null and owned by us until `fb_return`.
        let (buf, len) = unsafe { ((*fb).buf, (*fb).len) };
        let result = if len != FRAME_LEN || buf.is_null() {
            Err(SensorError::FrameSizeMismatch {
                expected: FRAME_LEN,
                actual: len,
            })
        } else {
            // SAFETY: `buf` points at `len` initialised bytes.
            let pixels = unsafe { core::slice::from_raw_parts(buf, len) };
            frame.pixels_mut().copy_from_slice(pixels);
            Ok(())
        };

        unsafe { camera::esp_camera_fb_return(fb) };
        result
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_hw(&mut self, frame: &mut RawFrame) -> Result<(), SensorError> {
        debug_assert_eq!(frame.pixels().len(), FRAME_LEN);
        *frame = test_card();
        self.frames = self.frames.wrapping_add(1);
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn frame_size(resolution: Resolution) -> camera::framesize_t {
    match resolution {
        Resolution::Qcif => camera::framesize_t_FRAMESIZE_QCIF,
    }
}

#[cfg(target_os = "espidf")]
fn pixel_format(format: PixelFormat) -> camera::pixformat_t {
    match format {
        PixelFormat::Grayscale => camera::pixformat_t_PIXFORMAT_GRAYSCALE,
    }
}

/// Horizontal gradient with a bright centre square.
#[cfg(not(target_os = "espidf"))]
fn test_card() -> RawFrame {
    use crate::vision::{CROP_X, CROP_Y, SAMPLE_SIDE};
    let (cx, cy) = (CROP_X + SAMPLE_SIDE / 4, CROP_Y + SAMPLE_SIDE / 4);
    let half = SAMPLE_SIDE / 2;
    RawFrame::from_fn(|x, y| {
        if (cx..cx + half).contains(&x) && (cy..cy + half).contains(&y) {
            240
        } else {
            (x * 255 / (crate::vision::FRAME_WIDTH - 1)) as u8
        }
    })
}
