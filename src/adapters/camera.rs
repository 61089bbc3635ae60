//! Camera adapter: implements [`CameraPort`] over the DVP driver.

use crate::app::ports::CameraPort;
use crate::drivers::camera::CameraDriver;
use crate::error::SensorError;
use crate::sensors::camera::CameraSettings;
use crate::vision::RawFrame;

pub struct EspCameraAdapter {
    driver: CameraDriver,
}

impl EspCameraAdapter {
    pub fn new(driver: CameraDriver) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &CameraDriver {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut CameraDriver {
        &mut self.driver
    }
}

impl Default for EspCameraAdapter {
    fn default() -> Self {
        Self::new(CameraDriver::new())
    }
}

impl CameraPort for EspCameraAdapter {
    fn begin(&mut self, settings: &CameraSettings) -> Result<(), SensorError> {
        self.driver.init(settings)
    }

    fn read_frame(&mut self, frame: &mut RawFrame) -> Result<(), SensorError> {
        self.driver.read_frame(frame)
    }
}
