//! GPIO / peripheral pin assignments for the PetVision camera board.
//!
//! Every driver references this module rather than hard-coding pin numbers.  The camera mapping follows the ESP32-S3-EYE
//! DVP connector.

// ---------------------------------------------------------------------------
// Camera (DVP parallel bus + SCCB)
// ---------------------------------------------------------------------------

/// Power-down line (not wired, -1 = unused).
pub const CAM_PWDN_GPIO: i32 = -1;
/// Hardware reset line (not wired, -1 = unused).
pub const CAM_RESET_GPIO: i32 = -1;
/// Master clock output to the sensor.
pub const CAM_XCLK_GPIO: i32 = 15;
/// SCCB (I2C-like) data.
pub const CAM_SIOD_GPIO: i32 = 4;
/// SCCB clock.
pub const CAM_SIOC_GPIO: i32 = 5;

/// Parallel data lines D0–D7.
pub const CAM_DATA_GPIOS: [i32; 8] = [11, 9, 8, 10, 12, 18, 17, 16];

/// Frame sync.
pub const CAM_VSYNC_GPIO: i32 = 6;
/// Line valid.
pub const CAM_HREF_GPIO: i32 = 7;
/// Pixel clock.
pub const CAM_PCLK_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Control channel (UART0 on the USB-serial bridge)
// ---------------------------------------------------------------------------
//
// UART0 is the ESP-IDF console by default.  `sdkconfig.defaults` moves the
// console to USB-Serial-JTAG so log output never reaches these pins.

pub const UART_TX_GPIO: i32 = 43;
pub const UART_RX_GPIO: i32 = 44;

#[cfg(test)]
mod tests {
    use super::*;

    const SDKCONFIG: &str = include_str!("../sdkconfig.defaults");

    fn enabled(key: &str) -> bool {
        SDKCONFIG
            .lines()
            .map(str::trim)
            .any(|l| l.strip_prefix(key).is_some_and(|v| v == "=y"))
    }

    #[test]
    fn console_is_off_the_control_uart() {
        assert!(enabled("CONFIG_ESP_CONSOLE_USB_SERIAL_JTAG"));
        assert!(!enabled("CONFIG_ESP_CONSOLE_UART_DEFAULT"));
        assert!(!enabled("CONFIG_ESP_CONSOLE_SECONDARY_USB_SERIAL_JTAG"));
    }

    #[test]
    fn control_uart_pins_are_free_of_the_camera_bus() {
        let camera = [
            CAM_XCLK_GPIO,
            CAM_SIOD_GPIO,
            CAM_SIOC_GPIO,
            CAM_VSYNC_GPIO,
            CAM_HREF_GPIO,
            CAM_PCLK_GPIO,
        ];
        for pin in [UART_TX_GPIO, UART_RX_GPIO] {
            assert!(!camera.contains(&pin));
            assert!(!CAM_DATA_GPIOS.contains(&pin));
        }
    }
}
