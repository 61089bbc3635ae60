//! UART control channel.
//!
//! Implements [`Transport`] over an ESP-IDF `UartDriver`.  Reads never
//! block: the command loop polls, and an empty RX FIFO simply yields 0.

use esp_idf_hal::delay::{BLOCK, NON_BLOCK};
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::uart::{UART0, UartDriver, config::Config};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::sys::EspError;

use crate::link::transport::Transport;
use crate::pins;

pub struct UartTransport {
    driver: UartDriver<'static>,
}

impl UartTransport {
    /// Open UART0 on the board's TX/RX pins at `baud`.
    pub fn new(uart: UART0, baud: u32) -> Result<Self, EspError> {
        // SAFETY: the pin numbers come from the board map and are not
        // claimed by any other driver.
        let (tx, rx) = unsafe {
            (
                AnyIOPin::new(pins::UART_TX_GPIO),
                AnyIOPin::new(pins::UART_RX_GPIO),
            )
        };
        let config = Config::default().baudrate(Hertz(baud));
        let driver = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )?;
        log::info!("UART: control channel at {} baud", baud);
        Ok(Self { driver })
    }
}

impl Transport for UartTransport {
    type Error = EspError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
        self.driver.read(buf, NON_BLOCK)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
        self.driver.write(data)
    }

    fn flush(&mut self) -> Result<(), EspError> {
        self.driver.wait_tx_done(BLOCK)
    }

    fn available(&self) -> bool {
        self.driver.remaining_read().is_ok_and(|n| n > 0)
    }
}
