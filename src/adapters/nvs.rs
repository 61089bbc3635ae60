//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for PetVision.  The configuration is stored as
//! one postcard blob under `petvision/syscfg`.
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().
//! - Self-healing boot: a missing, corrupted or out-of-range blob is
//!   replaced with the defaults by [`load_validated`].

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "petvision";
#[cfg_attr(target_os = "espidf", allow(dead_code))]
const CONFIG_KEY: &str = "syscfg";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 512;

/// Open NVS namespace, closed on drop.
#[cfg(target_os = "espidf")]
struct NvsHandle(nvs_handle_t);

#[cfg(target_os = "espidf")]
impl NvsHandle {
    fn open(namespace: &core::ffi::CStr, write: bool) -> Result<Self, esp_err_t> {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        // SAFETY: `namespace` is NUL-terminated and `handle` is a valid out-pointer.
        esp_result(unsafe { nvs_open(namespace.as_ptr(), mode, &mut handle) })?;
        Ok(Self(handle))
    }

    /// Read the blob under `key`.  `Ok(None)` if the key does not exist.
    fn get_blob(&self, key: &core::ffi::CStr) -> Result<Option<Vec<u8>>, esp_err_t> {
        let mut size: usize = 0;
        // SAFETY: a null buffer asks NVS for the stored length only.
        let ret = unsafe { nvs_get_blob(self.0, key.as_ptr(), core::ptr::null_mut(), &mut size) };
        if ret == ESP_ERR_NVS_NOT_FOUND {
            return Ok(None);
        }
        esp_result(ret)?;
        if size == 0 || size > MAX_BLOB_SIZE {
            return Err(ESP_ERR_NVS_INVALID_LENGTH);
        }

        let mut buf = vec![0u8; size];
        // SAFETY: `buf` holds exactly `size` writable bytes.
        esp_result(unsafe {
            nvs_get_blob(self.0, key.as_ptr(), buf.as_mut_ptr().cast(), &mut size)
        })?;
        buf.truncate(size);
        Ok(Some(buf))
    }

    fn set_blob(&self, key: &core::ffi::CStr, data: &[u8]) -> Result<(), esp_err_t> {
        // SAFETY: `data` is valid for `data.len()` bytes for the whole call.
        esp_result(unsafe { nvs_set_blob(self.0, key.as_ptr(), data.as_ptr().cast(), data.len()) })
    }

    fn commit(&self) -> Result<(), esp_err_t> {
        // SAFETY: the handle is open for writing.
        esp_result(unsafe { nvs_commit(self.0) })
    }
}

#[cfg(target_os = "espidf")]
impl Drop for NvsHandle {
    fn drop(&mut self) {
        // SAFETY: the handle came from a successful `nvs_open`.
        unsafe { nvs_close(self.0) };
    }
}

#[cfg(target_os = "espidf")]
fn esp_result(ret: esp_err_t) -> Result<(), esp_err_t> {
    if ret == ESP_OK { Ok(()) } else { Err(ret) }
}

#[cfg(target_os = "espidf")]
const NAMESPACE_C: &core::ffi::CStr = c"petvision";
#[cfg(target_os = "espidf")]
const KEY_C: &core::ffi::CStr = c"syscfg";

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// A partition that is full or was written by a newer NVS version is
    /// erased and initialised again; any other failure is an
    /// `Err(ConfigError::IoError)`.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: partition unusable ({}), erasing", ret);
                esp_result(unsafe { nvs_flash_erase() }).map_err(|_| ConfigError::IoError)?;
                esp_result(unsafe { nvs_flash_init() }).map_err(|_| ConfigError::IoError)?;
            } else {
                esp_result(ret).map_err(|_| ConfigError::IoError)?;
            }
            info!("NvsAdapter: flash ready, namespace '{}'", CONFIG_NAMESPACE);
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: in-memory store, namespace '{}'", CONFIG_NAMESPACE);

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn store_key() -> String {
        format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        Ok(self.store.borrow().get(&Self::store_key()).cloned())
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let handle = match NvsHandle::open(NAMESPACE_C, false) {
            Ok(h) => h,
            // The namespace only exists after the first save.
            Err(ESP_ERR_NVS_NOT_FOUND) => return Ok(None),
            Err(e) => {
                warn!("NvsAdapter: open failed ({})", e);
                return Err(ConfigError::IoError);
            }
        };
        handle.get_blob(KEY_C).map_err(|e| {
            warn!("NvsAdapter: read failed ({})", e);
            ConfigError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, bytes: Vec<u8>) -> Result<(), ConfigError> {
        self.store.borrow_mut().insert(Self::store_key(), bytes);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, bytes: Vec<u8>) -> Result<(), ConfigError> {
        NvsHandle::open(NAMESPACE_C, true)
            .and_then(|h| {
                h.set_blob(KEY_C, &bytes)?;
                h.commit()
            })
            .map_err(|e| {
                warn!("NvsAdapter: write failed ({})", e);
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    ConfigError::StorageFull
                } else {
                    ConfigError::IoError
                }
            })
    }
}

/// Range-check every field of `cfg`.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(1200..=921_600).contains(&cfg.uart_baud) {
        return Err(ConfigError::ValidationFailed(
            "uart_baud must be 1200-921600",
        ));
    }
    if cfg.trigger_byte == b'\r' || cfg.trigger_byte == b'\n' {
        return Err(ConfigError::ValidationFailed(
            "trigger_byte must not be a line terminator",
        ));
    }
    if !(1..=30).contains(&cfg.frame_rate) {
        return Err(ConfigError::ValidationFailed("frame_rate must be 1-30"));
    }
    if !cfg.score_threshold.is_finite() || !(-128.0..=127.0).contains(&cfg.score_threshold) {
        return Err(ConfigError::ValidationFailed(
            "score_threshold must be within the int8 range",
        ));
    }
    if !(1..=1000).contains(&cfg.poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "poll_interval_ms must be 1-1000",
        ));
    }
    if !(5..=3600).contains(&cfg.metrics_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "metrics_interval_secs must be 5-3600",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        match self.read_blob()? {
            Some(bytes) => {
                let cfg: SystemConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            None => Err(ConfigError::NotFound),
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        let len = bytes.len();
        self.write_blob(bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", len);
        Ok(())
    }
}

/// Load the stored config, falling back to defaults.
///
/// A blob that is absent, undecodable or out of range (e.g. written by an
/// older firmware with wider ranges) is overwritten with the defaults so the
/// next boot reads a valid config.  Storage I/O errors leave flash alone.
pub fn load_validated(port: &impl ConfigPort) -> SystemConfig {
    let rejected = match port.load() {
        Ok(cfg) => match validate_config(&cfg) {
            Ok(()) => return cfg,
            Err(e) => e,
        },
        Err(ConfigError::IoError) => {
            log::warn!("config load failed (I/O error), using defaults");
            return SystemConfig::default();
        }
        Err(e) => e,
    };

    let defaults = SystemConfig::default();
    match port.save(&defaults) {
        Ok(()) => log::warn!("stored config unusable ({}), defaults written", rejected),
        Err(e) => log::warn!(
            "stored config unusable ({}), defaults not written ({})",
            rejected,
            e
        ),
    }
    defaults
}
