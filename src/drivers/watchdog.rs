//! Task watchdog (TWDT) guard for the command loop.
//!
//! The timeout follows the loop's own timing: one full perception cycle
//! plus two idle sleeps.  The guard unsubscribes the main task when it is
//! dropped.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_delete,
    esp_task_wdt_reconfigure, esp_task_wdt_reset,
};
use log::{info, warn};

/// Worst case for one cycle: first-capture sensor start, a frame read and
/// a forward pass.
pub const CYCLE_BUDGET_MS: u32 = 12_000;

/// TWDT timeout for a loop that sleeps `poll_interval_ms` between idle polls.
pub fn timeout_ms(poll_interval_ms: u32) -> u32 {
    CYCLE_BUDGET_MS.saturating_add(poll_interval_ms.saturating_mul(2))
}

pub struct Watchdog {
    timeout_ms: u32,
    armed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: core::cell::Cell<u64>,
}

impl Watchdog {
    /// Subscribe the calling task with `timeout_ms`.  A task that cannot be
    /// subscribed still gets a guard; `feed` is then a no-op.
    pub fn arm(timeout_ms: u32) -> Self {
        let armed = subscribe(timeout_ms);
        if armed {
            info!("WDT | armed timeout_ms={} panic=true", timeout_ms);
        } else {
            warn!("WDT | not armed, loop stalls will not reset the device");
        }
        Self {
            timeout_ms,
            armed,
            #[cfg(not(target_os = "espidf"))]
            feeds: core::cell::Cell::new(0),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Must run at least once per [`timeout_ms`](Self::timeout_ms).
    pub fn feed(&self) {
        if !self.armed {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: the calling task was subscribed in `arm`.
            unsafe { esp_task_wdt_reset() };
        }
        #[cfg(not(target_os = "espidf"))]
        self.feeds.set(self.feeds.get() + 1);
    }

    /// Feeds so far (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u64 {
        self.feeds.get()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if self.armed {
            unsubscribe();
        }
    }
}

#[cfg(target_os = "espidf")]
fn subscribe(timeout_ms: u32) -> bool {
    let cfg = esp_task_wdt_config_t {
        timeout_ms,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    // SAFETY: `cfg` lives for the call; TWDT copies it.
    let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
    if ret != ESP_OK {
        warn!("WDT | reconfigure err={}", ret);
    }
    // SAFETY: a null handle subscribes the calling task.
    let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
    if ret != ESP_OK {
        warn!("WDT | subscribe err={}", ret);
    }
    ret == ESP_OK
}

#[cfg(not(target_os = "espidf"))]
fn subscribe(_timeout_ms: u32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
fn unsubscribe() {
    // SAFETY: only called for a task that `subscribe` added.
    let ret = unsafe { esp_task_wdt_delete(core::ptr::null_mut()) };
    if ret != ESP_OK {
        warn!("WDT | unsubscribe err={}", ret);
    }
}

#[cfg(not(target_os = "espidf"))]
fn unsubscribe() {
    info!("WDT | disarmed");
}
