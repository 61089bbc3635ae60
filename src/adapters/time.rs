//! ESP32 time adapter.
//!
//! Provides monotonic time queries for metrics and cycle timing.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

/// Time adapter for the ESP32-S3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.uptime_us() / 1_000_000
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: reads the monotonic high-resolution timer; no preconditions.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// Fires once every `interval_secs` of uptime.
#[derive(Debug, Clone, Copy)]
pub struct Periodic {
    interval_secs: u64,
    last_secs: u64,
}

impl Periodic {
    pub fn new(interval_secs: u32, now_secs: u64) -> Self {
        Self {
            interval_secs: u64::from(interval_secs.max(1)),
            last_secs: now_secs,
        }
    }

    /// `true` at most once per interval.
    pub fn due(&mut self, now_secs: u64) -> bool {
        if now_secs.saturating_sub(self.last_secs) >= self.interval_secs {
            self.last_secs = now_secs;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_is_monotonic() {
        let t = Esp32TimeAdapter::new();
        let a = t.uptime_us();
        let b = t.uptime_us();
        assert!(b >= a);
        assert_eq!(t.uptime_secs(), a / 1_000_000);
    }

    #[test]
    fn periodic_fires_once_per_interval() {
        let mut p = Periodic::new(60, 0);
        assert!(!p.due(59));
        assert!(p.due(60));
        assert!(!p.due(61));
        assert!(p.due(125));
    }
}
