//! Runtime diagnostics for the advertising multiplexer.
//!
//! [`MuxCounters`] is the debug-observable record of what the core did:
//! radio pushes, deferred updates, and — importantly — calls that were
//! silently ignored because they carried an invalid handle. The public
//! success/failure contract treats those as no-ops; the counters let
//! tests and field debugging see them anyway.
//!
//! [`RuntimeMetrics`] is the on-demand snapshot reported by the main loop
//! on the metrics tick.

use serde::Serialize;

/// Monotonic activity counters, held by the multiplexer since construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MuxCounters {
    /// Payloads programmed into the radio (immediate + rotation pushes).
    pub radio_pushes: u64,
    /// `stop()` calls issued to the radio.
    pub radio_stops: u64,
    /// Payload updates stored but deferred past the fast-path budget.
    pub deferred_updates: u64,
    /// advertise/advertise_stop/unregister calls ignored for an invalid
    /// (out-of-range or unallocated) handle.
    pub ignored_calls: u64,
    /// Rotation ticks processed while rotation was enabled.
    pub rotation_ticks: u64,
}

/// Runtime diagnostics snapshot collected on-demand.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeMetrics {
    pub uptime_secs: u64,
    pub registered_clients: usize,
    pub active_clients: usize,
    pub rotation_enabled: bool,
    pub counters: MuxCounters,
    pub heap_free: u32,
}

impl RuntimeMetrics {
    #[cfg(target_os = "espidf")]
    pub fn collect(
        uptime_secs: u64,
        registered_clients: usize,
        active_clients: usize,
        rotation_enabled: bool,
        counters: MuxCounters,
    ) -> Self {
        let heap_free = unsafe { esp_idf_svc::sys::esp_get_free_heap_size() };

        Self {
            uptime_secs,
            registered_clients,
            active_clients,
            rotation_enabled,
            counters,
            heap_free,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect(
        uptime_secs: u64,
        registered_clients: usize,
        active_clients: usize,
        rotation_enabled: bool,
        counters: MuxCounters,
    ) -> Self {
        // Synthetic heap figure so simulation paths exercise the same
        // reporting branches as real hardware.
        let base_free: u32 = 307_200; // 300 KB
        let decay = (uptime_secs / 60) as u32 * 512;
        let heap_free = base_free.saturating_sub(decay);

        Self {
            uptime_secs,
            registered_clients,
            active_clients,
            rotation_enabled,
            counters,
            heap_free,
        }
    }
}
