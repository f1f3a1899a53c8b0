//! Multiplexer limits and radio configuration
//!
//! The slot-table limits are protocol-fixed compile-time constants; only
//! the radio timing parameters are tunable, and those are applied once at
//! bring-up by the composition root.

use serde::{Deserialize, Serialize};

/// Number of client slots in the registration table.
pub const MAX_CLIENTS: usize = 10;

/// Size of one advertising payload in bytes (legacy advertising PDU).
pub const PAYLOAD_LEN: usize = 31;

/// Maximum number of out-of-turn immediate pushes a client gets between
/// two rotation visits. Updates beyond this are deferred to rotation.
pub const FAST_PATH_LIMIT: u8 = 2;

/// BLE controller limits for the advertising interval, in milliseconds.
/// The controller API takes 0.625 ms units in `[0x20, 0x4000]`.
pub const ADV_INTERVAL_MIN_MS: u32 = 20;
pub const ADV_INTERVAL_MAX_MS: u32 = 10_240;

/// Radio and timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioConfig {
    // --- Advertising set ---
    /// Advertising interval (milliseconds); clamped into the controller's
    /// legal range when programmed.
    pub adv_interval_ms: u32,
    /// Advertise as connectable scannable undirected (vs. non-connectable).
    pub connectable: bool,

    // --- Timing ---
    /// Rotation tick period (milliseconds)
    pub rotation_interval_ms: u32,
    /// Runtime metrics report interval (seconds)
    pub metrics_interval_secs: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            // Advertising set
            adv_interval_ms: 100,
            connectable: true,

            // Timing
            rotation_interval_ms: 1000, // each client holds the slot ~10 adv events
            metrics_interval_secs: 60,  // 1/min
        }
    }
}

impl RadioConfig {
    /// Advertising interval in 0.625 ms controller units, clamped to the
    /// legal `[0x20, 0x4000]` range.
    pub fn adv_interval_units(&self) -> u16 {
        let units = (self.adv_interval_ms * 1000) / 625;
        units.clamp(0x20, 0x4000) as u16
    }
}
