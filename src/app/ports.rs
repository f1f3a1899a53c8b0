//! Port traits — the hexagonal boundary between the multiplexer core and
//! the outside world.
//!
//! ```text
//!   AdvMultiplexer (domain) ──▶ RadioPort  ──▶ BLE controller
//!                            ──▶ EventSink ──▶ log / telemetry
//! ```
//!
//! The [`AdvMultiplexer`](super::service::AdvMultiplexer) consumes these
//! traits via generics at call sites, so the core never touches the BLE
//! stack directly and the whole crate tests on the host with recorded
//! doubles.

use crate::table::Payload;

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain → BLE controller)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the single hardware advertising set.
///
/// The multiplexer is the sole owner of this resource and performs at most
/// one call per public operation, so implementations never see overlapping
/// reconfigurations.
pub trait RadioPort {
    /// (Re)program the advertising set with `payload` and ensure
    /// advertising is running. Callable whether or not advertising was
    /// already active.
    fn configure_and_start(&mut self, payload: &Payload) -> Result<(), DriverError>;

    /// Halt advertising entirely. Must be idempotent — calling while not
    /// advertising is not an error.
    fn stop(&mut self) -> Result<(), DriverError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The multiplexer emits structured [`MuxEvent`](super::events::MuxEvent)s
/// through this port. Adapters decide where they go (serial log, a debug
/// characteristic, a test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::MuxEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`RadioPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// BLE controller / host stack bring-up failed.
    StackInitFailed,
    /// The controller rejected the advertising data or parameters.
    ConfigFailed,
    /// Advertising could not be started.
    StartFailed,
    /// Advertising could not be stopped.
    StopFailed,
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::StackInitFailed => write!(f, "BLE stack initialisation failed"),
            Self::ConfigFailed => write!(f, "advertising set configuration rejected"),
            Self::StartFailed => write!(f, "advertising start failed"),
            Self::StopFailed => write!(f, "advertising stop failed"),
        }
    }
}

impl core::error::Error for DriverError {}
