//! AdvMux Firmware — Main Entry Point
//!
//! Composition root for the advertising multiplexer: one radio, one
//! multiplexer instance per process, timer-driven rotation.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspRadio            LogEventSink          hw_timer            │
//! │  (RadioPort)         (EventSink)           (tick source)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          AdvMultiplexer (pure logic)                   │    │
//! │  │  slot table · fast-path debounce · rotation            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The demo advertisers below stand in for real client subsystems: a
//! device-status beacon and a telemetry beacon time-share the single
//! advertising set, with the telemetry one updating often enough to
//! exercise the fast-path debounce.
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod error;
mod events;
mod table;

pub mod app;
mod adapters;
mod drivers;
pub mod diagnostics;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::log_sink::LogEventSink;
use adapters::radio::EspRadio;
use app::service::AdvMultiplexer;
use config::{PAYLOAD_LEN, RadioConfig};
use diagnostics::RuntimeMetrics;
use events::Event;
use table::{ClientId, Payload};

// ── Demo advertisers ──────────────────────────────────────────

/// Identities of the built-in demo clients.
const DEVICE_STATUS_ID: ClientId = ClientId(0x5354_4154); // "STAT"
const TELEMETRY_ID: ClientId = ClientId(0x5445_4C4D); // "TELM"

/// Test/development company identifier (not assigned by the SIG).
const COMPANY_ID: u16 = 0xFFFF;

/// Build a manufacturer-specific beacon frame: flags AD + company id +
/// frame type + revision counter, zero-padded to the full payload.
fn beacon_payload(frame_type: u8, revision: u8) -> Payload {
    let mut ad: heapless::Vec<u8, PAYLOAD_LEN> = heapless::Vec::new();
    // Flags: LE General Discoverable, BR/EDR not supported.
    let _ = ad.extend_from_slice(&[0x02, 0x01, 0x06]);
    // Manufacturer-specific data: company id + frame type + revision.
    let _ = ad.extend_from_slice(&[0x05, 0xFF]);
    let _ = ad.extend_from_slice(&COMPANY_ID.to_le_bytes());
    let _ = ad.extend_from_slice(&[frame_type, revision]);
    Payload::from_slice(&ad).unwrap_or_default()
}

// ── Uptime ────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn uptime_secs() -> u64 {
    // SAFETY: esp_timer_get_time is a simple monotonic counter read.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000_000
}

#[cfg(not(target_os = "espidf"))]
fn uptime_secs() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static BOOT: OnceLock<Instant> = OnceLock::new();
    BOOT.get_or_init(Instant::now).elapsed().as_secs()
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }
    #[cfg(not(target_os = "espidf"))]
    init_host_logger();

    info!("╔══════════════════════════════════════╗");
    info!("║  AdvMux v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = RadioConfig::default();

    // ── 2. Radio bring-up ─────────────────────────────────────
    let mut radio = match EspRadio::new(config.clone()) {
        Ok(r) => r,
        Err(e) => {
            // No radio means nothing to multiplex — log and halt.
            // In production the watchdog resets the device after timeout.
            log::error!("radio bring-up failed: {} — halting", e);
            #[allow(clippy::empty_loop)]
            loop {}
        }
    };

    // ── 3. Multiplexer + sinks ────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut mux = AdvMultiplexer::new();

    drivers::hw_timer::start_timers(config.rotation_interval_ms, config.metrics_interval_secs);

    // ── 4. Register demo advertisers ──────────────────────────
    let status_handle = mux.register(DEVICE_STATUS_ID, &mut sink)?;
    let telemetry_handle = mux.register(TELEMETRY_ID, &mut sink)?;

    let mut status_revision: u8 = 0;
    let mut telemetry_revision: u8 = 0;
    mux.advertise(
        status_handle,
        Some(beacon_payload(0x01, status_revision)),
        &mut radio,
        &mut sink,
    )?;
    mux.advertise(
        telemetry_handle,
        Some(beacon_payload(0x02, telemetry_revision)),
        &mut radio,
        &mut sink,
    )?;

    info!("System ready. Entering event loop.");

    // ── 5. Event loop ─────────────────────────────────────────
    let mut rotation_count: u64 = 0;

    loop {
        // Simulate timer interrupts via sleep on non-espidf targets.
        // On real hardware the esp_timer task pushes the events and the
        // CPU idles in WFI between them.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(u64::from(
                config.rotation_interval_ms,
            )));
            events::push_event(Event::RotationTick);
            if rotation_count % u64::from(config.metrics_interval_secs.max(1)) == 0 {
                events::push_event(Event::MetricsTick);
            }
        }

        events::drain_events(|event| match event {
            Event::RotationTick => {
                rotation_count += 1;
                if let Err(e) = mux.tick(&mut radio, &mut sink) {
                    warn!("rotation tick: {}", e);
                }

                // Demo activity: telemetry refreshes every 3 rotations
                // (rides the fast path), device status every 30.
                if rotation_count % 3 == 0 {
                    telemetry_revision = telemetry_revision.wrapping_add(1);
                    if let Err(e) = mux.advertise(
                        telemetry_handle,
                        Some(beacon_payload(0x02, telemetry_revision)),
                        &mut radio,
                        &mut sink,
                    ) {
                        warn!("telemetry update: {}", e);
                    }
                }
                if rotation_count % 30 == 0 {
                    status_revision = status_revision.wrapping_add(1);
                    if let Err(e) = mux.advertise(
                        status_handle,
                        Some(beacon_payload(0x01, status_revision)),
                        &mut radio,
                        &mut sink,
                    ) {
                        warn!("status update: {}", e);
                    }
                }
            }

            Event::MetricsTick => {
                let metrics = RuntimeMetrics::collect(
                    uptime_secs(),
                    mux.registered_count(),
                    mux.active_count(),
                    mux.rotation_enabled(),
                    mux.counters(),
                );
                match serde_json::to_string(&metrics) {
                    Ok(json) => info!("METRICS | {}", json),
                    Err(e) => warn!("metrics serialization failed: {}", e),
                }
            }
        });
    }
}

// ── Host logging fallback ─────────────────────────────────────

/// Minimal logger for simulation runs (espidf builds use esp_idf_logger).
#[cfg(not(target_os = "espidf"))]
fn init_host_logger() {
    struct StdoutLogger;
    impl log::Log for StdoutLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }
        fn log(&self, record: &log::Record) {
            println!("{:5} {}", record.level(), record.args());
        }
        fn flush(&self) {}
    }
    static LOGGER: StdoutLogger = StdoutLogger;
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Info);
}
