//! Hardware timer module using ESP-IDF's esp_timer API.
//!
//! Creates the periodic timers that push events into the lock-free queue.
//! On simulation targets the main loop drives ticks from a sleep loop
//! instead.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call push_event().

use crate::events::{Event, push_event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut ROTATION_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut METRICS_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn rotation_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::RotationTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn metrics_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::MetricsTick);
}

/// Start the hardware tick timers.
///
/// - rotation timer at `rotation_interval_ms`
/// - metrics timer at `metrics_interval_secs`
#[cfg(target_os = "espidf")]
pub fn start_timers(rotation_interval_ms: u32, metrics_interval_secs: u32) {
    // SAFETY: ROTATION_TIMER and METRICS_TIMER are written here once at
    // boot from the single main-task context before any timer callbacks
    // fire. The callbacks themselves only call push_event(), which is
    // lock-free.
    unsafe {
        let rotation_args = esp_timer_create_args_t {
            callback: Some(rotation_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"rotation\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&rotation_args, &raw mut ROTATION_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: rotation timer create failed (rc={}) — continuing without rotation",
                ret
            );
            return;
        }
        let ret = esp_timer_start_periodic(ROTATION_TIMER, u64::from(rotation_interval_ms) * 1000);
        if ret != ESP_OK {
            log::error!("hw_timer: rotation timer start failed (rc={})", ret);
            return;
        }

        let metrics_args = esp_timer_create_args_t {
            callback: Some(metrics_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"metrics\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&metrics_args, &raw mut METRICS_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: metrics timer create failed (rc={}) — continuing without metrics",
                ret
            );
            return;
        }
        let ret =
            esp_timer_start_periodic(METRICS_TIMER, u64::from(metrics_interval_secs) * 1_000_000);
        if ret != ESP_OK {
            log::error!("hw_timer: metrics timer start failed (rc={})", ret);
            return;
        }

        info!(
            "hw_timer: rotation@{}ms + metrics@{}s started",
            rotation_interval_ms, metrics_interval_secs
        );
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(_rotation_interval_ms: u32, _metrics_interval_secs: u32) {
    log::info!("hw_timer(sim): timers not started (events driven by sleep loop)");
}

/// Stop all hardware tick timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: handles are valid if start_timers() succeeded; null-check
    // prevents stopping a timer that was never created. Values are copied
    // out of the statics — no references are formed.
    unsafe {
        let rt = ROTATION_TIMER;
        if !rt.is_null() {
            esp_timer_stop(rt);
        }
        let mt = METRICS_TIMER;
        if !mt.is_null() {
            esp_timer_stop(mt);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}
