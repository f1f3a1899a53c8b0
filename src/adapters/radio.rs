//! BLE radio adapter.
//!
//! Implements [`RadioPort`] — the hexagonal boundary for the single
//! hardware advertising set.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid raw-advertising via
//!   `esp_idf_svc::sys` GAP calls.
//! - **all other targets**: simulation body for host-side tests.
//!
//! Reconfiguration follows the controller contract: stop advertising,
//! program the raw data, start again. Payload bytes go through two
//! rotating buffers so the controller never reads the buffer currently
//! being rewritten.

use log::info;

use crate::app::ports::{DriverError, RadioPort};
use crate::config::{PAYLOAD_LEN, RadioConfig};
use crate::table::Payload;

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "espidf")]
use log::error;

// ── One-time stack bring-up guard ─────────────────────────────
//
// Controller + Bluedroid can only be initialised once per boot; every
// EspRadio constructed after the first reuses the live stack.

#[cfg(target_os = "espidf")]
static STACK_READY: AtomicBool = AtomicBool::new(false);

/// Adapter driving the Bluedroid advertising set (or a host simulation).
pub struct EspRadio {
    config: RadioConfig,
    /// Rotating data buffers handed to the controller.
    bufs: [[u8; PAYLOAD_LEN]; 2],
    current: usize,
    advertising: bool,
    /// Simulation: last payload programmed, for test inspection.
    #[cfg(not(target_os = "espidf"))]
    sim_last_payload: Option<Payload>,
}

impl EspRadio {
    /// Bring up the BLE stack (first call only) and create the adapter.
    pub fn new(config: RadioConfig) -> Result<Self, DriverError> {
        platform_stack_init()?;
        Ok(Self {
            config,
            bufs: [[0u8; PAYLOAD_LEN]; 2],
            current: 0,
            advertising: false,
            #[cfg(not(target_os = "espidf"))]
            sim_last_payload: None,
        })
    }

    /// Whether the advertising set is currently running.
    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    /// Simulation: last payload programmed into the (virtual) controller.
    #[cfg(not(target_os = "espidf"))]
    pub fn last_payload(&self) -> Option<&Payload> {
        self.sim_last_payload.as_ref()
    }

    /// Copy `payload` into the next rotating buffer and return its index.
    fn fill_next_buffer(&mut self, payload: &Payload) -> usize {
        let index = self.current;
        self.bufs[index].copy_from_slice(payload.as_bytes());
        self.current = (self.current + 1) % self.bufs.len();
        index
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_configure_and_start(&mut self, buf_index: usize) -> Result<(), DriverError> {
        use esp_idf_svc::sys::*;

        unsafe {
            // Stop is allowed to fail with invalid-state when we were not
            // advertising yet (first configure after boot).
            esp_ble_gap_stop_advertising();

            let ret = esp_ble_gap_config_adv_data_raw(
                self.bufs[buf_index].as_mut_ptr(),
                PAYLOAD_LEN as u32,
            );
            if ret != ESP_OK as i32 {
                error!("radio: config_adv_data_raw failed ({})", ret);
                return Err(DriverError::ConfigFailed);
            }

            let interval = self.config.adv_interval_units();
            let adv_type = if self.config.connectable {
                esp_ble_adv_type_t_ADV_TYPE_IND
            } else {
                esp_ble_adv_type_t_ADV_TYPE_NONCONN_IND
            };
            let mut adv_params = esp_ble_adv_params_t {
                adv_int_min: interval,
                adv_int_max: interval,
                adv_type,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                ..core::mem::zeroed()
            };
            let ret = esp_ble_gap_start_advertising(&mut adv_params);
            if ret != ESP_OK as i32 {
                error!("radio: start_advertising failed ({})", ret);
                return Err(DriverError::StartFailed);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_configure_and_start(&mut self, buf_index: usize) -> Result<(), DriverError> {
        self.sim_last_payload = Some(Payload::new(self.bufs[buf_index]));
        info!(
            "radio(sim): advertising set reprogrammed (buf {}, interval {}ms)",
            buf_index, self.config.adv_interval_ms
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) -> Result<(), DriverError> {
        use esp_idf_svc::sys::*;

        let ret = unsafe { esp_ble_gap_stop_advertising() };
        // Invalid-state means we were already stopped; stop() is idempotent.
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            error!("radio: stop_advertising failed ({})", ret);
            return Err(DriverError::StopFailed);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) -> Result<(), DriverError> {
        info!("radio(sim): advertising stopped");
        Ok(())
    }
}

impl RadioPort for EspRadio {
    fn configure_and_start(&mut self, payload: &Payload) -> Result<(), DriverError> {
        let buf_index = self.fill_next_buffer(payload);
        self.platform_configure_and_start(buf_index)?;
        self.advertising = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.platform_stop()?;
        self.advertising = false;
        Ok(())
    }
}

// ── Platform stack bring-up ───────────────────────────────────

#[cfg(target_os = "espidf")]
fn platform_stack_init() -> Result<(), DriverError> {
    use esp_idf_svc::sys::*;

    if STACK_READY.load(Ordering::Acquire) {
        return Ok(());
    }

    unsafe {
        // Release classic BT memory (BLE-only mode saves ~30 KB).
        esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

        let mut bt_cfg = esp_bt_controller_config_t::default();
        let ret = esp_bt_controller_init(&mut bt_cfg);
        if ret != ESP_OK as i32 {
            error!("radio: bt_controller_init failed ({})", ret);
            return Err(DriverError::StackInitFailed);
        }

        let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
        if ret != ESP_OK as i32 {
            error!("radio: bt_controller_enable failed ({})", ret);
            return Err(DriverError::StackInitFailed);
        }

        let ret = esp_bluedroid_init();
        if ret != ESP_OK as i32 {
            error!("radio: bluedroid_init failed ({})", ret);
            return Err(DriverError::StackInitFailed);
        }

        let ret = esp_bluedroid_enable();
        if ret != ESP_OK as i32 {
            error!("radio: bluedroid_enable failed ({})", ret);
            return Err(DriverError::StackInitFailed);
        }
    }

    STACK_READY.store(true, Ordering::Release);
    info!("radio(espidf): Bluedroid stack initialized");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn platform_stack_init() -> Result<(), DriverError> {
    info!("radio(sim): stack ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_buffer_alternates() {
        let mut radio = EspRadio::new(RadioConfig::default()).unwrap();
        let a = radio.fill_next_buffer(&Payload::new([0xAA; PAYLOAD_LEN]));
        let b = radio.fill_next_buffer(&Payload::new([0xBB; PAYLOAD_LEN]));
        let c = radio.fill_next_buffer(&Payload::new([0xCC; PAYLOAD_LEN]));
        assert_eq!((a, b, c), (0, 1, 0));
        // The buffer written two calls ago is untouched by the latest write.
        assert_eq!(radio.bufs[1], [0xBB; PAYLOAD_LEN]);
    }

    #[test]
    fn sim_records_last_payload() {
        let mut radio = EspRadio::new(RadioConfig::default()).unwrap();
        assert!(!radio.is_advertising());

        let p = Payload::new([0x42; PAYLOAD_LEN]);
        radio.configure_and_start(&p).unwrap();
        assert!(radio.is_advertising());
        assert_eq!(radio.last_payload(), Some(&p));

        radio.stop().unwrap();
        assert!(!radio.is_advertising());
        // stop() is idempotent.
        radio.stop().unwrap();
    }
}
