//! Battery power guard.
//!
//! The bridge board is powered from the robot's own pack.  A NiMH pack
//! driven below about 0.9 V per cell is damaged, and the bridge is a
//! constant drain even while the robot sleeps.  The guard therefore
//! overrides everything else: once the pack is under the cutoff the board
//! publishes a last "empty" snapshot and goes to deep sleep.
//!
//! ## Sequence
//!
//! 1. Average `adc_samples` readings taken 1 ms apart (integer mean).
//! 2. Scale by the divider ratio to millivolts.
//! 3. Under `low_voltage_mv`: publish [`LowBatteryReport`] retained on the
//!    state topic if the link is up, wait 200 ms for it to flush, then
//!    deep-sleep for `sleep_secs`.
//!
//! The guard runs at boot before the network comes up, and again on every
//! status tick.

use core::time::Duration;

use log::{debug, error, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{AnalogPort, ClockPort, EventSink, LinkPort};
use crate::config::BatteryConfig;
use crate::error::SafetyFault;
use crate::report::{LowBatteryReport, to_payload};

/// Outcome of one guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerVerdict {
    /// Pack is fine (or the guard is disabled).
    Ok,
    /// Cutoff reached; deep sleep was requested.
    Sleeping,
}

/// Battery under-voltage supervisor.
pub struct PowerGuard {
    config: BatteryConfig,
}

impl PowerGuard {
    pub fn new(config: &BatteryConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Averaged pack voltage in millivolts.
    pub fn read_millivolts(&self, hw: &mut (impl AnalogPort + ClockPort)) -> u32 {
        let samples = u32::from(self.config.adc_samples.max(1));
        let mut total = 0u32;
        for _ in 0..samples {
            hw.delay_ms(1);
            total += u32::from(hw.sample());
        }
        let mean = total / samples;
        let mv = (mean as f32 * self.config.adc_mv_per_count) as u32;
        debug!("ADC mean {} over {} samples = {} mV", mean, samples, mv);
        mv
    }

    /// Classify a measured voltage.
    pub fn evaluate(&self, millivolts: u32) -> Result<u32, SafetyFault> {
        if millivolts < self.config.low_voltage_mv {
            Err(SafetyFault::BatteryUnderVoltage(millivolts))
        } else {
            Ok(millivolts)
        }
    }

    /// Measure, and sleep if the pack is too low.
    ///
    /// `link` is `None` at boot, before the network exists.  On the device
    /// a `Sleeping` verdict is never observed because deep sleep does not
    /// return.
    pub fn enforce<L: LinkPort>(
        &self,
        hw: &mut (impl AnalogPort + ClockPort),
        link: Option<&mut L>,
        state_topic: &str,
        sink: &mut impl EventSink,
    ) -> PowerVerdict {
        if !self.config.enable_sleep {
            return PowerVerdict::Ok;
        }

        let mv = self.read_millivolts(hw);
        let Err(fault) = self.evaluate(mv) else {
            return PowerVerdict::Ok;
        };

        error!("{fault}, sleeping {} s", self.config.sleep_secs);
        sink.emit(&AppEvent::LowBattery { millivolts: mv });

        if let Some(link) = link {
            if link.is_connected() {
                if let Some(payload) = to_payload(&LowBatteryReport::new(mv)) {
                    if let Err(e) = link.publish(state_topic, &payload, true) {
                        warn!("Low-battery report not sent: {}", e);
                    }
                }
            }
        }

        hw.delay_ms(200);
        hw.deep_sleep(Duration::from_secs(u64::from(self.config.sleep_secs)));
        PowerVerdict::Sleeping
    }
}
