//! Temperature gain for burn-in compensation

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::command::Command;
use crate::error::ErrorKind;
use crate::panel::{Panel, PanelState};
use crate::sequencer::CommandBatch;
use crate::traits::{CommandTransport, TemperatureSensor, VblankSource};

/// Temperatures the gain register accepts, °C
pub const COMPENSATION_RANGE: core::ops::RangeInclusive<i32> = 10..=49;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermalState {
    /// Temperature the gain register holds, °C
    pub hw_temp: i32,
    /// An update was deferred until the next self refresh
    pub pending: bool,
}

impl ThermalState {
    pub fn new(initial_temperature: i32) -> Self {
        ThermalState {
            hw_temp: initial_temperature,
            pending: false,
        }
    }
}

/// Millidegrees to whole degrees, rounded to the closest
pub fn millidegrees_to_celsius(millidegrees: i32) -> i32 {
    if millidegrees >= 0 {
        (millidegrees + 500) / 1000
    } else {
        (millidegrees - 500) / 1000
    }
}

impl<T, V, D, S> Panel<T, V, D, S>
where
    T: CommandTransport,
    V: VblankSource,
    D: DelayNs,
    S: TemperatureSensor,
{
    /// Reads the sensor and writes the gain if the temperature moved
    ///
    /// Only runs in normal mode on revisions with the gain register.
    /// Temperatures outside [COMPENSATION_RANGE] are ignored.
    pub fn update_thermal_compensation(&mut self) -> Result<(), ErrorKind<T::Error>> {
        let Some(sensor) = self.sensor.as_mut() else {
            return Ok(());
        };
        if !self.identity.caps.thermal_compensation || self.state != PanelState::Normal {
            return Ok(());
        }
        self.thermal.pending = false;

        let temp = match sensor.read_millidegrees() {
            Ok(millidegrees) => millidegrees_to_celsius(millidegrees),
            Err(e) => {
                warn!("fail to read temperature: {e:?}");
                return Ok(());
            }
        };
        debug!("temp={temp}");
        if temp == self.thermal.hw_temp || !COMPENSATION_RANGE.contains(&temp) {
            return Ok(());
        }

        debug!("apply gain at {temp}deg c");
        let mut batch = CommandBatch::new();
        batch.unlocked(|b| {
            b.offset(0x0003, Command::TemperatureGain)?;
            b.add(Command::TemperatureGain, &[temp as u8])
        })?;
        self.seq.send(&batch)?;
        self.thermal.hw_temp = temp;
        Ok(())
    }

    /// Periodic work while in normal mode
    ///
    /// The gain is written right away during self refresh, otherwise it waits
    /// for the next self refresh entry or commit.
    pub fn normal_mode_work(&mut self) -> Result<(), ErrorKind<T::Error>> {
        if self.self_refresh_active {
            self.update_thermal_compensation()
        } else {
            self.thermal.pending = true;
            Ok(())
        }
    }

    pub fn thermal_state(&self) -> &ThermalState {
        &self.thermal
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::config::Builder;
    use crate::identity::{Material, PanelIdentity, PanelRev};
    use crate::mode::WQHD_120;
    use crate::panel::tests::enabled_panel;
    use crate::test_utils::{FakeSensor, FakeTransport, FakeVblank, FakeDelay};
    use std::vec;

    type SensorPanel = Panel<FakeTransport, FakeVblank, FakeDelay, FakeSensor>;

    fn sensor_panel(millidegrees: i32) -> SensorPanel {
        let (panel, _) = enabled_panel(WQHD_120);
        panel.with_temperature_sensor(FakeSensor::new(millidegrees))
    }

    #[test]
    fn rounding() {
        assert_eq!(millidegrees_to_celsius(9_499), 9);
        assert_eq!(millidegrees_to_celsius(9_500), 10);
        assert_eq!(millidegrees_to_celsius(-1_500), -2);
    }

    #[test]
    fn out_of_range_is_skipped() {
        for millidegrees in [9_000, 50_000, 9_400, 49_600] {
            let mut panel = sensor_panel(millidegrees);
            panel.update_thermal_compensation().unwrap();
            assert!(panel.transport().packets.is_empty());
            assert_eq!(panel.thermal_state().hw_temp, 25);
        }
    }

    #[test]
    fn range_edges_are_applied() {
        for (millidegrees, temp) in [(10_000, 10u8), (49_000, 49)] {
            let mut panel = sensor_panel(millidegrees);
            panel.update_thermal_compensation().unwrap();
            assert_eq!(
                panel.transport().written(),
                vec![
                    vec![0xF0, 0x5A, 0x5A],
                    vec![0xB0, 0x00, 0x03, 0x67],
                    vec![0x67, temp],
                    vec![0xF0, 0xA5, 0xA5],
                ]
            );
            assert_eq!(panel.thermal_state().hw_temp, i32::from(temp));
        }
    }

    #[test]
    fn unchanged_temperature_is_not_written() {
        let mut panel = sensor_panel(25_200);
        panel.update_thermal_compensation().unwrap();
        assert!(panel.transport().packets.is_empty());
    }

    #[test]
    fn needs_capable_revision() {
        let mut panel = sensor_panel(30_000);
        panel.set_identity(PanelIdentity::new(PanelRev::Evt1, Material::E7));
        panel.update_thermal_compensation().unwrap();
        assert!(panel.transport().packets.is_empty());
    }

    #[test]
    fn failed_read_is_ignored() {
        let mut panel = sensor_panel(30_000);
        panel.sensor.as_ref().unwrap().reading.set(None);
        panel.update_thermal_compensation().unwrap();
        assert!(panel.transport().packets.is_empty());
        assert_eq!(panel.thermal_state().hw_temp, 25);
    }

    #[test]
    fn work_outside_self_refresh_is_deferred() {
        let mut panel = sensor_panel(30_000);
        panel.normal_mode_work().unwrap();
        assert!(panel.thermal_state().pending);
        assert_eq!(panel.sensor.as_ref().unwrap().reads.get(), 0);

        panel.self_refresh_active = true;
        panel.normal_mode_work().unwrap();
        assert!(!panel.thermal_state().pending);
        assert_eq!(panel.thermal_state().hw_temp, 30);
    }

    #[test]
    fn no_sensor_no_writes() {
        let config = Builder::new().initial_temperature(20).build().unwrap();
        let (mut panel, _) = crate::panel::tests::panel_with(config, PanelRev::Pvt);
        panel.update_thermal_compensation().unwrap();
        assert_eq!(panel.thermal_state().hw_temp, 20);
    }
}
