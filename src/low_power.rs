//! Always-on low power mode entry and exit

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::cmdset;
use crate::command::Command;
use crate::error::ErrorKind;
use crate::feature::FeatureSet;
use crate::mode::PanelMode;
use crate::panel::{Panel, PanelState};
use crate::traits::{CommandTransport, TemperatureSensor, VblankSource};
use crate::vblank;

/// `WriteControlDisplay` value switching the always-on mode on
const AOD_ON: u8 = 0x24;
/// `WriteControlDisplay` value switching the always-on mode off
const AOD_OFF: u8 = 0x20;
/// Refresh rate of the low power timing
pub const LP_VREFRESH: u32 = 30;

/// Settle time after leaving low power, ms
fn settle_delay_ms(vrefresh: u32) -> u32 {
    1000 * 1020 / vrefresh.max(1) / 1000
}

impl<T, V, D, S> Panel<T, V, D, S>
where
    T: CommandTransport,
    V: VblankSource,
    D: DelayNs,
    S: TemperatureSensor,
{
    /// Switches to the always-on low power mode `mode`
    ///
    /// A panel showing frames is turned off on a vsync aligned boundary first,
    /// a panel coming out of reset goes straight to the low power program.
    pub fn enter_low_power(&mut self, mode: &PanelMode) -> Result<(), ErrorKind<T::Error>> {
        let desired = *self.engine.desired();
        let changeable_te = !desired.early_exit;
        let low_speed = desired.low_speed;
        let enabled = self.is_enabled();
        let vrefresh = if enabled {
            self.engine.refresh().vrefresh
        } else {
            60
        };
        debug!("enter lp, panel {}", if enabled { "on" } else { "off" });

        self.commit_features(FeatureSet::EMPTY, vrefresh, 0, true)?;
        if enabled {
            if !vblank::is_peak_vrefresh(vrefresh, low_speed) && changeable_te {
                vblank::wait_for_vsync_done_changeable(
                    &mut self.vblank,
                    &mut self.delay,
                    vrefresh,
                    low_speed,
                );
            } else {
                vblank::wait_for_vsync_done(&mut self.vblank, &mut self.delay, vrefresh, low_speed);
            }
            self.seq
                .send_cmdset(cmdset::DISPLAY_OFF, self.identity.rev, &mut self.delay)?;
        }
        vblank::wait_for_vsync_done(&mut self.vblank, &mut self.delay, LP_VREFRESH, false);

        self.seq.write(Command::WriteControlDisplay, &[AOD_ON])?;
        self.seq
            .send_cmdset(cmdset::LP_PROGRAM, self.identity.rev, &mut self.delay)?;
        self.seq
            .send_cmdset(cmdset::DISPLAY_ON, self.identity.rev, &mut self.delay)?;

        self.engine.mark_low_power_timing();
        self.state = PanelState::LowPower;
        info!("enter {}hz LP mode", mode.vrefresh);
        Ok(())
    }

    /// Leaves the always-on low power mode into `mode`
    pub fn exit_low_power(&mut self, mode: &PanelMode) -> Result<(), ErrorKind<T::Error>> {
        let rev = self.identity.rev;
        // brightness is restored by the pipeline afterwards
        self.seq.write(Command::SetDisplayBrightness, &[0x00, 0x00])?;
        debug!("exit lp");

        self.seq.send_cmdset(cmdset::LP_EXIT, rev, &mut self.delay)?;
        self.engine.mark_idle_off();

        vblank::wait_for_vsync_done(&mut self.vblank, &mut self.delay, LP_VREFRESH, false);
        self.seq
            .send_cmdset(cmdset::DISPLAY_OFF, rev, &mut self.delay)?;

        vblank::wait_for_vsync_done(&mut self.vblank, &mut self.delay, LP_VREFRESH, false);
        self.seq.send_cmdset(cmdset::AOD_LOW_OFF, rev, &mut self.delay)?;
        self.seq.write(Command::WriteControlDisplay, &[AOD_OFF])?;

        self.state = PanelState::Normal;
        let features = *self.engine.desired();
        let idle = self.engine.idle_target();
        self.commit_features(features, mode.vrefresh, idle, true)?;
        // backlight control and dimming
        self.write_display_mode()?;
        self.change_frequency(mode)?;
        self.seq.send_cmdset(cmdset::DISPLAY_ON, rev, &mut self.delay)?;

        self.delay.delay_ms(settle_delay_ms(mode.vrefresh));
        self.seq.write(Command::SetDisplayOn, &[])?;
        info!("exit LP mode");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::config::Builder;
    use crate::identity::PanelRev;
    use crate::mode::{WQHD_120, WQHD_60, WQHD_LP};
    use crate::panel::tests::{enabled_panel, panel_with};
    use std::vec;

    #[test]
    fn settle_delay() {
        assert_eq!(settle_delay_ms(120), 8);
        assert_eq!(settle_delay_ms(60), 17);
    }

    #[test]
    fn entry_from_enabled_turns_display_off_first() {
        let (mut panel, _) = enabled_panel(WQHD_60);
        let waits = panel.vblank.waits;
        panel.mode_set(WQHD_LP).unwrap();

        let t = panel.transport();
        let off = t.position(&[0x28]).unwrap();
        let aod_on = t.position(&[0x53, 0x24]).unwrap();
        assert!(off < aod_on);
        assert!(t.contains(&[0xB9, 0x0B, 0xE0, 0x00, 0x2F, 0x0B, 0xE0, 0x00, 0x2F]));
        assert_eq!(t.packets.last(), Some(&vec![0x29]));
        // 60Hz in high speed with changeable TE polls vblank pairs, then one 30Hz wait
        assert!(panel.vblank.waits >= waits + 3);

        assert_eq!(panel.state(), PanelState::LowPower);
        assert_eq!(panel.engine().refresh().vrefresh, 30);
        assert_eq!(*panel.engine().committed(), FeatureSet::EMPTY);
    }

    #[test]
    fn entry_from_blank_turns_display_off_on_vsync() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        panel.blank().unwrap();
        panel.transport_mut().clear();
        let waits = panel.vblank.waits;
        panel.mode_set(WQHD_LP).unwrap();

        let t = panel.transport();
        let off = t.position(&[0x28]).unwrap();
        assert!(off < t.position(&[0x53, 0x24]).unwrap());
        assert!(panel.vblank.waits >= waits + 2);
        assert_eq!(panel.state(), PanelState::LowPower);
    }

    #[test]
    fn entry_from_reset_skips_display_off() {
        let (mut panel, _) = panel_with(Builder::new().build().unwrap(), PanelRev::Pvt);
        panel.mode_set(WQHD_LP).unwrap();
        panel.enable().unwrap();

        let t = panel.transport();
        assert!(!t.contains(&[0x28]));
        assert!(t.contains(&[0x53, 0x24]));
        assert_eq!(panel.state(), PanelState::LowPower);
        // enforced commit at 60Hz before the program
        let commit = t.position(&[0x60, 0x01]).unwrap();
        assert!(commit < t.position(&[0x53, 0x24]).unwrap());
    }

    #[test]
    fn exit_restores_features() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        panel.set_hbm_mode(true).unwrap();
        panel.mode_set(WQHD_LP).unwrap();
        panel.transport_mut().clear();

        panel.mode_set(WQHD_120).unwrap();
        let t = panel.transport();
        assert_eq!(t.packets[0], vec![0x51, 0x00, 0x00]);
        assert!(t.contains(&[0xB0, 0x00, 0x52, 0x94]));
        let aod_off = t.position(&[0x53, 0x20]).unwrap();
        let hbm = t.position(&[0x53, 0xE0]).unwrap();
        assert!(aod_off < hbm);
        assert_eq!(t.packets.last(), Some(&vec![0x29]));

        let committed = panel.engine().committed();
        assert!(committed.high_brightness);
        assert!(committed.early_exit);
        assert_eq!(panel.engine().refresh().vrefresh, 120);
        assert_eq!(panel.state(), PanelState::Normal);
    }
}
