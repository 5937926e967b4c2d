//! Idle policy: self refresh, commit completion and the idle rate choice

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::command::{Command, FREQ_UPDATE};
use crate::error::ErrorKind;
use crate::mode::{IdleMode, PanelMode};
use crate::panel::{ModeInProgress, Panel, PanelEvent};
use crate::sequencer::CommandBatch;
use crate::traits::{CommandTransport, TemperatureSensor, VblankSource};
use crate::vblank;

/// Time since the last commit under which no early exit is forced, microseconds
///
/// Just over two frames at 120Hz.
pub const EARLY_EXIT_THRESHOLD_US: u64 = 17_000;

/// Refresh rate the TE runs at right after leaving idle
pub const IDLE_TE_VREFRESH: u32 = 120;

/// Rounds `min_vrefresh` up to a supported idle rate
///
/// Returns 0 if idle stepping is disabled or the result would not be below
/// `vrefresh`.
pub fn idle_vrefresh_for(min_vrefresh: i32, vrefresh: u32) -> u32 {
    let idle = match min_vrefresh {
        i32::MIN..=-1 => return 0,
        0..=1 => 1,
        2..=10 => 10,
        11..=30 => 30,
        _ => return 0,
    };
    if idle >= vrefresh {
        debug!("min idle {idle}Hz not below {vrefresh}Hz");
        0
    } else {
        idle
    }
}

impl<T, V, D, S> Panel<T, V, D, S>
where
    T: CommandTransport,
    V: VblankSource,
    D: DelayNs,
    S: TemperatureSensor,
{
    /// Whether automatic stepping may be armed right now
    ///
    /// Not while dimming, nor before the idle delay has passed since the last
    /// commit or mode set.
    pub fn is_auto_mode_allowed(&mut self) -> bool {
        if self.display.dimming {
            return false;
        }
        if self.config.idle_delay_ms > 0 {
            let last = self.last_commit_us.max(self.last_mode_set_us);
            let delta_us = self.vblank.now_us().saturating_sub(last);
            if delta_us < u64::from(self.config.idle_delay_ms) * 1000 {
                return false;
            }
        }
        self.config.panel_idle_enabled
    }

    /// Lowest idle rate allowed for `mode`, 0 for none
    pub fn min_idle_vrefresh(&mut self, mode: &PanelMode) -> u32 {
        if self.config.min_vrefresh < 0 || !self.is_auto_mode_allowed() {
            return 0;
        }
        let idle = idle_vrefresh_for(self.config.min_vrefresh, mode.vrefresh);
        debug!("min_idle_vrefresh {idle}");
        idle
    }

    /// Self refresh entry (`true`) or exit (`false`) of the pipeline
    ///
    /// Returns whether anything was committed.
    pub fn enable_self_refresh(&mut self, enable: bool) -> Result<bool, ErrorKind<T::Error>> {
        debug!("self refresh: {enable}");
        let Some(mode) = self.current_mode else {
            return Ok(false);
        };

        // low power always runs with early exit, only the reported rate changes
        if mode.is_lp {
            let idle_vrefresh = if enable { 1 } else { 0 };
            self.panel_idle_vrefresh = idle_vrefresh;
            self.push_event(PanelEvent::StateChanged { idle_vrefresh });
            return Ok(false);
        }

        self.self_refresh_active = enable;
        if self.thermal.pending && enable {
            self.update_thermal_compensation()?;
        }

        let mut idle_vrefresh = self.min_idle_vrefresh(&mode);

        if mode.idle_mode != IdleMode::OnSelfRefresh {
            if mode.idle_mode == IdleMode::OnInactivity
                && self.engine.idle_target() != idle_vrefresh
            {
                self.update_refresh_mode(&mode, idle_vrefresh)?;
                if idle_vrefresh != 0 {
                    self.notify_idle_enter(&mode);
                }
                return Ok(true);
            }
            return Ok(false);
        }

        if !enable {
            idle_vrefresh = 0;
        }
        if self.panel_idle_vrefresh == idle_vrefresh {
            return Ok(false);
        }

        let handle_idle_exit = self.fixed_te_below_peak();
        self.update_refresh_mode(&mode, idle_vrefresh)?;

        if idle_vrefresh != 0 {
            self.notify_idle_enter(&mode);
        } else if handle_idle_exit {
            // TE may still run at 120Hz after leaving idle with fixed TE
            debug!("wait one vblank after exit idle");
            vblank::wait_one_vblank(&mut self.vblank, &mut self.delay);
        }
        Ok(true)
    }

    fn notify_idle_enter(&mut self, mode: &PanelMode) {
        self.push_event(PanelEvent::IdleEnter {
            display_id: self.config.display_id,
            vrefresh: mode.vrefresh,
            idle_te_vrefresh: IDLE_TE_VREFRESH,
        });
    }

    /// Fixed TE is committed while running below 120Hz
    fn fixed_te_below_peak(&self) -> bool {
        self.engine.committed().early_exit
            && !self.config.knobs.force_changeable_te
            && self.engine.refresh().vrefresh != 120
    }

    /// A frame commit of the pipeline completed
    pub fn commit_done(&mut self) -> Result<(), ErrorKind<T::Error>> {
        let Some(mode) = self.current_mode else {
            return Ok(());
        };
        if mode.is_lp {
            return Ok(());
        }
        if self.mode_in_progress != ModeInProgress::None {
            debug!("resolution switch in progress, skip");
            return Ok(());
        }

        self.update_idle_state(&mode)?;
        self.update_za()?;
        if self.thermal.pending {
            self.update_thermal_compensation()?;
        }
        self.last_commit_us = self.vblank.now_us();
        Ok(())
    }

    /// Keeps automatic stepping from lowering the rate right after new frames
    ///
    /// With changeable TE and no idle delay an early exit is kicked by command,
    /// otherwise stepping is switched off until the next self refresh.
    fn update_idle_state(&mut self, mode: &PanelMode) -> Result<(), ErrorKind<T::Error>> {
        self.panel_idle_vrefresh = 0;
        if !self.engine.desired().auto_frame_insertion {
            return Ok(());
        }

        let now = self.vblank.now_us();
        let delta_us = now.saturating_sub(self.last_commit_us);
        if delta_us < EARLY_EXIT_THRESHOLD_US {
            debug!("skip early exit, {delta_us}us since last commit");
            return Ok(());
        }

        // early exit switches the panel to 120Hz
        self.last_mode_set_us = now;

        if self.config.idle_delay_ms == 0 && self.config.knobs.force_changeable_te {
            debug!("sending early exit out cmd");
            let mut batch = CommandBatch::new();
            batch.unlocked(|b| b.add(Command::FrequencyUpdate, &FREQ_UPDATE))?;
            self.seq.send(&batch)
        } else {
            self.update_refresh_mode(mode, 0)
        }
    }
}
