//! The per-panel controller and its lifecycle hooks

use embedded_hal::delay::DelayNs;
use heapless::Deque;
use log::{debug, error, info, warn};

use crate::brightness::BrightnessState;
use crate::cmdset;
use crate::command::Command;
use crate::config::PanelConfig;
use crate::engine::FeatureEngine;
use crate::error::ErrorKind;
use crate::feature::FeatureSet;
use crate::highlight::{self, LhbmBrightness, LocalHighlightControl};
use crate::identity::{CompensationRegime, Material, PanelIdentity, PanelRev};
use crate::mode::PanelMode;
use crate::sequencer::{CommandBatch, Sequencer};
use crate::thermal::ThermalState;
use crate::traits::{CommandTransport, NoTemperatureSensor, TemperatureSensor, VblankSource};
use crate::vblank;

/// Events queued for the display pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    /// Panel entered automatic idle stepping
    IdleEnter {
        display_id: u32,
        vrefresh: u32,
        idle_te_vrefresh: u32,
    },
    /// The idle refresh rate reported to the pipeline changed
    StateChanged { idle_vrefresh: u32 },
}

/// Number of events kept until [take_event](Panel::take_event) drains them
pub const EVENT_QUEUE_LEN: usize = 8;

/// Power state of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// Powered down, the next enable resets the panel
    Off,
    /// Powered but display off
    Blank,
    /// Showing frames
    Normal,
    /// Always-on low power mode
    LowPower,
}

/// Mode switch the pipeline is in the middle of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModeInProgress {
    #[default]
    None,
    /// Resolution switch without refresh rate change
    Resolution,
    /// Resolution and refresh rate switch in one commit
    ResolutionAndRefresh,
}

/// Control bits written to `WriteControlDisplay`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayControl {
    pub hbm: bool,
    pub local_hbm: bool,
    pub dimming: bool,
}

impl DisplayControl {
    pub const BCTRL: u8 = 0x20;
    pub const HBM: u8 = 0xC0;
    pub const LOCAL_HBM: u8 = 0x10;
    pub const DIMMING: u8 = 0x08;

    pub fn bits(&self) -> u8 {
        let mut val = Self::BCTRL;
        if self.hbm {
            val |= Self::HBM;
        }
        if self.local_hbm {
            val |= Self::LOCAL_HBM;
        }
        if self.dimming {
            val |= Self::DIMMING;
        }
        val
    }
}

/// Pipeline state seen by [atomic_check](Panel::atomic_check)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingState {
    /// CRTC is active after the commit
    pub new_active: bool,
    /// CRTC was in self refresh before the commit
    pub old_self_refresh_active: bool,
    /// CRTC was scanning out before the commit
    pub old_effectively_active: bool,
    /// Previous commit toggled the CRTC active state
    pub old_active_changed: bool,
    /// Previous commit ran with a raised mode clock
    pub old_clock_raised: bool,
}

/// Mode clock change requested by [atomic_check](Panel::atomic_check)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAdjustment {
    None,
    /// Run the mode clock at the peak rate for this commit
    RaiseToPeak,
    /// Go back to the mode's own clock
    Restore,
}

/// Controller of one panel instance
///
/// Owns the command channel, the feature mirror and every piece of state the
/// lifecycle hooks touch. All hooks are expected to be called from one
/// serialized pipeline context.
pub struct Panel<T, V, D, S = NoTemperatureSensor> {
    pub(crate) seq: Sequencer<T>,
    pub(crate) vblank: V,
    pub(crate) delay: D,
    pub(crate) sensor: Option<S>,
    pub(crate) config: PanelConfig,
    pub(crate) identity: PanelIdentity,
    pub(crate) engine: FeatureEngine,
    pub(crate) brightness: BrightnessState,
    pub(crate) thermal: ThermalState,
    pub(crate) lhbm: LocalHighlightControl,
    pub(crate) display: DisplayControl,
    pub(crate) state: PanelState,
    pub(crate) current_mode: Option<PanelMode>,
    pub(crate) mode_in_progress: ModeInProgress,
    pub(crate) self_refresh_active: bool,
    /// Idle rate last reported to the pipeline
    pub(crate) panel_idle_vrefresh: u32,
    pub(crate) last_commit_us: u64,
    pub(crate) last_mode_set_us: u64,
    events: Deque<PanelEvent, EVENT_QUEUE_LEN>,
}

impl<T, V, D> Panel<T, V, D, NoTemperatureSensor>
where
    T: CommandTransport,
    V: VblankSource,
    D: DelayNs,
{
    /// Creates a powered down panel
    ///
    /// The identity is only known after [init](Panel::init), until then the
    /// newest revision is assumed.
    pub fn new(transport: T, vblank: V, delay: D, config: PanelConfig) -> Self {
        let low_speed = config.op_hz == 60;
        let mut engine = FeatureEngine::new();
        engine.desired_mut().low_speed = low_speed;
        Panel {
            seq: Sequencer::new(transport),
            vblank,
            delay,
            sensor: None,
            thermal: ThermalState::new(config.initial_temperature),
            config,
            identity: PanelIdentity::new(PanelRev::Latest, Material::E7),
            engine,
            brightness: BrightnessState::default(),
            lhbm: LocalHighlightControl::default(),
            display: DisplayControl::default(),
            state: PanelState::Off,
            current_mode: None,
            mode_in_progress: ModeInProgress::None,
            self_refresh_active: false,
            panel_idle_vrefresh: 0,
            last_commit_us: 0,
            last_mode_set_us: 0,
            events: Deque::new(),
        }
    }
}

impl<T, V, D, S> Panel<T, V, D, S>
where
    T: CommandTransport,
    V: VblankSource,
    D: DelayNs,
    S: TemperatureSensor,
{
    /// Attaches the ambient temperature sensor used for thermal compensation
    pub fn with_temperature_sensor<S2: TemperatureSensor>(self, sensor: S2) -> Panel<T, V, D, S2> {
        Panel {
            seq: self.seq,
            vblank: self.vblank,
            delay: self.delay,
            sensor: Some(sensor),
            config: self.config,
            identity: self.identity,
            engine: self.engine,
            brightness: self.brightness,
            thermal: self.thermal,
            lhbm: self.lhbm,
            display: self.display,
            state: self.state,
            current_mode: self.current_mode,
            mode_in_progress: self.mode_in_progress,
            self_refresh_active: self.self_refresh_active,
            panel_idle_vrefresh: self.panel_idle_vrefresh,
            last_commit_us: self.last_commit_us,
            last_mode_set_us: self.last_mode_set_us,
            events: self.events,
        }
    }

    /// Reads the panel identity and sends the one-time settings
    pub fn init(&mut self) -> Result<(), ErrorKind<T::Error>> {
        let mut id = 0u32;
        for register in [Command::ReadId1, Command::ReadId2, Command::ReadId3] {
            let mut buf = [0u8; 1];
            let n = self.seq.read(register, &mut buf)?;
            if n != buf.len() {
                warn!("short read of panel id ({register:?})");
            }
            id = (id << 8) | u32::from(buf[0]);
        }
        self.identity = PanelIdentity::from_id(id);
        info!(
            "panel rev {:?}, material {:?}",
            self.identity.rev, self.identity.material
        );

        if self.identity.rev < PanelRev::Dvt1 {
            self.seq
                .send_cmdset(cmdset::AOD_TRANSITION, self.identity.rev, &mut self.delay)?;
        } else {
            self.seq
                .send_cmdset(cmdset::NEGATIVE_FIELD, self.identity.rev, &mut self.delay)?;
        }
        Ok(())
    }

    /// Powers the panel up into the current mode
    pub fn enable(&mut self) -> Result<(), ErrorKind<T::Error>> {
        let Some(mode) = self.current_mode else {
            error!("no current mode set");
            return Err(ErrorKind::NoMode);
        };
        let needs_reset = !self.is_enabled();
        let was_blank = self.state == PanelState::Blank;
        let rev = self.identity.rev;
        debug!(
            "enable ({})",
            if mode.is_fhd() { "fhd" } else { "wqhd" }
        );

        if needs_reset {
            self.seq.reset(&mut self.delay)?;
        }
        // DSC on
        self.seq.write(Command::CompressionMode, &[0x01])?;

        if needs_reset {
            self.seq.send_cmdset(cmdset::INIT, rev, &mut self.delay)?;
            if self.identity.material == Material::E7Doe {
                self.seq
                    .send_cmdset(cmdset::NS_GAMMA_FIX, rev, &mut self.delay)?;
            }
            if rev == PanelRev::Proto1 {
                self.lhbm_luminance_opr_setting()?;
            }
            if rev >= PanelRev::Dvt1 {
                self.seq
                    .send_cmdset(cmdset::NEGATIVE_FIELD, rev, &mut self.delay)?;
            }
            self.brightness.pixel_off = false;
        }

        let fhd = mode.is_fhd();
        let mut batch = CommandBatch::new();
        batch.unlocked(|b| {
            b.add(Command::ResolutionSelect, &[if fhd { 0x0D } else { 0x0C }])?;
            // 8/10 bit config for QHD/FHD
            b.offset(0x0001, Command::OperatingMode)?;
            b.add(Command::OperatingMode, &[if fhd { 0x81 } else { 0x01 }])
        })?;
        self.seq.send(&batch)?;

        if mode.is_lp {
            self.enter_low_power(&mode)?;
        } else {
            let low_speed = !needs_reset && self.engine.desired().low_speed;
            self.update_panel_feat(&mode, true)?;
            self.write_display_mode()?;
            self.change_frequency(&mode)?;
            if needs_reset || was_blank {
                let vrefresh = if needs_reset { 60 } else { mode.vrefresh };
                vblank::wait_for_vsync_done(&mut self.vblank, &mut self.delay, vrefresh, low_speed);
                self.seq
                    .send_cmdset(cmdset::DISPLAY_ON, rev, &mut self.delay)?;
            }
            self.state = PanelState::Normal;
        }

        self.lhbm.reset();
        Ok(())
    }

    /// Powers the panel down, sleep-in included
    pub fn disable(&mut self) -> Result<(), ErrorKind<T::Error>> {
        self.power_down(PanelState::Off)
    }

    /// Turns the display off but keeps the panel powered
    pub fn blank(&mut self) -> Result<(), ErrorKind<T::Error>> {
        self.power_down(PanelState::Blank)
    }

    fn power_down(&mut self, target: PanelState) -> Result<(), ErrorKind<T::Error>> {
        if self.mode_in_progress != ModeInProgress::None {
            debug!("resolution switch in progress, skip disable");
            return Ok(());
        }
        let vrefresh = self.engine.refresh().vrefresh;

        self.commit_features(FeatureSet::EMPTY, 60, 0, true)?;
        // the freq update above forces an early exit, one frame is enough for it to land
        self.delay
            .delay_ms(crate::mode::period_us(vrefresh) / 1000 + 1);

        self.seq
            .send_cmdset(cmdset::DISPLAY_OFF, self.identity.rev, &mut self.delay)?;
        self.delay.delay_ms(20);
        if target == PanelState::Off {
            self.seq.write(Command::EnterSleepMode, &[])?;
            self.delay.delay_ms(100);
        }

        // register state is gone with the hardware
        self.engine.mark_powered_down();
        self.brightness.reset_hardware();
        self.state = target;
        self.self_refresh_active = false;
        Ok(())
    }

    /// Switches to `mode`
    ///
    /// Low power entry and exit are dispatched from here. While the panel is
    /// off the mode is only recorded for the next [enable](Panel::enable).
    pub fn mode_set(&mut self, mode: PanelMode) -> Result<(), ErrorKind<T::Error>> {
        let previous = self.current_mode.replace(mode);
        self.last_mode_set_us = self.vblank.now_us();
        if !self.is_enabled() {
            return Ok(());
        }
        match previous {
            Some(prev) if !prev.is_lp && mode.is_lp => self.enter_low_power(&mode),
            Some(prev) if prev.is_lp && !mode.is_lp => self.exit_low_power(&mode),
            // low power runs its own fixed program
            _ if mode.is_lp => Ok(()),
            _ => self.change_frequency(&mode),
        }
    }

    /// Commits the rate of `mode` with idle stepping off
    pub(crate) fn change_frequency(&mut self, mode: &PanelMode) -> Result<(), ErrorKind<T::Error>> {
        if mode.vrefresh > self.config.op_hz {
            error!(
                "invalid freq setting: op_hz={}, vrefresh={}",
                self.config.op_hz, mode.vrefresh
            );
            return Err(ErrorKind::InvalidRefreshRate {
                vrefresh: mode.vrefresh,
                op_hz: self.config.op_hz,
            });
        }
        self.update_refresh_mode(mode, 0)?;
        debug!("change to {}Hz", mode.vrefresh);
        Ok(())
    }

    /// Re-arms early exit and auto stepping for `mode` and commits
    pub(crate) fn update_refresh_mode(
        &mut self,
        mode: &PanelMode,
        idle_vrefresh: u32,
    ) -> Result<(), ErrorKind<T::Error>> {
        if self.mode_in_progress == ModeInProgress::Resolution {
            debug!("resolution switch without rate change, skip idle update");
            return Ok(());
        }
        debug!("mode {} set idle_vrefresh {}", mode.name, idle_vrefresh);

        let desired = self.engine.desired_mut();
        desired.auto_frame_insertion = idle_vrefresh != 0;
        // fixed TE + early exit: 60NS, 120HS, 60HS + auto
        desired.early_exit = mode.vrefresh == self.config.op_hz || idle_vrefresh != 0;
        self.engine.set_idle_target(idle_vrefresh);
        // best guess until the next commit_done corrects it
        self.panel_idle_vrefresh = idle_vrefresh;

        let features = *self.engine.desired();
        self.commit_features(features, mode.vrefresh, idle_vrefresh, false)?;
        self.push_event(PanelEvent::StateChanged { idle_vrefresh });
        Ok(())
    }

    /// Commits the desired features at the rate of `mode`
    pub(crate) fn update_panel_feat(
        &mut self,
        mode: &PanelMode,
        enforce: bool,
    ) -> Result<bool, ErrorKind<T::Error>> {
        let features = *self.engine.desired();
        let idle = self.engine.idle_target();
        self.commit_features(features, mode.vrefresh, idle, enforce)
    }

    pub(crate) fn commit_features(
        &mut self,
        features: FeatureSet,
        vrefresh: u32,
        idle_vrefresh: u32,
        enforce: bool,
    ) -> Result<bool, ErrorKind<T::Error>> {
        self.engine.commit(
            &mut self.seq,
            &self.identity,
            &self.config.knobs,
            features,
            vrefresh,
            idle_vrefresh,
            enforce,
        )
    }

    /// Changes the operating rate ceiling, 60 (normal speed) or 120 Hz (high speed)
    pub fn set_op_hz(&mut self, hz: u32) -> Result<(), ErrorKind<T::Error>> {
        let vrefresh = self.current_mode.map_or(0, |m| m.vrefresh);
        if vrefresh > hz || !matches!(hz, 60 | 120) {
            error!("invalid op_hz={hz} for vrefresh={vrefresh}");
            return Err(ErrorKind::InvalidOperatingRate(hz));
        }
        self.config.op_hz = hz;
        self.engine.desired_mut().low_speed = hz == 60;
        if self.state == PanelState::Normal {
            if let Some(mode) = self.current_mode {
                self.update_panel_feat(&mode, false)?;
            }
        }
        info!("set op_hz at {hz}");
        Ok(())
    }

    /// Switches high brightness mode
    ///
    /// The compensation bit of the revision follows high brightness.
    pub fn set_hbm_mode(&mut self, on: bool) -> Result<(), ErrorKind<T::Error>> {
        if self.display.hbm != on {
            self.display.hbm = on;
            let desired = self.engine.desired_mut();
            desired.high_brightness = on;
            match self.identity.caps.compensation {
                CompensationRegime::OnOff => desired.irc_off = on,
                CompensationRegime::FlatZ => desired.irc_z_mode = on,
            }
            if self.state == PanelState::Normal {
                if let Some(mode) = self.current_mode {
                    self.update_panel_feat(&mode, false)?;
                }
                self.write_display_mode()?;
            }
            info!("hbm {}", if on { "on" } else { "off" });
        }
        let acl_mode = self.brightness.acl_mode;
        self.set_current_limiting_mode(acl_mode)
    }

    /// Switches brightness dimming
    ///
    /// Idle stepping is not armed while dimming is on.
    pub fn set_dimming(&mut self, on: bool) -> Result<(), ErrorKind<T::Error>> {
        if self.display.dimming == on {
            return Ok(());
        }
        self.display.dimming = on;
        if self.state == PanelState::Normal {
            self.write_display_mode()?;
        }
        Ok(())
    }

    /// Switches local high brightness
    pub fn set_local_hbm(&mut self, on: bool) -> Result<(), ErrorKind<T::Error>> {
        if self.display.local_hbm == on {
            return Ok(());
        }
        self.display.local_hbm = on;
        if self.state == PanelState::Normal {
            self.write_display_mode()?;
        }
        Ok(())
    }

    /// Writes the backlight control, HBM, local HBM and dimming bits
    pub fn write_display_mode(&mut self) -> Result<(), ErrorKind<T::Error>> {
        let val = self.display.bits();
        debug!(
            "wrctrld:{val:#x}, hbm: {}, dimming: {}, local_hbm: {}",
            self.display.hbm, self.display.dimming, self.display.local_hbm
        );
        self.seq.write(Command::WriteControlDisplay, &[val])
    }

    /// Programs the local HBM brightness
    pub fn write_lhbm_brightness(
        &mut self,
        brightness: &LhbmBrightness,
    ) -> Result<(), ErrorKind<T::Error>> {
        let mut batch = CommandBatch::new();
        highlight::emit_brightness(&mut batch, brightness)?;
        self.seq.send(&batch)
    }

    fn lhbm_luminance_opr_setting(&mut self) -> Result<(), ErrorKind<T::Error>> {
        let low_speed = self.engine.desired().low_speed;
        let (target, opposite) = if low_speed { (0x18, 0x00) } else { (0x00, 0x18) };
        let mut batch = CommandBatch::new();
        for entry in cmdset::LHBM_OPR {
            batch.add(entry.command, entry.params)?;
        }
        for val in [target, opposite, target] {
            batch.add(Command::Frequency, &[val])?;
            batch.add(Command::FrequencyUpdate, &crate::command::FREQ_UPDATE)?;
        }
        batch.add(Command::TestKey, &crate::command::LOCK)?;
        self.seq.send(&batch)
    }

    /// True if switching to `mode` keeps the active area
    pub fn is_mode_seamless(&self, mode: &PanelMode) -> bool {
        self.current_mode
            .is_some_and(|current| current.same_resolution(mode))
    }

    /// Decides whether the next commit runs with the mode clock raised to peak
    ///
    /// Raised on self refresh exit with auto stepping armed, or on resume.
    /// Restored on the commit after that.
    pub fn atomic_check(&self, pending: &PendingState) -> ClockAdjustment {
        let Some(mode) = self.current_mode else {
            return ClockAdjustment::None;
        };
        if mode.vrefresh == 120 || !pending.new_active {
            return ClockAdjustment::None;
        }
        if (self.engine.idle_target() != 0 && pending.old_self_refresh_active)
            || !pending.old_effectively_active
        {
            debug!(
                "raise mode ({}) clock to 120hz on {}",
                mode.name,
                if pending.old_self_refresh_active {
                    "self refresh exit"
                } else {
                    "resume"
                }
            );
            ClockAdjustment::RaiseToPeak
        } else if pending.old_active_changed && pending.old_clock_raised {
            debug!("restore mode ({}) clock after self refresh exit or resume", mode.name);
            ClockAdjustment::Restore
        } else {
            ClockAdjustment::None
        }
    }

    /// Marks a resolution switch as running, idle updates pause meanwhile
    pub fn set_mode_in_progress(&mut self, in_progress: ModeInProgress) {
        self.mode_in_progress = in_progress;
    }

    /// Next pending event, oldest first
    pub fn take_event(&mut self) -> Option<PanelEvent> {
        self.events.pop_front()
    }

    pub(crate) fn push_event(&mut self, event: PanelEvent) {
        if self.events.is_full() {
            self.events.pop_front();
        }
        // a slot was just freed
        let _ = self.events.push_back(event);
    }

    pub fn is_enabled(&self) -> bool {
        self.state != PanelState::Off
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn identity(&self) -> &PanelIdentity {
        &self.identity
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PanelConfig {
        &mut self.config
    }

    pub fn current_mode(&self) -> Option<&PanelMode> {
        self.current_mode.as_ref()
    }

    pub fn engine(&self) -> &FeatureEngine {
        &self.engine
    }

    pub fn display_control(&self) -> &DisplayControl {
        &self.display
    }

    pub fn lhbm(&self) -> &LocalHighlightControl {
        &self.lhbm
    }

    pub fn lhbm_mut(&mut self) -> &mut LocalHighlightControl {
        &mut self.lhbm
    }

    /// Idle rate currently reported to the pipeline
    pub fn panel_idle_vrefresh(&self) -> u32 {
        self.panel_idle_vrefresh
    }

    pub fn transport(&self) -> &T {
        self.seq.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.seq.transport_mut()
    }

    /// Sets the identity directly, for panels whose id is known up front
    pub fn set_identity(&mut self, identity: PanelIdentity) {
        self.identity = identity;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;
    use super::*;
    use crate::config::Builder;
    use crate::mode::{FHD_120, WQHD_120, WQHD_60, WQHD_LP};
    use crate::test_utils::{Clock, FakeDelay, FakeTransport, FakeVblank};
    use std::rc::Rc;
    use std::vec;

    pub(crate) type TestPanel = Panel<FakeTransport, FakeVblank, FakeDelay>;

    pub(crate) fn panel_with(config: PanelConfig, rev: PanelRev) -> (TestPanel, Clock) {
        let clock: Clock = Rc::new(core::cell::Cell::new(1_000_000));
        let vblank = FakeVblank::new(clock.clone(), 8334);
        let delay = FakeDelay::new(clock.clone());
        let mut panel = Panel::new(FakeTransport::default(), vblank, delay, config);
        panel.set_identity(PanelIdentity::new(rev, Material::E7));
        (panel, clock)
    }

    /// Enabled panel at `mode`, transport log cleared
    pub(crate) fn enabled_panel(mode: PanelMode) -> (TestPanel, Clock) {
        let (mut panel, clock) = panel_with(Builder::new().build().unwrap(), PanelRev::Pvt);
        panel.mode_set(mode).unwrap();
        panel.enable().unwrap();
        panel.transport_mut().clear();
        while panel.take_event().is_some() {}
        (panel, clock)
    }

    #[test]
    fn init_reads_identity() {
        let (mut panel, _) = panel_with(Builder::new().build().unwrap(), PanelRev::Latest);
        panel.transport_mut().respond(0xDA, &[0x0A]);
        panel.transport_mut().respond(0xDB, &[0x44]);
        panel.transport_mut().respond(0xDC, &[0x20]);
        panel.init().unwrap();
        assert_eq!(panel.identity().id, 0x000A_4420);
        assert_eq!(panel.identity().rev, PanelRev::Evt1_1);
        assert_eq!(panel.identity().material, Material::E7);
        // Evt1.1 is before Dvt1
        assert!(panel.transport().contains(&[0xBB, 0x41]));
        assert!(!panel.transport().contains(&[0xF4, 0x78]));
    }

    #[test]
    fn enable_without_mode_fails() {
        let (mut panel, _) = panel_with(Builder::new().build().unwrap(), PanelRev::Pvt);
        assert!(matches!(panel.enable(), Err(ErrorKind::NoMode)));
        assert!(panel.transport().packets.is_empty());
    }

    #[test]
    fn enable_from_off_resets_and_turns_on() {
        let (mut panel, _) = panel_with(Builder::new().build().unwrap(), PanelRev::Pvt);
        panel.mode_set(WQHD_120).unwrap();
        assert!(panel.transport().packets.is_empty());
        panel.enable().unwrap();

        let t = panel.transport();
        assert_eq!(t.resets, 1);
        assert_eq!(t.packets[0], vec![0x9D, 0x01]);
        assert!(t.contains(&[0x11]));
        assert!(t.contains(&[0xC3, 0x0C]));
        assert!(t.contains(&[0x53, 0x20]));
        assert_eq!(t.packets.last(), Some(&vec![0x29]));
        assert_eq!(panel.state(), PanelState::Normal);
        let committed = panel.engine().committed();
        assert!(committed.early_exit);
        assert!(!committed.auto_frame_insertion);
        assert_eq!(panel.engine().refresh().vrefresh, 120);
    }

    #[test]
    fn enable_while_on_skips_init() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        panel.enable().unwrap();
        let t = panel.transport();
        assert_eq!(t.resets, 1);
        assert!(!t.contains(&[0x11]));
        assert!(!t.touched(0x29));
    }

    #[test]
    fn fhd_resolution_select() {
        let (panel, _) = {
            let (mut panel, clock) = panel_with(Builder::new().build().unwrap(), PanelRev::Pvt);
            panel.mode_set(FHD_120).unwrap();
            panel.enable().unwrap();
            (panel, clock)
        };
        assert!(panel.transport().contains(&[0xC3, 0x0D]));
        assert!(panel.transport().contains(&[0xF2, 0x81]));
    }

    #[test]
    fn disable_clears_mirror() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        panel.disable().unwrap();
        let t = panel.transport();
        assert!(t.contains(&[0x28]));
        assert_eq!(t.packets.last(), Some(&vec![0x10]));
        assert_eq!(panel.state(), PanelState::Off);
        assert_eq!(*panel.engine().committed(), FeatureSet::EMPTY);
        assert_eq!(panel.engine().refresh().vrefresh, 60);
    }

    #[test]
    fn blank_keeps_panel_awake_and_enable_turns_on() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        panel.blank().unwrap();
        assert!(!panel.transport().touched(0x10));
        assert_eq!(panel.state(), PanelState::Blank);
        panel.transport_mut().clear();
        panel.enable().unwrap();
        assert_eq!(panel.transport().resets, 1);
        assert!(panel.transport().contains(&[0x29]));
    }

    #[test]
    fn disable_skipped_during_resolution_switch() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        panel.set_mode_in_progress(ModeInProgress::ResolutionAndRefresh);
        panel.disable().unwrap();
        assert!(panel.transport().packets.is_empty());
        assert_eq!(panel.state(), PanelState::Normal);
    }

    #[test]
    fn mode_set_rejects_rate_above_op_hz() {
        let config = Builder::new().op_hz(60).build().unwrap();
        let (mut panel, _) = panel_with(config, PanelRev::Pvt);
        panel.mode_set(WQHD_60).unwrap();
        panel.enable().unwrap();
        panel.transport_mut().clear();
        assert_eq!(
            panel.mode_set(WQHD_120),
            Err(ErrorKind::InvalidRefreshRate {
                vrefresh: 120,
                op_hz: 60
            })
        );
        assert!(panel.transport().packets.is_empty());
    }

    #[test]
    fn mode_set_60_in_high_speed_drops_early_exit() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        panel.mode_set(WQHD_60).unwrap();
        assert!(!panel.engine().committed().early_exit);
        assert_eq!(panel.engine().refresh().vrefresh, 60);
        assert!(panel.transport().contains(&[0x60, 0x01]));
        assert_eq!(
            panel.take_event(),
            Some(PanelEvent::StateChanged { idle_vrefresh: 0 })
        );
    }

    #[test]
    fn op_hz_validation() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        assert_eq!(panel.set_op_hz(60), Err(ErrorKind::InvalidOperatingRate(60)));
        assert_eq!(panel.set_op_hz(90), Err(ErrorKind::InvalidOperatingRate(90)));
        panel.mode_set(WQHD_60).unwrap();
        panel.set_op_hz(60).unwrap();
        assert!(panel.engine().committed().low_speed);
        assert!(panel.transport().contains(&[0xF2, 0x01]));
        assert!(panel.transport().contains(&[0x60, 0x18]));
    }

    #[test]
    fn hbm_sets_compensation_bit() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        panel.set_hbm_mode(true).unwrap();
        let committed = panel.engine().committed();
        assert!(committed.high_brightness);
        assert!(committed.irc_z_mode);
        assert!(!committed.irc_off);
        assert!(panel.transport().contains(&[0x53, 0xE0]));
    }

    #[test]
    fn display_mode_bits() {
        let control = DisplayControl {
            hbm: true,
            local_hbm: true,
            dimming: true,
        };
        assert_eq!(control.bits(), 0xF8);
        assert_eq!(DisplayControl::default().bits(), 0x20);
    }

    #[test]
    fn seamless_needs_same_resolution() {
        let (panel, _) = enabled_panel(WQHD_120);
        assert!(panel.is_mode_seamless(&WQHD_60));
        assert!(panel.is_mode_seamless(&WQHD_LP));
        assert!(!panel.is_mode_seamless(&FHD_120));
    }

    #[test]
    fn atomic_check_raises_and_restores_clock() {
        let (mut panel, _) = enabled_panel(WQHD_60);
        let resume = PendingState {
            new_active: true,
            old_effectively_active: false,
            ..Default::default()
        };
        assert_eq!(panel.atomic_check(&resume), ClockAdjustment::RaiseToPeak);

        let after = PendingState {
            new_active: true,
            old_effectively_active: true,
            old_active_changed: true,
            old_clock_raised: true,
            ..Default::default()
        };
        assert_eq!(panel.atomic_check(&after), ClockAdjustment::Restore);

        panel.mode_set(WQHD_120).unwrap();
        assert_eq!(panel.atomic_check(&resume), ClockAdjustment::None);
    }

    #[test]
    fn events_drop_oldest_when_full() {
        let (mut panel, _) = panel_with(Builder::new().build().unwrap(), PanelRev::Pvt);
        for idle_vrefresh in 0..(EVENT_QUEUE_LEN as u32 + 2) {
            panel.push_event(PanelEvent::StateChanged { idle_vrefresh });
        }
        assert_eq!(
            panel.take_event(),
            Some(PanelEvent::StateChanged { idle_vrefresh: 2 })
        );
    }

    #[test]
    fn lhbm_reset_on_enable() {
        let (mut panel, _) = enabled_panel(WQHD_120);
        panel.lhbm_mut().hist_roi_configured = true;
        panel.enable().unwrap();
        assert!(!panel.lhbm().hist_roi_configured);
    }

    #[test]
    fn proto1_enable_sends_lhbm_setting() {
        let (mut panel, _) = panel_with(Builder::new().build().unwrap(), PanelRev::Proto1);
        panel.mode_set(WQHD_120).unwrap();
        panel.enable().unwrap();
        let t = panel.transport();
        assert!(t.contains(&[0xB0, 0x02, 0xF9, 0x95]));
        // target, opposite, target in high speed
        let first = t.position(&[0x60, 0x18]).unwrap();
        assert_eq!(t.packets[first - 2], vec![0x60, 0x00]);
        assert!(!t.contains(&[0xF4, 0x78]));
    }
}
