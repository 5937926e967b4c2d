//! Backlight level, current limiting and zonal attenuation

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::command::{Command, LOCK, UNLOCK};
use crate::error::ErrorKind;
use crate::identity::AclTable;
use crate::panel::Panel;
use crate::sequencer::CommandBatch;
use crate::traits::{CommandTransport, TemperatureSensor, VblankSource};

/// Automatic current limiting mode requested by the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AclMode {
    #[default]
    Off,
    Normal,
    Enhanced,
}

const ACL_ENHANCED_THRESHOLD_DBV: u16 = 3865;
const ACL_NORMAL_THRESHOLD_DBV_1: u16 = 3570;
const ACL_NORMAL_THRESHOLD_DBV_2: u16 = 3963;

const ACL_SETTING_17: u8 = 0x03;
const ACL_SETTING_12: u8 = 0x02;
const ACL_SETTING_7P5: u8 = 0x01;

/// On-pixel-ratio above which zonal attenuation is switched on, percent
pub const ZA_THRESHOLD_OPR: u8 = 80;
const MAX_OPR_VAL: u32 = 0x3FF;

/// What the panel holds for brightness related registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrightnessState {
    /// Last backlight level written
    pub dbv: u16,
    /// Current limiting strength written, 0 when off
    pub acl_setting: u8,
    pub za_enabled: bool,
    /// Pixel off was sent in place of level 0
    pub pixel_off: bool,
    pub acl_mode: AclMode,
}

impl BrightnessState {
    /// Forgets what the powered down hardware held, keeps the requested mode
    pub(crate) fn reset_hardware(&mut self) {
        self.dbv = 0;
        self.acl_setting = 0;
        self.za_enabled = false;
    }
}

/// Threshold and strength of current limiting for `dbv`
pub fn acl_threshold(table: AclTable, mode: AclMode, dbv: u16) -> (u16, u8) {
    match table {
        AclTable::Fixed { threshold, setting } => (threshold, setting),
        AclTable::Tiered => match mode {
            AclMode::Enhanced => (ACL_ENHANCED_THRESHOLD_DBV, ACL_SETTING_17),
            AclMode::Normal if dbv >= ACL_NORMAL_THRESHOLD_DBV_2 => {
                (ACL_NORMAL_THRESHOLD_DBV_2, ACL_SETTING_12)
            }
            AclMode::Normal if dbv >= ACL_NORMAL_THRESHOLD_DBV_1 => {
                (ACL_NORMAL_THRESHOLD_DBV_1, ACL_SETTING_7P5)
            }
            _ => (0, 0),
        },
    }
}

/// On-pixel-ratio in percent from the raw 10 bit register value, rounded
pub fn opr_percent(raw: u16) -> u8 {
    let val = u32::from(raw);
    ((val * 100 + MAX_OPR_VAL / 2) / MAX_OPR_VAL) as u8
}

impl<T, V, D, S> Panel<T, V, D, S>
where
    T: CommandTransport,
    V: VblankSource,
    D: DelayNs,
    S: TemperatureSensor,
{
    /// Sets the backlight level
    ///
    /// Level 0 is sent as pixel off, the next nonzero level brings the pixels
    /// back first.
    pub fn set_brightness(&mut self, dbv: u16) -> Result<(), ErrorKind<T::Error>> {
        if dbv == 0 {
            if !self.brightness.pixel_off {
                self.seq.write(Command::PixelOff, &[])?;
                self.brightness.pixel_off = true;
                debug!("pixel off instead of dbv 0");
            }
            return Ok(());
        }
        if self.brightness.pixel_off {
            self.seq.write(Command::EnterNormalMode, &[])?;
            self.brightness.pixel_off = false;
        }

        self.seq
            .write(Command::SetDisplayBrightness, &dbv.to_be_bytes())?;
        self.brightness.dbv = dbv;
        let mode = self.brightness.acl_mode;
        self.set_current_limiting_mode(mode)
    }

    /// Selects the current limiting mode and writes the resulting strength
    ///
    /// Limiting only kicks in with high brightness on and the level above the
    /// threshold of the revision.
    pub fn set_current_limiting_mode(&mut self, mode: AclMode) -> Result<(), ErrorKind<T::Error>> {
        self.brightness.acl_mode = mode;
        let dbv = self.brightness.dbv;
        let (threshold, setting) = acl_threshold(self.identity.caps.acl, mode, dbv);
        let enable = dbv >= threshold && self.display.hbm && mode != AclMode::Off;
        let setting = if enable { setting } else { 0 };
        if self.brightness.acl_setting == setting {
            return Ok(());
        }
        self.seq.write(Command::WritePowerSave, &[setting])?;
        self.brightness.acl_setting = setting;
        debug!("acl setting: {setting}");
        if self.identity.caps.za_follows_acl {
            self.update_za()?;
        }
        Ok(())
    }

    /// Strength of current limiting the panel holds
    pub fn acl_setting(&self) -> u8 {
        self.brightness.acl_setting
    }

    /// Overrides the recorded strength without writing it
    ///
    /// The next [set_current_limiting_mode](Self::set_current_limiting_mode)
    /// compares against this value.
    pub fn override_acl_setting(&mut self, setting: u8) {
        self.brightness.acl_setting = setting;
    }

    pub fn brightness_state(&self) -> &BrightnessState {
        &self.brightness
    }

    /// Switches zonal attenuation to follow the current limiting state
    ///
    /// Early prototypes additionally need the on-pixel-ratio above
    /// [ZA_THRESHOLD_OPR]. If it cannot be read nothing changes.
    pub(crate) fn update_za(&mut self) -> Result<(), ErrorKind<T::Error>> {
        let mut enable = false;
        if self.brightness.acl_setting > 0 && !self.config.knobs.force_za_off {
            if !self.identity.caps.za_needs_opr {
                enable = true;
            } else {
                match self.read_opr()? {
                    Some(opr) => enable = opr > ZA_THRESHOLD_OPR,
                    None => {
                        warn!("unable to update za");
                        return Ok(());
                    }
                }
            }
        }
        if self.brightness.za_enabled == enable {
            return Ok(());
        }

        let val = if enable {
            self.identity.caps.za_on_value
        } else {
            0x00
        };
        let mut batch = CommandBatch::new();
        batch.unlocked(|b| {
            b.offset(0x016C, Command::IrCompensation)?;
            b.add(Command::IrCompensation, &[val])
        })?;
        self.seq.send(&batch)?;
        self.brightness.za_enabled = enable;
        debug!("za {}", if enable { "on" } else { "off" });
        Ok(())
    }

    /// Reads the on-pixel-ratio, `None` on a failed or short read
    fn read_opr(&mut self) -> Result<Option<u8>, ErrorKind<T::Error>> {
        let mut open = CommandBatch::new();
        open.add(Command::TestKey, &UNLOCK)?;
        open.offset(0x00E7, Command::OnPixelRatio)?;
        self.seq.send(&open)?;

        let mut buf = [0u8; 2];
        let read = self.seq.read(Command::OnPixelRatio, &mut buf);
        self.seq.write(Command::TestKey, &LOCK)?;

        match read {
            Ok(n) if n == buf.len() => {
                let raw = u16::from_be_bytes(buf);
                let opr = opr_percent(raw);
                debug!("opr: {opr} ({raw:#x})");
                Ok(Some(opr))
            }
            Ok(n) => {
                warn!("failed to read opr, {n} bytes");
                Ok(None)
            }
            Err(e) => {
                warn!("failed to read opr: {e:?}");
                Ok(None)
            }
        }
    }
}
