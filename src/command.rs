//! Register addresses of the panel controller

use crate::traits;

/// Panel controller commands
///
/// Standard MIPI DCS commands plus the vendor registers the driver touches.
/// Vendor registers behind [TestKey](Command::TestKey) are only writable while
/// the controller is unlocked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    /// Enter sleep mode (DCS)
    EnterSleepMode = 0x10,
    /// Exit sleep mode (DCS)
    ExitSleepMode = 0x11,
    /// Enter normal mode (DCS), also leaves pixel-off
    EnterNormalMode = 0x13,
    /// All pixels off
    PixelOff = 0x22,
    /// Display off (DCS)
    SetDisplayOff = 0x28,
    /// Display on (DCS)
    SetDisplayOn = 0x29,
    /// Column address set (DCS)
    SetColumnAddress = 0x2A,
    /// Page address set (DCS)
    SetPageAddress = 0x2B,
    /// Tearing effect line on (DCS)
    SetTearOn = 0x35,
    /// Display brightness value, two bytes, MSB first (DCS)
    SetDisplayBrightness = 0x51,
    /// Control display: brightness control, HBM, local HBM and dimming bits (DCS)
    WriteControlDisplay = 0x53,
    /// Automatic current limiting setting (DCS power save)
    WritePowerSave = 0x55,

    /// Dynamic temperature gain
    TemperatureGain = 0x67,
    /// Gamma compensation coefficients
    GammaCompensation = 0x68,
    /// Frequency select
    Frequency = 0x60,
    /// Still image detection
    Opec = 0x63,
    /// Local highlight offset table
    LhbmOffset = 0x6C,
    /// Local highlight offset select
    LhbmOffsetSelect = 0x71,
    /// On pixel ratio read back
    OnPixelRatio = 0x91,
    /// IR compensation and zonal attenuation
    IrCompensation = 0x92,
    /// Always-on mode control
    AodControl = 0x94,
    /// Local highlight brightness
    LhbmBrightness = 0x95,
    /// Compression enable
    CompressionMode = 0x9D,
    /// Global parameter offset for the next vendor register write
    GlobalParam = 0xB0,
    /// PMIC control
    Pmic = 0xB1,
    /// Tearing effect control
    TeControl = 0xB9,
    /// Always-on transition control
    AodTransition = 0xBB,
    /// Frame control: early exit and frame insertion
    FrameControl = 0xBD,
    /// Resolution select
    ResolutionSelect = 0xC3,
    /// Frequency filter control
    Ffc = 0xC5,
    /// Gamma fix
    GammaFix = 0xCB,
    /// Identifier byte 1
    ReadId1 = 0xDA,
    /// Identifier byte 2, build code
    ReadId2 = 0xDB,
    /// Identifier byte 3
    ReadId3 = 0xDC,
    /// Sync control
    SyncControl = 0xE4,
    /// Unlock / lock the vendor registers
    TestKey = 0xF0,
    /// Operating mode select
    OperatingMode = 0xF2,
    /// Source amplifier and regulator control
    PowerControl = 0xF4,
    /// Latch pending frequency registers
    FrequencyUpdate = 0xF7,
}

impl traits::Command for Command {
    /// Returns the address of the command
    fn address(self) -> u8 {
        self as u8
    }
}

/// Parameters of [Command::TestKey] that unlock the vendor registers
pub(crate) const UNLOCK: [u8; 2] = [0x5A, 0x5A];
/// Parameters of [Command::TestKey] that lock the vendor registers again
pub(crate) const LOCK: [u8; 2] = [0xA5, 0xA5];
/// Parameter of [Command::FrequencyUpdate]
pub(crate) const FREQ_UPDATE: [u8; 1] = [0x0F];

#[cfg(test)]
mod tests {
    use super::Command;
    use crate::traits::Command as CommandTrait;

    #[test]
    fn command_addr() {
        assert_eq!(Command::TestKey.address(), 0xF0);

        assert_eq!(Command::FrequencyUpdate.address(), 0xF7);

        assert_eq!(Command::SetDisplayBrightness.address(), 0x51);

        assert_eq!(Command::PixelOff.address(), 0x22);
    }
}
