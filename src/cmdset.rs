//! Static, revision gated command sets

use crate::command::{Command, FREQ_UPDATE, LOCK, UNLOCK};
use crate::identity::PanelRev;
use crate::sequencer::{CmdEntry, RevGate};

use Command::*;

const fn cmd(command: Command, params: &'static [u8]) -> CmdEntry {
    CmdEntry::new(command, params)
}

const fn below(rev: PanelRev, command: Command, params: &'static [u8]) -> CmdEntry {
    CmdEntry::new(command, params).gated(RevGate::Below(rev))
}

const fn at_least(rev: PanelRev, command: Command, params: &'static [u8]) -> CmdEntry {
    CmdEntry::new(command, params).gated(RevGate::AtLeast(rev))
}

const SYNC_BEGIN: [u8; 6] = [0x00, 0x2C, 0x2C, 0xA2, 0x00, 0x00];
const SYNC_END: [u8; 6] = [0x00, 0x2C, 0x2C, 0x82, 0x00, 0x00];

pub(crate) const DISPLAY_ON: &[CmdEntry] = &[
    cmd(TestKey, &UNLOCK),
    cmd(SyncControl, &SYNC_BEGIN),
    // AMP type change (return)
    cmd(GlobalParam, &[0x00, 0x4F, 0xF4]),
    cmd(PowerControl, &[0x70]),
    // Vreg = 7.1V (return)
    cmd(GlobalParam, &[0x00, 0x31, 0xF4]),
    at_least(PanelRev::Dvt1, PowerControl, &[0x1A; 5]),
    below(PanelRev::Dvt1, PowerControl, &[0x1B; 5]),
    cmd(SyncControl, &SYNC_END),
    cmd(TestKey, &LOCK),
    cmd(SetDisplayOn, &[]),
];

pub(crate) const DISPLAY_OFF: &[CmdEntry] = &[
    cmd(SetDisplayOff, &[]),
    cmd(TestKey, &UNLOCK),
    cmd(SyncControl, &SYNC_BEGIN),
    // AMP type change
    cmd(GlobalParam, &[0x00, 0x4F, 0xF4]),
    cmd(PowerControl, &[0x50]),
    // Vreg = 4.5V
    cmd(GlobalParam, &[0x00, 0x31, 0xF4]),
    cmd(PowerControl, &[0x00; 5]),
    cmd(SyncControl, &SYNC_END),
    cmd(TestKey, &LOCK),
];

pub(crate) const INIT: &[CmdEntry] = &[
    cmd(ExitSleepMode, &[]).delay(10),
    cmd(TestKey, &UNLOCK),
    // delete toggle
    below(PanelRev::Evt1_1, GlobalParam, &[0x00, 0x58, 0x94]),
    below(PanelRev::Evt1_1, AodControl, &[0x0B, 0xF0, 0x0B, 0xF0]),
    // AMP type change
    cmd(GlobalParam, &[0x00, 0x4F, 0xF4]),
    cmd(PowerControl, &[0x50]),
    // VREG 4.5V
    cmd(GlobalParam, &[0x00, 0x31, 0xF4]),
    cmd(PowerControl, &[0x00; 5]),
    cmd(TestKey, &LOCK).delay(110),
    cmd(SetTearOn, &[]),
    cmd(TestKey, &UNLOCK),
    below(PanelRev::Dvt1, GlobalParam, &[0x00, 0x03, 0xBB]),
    below(PanelRev::Dvt1, AodTransition, &[0x41]),
    // TSP sync, auto set
    cmd(GlobalParam, &[0x00, 0x3C, 0xB9]),
    cmd(TeControl, &[0x19, 0x09]),
    // FFC: 165MHz, 1368 Mbps
    cmd(GlobalParam, &[0x00, 0x36, 0xC5]),
    cmd(
        Ffc,
        &[
            0x11, 0x10, 0x50, 0x05, 0x4D, 0x31, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00, 0x4D, 0x31,
            0x40, 0x00, 0x40, 0x00, 0x40, 0x00, 0x4D, 0x31, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00,
            0x4D, 0x31, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00,
        ],
    ),
    // TE width: changeable, fixed, fixed
    cmd(GlobalParam, &[0x00, 0x04, 0xB9]),
    cmd(
        TeControl,
        &[
            0x0B, 0xBB, 0x00, 0x2F, 0x0B, 0xBB, 0x00, 0x2F, 0x0B, 0xBB, 0x00, 0x2F,
        ],
    ),
    // OPEC on, still image detection off
    below(PanelRev::Mp, GlobalParam, &[0x00, 0x1D, 0x63]),
    below(PanelRev::Mp, Opec, &[0x02, 0x18]),
    // PMIC fast discharge off
    cmd(GlobalParam, &[0x00, 0x18, 0xB1]),
    cmd(Pmic, &[0x55, 0x01]),
    cmd(GlobalParam, &[0x00, 0x13, 0xB1]),
    cmd(Pmic, &[0x80]),
    cmd(FrequencyUpdate, &FREQ_UPDATE),
    cmd(TestKey, &LOCK),
    // CASET: 1343
    cmd(SetColumnAddress, &[0x00, 0x00, 0x05, 0x3F]),
    // PASET: 2991
    cmd(SetPageAddress, &[0x00, 0x00, 0x0B, 0xAF]),
];

/// Gamma fix for normal speed, E7 DOE material only
pub(crate) const NS_GAMMA_FIX: &[CmdEntry] = &[
    cmd(TestKey, &UNLOCK),
    cmd(GlobalParam, &[0x02, 0x3F, 0xCB]),
    cmd(GammaFix, &[0x0A]),
    cmd(GlobalParam, &[0x02, 0x45, 0xCB]),
    cmd(GammaFix, &[0x0A]),
    cmd(FrequencyUpdate, &FREQ_UPDATE),
    cmd(TestKey, &LOCK),
];

/// Negative voltages used in low power mode, from Dvt1 on
pub(crate) const NEGATIVE_FIELD: &[CmdEntry] = &[
    cmd(TestKey, &UNLOCK),
    // Vint -3V
    cmd(GlobalParam, &[0x00, 0x21, 0xF4]),
    cmd(PowerControl, &[0x1E]),
    // Vaint -4V
    cmd(GlobalParam, &[0x00, 0x69, 0xF4]),
    cmd(PowerControl, &[0x78]),
    // VGL -8V
    cmd(GlobalParam, &[0x00, 0x17, 0xF4]),
    cmd(PowerControl, &[0x1E]),
    cmd(FrequencyUpdate, &FREQ_UPDATE),
    cmd(TestKey, &LOCK),
];

/// AOD transition setting, before Dvt1
pub(crate) const AOD_TRANSITION: &[CmdEntry] = &[
    cmd(TestKey, &UNLOCK),
    below(PanelRev::Dvt1, GlobalParam, &[0x00, 0x03, 0xBB]),
    below(PanelRev::Dvt1, AodTransition, &[0x41]),
    cmd(TestKey, &LOCK),
];

/// LHBM luminance setting without target frequency, Proto1 only
pub(crate) const LHBM_OPR: &[CmdEntry] = &[
    cmd(TestKey, &UNLOCK),
    cmd(GlobalParam, &[0x02, 0xF9, 0x95]),
    // DBV setting
    cmd(
        LhbmBrightness,
        &[
            0x00, 0x40, 0x0C, 0x01, 0x90, 0x33, 0x06, 0x60, 0xCC, 0x11, 0x92, 0x7F,
        ],
    ),
    cmd(LhbmOffsetSelect, &[0xC6, 0x00, 0x00, 0x19]),
    // 120Hz base (HS) offset
    cmd(LhbmOffset, &[0x9C, 0x9F, 0x59, 0x58, 0x50, 0x2F, 0x2B, 0x2E]),
    cmd(LhbmOffsetSelect, &[0xC6, 0x00, 0x00, 0x6A]),
    // 60Hz base (NS) offset
    cmd(LhbmOffset, &[0xA0, 0xA7, 0x57, 0x5C, 0x52, 0x37, 0x37, 0x40]),
];

/// Fixed register program of the always-on low power mode
///
/// Fixed TE with 693us width, 1Hz auto frame insertion, early exit armed.
pub(crate) const LP_PROGRAM: &[CmdEntry] = &[
    cmd(TestKey, &UNLOCK),
    // fixed TE: sync on
    cmd(TeControl, &[0x51]),
    cmd(GlobalParam, &[0x00, 0x08, 0xB9]),
    cmd(
        TeControl,
        &[0x0B, 0xE0, 0x00, 0x2F, 0x0B, 0xE0, 0x00, 0x2F],
    ),
    // frequency set for AOD
    cmd(GlobalParam, &[0x00, 0x02, 0xB9]),
    cmd(TeControl, &[0x00]),
    // auto frame insertion: 1Hz
    cmd(GlobalParam, &[0x00, 0x18, 0xBD]),
    cmd(FrameControl, &[0x04, 0x00, 0x74]),
    cmd(GlobalParam, &[0x00, 0xB8, 0xBD]),
    cmd(FrameControl, &[0x00, 0x08]),
    cmd(GlobalParam, &[0x00, 0xC8, 0xBD]),
    cmd(FrameControl, &[0x03]),
    cmd(FrameControl, &[0xA7]),
    // early exit
    cmd(GlobalParam, &[0x00, 0xE8, 0xBD]),
    cmd(FrameControl, &[0x00]),
    cmd(GlobalParam, &[0x00, 0x10, 0xBD]),
    cmd(FrameControl, &[0x22]),
    cmd(GlobalParam, &[0x00, 0x82, 0xBD]),
    cmd(FrameControl, &[0x22, 0x22, 0x22, 0x22]),
    cmd(FrequencyUpdate, &FREQ_UPDATE),
    cmd(TestKey, &LOCK),
];

/// Leaves low power: manual mode, changeable TE, 30Hz
pub(crate) const LP_EXIT: &[CmdEntry] = &[
    cmd(TestKey, &UNLOCK),
    cmd(FrameControl, &[0x21]),
    // changeable TE is a must for command sync
    cmd(TeControl, &[0x04]),
    cmd(GlobalParam, &[0x00, 0x04, 0xB9]),
    cmd(TeControl, &[0x0B, 0xE0, 0x00, 0x2F]),
    cmd(GlobalParam, &[0x00, 0x01, 0x60]),
    cmd(Frequency, &[0x00]),
    cmd(FrequencyUpdate, &FREQ_UPDATE),
    cmd(TestKey, &LOCK),
];

/// Clears the AOD low mode, required before AOD off
pub(crate) const AOD_LOW_OFF: &[CmdEntry] = &[
    cmd(TestKey, &UNLOCK),
    cmd(GlobalParam, &[0x00, 0x52, 0x94]),
    cmd(AodControl, &[0x00]),
    cmd(TestKey, &LOCK),
];

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::sequencer::Sequencer;
    use crate::test_utils::FakeTransport;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use std::vec;
    use std::vec::Vec;

    fn render(set: &[CmdEntry], rev: PanelRev) -> Vec<Vec<u8>> {
        let mut seq = Sequencer::new(FakeTransport::default());
        seq.send_cmdset(set, rev, &mut NoopDelay::new()).unwrap();
        seq.transport().written()
    }

    #[test]
    fn display_on_vreg_per_revision() {
        let dvt = render(DISPLAY_ON, PanelRev::Dvt1);
        assert!(dvt.contains(&vec![0xF4, 0x1A, 0x1A, 0x1A, 0x1A, 0x1A]));
        assert!(!dvt.contains(&vec![0xF4, 0x1B, 0x1B, 0x1B, 0x1B, 0x1B]));
        assert_eq!(dvt.last(), Some(&vec![0x29]));

        let evt = render(DISPLAY_ON, PanelRev::Evt1);
        assert!(evt.contains(&vec![0xF4, 0x1B, 0x1B, 0x1B, 0x1B, 0x1B]));
        assert_eq!(evt.len(), dvt.len());
    }

    #[test]
    fn init_gates() {
        let proto = render(INIT, PanelRev::Proto1);
        let mp = render(INIT, PanelRev::Mp);
        assert!(proto.contains(&vec![0x94, 0x0B, 0xF0, 0x0B, 0xF0]));
        assert!(proto.contains(&vec![0xBB, 0x41]));
        assert!(proto.contains(&vec![0x63, 0x02, 0x18]));
        assert!(!mp.iter().any(|p| p[0] == 0x94 || p[0] == 0xBB || p[0] == 0x63));
        assert_eq!(proto.len(), mp.len() + 6);
        assert_eq!(mp[0], vec![0x11]);
        assert_eq!(mp.last(), Some(&vec![0x2B, 0x00, 0x00, 0x0B, 0xAF]));
    }

    #[test]
    fn init_sleeps_after_sleep_out_and_power_setup() {
        let mut seq = Sequencer::new(FakeTransport::default());
        seq.send_cmdset(INIT, PanelRev::Pvt, &mut NoopDelay::new())
            .unwrap();
        // flushed after sleep out, after the first lock and at the end
        assert_eq!(seq.transport().flushes, 3);
    }

    #[test]
    fn sets_are_bracketed() {
        for set in [
            NS_GAMMA_FIX,
            NEGATIVE_FIELD,
            AOD_TRANSITION,
            LP_PROGRAM,
            LP_EXIT,
            AOD_LOW_OFF,
        ] {
            let packets = render(set, PanelRev::Pvt);
            assert_eq!(packets.first(), Some(&vec![0xF0, 0x5A, 0x5A]));
            assert_eq!(packets.last(), Some(&vec![0xF0, 0xA5, 0xA5]));
        }
    }
}
