//! Frequency controller
//!
//! Maps the refresh configuration onto the frame control registers. Manual mode
//! selects one fixed rate, automatic mode lets the panel step down towards an
//! idle rate on its own.

use log::warn;

use crate::command::Command;
use crate::error::BatchOverflow;
use crate::feature::FeatureSet;
use crate::sequencer::CommandBatch;

/// Manual frequency register values in normal (low) speed mode
pub const MANUAL_LOW_SPEED: [(u32, u8); 5] =
    [(1, 0x1F), (5, 0x1E), (10, 0x1B), (30, 0x19), (60, 0x18)];
/// Manual frequency register values in high speed mode
pub const MANUAL_HIGH_SPEED: [(u32, u8); 6] = [
    (1, 0x07),
    (5, 0x06),
    (10, 0x03),
    (30, 0x02),
    (60, 0x01),
    (120, 0x00),
];

/// Idle rates automatic frame insertion can step down to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTarget {
    Hz30,
    Hz10,
    Hz1,
}

impl IdleTarget {
    /// Anything outside 30/10/1 Hz falls back to 1 Hz
    pub fn from_hz(hz: u32) -> Self {
        match hz {
            30 => IdleTarget::Hz30,
            10 => IdleTarget::Hz10,
            1 => IdleTarget::Hz1,
            _ => {
                warn!("unsupported idle target {hz}Hz, using 1Hz");
                IdleTarget::Hz1
            }
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Manual register value for `vrefresh`
///
/// Returns the value and whether `vrefresh` had to be replaced by the nearest
/// supported rate.
pub fn manual_value(low_speed: bool, vrefresh: u32) -> (u8, bool) {
    let table: &[(u32, u8)] = if low_speed {
        &MANUAL_LOW_SPEED
    } else {
        &MANUAL_HIGH_SPEED
    };
    if let Some(&(_, val)) = table.iter().find(|(hz, _)| *hz == vrefresh) {
        return (val, false);
    }
    // ties go to the higher rate
    let (hz, val) = table
        .iter()
        .rev()
        .min_by_key(|(hz, _)| hz.abs_diff(vrefresh))
        .copied()
        .unwrap_or((60, 0x18));
    warn!(
        "unsupported manual freq {vrefresh}Hz ({} mode), using {hz}Hz",
        if low_speed { "ns" } else { "hs" }
    );
    (val, true)
}

/// Adds the frequency group for `features`
pub(crate) fn emit(
    features: &FeatureSet,
    vrefresh: u32,
    idle_vrefresh: u32,
    batch: &mut CommandBatch,
) -> Result<(), BatchOverflow> {
    if features.auto_frame_insertion {
        emit_auto(features, vrefresh, idle_vrefresh, batch)
    } else {
        emit_manual(features, vrefresh, batch)
    }
}

fn emit_manual(
    features: &FeatureSet,
    vrefresh: u32,
    batch: &mut CommandBatch,
) -> Result<(), BatchOverflow> {
    let (val, _) = manual_value(features.low_speed, vrefresh);
    batch.add(Command::FrameControl, &[0x21])?;
    batch.add(Command::Frequency, &[val])
}

// [hbm off, hbm on], indexed by IdleTarget
const TARGET_LOW_SPEED: [[u8; 2]; 3] = [[0x04, 0x02], [0x14, 0x0A], [0xEC, 0x76]];
const TARGET_HIGH_SPEED: [[u8; 2]; 3] = [[0x06, 0x03], [0x16, 0x0B], [0xEE, 0x77]];

// [hbm off, hbm on]
const STEP_LOW_SPEED: [[u8; 6]; 2] = [
    [0x00, 0x04, 0x00, 0x14, 0x00, 0x00],
    [0x00, 0x02, 0x00, 0x0A, 0x00, 0x00],
];
const STEP_HIGH_SPEED: [[u8; 6]; 2] = [
    [0x00, 0x02, 0x00, 0x06, 0x00, 0x16],
    [0x00, 0x01, 0x00, 0x03, 0x00, 0x0B],
];

// step transition, indexed by IdleTarget
const TRANSITION_60_LOW_SPEED: [[u8; 3]; 3] = [
    [0x00, 0x00, 0x00],
    [0x01, 0x00, 0x00],
    [0x01, 0x03, 0x00],
];
const TRANSITION_60_HIGH_SPEED: [[u8; 3]; 3] = [
    [0x01, 0x00, 0x00],
    [0x01, 0x01, 0x00],
    [0x01, 0x01, 0x03],
];
const TRANSITION_120_HIGH_SPEED: [[u8; 3]; 3] = [
    [0x00, 0x00, 0x00],
    [0x00, 0x03, 0x00],
    [0x00, 0x01, 0x03],
];

/// Step transition payload for the current rate and idle target
pub fn transition(low_speed: bool, vrefresh: u32, target: IdleTarget) -> [u8; 3] {
    let table = if low_speed {
        &TRANSITION_60_LOW_SPEED
    } else if vrefresh == 60 {
        &TRANSITION_60_HIGH_SPEED
    } else {
        if vrefresh != 120 {
            warn!("unsupported freq step from {vrefresh}Hz (hs mode)");
        }
        &TRANSITION_120_HIGH_SPEED
    };
    table[target.index()]
}

fn emit_auto(
    features: &FeatureSet,
    vrefresh: u32,
    idle_vrefresh: u32,
    batch: &mut CommandBatch,
) -> Result<(), BatchOverflow> {
    let hbm = usize::from(features.high_brightness);
    let target = IdleTarget::from_hz(idle_vrefresh);

    if features.low_speed {
        // threshold setting
        batch.offset(0x000C, Command::FrameControl)?;
        batch.add(Command::FrameControl, &[0x00, 0x00])?;
    } else {
        // initial frequency
        batch.offset(0x0092, Command::FrameControl)?;
        let val = if vrefresh == 60 {
            if features.high_brightness {
                0x01
            } else {
                0x02
            }
        } else {
            if vrefresh != 120 {
                warn!("unsupported init freq {vrefresh}Hz (hs mode)");
            }
            0x00
        };
        batch.add(Command::FrameControl, &[0x00, val])?;
    }

    // target frequency
    batch.offset(0x0012, Command::FrameControl)?;
    let target_table = if features.low_speed {
        &TARGET_LOW_SPEED
    } else {
        &TARGET_HIGH_SPEED
    };
    batch.add(
        Command::FrameControl,
        &[0x00, 0x00, target_table[target.index()][hbm]],
    )?;

    // step setting
    batch.offset(0x009E, Command::FrameControl)?;
    let step = if features.low_speed {
        &STEP_LOW_SPEED[hbm]
    } else {
        &STEP_HIGH_SPEED[hbm]
    };
    batch.add(Command::FrameControl, step)?;

    batch.offset(0x00AE, Command::FrameControl)?;
    batch.add(
        Command::FrameControl,
        &transition(features.low_speed, vrefresh, target),
    )?;
    batch.add(Command::FrameControl, &[0xA3])
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::vec;
    use std::vec::Vec;

    fn packets(batch: &CommandBatch) -> Vec<Vec<u8>> {
        batch.packets().map(|p| p.to_vec()).collect()
    }

    #[test]
    fn manual_table_is_total() {
        for (hz, val) in MANUAL_LOW_SPEED {
            assert_eq!(manual_value(true, hz), (val, false));
        }
        for (hz, val) in MANUAL_HIGH_SPEED {
            assert_eq!(manual_value(false, hz), (val, false));
        }
    }

    #[test]
    fn manual_falls_back_to_nearest() {
        assert_eq!(manual_value(false, 90), (0x00, true));
        assert_eq!(manual_value(false, 24), (0x02, true));
        assert_eq!(manual_value(true, 120), (0x18, true));
        assert_eq!(manual_value(true, 3), (0x1E, true));
    }

    #[test]
    fn manual_group() {
        let mut batch = CommandBatch::new();
        let features = FeatureSet {
            low_speed: true,
            ..FeatureSet::EMPTY
        };
        emit(&features, 30, 0, &mut batch).unwrap();
        assert_eq!(packets(&batch), vec![vec![0xBD, 0x21], vec![0x60, 0x19]]);
    }

    #[test]
    fn auto_group_120_to_10_high_speed() {
        let mut batch = CommandBatch::new();
        let features = FeatureSet {
            auto_frame_insertion: true,
            early_exit: true,
            ..FeatureSet::EMPTY
        };
        emit(&features, 120, 10, &mut batch).unwrap();
        assert_eq!(
            packets(&batch),
            vec![
                vec![0xB0, 0x00, 0x92, 0xBD],
                vec![0xBD, 0x00, 0x00],
                vec![0xB0, 0x00, 0x12, 0xBD],
                vec![0xBD, 0x00, 0x00, 0x16],
                vec![0xB0, 0x00, 0x9E, 0xBD],
                vec![0xBD, 0x00, 0x02, 0x00, 0x06, 0x00, 0x16],
                vec![0xB0, 0x00, 0xAE, 0xBD],
                vec![0xBD, 0x00, 0x03, 0x00],
                vec![0xBD, 0xA3],
            ]
        );
    }

    #[test]
    fn auto_group_low_speed_hbm_to_30() {
        let mut batch = CommandBatch::new();
        let features = FeatureSet {
            auto_frame_insertion: true,
            low_speed: true,
            high_brightness: true,
            ..FeatureSet::EMPTY
        };
        emit(&features, 60, 30, &mut batch).unwrap();
        let packets = packets(&batch);
        assert_eq!(packets[0], vec![0xB0, 0x00, 0x0C, 0xBD]);
        assert_eq!(packets[3], vec![0xBD, 0x00, 0x00, 0x02]);
        assert_eq!(packets[5], vec![0xBD, 0x00, 0x02, 0x00, 0x0A, 0x00, 0x00]);
        assert_eq!(packets[7], vec![0xBD, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn unsupported_idle_uses_1hz() {
        assert_eq!(IdleTarget::from_hz(5), IdleTarget::Hz1);
        assert_eq!(transition(false, 60, IdleTarget::from_hz(0)), [0x01, 0x01, 0x03]);
    }

    #[test]
    fn nine_transitions_are_distinct_per_table() {
        for table in [
            TRANSITION_60_LOW_SPEED,
            TRANSITION_60_HIGH_SPEED,
            TRANSITION_120_HIGH_SPEED,
        ] {
            assert_ne!(table[0], table[1]);
            assert_ne!(table[1], table[2]);
            assert_ne!(table[0], table[2]);
        }
    }
}
