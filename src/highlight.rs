//! Local high brightness (LHBM) control state

use crate::command::Command;
use crate::error::BatchOverflow;
use crate::sequencer::CommandBatch;

/// Coarse and fine LHBM brightness of the three channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LhbmBrightness {
    pub r_coarse: u8,
    pub gb_coarse: u8,
    pub r_fine: u8,
    pub g_fine: u8,
    pub b_fine: u8,
}

impl LhbmBrightness {
    /// Register layout
    pub fn to_bytes(&self) -> [u8; 5] {
        [
            self.r_coarse,
            self.gb_coarse,
            self.r_fine,
            self.g_fine,
            self.b_fine,
        ]
    }
}

/// Overdrive tiers, by ambient brightness
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OverdriveGroup {
    Nit0,
    Nit6,
    Nit50,
    Nit300,
}

impl OverdriveGroup {
    pub const ALL: [OverdriveGroup; 4] = [
        OverdriveGroup::Nit0,
        OverdriveGroup::Nit6,
        OverdriveGroup::Nit50,
        OverdriveGroup::Nit300,
    ];

    /// Tier covering `nits`, none above 300
    pub fn for_nits(nits: u32) -> Option<Self> {
        match nits {
            0 => Some(OverdriveGroup::Nit0),
            1..=6 => Some(OverdriveGroup::Nit6),
            7..=50 => Some(OverdriveGroup::Nit50),
            51..=300 => Some(OverdriveGroup::Nit300),
            _ => None,
        }
    }
}

/// Offsets applied to a fine/coarse pair when overdriving
///
/// The fine value is raised by `fine[0]` and the coarse one by `coarse[0]`.
/// If the fine value would overflow, coarse is raised by `coarse[1]` instead and
/// fine lowered by `fine[1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverdriveOffsets {
    pub fine: [u8; 2],
    pub coarse: [u8; 2],
}

/// Overdrive value for one fine/coarse pair, returns `(fine, coarse)`
pub fn od_brightness(n_fine: u8, n_coarse: u8, offsets: &OverdriveOffsets) -> (u8, u8) {
    if u16::from(n_fine) + u16::from(offsets.fine[0]) <= 0xFF {
        (
            n_fine + offsets.fine[0],
            n_coarse.wrapping_add(offsets.coarse[0]),
        )
    } else {
        (
            n_fine.wrapping_sub(offsets.fine[1]),
            n_coarse.wrapping_add(offsets.coarse[1]),
        )
    }
}

/// Normal and overdrive LHBM brightness
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalHighlightControl {
    pub normal: LhbmBrightness,
    pub overdrive: [LhbmBrightness; 4],
    /// Overdrive brightness is in use
    pub overdrived: bool,
    /// Histogram region was programmed since the last enable
    pub hist_roi_configured: bool,
}

impl LocalHighlightControl {
    /// Clears the per-enable state
    pub fn reset(&mut self) {
        self.overdrived = false;
        self.hist_roi_configured = false;
    }

    /// Derives the overdrive tier `group` from the normal brightness
    ///
    /// Red uses its own coarse value, green and blue share one.
    pub fn derive_overdrive(&mut self, group: OverdriveGroup, offsets: &OverdriveOffsets) {
        let n = self.normal;
        let (r_fine, r_coarse) = od_brightness(n.r_fine, n.r_coarse, offsets);
        let (g_fine, gb_coarse) = od_brightness(n.g_fine, n.gb_coarse, offsets);
        let (b_fine, _) = od_brightness(n.b_fine, n.gb_coarse, offsets);
        self.overdrive[group as usize] = LhbmBrightness {
            r_coarse,
            gb_coarse,
            r_fine,
            g_fine,
            b_fine,
        };
    }

    /// Brightness to program for `group`
    pub fn brightness(&self, group: OverdriveGroup) -> &LhbmBrightness {
        if self.overdrived {
            &self.overdrive[group as usize]
        } else {
            &self.normal
        }
    }
}

/// Adds the LHBM brightness write
pub(crate) fn emit_brightness(
    batch: &mut CommandBatch,
    brightness: &LhbmBrightness,
) -> Result<(), BatchOverflow> {
    batch.unlocked(|b| {
        b.offset(0x0321, Command::LhbmBrightness)?;
        b.add(Command::LhbmBrightness, &brightness.to_bytes())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn od_carry_rule() {
        let offsets = OverdriveOffsets {
            fine: [0x10, 0x20],
            coarse: [0x00, 0x01],
        };
        assert_eq!(od_brightness(0x80, 0x05, &offsets), (0x90, 0x05));
        assert_eq!(od_brightness(0xEF, 0x05, &offsets), (0xFF, 0x05));
        assert_eq!(od_brightness(0xF0, 0x05, &offsets), (0xD0, 0x06));
    }

    #[test]
    fn groups_by_nits() {
        assert_eq!(OverdriveGroup::for_nits(0), Some(OverdriveGroup::Nit0));
        assert_eq!(OverdriveGroup::for_nits(6), Some(OverdriveGroup::Nit6));
        assert_eq!(OverdriveGroup::for_nits(7), Some(OverdriveGroup::Nit50));
        assert_eq!(OverdriveGroup::for_nits(300), Some(OverdriveGroup::Nit300));
        assert_eq!(OverdriveGroup::for_nits(301), None);
    }

    #[test]
    fn overdrive_selected_only_when_active() {
        let mut ctl = LocalHighlightControl {
            normal: LhbmBrightness {
                r_coarse: 1,
                gb_coarse: 2,
                r_fine: 0x40,
                g_fine: 0x50,
                b_fine: 0xFF,
            },
            ..Default::default()
        };
        let offsets = OverdriveOffsets {
            fine: [0x08, 0x04],
            coarse: [0x00, 0x01],
        };
        ctl.derive_overdrive(OverdriveGroup::Nit50, &offsets);
        assert_eq!(ctl.brightness(OverdriveGroup::Nit50), &ctl.normal);

        ctl.overdrived = true;
        let od = *ctl.brightness(OverdriveGroup::Nit50);
        assert_eq!(od.r_fine, 0x48);
        assert_eq!(od.b_fine, 0xFB);
        assert_eq!(od.gb_coarse, 2);

        ctl.hist_roi_configured = true;
        ctl.reset();
        assert!(!ctl.overdrived);
        assert!(!ctl.hist_roi_configured);
    }

    #[test]
    fn brightness_packet() {
        let mut batch = CommandBatch::new();
        let brt = LhbmBrightness {
            r_coarse: 1,
            gb_coarse: 2,
            r_fine: 3,
            g_fine: 4,
            b_fine: 5,
        };
        emit_brightness(&mut batch, &brt).unwrap();
        let packets: heapless::Vec<&[u8], 4> = batch.packets().collect();
        assert_eq!(packets[1], &[0xB0, 0x03, 0x21, 0x95]);
        assert_eq!(packets[2], &[0x95, 1, 2, 3, 4, 5]);
    }
}
