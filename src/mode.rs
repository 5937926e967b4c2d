//! Display modes the panel can run

/// When the panel may step down to its idle rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleMode {
    /// No idle stepping in this mode
    Unsupported,
    /// Armed whenever frames stop arriving
    OnInactivity,
    /// Armed only while the pipeline is in self refresh
    OnSelfRefresh,
}

/// One display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelMode {
    pub name: &'static str,
    pub hdisplay: u16,
    pub vdisplay: u16,
    /// Refresh rate in Hz
    pub vrefresh: u32,
    /// TE pulse width in microseconds
    pub te_usec: u32,
    /// Always-on low power mode
    pub is_lp: bool,
    pub idle_mode: IdleMode,
}

impl PanelMode {
    const fn normal(
        name: &'static str,
        hdisplay: u16,
        vdisplay: u16,
        vrefresh: u32,
        te_usec: u32,
    ) -> Self {
        PanelMode {
            name,
            hdisplay,
            vdisplay,
            vrefresh,
            te_usec,
            is_lp: false,
            idle_mode: IdleMode::OnSelfRefresh,
        }
    }

    const fn low_power(name: &'static str, hdisplay: u16, vdisplay: u16) -> Self {
        PanelMode {
            name,
            hdisplay,
            vdisplay,
            vrefresh: 30,
            te_usec: 693,
            is_lp: true,
            idle_mode: IdleMode::Unsupported,
        }
    }

    /// Lower (1008 wide) resolution
    pub fn is_fhd(&self) -> bool {
        self.hdisplay == 1008
    }

    /// Frame period in microseconds, rounded up
    pub fn period_us(&self) -> u32 {
        period_us(self.vrefresh)
    }

    /// Both modes scan out the same active area
    pub fn same_resolution(&self, other: &PanelMode) -> bool {
        self.hdisplay == other.hdisplay && self.vdisplay == other.vdisplay
    }
}

/// Frame period of `vrefresh` in microseconds, rounded up
pub fn period_us(vrefresh: u32) -> u32 {
    1_000_000u32.div_ceil(vrefresh.max(1))
}

pub const WQHD_60: PanelMode = PanelMode::normal("1344x2992x60", 1344, 2992, 60, 8500);
pub const WQHD_120: PanelMode = PanelMode::normal("1344x2992x120", 1344, 2992, 120, 273);
pub const FHD_60: PanelMode = PanelMode::normal("1008x2244x60", 1008, 2244, 60, 8500);
pub const FHD_120: PanelMode = PanelMode::normal("1008x2244x120", 1008, 2244, 120, 273);
pub const WQHD_LP: PanelMode = PanelMode::low_power("1344x2992x30", 1344, 2992);
pub const FHD_LP: PanelMode = PanelMode::low_power("1008x2244x30", 1008, 2244);

/// Normal modes
pub const NORMAL_MODES: [PanelMode; 4] = [WQHD_60, WQHD_120, FHD_60, FHD_120];
/// Always-on low power modes
pub const LP_MODES: [PanelMode; 2] = [WQHD_LP, FHD_LP];
