//! Feature state store: desired features and the mirror of what the panel holds

use crate::feature::FeatureSet;

/// Refresh rates as last committed to the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshState {
    /// Committed refresh rate in Hz
    pub vrefresh: u32,
    /// Committed idle refresh rate in Hz, 0 when idle stepping is off
    ///
    /// When nonzero it is always below [vrefresh](RefreshState::vrefresh).
    pub idle_vrefresh: u32,
}

impl Default for RefreshState {
    fn default() -> Self {
        // panel powers up at 60Hz, manual mode
        RefreshState {
            vrefresh: 60,
            idle_vrefresh: 0,
        }
    }
}

/// Desired and committed feature state of one panel
///
/// The committed half is only touched through the commit engine, see
/// [FeatureEngine](crate::engine::FeatureEngine).
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
    desired: FeatureSet,
    committed: FeatureSet,
    refresh: RefreshState,
    /// Idle target requested for automatic stepping, 0 if not armed
    idle_target: u32,
}

impl FeatureStore {
    pub fn desired(&self) -> &FeatureSet {
        &self.desired
    }

    pub fn desired_mut(&mut self) -> &mut FeatureSet {
        &mut self.desired
    }

    pub fn committed(&self) -> &FeatureSet {
        &self.committed
    }

    pub fn refresh(&self) -> &RefreshState {
        &self.refresh
    }

    pub fn idle_target(&self) -> u32 {
        self.idle_target
    }

    pub fn set_idle_target(&mut self, idle_target: u32) {
        self.idle_target = idle_target;
    }

    pub(crate) fn latch(&mut self, features: FeatureSet, refresh: RefreshState) {
        self.committed = features;
        self.refresh = refresh;
    }

    pub(crate) fn latch_refresh(&mut self, refresh: RefreshState) {
        self.refresh = refresh;
    }
}
