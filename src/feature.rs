//! Correlated panel features
//!
//! The features below depend on each other: whenever one of them changes, the
//! early-exit and frequency registers have to be rewritten as a whole.

/// A single panel feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// High brightness mode
    HighBrightness,
    /// IR compensation off, used before Evt1
    IRCompensationOff,
    /// IR compensation flat-Z mode, used from Evt1 on
    IRCompensationZMode,
    /// Early exit from a long frame
    EarlyExit,
    /// Normal (low) speed operation instead of high speed
    LowSpeedMode,
    /// Automatic frame insertion instead of manual frequency
    AutoFrameInsertion,
}

impl Feature {
    /// Every feature, in declaration order
    pub const ALL: [Feature; 6] = [
        Feature::HighBrightness,
        Feature::IRCompensationOff,
        Feature::IRCompensationZMode,
        Feature::EarlyExit,
        Feature::LowSpeedMode,
        Feature::AutoFrameInsertion,
    ];
}

/// Set of enabled features
///
/// Two of them exist per panel: the desired one, which may run ahead of the
/// hardware, and the committed one mirroring what was last flushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FeatureSet {
    pub high_brightness: bool,
    pub irc_off: bool,
    pub irc_z_mode: bool,
    pub early_exit: bool,
    pub low_speed: bool,
    pub auto_frame_insertion: bool,
}

impl FeatureSet {
    /// No feature enabled: high speed, manual frequency, changeable TE
    pub const EMPTY: FeatureSet = FeatureSet {
        high_brightness: false,
        irc_off: false,
        irc_z_mode: false,
        early_exit: false,
        low_speed: false,
        auto_frame_insertion: false,
    };

    /// Every feature enabled
    pub const FULL: FeatureSet = FeatureSet {
        high_brightness: true,
        irc_off: true,
        irc_z_mode: true,
        early_exit: true,
        low_speed: true,
        auto_frame_insertion: true,
    };

    pub fn contains(&self, feature: Feature) -> bool {
        match feature {
            Feature::HighBrightness => self.high_brightness,
            Feature::IRCompensationOff => self.irc_off,
            Feature::IRCompensationZMode => self.irc_z_mode,
            Feature::EarlyExit => self.early_exit,
            Feature::LowSpeedMode => self.low_speed,
            Feature::AutoFrameInsertion => self.auto_frame_insertion,
        }
    }

    pub fn set(&mut self, feature: Feature, enabled: bool) {
        let slot = match feature {
            Feature::HighBrightness => &mut self.high_brightness,
            Feature::IRCompensationOff => &mut self.irc_off,
            Feature::IRCompensationZMode => &mut self.irc_z_mode,
            Feature::EarlyExit => &mut self.early_exit,
            Feature::LowSpeedMode => &mut self.low_speed,
            Feature::AutoFrameInsertion => &mut self.auto_frame_insertion,
        };
        *slot = enabled;
    }

    /// Builder style [set](FeatureSet::set)
    pub fn with(mut self, feature: Feature, enabled: bool) -> Self {
        self.set(feature, enabled);
        self
    }

    /// Features that differ between `self` and `other`
    pub fn changed(&self, other: &FeatureSet) -> FeatureSet {
        FeatureSet {
            high_brightness: self.high_brightness != other.high_brightness,
            irc_off: self.irc_off != other.irc_off,
            irc_z_mode: self.irc_z_mode != other.irc_z_mode,
            early_exit: self.early_exit != other.early_exit,
            low_speed: self.low_speed != other.low_speed,
            auto_frame_insertion: self.auto_frame_insertion != other.auto_frame_insertion,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FeatureSet::EMPTY
    }

    /// Iterates over the enabled features
    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut set = FeatureSet::EMPTY;
        for feature in iter {
            set.set(feature, true);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_is_symmetric_difference() {
        let a: FeatureSet = [Feature::EarlyExit, Feature::LowSpeedMode].into_iter().collect();
        let b: FeatureSet = [Feature::EarlyExit, Feature::HighBrightness].into_iter().collect();
        let changed = a.changed(&b);
        assert_eq!(changed, b.changed(&a));
        assert_eq!(
            changed.iter().collect::<heapless::Vec<_, 6>>().as_slice(),
            &[Feature::HighBrightness, Feature::LowSpeedMode]
        );
    }

    #[test]
    fn same_sets_have_no_change() {
        for feature in Feature::ALL {
            let set = FeatureSet::EMPTY.with(feature, true);
            assert!(set.changed(&set).is_empty());
            assert!(!set.is_empty());
        }
    }

    #[test]
    fn full_changes_everything() {
        assert_eq!(FeatureSet::FULL.changed(&FeatureSet::EMPTY), FeatureSet::FULL);
        assert_eq!(FeatureSet::FULL.iter().count(), Feature::ALL.len());
    }
}
