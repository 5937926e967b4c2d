//! Panel configuration types and builder

pub use crate::error::BuilderError;

/// Runtime overrides, read by the commit engine before every commit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Knobs {
    /// Keep the TE signal changeable even when early exit asks for fixed TE
    pub force_changeable_te: bool,
    /// Never enable zonal attenuation
    pub force_za_off: bool,
}

/// Panel configuration
///
/// Use [Builder] to create one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelConfig {
    /// Operating rate ceiling in Hz, 60 selects normal speed and 120 high speed
    pub op_hz: u32,
    /// Minimum idle refresh rate, negative disables idle stepping
    pub min_vrefresh: i32,
    /// Time without commits before idle stepping may arm, 0 for none
    pub idle_delay_ms: u32,
    /// Idle policy switch
    pub panel_idle_enabled: bool,
    /// Temperature the gain register holds after reset, in °C
    pub initial_temperature: i32,
    /// Display index reported in idle events
    pub display_id: u32,
    pub knobs: Knobs,
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelConfig {
            op_hz: 120,
            min_vrefresh: 0,
            idle_delay_ms: 0,
            panel_idle_enabled: true,
            initial_temperature: 25,
            display_id: 0,
            knobs: Knobs::default(),
        }
    }
}

/// Builder for constructing a [PanelConfig]
///
/// # Example
///
/// ```
/// use amoled_panel::config::Builder;
///
/// let config = Builder::new()
///     .op_hz(60)
///     .min_vrefresh(10)
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.op_hz, 60);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Builder {
    config: PanelConfig,
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operating rate ceiling, 60 or 120 Hz
    pub fn op_hz(mut self, hz: u32) -> Self {
        self.config.op_hz = hz;
        self
    }

    /// Set the minimum idle refresh rate, negative to disable idle stepping
    pub fn min_vrefresh(mut self, hz: i32) -> Self {
        self.config.min_vrefresh = hz;
        self
    }

    /// Set the idle delay
    pub fn idle_delay_ms(mut self, ms: u32) -> Self {
        self.config.idle_delay_ms = ms;
        self
    }

    /// Allow or forbid idle stepping
    pub fn panel_idle_enabled(mut self, enabled: bool) -> Self {
        self.config.panel_idle_enabled = enabled;
        self
    }

    pub fn initial_temperature(mut self, celsius: i32) -> Self {
        self.config.initial_temperature = celsius;
        self
    }

    pub fn display_id(mut self, id: u32) -> Self {
        self.config.display_id = id;
        self
    }

    /// Set the runtime knobs
    pub fn knobs(mut self, knobs: Knobs) -> Self {
        self.config.knobs = knobs;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidOperatingRate` if the operating rate is
    /// neither 60 nor 120 Hz
    pub fn build(self) -> Result<PanelConfig, BuilderError> {
        if !matches!(self.config.op_hz, 60 | 120) {
            return Err(BuilderError::InvalidOperatingRate(self.config.op_hz));
        }
        Ok(self.config)
    }
}
