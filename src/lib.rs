//! A driver for command-mode AMOLED panels with a vendor DDIC
//!
//! This driver was built using [`embedded-hal`] traits.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/1.0
//!
//! The panel runs a set of correlated features (high brightness, IR
//! compensation, early exit, operating speed, automatic frame insertion). The
//! driver keeps a mirror of what was last committed and only sends the command
//! groups that differ, in the order the controller needs them.
//!
//! # Requirements
//!
//! ### Command channel
//!
//! Anything implementing [`CommandTransport`](traits::CommandTransport). For a
//! 4-wire SPI link [`SpiInterface`](interface::SpiInterface) is provided:
//!
//! - SPI_MODE_0 is used (CPHL = 0, CPOL = 0)
//! - 8 bits per word, MSB first
//! - DC low for the register address, high for its parameters
//!
//! ### Vblank
//!
//! Mode transitions wait on the panel's vsync. Pass a
//! [`VblankSource`](traits::VblankSource), or a
//! [`TePinVblank`](vblank::TePinVblank) polling the TE line.
//!
//! # Examples
//!
//! ```ignore
//! use amoled_panel::{config::Builder, interface::SpiInterface, mode, prelude::*};
//! use amoled_panel::vblank::TePinVblank;
//!
//! let transport = SpiInterface::new(spi, dc, rst);
//! let vblank = TePinVblank::new(te, te_delay, || timer.now_us(), 50, None);
//! let config = Builder::new().op_hz(120).min_vrefresh(1).build()?;
//!
//! let mut panel = Panel::new(transport, vblank, delay, config);
//! panel.init()?;
//! panel.mode_set(mode::WQHD_120)?;
//! panel.enable()?;
//! panel.set_brightness(1024)?;
//!
//! // frames stopped arriving
//! panel.enable_self_refresh(true)?;
//! while let Some(event) = panel.take_event() {
//!     // forward to the compositor
//! }
//!
//! panel.mode_set(mode::WQHD_LP)?;
//! ```
#![no_std]

mod cmdset;
mod command;
mod traits;

pub mod brightness;
pub mod config;
pub mod engine;
pub mod error;
pub mod feature;
pub mod frequency;
pub mod highlight;
pub mod identity;
mod idle;
/// Interface for the physical connection between panel and the controlling device
pub mod interface;
mod low_power;
pub mod mode;
pub mod panel;
pub mod sequencer;
pub mod state;
pub mod thermal;
pub mod vblank;

#[cfg(test)]
mod test_utils;

pub use crate::traits::{CommandTransport, NoTemperatureSensor, TemperatureSensor, VblankSource};

pub mod prelude {
    pub use crate::brightness::AclMode;
    pub use crate::config::{Knobs, PanelConfig};
    pub use crate::error::ErrorKind;
    pub use crate::feature::{Feature, FeatureSet};
    pub use crate::mode::PanelMode;
    pub use crate::panel::{
        ClockAdjustment, ModeInProgress, Panel, PanelEvent, PanelState, PendingState,
    };
    pub use crate::traits::{CommandTransport, TemperatureSensor, VblankSource};
    pub use crate::SPI_MODE;
}

pub use crate::idle::{idle_vrefresh_for, EARLY_EXIT_THRESHOLD_US, IDLE_TE_VREFRESH};
pub use crate::low_power::LP_VREFRESH;

use embedded_hal::spi::{Mode, Phase, Polarity};

/// SPI mode -
/// For more infos see [Requirements: Command channel](index.html#command-channel)
pub const SPI_MODE: Mode = Mode {
    phase: Phase::CaptureOnFirstTransition,
    polarity: Polarity::IdleLow,
};
