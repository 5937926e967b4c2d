//! Feature diff & commit engine
//!
//! Moves the panel from the committed feature mirror to a requested feature set
//! with as few register writes as possible. The command groups are kept in one
//! ordered table, [GROUPS]: the panel applies overrides in write order, so later
//! groups rely on what earlier ones set up.

use log::{debug, warn};

use crate::command::{Command, FREQ_UPDATE};
use crate::config::Knobs;
use crate::error::{BatchOverflow, ErrorKind};
use crate::feature::FeatureSet;
use crate::frequency;
use crate::identity::{CompensationRegime, Material, PanelIdentity};
use crate::sequencer::{CmdEntry, CommandBatch, Sequencer};
use crate::state::{FeatureStore, RefreshState};
use crate::traits::CommandTransport;

/// Inputs of one commit, shared by all command groups
#[derive(Debug, Clone, Copy)]
pub(crate) struct CommitContext<'a> {
    /// Features that differ from the mirror
    pub changed: FeatureSet,
    /// Features being committed
    pub features: FeatureSet,
    pub vrefresh: u32,
    pub idle_vrefresh: u32,
    pub identity: &'a PanelIdentity,
    pub knobs: &'a Knobs,
}

type Gate = fn(&CommitContext<'_>) -> bool;
type Emitter = fn(&CommitContext<'_>, &mut CommandBatch) -> Result<(), BatchOverflow>;

/// One command group of a commit
pub(crate) struct CommandGroup {
    pub name: &'static str,
    gate: Gate,
    emit: Emitter,
}

/// Command groups in issue order
pub(crate) const GROUPS: [CommandGroup; 5] = [
    CommandGroup {
        name: "te",
        gate: |ctx| ctx.changed.early_exit || ctx.changed.low_speed,
        emit: emit_te,
    },
    CommandGroup {
        name: "compensation",
        gate: |ctx| match ctx.identity.caps.compensation {
            CompensationRegime::OnOff => ctx.changed.irc_off,
            CompensationRegime::FlatZ => ctx.changed.irc_z_mode,
        },
        emit: emit_compensation,
    },
    CommandGroup {
        name: "op speed",
        gate: |ctx| ctx.changed.low_speed,
        emit: emit_op_speed,
    },
    CommandGroup {
        name: "early exit",
        gate: |_| true,
        emit: emit_early_exit,
    },
    CommandGroup {
        name: "frequency",
        gate: |_| true,
        emit: |ctx, batch| frequency::emit(&ctx.features, ctx.vrefresh, ctx.idle_vrefresh, batch),
    },
];

/// Peak refresh rate of the speed class
pub fn peak_vrefresh(low_speed: bool) -> u32 {
    if low_speed {
        60
    } else {
        120
    }
}

fn emit_te(ctx: &CommitContext<'_>, batch: &mut CommandBatch) -> Result<(), BatchOverflow> {
    if ctx.features.early_exit && !ctx.knobs.force_changeable_te {
        let peak = peak_vrefresh(ctx.features.low_speed);
        // fixed TE, peak marker is set when running below peak
        batch.add(Command::TeControl, &[0x51])?;
        batch.offset(0x0002, Command::TeControl)?;
        batch.add(
            Command::TeControl,
            &[if peak == ctx.vrefresh { 0x00 } else { 0x01 }],
        )?;
        batch.offset(0x0008, Command::TeControl)?;
        batch.add(
            Command::TeControl,
            &[0x0B, 0xBB, 0x00, 0x2F, 0x0B, 0xBB, 0x00, 0x2F],
        )
    } else {
        // changeable TE
        batch.add(Command::TeControl, &[0x04])?;
        batch.offset(0x0004, Command::TeControl)?;
        batch.add(Command::TeControl, &[0x0B, 0xBB, 0x00, 0x2F])
    }
}

const IRC_FLAT_Z_E6: [CmdEntry; 3] = [
    CmdEntry::new(Command::IrCompensation, &[0xBE, 0x98]),
    CmdEntry::new(Command::IrCompensation, &[0xF1, 0xC1]),
    CmdEntry::new(Command::GlobalParam, &[0x02, 0xF3, 0x68]),
];
const IRC_FLAT_Z: [CmdEntry; 3] = [
    CmdEntry::new(Command::IrCompensation, &[0xF1, 0xC1]),
    CmdEntry::new(Command::GlobalParam, &[0x02, 0xF3, 0x68]),
    CmdEntry::new(
        Command::GammaCompensation,
        &[0x82, 0x70, 0x23, 0x91, 0x88, 0x3C],
    ),
];
const IRC_FLAT_E6: [CmdEntry; 3] = [
    CmdEntry::new(Command::IrCompensation, &[0x00, 0x00]),
    CmdEntry::new(Command::GlobalParam, &[0x02, 0xF3, 0x68]),
    CmdEntry::new(
        Command::GammaCompensation,
        &[0x71, 0x81, 0x59, 0x90, 0xA2, 0x80],
    ),
];
const IRC_FLAT: [CmdEntry; 3] = [
    CmdEntry::new(Command::IrCompensation, &[0x00, 0x00]),
    CmdEntry::new(Command::GlobalParam, &[0x02, 0xF3, 0x68]),
    CmdEntry::new(
        Command::GammaCompensation,
        &[0x77, 0x81, 0x23, 0x8C, 0x99, 0x3C],
    ),
];

/// Flat / flat-Z payload for a material
pub(crate) fn flat_z_table(z_mode: bool, material: Material) -> &'static [CmdEntry] {
    match (z_mode, material) {
        (true, Material::E6) => &IRC_FLAT_Z_E6,
        (true, _) => &IRC_FLAT_Z,
        (false, Material::E6) => &IRC_FLAT_E6,
        (false, _) => &IRC_FLAT,
    }
}

fn emit_compensation(
    ctx: &CommitContext<'_>,
    batch: &mut CommandBatch,
) -> Result<(), BatchOverflow> {
    match ctx.identity.caps.compensation {
        CompensationRegime::OnOff => {
            batch.offset(0x019B, Command::IrCompensation)?;
            batch.add(
                Command::IrCompensation,
                &[if ctx.features.irc_off { 0x07 } else { 0x27 }],
            )
        }
        CompensationRegime::FlatZ => {
            batch.offset(0x0200, Command::IrCompensation)?;
            for entry in flat_z_table(ctx.features.irc_z_mode, ctx.identity.material) {
                batch.add(entry.command, entry.params)?;
            }
            Ok(())
        }
    }
}

fn emit_op_speed(ctx: &CommitContext<'_>, batch: &mut CommandBatch) -> Result<(), BatchOverflow> {
    batch.add(Command::OperatingMode, &[0x01])?;
    batch.add(
        Command::Frequency,
        &[if ctx.features.low_speed { 0x18 } else { 0x00 }],
    )
}

// indexed by [early exit][hbm]
const EARLY_EXIT_MODE: [[[u8; 5]; 2]; 2] = [
    [
        [0x21, 0x81, 0x83, 0x03, 0x03],
        [0x21, 0x80, 0x83, 0x03, 0x01],
    ],
    [
        [0x21, 0x01, 0x83, 0x03, 0x03],
        [0x21, 0x00, 0x83, 0x03, 0x01],
    ],
];

// indexed by [low speed][hbm]
const EARLY_EXIT_STEPS: [[[u8; 12]; 2]; 2] = [
    [
        [0x00, 0x00, 0x00, 0x02, 0x00, 0x06, 0x00, 0x16, 0x00, 0x2E, 0x00, 0xEE],
        [0x00, 0x00, 0x00, 0x01, 0x00, 0x03, 0x00, 0x0B, 0x00, 0x17, 0x00, 0x77],
    ],
    [
        [0x00, 0x00, 0x00, 0x04, 0x00, 0x08, 0x00, 0x14, 0x00, 0x2C, 0x00, 0xEC],
        [0x00, 0x00, 0x00, 0x02, 0x00, 0x04, 0x00, 0x0A, 0x00, 0x16, 0x00, 0x76],
    ],
];

fn emit_early_exit(
    ctx: &CommitContext<'_>,
    batch: &mut CommandBatch,
) -> Result<(), BatchOverflow> {
    let ee = usize::from(ctx.features.early_exit);
    let hbm = usize::from(ctx.features.high_brightness);
    let ns = usize::from(ctx.features.low_speed);
    let val = if ctx.features.early_exit { 0x22 } else { 0x00 };

    batch.add(Command::FrameControl, &EARLY_EXIT_MODE[ee][hbm])?;
    batch.offset(0x0010, Command::FrameControl)?;
    batch.add(Command::FrameControl, &[val])?;
    batch.offset(0x0082, Command::FrameControl)?;
    batch.add(Command::FrameControl, &[val; 4])?;
    batch.offset(
        if ctx.features.low_speed { 0x004E } else { 0x001E },
        Command::FrameControl,
    )?;
    batch.add(Command::FrameControl, &EARLY_EXIT_STEPS[ns][hbm])
}

/// Builds the commit batch for `ctx`
///
/// Returns `None` if no group had anything to send.
pub(crate) fn build_batch(ctx: &CommitContext<'_>) -> Result<Option<CommandBatch>, BatchOverflow> {
    let mut batch = CommandBatch::new();
    let mut emitted = false;
    batch.unlocked(|b| {
        for group in GROUPS.iter().filter(|g| (g.gate)(ctx)) {
            let before = b.len();
            (group.emit)(ctx, b)?;
            if b.len() > before {
                debug!("commit group {}: {} packets", group.name, b.len() - before);
                emitted = true;
            }
        }
        b.add(Command::FrequencyUpdate, &FREQ_UPDATE)
    })?;
    Ok(emitted.then_some(batch))
}

/// Owner of the feature store and the only writer of its committed half
#[derive(Debug, Clone, Default)]
pub struct FeatureEngine {
    store: FeatureStore,
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn desired(&self) -> &FeatureSet {
        self.store.desired()
    }

    pub fn desired_mut(&mut self) -> &mut FeatureSet {
        self.store.desired_mut()
    }

    pub fn committed(&self) -> &FeatureSet {
        self.store.committed()
    }

    pub fn refresh(&self) -> &RefreshState {
        self.store.refresh()
    }

    pub fn idle_target(&self) -> u32 {
        self.store.idle_target()
    }

    pub fn set_idle_target(&mut self, idle_target: u32) {
        self.store.set_idle_target(idle_target);
    }

    /// Commits `features` at `vrefresh` / `idle_vrefresh`
    ///
    /// With `enforce` every group is sent regardless of the mirror. Returns
    /// whether anything was sent.
    ///
    /// The mirror is updated before the batch goes out. On a transport error it
    /// already holds `features`, the caller has to enforce the next commit.
    pub fn commit<T: CommandTransport>(
        &mut self,
        sequencer: &mut Sequencer<T>,
        identity: &PanelIdentity,
        knobs: &Knobs,
        features: FeatureSet,
        vrefresh: u32,
        idle_vrefresh: u32,
        enforce: bool,
    ) -> Result<bool, ErrorKind<T::Error>> {
        let idle_vrefresh = if idle_vrefresh != 0 && idle_vrefresh >= vrefresh {
            warn!("idle {idle_vrefresh}Hz not below {vrefresh}Hz, idle disabled");
            0
        } else {
            idle_vrefresh
        };
        let refresh = RefreshState {
            vrefresh,
            idle_vrefresh,
        };

        let changed = if enforce {
            FeatureSet::FULL
        } else {
            let changed = features.changed(self.store.committed());
            if changed.is_empty() && refresh == *self.store.refresh() {
                return Ok(false);
            }
            changed
        };

        let ctx = CommitContext {
            changed,
            features,
            vrefresh,
            idle_vrefresh,
            identity,
            knobs,
        };
        let batch = build_batch(&ctx)?;
        self.store.latch(features, refresh);

        let Some(batch) = batch else {
            return Ok(false);
        };

        debug!(
            "commit: op={} ee={} hbm={} irc={} fi={} fps={} idle_fps={}",
            if features.low_speed { "ns" } else { "hs" },
            if features.early_exit { "on" } else { "off" },
            if features.high_brightness { "on" } else { "off" },
            compensation_label(identity, &features),
            if features.auto_frame_insertion { "auto" } else { "manual" },
            vrefresh,
            idle_vrefresh,
        );
        sequencer.send(&batch)?;
        Ok(true)
    }

    /// Records that the panel left low power at its fixed 30Hz timing
    pub(crate) fn mark_low_power_timing(&mut self) {
        self.store.latch_refresh(RefreshState {
            vrefresh: 30,
            idle_vrefresh: self.store.refresh().idle_vrefresh,
        });
    }

    /// Records that the panel dropped idle stepping on its own
    pub(crate) fn mark_idle_off(&mut self) {
        self.store.latch_refresh(RefreshState {
            vrefresh: self.store.refresh().vrefresh,
            idle_vrefresh: 0,
        });
    }

    /// Forgets the mirror after the panel was powered down
    pub(crate) fn mark_powered_down(&mut self) {
        self.store.latch(FeatureSet::EMPTY, RefreshState::default());
    }
}

fn compensation_label(identity: &PanelIdentity, features: &FeatureSet) -> &'static str {
    match identity.caps.compensation {
        CompensationRegime::OnOff if features.irc_off => "off",
        CompensationRegime::OnOff => "on",
        CompensationRegime::FlatZ if features.irc_z_mode => "flat_z",
        CompensationRegime::FlatZ => "flat",
    }
}
