//! Panel hardware revision and material, resolved once at init
//!
//! Most command tables differ between early prototypes and later builds. Instead
//! of sprinkling revision checks through the command builders everything that
//! depends on the hardware is resolved here into a [Capabilities] descriptor.

use bit_field::BitField;
use log::{debug, warn};

/// Hardware revision, ordered from oldest to newest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PanelRev {
    Proto1,
    Proto1_1,
    Proto1_2,
    Evt1,
    Evt1_1,
    Evt1_2,
    Dvt1,
    Dvt1_1,
    Pvt,
    Mp,
    /// Unknown build code, treated as the newest revision
    Latest,
}

impl PanelRev {
    /// Decodes the revision from the build code byte (register 0xDB)
    pub fn from_build_code(build_code: u8) -> Self {
        // bits 7..5 form rev[4:2], bits 3..2 form rev[1:0]
        let mut rev = 0u8;
        rev.set_bits(2..5, build_code.get_bits(5..8));
        rev.set_bits(0..2, build_code.get_bits(2..4));
        match rev {
            0x00 => PanelRev::Proto1,
            0x01 => PanelRev::Proto1_1,
            0x02 => PanelRev::Proto1_2,
            0x08 => PanelRev::Evt1,
            0x09 => PanelRev::Evt1_1,
            0x0A => PanelRev::Evt1_2,
            0x0C => PanelRev::Dvt1,
            0x0D => PanelRev::Dvt1_1,
            0x10 => PanelRev::Pvt,
            0x14 => PanelRev::Mp,
            _ => {
                warn!("unknown panel rev {rev:#x}, assuming latest");
                PanelRev::Latest
            }
        }
    }
}

/// Emissive material of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    E6,
    E7Doe,
    E7,
    Lpc5,
}

impl Material {
    /// Maps the full identifier `0x<DA><DB><DC>` to a material
    pub fn from_id(id: u32) -> Self {
        match id {
            0x000A_4000 => Material::E6,
            0x000A_4020 => Material::E7Doe,
            0x000A_4420 => Material::E7,
            0x000A_4520 => Material::Lpc5,
            _ => {
                warn!("unknown material from panel ({id:#x}), default to E7");
                Material::E7
            }
        }
    }
}

/// How IR compensation is switched on this revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationRegime {
    /// IR compensation is turned on/off, driven by `IRCompensationOff`
    OnOff,
    /// IR compensation is always on, flat vs flat-Z mode, driven by `IRCompensationZMode`
    FlatZ,
}

/// Automatic current limiting table of a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclTable {
    /// Single strength, enabled above `threshold`
    Fixed { threshold: u16, setting: u8 },
    /// Strength picked from mode and backlight level
    Tiered,
}

/// Everything that depends on revision and material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub compensation: CompensationRegime,
    pub acl: AclTable,
    /// Zonal attenuation follows the on-pixel-ratio read back instead of ACL alone
    pub za_needs_opr: bool,
    /// Zonal attenuation is re-evaluated whenever the ACL setting changes
    pub za_follows_acl: bool,
    /// Register value enabling zonal attenuation
    pub za_on_value: u8,
    /// Temperature gain register is present
    pub thermal_compensation: bool,
}

/// Identity of one panel instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelIdentity {
    pub id: u32,
    pub rev: PanelRev,
    pub material: Material,
    pub caps: Capabilities,
}

impl PanelIdentity {
    /// Resolves revision, material and capabilities from the identifier
    ///
    /// The identifier is laid out as `0x<DA><DB><DC>`, the build code is the middle byte.
    pub fn from_id(id: u32) -> Self {
        let build_code = id.get_bits(8..16) as u8;
        let rev = PanelRev::from_build_code(build_code);
        let material = Material::from_id(id);
        let caps = Capabilities::resolve(rev);
        debug!("panel id {id:#08x}: rev {rev:?}, material {material:?}");
        PanelIdentity {
            id,
            rev,
            material,
            caps,
        }
    }

    /// Identity with explicit revision and material, skipping the id decode
    pub fn new(rev: PanelRev, material: Material) -> Self {
        PanelIdentity {
            id: 0,
            rev,
            material,
            caps: Capabilities::resolve(rev),
        }
    }
}

impl Capabilities {
    fn resolve(rev: PanelRev) -> Self {
        let acl = match rev {
            PanelRev::Proto1 => AclTable::Fixed {
                threshold: 3917,
                setting: 0x01,
            },
            PanelRev::Proto1_1 => AclTable::Fixed {
                threshold: 3781,
                setting: 0x02,
            },
            _ => AclTable::Tiered,
        };
        Capabilities {
            compensation: if rev < PanelRev::Evt1 {
                CompensationRegime::OnOff
            } else {
                CompensationRegime::FlatZ
            },
            acl,
            za_needs_opr: rev == PanelRev::Proto1,
            za_follows_acl: rev < PanelRev::Evt1,
            za_on_value: if rev == PanelRev::Proto1 { 0x21 } else { 0x11 },
            thermal_compensation: rev >= PanelRev::Evt1_1,
        }
    }
}
