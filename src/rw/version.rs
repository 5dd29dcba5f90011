//! RenderWare version ids and the version/device to game/platform tables.
//!
//! RenderWare packed its library version into every section header using
//! two schemes over the years. Old streams (3.0 and earlier toolchains)
//! store the version shifted down a byte; later streams pack it together
//! with a build number. Both unpack to the same nibble layout, printed as
//! `major.minor.revision.build`, e.g. `3.6.0.3` for San Andreas.

use std::fmt;

/// A RenderWare stream version, kept as the raw on-disk id so writing a
/// file back is lossless even for ids outside the known tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RwVersion {
    id: u32,
}

impl RwVersion {
    pub fn from_id(id: u32) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The version packed into `0xVJNBB` nibble form (V=major, J=minor,
    /// N=revision, BB=build), e.g. `0x36003`.
    pub fn packed(&self) -> u32 {
        if self.id & 0xFFFF0000 != 0 {
            let mut packed = ((self.id >> 14) & 0x3FF00) + 0x30000;
            packed |= (self.id >> 16) & 0x3F;
            packed
        } else {
            self.id << 8
        }
    }

    pub fn major(&self) -> u8 {
        ((self.packed() >> 16) & 0xFF) as u8
    }

    pub fn minor(&self) -> u8 {
        ((self.packed() >> 8) & 0xFF) as u8
    }

    pub fn build(&self) -> u8 {
        (self.packed() & 0xFF) as u8
    }
}

impl fmt::Display for RwVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minor = self.minor();
        write!(
            f,
            "{}.{}.{}.{}",
            self.major(),
            minor >> 4,
            minor & 0xF,
            self.build()
        )
    }
}

/// The games whose TXD/COL files this crate recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Game {
    GtaIII,
    ViceCity,
    SanAndreas,
    LibertyCityStories,
    ViceCityStories,
    StateOfLiberty,
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Game::GtaIII => "GTA III",
            Game::ViceCity => "Vice City",
            Game::SanAndreas => "San Andreas",
            Game::LibertyCityStories => "Liberty City Stories",
            Game::ViceCityStories => "Vice City Stories",
            Game::StateOfLiberty => "State of Liberty",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Platform {
    PcD3d8,
    PcD3d9,
    Ps2,
    Xbox,
    GameCube,
    Psp,
    Android,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::PcD3d8 => "PC (Direct3D 8)",
            Platform::PcD3d9 => "PC (Direct3D 9)",
            Platform::Ps2 => "PlayStation 2",
            Platform::Xbox => "Xbox",
            Platform::GameCube => "GameCube",
            Platform::Psp => "PSP",
            Platform::Android => "Android",
        };
        f.write_str(name)
    }
}

/// Every `(version_id, device_id)` pair observed in shipped game files.
///
/// The device id is the upper half of the dictionary struct word; files
/// from the III-era toolchain leave it zero.
pub const KNOWN_VERSIONS: &[(u32, u16, Game, Platform)] = &[
    (0x00000310, 0, Game::GtaIII, Platform::Ps2),
    (0x0C02FFFF, 0, Game::GtaIII, Platform::PcD3d8),
    (0x1003FFFF, 0, Game::ViceCity, Platform::PcD3d8),
    (0x1003FFFF, 1, Game::StateOfLiberty, Platform::PcD3d8),
    (0x1003FFFF, 3, Game::ViceCity, Platform::GameCube),
    (0x1003FFFF, 6, Game::ViceCity, Platform::Ps2),
    (0x1803FFFF, 1, Game::SanAndreas, Platform::PcD3d8),
    (0x1803FFFF, 2, Game::SanAndreas, Platform::PcD3d9),
    (0x1803FFFF, 6, Game::SanAndreas, Platform::Ps2),
    (0x1803FFFF, 8, Game::SanAndreas, Platform::Xbox),
    (0x00035000, 8, Game::GtaIII, Platform::Xbox),
    (0x00035000, 5, Game::LibertyCityStories, Platform::Psp),
    (0x00035002, 5, Game::ViceCityStories, Platform::Psp),
    (0x00034005, 2, Game::SanAndreas, Platform::Android),
];

/// Forward lookup: which game and platform wrote a stream with this
/// version and device id. `None` means the pair is outside the table;
/// parsers record a [crate::Warning::UnknownVariant] and carry on.
pub fn detect_version(version_id: u32, device_id: u16) -> Option<(Game, Platform)> {
    KNOWN_VERSIONS
        .iter()
        .find(|(vid, did, _, _)| *vid == version_id && *did == device_id)
        .map(|(_, _, game, platform)| (*game, *platform))
}

/// Reverse lookup: the version and device id to stamp on a file meant
/// for the given game and platform.
pub fn recommended_version(game: Game, platform: Platform) -> Option<(u32, u16)> {
    KNOWN_VERSIONS
        .iter()
        .find(|(_, _, g, p)| *g == game && *p == platform)
        .map(|(vid, did, _, _)| (*vid, *did))
}
