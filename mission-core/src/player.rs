use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::coords::FineCoord3d;
use crate::io::{MissionReader, MissionWriter};
use crate::ships::ShipId;
use crate::{MissionError, Result};

pub const SHIELDS_MAX: i32 = 1000;
pub const WEAPON_MAX: u8 = 99;

/// Index byte meaning "not docked".
pub const NOT_DOCKED: u8 = 255;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaserType {
    #[default]
    Single,
    Double,
    Triple,
    Mega,
}

impl LaserType {
    pub(crate) fn from_raw(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Single),
            1 => Some(Self::Double),
            2 => Some(Self::Triple),
            3 => Some(Self::Mega),
            _ => None,
        }
    }

    pub(crate) fn to_raw(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineType {
    #[default]
    Standard,
    Boosted,
    Afterburner,
}

impl EngineType {
    fn from_raw(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::Standard),
            1 => Ok(Self::Boosted),
            2 => Ok(Self::Afterburner),
            _ => Err(MissionError::BadEngineType(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapons {
    pub ata: u8,
    pub atg: u8,
    pub mines: u8,
    pub bombs: u8,
    pub multi_ata: u8,
}

/// The player's start state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub pos: FineCoord3d,
    pub direction: u8,
    pub shields: i32,
    pub laser: LaserType,
    pub engine: EngineType,
    pub weapons: Weapons,
    /// Ship the player starts docked with, if any.
    #[serde(skip)]
    pub docked_ship: Option<ShipId>,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            pos: FineCoord3d::new(128 << 16, 128 << 16, 0),
            direction: 0,
            shields: SHIELDS_MAX,
            laser: LaserType::Single,
            engine: EngineType::Standard,
            weapons: Weapons::default(),
            docked_ship: None,
        }
    }
}

fn weapon_count(v: u8, err: fn(u8) -> MissionError) -> Result<u8> {
    if v > WEAPON_MAX {
        return Err(err(v));
    }
    Ok(v)
}

impl Player {
    /// Reads the 24-byte start block. The docking reference is stored
    /// elsewhere and resolved once ships are known.
    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let pos = FineCoord3d::read(r)?;
        if !pos.is_on_map() {
            return Err(MissionError::BadPlayerCoords);
        }
        let shields = r.read_i32()?;
        if !(0..=SHIELDS_MAX).contains(&shields) {
            return Err(MissionError::BadPlayerShields(shields));
        }
        let direction = r.read_u8()?;
        let laser = r.read_u8()?;
        let laser = LaserType::from_raw(laser).ok_or(MissionError::BadLaserType(laser))?;
        let engine = EngineType::from_raw(r.read_u8()?)?;
        let weapons = Weapons {
            ata: weapon_count(r.read_u8()?, MissionError::BadNumAta)?,
            atg: weapon_count(r.read_u8()?, MissionError::BadNumAtg)?,
            mines: weapon_count(r.read_u8()?, MissionError::BadNumMines)?,
            bombs: weapon_count(r.read_u8()?, MissionError::BadNumBombs)?,
            multi_ata: weapon_count(r.read_u8()?, MissionError::BadNumMultiAta)?,
        };

        Ok(Self {
            pos,
            direction,
            shields,
            laser,
            engine,
            weapons,
            docked_ship: None,
        })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        self.pos.write(w)?;
        w.write_i32(self.shields)?;
        w.write_u8(self.direction)?;
        w.write_u8(self.laser.to_raw())?;
        w.write_u8(self.engine as u8)?;
        w.write_u8(self.weapons.ata)?;
        w.write_u8(self.weapons.atg)?;
        w.write_u8(self.weapons.mines)?;
        w.write_u8(self.weapons.bombs)?;
        w.write_u8(self.weapons.multi_ata)
    }
}
