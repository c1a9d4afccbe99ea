use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::io::{MissionReader, MissionWriter};
use crate::performance::Probability;
use crate::player::LaserType;
use crate::{MissionError, Result};

pub const FIRE_RATE_MAX: u8 = 100;

/// Ground defence settings for the whole map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defences {
    pub laser: LaserType,
    pub fire_rate: u8,
    pub missile_prob: Probability,
}

impl Default for Defences {
    fn default() -> Self {
        Self {
            laser: LaserType::Single,
            fire_rate: 20,
            missile_prob: Probability::NEVER,
        }
    }
}

impl Defences {
    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let laser = r.read_u8()?;
        let laser = LaserType::from_raw(laser).ok_or(MissionError::BadDefenceLaserType(laser))?;
        let fire_rate = r.read_u8()?;
        if fire_rate > FIRE_RATE_MAX {
            return Err(MissionError::BadDefenceFireRate(fire_rate));
        }
        r.read_u16()?;
        let missile_prob = Probability::read(r, MissionError::BadDefenceMissileProb)?;
        Ok(Self {
            laser,
            fire_rate,
            missile_prob,
        })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        w.write_u8(self.laser.to_raw())?;
        w.write_u8(self.fire_rate)?;
        w.write_u16(0)?;
        w.write_i32(self.missile_prob.raw())
    }
}
