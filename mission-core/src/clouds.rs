use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::coords::CoarseCoord2d;
use crate::io::{MissionReader, MissionWriter};
use crate::{MissionError, Result};

pub const PYRAMID_LEVEL_MAX: u8 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudType {
    #[default]
    Clear,
    Scattered,
    Overcast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clouds {
    pub colours: [u8; 2],
    pub kind: CloudType,
}

impl Clouds {
    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let colours = [r.read_u8()?, r.read_u8()?];
        let kind = match r.read_u8()? {
            0 => CloudType::Clear,
            1 => CloudType::Scattered,
            2 => CloudType::Overcast,
            v => return Err(MissionError::BadCloudType(v)),
        };
        r.read_u8()?;
        Ok(Self { colours, kind })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        w.write_u8(self.colours[0])?;
        w.write_u8(self.colours[1])?;
        w.write_u8(self.kind as u8)?;
        w.write_u8(0)
    }
}

/// Where the map's pyramid stands, and how many tiers it has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pyramid {
    pub pos: CoarseCoord2d,
    pub level: u8,
}

impl Pyramid {
    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let pos = CoarseCoord2d::read(r)?;
        let level = r.read_u8()?;
        if level > PYRAMID_LEVEL_MAX {
            return Err(MissionError::BadPyramidLevel(level));
        }
        r.read_u8()?;
        Ok(Self { pos, level })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        self.pos.write(w)?;
        w.write_u8(self.level)?;
        w.write_u8(0)
    }
}
