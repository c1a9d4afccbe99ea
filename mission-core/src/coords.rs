use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::io::{MissionReader, MissionWriter};
use crate::Result;

/// Number of coarse grid cells along each axis of the map.
pub const MAP_SIZE: u32 = 256;

/// Fine coordinates carry 16 fractional bits per coarse cell.
pub const FINE_SHIFT: u32 = 16;

pub const FINE_MAP_LIMIT: i32 = (MAP_SIZE << FINE_SHIFT) as i32;

/// Grid cell position, one byte per axis.
///
/// Ordered row-major (y, then x) so that a `BTreeMap` keyed by it can be
/// scanned one row range at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoarseCoord2d {
    pub x: u8,
    pub y: u8,
}

impl CoarseCoord2d {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// True if this cell lies inside the inclusive rectangle `min..=max`.
    pub fn within(self, min: CoarseCoord2d, max: CoarseCoord2d) -> bool {
        (min.x..=max.x).contains(&self.x) && (min.y..=max.y).contains(&self.y)
    }

    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let x = r.read_u8()?;
        let y = r.read_u8()?;
        Ok(Self { x, y })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        w.write_u8(self.x)?;
        w.write_u8(self.y)
    }
}

impl PartialOrd for CoarseCoord2d {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CoarseCoord2d {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoarseCoord3d {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl CoarseCoord3d {
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }

    pub fn to_2d(self) -> CoarseCoord2d {
        CoarseCoord2d::new(self.x, self.y)
    }

    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let x = r.read_u8()?;
        let y = r.read_u8()?;
        let z = r.read_u8()?;
        Ok(Self { x, y, z })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        w.write_u8(self.x)?;
        w.write_u8(self.y)?;
        w.write_u8(self.z)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FineCoord3d {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl FineCoord3d {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn from_coarse(c: CoarseCoord3d) -> Self {
        Self {
            x: i32::from(c.x) << FINE_SHIFT,
            y: i32::from(c.y) << FINE_SHIFT,
            z: i32::from(c.z) << FINE_SHIFT,
        }
    }

    /// Truncates towards the containing grid cell. Callers are expected to
    /// have checked `is_on_map` first.
    pub fn to_coarse(self) -> CoarseCoord3d {
        let axis = |v: i32| (v >> FINE_SHIFT).clamp(0, 255) as u8;
        CoarseCoord3d::new(axis(self.x), axis(self.y), axis(self.z))
    }

    pub fn is_on_map(self) -> bool {
        (0..FINE_MAP_LIMIT).contains(&self.x)
            && (0..FINE_MAP_LIMIT).contains(&self.y)
            && self.z >= 0
    }

    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let x = r.read_i32()?;
        let y = r.read_i32()?;
        let z = r.read_i32()?;
        Ok(Self { x, y, z })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        w.write_i32(self.x)?;
        w.write_i32(self.y)?;
        w.write_i32(self.z)
    }
}
