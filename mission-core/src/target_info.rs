//! Target information shown when the player locks on to a map cell.
//!
//! The coordinates live in their own block near the start of the file;
//! the two texts of each entry are stored with the other strings and are
//! matched up by position.

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::coords::CoarseCoord2d;
use crate::io::{MissionReader, MissionWriter};
use crate::text::Text;
use crate::{MissionError, Result};

pub const TARGET_INFOS_MAX: usize = 6;
pub const BLOCK_SIZE: u64 = 4 + TARGET_INFOS_MAX as u64 * 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetInfo {
    pub texts: [Text; 2],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetInfos {
    infos: BTreeMap<CoarseCoord2d, TargetInfo>,
}

impl TargetInfos {
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Entries in row-major coordinate order, which is also file order.
    pub fn iter(&self) -> impl Iterator<Item = (CoarseCoord2d, &TargetInfo)> {
        self.infos.iter().map(|(c, i)| (*c, i))
    }

    pub fn in_area(
        &self,
        min: CoarseCoord2d,
        max: CoarseCoord2d,
    ) -> impl Iterator<Item = (CoarseCoord2d, &TargetInfo)> {
        let rows = (min.x <= max.x && min.y <= max.y).then(|| self.infos.range(min..=max));
        rows.into_iter()
            .flatten()
            .filter(move |(c, _)| c.within(min, max))
            .map(|(c, i)| (*c, i))
    }

    pub fn get(&self, coords: CoarseCoord2d) -> Option<&TargetInfo> {
        self.infos.get(&coords)
    }

    pub fn get_mut(&mut self, coords: CoarseCoord2d) -> Option<&mut TargetInfo> {
        self.infos.get_mut(&coords)
    }

    pub fn add(&mut self, coords: CoarseCoord2d) -> Result<&mut TargetInfo> {
        if self.infos.contains_key(&coords) {
            return Err(MissionError::TargetInfoExists(coords.x, coords.y));
        }
        if self.infos.len() >= TARGET_INFOS_MAX {
            return Err(MissionError::TargetInfosFull);
        }
        Ok(self.infos.entry(coords).or_default())
    }

    pub fn remove(&mut self, coords: CoarseCoord2d) -> Option<TargetInfo> {
        self.infos.remove(&coords)
    }

    pub fn relocate(&mut self, from: CoarseCoord2d, to: CoarseCoord2d) -> Result<bool> {
        if from == to {
            return Ok(self.infos.contains_key(&from));
        }
        if self.infos.contains_key(&to) {
            return Err(MissionError::TargetInfoExists(to.x, to.y));
        }
        match self.infos.remove(&from) {
            Some(info) => {
                self.infos.insert(to, info);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reads the coordinate block, in file order.
    pub(crate) fn read_coords<R: Read>(r: &mut MissionReader<R>) -> Result<Vec<CoarseCoord2d>> {
        let start = r.pos();
        let count = r.read_i32()?;
        let count = usize::try_from(count)
            .ok()
            .filter(|&n| n <= TARGET_INFOS_MAX)
            .ok_or(MissionError::BadNumTargetInfos(count))?;

        let mut coords: Vec<CoarseCoord2d> = Vec::with_capacity(count);
        for _ in 0..count {
            let c = CoarseCoord2d::read(r)?;
            if coords.contains(&c) {
                return Err(MissionError::BadTargetInfoCoords(c.x, c.y));
            }
            coords.push(c);
        }
        r.seek_to(start + BLOCK_SIZE)?;
        Ok(coords)
    }

    pub(crate) fn from_parts(parts: impl IntoIterator<Item = (CoarseCoord2d, TargetInfo)>) -> Self {
        Self {
            infos: parts.into_iter().collect(),
        }
    }

    pub(crate) fn write_coords<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        let start = w.pos();
        w.write_i32(self.infos.len() as i32)?;
        for coords in self.infos.keys() {
            coords.write(w)?;
        }
        w.pad_to(start + BLOCK_SIZE)
    }
}

#[derive(Serialize)]
struct Entry<'a> {
    coords: CoarseCoord2d,
    texts: &'a [Text; 2],
}

impl Serialize for TargetInfos {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.infos.len()))?;
        for (coords, info) in self.iter() {
            seq.serialize_element(&Entry {
                coords,
                texts: &info.texts,
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_enforces_limits() {
        let mut infos = TargetInfos::default();
        for i in 0..TARGET_INFOS_MAX as u8 {
            infos.add(CoarseCoord2d::new(i, i)).unwrap();
        }
        assert!(matches!(
            infos.add(CoarseCoord2d::new(1, 1)),
            Err(MissionError::TargetInfoExists(1, 1))
        ));
        assert!(matches!(
            infos.add(CoarseCoord2d::new(9, 9)),
            Err(MissionError::TargetInfosFull)
        ));
    }

    #[test]
    fn area_iteration() {
        let mut infos = TargetInfos::default();
        infos.add(CoarseCoord2d::new(5, 5)).unwrap().texts[0].set_string("Depot");
        infos.add(CoarseCoord2d::new(50, 6)).unwrap();
        infos.add(CoarseCoord2d::new(6, 60)).unwrap();

        let hits: Vec<CoarseCoord2d> = infos
            .in_area(CoarseCoord2d::new(0, 0), CoarseCoord2d::new(10, 10))
            .map(|(c, _)| c)
            .collect();
        assert_eq!(hits, vec![CoarseCoord2d::new(5, 5)]);
    }

    #[test]
    fn relocate_keeps_texts() {
        let mut infos = TargetInfos::default();
        infos.add(CoarseCoord2d::new(1, 2)).unwrap().texts[1].set_string("Bridge");
        infos.add(CoarseCoord2d::new(3, 4)).unwrap();
        assert!(infos
            .relocate(CoarseCoord2d::new(1, 2), CoarseCoord2d::new(7, 7))
            .unwrap());
        assert_eq!(infos.get(CoarseCoord2d::new(7, 7)).unwrap().texts[1].string(), "Bridge");
        assert!(infos
            .relocate(CoarseCoord2d::new(7, 7), CoarseCoord2d::new(3, 4))
            .is_err());
    }

    #[test]
    fn duplicate_coords_are_rejected() {
        let mut bytes = vec![0u8; BLOCK_SIZE as usize];
        bytes[0..4].copy_from_slice(&2i32.to_le_bytes());
        bytes[4..8].copy_from_slice(&[3, 4, 3, 4]);
        let err = TargetInfos::read_coords(&mut MissionReader::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, MissionError::BadTargetInfoCoords(3, 4)));

        bytes[0..4].copy_from_slice(&7i32.to_le_bytes());
        let err = TargetInfos::read_coords(&mut MissionReader::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, MissionError::BadNumTargetInfos(7)));
    }

    #[test]
    fn coords_block_is_sorted() {
        let infos = TargetInfos::from_parts([
            (CoarseCoord2d::new(9, 9), TargetInfo::default()),
            (CoarseCoord2d::new(1, 1), TargetInfo::default()),
        ]);
        let mut w = MissionWriter::new(Vec::new());
        infos.write_coords(&mut w).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len() as u64, BLOCK_SIZE);
        assert_eq!(&bytes[4..8], &[1, 1, 9, 9]);
    }
}
