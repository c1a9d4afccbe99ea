//! Ship flight paths.
//!
//! Paths and waypoints are addressed by stable handles. On disk they are
//! referred to by position, so `pre_write` snapshots the current positions
//! into a `PathIndices` table which the ship writer needs.

use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};

use crate::coords::CoarseCoord3d;
use crate::io::{MissionReader, MissionWriter};
use crate::{MissionError, Result};

pub const PATHS_MAX: usize = 8;
pub const WAYPOINTS_MAX: usize = 64;

pub const BLOCK_SIZE: u64 = 4 + (PATHS_MAX as u64) * (4 + (WAYPOINTS_MAX as u64) * 3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PathId(u32);

/// Identifies a waypoint within its own path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WaypointId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Waypoint {
    pub id: WaypointId,
    pub coords: CoarseCoord3d,
}

#[derive(Debug, Clone, Serialize)]
pub struct Path {
    id: PathId,
    waypoints: Vec<Waypoint>,
    #[serde(skip)]
    next_waypoint: u32,
}

impl Path {
    fn new(id: PathId) -> Self {
        Self {
            id,
            waypoints: Vec::new(),
            next_waypoint: 0,
        }
    }

    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoint(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.id == id)
    }

    pub fn add_waypoint(&mut self, coords: CoarseCoord3d) -> Result<WaypointId> {
        self.insert_waypoint(self.waypoints.len(), coords)
    }

    /// Inserts before position `index` (clamped to the end).
    pub fn insert_waypoint(&mut self, index: usize, coords: CoarseCoord3d) -> Result<WaypointId> {
        if self.waypoints.len() >= WAYPOINTS_MAX {
            return Err(MissionError::WaypointsFull);
        }
        let id = WaypointId(self.next_waypoint);
        self.next_waypoint += 1;
        let index = index.min(self.waypoints.len());
        self.waypoints.insert(index, Waypoint { id, coords });
        Ok(id)
    }

    pub fn set_coords(&mut self, id: WaypointId, coords: CoarseCoord3d) -> bool {
        match self.waypoints.iter_mut().find(|w| w.id == id) {
            Some(w) => {
                w.coords = coords;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_waypoint(&mut self, id: WaypointId) -> Option<Waypoint> {
        let pos = self.waypoints.iter().position(|w| w.id == id)?;
        Some(self.waypoints.remove(pos))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Paths {
    paths: Vec<Path>,
    #[serde(skip)]
    next_path: u32,
}

/// Positions of every path and waypoint, captured just before writing.
#[derive(Debug, Clone, Default)]
pub struct PathIndices {
    paths: HashMap<PathId, (u8, HashMap<WaypointId, u8>)>,
}

impl PathIndices {
    pub fn path(&self, id: PathId) -> Option<u8> {
        self.paths.get(&id).map(|(i, _)| *i)
    }

    pub fn waypoint(&self, path: PathId, id: WaypointId) -> Option<u8> {
        self.paths.get(&path)?.1.get(&id).copied()
    }
}

impl Paths {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter()
    }

    pub fn get(&self, id: PathId) -> Option<&Path> {
        self.paths.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PathId) -> Option<&mut Path> {
        self.paths.iter_mut().find(|p| p.id == id)
    }

    pub fn add(&mut self) -> Result<PathId> {
        if self.paths.len() >= PATHS_MAX {
            return Err(MissionError::PathsFull);
        }
        let id = PathId(self.next_path);
        self.next_path += 1;
        self.paths.push(Path::new(id));
        Ok(id)
    }

    /// Removes a path. Ships flying it must be redirected by the caller;
    /// `Mission::remove_path` does both.
    pub(crate) fn remove(&mut self, id: PathId) -> Option<Path> {
        let pos = self.paths.iter().position(|p| p.id == id)?;
        Some(self.paths.remove(pos))
    }

    pub fn contains(&self, path: PathId, waypoint: WaypointId) -> bool {
        self.get(path).is_some_and(|p| p.waypoint(waypoint).is_some())
    }

    /// Looks up the handles for an on-disk path/waypoint index pair.
    pub(crate) fn resolve(&self, path: u8, waypoint: u8) -> Result<(PathId, WaypointId)> {
        let p = self
            .paths
            .get(usize::from(path))
            .ok_or(MissionError::BadShipPath)?;
        let w = p
            .waypoints
            .get(usize::from(waypoint))
            .ok_or(MissionError::BadShipWaypoint)?;
        Ok((p.id, w.id))
    }

    pub fn pre_write(&self) -> PathIndices {
        let paths = self
            .paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let waypoints = p
                    .waypoints
                    .iter()
                    .enumerate()
                    .map(|(j, w)| (w.id, j as u8))
                    .collect();
                (p.id, (i as u8, waypoints))
            })
            .collect();
        PathIndices { paths }
    }

    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let start = r.pos();
        let count = r.read_i32()?;
        let count = usize::try_from(count)
            .ok()
            .filter(|&n| n <= PATHS_MAX)
            .ok_or(MissionError::BadNumPaths(count))?;

        let mut paths = Self::default();
        for slot in 0..PATHS_MAX {
            let raw = r.read_i32()?;
            let mut coords = Vec::with_capacity(WAYPOINTS_MAX);
            for _ in 0..WAYPOINTS_MAX {
                coords.push(CoarseCoord3d::read(r)?);
            }
            // Slots past the path count may hold leftovers from older edits.
            if slot >= count {
                continue;
            }
            let n = usize::try_from(raw)
                .ok()
                .filter(|&n| n <= WAYPOINTS_MAX)
                .ok_or(MissionError::BadNumWaypoints(raw))?;
            let id = paths.add()?;
            if let Some(path) = paths.get_mut(id) {
                for c in coords.into_iter().take(n) {
                    path.add_waypoint(c)?;
                }
            }
        }
        debug_assert_eq!(r.pos() - start, BLOCK_SIZE);
        log::debug!("read {} paths", paths.len());
        Ok(paths)
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        let start = w.pos();
        w.write_i32(self.paths.len() as i32)?;
        for slot in 0..PATHS_MAX {
            let slot_start = w.pos();
            match self.paths.get(slot) {
                Some(path) => {
                    w.write_i32(path.waypoints.len() as i32)?;
                    for wp in &path.waypoints {
                        wp.coords.write(w)?;
                    }
                }
                None => w.write_i32(0)?,
            }
            w.pad_to(slot_start + 4 + (WAYPOINTS_MAX as u64) * 3)?;
        }
        debug_assert_eq!(w.pos() - start, BLOCK_SIZE);
        Ok(())
    }
}

/// Paths compare by shape; handle numbering is not significant.
impl PartialEq for Paths {
    fn eq(&self, other: &Self) -> bool {
        self.paths.len() == other.paths.len()
            && self.paths.iter().zip(&other.paths).all(|(a, b)| {
                a.waypoints.len() == b.waypoints.len()
                    && a
                        .waypoints
                        .iter()
                        .zip(&b.waypoints)
                        .all(|(x, y)| x.coords == y.coords)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Paths, PathId, WaypointId) {
        let mut paths = Paths::default();
        let a = paths.add().unwrap();
        let b = paths.add().unwrap();
        let pa = paths.get_mut(a).unwrap();
        pa.add_waypoint(CoarseCoord3d::new(1, 2, 3)).unwrap();
        let wp = pa.add_waypoint(CoarseCoord3d::new(4, 5, 6)).unwrap();
        paths
            .get_mut(b)
            .unwrap()
            .add_waypoint(CoarseCoord3d::new(7, 8, 9))
            .unwrap();
        (paths, a, wp)
    }

    #[test]
    fn block_round_trips() {
        let (paths, _, _) = sample();
        let mut w = MissionWriter::new(Vec::new());
        paths.write(&mut w).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len() as u64, BLOCK_SIZE);
        let back = Paths::read(&mut MissionReader::new(&bytes[..])).unwrap();
        assert_eq!(back, paths);
    }

    #[test]
    fn indices_follow_current_order() {
        let (mut paths, a, wp) = sample();
        let first = paths.get(a).unwrap().waypoints()[0].id;
        paths.get_mut(a).unwrap().remove_waypoint(first).unwrap();

        let idx = paths.pre_write();
        assert_eq!(idx.path(a), Some(0));
        assert_eq!(idx.waypoint(a, wp), Some(0));
        assert_eq!(idx.waypoint(a, first), None);
    }

    #[test]
    fn unused_slots_are_not_validated() {
        let (paths, _, _) = sample();
        let mut w = MissionWriter::new(Vec::new());
        paths.write(&mut w).unwrap();
        let mut bytes = w.into_inner();
        let slot_size = 4 + WAYPOINTS_MAX * 3;

        let unused = 4 + 2 * slot_size;
        bytes[unused..unused + 4].copy_from_slice(&99i32.to_le_bytes());
        let back = Paths::read(&mut MissionReader::new(&bytes[..])).unwrap();
        assert_eq!(back, paths);

        bytes[4..8].copy_from_slice(&99i32.to_le_bytes());
        let err = Paths::read(&mut MissionReader::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, MissionError::BadNumWaypoints(99)));
    }

    #[test]
    fn limits_are_enforced() {
        let mut paths = Paths::default();
        for _ in 0..PATHS_MAX {
            paths.add().unwrap();
        }
        assert!(matches!(paths.add(), Err(MissionError::PathsFull)));

        let id = paths.iter().next().unwrap().id();
        let path = paths.get_mut(id).unwrap();
        for i in 0..WAYPOINTS_MAX {
            path.add_waypoint(CoarseCoord3d::new(i as u8, 0, 0)).unwrap();
        }
        assert!(matches!(
            path.add_waypoint(CoarseCoord3d::default()),
            Err(MissionError::WaypointsFull)
        ));
    }

    #[test]
    fn bad_counts_are_rejected() {
        let mut bytes = vec![0u8; BLOCK_SIZE as usize];
        bytes[0..4].copy_from_slice(&9i32.to_le_bytes());
        let err = Paths::read(&mut MissionReader::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, MissionError::BadNumPaths(9)));

        bytes[0..4].copy_from_slice(&1i32.to_le_bytes());
        bytes[4..8].copy_from_slice(&65i32.to_le_bytes());
        let err = Paths::read(&mut MissionReader::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, MissionError::BadNumWaypoints(65)));
    }

    #[test]
    fn resolve_checks_both_indices() {
        let (paths, a, wp) = sample();
        assert_eq!(paths.resolve(0, 1).unwrap(), (a, wp));
        assert!(matches!(paths.resolve(2, 0), Err(MissionError::BadShipPath)));
        assert!(matches!(paths.resolve(1, 1), Err(MissionError::BadShipWaypoint)));
    }
}
