//! Computer-controlled ships.
//!
//! On disk a ship's mode data refers to other ships and to flight paths by
//! index. Reading produces `UnresolvedShip`s that still hold those raw
//! indices; `UnresolvedShips::resolve` turns them into handles once both
//! the ship list and the paths are known, so a `Ships` collection never
//! contains a dangling reference.

use bitflags::bitflags;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};

use crate::coords::CoarseCoord3d;
use crate::io::{MissionReader, MissionWriter};
use crate::paths::{PathId, PathIndices, Paths, WaypointId};
use crate::{MissionError, Result};

pub const SHIPS_MAX: usize = 32;
pub const RECORD_SIZE: u64 = 16;
pub const BLOCK_SIZE: u64 = 4 + SHIPS_MAX as u64 * RECORD_SIZE;

/// Index byte standing for the player in attack and follow modes.
pub const PLAYER_INDEX: u8 = 255;

const LEGACY_NO_SHIPS: i32 = -1;
const MODE_DATA_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShipId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShipType {
    Fighter1,
    Fighter2,
    Fighter3,
    Fighter4,
    BigShip1,
    BigShip2,
    BigShip3,
    Satellite,
}

impl ShipType {
    fn from_raw(v: u8) -> Result<Self> {
        Ok(match v {
            0 => Self::Fighter1,
            1 => Self::Fighter2,
            2 => Self::Fighter3,
            3 => Self::Fighter4,
            4 => Self::BigShip1,
            5 => Self::BigShip2,
            6 => Self::BigShip3,
            7 => Self::Satellite,
            _ => return Err(MissionError::BadShipType(v)),
        })
    }

    pub fn is_fighter(self) -> bool {
        (self as u8) < 4
    }

    pub fn is_big_ship(self) -> bool {
        matches!(self, Self::BigShip1 | Self::BigShip2 | Self::BigShip3)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Behaviour {
    #[default]
    Aggressive,
    Defensive,
    Evasive,
    Passive,
}

impl Behaviour {
    fn from_raw(v: u8) -> Result<Self> {
        Ok(match v {
            0 => Self::Aggressive,
            1 => Self::Defensive,
            2 => Self::Evasive,
            3 => Self::Passive,
            _ => return Err(MissionError::BadShipBehaviour(v)),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Importance {
    #[default]
    Normal,
    MustSurvive,
    MustDestroy,
}

impl Importance {
    fn from_raw(v: u8) -> Result<Self> {
        Ok(match v {
            0 => Self::Normal,
            1 => Self::MustSurvive,
            2 => Self::MustDestroy,
            _ => return Err(MissionError::BadShipImportance(v)),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Pilot {
    Rookie,
    #[default]
    Veteran,
    Elite,
    Ace,
}

impl Pilot {
    fn from_raw(v: u8) -> Result<Self> {
        Ok(match v {
            0 => Self::Rookie,
            1 => Self::Veteran,
            2 => Self::Elite,
            3 => Self::Ace,
            _ => return Err(MissionError::BadShipPilot(v)),
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
    pub struct ShipFlags: u8 {
        const CLOAKED           = 0x01;
        const SCANNER_INVISIBLE = 0x02;
        const IGNORES_PLAYER    = 0x04;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Target {
    Player,
    Ship(ShipId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FormationOffset {
    pub x: i8,
    pub y: i8,
    pub z: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShipMode {
    Attack(Target),
    FlightPath { path: PathId, waypoint: WaypointId },
    Follow { leader: Target, offset: FormationOffset },
}

/// Mode data as stored on disk, before indices are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedMode {
    Attack(u8),
    FlightPath(u8, u8),
    Follow(u8, FormationOffset),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipRecord<M> {
    pub coords: CoarseCoord3d,
    pub direction: u8,
    pub kind: ShipType,
    pub behaviour: Behaviour,
    pub importance: Importance,
    pub flags: ShipFlags,
    pub pilot: Pilot,
    pub(crate) mode: M,
}

pub type Ship = ShipRecord<ShipMode>;
pub type UnresolvedShip = ShipRecord<UnresolvedMode>;

impl<M> ShipRecord<M> {
    fn with_mode<N>(&self, mode: N) -> ShipRecord<N> {
        ShipRecord {
            coords: self.coords,
            direction: self.direction,
            kind: self.kind,
            behaviour: self.behaviour,
            importance: self.importance,
            flags: self.flags,
            pilot: self.pilot,
            mode,
        }
    }
}

impl Ship {
    pub fn new(kind: ShipType, coords: CoarseCoord3d) -> Self {
        Self {
            coords,
            direction: 0,
            kind,
            behaviour: Behaviour::default(),
            importance: Importance::default(),
            flags: ShipFlags::empty(),
            pilot: Pilot::default(),
            mode: ShipMode::Attack(Target::Player),
        }
    }

    pub fn mode(&self) -> ShipMode {
        self.mode
    }
}

impl UnresolvedShip {
    pub fn mode(&self) -> UnresolvedMode {
        self.mode
    }

    fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let coords = CoarseCoord3d::read(r)?;
        let direction = r.read_u8()?;
        let kind = ShipType::from_raw(r.read_u8()?)?;
        let behaviour = Behaviour::from_raw(r.read_u8()?)?;
        let importance = Importance::from_raw(r.read_u8()?)?;
        let flags = r.read_u8()?;
        let flags = ShipFlags::from_bits(flags).ok_or(MissionError::BadShipFlags(flags))?;
        let pilot = Pilot::from_raw(r.read_u8()?)?;
        let mode = r.read_u8()?;
        let data = r.read_bytes::<MODE_DATA_SIZE>()?;
        let mode = match mode {
            0 => UnresolvedMode::Attack(data[0]),
            1 => UnresolvedMode::FlightPath(data[0], data[1]),
            2 => UnresolvedMode::Follow(
                data[0],
                FormationOffset {
                    x: data[1] as i8,
                    y: data[2] as i8,
                    z: data[3] as i8,
                },
            ),
            _ => return Err(MissionError::BadShipMode(mode)),
        };

        Ok(Self {
            coords,
            direction,
            kind,
            behaviour,
            importance,
            flags,
            pilot,
            mode,
        })
    }

    fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        self.coords.write(w)?;
        w.write_u8(self.direction)?;
        w.write_u8(self.kind as u8)?;
        w.write_u8(self.behaviour as u8)?;
        w.write_u8(self.importance as u8)?;
        w.write_u8(self.flags.bits())?;
        w.write_u8(self.pilot as u8)?;

        let mut data = [0u8; MODE_DATA_SIZE];
        let mode = match self.mode {
            UnresolvedMode::Attack(t) => {
                data[0] = t;
                0
            }
            UnresolvedMode::FlightPath(p, wp) => {
                data[0] = p;
                data[1] = wp;
                1
            }
            UnresolvedMode::Follow(l, off) => {
                data[0] = l;
                data[1] = off.x as u8;
                data[2] = off.y as u8;
                data[3] = off.z as u8;
                2
            }
        };
        w.write_u8(mode)?;
        w.write_bytes(&data)
    }
}

/// Ships as read from disk, awaiting reference resolution.
#[derive(Debug, Clone)]
pub struct UnresolvedShips(Vec<UnresolvedShip>);

impl UnresolvedShips {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts every index into a handle. A ship may not attack or follow
    /// itself, and every referenced ship, path and waypoint must exist.
    pub fn resolve(self, paths: &Paths) -> Result<Ships> {
        let count = self.0.len();
        let ids: Vec<ShipId> = (0..count as u32).map(ShipId).collect();
        let target = |own: usize, idx: u8, err: MissionError| -> Result<Target> {
            if idx == PLAYER_INDEX {
                return Ok(Target::Player);
            }
            let idx = usize::from(idx);
            if idx >= count || idx == own {
                return Err(err);
            }
            Ok(Target::Ship(ids[idx]))
        };

        let mut ships = Vec::with_capacity(count);
        for (i, raw) in self.0.iter().enumerate() {
            let mode = match raw.mode {
                UnresolvedMode::Attack(t) => {
                    ShipMode::Attack(target(i, t, MissionError::BadShipTarget)?)
                }
                UnresolvedMode::FlightPath(p, wp) => {
                    let (path, waypoint) = paths.resolve(p, wp)?;
                    ShipMode::FlightPath { path, waypoint }
                }
                UnresolvedMode::Follow(l, offset) => ShipMode::Follow {
                    leader: target(i, l, MissionError::BadShipLeader)?,
                    offset,
                },
            };
            log::trace!("ship {i}: {:?} {:?}", raw.kind, mode);
            ships.push((ids[i], raw.with_mode(mode)));
        }

        Ok(Ships {
            ships,
            next_id: count as u32,
        })
    }
}

/// Positions of every ship, captured just before writing.
#[derive(Debug, Clone, Default)]
pub struct ShipIndices(HashMap<ShipId, u8>);

impl ShipIndices {
    pub fn get(&self, id: ShipId) -> Option<u8> {
        self.0.get(&id).copied()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Ships {
    ships: Vec<(ShipId, Ship)>,
    #[serde(skip)]
    next_id: u32,
}

impl Ships {
    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShipId, &Ship)> {
        self.ships.iter().map(|(id, s)| (*id, s))
    }

    pub fn get(&self, id: ShipId) -> Option<&Ship> {
        self.ships.iter().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    /// Mutable access to everything but the mode, which goes through
    /// `set_mode` so that its references are checked.
    pub fn get_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    pub(crate) fn id_at(&self, index: usize) -> Option<ShipId> {
        self.ships.get(index).map(|(id, _)| *id)
    }

    /// Appends a ship that attacks the player.
    pub fn add(&mut self, kind: ShipType, coords: CoarseCoord3d) -> Result<ShipId> {
        if self.ships.len() >= SHIPS_MAX {
            return Err(MissionError::ShipsFull);
        }
        let id = ShipId(self.next_id);
        self.next_id += 1;
        self.ships.push((id, Ship::new(kind, coords)));
        Ok(id)
    }

    fn check_target(&self, own: ShipId, target: Target, err: MissionError) -> Result<()> {
        match target {
            Target::Player => Ok(()),
            Target::Ship(t) if t != own && self.get(t).is_some() => Ok(()),
            Target::Ship(_) => Err(err),
        }
    }

    pub fn set_mode(&mut self, id: ShipId, mode: ShipMode, paths: &Paths) -> Result<()> {
        match mode {
            ShipMode::Attack(t) => self.check_target(id, t, MissionError::BadShipTarget)?,
            ShipMode::Follow { leader, .. } => {
                self.check_target(id, leader, MissionError::BadShipLeader)?
            }
            ShipMode::FlightPath { path, waypoint } => {
                if paths.get(path).is_none() {
                    return Err(MissionError::BadShipPath);
                }
                if !paths.contains(path, waypoint) {
                    return Err(MissionError::BadShipWaypoint);
                }
            }
        }
        let ship = self.get_mut(id).ok_or(MissionError::BadShipTarget)?;
        ship.mode = mode;
        Ok(())
    }

    /// Removes a ship. Ships that were attacking or following it switch to
    /// the player instead.
    pub(crate) fn remove(&mut self, id: ShipId) -> Option<Ship> {
        let pos = self.ships.iter().position(|(i, _)| *i == id)?;
        let (_, removed) = self.ships.remove(pos);
        for (_, ship) in &mut self.ships {
            match &mut ship.mode {
                ShipMode::Attack(target) if *target == Target::Ship(id) => *target = Target::Player,
                ShipMode::Follow { leader, .. } if *leader == Target::Ship(id) => {
                    *leader = Target::Player
                }
                _ => {}
            }
        }
        Some(removed)
    }

    /// Sends ships flying a path (or one waypoint of it, if given) to
    /// attack the player instead.
    pub(crate) fn abandon_path(&mut self, path: PathId, waypoint: Option<WaypointId>) {
        for (_, ship) in &mut self.ships {
            if let ShipMode::FlightPath { path: p, waypoint: w } = ship.mode {
                if p == path && waypoint.map_or(true, |wp| wp == w) {
                    ship.mode = ShipMode::Attack(Target::Player);
                }
            }
        }
    }

    pub fn pre_write(&self) -> ShipIndices {
        ShipIndices(
            self.ships
                .iter()
                .enumerate()
                .map(|(i, (id, _))| (*id, i as u8))
                .collect(),
        )
    }

    /// Translates handles back into on-disk indices.
    pub fn to_unresolved(
        &self,
        ships: &ShipIndices,
        paths: &PathIndices,
    ) -> Result<Vec<UnresolvedShip>> {
        let target = |t: Target, err: MissionError| -> Result<u8> {
            match t {
                Target::Player => Ok(PLAYER_INDEX),
                Target::Ship(id) => ships.get(id).ok_or(err),
            }
        };
        self.ships
            .iter()
            .map(|(_, ship)| {
                let mode = match ship.mode {
                    ShipMode::Attack(t) => {
                        UnresolvedMode::Attack(target(t, MissionError::BadShipTarget)?)
                    }
                    ShipMode::FlightPath { path, waypoint } => UnresolvedMode::FlightPath(
                        paths.path(path).ok_or(MissionError::BadShipPath)?,
                        paths
                            .waypoint(path, waypoint)
                            .ok_or(MissionError::BadShipWaypoint)?,
                    ),
                    ShipMode::Follow { leader, offset } => UnresolvedMode::Follow(
                        target(leader, MissionError::BadShipLeader)?,
                        offset,
                    ),
                };
                Ok(ship.with_mode(mode))
            })
            .collect()
    }

    pub(crate) fn read<R: Read>(
        r: &mut MissionReader<R>,
        accept_legacy_count: bool,
    ) -> Result<UnresolvedShips> {
        let start = r.pos();
        let raw_count = r.read_i32()?;
        let count = match raw_count {
            LEGACY_NO_SHIPS if accept_legacy_count => {
                log::warn!("legacy ship count -1 treated as 0");
                0
            }
            0..=32 => raw_count as usize,
            _ => return Err(MissionError::BadNumShips(raw_count)),
        };

        let mut ships = Vec::with_capacity(count);
        for _ in 0..count {
            ships.push(UnresolvedShip::read(r)?);
        }
        r.seek_to(start + BLOCK_SIZE)?;
        log::debug!("read {count} ships");
        Ok(UnresolvedShips(ships))
    }

    pub(crate) fn write<W: Write>(
        &self,
        w: &mut MissionWriter<W>,
        ships: &ShipIndices,
        paths: &PathIndices,
    ) -> Result<()> {
        let start = w.pos();
        let raw = self.to_unresolved(ships, paths)?;
        w.write_i32(raw.len() as i32)?;
        for ship in &raw {
            ship.write(w)?;
        }
        w.pad_to(start + BLOCK_SIZE)
    }
}
