//! The mission file as a whole.
//!
//! A mission is a single fixed-size record. Reading walks the fields in
//! file order and stops at the first invalid one; references between
//! ships, paths and the player's docking are resolved only after every
//! field has been read. Writing snapshots ship and path positions first
//! so that those references can be turned back into indices.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::briefing::{Briefing, Strings};
use crate::clouds::{Clouds, Pyramid};
use crate::defences::Defences;
use crate::dfile::DFile;
use crate::filenames::Filenames;
use crate::io::{MissionReader, MissionWriter};
use crate::paths::{Path, PathId, Paths, Waypoint, WaypointId};
use crate::performance::{BigShipPerformance, FighterPerformance, BIG_SHIP_COUNT, FIGHTER_COUNT};
use crate::player::{Player, NOT_DOCKED};
use crate::ships::{Ship, ShipId, ShipMode, Ships};
use crate::target_info::TargetInfos;
use crate::triggers::Triggers;
use crate::{MissionError, Result};

/// Size of a mission file written by this crate.
pub const NOMINAL_SIZE: u64 = 7060;

const MISSION_TYPE_OFFSET: u64 = 27;
const TRIGGERS_OFFSET: u64 = 36;
const FIGHTER_PERF_OFFSET: u64 = 904;
const SHIPS_OFFSET: u64 = 1032;
const STRINGS_OFFSET: u64 = 3204;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionType {
    #[default]
    Normal,
    Space,
    Satellite,
}

impl MissionType {
    fn from_raw(v: u8) -> Result<Self> {
        Ok(match v {
            0 => Self::Normal,
            1 => Self::Space,
            2 => Self::Satellite,
            _ => return Err(MissionError::BadMissionType(v)),
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MiscFlags: u16 {
        const SCANNERS_DOWN = 0x0001;
        const IMPERVIOUS_MAP = 0x0002;
        const TIMER_ENABLED = 0x0004;
    }
}

/// Tolerances for files written by older editors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Accept files that end early, as long as every string is complete.
    pub accept_short_files: bool,
    /// Read a ship count of -1 as zero.
    pub accept_legacy_ship_count: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            accept_short_files: true,
            accept_legacy_ship_count: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Mission {
    pub player: Player,
    pub mission_type: MissionType,
    pub clouds: Clouds,
    pub dock_to_finish: bool,
    pub triggers: Triggers,
    pub target_infos: TargetInfos,
    pub defences: Defences,
    pub pyramid: Pyramid,
    pub fighter_perf: [FighterPerformance; FIGHTER_COUNT],
    pub big_ship_perf: [BigShipPerformance; BIG_SHIP_COUNT],
    pub ships: Ships,
    pub paths: Paths,
    pub filenames: Filenames,
    pub briefing: Briefing,
    flags: MiscFlags,
    time_limit: i32,
}

impl Mission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<R: Read>(reader: R) -> Result<Self> {
        Self::read_with(reader, &CodecOptions::default())
    }

    pub fn read_with<R: Read>(reader: R, options: &CodecOptions) -> Result<Self> {
        let mut r = MissionReader::new(reader);

        let mut player = Player::read(&mut r)?;
        let max_losses = r.read_u8()?;
        r.seek_to(MISSION_TYPE_OFFSET)?;
        let mission_type = MissionType::from_raw(r.read_u8()?)?;
        let clouds = Clouds::read(&mut r)?;
        let dock_to_finish = match r.read_u8()? {
            0 => false,
            1 => true,
            v => return Err(MissionError::BadDockToFinish(v)),
        };
        let docked_index = r.read_u8()?;

        r.seek_to(TRIGGERS_OFFSET)?;
        let mut triggers = Triggers::read(&mut r)?;
        triggers.max_losses = max_losses;
        let target_coords = TargetInfos::read_coords(&mut r)?;

        let time_limit = r.read_i32()?;
        if time_limit < 0 {
            return Err(MissionError::BadTimeLimit(time_limit));
        }
        let defences = Defences::read(&mut r)?;
        let pyramid = Pyramid::read(&mut r)?;
        let raw_flags = r.read_u16()?;
        let flags = MiscFlags::from_bits(raw_flags).ok_or(MissionError::BadMiscFlags(raw_flags))?;

        r.seek_to(FIGHTER_PERF_OFFSET)?;
        let mut fighter_perf = [FighterPerformance::default(); FIGHTER_COUNT];
        for perf in &mut fighter_perf {
            *perf = FighterPerformance::read(&mut r)?;
        }
        let mut big_ship_perf = [BigShipPerformance::default(); BIG_SHIP_COUNT];
        for perf in &mut big_ship_perf {
            *perf = BigShipPerformance::read(&mut r)?;
        }

        debug_assert_eq!(r.pos(), SHIPS_OFFSET);
        let ships = Ships::read(&mut r, options.accept_legacy_ship_count)?;
        let paths = Paths::read(&mut r)?;
        let filenames = Filenames::read(&mut r)?;

        debug_assert_eq!(r.pos(), STRINGS_OFFSET);
        let strings = Strings::read(&mut r, &target_coords)?;
        if strings.short {
            if !options.accept_short_files {
                return Err(MissionError::Truncated);
            }
            log::warn!("accepted short mission file ({} bytes)", r.pos());
        }

        // Ships must be resolved before the player's docking can be.
        let ships = ships.resolve(&paths)?;
        player.docked_ship = match docked_index {
            NOT_DOCKED => None,
            i => Some(
                ships
                    .id_at(usize::from(i))
                    .ok_or(MissionError::BadDockedShip(i))?,
            ),
        };

        log::debug!(
            "read mission: {} triggers, {} ships, {} paths",
            triggers.len(),
            ships.len(),
            paths.len()
        );
        Ok(Self {
            player,
            mission_type,
            clouds,
            dock_to_finish,
            triggers,
            target_infos: strings.target_infos,
            defences,
            pyramid,
            fighter_perf,
            big_ship_perf,
            ships,
            paths,
            filenames,
            briefing: strings.briefing,
            flags,
            time_limit,
        })
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        let ship_indices = self.ships.pre_write();
        let path_indices = self.paths.pre_write();
        let docked = match self.player.docked_ship {
            None => NOT_DOCKED,
            Some(id) => ship_indices
                .get(id)
                .ok_or(MissionError::BadDockedShip(NOT_DOCKED))?,
        };

        let mut w = MissionWriter::new(writer);
        self.player.write(&mut w)?;
        w.write_u8(self.triggers.max_losses)?;
        w.pad_to(MISSION_TYPE_OFFSET)?;
        w.write_u8(self.mission_type as u8)?;
        self.clouds.write(&mut w)?;
        w.write_u8(u8::from(self.dock_to_finish))?;
        w.write_u8(docked)?;

        w.pad_to(TRIGGERS_OFFSET)?;
        self.triggers.write(&mut w)?;
        self.target_infos.write_coords(&mut w)?;
        w.write_i32(self.time_limit)?;
        self.defences.write(&mut w)?;
        self.pyramid.write(&mut w)?;
        w.write_u16(self.flags.bits())?;

        w.pad_to(FIGHTER_PERF_OFFSET)?;
        for perf in &self.fighter_perf {
            perf.write(&mut w)?;
        }
        for perf in &self.big_ship_perf {
            perf.write(&mut w)?;
        }

        self.ships.write(&mut w, &ship_indices, &path_indices)?;
        self.paths.write(&mut w)?;
        self.filenames.write(&mut w)?;
        Strings::write(&mut w, &self.briefing, &self.target_infos)?;
        debug_assert_eq!(w.pos(), NOMINAL_SIZE);
        w.flush()
    }

    pub fn scanners_down(&self) -> bool {
        self.flags.contains(MiscFlags::SCANNERS_DOWN)
    }

    pub fn set_scanners_down(&mut self, on: bool) {
        self.flags.set(MiscFlags::SCANNERS_DOWN, on);
    }

    pub fn impervious_map(&self) -> bool {
        self.flags.contains(MiscFlags::IMPERVIOUS_MAP)
    }

    pub fn set_impervious_map(&mut self, on: bool) {
        self.flags.set(MiscFlags::IMPERVIOUS_MAP, on);
    }

    /// Mission time limit in seconds, if the timer is enabled.
    pub fn time_limit(&self) -> Option<i32> {
        self.flags
            .contains(MiscFlags::TIMER_ENABLED)
            .then_some(self.time_limit)
    }

    pub fn set_time_limit(&mut self, limit: Option<i32>) -> Result<()> {
        match limit {
            Some(v) if v < 0 => return Err(MissionError::BadTimeLimit(v)),
            Some(v) => self.time_limit = v,
            None => {}
        }
        self.flags.set(MiscFlags::TIMER_ENABLED, limit.is_some());
        Ok(())
    }

    pub fn set_ship_mode(&mut self, id: ShipId, mode: ShipMode) -> Result<()> {
        self.ships.set_mode(id, mode, &self.paths)
    }

    /// Docks the player with a ship, or undocks with `None`. Returns false
    /// if the ship does not exist.
    pub fn dock_player(&mut self, ship: Option<ShipId>) -> bool {
        if ship.is_some_and(|id| self.ships.get(id).is_none()) {
            return false;
        }
        self.player.docked_ship = ship;
        true
    }

    /// Removes a ship. Ships aimed at it turn on the player instead, and
    /// the player is undocked if it was docked there.
    pub fn remove_ship(&mut self, id: ShipId) -> Option<Ship> {
        let ship = self.ships.remove(id)?;
        if self.player.docked_ship == Some(id) {
            self.player.docked_ship = None;
        }
        Some(ship)
    }

    /// Removes a path. Ships flying it switch to attacking the player.
    pub fn remove_path(&mut self, id: PathId) -> Option<Path> {
        self.ships.abandon_path(id, None);
        self.paths.remove(id)
    }

    /// Removes a waypoint. Ships starting from it switch to attacking the
    /// player.
    pub fn remove_waypoint(&mut self, path: PathId, id: WaypointId) -> Option<Waypoint> {
        self.ships.abandon_path(path, Some(id));
        self.paths.get_mut(path)?.remove_waypoint(id)
    }

    fn ships_by_index(&self) -> Option<(Vec<crate::ships::UnresolvedShip>, u8)> {
        let ship_indices = self.ships.pre_write();
        let ships = self
            .ships
            .to_unresolved(&ship_indices, &self.paths.pre_write())
            .ok()?;
        let docked = match self.player.docked_ship {
            None => NOT_DOCKED,
            Some(id) => ship_indices.get(id)?,
        };
        Some((ships, docked))
    }
}

/// Missions compare field by field, with references between objects
/// compared by position rather than by handle.
impl PartialEq for Mission {
    fn eq(&self, other: &Self) -> bool {
        let player = |p: &Player| Player {
            docked_ship: None,
            ..p.clone()
        };
        player(&self.player) == player(&other.player)
            && self.mission_type == other.mission_type
            && self.clouds == other.clouds
            && self.dock_to_finish == other.dock_to_finish
            && self.triggers == other.triggers
            && self.target_infos == other.target_infos
            && self.defences == other.defences
            && self.pyramid == other.pyramid
            && self.fighter_perf == other.fighter_perf
            && self.big_ship_perf == other.big_ship_perf
            && self.paths == other.paths
            && self.filenames == other.filenames
            && self.briefing == other.briefing
            && self.flags == other.flags
            && self.time_limit == other.time_limit
            && match (self.ships_by_index(), other.ships_by_index()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
    }
}

impl DFile for Mission {
    fn read_from<R: Read>(reader: R) -> Result<Self> {
        Self::read(reader)
    }

    fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        self.write(writer)
    }

    fn min_size_hint(&self) -> Option<u64> {
        Some(NOMINAL_SIZE)
    }

    fn destroy(&mut self) {
        log::trace!(
            "releasing mission with {} ships and {} triggers",
            self.ships.len(),
            self.triggers.len()
        );
    }
}
