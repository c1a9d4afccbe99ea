use thiserror::Error;

pub mod briefing;
pub mod clouds;
pub mod compress;
pub mod coords;
pub mod defences;
pub mod dfile;
pub mod filenames;
pub mod io;
pub mod mission;
pub mod paths;
pub mod performance;
pub mod player;
pub mod ships;
pub mod target_info;
pub mod text;
pub mod triggers;

pub use briefing::Briefing;
pub use clouds::{CloudType, Clouds, Pyramid};
pub use compress::{load_compressed, save_compressed, worst_compressed_size, zlib_bound};
pub use coords::{CoarseCoord2d, CoarseCoord3d, FineCoord3d};
pub use defences::Defences;
pub use dfile::{DFile, Registry, Shared};
pub use filenames::{FilenameKind, Filenames};
pub use mission::{CodecOptions, MiscFlags, Mission, MissionType, NOMINAL_SIZE};
pub use paths::{Path, PathId, PathIndices, Paths, Waypoint, WaypointId};
pub use performance::{BigShipPerformance, FighterPerformance, Probability};
pub use player::{EngineType, LaserType, Player, Weapons};
pub use ships::{
    Behaviour, FormationOffset, Importance, Pilot, Ship, ShipFlags, ShipId, ShipIndices,
    ShipMode, ShipType, Ships, Target, UnresolvedMode, UnresolvedShip, UnresolvedShips,
};
pub use target_info::{TargetInfo, TargetInfos};
pub use text::{CursorType, Text};
pub use triggers::{DeleteOutcome, Trigger, TriggerAction, TriggerId, Triggers};

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("read failed: {0}")]
    ReadFail(#[source] std::io::Error),
    #[error("write failed: {0}")]
    WriteFail(#[source] std::io::Error),
    #[error("bad seek from offset {from} to {to}")]
    BadSeek { from: u64, to: u64 },
    #[error("mission data is truncated")]
    Truncated,
    #[error("mission data is longer than 7060 bytes")]
    TooLong,
    #[error("out of memory")]
    NoMem,

    #[error("player coordinates are off the map")]
    BadPlayerCoords,
    #[error("bad player shield strength {0}")]
    BadPlayerShields(i32),
    #[error("bad laser type {0}")]
    BadLaserType(u8),
    #[error("bad engine type {0}")]
    BadEngineType(u8),
    #[error("bad number of air-to-air missiles {0}")]
    BadNumAta(u8),
    #[error("bad number of air-to-ground missiles {0}")]
    BadNumAtg(u8),
    #[error("bad number of mines {0}")]
    BadNumMines(u8),
    #[error("bad number of bombs {0}")]
    BadNumBombs(u8),
    #[error("bad number of multi-ATA missiles {0}")]
    BadNumMultiAta(u8),

    #[error("bad mission type {0}")]
    BadMissionType(u8),
    #[error("bad cloud type {0}")]
    BadCloudType(u8),
    #[error("bad dock-to-finish flag {0}")]
    BadDockToFinish(u8),
    #[error("player docked with nonexistent ship {0}")]
    BadDockedShip(u8),
    #[error("bad mission time limit {0}")]
    BadTimeLimit(i32),
    #[error("bad misc flags {0:#06x}")]
    BadMiscFlags(u16),

    #[error("bad number of triggers {0}")]
    BadNumTriggers(i32),
    #[error("bad trigger action {0}")]
    BadTriggerAction(u8),
    #[error("chain reaction trigger has no predecessor")]
    BadTriggerChain,

    #[error("bad number of target infos {0}")]
    BadNumTargetInfos(i32),
    #[error("duplicate target info coordinates ({0}, {1})")]
    BadTargetInfoCoords(u8, u8),

    #[error("bad defences laser type {0}")]
    BadDefenceLaserType(u8),
    #[error("bad defences fire rate {0}")]
    BadDefenceFireRate(u8),
    #[error("bad defences missile probability {0}")]
    BadDefenceMissileProb(i32),
    #[error("bad pyramid level {0}")]
    BadPyramidLevel(u8),

    #[error("bad fighter laser probability {0}")]
    BadLaserProb(i32),
    #[error("bad fighter ATA probability {0}")]
    BadAtaProb(i32),
    #[error("bad fighter control {0}")]
    BadFighterControl(i32),
    #[error("bad fighter speed {0}")]
    BadFighterSpeed(i32),
    #[error("bad fighter shields {0}")]
    BadFighterShields(i32),
    #[error("bad big ship laser probability {0}")]
    BadBigShipLaserProb(i32),
    #[error("bad big ship missile probability {0}")]
    BadBigShipMissileProb(i32),
    #[error("bad big ship fire rate {0}")]
    BadBigShipFireRate(i32),
    #[error("bad big ship shields {0}")]
    BadBigShipShields(i32),

    #[error("bad number of ships {0}")]
    BadNumShips(i32),
    #[error("bad ship type {0}")]
    BadShipType(u8),
    #[error("bad ship behaviour {0}")]
    BadShipBehaviour(u8),
    #[error("bad ship mission importance {0}")]
    BadShipImportance(u8),
    #[error("bad ship flags {0:#04x}")]
    BadShipFlags(u8),
    #[error("bad ship pilot {0}")]
    BadShipPilot(u8),
    #[error("bad ship mode {0}")]
    BadShipMode(u8),
    #[error("ship attack target does not exist")]
    BadShipTarget,
    #[error("ship formation leader does not exist")]
    BadShipLeader,
    #[error("ship flight path does not exist")]
    BadShipPath,
    #[error("ship flight path waypoint does not exist")]
    BadShipWaypoint,

    #[error("bad number of paths {0}")]
    BadNumPaths(i32),
    #[error("bad number of waypoints {0}")]
    BadNumWaypoints(i32),

    #[error("bad {0} filename")]
    BadFilename(&'static str),

    #[error("bad number of briefing blocks {0}")]
    BadNumBriefings(i32),
    #[error("bad string offset {0}")]
    BadStringOffset(i32),
    #[error("bad character code {0} in string")]
    BadStringChar(u8),
    #[error("bad text duration {0}")]
    BadTextDuration(i32),
    #[error("bad text delay {0}")]
    BadTextDelay(i32),
    #[error("bad text speed {0}")]
    BadTextSpeed(i32),
    #[error("bad text repeat flag {0}")]
    BadTextRepeat(i32),
    #[error("bad text colour {0}")]
    BadTextColour(i32),
    #[error("bad text cursor type {0}")]
    BadTextCursor(i32),

    #[error("too many ships")]
    ShipsFull,
    #[error("too many paths")]
    PathsFull,
    #[error("too many waypoints on path")]
    WaypointsFull,
    #[error("too many triggers")]
    TriggersFull,
    #[error("too many target infos")]
    TargetInfosFull,
    #[error("a target info already exists at ({0}, {1})")]
    TargetInfoExists(u8, u8),
    #[error("too many briefing blocks")]
    BriefingFull,
    #[error("the briefing must keep at least one block")]
    BriefingEmpty,
    #[error("mission text does not fit in {0} bytes")]
    TextOverflow(usize),
}

pub type Result<T> = std::result::Result<T, MissionError>;
