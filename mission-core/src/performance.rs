//! Per-ship-class performance tables.
//!
//! Probabilities are stored as integers out of 1024. Older editors wrote
//! -1 to mean "never", which is accepted and normalised to zero. Big-ship
//! shields use 999999 to flag a remote shield generator whose strength is
//! not capped; the in-memory value is then clamped to the normal maximum.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::io::{MissionReader, MissionWriter};
use crate::{MissionError, Result};

pub const FIGHTER_COUNT: usize = 4;
pub const BIG_SHIP_COUNT: usize = 3;

pub const PROBABILITY_MAX: i32 = 1024;
const LEGACY_NEVER: i32 = -1;

pub const FIGHTER_CONTROL_MAX: i32 = 255;
pub const FIGHTER_SPEED_MAX: i32 = 512;
pub const FIGHTER_SHIELDS_MAX: i32 = 1000;
pub const FIRE_RATE_MAX: i32 = 100;
pub const BIG_SHIP_SHIELDS_MAX: i32 = 5000;
const REMOTE_SHIELD_GENERATOR: i32 = 999_999;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Probability(u16);

impl Probability {
    pub const NEVER: Probability = Probability(0);
    pub const ALWAYS: Probability = Probability(PROBABILITY_MAX as u16);

    /// `None` if `raw` is outside 0..=1024 (after mapping the legacy -1).
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            LEGACY_NEVER => Some(Self::NEVER),
            0..=PROBABILITY_MAX => Some(Self(raw as u16)),
            _ => None,
        }
    }

    pub fn raw(self) -> i32 {
        i32::from(self.0)
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / f64::from(PROBABILITY_MAX)
    }

    pub(crate) fn read<R: Read>(
        r: &mut MissionReader<R>,
        err: fn(i32) -> MissionError,
    ) -> Result<Self> {
        let raw = r.read_i32()?;
        if raw == LEGACY_NEVER {
            log::debug!("legacy probability -1 read as 0");
        }
        Self::from_raw(raw).ok_or(err(raw))
    }
}

fn ranged<R: Read>(
    r: &mut MissionReader<R>,
    max: i32,
    err: fn(i32) -> MissionError,
) -> Result<i32> {
    let v = r.read_i32()?;
    if !(0..=max).contains(&v) {
        return Err(err(v));
    }
    Ok(v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterPerformance {
    pub laser_prob: Probability,
    pub ata_prob: Probability,
    pub control: i32,
    pub speed: i32,
    pub shields: i32,
}

impl Default for FighterPerformance {
    fn default() -> Self {
        Self {
            laser_prob: Probability(256),
            ata_prob: Probability(64),
            control: 128,
            speed: 256,
            shields: 100,
        }
    }
}

impl FighterPerformance {
    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        Ok(Self {
            laser_prob: Probability::read(r, MissionError::BadLaserProb)?,
            ata_prob: Probability::read(r, MissionError::BadAtaProb)?,
            control: ranged(r, FIGHTER_CONTROL_MAX, MissionError::BadFighterControl)?,
            speed: ranged(r, FIGHTER_SPEED_MAX, MissionError::BadFighterSpeed)?,
            shields: ranged(r, FIGHTER_SHIELDS_MAX, MissionError::BadFighterShields)?,
        })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        w.write_i32(self.laser_prob.raw())?;
        w.write_i32(self.ata_prob.raw())?;
        w.write_i32(self.control)?;
        w.write_i32(self.speed)?;
        w.write_i32(self.shields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigShipPerformance {
    pub laser_prob: Probability,
    pub missile_prob: Probability,
    pub fire_rate: i32,
    shields: i32,
    remote_shield_gen: bool,
}

impl Default for BigShipPerformance {
    fn default() -> Self {
        Self {
            laser_prob: Probability(512),
            missile_prob: Probability(128),
            fire_rate: 50,
            shields: 2000,
            remote_shield_gen: false,
        }
    }
}

impl BigShipPerformance {
    /// Shield strength, capped at the normal maximum when a remote
    /// generator is fitted.
    pub fn shields(&self) -> i32 {
        self.shields
    }

    pub fn has_remote_shield_gen(&self) -> bool {
        self.remote_shield_gen
    }

    pub fn set_shields(&mut self, shields: i32) -> Result<()> {
        if !(0..=BIG_SHIP_SHIELDS_MAX).contains(&shields) {
            return Err(MissionError::BadBigShipShields(shields));
        }
        self.shields = shields;
        self.remote_shield_gen = false;
        Ok(())
    }

    pub fn set_remote_shield_gen(&mut self) {
        self.shields = BIG_SHIP_SHIELDS_MAX;
        self.remote_shield_gen = true;
    }

    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let laser_prob = Probability::read(r, MissionError::BadBigShipLaserProb)?;
        let missile_prob = Probability::read(r, MissionError::BadBigShipMissileProb)?;
        let fire_rate = ranged(r, FIRE_RATE_MAX, MissionError::BadBigShipFireRate)?;
        let raw_shields = r.read_i32()?;

        let mut perf = Self {
            laser_prob,
            missile_prob,
            fire_rate,
            shields: 0,
            remote_shield_gen: false,
        };
        if raw_shields == REMOTE_SHIELD_GENERATOR {
            perf.set_remote_shield_gen();
        } else {
            perf.set_shields(raw_shields)?;
        }
        Ok(perf)
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        w.write_i32(self.laser_prob.raw())?;
        w.write_i32(self.missile_prob.raw())?;
        w.write_i32(self.fire_rate)?;
        w.write_i32(if self.remote_shield_gen {
            REMOTE_SHIELD_GENERATOR
        } else {
            self.shields
        })
    }
}
