//! Location-triggered events.
//!
//! Triggers fire when the cell they sit on is destroyed. A chain reaction
//! trigger has no target of its own: it fires when the trigger immediately
//! before it in the list fires, so the list order carries meaning. Each
//! chain reaction records the coordinates it was aimed at, and the
//! collection keeps that trigger's predecessor at those coordinates for as
//! long as the chain reaction exists. Placeholder ("dummy") triggers exist
//! only to anchor a chain reaction where no real event is wanted.
//!
//! Deletion is two-phase: `delete` marks triggers as doomed (they vanish
//! from every query at once) and the next mutation, or an explicit
//! `flush`, drops them from the list.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};

use crate::coords::{CoarseCoord2d, MAP_SIZE};
use crate::io::{MissionReader, MissionWriter};
use crate::{MissionError, Result};

pub const TRIGGERS_MAX: usize = 200;
pub const RECORD_SIZE: u64 = 4;
pub const BLOCK_SIZE: u64 = 4 + TRIGGERS_MAX as u64 * RECORD_SIZE;

const BITMAP_WORDS: usize = (MAP_SIZE * MAP_SIZE / 64) as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TriggerId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerAction {
    Dummy,
    MissionTarget,
    ChainReaction,
    MegaLaser,
    CloakingDevice,
    ExtraLife,
    AtaMissiles,
    AtgMissiles,
    Bombs,
    Mines,
    MultiAtaMissiles,
    Shields,
    DefencesOff,
}

impl TriggerAction {
    pub fn from_raw(v: u8) -> Result<Self> {
        Ok(match v {
            0 => Self::Dummy,
            1 => Self::MissionTarget,
            2 => Self::ChainReaction,
            3 => Self::MegaLaser,
            4 => Self::CloakingDevice,
            5 => Self::ExtraLife,
            6 => Self::AtaMissiles,
            7 => Self::AtgMissiles,
            8 => Self::Bombs,
            9 => Self::Mines,
            10 => Self::MultiAtaMissiles,
            11 => Self::Shields,
            12 => Self::DefencesOff,
            _ => return Err(MissionError::BadTriggerAction(v)),
        })
    }

    pub fn to_raw(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trigger {
    pub coords: CoarseCoord2d,
    pub action: TriggerAction,
    pub value: u8,
}

impl Trigger {
    fn dummy(coords: CoarseCoord2d) -> Self {
        Self {
            coords,
            action: TriggerAction::Dummy,
            value: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The trigger is gone.
    Removed,
    /// The trigger anchors a chain reaction and became a placeholder.
    Converted,
    /// The trigger is a placeholder that still anchors a chain reaction.
    Retained,
}

#[derive(Debug, Clone)]
struct Slot {
    trigger: Trigger,
    chain_target: Option<CoarseCoord2d>,
    doomed: bool,
}

#[derive(Debug, Clone)]
pub struct Triggers {
    pub max_losses: u8,
    slots: HashMap<TriggerId, Slot>,
    order: Vec<TriggerId>,
    by_coords: BTreeMap<CoarseCoord2d, Vec<TriggerId>>,
    by_chain_target: BTreeMap<CoarseCoord2d, Vec<TriggerId>>,
    occupied: Vec<u64>,
    pending: Vec<TriggerId>,
    next_id: u32,
}

impl Default for Triggers {
    fn default() -> Self {
        Self {
            max_losses: 0,
            slots: HashMap::new(),
            order: Vec::new(),
            by_coords: BTreeMap::new(),
            by_chain_target: BTreeMap::new(),
            occupied: vec![0; BITMAP_WORDS],
            pending: Vec::new(),
            next_id: 0,
        }
    }
}

fn bit(coords: CoarseCoord2d) -> (usize, u64) {
    let n = usize::from(coords.y) * MAP_SIZE as usize + usize::from(coords.x);
    (n / 64, 1u64 << (n % 64))
}

/// Keys of `map` inside the rectangle `min..=max`.
fn area<'a>(
    map: &'a BTreeMap<CoarseCoord2d, Vec<TriggerId>>,
    min: CoarseCoord2d,
    max: CoarseCoord2d,
) -> impl Iterator<Item = TriggerId> + 'a {
    let rows = (min.x <= max.x && min.y <= max.y).then(|| map.range(min..=max));
    rows.into_iter()
        .flatten()
        .filter(move |(c, _)| c.within(min, max))
        .flat_map(|(_, ids)| ids.iter().copied())
}

impl Triggers {
    pub fn len(&self) -> usize {
        self.order.len() - self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live(&self, id: TriggerId) -> Option<&Slot> {
        self.slots.get(&id).filter(|s| !s.doomed)
    }

    pub fn get(&self, id: TriggerId) -> Option<&Trigger> {
        self.live(id).map(|s| &s.trigger)
    }

    /// Coordinates a chain reaction was aimed at; `None` for other actions.
    pub fn chain_target(&self, id: TriggerId) -> Option<CoarseCoord2d> {
        self.live(id).and_then(|s| s.chain_target)
    }

    /// Live triggers in list order.
    pub fn iter(&self) -> impl Iterator<Item = (TriggerId, &Trigger)> {
        self.order
            .iter()
            .filter_map(|id| self.live(*id).map(|s| (*id, &s.trigger)))
    }

    pub fn at(&self, coords: CoarseCoord2d) -> impl Iterator<Item = TriggerId> + '_ {
        self.by_coords.get(&coords).into_iter().flatten().copied()
    }

    /// Triggers standing inside the inclusive rectangle.
    pub fn in_area(
        &self,
        min: CoarseCoord2d,
        max: CoarseCoord2d,
    ) -> impl Iterator<Item = TriggerId> + '_ {
        area(&self.by_coords, min, max)
    }

    /// Chain reactions aimed at a cell inside the inclusive rectangle.
    pub fn chains_targeting_area(
        &self,
        min: CoarseCoord2d,
        max: CoarseCoord2d,
    ) -> impl Iterator<Item = TriggerId> + '_ {
        area(&self.by_chain_target, min, max)
    }

    /// True if any trigger other than a placeholder is at `coords`.
    pub fn is_occupied(&self, coords: CoarseCoord2d) -> bool {
        let (word, mask) = bit(coords);
        let busy = self.occupied[word] & mask != 0;
        debug_assert_eq!(busy, self.holds_real_trigger(coords), "bitmap out of step at {coords:?}");
        busy
    }

    fn holds_real_trigger(&self, coords: CoarseCoord2d) -> bool {
        self.by_coords.get(&coords).is_some_and(|ids| {
            ids.iter()
                .filter_map(|id| self.live(*id))
                .any(|s| s.trigger.action != TriggerAction::Dummy)
        })
    }

    pub fn is_area_occupied(&self, min: CoarseCoord2d, max: CoarseCoord2d) -> bool {
        (min.y..=max.y).any(|y| (min.x..=max.x).any(|x| self.is_occupied(CoarseCoord2d::new(x, y))))
    }

    pub fn set_value(&mut self, id: TriggerId, value: u8) -> bool {
        match self.slots.get_mut(&id).filter(|s| !s.doomed) {
            Some(slot) => {
                slot.trigger.value = value;
                true
            }
            None => false,
        }
    }

    fn refresh_cell(&mut self, coords: CoarseCoord2d) {
        let busy = self.holds_real_trigger(coords);
        let (word, mask) = bit(coords);
        if busy {
            self.occupied[word] |= mask;
        } else {
            self.occupied[word] &= !mask;
        }
    }

    fn index(&mut self, id: TriggerId) {
        let Some(slot) = self.slots.get(&id) else {
            return;
        };
        let coords = slot.trigger.coords;
        if let Some(target) = slot.chain_target {
            self.by_chain_target.entry(target).or_default().push(id);
        }
        self.by_coords.entry(coords).or_default().push(id);
        self.refresh_cell(coords);
    }

    fn unindex_chain(&mut self, id: TriggerId, target: CoarseCoord2d) {
        if let Some(ids) = self.by_chain_target.get_mut(&target) {
            ids.retain(|i| *i != id);
            if ids.is_empty() {
                self.by_chain_target.remove(&target);
            }
        }
    }

    fn unindex(&mut self, id: TriggerId) {
        let Some(slot) = self.slots.get(&id) else {
            return;
        };
        let coords = slot.trigger.coords;
        if let Some(target) = slot.chain_target {
            self.unindex_chain(id, target);
        }
        if let Some(ids) = self.by_coords.get_mut(&coords) {
            ids.retain(|i| *i != id);
            if ids.is_empty() {
                self.by_coords.remove(&coords);
            }
        }
        self.refresh_cell(coords);
    }

    fn alloc(&mut self, trigger: Trigger, chain_target: Option<CoarseCoord2d>) -> TriggerId {
        let id = TriggerId(self.next_id);
        self.next_id += 1;
        self.slots.insert(
            id,
            Slot {
                trigger,
                chain_target,
                doomed: false,
            },
        );
        id
    }

    fn doom(&mut self, id: TriggerId) {
        self.unindex(id);
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.doomed = true;
            self.pending.push(id);
        }
    }

    /// Drops triggers marked by `delete` from the list.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        for id in self.pending.drain(..) {
            self.slots.remove(&id);
        }
        let slots = &self.slots;
        self.order.retain(|id| slots.contains_key(id));
    }

    fn position(&self, id: TriggerId) -> Option<usize> {
        self.order.iter().position(|i| *i == id)
    }

    fn is_chain(&self, id: TriggerId) -> bool {
        self.chain_target(id).is_some()
    }

    fn neighbour(&self, pos: usize, forward: bool) -> Option<TriggerId> {
        let mut candidates: Box<dyn Iterator<Item = &TriggerId>> = if forward {
            Box::new(self.order[pos + 1..].iter())
        } else {
            Box::new(self.order[..pos].iter().rev())
        };
        candidates.find(|id| self.live(**id).is_some()).copied()
    }

    fn reserve(&self, n: usize) -> Result<()> {
        if self.len() + n > TRIGGERS_MAX {
            return Err(MissionError::TriggersFull);
        }
        Ok(())
    }

    /// A trigger at `coords` that no chain reaction follows yet, earliest
    /// in the list first.
    fn chain_anchor(&self, coords: CoarseCoord2d) -> Option<TriggerId> {
        self.at(coords)
            .filter_map(|id| self.position(id).map(|pos| (pos, id)))
            .filter(|(pos, _)| !self.neighbour(*pos, true).is_some_and(|n| self.is_chain(n)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, id)| id)
    }

    /// Adds a trigger.
    ///
    /// Chain reactions need `next_coords`, the cell whose trigger sets them
    /// off; a placeholder is created there if no free trigger exists. Any
    /// other action reuses a placeholder already at `coords`, or else goes
    /// to the head of the list.
    pub fn add(
        &mut self,
        coords: CoarseCoord2d,
        action: TriggerAction,
        value: u8,
        next_coords: Option<CoarseCoord2d>,
    ) -> Result<TriggerId> {
        self.flush();
        let trigger = Trigger {
            coords,
            action,
            value,
        };

        if action != TriggerAction::ChainReaction {
            let dummy = self
                .at(coords)
                .find(|id| self.get(*id).is_some_and(|t| t.action == TriggerAction::Dummy));
            if let Some(id) = dummy {
                if let Some(slot) = self.slots.get_mut(&id) {
                    slot.trigger = trigger;
                }
                self.refresh_cell(coords);
                return Ok(id);
            }
            self.reserve(1)?;
            let id = self.alloc(trigger, None);
            self.order.insert(0, id);
            self.index(id);
            return Ok(id);
        }

        let target = next_coords.ok_or(MissionError::BadTriggerChain)?;
        let anchor = match self.chain_anchor(target) {
            Some(id) => {
                self.reserve(1)?;
                id
            }
            None => {
                self.reserve(2)?;
                let id = self.alloc(Trigger::dummy(target), None);
                self.order.insert(0, id);
                self.index(id);
                log::trace!("placeholder trigger at {target:?} anchors chain reaction");
                id
            }
        };
        let pos = self.position(anchor).ok_or(MissionError::BadTriggerChain)?;
        let id = self.alloc(trigger, Some(target));
        self.order.insert(pos + 1, id);
        self.index(id);
        Ok(id)
    }

    fn make_dummy(&mut self, id: TriggerId) {
        let Some(slot) = self.slots.get_mut(&id) else {
            return;
        };
        let coords = slot.trigger.coords;
        slot.trigger = Trigger::dummy(coords);
        if let Some(target) = slot.chain_target.take() {
            self.unindex_chain(id, target);
        }
        self.refresh_cell(coords);
    }

    /// Deletes a trigger, or demotes it to a placeholder if a chain
    /// reaction depends on its position. `None` for an unknown handle.
    pub fn delete(&mut self, id: TriggerId) -> Option<DeleteOutcome> {
        self.flush();
        let pos = self.position(id)?;
        let slot = self.live(id)?;
        let trigger = slot.trigger;
        let was_chain = slot.chain_target.is_some();
        let pred = self.neighbour(pos, false);
        let succ = self.neighbour(pos, true);

        let anchors_chain = succ.is_some_and(|s| self.is_chain(s));
        let shares_pred_coords = pred
            .and_then(|p| self.get(p))
            .is_some_and(|p| p.coords == trigger.coords);

        let outcome = if anchors_chain && !shares_pred_coords {
            if trigger.action == TriggerAction::Dummy {
                return Some(DeleteOutcome::Retained);
            }
            self.make_dummy(id);
            DeleteOutcome::Converted
        } else {
            self.doom(id);
            DeleteOutcome::Removed
        };

        if was_chain {
            let pred_is_dummy = pred
                .and_then(|p| self.get(p))
                .is_some_and(|p| p.action == TriggerAction::Dummy);
            let pred_succ = match outcome {
                DeleteOutcome::Removed => succ,
                _ => Some(id),
            };
            if let Some(p) = pred.filter(|_| pred_is_dummy) {
                if !pred_succ.is_some_and(|s| self.is_chain(s)) {
                    log::trace!("dropping redundant placeholder {p:?}");
                    self.doom(p);
                }
            }
        }
        Some(outcome)
    }

    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let start = r.pos();
        let count = r.read_i32()?;
        let count = usize::try_from(count)
            .ok()
            .filter(|&n| n <= TRIGGERS_MAX)
            .ok_or(MissionError::BadNumTriggers(count))?;

        let mut triggers = Self::default();
        let mut prev: Option<CoarseCoord2d> = None;
        for _ in 0..count {
            let coords = CoarseCoord2d::read(r)?;
            let action = TriggerAction::from_raw(r.read_u8()?)?;
            let value = r.read_u8()?;
            let chain_target = if action == TriggerAction::ChainReaction {
                Some(prev.ok_or(MissionError::BadTriggerChain)?)
            } else {
                None
            };
            let id = triggers.alloc(
                Trigger {
                    coords,
                    action,
                    value,
                },
                chain_target,
            );
            triggers.order.push(id);
            triggers.index(id);
            prev = Some(coords);
        }
        r.seek_to(start + BLOCK_SIZE)?;
        log::debug!("read {count} triggers");
        Ok(triggers)
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        let start = w.pos();
        w.write_i32(self.len() as i32)?;
        for (_, t) in self.iter() {
            t.coords.write(w)?;
            w.write_u8(t.action.to_raw())?;
            w.write_u8(t.value)?;
        }
        w.pad_to(start + BLOCK_SIZE)
    }
}

/// Triggers compare by list contents; handles are not significant.
impl PartialEq for Triggers {
    fn eq(&self, other: &Self) -> bool {
        self.max_losses == other.max_losses
            && self.len() == other.len()
            && self.iter().zip(other.iter()).all(|((_, a), (_, b))| a == b)
    }
}

impl Serialize for Triggers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let list: Vec<&Trigger> = self.iter().map(|(_, t)| t).collect();
        let mut s = serializer.serialize_struct("Triggers", 2)?;
        s.serialize_field("max_losses", &self.max_losses)?;
        s.serialize_field("triggers", &list)?;
        s.end()
    }
}
