//! Mission briefing and the string section at the end of the file.
//!
//! All mission text (the title, the briefing blocks and the target info
//! texts) sits in one blob preceded by a table of offsets. Offsets are
//! relative to the start of that table, so the first string is always at
//! offset 80.

use serde::Serialize;
use std::io::{Read, Write};

use crate::coords::CoarseCoord2d;
use crate::io::{MissionReader, MissionWriter};
use crate::target_info::{TargetInfo, TargetInfos, TARGET_INFOS_MAX};
use crate::text::{Text, HEADER_SIZE};
use crate::{MissionError, Result};

pub const BLOCKS_MAX: usize = 7;

const TITLE_SLOT: usize = 0;
const FIRST_BLOCK_SLOT: usize = 1;
const FIRST_TARGET_INFO_SLOT: usize = FIRST_BLOCK_SLOT + BLOCKS_MAX;
const INDEX_SLOTS: usize = FIRST_TARGET_INFO_SLOT + 2 * TARGET_INFOS_MAX;

pub const INDEX_SIZE: usize = INDEX_SLOTS * 4;
pub const BLOB_SIZE: usize = 3772;

const MIN_OFFSET: usize = INDEX_SIZE;
const MAX_OFFSET: usize = INDEX_SIZE + BLOB_SIZE - HEADER_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Briefing {
    pub title: Text,
    blocks: Vec<Text>,
}

impl Default for Briefing {
    fn default() -> Self {
        Self {
            title: Text::default(),
            blocks: vec![Text::default()],
        }
    }
}

impl Briefing {
    pub fn blocks(&self) -> &[Text] {
        &self.blocks
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut Text> {
        self.blocks.get_mut(index)
    }

    /// Inserts a block before `index` (clamped to the end).
    pub fn insert_block(&mut self, index: usize, text: Text) -> Result<()> {
        if self.blocks.len() >= BLOCKS_MAX {
            return Err(MissionError::BriefingFull);
        }
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, text);
        Ok(())
    }

    pub fn add_block(&mut self, text: Text) -> Result<()> {
        self.insert_block(self.blocks.len(), text)
    }

    /// Removes a block. A briefing always keeps at least one.
    pub fn remove_block(&mut self, index: usize) -> Result<Option<Text>> {
        if index >= self.blocks.len() {
            return Ok(None);
        }
        if self.blocks.len() == 1 {
            return Err(MissionError::BriefingEmpty);
        }
        Ok(Some(self.blocks.remove(index)))
    }
}

fn check_offset(raw: i32) -> Result<usize> {
    usize::try_from(raw)
        .ok()
        .filter(|o| o % 4 == 0 && (MIN_OFFSET..=MAX_OFFSET).contains(o))
        .ok_or(MissionError::BadStringOffset(raw))
}

/// Everything stored in the string section.
#[derive(Debug)]
pub(crate) struct Strings {
    pub briefing: Briefing,
    pub target_infos: TargetInfos,
    /// The section ended before the full blob size.
    pub short: bool,
}

impl Strings {
    /// Reads the block count, offset table and blob. `target_coords` gives
    /// the target info entries, in file order, whose texts are wanted.
    pub(crate) fn read<R: Read>(
        r: &mut MissionReader<R>,
        target_coords: &[CoarseCoord2d],
    ) -> Result<Self> {
        let count = r.read_i32()?;
        let count = usize::try_from(count)
            .ok()
            .filter(|n| (1..=BLOCKS_MAX).contains(n))
            .ok_or(MissionError::BadNumBriefings(count))?;

        let mut index = [0i32; INDEX_SLOTS];
        for slot in &mut index {
            *slot = r.read_i32()?;
        }

        let (blob, more) = r.read_up_to(BLOB_SIZE)?;
        if more {
            return Err(MissionError::TooLong);
        }
        let short = blob.len() < BLOB_SIZE;

        let text = |slot: usize| -> Result<Text> {
            let offset = check_offset(index[slot])?;
            Text::decode(&blob, offset - INDEX_SIZE)
        };

        let title = text(TITLE_SLOT)?;
        let blocks = (0..count)
            .map(|i| text(FIRST_BLOCK_SLOT + i))
            .collect::<Result<Vec<_>>>()?;

        let mut infos = Vec::with_capacity(target_coords.len());
        for (i, coords) in target_coords.iter().enumerate() {
            let slot = FIRST_TARGET_INFO_SLOT + 2 * i;
            let texts = [text(slot)?, text(slot + 1)?];
            infos.push((*coords, TargetInfo { texts }));
        }
        log::debug!(
            "read title, {count} briefing blocks and {} target infos from {} byte blob",
            infos.len(),
            blob.len()
        );

        Ok(Self {
            briefing: Briefing { title, blocks },
            target_infos: TargetInfos::from_parts(infos),
            short,
        })
    }

    /// Writes the block count, offset table and blob, padded to full size.
    /// Every offset is worked out before any string is written.
    pub(crate) fn write<W: Write>(
        w: &mut MissionWriter<W>,
        briefing: &Briefing,
        target_infos: &TargetInfos,
    ) -> Result<()> {
        let mut texts: Vec<(usize, &Text)> = vec![(TITLE_SLOT, &briefing.title)];
        texts.extend(
            briefing
                .blocks
                .iter()
                .enumerate()
                .map(|(i, t)| (FIRST_BLOCK_SLOT + i, t)),
        );
        for (i, (_, info)) in target_infos.iter().enumerate() {
            let slot = FIRST_TARGET_INFO_SLOT + 2 * i;
            texts.push((slot, &info.texts[0]));
            texts.push((slot + 1, &info.texts[1]));
        }

        let mut index = [0i32; INDEX_SLOTS];
        let mut next = MIN_OFFSET;
        for (slot, text) in &texts {
            index[*slot] = next as i32;
            next += text.encoded_len();
        }
        if next > INDEX_SIZE + BLOB_SIZE {
            return Err(MissionError::TextOverflow(BLOB_SIZE));
        }

        w.write_i32(briefing.blocks.len() as i32)?;
        let table_start = w.pos();
        for offset in index {
            w.write_i32(offset)?;
        }
        for (_, text) in &texts {
            text.write(w)?;
        }
        w.pad_to(table_start + (INDEX_SIZE + BLOB_SIZE) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Briefing, TargetInfos) {
        let mut briefing = Briefing::default();
        briefing.title.set_string("Operation Nightfall");
        briefing.block_mut(0).unwrap().set_string("Destroy the radar.");
        briefing.add_block(Text::new("Then return to base.")).unwrap();
        let mut infos = TargetInfos::default();
        let info = infos.add(CoarseCoord2d::new(40, 41)).unwrap();
        info.texts[0].set_string("Radar dish");
        info.texts[1].colour = 7;
        (briefing, infos)
    }

    fn encode(briefing: &Briefing, infos: &TargetInfos) -> Vec<u8> {
        let mut w = MissionWriter::new(Vec::new());
        Strings::write(&mut w, briefing, infos).unwrap();
        w.into_inner()
    }

    #[test]
    fn section_round_trips() {
        let (briefing, infos) = sample();
        let bytes = encode(&briefing, &infos);
        assert_eq!(bytes.len(), 4 + INDEX_SIZE + BLOB_SIZE);
        assert_eq!(&bytes[4..8], &80i32.to_le_bytes());

        let coords: Vec<CoarseCoord2d> = infos.iter().map(|(c, _)| c).collect();
        let back = Strings::read(&mut MissionReader::new(&bytes[..]), &coords).unwrap();
        assert!(!back.short);
        assert_eq!(back.briefing, briefing);
        assert_eq!(back.target_infos, infos);
    }

    #[test]
    fn short_section_is_flagged() {
        let (briefing, infos) = sample();
        let bytes = encode(&briefing, &infos);
        let used: usize = 4 + INDEX_SIZE
            + briefing.title.encoded_len()
            + briefing.blocks().iter().map(Text::encoded_len).sum::<usize>()
            + infos
                .iter()
                .map(|(_, i)| i.texts[0].encoded_len() + i.texts[1].encoded_len())
                .sum::<usize>();
        let coords: Vec<CoarseCoord2d> = infos.iter().map(|(c, _)| c).collect();
        let back = Strings::read(&mut MissionReader::new(&bytes[..used]), &coords).unwrap();
        assert!(back.short);
        assert_eq!(back.briefing, briefing);

        let err = Strings::read(&mut MissionReader::new(&bytes[..used - 4]), &coords).unwrap_err();
        assert!(matches!(err, MissionError::Truncated));
    }

    #[test]
    fn trailing_data_is_too_long() {
        let (briefing, infos) = sample();
        let mut bytes = encode(&briefing, &infos);
        bytes.push(0);
        let err = Strings::read(&mut MissionReader::new(&bytes[..]), &[]).unwrap_err();
        assert!(matches!(err, MissionError::TooLong));
    }

    #[test]
    fn offsets_are_validated() {
        let (briefing, infos) = sample();
        let mut bytes = encode(&briefing, &infos);
        bytes[4..8].copy_from_slice(&82i32.to_le_bytes());
        let err = Strings::read(&mut MissionReader::new(&bytes[..]), &[]).unwrap_err();
        assert!(matches!(err, MissionError::BadStringOffset(82)));

        bytes[4..8].copy_from_slice(&76i32.to_le_bytes());
        let err = Strings::read(&mut MissionReader::new(&bytes[..]), &[]).unwrap_err();
        assert!(matches!(err, MissionError::BadStringOffset(76)));

        let past_end = (MAX_OFFSET + 4) as i32;
        bytes[4..8].copy_from_slice(&past_end.to_le_bytes());
        let err = Strings::read(&mut MissionReader::new(&bytes[..]), &[]).unwrap_err();
        assert!(matches!(err, MissionError::BadStringOffset(_)));
    }

    #[test]
    fn block_count_is_validated() {
        let (briefing, infos) = sample();
        let mut bytes = encode(&briefing, &infos);
        bytes[0..4].copy_from_slice(&0i32.to_le_bytes());
        let err = Strings::read(&mut MissionReader::new(&bytes[..]), &[]).unwrap_err();
        assert!(matches!(err, MissionError::BadNumBriefings(0)));
    }

    #[test]
    fn overflowing_text_is_rejected() {
        let mut briefing = Briefing::default();
        let long = "x".repeat(600);
        for _ in 0..BLOCKS_MAX - 1 {
            briefing.add_block(Text::new(&long)).unwrap();
        }
        let mut w = MissionWriter::new(Vec::new());
        let err = Strings::write(&mut w, &briefing, &TargetInfos::default()).unwrap_err();
        assert!(matches!(err, MissionError::TextOverflow(BLOB_SIZE)));
    }

    #[test]
    fn block_limits() {
        let mut briefing = Briefing::default();
        assert!(matches!(briefing.remove_block(0), Err(MissionError::BriefingEmpty)));
        for _ in 1..BLOCKS_MAX {
            briefing.add_block(Text::default()).unwrap();
        }
        assert!(matches!(
            briefing.add_block(Text::default()),
            Err(MissionError::BriefingFull)
        ));
        assert!(briefing.remove_block(3).unwrap().is_some());
        assert!(briefing.remove_block(10).unwrap().is_none());
    }
}
