//! Asset filenames referenced by a mission.
//!
//! Each name lives in a fixed-width slot that is obscured on disk with a
//! ten-pass XOR cipher keyed on the byte's absolute file position. The
//! transform is its own inverse.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::io::{MissionReader, MissionWriter};
use crate::{MissionError, Result};

pub const SLOT_SIZE: usize = 12;
pub const MAX_NAME_LEN: usize = SLOT_SIZE - 1;

const CIPHER_PASSES: i32 = 10;
const CIPHER_START: i32 = 0xBD;
const CIPHER_STRIDE: i32 = 0x13;
const CIPHER_POS_MULT: i64 = 7;

const SLOT_TERMINATOR: u8 = b'\r';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilenameKind {
    Tiles,
    Grid,
    Objects,
    Animations,
    Sky,
    Planets,
    Palette,
}

impl FilenameKind {
    pub const ALL: [FilenameKind; 7] = [
        FilenameKind::Tiles,
        FilenameKind::Grid,
        FilenameKind::Objects,
        FilenameKind::Animations,
        FilenameKind::Sky,
        FilenameKind::Planets,
        FilenameKind::Palette,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilenameKind::Tiles => "tiles",
            FilenameKind::Grid => "grid",
            FilenameKind::Objects => "objects",
            FilenameKind::Animations => "animations",
            FilenameKind::Sky => "sky",
            FilenameKind::Planets => "planets",
            FilenameKind::Palette => "palette",
        }
    }
}

fn cipher_key(pos: u64, pass: i32) -> u8 {
    let key = (pos as i64) * CIPHER_POS_MULT + i64::from(CIPHER_START - pass * CIPHER_STRIDE);
    key.rem_euclid(256) as u8
}

/// Applies the slot cipher in place. `pos` is the absolute file offset of
/// `bytes[0]`.
pub fn cipher(bytes: &mut [u8], pos: u64) {
    for pass in 0..CIPHER_PASSES {
        for (i, b) in bytes.iter_mut().enumerate() {
            *b ^= cipher_key(pos + i as u64, pass);
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN && name.bytes().all(|b| (b' '..=b'~').contains(&b))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filenames {
    names: [String; 7],
}

impl Filenames {
    pub fn get(&self, kind: FilenameKind) -> &str {
        &self.names[kind as usize]
    }

    /// Names must be at most eleven printable ASCII characters.
    pub fn set(&mut self, kind: FilenameKind, name: &str) -> Result<()> {
        if !is_valid_name(name) {
            return Err(MissionError::BadFilename(kind.name()));
        }
        self.names[kind as usize] = name.to_string();
        Ok(())
    }

    pub(crate) fn read<R: Read>(r: &mut MissionReader<R>) -> Result<Self> {
        let mut out = Self::default();
        for kind in FilenameKind::ALL {
            let pos = r.pos();
            let mut slot = r.read_bytes::<SLOT_SIZE>()?;
            cipher(&mut slot, pos);

            let end = slot
                .iter()
                .position(|&b| b == SLOT_TERMINATOR || b == 0)
                .ok_or(MissionError::BadFilename(kind.name()))?;
            let name = std::str::from_utf8(&slot[..end])
                .ok()
                .filter(|n| is_valid_name(n))
                .ok_or(MissionError::BadFilename(kind.name()))?;
            out.names[kind as usize] = name.to_string();
        }
        log::trace!("filenames: {:?}", out.names);
        Ok(out)
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        for kind in FilenameKind::ALL {
            let name = self.get(kind).as_bytes();
            let mut slot = [0u8; SLOT_SIZE];
            slot[..name.len()].copy_from_slice(name);
            slot[name.len()] = SLOT_TERMINATOR;
            cipher(&mut slot, w.pos());
            w.write_bytes(&slot)?;
        }
        Ok(())
    }
}
