//! Mission text records and the game's single-byte character set.
//!
//! The game does not use ASCII for on-screen text. Each character is one
//! byte from a closed alphabet; byte 254 starts a new line and byte 255
//! terminates the string. Characters outside the alphabet are encoded as
//! a space, so encoding is lossy for arbitrary input but exact for any
//! string built from supported characters.

use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::io::{MissionReader, MissionWriter};
use crate::{MissionError, Result};

pub const CHAR_NEWLINE: u8 = 254;
pub const CHAR_TERMINATOR: u8 = 255;

const FIRST_UPPER: u8 = 0;
const FIRST_LOWER: u8 = 26;
const FIRST_DIGIT: u8 = 52;
const CHAR_SPACE: u8 = 62;
const FIRST_PUNCT: u8 = 63;
const PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', '\'', '-', ':', ';', '(', ')', '/', '"', '&', '%', '+', '*', '=', '#',
];

/// Size of the fixed parameter block that precedes each string.
pub const HEADER_SIZE: usize = 48;
const RESERVED_SIZE: usize = 12;

pub fn encode_char(c: char) -> u8 {
    match c {
        'A'..='Z' => FIRST_UPPER + (c as u8 - b'A'),
        'a'..='z' => FIRST_LOWER + (c as u8 - b'a'),
        '0'..='9' => FIRST_DIGIT + (c as u8 - b'0'),
        ' ' => CHAR_SPACE,
        '\n' => CHAR_NEWLINE,
        _ => match PUNCTUATION.iter().position(|&p| p == c) {
            Some(i) => FIRST_PUNCT + i as u8,
            None => CHAR_SPACE,
        },
    }
}

/// Maps a byte back to a character; `None` for bytes outside the alphabet
/// (including the terminator).
pub fn decode_char(b: u8) -> Option<char> {
    match b {
        0..=25 => Some((b'A' + b - FIRST_UPPER) as char),
        26..=51 => Some((b'a' + b - FIRST_LOWER) as char),
        52..=61 => Some((b'0' + b - FIRST_DIGIT) as char),
        CHAR_SPACE => Some(' '),
        CHAR_NEWLINE => Some('\n'),
        _ => PUNCTUATION.get(usize::from(b.wrapping_sub(FIRST_PUNCT))).copied(),
    }
}

pub fn is_supported(c: char) -> bool {
    decode_char(encode_char(c)) == Some(c)
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorType {
    #[default]
    None,
    Block,
    Underline,
}

impl CursorType {
    fn from_raw(v: i32) -> Result<Self> {
        match v {
            0 => Ok(Self::None),
            1 => Ok(Self::Block),
            2 => Ok(Self::Underline),
            _ => Err(MissionError::BadTextCursor(v)),
        }
    }

    fn to_raw(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Block => 1,
            Self::Underline => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    /// Display time in centiseconds.
    pub duration: i32,
    pub delay: i32,
    /// Characters revealed per frame.
    pub speed: i32,
    pub x: i32,
    pub y: i32,
    pub y_clip: i32,
    pub repeat: bool,
    pub colour: u8,
    pub cursor: CursorType,
    string: String,
}

impl Default for Text {
    fn default() -> Self {
        Self {
            duration: 500,
            delay: 0,
            speed: 1,
            x: 0,
            y: 0,
            y_clip: 0,
            repeat: false,
            colour: 255,
            cursor: CursorType::None,
            string: String::new(),
        }
    }
}

impl Text {
    pub fn new(string: &str) -> Self {
        let mut text = Self::default();
        text.set_string(string);
        text
    }

    pub fn string(&self) -> &str {
        &self.string
    }

    /// Replaces the string, substituting a space for any character the
    /// game cannot display.
    pub fn set_string(&mut self, s: &str) {
        self.string = s
            .chars()
            .map(|c| if is_supported(c) { c } else { ' ' })
            .collect();
    }

    /// Bytes this record occupies in the text blob, header included.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + align4(self.string.chars().count() + 1)
    }

    /// Decodes a record starting at `offset` within `blob`.
    pub(crate) fn decode(blob: &[u8], offset: usize) -> Result<Self> {
        let header = blob
            .get(offset..offset + HEADER_SIZE)
            .ok_or(MissionError::Truncated)?;
        let mut r = MissionReader::new(header);

        let duration = r.read_i32()?;
        if duration < 0 {
            return Err(MissionError::BadTextDuration(duration));
        }
        let delay = r.read_i32()?;
        if delay < 0 {
            return Err(MissionError::BadTextDelay(delay));
        }
        let speed = r.read_i32()?;
        if speed < 0 {
            return Err(MissionError::BadTextSpeed(speed));
        }
        let x = r.read_i32()?;
        let y = r.read_i32()?;
        let y_clip = r.read_i32()?;
        let repeat = match r.read_i32()? {
            0 => false,
            1 => true,
            v => return Err(MissionError::BadTextRepeat(v)),
        };
        let colour = r.read_i32()?;
        let colour = u8::try_from(colour).map_err(|_| MissionError::BadTextColour(colour))?;
        let cursor = CursorType::from_raw(r.read_i32()?)?;
        // The trailing reserved words are scratch space for the game's
        // renderer and are not preserved.

        let body = &blob[offset + HEADER_SIZE..];
        let end = body
            .iter()
            .position(|&b| b == CHAR_TERMINATOR)
            .ok_or(MissionError::Truncated)?;
        let string = body[..end]
            .iter()
            .map(|&b| decode_char(b).ok_or(MissionError::BadStringChar(b)))
            .collect::<Result<String>>()?;

        Ok(Self {
            duration,
            delay,
            speed,
            x,
            y,
            y_clip,
            repeat,
            colour,
            cursor,
            string,
        })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut MissionWriter<W>) -> Result<()> {
        let start = w.pos();
        w.write_i32(self.duration)?;
        w.write_i32(self.delay)?;
        w.write_i32(self.speed)?;
        w.write_i32(self.x)?;
        w.write_i32(self.y)?;
        w.write_i32(self.y_clip)?;
        w.write_i32(i32::from(self.repeat))?;
        w.write_i32(i32::from(self.colour))?;
        w.write_i32(self.cursor.to_raw())?;
        w.write_bytes(&[0u8; RESERVED_SIZE])?;

        let encoded: Vec<u8> = self.string.chars().map(encode_char).collect();
        w.write_bytes(&encoded)?;
        w.write_u8(CHAR_TERMINATOR)?;
        w.pad_to(start + self.encoded_len() as u64)
    }
}
