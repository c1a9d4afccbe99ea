//! Sequential little-endian reader and writer used by every codec in the
//! crate. Both track their absolute position so that position-dependent
//! encodings (the filename cipher) and fixed field offsets can be checked.

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{self, Read, Write};

use crate::{MissionError, Result};

fn read_error(err: io::Error) -> MissionError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        MissionError::Truncated
    } else {
        MissionError::ReadFail(err)
    }
}

pub struct MissionReader<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> MissionReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.inner.read_u8().map_err(read_error)?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        let v = self.inner.read_i8().map_err(read_error)?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let v = self.inner.read_u16::<LE>().map_err(read_error)?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let v = self.inner.read_i32::<LE>().map_err(read_error)?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(read_error)?;
        self.pos += N as u64;
        Ok(buf)
    }

    /// Skips forward to an absolute offset. The stream cannot be rewound.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        if offset < self.pos {
            return Err(MissionError::BadSeek {
                from: self.pos,
                to: offset,
            });
        }
        let want = offset - self.pos;
        let skipped = io::copy(&mut (&mut self.inner).take(want), &mut io::sink())
            .map_err(read_error)?;
        self.pos += skipped;
        if skipped != want {
            return Err(MissionError::Truncated);
        }
        Ok(())
    }

    /// Reads up to `limit` bytes, stopping early at end of stream.
    ///
    /// Returns the bytes read and whether more data followed the limit.
    pub fn read_up_to(&mut self, limit: usize) -> Result<(Vec<u8>, bool)> {
        let mut buf = Vec::new();
        buf.try_reserve(limit).map_err(|_| MissionError::NoMem)?;
        let got = (&mut self.inner)
            .take(limit as u64)
            .read_to_end(&mut buf)
            .map_err(read_error)?;
        self.pos += got as u64;

        let mut probe = [0u8; 1];
        let more = loop {
            match self.inner.read(&mut probe) {
                Ok(0) => break false,
                Ok(_) => break true,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(MissionError::ReadFail(e)),
            }
        };
        Ok((buf, more))
    }
}

pub struct MissionWriter<W> {
    inner: W,
    pos: u64,
}

impl<W: Write> MissionWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, pos: 0 }
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.inner.write_u8(v).map_err(MissionError::WriteFail)?;
        self.pos += 1;
        Ok(())
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.inner.write_i8(v).map_err(MissionError::WriteFail)?;
        self.pos += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.inner.write_u16::<LE>(v).map_err(MissionError::WriteFail)?;
        self.pos += 2;
        Ok(())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.inner.write_i32::<LE>(v).map_err(MissionError::WriteFail)?;
        self.pos += 4;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).map_err(MissionError::WriteFail)?;
        self.pos += bytes.len() as u64;
        Ok(())
    }

    /// Zero-fills up to an absolute offset.
    pub fn pad_to(&mut self, offset: u64) -> Result<()> {
        if offset < self.pos {
            return Err(MissionError::BadSeek {
                from: self.pos,
                to: offset,
            });
        }
        let n = offset - self.pos;
        io::copy(&mut io::repeat(0).take(n), &mut self.inner).map_err(MissionError::WriteFail)?;
        self.pos = offset;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(MissionError::WriteFail)
    }
}

/// Null sink that only counts what is written to it.
#[derive(Debug, Default)]
pub struct SizeCounter {
    count: u64,
}

impl SizeCounter {
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Write for SizeCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.count += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
