//! Loading and saving resources through a zlib stream.

use chrono::{DateTime, Utc};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::dfile::{DFile, Shared};
use crate::{MissionError, Result};

/// Largest stored (uncompressed) deflate block.
const STORED_BLOCK_SIZE: u64 = 16383;
const STORED_BLOCK_OVERHEAD: u64 = 5;
const ZLIB_OVERHEAD: u64 = 6;

/// Upper bound on the compressed size of `n` bytes of input.
pub fn zlib_bound(n: u64) -> u64 {
    n + STORED_BLOCK_OVERHEAD * n.div_ceil(STORED_BLOCK_SIZE).max(1) + ZLIB_OVERHEAD
}

/// Replaces the resource's contents with the file at `path` and records
/// the file as its save location.
pub fn load_compressed<T: DFile>(resource: &Shared<T>, path: &Path) -> Result<()> {
    let file = File::open(path).map_err(MissionError::ReadFail)?;
    let modified = file
        .metadata()
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let data = T::read_from(ZlibDecoder::new(BufReader::new(file)))?;
    *resource.edit() = data;
    resource.set_saved(&path.to_string_lossy(), modified);
    log::debug!("loaded {}", path.display());
    Ok(())
}

/// Writes the resource to `path` and records it as saved there.
pub fn save_compressed<T: DFile>(resource: &Shared<T>, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(MissionError::WriteFail)?;
    let mut encoder = ZlibEncoder::new(BufWriter::new(file), Compression::default());
    resource.write_to(&mut encoder)?;
    let mut out = encoder.finish().map_err(MissionError::WriteFail)?;
    std::io::Write::flush(&mut out).map_err(MissionError::WriteFail)?;

    resource.set_saved(&path.to_string_lossy(), Utc::now());
    log::debug!("saved {}", path.display());
    Ok(())
}

/// Largest number of bytes `save_compressed` could produce.
pub fn worst_compressed_size<T: DFile>(resource: &Shared<T>) -> Result<u64> {
    Ok(zlib_bound(resource.min_size()?))
}
