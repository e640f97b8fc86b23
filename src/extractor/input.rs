use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;

use crate::shared::{AsRankError, Result};

const READ_BUFFER_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Compression::Gzip,
            Some(ext) if ext.eq_ignore_ascii_case("bz2") => Compression::Bzip2,
            _ => Compression::None,
        }
    }
}

/// Opens a dump for line reading, decompressing by file extension.
///
/// Corrupt compressed data is not detected here; it surfaces as a read error once the
/// aggregator starts pulling lines.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).map_err(|source| AsRankError::OpenInput {
        path: path.to_path_buf(),
        source,
    })?;

    let reader: Box<dyn BufRead + Send> = match Compression::from_path(path) {
        Compression::Gzip => Box::new(BufReader::with_capacity(
            READ_BUFFER_BYTES,
            MultiGzDecoder::new(file),
        )),
        Compression::Bzip2 => Box::new(BufReader::with_capacity(
            READ_BUFFER_BYTES,
            BzDecoder::new(file),
        )),
        Compression::None => Box::new(BufReader::with_capacity(READ_BUFFER_BYTES, file)),
    };

    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_follows_extension() {
        assert_eq!(Compression::from_path(Path::new("rib.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("rib.BZ2")), Compression::Bzip2);
        assert_eq!(Compression::from_path(Path::new("rib.txt")), Compression::None);
        assert_eq!(Compression::from_path(Path::new("rib")), Compression::None);
    }
}
