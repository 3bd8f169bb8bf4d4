//! Minimal MRC header access
//!
//! Only the fields needed to count frames in a movie stack are read.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Size of the fixed MRC header
pub const HEADER_LEN: usize = 1024;

/// Data modes defined by the MRC2014 format
const KNOWN_MODES: [i32; 9] = [0, 1, 2, 3, 4, 6, 12, 101, 102];

/// Dimensions of an MRC volume or movie stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MrcHeader {
    pub nx: i32,
    pub ny: i32,
    /// Number of sections; frames for a movie stack
    pub nz: i32,
    pub mode: i32,
}

impl MrcHeader {
    /// Parses the leading words of a header, `None` if they do not look like MRC.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }

        let word = |index: usize| {
            let start = index * 4;
            let raw: [u8; 4] = bytes.get(start..start + 4)?.try_into().ok()?;
            Some(i32::from_le_bytes(raw))
        };

        let header = Self {
            nx: word(0)?,
            ny: word(1)?,
            nz: word(2)?,
            mode: word(3)?,
        };

        let sane = header.nx > 0
            && header.ny > 0
            && header.nz > 0
            && KNOWN_MODES.contains(&header.mode);
        sane.then_some(header)
    }

    /// Reads and parses the header of `path`.
    pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        File::open(path.as_ref())?.read_exact(&mut buf)?;
        Self::parse(&buf).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not an MRC file", path.as_ref().display()),
            )
        })
    }

    /// Encodes a header with the given dimensions; the remaining words are zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_LEN];
        for (i, value) in [self.nx, self.ny, self.nz, self.mode].iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
        }
        bytes[208..212].copy_from_slice(b"MAP ");
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_stack_header() {
        let header = MrcHeader {
            nx: 4096,
            ny: 4096,
            nz: 40,
            mode: 1,
        };
        assert_eq!(MrcHeader::parse(&header.to_bytes()), Some(header));
    }

    #[test]
    fn test_rejects_short_or_garbage_headers() {
        assert!(MrcHeader::parse(&[0u8; 16]).is_none());
        assert!(MrcHeader::parse(&[0xffu8; HEADER_LEN]).is_none());
    }

    #[test]
    fn test_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let header = MrcHeader {
            nx: 10,
            ny: 10,
            nz: 7,
            mode: 2,
        };
        file.write_all(&header.to_bytes()).unwrap();
        assert_eq!(MrcHeader::read(file.path()).unwrap().nz, 7);

        let mut text = tempfile::NamedTempFile::new().unwrap();
        text.write_all(b"not a movie").unwrap();
        assert!(MrcHeader::read(text.path()).is_err());
    }
}
