//! # WAD archive
//!
//! * Holds the whole archive in RAM.
//! * Slices individual lumps without copying.
//! * Decodes fixed-size binary lumps into typed vectors with **bincode 2**.
//!
//! Both `IWAD` and `PWAD` headers are accepted.

use bincode::{Decode, config, decode_from_slice};
use byteorder::{LittleEndian as LE, ReadBytesExt};
use log::info;
use std::{collections::HashMap, fs, io, mem, path::Path};
use thiserror::Error;

/// Size of the header and of one directory entry on disk.
const HEADER_SIZE: usize = 12;
const DIR_ENTRY_SIZE: usize = 16;

/// One entry in the lump directory.
#[derive(Clone, Debug)]
pub struct LumpInfo {
    pub name: [u8; 8],
    pub offset: u32,
    pub size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WadKind {
    Iwad,
    Pwad,
}

/// Entire archive in memory (raw bytes + parsed directory).
#[derive(Debug)]
pub struct Wad {
    kind: WadKind,
    lumps: Vec<LumpInfo>,
    bytes: Vec<u8>,
    by_name: HashMap<String, usize>,
}

#[derive(Error, Debug)]
pub enum WadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("file is neither an IWAD nor a PWAD")]
    BadMagic,

    #[error("directory extends beyond end of file")]
    DirectoryOutOfBounds,

    #[error("lump index {0} out of range")]
    BadIndex(usize),

    #[error("lump {name} (# {index}) slice {offset}+{size} past EOF ({file_size})")]
    BadOffset {
        index: usize,
        name: String,
        offset: u32,
        size: u32,
        file_size: usize,
    },

    #[error("lump {name} (# {index}) size {size} not multiple of element {elem_size}")]
    BadLumpSize {
        index: usize,
        name: String,
        size: usize,
        elem_size: usize,
    },

    #[error("lump {name} (# {index}) element {elem}: {source}")]
    BadElement {
        index: usize,
        name: String,
        elem: usize,
        source: bincode::error::DecodeError,
    },
}

impl Wad {
    /*──────────────────────────── loading ───────────────────────────*/

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WadError> {
        let wad = Self::from_bytes(fs::read(path.as_ref())?)?;
        info!(
            "{}: {:?}, {} lumps",
            path.as_ref().display(),
            wad.kind,
            wad.lumps.len()
        );
        Ok(wad)
    }

    /// Parse an archive already in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, WadError> {
        let mut header = bytes.get(..HEADER_SIZE).ok_or(WadError::BadMagic)?;
        let kind = match &header[..4] {
            b"IWAD" => WadKind::Iwad,
            b"PWAD" => WadKind::Pwad,
            _ => return Err(WadError::BadMagic),
        };
        header = &header[4..];
        let num_lumps = header.read_u32::<LE>()? as usize;
        let dir_offset = header.read_u32::<LE>()? as usize;

        let mut cursor = num_lumps
            .checked_mul(DIR_ENTRY_SIZE)
            .and_then(|len| dir_offset.checked_add(len))
            .and_then(|end| bytes.get(dir_offset..end))
            .ok_or(WadError::DirectoryOutOfBounds)?;

        let mut lumps = Vec::with_capacity(num_lumps);
        for _ in 0..num_lumps {
            let offset = cursor.read_u32::<LE>()?;
            let size = cursor.read_u32::<LE>()?;
            let mut name = [0u8; 8];
            io::Read::read_exact(&mut cursor, &mut name)?;
            lumps.push(LumpInfo { name, offset, size });
        }

        for (i, l) in lumps.iter().enumerate() {
            if l.offset as usize + l.size as usize > bytes.len() {
                return Err(WadError::BadOffset {
                    index: i,
                    name: Self::lump_name_str(&l.name).into(),
                    offset: l.offset,
                    size: l.size,
                    file_size: bytes.len(),
                });
            }
        }

        // later lumps shadow earlier ones
        let mut by_name = HashMap::with_capacity(lumps.len());
        for (i, l) in lumps.iter().enumerate().rev() {
            by_name
                .entry(Self::lump_name_str(&l.name).to_ascii_uppercase())
                .or_insert(i);
        }

        Ok(Self {
            kind,
            lumps,
            bytes,
            by_name,
        })
    }

    /*──────────────────────────── lookup ────────────────────────────*/

    pub fn kind(&self) -> WadKind {
        self.kind
    }

    pub fn lumps(&self) -> &[LumpInfo] {
        &self.lumps
    }

    /// `&str` view of an 8-byte lump name (trimmed at first NUL).
    pub fn lump_name_str(name: &[u8; 8]) -> &str {
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        std::str::from_utf8(&name[..end]).unwrap_or("?")
    }

    pub fn lump_name(&self, idx: usize) -> Result<&str, WadError> {
        let l = self.lumps.get(idx).ok_or(WadError::BadIndex(idx))?;
        Ok(Self::lump_name_str(&l.name))
    }

    /// Raw bytes of lump `idx`. Bounds were validated when the archive was
    /// opened.
    pub fn lump_bytes(&self, idx: usize) -> Result<&[u8], WadError> {
        let l = self.lumps.get(idx).ok_or(WadError::BadIndex(idx))?;
        let start = l.offset as usize;
        Ok(&self.bytes[start..start + l.size as usize])
    }

    /// Last lump called `name`, ignoring case.
    pub fn find_lump(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_uppercase()).copied()
    }

    /// Lumps strictly between the markers `start` and `end`, e.g.
    /// `F_START`/`F_END`. Empty if either marker is missing.
    pub fn lumps_between(&self, start: &str, end: &str) -> std::ops::Range<usize> {
        let first = self
            .lumps
            .iter()
            .position(|l| Self::lump_name_str(&l.name).eq_ignore_ascii_case(start));
        let last = self
            .lumps
            .iter()
            .rposition(|l| Self::lump_name_str(&l.name).eq_ignore_ascii_case(end));
        match (first, last) {
            (Some(a), Some(b)) if a < b => a + 1..b,
            _ => 0..0,
        }
    }

    /*──────────────────────────── decoding ──────────────────────────*/

    /// Decode a lump made of back-to-back fixed-size records.
    pub fn lump_to_vec<T>(&self, idx: usize) -> Result<Vec<T>, WadError>
    where
        T: Decode<()>,
    {
        let bytes = self.lump_bytes(idx)?;
        let elem = mem::size_of::<T>();
        let name = || self.lump_name(idx).unwrap_or("?").to_owned();

        if bytes.len() % elem != 0 {
            return Err(WadError::BadLumpSize {
                index: idx,
                name: name(),
                size: bytes.len(),
                elem_size: elem,
            });
        }

        let cfg = config::standard()
            .with_fixed_int_encoding()
            .with_little_endian();
        let mut out = Vec::with_capacity(bytes.len() / elem);
        let mut slice = bytes;

        while !slice.is_empty() {
            let (val, read) =
                decode_from_slice::<T, _>(slice, cfg).map_err(|e| WadError::BadElement {
                    index: idx,
                    name: name(),
                    elem: out.len(),
                    source: e,
                })?;
            out.push(val);
            slice = &slice[read..];
        }
        Ok(out)
    }
}

/// Assemble an archive in memory from `(name, bytes)` pairs.
#[cfg(test)]
pub(crate) fn build_wad(magic: &[u8; 4], lumps: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let data_len: usize = lumps.iter().map(|(_, b)| b.len()).sum();
    let mut out = Vec::with_capacity(HEADER_SIZE + data_len + lumps.len() * DIR_ENTRY_SIZE);
    out.extend(magic);
    out.extend((lumps.len() as u32).to_le_bytes());
    out.extend(((HEADER_SIZE + data_len) as u32).to_le_bytes());

    let mut offsets = Vec::with_capacity(lumps.len());
    for (_, bytes) in lumps {
        offsets.push(out.len() as u32);
        out.extend(bytes);
    }
    for ((name, bytes), offset) in lumps.iter().zip(offsets) {
        out.extend(offset.to_le_bytes());
        out.extend((bytes.len() as u32).to_le_bytes());
        let mut raw = [0u8; 8];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        out.extend(raw);
    }
    out
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Wad {
        Wad::from_bytes(build_wad(
            b"IWAD",
            &[
                ("PLAYPAL", vec![1; 768]),
                ("F_START", vec![]),
                ("FLOOR1", vec![2; 4096]),
                ("F_END", vec![]),
                ("playpal", vec![3; 768]),
            ],
        ))
        .unwrap()
    }

    #[test]
    fn directory_is_parsed() {
        let wad = sample();
        assert_eq!(wad.kind(), WadKind::Iwad);
        assert_eq!(wad.lumps().len(), 5);
        assert_eq!(wad.lump_name(2).unwrap(), "FLOOR1");
        assert_eq!(wad.lump_bytes(2).unwrap().len(), 4096);
        for (i, l) in wad.lumps().iter().enumerate() {
            assert_eq!(wad.lump_bytes(i).unwrap().len() as u32, l.size);
        }
    }

    #[test]
    fn later_lumps_shadow_earlier_ones() {
        let wad = sample();
        let idx = wad.find_lump("PlayPal").expect("PLAYPAL not found");
        assert_eq!(idx, 4);
        assert_eq!(wad.lump_bytes(idx).unwrap()[0], 3);
        assert!(wad.find_lump("COLORMAP").is_none());
    }

    #[test]
    fn marker_ranges() {
        let wad = sample();
        assert_eq!(wad.lumps_between("F_START", "F_END"), 2..3);
        assert!(wad.lumps_between("S_START", "S_END").is_empty());
    }

    #[test]
    fn pwad_is_accepted() {
        let wad = Wad::from_bytes(build_wad(b"PWAD", &[("MAP01", vec![])])).unwrap();
        assert_eq!(wad.kind(), WadKind::Pwad);
    }

    #[test]
    fn rejects_garbage() {
        let err = Wad::from_bytes(b"NOTWAD_____".to_vec()).unwrap_err();
        assert!(matches!(err, WadError::BadMagic));
        let err = Wad::from_bytes(b"IWAD".to_vec()).unwrap_err();
        assert!(matches!(err, WadError::BadMagic));
    }

    #[test]
    fn directory_out_of_bounds() {
        let mut bytes = Vec::new();
        bytes.extend(b"IWAD");
        bytes.extend(4u32.to_le_bytes());
        bytes.extend(12u32.to_le_bytes());
        let err = Wad::from_bytes(bytes).unwrap_err();
        assert!(matches!(err, WadError::DirectoryOutOfBounds));
    }

    #[test]
    fn lump_past_eof() {
        let mut bytes = Vec::new();
        bytes.extend(b"IWAD");
        bytes.extend(1u32.to_le_bytes());
        bytes.extend(12u32.to_le_bytes());
        bytes.extend(1_000u32.to_le_bytes());
        bytes.extend(4u32.to_le_bytes());
        bytes.extend(b"BAD\0\0\0\0\0");
        let err = Wad::from_bytes(bytes).unwrap_err();
        assert!(matches!(err, WadError::BadOffset { index: 0, .. }));
    }

    #[test]
    fn lump_to_vec_decodes_records() {
        #[derive(Clone, Copy, Debug, PartialEq, bincode::Decode)]
        struct Pair {
            a: i16,
            b: i16,
        }

        let bytes = [1i16, 2, -3, 4]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<_>>();
        let wad = Wad::from_bytes(build_wad(
            b"PWAD",
            &[("PAIRS", bytes), ("ODD", vec![0; 3])],
        ))
        .unwrap();

        let v: Vec<Pair> = wad.lump_to_vec(0).unwrap();
        assert_eq!(v, vec![Pair { a: 1, b: 2 }, Pair { a: -3, b: 4 }]);

        let err = wad.lump_to_vec::<Pair>(1).unwrap_err();
        assert!(matches!(err, WadError::BadLumpSize { elem_size: 4, .. }));
    }
}
