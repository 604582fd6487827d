//! Binary file format for the slider tables, so the magic search can be skipped at
//! startup.
//!
//! All integers are little-endian:
//!
//! | field             | contents                         |
//! | ----------------- | -------------------------------- |
//! | magic             | `b"MMVT"`                        |
//! | version           | `u32`                            |
//! | masks             | 64 x `u64` bishop, 64 x `u64` rook |
//! | offsets           | 64 x `u32` bishop, 64 x `u32` rook |
//! | bishop attacks    | `u32` length, length x `u64`     |
//! | rook attacks      | `u32` length, length x `u64`     |
//! | magics            | 64 x `u64` bishop, 64 x `u64` rook |
//!
//! Loading checks every field against the board geometry and re-verifies every
//! slot with a ray trace, so a file that loads is as good as a fresh build.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{bail, ensure, Result, WrapErr};

use crate::magic::{Slider, SliderTable};
use crate::tables::Tables;

pub const FILE_MAGIC: &[u8; 4] = b"MMVT";
pub const FILE_VERSION: u32 = 1;

/// Serialize the slider tables of `tables`.
pub fn to_bytes(tables: &Tables) -> Vec<u8> {
    let (bishop, rook) = (&tables.bishop, &tables.rook);
    let size = 4 + 4 + 2 * 64 * (8 + 4 + 8) + 2 * 4
        + 8 * (bishop.attack_table().len() + rook.attack_table().len());
    let mut out = Vec::with_capacity(size);

    out.extend_from_slice(FILE_MAGIC);
    out.extend_from_slice(&FILE_VERSION.to_le_bytes());
    for table in [bishop, rook] {
        for mask in table.masks() {
            out.extend_from_slice(&mask.to_le_bytes());
        }
    }
    for table in [bishop, rook] {
        for offset in table.offsets() {
            out.extend_from_slice(&offset.to_le_bytes());
        }
    }
    for table in [bishop, rook] {
        let attacks = table.attack_table();
        out.extend_from_slice(&(attacks.len() as u32).to_le_bytes());
        for attack in attacks {
            out.extend_from_slice(&attack.to_le_bytes());
        }
    }
    for table in [bishop, rook] {
        for magic in table.magics() {
            out.extend_from_slice(&magic.to_le_bytes());
        }
    }
    out
}

/// Bounds-checked little-endian reader over a byte slice
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.bytes.len());
        let Some(end) = end else {
            bail!(
                "truncated table file: needed {} bytes at offset {}, file is {} bytes",
                n,
                self.pos,
                self.bytes.len()
            );
        };
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into()?))
    }

    fn u64_array(&mut self) -> Result<[u64; 64]> {
        let mut out = [0u64; 64];
        for value in out.iter_mut() {
            *value = self.u64()?;
        }
        Ok(out)
    }

    fn u32_array(&mut self) -> Result<[u32; 64]> {
        let mut out = [0u32; 64];
        for value in out.iter_mut() {
            *value = self.u32()?;
        }
        Ok(out)
    }

    fn u64_vec(&mut self) -> Result<Vec<u64>> {
        let len = self.u32()? as usize;
        // check the whole run is present before allocating
        let raw = self.take(len.saturating_mul(8))?;
        let mut out = Vec::with_capacity(len);
        for chunk in raw.chunks_exact(8) {
            out.push(u64::from_le_bytes(chunk.try_into()?));
        }
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

/// Parse and fully verify a serialized table file.
pub fn from_bytes(bytes: &[u8]) -> Result<Tables> {
    let mut reader = Reader::new(bytes);

    let magic = reader.take(4)?;
    ensure!(
        magic == FILE_MAGIC,
        "not a table file: magic bytes are {:?}, expected {:?}",
        magic,
        FILE_MAGIC
    );
    let version = reader.u32()?;
    ensure!(
        version == FILE_VERSION,
        "unsupported table file version {} (expected {})",
        version,
        FILE_VERSION
    );

    let bishop_masks = reader.u64_array()?;
    let rook_masks = reader.u64_array()?;
    let bishop_offsets = reader.u32_array()?;
    let rook_offsets = reader.u32_array()?;
    let bishop_attacks = reader.u64_vec()?;
    let rook_attacks = reader.u64_vec()?;
    let bishop_magics = reader.u64_array()?;
    let rook_magics = reader.u64_array()?;
    ensure!(
        reader.remaining() == 0,
        "{} trailing bytes after table data",
        reader.remaining()
    );

    let bishop = SliderTable::from_parts(
        Slider::Bishop,
        bishop_masks,
        bishop_magics,
        bishop_offsets,
        bishop_attacks,
    )?;
    let rook = SliderTable::from_parts(
        Slider::Rook,
        rook_masks,
        rook_magics,
        rook_offsets,
        rook_attacks,
    )?;
    Tables::from_sliders(bishop, rook)
}

pub fn save(path: impl AsRef<Path>, tables: &Tables) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, to_bytes(tables))
        .wrap_err_with(|| format!("writing table file {}", path.display()))
}

pub fn load(path: impl AsRef<Path>) -> Result<Tables> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).wrap_err_with(|| format!("reading table file {}", path.display()))?;
    from_bytes(&bytes).wrap_err_with(|| format!("loading table file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::shared;

    const HEADER: usize = 8;
    const MASKS: usize = HEADER;
    const OFFSETS: usize = MASKS + 2 * 64 * 8;
    const BISHOP_ATTACKS: usize = OFFSETS + 2 * 64 * 4;
    const ROOK_ATTACKS: usize = BISHOP_ATTACKS + 4 + 8 * 5248;
    const MAGICS: usize = ROOK_ATTACKS + 4 + 8 * 102_400;

    fn bytes() -> Vec<u8> {
        to_bytes(shared().unwrap())
    }

    #[test]
    fn test_header_layout() {
        let bytes = bytes();
        assert_eq!(&bytes[..4], b"MMVT");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        // rook a1 mask is the first rook entry
        let rook_a1 = &bytes[MASKS + 64 * 8..MASKS + 65 * 8];
        assert_eq!(u64::from_le_bytes(rook_a1.try_into().unwrap()), 0x0001_0101_0101_017E);
        // the first offset of each slider is zero
        assert_eq!(&bytes[OFFSETS..OFFSETS + 4], &[0, 0, 0, 0]);
        assert_eq!(bytes.len(), 8 + 2 * 64 * 20 + 8 + 8 * (5248 + 102_400));
    }

    #[test]
    fn test_attacks_precede_magics() {
        let tables = shared().unwrap();
        let bytes = bytes();
        let read_u32 = |at: usize| u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        let read_u64 = |at: usize| u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap());

        assert_eq!(read_u32(BISHOP_ATTACKS), 5248);
        assert_eq!(read_u32(ROOK_ATTACKS), 102_400);
        assert_eq!(read_u64(BISHOP_ATTACKS + 4), tables.bishop.attack_table()[0]);
        assert_eq!(read_u64(MAGICS), tables.bishop.magics()[0]);
        assert_eq!(read_u64(MAGICS + 64 * 8), tables.rook.magics()[0]);
        assert_eq!(MAGICS + 2 * 64 * 8, bytes.len());
    }

    #[test]
    fn test_reload_gives_identical_lookups() {
        let original = shared().unwrap();
        let reloaded = from_bytes(&bytes()).unwrap();
        assert_eq!(reloaded.bishop, original.bishop);
        assert_eq!(reloaded.rook, original.rook);
        for sq in 0..64u8 {
            let occ = 0x0042_0018_2400_8100u64.rotate_left(sq as u32);
            assert_eq!(reloaded.queen_attacks(sq, occ), original.queen_attacks(sq, occ));
        }
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = bytes();
        bytes[0] = b'X';
        let err = from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("not a table file"));
    }

    #[test]
    fn test_rejects_bad_version() {
        let mut bytes = bytes();
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        let err = from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported table file version 2"));
    }

    #[test]
    fn test_rejects_truncated_file() {
        let bytes = bytes();
        for len in [0, 3, 100, bytes.len() - 1] {
            let err = from_bytes(&bytes[..len]).unwrap_err();
            assert!(
                err.to_string().contains("truncated") || err.to_string().contains("not a table"),
                "length {} gave {}",
                len,
                err
            );
        }
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = bytes();
        bytes.push(0);
        let err = from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn test_rejects_tampered_mask() {
        let mut bytes = bytes();
        bytes[MASKS] ^= 0x01;
        assert!(from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_rejects_tampered_attack() {
        let tables = shared().unwrap();
        let slot = tables.rook.offsets()[63] as usize + tables.rook.magic_index(63, 0);
        let pos = ROOK_ATTACKS + 4 + 8 * slot;
        let mut bytes = bytes();
        // low byte of the empty-board h8 rook attacks holds h1
        bytes[pos] ^= 0xFF;
        assert!(from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_rejects_tampered_magic() {
        let mut bytes = bytes();
        // a zero rook multiplier for a1 sends every blocker pattern to index 0
        bytes[MAGICS + 64 * 8..MAGICS + 65 * 8].fill(0);
        let err = from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("maps two blocker patterns"), "{}", err);
    }
}
