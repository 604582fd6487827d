//! Magic bitboard tables for sliding pieces.
//!
//! For every square the relevant occupancy (blockers on the slider's rays, board
//! edges excluded) is hashed with a multiply and a shift into that square's
//! segment of one flat attack table per slider:
//!
//! ```text
//! index = ((occupied & mask[sq]).wrapping_mul(magic[sq]) >> shift[sq])
//! attack = attacks[offset[sq] + index]
//! ```
//!
//! The multipliers are searched for with a seeded PRNG, so the tables are a pure
//! function of the board geometry and the seed.

use color_eyre::eyre::{bail, ensure, Result, WrapErr};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bitboard::{deposit_bits, popcount, square_name, Bitboard};

/// Seed mixed with (slider, square) for the multiplier search
const MAGIC_SEED: u64 = 0x4D4D_5654_0000_0001;

/// Candidates tried per square before giving up
const MAX_ATTEMPTS: u32 = 50_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slider {
    Bishop = 0,
    Rook = 1,
}

impl Slider {
    pub const ALL: [Slider; 2] = [Slider::Bishop, Slider::Rook];

    /// (rank delta, file delta) of each ray
    pub const fn directions(self) -> [(i8, i8); 4] {
        match self {
            Slider::Bishop => [(1, 1), (1, -1), (-1, 1), (-1, -1)],
            Slider::Rook => [(1, 0), (-1, 0), (0, 1), (0, -1)],
        }
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Slider::Bishop => "bishop",
            Slider::Rook => "rook",
        }
    }
}

/// Squares whose occupancy can change the slider's attack set from `sq`.
/// The last square of every ray is left out: a blocker there changes nothing.
pub fn relevant_mask(slider: Slider, sq: u8) -> Bitboard {
    let rank = (sq >> 3) as i8;
    let file = (sq & 7) as i8;
    let mut mask = 0u64;

    for (dr, df) in slider.directions() {
        let mut r = rank + dr;
        let mut f = file + df;
        // stop one short of the edge in the direction of travel
        while (0..8).contains(&(r + dr)) && (0..8).contains(&(f + df)) {
            mask |= 1u64 << (r * 8 + f);
            r += dr;
            f += df;
        }
    }
    mask
}

/// Ray-traced attacks: each ray runs until it hits the edge or the first
/// occupied square, which is included.
pub fn slider_attacks_slow(slider: Slider, sq: u8, occupied: Bitboard) -> Bitboard {
    let rank = (sq >> 3) as i8;
    let file = (sq & 7) as i8;
    let mut attacks = 0u64;

    for (dr, df) in slider.directions() {
        let mut r = rank + dr;
        let mut f = file + df;
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let target = 1u64 << (r * 8 + f);
            attacks |= target;
            if occupied & target != 0 {
                break;
            }
            r += dr;
            f += df;
        }
    }
    attacks
}

/// Every blocker pattern of `mask` in enumeration order, paired with its ray-traced
/// attack set.
fn patterns(slider: Slider, sq: u8, mask: Bitboard) -> (Vec<Bitboard>, Vec<Bitboard>) {
    let count = 1usize << popcount(mask);
    let occupancies: Vec<Bitboard> = (0..count as u64).map(|i| deposit_bits(i, mask)).collect();
    let attacks = occupancies
        .iter()
        .map(|&occ| slider_attacks_slow(slider, sq, occ))
        .collect();
    (occupancies, attacks)
}

#[inline(always)]
fn hash_index(occupied: Bitboard, mask: Bitboard, magic: u64, shift: u8) -> usize {
    ((occupied & mask).wrapping_mul(magic) >> shift) as usize
}

/// Reusable scratch space for testing candidates. `epoch` marks which slots were
/// taken by the current attempt so nothing needs clearing between attempts.
struct Scratch {
    epoch: Vec<u32>,
    current: u32,
}

impl Scratch {
    fn new(size: usize) -> Self {
        Self {
            epoch: vec![0; size],
            current: 0,
        }
    }
}

/// Does `magic` send every blocker pattern to its own index?
fn try_magic(
    magic: u64,
    mask: Bitboard,
    shift: u8,
    occupancies: &[Bitboard],
    scratch: &mut Scratch,
) -> bool {
    scratch.current += 1;
    for &occ in occupancies {
        let index = hash_index(occ, mask, magic, shift);
        if scratch.epoch[index] == scratch.current {
            return false;
        }
        scratch.epoch[index] = scratch.current;
    }
    true
}

/// Search for a multiplier for (slider, square). Deterministic: the PRNG is seeded
/// from a fixed constant and the (slider, square) pair.
pub fn find_magic(slider: Slider, sq: u8) -> Result<u64> {
    let mask = relevant_mask(slider, sq);
    let bits = popcount(mask);
    let shift = (64 - bits) as u8;
    let occupancies: Vec<Bitboard> = (0..1u64 << bits).map(|i| deposit_bits(i, mask)).collect();
    let mut scratch = Scratch::new(occupancies.len());

    let seed = MAGIC_SEED ^ ((slider.index() as u64) << 6 | sq as u64);
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..MAX_ATTEMPTS {
        // sparse candidates work best
        let magic = rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>();
        if popcount(mask.wrapping_mul(magic) & 0xFF00_0000_0000_0000) < 6 {
            continue;
        }
        if try_magic(magic, mask, shift, &occupancies, &mut scratch) {
            return Ok(magic);
        }
    }

    bail!(
        "no {} magic found for {} after {} attempts",
        slider.name(),
        square_name(sq),
        MAX_ATTEMPTS
    )
}

/// Flat magic attack table for one slider type
#[derive(Clone, PartialEq, Eq)]
pub struct SliderTable {
    slider: Slider,
    masks: [Bitboard; 64],
    magics: [u64; 64],
    shifts: [u8; 64],
    offsets: [u32; 64],
    attacks: Vec<Bitboard>,
}

impl std::fmt::Debug for SliderTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliderTable")
            .field("slider", &self.slider)
            .field("entries", &self.attacks.len())
            .finish()
    }
}

/// Masks for all 64 squares plus each square's segment start; the last element of
/// `offsets` is followed by the total table length.
fn geometry(slider: Slider) -> ([Bitboard; 64], [u8; 64], [u32; 64], usize) {
    let mut masks = [0u64; 64];
    let mut shifts = [0u8; 64];
    let mut offsets = [0u32; 64];
    let mut total = 0usize;
    for sq in 0..64u8 {
        let mask = relevant_mask(slider, sq);
        masks[sq as usize] = mask;
        shifts[sq as usize] = (64 - popcount(mask)) as u8;
        offsets[sq as usize] = total as u32;
        total += 1 << popcount(mask);
    }
    (masks, shifts, offsets, total)
}

impl SliderTable {
    /// Search multipliers for every square and fill the table.
    pub fn build(slider: Slider) -> Result<Self> {
        let mut magics = [0u64; 64];
        for sq in 0..64u8 {
            magics[sq as usize] = find_magic(slider, sq)
                .wrap_err_with(|| format!("building {} table", slider.name()))?;
        }
        Self::from_magics(slider, magics)
    }

    /// Fill the table from known multipliers. Fails if any multiplier sends two
    /// blocker patterns to the same slot.
    pub fn from_magics(slider: Slider, magics: [u64; 64]) -> Result<Self> {
        let (masks, shifts, offsets, total) = geometry(slider);
        let mut attacks = vec![0u64; total];
        let mut taken = vec![false; total];

        for sq in 0..64u8 {
            let s = sq as usize;
            let (occupancies, expected) = patterns(slider, sq, masks[s]);
            for (&occ, &attack) in occupancies.iter().zip(&expected) {
                let slot = offsets[s] as usize + hash_index(occ, masks[s], magics[s], shifts[s]);
                if taken[slot] {
                    bail!(
                        "{} magic {:#018x} for {} maps two blocker patterns to index {}",
                        slider.name(),
                        magics[s],
                        square_name(sq),
                        slot - offsets[s] as usize
                    );
                }
                taken[slot] = true;
                attacks[slot] = attack;
            }
        }

        Ok(Self {
            slider,
            masks,
            magics,
            shifts,
            offsets,
            attacks,
        })
    }

    /// Reassemble a table from serialized parts, checking that every part agrees
    /// with the board geometry and every slot with a ray trace.
    pub fn from_parts(
        slider: Slider,
        masks: [Bitboard; 64],
        magics: [u64; 64],
        offsets: [u32; 64],
        attacks: Vec<Bitboard>,
    ) -> Result<Self> {
        let (expected_masks, shifts, expected_offsets, total) = geometry(slider);
        for sq in 0..64u8 {
            let s = sq as usize;
            ensure!(
                masks[s] == expected_masks[s],
                "{} mask for {} does not match board geometry",
                slider.name(),
                square_name(sq)
            );
            ensure!(
                offsets[s] == expected_offsets[s],
                "{} offset for {} is {}, expected {}",
                slider.name(),
                square_name(sq),
                offsets[s],
                expected_offsets[s]
            );
        }
        ensure!(
            attacks.len() == total,
            "{} attack table has {} entries, expected {}",
            slider.name(),
            attacks.len(),
            total
        );

        let table = Self {
            slider,
            masks,
            magics,
            shifts,
            offsets,
            attacks,
        };
        table.verify()?;
        Ok(table)
    }

    /// Check that every square's blocker patterns land on distinct indices and that
    /// every lookup agrees with a ray trace.
    pub fn verify(&self) -> Result<()> {
        for sq in 0..64u8 {
            let (occupancies, expected) = patterns(self.slider, sq, self.masks[sq as usize]);
            let mut scratch = Scratch::new(occupancies.len());
            ensure!(
                try_magic(
                    self.magics[sq as usize],
                    self.masks[sq as usize],
                    self.shifts[sq as usize],
                    &occupancies,
                    &mut scratch
                ),
                "{} magic {:#018x} for {} maps two blocker patterns to one index",
                self.slider.name(),
                self.magics[sq as usize],
                square_name(sq)
            );
            for (&occ, &attack) in occupancies.iter().zip(&expected) {
                let got = self.attacks(sq, occ);
                ensure!(
                    got == attack,
                    "{} lookup for {} with occupancy {:#018x} returned {:#018x}, expected {:#018x}",
                    self.slider.name(),
                    square_name(sq),
                    occ,
                    got,
                    attack
                );
            }
        }
        Ok(())
    }

    /// Index into the square's segment, in `[0, 2^popcount(mask))`.
    #[inline(always)]
    pub fn magic_index(&self, sq: u8, occupied: Bitboard) -> usize {
        let s = sq as usize;
        hash_index(occupied, self.masks[s], self.magics[s], self.shifts[s])
    }

    /// Attacked squares from `sq` given the full-board occupancy.
    #[inline(always)]
    pub fn attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.attacks[self.offsets[sq as usize] as usize + self.magic_index(sq, occupied)]
    }

    pub fn slider(&self) -> Slider {
        self.slider
    }

    pub fn masks(&self) -> &[Bitboard; 64] {
        &self.masks
    }

    pub fn magics(&self) -> &[u64; 64] {
        &self.magics
    }

    pub fn offsets(&self) -> &[u32; 64] {
        &self.offsets
    }

    pub fn attack_table(&self) -> &[Bitboard] {
        &self.attacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboard::{extract_bits, make_square, sq_to_bb};
    use once_cell::sync::Lazy;
    use std::collections::HashSet;

    static BISHOP: Lazy<SliderTable> = Lazy::new(|| SliderTable::build(Slider::Bishop).unwrap());
    static ROOK: Lazy<SliderTable> = Lazy::new(|| SliderTable::build(Slider::Rook).unwrap());

    fn table(slider: Slider) -> &'static SliderTable {
        match slider {
            Slider::Bishop => &*BISHOP,
            Slider::Rook => &*ROOK,
        }
    }

    #[test]
    fn test_relevant_mask_sizes() {
        let e4 = make_square(3, 4);
        assert_eq!(popcount(relevant_mask(Slider::Rook, 0)), 12);
        assert_eq!(popcount(relevant_mask(Slider::Rook, e4)), 10);
        assert_eq!(popcount(relevant_mask(Slider::Bishop, 0)), 6);
        assert_eq!(popcount(relevant_mask(Slider::Bishop, e4)), 9);

        // a1 rook: b1..g1 and a2..a7
        let expected = 0x0001_0101_0101_017E;
        assert_eq!(relevant_mask(Slider::Rook, 0), expected);
    }

    #[test]
    fn test_table_sizes() {
        assert_eq!(geometry(Slider::Bishop).3, 5248);
        assert_eq!(geometry(Slider::Rook).3, 102_400);
    }

    #[test]
    fn test_pattern_enumeration_is_bijective() {
        for slider in Slider::ALL {
            for sq in 0..64u8 {
                let mask = relevant_mask(slider, sq);
                let count = 1u64 << popcount(mask);
                let mut seen = HashSet::new();
                for i in 0..count {
                    let occ = deposit_bits(i, mask);
                    assert_eq!(occ & !mask, 0);
                    assert_eq!(extract_bits(occ, mask), i);
                    assert!(seen.insert(occ), "pattern {} repeated on {}", i, sq);
                }
            }
        }
    }

    #[test]
    fn test_every_pattern_matches_ray_trace() {
        for slider in Slider::ALL {
            let table = table(slider);
            for sq in 0..64u8 {
                let mask = relevant_mask(slider, sq);
                let count = 1u64 << popcount(mask);
                for i in 0..count {
                    let occ = deposit_bits(i, mask);
                    assert!(table.magic_index(sq, occ) < count as usize);
                    assert_eq!(
                        table.attacks(sq, occ),
                        slider_attacks_slow(slider, sq, occ),
                        "{} on {} with {:#x}",
                        slider.name(),
                        square_name(sq),
                        occ
                    );
                }
            }
            table.verify().unwrap();
        }
    }

    #[test]
    fn test_random_full_board_occupancies() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..2_000 {
            let occ = rng.gen::<u64>() & rng.gen::<u64>();
            for sq in 0..64u8 {
                for slider in Slider::ALL {
                    assert_eq!(
                        table(slider).attacks(sq, occ),
                        slider_attacks_slow(slider, sq, occ)
                    );
                }
            }
        }
    }

    #[test]
    fn test_magic_search_is_deterministic() {
        let a = find_magic(Slider::Rook, 0).unwrap();
        let b = find_magic(Slider::Rook, 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, ROOK.magics()[0]);
    }

    #[test]
    fn test_from_magics_rejects_colliding_multiplier() {
        let err = SliderTable::from_magics(Slider::Bishop, [0u64; 64]).unwrap_err();
        assert!(err.to_string().contains("maps two blocker patterns"));
    }

    #[test]
    fn test_magic_index_is_injective() {
        for slider in Slider::ALL {
            let table = table(slider);
            for sq in 0..64u8 {
                let mask = relevant_mask(slider, sq);
                let count = 1usize << popcount(mask);
                let indices: HashSet<usize> = (0..count as u64)
                    .map(|i| table.magic_index(sq, deposit_bits(i, mask)))
                    .collect();
                assert_eq!(indices.len(), count, "{} on {}", slider.name(), square_name(sq));
            }
        }
    }

    #[test]
    fn test_try_magic_rejects_shared_index_with_equal_attacks() {
        // a1 rook: b1 blocked with and without c1 gives the same attack set
        let mask = relevant_mask(Slider::Rook, 0);
        let b1 = sq_to_bb(1);
        let b1_c1 = b1 | sq_to_bb(2);
        assert_eq!(
            slider_attacks_slow(Slider::Rook, 0, b1),
            slider_attacks_slow(Slider::Rook, 0, b1_c1)
        );
        // both patterns hash to index 0 under a zero multiplier
        let shift = (64 - popcount(mask)) as u8;
        let mut scratch = Scratch::new(1 << popcount(mask));
        assert!(!try_magic(0, mask, shift, &[b1, b1_c1], &mut scratch));
        assert!(try_magic(ROOK.magics()[0], mask, shift, &[b1, b1_c1], &mut scratch));
    }

    #[test]
    fn test_from_magics_reproduces_table() {
        let rebuilt = SliderTable::from_magics(Slider::Bishop, *BISHOP.magics()).unwrap();
        assert_eq!(&rebuilt, &*BISHOP);
    }

    #[test]
    fn test_from_parts_rejects_bad_offsets() {
        let mut offsets = *ROOK.offsets();
        offsets[5] += 1;
        let res = SliderTable::from_parts(
            Slider::Rook,
            *ROOK.masks(),
            *ROOK.magics(),
            offsets,
            ROOK.attack_table().to_vec(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_from_parts_rejects_corrupt_slot() {
        let mut attacks = BISHOP.attack_table().to_vec();
        let slot = BISHOP.offsets()[27] as usize + BISHOP.magic_index(27, 0);
        attacks[slot] ^= 1;
        let res = SliderTable::from_parts(
            Slider::Bishop,
            *BISHOP.masks(),
            *BISHOP.magics(),
            *BISHOP.offsets(),
            attacks,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_rook_attacks_with_blockers() {
        // Rook on e4, with pieces on e2 and g4
        let e4 = make_square(3, 4);
        let occupied = sq_to_bb(make_square(1, 4)) | sq_to_bb(make_square(3, 6));
        let attacks = ROOK.attacks(e4, occupied);

        assert!(attacks & sq_to_bb(make_square(1, 4)) != 0); // e2 (blocker)
        assert!(attacks & sq_to_bb(make_square(3, 6)) != 0); // g4 (blocker)
        assert!(attacks & sq_to_bb(make_square(0, 4)) == 0); // e1 (blocked)
        assert!(attacks & sq_to_bb(make_square(3, 7)) == 0); // h4 (blocked)
        assert_eq!(ROOK.attacks(e4, 0).count_ones(), 14);
    }

    #[test]
    fn test_bishop_attacks_with_blockers() {
        // Bishop on e4, with pieces on c2 and g6
        let e4 = make_square(3, 4);
        let occupied = sq_to_bb(make_square(1, 2)) | sq_to_bb(make_square(5, 6));
        let attacks = BISHOP.attacks(e4, occupied);

        assert!(attacks & sq_to_bb(make_square(1, 2)) != 0); // c2
        assert!(attacks & sq_to_bb(make_square(5, 6)) != 0); // g6
        assert!(attacks & sq_to_bb(make_square(0, 1)) == 0); // b1
        assert!(attacks & sq_to_bb(make_square(6, 7)) == 0); // h7
        assert_eq!(BISHOP.attacks(e4, 0).count_ones(), 13);
    }
}
