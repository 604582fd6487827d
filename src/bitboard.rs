//! Bitboard primitives shared by every table and generator.
//!
//! A bitboard is a 64-bit integer where each bit represents a square on the chess board.
//! Square indexing: a1 = 0, b1 = 1, ..., h1 = 7, a2 = 8, ..., h8 = 63
//! so that `rank = sq >> 3` and `file = sq & 7`, both 0-indexed.

pub type Bitboard = u64;

pub const EMPTY: Bitboard = 0;

pub const RANK_1: Bitboard = 0xFF;
pub const RANK_8: Bitboard = RANK_1 << 56;

/// Build a square index from 0-indexed rank and file
#[inline(always)]
pub const fn make_square(rank: u8, file: u8) -> u8 {
    rank * 8 + file
}

/// Get the rank (0-7) from a square index
#[inline(always)]
pub const fn sq_rank(sq: u8) -> u8 {
    sq >> 3
}

/// Get the file (0-7) from a square index
#[inline(always)]
pub const fn sq_file(sq: u8) -> u8 {
    sq & 7
}

/// Convert a square index to a bitboard with that single bit set
#[inline(always)]
pub const fn sq_to_bb(sq: u8) -> Bitboard {
    1u64 << sq
}

/// Index of the least significant set bit. `bb` must be non-zero.
#[inline(always)]
pub fn lsb(bb: Bitboard) -> u8 {
    debug_assert!(bb != 0, "lsb of an empty bitboard");
    bb.trailing_zeros() as u8
}

/// Remove the least significant set bit and return its index.
#[inline(always)]
pub fn pop_lsb(bb: &mut Bitboard) -> u8 {
    let sq = lsb(*bb);
    *bb &= *bb - 1;
    sq
}

#[inline(always)]
pub const fn popcount(bb: Bitboard) -> u32 {
    bb.count_ones()
}

/// Algebraic name of a square, e.g. `28` -> `"e4"`
pub fn square_name(sq: u8) -> String {
    format!(
        "{}{}",
        (b'a' + sq_file(sq)) as char,
        (b'1' + sq_rank(sq)) as char
    )
}

/// Parse an algebraic square name such as `"e4"`.
pub fn parse_square(s: &str) -> Option<u8> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].wrapping_sub(b'a');
    let rank = bytes[1].wrapping_sub(b'1');
    if file < 8 && rank < 8 {
        Some(make_square(rank, file))
    } else {
        None
    }
}

/// Iterate over set bits in a bitboard, returning square indices
pub struct BitboardIter(pub Bitboard);

impl Iterator for BitboardIter {
    type Item = u8;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            None
        } else {
            Some(pop_lsb(&mut self.0))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = popcount(self.0) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BitboardIter {}

/// Spread the low bits of `index` over the set bits of `mask`: bit `j` of `index`
/// lands on the `j`-th lowest set bit of `mask`. Software PDEP.
pub fn deposit_bits(index: u64, mask: Bitboard) -> Bitboard {
    let mut result = 0u64;
    let mut remaining = mask;
    let mut bit = 0;
    while remaining != 0 {
        let sq = pop_lsb(&mut remaining);
        if index & (1 << bit) != 0 {
            result |= sq_to_bb(sq);
        }
        bit += 1;
    }
    result
}

/// Gather the bits of `bb` selected by `mask` into the low bits of the result.
/// Software PEXT, the inverse of [`deposit_bits`].
pub fn extract_bits(bb: Bitboard, mask: Bitboard) -> u64 {
    let mut result = 0u64;
    let mut remaining = mask;
    let mut bit = 0;
    while remaining != 0 {
        let sq = pop_lsb(&mut remaining);
        if bb & sq_to_bb(sq) != 0 {
            result |= 1 << bit;
        }
        bit += 1;
    }
    result
}
