//! The immutable lookup bundle every generator reads from.
//!
//! Slider tables come from [`crate::magic`]; leaper and castling tables are plain
//! square-indexed arrays computed at compile time.

use color_eyre::eyre::{ensure, Result};
use once_cell::sync::OnceCell;

use crate::bitboard::{sq_to_bb, Bitboard};
use crate::magic::{Slider, SliderTable};
use crate::types::{CastleSide, CastlingRights, Color};

/// Direct square-indexed tables for knight, king and pawn moves
#[derive(Debug, Clone)]
pub struct LeaperTables {
    pub knight: [Bitboard; 64],
    pub king: [Bitboard; 64],
    /// Diagonal capture squares, `pawn_attacks[color][square]`
    pub pawn_attacks: [[Bitboard; 64]; 2],
    /// Single push square, `pawn_pushes[color][square]`
    pub pawn_pushes: [[Bitboard; 64]; 2],
    /// Double push square, only set on the pawn's home rank
    pub pawn_double_pushes: [[Bitboard; 64]; 2],
}

impl LeaperTables {
    pub const fn new() -> Self {
        let mut knight = [0u64; 64];
        let mut king = [0u64; 64];
        let mut pawn_attacks = [[0u64; 64]; 2];
        let mut pawn_pushes = [[0u64; 64]; 2];
        let mut pawn_double_pushes = [[0u64; 64]; 2];

        // (rank delta, file delta)
        #[rustfmt::skip]
        const KNIGHT_DELTAS: [(i8, i8); 8] = [
            (-2, -1), (-2, 1), (-1, -2), (-1, 2),
            (1, -2), (1, 2), (2, -1), (2, 1),
        ];
        #[rustfmt::skip]
        const KING_DELTAS: [(i8, i8); 8] = [
            (-1, -1), (-1, 0), (-1, 1),
            (0, -1),           (0, 1),
            (1, -1),  (1, 0),  (1, 1),
        ];

        let mut sq = 0usize;
        while sq < 64 {
            let rank = (sq >> 3) as i8;
            let file = (sq & 7) as i8;

            knight[sq] = deltas_to_bb(rank, file, &KNIGHT_DELTAS);
            king[sq] = deltas_to_bb(rank, file, &KING_DELTAS);

            // White = 0 moves up the board, Black = 1 moves down
            let mut color = 0;
            while color < 2 {
                let dir: i8 = if color == 0 { 1 } else { -1 };
                let home_rank: i8 = if color == 0 { 1 } else { 6 };

                pawn_attacks[color][sq] = deltas_to_bb(rank, file, &[(dir, -1), (dir, 1)]);
                pawn_pushes[color][sq] = deltas_to_bb(rank, file, &[(dir, 0)]);
                if rank == home_rank {
                    pawn_double_pushes[color][sq] = deltas_to_bb(rank, file, &[(2 * dir, 0)]);
                }
                color += 1;
            }
            sq += 1;
        }

        LeaperTables {
            knight,
            king,
            pawn_attacks,
            pawn_pushes,
            pawn_double_pushes,
        }
    }
}

impl Default for LeaperTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Union of the on-board squares reached from (rank, file) by each delta
const fn deltas_to_bb(rank: i8, file: i8, deltas: &[(i8, i8)]) -> Bitboard {
    let mut bb = 0u64;
    let mut i = 0;
    while i < deltas.len() {
        let (dr, df) = deltas[i];
        let nr = rank + dr;
        let nf = file + df;
        if nr >= 0 && nr < 8 && nf >= 0 && nf < 8 {
            bb |= 1u64 << (nr * 8 + nf);
        }
        i += 1;
    }
    bb
}

/// Squares involved in one castling move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastlingPath {
    /// Squares strictly between king and rook, all of which must be empty
    pub between: Bitboard,
    pub king_from: u8,
    /// The square the king crosses
    pub king_transit: u8,
    pub king_to: u8,
    pub rook_from: u8,
    pub rook_to: u8,
}

impl CastlingPath {
    const fn new(back_rank: u8, side: CastleSide) -> Self {
        let base = back_rank * 8;
        match side {
            CastleSide::Kingside => CastlingPath {
                between: (sq_to_bb(base + 5) | sq_to_bb(base + 6)),
                king_from: base + 4,
                king_transit: base + 5,
                king_to: base + 6,
                rook_from: base + 7,
                rook_to: base + 5,
            },
            CastleSide::Queenside => CastlingPath {
                between: (sq_to_bb(base + 1) | sq_to_bb(base + 2) | sq_to_bb(base + 3)),
                king_from: base + 4,
                king_transit: base + 3,
                king_to: base + 2,
                rook_from: base,
                rook_to: base + 3,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CastlingMasks {
    /// `paths[color][side]`
    paths: [[CastlingPath; 2]; 2],
    /// Rights surviving a move that touches a square, as a bit mask
    rights_kept: [u8; 64],
}

impl CastlingMasks {
    pub const fn new() -> Self {
        let paths = [
            [
                CastlingPath::new(0, CastleSide::Kingside),
                CastlingPath::new(0, CastleSide::Queenside),
            ],
            [
                CastlingPath::new(7, CastleSide::Kingside),
                CastlingPath::new(7, CastleSide::Queenside),
            ],
        ];

        let mut rights_kept = [0b1111u8; 64];
        rights_kept[0] = !CastlingRights::WHITE_QUEENSIDE & 0b1111; // a1
        rights_kept[7] = !CastlingRights::WHITE_KINGSIDE & 0b1111; // h1
        rights_kept[4] =
            !(CastlingRights::WHITE_KINGSIDE | CastlingRights::WHITE_QUEENSIDE) & 0b1111; // e1
        rights_kept[56] = !CastlingRights::BLACK_QUEENSIDE & 0b1111; // a8
        rights_kept[63] = !CastlingRights::BLACK_KINGSIDE & 0b1111; // h8
        rights_kept[60] =
            !(CastlingRights::BLACK_KINGSIDE | CastlingRights::BLACK_QUEENSIDE) & 0b1111; // e8

        CastlingMasks { paths, rights_kept }
    }

    #[inline(always)]
    pub fn path(&self, color: Color, side: CastleSide) -> &CastlingPath {
        &self.paths[color.index()][side as usize]
    }

    /// Castling rights bits that survive a move from or to `sq`
    #[inline(always)]
    pub fn rights_kept(&self, sq: u8) -> u8 {
        self.rights_kept[sq as usize]
    }
}

impl Default for CastlingMasks {
    fn default() -> Self {
        Self::new()
    }
}

/// Every lookup table the move generators need. Immutable once built and shared by
/// reference, including across threads.
#[derive(Debug, Clone)]
pub struct Tables {
    pub bishop: SliderTable,
    pub rook: SliderTable,
    pub leapers: LeaperTables,
    pub castling: CastlingMasks,
}

impl Tables {
    /// Run the magic search for both sliders (in parallel) and assemble the bundle.
    pub fn build() -> Result<Self> {
        let (bishop, rook) = rayon::join(
            || SliderTable::build(Slider::Bishop),
            || SliderTable::build(Slider::Rook),
        );
        Self::from_sliders(bishop?, rook?)
    }

    /// Assemble the bundle from already built (or loaded) slider tables.
    pub fn from_sliders(bishop: SliderTable, rook: SliderTable) -> Result<Self> {
        ensure!(bishop.slider() == Slider::Bishop, "first slider table must be the bishop's");
        ensure!(rook.slider() == Slider::Rook, "second slider table must be the rook's");
        Ok(Tables {
            bishop,
            rook,
            leapers: LeaperTables::new(),
            castling: CastlingMasks::new(),
        })
    }

    pub fn slider(&self, slider: Slider) -> &SliderTable {
        match slider {
            Slider::Bishop => &self.bishop,
            Slider::Rook => &self.rook,
        }
    }

    #[inline(always)]
    pub fn bishop_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.bishop.attacks(sq, occupied)
    }

    #[inline(always)]
    pub fn rook_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.rook.attacks(sq, occupied)
    }

    #[inline(always)]
    pub fn queen_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.bishop_attacks(sq, occupied) | self.rook_attacks(sq, occupied)
    }

    #[inline(always)]
    pub fn knight_attacks(&self, sq: u8) -> Bitboard {
        self.leapers.knight[sq as usize]
    }

    #[inline(always)]
    pub fn king_attacks(&self, sq: u8) -> Bitboard {
        self.leapers.king[sq as usize]
    }

    #[inline(always)]
    pub fn pawn_attacks(&self, color: Color, sq: u8) -> Bitboard {
        self.leapers.pawn_attacks[color.index()][sq as usize]
    }

    #[inline(always)]
    pub fn pawn_push(&self, color: Color, sq: u8) -> Bitboard {
        self.leapers.pawn_pushes[color.index()][sq as usize]
    }

    #[inline(always)]
    pub fn pawn_double_push(&self, color: Color, sq: u8) -> Bitboard {
        self.leapers.pawn_double_pushes[color.index()][sq as usize]
    }
}

static SHARED: OnceCell<Tables> = OnceCell::new();

/// Process-wide tables, built on first use. Concurrent first callers block until a
/// single build finishes.
pub fn shared() -> Result<&'static Tables> {
    SHARED.get_or_try_init(Tables::build)
}
