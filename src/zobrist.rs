use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{CastlingRights, Color, PieceType};

const ZOBRIST_SEED: u64 = 0x1234_5678_90AB_CDEF;

/// Zobrist hashing keys for chess positions.
/// These are pseudo-random u64 values XORed together to create a hash for each position.
pub struct ZobristKeys {
    /// Indexed as: pieces[color][piece_type][square]
    pub pieces: [[[u64; 64]; 6]; 2],
    /// XORed in when it's black's turn
    pub side_to_move: u64,
    /// One key per castling-rights bit
    pub castling: [u64; 4],
    /// Keys for en passant file (0-7 for files a-h)
    pub en_passant: [u64; 8],
}

impl ZobristKeys {
    /// Deterministic keys from a fixed seed, so hashes are stable across runs.
    pub fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);

        let mut pieces = [[[0u64; 64]; 6]; 2];
        for color in pieces.iter_mut() {
            for piece in color.iter_mut() {
                for key in piece.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        let side_to_move = rng.gen();
        let castling = [rng.gen(), rng.gen(), rng.gen(), rng.gen()];
        let mut en_passant = [0u64; 8];
        for key in en_passant.iter_mut() {
            *key = rng.gen();
        }

        ZobristKeys {
            pieces,
            side_to_move,
            castling,
            en_passant,
        }
    }

    #[inline(always)]
    pub fn piece(&self, color: Color, piece: PieceType, sq: u8) -> u64 {
        self.pieces[color.index()][piece.index()][sq as usize]
    }

    /// XOR of the keys for every right currently held
    #[inline]
    pub fn castling(&self, rights: CastlingRights) -> u64 {
        let bits = rights.bits();
        let mut key = 0;
        for (i, k) in self.castling.iter().enumerate() {
            if bits & (1 << i) != 0 {
                key ^= k;
            }
        }
        key
    }

    /// Key for an en passant target square (only its file matters)
    #[inline(always)]
    pub fn en_passant(&self, sq: u8) -> u64 {
        self.en_passant[(sq & 7) as usize]
    }
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new()
    }
}

pub static ZOBRIST_KEYS: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);
