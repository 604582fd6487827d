//! Fixed-capacity move buffer.
//!
//! Perft keeps one `MoveList` per ply on the stack, so a generated position never
//! touches the allocator. The filled part derefs to `&[Move]`.

use std::ops::Deref;

use crate::types::Move;

/// No legal position has more than 218 moves; pseudo-legal lists stay well below
/// this too.
pub const MAX_MOVES: usize = 256;

#[derive(Clone)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    len: usize,
}

impl MoveList {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            moves: [Move::NONE; MAX_MOVES],
            len: 0,
        }
    }

    #[inline(always)]
    pub fn push(&mut self, mv: Move) {
        debug_assert!(self.len < MAX_MOVES, "more than {} moves generated", MAX_MOVES);
        self.moves[self.len] = mv;
        self.len += 1;
    }

    /// Keep the moves accepted by `keep`, preserving generation order.
    #[inline]
    pub fn retain(&mut self, mut keep: impl FnMut(Move) -> bool) {
        let mut kept = 0;
        for i in 0..self.len {
            let mv = self.moves[i];
            if keep(mv) {
                self.moves[kept] = mv;
                kept += 1;
            }
        }
        self.len = kept;
    }

    /// Moves by value
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, Move>> {
        self.deref().iter().copied()
    }
}

impl Deref for MoveList {
    type Target = [Move];

    #[inline(always)]
    fn deref(&self) -> &[Move] {
        &self.moves[..self.len]
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = Move;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Move>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(|mv| mv.to_uci())).finish()
    }
}
