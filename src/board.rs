//! Position representation: per-color, per-piece bitboards plus the FEN state fields
//! and an incrementally maintained Zobrist hash.

use std::fmt;

use color_eyre::eyre::{bail, ensure, eyre, Result, WrapErr};

use crate::bitboard::{lsb, parse_square, sq_rank, sq_to_bb, square_name, Bitboard};
use crate::tables::Tables;
use crate::types::{CastleSide, CastlingRights, Color, Move, MoveType, PieceType};
use crate::zobrist::ZOBRIST_KEYS;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    /// `pieces[color][piece_type]`
    pieces: [[Bitboard; 6]; 2],
    colors: [Bitboard; 2],
    occupied: Bitboard,
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<u8>,
    // number of half moves since last capture or pawn advance
    halfmove_clock: u32,
    // starts at 1, and gets incremented after every black move
    fullmove_number: u32,
    hash: u64,
}

impl Board {
    fn empty() -> Board {
        Board {
            pieces: [[0; 6]; 2],
            colors: [0; 2],
            occupied: 0,
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
        }
    }

    pub fn starting_position() -> Board {
        match Board::from_fen(STARTING_FEN) {
            Ok(board) => board,
            Err(_) => unreachable!("the starting FEN is valid"),
        }
    }

    /// Parse a FEN string. The halfmove and fullmove fields may be omitted.
    ///
    /// Castling rights whose king or rook is not on its home square are dropped.
    pub fn from_fen(fen: &str) -> Result<Board> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        ensure!(
            (4..=6).contains(&parts.len()),
            "FEN must have 4 to 6 space separated fields, got {}: {:?}",
            parts.len(),
            fen
        );

        let mut board = Board::empty();

        let ranks: Vec<&str> = parts[0].split('/').collect();
        ensure!(ranks.len() == 8, "FEN placement must have 8 ranks, got {}", ranks.len());
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    ensure!((1..=8).contains(&skip), "invalid empty-square count {:?}", c);
                    file += skip as u8;
                } else {
                    let piece = PieceType::from_char(c)
                        .ok_or_else(|| eyre!("unexpected char {:?} in FEN placement", c))?;
                    ensure!(file < 8, "rank {} of FEN has more than 8 files", rank + 1);
                    board.add_piece(Color::from_case(c), piece, rank * 8 + file);
                    file += 1;
                }
                ensure!(file <= 8, "rank {} of FEN has more than 8 files", rank + 1);
            }
            ensure!(file == 8, "rank {} of FEN has {} files, expected 8", rank + 1, file);
        }
        for color in Color::ALL {
            let kings = board.piece_bb(color, PieceType::King).count_ones();
            ensure!(kings == 1, "{} must have exactly one king, found {}", color.to_human(), kings);
        }

        board.side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => bail!("side to move must be 'w' or 'b', got {:?}", other),
        };

        if parts[2] != "-" {
            for c in parts[2].chars() {
                let (color, side) = match c {
                    'K' => (Color::White, CastleSide::Kingside),
                    'Q' => (Color::White, CastleSide::Queenside),
                    'k' => (Color::Black, CastleSide::Kingside),
                    'q' => (Color::Black, CastleSide::Queenside),
                    other => bail!("invalid castling character {:?}", other),
                };
                if board.castling_pieces_home(color, side) {
                    board.castling.set(color, side);
                }
            }
        }

        board.en_passant = match parts[3] {
            "-" => None,
            s => {
                let sq = parse_square(s).ok_or_else(|| eyre!("invalid en passant square {:?}", s))?;
                let expected_rank = match board.side_to_move {
                    Color::White => 5,
                    Color::Black => 2,
                };
                ensure!(
                    sq_rank(sq) == expected_rank,
                    "en passant square {} is on the wrong rank",
                    s
                );
                Some(sq)
            }
        };

        if let Some(halfmove) = parts.get(4) {
            board.halfmove_clock = halfmove
                .parse()
                .wrap_err_with(|| format!("invalid halfmove clock {:?}", halfmove))?;
        }
        if let Some(fullmove) = parts.get(5) {
            board.fullmove_number = fullmove
                .parse()
                .wrap_err_with(|| format!("invalid fullmove number {:?}", fullmove))?;
        }

        board.hash = board.compute_hash();
        Ok(board)
    }

    fn castling_pieces_home(&self, color: Color, side: CastleSide) -> bool {
        let back_rank = match color {
            Color::White => 0,
            Color::Black => 56,
        };
        let rook_sq = match side {
            CastleSide::Kingside => back_rank + 7,
            CastleSide::Queenside => back_rank,
        };
        self.piece_bb(color, PieceType::King) & sq_to_bb(back_rank + 4) != 0
            && self.piece_bb(color, PieceType::Rook) & sq_to_bb(rook_sq) != 0
    }

    pub fn to_fen(&self) -> String {
        let mut placement = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.piece_at(rank * 8 + file) {
                    Some((color, piece)) => {
                        if empty > 0 {
                            placement.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        let c = piece.to_char();
                        placement.push(match color {
                            Color::White => c.to_ascii_uppercase(),
                            Color::Black => c,
                        });
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                placement.push('/');
            }
        }

        format!(
            "{} {} {} {} {} {}",
            placement,
            self.side_to_move.to_char(),
            self.castling.to_fen(),
            self.en_passant.map_or_else(|| "-".to_string(), square_name),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    #[inline(always)]
    pub fn piece_bb(&self, color: Color, piece: PieceType) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    #[inline(always)]
    pub fn color_bb(&self, color: Color) -> Bitboard {
        self.colors[color.index()]
    }

    #[inline(always)]
    pub fn occupied(&self) -> Bitboard {
        self.occupied
    }

    #[inline(always)]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[inline(always)]
    pub fn en_passant(&self) -> Option<u8> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Incrementally maintained Zobrist hash
    #[inline(always)]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Zobrist hash computed from scratch
    pub fn compute_hash(&self) -> u64 {
        let keys = &*ZOBRIST_KEYS;
        let mut hash = 0;
        for color in Color::ALL {
            for piece in PieceType::ALL {
                let mut bb = self.piece_bb(color, piece);
                while bb != 0 {
                    let sq = lsb(bb);
                    bb &= bb - 1;
                    hash ^= keys.piece(color, piece, sq);
                }
            }
        }
        if self.side_to_move == Color::Black {
            hash ^= keys.side_to_move;
        }
        hash ^= keys.castling(self.castling);
        if let Some(ep) = self.en_passant {
            hash ^= keys.en_passant(ep);
        }
        hash
    }

    pub fn piece_at(&self, sq: u8) -> Option<(Color, PieceType)> {
        let bb = sq_to_bb(sq);
        if self.occupied & bb == 0 {
            return None;
        }
        let color = if self.colors[0] & bb != 0 {
            Color::White
        } else {
            Color::Black
        };
        PieceType::ALL
            .into_iter()
            .find(|&p| self.piece_bb(color, p) & bb != 0)
            .map(|p| (color, p))
    }

    #[inline(always)]
    pub fn king_square(&self, color: Color) -> u8 {
        lsb(self.piece_bb(color, PieceType::King))
    }

    #[inline(always)]
    fn add_piece(&mut self, color: Color, piece: PieceType, sq: u8) {
        let bb = sq_to_bb(sq);
        debug_assert!(self.occupied & bb == 0, "square {} already occupied", square_name(sq));
        self.pieces[color.index()][piece.index()] |= bb;
        self.colors[color.index()] |= bb;
        self.occupied |= bb;
        self.hash ^= ZOBRIST_KEYS.piece(color, piece, sq);
    }

    #[inline(always)]
    fn remove_piece(&mut self, color: Color, piece: PieceType, sq: u8) {
        let bb = sq_to_bb(sq);
        debug_assert!(
            self.pieces[color.index()][piece.index()] & bb != 0,
            "no {} {} on {}",
            color.to_human(),
            piece.to_human(),
            square_name(sq)
        );
        self.pieces[color.index()][piece.index()] ^= bb;
        self.colors[color.index()] ^= bb;
        self.occupied ^= bb;
        self.hash ^= ZOBRIST_KEYS.piece(color, piece, sq);
    }

    #[inline(always)]
    fn move_piece(&mut self, color: Color, piece: PieceType, from: u8, to: u8) {
        self.remove_piece(color, piece, from);
        self.add_piece(color, piece, to);
    }

    /// Apply a pseudo-legal move for the side to move. The hash is updated
    /// incrementally.
    pub fn play_move(&mut self, tables: &Tables, mv: Move) {
        let keys = &*ZOBRIST_KEYS;
        let us = self.side_to_move;
        let them = us.other_color();
        let (from, to, piece) = (mv.from_sq(), mv.to_sq(), mv.piece());

        self.hash ^= keys.castling(self.castling);
        if let Some(ep) = self.en_passant.take() {
            self.hash ^= keys.en_passant(ep);
        }

        match mv.move_type() {
            MoveType::Capture | MoveType::PromotionCapture => {
                if let Some(captured) = mv.captured() {
                    self.remove_piece(them, captured, to);
                }
            }
            MoveType::EnPassantCapture => {
                let captured_sq = match us {
                    Color::White => to - 8,
                    Color::Black => to + 8,
                };
                self.remove_piece(them, PieceType::Pawn, captured_sq);
            }
            MoveType::CastleKingside | MoveType::CastleQueenside => {
                let side = match mv.move_type() {
                    MoveType::CastleKingside => CastleSide::Kingside,
                    _ => CastleSide::Queenside,
                };
                let path = tables.castling.path(us, side);
                self.move_piece(us, PieceType::Rook, path.rook_from, path.rook_to);
            }
            MoveType::DoublePawnPush => {
                let ep = (from + to) / 2;
                self.en_passant = Some(ep);
                self.hash ^= keys.en_passant(ep);
            }
            MoveType::Quiet | MoveType::Promotion => {}
        }

        match mv.promotion() {
            Some(promoted) => {
                self.remove_piece(us, piece, from);
                self.add_piece(us, promoted, to);
            }
            None => self.move_piece(us, piece, from, to),
        }

        self.castling
            .retain(tables.castling.rights_kept(from) & tables.castling.rights_kept(to));
        self.hash ^= keys.castling(self.castling);

        if piece == PieceType::Pawn || mv.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if us == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = them;
        self.hash ^= keys.side_to_move;

        debug_assert_eq!(self.hash, self.compute_hash());
    }

    /// Is `sq` attacked by any piece of color `by`?
    pub fn is_square_attacked(&self, tables: &Tables, sq: u8, by: Color) -> bool {
        let occupied = self.occupied;
        let bishops_queens =
            self.piece_bb(by, PieceType::Bishop) | self.piece_bb(by, PieceType::Queen);
        let rooks_queens = self.piece_bb(by, PieceType::Rook) | self.piece_bb(by, PieceType::Queen);

        // a pawn of `by` attacks sq iff a pawn of the other color on sq would attack it
        tables.pawn_attacks(by.other_color(), sq) & self.piece_bb(by, PieceType::Pawn) != 0
            || tables.knight_attacks(sq) & self.piece_bb(by, PieceType::Knight) != 0
            || tables.king_attacks(sq) & self.piece_bb(by, PieceType::King) != 0
            || tables.bishop_attacks(sq, occupied) & bishops_queens != 0
            || tables.rook_attacks(sq, occupied) & rooks_queens != 0
    }

    pub fn is_king_checked(&self, tables: &Tables, color: Color) -> bool {
        self.is_square_attacked(tables, self.king_square(color), color.other_color())
    }

    /// Would playing `mv` leave the mover's own king safe?
    pub fn is_move_legal(&self, tables: &Tables, mv: Move) -> bool {
        let mut next = self.clone();
        next.play_move(tables, mv);
        !next.is_king_checked(tables, self.side_to_move)
    }

    pub fn draw_board(&self) -> String {
        let mut out = String::new();
        for rank in (0..8u8).rev() {
            for file in 0..8u8 {
                let symbol = match self.piece_at(rank * 8 + file) {
                    Some((color, piece)) => piece_symbol(color, piece),
                    None => '.',
                };
                out.push(' ');
                out.push(symbol);
            }
            out.push('\n');
        }
        out
    }
}

fn piece_symbol(color: Color, piece: PieceType) -> char {
    match (color, piece) {
        (Color::White, PieceType::Pawn) => '♙',
        (Color::White, PieceType::Knight) => '♘',
        (Color::White, PieceType::Bishop) => '♗',
        (Color::White, PieceType::Rook) => '♖',
        (Color::White, PieceType::Queen) => '♕',
        (Color::White, PieceType::King) => '♔',
        (Color::Black, PieceType::Pawn) => '♟',
        (Color::Black, PieceType::Knight) => '♞',
        (Color::Black, PieceType::Bishop) => '♝',
        (Color::Black, PieceType::Rook) => '♜',
        (Color::Black, PieceType::Queen) => '♛',
        (Color::Black, PieceType::King) => '♚',
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.to_fen())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.draw_board())
    }
}
