//! Move generation.
//!
//! The target functions return the bitboard of squares a single piece may move to;
//! [`piece_targets`] dispatches on the piece type. The enumerator turns those
//! bitboards into typed [`Move`]s for the side to move.

use crate::bitboard::{sq_file, sq_to_bb, Bitboard, BitboardIter, EMPTY, RANK_1, RANK_8};
use crate::board::Board;
use crate::movelist::MoveList;
use crate::tables::Tables;
use crate::types::{CastleSide, Color, Move, MoveType, PieceType, PIECES_CAN_PROMOTE_TO};

// =========================================================================
// Piece targets
// =========================================================================

#[inline(always)]
pub fn bishop_targets(tables: &Tables, board: &Board, color: Color, sq: u8) -> Bitboard {
    tables.bishop_attacks(sq, board.occupied()) & !board.color_bb(color)
}

#[inline(always)]
pub fn rook_targets(tables: &Tables, board: &Board, color: Color, sq: u8) -> Bitboard {
    tables.rook_attacks(sq, board.occupied()) & !board.color_bb(color)
}

#[inline(always)]
pub fn queen_targets(tables: &Tables, board: &Board, color: Color, sq: u8) -> Bitboard {
    tables.queen_attacks(sq, board.occupied()) & !board.color_bb(color)
}

#[inline(always)]
pub fn knight_targets(tables: &Tables, board: &Board, color: Color, sq: u8) -> Bitboard {
    tables.knight_attacks(sq) & !board.color_bb(color)
}

/// Ordinary king steps, castling excluded
#[inline(always)]
pub fn king_targets(tables: &Tables, board: &Board, color: Color, sq: u8) -> Bitboard {
    tables.king_attacks(sq) & !board.color_bb(color)
}

/// Destination squares of the castling moves available to the side to move.
///
/// A side is allowed when the right is held, every square between king and rook
/// is empty, the king is not in check, and moving the king to the transit square
/// and to the destination square would each be legal.
pub fn castling_targets(tables: &Tables, board: &Board) -> Bitboard {
    let color = board.side_to_move();
    let rights = board.castling_rights();
    if !rights.has(color, CastleSide::Kingside) && !rights.has(color, CastleSide::Queenside) {
        return EMPTY;
    }
    // Can't castle while in check
    if board.is_king_checked(tables, color) {
        return EMPTY;
    }

    let mut targets = EMPTY;
    for side in CastleSide::ALL {
        if !rights.has(color, side) {
            continue;
        }
        let path = tables.castling.path(color, side);
        if board.occupied() & path.between != 0 {
            continue;
        }
        let through = Move::new_quiet(path.king_from, path.king_transit, PieceType::King);
        let into = Move::new_quiet(path.king_from, path.king_to, PieceType::King);
        if board.is_move_legal(tables, through) && board.is_move_legal(tables, into) {
            targets |= sq_to_bb(path.king_to);
        }
    }
    targets
}

/// Single push onto an empty square, and the double push from the home rank when
/// both squares in front are empty.
#[inline(always)]
pub fn pawn_push_targets(tables: &Tables, board: &Board, color: Color, sq: u8) -> Bitboard {
    let empty = !board.occupied();
    let single = tables.pawn_push(color, sq) & empty;
    if single == 0 {
        return EMPTY;
    }
    single | (tables.pawn_double_push(color, sq) & empty)
}

/// Diagonal captures of enemy pieces, plus the en passant square when set and
/// `color` is the side to move.
#[inline(always)]
pub fn pawn_capture_targets(tables: &Tables, board: &Board, color: Color, sq: u8) -> Bitboard {
    let mut capturable = board.color_bb(color.other_color());
    // only the side to move may capture en passant
    if let Some(ep) = board.en_passant() {
        if color == board.side_to_move() {
            capturable |= sq_to_bb(ep);
        }
    }
    tables.pawn_attacks(color, sq) & capturable
}

/// Every square the piece on `sq` may move to. Castling destinations are included
/// for the king of the side to move.
pub fn piece_targets(
    tables: &Tables,
    board: &Board,
    piece: PieceType,
    color: Color,
    sq: u8,
) -> Bitboard {
    match piece {
        PieceType::Pawn => {
            pawn_push_targets(tables, board, color, sq)
                | pawn_capture_targets(tables, board, color, sq)
        }
        PieceType::Knight => knight_targets(tables, board, color, sq),
        PieceType::Bishop => bishop_targets(tables, board, color, sq),
        PieceType::Rook => rook_targets(tables, board, color, sq),
        PieceType::Queen => queen_targets(tables, board, color, sq),
        PieceType::King => {
            let mut targets = king_targets(tables, board, color, sq);
            if color == board.side_to_move() {
                targets |= castling_targets(tables, board);
            }
            targets
        }
    }
}

// =========================================================================
// Move enumeration
// =========================================================================

/// Append every pseudo-legal move of the side to move. Moves may leave the mover's
/// own king in check; castling moves are always fully legal.
pub fn generate_pseudo_legal(tables: &Tables, board: &Board, list: &mut MoveList) {
    let us = board.side_to_move();
    let enemy = board.color_bb(us.other_color());

    for piece in PieceType::ALL {
        for from in BitboardIter(board.piece_bb(us, piece)) {
            let targets = piece_targets(tables, board, piece, us, from);
            for to in BitboardIter(targets) {
                let captured = if enemy & sq_to_bb(to) != 0 {
                    board.piece_at(to).map(|(_, p)| p)
                } else {
                    None
                };
                match piece {
                    PieceType::Pawn => push_pawn_moves(board, list, from, to, captured),
                    PieceType::King if sq_file(from).abs_diff(sq_file(to)) == 2 => {
                        let move_type = if to > from {
                            MoveType::CastleKingside
                        } else {
                            MoveType::CastleQueenside
                        };
                        list.push(Move::new(from, to, piece, move_type, None));
                    }
                    _ => {
                        let move_type = if captured.is_some() {
                            MoveType::Capture
                        } else {
                            MoveType::Quiet
                        };
                        list.push(Move::new(from, to, piece, move_type, captured));
                    }
                }
            }
        }
    }
}

/// Type a pawn move, expanding promotions into one move per promotion piece.
#[inline(always)]
fn push_pawn_moves(
    board: &Board,
    list: &mut MoveList,
    from: u8,
    to: u8,
    captured: Option<PieceType>,
) {
    if sq_to_bb(to) & (RANK_1 | RANK_8) != 0 {
        let move_type = if captured.is_some() {
            MoveType::PromotionCapture
        } else {
            MoveType::Promotion
        };
        for promotion in PIECES_CAN_PROMOTE_TO {
            list.push(Move::with_promotion(
                from,
                to,
                PieceType::Pawn,
                move_type,
                captured,
                Some(promotion),
            ));
        }
        return;
    }

    let move_type = if captured.is_some() {
        MoveType::Capture
    } else if board.en_passant() == Some(to) && sq_file(from) != sq_file(to) {
        MoveType::EnPassantCapture
    } else if from.abs_diff(to) == 16 {
        MoveType::DoublePawnPush
    } else {
        MoveType::Quiet
    };
    list.push(Move::new(from, to, PieceType::Pawn, move_type, captured));
}

/// Append every legal move of the side to move.
pub fn generate_legal(tables: &Tables, board: &Board, list: &mut MoveList) {
    generate_pseudo_legal(tables, board, list);
    list.retain(|mv| board.is_move_legal(tables, mv));
}

pub fn legal_moves(tables: &Tables, board: &Board) -> MoveList {
    let mut list = MoveList::new();
    generate_legal(tables, board, &mut list);
    list
}

pub fn count_legal(tables: &Tables, board: &Board) -> usize {
    legal_moves(tables, board).len()
}
