use std::fmt;

use crate::bitboard::square_name;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    pub fn from_char(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    pub fn from_case(c: char) -> Color {
        if c.is_uppercase() {
            Color::White
        } else {
            Color::Black
        }
    }

    #[inline(always)]
    pub const fn other_color(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn to_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    pub fn to_human(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

/// Piece kinds, in the order used to index `Board` bitboards and Zobrist keys.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PieceType {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    pub fn from_char(c: char) -> Option<PieceType> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn),
            'n' => Some(PieceType::Knight),
            'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook),
            'q' => Some(PieceType::Queen),
            'k' => Some(PieceType::King),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub fn from_index(index: usize) -> Option<PieceType> {
        Self::ALL.get(index).copied()
    }

    /// Lowercase FEN letter
    pub fn to_char(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }

    pub fn to_human(self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }
}

pub const PIECES_CAN_PROMOTE_TO: [PieceType; 4] = [
    PieceType::Queen,
    PieceType::Rook,
    PieceType::Bishop,
    PieceType::Knight,
];

/// Which side of the board a castling move goes to
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CastleSide {
    Kingside = 0,
    Queenside = 1,
}

impl CastleSide {
    pub const ALL: [CastleSide; 2] = [CastleSide::Kingside, CastleSide::Queenside];
}

/// The four castling flags packed into the low nibble of a byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KINGSIDE: u8 = 0b0001;
    pub const WHITE_QUEENSIDE: u8 = 0b0010;
    pub const BLACK_KINGSIDE: u8 = 0b0100;
    pub const BLACK_QUEENSIDE: u8 = 0b1000;
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    #[inline(always)]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn flag(color: Color, side: CastleSide) -> u8 {
        1 << (color as u8 * 2 + side as u8)
    }

    #[inline(always)]
    pub const fn has(self, color: Color, side: CastleSide) -> bool {
        self.0 & Self::flag(color, side) != 0
    }

    pub fn set(&mut self, color: Color, side: CastleSide) {
        self.0 |= Self::flag(color, side);
    }

    /// Keep only the rights whose bits are set in `keep`
    #[inline(always)]
    pub fn retain(&mut self, keep: u8) {
        self.0 &= keep;
    }

    /// FEN castling field, `-` when no rights remain
    pub fn to_fen(self) -> String {
        if self.0 == 0 {
            return "-".to_string();
        }
        let mut s = String::with_capacity(4);
        for (flag, c) in [
            (Self::WHITE_KINGSIDE, 'K'),
            (Self::WHITE_QUEENSIDE, 'Q'),
            (Self::BLACK_KINGSIDE, 'k'),
            (Self::BLACK_QUEENSIDE, 'q'),
        ] {
            if self.0 & flag != 0 {
                s.push(c);
            }
        }
        s
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    Quiet = 0,
    DoublePawnPush = 1,
    Capture = 2,
    EnPassantCapture = 3,
    CastleKingside = 4,
    CastleQueenside = 5,
    Promotion = 6,
    PromotionCapture = 7,
}

impl MoveType {
    const ALL: [MoveType; 8] = [
        MoveType::Quiet,
        MoveType::DoublePawnPush,
        MoveType::Capture,
        MoveType::EnPassantCapture,
        MoveType::CastleKingside,
        MoveType::CastleQueenside,
        MoveType::Promotion,
        MoveType::PromotionCapture,
    ];

    pub fn is_capture(self) -> bool {
        matches!(
            self,
            MoveType::Capture | MoveType::EnPassantCapture | MoveType::PromotionCapture
        )
    }
}

/// A move packed into 32 bits:
///
/// | bits  | field                      |
/// | ----- | -------------------------- |
/// | 0-5   | from square                |
/// | 6-11  | to square                  |
/// | 12-14 | moved piece                |
/// | 15-17 | captured piece (7 = none)  |
/// | 18-20 | promotion piece (7 = none) |
/// | 21-23 | move type                  |
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move(u32);

const NO_PIECE: u32 = 7;

impl Move {
    pub const NONE: Move = Move(0);

    #[inline(always)]
    pub fn new(
        from: u8,
        to: u8,
        piece: PieceType,
        move_type: MoveType,
        captured: Option<PieceType>,
    ) -> Self {
        Self::with_promotion(from, to, piece, move_type, captured, None)
    }

    #[inline(always)]
    pub fn new_quiet(from: u8, to: u8, piece: PieceType) -> Self {
        Self::new(from, to, piece, MoveType::Quiet, None)
    }

    #[inline(always)]
    pub fn with_promotion(
        from: u8,
        to: u8,
        piece: PieceType,
        move_type: MoveType,
        captured: Option<PieceType>,
        promotion: Option<PieceType>,
    ) -> Self {
        debug_assert!(from < 64 && to < 64);
        let captured = captured.map_or(NO_PIECE, |p| p as u32);
        let promotion = promotion.map_or(NO_PIECE, |p| p as u32);
        Move(
            from as u32
                | (to as u32) << 6
                | (piece as u32) << 12
                | captured << 15
                | promotion << 18
                | (move_type as u32) << 21,
        )
    }

    #[inline(always)]
    pub fn from_sq(self) -> u8 {
        (self.0 & 0x3F) as u8
    }

    #[inline(always)]
    pub fn to_sq(self) -> u8 {
        ((self.0 >> 6) & 0x3F) as u8
    }

    #[inline(always)]
    pub fn piece(self) -> PieceType {
        PieceType::from_index(((self.0 >> 12) & 0x7) as usize).unwrap_or(PieceType::Pawn)
    }

    #[inline(always)]
    pub fn captured(self) -> Option<PieceType> {
        PieceType::from_index(((self.0 >> 15) & 0x7) as usize)
    }

    #[inline(always)]
    pub fn promotion(self) -> Option<PieceType> {
        PieceType::from_index(((self.0 >> 18) & 0x7) as usize)
    }

    #[inline(always)]
    pub fn move_type(self) -> MoveType {
        MoveType::ALL[((self.0 >> 21) & 0x7) as usize]
    }

    #[inline(always)]
    pub fn is_capture(self) -> bool {
        self.move_type().is_capture()
    }

    /// Long algebraic notation as used by UCI, e.g. `e2e4`, `e7e8q`
    pub fn to_uci(self) -> String {
        let mut s = format!("{}{}", square_name(self.from_sq()), square_name(self.to_sq()));
        if let Some(p) = self.promotion() {
            s.push(p.to_char());
        }
        s
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?} {:?})", self.to_uci(), self.piece(), self.move_type())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboard::parse_square;

    #[test]
    fn test_move_packing() {
        let e7 = parse_square("e7").unwrap();
        let d8 = parse_square("d8").unwrap();
        let mv = Move::with_promotion(
            e7,
            d8,
            PieceType::Pawn,
            MoveType::PromotionCapture,
            Some(PieceType::Rook),
            Some(PieceType::Knight),
        );
        assert_eq!(mv.from_sq(), e7);
        assert_eq!(mv.to_sq(), d8);
        assert_eq!(mv.piece(), PieceType::Pawn);
        assert_eq!(mv.captured(), Some(PieceType::Rook));
        assert_eq!(mv.promotion(), Some(PieceType::Knight));
        assert_eq!(mv.move_type(), MoveType::PromotionCapture);
        assert!(mv.is_capture());
        assert_eq!(mv.to_uci(), "e7d8n");
    }

    #[test]
    fn test_quiet_move_has_no_capture_or_promotion() {
        let mv = Move::new_quiet(12, 28, PieceType::Pawn);
        assert_eq!(mv.captured(), None);
        assert_eq!(mv.promotion(), None);
        assert!(!mv.is_capture());
        assert_eq!(mv.to_uci(), "e2e4");
    }

    #[test]
    fn test_castling_rights_flags() {
        let mut rights = CastlingRights::NONE;
        rights.set(Color::White, CastleSide::Kingside);
        rights.set(Color::Black, CastleSide::Queenside);
        assert!(rights.has(Color::White, CastleSide::Kingside));
        assert!(!rights.has(Color::White, CastleSide::Queenside));
        assert!(!rights.has(Color::Black, CastleSide::Kingside));
        assert!(rights.has(Color::Black, CastleSide::Queenside));
        assert_eq!(rights.to_fen(), "Kq");

        rights.retain(!CastlingRights::WHITE_KINGSIDE);
        assert_eq!(rights.to_fen(), "q");
        assert_eq!(CastlingRights::NONE.to_fen(), "-");
        assert_eq!(CastlingRights::ALL.to_fen(), "KQkq");
    }

    #[test]
    fn test_color_other() {
        assert_eq!(Color::White.other_color(), Color::Black);
        assert_eq!(Color::Black.other_color(), Color::White);
        assert_eq!(Color::from_char('b'), Some(Color::Black));
        assert_eq!(Color::from_char('x'), None);
    }
}
