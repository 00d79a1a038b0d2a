//! Core board types: squares, pieces, colors, and the 8x8 grid.
//!
//! Internally ranks run 0 (rank 1) to 7 (rank 8), matching algebraic
//! notation directly. The wire "tiles" encoding used by the rest of the
//! crate (see `game::Board::to_tiles`/`from_tiles`) is row-major with row 0
//! as the black back rank, per the persisted board format.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Home rank index (0-based) for this color's pawns.
    pub fn pawn_start_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    /// Rank index (0-based) a pawn of this color promotes on.
    pub fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    pub fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceKind {
    pub fn from_letter(c: char) -> Option<PieceKind> {
        match c.to_ascii_uppercase() {
            'K' => Some(PieceKind::King),
            'Q' => Some(PieceKind::Queen),
            'R' => Some(PieceKind::Rook),
            'B' => Some(PieceKind::Bishop),
            'N' => Some(PieceKind::Knight),
            'P' => Some(PieceKind::Pawn),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            PieceKind::King => 'K',
            PieceKind::Queen => 'Q',
            PieceKind::Rook => 'R',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Pawn => 'P',
        }
    }
}

/// A chess piece with both kind and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// Uppercase for White, lowercase for Black, matching the persisted
    /// tiles encoding and the wire move notation's figure letter.
    pub fn to_fen_char(self) -> char {
        let c = self.kind.letter();
        match self.color {
            Color::White => c,
            Color::Black => c.to_ascii_lowercase(),
        }
    }

    pub fn from_fen_char(c: char) -> Option<Self> {
        if c == '0' {
            return None;
        }
        let color = if c.is_uppercase() { Color::White } else { Color::Black };
        let kind = PieceKind::from_letter(c)?;
        Some(Piece { kind, color })
    }
}

/// A square identified by 0-based file (a=0..h=7) and rank (1=0..8=7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Square {
    pub file: u8,
    pub rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Self {
        debug_assert!(file < 8 && rank < 8, "square out of bounds");
        Self { file, rank }
    }

    pub fn from_algebraic(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        if file < 8 && rank < 8 {
            Some(Square { file, rank })
        } else {
            None
        }
    }

    pub fn to_algebraic(self) -> String {
        format!("{}{}", (b'a' + self.file) as char, self.rank + 1)
    }

    pub fn offset(self, df: i8, dr: i8) -> Option<Square> {
        let f = self.file as i8 + df;
        let r = self.rank as i8 + dr;
        if (0..8).contains(&f) && (0..8).contains(&r) {
            Some(Square::new(f as u8, r as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        (self.rank as usize) * 8 + self.file as usize
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

/// The board as a flat 64-element array, index = `rank * 8 + file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub squares: [Option<Piece>; 64],
}

impl Default for Board {
    fn default() -> Self {
        Self { squares: [None; 64] }
    }
}

impl Board {
    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.index()] = piece;
    }

    pub fn starting_position() -> Self {
        let mut board = Board::default();
        let mut place = |file: u8, rank: u8, kind: PieceKind, color: Color| {
            board.set(Square::new(file, rank), Some(Piece::new(kind, color)));
        };

        let back_rank = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (file, kind) in back_rank.iter().enumerate() {
            place(file as u8, 0, *kind, Color::White);
            place(file as u8, 7, *kind, Color::Black);
        }
        for f in 0..8 {
            place(f, 1, PieceKind::Pawn, Color::White);
            place(f, 6, PieceKind::Pawn, Color::Black);
        }

        board
    }

    pub fn find_king(&self, color: Color) -> Option<Square> {
        for rank in 0..8u8 {
            for file in 0..8u8 {
                let sq = Square::new(file, rank);
                if let Some(piece) = self.get(sq)
                    && piece.kind == PieceKind::King
                    && piece.color == color
                {
                    return Some(sq);
                }
            }
        }
        None
    }

    /// Encodes the board as the persisted 64-char tiles string: row-major,
    /// row 0 is the black back rank (top), row 7 the white back rank.
    pub fn to_tiles(&self) -> String {
        let mut out = String::with_capacity(64);
        for row in 0..8u8 {
            let rank = 7 - row;
            for file in 0..8u8 {
                match self.get(Square::new(file, rank)) {
                    Some(p) => out.push(p.to_fen_char()),
                    None => out.push('0'),
                }
            }
        }
        out
    }

    pub fn from_tiles(tiles: &str) -> Result<Board, String> {
        let chars: Vec<char> = tiles.chars().collect();
        if chars.len() != 64 {
            return Err(format!("tiles must be exactly 64 characters, got {}", chars.len()));
        }
        let mut board = Board::default();
        for (i, &c) in chars.iter().enumerate() {
            if c != '0' && Piece::from_fen_char(c).is_none() {
                return Err(format!("invalid figure character '{}'", c));
            }
            let row = (i / 8) as u8;
            let file = (i % 8) as u8;
            let rank = 7 - row;
            board.set(Square::new(file, rank), Piece::from_fen_char(c));
        }
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_round_trips_through_tiles() {
        let board = Board::starting_position();
        let tiles = board.to_tiles();
        assert_eq!(tiles.len(), 64);
        let restored = Board::from_tiles(&tiles).unwrap();
        assert_eq!(restored.to_tiles(), tiles);
        for rank in 0..8u8 {
            for file in 0..8u8 {
                let sq = Square::new(file, rank);
                assert_eq!(board.get(sq), restored.get(sq));
            }
        }
    }

    #[test]
    fn empty_board_encodes_to_all_zero_tiles() {
        let board = Board::default();
        assert_eq!(board.to_tiles(), "0".repeat(64));
    }

    #[test]
    fn from_tiles_rejects_wrong_length() {
        assert!(Board::from_tiles("too-short").is_err());
    }

    #[test]
    fn from_tiles_rejects_unknown_figure_char() {
        let mut tiles = "0".repeat(64);
        tiles.replace_range(0..1, "x");
        assert!(Board::from_tiles(&tiles).is_err());
    }

    #[test]
    fn find_king_locates_both_colors_on_starting_position() {
        let board = Board::starting_position();
        assert_eq!(board.find_king(Color::White), Some(Square::new(4, 0)));
        assert_eq!(board.find_king(Color::Black), Some(Square::new(4, 7)));
    }

    #[test]
    fn find_king_returns_none_on_empty_board() {
        let board = Board::default();
        assert_eq!(board.find_king(Color::White), None);
    }
}
