//! Extended algebraic move notation: parsing and serialization.
//!
//! Grammar: `figure file? rank? 'x'? destFile destRank promotedFigure?
//! ('+'|'#')?`, plus the literal tokens `0-0`, `0-0-0`, `=`, `!`.

use crate::types::PieceKind;
use std::fmt;
use std::sync::LazyLock;

pub const CAPTURE_SIGN: &str = "x";
pub const KING_CHECK_SIGN: &str = "+";
pub const CHECKMATE_SIGN: &str = "#";
pub const DRAW_OFFER_MOVE: &str = "=";
pub const DRAW_REJECT_MOVE: &str = "!";
pub const KING_SIDE_CASTLING_MOVE: &str = "0-0";
pub const QUEEN_SIDE_CASTLING_MOVE: &str = "0-0-0";

static MOVE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(\w)([a-h])?([1-8])?(x)?([a-h])([1-8])(\w)?([+#])?$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotationError {
    InvalidFormat,
    InvalidFigure,
    InvalidPromotion,
}

impl fmt::Display for NotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotationError::InvalidFormat => write!(f, "move does not match the expected notation"),
            NotationError::InvalidFigure => write!(f, "unknown figure letter"),
            NotationError::InvalidPromotion => write!(f, "invalid promotion"),
        }
    }
}

/// A parsed move. Source file/rank are `None` when the input omitted them
/// (disambiguation is resolved later, by the rule engine, which also fills
/// them back in here so the normalized move string can be rendered).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub figure: PieceKind,
    pub figure_file: Option<u8>,
    pub figure_rank: Option<u8>,
    pub dest_file: u8,
    pub dest_rank: u8,
    pub promoted_to: Option<PieceKind>,
    pub is_capture: bool,
    pub is_king_side_castling: bool,
    pub is_queen_side_castling: bool,
    pub is_king_check: bool,
    pub is_checkmate: bool,
}

impl Move {
    fn castling(king_side: bool) -> Self {
        Move {
            figure: PieceKind::King,
            figure_file: None,
            figure_rank: None,
            dest_file: 0,
            dest_rank: 0,
            promoted_to: None,
            is_capture: false,
            is_king_side_castling: king_side,
            is_queen_side_castling: !king_side,
            is_king_check: false,
            is_checkmate: false,
        }
    }
}

fn file_to_col(c: char) -> u8 {
    c as u8 - b'a'
}

fn rank_to_row(c: char) -> u8 {
    (c as u8 - b'1') as u8
}

/// Parses a move string. Does not validate legality against any board;
/// only the notation's own grammar.
pub fn parse_move(input: &str) -> Result<Move, NotationError> {
    if input == KING_SIDE_CASTLING_MOVE {
        return Ok(Move::castling(true));
    }
    if input == QUEEN_SIDE_CASTLING_MOVE {
        return Ok(Move::castling(false));
    }

    let caps = MOVE_REGEX.captures(input).ok_or(NotationError::InvalidFormat)?;

    let figure_char = caps.get(1).unwrap().as_str().chars().next().unwrap();
    let figure = PieceKind::from_letter(figure_char).ok_or(NotationError::InvalidFigure)?;

    let figure_file = caps.get(2).map(|m| file_to_col(m.as_str().chars().next().unwrap()));
    let figure_rank = caps.get(3).map(|m| rank_to_row(m.as_str().chars().next().unwrap()));
    let is_capture = caps.get(4).is_some();
    let dest_file = file_to_col(caps.get(5).unwrap().as_str().chars().next().unwrap());
    let dest_rank = rank_to_row(caps.get(6).unwrap().as_str().chars().next().unwrap());

    let promoted_to = match caps.get(7) {
        Some(m) => {
            if figure != PieceKind::Pawn {
                return Err(NotationError::InvalidPromotion);
            }
            let c = m.as_str().chars().next().unwrap();
            let kind = PieceKind::from_letter(c).ok_or(NotationError::InvalidPromotion)?;
            if matches!(kind, PieceKind::Pawn | PieceKind::King) {
                return Err(NotationError::InvalidPromotion);
            }
            Some(kind)
        }
        None => None,
    };

    let (is_king_check, is_checkmate) = match caps.get(8).map(|m| m.as_str()) {
        Some("+") => (true, false),
        Some("#") => (true, true),
        _ => (false, false),
    };

    Ok(Move {
        figure,
        figure_file,
        figure_rank,
        dest_file,
        dest_rank,
        promoted_to,
        is_capture,
        is_king_side_castling: false,
        is_queen_side_castling: false,
        is_king_check,
        is_checkmate,
    })
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_king_side_castling {
            return write!(f, "{}", KING_SIDE_CASTLING_MOVE);
        }
        if self.is_queen_side_castling {
            return write!(f, "{}", QUEEN_SIDE_CASTLING_MOVE);
        }

        write!(f, "{}", self.figure.letter())?;
        if let Some(file) = self.figure_file {
            write!(f, "{}", (b'a' + file) as char)?;
        }
        if let Some(rank) = self.figure_rank {
            write!(f, "{}", rank + 1)?;
        }
        if self.is_capture {
            write!(f, "{}", CAPTURE_SIGN)?;
        }
        write!(f, "{}{}", (b'a' + self.dest_file) as char, self.dest_rank + 1)?;
        if let Some(promo) = self.promoted_to {
            write!(f, "{}", promo.letter())?;
        }
        if self.is_checkmate {
            write!(f, "{}", CHECKMATE_SIGN)?;
        } else if self.is_king_check {
            write!(f, "{}", KING_CHECK_SIGN)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_pawn_move() {
        let m = parse_move("Pa2a4").unwrap();
        assert_eq!(m.figure, PieceKind::Pawn);
        assert_eq!(m.figure_file, Some(0));
        assert_eq!(m.figure_rank, Some(1));
        assert_eq!(m.dest_file, 0);
        assert_eq!(m.dest_rank, 3);
    }

    #[test]
    fn parses_disambiguated_knight_move() {
        let m = parse_move("Nbxc3").unwrap();
        assert_eq!(m.figure, PieceKind::Knight);
        assert_eq!(m.figure_file, Some(1));
        assert_eq!(m.figure_rank, None);
        assert!(m.is_capture);
        assert_eq!(m.dest_file, 2);
        assert_eq!(m.dest_rank, 2);
    }

    #[test]
    fn parses_promotion() {
        let m = parse_move("Ph7h8Q").unwrap();
        assert_eq!(m.promoted_to, Some(PieceKind::Queen));
    }

    #[test]
    fn rejects_promotion_on_non_pawn() {
        assert_eq!(parse_move("Ra2a6Q"), Err(NotationError::InvalidPromotion));
    }

    #[test]
    fn rejects_promotion_to_pawn_or_king() {
        assert_eq!(parse_move("Ph7h8P"), Err(NotationError::InvalidPromotion));
        assert_eq!(parse_move("Ph7h8K"), Err(NotationError::InvalidPromotion));
    }

    #[test]
    fn parses_castling_literals() {
        let k = parse_move(KING_SIDE_CASTLING_MOVE).unwrap();
        assert!(k.is_king_side_castling);
        let q = parse_move(QUEEN_SIDE_CASTLING_MOVE).unwrap();
        assert!(q.is_queen_side_castling);
    }

    #[test]
    fn castling_serializes_distinctly() {
        assert_eq!(Move::castling(true).to_string(), KING_SIDE_CASTLING_MOVE);
        assert_eq!(Move::castling(false).to_string(), QUEEN_SIDE_CASTLING_MOVE);
    }

    #[test]
    fn rejects_bad_format() {
        assert_eq!(parse_move("garbage!!"), Err(NotationError::InvalidFormat));
    }

    #[test]
    fn round_trips_through_display() {
        let m = parse_move("Ra2a6+").unwrap();
        assert_eq!(parse_move(&m.to_string()).unwrap(), m);
    }
}
