//! The in-memory chess position: board plus move history, independent of
//! any particular session's persistence or player bookkeeping.
//!
//! A `Game` is rebuilt by replaying a session's stored move strings from the
//! starting position. Replay is what makes castling eligibility and
//! disambiguation correct (history-aware, resolved source squares) rather
//! than something guessable from the final board alone.

use crate::notation::{self, Move, NotationError};
use crate::rules::{self, MoveRecord, Resolved, RuleError};
use crate::types::{Board, Color};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    Notation(NotationError),
    Rule(RuleError),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::Notation(e) => write!(f, "{}", e),
            GameError::Rule(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for GameError {}

impl From<NotationError> for GameError {
    fn from(e: NotationError) -> Self {
        GameError::Notation(e)
    }
}

impl From<RuleError> for GameError {
    fn from(e: RuleError) -> Self {
        GameError::Rule(e)
    }
}

/// A chess position plus the history of moves that produced it.
#[derive(Debug, Clone)]
pub struct Game {
    pub board: Board,
    pub history: Vec<MoveRecord>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// A fresh game at the standard starting position.
    pub fn new() -> Self {
        Self { board: Board::starting_position(), history: Vec::new() }
    }

    /// Side to move, derived from how many half-moves have been played.
    pub fn turn(&self) -> Color {
        if self.history.len() % 2 == 0 { Color::White } else { Color::Black }
    }

    /// Rebuilds a game by replaying `moves` (in play order) from the
    /// starting position. Replaying rather than trusting a cached board is
    /// what reconstructs the resolved source squares castling needs. Draw
    /// offer/reject tokens (`=`/`!`) are protocol-only and carry no board
    /// change, so they're skipped rather than parsed as moves.
    pub fn replay(moves: &[String]) -> Result<Game, GameError> {
        let mut game = Game::new();
        for notation_str in moves {
            if notation_str == notation::DRAW_OFFER_MOVE || notation_str == notation::DRAW_REJECT_MOVE {
                continue;
            }
            let mv = notation::parse_move(notation_str)?;
            game.apply(&mv)?;
        }
        Ok(game)
    }

    fn apply(&mut self, mv: &Move) -> Result<Resolved, GameError> {
        let color = self.turn();
        let resolved = rules::validate_move(&self.board, &self.history, color, mv)?;
        rules::execute_move(&mut self.board, color, mv, resolved);
        self.history.push(MoveRecord {
            color,
            figure: mv.figure,
            from: resolved.from,
            is_king_side_castling: mv.is_king_side_castling,
            is_queen_side_castling: mv.is_queen_side_castling,
        });
        Ok(resolved)
    }

    /// Validates and plays `notation_str` as the next move. Returns the
    /// normalized move string to persist: capture/check/checkmate markers
    /// are recomputed from the resulting position rather than trusted from
    /// the caller's input.
    pub fn make_move(&mut self, notation_str: &str) -> Result<String, GameError> {
        if notation_str == notation::DRAW_OFFER_MOVE || notation_str == notation::DRAW_REJECT_MOVE {
            return Ok(notation_str.to_string());
        }

        let mut mv = notation::parse_move(notation_str)?;
        let resolved = self.apply(&mv)?;

        mv.is_capture = resolved.is_capture;
        let opponent = self.turn();
        mv.is_king_check = rules::is_king_check(&self.board, opponent);
        mv.is_checkmate = mv.is_king_check && rules::is_checkmate(&self.board, &self.history, opponent);

        Ok(mv.to_string())
    }

    /// True if the side to move has no legal response to being in check.
    pub fn is_checkmate(&self) -> bool {
        rules::is_king_check(&self.board, self.turn())
            && rules::is_checkmate(&self.board, &self.history, self.turn())
    }

    pub fn is_check(&self) -> bool {
        rules::is_king_check(&self.board, self.turn())
    }

    pub fn to_tiles(&self) -> String {
        self.board.to_tiles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_opening_moves() {
        let game = Game::replay(&["Pe2e4".into(), "Pe7e5".into()]).unwrap();
        assert_eq!(game.turn(), Color::White);
        assert_eq!(game.history.len(), 2);
    }

    #[test]
    fn make_move_rejects_illegal_notation() {
        let mut game = Game::new();
        assert!(game.make_move("Pe2e5").is_err());
    }

    #[test]
    fn fools_mate_persists_checkmate_marker() {
        let mut game = Game::new();
        game.make_move("Pf2f3").unwrap();
        game.make_move("Pe7e5").unwrap();
        game.make_move("Pg2g4").unwrap();
        let last = game.make_move("Qd8h4").unwrap();
        assert!(last.ends_with('#'));
        assert!(game.is_checkmate());
    }

    #[test]
    fn castling_after_clearing_the_back_rank() {
        let moves = [
            "Pe2e4", "Pe7e5", "Ng1f3", "Nb8c6", "Bf1c4", "Bf8c5",
        ];
        let mut game = Game::new();
        for m in moves {
            game.make_move(m).unwrap();
        }
        let castle = game.make_move("0-0").unwrap();
        assert_eq!(castle, "0-0");
    }
}
