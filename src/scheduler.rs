//! Periodic sweep that closes out games nobody is acting on: a joined
//! game whose turn-duration deadline has passed is forfeited to whoever
//! played last, and a game that never saw a move is simply deleted.
//! Grounded on `pkg/server/scheduler/{scheduler,end_inactive_games}.go`.

use crate::handlers::game::settle_game_end;
use crate::state::AppState;
use actix_web::web;
use std::time::Duration;

const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Runs forever, sweeping for inactive games every `SWEEP_INTERVAL`. Spawn
/// with `tokio::spawn` from `main` so it runs alongside the HTTP server.
pub async fn run(state: web::Data<AppState>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        end_inactive_games(&state);
    }
}

fn end_inactive_games(state: &AppState) {
    let inactive_games = state.repositories.games.find_inactive_games();
    let mut ended = 0usize;

    for game in inactive_games {
        let game_id = game.id;
        let result = if game.last_move_played_at.is_some() {
            end_by_forfeit(state, game)
        } else {
            let result = state.repositories.games.delete(game_id);
            if result.is_ok() {
                state.repositories.game_moves.delete_by_game(game_id);
            }
            result
        };

        match result {
            Ok(()) => ended += 1,
            Err(e) => log::error!("error while ending inactive game {}: {}", game_id, e.reason()),
        }
    }

    if ended > 0 {
        log::info!("ended {} inactive games", ended);
    }
}

fn end_by_forfeit(state: &AppState, game: crate::repository::GameRow) -> crate::error::AppResult<()> {
    let moves = state.repositories.game_moves.find_by_game(game.id);
    let Some(last) = moves.last() else {
        let game_id = game.id;
        state.repositories.games.delete(game_id)?;
        state.repositories.game_moves.delete_by_game(game_id);
        return Ok(());
    };

    let winner = state.repositories.players.find_by_id(last.player_id)?;
    let loser_id =
        if game.white_player_id == Some(winner.id) { game.black_player_id } else { game.white_player_id };
    let loser = state.repositories.players.find_by_id(loser_id.unwrap_or(0))?;

    settle_game_end(state, game, winner, loser, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repository::GameRow;

    fn game_row(creator_id: i64) -> GameRow {
        GameRow {
            id: 0,
            name: "sweep test".to_string(),
            password_hash: None,
            turn_duration_seconds: Some(1),
            white_player_id: None,
            white_player_username: None,
            black_player_id: None,
            black_player_username: None,
            creator_id,
            winner_id: None,
            tiles: crate::types::Board::starting_position().to_tiles(),
            in_progress: true,
            last_move_played_at: None,
            started_at: None,
            ended_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn sweep_deletes_an_inactive_game_that_never_saw_a_move() {
        let state = AppState::new(Config::default());
        let white = state.repositories.players.create("white-p", "hash").unwrap();
        let black = state.repositories.players.create("black-p", "hash").unwrap();

        let mut row = game_row(white.id);
        row.white_player_id = Some(white.id);
        row.black_player_id = Some(black.id);
        row.started_at = Some((chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339());
        let game = state.repositories.games.create(row).unwrap();

        end_inactive_games(&state);

        assert!(state.repositories.games.find_by_id(game.id).is_err());
        assert!(state.repositories.game_moves.find_by_game(game.id).is_empty());
    }

    #[test]
    fn sweep_forfeits_an_inactive_game_with_moves_to_the_last_mover() {
        let state = AppState::new(Config::default());
        let white = state.repositories.players.create("white-p", "hash").unwrap();
        let black = state.repositories.players.create("black-p", "hash").unwrap();

        let mut row = game_row(white.id);
        row.white_player_id = Some(white.id);
        row.black_player_id = Some(black.id);
        row.last_move_played_at = Some((chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339());
        let game = state.repositories.games.create(row).unwrap();
        state.repositories.game_moves.create(game.id, white.id, "e2e4");

        end_inactive_games(&state);

        let settled = state.repositories.games.find_by_id(game.id).unwrap();
        assert!(!settled.in_progress);
        assert_eq!(settled.winner_id, Some(white.id));

        let white_after = state.repositories.players.find_by_id(white.id).unwrap();
        let black_after = state.repositories.players.find_by_id(black.id).unwrap();
        assert_eq!(white_after.wins, 1);
        assert_eq!(black_after.losses, 1);
        assert!(!white_after.is_playing);
        assert!(!black_after.is_playing);
    }

    #[test]
    fn sweep_ignores_games_still_within_their_turn_deadline() {
        let state = AppState::new(Config::default());
        let white = state.repositories.players.create("white-p", "hash").unwrap();
        let black = state.repositories.players.create("black-p", "hash").unwrap();

        let mut row = game_row(white.id);
        row.turn_duration_seconds = Some(3600);
        row.white_player_id = Some(white.id);
        row.black_player_id = Some(black.id);
        row.last_move_played_at = Some(chrono::Utc::now().to_rfc3339());
        let game = state.repositories.games.create(row).unwrap();

        end_inactive_games(&state);

        assert!(state.repositories.games.find_by_id(game.id).is_ok());
    }
}
