//! Game session endpoints: list/find/create/join/quit/move, plus the
//! shared end-game settlement routine the scheduler reuses to close out
//! abandoned games. Grounded on `pkg/server/handler/game.go`.

use crate::auth::{get_auth_player, hash_password, refresh_is_playing, verify_password};
use crate::error::{AppError, AppResult};
use crate::events;
use crate::game::Game as ChessGame;
use crate::handlers::ListQuery;
use crate::model::{self, GameCreate, GameJoin, GameMakeMove, GenericResponse, ListResponse};
use crate::notation;
use crate::rating::{self, Outcome};
use crate::repository::{GameMoveRow, GameRow, PlayerRow, QueryParams};
use crate::state::AppState;
use actix_web::{HttpRequest, HttpResponse, web};

fn to_game_dto(game: &GameRow) -> model::Game {
    model::Game {
        id: game.id,
        name: game.name.clone(),
        turn_duration_seconds: game.turn_duration_seconds.unwrap_or(0),
        public: game.password_hash.is_none(),
        white_player_id: game.white_player_id.unwrap_or(0),
        black_player_id: game.black_player_id.unwrap_or(0),
        winner_id: game.winner_id.unwrap_or(0),
        creator_id: game.creator_id,
        in_progress: game.in_progress,
        tiles: game.tiles.clone(),
        last_move_played_at: model::iso_or_empty(&game.last_move_played_at),
        started_at: model::iso_or_empty(&game.started_at),
        ended_at: model::iso_or_empty(&game.ended_at),
        created_at: game.created_at.clone(),
    }
}

fn to_game_move_dto(row: &GameMoveRow) -> model::GameMove {
    model::GameMove { id: row.id, game_id: row.game_id, player_id: row.player_id, mv: row.mv.clone(), created_at: row.created_at.clone() }
}

fn get_player_and_game(state: &AppState, req: &HttpRequest, id: i64) -> AppResult<(PlayerRow, GameRow)> {
    let player = get_auth_player(state, req)?;
    let game = state.repositories.games.find_by_id(id)?;
    Ok((player, game))
}

/// Query and list games with the shared pagination/filter DSL.
#[utoipa::path(
    get,
    path = "/v1/games",
    tag = "games",
    params(("page" = Option<i64>, Query), ("size" = Option<i64>, Query), ("sort" = Option<String>, Query), ("filter" = Option<String>, Query)),
    responses((status = 200, description = "Ok")),
    security(("bearer_token" = []))
)]
pub async fn list_games(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    get_auth_player(&state, &req)?;

    let params: QueryParams = (&query.0).into();
    let (rows, total) = state.repositories.games.query(&params);
    let items: Vec<_> = rows.iter().map(to_game_dto).collect();

    Ok(HttpResponse::Ok().json(ListResponse { result_count: items.len(), items, total_count: total }))
}

/// Find a single game by id.
#[utoipa::path(
    get,
    path = "/v1/games/{id}",
    tag = "games",
    params(("id" = i64, Path)),
    responses((status = 200, description = "Ok")),
    security(("bearer_token" = []))
)]
pub async fn find_one_game(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    get_auth_player(&state, &req)?;
    let game = state.repositories.games.find_by_id(path.into_inner())?;
    Ok(HttpResponse::Ok().json(to_game_dto(&game)))
}

/// Create a new game, taking either side at the creator's choice. Refuses
/// once the player already has `rules.maxCreatedGames` non-ended games.
#[utoipa::path(
    post,
    path = "/v1/games/create",
    tag = "games",
    request_body = GameCreate,
    responses((status = 200, description = "Ok")),
    security(("bearer_token" = []))
)]
pub async fn create_game(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<GameCreate>,
) -> AppResult<HttpResponse> {
    let player = get_auth_player(&state, &req)?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("game name is required".to_string()));
    }

    let max_created_games = state.config.rules.max_created_games;
    let created_games = state.repositories.games.count(&format!("creatorId={};and;endedAt=null", player.id));
    if created_games as i64 >= max_created_games {
        return Err(AppError::BusinessRule(format!(
            "maximum number of created active games reached ({})",
            max_created_games
        )));
    }

    // The reference server only treats an omitted/zero duration as "use the
    // configured default". This crate additionally recognizes an explicit
    // -1 as "no limit", since the client-facing contract calls that out.
    let default_duration = if state.config.rules.default_turn_duration_seconds > 0 {
        Some(state.config.rules.default_turn_duration_seconds)
    } else {
        None
    };
    let turn_duration_seconds = match body.turn_duration_seconds {
        Some(-1) => None,
        Some(v) if v > 0 => Some(v),
        _ => default_duration,
    };

    let password_hash =
        if body.password.is_empty() { None } else { Some(hash_password(&body.password)?) };

    let (white_player_id, white_player_username, black_player_id, black_player_username) = if body.is_white {
        (Some(player.id), Some(player.username.clone()), None, None)
    } else {
        (None, None, Some(player.id), Some(player.username.clone()))
    };

    let row = state.repositories.games.create(GameRow {
        id: 0,
        name: name.to_string(),
        password_hash,
        turn_duration_seconds,
        white_player_id,
        white_player_username,
        black_player_id,
        black_player_username,
        creator_id: player.id,
        winner_id: None,
        tiles: crate::types::Board::starting_position().to_tiles(),
        in_progress: false,
        last_move_played_at: None,
        started_at: None,
        ended_at: None,
        created_at: String::new(),
        updated_at: String::new(),
    })?;

    Ok(HttpResponse::Ok().json(to_game_dto(&row)))
}

/// Join an existing game as the side not yet taken, checking the join
/// quota, the private-game password, and that it hasn't already started
/// or finished.
#[utoipa::path(
    post,
    path = "/v1/games/{id}/join",
    tag = "games",
    params(("id" = i64, Path)),
    request_body = GameJoin,
    responses((status = 200, description = "Ok", body = GenericResponse<()>)),
    security(("bearer_token" = []))
)]
pub async fn join_game(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<GameJoin>,
) -> AppResult<HttpResponse> {
    let (player, mut game) = get_player_and_game(&state, &req, path.into_inner())?;

    let max_joined_games = state.config.rules.max_joined_games;
    let joined_games = state.repositories.games.count(&format!(
        "whitePlayerId={};and;endedAt=null;or;blackPlayerId={};and;endedAt=null",
        player.id, player.id
    ));
    if joined_games as i64 >= max_joined_games {
        return Err(AppError::BusinessRule(format!(
            "maximum number of joined active games reached ({})",
            max_joined_games
        )));
    }

    if let Some(hash) = &game.password_hash {
        if body.password.is_empty() {
            return Err(AppError::Forbidden("game password is required".to_string()));
        }
        if !verify_password(&body.password, hash) {
            return Err(AppError::InvalidInput("invalid game password provided".to_string()));
        }
    }

    if game.in_progress {
        return Err(AppError::BusinessRule("game is already in progress".to_string()));
    }
    if game.ended_at.is_some() {
        return Err(AppError::Forbidden("game has already finished".to_string()));
    }
    if game.white_player_id == Some(player.id) || game.black_player_id == Some(player.id) {
        return Err(AppError::Forbidden("you have already joined this game".to_string()));
    }

    game.started_at = Some(crate::repository::now_iso());
    game.in_progress = true;

    let side = if game.white_player_id.is_some() {
        game.black_player_id = Some(player.id);
        game.black_player_username = Some(player.username.clone());
        "black"
    } else {
        game.white_player_id = Some(player.id);
        game.white_player_username = Some(player.username.clone());
        "white"
    };

    let game_id = game.id;
    let (white_id, black_id) = (game.white_player_id, game.black_player_id);
    state.repositories.games.update(game)?;
    if let Some(id) = white_id {
        refresh_is_playing(&state, id);
    }
    if let Some(id) = black_id {
        refresh_is_playing(&state, id);
    }

    state.events.publish(events::GAME_JOIN_EVENT, Some(game_id), Some(player.id), serde_json::json!(side));

    Ok(HttpResponse::Ok().json(GenericResponse::<()> { success: true, data: None }))
}

/// Quit a joined game: deletes it outright if the opponent never joined,
/// otherwise forfeits to the opponent.
#[utoipa::path(
    post,
    path = "/v1/games/{id}/quit",
    tag = "games",
    params(("id" = i64, Path)),
    responses((status = 200, description = "Ok", body = GenericResponse<()>)),
    security(("bearer_token" = []))
)]
pub async fn quit_game(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let (player, game) = get_player_and_game(&state, &req, path.into_inner())?;

    if game.white_player_id != Some(player.id) && game.black_player_id != Some(player.id) {
        return Err(AppError::Forbidden("forbidden access to not joined game".to_string()));
    }

    if game.white_player_id.is_none() || game.black_player_id.is_none() {
        state.repositories.games.delete(game.id)?;
        state.repositories.game_moves.delete_by_game(game.id);
        return Ok(HttpResponse::Ok().json(GenericResponse::<()> { success: true, data: None }));
    }

    let (side, winner_id) = if game.white_player_id == Some(player.id) {
        ("white", game.black_player_id.unwrap())
    } else {
        ("black", game.white_player_id.unwrap())
    };

    let winner = state.repositories.players.find_by_id(winner_id)?;

    settle_game_end(&state, game.clone(), winner, player.clone(), false)?;

    state.events.publish(events::GAME_QUIT_EVENT, Some(game.id), Some(player.id), serde_json::json!(side));

    Ok(HttpResponse::Ok().json(GenericResponse::<()> { success: true, data: None }))
}

/// Play a move (or advance the draw-offer protocol), enforcing turn
/// order, replaying history through the rule engine, and settling the
/// game when the move wins or completes a draw.
#[utoipa::path(
    post,
    path = "/v1/games/{id}/move",
    tag = "games",
    params(("id" = i64, Path)),
    request_body = GameMakeMove,
    responses((status = 200, description = "Ok", body = GenericResponse<String>)),
    security(("bearer_token" = []))
)]
pub async fn make_move(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<GameMakeMove>,
) -> AppResult<HttpResponse> {
    let (mut player, mut game) = get_player_and_game(&state, &req, path.into_inner())?;

    if game.white_player_id != Some(player.id) && game.black_player_id != Some(player.id) {
        return Err(AppError::Forbidden("forbidden access to not joined game".to_string()));
    }
    if !game.in_progress {
        return Err(AppError::BusinessRule("cannot make a move to not started game".to_string()));
    }

    let existing_moves = state.repositories.game_moves.find_by_game(game.id);
    let moves_count = existing_moves.len();
    let last_move = existing_moves.last();

    match last_move {
        Some(last) if last.player_id == player.id => {
            return Err(AppError::BusinessRule("its the other players turn".to_string()));
        }
        None if Some(player.id) != game.white_player_id => {
            return Err(AppError::BusinessRule("the white player is first on turn".to_string()));
        }
        _ => {}
    }

    let move_strings: Vec<String> = existing_moves.iter().map(|m| m.mv.clone()).collect();

    let is_draw = if last_move.filter(|m| m.mv == notation::DRAW_OFFER_MOVE).is_some() {
        if body.mv == notation::DRAW_OFFER_MOVE {
            true
        } else if body.mv != notation::DRAW_REJECT_MOVE {
            return Err(AppError::BusinessRule(format!(
                "you must respond to opponents draw request by either accepting ({}) or declining ({}) request",
                notation::DRAW_OFFER_MOVE,
                notation::DRAW_REJECT_MOVE
            )));
        } else {
            false
        }
    } else if body.mv == notation::DRAW_OFFER_MOVE {
        let timeout_turns = state.config.rules.draw_request_timeout_turns;
        if (moves_count as i64) < timeout_turns {
            return Err(AppError::BusinessRule(format!(
                "it must pass at least {} turns before draw can be requested",
                timeout_turns
            )));
        }
        let mut turns_left = timeout_turns;
        let mut i = moves_count as i64 - 1;
        while i > moves_count as i64 - timeout_turns {
            if existing_moves[i as usize].mv == notation::DRAW_OFFER_MOVE {
                return Err(AppError::BusinessRule(format!(
                    "it must pass {} more turn/s before draw can be requested again",
                    turns_left
                )));
            }
            turns_left -= 1;
            i -= 1;
        }
        false
    } else if body.mv == notation::DRAW_REJECT_MOVE {
        return Err(AppError::BusinessRule("there is no draw offer from opponent to reject".to_string()));
    } else {
        false
    };

    let mut chess_game = ChessGame::replay(&move_strings)
        .map_err(|e| AppError::Internal(format!("failed to rebuild game state: {}", e)))?;

    let is_white_mover = game.white_player_id == Some(player.id);
    let played = chess_game.make_move(&body.mv).map_err(|e| {
        let color = if is_white_mover { "white" } else { "black" };
        AppError::BusinessRule(format!("invalid move \"{}\" for {} player. reason: {}", body.mv, color, e))
    })?;

    let is_win = chess_game.is_checkmate();

    let game_id = game.id;
    state.repositories.game_moves.create(game_id, player.id, &played);

    game.tiles = chess_game.to_tiles();
    let now = crate::repository::now_iso();
    game.last_move_played_at = Some(now.clone());
    player.last_played_at = Some(now);

    if is_win || is_draw {
        let other_player_id =
            if is_white_mover { game.black_player_id.unwrap() } else { game.white_player_id.unwrap() };
        let other_player = state.repositories.players.find_by_id(other_player_id)?;
        settle_game_end(&state, game, player.clone(), other_player, is_draw)?;
    } else {
        state.repositories.players.update(player.clone())?;
        state.repositories.games.update(game)?;
    }

    state.events.publish(events::GAME_MOVE_EVENT, Some(game_id), Some(player.id), serde_json::json!(played));
    let side_event = if is_white_mover { events::GAME_WHITE_PLAYER_MOVE_EVENT } else { events::GAME_BLACK_PLAYER_MOVE_EVENT };
    state.events.publish(side_event, Some(game_id), Some(player.id), serde_json::json!(played));

    Ok(HttpResponse::Ok().json(GenericResponse::ok(played)))
}

/// Query and list a game's recorded moves.
#[utoipa::path(
    get,
    path = "/v1/games/{id}/moves",
    tag = "games",
    params(("id" = i64, Path), ("page" = Option<i64>, Query), ("size" = Option<i64>, Query), ("sort" = Option<String>, Query), ("filter" = Option<String>, Query)),
    responses((status = 200, description = "Ok")),
    security(("bearer_token" = []))
)]
pub async fn list_game_moves(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    get_auth_player(&state, &req)?;

    let params: QueryParams = (&query.0).into();
    let (rows, total) = state.repositories.game_moves.query(&params);
    let items: Vec<_> = rows.iter().map(to_game_move_dto).collect();

    Ok(HttpResponse::Ok().json(ListResponse { result_count: items.len(), items, total_count: total }))
}

/// Closes out a finished game: updates both players' win/loss/draw
/// tallies, Elo and rate, marks the game ended (with a winner unless it's
/// a draw), and publishes `GameEndEvent`. Shared between `make_move`,
/// `quit_game`, and the inactivity scheduler.
pub fn settle_game_end(
    state: &AppState,
    mut game: GameRow,
    mut winner: PlayerRow,
    mut loser: PlayerRow,
    is_draw: bool,
) -> AppResult<()> {
    let winner_elo = winner.elo;
    let loser_elo = loser.elo;

    if !is_draw {
        winner.wins += 1;
        winner.rate = winner.wins as f64 / (winner.losses + winner.wins) as f64;
        winner.elo = rating::calculate_elo(winner_elo, loser_elo, Outcome::Win);
    } else {
        winner.draws += 1;
        winner.elo = rating::calculate_elo(winner_elo, loser_elo, Outcome::Draw);
    }
    state.repositories.players.update(winner.clone())?;

    if !is_draw {
        loser.losses += 1;
        loser.rate = loser.wins as f64 / (loser.losses + loser.wins) as f64;
        loser.elo = rating::calculate_elo(loser_elo, winner_elo, Outcome::Loss);
    } else {
        loser.draws += 1;
        loser.elo = rating::calculate_elo(loser_elo, winner_elo, Outcome::Draw);
    }
    state.repositories.players.update(loser.clone())?;

    if !is_draw {
        game.winner_id = Some(winner.id);
    }
    game.ended_at = Some(crate::repository::now_iso());
    game.in_progress = false;
    let game_id = game.id;
    state.repositories.games.update(game)?;
    refresh_is_playing(state, winner.id);
    refresh_is_playing(state, loser.id);

    let status = if is_draw { "draw" } else { "win" };
    state.events.publish(events::GAME_END_EVENT, Some(game_id), Some(winner.id), serde_json::json!(status));

    Ok(())
}
