//! In-memory repository implementation: one `Mutex<HashMap<id, Row>>` plus
//! an atomic id counter per entity. Stands in for a real database since
//! persistence itself is out of scope; the trait boundary in `super` is
//! what the rest of the crate depends on.

use super::{
    AccessTokenRepository, AccessTokenRow, GameMoveRepository, GameMoveRow, GameRepository,
    GameRow, PlayerRepository, PlayerRow, QueryParams, filter, not_found, now_iso,
};
use crate::error::AppResult;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

fn opt_i64_str(v: Option<i64>) -> Option<String> {
    v.map(|n| n.to_string())
}

pub struct InMemoryPlayerRepository {
    rows: Mutex<HashMap<i64, PlayerRow>>,
    next_id: AtomicI64,
}

impl Default for InMemoryPlayerRepository {
    fn default() -> Self {
        Self { rows: Mutex::new(HashMap::new()), next_id: AtomicI64::new(1) }
    }
}

fn player_field(row: &PlayerRow, field: &str) -> Option<String> {
    match field {
        "id" => Some(row.id.to_string()),
        "username" => Some(row.username.clone()),
        "wins" => Some(row.wins.to_string()),
        "losses" => Some(row.losses.to_string()),
        "draws" => Some(row.draws.to_string()),
        "rate" => Some(row.rate.to_string()),
        "elo" => Some(row.elo.to_string()),
        "isPlaying" => Some(row.is_playing.to_string()),
        "lastPlayedAt" => row.last_played_at.clone(),
        "createdAt" => Some(row.created_at.clone()),
        "updatedAt" => Some(row.updated_at.clone()),
        _ => None,
    }
}

impl PlayerRepository for InMemoryPlayerRepository {
    fn find_by_id(&self, id: i64) -> AppResult<PlayerRow> {
        self.rows.lock().unwrap().get(&id).cloned().ok_or_else(|| not_found("player"))
    }

    fn find_by_username(&self, username: &str) -> Option<PlayerRow> {
        self.rows.lock().unwrap().values().find(|r| r.username == username).cloned()
    }

    fn query(&self, params: &QueryParams) -> (Vec<PlayerRow>, usize) {
        let tokens = filter::parse(&params.filter);
        let mut matched: Vec<PlayerRow> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| filter::evaluate(&tokens, |f| player_field(row, f)))
            .cloned()
            .collect();
        let total = matched.len();
        let (field, desc) = filter::parse_sort(&params.sort, "-createdAt");
        filter::sort_by_key(&mut matched, desc, |row| player_field(row, &field));
        let page = matched
            .into_iter()
            .skip(((params.page.max(1) - 1) * params.size.max(1)) as usize)
            .take(params.size.max(1) as usize)
            .collect();
        (page, total)
    }

    fn count(&self, filter_str: &str) -> usize {
        let tokens = filter::parse(filter_str);
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| filter::evaluate(&tokens, |f| player_field(row, f)))
            .count()
    }

    fn create(&self, username: &str, password_hash: &str) -> AppResult<PlayerRow> {
        let mut rows = self.rows.lock().unwrap();
        if rows.values().any(|r| r.username == username) {
            return Err(crate::error::AppError::InvalidInput(format!(
                "player with username {} already exists",
                username
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = now_iso();
        let row = PlayerRow {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            wins: 0,
            losses: 0,
            draws: 0,
            rate: 0.0,
            elo: 1000,
            last_played_at: None,
            is_playing: false,
            created_at: now.clone(),
            updated_at: now,
        };
        rows.insert(id, row.clone());
        Ok(row)
    }

    fn update(&self, mut row: PlayerRow) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&row.id) {
            return Err(not_found("player"));
        }
        row.updated_at = now_iso();
        rows.insert(row.id, row);
        Ok(())
    }

    fn delete(&self, id: i64) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        rows.remove(&id).map(|_| ()).ok_or_else(|| not_found("player"))
    }

    fn set_is_playing(&self, id: i64, playing: bool) {
        if let Some(row) = self.rows.lock().unwrap().get_mut(&id) {
            row.is_playing = playing;
        }
    }
}

pub struct InMemoryGameRepository {
    rows: Mutex<HashMap<i64, GameRow>>,
    next_id: AtomicI64,
}

impl Default for InMemoryGameRepository {
    fn default() -> Self {
        Self { rows: Mutex::new(HashMap::new()), next_id: AtomicI64::new(1) }
    }
}

fn game_field(row: &GameRow, field: &str) -> Option<String> {
    match field {
        "id" => Some(row.id.to_string()),
        "name" => Some(row.name.clone()),
        "turnDurationSeconds" => opt_i64_str(row.turn_duration_seconds),
        "whitePlayerId" => opt_i64_str(row.white_player_id),
        "whitePlayerUsername" => row.white_player_username.clone(),
        "blackPlayerId" => opt_i64_str(row.black_player_id),
        "blackPlayerUsername" => row.black_player_username.clone(),
        "creatorId" => Some(row.creator_id.to_string()),
        "winnerId" => opt_i64_str(row.winner_id),
        "tiles" => Some(row.tiles.clone()),
        "inProgress" => Some(row.in_progress.to_string()),
        "lastMovePlayedAt" => row.last_move_played_at.clone(),
        "startedAt" => row.started_at.clone(),
        "endedAt" => row.ended_at.clone(),
        "createdAt" => Some(row.created_at.clone()),
        "updatedAt" => Some(row.updated_at.clone()),
        _ => None,
    }
}

impl GameRepository for InMemoryGameRepository {
    fn find_by_id(&self, id: i64) -> AppResult<GameRow> {
        self.rows.lock().unwrap().get(&id).cloned().ok_or_else(|| not_found("game"))
    }

    fn query(&self, params: &QueryParams) -> (Vec<GameRow>, usize) {
        let tokens = filter::parse(&params.filter);
        let mut matched: Vec<GameRow> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| filter::evaluate(&tokens, |f| game_field(row, f)))
            .cloned()
            .collect();
        let total = matched.len();
        let (field, desc) = filter::parse_sort(&params.sort, "-createdAt");
        filter::sort_by_key(&mut matched, desc, |row| game_field(row, &field));
        let page = matched
            .into_iter()
            .skip(((params.page.max(1) - 1) * params.size.max(1)) as usize)
            .take(params.size.max(1) as usize)
            .collect();
        (page, total)
    }

    fn count(&self, filter_str: &str) -> usize {
        let tokens = filter::parse(filter_str);
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| filter::evaluate(&tokens, |f| game_field(row, f)))
            .count()
    }

    fn create(&self, mut row: GameRow) -> AppResult<GameRow> {
        let mut rows = self.rows.lock().unwrap();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = now_iso();
        row.id = id;
        row.created_at = now.clone();
        row.updated_at = now;
        rows.insert(id, row.clone());
        Ok(row)
    }

    fn update(&self, mut row: GameRow) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&row.id) {
            return Err(not_found("game"));
        }
        row.updated_at = now_iso();
        rows.insert(row.id, row);
        Ok(())
    }

    fn delete(&self, id: i64) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        rows.remove(&id).map(|_| ()).ok_or_else(|| not_found("game"))
    }

    fn update_player_username(&self, player_id: i64, username: &str) {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.values_mut() {
            if row.white_player_id == Some(player_id) {
                row.white_player_username = Some(username.to_string());
            }
            if row.black_player_id == Some(player_id) {
                row.black_player_username = Some(username.to_string());
            }
        }
    }

    fn find_inactive_games(&self) -> Vec<GameRow> {
        let rows = self.rows.lock().unwrap();
        let now = chrono::Utc::now();
        rows.values()
            .filter(|row| {
                let Some(turn_duration) = row.turn_duration_seconds else { return false };
                if !row.in_progress {
                    return false;
                }
                let deadline_from = row
                    .last_move_played_at
                    .as_deref()
                    .or(row.started_at.as_deref())
                    .and_then(super::parse_iso);
                match deadline_from {
                    Some(from) => now >= from + chrono::Duration::seconds(turn_duration),
                    None => false,
                }
            })
            .cloned()
            .collect()
    }
}

pub struct InMemoryGameMoveRepository {
    rows: Mutex<HashMap<i64, GameMoveRow>>,
    next_id: AtomicI64,
}

impl Default for InMemoryGameMoveRepository {
    fn default() -> Self {
        Self { rows: Mutex::new(HashMap::new()), next_id: AtomicI64::new(1) }
    }
}

fn game_move_field(row: &GameMoveRow, field: &str) -> Option<String> {
    match field {
        "id" => Some(row.id.to_string()),
        "gameId" => Some(row.game_id.to_string()),
        "playerId" => Some(row.player_id.to_string()),
        "move" => Some(row.mv.clone()),
        "createdAt" => Some(row.created_at.clone()),
        _ => None,
    }
}

impl GameMoveRepository for InMemoryGameMoveRepository {
    fn find_by_game(&self, game_id: i64) -> Vec<GameMoveRow> {
        let mut moves: Vec<GameMoveRow> =
            self.rows.lock().unwrap().values().filter(|m| m.game_id == game_id).cloned().collect();
        moves.sort_by(|a, b| a.id.cmp(&b.id));
        moves
    }

    fn query(&self, params: &QueryParams) -> (Vec<GameMoveRow>, usize) {
        let tokens = filter::parse(&params.filter);
        let mut matched: Vec<GameMoveRow> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| filter::evaluate(&tokens, |f| game_move_field(row, f)))
            .cloned()
            .collect();
        let total = matched.len();
        let (field, desc) = filter::parse_sort(&params.sort, "-createdAt");
        filter::sort_by_key(&mut matched, desc, |row| game_move_field(row, &field));
        let page = matched
            .into_iter()
            .skip(((params.page.max(1) - 1) * params.size.max(1)) as usize)
            .take(params.size.max(1) as usize)
            .collect();
        (page, total)
    }

    fn count(&self, filter_str: &str) -> usize {
        let tokens = filter::parse(filter_str);
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| filter::evaluate(&tokens, |f| game_move_field(row, f)))
            .count()
    }

    fn create(&self, game_id: i64, player_id: i64, mv: &str) -> GameMoveRow {
        let mut rows = self.rows.lock().unwrap();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = GameMoveRow {
            id,
            game_id,
            player_id,
            mv: mv.to_string(),
            created_at: now_iso(),
        };
        rows.insert(id, row.clone());
        row
    }

    fn delete_by_game(&self, game_id: i64) {
        self.rows.lock().unwrap().retain(|_, row| row.game_id != game_id);
    }
}

pub struct InMemoryAccessTokenRepository {
    rows: Mutex<HashMap<i64, AccessTokenRow>>,
    next_id: AtomicI64,
}

impl Default for InMemoryAccessTokenRepository {
    fn default() -> Self {
        Self { rows: Mutex::new(HashMap::new()), next_id: AtomicI64::new(1) }
    }
}

impl AccessTokenRepository for InMemoryAccessTokenRepository {
    fn find_by_token(&self, token: &str) -> Option<AccessTokenRow> {
        self.rows.lock().unwrap().values().find(|r| r.token == token).cloned()
    }

    fn create(&self, player_id: i64, token: &str) -> AccessTokenRow {
        let mut rows = self.rows.lock().unwrap();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = now_iso();
        let row = AccessTokenRow {
            id,
            player_id,
            token: token.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        rows.insert(id, row.clone());
        row
    }

    fn delete_by_token(&self, token: &str) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.iter().find(|(_, r)| r.token == token).map(|(id, _)| *id);
        match id {
            Some(id) => {
                rows.remove(&id);
                Ok(())
            }
            None => Err(not_found("access token")),
        }
    }

    fn delete_by_player(&self, player_id: i64) {
        self.rows.lock().unwrap().retain(|_, row| row.player_id != player_id);
    }
}

/// Ties one instance of each entity's in-memory repository together for
/// injection into `web::Data` as a single shared object.
#[derive(Default)]
pub struct InMemoryRepositories {
    pub players: InMemoryPlayerRepository,
    pub games: InMemoryGameRepository,
    pub game_moves: InMemoryGameMoveRepository,
    pub access_tokens: InMemoryAccessTokenRepository,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_row(creator_id: i64) -> GameRow {
        GameRow {
            id: 0,
            name: "test game".to_string(),
            password_hash: None,
            turn_duration_seconds: None,
            white_player_id: None,
            white_player_username: None,
            black_player_id: None,
            black_player_username: None,
            creator_id,
            winner_id: None,
            tiles: crate::types::Board::starting_position().to_tiles(),
            in_progress: false,
            last_move_played_at: None,
            started_at: None,
            ended_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn player_create_assigns_incrementing_ids_and_defaults() {
        let repo = InMemoryPlayerRepository::default();
        let a = repo.create("alice", "hash-a").unwrap();
        let b = repo.create("bob", "hash-b").unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.elo, 1000);
        assert!(!a.is_playing);
    }

    #[test]
    fn player_create_rejects_duplicate_username() {
        let repo = InMemoryPlayerRepository::default();
        repo.create("alice", "hash-a").unwrap();
        assert!(repo.create("alice", "hash-b").is_err());
    }

    #[test]
    fn set_is_playing_updates_stored_flag_without_touching_unrelated_fields() {
        let repo = InMemoryPlayerRepository::default();
        let player = repo.create("alice", "hash").unwrap();
        assert!(!player.is_playing);

        repo.set_is_playing(player.id, true);
        let refreshed = repo.find_by_id(player.id).unwrap();
        assert!(refreshed.is_playing);
        assert_eq!(refreshed.username, "alice");

        repo.set_is_playing(player.id, false);
        assert!(!repo.find_by_id(player.id).unwrap().is_playing);
    }

    #[test]
    fn deleting_player_does_not_implicitly_touch_access_tokens() {
        let players = InMemoryPlayerRepository::default();
        let tokens = InMemoryAccessTokenRepository::default();
        let player = players.create("alice", "hash").unwrap();
        tokens.create(player.id, "token-1");
        tokens.create(player.id, "token-2");

        players.delete(player.id).unwrap();
        assert!(tokens.find_by_token("token-1").is_some());

        tokens.delete_by_player(player.id);
        assert!(tokens.find_by_token("token-1").is_none());
        assert!(tokens.find_by_token("token-2").is_none());
    }

    #[test]
    fn delete_by_player_only_removes_the_matching_player_tokens() {
        let tokens = InMemoryAccessTokenRepository::default();
        tokens.create(1, "alice-token");
        tokens.create(2, "bob-token");

        tokens.delete_by_player(1);

        assert!(tokens.find_by_token("alice-token").is_none());
        assert!(tokens.find_by_token("bob-token").is_some());
    }

    #[test]
    fn delete_by_game_removes_only_that_games_moves() {
        let moves = InMemoryGameMoveRepository::default();
        moves.create(1, 10, "e4");
        moves.create(1, 11, "e5");
        moves.create(2, 12, "d4");

        moves.delete_by_game(1);

        assert!(moves.find_by_game(1).is_empty());
        assert_eq!(moves.find_by_game(2).len(), 1);
    }

    #[test]
    fn game_delete_then_cascade_deletes_its_moves() {
        let games = InMemoryGameRepository::default();
        let moves = InMemoryGameMoveRepository::default();
        let game = games.create(game_row(1)).unwrap();
        moves.create(game.id, 1, "e4");
        moves.create(game.id, 2, "e5");

        games.delete(game.id).unwrap();
        moves.delete_by_game(game.id);

        assert!(games.find_by_id(game.id).is_err());
        assert!(moves.find_by_game(game.id).is_empty());
    }

    #[test]
    fn game_query_paginates_results() {
        let games = InMemoryGameRepository::default();
        for i in 0..5 {
            let mut row = game_row(1);
            row.name = format!("game-{i}");
            games.create(row).unwrap();
        }

        let params = QueryParams { filter: String::new(), page: 1, size: 2, sort: String::new() };
        let (page, total) = games.query(&params);
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);

        let params_page_3 = QueryParams { filter: String::new(), page: 3, size: 2, sort: String::new() };
        let (last_page, _) = games.query(&params_page_3);
        assert_eq!(last_page.len(), 1);
    }

    #[test]
    fn game_query_sorts_by_name_ascending() {
        let games = InMemoryGameRepository::default();
        for name in ["charlie", "alpha", "bravo"] {
            let mut row = game_row(1);
            row.name = name.to_string();
            games.create(row).unwrap();
        }

        let params = QueryParams { filter: String::new(), page: 1, size: 10, sort: "name".to_string() };
        let (page, _) = games.query(&params);
        let names: Vec<_> = page.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn game_count_honors_filter_predicate() {
        let games = InMemoryGameRepository::default();
        let mut a = game_row(1);
        a.in_progress = true;
        games.create(a).unwrap();
        games.create(game_row(1)).unwrap();

        assert_eq!(games.count("inProgress=true"), 1);
        assert_eq!(games.count(""), 2);
    }

    #[test]
    fn update_player_username_denormalizes_into_both_sides_of_a_game() {
        let games = InMemoryGameRepository::default();
        let mut row = game_row(1);
        row.white_player_id = Some(1);
        row.white_player_username = Some("alice".to_string());
        row.black_player_id = Some(2);
        row.black_player_username = Some("bob".to_string());
        let game = games.create(row).unwrap();

        games.update_player_username(1, "alice2");
        let updated = games.find_by_id(game.id).unwrap();
        assert_eq!(updated.white_player_username, Some("alice2".to_string()));
        assert_eq!(updated.black_player_username, Some("bob".to_string()));
    }
}
