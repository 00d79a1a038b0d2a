//! The repository abstraction: every persisted entity (`Player`, `Game`,
//! `GameMove`, `AccessToken`) is reached only through a trait, never a
//! concrete database type. This crate ships one implementation
//! (`memory::InMemoryRepositories`) since the real storage backend is out
//! of scope; handlers and the scheduler are written against the traits so a
//! real database-backed implementation can be dropped in later.

pub mod filter;
pub mod memory;

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Page/sort parameters accepted by every `query` method, matching the
/// filter DSL's `page`, `size`, `sort` query parameters.
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub filter: String,
    pub page: i64,
    pub size: i64,
    pub sort: String,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self { filter: String::new(), page: 1, size: 20, sort: String::new() }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub wins: i64,
    pub losses: i64,
    pub draws: i64,
    pub rate: f64,
    pub elo: i64,
    pub last_played_at: Option<String>,
    pub is_playing: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct GameRow {
    pub id: i64,
    pub name: String,
    pub password_hash: Option<String>,
    pub turn_duration_seconds: Option<i64>,
    pub white_player_id: Option<i64>,
    pub white_player_username: Option<String>,
    pub black_player_id: Option<i64>,
    pub black_player_username: Option<String>,
    pub creator_id: i64,
    pub winner_id: Option<i64>,
    pub tiles: String,
    pub in_progress: bool,
    pub last_move_played_at: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct GameMoveRow {
    pub id: i64,
    pub game_id: i64,
    pub player_id: i64,
    pub mv: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct AccessTokenRow {
    pub id: i64,
    pub player_id: i64,
    pub token: String,
    pub created_at: String,
    pub updated_at: String,
}

pub trait PlayerRepository: Send + Sync {
    fn find_by_id(&self, id: i64) -> AppResult<PlayerRow>;
    fn find_by_username(&self, username: &str) -> Option<PlayerRow>;
    fn query(&self, params: &QueryParams) -> (Vec<PlayerRow>, usize);
    fn count(&self, filter: &str) -> usize;
    fn create(&self, username: &str, password_hash: &str) -> AppResult<PlayerRow>;
    fn update(&self, row: PlayerRow) -> AppResult<()>;
    fn delete(&self, id: i64) -> AppResult<()>;
    /// Refreshes the derived `isPlaying` flag in place, without touching
    /// `updated_at` — called whenever a game's `inProgress` state changes
    /// for one of its sides, so the filter DSL's `isPlaying` predicate sees
    /// the same value `GET /v1/players/{id}` would report (spec §3).
    fn set_is_playing(&self, id: i64, playing: bool);
}

pub trait GameRepository: Send + Sync {
    fn find_by_id(&self, id: i64) -> AppResult<GameRow>;
    fn query(&self, params: &QueryParams) -> (Vec<GameRow>, usize);
    fn count(&self, filter: &str) -> usize;
    fn create(&self, row: GameRow) -> AppResult<GameRow>;
    fn update(&self, row: GameRow) -> AppResult<()>;
    fn delete(&self, id: i64) -> AppResult<()>;
    fn update_player_username(&self, player_id: i64, username: &str);
    fn find_inactive_games(&self) -> Vec<GameRow>;
}

pub trait GameMoveRepository: Send + Sync {
    fn find_by_game(&self, game_id: i64) -> Vec<GameMoveRow>;
    fn query(&self, params: &QueryParams) -> (Vec<GameMoveRow>, usize);
    fn count(&self, filter: &str) -> usize;
    fn create(&self, game_id: i64, player_id: i64, mv: &str) -> GameMoveRow;
    /// Deletes every move belonging to `game_id`. A Game owns its GameMove
    /// rows (spec §3): whoever deletes a Game row must call this too.
    fn delete_by_game(&self, game_id: i64);
}

pub trait AccessTokenRepository: Send + Sync {
    fn find_by_token(&self, token: &str) -> Option<AccessTokenRow>;
    fn create(&self, player_id: i64, token: &str) -> AccessTokenRow;
    fn delete_by_token(&self, token: &str) -> AppResult<()>;
    /// Revokes every token belonging to `player_id`. A Player owns its
    /// AccessTokens (spec §3): deleting a player must call this too.
    fn delete_by_player(&self, player_id: i64);
}

pub(crate) fn not_found(entity: &str) -> AppError {
    AppError::NotFound(format!("{} does not exist", entity))
}
