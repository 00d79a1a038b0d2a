//! Wire DTOs returned by and accepted from the HTTP API. Field names match
//! the JSON shapes the session handlers produce; see DESIGN.md for their
//! grounding in the reference server's `pkg/model` package.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub fn iso_or_empty(ts: &Option<String>) -> String {
    ts.clone().unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Player {
    pub id: i64,
    pub username: String,
    pub wins: i64,
    pub losses: i64,
    pub draws: i64,
    pub rate: f64,
    pub elo: i64,
    #[serde(rename = "isPlaying")]
    pub is_playing: bool,
    #[serde(rename = "lastPlayedAt")]
    pub last_played_at: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlayerRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Game {
    pub id: i64,
    pub name: String,
    #[serde(rename = "turnDurationSeconds")]
    pub turn_duration_seconds: i64,
    pub public: bool,
    #[serde(rename = "whitePlayerId")]
    pub white_player_id: i64,
    #[serde(rename = "blackPlayerId")]
    pub black_player_id: i64,
    #[serde(rename = "winnerId")]
    pub winner_id: i64,
    #[serde(rename = "creatorId")]
    pub creator_id: i64,
    #[serde(rename = "inProgress")]
    pub in_progress: bool,
    pub tiles: String,
    #[serde(rename = "lastMovePlayedAt")]
    pub last_move_played_at: String,
    #[serde(rename = "startedAt")]
    pub started_at: String,
    #[serde(rename = "endedAt")]
    pub ended_at: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GameCreate {
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "turnDurationSeconds", default)]
    pub turn_duration_seconds: Option<i64>,
    #[serde(rename = "isWhite", default)]
    pub is_white: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GameJoin {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GameMakeMove {
    #[serde(rename = "move")]
    pub mv: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameMove {
    pub id: i64,
    #[serde(rename = "gameId")]
    pub game_id: i64,
    #[serde(rename = "playerId")]
    pub player_id: i64,
    #[serde(rename = "move")]
    pub mv: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventData {
    #[serde(rename = "gameId", skip_serializing_if = "Option::is_none")]
    pub game_id: Option<i64>,
    #[serde(rename = "playerId", skip_serializing_if = "Option::is_none")]
    pub player_id: Option<i64>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenericResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> GenericResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data) }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
    #[serde(rename = "resultCount")]
    pub result_count: usize,
    #[serde(rename = "totalCount")]
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Status {
    pub name: String,
    pub version: String,
    pub status: String,
    #[serde(rename = "swaggerURL")]
    pub swagger_url: String,
}

