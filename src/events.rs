//! Event hub: in-process publish/subscribe fan-out, transported to clients
//! over Server-Sent Events. Grounded on the reference server's
//! `handler/events.go`, restructured from a process-wide channel map into
//! a constructed `EventHub` held in application state.

use crate::error::{AppError, AppResult};
use crate::model::{Event, EventData};
use crate::state::AppState;
use actix_web::HttpResponse;
use actix_web::web::Bytes;
use actix_web::web;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

pub const GAME_ANY_EVENT: &str = "GameAnyEvent";
pub const GAME_MOVE_EVENT: &str = "GameMoveEvent";
pub const GAME_JOIN_EVENT: &str = "GameJoinEvent";
pub const GAME_QUIT_EVENT: &str = "GameQuitEvent";
pub const GAME_START_EVENT: &str = "GameStartEvent";
pub const GAME_END_EVENT: &str = "GameEndEvent";
pub const GAME_WHITE_PLAYER_MOVE_EVENT: &str = "GameWhitePlayerMoveEvent";
pub const GAME_BLACK_PLAYER_MOVE_EVENT: &str = "GameBlackPlayerMoveEvent";
pub const PLAYER_MESSAGE: &str = "PlayerMessage";

pub const ALL_EVENT_TYPES: &[&str] = &[
    GAME_ANY_EVENT,
    GAME_MOVE_EVENT,
    GAME_JOIN_EVENT,
    GAME_QUIT_EVENT,
    GAME_START_EVENT,
    GAME_END_EVENT,
    GAME_WHITE_PLAYER_MOVE_EVENT,
    GAME_BLACK_PLAYER_MOVE_EVENT,
    PLAYER_MESSAGE,
];

pub fn is_valid_event_type(event_type: &str) -> bool {
    ALL_EVENT_TYPES.contains(&event_type)
}

/// A subscriber's filter criteria, fixed for the lifetime of its
/// subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub event_type: String,
    pub game_id: Option<i64>,
    pub player_id: i64,
}

impl Subscription {
    fn should_receive(&self, event: &Event) -> bool {
        if event.event_type != self.event_type
            && !(self.event_type == GAME_ANY_EVENT && event.event_type.starts_with("Game"))
        {
            return false;
        }
        if let Some(gid) = self.game_id
            && Some(gid) != event.data.game_id
        {
            return false;
        }
        if self.event_type == PLAYER_MESSAGE && Some(self.player_id) != event.data.player_id {
            return false;
        }
        true
    }
}

struct Subscriber {
    criteria: Subscription,
    sender: mpsc::Sender<Event>,
}

/// Central fan-out point. Publishing snapshots the subscriber list under
/// the lock, releases it, then sends to each matching subscriber — so a
/// slow or disconnected subscriber's channel never blocks the publisher
/// while holding the registry lock.
#[derive(Default)]
pub struct EventHub {
    subscribers: Mutex<HashMap<Uuid, Subscriber>>,
}

impl EventHub {
    pub fn subscribe(&self, criteria: Subscription) -> (Uuid, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(32);
        let id = Uuid::new_v4();
        self.subscribers.lock().unwrap().insert(id, Subscriber { criteria, sender: tx });
        (id, rx)
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.subscribers.lock().unwrap().remove(&id);
    }

    pub fn publish(&self, event_type: &str, game_id: Option<i64>, player_id: Option<i64>, payload: serde_json::Value) {
        let event = Event {
            event_type: event_type.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            data: EventData { game_id, player_id, payload },
        };

        let snapshot: Vec<mpsc::Sender<Event>> = {
            let subs = self.subscribers.lock().unwrap();
            subs.values()
                .filter(|s| s.criteria.should_receive(&event))
                .map(|s| s.sender.clone())
                .collect()
        };

        for sender in snapshot {
            let _ = sender.try_send(event.clone());
        }
    }
}

fn sse_frame(event: &Event) -> Bytes {
    let body = serde_json::to_string(event).unwrap_or_default();
    Bytes::from(format!("event: message\ndata: {}\n\n", body))
}

/// Removes a subscriber entry once its stream is dropped (client disconnect
/// or request cancellation), so a long-running server doesn't accumulate
/// dead channels.
struct SubscriptionGuard {
    state: web::Data<AppState>,
    id: Uuid,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.state.events.unsubscribe(self.id);
    }
}

/// Builds the streaming HTTP response body for a subscription: one SSE
/// `message` frame per matching event, for as long as the client stays
/// connected. Holds `guard` for the stream's lifetime so the subscriber is
/// deregistered the moment the stream is dropped.
fn stream_response(rx: mpsc::Receiver<Event>, guard: SubscriptionGuard) -> HttpResponse {
    let stream = ReceiverStream::new(rx).map(move |event| {
        let _ = &guard;
        Ok::<_, actix_web::Error>(sse_frame(&event))
    });
    HttpResponse::Ok().content_type("text/event-stream").streaming(stream)
}

#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub token: String,
    pub event: String,
    #[serde(rename = "gameId")]
    pub game_id: Option<i64>,
}

/// Opens a long-lived SSE stream for one subscriber. The access token is
/// carried as a query parameter rather than a header since `EventSource`
/// clients cannot set arbitrary request headers.
#[utoipa::path(
    get,
    path = "/v1/events/subscribe",
    tag = "events",
    params(
        ("token" = String, Query),
        ("event" = String, Query),
        ("gameId" = Option<i64>, Query),
    ),
    responses((status = 200, description = "Ok"))
)]
pub async fn subscribe(state: web::Data<AppState>, query: web::Query<SubscribeQuery>) -> AppResult<HttpResponse> {
    let at = state
        .repositories
        .access_tokens
        .find_by_token(&query.token)
        .ok_or_else(|| AppError::Unauthorized("invalid access token".to_string()))?;
    let player = state.repositories.players.find_by_id(at.player_id)?;

    if query.event.is_empty() {
        return Err(AppError::InvalidInput("event type is required".to_string()));
    }
    if !is_valid_event_type(&query.event) {
        return Err(AppError::InvalidInput(format!("invalid event type: {}", query.event)));
    }

    let game_id = if query.event.starts_with("Game") {
        let gid = query.game_id.filter(|g| *g != 0).ok_or_else(|| {
            AppError::InvalidInput(format!("invalid required gameId: {:?}", query.game_id))
        })?;
        let game = state
            .repositories
            .games
            .find_by_id(gid)
            .map_err(|e| AppError::InvalidInput(e.reason().to_string()))?;
        if game.password_hash.is_some()
            && game.white_player_id != Some(player.id)
            && game.black_player_id != Some(player.id)
        {
            return Err(AppError::Forbidden(
                "the game is private and player has not joined this game".to_string(),
            ));
        }
        Some(gid)
    } else {
        None
    };

    let (id, rx) = state.events.subscribe(Subscription { event_type: query.event.clone(), game_id, player_id: player.id });
    let guard = SubscriptionGuard { state: state.clone(), id };

    Ok(stream_response(rx, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str, game_id: Option<i64>, player_id: Option<i64>) -> Event {
        Event {
            event_type: event_type.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            data: EventData { game_id, player_id, payload: serde_json::Value::Null },
        }
    }

    #[test]
    fn game_any_matches_any_game_prefixed_type() {
        let sub = Subscription { event_type: GAME_ANY_EVENT.to_string(), game_id: None, player_id: 1 };
        assert!(sub.should_receive(&event(GAME_MOVE_EVENT, Some(5), None)));
        assert!(!sub.should_receive(&event(PLAYER_MESSAGE, None, Some(1))));
    }

    #[test]
    fn game_id_filter_excludes_other_games() {
        let sub = Subscription { event_type: GAME_MOVE_EVENT.to_string(), game_id: Some(5), player_id: 1 };
        assert!(sub.should_receive(&event(GAME_MOVE_EVENT, Some(5), None)));
        assert!(!sub.should_receive(&event(GAME_MOVE_EVENT, Some(6), None)));
    }

    #[test]
    fn player_message_filtered_to_recipient() {
        let sub = Subscription { event_type: PLAYER_MESSAGE.to_string(), game_id: None, player_id: 42 };
        assert!(sub.should_receive(&event(PLAYER_MESSAGE, None, Some(42))));
        assert!(!sub.should_receive(&event(PLAYER_MESSAGE, None, Some(7))));
    }

    #[test]
    fn white_and_black_move_events_are_distinct() {
        assert_ne!(GAME_WHITE_PLAYER_MOVE_EVENT, GAME_BLACK_PLAYER_MOVE_EVENT);
    }

    #[tokio::test]
    async fn publish_reaches_matching_subscriber_only() {
        let hub = EventHub::default();
        let (_id, mut rx) = hub.subscribe(Subscription {
            event_type: GAME_MOVE_EVENT.to_string(),
            game_id: Some(1),
            player_id: 1,
        });
        hub.publish(GAME_MOVE_EVENT, Some(2), None, serde_json::Value::Null);
        hub.publish(GAME_MOVE_EVENT, Some(1), None, serde_json::json!({"move": "Pe2e4"}));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.data.game_id, Some(1));
    }
}
