//! Player account endpoints: list, find-one, register, update, delete.
//! Grounded on `pkg/server/handler/player.go`.

use crate::auth::{get_access_token, get_auth_player, hash_password, to_player_dto};
use crate::error::{AppError, AppResult};
use crate::handlers::ListQuery;
use crate::model::{GenericResponse, ListResponse, PlayerRequest};
use crate::repository::QueryParams;
use crate::state::AppState;
use actix_web::{HttpRequest, HttpResponse, web};

/// Query and list players with the shared pagination/filter DSL.
#[utoipa::path(
    get,
    path = "/v1/players",
    tag = "players",
    params(("page" = Option<i64>, Query), ("size" = Option<i64>, Query), ("sort" = Option<String>, Query), ("filter" = Option<String>, Query)),
    responses((status = 200, description = "Ok")),
    security(("bearer_token" = []))
)]
pub async fn list_players(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    get_auth_player(&state, &req)?;

    let params: QueryParams = (&query.0).into();
    let (rows, total) = state.repositories.players.query(&params);
    let items: Vec<_> = rows.iter().map(|r| to_player_dto(&state, r)).collect();

    Ok(HttpResponse::Ok().json(ListResponse { result_count: items.len(), items, total_count: total }))
}

/// Find a single player by id.
#[utoipa::path(
    get,
    path = "/v1/players/{id}",
    tag = "players",
    params(("id" = i64, Path)),
    responses((status = 200, description = "Ok")),
    security(("bearer_token" = []))
)]
pub async fn find_one_player(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    get_auth_player(&state, &req)?;
    let player = state.repositories.players.find_by_id(path.into_inner())?;
    Ok(HttpResponse::Ok().json(to_player_dto(&state, &player)))
}

/// Register a new player account.
#[utoipa::path(
    post,
    path = "/v1/players/register",
    tag = "players",
    request_body = PlayerRequest,
    responses((status = 200, description = "Ok"))
)]
pub async fn register_player(state: web::Data<AppState>, body: web::Json<PlayerRequest>) -> AppResult<HttpResponse> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(AppError::InvalidInput("username is required".to_string()));
    }
    let password_hash = hash_password(&body.password)?;
    let player = state.repositories.players.create(username, &password_hash)?;
    Ok(HttpResponse::Ok().json(to_player_dto(&state, &player)))
}

/// Update the authenticated player's username and/or password.
#[utoipa::path(
    put,
    path = "/v1/players/update",
    tag = "players",
    request_body = PlayerRequest,
    responses((status = 200, description = "Ok", body = GenericResponse<()>)),
    security(("bearer_token" = []))
)]
pub async fn update_player(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<PlayerRequest>,
) -> AppResult<HttpResponse> {
    let mut player = get_auth_player(&state, &req)?;

    let username = body.username.trim();
    if !username.is_empty() {
        player.username = username.to_string();
    }
    if !body.password.is_empty() {
        player.password_hash = hash_password(&body.password)?;
    }

    let player_id = player.id;
    state.repositories.players.update(player)?;

    if !username.is_empty() {
        state.repositories.games.update_player_username(player_id, username);
    }

    Ok(HttpResponse::Ok().json(GenericResponse::<()> { success: true, data: None }))
}

/// Delete the authenticated player's account.
#[utoipa::path(
    delete,
    path = "/v1/players/delete",
    tag = "players",
    responses((status = 200, description = "Ok", body = GenericResponse<()>)),
    security(("bearer_token" = []))
)]
pub async fn delete_player(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let at = get_access_token(&state, &req)?;
    state.repositories.players.delete(at.player_id)?;
    state.repositories.access_tokens.delete_by_player(at.player_id);
    Ok(HttpResponse::Ok().json(GenericResponse::<()> { success: true, data: None }))
}
