//! Route table and OpenAPI documentation for the chess server's REST API.
//! Grounded on the reference server's `pkg/server/server.go` (routes) and
//! its `swag`-generated docs (schema inventory).

use crate::state::AppState;
use crate::{auth, events, handlers, model};
use actix_web::{HttpResponse, web};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::auth_player,
        auth::logout,
        handlers::player::list_players,
        handlers::player::find_one_player,
        handlers::player::register_player,
        handlers::player::update_player,
        handlers::player::delete_player,
        handlers::game::list_games,
        handlers::game::find_one_game,
        handlers::game::create_game,
        handlers::game::join_game,
        handlers::game::quit_game,
        handlers::game::make_move,
        handlers::game::list_game_moves,
        events::subscribe,
    ),
    components(schemas(
        model::Player,
        model::PlayerRequest,
        model::AccessTokenResponse,
        model::Game,
        model::GameCreate,
        model::GameJoin,
        model::GameMakeMove,
        model::GameMove,
        model::Event,
        model::EventData,
        model::Status,
    )),
    tags(
        (name = "auth", description = "Login, session, and logout"),
        (name = "players", description = "Player accounts and ratings"),
        (name = "games", description = "Game sessions: create, join, play, quit"),
        (name = "events", description = "Server-sent event subscriptions"),
    )
)]
pub struct ApiDoc;

/// Service status reported at the API root, mirroring the reference
/// server's unauthenticated `/` health check.
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(model::Status {
        name: state.config.general.app_name.clone(),
        version: state.config.general.version.clone(),
        status: "running".to_string(),
        swagger_url: "/swagger-ui/".to_string(),
    })
}

/// Wires every `/v1/...` route onto the given `ServiceConfig`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .service(
                web::scope("/auth")
                    .route("/login", web::post().to(auth::login))
                    .route("/player", web::get().to(auth::auth_player))
                    .route("/logout", web::post().to(auth::logout)),
            )
            .service(
                web::scope("/players")
                    .route("", web::get().to(handlers::player::list_players))
                    .route("/register", web::post().to(handlers::player::register_player))
                    .route("/update", web::put().to(handlers::player::update_player))
                    .route("/delete", web::delete().to(handlers::player::delete_player))
                    .route("/{id}", web::get().to(handlers::player::find_one_player)),
            )
            .service(
                web::scope("/games")
                    .route("", web::get().to(handlers::game::list_games))
                    .route("/create", web::post().to(handlers::game::create_game))
                    .route("/{id}", web::get().to(handlers::game::find_one_game))
                    .route("/{id}/join", web::post().to(handlers::game::join_game))
                    .route("/{id}/quit", web::post().to(handlers::game::quit_game))
                    .route("/{id}/move", web::post().to(handlers::game::make_move))
                    .route("/{id}/moves", web::get().to(handlers::game::list_game_moves)),
            )
            .service(web::scope("/events").route("/subscribe", web::get().to(events::subscribe))),
    );
}
