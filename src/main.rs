//! # chessd — Multiplayer Chess Match Server
//!
//! A session-oriented chess server: players register, create or join
//! games, play moves validated by a FIDE-rules engine, and receive
//! live updates over Server-Sent Events. Match outcomes update each
//! player's Elo rating.
//!
//! ## Features
//!
//! - **Chess rule engine**: move legality, check, checkmate, and
//!   castling, independent of any particular session's persistence.
//! - **REST API**: create/join/quit/move/list endpoints under `/v1`,
//!   documented with OpenAPI/Swagger at `/swagger-ui/`.
//! - **Event stream**: subscribe to game and player events over SSE
//!   at `/v1/events/subscribe`.
//! - **Elo ratings**: updated automatically when a game ends.
//! - **Inactivity scheduler**: forfeits or deletes games nobody is
//!   acting on.
//!
//! ## Usage
//!
//! ```bash
//! # Start the API server (default: http://0.0.0.0:8080)
//! chessd serve
//!
//! # Start on a custom port, with a non-default config file
//! chessd serve --port 3000 --config ./chessd.toml
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod handlers;
pub mod model;
pub mod notation;
pub mod rating;
pub mod repository;
pub mod rules;
pub mod scheduler;
pub mod state;
pub mod types;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use clap::{Parser, Subcommand};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::ApiDoc;
use crate::config::Config;
use crate::state::AppState;

/// chessd — a multiplayer chess match server.
#[derive(Parser, Debug)]
#[command(name = "chessd")]
#[command(about = "Multiplayer chess match server: REST API, SSE events, Elo ratings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the REST API server with Swagger UI.
    Serve {
        /// Port to listen on (overrides the config file / server.port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host address to bind to (overrides the config file / server.host).
        #[arg(long)]
        host: Option<String>,

        /// Path to the TOML configuration file.
        #[arg(long, default_value = "./config.toml")]
        config: String,
    },
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host, config } => {
            let mut conf = Config::load(&config);
            if let Some(p) = port {
                conf.server.port = p;
            }
            if let Some(h) = host {
                conf.server.host = h;
            }
            run_server(conf).await
        }
    }
}

/// Starts the HTTP server: REST API routes, Swagger UI, and the
/// background inactivity scheduler.
async fn run_server(conf: Config) -> std::io::Result<()> {
    let host = conf.server.host.clone();
    let port = conf.server.port;
    let openapi = ApiDoc::openapi();

    let app_state = web::Data::new(AppState::new(conf));

    log::info!("Starting {} on {}:{}", app_state.config.general.app_name, host, port);
    log::info!("Swagger UI available at http://{}:{}/swagger-ui/", host, port);
    log::info!("Event stream available at http://{}:{}/v1/events/subscribe", host, port);

    tokio::spawn(scheduler::run(app_state.clone()));

    HttpServer::new(move || {
        let cors = Cors::default().allow_any_origin().allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(api::configure_routes)
            .route("/", web::get().to(api::status))
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
