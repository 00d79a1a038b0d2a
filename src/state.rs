//! Shared application state, handed to every handler via `web::Data`.

use crate::config::Config;
use crate::events::EventHub;
use crate::repository::memory::InMemoryRepositories;

pub struct AppState {
    pub repositories: InMemoryRepositories,
    pub events: EventHub,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self { repositories: InMemoryRepositories::default(), events: EventHub::default(), config }
    }
}
