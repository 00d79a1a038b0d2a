//! Session handlers: the HTTP surface for players and games. Grounded on
//! the reference server's `pkg/server/handler/{player,game}.go`.

pub mod game;
pub mod player;

use crate::repository::QueryParams;
use serde::Deserialize;

/// Query-string shape shared by every paginated list endpoint
/// (`page`, `size`, `sort`, `filter` — spec §6).
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub filter: String,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    20
}

impl From<&ListQuery> for QueryParams {
    fn from(q: &ListQuery) -> Self {
        QueryParams {
            filter: q.filter.clone(),
            page: if q.page < 1 { 1 } else { q.page },
            size: if q.size < 1 { 20 } else { q.size },
            sort: q.sort.clone(),
        }
    }
}
