//! Service configuration: loaded from a TOML file, then overridden
//! field-by-field from environment variables named by the dotted path,
//! upper-cased and `_`-joined (e.g. `RULES_MAX_CREATED_GAMES`).

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub app_name: String,
    pub version: String,
    pub author: String,
    pub description: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            app_name: "chessd".to_string(),
            version: "0.1.0".to_string(),
            author: String::new(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub hostname: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { hostname: "localhost".to_string(), host: "0.0.0.0".to_string(), port: 8080, debug: false }
    }
}

/// Carried for shape-fidelity with a real deployment's connection settings.
/// No connection is ever opened from it: persistence is abstracted behind
/// the repository traits and backed in-memory, see `repository::memory`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub schema: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub default_turn_duration_seconds: i64,
    pub draw_request_timeout_turns: i64,
    pub max_created_games: i64,
    pub max_joined_games: i64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            default_turn_duration_seconds: 0,
            draw_request_timeout_turns: 3,
            max_created_games: 5,
            max_joined_games: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rules: RulesConfig,
}

pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

impl Config {
    pub fn load(path: &str) -> Config {
        let mut config = if Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    log::warn!("Failed to parse config file {}: {}, using defaults", path, e);
                    Config::default()
                }),
                Err(e) => {
                    log::warn!("Failed to read config file {}: {}, using defaults", path, e);
                    Config::default()
                }
            }
        } else {
            log::info!("Config file {} not found, using defaults", path);
            Config::default()
        };

        config.override_with_env();
        config
    }

    fn override_with_env(&mut self) {
        env_string("GENERAL_APP_NAME", &mut self.general.app_name);
        env_string("GENERAL_VERSION", &mut self.general.version);
        env_string("GENERAL_AUTHOR", &mut self.general.author);
        env_string("GENERAL_DESCRIPTION", &mut self.general.description);

        env_string("SERVER_HOSTNAME", &mut self.server.hostname);
        env_string("SERVER_HOST", &mut self.server.host);
        env_u16("SERVER_PORT", &mut self.server.port);
        env_bool("SERVER_DEBUG", &mut self.server.debug);

        env_string("DATABASE_HOST", &mut self.database.host);
        env_u16("DATABASE_PORT", &mut self.database.port);
        env_string("DATABASE_NAME", &mut self.database.name);
        env_string("DATABASE_SCHEMA", &mut self.database.schema);
        env_string("DATABASE_USERNAME", &mut self.database.username);
        env_string("DATABASE_PASSWORD", &mut self.database.password);

        env_i64("RULES_DEFAULT_TURN_DURATION_SECONDS", &mut self.rules.default_turn_duration_seconds);
        env_i64("RULES_DRAW_REQUEST_TIMEOUT_TURNS", &mut self.rules.draw_request_timeout_turns);
        env_i64("RULES_MAX_CREATED_GAMES", &mut self.rules.max_created_games);
        env_i64("RULES_MAX_JOINED_GAMES", &mut self.rules.max_joined_games);
    }
}

fn env_string(name: &str, target: &mut String) {
    if let Ok(val) = std::env::var(name) {
        *target = val;
    }
}

fn env_bool(name: &str, target: &mut bool) {
    if let Ok(val) = std::env::var(name) {
        *target = val.eq_ignore_ascii_case("true");
    }
}

fn env_u16(name: &str, target: &mut u16) {
    if let Ok(val) = std::env::var(name)
        && let Ok(parsed) = val.parse()
    {
        *target = parsed;
    }
}

fn env_i64(name: &str, target: &mut i64) {
    if let Ok(val) = std::env::var(name)
        && let Ok(parsed) = val.parse()
    {
        *target = parsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_file_present() {
        let config = Config::load("/nonexistent/path/config.toml");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rules.max_created_games, 5);
    }

    #[test]
    fn env_override_wins_over_default() {
        // SAFETY: test-only, single-threaded mutation of the process
        // environment scoped to this test.
        unsafe {
            std::env::set_var("RULES_MAX_CREATED_GAMES", "9");
        }
        let config = Config::load("/nonexistent/path/config.toml");
        assert_eq!(config.rules.max_created_games, 9);
        unsafe {
            std::env::remove_var("RULES_MAX_CREATED_GAMES");
        }
    }
}
