use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `HOUSEHOLD_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("HOUSEHOLD_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            schedule: ScheduleConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  postgres:    host={}, db={}, configured={}",
            self.postgres.host,
            self.postgres.database,
            self.postgres.is_configured()
        );
        tracing::info!(
            "  schedule:    default_weeks={}, max_weeks={}, container_interval_weeks={}",
            self.schedule.default_weeks,
            self.schedule.max_weeks,
            self.schedule.container_interval_weeks
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "postgres": {
                "host": self.postgres.host,
                "port": self.postgres.port,
                "database": self.postgres.database,
                "configured": self.postgres.is_configured(),
            },
            "schedule": self.schedule,
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3001),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "household"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some()
    }
}

// ── Scheduling & house rules ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Horizon used when a schedule request omits `weeks`.
    pub default_weeks: u32,
    /// Upper bound accepted for `weeks`.
    pub max_weeks: u32,
    /// Gap between a recorded container turn and the next one.
    pub container_interval_weeks: u32,
    pub beers_per_crate: u32,
}

impl ScheduleConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            default_weeks: profiled_env_u32(p, "SCHEDULE_DEFAULT_WEEKS", 4),
            max_weeks: profiled_env_u32(p, "SCHEDULE_MAX_WEEKS", 52),
            container_interval_weeks: profiled_env_u32(p, "CONTAINER_INTERVAL_WEEKS", 2),
            beers_per_crate: profiled_env_u32(p, "BEERS_PER_CRATE", 24),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_weeks: 4,
            max_weeks: 52,
            container_interval_weeks: 2,
            beers_per_crate: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own profile prefix so parallel tests don't collide.

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("CFGTESTA_SCHEDULE_MAX_WEEKS", "12");
        let cfg = Config::for_profile("cfgtesta");
        assert_eq!(cfg.profile, "CFGTESTA");
        assert_eq!(cfg.schedule.max_weeks, 12);
        env::remove_var("CFGTESTA_SCHEDULE_MAX_WEEKS");
    }

    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        env::set_var("CFGTESTB_BEERS_PER_CRATE", "a dozen");
        let cfg = Config::for_profile("CFGTESTB");
        assert_eq!(cfg.schedule.beers_per_crate, 24);
        env::remove_var("CFGTESTB_BEERS_PER_CRATE");
    }

    #[test]
    fn postgres_connection_string() {
        let pg = PostgresConfig {
            host: "db".into(),
            port: 5433,
            database: "house".into(),
            username: Some("app".into()),
            password: Some("secret".into()),
            ssl_mode: "disable".into(),
            max_connections: 5,
        };
        assert!(pg.is_configured());
        assert_eq!(
            pg.connection_string(),
            "postgres://app:secret@db:5433/house?sslmode=disable"
        );
    }

    #[test]
    fn redacted_summary_has_no_password() {
        env::set_var("CFGTESTC_PG_PASSWORD", "hunter2");
        let cfg = Config::for_profile("CFGTESTC");
        let summary = cfg.redacted_summary().to_string();
        assert!(!summary.contains("hunter2"));
        assert_eq!(cfg.profile_label(), "CFGTESTC");
        env::remove_var("CFGTESTC_PG_PASSWORD");
    }
}
