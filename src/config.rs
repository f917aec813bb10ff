//! Application configuration.
//!
//! Every value is resolved with priority: config.toml > environment (a `.env`
//! file is loaded first) > built-in default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::auth::password::PasswordScheme;

/// Optional configuration file, read from the working directory
pub const CONFIG_FILE: &str = "config.toml";

// ==================== Server Configuration ====================

/// Address to bind to
pub const DEFAULT_ADDR: &str = "0.0.0.0";

/// Server port
pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_DATABASE_PATH: &str = "data/jobboard.db";

// ==================== Auth Configuration ====================

/// Used when no JWT secret is configured. Never deploy with this.
pub const DEV_JWT_SECRET: &str = "jobboard-dev-secret-change-me";

/// Token (and session) lifetime: 24 hours
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Consecutive failed logins before the account is locked
pub const MAX_FAILED_LOGINS: i64 = 5;

/// How long a lockout lasts
pub const LOCKOUT_MINUTES: i64 = 15;

// ==================== Rate Limit Configuration ====================

/// Requests per client per window on the auth endpoints
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 20;

pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Whether a valid token signature is enough, or the session row must also be live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Stateless,
    #[default]
    Session,
}

impl AuthMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stateless" => Some(Self::Stateless),
            "session" => Some(Self::Session),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stateless => "stateless",
            Self::Session => "session",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub mode: AuthMode,
    pub password_scheme: PasswordScheme,
    pub max_failed_logins: i64,
    pub lockout: chrono::Duration,
}

impl AuthSettings {
    /// Defaults for everything except the secret
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: chrono::Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            mode: AuthMode::default(),
            password_scheme: PasswordScheme::default(),
            max_failed_logins: MAX_FAILED_LOGINS,
            lockout: chrono::Duration::minutes(LOCKOUT_MINUTES),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    /// 0 disables limiting
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
    /// Allowed CORS origins, empty allows any
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load `.env`, then config.toml if present, and resolve every value
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        let file = read_config_file(Path::new(CONFIG_FILE));
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let server = file.server.unwrap_or_default();
        let database = file.database.unwrap_or_default();
        let auth = file.auth.unwrap_or_default();
        let rate_limit = file.rate_limit.unwrap_or_default();

        let addr = server
            .addr
            .or_else(|| env("JOBBOARD_ADDR"))
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let port = server
            .port
            .or_else(|| parse_env(&env, "PORT"))
            .unwrap_or(DEFAULT_PORT);

        let database_path = match database.path {
            Some(path) => {
                tracing::info!("Using database from config.toml: {}", path);
                PathBuf::from(path)
            }
            None => match env("DATABASE_PATH") {
                Some(path) => {
                    tracing::info!("Using database from DATABASE_PATH env: {}", path);
                    PathBuf::from(path)
                }
                None => PathBuf::from(DEFAULT_DATABASE_PATH),
            },
        };

        let jwt_secret = auth
            .jwt_secret
            .or_else(|| env("JWT_SECRET"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("JWT_SECRET is not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            });

        let token_ttl_secs = auth
            .token_ttl_secs
            .or_else(|| parse_env(&env, "TOKEN_TTL_SECS"))
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        let mode = auth
            .mode
            .or_else(|| env("AUTH_MODE").and_then(|v| parse_named(&v, "AUTH_MODE", AuthMode::from_str)))
            .unwrap_or_default();

        let password_scheme = auth
            .password_scheme
            .or_else(|| {
                env("PASSWORD_SCHEME")
                    .and_then(|v| parse_named(&v, "PASSWORD_SCHEME", PasswordScheme::from_str))
            })
            .unwrap_or_default();

        let rate_limit = RateLimitSettings {
            max_requests: rate_limit
                .max_requests
                .or_else(|| parse_env(&env, "RATE_LIMIT_MAX"))
                .unwrap_or(DEFAULT_RATE_LIMIT_MAX),
            window_secs: rate_limit
                .window_secs
                .or_else(|| parse_env(&env, "RATE_LIMIT_WINDOW_SECS"))
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        };

        let cors_origins = server
            .cors_origins
            .or_else(|| {
                env("CORS_ORIGINS").map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
            })
            .unwrap_or_default();

        Self {
            addr,
            port,
            database_path,
            auth: AuthSettings {
                jwt_secret,
                token_ttl: chrono::Duration::seconds(token_ttl_secs.max(0)),
                mode,
                password_scheme,
                max_failed_logins: auth.max_failed_logins.unwrap_or(MAX_FAILED_LOGINS),
                lockout: chrono::Duration::minutes(auth.lockout_minutes.unwrap_or(LOCKOUT_MINUTES)),
            },
            rate_limit,
            cors_origins,
        }
    }
}

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server: Option<ServerSection>,
    database: Option<DatabaseSection>,
    auth: Option<AuthSection>,
    rate_limit: Option<RateLimitSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    port: Option<u16>,
    cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthSection {
    jwt_secret: Option<String>,
    token_ttl_secs: Option<i64>,
    mode: Option<AuthMode>,
    password_scheme: Option<PasswordScheme>,
    max_failed_logins: Option<i64>,
    lockout_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RateLimitSection {
    max_requests: Option<u32>,
    window_secs: Option<u64>,
}

/// A missing file is normal; an unparsable one is logged and ignored
fn read_config_file(path: &Path) -> FileConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return FileConfig::default();
    };
    match toml::from_str(&contents) {
        Ok(config) => {
            tracing::info!("Loaded {}", path.display());
            config
        }
        Err(e) => {
            tracing::warn!("Ignoring unparsable {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}

fn parse_env<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={}", key, raw);
            None
        }
    }
}

fn parse_named<T>(raw: &str, key: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!("Ignoring invalid {}={}", key, raw);
    }
    parsed
}
