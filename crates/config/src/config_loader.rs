use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path, str::FromStr};
use tracing::{debug, info, warn};

use app_error::{AppError, AppErrorExt, AppResult};

/// Development-only signing secret. Running with it is a misconfiguration
/// that `AppConfig::load` reports, and `validate` rejects in production.
pub const DEFAULT_AUTH_SECRET: &str = "recipefindr-dev-insecure-auth-secret-change-me";

/// One year.
pub const MAX_TOKEN_EXPIRY_HOURS: u64 = 24 * 365;

/// Complete application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SecurityConfig {
    pub jwt: JwtConfig,
    pub cors: CorsConfig,
    pub rate_limiting: RateLimitingConfig,
    pub password: PasswordConfig,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_hours: u64,
    pub algorithm: String,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiry_hours", &self.expiry_hours)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitingConfig {
    pub login: RateLimitSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitSettings {
    pub max_attempts: usize,
    pub window_duration: u64,
    pub block_duration: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
    pub require_special: bool,
    pub argon2: Argon2Config,
    pub max_concurrent_hashes: usize,
}

/// Argon2id cost parameters. `memory` is in KiB.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Argon2Config {
    pub memory: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    pub sentry: SentryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SentryConfig {
    pub dsn: String,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let content = fs::read_to_string(path).config_err()?;
        let config: AppConfig = serde_json::from_str(&content).config_err()?;
        debug!("Configuration loaded from file");
        Ok(config)
    }

    /// Build the configuration from process environment (and `.env`, if any).
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup, falling back to
    /// defaults for missing keys.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(environment) = lookup("APP_ENV") {
            config.environment = environment;
        }
        if let Some(host) = lookup("HOST") {
            config.server.host = host;
        }
        config.server.port = parse_var(&lookup, "PORT", config.server.port)?;
        config.server.body_limit = parse_var(&lookup, "BODY_LIMIT_BYTES", config.server.body_limit)?;
        config.server.request_timeout_secs = parse_var(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            config.server.request_timeout_secs,
        )?;

        let security = &mut config.security;
        if let Some(secret) = lookup("AUTH_SECRET") {
            security.jwt.secret = secret;
        }
        security.jwt.expiry_hours =
            parse_var(&lookup, "AUTH_TOKEN_EXPIRY_HOURS", security.jwt.expiry_hours)?;

        if let Some(origins) = lookup("CORS_ALLOWED_ORIGINS") {
            security.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }

        let login = &mut security.rate_limiting.login;
        login.max_attempts = parse_var(&lookup, "LOGIN_MAX_ATTEMPTS", login.max_attempts)?;
        login.window_duration = parse_var(&lookup, "LOGIN_WINDOW_SECS", login.window_duration)?;
        login.block_duration = parse_var(&lookup, "LOGIN_LOCKOUT_SECS", login.block_duration)?;

        let password = &mut security.password;
        password.min_length = parse_var(&lookup, "PASSWORD_MIN_LENGTH", password.min_length)?;
        password.argon2.memory = parse_var(&lookup, "ARGON2_MEMORY_KIB", password.argon2.memory)?;
        password.argon2.iterations =
            parse_var(&lookup, "ARGON2_ITERATIONS", password.argon2.iterations)?;
        password.argon2.parallelism =
            parse_var(&lookup, "ARGON2_PARALLELISM", password.argon2.parallelism)?;
        password.max_concurrent_hashes = parse_var(
            &lookup,
            "MAX_CONCURRENT_HASHES",
            password.max_concurrent_hashes,
        )?;

        if let Some(dsn) = lookup("SENTRY_DSN") {
            config.monitoring.sentry.dsn = dsn;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.monitoring.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.monitoring.logging.format = format;
        }

        Ok(config)
    }

    /// Load from the environment, validate, and report insecure defaults.
    pub fn load() -> AppResult<Self> {
        Self::from_env()?.validated()
    }

    /// Validate, then report insecure defaults. Split from `load` so the
    /// binary can install its log subscriber before the warning is emitted.
    pub fn validated(self) -> AppResult<Self> {
        self.validate()?;

        info!("Loaded configuration for environment: {}", self.environment);
        if self.uses_default_secret() {
            warn!(
                "AUTH_SECRET is not set; using the insecure development default. \
                 Set AUTH_SECRET before deploying."
            );
        }

        Ok(self)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn uses_default_secret(&self) -> bool {
        self.security.jwt.secret == DEFAULT_AUTH_SECRET
    }

    /// Validate the configuration, collecting every problem found
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = Vec::new();
        let is_production = self.is_production();

        if self.server.host.trim().is_empty() {
            errors.push("Server host cannot be empty".to_string());
        }

        if self.server.port == 0 {
            errors.push("Server port cannot be 0".to_string());
        }

        let jwt = &self.security.jwt;
        if jwt.secret.is_empty() {
            errors.push("AUTH_SECRET cannot be empty".to_string());
        }

        if is_production && (self.uses_default_secret() || jwt.secret.len() < 32) {
            errors.push("AUTH_SECRET is not secure for production use".to_string());
        }

        if jwt.expiry_hours == 0 || jwt.expiry_hours > MAX_TOKEN_EXPIRY_HOURS {
            errors.push(format!(
                "Token expiry must be between 1 and {} hours",
                MAX_TOKEN_EXPIRY_HOURS
            ));
        }

        if jwt.algorithm != "HS256" {
            errors.push(format!("Unsupported token algorithm '{}'", jwt.algorithm));
        }

        let password = &self.security.password;
        if password.argon2.iterations == 0 {
            errors.push("Argon2 iterations must be greater than 0".to_string());
        }

        if password.argon2.parallelism == 0 {
            errors.push("Argon2 parallelism must be greater than 0".to_string());
        } else if password.argon2.memory < 8 * password.argon2.parallelism {
            errors.push("Argon2 memory must be at least 8 KiB per lane".to_string());
        }

        if password.max_concurrent_hashes == 0 {
            errors.push("MAX_CONCURRENT_HASHES must be greater than 0".to_string());
        }

        if self.security.rate_limiting.login.max_attempts == 0 {
            errors.push("LOGIN_MAX_ATTEMPTS must be greater than 0".to_string());
        }

        let format = self.monitoring.logging.format.as_str();
        if format != "pretty" && format != "json" {
            errors.push(format!("Unknown log format '{}'", format));
        }

        if !errors.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Invalid configuration: {}",
                errors.join(", ")
            )));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", key, e))
        }),
        None => Ok(default),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5002,
                body_limit: 10 * 1024 * 1024,
                request_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt: JwtConfig {
                    secret: DEFAULT_AUTH_SECRET.to_string(),
                    expiry_hours: 24,
                    algorithm: "HS256".to_string(),
                },
                cors: CorsConfig {
                    allowed_origins: vec!["*".to_string()],
                    allowed_methods: vec![
                        "GET".to_string(),
                        "POST".to_string(),
                        "OPTIONS".to_string(),
                    ],
                    allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
                },
                rate_limiting: RateLimitingConfig {
                    login: RateLimitSettings {
                        max_attempts: 5,
                        window_duration: 300,
                        block_duration: 900,
                    },
                },
                password: PasswordConfig {
                    min_length: 8,
                    require_uppercase: true,
                    require_lowercase: true,
                    require_number: true,
                    require_special: false,
                    argon2: Argon2Config {
                        memory: 19456,
                        iterations: 2,
                        parallelism: 1,
                    },
                    max_concurrent_hashes: 4,
                },
            },
            monitoring: MonitoringConfig {
                sentry: SentryConfig {
                    dsn: "".to_string(),
                    sample_rate: 1.0,
                    traces_sample_rate: 0.2,
                },
                logging: LoggingConfig {
                    level: "info".to_string(),
                    format: "pretty".to_string(),
                },
            },
        }
    }
}
