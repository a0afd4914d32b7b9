use app_error::{AppError, AppResult};
use std::fmt;

mod config_loader;
pub use config_loader::*;

/// Process-wide token signing key. Loaded once at start-up and handed to the
/// token service; never printed.
#[derive(Clone)]
pub struct AuthSecret(Vec<u8>);

impl AuthSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> AppResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Auth secret cannot be empty"
            )));
        }
        Ok(Self(secret))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AuthSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthSecret(<{} bytes redacted>)", self.0.len())
    }
}

impl TryFrom<&AppConfig> for AuthSecret {
    type Error = AppError;

    fn try_from(config: &AppConfig) -> AppResult<Self> {
        Self::new(config.security.jwt.secret.as_bytes())
    }
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub address: String,
}

impl Server {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl From<&AppConfig> for Server {
    fn from(config: &AppConfig) -> Self {
        Self {
            port: config.server.port,
            address: config.server.host.clone(),
        }
    }
}
