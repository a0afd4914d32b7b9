use app_config::Argon2Config;
use app_error::{AppError, AppResult};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Hash a password using Argon2id with the library default cost.
pub fn hash_password(password: &str) -> AppResult<String> {
    hash_with(&Argon2::default(), password)
}

/// Verify a password against a stored PHC hash string.
///
/// The salt and cost are read from `password_hash` itself. Fails closed: a
/// malformed hash yields `false`.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    verify_with(&Argon2::default(), password, password_hash)
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    debug!("Hashing password");
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            AppError::CryptoError(format!("Failed to hash password: {}", e))
        })?
        .to_string();

    Ok(password_hash)
}

fn verify_with(argon2: &Argon2<'_>, password: &str, password_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(password_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Rejecting malformed password hash: {}", e);
            return false;
        }
    };

    let is_valid = argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();

    debug!("Password verification result: {}", is_valid);
    is_valid
}

/// Argon2id hasher with configured cost and a cap on how many hash
/// operations run at once. Async calls run on the blocking pool.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    permits: Arc<Semaphore>,
}

impl PasswordService {
    pub fn new(config: &Argon2Config, max_concurrent: usize) -> AppResult<Self> {
        let params = Params::new(config.memory, config.iterations, config.parallelism, None)
            .map_err(|e| AppError::CryptoError(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        })
    }

    pub fn hash_blocking(&self, password: &str) -> AppResult<String> {
        hash_with(&self.argon2, password)
    }

    pub fn verify_blocking(&self, password: &str, password_hash: &str) -> bool {
        verify_with(&self.argon2, password, password_hash)
    }

    pub async fn hash(&self, password: String) -> AppResult<String> {
        let permit = Arc::clone(&self.permits).acquire_owned().await.map_err(|e| {
            AppError::ServerError(anyhow::anyhow!("Hashing pool closed: {}", e))
        })?;

        // The permit travels with the blocking task, so it is held until
        // Argon2 finishes even if the caller stops waiting
        let argon2 = self.argon2.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            hash_with(&argon2, &password)
        })
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            AppError::ServerError(anyhow::anyhow!("Password hashing task failed: {}", e))
        })?
    }

    pub async fn verify(&self, password: String, password_hash: String) -> bool {
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            error!("Hashing pool closed during verification");
            return false;
        };

        let argon2 = self.argon2.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            verify_with(&argon2, &password, &password_hash)
        });

        match task.await {
            Ok(is_valid) => is_valid,
            Err(e) => {
                error!("Password verification task failed: {}", e);
                false
            }
        }
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}
