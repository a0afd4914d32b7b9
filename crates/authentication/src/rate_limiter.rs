use app_config::RateLimitSettings;
use app_error::{AppError, AppResult};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// Structure to track login attempts
#[derive(Debug)]
struct LoginAttempt {
    attempts: usize,
    first_attempt: Instant,
    last_attempt: Instant,
}

/// Failed-login tracker keyed by login identifier. Once `max_attempts`
/// failures land inside `window_duration`, the identifier is locked out for
/// `lockout_duration` after the last failure.
#[derive(Debug)]
pub struct LoginRateLimiter {
    attempts: RwLock<HashMap<String, LoginAttempt>>,
    max_attempts: usize,
    window_duration: Duration,
    lockout_duration: Duration,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: usize, window_duration: Duration, lockout_duration: Duration) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            max_attempts,
            window_duration,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_secs(settings.window_duration),
            Duration::from_secs(settings.block_duration),
        )
    }

    /// Check if an identifier may attempt a login right now
    pub async fn check_rate_limit(&self, identifier: &str) -> AppResult<()> {
        let mut attempts = self.attempts.write().await;
        let now = Instant::now();

        self.cleanup(&mut attempts, now);

        if let Some(attempt) = attempts.get(identifier) {
            if attempt.attempts >= self.max_attempts {
                let elapsed_since_last = now.duration_since(attempt.last_attempt);

                if elapsed_since_last < self.lockout_duration {
                    let remaining = self.lockout_duration - elapsed_since_last;
                    warn!("Login locked out for identifier {}", identifier);
                    return Err(AppError::account_locked(remaining.as_secs().max(1)));
                }

                attempts.remove(identifier);
            }
        }

        Ok(())
    }

    pub async fn record_failed_attempt(&self, identifier: &str) {
        let mut attempts = self.attempts.write().await;
        let now = Instant::now();

        let attempt = attempts
            .entry(identifier.to_string())
            .or_insert(LoginAttempt {
                attempts: 0,
                first_attempt: now,
                last_attempt: now,
            });
        attempt.attempts += 1;
        attempt.last_attempt = now;
    }

    pub async fn record_successful_attempt(&self, identifier: &str) {
        self.attempts.write().await.remove(identifier);
    }

    // Keep entries still inside their window, or still serving a lockout
    fn cleanup(&self, attempts: &mut HashMap<String, LoginAttempt>, now: Instant) {
        attempts.retain(|_, attempt| {
            now.duration_since(attempt.first_attempt) < self.window_duration
                || (attempt.attempts >= self.max_attempts
                    && now.duration_since(attempt.last_attempt) < self.lockout_duration)
        });
    }
}
