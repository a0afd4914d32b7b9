use app_config::{AuthSecret, MAX_TOKEN_EXPIRY_HOURS};
use app_error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String,      // Subject (user ID)
    pub iat: i64,         // Issued at
    pub exp: i64,         // Expiration time
    pub username: String, // Username for convenience
}

/// The single failure signal for token verification. Bad signature,
/// malformed input and expiry are deliberately indistinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid or expired token")]
pub struct InvalidToken;

impl From<InvalidToken> for AppError {
    fn from(_: InvalidToken) -> Self {
        AppError::token_invalid()
    }
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    validity: Duration,
}

impl JwtService {
    /// `expiry_hours` is clamped to `1..=MAX_TOKEN_EXPIRY_HOURS`.
    pub fn new(secret: &AuthSecret, expiry_hours: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the caller's clock in `verify_token_at`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            validity: Duration::hours(expiry_hours.clamp(1, MAX_TOKEN_EXPIRY_HOURS) as i64),
        }
    }

    pub fn issue_token(&self, user_id: &str, username: &str) -> AppResult<String> {
        self.issue_token_at(user_id, username, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_token_at(
        &self,
        user_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let expires_at = now.checked_add_signed(self.validity).ok_or_else(|| {
            error!("Token expiry overflows the calendar for issue time {}", now);
            AppError::CryptoError("Token expiry is out of range".to_string())
        })?;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            username: username.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to sign token: {}", e);
            AppError::CryptoError(format!("Failed to sign token: {}", e))
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, InvalidToken> {
        self.verify_token_at(token, Utc::now())
    }

    /// Verify signature and structure, then reject the token if `now` is past
    /// its expiry. A token is still accepted at exactly `exp`.
    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, InvalidToken> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                debug!("Token rejected: {}", e);
                InvalidToken
            })?;

        if now.timestamp() > token_data.claims.exp {
            debug!("Token rejected: expired at {}", token_data.claims.exp);
            return Err(InvalidToken);
        }

        debug!("Token validated for user: {}", token_data.claims.username);
        Ok(token_data.claims)
    }
}
