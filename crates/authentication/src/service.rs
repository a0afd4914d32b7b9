use app_config::{AppConfig, AuthSecret, PasswordConfig};
use app_error::{AppError, AppResult};
use app_models::{AuthResponse, LoginInput, RegisterInput, User, UserProfile};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    JwtService, password::PasswordService, rate_limiter::LoginRateLimiter, store::UserStore,
    validation,
};

/// Trait defining the authentication service interface
#[async_trait]
pub trait AuthServiceTrait: Send + Sync {
    /// Register a new user and issue their first token
    async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse>;

    /// Login by username or email
    async fn login(&self, input: LoginInput) -> AppResult<AuthResponse>;

    /// Get a user by their ID
    async fn get_user_by_id(&self, user_id: &str) -> AppResult<UserProfile>;

    /// Get the JWT service
    fn jwt_service(&self) -> Arc<JwtService>;
}

pub struct AuthService {
    jwt_service: Arc<JwtService>,
    passwords: PasswordService,
    users: Arc<dyn UserStore>,
    password_policy: PasswordConfig,
    rate_limiter: Option<Arc<LoginRateLimiter>>,
    // Verified against when the user is unknown, so both failure paths cost the same
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        jwt_service: Arc<JwtService>,
        passwords: PasswordService,
        users: Arc<dyn UserStore>,
        password_policy: PasswordConfig,
    ) -> AppResult<Self> {
        let dummy_hash = passwords.hash_blocking("recipefindr-timing-equaliser")?;

        Ok(Self {
            jwt_service,
            passwords,
            users,
            password_policy,
            rate_limiter: None,
            dummy_hash,
        })
    }

    /// Wire up every collaborator from configuration.
    pub fn from_config(config: &AppConfig, users: Arc<dyn UserStore>) -> AppResult<Self> {
        let secret = AuthSecret::try_from(config)?;
        let jwt_service = Arc::new(JwtService::new(&secret, config.security.jwt.expiry_hours));

        let password_config = &config.security.password;
        let passwords = PasswordService::new(
            &password_config.argon2,
            password_config.max_concurrent_hashes,
        )?;

        let rate_limiter = LoginRateLimiter::from_settings(&config.security.rate_limiting.login);

        Ok(Self::new(jwt_service, passwords, users, password_config.clone())?
            .with_rate_limiter(Arc::new(rate_limiter)))
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<LoginRateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        if let Some(user) = self.users.find_by_username(identifier).await? {
            return Ok(Some(user));
        }
        self.users
            .find_by_email(&identifier.to_lowercase())
            .await
    }

    async fn record_failure(&self, limit_key: &str) {
        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.record_failed_attempt(limit_key).await;
        }
    }

    fn create_auth_response(&self, user: User) -> AppResult<AuthResponse> {
        let token = self
            .jwt_service
            .issue_token(&user.id.to_string(), &user.username)?;

        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }
}

/// Failed-login counters are kept per account, so every spelling that reaches
/// the same user (username, any casing of the email) shares one budget.
/// Unknown identifiers fall back to the case-folded email or the username.
fn rate_limit_key(identifier: &str, user: Option<&User>) -> String {
    match user {
        Some(user) => format!("user:{}", user.id),
        None if identifier.contains('@') => format!("login:{}", identifier.to_lowercase()),
        None => format!("login:{}", identifier),
    }
}

#[async_trait]
impl AuthServiceTrait for AuthService {
    fn jwt_service(&self) -> Arc<JwtService> {
        Arc::clone(&self.jwt_service)
    }

    async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse> {
        let username = validation::sanitize_string(&input.username);
        let email = validation::sanitize_string(&input.email).to_lowercase();
        // Passwords are not trimmed, spaces may be meaningful
        let password = input.password;

        validation::validate_username(&username)?;
        validation::validate_email(&email)?;
        validation::validate_password(&password, &self.password_policy)?;

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AppError::resource_exists("User", "username"));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::resource_exists("User", "email"));
        }

        let password_hash = self.passwords.hash(password).await?;
        let stored = self
            .users
            .insert(User::new(username, email, password_hash))
            .await?;

        info!(user_id = %stored.id, "Registered user {}", stored.username);
        self.create_auth_response(stored)
    }

    async fn login(&self, input: LoginInput) -> AppResult<AuthResponse> {
        let identifier = validation::validate_login(input.identifier(), &input.password)?;

        // Lookup is cheap; the limit is checked before any password work
        let user = self.find_by_identifier(&identifier).await?;
        let limit_key = rate_limit_key(&identifier, user.as_ref());

        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.check_rate_limit(&limit_key).await?;
        }

        let is_valid = match &user {
            Some(user) => {
                self.passwords
                    .verify(input.password, user.password_hash.clone())
                    .await
            }
            None => {
                // Same cost as a real check; the result is ignored
                self.passwords
                    .verify(input.password, self.dummy_hash.clone())
                    .await;
                false
            }
        };

        let Some(user) = user.filter(|_| is_valid) else {
            self.record_failure(&limit_key).await;
            warn!("Failed login attempt for identifier {}", identifier);
            return Err(AppError::invalid_credentials());
        };

        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.record_successful_attempt(&limit_key).await;
        }

        info!(user_id = %user.id, "User {} logged in", user.username);
        self.create_auth_response(user)
    }

    async fn get_user_by_id(&self, user_id: &str) -> AppResult<UserProfile> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::resource_not_found("User", user_id))
    }
}
