use app_error::{AppError, AppResult};
use app_models::User;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Persistence seam for user records. Implementations must enforce
/// uniqueness of username and email on insert.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> AppResult<User>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;
}

/// Process-local store, used by the service binary and tests.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;

        // Checked under the write lock so concurrent registrations cannot race
        if users.values().any(|u| u.username == user.username) {
            return Err(AppError::resource_exists("User", "username"));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::resource_exists("User", "email"));
        }

        debug!("Storing user {}", user.id);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        Ok(self.users.read().await.get(&id).cloned())
    }
}
