pub mod jwt;
pub mod password;
pub mod rate_limiter;
pub mod service;
pub mod store;
pub mod validation;

// Re-export key items for convenience
pub use jwt::{Claims, InvalidToken, JwtService};
pub use password::{PasswordService, hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use service::{AuthService, AuthServiceTrait};
pub use store::{InMemoryUserStore, UserStore};
