pub mod user;

pub use user::{AuthResponse, LoginInput, RegisterInput, User, UserProfile};
