pub mod api_middleware;
pub mod auth_guard;

pub use auth_guard::{
    AuthUser, AuthVerdict, GuardOutcome, authorize, extract_bearer_token, protect, require_auth,
};
