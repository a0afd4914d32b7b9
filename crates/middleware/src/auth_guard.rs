use app_authentication::{Claims, JwtService};
use app_error::INVALID_TOKEN_MESSAGE;
use axum::{
    Json, Router,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively. A missing header, a non-ASCII
/// value, another scheme or an empty token all yield `None`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthVerdict {
    NoToken,
    Invalid,
    Valid(Claims),
}

impl AuthVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_outcome(self) -> GuardOutcome {
        match self {
            Self::Valid(claims) => GuardOutcome::allowed(claims),
            Self::NoToken | Self::Invalid => GuardOutcome::denied(),
        }
    }
}

/// Decide whether a request carries a valid bearer token. Pure: no state is
/// touched and the same headers always produce the same verdict until expiry.
pub fn authorize(headers: &HeaderMap, jwt: &JwtService) -> AuthVerdict {
    let Some(token) = extract_bearer_token(headers) else {
        return AuthVerdict::NoToken;
    };

    match jwt.verify_token(token) {
        Ok(claims) => AuthVerdict::Valid(claims),
        Err(_) => AuthVerdict::Invalid,
    }
}

/// Wire shape of a guard decision:
/// `{"ok":true,"claims":{..}}` or `{"ok":false,"status":401,"message":".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GuardOutcome {
    pub fn allowed(claims: Claims) -> Self {
        Self {
            ok: true,
            claims: Some(claims),
            status: None,
            message: None,
        }
    }

    // Missing and invalid tokens are reported identically
    pub fn denied() -> Self {
        Self {
            ok: false,
            claims: None,
            status: Some(StatusCode::UNAUTHORIZED.as_u16()),
            message: Some(INVALID_TOKEN_MESSAGE.to_string()),
        }
    }
}

impl IntoResponse for GuardOutcome {
    fn into_response(self) -> Response {
        if self.ok {
            return (StatusCode::OK, Json(self)).into_response();
        }

        let mut response = (StatusCode::UNAUTHORIZED, Json(self)).into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}

/// Guard middleware. Valid requests get their `Claims` attached as a request
/// extension; everything else is answered with 401 before the handler runs.
pub async fn require_auth(
    State(jwt): State<Arc<JwtService>>,
    mut req: Request,
    next: Next,
) -> Response {
    match authorize(req.headers(), &jwt) {
        AuthVerdict::Valid(claims) => {
            debug!(user_id = %claims.sub, "Request authenticated");
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        verdict => {
            warn!(
                method = %req.method(),
                path = %req.uri().path(),
                token_present = !matches!(verdict, AuthVerdict::NoToken),
                "Rejected unauthenticated request"
            );
            verdict.into_outcome().into_response()
        }
    }
}

/// Put every route currently on `router` behind `require_auth`.
pub fn protect<S>(router: Router<S>, jwt: Arc<JwtService>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(jwt, require_auth))
}

/// The authenticated caller, as established by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.0.sub
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| GuardOutcome::denied().into_response())
    }
}
