//! Session extractors.
//!
//! The session token lives in an HTTP-only cookie; an `Authorization: Bearer`
//! header is accepted as well.

use std::future::{Ready, ready};

use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use url::form_urlencoded;

use blogicum_core::Viewer;
use blogicum_core::ports::{AuthError, TokenClaims};

use crate::config::AppConfig;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_PATH: &str = "/auth/login/";

/// Authenticated user identity extractor.
///
/// Handlers that need a logged-in user take this; anonymous requests are
/// redirected to the login page with a `next` parameter.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i32,
    pub username: String,
}

impl Identity {
    pub fn viewer(&self) -> Viewer {
        Viewer::User(self.user_id)
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// Authentication failure, answered with a redirect to the login page.
#[derive(Debug)]
pub struct AuthenticationError {
    pub reason: AuthError,
    /// Where to return after logging in.
    pub next: String,
}

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SEE_OTHER
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::SeeOther()
            .insert_header((header::LOCATION, login_url(Some(&self.next))))
            .finish()
    }
}

/// `/auth/login/`, optionally with a form-encoded `next`.
pub fn login_url(next: Option<&str>) -> String {
    match next {
        Some(next) if !next.is_empty() => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("next", next)
                .finish();
            format!("{}?{}", LOGIN_PATH, query)
        }
        _ => LOGIN_PATH.to_string(),
    }
}

fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn authenticate(req: &HttpRequest) -> Result<Identity, AuthError> {
    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        tracing::error!("AppState not found in app data");
        AuthError::InvalidToken("Server configuration error".to_string())
    })?;

    let token = session_token(req).ok_or(AuthError::MissingAuth)?;
    state.tokens.validate_token(&token).map(Identity::from)
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(|reason| {
            tracing::debug!(%reason, path = req.path(), "Login required");
            AuthenticationError {
                reason,
                next: req.path().to_string(),
            }
        }))
    }
}

/// Optional identity extractor - never fails; bad or missing sessions are
/// anonymous.
#[derive(Debug, Clone, Default)]
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn viewer(&self) -> Viewer {
        self.0.as_ref().map(Identity::viewer).unwrap_or_default()
    }

    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|identity| identity.username.as_str())
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(authenticate(req).ok())))
    }
}

pub fn session_cookie(config: &AppConfig, token: String, lifetime_secs: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(time::Duration::seconds(lifetime_secs))
        .finish()
}

pub fn cleared_session_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(time::Duration::ZERO)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url(None), "/auth/login/");
        assert_eq!(login_url(Some("")), "/auth/login/");
        assert_eq!(
            login_url(Some("/posts/3/edit/")),
            "/auth/login/?next=%2Fposts%2F3%2Fedit%2F"
        );
        assert_eq!(
            login_url(Some("/profile/a b/")),
            "/auth/login/?next=%2Fprofile%2Fa+b%2F"
        );
    }

    #[test]
    fn test_login_url_next_survives_query_decoding() {
        let next = "/posts/1/?a=b&c=d e";
        let url = login_url(Some(next));
        let query = url.strip_prefix("/auth/login/?").unwrap();

        let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(pairs, vec![("next".to_string(), next.to_string())]);
    }

    #[test]
    fn test_optional_identity_defaults_to_anonymous() {
        assert_eq!(OptionalIdentity::default().viewer(), Viewer::Anonymous);

        let identity = OptionalIdentity(Some(Identity {
            user_id: 7,
            username: "alice".to_string(),
        }));
        assert_eq!(identity.viewer(), Viewer::User(7));
        assert_eq!(identity.username(), Some("alice"));
    }
}
