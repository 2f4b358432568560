//! Login, registration and logout pages.

use actix_web::{HttpResponse, web};

use blogicum_core::service::{Registration, Session};
use blogicum_core::{DomainError, ValidationErrors};
use blogicum_shared::dto::{LoginForm, NextQuery, RegistrationForm};

use super::{page_context, render, see_other};
use crate::middleware::auth::{OptionalIdentity, cleared_session_cookie, session_cookie};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Where to land after logging in when no usable `next` was given.
const DEFAULT_REDIRECT: &str = "/";

/// Only same-site paths are followed.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => DEFAULT_REDIRECT,
    }
}

fn logged_in(state: &AppState, session: Session, location: &str) -> AppResult<HttpResponse> {
    let cookie = session_cookie(&state.config, session.token, state.tokens.expiration_seconds());
    tracing::info!(user_id = session.user.id, "Session started");
    Ok(HttpResponse::SeeOther()
        .insert_header((actix_web::http::header::LOCATION, location))
        .cookie(cookie)
        .finish())
}

fn render_login(
    state: &AppState,
    identity: &OptionalIdentity,
    username: &str,
    next: Option<&str>,
    errors: &ValidationErrors,
) -> AppResult<HttpResponse> {
    let mut ctx = page_context(identity.username());
    ctx.insert("username", username);
    ctx.insert("next", &next);
    ctx.insert("errors", errors);
    render(state, "registration/login.html", &ctx)
}

/// GET /auth/login/
pub async fn login_form(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<NextQuery>,
) -> AppResult<HttpResponse> {
    render_login(
        &state,
        &identity,
        "",
        query.next.as_deref(),
        &ValidationErrors::new(),
    )
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<NextQuery>,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    match state.accounts.login(form.username.trim(), &form.password).await {
        Ok(session) => logged_in(&state, session, safe_next(query.next.as_deref())),
        Err(DomainError::Validation(errors)) => {
            render_login(&state, &identity, &form.username, query.next.as_deref(), &errors)
        }
        Err(other) => Err(AppError::from(other)),
    }
}

fn render_registration(
    state: &AppState,
    identity: &OptionalIdentity,
    form: &RegistrationForm,
    errors: &ValidationErrors,
) -> AppResult<HttpResponse> {
    let mut ctx = page_context(identity.username());
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    render(state, "registration/registration_form.html", &ctx)
}

/// GET /auth/registration/
pub async fn registration_form(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    render_registration(
        &state,
        &identity,
        &RegistrationForm::default(),
        &ValidationErrors::new(),
    )
}

/// POST /auth/registration/
///
/// A new account is logged in straight away.
pub async fn register(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    form: web::Form<RegistrationForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let registration = Registration {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password1.clone(),
        password_confirmation: form.password2.clone(),
    };

    match state.accounts.register(registration).await {
        Ok(session) => logged_in(&state, session, DEFAULT_REDIRECT),
        Err(DomainError::Validation(errors)) => {
            render_registration(&state, &identity, &form, &errors)
        }
        Err(other) => Err(AppError::from(other)),
    }
}

/// GET or POST /auth/logout/
pub async fn logout(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let body = state
        .templates
        .render("registration/logged_out.html", &page_context(None))?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .cookie(cleared_session_cookie(&state.config))
        .body(body))
}
