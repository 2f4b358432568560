//! Editing one's own profile.

use actix_web::{HttpRequest, HttpResponse, web};

use blogicum_core::domain::{ProfileChanges, User};
use blogicum_core::{DomainError, ValidationErrors};
use blogicum_shared::dto::ProfileForm;

use super::{page_context, render, see_other};
use crate::middleware::auth::{Identity, session_cookie};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn render_profile_form(
    state: &AppState,
    username: &str,
    form: &ProfileForm,
    errors: &ValidationErrors,
) -> AppResult<HttpResponse> {
    let mut ctx = page_context(Some(username));
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    render(state, "blog/user.html", &ctx)
}

fn form_from_user(user: &User) -> ProfileForm {
    ProfileForm {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

/// GET /profile/edit/
pub async fn edit_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let user = state
        .blog
        .current_user(identity.viewer())
        .await
        .map_err(|e| AppError::from(e).with_next(req.path()))?;
    render_profile_form(
        &state,
        &identity.username,
        &form_from_user(&user),
        &ValidationErrors::new(),
    )
}

/// POST /profile/edit/
///
/// A renamed account gets a fresh session so the cookie carries the new
/// username.
pub async fn edit(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<ProfileForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let changes = ProfileChanges {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
    };

    match state.blog.edit_profile(identity.viewer(), changes).await {
        Ok(user) => {
            let mut response = see_other(format!("/profile/{}/", user.username));
            if user.username != identity.username {
                let token = state
                    .tokens
                    .generate_token(user.id, &user.username)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                let cookie = session_cookie(&state.config, token, state.tokens.expiration_seconds());
                response
                    .add_cookie(&cookie)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
            }
            Ok(response)
        }
        Err(DomainError::Validation(errors)) => {
            render_profile_form(&state, &identity.username, &form, &errors)
        }
        Err(other) => Err(AppError::from(other).with_next(req.path())),
    }
}
