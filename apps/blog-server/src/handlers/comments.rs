//! Comment submission, editing and deletion.

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;

use blogicum_core::domain::{CommentDraft, CommentRecord};
use blogicum_core::{AuthorizationResult, DomainError, ValidationErrors};
use blogicum_shared::dto::CommentForm;

use super::posts::render_detail;
use super::{page_context, render, see_other};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn render_comment_page(
    state: &AppState,
    identity: &Identity,
    comment: &CommentRecord,
    deleting: bool,
    form: &CommentForm,
    errors: &ValidationErrors,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = (comment.comment.post_id, comment.comment.id);
    let action = if deleting {
        format!("/posts/{}/comment/{}/delete/", post_id, comment_id)
    } else {
        format!("/posts/{}/comment/{}/edit/", post_id, comment_id)
    };

    let mut ctx = page_context(Some(&identity.username));
    ctx.insert("comment", comment);
    ctx.insert("deleting", &deleting);
    ctx.insert("action", &action);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    render(state, "blog/comment.html", &ctx)
}

/// POST /posts/{post_id}/comment/
pub async fn add(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i32>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let form = form.into_inner();
    let draft = CommentDraft {
        text: form.text.clone(),
    };

    match state
        .blog
        .add_comment(identity.viewer(), post_id, draft, Utc::now())
        .await
    {
        Ok(to) => Ok(see_other(to.path())),
        Err(DomainError::Validation(errors)) => {
            let identity = OptionalIdentity(Some(identity));
            render_detail(&state, &identity, post_id, &form, &errors).await
        }
        Err(other) => Err(AppError::from(other).with_next(req.path())),
    }
}

/// GET /posts/{post_id}/comment/{comment_id}/edit/
pub async fn edit_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i32, i32)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    match state
        .blog
        .comment_for_edit(identity.viewer(), post_id, comment_id)
        .await
        .map_err(|e| AppError::from(e).with_next(req.path()))?
    {
        AuthorizationResult::Allowed(comment) => {
            let form = CommentForm {
                text: comment.comment.text.clone(),
            };
            render_comment_page(&state, &identity, &comment, false, &form, &ValidationErrors::new())
        }
        AuthorizationResult::DeniedRedirect(to) => Ok(see_other(to.path())),
    }
}

/// POST /posts/{post_id}/comment/{comment_id}/edit/
pub async fn edit(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i32, i32)>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let form = form.into_inner();
    let viewer = identity.viewer();
    let draft = CommentDraft {
        text: form.text.clone(),
    };

    match state.blog.edit_comment(viewer, post_id, comment_id, draft).await {
        Ok(AuthorizationResult::Allowed(to) | AuthorizationResult::DeniedRedirect(to)) => {
            Ok(see_other(to.path()))
        }
        Err(DomainError::Validation(errors)) => {
            // Validation only runs for the author, so the lookup is allowed.
            match state.blog.comment_for_edit(viewer, post_id, comment_id).await? {
                AuthorizationResult::Allowed(comment) => {
                    render_comment_page(&state, &identity, &comment, false, &form, &errors)
                }
                AuthorizationResult::DeniedRedirect(to) => Ok(see_other(to.path())),
            }
        }
        Err(other) => Err(AppError::from(other).with_next(req.path())),
    }
}

/// GET /posts/{post_id}/comment/{comment_id}/delete/ - confirmation page.
pub async fn delete_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i32, i32)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    match state
        .blog
        .comment_for_edit(identity.viewer(), post_id, comment_id)
        .await
        .map_err(|e| AppError::from(e).with_next(req.path()))?
    {
        AuthorizationResult::Allowed(comment) => {
            let form = CommentForm {
                text: comment.comment.text.clone(),
            };
            render_comment_page(&state, &identity, &comment, true, &form, &ValidationErrors::new())
        }
        AuthorizationResult::DeniedRedirect(to) => Ok(see_other(to.path())),
    }
}

/// POST /posts/{post_id}/comment/{comment_id}/delete/
pub async fn delete(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i32, i32)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let to = match state
        .blog
        .delete_comment(identity.viewer(), post_id, comment_id)
        .await
        .map_err(|e| AppError::from(e).with_next(req.path()))?
    {
        AuthorizationResult::Allowed(to) | AuthorizationResult::DeniedRedirect(to) => to,
    };
    Ok(see_other(to.path()))
}
