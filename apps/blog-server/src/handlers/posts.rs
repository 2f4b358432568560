//! Post pages: detail, create, edit and delete.

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use serde::Serialize;

use blogicum_core::domain::{ImageChange, PostDraft, PostRecord};
use blogicum_core::{AuthorizationResult, DomainError, ValidationErrors};
use blogicum_shared::dto::{
    CommentForm, PostForm, format_datetime_local, parse_datetime_local, parse_optional_id,
};

use super::media::{PostSubmission, read_post_submission};
use super::{page_context, render, see_other};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum FormMode {
    Create,
    Edit,
    Delete,
}

/// Everything `blog/create.html` needs besides the layout fields.
struct PostFormPage<'a> {
    mode: FormMode,
    action: String,
    form: &'a PostForm,
    errors: &'a ValidationErrors,
    current_image: Option<&'a str>,
}

async fn render_post_form(
    state: &AppState,
    identity: &Identity,
    page: PostFormPage<'_>,
) -> AppResult<HttpResponse> {
    let choices = state.blog.post_form_choices().await?;
    let mut ctx = page_context(Some(&identity.username));
    ctx.insert("mode", &page.mode);
    ctx.insert("action", &page.action);
    ctx.insert("form", page.form);
    ctx.insert("errors", page.errors);
    ctx.insert("current_image", &page.current_image);
    ctx.insert("categories", &choices.categories);
    ctx.insert("locations", &choices.locations);
    render(state, "blog/create.html", &ctx)
}

/// The form prefilled from a stored post.
fn form_from_record(record: &PostRecord) -> PostForm {
    let post = &record.post;
    PostForm {
        title: post.title.clone(),
        text: post.text.clone(),
        pub_date: format_datetime_local(&post.pub_date),
        is_published: post.is_published.then(|| "on".to_string()),
        location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
        category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
        image_clear: None,
    }
}

/// Converts the submitted text fields. Unparseable select values are
/// reported here; everything else is left to draft validation.
fn draft_from_form(form: &PostForm, image: ImageChange) -> (PostDraft, ValidationErrors) {
    let mut errors = ValidationErrors::new();
    let mut choice = |field: &str, raw: &str| {
        parse_optional_id(raw).unwrap_or_else(|_| {
            errors.add(field, INVALID_CHOICE);
            None
        })
    };
    let location_id = choice("location", &form.location);
    let category_id = choice("category", &form.category);

    let draft = PostDraft {
        title: form.title.clone(),
        text: form.text.clone(),
        pub_date: parse_datetime_local(&form.pub_date),
        is_published: form.is_published(),
        location_id,
        category_id,
        image,
    };
    (draft, errors)
}

/// Folds the form-level errors together with the draft's own.
fn check_submission(
    draft: &PostDraft,
    mut errors: ValidationErrors,
    submission: &PostSubmission,
) -> Result<(), DomainError> {
    if let Some(reason) = &submission.image_error {
        errors.add("image", reason.clone());
    }
    if errors.is_empty() {
        return Ok(());
    }
    if let Err(more) = draft.validate() {
        errors.merge(more);
    }
    Err(DomainError::Validation(errors))
}

/// GET /posts/{post_id}/
pub async fn detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    render_detail(&state, &identity, path.into_inner(), &CommentForm::default(), &ValidationErrors::new())
        .await
}

/// The post page, also used to re-render a rejected comment.
pub(super) async fn render_detail(
    state: &AppState,
    identity: &OptionalIdentity,
    post_id: i32,
    comment_form: &CommentForm,
    errors: &ValidationErrors,
) -> AppResult<HttpResponse> {
    let viewer = identity.viewer();
    let detail = state.blog.post_detail(viewer, post_id, Utc::now()).await?;

    let mut ctx = page_context(identity.username());
    ctx.insert("is_author", &viewer.is(detail.post.post.author_id));
    ctx.insert("post", &detail.post);
    ctx.insert("comments", &detail.comments);
    ctx.insert("form", comment_form);
    ctx.insert("errors", errors);
    render(state, "blog/detail.html", &ctx)
}

/// GET /posts/create/
pub async fn create_form(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let form = PostForm {
        pub_date: format_datetime_local(&Utc::now()),
        is_published: Some("on".to_string()),
        ..PostForm::default()
    };
    render_post_form(
        &state,
        &identity,
        PostFormPage {
            mode: FormMode::Create,
            action: "/posts/create/".to_string(),
            form: &form,
            errors: &ValidationErrors::new(),
            current_image: None,
        },
    )
    .await
}

/// POST /posts/create/
///
/// The author is always the logged-in user; the form has no author field.
pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut submission = read_post_submission(payload, &state.config).await?;
    let image = submission
        .image
        .as_ref()
        .map(|image| ImageChange::Replace(image.relative.clone()))
        .unwrap_or_default();
    let (draft, errors) = draft_from_form(&submission.form, image);

    let outcome = match check_submission(&draft, errors, &submission) {
        Ok(()) => state.blog.create_post(identity.viewer(), draft).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok((_, to)) => Ok(see_other(to.path())),
        Err(err) => {
            submission.discard_image().await;
            match err {
                DomainError::Validation(errors) => {
                    render_post_form(
                        &state,
                        &identity,
                        PostFormPage {
                            mode: FormMode::Create,
                            action: "/posts/create/".to_string(),
                            form: &submission.form,
                            errors: &errors,
                            current_image: None,
                        },
                    )
                    .await
                }
                other => Err(AppError::from(other).with_next(req.path())),
            }
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn edit_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let record = match state
        .blog
        .post_for_edit(identity.viewer(), post_id)
        .await
        .map_err(|e| AppError::from(e).with_next(req.path()))?
    {
        AuthorizationResult::Allowed(record) => record,
        AuthorizationResult::DeniedRedirect(to) => return Ok(see_other(to.path())),
    };

    render_post_form(
        &state,
        &identity,
        PostFormPage {
            mode: FormMode::Edit,
            action: format!("/posts/{}/edit/", post_id),
            form: &form_from_record(&record),
            errors: &ValidationErrors::new(),
            current_image: record.post.image.as_deref(),
        },
    )
    .await
}

/// POST /posts/{post_id}/edit/
///
/// Ownership is settled before the upload is read, so a refused edit
/// never writes a file.
pub async fn edit(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i32>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let viewer = identity.viewer();
    let record = match state
        .blog
        .post_for_edit(viewer, post_id)
        .await
        .map_err(|e| AppError::from(e).with_next(req.path()))?
    {
        AuthorizationResult::Allowed(record) => record,
        AuthorizationResult::DeniedRedirect(to) => return Ok(see_other(to.path())),
    };

    let mut submission = read_post_submission(payload, &state.config).await?;
    let image = match &submission.image {
        Some(image) => ImageChange::Replace(image.relative.clone()),
        None if submission.form.clears_image() => ImageChange::Clear,
        None => ImageChange::Keep,
    };
    let (draft, errors) = draft_from_form(&submission.form, image);

    let outcome = match check_submission(&draft, errors, &submission) {
        Ok(()) => state.blog.edit_post(viewer, post_id, draft).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(AuthorizationResult::Allowed(to)) => Ok(see_other(to.path())),
        Ok(AuthorizationResult::DeniedRedirect(to)) => {
            submission.discard_image().await;
            Ok(see_other(to.path()))
        }
        Err(err) => {
            submission.discard_image().await;
            match err {
                DomainError::Validation(errors) => {
                    render_post_form(
                        &state,
                        &identity,
                        PostFormPage {
                            mode: FormMode::Edit,
                            action: format!("/posts/{}/edit/", post_id),
                            form: &submission.form,
                            errors: &errors,
                            current_image: record.post.image.as_deref(),
                        },
                    )
                    .await
                }
                other => Err(AppError::from(other).with_next(req.path())),
            }
        }
    }
}

/// GET /posts/{post_id}/delete/ - confirmation page.
pub async fn delete_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let record = match state
        .blog
        .post_for_edit(identity.viewer(), post_id)
        .await
        .map_err(|e| AppError::from(e).with_next(req.path()))?
    {
        AuthorizationResult::Allowed(record) => record,
        AuthorizationResult::DeniedRedirect(to) => return Ok(see_other(to.path())),
    };

    render_post_form(
        &state,
        &identity,
        PostFormPage {
            mode: FormMode::Delete,
            action: format!("/posts/{}/delete/", post_id),
            form: &form_from_record(&record),
            errors: &ValidationErrors::new(),
            current_image: record.post.image.as_deref(),
        },
    )
    .await
}

/// POST /posts/{post_id}/delete/
pub async fn delete(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let to = match state
        .blog
        .delete_post(identity.viewer(), path.into_inner())
        .await
        .map_err(|e| AppError::from(e).with_next(req.path()))?
    {
        AuthorizationResult::Allowed(to) | AuthorizationResult::DeniedRedirect(to) => to,
    };
    Ok(see_other(to.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_from_form_reports_bad_choices() {
        let form = PostForm {
            title: "Trip".to_string(),
            text: "Notes".to_string(),
            pub_date: "2024-05-01T10:00".to_string(),
            is_published: Some("on".to_string()),
            location: "".to_string(),
            category: "abc".to_string(),
            image_clear: None,
        };
        let (draft, errors) = draft_from_form(&form, ImageChange::Keep);

        assert!(errors.contains("category"));
        assert!(!errors.contains("location"));
        assert_eq!(draft.location_id, None);
        assert!(draft.is_published);
        assert!(draft.pub_date.is_some());
    }

    #[test]
    fn test_draft_from_form_leaves_bad_date_to_validation() {
        let form = PostForm {
            title: "Trip".to_string(),
            text: "Notes".to_string(),
            pub_date: "tomorrow".to_string(),
            category: "4".to_string(),
            ..PostForm::default()
        };
        let (draft, errors) = draft_from_form(&form, ImageChange::Clear);

        assert!(errors.is_empty());
        assert_eq!(draft.category_id, Some(4));
        assert!(!draft.is_published);
        assert!(draft.validate().unwrap_err().contains("pub_date"));
    }
}
