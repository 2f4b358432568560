//! Error handling - domain errors to HTTP responses and rendered error pages.

use std::fmt;

use actix_web::body::EitherBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::{self, HeaderValue};
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{HttpMessage, HttpResponse, ResponseError, http::StatusCode, web};
use tera::Context;

use blogicum_core::DomainError;

use crate::middleware::auth::login_url;
use crate::observability::RequestId;
use crate::state::AppState;

/// Application-level error type.
///
/// Validation failures never get here; handlers re-render their form instead.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    /// Anonymous viewer on a login-only page; `next` is where to come back.
    AuthenticationRequired { next: Option<String> },
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::AuthenticationRequired { .. } => write!(f, "Authentication required"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    /// Attach the path to return to after logging in.
    pub fn with_next(self, path: &str) -> Self {
        match self {
            AppError::AuthenticationRequired { .. } => AppError::AuthenticationRequired {
                next: Some(path.to_string()),
            },
            other => other,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthenticationRequired { .. } => StatusCode::SEE_OTHER,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::AuthenticationRequired { next } => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, login_url(next.as_deref())))
                .finish(),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                HttpResponse::InternalServerError().body("Internal Server Error")
            }
            other => HttpResponse::build(other.status_code()).body(other.to_string()),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, key } => {
                AppError::NotFound(format!("{} {}", entity_type, key))
            }
            DomainError::Validation(errors) => AppError::BadRequest(errors.to_string()),
            DomainError::AuthenticationRequired => AppError::AuthenticationRequired { next: None },
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        AppError::Internal(format!("template rendering failed: {:?}", err))
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Replaces bare 404 and 500 bodies with the rendered error pages.
pub fn error_pages<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(StatusCode::NOT_FOUND, render_not_found)
        .handler(StatusCode::INTERNAL_SERVER_ERROR, render_server_error)
}

fn render_not_found<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_error_page(res, "errors/404.html")
}

fn render_server_error<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_error_page(res, "errors/500.html")
}

fn render_error_page<B>(
    res: ServiceResponse<B>,
    template: &str,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let request_id = res
        .request()
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string());

    let page = res
        .request()
        .app_data::<web::Data<AppState>>()
        .and_then(|state| {
            let mut ctx = Context::new();
            ctx.insert("user", &Option::<String>::None);
            ctx.insert("request_id", &request_id);
            state
                .templates
                .render(template, &ctx)
                .map_err(|e| tracing::error!(template, "Error page rendering failed: {:?}", e))
                .ok()
        });

    let Some(page) = page else {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    };

    let (req, res) = res.into_parts();
    let mut res = res.set_body(page);
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    let res: ServiceResponse<EitherBody<B>> = ServiceResponse::new(req, res)
        .map_into_boxed_body()
        .map_into_right_body();
    Ok(ErrorHandlerResponse::Response(res))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let not_found: AppError = DomainError::not_found("post", 3).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let auth: AppError = DomainError::AuthenticationRequired.into();
        assert_eq!(auth.status_code(), StatusCode::SEE_OTHER);

        let internal: AppError = DomainError::Internal("boom".to_string()).into();
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_authentication_redirect_carries_next() {
        let err = AppError::from(DomainError::AuthenticationRequired).with_next("/posts/create/");
        let res = err.error_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "/auth/login/?next=%2Fposts%2Fcreate%2F"
        );
    }
}
