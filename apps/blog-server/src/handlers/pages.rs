//! Static informational pages.

use actix_web::{HttpResponse, web};

use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

use super::{page_context, render};

/// GET /pages/about/
pub async fn about(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    render(&state, "pages/about.html", &page_context(identity.username()))
}

/// GET /pages/rules/
pub async fn rules(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    render(&state, "pages/rules.html", &page_context(identity.username()))
}
