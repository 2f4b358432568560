//! Post listings: the public feed, category pages and author profiles.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use blogicum_shared::dto::PageQuery;

use super::{page_context, paginate, render};
use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let feed = state.blog.feeds().public_feed(Utc::now());
    let page = paginate(&feed, &query, state.config.posts_per_page).await?;

    let mut ctx = page_context(identity.username());
    ctx.insert("page", &page);
    render(&state, "blog/index.html", &ctx)
}

/// GET /category/{slug}/
pub async fn category(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let (category, feed) = state
        .blog
        .feeds()
        .category_feed(&path.into_inner(), Utc::now())
        .await?;
    let page = paginate(&feed, &query, state.config.posts_per_page).await?;

    let mut ctx = page_context(identity.username());
    ctx.insert("category", &category);
    ctx.insert("page", &page);
    render(&state, "blog/category.html", &ctx)
}

/// GET /profile/{username}/
///
/// The owner sees every post they wrote, drafts and scheduled ones included.
pub async fn profile(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let viewer = identity.viewer();
    let (author, feed) = state
        .blog
        .feeds()
        .author_feed(&path.into_inner(), viewer, Utc::now())
        .await?;
    let page = paginate(&feed, &query, state.config.posts_per_page).await?;

    let mut ctx = page_context(identity.username());
    ctx.insert("is_owner", &viewer.is(author.id));
    ctx.insert("display_name", &author.display_name());
    ctx.insert("profile", &author);
    ctx.insert("page", &page);
    render(&state, "blog/profile.html", &ctx)
}
