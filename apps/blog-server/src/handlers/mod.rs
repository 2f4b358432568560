//! HTTP handlers and route configuration.

mod accounts;
mod comments;
mod feeds;
mod health;
mod media;
mod pages;
mod posts;
mod profile;


use actix_web::http::header;
use actix_web::{HttpResponse, web};
use tera::Context;

use blogicum_core::domain::PostRecord;
use blogicum_core::{Feed, ValidationErrors};
use blogicum_shared::dto::PageQuery;
use blogicum_shared::{Page, PageWindow};

use crate::middleware::error::AppResult;
use crate::state::AppState;

#[cfg(feature = "rate-limit")]
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Configure all application routes.
///
/// Literal segments (`create`, `edit`) are registered ahead of the
/// parameterised routes they would otherwise collide with.
#[cfg_attr(not(feature = "rate-limit"), allow(unused_variables))]
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let accounts = web::scope("/auth")
        .service(
            web::resource("/login/")
                .route(web::get().to(accounts::login_form))
                .route(web::post().to(accounts::login)),
        )
        .service(
            web::resource("/registration/")
                .route(web::get().to(accounts::registration_form))
                .route(web::post().to(accounts::register)),
        )
        .service(
            web::resource("/logout/")
                .route(web::get().to(accounts::logout))
                .route(web::post().to(accounts::logout)),
        );

    #[cfg(feature = "rate-limit")]
    let accounts = accounts.wrap(RateLimitMiddleware::new(state.auth_limiter.clone()));

    cfg.route("/api/health", web::get().to(health::health_check))
        .route("/", web::get().to(feeds::index))
        .route("/category/{slug}/", web::get().to(feeds::category))
        .service(
            web::scope("/pages")
                .route("/about/", web::get().to(pages::about))
                .route("/rules/", web::get().to(pages::rules)),
        )
        .service(
            web::resource("/profile/edit/")
                .route(web::get().to(profile::edit_form))
                .route(web::post().to(profile::edit)),
        )
        .route("/profile/{username}/", web::get().to(feeds::profile))
        .service(
            web::scope("/posts")
                .service(
                    web::resource("/create/")
                        .route(web::get().to(posts::create_form))
                        .route(web::post().to(posts::create)),
                )
                .route("/{post_id}/", web::get().to(posts::detail))
                .service(
                    web::resource("/{post_id}/edit/")
                        .route(web::get().to(posts::edit_form))
                        .route(web::post().to(posts::edit)),
                )
                .service(
                    web::resource("/{post_id}/delete/")
                        .route(web::get().to(posts::delete_form))
                        .route(web::post().to(posts::delete)),
                )
                .route("/{post_id}/comment/", web::post().to(comments::add))
                .service(
                    web::resource("/{post_id}/comment/{comment_id}/edit/")
                        .route(web::get().to(comments::edit_form))
                        .route(web::post().to(comments::edit)),
                )
                .service(
                    web::resource("/{post_id}/comment/{comment_id}/delete/")
                        .route(web::get().to(comments::delete_form))
                        .route(web::post().to(comments::delete)),
                ),
        )
        .service(accounts);
}

/// Template context with the fields every page's layout reads.
pub(crate) fn page_context(username: Option<&str>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("user", &username);
    ctx.insert("errors", &ValidationErrors::new());
    ctx
}

pub(crate) fn render(state: &AppState, template: &str, ctx: &Context) -> AppResult<HttpResponse> {
    let body = state.templates.render(template, ctx)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

/// 303 to a read view.
pub(crate) fn see_other(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

/// The requested page of a feed, clamped into range.
pub(crate) async fn paginate(
    feed: &Feed,
    query: &PageQuery,
    per_page: u64,
) -> AppResult<Page<PostRecord>> {
    let total = feed.count().await?;
    let window = PageWindow::resolve(query.page.as_deref(), total, per_page);
    let items = feed.fetch(window.offset(), window.limit()).await?;
    Ok(Page::new(items, window))
}
