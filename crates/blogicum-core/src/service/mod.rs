//! Mutation handlers and the read paths that are gated per post.
//!
//! Authors are always taken from the viewer, never from submitted data, and
//! ownership failures come back as [`AuthorizationResult::DeniedRedirect`].

mod accounts;
mod comments;
mod posts;
mod profile;

pub use accounts::{AccountService, MIN_PASSWORD_LENGTH, Registration, Session};

use serde::Serialize;

use crate::domain::{Category, CommentRecord, Location, PostRecord, User};
use crate::error::DomainError;
use crate::feed::QueryComposer;
use crate::ports::{BaseRepository, Repositories};
use crate::visibility::{AuthorizationResult, Redirect, Viewer};

/// A post page: the post and its comments, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
}

/// Choices offered by the post form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostFormChoices {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

/// Blog operations over the entity store.
#[derive(Clone)]
pub struct BlogService {
    repos: Repositories,
    feeds: QueryComposer,
}

impl BlogService {
    pub fn new(repos: Repositories) -> Self {
        let feeds = QueryComposer::new(repos.clone());
        Self { repos, feeds }
    }

    pub fn feeds(&self) -> &QueryComposer {
        &self.feeds
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// The authenticated viewer's account.
    async fn require_user(&self, viewer: Viewer) -> Result<User, DomainError> {
        let id = viewer.user_id().ok_or(DomainError::AuthenticationRequired)?;
        // A token for a deleted account is as good as no token.
        self.repos
            .users
            .find_by_id(id)
            .await?
            .ok_or(DomainError::AuthenticationRequired)
    }

    async fn profile_redirect(&self, viewer: Viewer) -> Result<Redirect, DomainError> {
        let user = self.require_user(viewer).await?;
        Ok(Redirect::Profile(user.username))
    }
}

fn denied<T>(viewer: Viewer, what: &'static str, id: i32, to: Redirect) -> AuthorizationResult<T> {
    tracing::warn!(
        viewer = ?viewer.user_id(),
        entity = what,
        id,
        "Mutation by non-author redirected to read view"
    );
    AuthorizationResult::DeniedRedirect(to)
}
