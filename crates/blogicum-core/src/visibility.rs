//! Who may read a post, and who may change a post or comment.
//!
//! A post is publicly readable when it is published, its category (if any)
//! is published and its `pub_date` has passed. Its author always reads it.
//! Only the author of a post or comment may edit or delete it; everyone else
//! is sent back to the read-only view.

use chrono::{DateTime, Utc};

use crate::domain::{Category, Comment, CommentRecord, Post, PostRecord};

/// The party looking at a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(i32),
}

impl Viewer {
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::User(_))
    }

    /// Anonymous viewers are nobody.
    pub fn is(&self, user_id: i32) -> bool {
        self.user_id() == Some(user_id)
    }
}

/// Anything with an owning author.
pub trait Authored {
    fn author_id(&self) -> i32;
}

impl Authored for Post {
    fn author_id(&self) -> i32 {
        self.author_id
    }
}

impl Authored for PostRecord {
    fn author_id(&self) -> i32 {
        self.post.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i32 {
        self.author_id
    }
}

impl Authored for CommentRecord {
    fn author_id(&self) -> i32 {
        self.comment.author_id
    }
}

/// Read view a caller is sent to after a mutation or a denied one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    PostDetail(i32),
    Profile(String),
}

impl Redirect {
    pub fn path(&self) -> String {
        match self {
            Redirect::PostDetail(id) => format!("/posts/{}/", id),
            Redirect::Profile(username) => format!("/profile/{}/", username),
        }
    }
}

/// Outcome of an ownership check. Denial is an expected result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult<T = ()> {
    Allowed(T),
    DeniedRedirect(Redirect),
}

impl<T> AuthorizationResult<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationResult::Allowed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AuthorizationResult<U> {
        match self {
            AuthorizationResult::Allowed(value) => AuthorizationResult::Allowed(f(value)),
            AuthorizationResult::DeniedRedirect(to) => AuthorizationResult::DeniedRedirect(to),
        }
    }
}

/// The visibility conjunction, without the author bypass.
pub fn passes_public_conjunction(
    post: &Post,
    category: Option<&Category>,
    now: DateTime<Utc>,
) -> bool {
    post.is_published && category.is_none_or(|c| c.is_published) && post.pub_date <= now
}

pub fn is_visible_to(viewer: Viewer, post: &PostRecord, now: DateTime<Utc>) -> bool {
    viewer.is(post.post.author_id)
        || passes_public_conjunction(&post.post, post.category.as_ref(), now)
}

pub fn can_mutate(viewer: Viewer, entity: &impl Authored) -> bool {
    viewer.is(entity.author_id())
}

/// [`can_mutate`] as a value: `on_denied` names the read view to fall back to.
pub fn authorize_mutation(
    viewer: Viewer,
    entity: &impl Authored,
    on_denied: impl FnOnce() -> Redirect,
) -> AuthorizationResult {
    if can_mutate(viewer, entity) {
        AuthorizationResult::Allowed(())
    } else {
        AuthorizationResult::DeniedRedirect(on_denied())
    }
}
