//! Domain entities - the core business objects.

mod category;
mod comment;
mod location;
mod post;
mod user;

pub use category::{Category, NewCategory, is_valid_slug};
pub use comment::{Comment, CommentDraft, CommentRecord, NewComment};
pub use location::{Location, NewLocation};
pub use post::{ImageChange, NewPost, Post, PostDraft, PostRecord};
pub use user::{NewUser, ProfileChanges, User, is_valid_username};

/// Maximum length of titles and names, in characters.
pub const MAX_TITLE_LENGTH: usize = 256;
