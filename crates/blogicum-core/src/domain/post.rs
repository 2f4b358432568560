use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Location, MAX_TITLE_LENGTH, User};
use crate::error::ValidationErrors;

/// Post entity - a blog post, possibly scheduled for the future.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub text: String,
    /// Scheduled publication time. May lie in the future.
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub author_id: i32,
    pub location_id: Option<i32>,
    pub category_id: Option<i32>,
    /// Path of the uploaded image, relative to the media root.
    pub image: Option<String>,
}

/// A post about to be inserted.
///
/// Only built by the mutation service, which takes `author_id` from the
/// authenticated viewer.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub author_id: i32,
    pub location_id: Option<i32>,
    pub category_id: Option<i32>,
    pub image: Option<String>,
}

/// What an edit does to the stored image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(String),
    Clear,
}

/// Submitted post form data. Deliberately has no author.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub text: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub location_id: Option<i32>,
    pub category_id: Option<i32>,
    pub image: ImageChange,
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.title.trim().is_empty() {
            errors.add("title", "This field is required.");
        } else if self.title.chars().count() > MAX_TITLE_LENGTH {
            errors.add("title", "Ensure this value has at most 256 characters.");
        }
        if self.text.trim().is_empty() {
            errors.add("text", "This field is required.");
        }
        if self.pub_date.is_none() {
            errors.add("pub_date", "Enter a valid date/time.");
        }
        errors.into_result()
    }

    /// Builds the insertable post. Call after [`PostDraft::validate`].
    pub(crate) fn into_new_post(self, author_id: i32, pub_date: DateTime<Utc>) -> NewPost {
        let image = match self.image {
            ImageChange::Replace(path) => Some(path),
            ImageChange::Keep | ImageChange::Clear => None,
        };
        NewPost {
            title: self.title,
            text: self.text,
            pub_date,
            is_published: self.is_published,
            author_id,
            location_id: self.location_id,
            category_id: self.category_id,
            image,
        }
    }

    /// Copies the editable fields onto `post`, leaving author, id and
    /// creation time untouched.
    pub(crate) fn apply_to(self, post: &mut Post, pub_date: DateTime<Utc>) {
        post.title = self.title;
        post.text = self.text;
        post.pub_date = pub_date;
        post.is_published = self.is_published;
        post.location_id = self.location_id;
        post.category_id = self.category_id;
        match self.image {
            ImageChange::Keep => {}
            ImageChange::Replace(path) => post.image = Some(path),
            ImageChange::Clear => post.image = None,
        }
    }
}

impl From<&Post> for PostDraft {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: Some(post.pub_date),
            is_published: post.is_published,
            location_id: post.location_id,
            category_id: post.category_id,
            image: ImageChange::Keep,
        }
    }
}

/// A post with its author, category and location loaded, plus the comment
/// count when the feed asked for it.
#[derive(Debug, Clone, Serialize)]
pub struct PostRecord {
    #[serde(flatten)]
    pub post: Post,
    pub author: User,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub comment_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> PostDraft {
        PostDraft {
            title: "Title".to_string(),
            text: "Body".to_string(),
            pub_date: Some(Utc::now()),
            is_published: true,
            location_id: None,
            category_id: Some(3),
            image: ImageChange::Keep,
        }
    }

    fn post() -> Post {
        let now = Utc::now();
        Post {
            id: 7,
            title: "Old".to_string(),
            text: "Old body".to_string(),
            pub_date: now,
            is_published: false,
            created_at: now,
            author_id: 1,
            location_id: Some(2),
            category_id: None,
            image: Some("posts_images/old.png".to_string()),
        }
    }

    #[test]
    fn test_validate_requires_fields() {
        let mut bad = draft();
        bad.title = "   ".to_string();
        bad.text = String::new();
        bad.pub_date = None;

        let errors = bad.validate().unwrap_err();
        assert!(errors.contains("title"));
        assert!(errors.contains("text"));
        assert!(errors.contains("pub_date"));
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_validate_title_length() {
        let mut long = draft();
        long.title = "x".repeat(257);
        assert!(long.validate().unwrap_err().contains("title"));

        long.title = "x".repeat(256);
        assert!(long.validate().is_ok());
    }

    #[test]
    fn test_apply_keeps_author_and_image() {
        let mut target = post();
        let created_at = target.created_at;
        let pub_date = Utc::now();

        draft().apply_to(&mut target, pub_date);

        assert_eq!(target.author_id, 1);
        assert_eq!(target.created_at, created_at);
        assert_eq!(target.title, "Title");
        assert_eq!(target.category_id, Some(3));
        assert_eq!(target.location_id, None);
        assert_eq!(target.image.as_deref(), Some("posts_images/old.png"));
    }

    #[test]
    fn test_apply_replaces_or_clears_image() {
        let mut target = post();
        let mut replace = draft();
        replace.image = ImageChange::Replace("posts_images/new.png".to_string());
        replace.apply_to(&mut target, Utc::now());
        assert_eq!(target.image.as_deref(), Some("posts_images/new.png"));

        let mut clear = draft();
        clear.image = ImageChange::Clear;
        clear.apply_to(&mut target, Utc::now());
        assert_eq!(target.image, None);
    }
}
