use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::error::ValidationErrors;

/// Comment entity. Has no visibility of its own; it follows its post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: i32,
    pub post_id: i32,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub author_id: i32,
    pub post_id: i32,
}

/// Submitted comment form data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentDraft {
    pub text: String,
}

impl CommentDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        if self.text.trim().is_empty() {
            return Err(ValidationErrors::single("text", "This field is required."));
        }
        Ok(())
    }
}

/// A comment with its author loaded.
#[derive(Debug, Clone, Serialize)]
pub struct CommentRecord {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: User,
}
