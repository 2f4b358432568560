use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a category slug.
pub const MAX_SLUG_LENGTH: usize = 64;

/// Category entity - a published (or hidden) grouping of posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

/// Latin letters, digits, hyphen and underscore.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LENGTH
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        assert!(is_valid_slug("travel"));
        assert!(is_valid_slug("long_read-2024"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("путешествия"));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug(&"a".repeat(65)));
    }
}
