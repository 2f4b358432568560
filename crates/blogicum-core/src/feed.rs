//! Feed composition: filtered, annotated, ordered post listings.
//!
//! Every listing in the application is built here from a [`PostFilter`] and
//! explicit [`FeedOptions`]. A [`Feed`] is lazy; the store is only queried
//! when the caller counts it or fetches a slice of it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::{Category, Post, PostRecord, User};
use crate::error::DomainError;
use crate::ports::{BaseRepository, Repositories};
use crate::visibility::{Viewer, passes_public_conjunction};

/// How a feed is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOptions {
    /// Keep only posts passing the visibility conjunction.
    pub apply_public_filter: bool,
    /// Annotate each post with its number of comments.
    pub with_comment_count: bool,
}

impl FeedOptions {
    /// What anyone may browse.
    pub const PUBLIC: FeedOptions = FeedOptions {
        apply_public_filter: true,
        with_comment_count: true,
    };

    /// An author browsing their own posts.
    pub const OWNER: FeedOptions = FeedOptions {
        apply_public_filter: false,
        with_comment_count: true,
    };
}

/// Row selection for post queries, understood by every post store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub author_id: Option<i32>,
    pub category_id: Option<i32>,
    /// When set, only posts passing the visibility conjunction at this instant.
    pub visible_at: Option<DateTime<Utc>>,
}

impl PostFilter {
    pub fn new(options: FeedOptions, now: DateTime<Utc>) -> Self {
        Self {
            author_id: None,
            category_id: None,
            visible_at: options.apply_public_filter.then_some(now),
        }
    }

    pub fn by_author(mut self, author_id: i32) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn in_category(mut self, category_id: i32) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// `category` must be the post's category, if it has one.
    pub fn matches(&self, post: &Post, category: Option<&Category>) -> bool {
        if self.author_id.is_some_and(|id| id != post.author_id) {
            return false;
        }
        if self.category_id.is_some() && self.category_id != post.category_id {
            return false;
        }
        match self.visible_at {
            Some(now) => passes_public_conjunction(post, category, now),
            None => true,
        }
    }
}

/// Builds feeds on top of the entity store.
#[derive(Clone)]
pub struct QueryComposer {
    repos: Repositories,
}

impl QueryComposer {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub fn compose(&self, filter: PostFilter, options: FeedOptions) -> Feed {
        Feed {
            composer: self.clone(),
            filter,
            options,
        }
    }

    /// Every publicly visible post.
    pub fn public_feed(&self, now: DateTime<Utc>) -> Feed {
        self.compose(PostFilter::new(FeedOptions::PUBLIC, now), FeedOptions::PUBLIC)
    }

    /// Publicly visible posts of a published category.
    ///
    /// An unpublished category is reported exactly like a missing one.
    pub async fn category_feed(
        &self,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<(Category, Feed), DomainError> {
        let category = self
            .repos
            .categories
            .find_by_slug(slug)
            .await?
            .filter(|c| c.is_published)
            .ok_or_else(|| DomainError::not_found("category", slug))?;

        let filter = PostFilter::new(FeedOptions::PUBLIC, now).in_category(category.id);
        let feed = self.compose(filter, FeedOptions::PUBLIC);
        Ok((category, feed))
    }

    /// Posts of one author: all of them for the author, the publicly visible
    /// ones for everybody else.
    pub async fn author_feed(
        &self,
        username: &str,
        viewer: Viewer,
        now: DateTime<Utc>,
    ) -> Result<(User, Feed), DomainError> {
        let author = self
            .repos
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))?;

        let options = if viewer.is(author.id) {
            FeedOptions::OWNER
        } else {
            FeedOptions::PUBLIC
        };
        let filter = PostFilter::new(options, now).by_author(author.id);
        let feed = self.compose(filter, options);
        Ok((author, feed))
    }

    /// Attaches author, category, location and (optionally) comment count to
    /// each post, with one batched lookup per relation.
    pub async fn load_records(
        &self,
        posts: Vec<Post>,
        with_comment_count: bool,
    ) -> Result<Vec<PostRecord>, DomainError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids = unique(posts.iter().map(|p| Some(p.author_id)));
        let category_ids = unique(posts.iter().map(|p| p.category_id));
        let location_ids = unique(posts.iter().map(|p| p.location_id));

        let authors: HashMap<i32, User> = self
            .repos
            .users
            .find_many(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let categories: HashMap<i32, Category> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            self.repos
                .categories
                .find_many(&category_ids)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };
        let locations: HashMap<i32, _> = if location_ids.is_empty() {
            HashMap::new()
        } else {
            self.repos
                .locations
                .find_many(&location_ids)
                .await?
                .into_iter()
                .map(|l| (l.id, l))
                .collect()
        };
        let counts = if with_comment_count {
            let ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
            Some(self.repos.comments.count_by_posts(&ids).await?)
        } else {
            None
        };

        posts
            .into_iter()
            .map(|post| -> Result<PostRecord, DomainError> {
                let author = authors.get(&post.author_id).cloned().ok_or_else(|| {
                    DomainError::Internal(format!(
                        "post {} references missing author {}",
                        post.id, post.author_id
                    ))
                })?;
                Ok(PostRecord {
                    author,
                    category: post.category_id.and_then(|id| categories.get(&id).cloned()),
                    location: post.location_id.and_then(|id| locations.get(&id).cloned()),
                    comment_count: counts
                        .as_ref()
                        .map(|c| c.get(&post.id).copied().unwrap_or(0)),
                    post,
                })
            })
            .collect()
    }

    /// Loads a single post with its relations, without any visibility check.
    pub async fn load_record(&self, post_id: i32) -> Result<Option<PostRecord>, DomainError> {
        let Some(post) = self.repos.posts.find_by_id(post_id).await? else {
            return Ok(None);
        };
        Ok(self.load_records(vec![post], false).await?.pop())
    }
}

fn unique(ids: impl Iterator<Item = Option<i32>>) -> Vec<i32> {
    let mut seen = HashSet::new();
    ids.flatten().filter(|id| seen.insert(*id)).collect()
}

/// An ordered, not yet executed post listing.
#[derive(Clone)]
pub struct Feed {
    composer: QueryComposer,
    filter: PostFilter,
    options: FeedOptions,
}

impl Feed {
    pub fn filter(&self) -> &PostFilter {
        &self.filter
    }

    pub fn options(&self) -> FeedOptions {
        self.options
    }

    pub async fn count(&self) -> Result<u64, DomainError> {
        Ok(self.composer.repos.posts.count_matching(&self.filter).await?)
    }

    /// Posts `offset..offset + limit` of the feed, relations loaded.
    pub async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<PostRecord>, DomainError> {
        let posts = self
            .composer
            .repos
            .posts
            .find_matching(&self.filter, offset, limit)
            .await?;
        tracing::debug!(
            offset,
            limit,
            rows = posts.len(),
            public = self.options.apply_public_filter,
            "Fetched feed slice"
        );
        self.composer
            .load_records(posts, self.options.with_comment_count)
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn post(author_id: i32, category_id: Option<i32>, is_published: bool) -> Post {
        let now = Utc::now();
        Post {
            id: 1,
            title: "t".to_string(),
            text: "x".to_string(),
            pub_date: now - Duration::hours(1),
            is_published,
            created_at: now,
            author_id,
            location_id: None,
            category_id,
            image: None,
        }
    }

    fn category(id: i32, is_published: bool) -> Category {
        Category {
            id,
            title: "c".to_string(),
            description: String::new(),
            slug: format!("c{id}"),
            is_published,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_options_decide_public_filter() {
        let now = Utc::now();
        assert_eq!(PostFilter::new(FeedOptions::PUBLIC, now).visible_at, Some(now));
        assert_eq!(PostFilter::new(FeedOptions::OWNER, now).visible_at, None);
    }

    #[test]
    fn test_filter_scopes() {
        let now = Utc::now();
        let filter = PostFilter::new(FeedOptions::OWNER, now).by_author(1).in_category(4);
        let cat = category(4, true);

        assert!(filter.matches(&post(1, Some(4), false), Some(&cat)));
        assert!(!filter.matches(&post(2, Some(4), true), Some(&cat)));
        assert!(!filter.matches(&post(1, None, true), None));
    }

    #[test]
    fn test_public_filter_applies_conjunction() {
        let now = Utc::now();
        let filter = PostFilter::new(FeedOptions::PUBLIC, now);

        assert!(filter.matches(&post(1, None, true), None));
        assert!(!filter.matches(&post(1, None, false), None));
        let hidden = category(2, false);
        assert!(!filter.matches(&post(1, Some(2), true), Some(&hidden)));

        let mut scheduled = post(1, None, true);
        scheduled.pub_date = now + Duration::minutes(5);
        assert!(!filter.matches(&scheduled, None));
    }
}
