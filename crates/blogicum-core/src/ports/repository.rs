use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    Category, Comment, Location, NewCategory, NewComment, NewLocation, NewPost, NewUser, Post,
    User,
};
use crate::error::RepoError;
use crate::feed::PostFilter;

/// Generic repository trait defining standard CRUD operations.
///
/// `T` is the stored entity, `N` its insertable form.
#[async_trait]
pub trait BaseRepository<T, N, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity and return it with its assigned ID.
    async fn create(&self, new: N) -> Result<T, RepoError>;

    /// Overwrite an existing entity.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID. `RepoError::NotFound` if nothing was deleted.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, NewUser, i32> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<User>, RepoError>;
}

#[async_trait]
pub trait CategoryRepository: BaseRepository<Category, NewCategory, i32> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<Category>, RepoError>;

    /// All categories ordered by title.
    async fn list(&self) -> Result<Vec<Category>, RepoError>;
}

#[async_trait]
pub trait LocationRepository: BaseRepository<Location, NewLocation, i32> {
    async fn find_many(&self, ids: &[i32]) -> Result<Vec<Location>, RepoError>;

    /// All locations ordered by name.
    async fn list(&self) -> Result<Vec<Location>, RepoError>;
}

/// Post repository.
///
/// Matching posts are ordered by `pub_date` descending, ties by ID ascending.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, NewPost, i32> {
    async fn count_matching(&self, filter: &PostFilter) -> Result<u64, RepoError>;

    async fn find_matching(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;
}

#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, NewComment, i32> {
    /// Comments of a post, oldest first.
    async fn find_by_post(&self, post_id: i32) -> Result<Vec<Comment>, RepoError>;

    /// Number of comments per post. Posts without comments may be absent.
    async fn count_by_posts(&self, post_ids: &[i32]) -> Result<HashMap<i32, u64>, RepoError>;
}

/// The entity store: one handle per table.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
}
