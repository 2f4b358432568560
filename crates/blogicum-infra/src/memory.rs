//! In-memory entity store - used by tests and when no database is configured.
//!
//! Mirrors the relational schema: unique usernames and slugs, foreign keys
//! checked on write, CASCADE from users and posts, SET NULL from categories
//! and locations. Data is lost on process restart.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use blogicum_core::domain::{
    Category, Comment, Location, NewCategory, NewComment, NewLocation, NewPost, NewUser, Post,
    User,
};
use blogicum_core::error::RepoError;
use blogicum_core::feed::PostFilter;
use blogicum_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, LocationRepository, PostRepository,
    Repositories, UserRepository,
};

/// Rows keyed by an auto-increment id.
struct Table<T> {
    rows: BTreeMap<i32, T>,
    last_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T: Clone> Table<T> {
    fn get(&self, id: i32) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn contains(&self, id: i32) -> bool {
        self.rows.contains_key(&id)
    }

    fn insert(&mut self, build: impl FnOnce(i32) -> T) -> T {
        self.last_id += 1;
        let row = build(self.last_id);
        self.rows.insert(self.last_id, row.clone());
        row
    }

    fn replace(&mut self, id: i32, row: T) -> Result<T, RepoError> {
        let slot = self.rows.get_mut(&id).ok_or(RepoError::NotFound)?;
        *slot = row.clone();
        Ok(row)
    }

    fn remove(&mut self, id: i32) -> Result<T, RepoError> {
        self.rows.remove(&id).ok_or(RepoError::NotFound)
    }

    fn many(&self, ids: &[i32]) -> Vec<T> {
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    categories: Table<Category>,
    locations: Table<Location>,
    posts: Table<Post>,
    comments: Table<Comment>,
}

impl Tables {
    fn check_username(&self, username: &str, own_id: Option<i32>) -> Result<(), RepoError> {
        let taken = self
            .users
            .rows
            .values()
            .any(|u| u.username == username && Some(u.id) != own_id);
        if taken {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        Ok(())
    }

    fn check_slug(&self, slug: &str, own_id: Option<i32>) -> Result<(), RepoError> {
        let taken = self
            .categories
            .rows
            .values()
            .any(|c| c.slug == slug && Some(c.id) != own_id);
        if taken {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        Ok(())
    }

    fn check_post_refs(
        &self,
        author_id: i32,
        category_id: Option<i32>,
        location_id: Option<i32>,
    ) -> Result<(), RepoError> {
        let dangling = !self.users.contains(author_id)
            || category_id.is_some_and(|id| !self.categories.contains(id))
            || location_id.is_some_and(|id| !self.locations.contains(id));
        if dangling {
            return Err(RepoError::Constraint(
                "Referenced entity does not exist".to_string(),
            ));
        }
        Ok(())
    }

    fn check_comment_refs(&self, author_id: i32, post_id: i32) -> Result<(), RepoError> {
        if !self.users.contains(author_id) || !self.posts.contains(post_id) {
            return Err(RepoError::Constraint(
                "Referenced entity does not exist".to_string(),
            ));
        }
        Ok(())
    }

    fn matching_posts(&self, filter: &PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .rows
            .values()
            .filter(|post| {
                let category = post.category_id.and_then(|id| self.categories.rows.get(&id));
                filter.matches(post, category)
            })
            .collect();
        posts.sort_by_key(|post| (Reverse(post.pub_date), post.id));
        posts
    }
}

/// A complete entity store behind one async `RwLock`.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All five repositories backed by this store.
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            users: self.clone(),
            categories: self.clone(),
            locations: self.clone(),
            posts: self.clone(),
            comments: self.clone(),
        }
    }
}

#[async_trait]
impl BaseRepository<User, NewUser, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(id))
    }

    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_username(&new.username, None)?;
        Ok(tables.users.insert(|id| User {
            id,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        }))
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_username(&user.username, Some(user.id))?;
        tables.users.replace(user.id, user)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.users.remove(id)?;

        let doomed_posts: Vec<i32> = tables
            .posts
            .rows
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        tables.posts.rows.retain(|_, p| p.author_id != id);
        tables
            .comments
            .rows
            .retain(|_, c| c.author_id != id && !doomed_posts.contains(&c.post_id));
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<User>, RepoError> {
        Ok(self.tables.read().await.users.many(ids))
    }
}

#[async_trait]
impl BaseRepository<Category, NewCategory, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Category>, RepoError> {
        Ok(self.tables.read().await.categories.get(id))
    }

    async fn create(&self, new: NewCategory) -> Result<Category, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_slug(&new.slug, None)?;
        Ok(tables.categories.insert(|id| Category {
            id,
            title: new.title,
            description: new.description,
            slug: new.slug,
            is_published: new.is_published,
            created_at: Utc::now(),
        }))
    }

    async fn update(&self, category: Category) -> Result<Category, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_slug(&category.slug, Some(category.id))?;
        tables.categories.replace(category.id, category)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.categories.remove(id)?;
        for post in tables.posts.rows.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .rows
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<Category>, RepoError> {
        Ok(self.tables.read().await.categories.many(ids))
    }

    async fn list(&self) -> Result<Vec<Category>, RepoError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.rows.values().cloned().collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }
}

#[async_trait]
impl BaseRepository<Location, NewLocation, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Location>, RepoError> {
        Ok(self.tables.read().await.locations.get(id))
    }

    async fn create(&self, new: NewLocation) -> Result<Location, RepoError> {
        let mut tables = self.tables.write().await;
        Ok(tables.locations.insert(|id| Location {
            id,
            name: new.name,
            is_published: new.is_published,
            created_at: Utc::now(),
        }))
    }

    async fn update(&self, location: Location) -> Result<Location, RepoError> {
        let mut tables = self.tables.write().await;
        tables.locations.replace(location.id, location)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.locations.remove(id)?;
        for post in tables.posts.rows.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LocationRepository for InMemoryStore {
    async fn find_many(&self, ids: &[i32]) -> Result<Vec<Location>, RepoError> {
        Ok(self.tables.read().await.locations.many(ids))
    }

    async fn list(&self) -> Result<Vec<Location>, RepoError> {
        let tables = self.tables.read().await;
        let mut locations: Vec<Location> = tables.locations.rows.values().cloned().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }
}

#[async_trait]
impl BaseRepository<Post, NewPost, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(id))
    }

    async fn create(&self, new: NewPost) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_post_refs(new.author_id, new.category_id, new.location_id)?;
        Ok(tables.posts.insert(|id| Post {
            id,
            title: new.title,
            text: new.text,
            pub_date: new.pub_date,
            is_published: new.is_published,
            created_at: Utc::now(),
            author_id: new.author_id,
            location_id: new.location_id,
            category_id: new.category_id,
            image: new.image,
        }))
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_post_refs(post.author_id, post.category_id, post.location_id)?;
        tables.posts.replace(post.id, post)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.posts.remove(id)?;
        tables.comments.rows.retain(|_, c| c.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn count_matching(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.matching_posts(filter).len() as u64)
    }

    async fn find_matching(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .matching_posts(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Comment, NewComment, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(id))
    }

    async fn create(&self, new: NewComment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_comment_refs(new.author_id, new.post_id)?;
        Ok(tables.comments.insert(|id| Comment {
            id,
            text: new.text,
            created_at: Utc::now(),
            author_id: new.author_id,
            post_id: new.post_id,
        }))
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_comment_refs(comment.author_id, comment.post_id)?;
        tables.comments.replace(comment.id, comment)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        self.tables.write().await.comments.remove(id).map(|_| ())
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn find_by_post(&self, post_id: i32) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .rows
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn count_by_posts(&self, post_ids: &[i32]) -> Result<HashMap<i32, u64>, RepoError> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for comment in tables.comments.rows.values() {
            if post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}
