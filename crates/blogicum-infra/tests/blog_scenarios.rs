//! End-to-end behaviour of the blog service over the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use blogicum_core::domain::{
    CommentDraft, ImageChange, NewCategory, NewUser, PostDraft, ProfileChanges, User,
};
use blogicum_core::ports::{BaseRepository, Repositories};
use blogicum_core::service::Registration;
use blogicum_core::{
    AccountService, AuthorizationResult, BlogService, DomainError, Redirect, Viewer,
};
use blogicum_infra::{Argon2PasswordService, InMemoryStore, JwtConfig, JwtTokenService};

struct World {
    repos: Repositories,
    blog: BlogService,
    alice: User,
    bob: User,
}

impl World {
    async fn new() -> Self {
        let repos = Arc::new(InMemoryStore::new()).repositories();
        let alice = add_user(&repos, "alice").await;
        let bob = add_user(&repos, "bob").await;
        Self {
            blog: BlogService::new(repos.clone()),
            repos,
            alice,
            bob,
        }
    }

    fn as_alice(&self) -> Viewer {
        Viewer::User(self.alice.id)
    }

    fn as_bob(&self) -> Viewer {
        Viewer::User(self.bob.id)
    }

    async fn category(&self, slug: &str, is_published: bool) -> i32 {
        self.repos
            .categories
            .create(NewCategory {
                title: slug.to_uppercase(),
                description: String::new(),
                slug: slug.to_string(),
                is_published,
            })
            .await
            .unwrap()
            .id
    }

    async fn post(&self, viewer: Viewer, draft: PostDraft) -> i32 {
        let (post, _) = self.blog.create_post(viewer, draft).await.unwrap();
        post.id
    }

    async fn comment(&self, viewer: Viewer, post_id: i32, text: &str) -> i32 {
        self.blog
            .add_comment(viewer, post_id, comment(text), Utc::now())
            .await
            .unwrap();
        self.repos
            .comments
            .find_by_post(post_id)
            .await
            .unwrap()
            .last()
            .unwrap()
            .id
    }
}

async fn add_user(repos: &Repositories, username: &str) -> User {
    repos
        .users
        .create(NewUser::new(
            username.to_string(),
            format!("{username}@example.com"),
            "hash".to_string(),
        ))
        .await
        .unwrap()
}

fn draft(title: &str, pub_date: DateTime<Utc>) -> PostDraft {
    PostDraft {
        title: title.to_string(),
        text: "Some text".to_string(),
        pub_date: Some(pub_date),
        is_published: true,
        location_id: None,
        category_id: None,
        image: ImageChange::Keep,
    }
}

fn comment(text: &str) -> CommentDraft {
    CommentDraft {
        text: text.to_string(),
    }
}

async fn feed_titles(feed: &blogicum_core::Feed) -> Vec<String> {
    feed.fetch(0, 100)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.post.title)
        .collect()
}

#[tokio::test]
async fn test_scheduled_post_is_hidden_until_its_pub_date() {
    let world = World::new().await;
    let now = Utc::now();
    let tomorrow = now + Duration::days(1);
    let post_id = world.post(world.as_alice(), draft("Later", tomorrow)).await;

    let err = world
        .blog
        .post_detail(world.as_bob(), post_id, now)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(world.blog.post_detail(world.as_alice(), post_id, now).await.is_ok());
    assert!(feed_titles(&world.blog.feeds().public_feed(now)).await.is_empty());

    let later = tomorrow + Duration::seconds(1);
    assert!(world.blog.post_detail(world.as_bob(), post_id, later).await.is_ok());
    assert_eq!(
        feed_titles(&world.blog.feeds().public_feed(later)).await,
        vec!["Later"]
    );
}

#[tokio::test]
async fn test_create_post_requires_authentication_and_forces_author() {
    let world = World::new().await;
    let now = Utc::now();

    let err = world
        .blog
        .create_post(Viewer::Anonymous, draft("Nope", now))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::AuthenticationRequired));

    let (post, redirect) = world
        .blog
        .create_post(world.as_bob(), draft("Mine", now))
        .await
        .unwrap();
    assert_eq!(post.author_id, world.bob.id);
    assert_eq!(redirect, Redirect::Profile("bob".to_string()));
}

#[tokio::test]
async fn test_create_post_rejects_unknown_category() {
    let world = World::new().await;
    let mut bad = draft("Lost", Utc::now());
    bad.category_id = Some(404);

    match world.blog.create_post(world.as_alice(), bad).await {
        Err(DomainError::Validation(errors)) => assert!(errors.contains("category")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_author_edit_is_redirected_without_changes() {
    let world = World::new().await;
    let now = Utc::now();
    let post_id = world.post(world.as_alice(), draft("Original", now)).await;

    let result = world
        .blog
        .edit_post(world.as_bob(), post_id, draft("Hijacked", now))
        .await
        .unwrap();
    assert_eq!(
        result,
        AuthorizationResult::DeniedRedirect(Redirect::PostDetail(post_id))
    );

    let stored = world.repos.posts.find_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Original");
}

#[tokio::test]
async fn test_author_edit_preserves_author_and_creation_time() {
    let world = World::new().await;
    let now = Utc::now();
    let post_id = world.post(world.as_alice(), draft("Original", now)).await;
    let before = world.repos.posts.find_by_id(post_id).await.unwrap().unwrap();

    let result = world
        .blog
        .edit_post(world.as_alice(), post_id, draft("Edited", now))
        .await
        .unwrap();
    assert_eq!(
        result,
        AuthorizationResult::Allowed(Redirect::PostDetail(post_id))
    );

    let after = world.repos.posts.find_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(after.title, "Edited");
    assert_eq!(after.author_id, world.alice.id);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test]
async fn test_invalid_edit_writes_nothing() {
    let world = World::new().await;
    let now = Utc::now();
    let post_id = world.post(world.as_alice(), draft("Original", now)).await;

    let err = world
        .blog
        .edit_post(world.as_alice(), post_id, draft("", now))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let stored = world.repos.posts.find_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Original");
}

#[tokio::test]
async fn test_deleting_a_post_twice_reports_not_found() {
    let world = World::new().await;
    let post_id = world.post(world.as_alice(), draft("Short-lived", Utc::now())).await;
    let comment_id = world.comment(world.as_bob(), post_id, "First!").await;

    let result = world
        .blog
        .delete_post(world.as_alice(), post_id)
        .await
        .unwrap();
    assert_eq!(
        result,
        AuthorizationResult::Allowed(Redirect::Profile("alice".to_string()))
    );
    assert!(
        world
            .repos
            .comments
            .find_by_id(comment_id)
            .await
            .unwrap()
            .is_none()
    );

    let err = world
        .blog
        .delete_post(world.as_alice(), post_id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_non_author_cannot_delete_a_comment() {
    let world = World::new().await;
    let post_id = world.post(world.as_alice(), draft("Post", Utc::now())).await;
    let comment_id = world.comment(world.as_alice(), post_id, "Mine").await;

    let result = world
        .blog
        .delete_comment(world.as_bob(), post_id, comment_id)
        .await
        .unwrap();
    assert_eq!(
        result,
        AuthorizationResult::DeniedRedirect(Redirect::PostDetail(post_id))
    );
    assert!(
        world
            .repos
            .comments
            .find_by_id(comment_id)
            .await
            .unwrap()
            .is_some()
    );

    let result = world
        .blog
        .delete_comment(world.as_alice(), post_id, comment_id)
        .await
        .unwrap();
    assert_eq!(
        result,
        AuthorizationResult::Allowed(Redirect::Profile("alice".to_string()))
    );
}

#[tokio::test]
async fn test_comment_addressed_through_another_post_is_not_found() {
    let world = World::new().await;
    let now = Utc::now();
    let first = world.post(world.as_alice(), draft("First", now)).await;
    let second = world.post(world.as_alice(), draft("Second", now)).await;
    let comment_id = world.comment(world.as_alice(), first, "On first").await;

    let err = world
        .blog
        .edit_comment(world.as_alice(), second, comment_id, comment("moved"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = world
        .blog
        .comment_for_edit(world.as_alice(), second, comment_id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_cannot_comment_on_an_invisible_post() {
    let world = World::new().await;
    let mut hidden = draft("Hidden", Utc::now());
    hidden.is_published = false;
    let post_id = world.post(world.as_alice(), hidden).await;

    let err = world
        .blog
        .add_comment(world.as_bob(), post_id, comment("hello"), Utc::now())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = world
        .blog
        .add_comment(Viewer::Anonymous, post_id, comment("hello"), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::AuthenticationRequired));
}

#[tokio::test]
async fn test_detail_lists_comments_oldest_first() {
    let world = World::new().await;
    let post_id = world.post(world.as_alice(), draft("Chatty", Utc::now())).await;
    world.comment(world.as_bob(), post_id, "one").await;
    world.comment(world.as_alice(), post_id, "two").await;

    let detail = world
        .blog
        .post_detail(Viewer::Anonymous, post_id, Utc::now())
        .await
        .unwrap();
    let texts: Vec<&str> = detail
        .comments
        .iter()
        .map(|c| c.comment.text.as_str())
        .collect();
    assert_eq!(texts, vec!["one", "two"]);
    assert_eq!(detail.comments[0].author.username, "bob");
}

#[tokio::test]
async fn test_author_feed_is_a_superset_for_the_author() {
    let world = World::new().await;
    let now = Utc::now();
    let hidden_category = world.category("drafts", false).await;

    world.post(world.as_alice(), draft("Public", now - Duration::hours(2))).await;
    let mut unpublished = draft("Unpublished", now - Duration::hours(1));
    unpublished.is_published = false;
    world.post(world.as_alice(), unpublished).await;
    world.post(world.as_alice(), draft("Scheduled", now + Duration::days(3))).await;
    let mut in_hidden = draft("In hidden category", now - Duration::hours(3));
    in_hidden.category_id = Some(hidden_category);
    world.post(world.as_alice(), in_hidden).await;

    let (_, own) = world
        .blog
        .feeds()
        .author_feed("alice", world.as_alice(), now)
        .await
        .unwrap();
    let (_, public) = world
        .blog
        .feeds()
        .author_feed("alice", world.as_bob(), now)
        .await
        .unwrap();

    assert_eq!(
        feed_titles(&own).await,
        vec!["Scheduled", "Unpublished", "Public", "In hidden category"]
    );
    assert_eq!(feed_titles(&public).await, vec!["Public"]);
    assert_eq!(own.count().await.unwrap(), 4);
    assert_eq!(public.count().await.unwrap(), 1);

    let err = world
        .blog
        .feeds()
        .author_feed("nobody", world.as_bob(), now)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_unpublished_category_feed_is_not_found() {
    let world = World::new().await;
    world.category("secret", false).await;
    let travel = world.category("travel", true).await;
    let mut post = draft("Trip", Utc::now() - Duration::hours(1));
    post.category_id = Some(travel);
    world.post(world.as_alice(), post).await;

    let err = world
        .blog
        .feeds()
        .category_feed("secret", Utc::now())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let err = world
        .blog
        .feeds()
        .category_feed("missing", Utc::now())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let (category, feed) = world
        .blog
        .feeds()
        .category_feed("travel", Utc::now())
        .await
        .unwrap();
    assert_eq!(category.id, travel);
    assert_eq!(feed_titles(&feed).await, vec!["Trip"]);
}

#[tokio::test]
async fn test_public_feed_annotates_comment_counts_and_pages() {
    let world = World::new().await;
    let now = Utc::now();
    for i in 0..12 {
        world
            .post(world.as_alice(), draft(&format!("Post {i}"), now - Duration::minutes(i + 1)))
            .await;
    }
    let (newest, _) = world
        .blog
        .create_post(world.as_alice(), draft("Newest", now))
        .await
        .unwrap();
    world.comment(world.as_bob(), newest.id, "a").await;
    world.comment(world.as_bob(), newest.id, "b").await;

    let feed = world.blog.feeds().public_feed(Utc::now());
    assert_eq!(feed.count().await.unwrap(), 13);

    let first = feed.fetch(0, 10).await.unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first[0].post.title, "Newest");
    assert_eq!(first[0].comment_count, Some(2));
    assert_eq!(first[1].comment_count, Some(0));
    assert_eq!(first[0].author.username, "alice");

    assert_eq!(feed.fetch(10, 10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_profile_username_must_stay_unique() {
    let world = World::new().await;
    let changes = ProfileChanges {
        first_name: "Robert".to_string(),
        last_name: String::new(),
        username: "alice".to_string(),
        email: "bob@example.com".to_string(),
    };

    match world.blog.edit_profile(world.as_bob(), changes.clone()).await {
        Err(DomainError::Validation(errors)) => assert!(errors.contains("username")),
        other => panic!("unexpected result: {other:?}"),
    }

    let updated = world
        .blog
        .edit_profile(
            world.as_bob(),
            ProfileChanges {
                username: "bobby".to_string(),
                ..changes
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.username, "bobby");
    assert_eq!(updated.first_name, "Robert");
    assert_eq!(updated.id, world.bob.id);
}

fn accounts(repos: &Repositories) -> AccountService {
    AccountService::new(
        repos.users.clone(),
        Arc::new(Argon2PasswordService::new()),
        Arc::new(JwtTokenService::new(JwtConfig {
            secret: "test-secret".to_string(),
            ..JwtConfig::default()
        })),
    )
}

#[tokio::test]
async fn test_register_then_login() {
    let world = World::new().await;
    let accounts = accounts(&world.repos);

    let session = accounts
        .register(Registration {
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password: "long-enough".to_string(),
            password_confirmation: "long-enough".to_string(),
        })
        .await
        .unwrap();
    let claims = accounts.tokens().validate_token(&session.token).unwrap();
    assert_eq!(claims.user_id, session.user.id);

    assert!(accounts.login("carol", "long-enough").await.is_ok());
    assert!(matches!(
        accounts.login("carol", "wrong-password").await,
        Err(DomainError::Validation(_))
    ));
    assert!(matches!(
        accounts.login("nobody", "long-enough").await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_register_rejects_taken_username() {
    let world = World::new().await;
    let accounts = accounts(&world.repos);

    let result = accounts
        .register(Registration {
            username: "alice".to_string(),
            email: String::new(),
            password: "long-enough".to_string(),
            password_confirmation: "long-enough".to_string(),
        })
        .await;
    match result {
        Err(DomainError::Validation(errors)) => assert!(errors.contains("username")),
        other => panic!("unexpected result: {other:?}"),
    }
}
