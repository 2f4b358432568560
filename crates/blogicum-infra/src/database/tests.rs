use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait, Value};

use blogicum_core::domain::NewUser;
use blogicum_core::error::RepoError;
use blogicum_core::feed::{FeedOptions, PostFilter};
use blogicum_core::ports::{BaseRepository, PostRepository, UserRepository};

use super::entity::{post, user};
use super::postgres_repo::{PostgresPostRepository, PostgresUserRepository, filtered_posts};

fn post_model(id: i32) -> post::Model {
    let now = Utc::now();
    post::Model {
        id,
        title: "Test Post".to_owned(),
        text: "Content".to_owned(),
        pub_date: (now - Duration::hours(1)).into(),
        is_published: true,
        created_at: now.into(),
        author_id: 1,
        location_id: None,
        category_id: Some(2),
        image: None,
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![post_model(5)]])
        .into_connection();

    let repo: &dyn PostRepository = &PostgresPostRepository::new(db);

    let post = repo.find_by_id(5).await.unwrap().unwrap();
    assert_eq!(post.id, 5);
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.category_id, Some(2));
}

#[tokio::test]
async fn test_create_user_returns_assigned_id() {
    let now = Utc::now();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![user::Model {
            id: 12,
            username: "alice".to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            email: "alice@example.com".to_owned(),
            password_hash: "hash".to_owned(),
            created_at: now.into(),
        }]])
        .into_connection();

    let repo: &dyn UserRepository = &PostgresUserRepository::new(db);

    let user = repo
        .create(NewUser::new(
            "alice".to_owned(),
            "alice@example.com".to_owned(),
            "hash".to_owned(),
        ))
        .await
        .unwrap();
    assert_eq!(user.id, 12);
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_delete_missing_row_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo: &dyn PostRepository = &PostgresPostRepository::new(db);

    let result = repo.delete(99).await;
    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_count_matching() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![BTreeMap::from([(
            "num_items",
            Value::BigInt(Some(3)),
        )])]])
        .into_connection();

    let repo: &dyn PostRepository = &PostgresPostRepository::new(db);

    let filter = PostFilter::new(FeedOptions::PUBLIC, Utc::now());
    assert_eq!(repo.count_matching(&filter).await.unwrap(), 3);
}

#[test]
fn test_public_filter_left_joins_categories() {
    let filter = PostFilter::new(FeedOptions::PUBLIC, Utc::now()).by_author(1);
    let sql = filtered_posts(&filter)
        .build(DatabaseBackend::Postgres)
        .to_string();

    assert!(sql.contains(r#"LEFT JOIN "categories""#), "{sql}");
    assert!(sql.contains(r#""posts"."category_id" IS NULL"#), "{sql}");
    assert!(sql.contains(r#""categories"."is_published""#), "{sql}");
    assert!(sql.contains(r#""posts"."author_id" = 1"#), "{sql}");
}

#[test]
fn test_owner_filter_has_no_visibility_conditions() {
    let filter = PostFilter::new(FeedOptions::OWNER, Utc::now()).by_author(1);
    let sql = filtered_posts(&filter)
        .build(DatabaseBackend::Postgres)
        .to_string();

    assert!(!sql.contains("JOIN"), "{sql}");
    assert!(!sql.contains("is_published"), "{sql}");
}
