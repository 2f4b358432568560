//! # Blogicum Core
//!
//! The domain layer of Blogicum.
//! Entities, the post visibility rules, feed composition and the mutation
//! service live here, with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod feed;
pub mod ports;
pub mod service;
pub mod visibility;

pub use error::{DomainError, RepoError, ValidationErrors};
pub use feed::{Feed, FeedOptions, PostFilter, QueryComposer};
pub use service::{AccountService, BlogService};
pub use visibility::{AuthorizationResult, Redirect, Viewer};
