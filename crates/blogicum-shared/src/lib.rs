//! # Blogicum Shared
//!
//! Form and response shapes shared by the web layer, plus pagination.

pub mod dto;
pub mod page;
pub mod response;

pub use page::{Page, PageWindow};
pub use response::{ApiResponse, ErrorResponse};
