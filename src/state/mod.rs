//! State module for page records
//!
//! # Components
//!
//! - `PageState`: whether a stored page is a stub or has been crawled

mod page_state;

pub use page_state::PageState;
