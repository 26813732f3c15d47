//! URL handling module for Ripple-Search
//!
//! Every URL that reaches the page store passes through [`normalize_url`], so
//! two spellings of the same page share one record and one backlink counter.

mod host;
mod normalize;

pub use host::host_key;
pub use normalize::normalize_url;
