/// Page state definitions for the page store
///
/// A page row is either a stub (known only as a link target) or crawled
/// (its content has been fetched at least once).
use std::fmt;

/// Represents how much the store knows about a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Page exists only because another page linked to it
    Stub,

    /// Page has been fetched and its content extracted
    Crawled,
}

impl PageState {
    /// Returns true if the page still awaits its first successful fetch
    pub fn is_stub(&self) -> bool {
        matches!(self, Self::Stub)
    }

    /// Converts the page state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::Crawled => "crawled",
        }
    }

    /// Parses a page state from a database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "stub" => Some(Self::Stub),
            "crawled" => Some(Self::Crawled),
            _ => None,
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> [Self; 2] {
        [Self::Stub, Self::Crawled]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
