//! Profile rows and the completeness filter

use crate::query::UserNode;

/// CSV header row, in column order
pub const CSV_HEADER: [&str; 4] = ["login", "location", "bio", "createdAt"];

/// A complete user profile. Every field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub login: String,
    pub location: String,
    pub bio: String,
    pub created_at: String,
}

impl Record {
    /// Keep only nodes where all four fields are present and non-empty
    pub fn from_node(node: UserNode) -> Option<Self> {
        if !is_complete(&node) {
            return None;
        }
        Some(Self {
            login: node.login?,
            location: node.location?,
            bio: node.bio?,
            created_at: node.created_at?,
        })
    }

    /// Fields in [`CSV_HEADER`] order
    pub fn fields(&self) -> [&str; 4] {
        [&self.login, &self.location, &self.bio, &self.created_at]
    }
}

/// Completeness predicate. Whitespace-only values count as present.
pub fn is_complete(node: &UserNode) -> bool {
    [&node.login, &node.location, &node.bio, &node.created_at]
        .iter()
        .all(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
}
