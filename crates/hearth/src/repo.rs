//! Repository metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::Account;

/// Unique repository identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RepoId(pub i64);

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which git tree of a repository is being addressed.
///
/// Every repository owns up to two bare trees on disk: the code tree and,
/// when the wiki unit is enabled, a separate wiki tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoTree {
    Code,
    Wiki,
}

/// A repository row, as the gateway sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: RepoId,
    pub name: String,
    pub owner: Account,
    pub is_private: bool,
    /// Archived repositories are frozen: readable, never writable.
    pub is_archived: bool,
    /// Mirrors are maintained by the mirror service and reject pushes.
    pub is_mirror: bool,
    /// Whether the wiki unit is enabled.
    pub has_wiki: bool,
}

impl Repository {
    /// The `owner/name` form used in URLs and log lines.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.name, self.name)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner.name, self.name)
    }
}
