//! Hearth standard library.
//!
//! This crate holds the parts of the forge that its daemons share: account
//! and repository metadata, access control primitives, the [`forge::Forge`]
//! interface to the backing data model, the on-disk storage layout, and
//! configuration loading.

pub mod access;
pub mod config;
pub mod forge;
pub mod identity;
#[cfg(feature = "logger")]
pub mod logger;
pub mod repo;
pub mod storage;

/// Re-exports of the types almost every consumer needs.
pub mod prelude {
    pub use crate::access::{AccessMode, AuthMethod, Permission, Session};
    pub use crate::identity::{Account, AccountId, AccountKind, Visibility};
    pub use crate::repo::{RepoId, RepoTree, Repository};
    pub use crate::storage::Storage;
}
