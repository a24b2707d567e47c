//! On-disk layout of repository storage.
//!
//! Repositories live under a single root as bare trees, one directory per
//! owner: `<root>/<owner>/<name>.git` for the code tree and
//! `<root>/<owner>/<name>.wiki.git` for the wiki tree. Path components are
//! lowercased so that lookups are case-insensitive like the rest of the
//! forge.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::repo::{RepoTree, Repository};

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o: {0}")]
    Io(#[from] io::Error),
    #[error("git: {0}")]
    Git(#[from] git2::Error),
}

/// Handle on the storage root.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the given tree of a repository.
    pub fn path(&self, repo: &Repository, tree: RepoTree) -> PathBuf {
        let owner = repo.owner.name.to_lowercase();
        let name = repo.name.to_lowercase();
        let dir = match tree {
            RepoTree::Code => format!("{name}.git"),
            RepoTree::Wiki => format!("{name}.wiki.git"),
        };
        self.root.join(owner).join(dir)
    }

    /// Whether the given tree exists on disk.
    pub fn contains(&self, repo: &Repository, tree: RepoTree) -> bool {
        self.path(repo, tree).is_dir()
    }

    /// Initialize an empty bare tree for a repository, creating parent
    /// directories as needed. Used by push-to-create.
    pub fn init_bare(&self, repo: &Repository, tree: RepoTree) -> Result<PathBuf, Error> {
        let path = self.path(repo, tree);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut opts = git2::RepositoryInitOptions::new();
        opts.bare(true).no_reinit(true);
        git2::Repository::init_opts(&path, &opts)?;

        Ok(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::{Account, AccountId, AccountKind, Visibility};
    use crate::repo::RepoId;

    fn repository(owner: &str, name: &str) -> Repository {
        Repository {
            id: RepoId(1),
            name: name.to_owned(),
            owner: Account {
                id: AccountId(1),
                name: owner.to_owned(),
                email: format!("{owner}@example.com"),
                kind: AccountKind::User,
                visibility: Visibility::Public,
                is_active: true,
                prohibit_login: false,
                keep_email_private: false,
                has_two_factor: false,
            },
            is_private: false,
            is_archived: false,
            is_mirror: false,
            has_wiki: true,
        }
    }

    #[test]
    fn test_paths_are_lowercased() {
        let storage = Storage::new("/srv/hearth");
        let repo = repository("Alice", "Hello-World");

        assert_eq!(
            storage.path(&repo, RepoTree::Code),
            Path::new("/srv/hearth/alice/hello-world.git")
        );
        assert_eq!(
            storage.path(&repo, RepoTree::Wiki),
            Path::new("/srv/hearth/alice/hello-world.wiki.git")
        );
    }

    #[test]
    fn test_init_bare() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path());
        let repo = repository("alice", "project");

        let path = storage.init_bare(&repo, RepoTree::Code).unwrap();
        assert!(path.join("HEAD").is_file());
        assert!(storage.contains(&repo, RepoTree::Code));
        assert!(!storage.contains(&repo, RepoTree::Wiki));
    }
}
