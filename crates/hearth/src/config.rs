//! Daemon configuration.
//!
//! Configuration is a single JSON file. Every field has a default so that an
//! empty object is a valid configuration; the `directory` section seeds the
//! in-memory [`Directory`] backend with accounts, repositories and tokens.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::{AccessMode, Permission, TokenScope};
use crate::forge::Directory;
use crate::identity::{Account, AccountId, AccountKind, Visibility};
use crate::repo::{RepoId, RepoTree, Repository};
use crate::storage::Storage;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("directory seed references unknown account '{0}'")]
    UnknownAccount(String),
    #[error("directory seed references unknown repository '{0}'")]
    UnknownRepository(String),
}

/// Log verbosity, as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Address the daemon binds to.
    pub listen: SocketAddr,
    /// Public base URL of the forge, exposed to hooks.
    pub root_url: String,
    /// Realm advertised in basic-auth challenges.
    pub realm: String,
    /// Root directory of the repository storage.
    pub storage: PathBuf,
    pub log: LogLevel,
    pub policy: Policy,
    pub directory: Seed,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ([127, 0, 0, 1], 8280).into(),
            root_url: "http://localhost:8280/".to_owned(),
            realm: "Hearth".to_owned(),
            storage: PathBuf::from("storage"),
            log: LogLevel::default(),
            policy: Policy::default(),
            directory: Seed::default(),
        }
    }
}

impl Config {
    /// Load a configuration from the given path.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(file)?;

        Ok(config)
    }

    /// Storage handle rooted at the configured path.
    pub fn storage(&self) -> Storage {
        Storage::new(self.storage.clone())
    }

    /// Build the seeded directory backend.
    pub fn directory(&self) -> Result<Directory, SeedError> {
        self.directory.build(Some(self.storage()))
    }
}

/// Site-wide access policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policy {
    /// Serve git over HTTP at all.
    pub git_over_http: bool,
    /// Require sign-in even for reads of public repositories.
    pub require_signin_view: bool,
    /// OAuth2 login is enabled; changes the basic-auth challenge realm so
    /// that credential managers fall back to token prompts.
    pub oauth2: bool,
    /// Allow pushes to create missing repositories under user accounts.
    pub push_create_user: bool,
    /// Allow pushes to create missing repositories under organizations.
    pub push_create_org: bool,
    /// The server-side git supports proc-receive push options, so write
    /// checks for pushes are deferred to the receive hooks.
    pub push_options: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            git_over_http: true,
            require_signin_view: false,
            oauth2: false,
            push_create_user: false,
            push_create_org: false,
            push_options: true,
        }
    }
}

/// Seed records for the in-memory directory backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Seed {
    pub accounts: Vec<AccountSeed>,
    pub repositories: Vec<RepositorySeed>,
    pub tokens: Vec<TokenSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountSeed {
    pub name: String,
    pub email: String,
    pub kind: AccountKind,
    pub visibility: Visibility,
    pub password: Option<String>,
    pub active: bool,
    pub prohibit_login: bool,
    pub keep_email_private: bool,
    pub two_factor: bool,
}

impl Default for AccountSeed {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            kind: AccountKind::default(),
            visibility: Visibility::default(),
            password: None,
            active: true,
            prohibit_login: false,
            keep_email_private: false,
            two_factor: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositorySeed {
    pub owner: String,
    pub name: String,
    pub private: bool,
    pub archived: bool,
    pub mirror: bool,
    pub wiki: bool,
    pub collaborators: Vec<CollaboratorSeed>,
}

impl Default for RepositorySeed {
    fn default() -> Self {
        Self {
            owner: String::new(),
            name: String::new(),
            private: false,
            archived: false,
            mirror: false,
            wiki: true,
            collaborators: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollaboratorSeed {
    pub account: String,
    pub code: AccessMode,
    pub wiki: AccessMode,
}

impl Default for CollaboratorSeed {
    fn default() -> Self {
        Self {
            account: String::new(),
            code: AccessMode::Read,
            wiki: AccessMode::Read,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenSeed {
    pub token: String,
    pub account: String,
    pub scope: TokenScope,
    /// `owner/name` path this token is bound to, if any.
    pub repository: Option<String>,
}

impl Default for TokenSeed {
    fn default() -> Self {
        Self {
            token: String::new(),
            account: String::new(),
            scope: TokenScope::Write,
            repository: None,
        }
    }
}

impl Seed {
    /// Materialize the seed into a [`Directory`]. When a storage is given,
    /// bare trees missing on disk are initialized so that every seeded
    /// repository is servable.
    pub fn build(&self, storage: Option<Storage>) -> Result<Directory, SeedError> {
        let directory = match storage.clone() {
            Some(storage) => Directory::with_storage(storage),
            None => Directory::new(),
        };

        for seed in &self.accounts {
            let account = directory.add_account(Account {
                id: AccountId::default(),
                name: seed.name.clone(),
                email: seed.email.clone(),
                kind: seed.kind,
                visibility: seed.visibility,
                is_active: seed.active,
                prohibit_login: seed.prohibit_login,
                keep_email_private: seed.keep_email_private,
                has_two_factor: seed.two_factor,
            });
            if let Some(password) = &seed.password {
                directory.set_password(&account, password);
            }
        }

        for seed in &self.repositories {
            let owner = lookup_account(&directory, &seed.owner)?;
            let repo = directory.add_repository(Repository {
                id: RepoId::default(),
                name: seed.name.clone(),
                owner,
                is_private: seed.private,
                is_archived: seed.archived,
                is_mirror: seed.mirror,
                has_wiki: seed.wiki,
            });
            for collaborator in &seed.collaborators {
                let account = lookup_account(&directory, &collaborator.account)?;
                directory.set_collaborator(
                    &repo,
                    &account,
                    Permission {
                        code: collaborator.code,
                        wiki: collaborator.wiki,
                    },
                );
            }
            if let Some(storage) = &storage {
                let mut trees = vec![RepoTree::Code];
                if seed.wiki {
                    trees.push(RepoTree::Wiki);
                }
                for tree in trees {
                    if !storage.contains(&repo, tree) {
                        if let Err(e) = storage.init_bare(&repo, tree) {
                            log::warn!(
                                target: "config",
                                "Failed to initialize storage for {repo}: {e}"
                            );
                        }
                    }
                }
            }
        }

        for seed in &self.tokens {
            let account = lookup_account(&directory, &seed.account)?;
            let repository = match &seed.repository {
                Some(path) => Some(lookup_repository(&directory, path)?.id),
                None => None,
            };
            directory.add_token(&seed.token, &account, seed.scope, repository);
        }

        Ok(directory)
    }
}

fn lookup_account(directory: &Directory, name: &str) -> Result<Account, SeedError> {
    use crate::forge::Forge as _;

    directory
        .account(name)
        .ok()
        .flatten()
        .ok_or_else(|| SeedError::UnknownAccount(name.to_owned()))
}

fn lookup_repository(directory: &Directory, path: &str) -> Result<Repository, SeedError> {
    use crate::forge::Forge as _;

    let unknown = || SeedError::UnknownRepository(path.to_owned());
    let (owner, name) = path.split_once('/').ok_or_else(unknown)?;
    let owner = lookup_account(directory, owner)
        .map_err(|_| unknown())?;
    directory
        .repository(&owner, name)
        .ok()
        .flatten()
        .ok_or_else(unknown)
}
