//! Narrow interface to the forge data model.
//!
//! The gateway never talks to the database directly; everything it needs to
//! know about accounts, repositories, credentials and permissions goes
//! through [`Forge`]. Deployments back this with their own store; the
//! in-memory [`Directory`] implementation is used by the bundled daemon and
//! by tests.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::access::{AccessMode, AuthMethod, Permission, Session, TaskId, TokenScope};
use crate::identity::{Account, AccountId};
use crate::repo::{RepoId, RepoTree, Repository};
use crate::storage;
use crate::storage::Storage;

#[derive(Debug, Error)]
pub enum Error {
    /// The backing store failed; maps to a generic server error upstream.
    #[error("forge backend: {0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
    #[error("storage: {0}")]
    Storage(#[from] storage::Error),
    #[error("repository creation failed: {0}")]
    Create(String),
}

/// Credentials presented with a request, already decoded from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

/// What a task-scoped automation token is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskContext {
    /// The repository the task runs against.
    pub repository: RepoId,
    /// Tasks triggered by fork pull-requests are capped at read access.
    pub is_fork_pull_request: bool,
}

/// Point-in-time reads against the forge data model.
///
/// Implementations must be safe to call from concurrent requests; no method
/// is expected to provide cross-call consistency.
pub trait Forge: Send + Sync {
    /// Look up an account by name, case-insensitively.
    fn account(&self, name: &str) -> Result<Option<Account>, Error>;

    /// Look up a repository of `owner` by name, case-insensitively.
    fn repository(&self, owner: &Account, name: &str) -> Result<Option<Repository>, Error>;

    /// Look up a redirect record left behind by a rename or transfer.
    /// Returns the new `owner/name` path.
    fn redirect(&self, owner: &Account, name: &str) -> Result<Option<String>, Error>;

    /// Resolve credentials to a session. `None` means the credentials are
    /// invalid; distinguishing why is deliberately not possible.
    fn authenticate(&self, credentials: &Credentials) -> Result<Option<Session>, Error>;

    /// Effective permission of the session's account on `repo`.
    fn permission(&self, repo: &Repository, session: &Session) -> Result<Permission, Error>;

    /// Context of a running automation task.
    fn task(&self, id: TaskId) -> Result<Option<TaskContext>, Error>;

    /// Create `owner/name` on behalf of `doer` for push-to-create. The
    /// creation business logic lives behind this callback.
    fn push_create(&self, doer: &Account, owner: &Account, name: &str)
        -> Result<Repository, Error>;

    /// HTML meta page answering `?go-get=1` probes, if the forge serves one.
    fn go_get_meta(&self, _owner: &str, _name: &str) -> Option<String> {
        None
    }
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    repositories: HashMap<(AccountId, String), Repository>,
    redirects: HashMap<(AccountId, String), String>,
    passwords: HashMap<AccountId, String>,
    tokens: HashMap<String, TokenEntry>,
    tasks: HashMap<TaskId, TaskContext>,
    collaborations: HashMap<(RepoId, AccountId), Permission>,
    next_account: i64,
    next_repo: i64,
}

struct TokenEntry {
    account: AccountId,
    method: AuthMethod,
}

/// In-memory [`Forge`] implementation.
///
/// Lookups take a read lock only; there is no cross-request state beyond the
/// records themselves.
pub struct Directory {
    inner: RwLock<Inner>,
    storage: Option<Storage>,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            inner: RwLock::default(),
            storage: None,
        }
    }

    /// A directory that also materializes bare trees on disk when
    /// repositories are created through it.
    pub fn with_storage(storage: Storage) -> Self {
        Self {
            inner: RwLock::default(),
            storage: Some(storage),
        }
    }

    /// Register an account. The `id` field is assigned by the directory.
    pub fn add_account(&self, account: Account) -> Account {
        let mut inner = self.inner.write().expect("directory lock");
        inner.next_account += 1;

        let account = Account {
            id: AccountId(inner.next_account),
            ..account
        };
        inner
            .accounts
            .insert(account.name.to_lowercase(), account.clone());
        account
    }

    /// Register a repository. The `id` field is assigned by the directory.
    pub fn add_repository(&self, repo: Repository) -> Repository {
        let mut inner = self.inner.write().expect("directory lock");
        inner.next_repo += 1;

        let repo = Repository {
            id: RepoId(inner.next_repo),
            ..repo
        };
        inner
            .repositories
            .insert((repo.owner.id, repo.name.to_lowercase()), repo.clone());
        repo
    }

    /// Leave a redirect from `owner/<old>` to the `target` path.
    pub fn add_redirect(&self, owner: &Account, old: &str, target: &str) {
        let mut inner = self.inner.write().expect("directory lock");
        inner
            .redirects
            .insert((owner.id, old.to_lowercase()), target.to_owned());
    }

    pub fn set_password(&self, account: &Account, secret: &str) {
        let mut inner = self.inner.write().expect("directory lock");
        inner.passwords.insert(account.id, secret.to_owned());
    }

    /// Mint a personal access token.
    pub fn add_token(
        &self,
        secret: &str,
        account: &Account,
        scope: TokenScope,
        repository: Option<RepoId>,
    ) {
        let mut inner = self.inner.write().expect("directory lock");
        inner.tokens.insert(
            secret.to_owned(),
            TokenEntry {
                account: account.id,
                method: AuthMethod::Token { scope, repository },
            },
        );
    }

    /// Mint an ephemeral token for a running automation task.
    pub fn add_task(&self, secret: &str, account: &Account, id: TaskId, context: TaskContext) {
        let mut inner = self.inner.write().expect("directory lock");
        inner.tokens.insert(
            secret.to_owned(),
            TokenEntry {
                account: account.id,
                method: AuthMethod::Task { id },
            },
        );
        inner.tasks.insert(id, context);
    }

    /// Grant `account` an explicit permission on `repo`.
    pub fn set_collaborator(&self, repo: &Repository, account: &Account, permission: Permission) {
        let mut inner = self.inner.write().expect("directory lock");
        inner
            .collaborations
            .insert((repo.id, account.id), permission);
    }

    fn account_by_id(inner: &Inner, id: AccountId) -> Option<Account> {
        inner.accounts.values().find(|a| a.id == id).cloned()
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl Forge for Directory {
    fn account(&self, name: &str) -> Result<Option<Account>, Error> {
        let inner = self.inner.read().expect("directory lock");
        Ok(inner.accounts.get(&name.to_lowercase()).cloned())
    }

    fn repository(&self, owner: &Account, name: &str) -> Result<Option<Repository>, Error> {
        let inner = self.inner.read().expect("directory lock");
        Ok(inner
            .repositories
            .get(&(owner.id, name.to_lowercase()))
            .cloned())
    }

    fn redirect(&self, owner: &Account, name: &str) -> Result<Option<String>, Error> {
        let inner = self.inner.read().expect("directory lock");
        Ok(inner
            .redirects
            .get(&(owner.id, name.to_lowercase()))
            .cloned())
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<Option<Session>, Error> {
        let inner = self.inner.read().expect("directory lock");

        // Tokens are accepted in either basic-auth field, so that clients
        // which insist on a username can pass anything alongside them.
        for secret in [&credentials.secret, &credentials.username] {
            if let Some(entry) = inner.tokens.get(secret.as_str()) {
                if let Some(account) = Self::account_by_id(&inner, entry.account) {
                    return Ok(Some(Session {
                        account,
                        method: entry.method.clone(),
                    }));
                }
            }
        }

        let Some(account) = inner.accounts.get(&credentials.username.to_lowercase()) else {
            return Ok(None);
        };
        match inner.passwords.get(&account.id) {
            Some(password) if *password == credentials.secret => Ok(Some(Session {
                account: account.clone(),
                method: AuthMethod::Password,
            })),
            _ => Ok(None),
        }
    }

    fn permission(&self, repo: &Repository, session: &Session) -> Result<Permission, Error> {
        let inner = self.inner.read().expect("directory lock");
        let account = &session.account;

        if account.id == repo.owner.id {
            return Ok(Permission::uniform(AccessMode::Admin));
        }
        if let Some(perm) = inner.collaborations.get(&(repo.id, account.id)) {
            return Ok(*perm);
        }
        if !repo.is_private {
            return Ok(Permission::uniform(AccessMode::Read));
        }
        Ok(Permission::none())
    }

    fn task(&self, id: TaskId) -> Result<Option<TaskContext>, Error> {
        let inner = self.inner.read().expect("directory lock");
        Ok(inner.tasks.get(&id).copied())
    }

    fn push_create(
        &self,
        doer: &Account,
        owner: &Account,
        name: &str,
    ) -> Result<Repository, Error> {
        let repo = self.add_repository(Repository {
            id: RepoId::default(),
            name: name.to_owned(),
            owner: owner.clone(),
            // Implicitly created repositories start out private.
            is_private: true,
            is_archived: false,
            is_mirror: false,
            has_wiki: true,
        });
        if doer.id != owner.id {
            self.set_collaborator(&repo, doer, Permission::uniform(AccessMode::Admin));
        }
        if let Some(storage) = &self.storage {
            storage.init_bare(&repo, RepoTree::Code)?;
        }
        Ok(repo)
    }
}
