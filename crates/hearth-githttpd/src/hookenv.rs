//! Environment passed to git hooks.
//!
//! Hook scripts are an external interface: they receive request context as
//! environment variables on the spawned `git` subprocess. Internally the
//! same data is carried as [`HookEnv`] and only rendered to `KEY=VALUE`
//! pairs at the last moment before spawning.

use hearth::access::AccessMode;
use hearth::identity::Account;
use hearth::repo::RepoId;

/// Variable names consumed by hook scripts.
pub mod vars {
    pub const REPO_ID: &str = "HEARTH_REPO_ID";
    pub const REPO_USER_NAME: &str = "HEARTH_REPO_USER_NAME";
    pub const REPO_NAME: &str = "HEARTH_REPO_NAME";
    pub const REPO_IS_WIKI: &str = "HEARTH_REPO_IS_WIKI";
    pub const PUSHER_ID: &str = "HEARTH_PUSHER_ID";
    pub const PUSHER_NAME: &str = "HEARTH_PUSHER_NAME";
    pub const PUSHER_EMAIL: &str = "HEARTH_PUSHER_EMAIL";
    pub const ROOT_URL: &str = "HEARTH_ROOT_URL";
    /// Access level hooks must enforce when the pre-check was deferred
    /// (proc-receive push options, task-scoped tokens).
    pub const ACTION_PERM: &str = "HEARTH_ACTION_PERM";
    /// Set on RPC exchanges so hooks can tell how they were invoked.
    pub const SSH_ORIGINAL_COMMAND: &str = "SSH_ORIGINAL_COMMAND";
    pub const GIT_PROTOCOL: &str = "GIT_PROTOCOL";
}

/// Identity of the authenticated pusher, as exposed to hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pusher {
    pub id: i64,
    pub name: String,
    /// `None` when the account keeps its email private; the variable is
    /// omitted entirely in that case.
    pub email: Option<String>,
}

impl From<&Account> for Pusher {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.0,
            name: account.name.clone(),
            email: (!account.keep_email_private).then(|| account.email.clone()),
        }
    }
}

/// Typed request context for hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEnv {
    pub owner: String,
    pub repo_name: String,
    pub is_wiki: bool,
    pub root_url: String,
    pub repo_id: Option<RepoId>,
    pub pusher: Option<Pusher>,
    pub deferred_access: Option<AccessMode>,
}

impl HookEnv {
    pub fn new(owner: &str, repo_name: &str, is_wiki: bool, root_url: &str) -> Self {
        Self {
            owner: owner.to_owned(),
            repo_name: repo_name.to_owned(),
            is_wiki,
            root_url: root_url.to_owned(),
            repo_id: None,
            pusher: None,
            deferred_access: None,
        }
    }

    /// Render to the `KEY=VALUE` pairs handed to the subprocess.
    pub fn to_vars(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (vars::REPO_USER_NAME.to_owned(), self.owner.clone()),
            (vars::REPO_NAME.to_owned(), self.repo_name.clone()),
            (vars::REPO_IS_WIKI.to_owned(), self.is_wiki.to_string()),
            (vars::ROOT_URL.to_owned(), self.root_url.clone()),
        ];
        if let Some(id) = self.repo_id {
            env.push((vars::REPO_ID.to_owned(), id.to_string()));
        }
        if let Some(pusher) = &self.pusher {
            env.push((vars::PUSHER_ID.to_owned(), pusher.id.to_string()));
            env.push((vars::PUSHER_NAME.to_owned(), pusher.name.clone()));
            if let Some(email) = &pusher.email {
                env.push((vars::PUSHER_EMAIL.to_owned(), email.clone()));
            }
        }
        if let Some(mode) = self.deferred_access {
            env.push((vars::ACTION_PERM.to_owned(), mode.to_string()));
        }
        env
    }
}
