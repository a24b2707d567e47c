//! Access control primitives.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::Account;
use crate::repo::{RepoId, RepoTree};

/// Access level required by, or granted for, an operation.
///
/// Levels are ordered: a granted level covers every required level at or
/// below it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    None,
    Read,
    Write,
    Admin,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessMode::None => "none",
            AccessMode::Read => "read",
            AccessMode::Write => "write",
            AccessMode::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

/// Effective permission of a caller on one repository, per unit tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Permission {
    pub code: AccessMode,
    pub wiki: AccessMode,
}

impl Permission {
    /// A permission granting nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// The same level on both trees.
    pub fn uniform(mode: AccessMode) -> Self {
        Self {
            code: mode,
            wiki: mode,
        }
    }

    /// Whether this permission covers `required` on the given tree.
    pub fn can_access(&self, required: AccessMode, tree: RepoTree) -> bool {
        let granted = match tree {
            RepoTree::Code => self.code,
            RepoTree::Wiki => self.wiki,
        };
        granted >= required
    }
}

/// Scope carried by an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    Read,
    Write,
}

impl TokenScope {
    /// Whether a token with this scope may perform an operation at `mode`.
    pub fn covers(&self, mode: AccessMode) -> bool {
        match self {
            TokenScope::Read => mode <= AccessMode::Read,
            TokenScope::Write => mode <= AccessMode::Write,
        }
    }
}

/// Identifier of a running automation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a session was established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// HTTP basic authentication with the account password.
    Password,
    /// A personal access token, possibly bound to a single repository.
    Token {
        scope: TokenScope,
        repository: Option<RepoId>,
    },
    /// An ephemeral token minted for a running automation task.
    Task { id: TaskId },
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub account: Account,
    pub method: AuthMethod,
}

impl Session {
    /// Whether the caller authenticated with a plain password.
    pub fn is_password(&self) -> bool {
        matches!(self.method, AuthMethod::Password)
    }

    /// Whether the caller is an automation identity.
    pub fn task(&self) -> Option<TaskId> {
        match self.method {
            AuthMethod::Task { id } => Some(id),
            _ => None,
        }
    }
}
