//! Accounts: users and organizations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique account identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of account a repository owner can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    User,
    Organization,
}

/// Who can see an account and its repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    /// Visible to signed-in users only.
    Limited,
    /// Visible to members only.
    Private,
}

impl Visibility {
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

/// An account row, as the gateway sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub kind: AccountKind,
    pub visibility: Visibility,
    /// Deactivated accounts cannot be interacted with.
    pub is_active: bool,
    /// Administratively locked out of authenticating.
    pub prohibit_login: bool,
    /// The account opted out of exposing its email to hooks and logs.
    pub keep_email_private: bool,
    /// Whether a second factor is enrolled for this account.
    pub has_two_factor: bool,
}

impl Account {
    pub fn is_organization(&self) -> bool {
        matches!(self.kind, AccountKind::Organization)
    }
}

/// Check a path segment against the account and repository name alphabet.
///
/// Names are restricted to ASCII alphanumerics plus `-`, `_` and `.`, and may
/// not be `.` or `..`. Anything else never names a repository and is rejected
/// before any lookup happens.
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
