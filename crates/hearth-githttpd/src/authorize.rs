//! Request authorization.
//!
//! Produces an access decision for every git-over-HTTP request before any
//! subprocess is spawned or storage is touched. Permission failures on
//! existing repositories answer 404, never 403, so that private
//! repositories are indistinguishable from absent ones.

use axum::http::Method;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use hearth::access::{AccessMode, AuthMethod, Session};
use hearth::forge::{Credentials, Forge as _};
use hearth::identity::is_valid_name;
use hearth::repo::{RepoTree, Repository};

use crate::error::Error;
use crate::hookenv::{HookEnv, Pusher};
use crate::service::Service;
use crate::Gateway;

/// A request against a repository path, derived once from the URL and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRequest {
    pub owner: String,
    pub repo: String,
    pub is_wiki: bool,
    pub service: Option<Service>,
    pub method: Method,
    pub go_get: bool,
}

impl GitRequest {
    /// Derive a request from raw path parameters. The repository segment
    /// may carry a `.git` suffix and a `.wiki` marker selecting the wiki
    /// tree. Malformed names fail here, before any lookup.
    pub fn parse(
        owner: &str,
        repo: &str,
        service: Option<Service>,
        method: Method,
        go_get: bool,
    ) -> Result<Self, Error> {
        let name = repo.strip_suffix(".git").unwrap_or(repo);
        let (name, is_wiki) = match name.strip_suffix(".wiki") {
            Some(base) => (base, true),
            None => (name, false),
        };
        if !is_valid_name(owner) || !is_valid_name(name) {
            return Err(Error::BadRequest("invalid repository path".to_owned()));
        }
        Ok(Self {
            owner: owner.to_owned(),
            repo: name.to_owned(),
            is_wiki,
            service,
            method,
            go_get,
        })
    }

    /// Pull-type requests read; everything else writes. Requests without a
    /// named service are classified by method.
    pub fn is_pull(&self) -> bool {
        match self.service {
            Some(service) => service.is_pull(),
            None => self.method == Method::GET || self.method == Method::HEAD,
        }
    }

    pub fn access_mode(&self) -> AccessMode {
        if self.is_pull() {
            AccessMode::Read
        } else {
            AccessMode::Write
        }
    }

    fn is_receive_pack(&self) -> bool {
        self.service == Some(Service::ReceivePack)
    }

    /// An advertisement probe rather than an actual exchange.
    fn is_probe(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}

/// What the dispatcher should do after authorization.
#[derive(Debug)]
pub enum Outcome {
    /// Serve the request against the resolved repository.
    Proceed(Authorized),
    /// Answer a push-to-create probe with the cached empty advertisement.
    EmptyAdvert,
    /// Permanent redirect to the repository's new `owner/name` path.
    Redirect(String),
    /// Respond with the forge's go-get meta page.
    GoGet(String),
}

/// A fully authorized request target.
#[derive(Debug)]
pub struct Authorized {
    pub repo: Repository,
    pub tree: RepoTree,
    pub env: HookEnv,
}

/// Decode `Authorization: Basic` credentials, if present and well-formed.
pub fn basic_credentials(header: Option<&str>) -> Option<Credentials> {
    let value = header?.trim();
    let encoded = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))?;
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, secret) = decoded.split_once(':')?;

    Some(Credentials {
        username: username.to_owned(),
        secret: secret.to_owned(),
    })
}

/// Authorize one request. Side-effect free apart from push-to-create, which
/// is invoked through the forge callback once everything else has passed.
pub fn authorize(
    gw: &Gateway,
    req: &GitRequest,
    credentials: Option<Credentials>,
) -> Result<Outcome, Error> {
    let policy = &gw.config.policy;

    if !policy.git_over_http {
        return Err(Error::Forbidden(
            "interacting with repositories over HTTP is disabled".to_owned(),
        ));
    }
    if req.go_get {
        let meta = gw
            .forge
            .go_get_meta(&req.owner, &req.repo)
            .ok_or_else(Error::repository_not_found)?;
        return Ok(Outcome::GoGet(meta));
    }

    let mut mode = req.access_mode();
    let owner = gw
        .forge
        .account(&req.owner)?
        .ok_or_else(Error::repository_not_found)?;
    if !owner.is_organization() && !owner.is_active {
        return Err(Error::Forbidden(
            "repository owner has been deactivated".to_owned(),
        ));
    }

    let repo = match gw.forge.repository(&owner, &req.repo)? {
        Some(repo) => Some(repo),
        None => match gw.forge.redirect(&owner, &req.repo)? {
            Some(target) => return Ok(Outcome::Redirect(target)),
            None => None,
        },
    };
    let tree = if req.is_wiki {
        RepoTree::Wiki
    } else {
        RepoTree::Code
    };

    // Archived repositories reject writes for everyone, owner included.
    if let Some(repo) = &repo {
        if repo.is_archived && !req.is_pull() {
            return Err(Error::Forbidden(
                "repository is archived and can no longer be pushed to".to_owned(),
            ));
        }
    }

    let is_public_pull = repo.as_ref().is_some_and(|r| !r.is_private) && req.is_pull();
    let mut ask_auth = !is_public_pull || policy.require_signin_view;
    if is_public_pull && !owner.visibility.is_public() {
        ask_auth = true;
    }

    let mut env = HookEnv::new(&req.owner, &req.repo, req.is_wiki, &gw.config.root_url);
    let mut session: Option<Session> = None;

    if ask_auth {
        let credentials = credentials.ok_or_else(|| challenge(gw))?;
        let sess = gw
            .forge
            .authenticate(&credentials)?
            .ok_or_else(|| challenge(gw))?;

        if let AuthMethod::Token { scope, .. } = &sess.method {
            if !scope.covers(mode) {
                return Err(Error::Forbidden(
                    "token scope does not cover this operation".to_owned(),
                ));
            }
        }
        if sess.is_password() && sess.account.has_two_factor {
            return Err(Error::Unauthorized {
                realm: None,
                message: Some(
                    "accounts with two-factor authentication enabled cannot authenticate \
                     over HTTP with a password; create a personal access token and use \
                     that instead"
                        .to_owned(),
                ),
            });
        }
        if !sess.account.is_active || sess.account.prohibit_login {
            return Err(Error::Forbidden("your account is disabled".to_owned()));
        }
        env.pusher = Some(Pusher::from(&sess.account));

        if let Some(repo) = &repo {
            if let AuthMethod::Token {
                repository: Some(bound),
                ..
            } = &sess.method
            {
                if *bound != repo.id {
                    return Err(Error::Forbidden(
                        "token is not scoped to this repository".to_owned(),
                    ));
                }
            }

            // With proc-receive push options the final ref names are only
            // known once the pack is parsed, so the write check moves into
            // the receive hooks.
            if policy.push_options && mode == AccessMode::Write {
                env.deferred_access = Some(mode);
                mode = AccessMode::Read;
            }

            match sess.task() {
                Some(id) => {
                    let task = gw
                        .forge
                        .task(id)?
                        .ok_or_else(|| Error::Forbidden("task permission denied".to_owned()))?;
                    if task.repository != repo.id {
                        return Err(Error::Forbidden("task permission denied".to_owned()));
                    }
                    let cap = if task.is_fork_pull_request {
                        AccessMode::Read
                    } else {
                        AccessMode::Write
                    };
                    if mode > cap {
                        return Err(Error::Forbidden("task permission denied".to_owned()));
                    }
                    env.deferred_access = Some(cap);
                }
                None => {
                    let perm = gw.forge.permission(repo, &sess)?;
                    if !perm.can_access(mode, tree) {
                        return Err(Error::repository_not_found());
                    }
                }
            }

            if repo.is_mirror && !req.is_pull() {
                return Err(Error::Forbidden(
                    "mirror repositories are read-only".to_owned(),
                ));
            }
        }
        session = Some(sess);
    }

    let repo = match repo {
        Some(repo) => repo,
        None => {
            // A wiki cannot come into existence before its repository.
            if !req.is_receive_pack() || req.is_wiki {
                return Err(Error::repository_not_found());
            }
            if owner.is_organization() && !policy.push_create_org {
                return Err(Error::Forbidden(
                    "push-to-create is not enabled for organizations".to_owned(),
                ));
            }
            if !owner.is_organization() && !policy.push_create_user {
                return Err(Error::Forbidden(
                    "push-to-create is not enabled for users".to_owned(),
                ));
            }
            if req.is_probe() {
                return Ok(Outcome::EmptyAdvert);
            }
            let Some(session) = &session else {
                return Err(challenge(gw));
            };
            match gw.forge.push_create(&session.account, &owner, &req.repo) {
                Ok(repo) => repo,
                Err(e) => {
                    log::error!(
                        target: "auth",
                        "Push-to-create of {}/{} failed: {e}", req.owner, req.repo
                    );
                    return Err(Error::repository_not_found());
                }
            }
        }
    };

    if req.is_wiki && !repo.has_wiki {
        return Err(Error::Forbidden("repository wiki is disabled".to_owned()));
    }
    env.repo_id = Some(repo.id);

    Ok(Outcome::Proceed(Authorized { repo, tree, env }))
}

/// Basic-auth challenge. The realm differs depending on whether OAuth2
/// login is enabled, which steers credential-manager behavior.
fn challenge(gw: &Gateway) -> Error {
    let realm = if gw.config.policy.oauth2 {
        gw.config.realm.clone()
    } else {
        ".".to_owned()
    };
    Error::Unauthorized {
        realm: Some(realm),
        message: None,
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use hearth::access::{Permission, TaskId, TokenScope};
    use hearth::config::Config;
    use hearth::forge::{Directory, TaskContext};
    use hearth::identity::{Account, AccountId, AccountKind, Visibility};
    use hearth::repo::RepoId;

    fn account(name: &str) -> Account {
        Account {
            id: AccountId::default(),
            name: name.to_owned(),
            email: format!("{name}@example.com"),
            kind: AccountKind::User,
            visibility: Visibility::Public,
            is_active: true,
            prohibit_login: false,
            keep_email_private: false,
            has_two_factor: false,
        }
    }

    fn repository(owner: &Account, name: &str) -> Repository {
        Repository {
            id: RepoId::default(),
            name: name.to_owned(),
            owner: owner.clone(),
            is_private: false,
            is_archived: false,
            is_mirror: false,
            has_wiki: true,
        }
    }

    fn gateway(configure: impl FnOnce(&mut Config)) -> (Gateway, Arc<Directory>) {
        let mut config = Config::default();
        configure(&mut config);
        let directory = Arc::new(Directory::new());
        let gateway = Gateway::new(config, directory.clone());
        (gateway, directory)
    }

    fn credentials(username: &str, secret: &str) -> Option<Credentials> {
        Some(Credentials {
            username: username.to_owned(),
            secret: secret.to_owned(),
        })
    }

    fn pull(owner: &str, repo: &str) -> GitRequest {
        GitRequest::parse(
            owner,
            repo,
            Some(Service::UploadPack),
            Method::GET,
            false,
        )
        .unwrap()
    }

    fn push(owner: &str, repo: &str) -> GitRequest {
        GitRequest::parse(
            owner,
            repo,
            Some(Service::ReceivePack),
            Method::POST,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_strips_git_and_wiki_suffixes() {
        let req = GitRequest::parse("alice", "project.git", None, Method::GET, false).unwrap();
        assert_eq!(req.repo, "project");
        assert!(!req.is_wiki);

        let req = GitRequest::parse("alice", "project.wiki.git", None, Method::GET, false).unwrap();
        assert_eq!(req.repo, "project");
        assert!(req.is_wiki);

        assert!(GitRequest::parse("alice", "..git", None, Method::GET, false).is_err());
        assert!(GitRequest::parse("", "project.git", None, Method::GET, false).is_err());
    }

    #[test]
    fn test_classification_by_service_then_method() {
        assert_eq!(pull("a", "r").access_mode(), AccessMode::Read);
        assert_eq!(push("a", "r").access_mode(), AccessMode::Write);

        // `GET info/refs?service=git-receive-pack` is still a write probe.
        let req =
            GitRequest::parse("a", "r", Some(Service::ReceivePack), Method::GET, false).unwrap();
        assert_eq!(req.access_mode(), AccessMode::Write);

        let req = GitRequest::parse("a", "r", None, Method::GET, false).unwrap();
        assert_eq!(req.access_mode(), AccessMode::Read);
    }

    #[test]
    fn test_anonymous_public_pull_is_not_challenged() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        dir.add_repository(repository(&alice, "project"));

        let outcome = authorize(&gw, &pull("alice", "project"), None).unwrap();
        assert!(matches!(outcome, Outcome::Proceed(_)));
    }

    #[test]
    fn test_require_signin_view_challenges_public_pulls() {
        let (gw, dir) = gateway(|c| c.policy.require_signin_view = true);
        let alice = dir.add_account(account("alice"));
        dir.add_repository(repository(&alice, "project"));

        let err = authorize(&gw, &pull("alice", "project"), None).unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[test]
    fn test_challenge_realm_depends_on_oauth2() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "secret")
        });

        let err = authorize(&gw, &pull("alice", "secret"), None).unwrap_err();
        assert!(matches!(err, Error::Unauthorized { realm: Some(r), .. } if r == "."));

        let (gw, dir) = gateway(|c| c.policy.oauth2 = true);
        let alice = dir.add_account(account("alice"));
        dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "secret")
        });

        let err = authorize(&gw, &pull("alice", "secret"), None).unwrap_err();
        assert!(matches!(err, Error::Unauthorized { realm: Some(r), .. } if r == "Hearth"));
    }

    #[test]
    fn test_limited_owner_visibility_requires_auth() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(Account {
            visibility: Visibility::Limited,
            ..account("alice")
        });
        dir.add_repository(repository(&alice, "project"));

        let err = authorize(&gw, &pull("alice", "project"), None).unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[test]
    fn test_archived_write_is_forbidden_for_everyone() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        dir.set_password(&alice, "hunter2");
        dir.add_repository(Repository {
            is_archived: true,
            ..repository(&alice, "attic")
        });

        // Even the owner, even anonymously: rejected before authentication.
        for creds in [None, credentials("alice", "hunter2")] {
            let err = authorize(&gw, &push("alice", "attic"), creds).unwrap_err();
            assert!(matches!(err, Error::Forbidden(_)));
        }

        // Pulls still work.
        let outcome = authorize(&gw, &pull("alice", "attic"), None).unwrap();
        assert!(matches!(outcome, Outcome::Proceed(_)));
    }

    #[test]
    fn test_permission_failure_hides_existence() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        let eve = dir.add_account(account("eve"));
        dir.set_password(&eve, "pw");
        dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "secret")
        });

        let err = authorize(&gw, &pull("alice", "secret"), credentials("eve", "pw")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_two_factor_rejects_password_but_not_token() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(Account {
            has_two_factor: true,
            ..account("alice")
        });
        dir.set_password(&alice, "hunter2");
        dir.add_token("tok", &alice, TokenScope::Read, None);
        dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "secret")
        });

        let err =
            authorize(&gw, &pull("alice", "secret"), credentials("alice", "hunter2")).unwrap_err();
        assert!(
            matches!(&err, Error::Unauthorized { realm: None, message: Some(m) } if m.contains("personal access token"))
        );

        let outcome = authorize(&gw, &pull("alice", "secret"), credentials("alice", "tok")).unwrap();
        assert!(matches!(outcome, Outcome::Proceed(_)));
    }

    #[test]
    fn test_disabled_account_is_forbidden() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "secret")
        });
        let mallory = dir.add_account(Account {
            prohibit_login: true,
            ..account("mallory")
        });
        dir.set_password(&mallory, "pw");

        let err =
            authorize(&gw, &pull("alice", "secret"), credentials("mallory", "pw")).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_read_token_cannot_push() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        dir.add_token("ro", &alice, TokenScope::Read, None);
        dir.add_repository(repository(&alice, "project"));

        let err =
            authorize(&gw, &push("alice", "project"), credentials("alice", "ro")).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_repo_scoped_token_is_bound() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        let widgets = dir.add_repository(repository(&alice, "widgets"));
        dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "gadgets")
        });
        dir.add_token("tok", &alice, TokenScope::Write, Some(widgets.id));

        let outcome =
            authorize(&gw, &pull("alice", "widgets"), credentials("alice", "tok")).unwrap();
        assert!(matches!(outcome, Outcome::Proceed(_)));

        let err =
            authorize(&gw, &pull("alice", "gadgets"), credentials("alice", "tok")).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_task_token_permissions() {
        let (gw, dir) = gateway(|c| c.policy.push_options = false);
        let alice = dir.add_account(account("alice"));
        let bot = dir.add_account(account("bot"));
        let repo = dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "ci")
        });
        dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "other")
        });
        dir.add_task(
            "task-tok",
            &bot,
            TaskId(1),
            TaskContext {
                repository: repo.id,
                is_fork_pull_request: false,
            },
        );
        dir.add_task(
            "fork-tok",
            &bot,
            TaskId(2),
            TaskContext {
                repository: repo.id,
                is_fork_pull_request: true,
            },
        );

        // Task tokens work against their own repository without any
        // collaborator record.
        let outcome =
            authorize(&gw, &push("alice", "ci"), credentials("bot", "task-tok")).unwrap();
        assert!(matches!(outcome, Outcome::Proceed(_)));

        // ...but not against any other repository.
        let err = authorize(&gw, &pull("alice", "other"), credentials("bot", "task-tok"))
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        // Fork pull-request tasks are capped at read.
        let err =
            authorize(&gw, &push("alice", "ci"), credentials("bot", "fork-tok")).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        let outcome =
            authorize(&gw, &pull("alice", "ci"), credentials("bot", "fork-tok")).unwrap();
        assert!(matches!(outcome, Outcome::Proceed(_)));
    }

    #[test]
    fn test_push_options_defer_write_check_to_hooks() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        let bob = dir.add_account(account("bob"));
        dir.set_password(&bob, "pw");
        let repo = dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "project")
        });
        dir.set_collaborator(&repo, &bob, Permission::uniform(AccessMode::Read));

        // bob only has read access, but the pre-check is downgraded and the
        // hook layer gets the level to enforce.
        let outcome = authorize(&gw, &push("alice", "project"), credentials("bob", "pw")).unwrap();
        let Outcome::Proceed(authorized) = outcome else {
            panic!("expected proceed");
        };
        assert_eq!(authorized.env.deferred_access, Some(AccessMode::Write));

        // Without the capability the write check happens up front.
        let (gw, dir) = gateway(|c| c.policy.push_options = false);
        let alice = dir.add_account(account("alice"));
        let bob = dir.add_account(account("bob"));
        dir.set_password(&bob, "pw");
        let repo = dir.add_repository(Repository {
            is_private: true,
            ..repository(&alice, "project")
        });
        dir.set_collaborator(&repo, &bob, Permission::uniform(AccessMode::Read));

        let err = authorize(&gw, &push("alice", "project"), credentials("bob", "pw")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_mirror_push_is_forbidden() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        dir.set_password(&alice, "pw");
        dir.add_repository(Repository {
            is_mirror: true,
            ..repository(&alice, "mirror")
        });

        let err =
            authorize(&gw, &push("alice", "mirror"), credentials("alice", "pw")).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let outcome = authorize(&gw, &pull("alice", "mirror"), None).unwrap();
        assert!(matches!(outcome, Outcome::Proceed(_)));
    }

    #[test]
    fn test_absent_repository_is_not_found_for_pulls() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        dir.set_password(&alice, "pw");

        let err = authorize(&gw, &pull("alice", "void"), credentials("alice", "pw")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_push_to_create_policy_by_owner_kind() {
        let (gw, dir) = gateway(|c| c.policy.push_create_user = true);
        let alice = dir.add_account(account("alice"));
        dir.set_password(&alice, "pw");
        dir.add_account(Account {
            kind: AccountKind::Organization,
            ..account("acme")
        });

        // Disabled for organizations: 403 naming organizations.
        let err = authorize(&gw, &push("acme", "fresh"), credentials("alice", "pw")).unwrap_err();
        assert!(matches!(&err, Error::Forbidden(m) if m.contains("organizations")));

        // Enabled for users: the probe gets the dummy advertisement and the
        // push creates the repository.
        let probe = GitRequest::parse(
            "alice",
            "fresh",
            Some(Service::ReceivePack),
            Method::GET,
            false,
        )
        .unwrap();
        let outcome = authorize(&gw, &probe, credentials("alice", "pw")).unwrap();
        assert!(matches!(outcome, Outcome::EmptyAdvert));

        let outcome = authorize(&gw, &push("alice", "fresh"), credentials("alice", "pw")).unwrap();
        assert!(matches!(outcome, Outcome::Proceed(_)));
        assert!(dir.repository(&alice, "fresh").unwrap().is_some());
    }

    #[test]
    fn test_push_to_create_never_applies_to_wikis_or_pulls() {
        let (gw, dir) = gateway(|c| c.policy.push_create_user = true);
        let alice = dir.add_account(account("alice"));
        dir.set_password(&alice, "pw");

        let wiki = GitRequest::parse(
            "alice",
            "fresh.wiki.git",
            Some(Service::ReceivePack),
            Method::POST,
            false,
        )
        .unwrap();
        let err = authorize(&gw, &wiki, credentials("alice", "pw")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = authorize(&gw, &pull("alice", "fresh"), credentials("alice", "pw")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_wiki_requires_enabled_unit() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        dir.add_repository(Repository {
            has_wiki: false,
            ..repository(&alice, "project")
        });

        let req =
            GitRequest::parse("alice", "project.wiki.git", None, Method::GET, false).unwrap();
        let err = authorize(&gw, &req, None).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_renamed_repository_redirects() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(account("alice"));
        dir.add_repository(repository(&alice, "new-name"));
        dir.add_redirect(&alice, "old-name", "alice/new-name");

        let outcome = authorize(&gw, &pull("alice", "old-name"), None).unwrap();
        assert!(matches!(outcome, Outcome::Redirect(target) if target == "alice/new-name"));
    }

    #[test]
    fn test_git_over_http_can_be_disabled() {
        let (gw, dir) = gateway(|c| c.policy.git_over_http = false);
        let alice = dir.add_account(account("alice"));
        dir.add_repository(repository(&alice, "project"));

        let err = authorize(&gw, &pull("alice", "project"), None).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_deactivated_owner_blocks_access() {
        let (gw, dir) = gateway(|_| {});
        let alice = dir.add_account(Account {
            is_active: false,
            ..account("alice")
        });
        dir.add_repository(repository(&alice, "project"));

        let err = authorize(&gw, &pull("alice", "project"), None).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_basic_credentials_decoding() {
        // "alice:hunter2"
        let creds = basic_credentials(Some("Basic YWxpY2U6aHVudGVyMg==")).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.secret, "hunter2");

        assert!(basic_credentials(None).is_none());
        assert!(basic_credentials(Some("Bearer abc")).is_none());
        assert!(basic_credentials(Some("Basic !!!")).is_none());
        // "nocolon"
        assert!(basic_credentials(Some("Basic bm9jb2xvbg==")).is_none());
    }
}
