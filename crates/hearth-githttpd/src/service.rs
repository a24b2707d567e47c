//! The closed set of git services spoken over HTTP.

use std::fmt;

use hearth::access::AccessMode;

/// A git wire service. Nothing outside this set is ever passed to a
/// subprocess; every decision point matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    UploadPack,
    ReceivePack,
    UploadArchive,
}

impl Service {
    /// Short name, as given to the `git` binary.
    pub fn name(&self) -> &'static str {
        match self {
            Service::UploadPack => "upload-pack",
            Service::ReceivePack => "receive-pack",
            Service::UploadArchive => "upload-archive",
        }
    }

    /// Parse a `service=` query value, e.g. `git-upload-pack`.
    pub fn from_query(value: &str) -> Option<Self> {
        match value {
            "git-upload-pack" => Some(Service::UploadPack),
            "git-receive-pack" => Some(Service::ReceivePack),
            "git-upload-archive" => Some(Service::UploadArchive),
            _ => None,
        }
    }

    /// Access level the service requires before any deferral.
    pub fn access_mode(&self) -> AccessMode {
        match self {
            Service::UploadPack | Service::UploadArchive => AccessMode::Read,
            Service::ReceivePack => AccessMode::Write,
        }
    }

    /// Whether this is a pull-type service.
    pub fn is_pull(&self) -> bool {
        match self {
            Service::UploadPack | Service::UploadArchive => true,
            Service::ReceivePack => false,
        }
    }

    /// Subprocess arguments, excluding the working directory.
    /// `upload-archive` has no `--stateless-rpc` flag.
    pub fn argv(&self) -> &'static [&'static str] {
        match self {
            Service::UploadPack => &["upload-pack", "--stateless-rpc"],
            Service::ReceivePack => &["receive-pack", "--stateless-rpc"],
            Service::UploadArchive => &["upload-archive"],
        }
    }

    /// Exact `Content-Type` required on RPC request bodies.
    pub fn request_content_type(&self) -> &'static str {
        match self {
            Service::UploadPack => "application/x-git-upload-pack-request",
            Service::ReceivePack => "application/x-git-receive-pack-request",
            Service::UploadArchive => "application/x-git-upload-archive-request",
        }
    }

    /// `Content-Type` of RPC response bodies.
    pub fn result_content_type(&self) -> &'static str {
        match self {
            Service::UploadPack => "application/x-git-upload-pack-result",
            Service::ReceivePack => "application/x-git-receive-pack-result",
            Service::UploadArchive => "application/x-git-upload-archive-result",
        }
    }

    /// `Content-Type` of `info/refs` advertisements.
    pub fn advertisement_content_type(&self) -> &'static str {
        match self {
            Service::UploadPack => "application/x-git-upload-pack-advertisement",
            Service::ReceivePack => "application/x-git-receive-pack-advertisement",
            Service::UploadArchive => "application/x-git-upload-archive-advertisement",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_query() {
        assert_eq!(
            Service::from_query("git-upload-pack"),
            Some(Service::UploadPack)
        );
        assert_eq!(
            Service::from_query("git-receive-pack"),
            Some(Service::ReceivePack)
        );
        assert_eq!(
            Service::from_query("git-upload-archive"),
            Some(Service::UploadArchive)
        );
        assert_eq!(Service::from_query("upload-pack"), None);
        assert_eq!(Service::from_query("git-shell"), None);
    }

    #[test]
    fn test_access_modes() {
        assert_eq!(Service::UploadPack.access_mode(), AccessMode::Read);
        assert_eq!(Service::UploadArchive.access_mode(), AccessMode::Read);
        assert_eq!(Service::ReceivePack.access_mode(), AccessMode::Write);
    }

    #[test]
    fn test_upload_archive_has_no_stateless_rpc_flag() {
        assert!(!Service::UploadArchive.argv().contains(&"--stateless-rpc"));
        assert!(Service::UploadPack.argv().contains(&"--stateless-rpc"));
        assert!(Service::ReceivePack.argv().contains(&"--stateless-rpc"));
    }
}
