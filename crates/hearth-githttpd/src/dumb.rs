//! Legacy dumb-protocol file server.
//!
//! Serves a small fixed set of repository-relative files to clients that
//! predate the smart protocol. Requested paths are checked for `..`
//! segments before the storage tree is touched at all.

use std::io;
use std::path::Path;

use axum::body::Body;
use axum::http::header;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use tokio::process::Command;
use tokio_util::io::ReaderStream;

use crate::error::Error;

/// RFC 7231 HTTP-date layout.
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// `Expires` value for responses that must never be cached.
pub const EXPIRES_NEVER: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// One year, the effective "forever" for content-addressed files.
const FOREVER_SECS: i64 = 31_536_000;

/// Cache policy of a served file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Mutable files such as `info/refs` and `HEAD`.
    Never,
    /// Content-addressed files: loose objects, packs and their indexes.
    Forever,
}

/// True if the path contains a `..` segment, with both `/` and `\` treated
/// as separators.
pub fn contains_parent_directory_separator(path: &str) -> bool {
    path.contains("..") && path.split(['/', '\\']).any(|segment| segment == "..")
}

/// Serve one repository-relative file.
pub async fn send_file(
    root: &Path,
    file: &str,
    content_type: &str,
    policy: CachePolicy,
) -> Result<Response, Error> {
    if contains_parent_directory_separator(file) {
        log::error!(target: "dumb", "Request for invalid path '{file}'");
        return Err(Error::BadRequest("invalid file path".to_owned()));
    }

    let path = root.join(file);
    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => return Err(Error::NotFound("file not found".to_owned())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound("file not found".to_owned()))
        }
        Err(e) => return Err(e.into()),
    };
    let modified = DateTime::<Utc>::from(meta.modified()?);
    let file = tokio::fs::File::open(&path).await?;

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, meta.len())
        .header(
            header::LAST_MODIFIED,
            modified.format(HTTP_DATE).to_string(),
        );
    builder = match policy {
        CachePolicy::Never => builder
            .header(header::EXPIRES, EXPIRES_NEVER)
            .header(header::PRAGMA, "no-cache")
            .header(header::CACHE_CONTROL, "no-cache, max-age=0, must-revalidate"),
        CachePolicy::Forever => {
            let now = Utc::now();
            builder
                .header(header::DATE, now.format(HTTP_DATE).to_string())
                .header(
                    header::EXPIRES,
                    (now + Duration::seconds(FOREVER_SECS))
                        .format(HTTP_DATE)
                        .to_string(),
                )
                .header(header::CACHE_CONTROL, "public, max-age=31536000")
        }
    };

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| Error::Io(io::Error::other(e)))
}

/// Refresh the auxiliary index files dumb clients rely on, before serving a
/// legacy `info/refs` handshake.
pub async fn update_server_info(dir: &Path) -> io::Result<()> {
    let output = Command::new("git")
        .arg("update-server-info")
        .current_dir(dir)
        .kill_on_drop(true)
        .output()
        .await?;
    if !output.status.success() {
        log::error!(
            target: "dumb",
            "git update-server-info failed in '{}': {}",
            dir.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
