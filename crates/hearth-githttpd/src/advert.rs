//! Cached empty-repository advertisement.
//!
//! A `git push` to a repository that will be created on push first probes
//! `info/refs`. Answering that probe needs a syntactically valid,
//! empty-repository ref advertisement, which is expensive to produce: it
//! requires initializing a scratch bare repository. The payload is
//! therefore computed at most once per process and cached; concurrent
//! first-time callers all block on the single initialization.

use bytes::Bytes;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::OnceCell;

#[derive(Debug, Error)]
enum BuildError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("git: {0}")]
    Init(#[from] git2::Error),
    #[error("git receive-pack --advertise-refs: {0}")]
    Advertise(String),
}

/// The advertisement payload served to push-to-create probes. Owned by the
/// gateway composition root and injected where needed.
#[derive(Default)]
pub struct EmptyAdvert {
    cell: OnceCell<Bytes>,
}

impl EmptyAdvert {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// The raw advertisement bytes, without pkt-line preamble.
    ///
    /// A failed build is cached as an empty payload rather than retried:
    /// clients receive a well-formed, if useless, advertisement and the
    /// failure is in the log.
    pub async fn get(&self) -> Bytes {
        self.cell
            .get_or_init(|| async {
                match build().await {
                    Ok(payload) => {
                        log::debug!(
                            target: "advert",
                            "Built empty-repository advertisement ({} bytes)",
                            payload.len()
                        );
                        payload
                    }
                    Err(e) => {
                        log::error!(target: "advert", "Failed to build empty-repository advertisement: {e}");
                        Bytes::new()
                    }
                }
            })
            .await
            .clone()
    }
}

async fn build() -> Result<Bytes, BuildError> {
    let tmp = tempfile::Builder::new()
        .prefix("hearth-info-refs")
        .tempdir()?;
    let mut opts = git2::RepositoryInitOptions::new();
    opts.bare(true);
    git2::Repository::init_opts(tmp.path(), &opts)?;

    let output = Command::new("git")
        .args(["receive-pack", "--stateless-rpc", "--advertise-refs", "."])
        .current_dir(tmp.path())
        .kill_on_drop(true)
        .output()
        .await?;
    if !output.status.success() {
        return Err(BuildError::Advertise(
            String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        ));
    }
    Ok(Bytes::from(output.stdout))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_callers_observe_identical_payload() {
        let advert = Arc::new(EmptyAdvert::new());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let advert = advert.clone();
                tokio::spawn(async move { advert.get().await })
            })
            .collect();

        let mut payloads = Vec::new();
        for task in tasks {
            payloads.push(task.await.unwrap());
        }

        let first = payloads.first().unwrap().clone();
        assert!(!first.is_empty());
        assert!(payloads.iter().all(|p| *p == first));

        // Later calls keep returning the same bytes.
        assert_eq!(advert.get().await, first);
    }
}
