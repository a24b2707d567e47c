//! Stateless-RPC subprocess streaming.
//!
//! Each smart-protocol exchange spawns one `git` subprocess against the
//! resolved storage tree. The request body is piped to its stdin and its
//! stdout is streamed back as the response body as it is produced, so a
//! slow client blocks `git` itself through the pipes rather than buffering
//! the pack in memory.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_compression::tokio::bufread::GzipDecoder;
use axum::body::Body;
use futures_util::TryStreamExt as _;
use tokio::io::{AsyncRead, AsyncReadExt as _, BufReader};
use tokio::process::Command;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::hookenv::{vars, HookEnv};
use crate::service::Service;

/// Capacity of the pipe between subprocess stdout and the response body.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Reader over the request body, transparently gunzipping when the client
/// sent `Content-Encoding: gzip`. Decompression is streamed, never
/// materialized.
pub(crate) fn request_reader(body: Body, gzipped: bool) -> Box<dyn AsyncRead + Send + Unpin> {
    let stream = body.into_data_stream().map_err(io::Error::other);
    let reader = StreamReader::new(stream);
    if gzipped {
        Box::new(GzipDecoder::new(BufReader::new(reader)))
    } else {
        Box::new(reader)
    }
}

/// Produce the raw ref advertisement for a smart `info/refs` probe by
/// running `git <service> --stateless-rpc --advertise-refs`.
pub async fn advertise(
    service: Service,
    dir: &Path,
    env: &HookEnv,
    git_protocol: Option<&str>,
) -> io::Result<Vec<u8>> {
    let mut cmd = Command::new("git");
    cmd.args(service.argv())
        .arg("--advertise-refs")
        .arg(".")
        .current_dir(dir)
        .envs(env.to_vars())
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(protocol) = git_protocol {
        cmd.env(vars::GIT_PROTOCOL, protocol);
    }

    let output = cmd.output().await?;
    if !output.status.success() {
        log::error!(
            target: "rpc",
            "git {service} --advertise-refs failed in '{}': {}",
            dir.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.stdout)
}

/// Execute one stateless-RPC exchange, returning the response body stream.
///
/// The child is spawned with `kill_on_drop` and owned by the pump task:
/// when the client disconnects, the response stream is dropped, the pump's
/// pipe writes fail and the child is killed with it. Cancellation is logged
/// at trace level at most; any other subprocess failure is logged together
/// with the captured stderr, and can no longer change the HTTP status since
/// headers have already been written.
pub fn exchange(
    service: Service,
    dir: PathBuf,
    env: Vec<(String, String)>,
    git_protocol: Option<String>,
    body: Body,
    gzipped: bool,
) -> io::Result<Body> {
    let mut reader = request_reader(body, gzipped);

    let mut cmd = Command::new("git");
    cmd.args(service.argv())
        .arg(&dir)
        .current_dir(&dir)
        .envs(env)
        .env(vars::SSH_ORIGINAL_COMMAND, service.name())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(protocol) = &git_protocol {
        cmd.env(vars::GIT_PROTOCOL, protocol);
    }

    log::debug!(target: "rpc", "Spawning git {service} in '{}'..", dir.display());
    let mut child = cmd.spawn()?;

    let mut stdin = child.stdin.take().expect("stdin is piped");
    let mut stdout = child.stdout.take().expect("stdout is piped");
    let mut stderr = child.stderr.take().expect("stderr is piped");

    let (mut send, recv) = tokio::io::duplex(PIPE_CAPACITY);

    tokio::spawn(async move {
        let feed = async move {
            match tokio::io::copy(&mut reader, &mut stdin).await {
                // The child decides when it has read enough.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other.map(drop),
            }
            // Dropping stdin here closes the pipe, signalling end of input.
        };
        let pipe = async {
            tokio::io::copy(&mut stdout, &mut send).await.map(drop)
        };
        let collect = async {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await?;
            Ok::<_, io::Error>(buf)
        };

        match tokio::try_join!(feed, pipe, collect, child.wait()) {
            Ok((_, _, stderr_buf, status)) => {
                if !status.success() {
                    log::error!(
                        target: "rpc",
                        "git {service} in '{}' exited with {status}: {}",
                        dir.display(),
                        String::from_utf8_lossy(&stderr_buf).trim()
                    );
                }
            }
            Err(e) => {
                log::trace!(
                    target: "rpc",
                    "git {service} exchange in '{}' canceled: {e}",
                    dir.display()
                );
            }
        }
        // If the exchange was torn down early the child is still running
        // here; dropping it kills the process.
    });

    Ok(Body::from_stream(ReaderStream::new(recv)))
}
