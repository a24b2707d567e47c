//! HTTP route dispatch.
//!
//! Everything is served under `/{owner}/{repo}[.wiki].git/`. The dispatcher
//! derives a [`GitRequest`] from the matched URL, hands it to the
//! authorizer, then either relays the smart protocol through the RPC
//! streamer or serves dumb-protocol files.
#![allow(clippy::too_many_arguments)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::authorize::{self, Authorized, GitRequest, Outcome};
use crate::dumb::{self, CachePolicy};
use crate::error::Error;
use crate::pktline;
use crate::rpc;
use crate::service::Service;
use crate::Gateway;

/// Build the router serving the git protocol endpoints.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/{owner}/{repo}/info/refs", get(info_refs))
        .route("/{owner}/{repo}/git-upload-pack", post(upload_pack))
        .route("/{owner}/{repo}/git-receive-pack", post(receive_pack))
        .route("/{owner}/{repo}/git-upload-archive", post(upload_archive))
        .route("/{owner}/{repo}/HEAD", get(head_file))
        .route("/{owner}/{repo}/objects/info/packs", get(info_packs))
        .route("/{owner}/{repo}/objects/info/{file}", get(info_file))
        .route("/{owner}/{repo}/objects/{head}/{hash}", get(loose_object))
        .route("/{owner}/{repo}/objects/pack/{file}", get(pack_file))
        .with_state(gateway)
}

#[derive(Debug, Default, Deserialize)]
pub struct GitQuery {
    service: Option<String>,
    #[serde(rename = "go-get")]
    go_get: Option<String>,
}

impl GitQuery {
    fn go_get(&self) -> bool {
        self.go_get.as_deref() == Some("1")
    }
}

fn authorized(
    gateway: &Gateway,
    owner: &str,
    repo: &str,
    service: Option<Service>,
    method: Method,
    query: &GitQuery,
    headers: &HeaderMap,
) -> Result<Outcome, Error> {
    let request = GitRequest::parse(owner, repo, service, method, query.go_get())?;
    let credentials = authorize::basic_credentials(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    );
    authorize::authorize(gateway, &request, credentials)
}

/// Resolve an authorization outcome, short-circuiting with a finished
/// response for everything that doesn't reach the protocol layer. `tail` is
/// the repository-relative remainder of the URL, preserved on redirects.
async fn resolve(gateway: &Gateway, outcome: Outcome, tail: &str) -> Result<Authorized, Response> {
    match outcome {
        Outcome::Proceed(authorized) => Ok(authorized),
        Outcome::EmptyAdvert => Err(empty_advert(gateway).await),
        Outcome::Redirect(target) => Err((
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, format!("/{target}/{tail}"))],
        )
            .into_response()),
        Outcome::GoGet(html) => Err((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response()),
    }
}

fn no_cache() -> [(header::HeaderName, &'static str); 3] {
    [
        (header::EXPIRES, dumb::EXPIRES_NEVER),
        (header::PRAGMA, "no-cache"),
        (header::CACHE_CONTROL, "no-cache, max-age=0, must-revalidate"),
    ]
}

/// The dummy advertisement answering probes against creatable repositories.
async fn empty_advert(gateway: &Gateway) -> Response {
    let payload = gateway.advert.get().await;
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            Service::ReceivePack.advertisement_content_type(),
        )],
        no_cache(),
        pktline::advertisement(Service::ReceivePack, &payload),
    )
        .into_response()
}

fn git_protocol(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Git-Protocol")
        .and_then(|v| v.to_str().ok())
        .and_then(pktline::safe_git_protocol)
}

/// `GET /info/refs`, smart when a pack service is requested, dumb otherwise.
async fn info_refs(
    State(gateway): State<Arc<Gateway>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<GitQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, Error> {
    let service = match query.service.as_deref() {
        None => None,
        Some(value) => match Service::from_query(value) {
            // Only the pack services take part in the smart handshake.
            Some(service @ (Service::UploadPack | Service::ReceivePack)) => Some(service),
            _ => {
                return Err(Error::BadRequest(format!(
                    "service '{value}' is not supported"
                )))
            }
        },
    };

    let outcome = authorized(&gateway, &owner, &repo, service, method, &query, &headers)?;
    let authorized = match resolve(&gateway, outcome, "info/refs").await {
        Ok(authorized) => authorized,
        Err(response) => return Ok(response),
    };
    let dir = gateway.storage.path(&authorized.repo, authorized.tree);

    match service {
        Some(service) => {
            let payload =
                rpc::advertise(service, &dir, &authorized.env, git_protocol(&headers)).await?;
            Ok((
                StatusCode::OK,
                [(
                    header::CONTENT_TYPE,
                    service.advertisement_content_type(),
                )],
                no_cache(),
                pktline::advertisement(service, &payload),
            )
                .into_response())
        }
        None => {
            // Legacy handshake: regenerate the server-info files first.
            dumb::update_server_info(&dir).await?;
            dumb::send_file(
                &dir,
                "info/refs",
                "text/plain; charset=utf-8",
                CachePolicy::Never,
            )
            .await
        }
    }
}

async fn upload_pack(
    State(gateway): State<Arc<Gateway>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<GitQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, Error> {
    service_rpc(&gateway, &owner, &repo, Service::UploadPack, &query, &headers, body).await
}

async fn receive_pack(
    State(gateway): State<Arc<Gateway>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<GitQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, Error> {
    service_rpc(&gateway, &owner, &repo, Service::ReceivePack, &query, &headers, body).await
}

async fn upload_archive(
    State(gateway): State<Arc<Gateway>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<GitQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, Error> {
    service_rpc(&gateway, &owner, &repo, Service::UploadArchive, &query, &headers, body).await
}

/// `POST /git-{upload-pack,receive-pack,upload-archive}`.
async fn service_rpc(
    gateway: &Gateway,
    owner: &str,
    repo: &str,
    service: Service,
    query: &GitQuery,
    headers: &HeaderMap,
    body: Body,
) -> Result<Response, Error> {
    let outcome = authorized(
        gateway,
        owner,
        repo,
        Some(service),
        Method::POST,
        query,
        headers,
    )?;
    let tail = format!("git-{service}");
    let authorized = match resolve(gateway, outcome, &tail).await {
        Ok(authorized) => authorized,
        Err(response) => return Ok(response),
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != service.request_content_type() {
        return Err(Error::BadRequest(format!(
            "content type '{content_type}' does not match the {service} service"
        )));
    }
    let gzipped = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        == Some("gzip");

    let dir = gateway.storage.path(&authorized.repo, authorized.tree);
    let body = rpc::exchange(
        service,
        dir,
        authorized.env.to_vars(),
        git_protocol(headers).map(str::to_owned),
        body,
        gzipped,
    )?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, service.result_content_type())],
        body,
    )
        .into_response())
}

/// Shared tail of the dumb file endpoints.
async fn serve_dumb(
    gateway: &Gateway,
    owner: &str,
    repo: &str,
    method: Method,
    query: &GitQuery,
    headers: &HeaderMap,
    file: &str,
    content_type: &str,
    policy: CachePolicy,
) -> Result<Response, Error> {
    let outcome = authorized(gateway, owner, repo, None, method, query, headers)?;
    let authorized = match resolve(gateway, outcome, file).await {
        Ok(authorized) => authorized,
        Err(response) => return Ok(response),
    };
    let dir = gateway.storage.path(&authorized.repo, authorized.tree);
    dumb::send_file(&dir, file, content_type, policy).await
}

async fn head_file(
    State(gateway): State<Arc<Gateway>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<GitQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, Error> {
    serve_dumb(
        &gateway,
        &owner,
        &repo,
        method,
        &query,
        &headers,
        "HEAD",
        "text/plain",
        CachePolicy::Never,
    )
    .await
}

async fn info_packs(
    State(gateway): State<Arc<Gateway>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<GitQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, Error> {
    serve_dumb(
        &gateway,
        &owner,
        &repo,
        method,
        &query,
        &headers,
        "objects/info/packs",
        "text/plain; charset=utf-8",
        CachePolicy::Forever,
    )
    .await
}

async fn info_file(
    State(gateway): State<Arc<Gateway>>,
    Path((owner, repo, file)): Path<(String, String, String)>,
    Query(query): Query<GitQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, Error> {
    serve_dumb(
        &gateway,
        &owner,
        &repo,
        method,
        &query,
        &headers,
        &format!("objects/info/{file}"),
        "text/plain",
        CachePolicy::Never,
    )
    .await
}

async fn loose_object(
    State(gateway): State<Arc<Gateway>>,
    Path((owner, repo, head, hash)): Path<(String, String, String, String)>,
    Query(query): Query<GitQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, Error> {
    if !is_hex(&head, 2) || !is_hex(&hash, 38) {
        return Err(Error::NotFound("object not found".to_owned()));
    }
    serve_dumb(
        &gateway,
        &owner,
        &repo,
        method,
        &query,
        &headers,
        &format!("objects/{head}/{hash}"),
        "application/x-git-loose-object",
        CachePolicy::Forever,
    )
    .await
}

async fn pack_file(
    State(gateway): State<Arc<Gateway>>,
    Path((owner, repo, file)): Path<(String, String, String)>,
    Query(query): Query<GitQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, Error> {
    let Some(content_type) = pack_content_type(&file) else {
        return Err(Error::NotFound("pack not found".to_owned()));
    };
    serve_dumb(
        &gateway,
        &owner,
        &repo,
        method,
        &query,
        &headers,
        &format!("objects/pack/{file}"),
        content_type,
        CachePolicy::Forever,
    )
    .await
}

fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

/// Classify a `pack-<hash>.pack` / `pack-<hash>.idx` file name; anything
/// else is not served.
fn pack_content_type(file: &str) -> Option<&'static str> {
    let name = file.strip_prefix("pack-")?;
    let (hash, content_type) = if let Some(hash) = name.strip_suffix(".pack") {
        (hash, "application/x-git-packed-objects")
    } else if let Some(hash) = name.strip_suffix(".idx") {
        (hash, "application/x-git-packed-objects-toc")
    } else {
        return None;
    };
    ((40..=64).contains(&hash.len()) && is_hex(hash, hash.len())).then_some(content_type)
}
