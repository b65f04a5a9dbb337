use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use dagway_types::{encode_segment, join_url_parts, ContentId};

use crate::cache::CacheEntry;
use crate::error::GatewayError;
use crate::resolver::{DirectoryOutcome, Resolver};

/// Content under an identifier never changes.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=29030400, immutable";

/// Header naming the content path a response was served from.
pub const CONTENT_PATH_HEADER: &str = "x-content-path";

/// Content type of rendered directory listings.
pub const LISTING_CONTENT_TYPE: &str = "text/html";

/// Strong entity tag for an identifier.
pub fn etag_for(cid: &ContentId) -> String {
    format!("\"{cid}\"")
}

/// 200 with the given body. Content-Type is set only when known.
pub fn build_success(body: Body, mime: Option<&str>) -> Response {
    let mut response = Response::new(body);
    if let Some(value) = mime.and_then(|m| HeaderValue::from_str(m).ok()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

/// 301 to `target`.
pub fn build_redirect(target: &str) -> Response {
    debug!(target, "redirect");
    match HeaderValue::from_str(target) {
        Ok(location) => {
            let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
            response.headers_mut().insert(header::LOCATION, location);
            response
        }
        Err(_) => build_status(StatusCode::INTERNAL_SERVER_ERROR, "invalid redirect target"),
    }
}

/// 200 carrying a rendered directory listing.
pub fn build_listing(html: String) -> Response {
    build_success(Body::from(html), Some(LISTING_CONTENT_TYPE))
}

/// Plain-text response with the given status.
pub fn build_status(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message.into(),
    )
        .into_response()
}

/// Replay a cached entry with the headers a streamed response would carry.
pub fn build_cached(entry: &CacheEntry, content_path: &str) -> Response {
    let body = Body::from(entry.body.clone());
    let mut response = build_success(body, entry.content_type.as_deref());
    *response.status_mut() = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK);
    if let Some(etag) = &entry.etag {
        response = with_immutable_headers(response, etag);
    }
    with_content_path(response, content_path)
}

/// 304 for a request whose `If-None-Match` matched.
pub fn build_not_modified(etag: &str) -> Response {
    with_immutable_headers(StatusCode::NOT_MODIFIED.into_response(), etag)
}

pub fn build_method_not_allowed() -> Response {
    let mut response = build_status(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
    response
}

/// Attach caching headers for immutable content.
pub fn with_immutable_headers(mut response: Response, etag: &str) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
    );
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert(header::ETAG, value);
    }
    response
}

/// Attach the content path header, e.g. `/ipfs/f01551e.../index.html`.
pub fn with_content_path(mut response: Response, content_path: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(content_path) {
        response.headers_mut().insert(CONTENT_PATH_HEADER, value);
    }
    response
}

/// Status code for an error that needs no further resolution.
pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::IsDirectory(_) => StatusCode::OK,
        GatewayError::NoSuchLink(_) => StatusCode::NOT_FOUND,
        GatewayError::MalformedIdentifier(_) => StatusCode::BAD_REQUEST,
        GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turn a resolution error into a response.
///
/// `IsDirectory` is resolved into an index redirect or a listing. A failure
/// while doing so is mapped by status directly.
pub async fn build_from_error(
    resolver: &Resolver,
    request_path: &str,
    err: GatewayError,
) -> Response {
    let directory = match err {
        GatewayError::IsDirectory(directory) => directory,
        other => return build_error(other),
    };
    match resolver.resolve_directory(request_path, &directory).await {
        Ok(DirectoryOutcome::IndexRedirect(name)) => {
            build_redirect(&join_url_parts(&[request_path, &encode_segment(&name)]))
        }
        Ok(DirectoryOutcome::Listing(listing)) => build_listing(listing.html),
        Err(GatewayError::IsDirectory(_)) => build_error(GatewayError::internal(format!(
            "{directory} could not be listed"
        ))),
        Err(other) => build_error(other),
    }
}

fn build_error(err: GatewayError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!(error = %err, "request failed");
    } else {
        debug!(error = %err, %status, "request rejected");
    }
    build_status(status, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use bytes::Bytes;
    use dagway_store::InMemoryNode;
    use dagway_types::Codec;

    use crate::node::NodeHandle;

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn success_sets_known_type_only() {
        let response = build_success(Body::from("hi"), Some("text/html"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), Some("text/html"));

        let response = build_success(Body::from("hi"), None);
        assert_eq!(content_type(&response), None);
        assert_eq!(body_string(response).await, "hi");
    }

    #[test]
    fn redirect_sets_location() {
        let response = build_redirect("/ipfs/fabc/index.html");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/ipfs/fabc/index.html");
    }

    #[test]
    fn statuses_cover_every_variant() {
        assert_eq!(status_for(&GatewayError::IsDirectory("d".into())), StatusCode::OK);
        assert_eq!(status_for(&GatewayError::NoSuchLink("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&GatewayError::MalformedIdentifier("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GatewayError::internal("x")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn cached_entry_replays_headers() {
        let cid = ContentId::for_content(Codec::Raw, b"x");
        let entry = CacheEntry::ok(
            Bytes::from_static(b"x"),
            Some("text/plain".into()),
            Some(etag_for(&cid)),
        );
        let response = build_cached(&entry, "/ipfs/fabc/x.txt");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), Some("text/plain"));
        assert_eq!(response.headers()[header::ETAG], etag_for(&cid).as_str());
        assert_eq!(response.headers()[header::CACHE_CONTROL], IMMUTABLE_CACHE_CONTROL);
        assert_eq!(response.headers()[CONTENT_PATH_HEADER], "/ipfs/fabc/x.txt");
        assert_eq!(body_string(response).await, "x");
    }

    #[test]
    fn not_modified_and_method_not_allowed() {
        let response = build_not_modified("\"fabc\"");
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[header::ETAG], "\"fabc\"");

        let response = build_method_not_allowed();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
    }

    fn resolver_with_dirs() -> (Resolver, ContentId, ContentId) {
        let node = InMemoryNode::new();
        let page = node.put_file(&b"<html></html>"[..]);
        let note = node.put_file(&b"note"[..]);
        let site = node.put_directory(vec![("index.html", page)]).unwrap();
        let plain = node.put_directory(vec![("note.txt", note)]).unwrap();
        let resolver = Resolver::new(
            Arc::new(NodeHandle::ready(Arc::new(node))),
            vec!["index.html".into()],
        );
        (resolver, site, plain)
    }

    #[tokio::test]
    async fn directory_with_index_redirects() {
        let (resolver, site, _) = resolver_with_dirs();
        let request = format!("/ipfs/{site}");
        let err = GatewayError::IsDirectory(site.to_string());
        let response = build_from_error(&resolver, &request, err).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers()[header::LOCATION],
            format!("/ipfs/{site}/index.html").as_str()
        );
    }

    #[tokio::test]
    async fn directory_without_index_lists() {
        let (resolver, _, plain) = resolver_with_dirs();
        let request = format!("/ipfs/{plain}/");
        let err = GatewayError::IsDirectory(plain.to_string());
        let response = build_from_error(&resolver, &request, err).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), Some("text/html"));
        let body = body_string(response).await;
        assert!(body.contains(&format!("<a href=\"/ipfs/{plain}/note.txt\">")));
    }

    #[tokio::test]
    async fn plain_errors_map_to_status() {
        let (resolver, _, _) = resolver_with_dirs();
        let err = GatewayError::NoSuchLink("gone".into());
        let response = build_from_error(&resolver, "/ipfs/x", err).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "gone");

        let err = GatewayError::MalformedIdentifier("bad".into());
        let response = build_from_error(&resolver, "/ipfs/x", err).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = build_from_error(&resolver, "/ipfs/x", GatewayError::internal("boom")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn failed_directory_handling_maps_again() {
        let (resolver, _, _) = resolver_with_dirs();
        let unknown = ContentId::for_content(Codec::DagPb, b"nowhere");
        let err = GatewayError::IsDirectory(unknown.to_string());
        let response = build_from_error(&resolver, "/ipfs/x", err).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
