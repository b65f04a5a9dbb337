use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, Method};
use axum::response::Response;
use bytes::Bytes;
use futures_util::{future, stream, StreamExt};
use tracing::{debug, warn};

use dagway_store::{ByteStream, NodeError};
use dagway_types::{remove_trailing_slash, RequestPath};

use crate::cache::CacheLayer;
use crate::config::{ConfigError, GatewayConfig};
use crate::error::GatewayError;
use crate::node::{NodeHandle, NodeStatus};
use crate::prefetch::Prefetcher;
use crate::resolver::Resolver;
use crate::response::{
    build_cached, build_from_error, build_method_not_allowed, build_not_modified, build_redirect,
    build_success, etag_for, with_content_path, with_immutable_headers,
};
use crate::sniff::{guess_from_path, SniffStep, Sniffer};

/// Handles every request under the reserved prefix.
///
/// Requests outside the prefix are not touched: [`Gateway::handle`] returns
/// `None` and the caller falls back to its own routing.
pub struct Gateway {
    config: GatewayConfig,
    mount: String,
    resolver: Resolver,
    cache: CacheLayer,
}

impl Gateway {
    /// A gateway with a fresh in-memory cache for `config.cache_generation`.
    pub fn new(config: GatewayConfig, node: Arc<NodeHandle>) -> Result<Self, ConfigError> {
        let cache = CacheLayer::in_memory(config.cache_generation.clone());
        Self::with_cache(config, node, cache)
    }

    pub fn with_cache(
        config: GatewayConfig,
        node: Arc<NodeHandle>,
        cache: CacheLayer,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let prefetch = Prefetcher::new(
            cache.clone(),
            config.prefetch.clone(),
            config.guess_from_extension,
        );
        let resolver = Resolver::new(node, config.index_names.clone()).with_prefetch(prefetch);
        Ok(Self {
            mount: config.mount_point(),
            config,
            resolver,
            cache,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    pub fn node_status(&self) -> NodeStatus {
        self.resolver.node().status()
    }

    /// Path below the mount point, or `None` for requests outside it.
    fn strip_mount<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.mount.as_str())?;
        if rest.is_empty() {
            return Some(rest);
        }
        rest.strip_prefix('/')
    }

    /// Answer a request, or return `None` if it is not under the prefix.
    ///
    /// Every outcome, including failures, becomes a response here.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        let (parts, _) = request.into_parts();
        let path = parts.uri.path();
        let rest = self.strip_mount(path)?;

        if parts.method != Method::GET && parts.method != Method::HEAD {
            return Some(build_method_not_allowed());
        }

        let response = self.respond(path, rest, &parts.headers).await;
        Some(if parts.method == Method::HEAD {
            without_body(response)
        } else {
            response
        })
    }

    async fn respond(&self, path: &str, rest: &str, headers: &HeaderMap) -> Response {
        debug!(path, "received");

        if let Some(entry) = self.cache.lookup(path).await {
            debug!(path, "cache hit");
            if let Some(etag) = entry.etag.as_deref() {
                if if_none_match(headers, etag) {
                    return build_not_modified(etag);
                }
            }
            return build_cached(&entry, &self.content_path_for(rest, path));
        }

        let request_path = match RequestPath::parse(rest) {
            Ok(p) => p,
            Err(err) => return build_from_error(&self.resolver, path, err.into()).await,
        };

        if request_path.has_trailing_slash() && request_path.is_file_shaped() {
            return build_redirect(remove_trailing_slash(path));
        }

        debug!(path = %request_path, "resolving");
        match self.resolver.resolve_multihash(&request_path).await {
            Ok(stream) if request_path.has_trailing_slash() => {
                drop(stream);
                build_redirect(remove_trailing_slash(path))
            }
            Ok(stream) => self.stream_file(path, &request_path, stream, headers).await,
            Err(err) => build_from_error(&self.resolver, path, err).await,
        }
    }

    async fn stream_file(
        &self,
        path: &str,
        request_path: &RequestPath,
        mut stream: ByteStream,
        headers: &HeaderMap,
    ) -> Response {
        let etag = etag_for(&stream.cid());
        if if_none_match(headers, &etag) {
            return build_not_modified(&etag);
        }

        let mut sniffer = Sniffer::new();
        let mut first = None;
        while let Some(chunk) = stream.next_chunk().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(path, error = %err, "stream failed before first chunk");
                    let err = GatewayError::Internal(err.to_string());
                    return build_from_error(&self.resolver, path, err).await;
                }
            };
            match sniffer.observe(&chunk) {
                SniffStep::Deferred => continue,
                step => {
                    first = Some((chunk, step.mime()));
                    break;
                }
            }
        }

        let (body, sniffed) = match first {
            Some((chunk, mime)) => (streaming_body(chunk, stream), mime),
            None => (Body::empty(), None),
        };
        let mime = sniffed.or_else(|| self.guess(request_path));
        debug!(path, mime = mime.unwrap_or("-"), "streaming");

        let response = build_success(body, mime);
        let response = with_immutable_headers(response, &etag);
        with_content_path(response, &self.content_path(request_path))
    }

    fn content_path(&self, request_path: &RequestPath) -> String {
        format!("{}/{}", self.mount, request_path.to_url_path())
    }

    /// Content path for a request answered without resolving it.
    fn content_path_for(&self, rest: &str, path: &str) -> String {
        match RequestPath::parse(rest) {
            Ok(request_path) => self.content_path(&request_path),
            Err(_) => remove_trailing_slash(path).to_string(),
        }
    }

    fn guess(&self, request_path: &RequestPath) -> Option<&'static str> {
        if !self.config.guess_from_extension {
            return None;
        }
        request_path.file_name().and_then(guess_from_path)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("mount", &self.mount)
            .field("resolver", &self.resolver)
            .field("cache", &self.cache)
            .finish()
    }
}

/// The already-read first chunk followed by the rest of the stream.
///
/// The body pulls from the node's channel chunk by chunk. Dropping it drops
/// the receiver, which stops the producer.
fn streaming_body(first: Bytes, rest: ByteStream) -> Body {
    let rest = stream::unfold(rest, |mut rest| async move {
        let chunk = rest.next_chunk().await?;
        if let Err(err) = &chunk {
            warn!(cid = %rest.cid().short(), error = %err, "stream failed mid-transfer");
        }
        Some((chunk, rest))
    });
    Body::from_stream(stream::once(future::ready(Ok::<_, NodeError>(first))).chain(rest))
}

fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|candidate| candidate == etag || candidate == "*")
}

fn without_body(response: Response) -> Response {
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Body::empty())
}
