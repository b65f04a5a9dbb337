use std::fmt::Write as _;
use std::sync::Arc;

use tracing::debug;

use dagway_store::{ByteStream, DirEntry, NodeError, ResolvedNode};
use dagway_types::{encode_segment, join_url_parts, remove_trailing_slash, RequestPath};

use crate::error::{GatewayError, GatewayResult};
use crate::node::NodeHandle;
use crate::prefetch::Prefetcher;

/// What to do with a resolved directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryOutcome {
    /// The directory holds an index file; redirect to this entry name.
    IndexRedirect(String),
    /// No index file; serve the rendered listing.
    Listing(RenderedListing),
}

/// A self-contained HTML page listing a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedListing {
    pub html: String,
    pub entries: Vec<DirEntry>,
}

/// Turns request paths into byte streams or directory decisions.
pub struct Resolver {
    node: Arc<NodeHandle>,
    index_names: Vec<String>,
    prefetch: Option<Prefetcher>,
}

impl Resolver {
    pub fn new(node: Arc<NodeHandle>, index_names: Vec<String>) -> Self {
        Self {
            node,
            index_names,
            prefetch: None,
        }
    }

    /// Warm the cache with sibling files whenever a listing is rendered.
    pub fn with_prefetch(mut self, prefetch: Prefetcher) -> Self {
        self.prefetch = Some(prefetch);
        self
    }

    pub fn node(&self) -> &NodeHandle {
        &self.node
    }

    /// Walk `path` and open the file it names.
    ///
    /// A directory is reported as [`GatewayError::IsDirectory`] carrying the
    /// URL-encoded content path, for [`Resolver::resolve_directory`].
    pub async fn resolve_multihash(&self, path: &RequestPath) -> GatewayResult<ByteStream> {
        let node = self.node.get().await?;
        match node.resolve(path).await.map_err(|e| classify(e, path))? {
            ResolvedNode::Directory { cid, .. } => {
                debug!(path = %path, cid = %cid.short(), "directory found");
                Err(GatewayError::IsDirectory(path.to_url_path()))
            }
            ResolvedNode::File { cid, size } => {
                debug!(path = %path, cid = %cid.short(), size, "opening stream");
                node.open_byte_stream(path).await.map_err(|e| classify(e, path))
            }
        }
    }

    /// Decide between an index redirect and a listing for a directory.
    ///
    /// `request_path` is the URL path the client asked for; listing anchors
    /// are absolute paths built from it. `directory` is the URL-encoded
    /// content path carried by [`GatewayError::IsDirectory`].
    pub async fn resolve_directory(
        &self,
        request_path: &str,
        directory: &str,
    ) -> GatewayResult<DirectoryOutcome> {
        let path = RequestPath::parse(directory)?;
        let node = self.node.get().await?;
        let entries = node
            .list_directory(&path)
            .await
            .map_err(|e| classify(e, &path))?;

        let index = self.index_names.iter().find(|name| {
            entries
                .iter()
                .any(|e| &e.name == *name && !e.is_directory())
        });
        if let Some(name) = index {
            debug!(path = %path, index = %name, "index file found");
            return Ok(DirectoryOutcome::IndexRedirect(name.clone()));
        }

        let base = remove_trailing_slash(request_path);
        let html = render_listing(base, !path.is_root(), &entries);
        if let Some(prefetch) = &self.prefetch {
            prefetch.spawn(Arc::clone(&node), path, base.to_string(), entries.clone());
        }
        Ok(DirectoryOutcome::Listing(RenderedListing { html, entries }))
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("node", &self.node)
            .field("index_names", &self.index_names)
            .field("prefetch", &self.prefetch.is_some())
            .finish()
    }
}

/// Absolute URL of a listing entry under `base`. Directories end in `/`.
pub fn entry_href(base: &str, entry: &DirEntry) -> String {
    let href = join_url_parts(&[base, &encode_segment(&entry.name)]);
    if entry.is_directory() {
        format!("{href}/")
    } else {
        href
    }
}

fn render_listing(base: &str, below_root: bool, entries: &[DirEntry]) -> String {
    let title = escape_html(base);
    let mut html = String::with_capacity(256 + entries.len() * 96);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Index of {title}</title>\n</head>\n<body>\n\
         <h1>Index of {title}</h1>\n<ul>\n"
    );
    if below_root {
        if let Some((parent, _)) = base.rsplit_once('/') {
            let _ = writeln!(html, "<li><a href=\"{}/\">..</a></li>", escape_html(parent));
        }
    }
    for entry in entries {
        let suffix = if entry.is_directory() { "/" } else { "" };
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}{suffix}</a> <small>{}</small></li>",
            escape_html(&entry_href(base, entry)),
            escape_html(&entry.name),
            human_size(entry.size),
        );
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Map a node error onto the gateway taxonomy.
pub fn classify(err: NodeError, path: &RequestPath) -> GatewayError {
    match err {
        NodeError::MalformedIdentifier { .. } => GatewayError::MalformedIdentifier(err.to_string()),
        NodeError::NoSuchLink { .. } | NodeError::NotFound(_) => {
            GatewayError::NoSuchLink(err.to_string())
        }
        NodeError::NotAFile(_) => GatewayError::IsDirectory(path.to_url_path()),
        NodeError::Untyped(message) => classify_message(&message, path),
        other => GatewayError::Internal(other.to_string()),
    }
}

/// Classify a node error known only by its text.
///
/// Nodes that cannot report typed errors describe failures in prose. This is
/// the only place that text is matched.
pub fn classify_message(message: &str, path: &RequestPath) -> GatewayError {
    let malformed = message.starts_with("invalid multihash")
        || message.contains("Non-base58 character")
        || message.contains("selected encoding not supported");
    if malformed {
        return GatewayError::MalformedIdentifier(message.to_string());
    }
    let missing = message.starts_with("no link named")
        || message == "file does not exist"
        || message.starts_with("object not found");
    if missing {
        return GatewayError::NoSuchLink(message.to_string());
    }
    if message.starts_with("this dag node is a directory") {
        return GatewayError::IsDirectory(path.to_url_path());
    }
    GatewayError::Internal(message.to_string())
}
