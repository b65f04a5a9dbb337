use std::sync::Arc;

use bytes::BytesMut;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use dagway_store::{ContentNode, DirEntry, NodeError, NodeResult};
use dagway_types::RequestPath;

use crate::cache::{CacheEntry, CacheLayer};
use crate::config::PrefetchConfig;
use crate::response::etag_for;
use crate::resolver::entry_href;
use crate::sniff::{guess_from_path, SniffStep, Sniffer};

/// Fills the cache with the files of a freshly listed directory.
///
/// Each file is stored under the anchor the listing points at, so following
/// a link from the listing is answered from the cache.
#[derive(Clone, Debug)]
pub struct Prefetcher {
    cache: CacheLayer,
    config: PrefetchConfig,
    guess_from_extension: bool,
}

impl Prefetcher {
    pub fn new(cache: CacheLayer, config: PrefetchConfig, guess_from_extension: bool) -> Self {
        Self {
            cache,
            config,
            guess_from_extension,
        }
    }

    /// Start a background fill for `entries` of the directory at `dir`.
    ///
    /// `base` is the URL path the listing was served under.
    pub fn spawn(
        &self,
        node: Arc<dyn ContentNode>,
        dir: RequestPath,
        base: String,
        entries: Vec<DirEntry>,
    ) -> Option<JoinHandle<usize>> {
        if self.config.max_files == 0 {
            return None;
        }
        let this = self.clone();
        Some(tokio::spawn(async move {
            this.fill(node.as_ref(), &dir, &base, &entries).await
        }))
    }

    /// Fetch eligible files into the cache. Returns how many were stored.
    pub async fn fill(
        &self,
        node: &dyn ContentNode,
        dir: &RequestPath,
        base: &str,
        entries: &[DirEntry],
    ) -> usize {
        let candidates = entries
            .iter()
            .filter(|e| !e.is_directory() && e.size <= self.config.max_bytes)
            .take(self.config.max_files);

        let mut stored = 0;
        for entry in candidates {
            let key = entry_href(base, entry);
            if self.cache.lookup(&key).await.is_some() {
                trace!(key = %key, "already cached");
                continue;
            }
            match self.fetch(node, &dir.child(entry.name.clone())).await {
                Ok(cached) => {
                    self.cache.store(key, cached).await;
                    stored += 1;
                }
                Err(err) => debug!(name = %entry.name, error = %err, "prefetch skipped"),
            }
        }
        debug!(dir = %dir, stored, "prefetch finished");
        stored
    }

    /// Read a file into a cache entry, sniffing exactly as a streamed
    /// response would: the first non-empty chunk only.
    async fn fetch(&self, node: &dyn ContentNode, path: &RequestPath) -> NodeResult<CacheEntry> {
        let mut stream = node.open_byte_stream(path).await?;
        let etag = etag_for(&stream.cid());

        let mut sniffer = Sniffer::new();
        let mut sniffed = None;
        let mut body = BytesMut::new();
        while let Some(chunk) = stream.next_chunk().await {
            let chunk = chunk?;
            if (body.len() + chunk.len()) as u64 > self.config.max_bytes {
                return Err(NodeError::Stream(format!(
                    "{} exceeds {} bytes",
                    stream.cid(),
                    self.config.max_bytes
                )));
            }
            if let SniffStep::Classified(found) = sniffer.observe(&chunk) {
                sniffed = found.map(|found| found.mime);
            }
            body.extend_from_slice(&chunk);
        }

        let mime = sniffed.or_else(|| {
            if self.guess_from_extension {
                path.file_name().and_then(guess_from_path)
            } else {
                None
            }
        });
        Ok(CacheEntry::ok(body.freeze(), mime.map(str::to_string), Some(etag)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagway_store::{InMemoryNode, LinkKind, StreamConfig};
    use dagway_types::{Codec, ContentId};

    fn setup() -> (Arc<InMemoryNode>, ContentId) {
        let node = InMemoryNode::new();
        let small = node.put_file(&b"GIF89a tiny"[..]);
        let plain = node.put_file(&b"body { color: red }"[..]);
        let big = node.put_file(vec![b'x'; 4096]);
        let sub = node.put_directory(vec![("plain.css", plain)]).unwrap();
        let dir = node
            .put_directory(vec![
                ("a.gif", small),
                ("b.css", plain),
                ("big.bin", big),
                ("sub", sub),
            ])
            .unwrap();
        (Arc::new(node), dir)
    }

    async fn entries(node: &InMemoryNode, dir: &ContentId) -> Vec<DirEntry> {
        node.list_directory(&RequestPath::parse(&dir.to_string()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fills_small_files_only() {
        let (node, dir) = setup();
        let cache = CacheLayer::in_memory("test");
        let prefetcher = Prefetcher::new(
            cache.clone(),
            PrefetchConfig { max_files: 10, max_bytes: 1024 },
            true,
        );
        let base = format!("/ipfs/{dir}");
        let listed = entries(&node, &dir).await;
        let dir_path = RequestPath::parse(&dir.to_string()).unwrap();

        let stored = prefetcher.fill(node.as_ref(), &dir_path, &base, &listed).await;
        assert_eq!(stored, 2);

        let gif = cache.lookup(&format!("{base}/a.gif")).await.unwrap();
        assert_eq!(gif.content_type.as_deref(), Some("image/gif"));
        assert_eq!(gif.body, "GIF89a tiny");
        assert!(gif.etag.is_some());

        let css = cache.lookup(&format!("{base}/b.css")).await.unwrap();
        assert_eq!(css.content_type.as_deref(), Some("text/css"));

        assert!(cache.lookup(&format!("{base}/big.bin")).await.is_none());
        assert!(cache.lookup(&format!("{base}/sub/")).await.is_none());
    }

    #[tokio::test]
    async fn respects_file_limit_and_existing_entries() {
        let (node, dir) = setup();
        let cache = CacheLayer::in_memory("test");
        let base = format!("/ipfs/{dir}");
        cache
            .store(format!("{base}/a.gif"), CacheEntry::ok("old".into(), None, None))
            .await;

        let prefetcher = Prefetcher::new(
            cache.clone(),
            PrefetchConfig { max_files: 1, max_bytes: 1024 },
            true,
        );
        let listed = entries(&node, &dir).await;
        let dir_path = RequestPath::parse(&dir.to_string()).unwrap();
        let stored = prefetcher.fill(node.as_ref(), &dir_path, &base, &listed).await;

        assert_eq!(stored, 0);
        assert_eq!(cache.lookup(&format!("{base}/a.gif")).await.unwrap().body, "old");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn disabled_prefetch_spawns_nothing() {
        let (node, dir) = setup();
        let prefetcher = Prefetcher::new(
            CacheLayer::in_memory("test"),
            PrefetchConfig { max_files: 0, max_bytes: 1024 },
            true,
        );
        let listed = entries(&node, &dir).await;
        let handle = prefetcher.spawn(
            node,
            RequestPath::parse(&dir.to_string()).unwrap(),
            format!("/ipfs/{dir}"),
            listed,
        );
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn sniffs_only_the_first_chunk() {
        let node = InMemoryNode::with_stream_config(StreamConfig {
            chunk_size: 16,
            channel_capacity: 2,
        });
        let doc = node.put_file(&b"<?xml version=\"1.0\"?>\n<svg></svg>"[..]);
        let dir = node.put_directory(vec![("doc", doc)]).unwrap();
        let cache = CacheLayer::in_memory("test");
        let prefetcher = Prefetcher::new(cache.clone(), PrefetchConfig::default(), false);
        let base = format!("/ipfs/{dir}");
        let listed = entries(&node, &dir).await;
        let dir_path = RequestPath::parse(&dir.to_string()).unwrap();

        assert_eq!(prefetcher.fill(&node, &dir_path, &base, &listed).await, 1);
        let cached = cache.lookup(&format!("{base}/doc")).await.unwrap();
        assert_eq!(cached.content_type.as_deref(), Some("application/xml"));
        assert_eq!(cached.body.len(), 33);
    }

    #[tokio::test]
    async fn unreadable_entry_is_skipped() {
        let node = Arc::new(InMemoryNode::new());
        let ghost = DirEntry::new(
            "ghost.txt",
            ContentId::for_content(Codec::Raw, b"ghost"),
            LinkKind::File,
            5,
        );
        let dir = node.put_directory(Vec::<(String, ContentId)>::new()).unwrap();
        let cache = CacheLayer::in_memory("test");
        let prefetcher = Prefetcher::new(cache.clone(), PrefetchConfig::default(), true);
        let dir_path = RequestPath::parse(&dir.to_string()).unwrap();

        let stored = prefetcher.fill(node.as_ref(), &dir_path, "/ipfs/x", &[ghost]).await;
        assert_eq!(stored, 0);
        assert!(cache.is_empty().await);
    }
}
