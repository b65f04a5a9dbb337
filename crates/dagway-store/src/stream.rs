use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

use dagway_types::ContentId;

use crate::error::{NodeError, NodeResult};

/// Chunking and buffering limits for byte streams.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum bytes per emitted chunk.
    pub chunk_size: usize,
    /// Chunks the producer may run ahead of the reader.
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            channel_capacity: 8,
        }
    }
}

/// Producer half of a [`ByteStream`].
#[derive(Clone, Debug)]
pub struct ChunkSender {
    tx: mpsc::Sender<NodeResult<Bytes>>,
}

impl ChunkSender {
    /// Push a chunk, waiting for channel capacity.
    ///
    /// Returns `false` once the reader is gone; the producer should stop.
    pub async fn send(&self, chunk: Bytes) -> bool {
        self.tx.send(Ok(chunk)).await.is_ok()
    }

    /// Report a failure to the reader. Ends the stream from the reader's view.
    pub async fn fail(&self, err: NodeError) {
        let _ = self.tx.send(Err(err)).await;
    }

    /// Whether the reader has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Handle to the bytes of one file node.
///
/// Chunks arrive over a bounded channel: the producer cannot run more than
/// `channel_capacity` chunks ahead of the reader. Dropping the stream closes
/// the channel, which stops the producer at its next send.
#[derive(Debug)]
pub struct ByteStream {
    cid: ContentId,
    size: u64,
    rx: mpsc::Receiver<NodeResult<Bytes>>,
}

impl ByteStream {
    /// Create a connected sender/stream pair.
    pub fn channel(cid: ContentId, size: u64, capacity: usize) -> (ChunkSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ChunkSender { tx }, Self { cid, size, rx })
    }

    /// Stream in-memory bytes in `config.chunk_size` pieces from a spawned task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_bytes(cid: ContentId, data: Bytes, config: &StreamConfig) -> Self {
        let (sender, stream) = Self::channel(cid, data.len() as u64, config.channel_capacity);
        let chunk_size = config.chunk_size.max(1);
        tokio::spawn(async move {
            let mut offset = 0;
            while offset < data.len() {
                let end = (offset + chunk_size).min(data.len());
                if !sender.send(data.slice(offset..end)).await {
                    trace!(cid = %cid.short(), offset, "reader dropped, stopping stream");
                    return;
                }
                offset = end;
            }
        });
        stream
    }

    /// Identifier of the file being streamed.
    pub fn cid(&self) -> ContentId {
        self.cid
    }

    /// Declared total size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Next chunk, or `None` at end of stream.
    pub async fn next_chunk(&mut self) -> Option<NodeResult<Bytes>> {
        self.rx.recv().await
    }

    /// Collect the remaining chunks, failing if more than `limit` bytes arrive.
    pub async fn read_to_end(mut self, limit: Option<u64>) -> NodeResult<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await {
            let chunk = chunk?;
            if let Some(limit) = limit {
                if (buf.len() + chunk.len()) as u64 > limit {
                    return Err(NodeError::Stream(format!(
                        "stream for {} exceeds {limit} bytes",
                        self.cid
                    )));
                }
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagway_types::Codec;

    fn cid() -> ContentId {
        ContentId::for_content(Codec::Raw, b"stream")
    }

    #[tokio::test]
    async fn chunks_in_order() {
        let config = StreamConfig { chunk_size: 4, channel_capacity: 1 };
        let mut stream = ByteStream::from_bytes(cid(), Bytes::from_static(b"0123456789"), &config);
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next_chunk().await {
            chunks.push(chunk.unwrap());
        }
        assert_eq!(chunks, vec![&b"0123"[..], &b"4567"[..], &b"89"[..]]);
    }

    #[tokio::test]
    async fn empty_data_ends_immediately() {
        let mut stream = ByteStream::from_bytes(cid(), Bytes::new(), &StreamConfig::default());
        assert!(stream.next_chunk().await.is_none());
        assert_eq!(stream.size(), 0);
    }

    #[tokio::test]
    async fn read_to_end_collects() {
        let config = StreamConfig { chunk_size: 3, channel_capacity: 2 };
        let stream = ByteStream::from_bytes(cid(), Bytes::from_static(b"hello world"), &config);
        assert_eq!(stream.read_to_end(None).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn read_to_end_enforces_limit() {
        let data = Bytes::from_static(b"hello world");
        let stream = ByteStream::from_bytes(cid(), data, &StreamConfig::default());
        let err = stream.read_to_end(Some(4)).await.unwrap_err();
        assert!(matches!(err, NodeError::Stream(_)));
    }

    #[tokio::test]
    async fn producer_sees_dropped_reader() {
        let (sender, stream) = ByteStream::channel(cid(), 3, 1);
        drop(stream);
        assert!(sender.is_closed());
        assert!(!sender.send(Bytes::from_static(b"abc")).await);
    }

    #[tokio::test]
    async fn failure_reaches_reader() {
        let (sender, mut stream) = ByteStream::channel(cid(), 3, 1);
        tokio::spawn(async move {
            sender.fail(NodeError::Stream("disk gone".into())).await;
        });
        let err = stream.next_chunk().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("disk gone"));
    }
}
