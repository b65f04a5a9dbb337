use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use dagway_types::ContentId;

use crate::error::{NodeError, NodeResult};
use crate::memory::InMemoryNode;

/// Import a local file or directory tree into `node`.
///
/// Directories are built bottom-up: every child is stored before the
/// directory linking it. Symlinks and other special files are skipped.
/// Returns the identifier of `root`.
pub fn import_path(node: &InMemoryNode, root: &Path) -> NodeResult<ContentId> {
    let mut pending: HashMap<PathBuf, Vec<(String, ContentId)>> = HashMap::new();
    let mut root_id = None;
    let mut files = 0usize;

    for entry in WalkDir::new(root).contents_first(true).sort_by_file_name() {
        let entry = entry.map_err(|e| NodeError::Io(e.into()))?;
        let file_type = entry.file_type();

        let cid = if file_type.is_file() {
            files += 1;
            node.put_file(std::fs::read(entry.path())?)
        } else if file_type.is_dir() {
            let links = pending.remove(entry.path()).unwrap_or_default();
            node.put_directory(links)?
        } else {
            debug!(path = %entry.path().display(), "skipping non-regular entry");
            continue;
        };

        if entry.depth() == 0 {
            root_id = Some(cid);
            continue;
        }

        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| {
                NodeError::InvalidLinkName(entry.file_name().to_string_lossy().into_owned())
            })?
            .to_string();
        let parent = entry.path().parent().map(Path::to_path_buf).unwrap_or_default();
        pending.entry(parent).or_default().push((name, cid));
    }

    let root_id = root_id.ok_or_else(|| {
        NodeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a file or directory", root.display()),
        ))
    })?;
    info!(root = %root.display(), cid = %root_id, files, "imported");
    Ok(root_id)
}

/// Compute the identifier `root` would have, without keeping the content.
pub fn hash_path(root: &Path) -> NodeResult<ContentId> {
    import_path(&InMemoryNode::new(), root)
}
