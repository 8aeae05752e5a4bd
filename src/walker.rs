use crate::storage::{ObjectStore, StorageEntry};
use serde::Serialize;
use std::collections::HashSet;

/// Extensions the pipeline knows how to materialize, matched
/// case-insensitively against the end of the path.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = [".pdf", ".html", ".htm"];

/// How many raw entries of each listing the trace keeps.
const SAMPLE_LEN: usize = 5;

/// One visited prefix in the traversal, for operator troubleshooting of
/// storage-policy misconfiguration. Never consulted by program logic.
#[derive(Debug, Clone, Serialize)]
pub struct WalkVisit {
    pub prefix: String,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_sample: Option<Vec<StorageEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkTrace {
    pub walk: Vec<WalkVisit>,
}

enum WorkItem {
    /// A prefix still to be listed at the given depth.
    Level(String, u32),
    /// A file path already discovered, queued to keep emission order
    /// identical to an in-order depth-first walk.
    File(String),
}

/// Depth-bounded recursive discovery over an untrusted hierarchical
/// listing API.
pub struct TreeWalker {
    max_depth: u32,
}

impl TreeWalker {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }

    /// Walk the store from `root` and return every reachable file path with
    /// a supported extension, plus the per-prefix diagnostic trace.
    ///
    /// A listing error aborts only that subtree. The (prefix, depth) visit
    /// guard protects against the listing API reporting the same directory
    /// more than once, or a hierarchy that loops back on itself.
    pub async fn list_files<S: ObjectStore + Sync>(
        &self,
        store: &S,
        root: &str,
    ) -> (Vec<String>, WalkTrace) {
        let mut trace = WalkTrace::default();
        let mut results: Vec<String> = Vec::new();
        let mut visited: HashSet<(String, u32)> = HashSet::new();
        let mut stack: Vec<WorkItem> = vec![WorkItem::Level(root.to_string(), 0)];

        while let Some(item) = stack.pop() {
            let (prefix, depth) = match item {
                WorkItem::File(path) => {
                    results.push(path);
                    continue;
                }
                WorkItem::Level(prefix, depth) => (prefix, depth),
            };

            let key = (normalize_prefix(&prefix).to_string(), depth);
            if depth > self.max_depth || !visited.insert(key) {
                continue;
            }

            let listing = store.list_level(Some(prefix.as_str())).await;
            match listing {
                Err(e) => {
                    log::warn!("Listing failed at prefix {prefix:?} depth {depth}: {e}");
                    trace.walk.push(WalkVisit {
                        prefix: normalize_prefix(&prefix).to_string(),
                        depth,
                        listing_sample: None,
                        error: Some(e.to_string()),
                    });
                }
                Ok(entries) => {
                    trace.walk.push(WalkVisit {
                        prefix: normalize_prefix(&prefix).to_string(),
                        depth,
                        listing_sample: Some(entries.iter().take(SAMPLE_LEN).cloned().collect()),
                        error: None,
                    });
                    // Reverse push so the stack pops children in listing
                    // order, descending into each directory before its
                    // later siblings.
                    for entry in entries.iter().rev() {
                        let path = join_prefix(&prefix, &entry.name);
                        if entry.is_file() {
                            stack.push(WorkItem::File(path));
                        } else {
                            stack.push(WorkItem::Level(path, depth + 1));
                        }
                    }
                }
            }
        }

        let files = results
            .into_iter()
            .filter(|p| has_supported_extension(p))
            .collect();
        (files, trace)
    }
}

/// The listing API treats `""`, `"/"` and a missing prefix as the root.
fn normalize_prefix(prefix: &str) -> &str {
    if prefix == "/" {
        ""
    } else {
        prefix
    }
}

fn join_prefix(prefix: &str, name: &str) -> String {
    let prefix = normalize_prefix(prefix);
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), name)
    }
}

pub fn has_supported_extension(path: &str) -> bool {
    let low = path.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| low.ends_with(ext))
}
