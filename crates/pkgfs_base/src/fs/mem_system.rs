use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use tracing::{debug, instrument, warn};

use crate::error::{ErrorKind, Result};

use super::empty_fs::EmptySystem;
use super::file_info::FileMode;
use super::file_path::FilePath;
use super::mem_file::MemFile;
use super::traits::{File, System, SystemHandle};

/* 📖 # Why do directories store child paths instead of child files?

Every file lives exactly once in the arena, keyed by its cleaned path. A directory
only records the keys of its children and its listing is assembled from the
children's records when it is opened. A file that is opened directly and a file
that shows up in a listing are therefore always the same record, no copy can go
stale.
*/

#[derive(Debug)]
struct Node {
    file: MemFile,
    children: BTreeSet<FilePath>,
}

impl Node {
    fn new(file: MemFile) -> Self {
        Self {
            file,
            children: BTreeSet::new(),
        }
    }
}

/// In-memory namespace built from a flat list of files.
///
/// Every ancestor directory of every input path is synthesized, including the root.
/// Opening a name hands out an independent handle: reads, writes and seeks on it
/// never affect the namespace or other handles.
///
/// # Examples
///
/// ```
/// use pkgfs_base::fs::{FileMode, MemFile, MemSystem, System};
/// use std::time::SystemTime;
///
/// let system = MemSystem::build([
///     ("d/foo", MemFile::new("foo", FileMode::new(0o644), SystemTime::now(), b"foo".to_vec())),
///     ("d/bar", MemFile::new("bar", FileMode::new(0o644), SystemTime::now(), b"bar".to_vec())),
/// ]);
/// let mut dir = system.open("d").unwrap();
/// assert_eq!(dir.readdirnames(0).unwrap().entries, ["bar", "foo"]);
/// assert_eq!(system.read_file_to_string("/d/foo").unwrap(), "foo");
/// ```
#[derive(Debug)]
pub struct MemSystem {
    nodes: BTreeMap<FilePath, Node>,
}

fn synthesized_dir(path: &FilePath) -> MemFile {
    MemFile::new_dir(path.to_string(), FileMode::dir(0o755), SystemTime::now(), vec![])
}

impl MemSystem {
    /// Builds the namespace, or a backend that reports the construction error for
    /// every name.
    pub fn build<N: AsRef<str>>(files: impl IntoIterator<Item = (N, MemFile)>) -> SystemHandle {
        match Self::try_build(files) {
            Ok(system) => SystemHandle::new(system),
            Err(err) => {
                warn!("In-memory namespace construction failed: {}", err);
                SystemHandle::new(EmptySystem::with_error(err))
            }
        }
    }

    /// Builds the namespace, failing when a name is invalid or when an ancestor of
    /// some path is a regular file.
    #[instrument(skip(files))]
    pub fn try_build<N: AsRef<str>>(files: impl IntoIterator<Item = (N, MemFile)>) -> Result<Self> {
        let mut nodes = BTreeMap::new();
        let root = FilePath::root();
        nodes.insert(root.clone(), Node::new(synthesized_dir(&root)));

        let mut inserted = Vec::new();
        for (name, mut file) in files {
            let path = FilePath::clean(name.as_ref())?;
            file.set_name(path.to_string());
            debug!("Adding {} ({})", path, file.info().mode());
            nodes.insert(path.clone(), Node::new(file));
            inserted.push(path);
        }

        for path in inserted {
            Self::link_ancestors(&mut nodes, path)?;
        }
        debug!("Built in-memory namespace with {} entries", nodes.len());
        Ok(Self { nodes })
    }

    /// Registers `path` with its parent, synthesizing missing ancestors up to the root.
    fn link_ancestors(nodes: &mut BTreeMap<FilePath, Node>, path: FilePath) -> Result<()> {
        let mut child = path;
        while let Some(parent) = child.parent() {
            match nodes.get_mut(&parent) {
                Some(node) => {
                    if !node.file.is_dir() {
                        return Err(ErrorKind::NotADirectory {
                            path: parent.to_string(),
                        }
                        .into());
                    }
                    node.children.insert(child);
                    return Ok(());
                }
                None => {
                    debug!("Synthesizing directory {}", parent);
                    let mut node = Node::new(synthesized_dir(&parent));
                    node.children.insert(child);
                    nodes.insert(parent.clone(), node);
                    child = parent;
                }
            }
        }
        Ok(())
    }

    /// Number of entries, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Cleaned paths of every entry, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &FilePath> {
        self.nodes.keys()
    }
}

impl System for MemSystem {
    #[instrument(skip(self))]
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        let path = FilePath::clean(name)?;
        let node = self.nodes.get(&path).ok_or_else(|| ErrorKind::NotFound {
            path: path.to_string(),
        })?;
        let mut file = node.file.reopened(path.to_string());
        if file.is_dir() {
            let entries = node
                .children
                .iter()
                .filter_map(|child| self.nodes.get(child))
                .map(|child| child.file.info().clone())
                .collect();
            file.set_entries(entries)?;
        }
        debug!("Opened {}", path);
        Ok(Box::new(file))
    }
}
