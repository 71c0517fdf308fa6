use std::sync::Arc;

use vwc_types::{Dtype, EntryType, ObjectId};

use crate::directory::DirectoryNode;
use crate::file::FileNode;

/// A resolved node of the live tree.
#[derive(Clone, Debug)]
pub enum LiveNode {
    File(Arc<FileNode>),
    Directory(Arc<DirectoryNode>),
}

impl LiveNode {
    pub fn entry_type(&self) -> EntryType {
        match self {
            Self::File(file) => file.entry_type(),
            Self::Directory(_) => EntryType::Tree,
        }
    }

    pub fn dtype(&self) -> Dtype {
        self.entry_type().dtype()
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn as_directory(&self) -> Option<&Arc<DirectoryNode>> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&Arc<FileNode>> {
        match self {
            Self::File(file) => Some(file),
            Self::Directory(_) => None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        match self {
            Self::File(file) => file.is_materialized(),
            Self::Directory(dir) => dir.is_materialized(),
        }
    }

    /// The store id this node still mirrors verbatim, if unmaterialized.
    pub fn stable_id(&self) -> Option<ObjectId> {
        match self {
            Self::File(file) => file.blob_id(),
            Self::Directory(dir) => dir.tree_id(),
        }
    }
}

impl From<Arc<FileNode>> for LiveNode {
    fn from(file: Arc<FileNode>) -> Self {
        Self::File(file)
    }
}

impl From<Arc<DirectoryNode>> for LiveNode {
    fn from(dir: Arc<DirectoryNode>) -> Self {
        Self::Directory(dir)
    }
}
