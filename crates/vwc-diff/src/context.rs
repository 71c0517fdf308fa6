use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vwc_store::ObjectStore;
use vwc_types::{filtered_entry_dtype, filtered_entry_type, Dtype, EntryType, RelativePath};

use crate::callback::DiffCallback;
use crate::deferred::DeferredDiffEntry;
use crate::options::DiffOptions;
use crate::scheduler::TaskSpawner;

/// State shared by every task of one diff run.
pub struct DiffContext {
    options: DiffOptions,
    store: Arc<dyn ObjectStore>,
    callback: Arc<dyn DiffCallback>,
    cancel: CancellationToken,
    spawner: TaskSpawner,
}

impl DiffContext {
    pub(crate) fn new(
        options: DiffOptions,
        store: Arc<dyn ObjectStore>,
        callback: Arc<dyn DiffCallback>,
        cancel: CancellationToken,
        spawner: TaskSpawner,
    ) -> Self {
        Self {
            options,
            store,
            callback,
            cancel,
            spawner,
        }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn callback(&self) -> &dyn DiffCallback {
        self.callback.as_ref()
    }

    pub fn list_ignored(&self) -> bool {
        self.options.list_ignored
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Hand a child task to the scheduler.
    pub fn defer(&self, entry: DeferredDiffEntry) {
        self.spawner.submit(entry);
    }

    /// Snapshot entry type as the live tree would present it.
    pub fn filtered_type(&self, entry_type: EntryType) -> EntryType {
        filtered_entry_type(entry_type, self.options.symlinks_enabled)
    }

    pub fn filtered_dtype(&self, dtype: Dtype) -> Dtype {
        filtered_entry_dtype(dtype, self.options.symlinks_enabled)
    }

    /// Report an untracked path as added, or as ignored when `is_ignored`
    /// and ignored paths are listed. Returns whether anything was reported.
    pub(crate) fn report_untracked(&self, path: &RelativePath, dtype: Dtype, is_ignored: bool) -> bool {
        if !is_ignored {
            self.callback.added_path(path, dtype);
            true
        } else if self.options.list_ignored {
            self.callback.ignored_path(path, dtype);
            true
        } else {
            false
        }
    }

    /// Report a live directory standing where the snapshot has a file.
    ///
    /// The directory is always reported as added unless it is ignored and
    /// ignored paths are not listed. Returns whether its contents should be
    /// walked.
    pub(crate) fn report_dir_over_file(&self, path: &RelativePath, is_ignored: bool) -> bool {
        if is_ignored && !self.options.list_ignored {
            return false;
        }
        self.callback.added_path(path, Dtype::Dir);
        true
    }
}

impl std::fmt::Debug for DiffContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffContext")
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
