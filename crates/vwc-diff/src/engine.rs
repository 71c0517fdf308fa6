use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use vwc_ignore::IgnoreStack;
use vwc_live::DirectoryNode;
use vwc_store::ObjectStore;
use vwc_types::{ObjectId, RelativePath};

use crate::callback::{DiffCallback, ScmStatus, StatusCollector};
use crate::context::DiffContext;
use crate::deferred::DeferredDiffEntry;
use crate::error::DiffResult;
use crate::options::DiffOptions;
use crate::scheduler::{self, DiffStats};

/// Entry point for diff runs against one object store.
pub struct DiffEngine {
    store: Arc<dyn ObjectStore>,
    options: DiffOptions,
    ignore: Arc<IgnoreStack>,
    cancel: CancellationToken,
}

impl DiffEngine {
    pub fn new(store: Arc<dyn ObjectStore>, options: DiffOptions) -> Self {
        let ignore = IgnoreStack::new(options.ignore_config());
        Self {
            store,
            options,
            ignore,
            cancel: CancellationToken::new(),
        }
    }

    /// Apply `contents` (gitignore syntax) beneath every `.gitignore` found in
    /// the live tree, like a user-level excludes file.
    pub fn with_global_ignore(mut self, contents: &str) -> DiffResult<Self> {
        self.ignore = IgnoreStack::with_global_rules(self.options.ignore_config(), contents)?;
        Ok(self)
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Token that cancels every run of this engine, current and future.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Compare live directory `root` with the snapshot trees `scm_root_ids`.
    ///
    /// Events go to `callback` as they are found; the call returns once every
    /// task has finished. Snapshot trees are matched in order, so the first id
    /// supplies the first candidate for every name. With no ids at all, the
    /// whole live tree is untracked.
    pub async fn diff(
        &self,
        root: Arc<DirectoryNode>,
        scm_root_ids: &[ObjectId],
        callback: Arc<dyn DiffCallback>,
    ) -> DiffResult<DiffStats> {
        debug!(roots = scm_root_ids.len(), "starting working copy diff");
        let task = DeferredDiffEntry::Root {
            path: RelativePath::root(),
            dir: root,
            scm_tree_ids: scm_root_ids.to_vec(),
            ignore: Arc::clone(&self.ignore),
        };
        self.run(task, callback).await
    }

    /// [`diff`](Self::diff) folded into a per-file status map.
    pub async fn status(
        &self,
        root: Arc<DirectoryNode>,
        scm_root_ids: &[ObjectId],
    ) -> DiffResult<ScmStatus> {
        let collector = Arc::new(StatusCollector::new());
        self.diff(root, scm_root_ids, collector.clone()).await?;
        Ok(collector.status())
    }

    /// Compare two snapshot trees. Ignore rules do not apply.
    pub async fn diff_snapshots(
        &self,
        scm_tree_id: ObjectId,
        wd_tree_id: ObjectId,
        callback: Arc<dyn DiffCallback>,
    ) -> DiffResult<DiffStats> {
        debug!(scm = %scm_tree_id.short_hex(), wd = %wd_tree_id.short_hex(), "starting snapshot diff");
        let task = DeferredDiffEntry::ModifiedScm {
            path: RelativePath::root(),
            scm_tree_id,
            wd_tree_id,
        };
        self.run(task, callback).await
    }

    async fn run(&self, task: DeferredDiffEntry, callback: Arc<dyn DiffCallback>) -> DiffResult<DiffStats> {
        let (spawner, queue) = scheduler::channel();
        let ctx = Arc::new(DiffContext::new(
            self.options.clone(),
            Arc::clone(&self.store),
            callback,
            self.cancel.child_token(),
            spawner,
        ));
        ctx.defer(task);
        scheduler::run(ctx, queue).await
    }
}

impl std::fmt::Debug for DiffEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffEngine")
            .field("options", &self.options)
            .field("ignore", &self.ignore)
            .finish()
    }
}
