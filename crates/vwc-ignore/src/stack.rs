use std::path::Path;
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{trace, warn};
use vwc_types::RelativePath;

use crate::error::{IgnoreError, IgnoreResult};

/// Whether the path being matched is a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    File,
    Dir,
}

/// Result of an ignore query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreStatus {
    /// Not ignored; report as untracked.
    Include,
    /// Ignored; report only when ignored files are requested.
    Exclude,
    /// Never reported, not even as ignored.
    Hidden,
}

/// Settings shared by every layer of one stack.
#[derive(Clone, Debug, Default)]
pub struct IgnoreConfig {
    /// Entry names that are never reported (e.g. `.git`).
    pub hidden_names: Vec<String>,
    pub case_insensitive: bool,
}

/// One gitignore layer plus a link to the enclosing directory's layer.
pub struct IgnoreStack {
    parent: Option<Arc<IgnoreStack>>,
    dir: RelativePath,
    rules: Gitignore,
    config: Arc<IgnoreConfig>,
}

impl IgnoreStack {
    /// A root layer with no rules.
    pub fn new(config: IgnoreConfig) -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            dir: RelativePath::root(),
            rules: Gitignore::empty(),
            config: Arc::new(config),
        })
    }

    /// A root layer holding global rules (e.g. a user-level excludes file).
    pub fn with_global_rules(config: IgnoreConfig, contents: &str) -> IgnoreResult<Arc<Self>> {
        let rules = build_rules(&RelativePath::root(), contents, config.case_insensitive)?;
        Ok(Arc::new(Self {
            parent: None,
            dir: RelativePath::root(),
            rules,
            config: Arc::new(config),
        }))
    }

    /// Push the rules of `dir/.gitignore` on top of this stack.
    ///
    /// Lines that fail to parse are skipped with a warning, like git does.
    pub fn push(self: &Arc<Self>, dir: RelativePath, contents: &str) -> IgnoreResult<Arc<Self>> {
        let rules = build_rules(&dir, contents, self.config.case_insensitive)?;
        trace!(dir = %dir, rules = rules.num_ignores() + rules.num_whitelists(), "push ignore layer");
        Ok(Arc::new(Self {
            parent: Some(Arc::clone(self)),
            dir,
            rules,
            config: Arc::clone(&self.config),
        }))
    }

    pub fn dir(&self) -> &RelativePath {
        &self.dir
    }

    /// Number of layers, including this one.
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(1, |p| p.depth() + 1)
    }

    /// Classify `path` (relative to the working-copy root).
    ///
    /// The innermost layer with a matching pattern decides; a negated pattern
    /// (`!foo`) re-includes a path excluded further out.
    pub fn match_path(&self, path: &RelativePath, file_type: FileType) -> IgnoreStatus {
        if let Some(name) = path.file_name() {
            if self.is_hidden_name(name) {
                return IgnoreStatus::Hidden;
            }
        }

        let is_dir = file_type == FileType::Dir;
        let mut layer = Some(self);
        while let Some(current) = layer {
            if let Some(relative) = relative_to(path, &current.dir) {
                let matched = current.rules.matched(Path::new(relative), is_dir);
                if matched.is_ignore() {
                    return IgnoreStatus::Exclude;
                }
                if matched.is_whitelist() {
                    return IgnoreStatus::Include;
                }
            }
            layer = current.parent.as_deref();
        }
        IgnoreStatus::Include
    }

    fn is_hidden_name(&self, name: &str) -> bool {
        let hidden = &self.config.hidden_names;
        if self.config.case_insensitive {
            hidden.iter().any(|h| h.eq_ignore_ascii_case(name))
        } else {
            hidden.iter().any(|h| h == name)
        }
    }
}

impl std::fmt::Debug for IgnoreStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgnoreStack")
            .field("dir", &self.dir)
            .field("depth", &self.depth())
            .finish()
    }
}

fn build_rules(dir: &RelativePath, contents: &str, case_insensitive: bool) -> IgnoreResult<Gitignore> {
    let build_err = |source| IgnoreError::Build {
        dir: dir.to_string(),
        source,
    };
    let mut builder = GitignoreBuilder::new(".");
    builder.case_insensitive(case_insensitive).map_err(build_err)?;
    for line in contents.lines() {
        if let Err(err) = builder.add_line(None, line) {
            warn!(dir = %dir, line, error = %err, "skipping invalid ignore pattern");
        }
    }
    builder.build().map_err(build_err)
}

/// `path` relative to `dir`, or `None` if it is not beneath `dir`.
fn relative_to<'a>(path: &'a RelativePath, dir: &RelativePath) -> Option<&'a str> {
    if dir.is_root() {
        return Some(path.as_str());
    }
    path.as_str()
        .strip_prefix(dir.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
}
