use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A normalized, slash-separated path relative to the working-copy root.
///
/// The empty path denotes the root itself. Components are never empty, `.`
/// or `..`, and the path never starts or ends with a slash.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// The root path (empty).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse and validate a relative path.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        if path.is_empty() {
            return Ok(Self::root());
        }
        if path.starts_with('/') {
            return Err(TypeError::InvalidPath {
                path,
                reason: "path must be relative",
            });
        }
        if path.ends_with('/') {
            return Err(TypeError::InvalidPath {
                path,
                reason: "trailing slash",
            });
        }
        if !path.split('/').all(is_valid_component) {
            return Err(TypeError::InvalidPath {
                path,
                reason: "empty, '.' or '..' component",
            });
        }
        Ok(Self(path))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append one validated component.
    pub fn try_join(&self, name: &str) -> Result<Self, TypeError> {
        if !is_valid_component(name) || name.contains('/') {
            return Err(TypeError::InvalidComponent(name.to_string()));
        }
        Ok(self.join_unchecked(name))
    }

    /// Append one component.
    ///
    /// `name` comes from a tree entry or a live directory listing, both of
    /// which only hold single valid components.
    pub fn join(&self, name: &str) -> Self {
        debug_assert!(
            is_valid_component(name) && !name.contains('/'),
            "invalid path component {name:?}"
        );
        self.join_unchecked(name)
    }

    fn join_unchecked(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    /// Last component, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.0.is_empty() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty())
    }

    /// Returns `true` if `self` equals `ancestor` or lies beneath it.
    pub fn starts_with(&self, ancestor: &RelativePath) -> bool {
        if ancestor.is_root() {
            return true;
        }
        match self.0.strip_prefix(ancestor.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

fn is_valid_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

impl fmt::Debug for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
