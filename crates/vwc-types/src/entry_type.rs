use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a source-control tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Normal file (0o100644).
    RegularFile,
    /// Executable file (0o100755).
    ExecutableFile,
    /// Symbolic link (0o120000).
    Symlink,
    /// Subtree / directory (0o040000).
    Tree,
}

impl EntryType {
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree)
    }

    /// The directory-entry type tag for this entry.
    pub fn dtype(&self) -> Dtype {
        match self {
            Self::RegularFile | Self::ExecutableFile => Dtype::Regular,
            Self::Symlink => Dtype::Symlink,
            Self::Tree => Dtype::Dir,
        }
    }

    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::RegularFile => 0o100644,
            Self::ExecutableFile => 0o100755,
            Self::Symlink => 0o120000,
            Self::Tree => 0o040000,
        }
    }

    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::RegularFile),
            0o100755 => Some(Self::ExecutableFile),
            0o120000 => Some(Self::Symlink),
            0o040000 => Some(Self::Tree),
            _ => None,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// Directory-entry type tag, as reported alongside every diff event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Regular,
    Symlink,
    Dir,
}

impl Dtype {
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular => f.write_str("file"),
            Self::Symlink => f.write_str("symlink"),
            Self::Dir => f.write_str("dir"),
        }
    }
}

/// Entry type as the working copy can represent it.
///
/// Without symlink support a source-control symlink is checked out as a
/// plain file, so both sides of a comparison must see it as one.
pub fn filtered_entry_type(entry_type: EntryType, symlinks_enabled: bool) -> EntryType {
    match entry_type {
        EntryType::Symlink if !symlinks_enabled => EntryType::RegularFile,
        other => other,
    }
}

/// Dtype counterpart of [`filtered_entry_type`].
pub fn filtered_entry_dtype(dtype: Dtype, symlinks_enabled: bool) -> Dtype {
    match dtype {
        Dtype::Symlink if !symlinks_enabled => Dtype::Regular,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_mapping() {
        assert_eq!(EntryType::RegularFile.dtype(), Dtype::Regular);
        assert_eq!(EntryType::ExecutableFile.dtype(), Dtype::Regular);
        assert_eq!(EntryType::Symlink.dtype(), Dtype::Symlink);
        assert_eq!(EntryType::Tree.dtype(), Dtype::Dir);
    }

    #[test]
    fn mode_bits_roundtrip() {
        for ty in [
            EntryType::RegularFile,
            EntryType::ExecutableFile,
            EntryType::Symlink,
            EntryType::Tree,
        ] {
            assert_eq!(EntryType::from_mode_bits(ty.mode_bits()), Some(ty));
        }
        assert_eq!(EntryType::from_mode_bits(0o777), None);
    }

    #[test]
    fn symlinks_filtered_only_when_disabled() {
        assert_eq!(
            filtered_entry_type(EntryType::Symlink, false),
            EntryType::RegularFile
        );
        assert_eq!(
            filtered_entry_type(EntryType::Symlink, true),
            EntryType::Symlink
        );
        assert_eq!(
            filtered_entry_type(EntryType::ExecutableFile, false),
            EntryType::ExecutableFile
        );
        assert_eq!(filtered_entry_dtype(Dtype::Symlink, false), Dtype::Regular);
        assert_eq!(filtered_entry_dtype(Dtype::Symlink, true), Dtype::Symlink);
        assert_eq!(filtered_entry_dtype(Dtype::Dir, false), Dtype::Dir);
    }

    #[test]
    fn filtered_type_and_dtype_agree() {
        for ty in [EntryType::Symlink, EntryType::RegularFile, EntryType::Tree] {
            for enabled in [true, false] {
                assert_eq!(
                    filtered_entry_type(ty, enabled).dtype(),
                    filtered_entry_dtype(ty.dtype(), enabled)
                );
            }
        }
    }
}
