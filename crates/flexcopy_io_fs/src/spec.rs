//! Copy/list options, folder records and top-level error types.

use std::path::PathBuf;

use fancy_regex::Regex;
use flexcopy_filter::FilterError;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// How much of the source folder structure is rebuilt under the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPreserveState {
    /// Every file lands directly in the destination.
    None,
    /// Keep structure below the deepest folder shared by all copied files.
    Shallow,
    /// Keep structure below the listing start (the pattern's anchor).
    Deep,
    /// Keep structure below the working root.
    Root,
}

/// Existing destination file policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumExistingFileStrategy {
    /// Replace the destination file.
    Overwrite,
    /// Copy next to it as `name(n).ext`.
    Rename,
    /// Leave the destination file; the conflict goes through the error policy.
    DontCopy,
}

/// What happens to a per-entry failure besides being recorded in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumErrorHandle {
    /// Record only.
    Ignore,
    /// Record and emit a `warn!` event.
    Log,
    /// Record and abort the run with the error.
    Raise,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Target-name rewrite rules. Empty strings count as unset.
#[derive(Debug, Clone, Default)]
pub struct SpecRenameOptions {
    /// Replacement name (without extension unless `if_remove_ext`).
    pub name: Option<String>,
    /// `name` carries its own extension; the source extension is dropped.
    pub if_remove_ext: bool,
    /// Only rewrite names of files whose name matches this pattern.
    pub name_pattern: Option<String>,
    /// Replacement extension, with or without the leading dot.
    pub ext: Option<String>,
    /// Only rewrite extensions of files whose name matches this pattern.
    pub ext_pattern: Option<String>,
    /// Prepended to the name when `name` is unset.
    pub prefix: Option<String>,
    /// Appended to the name when `name` is unset.
    pub postfix: Option<String>,
    /// Inserted after the extension's dot when `ext` is unset.
    pub ext_prefix: Option<String>,
    /// Appended to the extension when `ext` is unset.
    pub ext_postfix: Option<String>,
}

/// Input options for `copy_flex`.
#[derive(Debug, Clone)]
pub struct SpecCopyFlexOptions {
    /// Working root patterns resolve against. `None` uses the process cwd.
    pub root: Option<String>,
    /// Drop patterns covered by another pattern of the same sign.
    pub if_unique: bool,
    /// Destination structure.
    pub preserve: EnumPreserveState,
    /// Optional target-name rewrite.
    pub rename: Option<SpecRenameOptions>,
    /// Split names at the first dot (`a.tar.gz` -> `a` + `.tar.gz`) instead of the last.
    pub if_long_extension: bool,
    /// Existing destination file behavior.
    pub rule_existing_file: EnumExistingFileStrategy,
    /// Give up renaming after this many `name(n).ext` attempts.
    pub max_rename_count: usize,
    /// Keep trying past `max_rename_count`.
    pub if_ignore_max: bool,
    /// Per-entry failure behavior.
    pub rule_error_handle: EnumErrorHandle,
    /// List only the anchor folders themselves.
    pub if_no_recursive: bool,
    /// Maximum worker threads for the file-copy stage.
    pub num_workers_max: Option<usize>,
    /// Do not mutate the filesystem; record what would happen.
    pub if_dry_run: bool,
}

impl Default for SpecCopyFlexOptions {
    fn default() -> Self {
        Self {
            root: None,
            if_unique: true,
            preserve: EnumPreserveState::Root,
            rename: None,
            if_long_extension: false,
            rule_existing_file: EnumExistingFileStrategy::Overwrite,
            max_rename_count: 20,
            if_ignore_max: false,
            rule_error_handle: EnumErrorHandle::Ignore,
            if_no_recursive: false,
            num_workers_max: None,
            if_dry_run: false,
        }
    }
}

/// Input options for `list_folders`.
#[derive(Debug, Clone)]
pub struct SpecListOptions {
    /// Working root; `from_root` is relative to it. `None` uses the process cwd.
    pub root: Option<String>,
    /// Folders (absolute or root-relative) that are listed but never descended.
    pub ignore_list: Vec<String>,
    /// Entries whose full name matches are marked ignored.
    pub negative_expression: Option<Regex>,
    /// List the start folder only.
    pub if_no_recursive: bool,
    /// Start-path failure behavior.
    pub rule_error_handle: EnumErrorHandle,
}

impl Default for SpecListOptions {
    fn default() -> Self {
        Self {
            root: None,
            ignore_list: Vec::new(),
            negative_expression: None,
            if_no_recursive: false,
            rule_error_handle: EnumErrorHandle::Ignore,
        }
    }
}

/// One listed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFolderInfo {
    /// Entry name.
    pub name: String,
    /// Absolute path.
    pub full_name: String,
    /// Entry is a directory (symlinks to directories included).
    pub is_folder: bool,
    /// Extension from the last dot, `""` if none.
    pub ext: String,
    /// Extension from the first dot, `""` if none.
    pub long_ext: String,
    /// `name` without `ext`.
    pub long_name: String,
    /// `name` without `long_ext`.
    pub short_name: String,
    /// Absolute path of the containing folder.
    pub parent: String,
    /// `parent` relative to the working root.
    pub from_root: String,
    /// `parent` relative to the listing start.
    pub from_start: String,
    /// Listed but excluded: an ignored folder or a negative-expression match.
    pub ignore_folder: bool,
}

/// One failure item with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// Setup failures, and per-entry failures promoted by [`EnumErrorHandle::Raise`].
#[derive(Debug, Error)]
pub enum CopyFlexError {
    /// A pattern produced an expression the regex engine rejects.
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// Invalid rename name/extension pattern.
    #[error("Invalid rename pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// Pattern after escaping.
        pattern: String,
        /// Regex engine message.
        message: String,
    },
    /// Destination directory initialization failed.
    #[error("Failed to initialize destination {}: {message}", .path.display())]
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
    /// Listing start does not exist.
    #[error("No such file or directory: {}", .path.display())]
    StartNotFound {
        /// Resolved start path.
        path: PathBuf,
    },
    /// Every `name(n).ext` candidate up to the limit already exists.
    #[error(
        "Maximum of {max_rename_count} rename attempts reached while copying {}; raise `max_rename_count` or set `if_ignore_max`",
        .path.display()
    )]
    RenameLimitReached {
        /// Source file.
        path: PathBuf,
        /// Configured limit.
        max_rename_count: usize,
    },
    /// Filesystem failure on one entry.
    #[error("{message}: {}", .path.display())]
    Io {
        /// Path the operation failed on.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
}

impl CopyFlexError {
    /// Path the error is about, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Filter(_) | Self::InvalidPattern { .. } => None,
            Self::DestinationInitFailed { path, .. }
            | Self::StartNotFound { path }
            | Self::RenameLimitReached { path, .. }
            | Self::Io { path, .. } => Some(path.as_path()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
