use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::report::ReportCopyBuilder;
use crate::spec::{CopyFlexError, EnumErrorHandle};

////////////////////////////////////////////////////////////////////////////////
// #region ErrorPolicy

/// Record a per-entry failure, then log or raise it according to `rule_error_handle`.
pub(crate) fn apply_error_policy(
    err: CopyFlexError,
    rule_error_handle: EnumErrorHandle,
    builder_cp_report: &mut ReportCopyBuilder,
) -> Result<(), CopyFlexError> {
    let path_err = err.path().map(Path::to_path_buf).unwrap_or_default();
    builder_cp_report.add_error(path_err, err.to_string());
    match rule_error_handle {
        EnumErrorHandle::Ignore => Ok(()),
        EnumErrorHandle::Log => {
            warn!(error = %err, "flexcopy entry failed");
            Ok(())
        }
        EnumErrorHandle::Raise => Err(err),
    }
}

pub(crate) fn io_error(path: &Path, e: &io::Error) -> CopyFlexError {
    CopyFlexError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

pub(crate) fn absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Absolute form of `root` (process cwd when `None`) as a separator-joined string.
pub(crate) fn resolve_root(root: Option<&str>) -> String {
    let path_root = absolutize_path(Path::new(root.unwrap_or(".")));
    normalize_path_str(&path_root.to_string_lossy())
}

/// Collapse separator runs to the platform separator and drop `.`/`..` parts.
///
/// Keeps a leading separator or `X:` drive; never removes the filesystem root.
pub(crate) fn normalize_path_str(value: &str) -> String {
    let sep = std::path::MAIN_SEPARATOR;
    let c_value: String = value
        .chars()
        .map(|c| if c == '/' || c == '\\' { sep } else { c })
        .collect();
    let (c_prefix, c_rest) = split_path_prefix(&c_value, sep);

    let mut l_parts: Vec<&str> = Vec::new();
    for part in c_rest.split(sep) {
        match part {
            "" | "." => {}
            ".." => {
                l_parts.pop();
            }
            _ => l_parts.push(part),
        }
    }
    format!("{c_prefix}{}", l_parts.join(&sep.to_string()))
}

/// Leading `X:` drive or separator, returned with a trailing separator.
fn split_path_prefix(value: &str, sep: char) -> (String, &str) {
    let l_bytes = value.as_bytes();
    if l_bytes.len() >= 2 && l_bytes[0].is_ascii_alphabetic() && l_bytes[1] == b':' {
        return (format!("{}{sep}", &value[..2]), &value[2..]);
    }
    match value.strip_prefix(sep) {
        Some(c_rest) => (sep.to_string(), c_rest),
        None => (String::new(), value),
    }
}

/// `path` relative to `base` (both normalized), or `None` if not below it.
pub(crate) fn strip_path_prefix<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let sep = std::path::MAIN_SEPARATOR;
    if path == base {
        return Some("");
    }
    let c_base = base.trim_end_matches(sep);
    path.strip_prefix(c_base)
        .and_then(|c_rest| c_rest.strip_prefix(sep))
}

/// Deepest folder shared by all `l_paths`, compared component-wise.
pub(crate) fn common_ancestor<'a, I>(l_paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter_paths = l_paths.into_iter();
    let mut path_common = iter_paths.next()?.to_path_buf();
    for path in iter_paths {
        while !path.starts_with(&path_common) {
            if !path_common.pop() {
                return None;
            }
        }
    }
    Some(path_common)
}

/// Destination item must stay under the destination root and must not pass
/// through, or be, a symbolic link.
pub(crate) fn validate_destination_path_safety(
    path_dst_item: &Path,
    path_dir_dst_root: &Path,
) -> Result<(), CopyFlexError> {
    let path_dir_dst_root_abs = absolutize_path(path_dir_dst_root);
    let path_dst_item_abs = absolutize_path(path_dst_item);
    let err_unsafe = |message: String| CopyFlexError::Io {
        path: path_dst_item.to_path_buf(),
        message,
    };

    let Ok(path_item_rel) = path_dst_item_abs.strip_prefix(&path_dir_dst_root_abs) else {
        return Err(err_unsafe(format!(
            "Unsafe destination path escapes destination root {}",
            path_dir_dst_root.display()
        )));
    };

    let mut path_cursor = path_dir_dst_root_abs.clone();
    for part_rel in path_item_rel.components() {
        if !matches!(part_rel, std::path::Component::Normal(_)) {
            return Err(err_unsafe(
                "Unsafe destination path has a non-normal component".to_string(),
            ));
        }
        path_cursor.push(part_rel.as_os_str());
        match fs::symlink_metadata(&path_cursor) {
            Ok(meta_cursor) if meta_cursor.file_type().is_symlink() => {
                return Err(err_unsafe(format!(
                    "Unsafe destination path traverses symlink {}",
                    path_cursor.display()
                )));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => {
                return Err(err_unsafe(format!(
                    "Failed to inspect destination component {} ({e})",
                    path_cursor.display()
                )));
            }
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileCopy

/// Copy bytes, replacing any existing file, then carry metadata over.
pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    fs::copy(path_file_src, path_file_dst)?;
    apply_metadata(path_file_src, path_file_dst)
}

/// Copy bytes into a file that must not exist yet.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] without touching the
/// destination when it does.
pub(crate) fn copy_file_exclusive(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    let mut file_src = fs::File::open(path_file_src)?;
    let mut file_dst = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path_file_dst)?;
    io::copy(&mut file_src, &mut file_dst)?;
    drop(file_dst);
    apply_metadata(path_file_src, path_file_dst)
}

fn apply_metadata(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let Ok(iter_xattr_names) = xattr::list(path_file_src) else {
        return;
    };
    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        let _ = xattr::set(path_file_dst, &name, &raw_value);
    }
}

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
