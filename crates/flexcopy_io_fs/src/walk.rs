//! Folder listing: the entries below an anchor, with name/extension splits
//! and root/start-relative parents.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use tracing::debug;

use crate::report::ReportCopyBuilder;
use crate::spec::{CopyFlexError, SpecFolderInfo, SpecListOptions};
use crate::util::{
    apply_error_policy, io_error, normalize_path_str, resolve_root, strip_path_prefix,
};

#[cfg(unix)]
type DirIdentity = (u64, u64);
#[cfg(not(unix))]
type DirIdentity = PathBuf;

struct SpecListContext<'a> {
    spec_list_options: &'a SpecListOptions,
    c_root: String,
    c_start: String,
    l_ignore: Vec<String>,
    set_visited_dirs: HashSet<DirIdentity>,
}

/// List every entry below `start`.
///
/// `start` may be absolute or relative to `root`. Entries come out in name
/// order, each folder's children after the whole folder level. A file start
/// yields that single file. A missing start goes through the error policy
/// and yields nothing.
pub fn list_folders(
    start: &str,
    spec_list_options: &SpecListOptions,
    builder_cp_report: &mut ReportCopyBuilder,
) -> Result<Vec<SpecFolderInfo>, CopyFlexError> {
    let c_root = resolve_root(spec_list_options.root.as_deref());
    let c_start = resolve_start(start, &c_root);
    let l_ignore = spec_list_options
        .ignore_list
        .iter()
        .map(|c_ignore| resolve_start(c_ignore, &c_root))
        .collect();
    let mut spec_list_ctx = SpecListContext {
        spec_list_options,
        c_root,
        c_start,
        l_ignore,
        set_visited_dirs: HashSet::new(),
    };
    debug!(start = %spec_list_ctx.c_start, root = %spec_list_ctx.c_root, "listing folders");

    let path_start = PathBuf::from(&spec_list_ctx.c_start);
    let iter_entries = match fs::read_dir(&path_start) {
        Ok(iter) => iter,
        Err(e) => {
            return list_start_fallback(&path_start, &e, &spec_list_ctx, builder_cp_report);
        }
    };
    if let Some(key_dir) = dir_identity(&path_start) {
        spec_list_ctx.set_visited_dirs.insert(key_dir);
    }

    let mut l_infos: Vec<SpecFolderInfo> = Vec::new();
    let c_start = spec_list_ctx.c_start.clone();
    let l_level = read_level(iter_entries, &c_start, &spec_list_ctx, builder_cp_report);
    walk_level(l_level, &mut spec_list_ctx, &mut l_infos, builder_cp_report);
    Ok(l_infos)
}

#[cfg(unix)]
fn dir_identity(path_dir: &Path) -> Option<DirIdentity> {
    use std::os::unix::fs::MetadataExt;
    let stat_dir = fs::metadata(path_dir).ok()?;
    Some((stat_dir.dev(), stat_dir.ino()))
}

#[cfg(not(unix))]
fn dir_identity(path_dir: &Path) -> Option<DirIdentity> {
    fs::canonicalize(path_dir).ok()
}

/// Absolute, normalized form of `start`; relative starts join onto `c_root`.
pub(crate) fn resolve_start(start: &str, c_root: &str) -> String {
    let l_bytes = start.as_bytes();
    let b_absolute = start.starts_with(['/', '\\'])
        || (l_bytes.len() >= 2 && l_bytes[0].is_ascii_alphabetic() && l_bytes[1] == b':');
    if b_absolute {
        return normalize_path_str(start);
    }
    normalize_path_str(&format!("{c_root}{MAIN_SEPARATOR}{start}"))
}

fn walk_level(
    l_level: Vec<SpecFolderInfo>,
    spec_list_ctx: &mut SpecListContext<'_>,
    l_infos: &mut Vec<SpecFolderInfo>,
    builder_cp_report: &mut ReportCopyBuilder,
) {
    let l_descend: Vec<String> = if spec_list_ctx.spec_list_options.if_no_recursive {
        Vec::new()
    } else {
        l_level
            .iter()
            .filter(|info| info.is_folder && !info.ignore_folder)
            .map(|info| info.full_name.clone())
            .collect()
    };
    l_infos.extend(l_level);

    for c_folder in l_descend {
        let Some(key_dir) = dir_identity(Path::new(&c_folder)) else {
            builder_cp_report.add_warning(format!("Failed to stat directory: {c_folder}"));
            continue;
        };
        if !spec_list_ctx.set_visited_dirs.insert(key_dir) {
            debug!(folder = %c_folder, "folder already visited");
            builder_cp_report.add_warning(format!("Symlink loop detected: {c_folder}"));
            continue;
        }
        match fs::read_dir(&c_folder) {
            Ok(iter_entries) => {
                let l_sub = read_level(iter_entries, &c_folder, spec_list_ctx, builder_cp_report);
                walk_level(l_sub, spec_list_ctx, l_infos, builder_cp_report);
            }
            Err(e) => {
                builder_cp_report
                    .add_warning(format!("Failed to read directory {c_folder} ({e})"));
            }
        }
    }
}

fn read_level(
    iter_entries: fs::ReadDir,
    c_parent: &str,
    spec_list_ctx: &SpecListContext<'_>,
    builder_cp_report: &mut ReportCopyBuilder,
) -> Vec<SpecFolderInfo> {
    let mut l_level: Vec<SpecFolderInfo> = Vec::new();
    for entry_res in iter_entries {
        let entry = match entry_res {
            Ok(v) => v,
            Err(e) => {
                builder_cp_report.add_warning(format!(
                    "Failed to read directory entry under {c_parent} ({e})"
                ));
                continue;
            }
        };
        let path_entry = entry.path();
        let b_is_folder = match entry.file_type() {
            Ok(cfg_file_type) => {
                cfg_file_type.is_dir() || (cfg_file_type.is_symlink() && path_entry.is_dir())
            }
            Err(e) => {
                builder_cp_report
                    .add_warning(format!("Failed to inspect {} ({e})", path_entry.display()));
                continue;
            }
        };
        let c_name = entry.file_name().to_string_lossy().to_string();
        l_level.push(build_info(c_name, c_parent, b_is_folder, spec_list_ctx));
    }
    l_level.sort_by(|a, b| a.name.cmp(&b.name));
    l_level
}

fn build_info(
    c_name: String,
    c_parent: &str,
    b_is_folder: bool,
    spec_list_ctx: &SpecListContext<'_>,
) -> SpecFolderInfo {
    let full_name = join_name(c_parent, &c_name);
    let b_negated = spec_list_ctx
        .spec_list_options
        .negative_expression
        .as_ref()
        .is_some_and(|reg| reg.is_match(&full_name).unwrap_or(false));
    let ignore_folder = (b_is_folder && spec_list_ctx.l_ignore.contains(&full_name)) || b_negated;

    let (ext, long_ext) = if b_is_folder {
        (String::new(), String::new())
    } else {
        split_extensions(&c_name)
    };
    let long_name = c_name[..c_name.len() - ext.len()].to_string();
    let short_name = c_name[..c_name.len() - long_ext.len()].to_string();

    SpecFolderInfo {
        from_root: relative_parent(c_parent, &spec_list_ctx.c_root),
        from_start: strip_path_prefix(c_parent, &spec_list_ctx.c_start)
            .unwrap_or_default()
            .to_string(),
        parent: c_parent.to_string(),
        name: c_name,
        full_name,
        is_folder: b_is_folder,
        ext,
        long_ext,
        long_name,
        short_name,
        ignore_folder,
    }
}

fn join_name(c_parent: &str, c_name: &str) -> String {
    if c_parent.ends_with(MAIN_SEPARATOR) {
        return format!("{c_parent}{c_name}");
    }
    format!("{c_parent}{MAIN_SEPARATOR}{c_name}")
}

/// `(ext, long_ext)`: from the last dot and from the first dot.
///
/// A leading dot (`.gitignore`) starts the name, not an extension.
pub(crate) fn split_extensions(c_name: &str) -> (String, String) {
    let c_body = c_name.strip_prefix('.').unwrap_or(c_name);
    let n_offset = c_name.len() - c_body.len();
    match (c_body.rfind('.'), c_body.find('.')) {
        (Some(n_last), Some(n_first)) => (
            c_name[n_offset + n_last..].to_string(),
            c_name[n_offset + n_first..].to_string(),
        ),
        _ => (String::new(), String::new()),
    }
}

/// Parent relative to the working root; outside it, relative to the filesystem root.
fn relative_parent(c_parent: &str, c_root: &str) -> String {
    if let Some(c_rel) = strip_path_prefix(c_parent, c_root) {
        return c_rel.to_string();
    }
    let c_no_drive = match c_parent.as_bytes() {
        [d, b':', ..] if d.is_ascii_alphabetic() => &c_parent[2..],
        _ => c_parent,
    };
    c_no_drive.trim_start_matches(MAIN_SEPARATOR).to_string()
}

/// `start` could not be read as a folder: a file start is listed alone,
/// anything else goes through the error policy.
fn list_start_fallback(
    path_start: &Path,
    e: &io::Error,
    spec_list_ctx: &SpecListContext<'_>,
    builder_cp_report: &mut ReportCopyBuilder,
) -> Result<Vec<SpecFolderInfo>, CopyFlexError> {
    let rule_error_handle = spec_list_ctx.spec_list_options.rule_error_handle;
    if path_start.is_file() {
        let c_name = path_start
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let c_parent = path_start
            .parent()
            .map(|parent| parent.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut info = build_info(c_name, &c_parent, false, spec_list_ctx);
        if info.ignore_folder {
            return Ok(Vec::new());
        }
        info.from_start = String::new();
        return Ok(vec![info]);
    }

    let err = if e.kind() == io::ErrorKind::NotFound {
        CopyFlexError::StartNotFound {
            path: path_start.to_path_buf(),
        }
    } else {
        io_error(path_start, e)
    };
    apply_error_policy(err, rule_error_handle, builder_cp_report)?;
    Ok(Vec::new())
}
