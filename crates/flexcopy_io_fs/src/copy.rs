//! Pattern-driven copy orchestration.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use flexcopy_filter::{FilterSet, SpecFilterOptions, build_filter_set};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::debug;

use crate::rename::{SpecRenameRules, SpecTargetName, derive_target_name};
use crate::report::{ReportCopy, ReportCopyBuilder};
use crate::spec::{
    CopyFlexError, EnumExistingFileStrategy, EnumPreserveState, SpecCopyFlexOptions,
    SpecFolderInfo, SpecListOptions,
};
use crate::util::{
    absolutize_path, apply_error_policy, calculate_worker_limit, common_ancestor,
    copy_file_exclusive, copy_file_with_metadata, io_error, validate_destination_path_safety,
};
use crate::walk::list_folders;

#[derive(Debug, Clone)]
struct SpecCopyTaskFile {
    path_file_src: PathBuf,
    path_dir_dst: PathBuf,
    target: SpecTargetName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumCopyOutcome {
    Copied,
    Renamed,
}

#[derive(Debug)]
struct SpecCopyContext {
    path_dir_dst: PathBuf,
    spec_cp_options: SpecCopyFlexOptions,
    n_workers_max: usize,
    builder_cp_report: ReportCopyBuilder,
    l_tasks_file_copy: Vec<SpecCopyTaskFile>,
}

/// Copy every file selected by `patterns` into `destination`.
///
/// Patterns are compiled into a [`FilterSet`]; each positive anchor is then
/// listed and the files the set includes are copied. Behavior is controlled by
/// [`SpecCopyFlexOptions`], including:
/// - how much folder structure is kept (`preserve`),
/// - target-name rewriting (`rename`, `if_long_extension`),
/// - existing destination files (`rule_existing_file`),
/// - per-entry failures (`rule_error_handle`),
/// - dry-run and worker count.
///
/// Returns [`ReportCopy`] when the run completes (per-entry failures are in
/// `errors`). Returns [`CopyFlexError`] for setup failures and for the first
/// per-entry failure under [`crate::EnumErrorHandle::Raise`].
pub fn copy_flex<S, P>(
    patterns: &[S],
    destination: P,
    spec_cp_options: SpecCopyFlexOptions,
) -> Result<ReportCopy, CopyFlexError>
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    if patterns.is_empty() {
        return Ok(ReportCopy::default());
    }

    let spec_rename_rules = spec_cp_options
        .rename
        .as_ref()
        .map(SpecRenameRules::new)
        .transpose()?;
    let filter_set = build_filter_set(
        patterns,
        &SpecFilterOptions {
            root: spec_cp_options.root.clone(),
            if_unique: spec_cp_options.if_unique,
            if_reset_root: true,
            separator: MAIN_SEPARATOR,
        },
    )?;
    debug!(
        anchors = filter_set.anchors.len(),
        positive = %filter_set.positive_expression_source,
        negative = %filter_set.negative_expression_source,
        "built filter set"
    );

    let path_dir_dst = absolutize_path(destination.as_ref());
    if !spec_cp_options.if_dry_run {
        init_destination(&path_dir_dst)?;
    }

    let n_workers_max = calculate_worker_limit(spec_cp_options.num_workers_max);
    let mut spec_cp_ctx = SpecCopyContext {
        path_dir_dst,
        spec_cp_options,
        n_workers_max,
        builder_cp_report: ReportCopyBuilder::default(),
        l_tasks_file_copy: Vec::new(),
    };

    let l_files = collect_matched_files(&filter_set, &mut spec_cp_ctx)?;
    plan_file_copy_tasks(l_files, spec_rename_rules.as_ref(), &mut spec_cp_ctx);

    if spec_cp_ctx.spec_cp_options.if_dry_run {
        for spec_task in std::mem::take(&mut spec_cp_ctx.l_tasks_file_copy) {
            debug!(
                src = %spec_task.path_file_src.display(),
                dst = %spec_task.path_dir_dst.join(&spec_task.target.full_name).display(),
                "dry-run copy"
            );
            spec_cp_ctx.builder_cp_report.add_skipped();
        }
        return Ok(spec_cp_ctx.builder_cp_report.build());
    }

    create_destination_folders(&mut spec_cp_ctx)?;
    flush_file_copy_tasks(&mut spec_cp_ctx)?;
    Ok(spec_cp_ctx.builder_cp_report.build())
}

fn init_destination(path_dir_dst: &Path) -> Result<(), CopyFlexError> {
    let err_init = |message: String| CopyFlexError::DestinationInitFailed {
        path: path_dir_dst.to_path_buf(),
        message,
    };
    fs::create_dir_all(path_dir_dst).map_err(|e| err_init(e.to_string()))?;
    let meta_dir_dst = fs::symlink_metadata(path_dir_dst).map_err(|e| err_init(e.to_string()))?;
    if meta_dir_dst.file_type().is_symlink() {
        return Err(err_init(
            "Destination root path must not be a symbolic link.".to_string(),
        ));
    }
    Ok(())
}

/// List every anchor and keep the files the set includes, each once.
fn collect_matched_files(
    filter_set: &FilterSet,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Result<Vec<SpecFolderInfo>, CopyFlexError> {
    let mut set_seen: HashSet<String> = HashSet::new();
    let mut l_files: Vec<SpecFolderInfo> = Vec::new();

    for c_anchor in &filter_set.anchors {
        let spec_list_options = SpecListOptions {
            root: spec_cp_ctx.spec_cp_options.root.clone(),
            ignore_list: filter_set.excluded_anchors.clone(),
            negative_expression: filter_set.negative_expression.clone(),
            if_no_recursive: spec_cp_ctx.spec_cp_options.if_no_recursive
                || is_flat_anchor(filter_set, c_anchor),
            rule_error_handle: spec_cp_ctx.spec_cp_options.rule_error_handle,
        };
        let l_infos = list_folders(
            c_anchor,
            &spec_list_options,
            &mut spec_cp_ctx.builder_cp_report,
        )?;
        debug!(
            anchor = %c_anchor,
            entries = l_infos.len(),
            recursive = !spec_list_options.if_no_recursive,
            "listed anchor"
        );
        spec_cp_ctx
            .builder_cp_report
            .add_counts(&["cnt_scanned"], l_infos.len() as u64);

        for info in l_infos {
            if info.is_folder || info.ignore_folder || !filter_set.is_included(&info.full_name) {
                continue;
            }
            if set_seen.insert(info.full_name.clone()) {
                l_files.push(info);
            }
        }
    }
    spec_cp_ctx
        .builder_cp_report
        .add_counts(&["cnt_matched"], l_files.len() as u64);
    Ok(l_files)
}

/// Every positive filter walked from `c_anchor` only looks at the anchor's own entries.
fn is_flat_anchor(filter_set: &FilterSet, c_anchor: &str) -> bool {
    filter_set
        .positive
        .iter()
        .filter(|filter| filter.anchor_path.starts_with(c_anchor))
        .all(|filter| !filter.is_complex && !filter.any_folder && !filter.exact)
}

fn plan_file_copy_tasks(
    l_files: Vec<SpecFolderInfo>,
    spec_rename_rules: Option<&SpecRenameRules>,
    spec_cp_ctx: &mut SpecCopyContext,
) {
    let path_dir_dst = spec_cp_ctx.path_dir_dst.clone();
    let if_long_extension = spec_cp_ctx.spec_cp_options.if_long_extension;
    let path_shallow_base = match spec_cp_ctx.spec_cp_options.preserve {
        EnumPreserveState::Shallow => {
            common_ancestor(l_files.iter().map(|info| Path::new(info.parent.as_str())))
        }
        _ => None,
    };

    for info in l_files {
        let path_dir_task = match spec_cp_ctx.spec_cp_options.preserve {
            EnumPreserveState::None => path_dir_dst.clone(),
            EnumPreserveState::Shallow => {
                let path_parent = Path::new(&info.parent);
                let path_rel = path_shallow_base
                    .as_deref()
                    .and_then(|path_base| path_parent.strip_prefix(path_base).ok())
                    .unwrap_or(Path::new(""));
                path_dir_dst.join(path_rel)
            }
            EnumPreserveState::Deep => path_dir_dst.join(&info.from_start),
            EnumPreserveState::Root => path_dir_dst.join(&info.from_root),
        };
        let target = derive_target_name(&info, spec_rename_rules, if_long_extension);
        spec_cp_ctx.l_tasks_file_copy.push(SpecCopyTaskFile {
            path_file_src: PathBuf::from(&info.full_name),
            path_dir_dst: path_dir_task,
            target,
        });
    }
}

/// Create each destination folder once; tasks under a folder that failed are dropped.
fn create_destination_folders(spec_cp_ctx: &mut SpecCopyContext) -> Result<(), CopyFlexError> {
    let set_dirs: BTreeSet<PathBuf> = spec_cp_ctx
        .l_tasks_file_copy
        .iter()
        .map(|spec_task| spec_task.path_dir_dst.clone())
        .collect();

    let mut set_dirs_failed: HashSet<PathBuf> = HashSet::new();
    for path_dir in set_dirs {
        let res_dir = validate_destination_path_safety(&path_dir, &spec_cp_ctx.path_dir_dst)
            .and_then(|_| fs::create_dir_all(&path_dir).map_err(|e| io_error(&path_dir, &e)));
        if let Err(err) = res_dir {
            set_dirs_failed.insert(path_dir);
            apply_error_policy(
                err,
                spec_cp_ctx.spec_cp_options.rule_error_handle,
                &mut spec_cp_ctx.builder_cp_report,
            )?;
        }
    }
    if !set_dirs_failed.is_empty() {
        spec_cp_ctx
            .l_tasks_file_copy
            .retain(|spec_task| !set_dirs_failed.contains(&spec_task.path_dir_dst));
    }
    Ok(())
}

fn flush_file_copy_tasks(spec_cp_ctx: &mut SpecCopyContext) -> Result<(), CopyFlexError> {
    let l_tasks_file_copy = std::mem::take(&mut spec_cp_ctx.l_tasks_file_copy);
    if l_tasks_file_copy.is_empty() {
        return Ok(());
    }

    let path_dir_dst_root = spec_cp_ctx.path_dir_dst.clone();
    let spec_cp_options = spec_cp_ctx.spec_cp_options.clone();
    let run_task = |spec_task: SpecCopyTaskFile| {
        let res_copy = run_copy_task(&spec_task, &path_dir_dst_root, &spec_cp_options);
        (spec_task.path_file_src, res_copy)
    };

    let l_results: Vec<(PathBuf, Result<EnumCopyOutcome, CopyFlexError>)> =
        if spec_cp_ctx.n_workers_max <= 1 {
            l_tasks_file_copy.into_iter().map(run_task).collect()
        } else {
            match ThreadPoolBuilder::new()
                .num_threads(spec_cp_ctx.n_workers_max)
                .build()
            {
                Ok(thread_pool) => thread_pool.install(|| {
                    l_tasks_file_copy
                        .into_par_iter()
                        .map(run_task)
                        .collect::<Vec<_>>()
                }),
                Err(_) => {
                    spec_cp_ctx.builder_cp_report.add_warning(format!(
                        "Failed to initialize thread pool (workers={}); fallback to serial copy.",
                        spec_cp_ctx.n_workers_max
                    ));
                    l_tasks_file_copy.into_iter().map(run_task).collect()
                }
            }
        };

    for (path_file_src, res_copy) in l_results {
        match res_copy {
            Ok(EnumCopyOutcome::Copied) => spec_cp_ctx.builder_cp_report.add_copied(),
            Ok(EnumCopyOutcome::Renamed) => spec_cp_ctx.builder_cp_report.add_renamed(),
            Err(err) => {
                debug!(src = %path_file_src.display(), error = %err, "copy failed");
                apply_error_policy(
                    err,
                    spec_cp_options.rule_error_handle,
                    &mut spec_cp_ctx.builder_cp_report,
                )?;
            }
        }
    }
    Ok(())
}

fn run_copy_task(
    spec_task: &SpecCopyTaskFile,
    path_dir_dst_root: &Path,
    spec_cp_options: &SpecCopyFlexOptions,
) -> Result<EnumCopyOutcome, CopyFlexError> {
    let path_file_dst = spec_task.path_dir_dst.join(&spec_task.target.full_name);
    validate_destination_path_safety(&path_file_dst, path_dir_dst_root)?;
    if path_file_dst == spec_task.path_file_src {
        return Err(CopyFlexError::Io {
            path: path_file_dst,
            message: "Source and destination are the same file".to_string(),
        });
    }

    match spec_cp_options.rule_existing_file {
        EnumExistingFileStrategy::Overwrite => {
            copy_file_with_metadata(&spec_task.path_file_src, &path_file_dst)
                .map_err(|e| io_error(&path_file_dst, &e))?;
            Ok(EnumCopyOutcome::Copied)
        }
        EnumExistingFileStrategy::DontCopy => {
            match copy_file_exclusive(&spec_task.path_file_src, &path_file_dst) {
                Ok(()) => Ok(EnumCopyOutcome::Copied),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(CopyFlexError::Io {
                    path: path_file_dst,
                    message: "Destination file already exists".to_string(),
                }),
                Err(e) => Err(io_error(&path_file_dst, &e)),
            }
        }
        EnumExistingFileStrategy::Rename => {
            match copy_file_exclusive(&spec_task.path_file_src, &path_file_dst) {
                Ok(()) => Ok(EnumCopyOutcome::Copied),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    copy_with_numbered_name(spec_task, path_dir_dst_root, spec_cp_options)
                }
                Err(e) => Err(io_error(&path_file_dst, &e)),
            }
        }
    }
}

/// Try `name(1).ext`, `name(2).ext`, ... until one can be created.
fn copy_with_numbered_name(
    spec_task: &SpecCopyTaskFile,
    path_dir_dst_root: &Path,
    spec_cp_options: &SpecCopyFlexOptions,
) -> Result<EnumCopyOutcome, CopyFlexError> {
    let mut n_counter: usize = 1;
    loop {
        if !spec_cp_options.if_ignore_max && n_counter > spec_cp_options.max_rename_count {
            return Err(CopyFlexError::RenameLimitReached {
                path: spec_task.path_file_src.clone(),
                max_rename_count: spec_cp_options.max_rename_count,
            });
        }
        let path_file_dst = spec_task.path_dir_dst.join(spec_task.target.numbered(n_counter));
        validate_destination_path_safety(&path_file_dst, path_dir_dst_root)?;
        match copy_file_exclusive(&spec_task.path_file_src, &path_file_dst) {
            Ok(()) => return Ok(EnumCopyOutcome::Renamed),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n_counter += 1,
            Err(e) => return Err(io_error(&path_file_dst, &e)),
        }
    }
}
