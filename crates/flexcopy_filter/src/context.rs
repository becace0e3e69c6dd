//! Working-root resolution and the explicit resolution cache.

use std::path::PathBuf;

use tracing::debug;

use crate::compile::compile_filter;
use crate::filter_set::build_filter_set_with_context;
use crate::spec::{CompiledFilter, FilterError, FilterSet, SpecFilterOptions};

/// Resolved base directory plus its filesystem root.
///
/// `base` is absolute and always ends with `separator`; `root` (`/`, `D:/`)
/// is a prefix of `base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    /// Directory relative patterns are joined onto.
    pub base: String,
    /// Filesystem root of `base`.
    pub root: String,
    /// Separator used in `base`, `root` and generated expressions.
    pub separator: char,
}

impl ResolutionContext {
    /// Resolve `root` with the platform separator.
    pub fn resolve(root: &str) -> Self {
        Self::resolve_with_separator(root, std::path::MAIN_SEPARATOR)
    }

    /// Resolve `root` (absolute, or relative to the process cwd).
    ///
    /// A leading `!` is ignored. Both `/` and `\` are accepted as separators,
    /// and `X:/` drive prefixes count as absolute on every platform.
    pub fn resolve_with_separator(root: &str, separator: char) -> Self {
        let c_root = root.strip_prefix('!').unwrap_or(root);
        let c_root = normalize_separators(c_root, separator);
        let c_absolute = if is_absolute(&c_root) {
            c_root
        } else {
            let path_cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let c_cwd = normalize_separators(&path_cwd.to_string_lossy(), separator);
            if c_root.is_empty() {
                c_cwd
            } else {
                format!("{c_cwd}{separator}{c_root}")
            }
        };

        let (c_fs_root, c_rest) = split_fs_root(&c_absolute, separator);
        let mut base = c_fs_root.clone();
        for part in normalize_components(c_rest, separator) {
            base.push_str(part);
            base.push(separator);
        }
        Self {
            base,
            root: c_fs_root,
            separator,
        }
    }

    /// `base` with its last directory removed, never going above `root`.
    pub(crate) fn parent_of_base(base: &str, root: &str, separator: char) -> String {
        if base.len() <= root.len() {
            return base.to_string();
        }
        let c_trimmed = base.trim_end_matches(separator);
        match c_trimmed.rfind(separator) {
            Some(n_idx) if n_idx + 1 >= root.len() => c_trimmed[..=n_idx].to_string(),
            _ => root.to_string(),
        }
    }
}

/// Length of an `X:` drive prefix followed by a separator, if present.
pub(crate) fn drive_prefix_len(value: &str) -> Option<usize> {
    let l_bytes = value.as_bytes();
    if l_bytes.len() >= 3
        && l_bytes[0].is_ascii_alphabetic()
        && l_bytes[1] == b':'
        && (l_bytes[2] == b'/' || l_bytes[2] == b'\\')
    {
        return Some(3);
    }
    None
}

pub(crate) fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn is_absolute(value: &str) -> bool {
    value.starts_with(is_separator) || drive_prefix_len(value).is_some()
}

fn normalize_separators(value: &str, separator: char) -> String {
    value
        .chars()
        .map(|c| if is_separator(c) { separator } else { c })
        .collect()
}

fn split_fs_root(value: &str, separator: char) -> (String, &str) {
    if let Some(n_len) = drive_prefix_len(value) {
        return (format!("{}{separator}", &value[..2]), &value[n_len..]);
    }
    (
        separator.to_string(),
        value.strip_prefix(separator).unwrap_or(value),
    )
}

fn normalize_components(value: &str, separator: char) -> Vec<&str> {
    let mut l_parts: Vec<&str> = Vec::new();
    for part in value.split(separator) {
        match part {
            "" | "." => {}
            ".." => {
                l_parts.pop();
            }
            _ => l_parts.push(part),
        }
    }
    l_parts
}

////////////////////////////////////////////////////////////////////////////////
// #region Compiler

/// Compiles patterns against a cached [`ResolutionContext`].
///
/// The context is resolved lazily and reused until the root changes or
/// `if_reset_root` is requested, so compiling many patterns against one root
/// resolves the working directory once.
#[derive(Debug, Default)]
pub struct FilterCompiler {
    cache: Option<(Option<String>, ResolutionContext)>,
}

impl FilterCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cached context.
    pub fn reset(&mut self) {
        self.cache = None;
    }

    /// Cached context for `spec_options`, resolving it when stale.
    pub fn context(&mut self, spec_options: &SpecFilterOptions) -> &ResolutionContext {
        let b_stale = match &self.cache {
            None => true,
            Some((root_cached, ctx)) => {
                spec_options.if_reset_root
                    || *root_cached != spec_options.root
                    || ctx.separator != spec_options.separator
            }
        };
        if b_stale {
            self.cache = None;
        }
        let (_, ctx) = self.cache.get_or_insert_with(|| {
            let ctx = ResolutionContext::resolve_with_separator(
                spec_options.root.as_deref().unwrap_or(""),
                spec_options.separator,
            );
            debug!(base = %ctx.base, root = %ctx.root, "resolved working root");
            (spec_options.root.clone(), ctx)
        });
        ctx
    }

    /// Compile one pattern.
    pub fn compile(
        &mut self,
        pattern: &str,
        spec_options: &SpecFilterOptions,
    ) -> Result<CompiledFilter, FilterError> {
        let ctx = self.context(spec_options);
        compile_filter(pattern, ctx)
    }

    /// Build a filter set; the context is resolved at most once.
    pub fn build_filter_set<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        spec_options: &SpecFilterOptions,
    ) -> Result<FilterSet, FilterError> {
        if patterns.is_empty() {
            return Ok(FilterSet::default());
        }
        let ctx = self.context(spec_options).clone();
        build_filter_set_with_context(patterns, &ctx, spec_options.if_unique)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_drive_root_keeps_trailing_separator() {
        let ctx = ResolutionContext::resolve_with_separator("D:/", '/');
        assert_eq!(ctx.base, "D:/");
        assert_eq!(ctx.root, "D:/");

        let ctx = ResolutionContext::resolve_with_separator("D:\\\\cwd", '/');
        assert_eq!(ctx.base, "D:/cwd/");
        assert_eq!(ctx.root, "D:/");
    }

    #[test]
    fn resolve_strips_negation_and_dot_segments() {
        let ctx = ResolutionContext::resolve_with_separator("!/x/./y/../z", '/');
        assert_eq!(ctx.base, "/x/z/");
        assert_eq!(ctx.root, "/");
    }

    #[cfg(unix)]
    #[test]
    fn resolve_relative_root_uses_cwd() {
        let c_cwd = std::env::current_dir()
            .expect("cwd")
            .to_string_lossy()
            .to_string();
        let ctx = ResolutionContext::resolve_with_separator("sub", '/');
        assert_eq!(ctx.base, format!("{}/sub/", c_cwd.trim_end_matches('/')));
        assert_eq!(ctx.root, "/");
    }

    #[test]
    fn parent_of_base_never_passes_root() {
        assert_eq!(ResolutionContext::parent_of_base("D:/a/b/", "D:/", '/'), "D:/a/");
        assert_eq!(ResolutionContext::parent_of_base("D:/a/", "D:/", '/'), "D:/");
        assert_eq!(ResolutionContext::parent_of_base("D:/", "D:/", '/'), "D:/");
        assert_eq!(ResolutionContext::parent_of_base("/a/", "/", '/'), "/");
    }

    #[test]
    fn compiler_reuses_context_until_reset_requested() {
        let mut compiler = FilterCompiler::new();
        let spec_options = SpecFilterOptions {
            root: Some("D:/x".to_string()),
            if_reset_root: false,
            separator: '/',
            ..SpecFilterOptions::default()
        };
        assert_eq!(compiler.context(&spec_options).base, "D:/x/");

        let spec_options_other = SpecFilterOptions {
            root: Some("D:/y".to_string()),
            ..spec_options.clone()
        };
        assert_eq!(compiler.context(&spec_options_other).base, "D:/y/");

        compiler.reset();
        assert_eq!(compiler.context(&spec_options).base, "D:/x/");
    }
}
