//! Aggregates compiled patterns into one [`FilterSet`].

use fancy_regex::Regex;
use tracing::{debug, trace};

use crate::compile::compile_filter;
use crate::context::ResolutionContext;
use crate::render::representative_of;
use crate::spec::{CompiledFilter, FilterError, FilterSet, SpecFilterOptions, compile_anchored};

/// Outcome of comparing a new filter (left) against a kept one (right).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumSubsumption {
    /// Both stay.
    Neither,
    /// Left covers right; drop right.
    LeftWins,
    /// Right covers left; drop left.
    RightWins,
}

impl EnumSubsumption {
    fn swapped(self) -> Self {
        match self {
            Self::Neither => Self::Neither,
            Self::LeftWins => Self::RightWins,
            Self::RightWins => Self::LeftWins,
        }
    }
}

/// Build a filter set, resolving `spec_options.root` once for the whole list.
///
/// Input order is significant: each pattern is compared against the kept
/// filters of its sign from the most recent backwards, and a later pattern
/// that covers an earlier one replaces it.
pub fn build_filter_set<S: AsRef<str>>(
    patterns: &[S],
    spec_options: &SpecFilterOptions,
) -> Result<FilterSet, FilterError> {
    if patterns.is_empty() {
        return Ok(FilterSet::default());
    }
    let ctx = ResolutionContext::resolve_with_separator(
        spec_options.root.as_deref().unwrap_or(""),
        spec_options.separator,
    );
    build_filter_set_with_context(patterns, &ctx, spec_options.if_unique)
}

pub(crate) fn build_filter_set_with_context<S: AsRef<str>>(
    patterns: &[S],
    ctx: &ResolutionContext,
    if_unique: bool,
) -> Result<FilterSet, FilterError> {
    let mut l_positive: Vec<CompiledFilter> = Vec::new();
    let mut l_negative: Vec<CompiledFilter> = Vec::new();

    for pattern in patterns {
        let filter = compile_filter(pattern.as_ref(), ctx)?;
        if filter.is_negative {
            if !if_unique || keep_negative(&mut l_negative, &filter) {
                l_negative.push(filter);
            }
        } else if !if_unique || keep_positive(&mut l_positive, &filter, ctx.separator) {
            l_positive.push(filter);
        }
    }

    let excluded_anchors: Vec<String> = l_negative
        .iter()
        .filter(|neg| neg.exact || neg.any_folder)
        .map(|neg| neg.anchor_path.clone())
        .collect();
    l_positive.retain(|pos| {
        let b_excluded = excluded_anchors
            .iter()
            .any(|c_excluded| pos.anchor_path.starts_with(c_excluded.as_str()));
        if b_excluded {
            trace!(pattern = %pos.raw_pattern, "positive filter lies under an excluded anchor");
        }
        !b_excluded
    });

    let mut anchors: Vec<String> = Vec::new();
    for pos in &l_positive {
        if !anchors.contains(&pos.anchor_path) {
            anchors.push(pos.anchor_path.clone());
        }
    }

    let positive_expression_source = join_sources(&l_positive);
    let negative_expression_source = join_sources(&l_negative);
    let positive_expression = compile_joined(&positive_expression_source)?;
    let negative_expression = compile_joined(&negative_expression_source)?;
    debug!(
        n_positive = l_positive.len(),
        n_negative = l_negative.len(),
        n_anchors = anchors.len(),
        "built filter set"
    );

    Ok(FilterSet {
        positive: l_positive,
        negative: l_negative,
        positive_expression_source,
        negative_expression_source,
        positive_expression,
        negative_expression,
        anchors,
        excluded_anchors,
    })
}

fn join_sources(l_filters: &[CompiledFilter]) -> String {
    l_filters
        .iter()
        .map(|filter| filter.expression_source.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

fn compile_joined(source: &str) -> Result<Option<Regex>, FilterError> {
    if source.is_empty() {
        return Ok(None);
    }
    compile_anchored(source).map(Some)
}

// Returns false when `filter` is already covered by a kept negative.
fn keep_negative(l_negative: &mut Vec<CompiledFilter>, filter: &CompiledFilter) -> bool {
    for i in (0..l_negative.len()).rev() {
        if l_negative[i].expression_source == filter.expression_source {
            trace!(
                dropped = %filter.raw_pattern,
                by = %l_negative[i].raw_pattern,
                "negative filter duplicated"
            );
            return false;
        }
        if filter.is_match(&l_negative[i].anchor_path) {
            trace!(
                removed = %l_negative[i].raw_pattern,
                by = %filter.raw_pattern,
                "negative filter subsumed"
            );
            l_negative.remove(i);
        } else if l_negative[i].is_match(&filter.anchor_path) {
            trace!(
                dropped = %filter.raw_pattern,
                by = %l_negative[i].raw_pattern,
                "negative filter subsumed"
            );
            return false;
        }
    }
    true
}

fn keep_positive(
    l_positive: &mut Vec<CompiledFilter>,
    filter: &CompiledFilter,
    separator: char,
) -> bool {
    for i in (0..l_positive.len()).rev() {
        if l_positive[i].expression_source == filter.expression_source {
            trace!(
                dropped = %filter.raw_pattern,
                by = %l_positive[i].raw_pattern,
                "positive filter duplicated"
            );
            return false;
        }
        match compare_filters(filter, &l_positive[i], separator, false) {
            EnumSubsumption::Neither => {}
            EnumSubsumption::LeftWins => {
                trace!(
                    removed = %l_positive[i].raw_pattern,
                    by = %filter.raw_pattern,
                    "positive filter subsumed"
                );
                l_positive.remove(i);
            }
            EnumSubsumption::RightWins => {
                trace!(
                    dropped = %filter.raw_pattern,
                    by = %l_positive[i].raw_pattern,
                    "positive filter subsumed"
                );
                return false;
            }
        }
    }
    true
}

/// Sample path built from `filter`'s anchor: a made-up `tst` file name and
/// `.js` extension stand in for whatever the filter leaves open.
fn sample_path(filter: &CompiledFilter, separator: char) -> String {
    let c_last = filter
        .anchor_path
        .rsplit(separator)
        .next()
        .unwrap_or_default();
    let n_dot = c_last.find('.');

    let mut c_sample = filter.anchor_path.clone();
    if n_dot.is_none_or(|n| n == 0) {
        if !c_sample.ends_with(separator) {
            c_sample.push(separator);
        }
        c_sample.push_str(filter.file_name.as_deref().unwrap_or("tst"));
    }
    if n_dot.is_none() {
        match &filter.extension {
            Some(c_ext) => c_sample.push_str(&representative_of(c_ext)),
            None => c_sample.push_str(".js"),
        }
    }
    c_sample
}

fn is_name_covered(left: &CompiledFilter, right: &CompiledFilter) -> bool {
    (left.any_file && right.any_file)
        || left.file_name == right.file_name
        || matches!(
            (&left.file_name, &right.file_name),
            (Some(c_left), Some(c_right)) if c_right.contains(c_left.as_str())
        )
        || !right.any_file
}

fn is_extension_covered(left: &CompiledFilter, right: &CompiledFilter) -> bool {
    if (left.any_extension && right.any_extension)
        || left.extension == right.extension
        || !right.any_extension
    {
        return true;
    }
    let (Some(c_left), Some(c_right)) = (&left.extension, &right.extension) else {
        return false;
    };
    Regex::new(&format!("(?:{c_left})$"))
        .ok()
        .and_then(|reg| reg.is_match(&representative_of(c_right)).ok())
        .unwrap_or(false)
}

/// Decide whether `left` makes `right` redundant, or the reverse.
///
/// Complex filters never take part. Otherwise `left` wins when its
/// expression fully matches a sample path derived from `right` and its
/// folder/name/extension flags are at least as permissive.
fn compare_filters(
    left: &CompiledFilter,
    right: &CompiledFilter,
    separator: char,
    if_reversed: bool,
) -> EnumSubsumption {
    if left.is_complex || right.is_complex {
        return EnumSubsumption::Neither;
    }
    let c_sample = sample_path(right, separator);
    if left.is_full_match(&c_sample) {
        if left.any_folder && left.any_file && left.any_extension {
            return EnumSubsumption::LeftWins;
        }
        if (left.any_folder || right.anchor_path.starts_with(&left.anchor_path))
            && is_name_covered(left, right)
            && is_extension_covered(left, right)
        {
            return EnumSubsumption::LeftWins;
        }
    }
    if if_reversed {
        return EnumSubsumption::Neither;
    }
    compare_filters(right, left, separator, true).swapped()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_d() -> ResolutionContext {
        ResolutionContext::resolve_with_separator("D:/", '/')
    }

    fn build_d(patterns: &[&str], if_unique: bool) -> FilterSet {
        build_filter_set_with_context(patterns, &ctx_d(), if_unique).expect("build")
    }

    fn raw_patterns(l_filters: &[CompiledFilter]) -> Vec<&str> {
        l_filters.iter().map(|f| f.raw_pattern.as_str()).collect()
    }

    #[test]
    fn empty_input_gives_empty_set() {
        let spec_options = SpecFilterOptions {
            root: Some("D:/".to_string()),
            separator: '/',
            ..SpecFilterOptions::default()
        };
        let filter_set = build_filter_set::<&str>(&[], &spec_options).expect("build");
        assert!(filter_set.is_empty());
        assert!(filter_set.positive_expression.is_none());
        assert!(filter_set.negative_expression.is_none());
        assert!(filter_set.anchors.is_empty());
    }

    #[test]
    fn any_folder_positive_subsumes_exact_sibling() {
        let filter_set = build_d(&["!a/b/**/*.js", "!a/b/c.js", "a/c/b", "a/c/**"], true);
        assert_eq!(raw_patterns(&filter_set.positive), vec!["a/c/**"]);
        assert_eq!(raw_patterns(&filter_set.negative), vec!["!a/b/**/*.js"]);
        assert_eq!(filter_set.anchors, vec!["D:/a/c".to_string()]);
        assert_eq!(filter_set.excluded_anchors, vec!["D:/a/b".to_string()]);
    }

    #[test]
    fn complex_filters_are_kept_as_is() {
        let filter_set = build_d(&["a/**/*.*", "a/**/a.js", "a/b/*.js", "a/b/c.js"], true);
        assert_eq!(raw_patterns(&filter_set.positive), vec!["a/**/*.*", "a/**/a.js"]);
        assert_eq!(filter_set.anchors, vec!["D:/a".to_string()]);
    }

    #[test]
    fn covered_filters_collapse() {
        let filter_set = build_d(&["a/*.js", "a/*.js"], true);
        assert_eq!(filter_set.positive.len(), 1);

        let filter_set = build_d(&["a/b", "a/b/c.js"], true);
        assert_eq!(raw_patterns(&filter_set.positive), vec!["a/b"]);
    }

    #[test]
    fn negative_any_folder_excludes_positive_below_it() {
        let filter_set = build_d(&["!a/b/**", "a/b/c"], true);
        assert!(filter_set.positive.is_empty());
        assert!(filter_set.positive_expression.is_none());
        assert_eq!(filter_set.excluded_anchors, vec!["D:/a/b".to_string()]);
        assert!(filter_set.anchors.is_empty());
        assert!(!filter_set.is_included("D:/a/b/c"));
    }

    #[test]
    fn broader_negative_replaces_narrower() {
        let filter_set = build_d(&["!a/b/c", "!a/b"], true);
        assert_eq!(raw_patterns(&filter_set.negative), vec!["!a/b"]);
    }

    #[test]
    fn uniqueness_disabled_keeps_duplicates() {
        let filter_set = build_d(&["a/**", "a/**", "a/b/c.js"], false);
        assert_eq!(filter_set.positive.len(), 3);
        assert_eq!(filter_set.anchors, vec!["D:/a".to_string(), "D:/a/b/c.js".to_string()]);
        assert_eq!(
            filter_set.positive_expression_source,
            "D:\\/a\\/.*|D:\\/a\\/.*|D:\\/a\\/b\\/c\\.js"
        );
    }

    #[test]
    fn combined_expressions_select_paths() {
        let filter_set = build_d(&["src/**/*.rs", "!src/gen/**"], true);
        assert!(filter_set.is_included("D:/src/lib.rs"));
        assert!(filter_set.is_included("D:/src/a/b.rs"));
        assert!(!filter_set.is_included("D:/src/gen/x.rs"));
        assert!(!filter_set.is_included("D:/src/a/b.txt"));
        assert_eq!(filter_set.excluded_anchors, vec!["D:/src/gen".to_string()]);
    }

    #[test]
    fn sample_path_fills_missing_name_and_extension() {
        let ctx = ctx_d();
        let filter = compile_filter("a/b", &ctx).expect("compile");
        assert_eq!(sample_path(&filter, '/'), "D:/a/b/tst.js");

        let filter = compile_filter("a/*.min.js", &ctx).expect("compile");
        assert_eq!(sample_path(&filter, '/'), "D:/a/tst.min.js");

        let filter = compile_filter("a/c.txt", &ctx).expect("compile");
        assert_eq!(sample_path(&filter, '/'), "D:/a/c.txt");
    }

    #[test]
    fn identical_patterns_at_base_collapse() {
        let filter_set = build_d(&["*.js", "*.js"], true);
        assert_eq!(raw_patterns(&filter_set.positive), vec!["*.js"]);
        assert_eq!(filter_set.positive_expression_source, "D:\\/[^\\/]*\\.js");

        let filter_set = build_d(&["*", "*"], true);
        assert_eq!(filter_set.positive.len(), 1);
        assert_eq!(filter_set.anchors, vec!["D:/".to_string()]);

        let filter_set = build_d(&["!*.js", "!*.js"], true);
        assert_eq!(filter_set.negative.len(), 1);

        let ctx = ResolutionContext::resolve_with_separator("D:/cwd", '/');
        let filter_set =
            build_filter_set_with_context(&["*.js", "*.js"], &ctx, true).expect("build");
        assert_eq!(filter_set.positive.len(), 1);
        assert_eq!(filter_set.anchors, vec!["D:/cwd/".to_string()]);
    }

    #[test]
    fn sample_path_at_base_has_single_separator() {
        let filter = compile_filter("*.js", &ctx_d()).expect("compile");
        assert_eq!(filter.anchor_path, "D:/");
        assert_eq!(sample_path(&filter, '/'), "D:/tst.js");

        assert!(filter.is_full_match(&sample_path(&filter, '/')));
        let filter_nested = compile_filter("a/*.js", &ctx_d()).expect("compile");
        assert!(!filter.is_full_match(&sample_path(&filter_nested, '/')));
    }

    #[test]
    fn invalid_pattern_fails_whole_build() {
        let res = build_filter_set_with_context(&["a/**", "a/<(b>"], &ctx_d(), true);
        assert!(res.is_err());
    }
}
