//! Compiled filter records, builder options and the error type.

use fancy_regex::Regex;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for [`crate::build_filter_set`] and [`crate::FilterCompiler`].
#[derive(Debug, Clone)]
pub struct SpecFilterOptions {
    /// Working root relative patterns resolve against. `None` uses the process cwd.
    pub root: Option<String>,
    /// Drop patterns whose matches are covered by another pattern of the same sign.
    pub if_unique: bool,
    /// Re-resolve the working root instead of reusing a cached context.
    pub if_reset_root: bool,
    /// Path separator used for anchors and expressions.
    pub separator: char,
}

impl Default for SpecFilterOptions {
    fn default() -> Self {
        Self {
            root: None,
            if_unique: true,
            if_reset_root: true,
            separator: std::path::MAIN_SEPARATOR,
        }
    }
}

/// One compiled pattern.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    /// Pattern as received, including a leading `!`.
    pub raw_pattern: String,
    /// Pattern began with an un-escaped `!`.
    pub is_negative: bool,
    /// Longest wildcard-free path the pattern starts with; walk from here.
    pub anchor_path: String,
    /// Regex source (unanchored text; compiled with a leading `^`).
    pub expression_source: String,
    /// Compiled form of [`Self::expression_source`].
    pub compiled_expression: Regex,
    /// Matches at any depth below the anchor.
    pub any_folder: bool,
    /// Matches any file name in the matched folder.
    pub any_file: bool,
    /// No extension constraint.
    pub any_extension: bool,
    /// Pinned trailing extension, as an expression fragment (`.js`, `.min\.js`).
    pub extension: Option<String>,
    /// Pinned file-name stem.
    pub file_name: Option<String>,
    /// Pattern names one exact path.
    pub exact: bool,
    /// Wildcard structure outside the final segment.
    pub is_complex: bool,
    /// Resolved base directory, always ending with a separator.
    pub base: String,
    /// Filesystem root of `base`.
    pub root: String,
}

impl CompiledFilter {
    /// `true` if the path matches from its start.
    pub fn is_match(&self, path: &str) -> bool {
        self.compiled_expression.is_match(path).unwrap_or(false)
    }

    /// `true` if the expression covers the whole of `path`.
    pub fn is_full_match(&self, path: &str) -> bool {
        matches!(
            self.compiled_expression.find(path),
            Ok(Some(m)) if m.start() == 0 && m.end() == path.len()
        )
    }
}

/// Aggregated positive/negative filters for a pattern list.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    /// Kept positive filters, in input order.
    pub positive: Vec<CompiledFilter>,
    /// Kept negative filters, in input order.
    pub negative: Vec<CompiledFilter>,
    /// Positive sources joined by `|`.
    pub positive_expression_source: String,
    /// Negative sources joined by `|`.
    pub negative_expression_source: String,
    /// `None` when no positive filter survived.
    pub positive_expression: Option<Regex>,
    /// `None` when there is no negative filter.
    pub negative_expression: Option<Regex>,
    /// Deduplicated positive anchors.
    pub anchors: Vec<String>,
    /// Anchors of exact or any-folder negatives; never walked.
    pub excluded_anchors: Vec<String>,
}

impl FilterSet {
    /// No filter compiled at all.
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    /// Path matches the combined positive expression.
    pub fn is_positive_match(&self, path: &str) -> bool {
        self.positive_expression
            .as_ref()
            .is_some_and(|reg| reg.is_match(path).unwrap_or(false))
    }

    /// Path matches the combined negative expression.
    pub fn is_negative_match(&self, path: &str) -> bool {
        self.negative_expression
            .as_ref()
            .is_some_and(|reg| reg.is_match(path).unwrap_or(false))
    }

    /// Selected by a positive filter and not rejected by a negative one.
    pub fn is_included(&self, path: &str) -> bool {
        self.is_positive_match(path) && !self.is_negative_match(path)
    }
}

/// The generated expression could not be compiled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// Usually a hard-literal `<...>` or group body that is not valid regex.
    #[error("Invalid generated expression `{expression}`: {message}")]
    InvalidExpression {
        /// Expression source that failed.
        expression: String,
        /// Regex engine message.
        message: String,
    },
}

/// Compile `source` anchored at the start of the candidate path.
pub(crate) fn compile_anchored(source: &str) -> Result<Regex, FilterError> {
    Regex::new(&format!("^(?:{source})")).map_err(|e| FilterError::InvalidExpression {
        expression: source.to_string(),
        message: e.to_string(),
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
