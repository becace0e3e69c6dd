//! Pattern compiler: one left-to-right scan over the pattern, a star-run
//! resolver, then reconstruction of the anchor path and expression.
//!
//! The scan keeps the current path segment as a list of [`Fragment`]s plus,
//! while no wildcard structure has been seen, its plain text. Plain segments
//! grow the anchor path; the first segment with structure stops that growth.

use tracing::debug;

use crate::context::{ResolutionContext, drive_prefix_len, is_separator};
use crate::render::{
    EnumBracket, EnumGroupPrefix, Fragment, escape_literal_str, render_fragments,
    render_separator,
};
use crate::spec::{CompiledFilter, FilterError, compile_anchored};

////////////////////////////////////////////////////////////////////////////////
// #region ScannerState

#[derive(Debug)]
struct SpecGroupState {
    bracket: EnumBracket,
    prefix: Option<EnumGroupPrefix>,
    if_doubled: bool,
    l_depths: [usize; 3],
    c_content: String,
    /// Index of the opener in the pattern; replayed literally if never closed.
    n_start: usize,
}

#[derive(Debug, Default)]
enum EnumScanMode {
    #[default]
    Literal,
    Group(SpecGroupState),
    HardLiteral {
        n_depth: usize,
        c_content: String,
    },
}

#[derive(Debug, Default)]
struct SpecScanFlags {
    any_folder: bool,
    any_file: bool,
    any_extension: bool,
    extension: Option<String>,
    file_name: Option<String>,
    is_complex: bool,
}

struct PatternScanner {
    l_chars: Vec<char>,
    separator: char,
    mode: EnumScanMode,
    prefix_pending: Option<(EnumGroupPrefix, usize)>,
    l_segments: Vec<Vec<Fragment>>,
    l_literal_segments: Vec<String>,
    l_fragments: Vec<Fragment>,
    c_literal: String,
    n_separators_pending: usize,
    b_has_pattern: bool,
    /// Final segment's name is constrained by a dirty or triple star run.
    b_name_pinned: bool,
    flags: SpecScanFlags,
    base: String,
    root: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PublicApi

/// Compile one pattern against a resolved context.
///
/// Never fails on pattern syntax; the only error is a generated expression
/// the regex engine rejects (usually from a `<...>` hard literal).
pub fn compile_filter(
    pattern: &str,
    ctx: &ResolutionContext,
) -> Result<CompiledFilter, FilterError> {
    let mut c_work = pattern;
    let is_negative = c_work.starts_with('!');
    if is_negative {
        c_work = &c_work[1..];
    }

    let mut base = ctx.base.clone();
    let mut root = ctx.root.clone();
    if c_work.starts_with(is_separator) {
        base = ctx.root.clone();
        c_work = &c_work[1..];
    } else if let Some(n_len) = drive_prefix_len(c_work) {
        root = format!("{}{}", &c_work[..2], ctx.separator);
        base = root.clone();
        c_work = &c_work[n_len..];
    } else if c_work.starts_with('.') && c_work[1..].starts_with(is_separator) {
        c_work = &c_work[2..];
    }

    let mut scanner = PatternScanner::new(c_work, ctx.separator, base, root);
    scanner.scan();
    let filter = scanner.reconstruct(pattern, is_negative)?;
    debug!(
        pattern,
        anchor = %filter.anchor_path,
        expression = %filter.expression_source,
        "compiled filter"
    );
    Ok(filter)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Scan

impl PatternScanner {
    fn new(work: &str, separator: char, base: String, root: String) -> Self {
        Self {
            l_chars: work.chars().collect(),
            separator,
            mode: EnumScanMode::Literal,
            prefix_pending: None,
            l_segments: Vec::new(),
            l_literal_segments: Vec::new(),
            l_fragments: Vec::new(),
            c_literal: String::new(),
            n_separators_pending: 0,
            b_has_pattern: false,
            b_name_pinned: false,
            flags: SpecScanFlags::default(),
            base,
            root,
        }
    }

    fn char_at(&self, n_idx: usize) -> Option<char> {
        self.l_chars.get(n_idx).copied()
    }

    fn scan(&mut self) {
        let mut i = 0;
        while i < self.l_chars.len() {
            let c = self.l_chars[i];
            let n_skip = match self.mode {
                EnumScanMode::HardLiteral { .. } => {
                    self.scan_hard_literal_char(c);
                    0
                }
                EnumScanMode::Group(_) => self.scan_group_char(i, c),
                EnumScanMode::Literal => self.scan_literal_char(i, c),
            };
            i += n_skip + 1;
        }
        self.finish();
    }

    /// Start the next segment if separators were seen since the last character.
    fn flush_pending(&mut self) {
        if self.n_separators_pending > 0 {
            self.flush_segment(false);
        }
    }

    fn flush_segment(&mut self, if_done: bool) {
        if !self.l_fragments.is_empty() {
            if !self.b_has_pattern {
                let c_literal = std::mem::take(&mut self.c_literal);
                if if_done && !c_literal.is_empty() {
                    self.split_file_name(&c_literal);
                }
                self.l_literal_segments.push(c_literal);
            } else if !if_done {
                self.flags.is_complex = true;
            }
            self.l_segments.push(std::mem::take(&mut self.l_fragments));
            self.c_literal.clear();
            if !if_done {
                self.b_name_pinned = false;
            }
        }
        self.n_separators_pending = 0;
    }

    fn split_file_name(&mut self, c_literal: &str) {
        match c_literal.rfind('.') {
            Some(0) => self.flags.file_name = Some(c_literal.to_string()),
            Some(n_idx) => {
                self.flags.file_name = Some(c_literal[..n_idx].to_string());
                self.flags.extension = Some(c_literal[n_idx..].to_string());
            }
            None => {}
        }
    }

    /// Add a character that must match itself.
    fn push_literal(&mut self, c: char) {
        self.flush_pending();
        if let EnumScanMode::Group(state) = &mut self.mode {
            state.c_content.push('\\');
            state.c_content.push(c);
            return;
        }
        if !self.b_has_pattern {
            self.c_literal.push(c);
        }
        self.l_fragments.push(Fragment::Literal(c));
    }

    /// Add a regex quantifier/wildcard character as-is, unless the previous
    /// fragment is already quantified.
    fn push_raw_operator(&mut self, c: char) {
        self.flush_pending();
        if self.l_fragments.last().is_some_and(Fragment::ends_quantified) {
            self.l_fragments.push(Fragment::Literal(c));
            return;
        }
        self.l_fragments.push(Fragment::Raw(c.to_string()));
    }

    /// Next character opens a bracket; that makes the segment a pattern.
    fn peek_bracket(&mut self, n_idx: usize) -> bool {
        if self
            .char_at(n_idx + 1)
            .is_some_and(|c| EnumBracket::from_open(c).is_some())
        {
            self.b_has_pattern = true;
            return true;
        }
        false
    }

    fn arm_prefix(&mut self, prefix: EnumGroupPrefix, n_idx: usize) {
        self.prefix_pending = Some((prefix, n_idx));
    }

    fn scan_hard_literal_char(&mut self, c: char) {
        let EnumScanMode::HardLiteral { n_depth, c_content } = &mut self.mode else {
            return;
        };
        match c {
            '>' if *n_depth == 0 => {
                let c_content = std::mem::take(c_content);
                self.mode = EnumScanMode::Literal;
                if !c_content.is_empty() {
                    self.l_fragments.push(Fragment::Raw(c_content));
                }
                self.b_has_pattern = true;
            }
            '>' => {
                *n_depth -= 1;
                c_content.push(c);
            }
            '<' => {
                *n_depth += 1;
                c_content.push(c);
            }
            _ => c_content.push(c),
        }
    }

    fn scan_group_char(&mut self, n_idx: usize, c: char) -> usize {
        let c_next = self.char_at(n_idx + 1);
        let EnumScanMode::Group(state) = &mut self.mode else {
            return 0;
        };
        if c == '\\' {
            state.c_content.push_str("\\\\");
            return 0;
        }
        if let Some(bracket) = EnumBracket::from_open(c) {
            state.l_depths[bracket.index()] += 1;
            state.c_content.push(c);
            return 0;
        }
        let Some(bracket) = EnumBracket::from_close(c) else {
            state.c_content.push(c);
            return 0;
        };
        let n_depth = state.l_depths[bracket.index()];
        if state.if_doubled && bracket == state.bracket && n_depth == 1 {
            self.end_group();
            return usize::from(c_next == Some(c));
        }
        if n_depth > 0 {
            state.l_depths[bracket.index()] -= 1;
            state.c_content.push(c);
            return 0;
        }
        if bracket == state.bracket {
            self.end_group();
            return 0;
        }
        state.c_content.push(c);
        0
    }

    fn end_group(&mut self) {
        if let EnumScanMode::Group(state) = std::mem::take(&mut self.mode) {
            self.l_fragments.push(Fragment::Group {
                bracket: state.bracket,
                prefix: state.prefix,
                if_doubled: state.if_doubled,
                content: state.c_content,
            });
        }
    }

    fn open_bracket(&mut self, n_idx: usize, c: char, bracket: EnumBracket) -> usize {
        self.flush_pending();
        if let Some((prefix, n_start)) = self.prefix_pending.take() {
            self.mode = EnumScanMode::Group(SpecGroupState {
                bracket,
                prefix: Some(prefix),
                if_doubled: false,
                l_depths: [0; 3],
                c_content: String::new(),
                n_start,
            });
            return 0;
        }
        if self.peek_bracket(n_idx) && self.char_at(n_idx + 1) == Some(c) {
            let mut l_depths = [0; 3];
            l_depths[bracket.index()] = 1;
            self.mode = EnumScanMode::Group(SpecGroupState {
                bracket,
                prefix: None,
                if_doubled: true,
                l_depths,
                c_content: String::new(),
                n_start: n_idx,
            });
            return 1;
        }
        self.push_literal(c);
        0
    }

    fn scan_literal_char(&mut self, n_idx: usize, c: char) -> usize {
        let c_next = self.char_at(n_idx + 1);
        match c {
            '<' => {
                self.flush_pending();
                self.mode = EnumScanMode::HardLiteral {
                    n_depth: 0,
                    c_content: String::new(),
                };
                0
            }
            '\\' => match c_next {
                Some(c_esc @ ('.' | '?' | '*' | '+' | '$' | '!')) => {
                    self.push_literal(c_esc);
                    1
                }
                Some('\\') => {
                    self.n_separators_pending += 1;
                    1
                }
                _ => {
                    self.n_separators_pending += 1;
                    0
                }
            },
            '/' => {
                self.n_separators_pending += 1;
                0
            }
            '(' | '{' | '[' => EnumBracket::from_open(c)
                .map_or(0, |bracket| self.open_bracket(n_idx, c, bracket)),
            ')' | '}' | ']' => {
                self.push_literal(c);
                0
            }
            '!' | '@' => {
                self.flush_pending();
                match EnumGroupPrefix::from_char(c) {
                    Some(prefix) if self.peek_bracket(n_idx) => self.arm_prefix(prefix, n_idx),
                    _ => self.push_literal(c),
                }
                0
            }
            '$' => {
                self.flush_pending();
                if self.peek_bracket(n_idx) {
                    self.arm_prefix(EnumGroupPrefix::ExactlyOneAlt, n_idx);
                } else if c_next.is_none() {
                    self.l_fragments.push(Fragment::Raw("$".to_string()));
                } else {
                    self.push_literal('$');
                }
                0
            }
            '+' => self.scan_doubling(n_idx, c, EnumGroupPrefix::OneOrMore),
            '?' => self.scan_doubling(n_idx, c, EnumGroupPrefix::ZeroOrOne),
            '*' => {
                self.flush_pending();
                if self.peek_bracket(n_idx) {
                    self.arm_prefix(EnumGroupPrefix::ZeroOrMore, n_idx);
                    return 0;
                }
                self.resolve_star_run(n_idx)
            }
            '.' => self.scan_dots(n_idx),
            _ => {
                self.push_literal(c);
                0
            }
        }
    }

    /// `+` and `?`: group prefix, doubled operator, or literal.
    fn scan_doubling(&mut self, n_idx: usize, c: char, prefix: EnumGroupPrefix) -> usize {
        self.flush_pending();
        if self.peek_bracket(n_idx) {
            self.arm_prefix(prefix, n_idx);
            return 0;
        }
        if self.char_at(n_idx + 1) == Some(c) && !self.l_fragments.is_empty() {
            self.b_has_pattern = true;
            self.push_raw_operator(c);
            if self.char_at(n_idx + 2) == Some(c) {
                if self.peek_bracket(n_idx + 2) {
                    self.arm_prefix(prefix, n_idx + 2);
                } else {
                    self.push_literal(c);
                }
                return 2;
            }
            return 1;
        }
        self.push_literal(c);
        0
    }

    fn scan_dots(&mut self, n_idx: usize) -> usize {
        self.flush_pending();
        let mut n_dots = 1;
        while self.char_at(n_idx + n_dots) == Some('.') {
            n_dots += 1;
        }
        if n_dots != 2 {
            for _ in 0..n_dots {
                self.push_literal('.');
            }
            return n_dots - 1;
        }

        let b_followed = self
            .char_at(n_idx + 2)
            .is_some_and(|c_after| !is_separator(c_after));
        if b_followed || !self.l_fragments.is_empty() {
            self.b_has_pattern = true;
            self.push_raw_operator('.');
        } else if !self.l_segments.is_empty() {
            self.l_segments.pop();
            if self.l_segments.len() < self.l_literal_segments.len() {
                self.l_literal_segments.pop();
            }
        } else {
            self.base = ResolutionContext::parent_of_base(&self.base, &self.root, self.separator);
        }
        1
    }

    fn finish(&mut self) {
        match std::mem::take(&mut self.mode) {
            EnumScanMode::Group(state) => {
                // never closed: the opener and everything after it is plain text
                let l_tail: Vec<char> = self.l_chars[state.n_start..].to_vec();
                for c in l_tail {
                    self.l_fragments.push(Fragment::Literal(c));
                }
            }
            EnumScanMode::HardLiteral { c_content, .. } => {
                if !c_content.is_empty() {
                    self.l_fragments.push(Fragment::Raw(c_content));
                }
                self.b_has_pattern = true;
            }
            EnumScanMode::Literal => {}
        }
        if !self.l_fragments.is_empty() {
            self.flush_segment(true);
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StarRuns

fn push_star_count(l_stars: &mut Vec<usize>, n_stars: usize) {
    if n_stars > 0 {
        l_stars.push(n_stars);
    }
}

impl PatternScanner {
    /// Classify the star run starting at `n_index` and emit its fragments.
    ///
    /// Looks ahead over further stars, separators and a dot-delimited tail.
    /// Returns how many characters after `n_index` were consumed.
    fn resolve_star_run(&mut self, n_index: usize) -> usize {
        self.flush_pending();
        let n_len = self.l_chars.len();
        let mut n_cnt: usize = 1;
        let mut b_slash = false;
        let mut b_dot = false;
        let mut b_stop = false;
        let mut b_dirty = !self.l_fragments.is_empty();
        let mut n_stars: usize = 1;
        let mut l_ext: Vec<char> = Vec::new();
        let mut l_stars: Vec<usize> = Vec::new();

        while n_index + n_cnt < n_len && !b_stop {
            let c = self.l_chars[n_index + n_cnt];
            match c {
                '/' | '\\' => {
                    if b_slash || b_dot || !l_ext.is_empty() || b_dirty {
                        b_stop = true;
                        push_star_count(&mut l_stars, n_stars);
                        n_stars = 0;
                        continue;
                    }
                    b_slash = true;
                    push_star_count(&mut l_stars, n_stars);
                    n_stars = 0;
                    b_dot = false;
                }
                '.' => {
                    if b_slash || b_dot || b_dirty {
                        b_stop = true;
                        push_star_count(&mut l_stars, n_stars);
                        n_stars = 0;
                        continue;
                    }
                    b_dot = true;
                    if l_ext.is_empty() {
                        push_star_count(&mut l_stars, n_stars);
                    }
                    n_stars = 0;
                    b_slash = false;
                }
                '*' => {
                    if n_stars == 2 {
                        b_stop = true;
                    }
                    b_slash = false;
                    b_dot = false;
                    n_stars += 1;
                }
                _ => {
                    if (!b_dot && l_ext.is_empty()) || b_slash {
                        if !b_slash {
                            b_dirty = true;
                        }
                        b_stop = true;
                        continue;
                    }
                    b_dot = false;
                }
            }
            if b_dot || !l_ext.is_empty() {
                l_ext.push(c);
            }
            n_cnt += 1;
        }
        if l_ext.is_empty() {
            push_star_count(&mut l_stars, n_stars);
        }
        if b_slash || b_dot {
            // a trailing separator or dot is left for the main scan
            n_cnt -= 1;
        }
        let b_end = n_index + n_cnt == n_len;
        n_cnt = n_cnt.saturating_sub(1);

        if b_dirty {
            self.emit_dirty_run(l_stars);
            return n_cnt;
        }

        if !b_end {
            // an extension only counts at the very end; give it back
            let n_ext_consumed = if b_dot {
                l_ext.len().saturating_sub(1)
            } else {
                l_ext.len()
            };
            n_cnt = n_cnt.saturating_sub(n_ext_consumed);
            l_ext.clear();
        }
        let b_any_ext = l_ext == ['.', '*'];
        let l_ext_fragments = if l_ext.is_empty() || b_any_ext {
            Vec::new()
        } else {
            extension_fragments(&l_ext[1..])
        };

        let (mut b_double, mut b_single, mut b_triple) = (false, false, false);
        for &n in l_stars.iter().rev() {
            match n {
                1 => b_single = true,
                3 => b_triple = true,
                _ => {
                    b_double = true;
                    break;
                }
            }
        }

        let mut l_result: Vec<Fragment> = Vec::new();
        if b_double {
            l_result.push(Fragment::AnyDepth);
            if b_end {
                self.flags.any_folder = true;
                if b_single {
                    self.flags.any_file = true;
                }
            }
        } else if b_single {
            l_result.push(Fragment::AnyComponent);
            if b_end {
                self.flags.any_file = true;
            }
        }
        if b_triple {
            if !l_result.is_empty() {
                l_result.push(Fragment::Separator);
            }
            l_result.push(Fragment::Literal('*'));
            l_result.push(Fragment::Raw("*".to_string()));
            self.b_name_pinned = true;
        }

        if b_any_ext || (l_ext.is_empty() && !self.flags.any_folder) {
            self.flags.any_extension = true;
        } else if b_end && !l_ext.is_empty() {
            self.flags.extension = Some(format!(
                ".{}",
                render_fragments(&l_ext_fragments, self.separator)
            ));
        }

        if !l_result.is_empty() {
            if !l_ext_fragments.is_empty() {
                l_result.push(Fragment::Literal('.'));
                l_result.extend(l_ext_fragments);
            }
            self.l_fragments.extend(l_result);
            self.b_has_pattern = true;
            self.c_literal.clear();
        }
        n_cnt
    }

    /// Star run touching literal text in the same component.
    fn emit_dirty_run(&mut self, mut l_stars: Vec<usize>) {
        let n_last = l_stars.pop();
        if !l_stars.is_empty() {
            self.l_fragments.push(if l_stars.contains(&2) {
                Fragment::AnyDepth
            } else {
                Fragment::AnyComponent
            });
            self.l_fragments.push(Fragment::Separator);
            self.c_literal.clear();
            self.b_has_pattern = true;
        }
        if n_last == Some(2) {
            self.push_literal('*');
            return;
        }
        self.l_fragments.push(Fragment::AnyComponent);
        if n_last == Some(3) {
            self.l_fragments.push(Fragment::Literal('*'));
        }
        self.c_literal.clear();
        self.b_has_pattern = true;
        self.b_name_pinned = true;
    }
}

/// Extension body (after its leading dot): one star is any text, two a
/// literal star, three a run of literal stars.
fn extension_fragments(l_body: &[char]) -> Vec<Fragment> {
    let mut l_fragments = Vec::new();
    let mut n_stars = 0;
    for c in l_body.iter().copied().map(Some).chain(std::iter::once(None)) {
        if c == Some('*') {
            n_stars += 1;
            continue;
        }
        match n_stars {
            0 => {}
            1 => l_fragments.push(Fragment::AnyComponent),
            2 => l_fragments.push(Fragment::Literal('*')),
            _ => {
                l_fragments.push(Fragment::Literal('*'));
                l_fragments.push(Fragment::Raw("*".to_string()));
            }
        }
        n_stars = 0;
        if let Some(c) = c {
            l_fragments.push(Fragment::Literal(c));
        }
    }
    l_fragments
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reconstruct

impl PatternScanner {
    fn reconstruct(
        self,
        raw_pattern: &str,
        is_negative: bool,
    ) -> Result<CompiledFilter, FilterError> {
        let separator = self.separator;
        let c_sep = render_separator(separator);

        let c_sep_plain = separator.to_string();
        let mut anchor_path = self.base.clone();
        anchor_path.push_str(&self.l_literal_segments.join(c_sep_plain.as_str()));

        let mut expression_source = escape_literal_str(&self.base, separator);
        let l_rendered: Vec<String> = self
            .l_segments
            .iter()
            .map(|segment| render_fragments(segment, separator))
            .collect();
        expression_source.push_str(&l_rendered.join(c_sep.as_str()));

        let mut flags = self.flags;
        if !flags.any_file && flags.file_name.is_none() && !self.b_name_pinned {
            flags.any_file = true;
        }
        if !flags.any_extension && flags.extension.is_none() {
            flags.any_extension = true;
        }
        if !self.b_has_pattern && flags.extension.as_deref().is_none_or(|ext| ext == ".") {
            while expression_source.ends_with(&c_sep) {
                expression_source.truncate(expression_source.len() - c_sep.len());
            }
            expression_source.push_str(&format!("({c_sep}.+)?$"));
        }

        let c_work: String = self
            .l_chars
            .iter()
            .map(|&c| if is_separator(c) { separator } else { c })
            .collect();
        let exact = format!("{}{c_work}", self.base) == anchor_path;

        let compiled_expression = compile_anchored(&expression_source)?;
        Ok(CompiledFilter {
            raw_pattern: raw_pattern.to_string(),
            is_negative,
            anchor_path,
            expression_source,
            compiled_expression,
            any_folder: flags.any_folder,
            any_file: flags.any_file,
            any_extension: flags.any_extension,
            extension: flags.extension,
            file_name: flags.file_name,
            exact,
            is_complex: flags.is_complex,
            base: self.base,
            root: self.root,
        })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::compile_filter;
    use crate::context::ResolutionContext;
    use crate::render::escape_literal_str;
    use crate::spec::CompiledFilter;

    fn compile_at(pattern: &str, root: &str) -> CompiledFilter {
        let ctx = ResolutionContext::resolve_with_separator(root, '/');
        compile_filter(pattern, &ctx).expect("compile")
    }

    fn compile_d(pattern: &str) -> CompiledFilter {
        compile_at(pattern, "D:/")
    }

    fn expr_d(pattern: &str) -> String {
        compile_d(pattern).expression_source
    }

    const ANY_END: &str = "(\\/.+)?$";
    const ANY_NAME: &str = "[^\\/]*";

    #[test]
    fn empty_pattern_matches_base_and_below() {
        let filter = compile_at("", "D:/cwd");
        assert_eq!(filter.anchor_path, "D:/cwd/");
        assert_eq!(filter.expression_source, format!("D:\\/cwd{ANY_END}"));
        assert!(filter.exact);
        assert!(filter.any_file);
        assert!(filter.any_extension);
        assert!(!filter.is_negative);
        assert!(filter.is_match("D:/cwd/x/y.txt"));
        assert!(filter.is_match("D:/cwd"));
        assert!(!filter.is_match("D:/cwdx"));
    }

    #[test]
    fn double_star_sets_every_any_flag() {
        let filter = compile_d("a/**");
        assert_eq!(filter.anchor_path, "D:/a");
        assert_eq!(filter.expression_source, "D:\\/a\\/.*");
        assert!(filter.any_folder && filter.any_file && filter.any_extension);
        assert!(!filter.exact);
        assert!(filter.is_match("D:/a/b/c.js"));
        assert!(!filter.is_match("D:/b/c.js"));
    }

    #[test]
    fn star_dot_extension_pins_extension() {
        let filter = compile_d("a/*.js");
        assert_eq!(filter.anchor_path, "D:/a");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/{ANY_NAME}\\.js"));
        assert!(filter.any_file);
        assert!(!filter.any_extension);
        assert!(!filter.any_folder);
        assert_eq!(filter.extension.as_deref(), Some(".js"));
        assert!(filter.is_full_match("D:/a/x.js"));
        assert!(!filter.is_full_match("D:/a/b/x.js"));
        // prefix match: longer extensions pass `is_match` but not `is_full_match`
        assert!(filter.is_match("D:/a/x.json"));
        assert!(!filter.is_full_match("D:/a/x.json"));
    }

    #[test]
    fn star_between_literals_is_name_wildcard_only() {
        let filter = compile_d("a/b*c");
        assert_eq!(filter.anchor_path, "D:/a");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/b{ANY_NAME}c"));
        assert!(!filter.any_file);
        assert!(!filter.any_folder);
    }

    #[test]
    fn triple_star_is_literal_star_run() {
        let filter = compile_d("a/***b");
        assert_eq!(filter.expression_source, "D:\\/a\\/\\**b");
        assert!(!filter.any_folder);
        assert!(!filter.any_file);
        assert_eq!(expr_d("***"), "D:\\/\\**");
    }

    #[test]
    fn double_star_inside_name_is_one_literal_star() {
        let filter = compile_d("a/b**c");
        assert_eq!(filter.anchor_path, "D:/a/b*c");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/b\\*c{ANY_END}"));
        assert!(!filter.exact);
    }

    #[test]
    fn star_runs_across_separators() {
        assert_eq!(expr_d("**/**a/b"), "D:\\/.*\\/\\*a\\/b");
        assert_eq!(expr_d("x/**/*.js"), "D:\\/x\\/.*\\.js");
        assert_eq!(expr_d("a/**/"), "D:\\/a\\/.*");
        assert_eq!(expr_d("a/*/"), format!("D:\\/a\\/{ANY_NAME}"));
        assert_eq!(expr_d("**/*"), "D:\\/.*");

        let filter = compile_d("x/**/*.js");
        assert!(filter.any_folder && filter.any_file);
        assert_eq!(filter.extension.as_deref(), Some(".js"));
    }

    #[test]
    fn single_star_followed_by_separators_stays_in_component() {
        let filter = compile_d("a/*//b");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/{ANY_NAME}\\/b"));
        assert!(filter.is_complex);

        let filter = compile_d("a/*.js/b");
        assert_eq!(
            filter.expression_source,
            format!("D:\\/a\\/{ANY_NAME}\\.js\\/b")
        );
        assert!(filter.is_complex);
    }

    #[test]
    fn trailing_dot_after_star_terminates() {
        let filter = compile_d("a/*.");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/{ANY_NAME}\\."));

        let filter = compile_d("a/*.js.");
        assert_eq!(
            filter.expression_source,
            format!("D:\\/a\\/{ANY_NAME}\\.js\\.")
        );
    }

    #[test]
    fn extension_variants() {
        let filter = compile_d("a/*.*");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/{ANY_NAME}"));
        assert!(filter.any_file && filter.any_extension);
        assert!(filter.extension.is_none());

        let filter = compile_d("a/**/*.*");
        assert!(filter.any_folder && filter.any_file && filter.any_extension);

        let filter = compile_d("*.min.js");
        assert_eq!(filter.extension.as_deref(), Some(".min\\.js"));

        let filter = compile_d("a/*.js*");
        assert_eq!(filter.extension.as_deref(), Some(".js[^\\/]*"));

        let filter = compile_d("a/*.j**s");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/{ANY_NAME}\\.j\\*s"));

        let filter = compile_d("a/b/*.tar.gz");
        assert_eq!(filter.anchor_path, "D:/a/b");
        assert_eq!(filter.extension.as_deref(), Some(".tar\\.gz"));

        let filter = compile_d("a/**.js");
        assert_eq!(filter.expression_source, "D:\\/a\\/.*\\.js");
        assert!(filter.any_folder);
    }

    #[test]
    fn dot_star_is_hidden_file_wildcard() {
        assert_eq!(expr_d(".*"), format!("D:\\/\\.{ANY_NAME}"));
    }

    #[test]
    fn plain_path_is_exact_directory() {
        let filter = compile_d("a/b");
        assert_eq!(filter.anchor_path, "D:/a/b");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/b{ANY_END}"));
        assert!(filter.exact);
        assert!(filter.any_file && filter.any_extension);
        assert!(!filter.any_folder);
        assert!(filter.extension.is_none());
    }

    #[test]
    fn plain_file_pins_name_and_extension() {
        let filter = compile_d("a/b/c.js");
        assert!(filter.exact);
        assert_eq!(filter.file_name.as_deref(), Some("c"));
        assert_eq!(filter.extension.as_deref(), Some(".js"));
        assert!(!filter.any_file);
        assert!(!filter.any_extension);
        assert_eq!(filter.expression_source, "D:\\/a\\/b\\/c\\.js");

        let filter = compile_d(".gitignore");
        assert_eq!(filter.file_name.as_deref(), Some(".gitignore"));
        assert!(filter.extension.is_none());
        assert!(filter.exact);

        let filter = compile_d("a/b...c");
        assert_eq!(filter.file_name.as_deref(), Some("b.."));
        assert_eq!(filter.extension.as_deref(), Some(".c"));

        let filter = compile_d("a/b.");
        assert_eq!(filter.extension.as_deref(), Some("."));
        assert_eq!(filter.expression_source, format!("D:\\/a\\/b\\.{ANY_END}"));
    }

    #[test]
    fn parent_segments_pop_literal_and_base() {
        let filter = compile_d("a/../b");
        assert_eq!(filter.anchor_path, "D:/b");
        assert_eq!(filter.expression_source, format!("D:\\/b{ANY_END}"));

        let filter = compile_d("a/b/../../../../c");
        assert_eq!(filter.anchor_path, "D:/c");

        let filter = compile_at("../x", "D:/cwd/sub");
        assert_eq!(filter.base, "D:/cwd/");
        assert_eq!(filter.anchor_path, "D:/cwd/x");

        let filter = compile_d("a/b..c");
        assert_eq!(filter.expression_source, "D:\\/a\\/b.c");
        assert_eq!(filter.anchor_path, "D:/a");
    }

    #[test]
    fn absolute_and_dot_relative_patterns() {
        let filter = compile_at("/x/y", "D:/cwd");
        assert_eq!(filter.anchor_path, "D:/x/y");
        assert!(filter.exact);

        let filter = compile_at("E:/x/*.js", "D:/cwd");
        assert_eq!(filter.root, "E:/");
        assert_eq!(filter.anchor_path, "E:/x");

        let filter = compile_d("./a");
        assert_eq!(filter.anchor_path, "D:/a");
        assert!(filter.exact);

        let filter = compile_d("!./a");
        assert!(filter.is_negative);
        assert_eq!(filter.anchor_path, "D:/a");
        assert_eq!(filter.raw_pattern, "!./a");
    }

    #[test]
    fn separators_collapse() {
        assert_eq!(compile_d("a//b").anchor_path, "D:/a/b");
        assert_eq!(compile_d("a\\\\b").anchor_path, "D:/a/b");
        assert_eq!(compile_d("a\\b").anchor_path, "D:/a/b");
    }

    #[test]
    fn negation_marker_alone_targets_base() {
        let filter = compile_d("!");
        assert!(filter.is_negative);
        assert_eq!(filter.anchor_path, "D:/");
        assert_eq!(filter.expression_source, format!("D:{ANY_END}"));

        let filter = compile_d("!!a");
        assert!(filter.is_negative);
        assert_eq!(filter.anchor_path, "D:/!a");
    }

    #[test]
    fn doubled_operators() {
        assert_eq!(expr_d("a/b++c"), "D:\\/a\\/b+c");
        assert_eq!(expr_d("a/++(b)"), "D:\\/a\\/\\+(b)+");
        assert_eq!(expr_d("a/b+++(c)"), "D:\\/a\\/b+(c)+");
        assert_eq!(expr_d("a/+++(b)"), "D:\\/a\\/\\++\\(b\\)");
        assert_eq!(expr_d("a/b??c"), "D:\\/a\\/b?c");
        assert_eq!(expr_d("a/b??"), "D:\\/a\\/b?");
        assert_eq!(expr_d("a/b???"), "D:\\/a\\/b?\\?");
        assert_eq!(compile_d("a/??b").anchor_path, "D:/a/??b");
        assert_eq!(compile_d("a/b??").anchor_path, "D:/a");
    }

    #[test]
    fn stacked_operators_stay_valid() {
        let filter = compile_d("a/b??++??");
        assert!(filter.is_match("D:/a/b"));
    }

    #[test]
    fn groups_follow_prefix_table() {
        assert_eq!(expr_d("a/!(b)"), "D:\\/a\\/(?!b)");
        assert_eq!(expr_d("a/!{b}"), "D:\\/a\\/(?!b)");
        assert_eq!(expr_d("a/![bc]"), "D:\\/a\\/[^bc]");
        assert_eq!(expr_d("a/+(b|c)"), "D:\\/a\\/(b|c)+");
        assert_eq!(expr_d("a/?(b)"), "D:\\/a\\/(b)?");
        assert_eq!(expr_d("a/@(b)"), "D:\\/a\\/(b)");
        assert_eq!(expr_d("a/$(b)"), "D:\\/a\\/(b)");
        assert_eq!(expr_d("a/*(b)"), "D:\\/a\\/(b)*");
        assert_eq!(expr_d("a/*[bc]"), "D:\\/a\\/[bc]*");
        assert_eq!(expr_d("a/@(b??)"), "D:\\/a\\/(b??)");
    }

    #[test]
    fn group_keeps_anchor_before_it() {
        let filter = compile_d("a/*(b)");
        assert_eq!(filter.anchor_path, "D:/a");
        assert!(!filter.is_complex);

        let filter = compile_d("a/+(b|c)/*.js");
        assert!(filter.is_complex);
        assert_eq!(filter.anchor_path, "D:/a");
    }

    #[test]
    fn doubled_and_nested_brackets() {
        assert_eq!(expr_d("a/((b))"), "D:\\/a\\/(b)");
        assert_eq!(expr_d("a/{{c[\\e]d}}"), "D:\\/a\\/(c[\\\\e]d)");
        assert_eq!(expr_d("a/[[bc]]"), "D:\\/a\\/[bc]");
        assert_eq!(expr_d("a/+(b(c)d)"), "D:\\/a\\/(b(c)d)+");
        assert_eq!(
            expr_d("a/{(c[e]d)}"),
            "D:\\/a\\/\\{\\(c\\[e\\]d\\)\\}"
        );
    }

    #[test]
    fn unterminated_group_falls_back_to_literal() {
        let filter = compile_d("a/+(b");
        assert_eq!(filter.expression_source, "D:\\/a\\/\\+\\(b");
        assert!(filter.is_match("D:/a/+(b"));
    }

    #[test]
    fn hard_literal_copies_regex_through() {
        assert_eq!(expr_d("a/<c<b>d>"), "D:\\/a\\/c<b>d");
        assert_eq!(expr_d("a/<b|c>"), "D:\\/a\\/b|c");

        let filter = compile_d("a/<b");
        assert_eq!(filter.expression_source, "D:\\/a\\/b");
        assert_eq!(filter.anchor_path, "D:/a");
    }

    #[test]
    fn invalid_hard_literal_is_reported() {
        let ctx = ResolutionContext::resolve_with_separator("D:/", '/');
        let res = compile_filter("a/<(b>", &ctx);
        assert!(matches!(
            res,
            Err(crate::FilterError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn escapes_force_literals() {
        let filter = compile_d("a/b\\?c");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/b\\?c{ANY_END}"));
        assert_eq!(filter.anchor_path, "D:/a/b?c");

        let filter = compile_d("a/\\*.js");
        assert_eq!(filter.anchor_path, "D:/a/*.js");

        let filter = compile_d("\\!a");
        assert!(!filter.is_negative);
        assert_eq!(filter.anchor_path, "D:/!a");
    }

    #[test]
    fn dollar_passes_through_only_at_end() {
        let filter = compile_d("a/b$");
        assert_eq!(filter.expression_source, format!("D:\\/a\\/b${ANY_END}"));
        assert_eq!(filter.anchor_path, "D:/a/b");

        assert_eq!(expr_d("a/$b"), format!("D:\\/a\\/\\$b{ANY_END}"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let filter = compile_d("a/b|c^d");
        assert_eq!(filter.anchor_path, "D:/a/b|c^d");
        assert!(filter.is_match("D:/a/b|c^d"));
        assert!(!filter.is_match("D:/a/b"));
    }

    #[test]
    fn complex_only_when_structure_precedes_last_segment() {
        assert!(compile_d("**/a").is_complex);
        assert!(compile_d("a/b*/c").is_complex);
        assert!(compile_d("a/**/b/**").is_complex);
        assert!(!compile_d("a/b/*.js").is_complex);
    }

    #[test]
    fn backslash_separator_platform() {
        let ctx = ResolutionContext::resolve_with_separator("C:\\work", '\\');
        let filter = compile_filter("src/**/*.rs", &ctx).expect("compile");
        assert_eq!(filter.anchor_path, "C:\\work\\src");
        assert_eq!(filter.expression_source, "C:\\\\work\\\\src\\\\.*\\.rs");
        assert!(filter.is_match("C:\\work\\src\\a\\b.rs"));
    }

    proptest! {
        #[test]
        fn compile_terminates_and_is_idempotent(pattern in "[ab./\\\\*+?!@$(){}<>\\[\\]]{0,14}") {
            let ctx = ResolutionContext::resolve_with_separator("D:/", '/');
            let first = compile_filter(&pattern, &ctx);
            let second = compile_filter(&pattern, &ctx);
            match (first, second) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a.expression_source, b.expression_source),
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                _ => prop_assert!(false, "results differ"),
            }
        }

        #[test]
        fn wildcard_patterns_always_compile(pattern in "[ab./\\\\*+?!@$]{0,14}") {
            let ctx = ResolutionContext::resolve_with_separator("D:/", '/');
            prop_assert!(compile_filter(&pattern, &ctx).is_ok());
        }

        #[test]
        fn anchor_prefixes_expression(pattern in "[ab./*+?!@$]{0,14}") {
            let ctx = ResolutionContext::resolve_with_separator("D:/", '/');
            let filter = compile_filter(&pattern, &ctx).expect("compile");
            prop_assert!(filter.anchor_path.starts_with(&filter.root));
            let c_anchor = escape_literal_str(filter.anchor_path.trim_end_matches('/'), '/');
            prop_assert!(
                filter.expression_source.starts_with(&c_anchor),
                "{} !~ {}", filter.expression_source, c_anchor
            );
        }
    }
}
