//! Run report and its mutable builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::SpecCopyError;

/// Counters and diagnostics for one `copy_flex` run.
#[derive(Debug, Default, Clone)]
pub struct ReportCopy {
    /// Listed entries (files and folders) under every anchor.
    pub cnt_scanned: u64,
    /// Files selected by the filter set.
    pub cnt_matched: u64,
    /// Files written, renamed copies included.
    pub cnt_copied: u64,
    /// Files written under a `name(n).ext` name.
    pub cnt_renamed: u64,
    /// Files not written because of dry-run.
    pub cnt_skipped: u64,
    /// Non-fatal notes (unreadable sub-folders, pool fallback).
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecCopyError>,
}

impl ReportCopy {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Counters keyed by field name.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        for (c_key, n_value) in [
            ("cnt_scanned", self.cnt_scanned),
            ("cnt_matched", self.cnt_matched),
            ("cnt_copied", self.cnt_copied),
            ("cnt_renamed", self.cnt_renamed),
            ("cnt_skipped", self.cnt_skipped),
            ("cnt_errors", self.error_count() as u64),
            ("cnt_warnings", self.warning_count() as u64),
        ] {
            dict_counts.insert(c_key.to_string(), n_value);
        }
        dict_counts
    }

    /// One-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} matched={} copied={} renamed={} skipped={} errors={} warnings={}",
            self.cnt_scanned,
            self.cnt_matched,
            self.cnt_copied,
            self.cnt_renamed,
            self.cnt_skipped,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[FLEXCOPY]"))
    }
}

/// Mutable accumulator for [`ReportCopy`].
#[derive(Debug, Default, Clone)]
pub struct ReportCopyBuilder {
    pub cnt_scanned: u64,
    pub cnt_matched: u64,
    pub cnt_copied: u64,
    pub cnt_renamed: u64,
    pub cnt_skipped: u64,
    pub warnings: Vec<String>,
    pub errors: Vec<SpecCopyError>,
}

impl ReportCopyBuilder {
    /// Increment the named counters by `value`. Unknown names are ignored.
    pub fn add_counts(&mut self, field_names: &[&str], value: u64) {
        for field_name in field_names {
            match *field_name {
                "cnt_scanned" => self.cnt_scanned += value,
                "cnt_matched" => self.cnt_matched += value,
                "cnt_copied" => self.cnt_copied += value,
                "cnt_renamed" => self.cnt_renamed += value,
                "cnt_skipped" => self.cnt_skipped += value,
                _ => {}
            }
        }
    }

    pub fn add_copied(&mut self) {
        self.cnt_copied += 1;
    }

    /// A renamed copy counts as copied too.
    pub fn add_renamed(&mut self) {
        self.cnt_copied += 1;
        self.cnt_renamed += 1;
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        self.errors.push(SpecCopyError { path, exception });
    }

    pub fn build(self) -> ReportCopy {
        ReportCopy {
            cnt_scanned: self.cnt_scanned,
            cnt_matched: self.cnt_matched,
            cnt_copied: self.cnt_copied,
            cnt_renamed: self.cnt_renamed,
            cnt_skipped: self.cnt_skipped,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReportCopy, ReportCopyBuilder};

    #[test]
    fn report_to_dict_and_format_agree() {
        let report = ReportCopy {
            cnt_scanned: 8,
            cnt_matched: 5,
            cnt_copied: 3,
            cnt_renamed: 1,
            cnt_skipped: 2,
            warnings: vec!["w".to_string()],
            errors: vec![],
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_scanned"], 8);
        assert_eq!(dict_counts["cnt_matched"], 5);
        assert_eq!(dict_counts["cnt_copied"], 3);
        assert_eq!(dict_counts["cnt_renamed"], 1);
        assert_eq!(dict_counts["cnt_skipped"], 2);
        assert_eq!(dict_counts["cnt_errors"], 0);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[FLEXCOPY]");
        assert_eq!(
            txt,
            "[FLEXCOPY] scanned=8 matched=5 copied=3 renamed=1 skipped=2 errors=0 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn builder_counts_renamed_as_copied() {
        let mut builder = ReportCopyBuilder::default();
        builder.add_counts(&["cnt_scanned", "cnt_matched", "cnt_unknown"], 2);
        builder.add_copied();
        builder.add_renamed();
        builder.add_error("x".into(), "boom".to_string());

        let report = builder.build();
        assert_eq!(report.cnt_scanned, 2);
        assert_eq!(report.cnt_matched, 2);
        assert_eq!(report.cnt_copied, 2);
        assert_eq!(report.cnt_renamed, 1);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].exception, "boom");
    }
}
