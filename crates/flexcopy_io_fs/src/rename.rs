//! Target-name derivation for copied files.

use regex::Regex;

use crate::spec::{CopyFlexError, SpecFolderInfo, SpecRenameOptions};
use crate::walk::split_extensions;

/// Destination file name split into name and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTargetName {
    /// Name without extension.
    pub name: String,
    /// Extension with its leading dot, `""` if none.
    pub ext: String,
    /// `name` + `ext`.
    pub full_name: String,
}

impl SpecTargetName {
    fn new(name: String, ext: String) -> Self {
        let full_name = format!("{name}{ext}");
        Self {
            name,
            ext,
            full_name,
        }
    }

    /// `name(n).ext`, the candidate used after a conflict.
    pub fn numbered(&self, n_counter: usize) -> String {
        format!("{}({n_counter}){}", self.name, self.ext)
    }
}

/// [`SpecRenameOptions`] with its name/extension patterns compiled.
#[derive(Debug, Clone)]
pub struct SpecRenameRules {
    spec_rename_options: SpecRenameOptions,
    reg_name: Option<Regex>,
    reg_ext: Option<Regex>,
}

impl SpecRenameRules {
    pub fn new(spec_rename_options: &SpecRenameOptions) -> Result<Self, CopyFlexError> {
        Ok(Self {
            reg_name: compile_rename_pattern(spec_rename_options.name_pattern.as_deref())?,
            reg_ext: compile_rename_pattern(spec_rename_options.ext_pattern.as_deref())?,
            spec_rename_options: spec_rename_options.clone(),
        })
    }

    fn is_name_selected(&self, c_file_name: &str) -> bool {
        self.reg_name
            .as_ref()
            .is_none_or(|reg| reg.is_match(c_file_name))
    }

    fn is_ext_selected(&self, c_file_name: &str) -> bool {
        self.reg_ext
            .as_ref()
            .is_none_or(|reg| reg.is_match(c_file_name))
    }
}

/// Escape `. * $ \ /` and compile; empty or missing patterns select everything.
fn compile_rename_pattern(pattern: Option<&str>) -> Result<Option<Regex>, CopyFlexError> {
    let Some(c_pattern) = pattern.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let mut c_escaped = String::with_capacity(c_pattern.len());
    for c in c_pattern.chars() {
        if matches!(c, '.' | '*' | '$' | '\\' | '/') {
            c_escaped.push('\\');
        }
        c_escaped.push(c);
    }
    Regex::new(&c_escaped)
        .map(Some)
        .map_err(|e| CopyFlexError::InvalidPattern {
            pattern: c_escaped,
            message: e.to_string(),
        })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn with_dot(c_ext: String) -> String {
    if c_ext.is_empty() || c_ext.starts_with('.') {
        return c_ext;
    }
    format!(".{c_ext}")
}

/// Split a file name at its extension: the first dot when `if_long_extension`,
/// else the last. A leading dot belongs to the name.
fn split_name(c_file_name: &str, if_long_extension: bool) -> (String, String) {
    let (ext, long_ext) = split_extensions(c_file_name);
    let c_ext = if if_long_extension { long_ext } else { ext };
    let c_name = c_file_name[..c_file_name.len() - c_ext.len()].to_string();
    (c_name, c_ext)
}

/// Name the copy of `info` will get at its destination.
///
/// Without rules the source name is kept. With rules, a matching
/// `name_pattern` (or none) rewrites the name, then a matching `ext_pattern`
/// (or none) rewrites the extension. A replacement `name` with
/// `if_remove_ext` set carries its own extension and ends the derivation.
pub fn derive_target_name(
    info: &SpecFolderInfo,
    spec_rename_rules: Option<&SpecRenameRules>,
    if_long_extension: bool,
) -> SpecTargetName {
    let (mut c_name, mut c_ext) = if if_long_extension {
        (info.short_name.clone(), info.long_ext.clone())
    } else {
        (info.long_name.clone(), info.ext.clone())
    };
    let Some(spec_rename_rules) = spec_rename_rules else {
        return SpecTargetName::new(c_name, c_ext);
    };
    let spec_rename_options = &spec_rename_rules.spec_rename_options;

    if spec_rename_rules.is_name_selected(&info.name) {
        match non_empty(&spec_rename_options.name) {
            Some(c_new_name) if spec_rename_options.if_remove_ext => {
                let (c_split_name, c_split_ext) = split_name(c_new_name, if_long_extension);
                return SpecTargetName::new(c_split_name, c_split_ext);
            }
            Some(c_new_name) => c_name = c_new_name.to_string(),
            None => {
                if let Some(c_prefix) = non_empty(&spec_rename_options.prefix) {
                    c_name = format!("{c_prefix}{c_name}");
                }
                if let Some(c_postfix) = non_empty(&spec_rename_options.postfix) {
                    c_name.push_str(c_postfix);
                }
            }
        }
    }

    if spec_rename_rules.is_ext_selected(&info.name) {
        if let Some(c_new_ext) = non_empty(&spec_rename_options.ext) {
            return SpecTargetName::new(c_name, with_dot(c_new_ext.to_string()));
        }
        if let Some(c_ext_prefix) = non_empty(&spec_rename_options.ext_prefix) {
            c_ext = format!("{c_ext_prefix}{}", c_ext.strip_prefix('.').unwrap_or(&c_ext));
        }
        if let Some(c_ext_postfix) = non_empty(&spec_rename_options.ext_postfix) {
            c_ext.push_str(c_ext_postfix);
        }
        c_ext = with_dot(c_ext);
    }
    SpecTargetName::new(c_name, c_ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_info(c_name: &str) -> SpecFolderInfo {
        let (ext, long_ext) = split_extensions(c_name);
        SpecFolderInfo {
            name: c_name.to_string(),
            full_name: format!("/r/{c_name}"),
            is_folder: false,
            long_name: c_name[..c_name.len() - ext.len()].to_string(),
            short_name: c_name[..c_name.len() - long_ext.len()].to_string(),
            ext,
            long_ext,
            parent: "/r".to_string(),
            from_root: String::new(),
            from_start: String::new(),
            ignore_folder: false,
        }
    }

    fn rules(spec_rename_options: SpecRenameOptions) -> SpecRenameRules {
        SpecRenameRules::new(&spec_rename_options).expect("rules")
    }

    #[test]
    fn no_rules_keep_source_split() {
        let info = file_info("a.tar.gz");
        let target = derive_target_name(&info, None, false);
        assert_eq!((target.name.as_str(), target.ext.as_str()), ("a.tar", ".gz"));
        let target = derive_target_name(&info, None, true);
        assert_eq!((target.name.as_str(), target.ext.as_str()), ("a", ".tar.gz"));
        assert_eq!(target.full_name, "a.tar.gz");
    }

    #[test]
    fn prefix_postfix_and_extension_affixes() {
        let spec_rename_rules = rules(SpecRenameOptions {
            prefix: Some("pre_".to_string()),
            postfix: Some("_post".to_string()),
            ext_prefix: Some("x".to_string()),
            ext_postfix: Some("z".to_string()),
            ..SpecRenameOptions::default()
        });
        let target = derive_target_name(&file_info("note.txt"), Some(&spec_rename_rules), false);
        assert_eq!(target.full_name, "pre_note_post.xtxtz");
    }

    #[test]
    fn replacement_name_and_extension() {
        let spec_rename_rules = rules(SpecRenameOptions {
            name: Some("renamed".to_string()),
            ext: Some("md".to_string()),
            ..SpecRenameOptions::default()
        });
        let target = derive_target_name(&file_info("note.txt"), Some(&spec_rename_rules), false);
        assert_eq!(target.full_name, "renamed.md");
        assert_eq!(target.numbered(2), "renamed(2).md");
    }

    #[test]
    fn replacement_name_with_own_extension() {
        let spec_rename_rules = rules(SpecRenameOptions {
            name: Some("out.tar.gz".to_string()),
            if_remove_ext: true,
            ext: Some("ignored".to_string()),
            ..SpecRenameOptions::default()
        });
        let target = derive_target_name(&file_info("in.txt"), Some(&spec_rename_rules), false);
        assert_eq!((target.name.as_str(), target.ext.as_str()), ("out.tar", ".gz"));
        let target = derive_target_name(&file_info("in.txt"), Some(&spec_rename_rules), true);
        assert_eq!((target.name.as_str(), target.ext.as_str()), ("out", ".tar.gz"));
    }

    #[test]
    fn patterns_limit_which_files_are_rewritten() {
        let spec_rename_rules = rules(SpecRenameOptions {
            name_pattern: Some("a.js".to_string()),
            prefix: Some("p_".to_string()),
            ext_pattern: Some("b".to_string()),
            ext: Some(".ts".to_string()),
            ..SpecRenameOptions::default()
        });
        let target = derive_target_name(&file_info("a.js"), Some(&spec_rename_rules), false);
        assert_eq!(target.full_name, "p_a.js");
        // `.` is literal, so `aXjs` is not selected.
        let target = derive_target_name(&file_info("aXjs.b"), Some(&spec_rename_rules), false);
        assert_eq!(target.full_name, "aXjs.ts");
    }

    #[test]
    fn extensionless_file_stays_extensionless() {
        let spec_rename_rules = rules(SpecRenameOptions {
            postfix: Some("_1".to_string()),
            ..SpecRenameOptions::default()
        });
        let target = derive_target_name(&file_info("Makefile"), Some(&spec_rename_rules), false);
        assert_eq!(target.full_name, "Makefile_1");
        assert_eq!(target.ext, "");
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let res = SpecRenameRules::new(&SpecRenameOptions {
            name_pattern: Some("(".to_string()),
            ..SpecRenameOptions::default()
        });
        assert!(matches!(res, Err(CopyFlexError::InvalidPattern { .. })));
    }
}
