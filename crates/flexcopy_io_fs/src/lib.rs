//! `flexcopy_io_fs`:
//! Folder listing and pattern-driven copy on top of `flexcopy_filter`.
//!
//! - `copy`   : anchor listing, copy planning and execution
//! - `walk`   : folder listing with name/extension splits
//! - `rename` : target-name derivation
//! - `spec`   : enums/options/errors
//! - `report` : run-time report model
//! - `util`   : shared helper functions

pub mod copy;
pub mod rename;
pub mod report;
pub mod spec;
mod util;
pub mod walk;

pub use copy::copy_flex;
pub use rename::{SpecRenameRules, SpecTargetName, derive_target_name};
pub use report::{ReportCopy, ReportCopyBuilder};
pub use spec::{
    CopyFlexError, EnumErrorHandle, EnumExistingFileStrategy, EnumPreserveState, SpecCopyError,
    SpecCopyFlexOptions, SpecFolderInfo, SpecListOptions, SpecRenameOptions,
};
pub use walk::list_folders;
