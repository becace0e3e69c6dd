//! `flexcopy_filter`:
//! Glob-like path patterns compiled to anchored regular expressions.
//!
//! - `compile`    : pattern scanner and star-run resolver
//! - `filter_set` : positive/negative aggregation and subsumption
//! - `context`    : working-root resolution and its cache
//! - `spec`       : compiled records, options, errors

mod compile;
mod context;
mod filter_set;
mod render;
pub mod spec;

pub use compile::compile_filter;
pub use context::{FilterCompiler, ResolutionContext};
pub use filter_set::build_filter_set;
pub use render::escape_literal_str;
pub use spec::{CompiledFilter, FilterError, FilterSet, SpecFilterOptions};
