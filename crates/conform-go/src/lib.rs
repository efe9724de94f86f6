//! Go front-end: package listing through `go list` or the source tree, and
//! tree-sitter summaries of Go source files.

pub mod parser;
pub mod source_tree;
pub mod toolchain;

pub use parser::GoParser;
pub use source_tree::SourceTree;
pub use toolchain::GoToolchain;
