//! dtlink - a devicetree linker.
//!
//! Resolves parsed devicetree sources into one merged node graph: labels,
//! node paths, overlays through reference blocks, and node and property
//! deletion across files. Every problem found on the way becomes an
//! [`issue::Issue`]; malformed input never aborts a pass.
//!
//! The usual entry point is a [`Context`], which reads a root file and its
//! includes through a [`SourceProvider`] and hands out [`runtime::Runtime`]
//! snapshots:
//!
//! ```rust
//! use dtlink::{Context, MemorySources, config::AppConfig, issue::IssueKind};
//!
//! let sources = MemorySources::new().with_file(
//!     "board.dts",
//!     "/ { n1: node { p = <1>; }; };\n/delete-node/ &n1;\n&n1 { };",
//! );
//! let mut context = Context::new("board.dts", sources, AppConfig::default());
//! let runtime = context.runtime().expect("board.dts is readable");
//!
//! assert!(runtime.label("n1").is_none());
//! assert_eq!(runtime.unlinked_reference_blocks().len(), 1);
//! assert_eq!(runtime.issues()[0].kind(), IssueKind::UnableToResolveChildNode);
//! ```

pub mod config;
pub mod graph;
pub mod issue;
pub mod resolver;
pub mod runtime;
pub mod scope;
pub mod source;

mod context;
mod error;

pub use dtlink_core::{identifier, source::SourceMap, span};

pub use context::Context;
pub use error::DtLinkError;
pub use source::{FsSources, MemorySources, SourceProvider};
