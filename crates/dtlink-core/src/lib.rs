//! dtlink Core Types
//!
//! Foundational types shared by the dtlink parser, linker and CLI:
//!
//! - **Identifiers**: interned names for nodes, properties and labels ([`identifier::Name`])
//! - **Spans**: file ids, line/column positions and source spans ([`span`] module)
//! - **Sources**: the path to [`span::FileId`] registry ([`source::SourceMap`])

pub mod identifier;
pub mod source;
pub mod span;
