//! Strand: checker, rewrite engine, and code generator for string
//! diagrams.
//!
//! A diagram enters as a snapshot (decoded by `strand_core::document`),
//! is validated by [`check`], optionally transformed by [`rewrite`],
//! and compiled by [`codegen`]. The [`api`] module wraps the three into
//! serde-able request/response operations for an external transport.
//! Every entry point is a pure function of its snapshot plus a shared
//! read-only registry; nothing in this crate holds diagram state.

pub mod api;
pub mod check;
pub mod codegen;
pub mod rewrite;

pub use check::{CheckReport, check};
pub use codegen::{CodegenError, GenOptions, generate};
pub use rewrite::rules::RuleId;
pub use rewrite::{RewriteError, Selection, apply, list_applicable};
