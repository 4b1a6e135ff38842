//! Strand core: types and diagram model for the Strand string-diagram
//! compiler.
//!
//! This crate is the leaf of the workspace: the type algebra of a
//! symmetric monoidal category, the hypergraph intermediate
//! representation of a string diagram, the read-only signature
//! registry, the diagnostic system, the JSON interchange form, and the
//! cooperative cancellation token. The checker, rewrite engine, and
//! code generator live in the `strand` crate; the CLI in `strand-cli`.

pub mod cancel;
pub mod diagnostic;
pub mod diagram;
pub mod document;
pub mod signature;
pub mod types;

pub use cancel::{CancelToken, Cancelled};
pub use diagnostic::{Diagnostic, DiagnosticCollector, ErrorCode, Severity, Subject};
pub use diagram::{
    Boundary, Diagram, Endpoint, Node, NodeId, NodeKind, Port, PortId, Side, Structural, Wire,
    WireId,
};
pub use signature::{Registry, RegistryBuilder, Signature};
pub use types::{SchemaTy, Subst, Ty, TyVar};
