//! The diagnostic system for diagram checking and compilation.
//!
//! This module provides:
//! - Error codes for documentation and searchability
//! - Subjects tying a diagnostic to a node, port, wire, or boundary slot
//! - Severity levels
//! - A collector for accumulating multiple diagnostics in one pass
//!
//! # Overview
//!
//! Validation problems are not Rust errors: the checker collects every
//! independent problem it finds into [`Diagnostic`] values so an editor
//! can surface them simultaneously. Diagnostics are deterministic:
//! the same input yields the same diagnostics in the same order.
//!
//! Diagrams have no source text, so instead of source spans a
//! diagnostic points at the offending entity by id via [`Subject`].
//!
//! # Example
//!
//! ```
//! # use strand_core::diagnostic::{Diagnostic, ErrorCode, Subject};
//! # use strand_core::diagram::WireId;
//! let diag = Diagnostic::error("wire joins `A` to `B`")
//!     .with_code(ErrorCode::E201)
//!     .with_subject(Subject::Wire(WireId::new("w3")))
//!     .with_help("the two endpoint types must be structurally equal");
//! assert_eq!(diag.to_string(), "error[E201]: wire joins `A` to `B`");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagram::{NodeId, PortId, Side, WireId};

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A fatal issue: the diagram cannot be rewritten or compiled.
    Error,

    /// An advisory issue that does not make the diagram invalid.
    Warning,
}

impl Severity {
    /// Returns `true` if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Error codes for categorizing diagnostics, organized by phase:
/// - `E1xx` - structural errors (connectivity)
/// - `E2xx` - type errors
/// - `E3xx` - rewrite errors
/// - `E4xx` - code generation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // =========================================================================
    // Structural errors (E1xx)
    // =========================================================================
    /// Unconnected endpoint.
    ///
    /// A port or boundary slot is the endpoint of no wire. Linearity
    /// requires exactly one wire per endpoint.
    E100,

    /// Multiply connected endpoint.
    ///
    /// A port or boundary slot is the endpoint of more than one wire
    /// (fan-out/fan-in sharing is not permitted).
    E101,

    /// Cycle.
    ///
    /// The wires form a directed cycle; traced/feedback structure is
    /// not supported.
    E102,

    /// Unknown endpoint reference.
    ///
    /// A wire refers to a node, port, or boundary slot that does not
    /// exist.
    E103,

    /// Duplicate id.
    ///
    /// Two nodes, two wires, or two ports of one node share an id.
    E104,

    /// Invalid wire direction.
    ///
    /// A wire's source must be a node output or boundary input; its
    /// target must be a node input or boundary output.
    E105,

    // =========================================================================
    // Type errors (E2xx)
    // =========================================================================
    /// Box signature mismatch.
    ///
    /// A box node's declared port types disagree with its registered
    /// signature positionally.
    E200,

    /// Wire type mismatch.
    ///
    /// The resolved types of a wire's two endpoints are not
    /// structurally equal.
    E201,

    /// Underconstrained structural node.
    ///
    /// A structural node's schema variables cannot be resolved from
    /// any incident port; the checker reports rather than guesses.
    E202,

    /// Boundary signature mismatch.
    ///
    /// The inferred diagram signature disagrees with the declared
    /// boundary.
    E203,

    /// Unknown morphism.
    ///
    /// A box node is neither registered nor fully declared.
    E204,

    // =========================================================================
    // Rewrite errors (E3xx)
    // =========================================================================
    /// No match.
    ///
    /// The rule's left-hand pattern does not match the selection's
    /// shape.
    E300,

    /// Type conflict.
    ///
    /// The pattern's type variables cannot be unified consistently
    /// across all matched slots.
    E301,

    /// Invalid input diagram.
    ///
    /// A rewrite was requested on a diagram that does not check.
    E302,

    // =========================================================================
    // Code generation errors (E4xx)
    // =========================================================================
    /// Unchecked diagram.
    ///
    /// Compilation was requested for a diagram that was never verified
    /// (or failed verification).
    E400,

    /// Unmapped type.
    ///
    /// A base type has no registered mapping for the requested target.
    E401,

    /// Unsupported construct.
    ///
    /// The target cannot express this node (for example, a target
    /// without first-class multi-value returns).
    E402,

    /// Unknown target.
    ///
    /// No backend is registered under the requested target identifier.
    E403,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E100").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Structural errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
            // Type errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            // Rewrite errors
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            // Code generation errors
            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",
            ErrorCode::E402 => "E402",
            ErrorCode::E403 => "E403",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Structural errors
            ErrorCode::E100 => "unconnected endpoint",
            ErrorCode::E101 => "multiply connected endpoint",
            ErrorCode::E102 => "cycle",
            ErrorCode::E103 => "unknown endpoint reference",
            ErrorCode::E104 => "duplicate id",
            ErrorCode::E105 => "invalid wire direction",
            // Type errors
            ErrorCode::E200 => "box signature mismatch",
            ErrorCode::E201 => "wire type mismatch",
            ErrorCode::E202 => "underconstrained structural node",
            ErrorCode::E203 => "boundary signature mismatch",
            ErrorCode::E204 => "unknown morphism",
            // Rewrite errors
            ErrorCode::E300 => "no match",
            ErrorCode::E301 => "type conflict",
            ErrorCode::E302 => "invalid input diagram",
            // Code generation errors
            ErrorCode::E400 => "unchecked diagram",
            ErrorCode::E401 => "unmapped type",
            ErrorCode::E402 => "unsupported construct",
            ErrorCode::E403 => "unknown target",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The entity a diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Node(NodeId),
    Port(NodeId, PortId),
    Wire(WireId),
    Boundary(Side, usize),

    /// The diagram as a whole.
    Diagram,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Node(n) => write!(f, "node {n}"),
            Subject::Port(n, p) => write!(f, "port {p} of node {n}"),
            Subject::Wire(w) => write!(f, "wire {w}"),
            Subject::Boundary(side, index) => write!(f, "boundary {side} slot {index}"),
            Subject::Diagram => write!(f, "diagram"),
        }
    }
}

/// A single error or warning with machine-checkable identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    severity: Severity,

    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,

    message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<Subject>,

    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error-severity diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            subject: None,
            help: None,
        }
    }

    /// Create a warning-severity diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code: None,
            message: message.into(),
            subject: None,
            help: None,
        }
    }

    /// Attach an error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the offending entity.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Attach help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Accumulates diagnostics during one checking pass.
///
/// Checking never stops at the first problem; every independent
/// diagnostic found in a pass is collected here and reported together.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Returns `true` if any collected diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity().is_error())
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Consumes the collector, yielding diagnostics in insertion order.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
