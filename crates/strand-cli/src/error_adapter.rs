//! Error adapter for converting CLI errors to miette diagnostics.
//!
//! This module provides the bridge between the library's error and
//! diagnostic types and miette's rich formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! When a [`CliError`] carries multiple diagnostics (an invalid diagram
//! or a code generation failure list), each one is rendered
//! independently.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use strand_core::diagnostic::Diagnostic;

use crate::CliError;

/// Adapter for a single checker diagnostic.
///
/// Diagrams have no source text, so there are no spans to label; the
/// diagnostic's subject is folded into the rendered message instead.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
}

impl<'a> DiagnosticAdapter<'a> {
    pub fn new(diag: &'a Diagnostic) -> Self {
        Self { diag }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// Adapter for non-diagnostic [`CliError`] variants.
pub struct ErrorAdapter<'a>(pub &'a CliError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            CliError::Io(_) => "strand::io",
            CliError::Document(_) => "strand::document",
            CliError::Rewrite(err) => {
                return err.code().map(|c| Box::new(c) as Box<dyn fmt::Display>);
            }
            CliError::Invalid { .. } | CliError::Codegen(_) => return None,
            CliError::Cancelled(_) => "strand::cancelled",
            CliError::BadTypeMapEntry(_) => "strand::args",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            CliError::BadTypeMapEntry(_) => {
                Some(Box::new("write the mapping as `Base=TargetType`"))
            }
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A checker diagnostic with code and help text.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A plain error.
    Error(ErrorAdapter<'a>),
    /// A rendered code generation failure.
    Codegen { code: Option<String>, message: String },
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
            Reportable::Codegen { message, .. } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Error(e) => e.source(),
            _ => None,
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
            Reportable::Codegen { code, .. } => {
                code.as_ref().map(|c| Box::new(c) as Box<dyn fmt::Display>)
            }
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
            Reportable::Codegen { .. } => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// Convert a [`CliError`] into a list of reportable errors.
///
/// An invalid diagram yields one [`Reportable`] per checker diagnostic
/// and a code generation failure one per [`CodegenError`]; other
/// variants yield a single [`Reportable`].
///
/// [`CodegenError`]: strand::codegen::CodegenError
pub fn to_reportables(err: &CliError) -> Vec<Reportable<'_>> {
    match err {
        CliError::Invalid { diagnostics } => diagnostics
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d)))
            .collect(),
        CliError::Codegen(errors) => errors
            .iter()
            .map(|e| Reportable::Codegen {
                code: e.code().map(|c| c.to_string()),
                message: e.to_string(),
            })
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}
