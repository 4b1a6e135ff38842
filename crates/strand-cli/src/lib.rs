//! CLI logic for the Strand diagram compiler.
//!
//! This module contains the core CLI logic: loading a JSON diagram
//! document, building the signature registry (standard library plus
//! session-declared boxes), and dispatching to the check, rules,
//! rewrite, and compile operations.

pub mod error_adapter;

mod args;

pub use args::{Args, Command};

use std::fs;

use log::info;
use thiserror::Error;

use strand::codegen::{self, CodegenError, GenOptions, TypeMap};
use strand::rewrite::rules::{self, RuleId};
use strand::{RewriteError, apply, check, list_applicable};
use strand_core::cancel::{CancelToken, Cancelled};
use strand_core::diagnostic::Diagnostic;
use strand_core::diagram::{Diagram, NodeId};
use strand_core::document::{self, DocumentError};
use strand_core::signature::Registry;

/// Top-level CLI failure.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The diagram does not check; the diagnostics carry the details.
    #[error("diagram is not valid ({} diagnostic(s))", diagnostics.len())]
    Invalid { diagnostics: Vec<Diagnostic> },

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("code generation failed ({} error(s))", .0.len())]
    Codegen(Vec<CodegenError>),

    #[error("operation cancelled")]
    Cancelled(#[from] Cancelled),

    /// A `--map` argument that is not of the form `Base=TargetType`.
    #[error("invalid type mapping `{0}`")]
    BadTypeMapEntry(String),
}

/// Run the Strand CLI application
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Malformed diagram documents
/// - Invalid diagrams (with their diagnostics)
/// - Rewrite and code generation failures
pub fn run(args: &Args) -> Result<(), CliError> {
    match &args.command {
        Command::Check { input } => check_command(input),
        Command::Rules { input, select } => rules_command(input, select),
        Command::Rewrite {
            input,
            rule,
            select,
            output,
        } => rewrite_command(input, rule, select, output.as_deref()),
        Command::Compile {
            input,
            target,
            function_name,
            module_prefix,
            map,
            output,
        } => compile_command(
            input,
            target,
            function_name,
            module_prefix.as_deref(),
            map,
            output.as_deref(),
        ),
    }
}

/// Reads the document and builds its registry: the standard library
/// plus every fully-declared box in the document.
fn load(input: &str) -> Result<(Diagram, Registry), CliError> {
    let source = fs::read_to_string(input)?;
    let diagram = document::from_json_str(&source)?;
    let mut builder = Registry::builder();
    for (label, signature) in Registry::standard().iter() {
        builder = builder.declare(label, signature.clone());
    }
    let registry = builder.declare_document_boxes(&diagram).build();
    Ok((diagram, registry))
}

fn check_command(input: &str) -> Result<(), CliError> {
    info!(input_path = input; "Checking diagram");
    let (diagram, registry) = load(input)?;
    let report = check(&diagram, &registry, &CancelToken::new())?;
    if !report.valid {
        return Err(CliError::Invalid {
            diagnostics: report.diagnostics,
        });
    }
    for diagnostic in &report.diagnostics {
        println!("{diagnostic}");
    }
    if let Some(signature) = report.signature {
        println!("valid: {signature}");
    }
    Ok(())
}

fn rules_command(input: &str, select: &[String]) -> Result<(), CliError> {
    info!(input_path = input, selection = select.len(); "Listing applicable rules");
    let (diagram, registry) = load(input)?;
    let selection: Vec<NodeId> = select.iter().map(NodeId::new).collect();
    let applicable = list_applicable(&diagram, &registry, &selection, &CancelToken::new())
        .map_err(from_rewrite)?;
    if applicable.is_empty() {
        println!("no applicable rules");
    }
    for id in applicable {
        let rule = rules::rule(id);
        println!("{:<20} {}", rule.name, rule.description);
    }
    Ok(())
}

fn rewrite_command(
    input: &str,
    rule: &str,
    select: &[String],
    output: Option<&str>,
) -> Result<(), CliError> {
    info!(input_path = input, rule = rule; "Applying rewrite");
    let (diagram, registry) = load(input)?;
    let rule_id: RuleId = rule.parse().map_err(RewriteError::from)?;
    let selection: Vec<NodeId> = select.iter().map(NodeId::new).collect();
    let rewritten = apply(&diagram, &registry, rule_id, &selection, &CancelToken::new())
        .map_err(from_rewrite)?;
    let encoded = document::to_json_string_pretty(&rewritten)?;
    emit(output, &format!("{encoded}\n"))
}

fn compile_command(
    input: &str,
    target: &str,
    function_name: &str,
    module_prefix: Option<&str>,
    map: &[String],
    output: Option<&str>,
) -> Result<(), CliError> {
    info!(input_path = input, target = target; "Compiling diagram");
    let (diagram, registry) = load(input)?;
    let cancel = CancelToken::new();
    let report = check(&diagram, &registry, &cancel)?;
    if !report.valid {
        return Err(CliError::Invalid {
            diagnostics: report.diagnostics,
        });
    }

    let options = GenOptions {
        function_name: function_name.to_owned(),
        module_prefix: module_prefix.map(str::to_owned),
        type_map: parse_type_map(map)?,
    };
    let source = codegen::generate(&diagram, &report, target, &options, &cancel)
        .map_err(CliError::Codegen)?;
    emit(output, &source)
}

/// Parses repeated `--map Base=TargetType` arguments in order.
fn parse_type_map(entries: &[String]) -> Result<TypeMap, CliError> {
    let mut map = TypeMap::new();
    for entry in entries {
        let Some((base, target)) = entry.split_once('=') else {
            return Err(CliError::BadTypeMapEntry(entry.clone()));
        };
        if base.is_empty() || target.is_empty() {
            return Err(CliError::BadTypeMapEntry(entry.clone()));
        }
        map.insert(base.to_owned(), target.to_owned());
    }
    Ok(map)
}

/// An invalid input diagram surfaces its diagnostics; every other
/// rewrite failure passes through.
fn from_rewrite(err: RewriteError) -> CliError {
    match err {
        RewriteError::InvalidDiagram { diagnostics } => CliError::Invalid { diagnostics },
        other => CliError::Rewrite(other),
    }
}

fn emit(output: Option<&str>, text: &str) -> Result<(), CliError> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            info!(output_file = path; "Output written");
        }
        None => print!("{text}"),
    }
    Ok(())
}
