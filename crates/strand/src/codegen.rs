//! The code generator.
//!
//! Compiles a checked diagram into source text for one target. The
//! binding plan is target-independent: a deterministic Kahn topological
//! order over the nodes (ties broken by ascending node id), one binding
//! per box node, and pure value plumbing for structural nodes (aliases,
//! swaps, tuple regrouping, unit drops). Backends render syntax only.
//!
//! The generator trusts the checker's contract: it refuses an invalid
//! or unchecked report up front and does not re-validate types. Other
//! errors are collected per node while generation continues, to
//! maximize diagnostic yield from one run.

pub mod backend;
pub mod python;
pub mod rust;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use strand_core::cancel::{CancelToken, Cancelled};
use strand_core::diagnostic::ErrorCode;
use strand_core::diagram::{Diagram, Endpoint, Node, NodeId, NodeKind, Side, Structural};

use crate::check::CheckReport;
use backend::Backend;

pub use backend::TypeMap;

/// Per-run generation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenOptions {
    /// Name of the emitted function.
    pub function_name: String,

    /// Qualifier prepended to every call (`prefix::f` or `prefix.f`).
    pub module_prefix: Option<String>,

    /// Base-type name mapping for the target.
    pub type_map: TypeMap,
}

impl Default for GenOptions {
    fn default() -> Self {
        GenOptions {
            function_name: "diagram".to_owned(),
            module_prefix: None,
            type_map: TypeMap::new(),
        }
    }
}

/// A code generation failure, tied to the offending entity where one
/// exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// The diagram was never verified, or failed verification.
    #[error("diagram has not been checked successfully")]
    Unchecked,

    /// A base type has no mapping for the target.
    #[error("base type `{ty}` has no mapping for target `{target}`")]
    UnmappedType { ty: String, target: String },

    /// The target cannot express this node.
    #[error("target `{target}` cannot express node {node}: {detail}")]
    Unsupported {
        target: String,
        node: NodeId,
        detail: String,
    },

    /// No backend is registered under the identifier.
    #[error("unknown target `{0}`")]
    UnknownTarget(String),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl CodegenError {
    /// The diagnostic code this failure corresponds to, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CodegenError::Unchecked => Some(ErrorCode::E400),
            CodegenError::UnmappedType { .. } => Some(ErrorCode::E401),
            CodegenError::Unsupported { .. } => Some(ErrorCode::E402),
            CodegenError::UnknownTarget(_) => Some(ErrorCode::E403),
            CodegenError::Cancelled(_) => None,
        }
    }
}

/// The registered target identifiers.
pub fn targets() -> &'static [&'static str] {
    &[rust::TARGET, python::TARGET]
}

fn backend_for(target: &str) -> Option<Box<dyn Backend>> {
    match target {
        rust::TARGET => Some(Box::new(rust::RustBackend)),
        python::TARGET => Some(Box::new(python::PythonBackend)),
        _ => None,
    }
}

/// Generates source text for a checked diagram.
///
/// Output is byte-identical across runs for the same input.
pub fn generate(
    diagram: &Diagram,
    report: &CheckReport,
    target: &str,
    options: &GenOptions,
    cancel: &CancelToken,
) -> Result<String, Vec<CodegenError>> {
    let Some(backend) = backend_for(target) else {
        return Err(vec![CodegenError::UnknownTarget(target.to_owned())]);
    };
    if !report.valid {
        return Err(vec![CodegenError::Unchecked]);
    }
    if let Err(cancelled) = cancel.checkpoint() {
        return Err(vec![cancelled.into()]);
    }

    debug!(backend = target, nodes = diagram.nodes.len(); "generating code");

    let mut errors = Vec::new();
    let mut body = Vec::new();

    // Value expression per producing endpoint; boundary inputs seed it.
    let mut env: HashMap<Endpoint, String> = HashMap::new();
    let input_names: Vec<String> = (0..diagram.boundary.inputs.len())
        .map(|i| format!("in{i}"))
        .collect();
    for (i, name) in input_names.iter().enumerate() {
        env.insert(Endpoint::boundary(Side::Input, i), name.clone());
    }
    let mut used_names: HashSet<String> = input_names.iter().cloned().collect();

    for node in topo_order(diagram) {
        if let Err(cancelled) = cancel.checkpoint() {
            return Err(vec![cancelled.into()]);
        }
        let args = input_exprs(diagram, &env, node);
        match &node.kind {
            NodeKind::Box { label } => {
                if node.outputs.len() > 1 && !backend.supports_multi_value() {
                    errors.push(CodegenError::Unsupported {
                        target: backend.target().to_owned(),
                        node: node.id.clone(),
                        detail: format!(
                            "{} output values, but the target has no multi-value returns",
                            node.outputs.len()
                        ),
                    });
                }
                let names = binding_names(node, &mut used_names);
                let call = backend.call(label, options.module_prefix.as_deref(), &args);
                let pattern = match names.as_slice() {
                    [] => None,
                    some => Some(backend.pattern(some)),
                };
                body.push(backend.bind(pattern.as_deref(), &call));
                for (port, name) in node.outputs.iter().zip(names) {
                    env.insert(
                        Endpoint::Port {
                            node: node.id.clone(),
                            port: port.id.clone(),
                        },
                        name,
                    );
                }
            }
            NodeKind::Structural(primitive) => plumb(
                backend.as_ref(),
                *primitive,
                node,
                &args,
                &mut env,
                &mut body,
                &mut used_names,
            ),
        }
    }

    let out_exprs: Vec<String> = (0..diagram.boundary.outputs.len())
        .map(|slot| {
            let target = Endpoint::boundary(Side::Output, slot);
            diagram
                .wires
                .iter()
                .find(|w| w.target == target)
                .and_then(|w| env.get(&w.source))
                .cloned()
                .unwrap_or_else(|| backend.tuple(&[]))
        })
        .collect();
    let ret = backend.tuple(&out_exprs);

    let mut map_tys = |tys: &[strand_core::types::Ty]| -> Vec<String> {
        tys.iter()
            .map(|ty| {
                backend.type_name(ty, &options.type_map).unwrap_or_else(|base| {
                    errors.push(CodegenError::UnmappedType {
                        ty: base,
                        target: backend.target().to_owned(),
                    });
                    "_".to_owned()
                })
            })
            .collect()
    };
    let input_tys = map_tys(&diagram.boundary.inputs);
    let output_tys = map_tys(&diagram.boundary.outputs);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(backend.function(
        &options.function_name,
        &input_names,
        &backend.group_type(&input_tys),
        &backend.group_type(&output_tys),
        &body,
        &ret,
    ))
}

/// Kahn's algorithm with the ready set ordered by node id, so ties
/// among independent nodes break ascending.
fn topo_order(diagram: &Diagram) -> Vec<&Node> {
    let by_id: HashMap<&NodeId, &Node> = diagram.nodes.iter().map(|n| (&n.id, n)).collect();
    let mut indegree: BTreeMap<&NodeId, usize> =
        diagram.nodes.iter().map(|n| (&n.id, 0)).collect();
    let mut successors: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    for wire in &diagram.wires {
        if let (Some(src), Some(tgt)) = (wire.source.node(), wire.target.node()) {
            if indegree.contains_key(src) && indegree.contains_key(tgt) {
                successors.entry(src).or_default().push(tgt);
                *indegree.get_mut(tgt).expect("tgt is a known node") += 1;
            }
        }
    }

    let mut ready: BTreeSet<&NodeId> = indegree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut order = Vec::with_capacity(diagram.nodes.len());
    while let Some(id) = ready.pop_first() {
        order.push(by_id[id]);
        for succ in successors.get(id).into_iter().flatten() {
            let degree = indegree.get_mut(succ).expect("succ is a known node");
            *degree -= 1;
            if *degree == 0 {
                ready.insert(succ);
            }
        }
    }
    order
}

/// The value expression at each input port, by following its wire back
/// to the producing binding or boundary component.
fn input_exprs(diagram: &Diagram, env: &HashMap<Endpoint, String>, node: &Node) -> Vec<String> {
    node.inputs
        .iter()
        .map(|port| {
            let target = Endpoint::Port {
                node: node.id.clone(),
                port: port.id.clone(),
            };
            diagram
                .wires
                .iter()
                .find(|w| w.target == target)
                .and_then(|w| env.get(&w.source))
                .cloned()
                // Only reachable on an invalid diagram, which the
                // valid-report gate already rejected.
                .unwrap_or_else(|| "_".to_owned())
        })
        .collect()
}

/// Structural nodes compile to value plumbing, not calls. Only the
/// associators need a statement (a destructuring); everything else is
/// expression rewiring.
fn plumb(
    backend: &dyn Backend,
    primitive: Structural,
    node: &Node,
    args: &[String],
    env: &mut HashMap<Endpoint, String>,
    body: &mut Vec<String>,
    used_names: &mut HashSet<String>,
) {
    let out = |index: usize| Endpoint::Port {
        node: node.id.clone(),
        port: node.outputs[index].id.clone(),
    };
    match primitive {
        Structural::Identity => {
            env.insert(out(0), args[0].clone());
        }
        Structural::Braiding => {
            env.insert(out(0), args[1].clone());
            env.insert(out(1), args[0].clone());
        }
        Structural::UnitorLeft => {
            env.insert(out(0), args[1].clone());
        }
        Structural::UnitorRight => {
            env.insert(out(0), args[0].clone());
        }
        Structural::AssociatorLeft | Structural::AssociatorRight => {
            let base = fresh_name(&node.id, used_names);
            let parts: Vec<String> =
                ["a", "b", "c"].iter().map(|s| format!("{base}_{s}")).collect();
            let (pattern, regrouped) = match primitive {
                // (a, (b, c)) becomes ((a, b), c)
                Structural::AssociatorLeft => (
                    backend.pattern(&[
                        parts[0].clone(),
                        backend.pattern(&[parts[1].clone(), parts[2].clone()]),
                    ]),
                    backend.tuple(&[
                        backend.tuple(&[parts[0].clone(), parts[1].clone()]),
                        parts[2].clone(),
                    ]),
                ),
                // ((a, b), c) becomes (a, (b, c))
                _ => (
                    backend.pattern(&[
                        backend.pattern(&[parts[0].clone(), parts[1].clone()]),
                        parts[2].clone(),
                    ]),
                    backend.tuple(&[
                        parts[0].clone(),
                        backend.tuple(&[parts[1].clone(), parts[2].clone()]),
                    ]),
                ),
            };
            body.push(backend.bind(Some(&pattern), &args[0]));
            env.insert(out(0), regrouped);
        }
    }
}

/// One binding name per output port, derived from the node id.
fn binding_names(node: &Node, used_names: &mut HashSet<String>) -> Vec<String> {
    let base = fresh_name(&node.id, used_names);
    match node.outputs.len() {
        0 => Vec::new(),
        1 => vec![base],
        n => (0..n).map(|i| format!("{base}_{i}")).collect(),
    }
}

fn fresh_name(id: &NodeId, used_names: &mut HashSet<String>) -> String {
    let mut sanitized: String = id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    let mut candidate = format!("v_{sanitized}");
    let mut counter = 2;
    while !used_names.insert(candidate.clone()) {
        candidate = format!("v_{sanitized}_{counter}");
        counter += 1;
    }
    candidate
}
