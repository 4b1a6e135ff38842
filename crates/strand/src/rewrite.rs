//! The rewrite engine.
//!
//! A rewrite replaces a selected sub-diagram by an equivalent fragment.
//! The engine is generic over the rule table in [`rules`]: it extracts
//! the selection's induced fragment, matches a rule's left-hand
//! [`rules::Pattern`] against it (shape isomorphism over the tiny node
//! multiset, then one consistent type substitution across all external
//! slots), and splices the instantiated right-hand pattern back in with
//! fresh ids. Application is non-destructive: the input diagram is
//! never mutated, external wires are reconnected in their original
//! order, and the boundary is untouched, so a valid input yields a
//! valid output with the same signature.

pub mod rules;

use std::collections::HashSet;

use log::debug;
use thiserror::Error;

use strand_core::cancel::{CancelToken, Cancelled};
use strand_core::diagnostic::{Diagnostic, ErrorCode};
use strand_core::diagram::{
    Diagram, Endpoint, Node, NodeId, NodeKind, Port, PortId, Side, Wire, WireId,
};
use strand_core::signature::Registry;
use strand_core::types::Subst;

use crate::check::{self, CheckReport};
use rules::{PatEndpoint, Pattern, Rule, RuleId};

/// The node ids a rewrite operates on, as chosen by the caller.
pub type Selection = Vec<NodeId>;

/// Why a rewrite could not be performed.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The rule's left-hand shape does not match the selection.
    #[error("rule `{rule}` does not match the selection")]
    NoMatch { rule: RuleId },

    /// The shape matches but no single substitution covers every
    /// external slot's type.
    #[error("rule `{rule}` does not apply: {detail}")]
    TypeConflict { rule: RuleId, detail: String },

    /// The input diagram does not check; rewriting is only defined on
    /// valid diagrams.
    #[error("diagram is not valid ({} diagnostic(s))", diagnostics.len())]
    InvalidDiagram { diagnostics: Vec<Diagnostic> },

    #[error(transparent)]
    UnknownRule(#[from] rules::UnknownRule),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl RewriteError {
    /// The diagnostic code this failure corresponds to, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            RewriteError::NoMatch { .. } => Some(ErrorCode::E300),
            RewriteError::TypeConflict { .. } => Some(ErrorCode::E301),
            RewriteError::InvalidDiagram { .. } => Some(ErrorCode::E302),
            RewriteError::UnknownRule(_) | RewriteError::Cancelled(_) => None,
        }
    }
}

/// Rules applicable to the selection, in catalogue order.
///
/// The diagram must be valid; matching consults the checker's resolved
/// types for the external slots.
pub fn list_applicable(
    diagram: &Diagram,
    registry: &Registry,
    selection: &Selection,
    cancel: &CancelToken,
) -> Result<Vec<RuleId>, RewriteError> {
    let report = checked_report(diagram, registry, cancel)?;
    let Some(fragment) = Fragment::extract(diagram, selection) else {
        return Ok(Vec::new());
    };

    let mut applicable = Vec::new();
    for rule in rules::catalogue() {
        cancel.checkpoint()?;
        if match_pattern(rule, &fragment, diagram, &report).is_ok() {
            applicable.push(rule.id);
        }
    }
    Ok(applicable)
}

/// Applies one rule to the selection, producing a new diagram.
pub fn apply(
    diagram: &Diagram,
    registry: &Registry,
    rule_id: RuleId,
    selection: &Selection,
    cancel: &CancelToken,
) -> Result<Diagram, RewriteError> {
    debug!(rule = rule_id.as_str(), selection = selection.len(); "applying rewrite");

    let report = checked_report(diagram, registry, cancel)?;
    let rule = rules::rule(rule_id);
    let fragment = Fragment::extract(diagram, selection)
        .ok_or(RewriteError::NoMatch { rule: rule_id })?;
    match_pattern(rule, &fragment, diagram, &report)?;
    cancel.checkpoint()?;

    let out = splice(diagram, rule, &fragment);

    #[cfg(debug_assertions)]
    {
        let recheck = check::check(&out, registry, cancel)?;
        debug_assert!(
            recheck.valid,
            "rule {} broke the diagram: {:?}",
            rule_id, recheck.diagnostics
        );
    }

    Ok(out)
}

fn checked_report(
    diagram: &Diagram,
    registry: &Registry,
    cancel: &CancelToken,
) -> Result<CheckReport, RewriteError> {
    let report = check::check(diagram, registry, cancel)?;
    if !report.valid {
        return Err(RewriteError::InvalidDiagram {
            diagnostics: report.diagnostics,
        });
    }
    Ok(report)
}

/// The node-induced sub-hypergraph of a selection.
///
/// Internal wires have both endpoints on selected nodes; cut wires
/// crossing the selection border become external slots, ordered by
/// their position in the diagram's wire arena.
struct Fragment<'a> {
    nodes: Vec<&'a Node>,
    internal: Vec<&'a Wire>,
    ext_in: Vec<&'a Wire>,
    ext_out: Vec<&'a Wire>,
}

impl<'a> Fragment<'a> {
    /// `None` when the selection names an unknown node or repeats one.
    fn extract(diagram: &'a Diagram, selection: &Selection) -> Option<Self> {
        let set: HashSet<&NodeId> = selection.iter().collect();
        if set.len() != selection.len() {
            return None;
        }
        let nodes = selection
            .iter()
            .map(|id| diagram.node(id))
            .collect::<Option<Vec<_>>>()?;

        let mut internal = Vec::new();
        let mut ext_in = Vec::new();
        let mut ext_out = Vec::new();
        for wire in &diagram.wires {
            let source_in = wire.source.node().is_some_and(|n| set.contains(n));
            let target_in = wire.target.node().is_some_and(|n| set.contains(n));
            match (source_in, target_in) {
                (true, true) => internal.push(wire),
                (false, true) => ext_in.push(wire),
                (true, false) => ext_out.push(wire),
                (false, false) => {}
            }
        }

        Some(Fragment {
            nodes,
            internal,
            ext_in,
            ext_out,
        })
    }
}

/// Matches a rule's left-hand pattern against a fragment.
///
/// Shape first: a bijection from pattern nodes to fragment nodes of the
/// same structural kind under which every pattern wire corresponds to
/// an actual wire. Then types: every external slot's resolved type must
/// match its schema template under one substitution.
fn match_pattern(
    rule: &Rule,
    fragment: &Fragment<'_>,
    diagram: &Diagram,
    report: &CheckReport,
) -> Result<(), RewriteError> {
    let lhs = &rule.lhs;
    let no_match = || RewriteError::NoMatch { rule: rule.id };

    let internal_pattern_wires = lhs
        .wires
        .iter()
        .filter(|(a, b)| {
            matches!(a, PatEndpoint::Node { .. }) && matches!(b, PatEndpoint::Node { .. })
        })
        .count();
    if fragment.nodes.len() != lhs.nodes.len()
        || fragment.ext_in.len() != lhs.ext_inputs.len()
        || fragment.ext_out.len() != lhs.ext_outputs.len()
        || fragment.internal.len() != internal_pattern_wires
    {
        return Err(no_match());
    }

    let mut assignment = vec![usize::MAX; lhs.nodes.len()];
    let mut used = vec![false; fragment.nodes.len()];
    if !assign_nodes(lhs, fragment, 0, &mut assignment, &mut used) {
        return Err(no_match());
    }

    // One substitution across every external slot.
    let mut subst = Subst::new();
    let slots = fragment
        .ext_in
        .iter()
        .zip(&lhs.ext_inputs)
        .map(|(w, template)| (&w.target, template))
        .chain(
            fragment
                .ext_out
                .iter()
                .zip(&lhs.ext_outputs)
                .map(|(w, template)| (&w.source, template)),
        );
    for (inside, template) in slots {
        let Some(ty) = report.endpoint_ty(diagram, inside) else {
            return Err(RewriteError::TypeConflict {
                rule: rule.id,
                detail: format!("no resolved type at {inside}"),
            });
        };
        if !template.matches(ty, &mut subst) {
            return Err(RewriteError::TypeConflict {
                rule: rule.id,
                detail: format!("`{ty}` at {inside} does not fit the pattern slot `{template}`"),
            });
        }
    }

    Ok(())
}

/// Backtracking assignment of pattern nodes to fragment nodes.
fn assign_nodes(
    lhs: &Pattern,
    fragment: &Fragment<'_>,
    next: usize,
    assignment: &mut Vec<usize>,
    used: &mut Vec<bool>,
) -> bool {
    if next == lhs.nodes.len() {
        return wires_correspond(lhs, fragment, assignment);
    }
    for (candidate, node) in fragment.nodes.iter().enumerate() {
        if used[candidate] || node.kind != NodeKind::Structural(lhs.nodes[next]) {
            continue;
        }
        assignment[next] = candidate;
        used[candidate] = true;
        if assign_nodes(lhs, fragment, next + 1, assignment, used) {
            return true;
        }
        used[candidate] = false;
    }
    false
}

/// Verifies every pattern wire under the assignment. Counts already
/// agree, so satisfying all pattern wires pins a bijection on wires.
fn wires_correspond(lhs: &Pattern, fragment: &Fragment<'_>, assignment: &[usize]) -> bool {
    let port_endpoint = |node: usize, side: Side, port: usize| -> Option<Endpoint> {
        let node = fragment.nodes[assignment[node]];
        let ports = match side {
            Side::Input => &node.inputs,
            Side::Output => &node.outputs,
        };
        Some(Endpoint::Port {
            node: node.id.clone(),
            port: ports.get(port)?.id.clone(),
        })
    };

    lhs.wires.iter().all(|(a, b)| match (a, b) {
        (PatEndpoint::ExtIn(i), PatEndpoint::Node { node, side, port }) => {
            match port_endpoint(*node, *side, *port) {
                Some(endpoint) => fragment.ext_in[*i].target == endpoint,
                None => false,
            }
        }
        (PatEndpoint::Node { node, side, port }, PatEndpoint::ExtOut(i)) => {
            match port_endpoint(*node, *side, *port) {
                Some(endpoint) => fragment.ext_out[*i].source == endpoint,
                None => false,
            }
        }
        (
            PatEndpoint::Node {
                node: a_node,
                side: a_side,
                port: a_port,
            },
            PatEndpoint::Node {
                node: b_node,
                side: b_side,
                port: b_port,
            },
        ) => {
            let (Some(source), Some(target)) = (
                port_endpoint(*a_node, *a_side, *a_port),
                port_endpoint(*b_node, *b_side, *b_port),
            ) else {
                return false;
            };
            fragment
                .internal
                .iter()
                .any(|w| w.source == source && w.target == target)
        }
        // Left-hand patterns never route a slot straight to a slot.
        _ => false,
    })
}

/// Removes the matched fragment and instantiates the rule's right-hand
/// pattern with fresh ids, reconnecting external wires in order.
fn splice(diagram: &Diagram, rule: &Rule, fragment: &Fragment<'_>) -> Diagram {
    let removed_nodes: HashSet<&NodeId> = fragment.nodes.iter().map(|n| &n.id).collect();
    let outer_sources: Vec<Endpoint> = fragment.ext_in.iter().map(|w| w.source.clone()).collect();
    let outer_targets: Vec<Endpoint> = fragment.ext_out.iter().map(|w| w.target.clone()).collect();

    let mut out = diagram.clone();
    out.nodes.retain(|n| !removed_nodes.contains(&n.id));
    out.wires.retain(|w| {
        !w.source.node().is_some_and(|n| removed_nodes.contains(n))
            && !w.target.node().is_some_and(|n| removed_nodes.contains(n))
    });

    let mut ids = IdGen::new(diagram);
    let new_nodes: Vec<Node> = rule
        .rhs
        .nodes
        .iter()
        .map(|&primitive| {
            let schema = primitive.schema();
            let inputs = (0..schema.inputs.len())
                .map(|i| Port::untyped(PortId::new(format!("in{i}"))))
                .collect();
            let outputs = (0..schema.outputs.len())
                .map(|i| Port::untyped(PortId::new(format!("out{i}"))))
                .collect();
            Node::structural(ids.fresh_node(), primitive, inputs, outputs)
        })
        .collect();

    let resolve = |endpoint: &PatEndpoint, as_source: bool| -> Endpoint {
        match endpoint {
            PatEndpoint::ExtIn(i) => {
                debug_assert!(as_source);
                outer_sources[*i].clone()
            }
            PatEndpoint::ExtOut(i) => {
                debug_assert!(!as_source);
                outer_targets[*i].clone()
            }
            PatEndpoint::Node { node, side, port } => {
                let node = &new_nodes[*node];
                let ports = match side {
                    Side::Input => &node.inputs,
                    Side::Output => &node.outputs,
                };
                Endpoint::Port {
                    node: node.id.clone(),
                    port: ports[*port].id.clone(),
                }
            }
        }
    };

    for (a, b) in &rule.rhs.wires {
        let source = resolve(a, true);
        let target = resolve(b, false);
        out.wires.push(Wire::new(ids.fresh_wire(), source, target));
    }
    out.nodes.extend(new_nodes);
    out
}

/// Fresh-id generator seeded with every id already in the diagram.
struct IdGen {
    taken: HashSet<String>,
    next: usize,
}

impl IdGen {
    fn new(diagram: &Diagram) -> Self {
        let mut taken = HashSet::new();
        for node in &diagram.nodes {
            taken.insert(node.id.as_str().to_owned());
        }
        for wire in &diagram.wires {
            taken.insert(wire.id.as_str().to_owned());
        }
        IdGen { taken, next: 0 }
    }

    fn fresh(&mut self, prefix: &str) -> String {
        loop {
            let candidate = format!("{prefix}{}", self.next);
            self.next += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    fn fresh_wire(&mut self) -> WireId {
        WireId::new(self.fresh("w"))
    }

    fn fresh_node(&mut self) -> NodeId {
        NodeId::new(self.fresh("n"))
    }
}
