//! The diagram checker.
//!
//! Validates linearity, connectivity, and type agreement over a diagram
//! snapshot and infers the concrete type of every port, including the
//! schema-polymorphic ports of structural nodes. All independent
//! problems found in one pass are reported together; checking never
//! stops at the first diagnostic. The input is never mutated; resolved
//! types land in a side table inside the returned [`CheckReport`].

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use strand_core::cancel::{CancelToken, Cancelled};
use strand_core::diagnostic::{Diagnostic, DiagnosticCollector, ErrorCode, Subject};
use strand_core::diagram::{Diagram, Endpoint, Node, NodeId, NodeKind, Port, PortId, Side};
use strand_core::signature::{Registry, Signature};
use strand_core::types::{Subst, Ty};

/// Concrete types for node ports, keyed by `(node, port)`.
///
/// Covers declared box ports, registry-backed box ports, and
/// successfully resolved structural ports. Boundary slots are not in
/// the table; their types are the declared boundary lists.
pub type ResolvedTypes = BTreeMap<(NodeId, PortId), Ty>;

/// The result of checking one diagram snapshot.
#[derive(Debug)]
pub struct CheckReport {
    /// `true` when no error-severity diagnostic was collected.
    pub valid: bool,

    /// Every diagnostic found, in deterministic document order.
    pub diagnostics: Vec<Diagnostic>,

    /// The diagram's signature (its declared boundary) when valid.
    pub signature: Option<Signature>,

    /// Resolved port types, consumed by the rewrite engine and the
    /// code generator.
    pub resolved: ResolvedTypes,
}

impl CheckReport {
    /// The resolved type at an endpoint: boundary slots read the
    /// declared boundary, node ports read the resolved table.
    pub fn endpoint_ty<'a>(&'a self, diagram: &'a Diagram, endpoint: &Endpoint) -> Option<&'a Ty> {
        match endpoint {
            Endpoint::Boundary { side, index } => diagram.boundary.slot_ty(*side, *index),
            Endpoint::Port { node, port } => self.resolved.get(&(node.clone(), port.clone())),
        }
    }
}

/// Where each endpoint is attached, built from every wire up front.
struct ConnectionIndex {
    attached: HashMap<Endpoint, Vec<usize>>,
}

impl ConnectionIndex {
    fn build(diagram: &Diagram) -> Self {
        let mut attached: HashMap<Endpoint, Vec<usize>> = HashMap::new();
        for (idx, wire) in diagram.wires.iter().enumerate() {
            attached.entry(wire.source.clone()).or_default().push(idx);
            attached.entry(wire.target.clone()).or_default().push(idx);
        }
        ConnectionIndex { attached }
    }

    fn count(&self, endpoint: &Endpoint) -> usize {
        self.attached.get(endpoint).map_or(0, Vec::len)
    }

    /// The unique wire at an endpoint, or `None` when linearity is
    /// violated there (callers skip inference through such endpoints).
    fn unique_wire<'a>(&self, diagram: &'a Diagram, endpoint: &Endpoint) -> Option<&'a strand_core::diagram::Wire> {
        match self.attached.get(endpoint) {
            Some(wires) if wires.len() == 1 => Some(&diagram.wires[wires[0]]),
            _ => None,
        }
    }
}

/// Checks a diagram snapshot against its invariants and infers its
/// signature.
///
/// Runs the full pipeline: id uniqueness, endpoint validity, linearity,
/// acyclicity, box signature agreement, structural schema resolution,
/// wire type agreement, and declared-boundary agreement. Diagnostics
/// accumulate across all phases.
pub fn check(
    diagram: &Diagram,
    registry: &Registry,
    cancel: &CancelToken,
) -> Result<CheckReport, Cancelled> {
    debug!(nodes = diagram.nodes.len(), wires = diagram.wires.len(); "checking diagram");

    let mut collector = DiagnosticCollector::new();

    check_unique_ids(diagram, &mut collector);
    cancel.checkpoint()?;

    let index = ConnectionIndex::build(diagram);
    let compromised = check_connectivity(diagram, &index, &mut collector);
    cancel.checkpoint()?;

    let poisoned = check_acyclicity(diagram, &mut collector);
    cancel.checkpoint()?;

    let mut resolved = ResolvedTypes::new();
    check_box_signatures(diagram, registry, &mut resolved, &mut collector);
    cancel.checkpoint()?;

    resolve_structural_schemas(diagram, &index, &poisoned, &mut resolved, &mut collector, cancel)?;

    check_wire_agreement(diagram, &compromised, &resolved, &mut collector);
    cancel.checkpoint()?;

    check_boundary_signature(diagram, &index, &resolved, &mut collector);

    let valid = !collector.has_errors();
    let signature = valid.then(|| {
        Signature::new(
            diagram.boundary.inputs.clone(),
            diagram.boundary.outputs.clone(),
        )
    });

    trace!(valid, diagnostics = collector.len(); "check finished");

    Ok(CheckReport {
        valid,
        diagnostics: collector.into_vec(),
        signature,
        resolved,
    })
}

/// Invariant 4: node, wire, and per-node port ids are unique.
fn check_unique_ids(diagram: &Diagram, collector: &mut DiagnosticCollector) {
    let mut node_ids = HashSet::new();
    for node in &diagram.nodes {
        if !node_ids.insert(&node.id) {
            collector.push(
                Diagnostic::error(format!("node id {} is used more than once", node.id))
                    .with_code(ErrorCode::E104)
                    .with_subject(Subject::Node(node.id.clone())),
            );
        }
        let mut port_ids = HashSet::new();
        for port in node.inputs.iter().chain(&node.outputs) {
            if !port_ids.insert(&port.id) {
                collector.push(
                    Diagnostic::error(format!(
                        "port id {} is used more than once on node {}",
                        port.id, node.id
                    ))
                    .with_code(ErrorCode::E104)
                    .with_subject(Subject::Port(node.id.clone(), port.id.clone())),
                );
            }
        }
    }

    let mut wire_ids = HashSet::new();
    for wire in &diagram.wires {
        if !wire_ids.insert(&wire.id) {
            collector.push(
                Diagnostic::error(format!("wire id {} is used more than once", wire.id))
                    .with_code(ErrorCode::E104)
                    .with_subject(Subject::Wire(wire.id.clone())),
            );
        }
    }
}

/// Invariant 2 plus endpoint sanity: every endpoint exists, every wire
/// runs source-to-target in the legal direction, and every port and
/// boundary slot is attached to exactly one wire.
///
/// Returns the set of endpoints with connectivity problems; later type
/// comparison skips wires touching them so one structural mistake does
/// not cascade into spurious type mismatches.
fn check_connectivity(
    diagram: &Diagram,
    index: &ConnectionIndex,
    collector: &mut DiagnosticCollector,
) -> HashSet<Endpoint> {
    let mut compromised = HashSet::new();

    for wire in &diagram.wires {
        for (endpoint, role) in [(&wire.source, Side::Output), (&wire.target, Side::Input)] {
            let side = diagram.endpoint_side(endpoint);
            let in_range = match endpoint {
                Endpoint::Boundary { side, index } => {
                    diagram.boundary.slot_ty(*side, *index).is_some()
                }
                Endpoint::Port { .. } => side.is_some(),
            };
            if !in_range {
                collector.push(
                    Diagnostic::error(format!(
                        "wire {} refers to nonexistent {endpoint}",
                        wire.id
                    ))
                    .with_code(ErrorCode::E103)
                    .with_subject(Subject::Wire(wire.id.clone())),
                );
                compromised.insert(endpoint.clone());
                continue;
            }

            // A legal source is a node output or a boundary input; a
            // legal target is a node input or a boundary output.
            let legal = match (endpoint, role) {
                (Endpoint::Boundary { side, .. }, Side::Output) => *side == Side::Input,
                (Endpoint::Boundary { side, .. }, Side::Input) => *side == Side::Output,
                (Endpoint::Port { .. }, Side::Output) => side == Some(Side::Output),
                (Endpoint::Port { .. }, Side::Input) => side == Some(Side::Input),
            };
            if !legal {
                let end = match role {
                    Side::Output => "source",
                    Side::Input => "target",
                };
                collector.push(
                    Diagnostic::error(format!(
                        "wire {} uses {endpoint} as its {end}",
                        wire.id
                    ))
                    .with_code(ErrorCode::E105)
                    .with_subject(Subject::Wire(wire.id.clone()))
                    .with_help(
                        "a source must be a node output or boundary input; \
                         a target must be a node input or boundary output",
                    ),
                );
                compromised.insert(endpoint.clone());
            }
        }
    }

    // Linearity over every real endpoint, in document order.
    let mut report_count = |endpoint: Endpoint, subject: Subject, what: String, collector: &mut DiagnosticCollector| {
        match index.count(&endpoint) {
            1 => {}
            0 => {
                collector.push(
                    Diagnostic::error(format!("{what} is not connected to any wire"))
                        .with_code(ErrorCode::E100)
                        .with_subject(subject),
                );
                compromised.insert(endpoint);
            }
            n => {
                collector.push(
                    Diagnostic::error(format!("{what} is connected to {n} wires"))
                        .with_code(ErrorCode::E101)
                        .with_subject(subject)
                        .with_help("every port must be used by exactly one wire"),
                );
                compromised.insert(endpoint);
            }
        }
    };

    for node in &diagram.nodes {
        for port in node.inputs.iter().chain(&node.outputs) {
            report_count(
                Endpoint::Port {
                    node: node.id.clone(),
                    port: port.id.clone(),
                },
                Subject::Port(node.id.clone(), port.id.clone()),
                format!("port {} of node {}", port.id, node.id),
                collector,
            );
        }
    }
    for (side, len) in [
        (Side::Input, diagram.boundary.inputs.len()),
        (Side::Output, diagram.boundary.outputs.len()),
    ] {
        for slot in 0..len {
            report_count(
                Endpoint::boundary(side, slot),
                Subject::Boundary(side, slot),
                format!("boundary {side} slot {slot}"),
                collector,
            );
        }
    }

    compromised
}

/// Invariant 1: the wire graph is acyclic.
///
/// Returns the nodes of every cyclic component; structural schema
/// resolution is aborted for them (the cycle diagnostic already covers
/// the component).
fn check_acyclicity(diagram: &Diagram, collector: &mut DiagnosticCollector) -> HashSet<NodeId> {
    let mut graph: DiGraph<&NodeId, ()> = DiGraph::new();
    let mut indices: HashMap<&NodeId, NodeIndex> = HashMap::new();
    for node in &diagram.nodes {
        indices.entry(&node.id).or_insert_with(|| graph.add_node(&node.id));
    }

    for wire in &diagram.wires {
        if let (Some(src), Some(tgt)) = (wire.source.node(), wire.target.node()) {
            if let (Some(&a), Some(&b)) = (indices.get(src), indices.get(tgt)) {
                graph.add_edge(a, b, ());
            }
        }
    }

    let mut poisoned = HashSet::new();
    let mut cycles: Vec<Vec<&NodeId>> = Vec::new();
    for component in tarjan_scc(&graph) {
        let cyclic = component.len() > 1
            || graph.find_edge(component[0], component[0]).is_some();
        if cyclic {
            let mut members: Vec<&NodeId> = component.iter().map(|&ix| graph[ix]).collect();
            members.sort();
            cycles.push(members);
        }
    }
    cycles.sort_by(|a, b| a[0].cmp(b[0]));

    for members in cycles {
        for id in &members {
            poisoned.insert((*id).clone());
        }
        let listing = members
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        collector.push(
            Diagnostic::error(format!("wires through nodes {listing} form a cycle"))
                .with_code(ErrorCode::E102)
                .with_subject(Subject::Node(members[0].clone()))
                .with_help("traced (feedback) diagrams are not supported"),
        );
    }

    poisoned
}

/// Per-box agreement between declared port types and the registered
/// signature; seeds the resolved-type table for box ports and for any
/// structural ports that carry an explicit declaration.
fn check_box_signatures(
    diagram: &Diagram,
    registry: &Registry,
    resolved: &mut ResolvedTypes,
    collector: &mut DiagnosticCollector,
) {
    for node in &diagram.nodes {
        // Explicitly declared port types are trusted as written.
        for port in node.inputs.iter().chain(&node.outputs) {
            if let Some(ty) = &port.ty {
                resolved.insert((node.id.clone(), port.id.clone()), ty.clone());
            }
        }

        let NodeKind::Box { label } = &node.kind else {
            continue;
        };

        let Some(signature) = registry.get(label) else {
            let fully_declared = node
                .inputs
                .iter()
                .chain(&node.outputs)
                .all(|p| p.ty.is_some());
            if !fully_declared {
                collector.push(
                    Diagnostic::error(format!(
                        "box {} has label `{label}` which is not registered, \
                         and not all of its ports declare a type",
                        node.id
                    ))
                    .with_code(ErrorCode::E204)
                    .with_subject(Subject::Node(node.id.clone())),
                );
            }
            continue;
        };

        check_ports_against(node, Side::Input, &node.inputs, &signature.inputs, resolved, collector);
        check_ports_against(node, Side::Output, &node.outputs, &signature.outputs, resolved, collector);
    }
}

fn check_ports_against(
    node: &Node,
    side: Side,
    ports: &[Port],
    expected: &[Ty],
    resolved: &mut ResolvedTypes,
    collector: &mut DiagnosticCollector,
) {
    if ports.len() != expected.len() {
        collector.push(
            Diagnostic::error(format!(
                "box {} has {} {side} port(s) but `{}` is registered with {}",
                node.id,
                ports.len(),
                node.display_label(),
                expected.len()
            ))
            .with_code(ErrorCode::E200)
            .with_subject(Subject::Node(node.id.clone())),
        );
    }
    for (port, expected_ty) in ports.iter().zip(expected) {
        match &port.ty {
            Some(declared) if declared != expected_ty => {
                collector.push(
                    Diagnostic::error(format!(
                        "port {} of box {} is declared `{declared}` but `{}` \
                         is registered with `{expected_ty}` at that position",
                        port.id,
                        node.id,
                        node.display_label()
                    ))
                    .with_code(ErrorCode::E200)
                    .with_subject(Subject::Port(node.id.clone(), port.id.clone())),
                );
                // The registered signature is authoritative for
                // propagation once the mismatch is reported.
                resolved.insert((node.id.clone(), port.id.clone()), expected_ty.clone());
            }
            Some(_) => {}
            None => {
                resolved.insert((node.id.clone(), port.id.clone()), expected_ty.clone());
            }
        }
    }
}

/// Bottom-up schema resolution for structural nodes.
///
/// Each node's schema variables are matched against whichever incident
/// ports already have a concrete type; resolution iterates to a
/// fixpoint so a chain of structural nodes can propagate types through
/// itself from either end. Nodes that never resolve are reported as
/// underconstrained rather than guessed at.
fn resolve_structural_schemas(
    diagram: &Diagram,
    index: &ConnectionIndex,
    poisoned: &HashSet<NodeId>,
    resolved: &mut ResolvedTypes,
    collector: &mut DiagnosticCollector,
    cancel: &CancelToken,
) -> Result<(), Cancelled> {
    let mut pending: Vec<&Node> = diagram
        .nodes
        .iter()
        .filter(|n| matches!(n.kind, NodeKind::Structural(_)) && !poisoned.contains(&n.id))
        .collect();

    loop {
        cancel.checkpoint()?;
        let mut still_pending = Vec::new();
        let mut progress = false;

        for node in pending {
            if try_resolve_structural(diagram, index, node, resolved) {
                progress = true;
            } else {
                still_pending.push(node);
            }
        }

        pending = still_pending;
        if pending.is_empty() || !progress {
            break;
        }
    }

    for node in pending {
        let NodeKind::Structural(primitive) = &node.kind else {
            unreachable!("pending list only holds structural nodes");
        };
        collector.push(
            Diagnostic::error(format!(
                "cannot infer the type of {} node {} from its surroundings",
                primitive, node.id
            ))
            .with_code(ErrorCode::E202)
            .with_subject(Subject::Node(node.id.clone()))
            .with_help("connect it to a typed box or boundary, or declare its port types"),
        );
    }

    Ok(())
}

/// One resolution attempt for one structural node. Returns `true` when
/// every port type became concrete and was recorded.
fn try_resolve_structural(
    diagram: &Diagram,
    index: &ConnectionIndex,
    node: &Node,
    resolved: &mut ResolvedTypes,
) -> bool {
    let NodeKind::Structural(primitive) = &node.kind else {
        return false;
    };
    let schema = primitive.schema();
    let mut subst = Subst::new();

    let sides = [
        (Side::Input, &node.inputs, &schema.inputs),
        (Side::Output, &node.outputs, &schema.outputs),
    ];
    for (side, ports, templates) in &sides {
        for (port, template) in ports.iter().zip(templates.iter()) {
            if let Some(known) = known_port_ty(diagram, index, resolved, node, *side, port) {
                // A failed match here means a genuine type conflict;
                // wire agreement reports it once the node resolves from
                // its other ports, so the binding is simply skipped.
                template.matches(&known, &mut subst);
            }
        }
    }

    let mut assignments = Vec::new();
    for (_, ports, templates) in &sides {
        for (port, template) in ports.iter().zip(templates.iter()) {
            match template.apply(&subst) {
                Some(ty) => assignments.push(((node.id.clone(), port.id.clone()), ty)),
                None => return false,
            }
        }
    }
    for (key, ty) in assignments {
        resolved.entry(key).or_insert(ty);
    }
    true
}

/// The concrete type visible at one port: its own declaration or
/// resolution if present, otherwise the type at the far end of its
/// unique wire.
fn known_port_ty(
    diagram: &Diagram,
    index: &ConnectionIndex,
    resolved: &ResolvedTypes,
    node: &Node,
    side: Side,
    port: &Port,
) -> Option<Ty> {
    if let Some(ty) = resolved.get(&(node.id.clone(), port.id.clone())) {
        return Some(ty.clone());
    }

    let endpoint = Endpoint::Port {
        node: node.id.clone(),
        port: port.id.clone(),
    };
    let wire = index.unique_wire(diagram, &endpoint)?;
    let far = match side {
        Side::Input => &wire.source,
        Side::Output => &wire.target,
    };
    match far {
        Endpoint::Boundary { side, index } => diagram.boundary.slot_ty(*side, *index).cloned(),
        Endpoint::Port { node, port } => resolved.get(&(node.clone(), port.clone())).cloned(),
    }
}

/// Invariant 3: each wire's two endpoint types agree.
fn check_wire_agreement(
    diagram: &Diagram,
    compromised: &HashSet<Endpoint>,
    resolved: &ResolvedTypes,
    collector: &mut DiagnosticCollector,
) {
    for wire in &diagram.wires {
        if compromised.contains(&wire.source) || compromised.contains(&wire.target) {
            continue;
        }
        let ty_of = |endpoint: &Endpoint| match endpoint {
            Endpoint::Boundary { side, index } => diagram.boundary.slot_ty(*side, *index),
            Endpoint::Port { node, port } => resolved.get(&(node.clone(), port.clone())),
        };
        let (Some(src), Some(tgt)) = (ty_of(&wire.source), ty_of(&wire.target)) else {
            continue;
        };
        if src != tgt {
            collector.push(
                Diagnostic::error(format!(
                    "wire {} joins `{src}` to `{tgt}`",
                    wire.id
                ))
                .with_code(ErrorCode::E201)
                .with_subject(Subject::Wire(wire.id.clone()))
                .with_help("the two endpoint types must be structurally equal"),
            );
        }
    }
}

/// The inferred signature must equal the declared boundary.
fn check_boundary_signature(
    diagram: &Diagram,
    index: &ConnectionIndex,
    resolved: &ResolvedTypes,
    collector: &mut DiagnosticCollector,
) {
    for (side, declared) in [
        (Side::Input, &diagram.boundary.inputs),
        (Side::Output, &diagram.boundary.outputs),
    ] {
        for (slot, declared_ty) in declared.iter().enumerate() {
            let endpoint = Endpoint::boundary(side, slot);
            let Some(wire) = index.unique_wire(diagram, &endpoint) else {
                continue; // linearity diagnostics already cover this slot
            };
            let far = if side == Side::Input {
                &wire.target
            } else {
                &wire.source
            };
            let inferred = match far {
                Endpoint::Boundary { side, index } => diagram.boundary.slot_ty(*side, *index),
                Endpoint::Port { node, port } => resolved.get(&(node.clone(), port.clone())),
            };
            let Some(inferred) = inferred else {
                continue;
            };
            if inferred != declared_ty {
                collector.push(
                    Diagnostic::error(format!(
                        "boundary {side} slot {slot} is declared `{declared_ty}` \
                         but the diagram provides `{inferred}`"
                    ))
                    .with_code(ErrorCode::E203)
                    .with_subject(Subject::Boundary(side, slot)),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::diagram::{Boundary, Structural, Wire};
    use strand_core::signature::Signature;

    fn registry() -> Registry {
        Registry::builder()
            .declare(
                "f",
                Signature::new(
                    vec![Ty::base("A"), Ty::base("B")],
                    vec![Ty::base("C")],
                ),
            )
            .declare(
                "g",
                Signature::new(
                    vec![Ty::base("C")],
                    vec![Ty::base("D"), Ty::base("E")],
                ),
            )
            .build()
    }

    /// `f : A, B -> C` composed with `g : C -> D, E`.
    fn pipeline() -> Diagram {
        let mut d = Diagram::new(Boundary::new(
            vec![Ty::base("A"), Ty::base("B")],
            vec![Ty::base("D"), Ty::base("E")],
        ));
        d.nodes.push(Node::boxed(
            "f",
            "f",
            vec![Port::untyped("a"), Port::untyped("b")],
            vec![Port::untyped("c")],
        ));
        d.nodes.push(Node::boxed(
            "g",
            "g",
            vec![Port::untyped("in")],
            vec![Port::untyped("d"), Port::untyped("e")],
        ));
        d.wires.push(Wire::new(
            "w0",
            Endpoint::boundary(Side::Input, 0),
            Endpoint::port("f", "a"),
        ));
        d.wires.push(Wire::new(
            "w1",
            Endpoint::boundary(Side::Input, 1),
            Endpoint::port("f", "b"),
        ));
        d.wires.push(Wire::new(
            "w2",
            Endpoint::port("f", "c"),
            Endpoint::port("g", "in"),
        ));
        d.wires.push(Wire::new(
            "w3",
            Endpoint::port("g", "d"),
            Endpoint::boundary(Side::Output, 0),
        ));
        d.wires.push(Wire::new(
            "w4",
            Endpoint::port("g", "e"),
            Endpoint::boundary(Side::Output, 1),
        ));
        d
    }

    fn codes(report: &CheckReport) -> Vec<ErrorCode> {
        report.diagnostics.iter().filter_map(Diagnostic::code).collect()
    }

    #[test]
    fn test_valid_pipeline_checks_clean() {
        let report = check(&pipeline(), &registry(), &CancelToken::new()).unwrap();
        assert!(report.valid, "diagnostics: {:?}", report.diagnostics);
        assert!(report.diagnostics.is_empty());
        assert_eq!(
            report.signature.unwrap().inputs,
            vec![Ty::base("A"), Ty::base("B")]
        );
        assert_eq!(
            report.resolved.get(&("f".into(), "c".into())),
            Some(&Ty::base("C"))
        );
    }

    #[test]
    fn test_rerouted_wire_reports_dangling_pair_without_mismatch() {
        let mut d = pipeline();
        // Route f's output straight to the boundary instead of g.
        d.wires[2].target = Endpoint::boundary(Side::Output, 0);

        let report = check(&d, &registry(), &CancelToken::new()).unwrap();
        assert!(!report.valid);
        let codes = codes(&report);
        assert_eq!(codes.len(), 2, "diagnostics: {:?}", report.diagnostics);
        assert!(codes.contains(&ErrorCode::E100));
        assert!(codes.contains(&ErrorCode::E101));
    }

    #[test]
    fn test_duplicate_node_id_is_reported() {
        let mut d = pipeline();
        let mut dup = d.nodes[0].clone();
        dup.inputs = vec![];
        dup.outputs = vec![];
        d.nodes.push(dup);

        let report = check(&d, &registry(), &CancelToken::new()).unwrap();
        assert!(codes(&report).contains(&ErrorCode::E104));
    }

    #[test]
    fn test_backwards_wire_is_a_direction_error() {
        let mut d = pipeline();
        let w2 = &mut d.wires[2];
        std::mem::swap(&mut w2.source, &mut w2.target);

        let report = check(&d, &registry(), &CancelToken::new()).unwrap();
        assert!(codes(&report).contains(&ErrorCode::E105));
    }

    #[test]
    fn test_unknown_endpoint_is_reported() {
        let mut d = pipeline();
        d.wires[2].target = Endpoint::port("nope", "in");

        let report = check(&d, &registry(), &CancelToken::new()).unwrap();
        assert!(codes(&report).contains(&ErrorCode::E103));
    }

    #[test]
    fn test_cycle_is_reported_once_per_component() {
        let reg = Registry::builder()
            .declare(
                "u",
                Signature::new(vec![Ty::base("A")], vec![Ty::base("A")]),
            )
            .declare(
                "v",
                Signature::new(vec![Ty::base("A")], vec![Ty::base("A")]),
            )
            .build();
        let mut d = Diagram::new(Boundary::default());
        d.nodes.push(Node::boxed(
            "u",
            "u",
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.nodes.push(Node::boxed(
            "v",
            "v",
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.wires.push(Wire::new(
            "w0",
            Endpoint::port("u", "out"),
            Endpoint::port("v", "in"),
        ));
        d.wires.push(Wire::new(
            "w1",
            Endpoint::port("v", "out"),
            Endpoint::port("u", "in"),
        ));

        let report = check(&d, &reg, &CancelToken::new()).unwrap();
        assert_eq!(codes(&report), vec![ErrorCode::E102]);
        assert!(report.diagnostics[0].message().contains("u, v"));
    }

    #[test]
    fn test_cycle_poisons_schema_resolution() {
        let mut d = Diagram::new(Boundary::default());
        d.nodes.push(Node::structural(
            "a",
            Structural::Identity,
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.nodes.push(Node::structural(
            "b",
            Structural::Identity,
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.wires.push(Wire::new(
            "w0",
            Endpoint::port("a", "out"),
            Endpoint::port("b", "in"),
        ));
        d.wires.push(Wire::new(
            "w1",
            Endpoint::port("b", "out"),
            Endpoint::port("a", "in"),
        ));

        let report = check(&d, &Registry::default(), &CancelToken::new()).unwrap();
        // Only the cycle, never a cascaded underconstrained report.
        assert_eq!(codes(&report), vec![ErrorCode::E102]);
    }

    #[test]
    fn test_braiding_resolves_from_boundary() {
        let mut d = Diagram::new(Boundary::new(
            vec![Ty::base("A"), Ty::base("B")],
            vec![Ty::base("B"), Ty::base("A")],
        ));
        d.nodes.push(Node::structural(
            "sw",
            Structural::Braiding,
            vec![Port::untyped("l"), Port::untyped("r")],
            vec![Port::untyped("l2"), Port::untyped("r2")],
        ));
        d.wires.push(Wire::new(
            "w0",
            Endpoint::boundary(Side::Input, 0),
            Endpoint::port("sw", "l"),
        ));
        d.wires.push(Wire::new(
            "w1",
            Endpoint::boundary(Side::Input, 1),
            Endpoint::port("sw", "r"),
        ));
        d.wires.push(Wire::new(
            "w2",
            Endpoint::port("sw", "l2"),
            Endpoint::boundary(Side::Output, 0),
        ));
        d.wires.push(Wire::new(
            "w3",
            Endpoint::port("sw", "r2"),
            Endpoint::boundary(Side::Output, 1),
        ));

        let report = check(&d, &Registry::default(), &CancelToken::new()).unwrap();
        assert!(report.valid, "diagnostics: {:?}", report.diagnostics);
        assert_eq!(
            report.resolved.get(&("sw".into(), "l2".into())),
            Some(&Ty::base("B"))
        );
        assert_eq!(
            report.resolved.get(&("sw".into(), "r2".into())),
            Some(&Ty::base("A"))
        );
    }

    #[test]
    fn test_identity_chain_resolves_by_fixpoint() {
        // Document order deliberately lists the far node first, so a
        // single left-to-right pass cannot finish.
        let mut d = Diagram::new(Boundary::new(vec![Ty::base("A")], vec![Ty::base("A")]));
        d.nodes.push(Node::structural(
            "id2",
            Structural::Identity,
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.nodes.push(Node::structural(
            "id1",
            Structural::Identity,
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.wires.push(Wire::new(
            "w0",
            Endpoint::boundary(Side::Input, 0),
            Endpoint::port("id1", "in"),
        ));
        d.wires.push(Wire::new(
            "w1",
            Endpoint::port("id1", "out"),
            Endpoint::port("id2", "in"),
        ));
        d.wires.push(Wire::new(
            "w2",
            Endpoint::port("id2", "out"),
            Endpoint::boundary(Side::Output, 0),
        ));

        let report = check(&d, &Registry::default(), &CancelToken::new()).unwrap();
        assert!(report.valid, "diagnostics: {:?}", report.diagnostics);
        assert_eq!(
            report.resolved.get(&("id2".into(), "out".into())),
            Some(&Ty::base("A"))
        );
    }

    #[test]
    fn test_unresolvable_structural_node_is_underconstrained() {
        // Unregistered untyped boxes on both sides leave the identity
        // with nothing to infer from.
        let mut d = Diagram::new(Boundary::default());
        d.nodes.push(Node::boxed("k", "k", vec![], vec![Port::untyped("out")]));
        d.nodes.push(Node::structural(
            "mid",
            Structural::Identity,
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.nodes.push(Node::boxed("m", "m", vec![Port::untyped("in")], vec![]));
        d.wires.push(Wire::new(
            "w0",
            Endpoint::port("k", "out"),
            Endpoint::port("mid", "in"),
        ));
        d.wires.push(Wire::new(
            "w1",
            Endpoint::port("mid", "out"),
            Endpoint::port("m", "in"),
        ));

        let report = check(&d, &Registry::default(), &CancelToken::new()).unwrap();
        let codes = codes(&report);
        assert_eq!(
            codes.iter().filter(|c| **c == ErrorCode::E202).count(),
            1,
            "diagnostics: {:?}",
            report.diagnostics
        );
        assert_eq!(codes.iter().filter(|c| **c == ErrorCode::E204).count(), 2);
    }

    #[test]
    fn test_wire_type_mismatch_is_reported() {
        let reg = Registry::builder()
            .declare(
                "p",
                Signature::new(vec![Ty::base("A")], vec![Ty::base("C")]),
            )
            .declare(
                "q",
                Signature::new(vec![Ty::base("D")], vec![Ty::base("E")]),
            )
            .build();
        let mut d = Diagram::new(Boundary::new(vec![Ty::base("A")], vec![Ty::base("E")]));
        d.nodes.push(Node::boxed(
            "p",
            "p",
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.nodes.push(Node::boxed(
            "q",
            "q",
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.wires.push(Wire::new(
            "w0",
            Endpoint::boundary(Side::Input, 0),
            Endpoint::port("p", "in"),
        ));
        d.wires.push(Wire::new(
            "w1",
            Endpoint::port("p", "out"),
            Endpoint::port("q", "in"),
        ));
        d.wires.push(Wire::new(
            "w2",
            Endpoint::port("q", "out"),
            Endpoint::boundary(Side::Output, 0),
        ));

        let report = check(&d, &reg, &CancelToken::new()).unwrap();
        assert_eq!(codes(&report), vec![ErrorCode::E201]);
        assert!(report.diagnostics[0].message().contains('C'));
        assert!(report.diagnostics[0].message().contains('D'));
    }

    #[test]
    fn test_declared_port_disagreeing_with_registry() {
        let mut d = pipeline();
        d.nodes[0].inputs[0].ty = Some(Ty::base("B"));

        let report = check(&d, &registry(), &CancelToken::new()).unwrap();
        assert!(codes(&report).contains(&ErrorCode::E200));
    }

    #[test]
    fn test_boundary_mismatch_is_reported() {
        let mut d = pipeline();
        d.boundary.outputs[1] = Ty::base("Z");

        let report = check(&d, &registry(), &CancelToken::new()).unwrap();
        let codes = codes(&report);
        // The wire into the bad slot disagrees, and so does the
        // inferred signature.
        assert!(codes.contains(&ErrorCode::E201));
        assert!(codes.contains(&ErrorCode::E203));
    }

    #[test]
    fn test_cancelled_check_returns_no_report() {
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            check(&pipeline(), &registry(), &token).unwrap_err(),
            Cancelled
        );
    }
}
