//! The hypergraph intermediate representation for string diagrams.
//!
//! A [`Diagram`] is a set of typed-port [`Node`]s, a set of [`Wire`]s
//! identifying one output-side endpoint with one input-side endpoint,
//! and an ordered [`Boundary`] interface. Nodes, ports, and wires are
//! addressed by string ids (preserved verbatim from the interchange
//! document) rather than by reference, so cloning for a rewrite is
//! cheap and no ownership cycles can arise from the graph's
//! bidirectional connectivity.
//!
//! The arenas are plain `Vec`s kept in document order: decode order is
//! iteration order, which makes diagnostics and code generation
//! re-derivable byte-for-byte for the same input. Invariants
//! (acyclicity, linearity, type agreement, id uniqueness) are checked
//! by the checker, never assumed here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{SchemaTy, Ty};

macro_rules! id_type {
    ($(#[$docs:meta])* $name:ident) => {
        $(#[$docs])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

id_type! {
    /// Identifier of a node within one diagram.
    ///
    /// Ordering is lexicographic; the code generator uses it to break
    /// ties among independent nodes.
    NodeId
}

id_type! {
    /// Identifier of a port within one node.
    PortId
}

id_type! {
    /// Identifier of a wire within one diagram.
    WireId
}

/// Which side of a node or boundary a port or slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Input,
    Output,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Input => write!(f, "input"),
            Side::Output => write!(f, "output"),
        }
    }
}

/// The structural (schema-polymorphic) primitive morphisms.
///
/// Each variant carries a signature schema parametric in one or more
/// type variables; the concrete signature is resolved by the checker
/// from the node's surroundings, not fixed at construction. Adding a
/// primitive means adding a variant and its [`schema`](Structural::schema)
/// arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Structural {
    /// `X -> X`, one wire passing through unchanged.
    Identity,

    /// `X, Y -> Y, X`, the symmetry crossing two wires.
    Braiding,

    /// `X ⊗ (Y ⊗ Z) -> (X ⊗ Y) ⊗ Z`, re-bracketing toward the left.
    AssociatorLeft,

    /// `(X ⊗ Y) ⊗ Z -> X ⊗ (Y ⊗ Z)`, re-bracketing toward the right.
    AssociatorRight,

    /// `I, X -> X`, eliminating a unit leg on the left.
    UnitorLeft,

    /// `X, I -> X`, eliminating a unit leg on the right.
    UnitorRight,
}

/// The signature schema of a structural primitive: one template per
/// input and output port, in port order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSchema {
    pub inputs: Vec<SchemaTy>,
    pub outputs: Vec<SchemaTy>,
}

impl Structural {
    /// Returns the signature schema, with variables fresh per use site
    /// (callers resolve each node against an empty substitution).
    pub fn schema(&self) -> NodeSchema {
        let x = SchemaTy::var("X");
        let y = SchemaTy::var("Y");
        let z = SchemaTy::var("Z");
        match self {
            Structural::Identity => NodeSchema {
                inputs: vec![x.clone()],
                outputs: vec![x],
            },
            Structural::Braiding => NodeSchema {
                inputs: vec![x.clone(), y.clone()],
                outputs: vec![y, x],
            },
            Structural::AssociatorLeft => NodeSchema {
                inputs: vec![SchemaTy::tensor(
                    x.clone(),
                    SchemaTy::tensor(y.clone(), z.clone()),
                )],
                outputs: vec![SchemaTy::tensor(SchemaTy::tensor(x, y), z)],
            },
            Structural::AssociatorRight => NodeSchema {
                inputs: vec![SchemaTy::tensor(
                    SchemaTy::tensor(x.clone(), y.clone()),
                    z.clone(),
                )],
                outputs: vec![SchemaTy::tensor(x, SchemaTy::tensor(y, z))],
            },
            Structural::UnitorLeft => NodeSchema {
                inputs: vec![SchemaTy::Unit, x.clone()],
                outputs: vec![x],
            },
            Structural::UnitorRight => NodeSchema {
                inputs: vec![x.clone(), SchemaTy::Unit],
                outputs: vec![x],
            },
        }
    }

    /// Stable name used in diagnostics and generated-code comments.
    pub fn label(&self) -> &'static str {
        match self {
            Structural::Identity => "identity",
            Structural::Braiding => "braiding",
            Structural::AssociatorLeft => "associator-left",
            Structural::AssociatorRight => "associator-right",
            Structural::UnitorLeft => "unitor-left",
            Structural::UnitorRight => "unitor-right",
        }
    }
}

impl fmt::Display for Structural {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// What a node denotes: a user-labelled box with a declared signature,
/// or a structural primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A user morphism, named by its label in the signature registry.
    Box { label: String },

    /// A schema-polymorphic primitive.
    Structural(Structural),
}

/// A typed connection point on one node.
///
/// Port order within a node is semantically significant: it determines
/// tensor/tuple component order. Structural-node ports usually carry no
/// declared type (`ty: None`); the checker resolves them into a side
/// table without mutating the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<Ty>,
}

impl Port {
    /// A port with a declared type (box nodes, boundary-adjacent decl).
    pub fn typed(id: impl Into<PortId>, ty: Ty) -> Self {
        Port {
            id: id.into(),
            ty: Some(ty),
        }
    }

    /// A port whose type is resolved by the checker.
    pub fn untyped(id: impl Into<PortId>) -> Self {
        Port {
            id: id.into(),
            ty: None,
        }
    }
}

/// One node of the hypergraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,

    #[serde(default)]
    pub inputs: Vec<Port>,

    #[serde(default)]
    pub outputs: Vec<Port>,

    /// UI-only fields (canvas position and the like): opaque
    /// passthrough data, never interpreted, preserved on re-encode.
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub ui: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    /// Creates a box node with the given label and ports.
    pub fn boxed(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        inputs: Vec<Port>,
        outputs: Vec<Port>,
    ) -> Self {
        Node {
            id: id.into(),
            kind: NodeKind::Box {
                label: label.into(),
            },
            inputs,
            outputs,
            ui: serde_json::Map::new(),
        }
    }

    /// Creates a structural node; port arity must match the schema.
    pub fn structural(
        id: impl Into<NodeId>,
        primitive: Structural,
        inputs: Vec<Port>,
        outputs: Vec<Port>,
    ) -> Self {
        Node {
            id: id.into(),
            kind: NodeKind::Structural(primitive),
            inputs,
            outputs,
            ui: serde_json::Map::new(),
        }
    }

    /// Looks up a port on the given side, returning its position.
    pub fn port(&self, side: Side, port: &PortId) -> Option<(usize, &Port)> {
        let ports = match side {
            Side::Input => &self.inputs,
            Side::Output => &self.outputs,
        };
        ports.iter().enumerate().find(|(_, p)| p.id == *port)
    }

    /// A display label for diagnostics.
    pub fn display_label(&self) -> &str {
        match &self.kind {
            NodeKind::Box { label } => label,
            NodeKind::Structural(s) => s.label(),
        }
    }
}

/// One end of a wire: a boundary slot or a node port.
///
/// A boundary *input* slot acts as a value source; a boundary *output*
/// slot acts as a value sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Boundary { side: Side, index: usize },
    Port { node: NodeId, port: PortId },
}

impl Endpoint {
    /// A boundary slot endpoint.
    pub fn boundary(side: Side, index: usize) -> Self {
        Endpoint::Boundary { side, index }
    }

    /// A node-port endpoint.
    pub fn port(node: impl Into<NodeId>, port: impl Into<PortId>) -> Self {
        Endpoint::Port {
            node: node.into(),
            port: port.into(),
        }
    }

    /// The node this endpoint belongs to, if any.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Endpoint::Port { node, .. } => Some(node),
            Endpoint::Boundary { .. } => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Boundary { side, index } => write!(f, "boundary {side} slot {index}"),
            Endpoint::Port { node, port } => write!(f, "port {port} of node {node}"),
        }
    }
}

/// A wire identifying its source port's value with its target port's
/// value. It carries no type of its own; type agreement between the two
/// endpoints is a checked invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub id: WireId,
    pub source: Endpoint,
    pub target: Endpoint,
}

impl Wire {
    pub fn new(id: impl Into<WireId>, source: Endpoint, target: Endpoint) -> Self {
        Wire {
            id: id.into(),
            source,
            target,
        }
    }
}

/// The diagram's overall interface: ordered input and output type
/// lists, modeled as two synthetic endpoints whose slots are indexed by
/// position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Boundary {
    #[serde(default)]
    pub inputs: Vec<Ty>,

    #[serde(default)]
    pub outputs: Vec<Ty>,
}

impl Boundary {
    pub fn new(inputs: Vec<Ty>, outputs: Vec<Ty>) -> Self {
        Boundary { inputs, outputs }
    }

    /// Declared type of a boundary slot, if the index is in range.
    pub fn slot_ty(&self, side: Side, index: usize) -> Option<&Ty> {
        match side {
            Side::Input => self.inputs.get(index),
            Side::Output => self.outputs.get(index),
        }
    }
}

/// A complete diagram snapshot.
///
/// Constructed wholesale from an interchange document and never
/// incrementally mutated by the core; the rewrite engine produces a new
/// value instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    /// Named base-type declarations from the document, carried verbatim
    /// for lossless round-tripping.
    #[serde(rename = "types", default, skip_serializing_if = "indexmap::IndexMap::is_empty")]
    pub type_defs: indexmap::IndexMap<String, Ty>,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub wires: Vec<Wire>,

    pub boundary: Boundary,
}

impl Diagram {
    /// Creates an empty diagram over the given boundary.
    pub fn new(boundary: Boundary) -> Self {
        Diagram {
            type_defs: indexmap::IndexMap::new(),
            nodes: Vec::new(),
            wires: Vec::new(),
            boundary,
        }
    }

    /// Finds a node by id (first occurrence wins; duplicates are a
    /// checked invariant, reported by the checker).
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    /// Finds a wire by id.
    pub fn wire(&self, id: &WireId) -> Option<&Wire> {
        self.wires.iter().find(|w| w.id == *id)
    }

    /// The declared type at an endpoint: the boundary slot type, or the
    /// port's declared type. `None` for unknown references or ports
    /// whose type is checker-resolved.
    pub fn declared_ty(&self, endpoint: &Endpoint) -> Option<&Ty> {
        match endpoint {
            Endpoint::Boundary { side, index } => self.boundary.slot_ty(*side, *index),
            Endpoint::Port { node, port } => {
                let node = self.node(node)?;
                let (_, p) = node
                    .port(Side::Input, port)
                    .or_else(|| node.port(Side::Output, port))?;
                p.ty.as_ref()
            }
        }
    }

    /// Which side of its owner an endpoint sits on: boundary slots keep
    /// their own side; node ports report the side they were found on.
    pub fn endpoint_side(&self, endpoint: &Endpoint) -> Option<Side> {
        match endpoint {
            Endpoint::Boundary { side, .. } => Some(*side),
            Endpoint::Port { node, port } => {
                let node = self.node(node)?;
                if node.port(Side::Input, port).is_some() {
                    Some(Side::Input)
                } else if node.port(Side::Output, port).is_some() {
                    Some(Side::Output)
                } else {
                    None
                }
            }
        }
    }
}
