//! The read-only registry of known morphism signatures.
//!
//! The registry maps a box label to its `(input types, output types)`
//! schema. It is built once, from standard-library entries plus boxes
//! declared by the session's document, and then shared immutably by
//! the checker, rewrite engine, and code generator. Registry changes
//! are modeled by building a new registry, never by mutating a shared
//! one, so concurrent readers keep the snapshot they were handed.

use std::fmt;

use indexmap::IndexMap;

use crate::diagram::{Diagram, NodeKind};
use crate::types::Ty;

/// The `(input types, output types)` schema of one morphism.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Signature {
    pub inputs: Vec<Ty>,
    pub outputs: Vec<Ty>,
}

impl Signature {
    pub fn new(inputs: Vec<Ty>, outputs: Vec<Ty>) -> Self {
        Signature { inputs, outputs }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |tys: &[Ty]| {
            tys.iter()
                .map(Ty::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "[{}] -> [{}]", join(&self.inputs), join(&self.outputs))
    }
}

/// An immutable label-to-signature map.
///
/// `Registry` is `Send + Sync`; pass it by reference into every entry
/// point rather than holding ambient global state.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: IndexMap<String, Signature>,
}

impl Registry {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The standard library: a small set of morphisms over the `Int`
    /// and `Str` base types, available to every session.
    pub fn standard() -> Registry {
        let int = || Ty::base("Int");
        let str_ = || Ty::base("Str");
        Registry::builder()
            .declare("add", Signature::new(vec![int(), int()], vec![int()]))
            .declare("mul", Signature::new(vec![int(), int()], vec![int()]))
            .declare("neg", Signature::new(vec![int()], vec![int()]))
            .declare("show", Signature::new(vec![int()], vec![str_()]))
            .declare("concat", Signature::new(vec![str_(), str_()], vec![str_()]))
            .build()
    }

    /// Looks up the signature registered under a label.
    pub fn get(&self, label: &str) -> Option<&Signature> {
        self.entries.get(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Signature)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Builder for a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: IndexMap<String, Signature>,
}

impl RegistryBuilder {
    /// Declares one morphism; a repeated label keeps the first entry.
    pub fn declare(mut self, label: impl Into<String>, signature: Signature) -> Self {
        self.entries.entry(label.into()).or_insert(signature);
        self
    }

    /// Harvests session-declared boxes from a document snapshot: every
    /// box node whose ports are all explicitly typed and whose label is
    /// not yet registered contributes its declared signature.
    pub fn declare_document_boxes(mut self, diagram: &Diagram) -> Self {
        for node in &diagram.nodes {
            let NodeKind::Box { label } = &node.kind else {
                continue;
            };
            if self.entries.contains_key(label) {
                continue;
            }
            let collect = |ports: &[crate::diagram::Port]| {
                ports
                    .iter()
                    .map(|p| p.ty.clone())
                    .collect::<Option<Vec<Ty>>>()
            };
            if let (Some(inputs), Some(outputs)) = (collect(&node.inputs), collect(&node.outputs)) {
                self.entries
                    .insert(label.clone(), Signature::new(inputs, outputs));
            }
        }
        self
    }

    /// Freezes the builder into an immutable registry.
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
        }
    }
}
