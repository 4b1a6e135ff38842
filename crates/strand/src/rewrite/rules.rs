//! The built-in rewrite-rule catalogue.
//!
//! A rule is plain data: a left-hand and a right-hand [`Pattern`]
//! sharing one set of type variables. The engine in the parent module
//! is generic over this table, so adding a rule means adding data here,
//! not matching code. Every shipped rule is a coherence equation of the
//! symmetric monoidal category and therefore boundary- and
//! type-preserving by construction.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use strand_core::diagram::{Side, Structural};
use strand_core::types::SchemaTy;

/// Stable identifier of one catalogue rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    /// `id ; f = f`: remove an identity node.
    IdentityLeft,

    /// `f ; id = f`: same shape as [`RuleId::IdentityLeft`]; both ids
    /// match a lone identity node.
    IdentityRight,

    /// `α⁻¹ ; α = id` on a left-nested tensor.
    AssociativityLeft,

    /// `α ; α⁻¹ = id` on a right-nested tensor.
    AssociativityRight,

    /// `σ ; σ = id`: two braidings in sequence cancel.
    Braiding,

    /// `σ ; ρ = λ`: braiding an `I` leg right and eliminating it there
    /// is the left unitor.
    UnitLeft,

    /// `σ ; λ = ρ`: the mirror of [`RuleId::UnitLeft`].
    UnitRight,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::IdentityLeft => "identity-left",
            RuleId::IdentityRight => "identity-right",
            RuleId::AssociativityLeft => "associativity-left",
            RuleId::AssociativityRight => "associativity-right",
            RuleId::Braiding => "braiding",
            RuleId::UnitLeft => "unit-left",
            RuleId::UnitRight => "unit-right",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = UnknownRule;

    fn from_str(s: &str) -> Result<Self, UnknownRule> {
        catalogue()
            .iter()
            .map(|r| r.id)
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRule(s.to_owned()))
    }
}

/// Parse failure for a rule identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rewrite rule `{0}`")]
pub struct UnknownRule(pub String);

/// One end of a pattern wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatEndpoint {
    /// The fragment's external input slot `i`.
    ExtIn(usize),

    /// The fragment's external output slot `i`.
    ExtOut(usize),

    /// Port `port` on the given side of pattern node `node`.
    Node { node: usize, side: Side, port: usize },
}

/// A template diagram fragment.
///
/// External slots are ordered and typed by schema templates; nodes are
/// structural kinds indexed by position; wires connect slots and node
/// ports. The right-hand pattern of a rule reuses the left-hand
/// pattern's slot order and type variables.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub ext_inputs: Vec<SchemaTy>,
    pub ext_outputs: Vec<SchemaTy>,
    pub nodes: Vec<Structural>,
    pub wires: Vec<(PatEndpoint, PatEndpoint)>,
}

/// One rewrite rule: a left-hand shape and its replacement.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,
    pub name: &'static str,
    pub description: &'static str,
    pub lhs: Pattern,
    pub rhs: Pattern,
}

/// The full rule table, in presentation order.
pub fn catalogue() -> &'static [Rule] {
    &CATALOGUE
}

/// Looks up one rule by id.
pub fn rule(id: RuleId) -> &'static Rule {
    catalogue()
        .iter()
        .find(|r| r.id == id)
        .expect("every RuleId has a catalogue entry")
}

fn ein(i: usize) -> PatEndpoint {
    PatEndpoint::ExtIn(i)
}

fn eout(i: usize) -> PatEndpoint {
    PatEndpoint::ExtOut(i)
}

fn nin(node: usize, port: usize) -> PatEndpoint {
    PatEndpoint::Node {
        node,
        side: Side::Input,
        port,
    }
}

fn nout(node: usize, port: usize) -> PatEndpoint {
    PatEndpoint::Node {
        node,
        side: Side::Output,
        port,
    }
}

fn identity_rule(id: RuleId, name: &'static str, description: &'static str) -> Rule {
    let x = || SchemaTy::var("X");
    Rule {
        id,
        name,
        description,
        lhs: Pattern {
            ext_inputs: vec![x()],
            ext_outputs: vec![x()],
            nodes: vec![Structural::Identity],
            wires: vec![(ein(0), nin(0, 0)), (nout(0, 0), eout(0))],
        },
        rhs: Pattern {
            ext_inputs: vec![x()],
            ext_outputs: vec![x()],
            nodes: vec![],
            wires: vec![(ein(0), eout(0))],
        },
    }
}

fn associativity_rule(
    id: RuleId,
    name: &'static str,
    description: &'static str,
    first: Structural,
    second: Structural,
    ext: SchemaTy,
) -> Rule {
    Rule {
        id,
        name,
        description,
        lhs: Pattern {
            ext_inputs: vec![ext.clone()],
            ext_outputs: vec![ext.clone()],
            nodes: vec![first, second],
            wires: vec![
                (ein(0), nin(0, 0)),
                (nout(0, 0), nin(1, 0)),
                (nout(1, 0), eout(0)),
            ],
        },
        rhs: Pattern {
            ext_inputs: vec![ext.clone()],
            ext_outputs: vec![ext],
            nodes: vec![],
            wires: vec![(ein(0), eout(0))],
        },
    }
}

fn unit_rule(
    id: RuleId,
    name: &'static str,
    description: &'static str,
    matched_unitor: Structural,
    replacement_unitor: Structural,
    ext_inputs: Vec<SchemaTy>,
) -> Rule {
    let x = || SchemaTy::var("X");
    Rule {
        id,
        name,
        description,
        lhs: Pattern {
            ext_inputs: ext_inputs.clone(),
            ext_outputs: vec![x()],
            nodes: vec![Structural::Braiding, matched_unitor],
            wires: vec![
                (ein(0), nin(0, 0)),
                (ein(1), nin(0, 1)),
                (nout(0, 0), nin(1, 0)),
                (nout(0, 1), nin(1, 1)),
                (nout(1, 0), eout(0)),
            ],
        },
        rhs: Pattern {
            ext_inputs,
            ext_outputs: vec![x()],
            nodes: vec![replacement_unitor],
            wires: vec![
                (ein(0), nin(0, 0)),
                (ein(1), nin(0, 1)),
                (nout(0, 0), eout(0)),
            ],
        },
    }
}

static CATALOGUE: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let x = || SchemaTy::var("X");
    let y = || SchemaTy::var("Y");
    let z = || SchemaTy::var("Z");
    let left_nested = || SchemaTy::tensor(SchemaTy::tensor(x(), y()), z());
    let right_nested = || SchemaTy::tensor(x(), SchemaTy::tensor(y(), z()));

    vec![
        identity_rule(
            RuleId::IdentityLeft,
            "identity elimination (left)",
            "remove an identity node and splice its wires",
        ),
        identity_rule(
            RuleId::IdentityRight,
            "identity elimination (right)",
            "remove an identity node and splice its wires",
        ),
        associativity_rule(
            RuleId::AssociativityLeft,
            "associativity (left)",
            "collapse a right-associator followed by a left-associator",
            Structural::AssociatorRight,
            Structural::AssociatorLeft,
            left_nested(),
        ),
        associativity_rule(
            RuleId::AssociativityRight,
            "associativity (right)",
            "collapse a left-associator followed by a right-associator",
            Structural::AssociatorLeft,
            Structural::AssociatorRight,
            right_nested(),
        ),
        Rule {
            id: RuleId::Braiding,
            name: "braiding involution",
            description: "cancel two braidings in sequence into parallel wires",
            lhs: Pattern {
                ext_inputs: vec![x(), y()],
                ext_outputs: vec![x(), y()],
                nodes: vec![Structural::Braiding, Structural::Braiding],
                wires: vec![
                    (ein(0), nin(0, 0)),
                    (ein(1), nin(0, 1)),
                    (nout(0, 0), nin(1, 0)),
                    (nout(0, 1), nin(1, 1)),
                    (nout(1, 0), eout(0)),
                    (nout(1, 1), eout(1)),
                ],
            },
            rhs: Pattern {
                ext_inputs: vec![x(), y()],
                ext_outputs: vec![x(), y()],
                nodes: vec![],
                wires: vec![(ein(0), eout(0)), (ein(1), eout(1))],
            },
        },
        unit_rule(
            RuleId::UnitLeft,
            "unit triangle (left)",
            "replace a braiding into a right unitor by a left unitor",
            Structural::UnitorRight,
            Structural::UnitorLeft,
            vec![SchemaTy::Unit, x()],
        ),
        unit_rule(
            RuleId::UnitRight,
            "unit triangle (right)",
            "replace a braiding into a left unitor by a right unitor",
            Structural::UnitorLeft,
            Structural::UnitorRight,
            vec![x(), SchemaTy::Unit],
        ),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_ids_round_trip() {
        for rule in catalogue() {
            assert_eq!(rule.id.as_str().parse::<RuleId>(), Ok(rule.id));
        }
        assert!("frobnicate".parse::<RuleId>().is_err());
    }

    #[test]
    fn test_serde_form_matches_as_str() {
        for rule in catalogue() {
            let json = serde_json::to_string(&rule.id).unwrap();
            assert_eq!(json, format!("\"{}\"", rule.id.as_str()));
        }
    }

    #[test]
    fn test_patterns_keep_external_arity_across_sides() {
        for rule in catalogue() {
            assert_eq!(rule.lhs.ext_inputs.len(), rule.rhs.ext_inputs.len());
            assert_eq!(rule.lhs.ext_outputs.len(), rule.rhs.ext_outputs.len());
        }
    }

    #[test]
    fn test_pattern_wires_mention_every_external_slot_once() {
        for rule in catalogue() {
            for pattern in [&rule.lhs, &rule.rhs] {
                for i in 0..pattern.ext_inputs.len() {
                    let uses = pattern
                        .wires
                        .iter()
                        .filter(|(a, _)| *a == PatEndpoint::ExtIn(i))
                        .count();
                    assert_eq!(uses, 1, "rule {} slot in{}", rule.id, i);
                }
                for i in 0..pattern.ext_outputs.len() {
                    let uses = pattern
                        .wires
                        .iter()
                        .filter(|(_, b)| *b == PatEndpoint::ExtOut(i))
                        .count();
                    assert_eq!(uses, 1, "rule {} slot out{}", rule.id, i);
                }
            }
        }
    }

    #[test]
    fn test_pattern_node_arities_match_schemas() {
        for rule in catalogue() {
            for pattern in [&rule.lhs, &rule.rhs] {
                for (n, primitive) in pattern.nodes.iter().enumerate() {
                    let schema = primitive.schema();
                    for (side, count) in [
                        (Side::Input, schema.inputs.len()),
                        (Side::Output, schema.outputs.len()),
                    ] {
                        for port in 0..count {
                            let endpoint = PatEndpoint::Node { node: n, side, port };
                            let uses = pattern
                                .wires
                                .iter()
                                .filter(|(a, b)| *a == endpoint || *b == endpoint)
                                .count();
                            assert_eq!(uses, 1, "rule {} node {n} {side} port {port}", rule.id);
                        }
                    }
                }
            }
        }
    }
}
