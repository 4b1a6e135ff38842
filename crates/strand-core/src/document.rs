//! The interchange form of a diagram.
//!
//! A diagram travels between an editing surface and this core as a
//! structured JSON document with `types` (named type declarations),
//! `nodes` (kind, label, ordered typed ports, plus opaque UI-only
//! fields), `wires` (ordered endpoint pairs), and `boundary` (ordered
//! input and output type lists). Decoding then encoding a document is
//! the identity, including UI-only passthrough fields, which the core
//! neither interprets nor requires.
//!
//! The serde representations live on the model types themselves
//! ([`crate::diagram`]); this module provides the JSON entry points and
//! the decode error.

use thiserror::Error;

use crate::diagram::Diagram;

/// Failure to decode or encode an interchange document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed diagram document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes a diagram snapshot from its JSON interchange form.
///
/// Structural and type invariants are *not* verified here; a decoded
/// diagram still goes through the checker. Only shape-level problems
/// (missing fields, wrong JSON types) are errors at this stage.
pub fn from_json_str(source: &str) -> Result<Diagram, DocumentError> {
    Ok(serde_json::from_str(source)?)
}

/// Encodes a diagram snapshot to its compact JSON interchange form.
pub fn to_json_string(diagram: &Diagram) -> Result<String, DocumentError> {
    Ok(serde_json::to_string(diagram)?)
}

/// Encodes a diagram snapshot to human-readable JSON.
pub fn to_json_string_pretty(diagram: &Diagram) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(diagram)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{Boundary, Endpoint, Node, Port, Side, Structural, Wire};
    use crate::types::Ty;

    const DOC: &str = r#"{
        "types": { "A": "unit", "Pair": { "tensor": [{ "base": "A" }, { "base": "B" }] } },
        "nodes": [
            {
                "id": "f",
                "kind": { "box": { "label": "f" } },
                "inputs": [{ "id": "in0", "ty": { "base": "A" } }],
                "outputs": [{ "id": "out0", "ty": { "base": "B" } }],
                "position": { "x": 120, "y": 40 }
            },
            {
                "id": "swap",
                "kind": { "structural": "braiding" },
                "inputs": [{ "id": "l" }, { "id": "r" }],
                "outputs": [{ "id": "l2" }, { "id": "r2" }]
            }
        ],
        "wires": [
            {
                "id": "w0",
                "source": { "boundary": { "side": "input", "index": 0 } },
                "target": { "port": { "node": "f", "port": "in0" } }
            }
        ],
        "boundary": {
            "inputs": [{ "base": "A" }],
            "outputs": [{ "base": "B" }]
        }
    }"#;

    #[test]
    fn test_decode_document() {
        let diagram = from_json_str(DOC).unwrap();
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.wires.len(), 1);
        assert_eq!(diagram.boundary.inputs, vec![Ty::base("A")]);
        assert_eq!(diagram.type_defs.get("A"), Some(&Ty::Unit));

        let f = diagram.node(&"f".into()).unwrap();
        assert_eq!(f.inputs[0].ty, Some(Ty::base("A")));
        // UI-only fields are passthrough, not interpreted.
        assert!(f.ui.contains_key("position"));

        let swap = diagram.node(&"swap".into()).unwrap();
        assert_eq!(
            swap.kind,
            crate::diagram::NodeKind::Structural(Structural::Braiding)
        );
        assert_eq!(swap.inputs[0].ty, None);

        let w0 = &diagram.wires[0];
        assert_eq!(w0.source, Endpoint::boundary(Side::Input, 0));
        assert_eq!(w0.target, Endpoint::port("f", "in0"));
    }

    #[test]
    fn test_round_trip_preserves_ui_fields() {
        let decoded = from_json_str(DOC).unwrap();
        let encoded = to_json_string(&decoded).unwrap();
        let redecoded = from_json_str(&encoded).unwrap();
        assert_eq!(decoded, redecoded);

        let f = redecoded.node(&"f".into()).unwrap();
        assert_eq!(
            f.ui.get("position"),
            Some(&serde_json::json!({ "x": 120, "y": 40 }))
        );
    }

    #[test]
    fn test_programmatic_round_trip() {
        let mut diagram = Diagram::new(Boundary::new(
            vec![Ty::tensor(Ty::base("A"), Ty::base("B"))],
            vec![Ty::Unit],
        ));
        diagram.nodes.push(Node::structural(
            "id0",
            Structural::Identity,
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        diagram.wires.push(Wire::new(
            "w0",
            Endpoint::boundary(Side::Input, 0),
            Endpoint::port("id0", "in"),
        ));
        diagram.wires.push(Wire::new(
            "w1",
            Endpoint::port("id0", "out"),
            Endpoint::boundary(Side::Output, 0),
        ));

        let encoded = to_json_string_pretty(&diagram).unwrap();
        assert_eq!(from_json_str(&encoded).unwrap(), diagram);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(from_json_str("{ \"nodes\": 3 }").is_err());
    }
}
