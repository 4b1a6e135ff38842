//! End-to-end: decode a JSON document, check it, rewrite it, and
//! compile the result.

use strand::codegen::{GenOptions, TypeMap, generate};
use strand::rewrite::rules::RuleId;
use strand::{apply, check, list_applicable};
use strand_core::cancel::CancelToken;
use strand_core::diagram::NodeId;
use strand_core::document::{from_json_str, to_json_string};
use strand_core::signature::Registry;
use strand_core::types::Ty;

/// An `identity` node feeding a session-declared box `f : A -> B`,
/// with a UI-only field on the box node.
const DOCUMENT: &str = r#"{
    "nodes": [
        {
            "id": "i",
            "kind": { "structural": "identity" },
            "inputs": [{ "id": "in" }],
            "outputs": [{ "id": "out" }]
        },
        {
            "id": "f",
            "kind": { "box": { "label": "f" } },
            "inputs": [{ "id": "x", "ty": { "base": "A" } }],
            "outputs": [{ "id": "y", "ty": { "base": "B" } }],
            "position": { "x": 120, "y": 40 }
        }
    ],
    "wires": [
        {
            "id": "w0",
            "source": { "boundary": { "side": "input", "index": 0 } },
            "target": { "port": { "node": "i", "port": "in" } }
        },
        {
            "id": "w1",
            "source": { "port": { "node": "i", "port": "out" } },
            "target": { "port": { "node": "f", "port": "x" } }
        },
        {
            "id": "w2",
            "source": { "port": { "node": "f", "port": "y" } },
            "target": { "boundary": { "side": "output", "index": 0 } }
        }
    ],
    "boundary": {
        "inputs": [{ "base": "A" }],
        "outputs": [{ "base": "B" }]
    }
}"#;

#[test]
fn test_document_to_generated_source() {
    let cancel = CancelToken::new();
    let diagram = from_json_str(DOCUMENT).unwrap();
    let registry = Registry::builder().declare_document_boxes(&diagram).build();

    let report = check(&diagram, &registry, &cancel).unwrap();
    assert!(report.valid, "diagnostics: {:?}", report.diagnostics);
    let signature = report.signature.clone().unwrap();
    assert_eq!(signature.inputs, vec![Ty::base("A")]);
    assert_eq!(signature.outputs, vec![Ty::base("B")]);

    let selection = vec![NodeId::new("i")];
    let applicable = list_applicable(&diagram, &registry, &selection, &cancel).unwrap();
    assert!(applicable.contains(&RuleId::IdentityLeft));

    let rewritten = apply(&diagram, &registry, RuleId::IdentityLeft, &selection, &cancel).unwrap();
    assert_eq!(rewritten.nodes.len(), 1);
    assert_eq!(rewritten.nodes[0].id, NodeId::new("f"));

    // The rewrite preserves validity and the declared signature.
    let rewritten_report = check(&rewritten, &registry, &cancel).unwrap();
    assert!(
        rewritten_report.valid,
        "diagnostics: {:?}",
        rewritten_report.diagnostics
    );
    assert_eq!(
        rewritten_report.signature.as_ref().unwrap().outputs,
        signature.outputs
    );

    let mut type_map = TypeMap::new();
    type_map.insert("A".to_owned(), "i64".to_owned());
    type_map.insert("B".to_owned(), "String".to_owned());
    let options = GenOptions {
        function_name: "run".to_owned(),
        module_prefix: Some("ops".to_owned()),
        type_map,
    };
    let source = generate(&rewritten, &rewritten_report, "rust", &options, &cancel).unwrap();
    assert_eq!(
        source,
        "pub fn run(in0: i64) -> String {\n    let v_f = ops::f(in0);\n    v_f\n}\n"
    );
}

#[test]
fn test_document_round_trip_keeps_ui_fields() {
    let diagram = from_json_str(DOCUMENT).unwrap();
    let box_node = diagram.nodes.iter().find(|n| n.id == NodeId::new("f")).unwrap();
    assert!(box_node.ui.contains_key("position"));

    let encoded = to_json_string(&diagram).unwrap();
    let decoded = from_json_str(&encoded).unwrap();
    assert_eq!(decoded, diagram);
}
