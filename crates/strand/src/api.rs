//! The operation layer: request/response pairs for an external
//! transport.
//!
//! Four logical operations cover everything the core does: TypeCheck,
//! ListRewrites, Rewrite, and Compile. Each is a pure function of the
//! snapshot it receives plus a shared read-only [`Registry`]; the core
//! holds no diagram state across requests. All request and response
//! types are serde-able so any structured channel can carry them.
//!
//! Cancellation is not a response: a cancelled operation returns
//! `Err(Cancelled)` and no partial value, so a transport can drop the
//! stale request without ever surfacing it to the caller.

use serde::{Deserialize, Serialize};

use strand_core::cancel::{CancelToken, Cancelled};
use strand_core::diagnostic::{Diagnostic, ErrorCode};
use strand_core::diagram::{Diagram, NodeId};
use strand_core::signature::{Registry, Signature};

use crate::check;
use crate::codegen::{self, CodegenError, GenOptions};
use crate::rewrite::rules::{self, RuleId};
use crate::rewrite::{self, RewriteError};

/// A machine-readable operation failure: the diagnostic code (where
/// one exists) plus the rendered message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl From<&RewriteError> for OperationError {
    fn from(err: &RewriteError) -> Self {
        OperationError {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<&CodegenError> for OperationError {
    fn from(err: &CodegenError) -> Self {
        OperationError {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCheckRequest {
    pub diagram: Diagram,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCheckResponse {
    pub valid: bool,
    pub diagnostics: Vec<Diagnostic>,

    /// The inferred boundary signature, present when the diagram is
    /// valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

/// Checks a snapshot and reports validity, diagnostics, and the
/// inferred signature.
pub fn type_check(
    request: TypeCheckRequest,
    registry: &Registry,
    cancel: &CancelToken,
) -> Result<TypeCheckResponse, Cancelled> {
    let report = check::check(&request.diagram, registry, cancel)?;
    Ok(TypeCheckResponse {
        valid: report.valid,
        diagnostics: report.diagnostics,
        signature: report.signature,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRewritesRequest {
    pub diagram: Diagram,
    pub selection: Vec<NodeId>,
}

/// One applicable rule, enriched from the catalogue for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleInfo {
    pub rule_id: RuleId,
    pub name: String,
    pub description: String,
}

impl From<RuleId> for RuleInfo {
    fn from(id: RuleId) -> Self {
        let rule = rules::rule(id);
        RuleInfo {
            rule_id: id,
            name: rule.name.to_owned(),
            description: rule.description.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ListRewritesResponse {
    Ok { rules: Vec<RuleInfo> },
    Error { error: OperationError },
}

/// Lists every rule whose left-hand pattern matches the selection.
pub fn list_rewrites(
    request: ListRewritesRequest,
    registry: &Registry,
    cancel: &CancelToken,
) -> Result<ListRewritesResponse, Cancelled> {
    match rewrite::list_applicable(&request.diagram, registry, &request.selection, cancel) {
        Ok(ids) => Ok(ListRewritesResponse::Ok {
            rules: ids.into_iter().map(RuleInfo::from).collect(),
        }),
        Err(RewriteError::Cancelled(cancelled)) => Err(cancelled),
        Err(err) => Ok(ListRewritesResponse::Error {
            error: OperationError::from(&err),
        }),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub diagram: Diagram,
    pub rule_id: RuleId,
    pub selection: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RewriteResponse {
    Ok { diagram: Diagram },
    Error { error: OperationError },
}

/// Applies one rule to the selection, returning the rewritten
/// snapshot.
pub fn rewrite(
    request: RewriteRequest,
    registry: &Registry,
    cancel: &CancelToken,
) -> Result<RewriteResponse, Cancelled> {
    match rewrite::apply(
        &request.diagram,
        registry,
        request.rule_id,
        &request.selection,
        cancel,
    ) {
        Ok(diagram) => Ok(RewriteResponse::Ok { diagram }),
        Err(RewriteError::Cancelled(cancelled)) => Err(cancelled),
        Err(err) => Ok(RewriteResponse::Error {
            error: OperationError::from(&err),
        }),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    pub diagram: Diagram,
    pub target: String,

    #[serde(default)]
    pub options: GenOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CompileResponse {
    Ok { source: String },
    Error { errors: Vec<OperationError> },
}

/// Checks the snapshot, then compiles it for the requested target.
pub fn compile(
    request: CompileRequest,
    registry: &Registry,
    cancel: &CancelToken,
) -> Result<CompileResponse, Cancelled> {
    let report = check::check(&request.diagram, registry, cancel)?;
    match codegen::generate(
        &request.diagram,
        &report,
        &request.target,
        &request.options,
        cancel,
    ) {
        Ok(source) => Ok(CompileResponse::Ok { source }),
        Err(errors) => {
            if errors
                .iter()
                .any(|e| matches!(e, CodegenError::Cancelled(_)))
            {
                return Err(Cancelled);
            }
            Ok(CompileResponse::Error {
                errors: errors.iter().map(OperationError::from).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::diagram::{Boundary, Endpoint, Node, Port, Side, Structural, Wire};
    use strand_core::types::Ty;

    fn registry() -> Registry {
        Registry::builder()
            .declare(
                "f",
                Signature::new(vec![Ty::base("A")], vec![Ty::base("B")]),
            )
            .build()
    }

    /// An `identity : A -> A` feeding `f : A -> B`.
    fn identity_then_f() -> Diagram {
        let mut d = Diagram::new(Boundary::new(vec![Ty::base("A")], vec![Ty::base("B")]));
        d.nodes.push(Node::structural(
            "i",
            Structural::Identity,
            vec![Port::untyped("in")],
            vec![Port::untyped("out")],
        ));
        d.nodes.push(Node::boxed(
            "f",
            "f",
            vec![Port::untyped("x")],
            vec![Port::untyped("y")],
        ));
        d.wires.push(Wire::new(
            "w0",
            Endpoint::boundary(Side::Input, 0),
            Endpoint::port("i", "in"),
        ));
        d.wires.push(Wire::new(
            "w1",
            Endpoint::port("i", "out"),
            Endpoint::port("f", "x"),
        ));
        d.wires.push(Wire::new(
            "w2",
            Endpoint::port("f", "y"),
            Endpoint::boundary(Side::Output, 0),
        ));
        d
    }

    #[test]
    fn test_type_check_reports_signature() {
        let response = type_check(
            TypeCheckRequest {
                diagram: identity_then_f(),
            },
            &registry(),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(response.valid, "diagnostics: {:?}", response.diagnostics);
        assert_eq!(
            response.signature,
            Some(Signature::new(vec![Ty::base("A")], vec![Ty::base("B")]))
        );
    }

    #[test]
    fn test_list_rewrites_enriches_from_catalogue() {
        let response = list_rewrites(
            ListRewritesRequest {
                diagram: identity_then_f(),
                selection: vec![NodeId::new("i")],
            },
            &registry(),
            &CancelToken::new(),
        )
        .unwrap();
        let ListRewritesResponse::Ok { rules } = response else {
            panic!("expected applicable rules");
        };
        let left = rules
            .iter()
            .find(|r| r.rule_id == RuleId::IdentityLeft)
            .unwrap();
        assert_eq!(left.name, "identity elimination (left)");
        assert!(!left.description.is_empty());
    }

    #[test]
    fn test_rewrite_returns_new_snapshot() {
        let response = rewrite(
            RewriteRequest {
                diagram: identity_then_f(),
                rule_id: RuleId::IdentityLeft,
                selection: vec![NodeId::new("i")],
            },
            &registry(),
            &CancelToken::new(),
        )
        .unwrap();
        let RewriteResponse::Ok { diagram } = response else {
            panic!("expected a rewritten diagram");
        };
        assert_eq!(diagram.nodes.len(), 1);
        assert_eq!(diagram.nodes[0].id, NodeId::new("f"));
    }

    #[test]
    fn test_rewrite_on_invalid_diagram_reports_e302() {
        let mut d = identity_then_f();
        d.wires.pop();

        let response = rewrite(
            RewriteRequest {
                diagram: d,
                rule_id: RuleId::IdentityLeft,
                selection: vec![NodeId::new("i")],
            },
            &registry(),
            &CancelToken::new(),
        )
        .unwrap();
        let RewriteResponse::Error { error } = response else {
            panic!("expected an error response");
        };
        assert_eq!(error.code, Some(ErrorCode::E302));
    }

    #[test]
    fn test_compile_unknown_target_reports_e403() {
        let mut map = codegen::TypeMap::new();
        map.insert("A".to_owned(), "i64".to_owned());
        map.insert("B".to_owned(), "String".to_owned());
        let request = CompileRequest {
            diagram: identity_then_f(),
            target: "fortran".to_owned(),
            options: GenOptions {
                type_map: map,
                ..GenOptions::default()
            },
        };

        let response = compile(request, &registry(), &CancelToken::new()).unwrap();
        let CompileResponse::Error { errors } = response else {
            panic!("expected an error response");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, Some(ErrorCode::E403));
    }

    #[test]
    fn test_compile_emits_source() {
        let mut map = codegen::TypeMap::new();
        map.insert("A".to_owned(), "i64".to_owned());
        map.insert("B".to_owned(), "String".to_owned());
        let request = CompileRequest {
            diagram: identity_then_f(),
            target: "rust".to_owned(),
            options: GenOptions {
                type_map: map,
                ..GenOptions::default()
            },
        };

        let response = compile(request, &registry(), &CancelToken::new()).unwrap();
        let CompileResponse::Ok { source } = response else {
            panic!("expected generated source");
        };
        assert!(source.contains("pub fn diagram(in0: i64) -> String {"));
        assert!(source.contains("f(in0)"));
    }

    #[test]
    fn test_cancelled_operations_return_no_partial_value() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let request = TypeCheckRequest {
            diagram: identity_then_f(),
        };
        assert_eq!(
            type_check(request, &registry(), &cancel).unwrap_err(),
            Cancelled
        );
    }

    #[test]
    fn test_response_wire_shape_is_camel_case() {
        let response = ListRewritesResponse::Ok {
            rules: vec![RuleInfo::from(RuleId::Braiding)],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["rules"][0]["ruleId"], "braiding");
    }
}
