//! The Request (§3): a parsed client document, normalized to the single chosen operation with
//! every fragment spread inlined away, plus the variables/context/digest the rest of the gateway
//! needs. Built once per call via [`Request::prepare`]; the Planner never sees a fragment spread.

use std::collections::HashSet;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::ast::{
    DirectiveUse, ExecutableDoc, FragmentDef, InlineFragmentSelection, OperationDef, OperationKind,
    Selection, VariableDef,
};
use crate::error::{GatewayError, PlanError};
use crate::location::RequestContext;
use crate::parser;

#[derive(Debug, Clone)]
pub struct Request {
    pub operation_name: Option<String>,
    pub operation_kind: OperationKind,
    /// The chosen operation's selection set with every named and inline fragment spread
    /// replaced by its expansion; contains no [`Selection::FragmentSpread`] anywhere.
    pub selection_set: Vec<Selection>,
    pub variable_definitions: Vec<VariableDef>,
    pub variables: serde_json::Map<String, serde_json::Value>,
    pub context: RequestContext,
    /// Stable digest of `(document text, operationName)`, used as the plan-cache key.
    pub digest: String,
    pub operation_directives: Vec<DirectiveUse>,
}

impl Request {
    pub fn prepare(
        query: &str,
        operation_name: Option<String>,
        variables: serde_json::Map<String, serde_json::Value>,
        context: RequestContext,
    ) -> Result<Self, GatewayError> {
        let document = parser::parse_executable(query)?;
        let operation = select_operation(&document, operation_name.as_deref())?;
        let selection_set = inline_fragments(&operation.selection_set, &document.fragments)?;
        let digest = compute_digest(query, operation_name.as_deref());

        Ok(Request {
            operation_name: operation.name.clone(),
            operation_kind: operation.kind,
            selection_set,
            variable_definitions: operation.variable_definitions.clone(),
            variables,
            context,
            digest,
            operation_directives: operation.directives.clone(),
        })
    }
}

fn select_operation<'a>(
    document: &'a ExecutableDoc,
    operation_name: Option<&str>,
) -> Result<&'a OperationDef, GatewayError> {
    match operation_name {
        Some(name) => document
            .operations
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
            .ok_or_else(|| PlanError::new(format!("no operation named `{name}` in this document")).into()),
        None => match document.operations.as_slice() {
            [single] => Ok(single),
            [] => Err(PlanError::new("document defines no operations").into()),
            _ => Err(PlanError::new(
                "operationName is required when the document defines more than one operation",
            )
            .into()),
        },
    }
}

/// Recursively replaces every fragment spread (named or inline) with its expansion, detecting
/// cycles through named fragments along the way.
fn inline_fragments(
    selections: &[Selection],
    fragments: &IndexMap<String, FragmentDef>,
) -> Result<Vec<Selection>, GatewayError> {
    let mut visiting = HashSet::new();
    inline_fragments_rec(selections, fragments, &mut visiting)
}

fn inline_fragments_rec(
    selections: &[Selection],
    fragments: &IndexMap<String, FragmentDef>,
    visiting: &mut HashSet<String>,
) -> Result<Vec<Selection>, GatewayError> {
    let mut out = Vec::with_capacity(selections.len());
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                let mut inlined = field.clone();
                inlined.selection_set = inline_fragments_rec(&field.selection_set, fragments, visiting)?;
                out.push(Selection::Field(inlined));
            }
            Selection::InlineFragment(frag) => {
                let inner = inline_fragments_rec(&frag.selection_set, fragments, visiting)?;
                out.push(Selection::InlineFragment(InlineFragmentSelection {
                    type_condition: frag.type_condition.clone(),
                    directives: frag.directives.clone(),
                    selection_set: inner,
                }));
            }
            Selection::FragmentSpread(spread) => {
                if !visiting.insert(spread.name.clone()) {
                    return Err(GatewayError::parse(format!(
                        "fragment `{}` is part of a cycle through its own spreads",
                        spread.name
                    )));
                }
                let def = fragments.get(&spread.name).ok_or_else(|| {
                    GatewayError::parse(format!("undefined fragment `...{}`", spread.name))
                })?;
                let inner = inline_fragments_rec(&def.selection_set, fragments, visiting)?;
                visiting.remove(&spread.name);
                out.push(Selection::InlineFragment(InlineFragmentSelection {
                    type_condition: Some(def.type_condition.clone()),
                    directives: def.directives.clone(),
                    selection_set: inner,
                }));
            }
        }
    }
    Ok(out)
}

fn compute_digest(query: &str, operation_name: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update([0u8]);
    hasher.update(operation_name.unwrap_or_default().as_bytes());
    format!("{:x}", hasher.finalize())
}
