//! Recursive descent into a selection set (§4.2 steps 4-6): fragment flattening, abstract-type
//! branching, boundary-type splitting and export-field injection all happen here, one selection
//! set at a time, as the Planner walks down from each root operation.

use indexmap::IndexMap;

use crate::ast::{FieldDef, FieldSelection, InlineFragmentSelection, Selection, SchemaDoc, TypeDef};
use crate::error::{PathSegment, PlanError};
use crate::supergraph::BoundaryQuery;

use super::pathfind::select_boundary_query;
use super::{Operation, PlanCtx};

/// Splices any inline fragment whose type condition is absent or matches `type_name` into the
/// surrounding list; fragments narrowing to a *different* type are left for the caller to treat
/// as an abstract-type branch.
pub(crate) fn flatten_same_type_fragments(selections: &[Selection], type_name: &str) -> Vec<Selection> {
    let mut out = Vec::with_capacity(selections.len());
    for selection in selections {
        match selection {
            Selection::InlineFragment(frag)
                if frag.type_condition.as_deref().map_or(true, |t| t == type_name) =>
            {
                out.extend(flatten_same_type_fragments(&frag.selection_set, type_name));
            }
            other => out.push(other.clone()),
        }
    }
    out
}

fn lookup_field<'a>(schema: &'a SchemaDoc, type_name: &str, field_name: &str) -> Option<&'a FieldDef> {
    schema.types.get(type_name)?.fields()?.get(field_name)
}

fn extend_path(path: &[PathSegment], key: &str) -> Vec<PathSegment> {
    let mut out = path.to_vec();
    out.push(PathSegment::Key(key.to_string()));
    out
}

/// Processes one selection set declared on `type_name`, whose directly-listed fields are assumed
/// servable at `location` (the caller already chose it for that reason); splits off anything that
/// must move to a different location into dependent operations appended to `ctx.finished`.
pub(crate) fn descend(
    ctx: &mut PlanCtx,
    location: &str,
    type_name: &str,
    path: &[PathSegment],
    selections: Vec<Selection>,
    current_step: u32,
) -> Result<Vec<Selection>, PlanError> {
    let flattened = flatten_same_type_fragments(&selections, type_name);

    let mut direct_fields = Vec::new();
    let mut typed_branches: Vec<(String, Vec<Selection>)> = Vec::new();
    for selection in flattened {
        match selection {
            Selection::Field(field) => direct_fields.push(field),
            Selection::InlineFragment(frag) => {
                let concrete = frag.type_condition.clone().unwrap_or_else(|| type_name.to_string());
                typed_branches.push((concrete, frag.selection_set));
            }
            Selection::FragmentSpread(_) => unreachable!("fragments were inlined during Request::prepare"),
        }
    }

    let kept_fields = dispatch_fields(ctx, location, type_name, path, None, direct_fields, current_step)?;
    let mut out: Vec<Selection> = kept_fields.into_iter().map(Selection::Field).collect();

    for (concrete_type, branch_selections) in typed_branches {
        let branch_fields = flatten_same_type_fragments(&branch_selections, &concrete_type)
            .into_iter()
            .filter_map(|selection| match selection {
                Selection::Field(field) => Some(field),
                _ => None,
            })
            .collect::<Vec<_>>();

        let kept_branch = dispatch_fields(
            ctx,
            location,
            &concrete_type,
            path,
            Some(concrete_type.as_str()),
            branch_fields,
            current_step,
        )?;
        if !kept_branch.is_empty() {
            out.push(Selection::InlineFragment(InlineFragmentSelection {
                type_condition: Some(concrete_type),
                directives: Vec::new(),
                selection_set: kept_branch.into_iter().map(Selection::Field).collect(),
            }));
        }
    }

    Ok(out)
}

/// Splits `fields` (all directly selected on `type_name`) by whether `location` can resolve each
/// one, recurses into the ones that stay, and — if any must move — spawns exactly one dependent
/// operation at the best remaining location for the rest (§4.2 steps 4-5), appending the
/// `_STITCH_*` export fields the Executor needs to correlate the two.
fn dispatch_fields(
    ctx: &mut PlanCtx,
    location: &str,
    type_name: &str,
    path: &[PathSegment],
    if_type: Option<&str>,
    fields: Vec<FieldSelection>,
    current_step: u32,
) -> Result<Vec<FieldSelection>, PlanError> {
    let mut kept = Vec::new();
    let mut moved = Vec::new();
    for field in fields {
        let servable_here = field.name == "__typename"
            || ctx.supergraph.locations_resolving_field(type_name, &field.name).contains(&location);
        if servable_here {
            kept.push(field);
        } else {
            moved.push(field);
        }
    }

    let mut kept_recursed = Vec::with_capacity(kept.len());
    for field in kept {
        kept_recursed.push(recurse_field(ctx, location, type_name, path, field, current_step)?);
    }

    if moved.is_empty() {
        return Ok(kept_recursed);
    }

    let candidates: Vec<BoundaryQuery> = ctx.supergraph.boundary_queries_for(type_name).to_vec();
    let counts = |loc: &str| {
        moved
            .iter()
            .filter(|f| ctx.supergraph.locations_resolving_field(type_name, &f.name).contains(&loc))
            .count()
    };
    let target = select_boundary_query(&candidates, Some(location), &counts).cloned().ok_or_else(|| {
        PlanError::new(format!(
            "no boundary query can resolve the fields of `{type_name}` requested away from location `{location}`"
        ))
    })?;

    let mut really_moved = Vec::new();
    let mut unreachable = Vec::new();
    for field in moved {
        let servable_at_target =
            ctx.supergraph.locations_resolving_field(type_name, &field.name).contains(&target.location.as_str());
        if servable_at_target {
            really_moved.push(field);
        } else {
            unreachable.push(field.name.clone());
        }
    }
    if !unreachable.is_empty() {
        return Err(PlanError::new(format!(
            "fields [{}] of `{type_name}` cannot be resolved by any reachable boundary query",
            unreachable.join(", ")
        )));
    }

    let dependent_step = ctx.alloc_step();
    let stub_index = ctx.finished.len();
    ctx.finished.push(Operation {
        step: dependent_step,
        after: current_step,
        location: target.location.clone(),
        operation_type: crate::ast::OperationKind::Query,
        selection_set: String::new(),
        variables: Vec::new(),
        path: path.to_vec(),
        if_type: if_type.map(|s| s.to_string()),
        boundary: Some(target.clone()),
    });

    let mut really_moved_recursed = Vec::with_capacity(really_moved.len());
    for field in really_moved {
        really_moved_recursed.push(recurse_field(ctx, &target.location, type_name, path, field, dependent_step)?);
    }
    let dependent_selections: Vec<Selection> = really_moved_recursed.into_iter().map(Selection::Field).collect();
    let variables = super::referenced_declared_variables(ctx.request, &dependent_selections);
    let text = crate::parser::print_selection_set(&dependent_selections);
    ctx.finished[stub_index].selection_set = text;
    ctx.finished[stub_index].variables = variables;

    kept_recursed.push(export_key_field(&target));
    kept_recursed.push(export_typename_field());

    Ok(kept_recursed)
}

fn recurse_field(
    ctx: &mut PlanCtx,
    location: &str,
    type_name: &str,
    path: &[PathSegment],
    field: FieldSelection,
    current_step: u32,
) -> Result<FieldSelection, PlanError> {
    if field.selection_set.is_empty() {
        return Ok(field);
    }
    let Some(field_def) = lookup_field(&ctx.supergraph.schema, type_name, &field.name) else {
        return Ok(field);
    };
    let inner_type = field_def.ty.inner_name().to_string();
    let inner_has_subselections = matches!(
        ctx.supergraph.schema.types.get(&inner_type),
        Some(TypeDef::Object(_)) | Some(TypeDef::Interface(_)) | Some(TypeDef::Union(_))
    );
    if !inner_has_subselections {
        return Ok(field);
    }
    let field_path = extend_path(path, field.response_key());
    let mut updated = field.clone();
    updated.selection_set = descend(ctx, location, &inner_type, &field_path, field.selection_set, current_step)?;
    Ok(updated)
}

fn export_key_field(target: &BoundaryQuery) -> FieldSelection {
    FieldSelection {
        alias: Some(format!("_STITCH_{}", target.key)),
        name: target.key.clone(),
        arguments: IndexMap::new(),
        directives: Vec::new(),
        selection_set: Vec::new(),
    }
}

fn export_typename_field() -> FieldSelection {
    FieldSelection {
        alias: Some("_STITCH_typename".to_string()),
        name: "__typename".to_string(),
        arguments: IndexMap::new(),
        directives: Vec::new(),
        selection_set: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_an_untyped_inline_fragment() {
        let selections = vec![Selection::InlineFragment(InlineFragmentSelection {
            type_condition: None,
            directives: vec![],
            selection_set: vec![Selection::Field(FieldSelection {
                alias: None,
                name: "id".into(),
                arguments: IndexMap::new(),
                directives: vec![],
                selection_set: vec![],
            })],
        })];
        let flattened = flatten_same_type_fragments(&selections, "Widget");
        assert_eq!(flattened.len(), 1);
        assert!(matches!(flattened[0], Selection::Field(_)));
    }
}
