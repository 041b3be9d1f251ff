//! Field- and type-level merging rules (§4.1). One function per GraphQL type kind; each returns
//! the merged definition plus the `(type, location) -> fields` routing entries it discovered.

use indexmap::{IndexMap, IndexSet};

use crate::ast::{EnumTypeDef, FieldDef, InputObjectTypeDef, ObjectTypeDef, SchemaDoc, TypeDef, UnionTypeDef};
use crate::error::CompositionError;

fn signatures_compatible(a: &FieldDef, b: &FieldDef) -> bool {
    if a.ty != b.ty {
        return false;
    }
    if a.arguments.len() != b.arguments.len() {
        return false;
    }
    a.arguments.iter().all(|(name, arg)| b.arguments.get(name).map(|other| other.ty == arg.ty).unwrap_or(false))
}

/// Merges the root `Query`/`Mutation` type across every location that declares it.
///
/// Unlike ordinary object types, duplicate root field names are tolerated when every
/// conflicting declaration carries the stitch directive: those are boundary-query entry points
/// and are allowed to diverge in signature between locations (§4.1's stitch discovery runs over
/// each location's own copy of the field, not this merged placeholder).
pub fn merge_root_type(
    root_name: &str,
    schemas: &IndexMap<String, SchemaDoc>,
    stitch_directive_name: &str,
    fields_by_type_and_location: &mut IndexMap<(String, String), IndexSet<String>>,
) -> Result<ObjectTypeDef, CompositionError> {
    let mut fields: IndexMap<String, FieldDef> = IndexMap::new();
    let mut first_owner: IndexMap<String, String> = IndexMap::new();

    for (location, schema) in schemas {
        let Some(TypeDef::Object(obj)) = schema.types.get(root_name) else { continue };
        let mut served = IndexSet::new();
        for (field_name, field) in &obj.fields {
            served.insert(field_name.clone());
            match fields.get(field_name) {
                None => {
                    fields.insert(field_name.clone(), field.clone());
                    first_owner.insert(field_name.clone(), location.clone());
                }
                Some(existing) => {
                    let both_stitch = has_directive(existing, stitch_directive_name)
                        && has_directive(field, stitch_directive_name);
                    if !both_stitch && !signatures_compatible(existing, field) {
                        return Err(CompositionError::new(format!(
                            "location `{location}` redeclares root field `{root_name}.{field_name}` \
                             with an incompatible signature from location `{}`",
                            first_owner.get(field_name).cloned().unwrap_or_default()
                        )));
                    }
                }
            }
        }
        fields_by_type_and_location.insert((root_name.to_string(), location.clone()), served);
    }

    Ok(ObjectTypeDef { name: root_name.to_string(), implements: Vec::new(), fields })
}

/// Merges one non-root type across every location that contributes to it. A field present in
/// more than one location must be identical in signature everywhere it appears (§4.1
/// classification); otherwise it is "owned" by the single location that declares it.
pub fn merge_type(
    type_name: &str,
    schemas: &IndexMap<String, SchemaDoc>,
    fields_by_type_and_location: &mut IndexMap<(String, String), IndexSet<String>>,
) -> Result<TypeDef, CompositionError> {
    let mut kind: Option<&'static str> = None;
    let mut merged_object: Option<ObjectTypeDef> = None;
    let mut merged_enum_values: IndexSet<String> = IndexSet::new();
    let mut merged_union_members: IndexSet<String> = IndexSet::new();
    let mut merged_input: Option<InputObjectTypeDef> = None;
    let mut first_owner: IndexMap<String, String> = IndexMap::new();

    for (location, schema) in schemas {
        let Some(def) = schema.types.get(type_name) else { continue };
        match def {
            TypeDef::Scalar => {
                kind.get_or_insert("scalar");
            }
            TypeDef::Object(obj) | TypeDef::Interface(obj) => {
                let is_interface = matches!(def, TypeDef::Interface(_));
                kind.get_or_insert(if is_interface { "interface" } else { "object" });
                let slot = merged_object.get_or_insert_with(|| ObjectTypeDef {
                    name: type_name.to_string(),
                    implements: Vec::new(),
                    fields: IndexMap::new(),
                });
                for iface in &obj.implements {
                    if !slot.implements.contains(iface) {
                        slot.implements.push(iface.clone());
                    }
                }
                let mut served = IndexSet::new();
                for (field_name, field) in &obj.fields {
                    served.insert(field_name.clone());
                    match slot.fields.get(field_name) {
                        None => {
                            slot.fields.insert(field_name.clone(), field.clone());
                            first_owner.insert(field_name.clone(), location.clone());
                        }
                        Some(existing) => {
                            if !signatures_compatible(existing, field) {
                                return Err(CompositionError::new(format!(
                                    "location `{location}` redeclares field `{type_name}.{field_name}` \
                                     with an incompatible signature from location `{}`",
                                    first_owner.get(field_name).cloned().unwrap_or_default()
                                )));
                            }
                        }
                    }
                }
                fields_by_type_and_location.insert((type_name.to_string(), location.clone()), served);
            }
            TypeDef::Union(u) => {
                kind.get_or_insert("union");
                merged_union_members.extend(u.members.iter().cloned());
            }
            TypeDef::Enum(e) => {
                kind.get_or_insert("enum");
                merged_enum_values.extend(e.values.iter().cloned());
            }
            TypeDef::InputObject(i) => {
                kind.get_or_insert("input object");
                match &merged_input {
                    None => merged_input = Some(i.clone()),
                    Some(existing) => {
                        if !input_fields_identical(existing, i) {
                            return Err(CompositionError::new(format!(
                                "location `{location}` redeclares input `{type_name}` with a \
                                 structurally different argument set"
                            )));
                        }
                    }
                }
            }
        }
    }

    match kind {
        Some("scalar") => Ok(TypeDef::Scalar),
        Some("object") => Ok(TypeDef::Object(merged_object.expect("object kind implies object"))),
        Some("interface") => Ok(TypeDef::Interface(merged_object.expect("interface kind implies object"))),
        Some("union") => Ok(TypeDef::Union(UnionTypeDef {
            name: type_name.to_string(),
            members: merged_union_members.into_iter().collect(),
        })),
        Some("enum") => Ok(TypeDef::Enum(EnumTypeDef {
            name: type_name.to_string(),
            values: merged_enum_values.into_iter().collect(),
        })),
        Some("input object") => Ok(TypeDef::InputObject(merged_input.expect("input kind implies input"))),
        _ => Err(CompositionError::new(format!("type `{type_name}` was not declared by any location"))),
    }
}

fn input_fields_identical(a: &InputObjectTypeDef, b: &InputObjectTypeDef) -> bool {
    a.fields.len() == b.fields.len()
        && a.fields.iter().all(|(name, field)| b.fields.get(name).map(|other| other.ty == field.ty).unwrap_or(false))
}

fn has_directive(field: &FieldDef, directive_name: &str) -> bool {
    field.directives.iter().any(|d| d.name == directive_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::GqlType;

    fn scalar_field(name: &str, ty: &str) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            arguments: IndexMap::new(),
            ty: GqlType::Named(ty.to_string()),
            directives: Vec::new(),
        }
    }

    #[test]
    fn rejects_incompatible_duplicate_field() {
        let mut a = IndexMap::new();
        a.insert("id".to_string(), scalar_field("id", "ID"));
        let mut b = IndexMap::new();
        b.insert("id".to_string(), scalar_field("id", "String"));

        let mut schemas = IndexMap::new();
        schemas.insert(
            "a".to_string(),
            SchemaDoc {
                query_type: Some("Query".into()),
                mutation_type: None,
                subscription_type: None,
                types: IndexMap::from([(
                    "Widget".to_string(),
                    TypeDef::Object(ObjectTypeDef { name: "Widget".into(), implements: vec![], fields: a }),
                )]),
            },
        );
        schemas.insert(
            "b".to_string(),
            SchemaDoc {
                query_type: Some("Query".into()),
                mutation_type: None,
                subscription_type: None,
                types: IndexMap::from([(
                    "Widget".to_string(),
                    TypeDef::Object(ObjectTypeDef { name: "Widget".into(), implements: vec![], fields: b }),
                )]),
            },
        );

        let mut fields_by_type_and_location = IndexMap::new();
        let result = merge_type("Widget", &schemas, &mut fields_by_type_and_location);
        assert!(result.is_err());
    }
}
