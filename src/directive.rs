//! Parsing of the `@stitch(key: "...")` grammar (§6): `key` is `"[argName:]fieldName"`; when
//! `argName` is omitted and the field has exactly one argument, that argument is inferred.

use crate::ast::FieldDef;
use crate::error::CompositionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchKey {
    pub arg_name: String,
    pub field_name: String,
}

/// Parses one `key` string against the field it annotates, inferring the argument name when the
/// grammar omits it and the field is unambiguous (exactly one declared argument).
pub fn parse_stitch_key(raw: &str, field: &FieldDef) -> Result<StitchKey, CompositionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CompositionError::new(format!(
            "@stitch key on field `{}` must not be empty",
            field.name
        )));
    }
    let (arg_name, field_name) = match raw.split_once(':') {
        Some((arg, key)) => (arg.trim().to_string(), key.trim().to_string()),
        None => {
            let mut args = field.arguments.keys();
            let Some(only_arg) = args.next() else {
                return Err(CompositionError::new(format!(
                    "@stitch key on field `{}` omits an argument name, but the field takes no arguments",
                    field.name
                )));
            };
            if args.next().is_some() {
                return Err(CompositionError::new(format!(
                    "@stitch key on field `{}` omits an argument name, but the field takes more \
                     than one argument; specify it as \"argName:fieldName\"",
                    field.name
                )));
            }
            (only_arg.clone(), raw.to_string())
        }
    };
    if !field.arguments.contains_key(&arg_name) {
        return Err(CompositionError::new(format!(
            "@stitch key on field `{}` names argument `{}`, which the field does not declare",
            field.name, arg_name
        )));
    }
    Ok(StitchKey { arg_name, field_name })
}
