//! A small, owned GraphQL AST used throughout the gateway.
//!
//! An interned, validating AST is built for a full GraphQL implementation (parsing + validation +
//! execution of a single schema). This gateway only ever needs to parse, rewrite, re-print and
//! merge documents across many schemas, so it keeps a lighter, fully-owned representation
//! instead.

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GqlType {
    Named(String),
    List(Box<GqlType>),
    NonNull(Box<GqlType>),
}

impl GqlType {
    /// Strips list/non-null wrappers down to the named type.
    pub fn inner_name(&self) -> &str {
        match self {
            GqlType::Named(name) => name,
            GqlType::List(inner) | GqlType::NonNull(inner) => inner.inner_name(),
        }
    }

    pub fn is_list(&self) -> bool {
        match self {
            GqlType::Named(_) => false,
            GqlType::NonNull(inner) => inner.is_list(),
            GqlType::List(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
}

#[derive(Debug, Clone)]
pub struct DirectiveUse {
    pub name: String,
    pub arguments: IndexMap<String, Value>,
}

// ---- Schema (SDL) side ----------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SchemaDoc {
    pub query_type: Option<String>,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    pub types: IndexMap<String, TypeDef>,
}

#[derive(Debug, Clone)]
pub enum TypeDef {
    Scalar,
    Object(ObjectTypeDef),
    Interface(ObjectTypeDef),
    Union(UnionTypeDef),
    Enum(EnumTypeDef),
    InputObject(InputObjectTypeDef),
}

impl TypeDef {
    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef>> {
        match self {
            TypeDef::Object(o) | TypeDef::Interface(o) => Some(&o.fields),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDef::Scalar => "scalar",
            TypeDef::Object(_) => "object",
            TypeDef::Interface(_) => "interface",
            TypeDef::Union(_) => "union",
            TypeDef::Enum(_) => "enum",
            TypeDef::InputObject(_) => "input object",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectTypeDef {
    pub name: String,
    pub implements: Vec<String>,
    pub fields: IndexMap<String, FieldDef>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub arguments: IndexMap<String, InputValueDef>,
    pub ty: GqlType,
    pub directives: Vec<DirectiveUse>,
}

#[derive(Debug, Clone)]
pub struct InputValueDef {
    pub name: String,
    pub ty: GqlType,
}

#[derive(Debug, Clone)]
pub struct UnionTypeDef {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EnumTypeDef {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InputObjectTypeDef {
    pub name: String,
    pub fields: IndexMap<String, InputValueDef>,
}

// ---- Executable (query) side ----------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ExecutableDoc {
    pub operations: Vec<OperationDef>,
    pub fragments: IndexMap<String, FragmentDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperationDef {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub variable_definitions: Vec<VariableDef>,
    pub directives: Vec<DirectiveUse>,
    pub selection_set: Vec<Selection>,
}

#[derive(Debug, Clone)]
pub struct VariableDef {
    pub name: String,
    pub ty: GqlType,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct FragmentDef {
    pub name: String,
    pub type_condition: String,
    pub directives: Vec<DirectiveUse>,
    pub selection_set: Vec<Selection>,
}

#[derive(Debug, Clone)]
pub enum Selection {
    Field(FieldSelection),
    FragmentSpread(FragmentSpreadSelection),
    InlineFragment(InlineFragmentSelection),
}

#[derive(Debug, Clone)]
pub struct FieldSelection {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: IndexMap<String, Value>,
    pub directives: Vec<DirectiveUse>,
    pub selection_set: Vec<Selection>,
}

impl FieldSelection {
    /// The key this field occupies in the response object: the alias if present, else the name.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct FragmentSpreadSelection {
    pub name: String,
    pub directives: Vec<DirectiveUse>,
}

#[derive(Debug, Clone)]
pub struct InlineFragmentSelection {
    pub type_condition: Option<String>,
    pub directives: Vec<DirectiveUse>,
    pub selection_set: Vec<Selection>,
}

/// Depth-first walk that collects every variable name referenced anywhere in a selection set
/// (field arguments, directive arguments, nested selections).
pub fn collect_variable_usages(selections: &[Selection], out: &mut indexmap::IndexSet<String>) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                collect_value_variables(&field.arguments, out);
                collect_directive_variables(&field.directives, out);
                collect_variable_usages(&field.selection_set, out);
            }
            Selection::FragmentSpread(spread) => {
                collect_directive_variables(&spread.directives, out);
            }
            Selection::InlineFragment(frag) => {
                collect_directive_variables(&frag.directives, out);
                collect_variable_usages(&frag.selection_set, out);
            }
        }
    }
}

fn collect_directive_variables(directives: &[DirectiveUse], out: &mut indexmap::IndexSet<String>) {
    for directive in directives {
        collect_value_variables(&directive.arguments, out);
    }
}

fn collect_value_variables(args: &IndexMap<String, Value>, out: &mut indexmap::IndexSet<String>) {
    for value in args.values() {
        collect_value_variables_rec(value, out);
    }
}

fn collect_value_variables_rec(value: &Value, out: &mut indexmap::IndexSet<String>) {
    match value {
        Value::Variable(name) => {
            out.insert(name.clone());
        }
        Value::List(items) => {
            for item in items {
                collect_value_variables_rec(item, out);
            }
        }
        Value::Object(fields) => {
            for v in fields.values() {
                collect_value_variables_rec(v, out);
            }
        }
        _ => {}
    }
}
