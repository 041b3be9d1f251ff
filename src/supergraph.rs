//! The supergraph: merged schema plus routing tables (§3). Pure data — the output of the
//! Composer, the shared input to the Planner and the Executor. Immutable and long-lived, so it
//! is always handed around behind an `Arc` (§5).

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::ast::SchemaDoc;
use crate::config::GatewayConfig;
use crate::location::LocationExecutor;

/// A root field on `location` used to re-fetch `typeName` by key (§6 glossary).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BoundaryQuery {
    pub location: String,
    /// The merged type this boundary query resolves, used to build the `{__typename, key}`
    /// literal for federation-shaped arguments.
    pub type_name: String,
    pub field: String,
    pub arg_name: String,
    pub key: String,
    pub list: bool,
    pub federation: bool,
}

/// Merged schema + routing tables, as described in §3.
pub struct Supergraph {
    pub schema: SchemaDoc,
    pub locations: IndexSet<String>,
    /// `(typeName, location) -> fields of typeName resolvable at that location`.
    pub fields_by_type_and_location: IndexMap<(String, String), IndexSet<String>>,
    pub boundaries: IndexMap<String, Vec<BoundaryQuery>>,
    pub executables: IndexMap<String, Arc<dyn LocationExecutor>>,
    pub config: GatewayConfig,
}

impl Supergraph {
    pub const INTROSPECTION_LOCATION: &'static str = "__super";

    /// Every location (other than the synthetic introspection location) that can resolve at
    /// least one field of `type_name`.
    pub fn locations_for_type(&self, type_name: &str) -> Vec<&str> {
        self.fields_by_type_and_location
            .keys()
            .filter(|(t, _)| t == type_name)
            .map(|(_, loc)| loc.as_str())
            .collect()
    }

    /// Locations that can resolve `field_name` on `type_name`.
    pub fn locations_resolving_field<'a>(
        &'a self,
        type_name: &str,
        field_name: &str,
    ) -> Vec<&'a str> {
        self.fields_by_type_and_location
            .iter()
            .filter(|((t, _), fields)| t == type_name && fields.contains(field_name))
            .map(|((_, loc), _)| loc.as_str())
            .collect()
    }

    /// Whether `type_name` is contributed to by more than one location and therefore needs
    /// boundary queries to be fully resolved.
    pub fn is_merged_type(&self, type_name: &str) -> bool {
        self.locations_for_type(type_name).len() > 1
    }

    pub fn boundary_queries_for(&self, type_name: &str) -> &[BoundaryQuery] {
        self.boundaries.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The boundary query that fetches `type_name` directly from `location`, if any.
    pub fn direct_boundary<'a>(&'a self, type_name: &str, location: &str) -> Option<&'a BoundaryQuery> {
        self.boundary_queries_for(type_name).iter().find(|b| b.location == location)
    }
}

impl std::fmt::Debug for Supergraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supergraph")
            .field("locations", &self.locations)
            .field("boundaries", &self.boundaries)
            .finish()
    }
}
