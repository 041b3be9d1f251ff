//! Typed configuration: a plain `serde::Deserialize`-able struct with a `Default` impl that
//! reproduces every default named in the external interfaces section of the design.

use serde::{Deserialize, Serialize};

pub const DEFAULT_STITCH_DIRECTIVE_NAME: &str = "stitch";
pub const DEFAULT_RESERVED_PREFIX: &str = "_STITCH_";
pub const DEFAULT_EXPORT_ALIAS_PREFIX: &str = "_export_";
pub const DEFAULT_INTROSPECTION_LOCATION: &str = "__super";
pub const DEFAULT_QUERY_TYPE_NAME: &str = "Query";
pub const DEFAULT_MUTATION_TYPE_NAME: &str = "Mutation";

/// Process-local configuration for one gateway instance. Passed by reference into composition so
/// that two supergraphs with distinct directive names can coexist in one process (§9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Name of the directive used to mark boundary-query entry points, e.g. `stitch` for
    /// `@stitch(key: "id")`.
    pub stitch_directive_name: String,
    /// Alias prefix the Planner injects for Executor-managed join-key exports.
    pub reserved_prefix: String,
    /// Alias prefix reserved in client queries for Executor-injected join fields.
    pub export_alias_prefix: String,
    /// Synthetic location name that resolves introspection fields locally.
    pub introspection_location: String,
    /// Name the merged query root is published under. Every location's own `Query` type still
    /// merges into this one root; only the supergraph's public name for it changes.
    pub query_type_name: String,
    /// Name the merged mutation root is published under, mirroring `query_type_name`.
    pub mutation_type_name: String,
    pub plan_cache: PlanCacheConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            stitch_directive_name: DEFAULT_STITCH_DIRECTIVE_NAME.to_string(),
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
            export_alias_prefix: DEFAULT_EXPORT_ALIAS_PREFIX.to_string(),
            introspection_location: DEFAULT_INTROSPECTION_LOCATION.to_string(),
            query_type_name: DEFAULT_QUERY_TYPE_NAME.to_string(),
            mutation_type_name: DEFAULT_MUTATION_TYPE_NAME.to_string(),
            plan_cache: PlanCacheConfig::default(),
        }
    }
}

/// Sizing for the default in-memory plan cache (§13). Ignored by caller-supplied `PlanCache`
/// implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanCacheConfig {
    pub capacity: u64,
    pub ttl_seconds: Option<u64>,
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        Self { capacity: 512, ttl_seconds: Some(300) }
    }
}
