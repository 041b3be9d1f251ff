//! Boundary-query selection when a merged type is reachable through more than one location
//! (§4.2 tie-breaks). Modeled as a shortest-path search over a small per-type graph rather than a
//! handwritten comparator chain, so a future multi-hop boundary (reaching a location that itself
//! requires an intermediate hop) falls out of the same machinery instead of needing new code.

use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::supergraph::BoundaryQuery;

/// Picks the best [`BoundaryQuery`] for `type_name` to reach from `preferred_location` (the
/// location already selected by the parent operation, or `None` at the plan root).
///
/// Every contributing location can export the join key (composition guarantees the key field is
/// present everywhere the type is served), so every `BoundaryQuery` is reachable in one hop; the
/// graph exists to rank candidates by §4.2's tie-break order rather than to discover multi-hop
/// routes, which the source material leaves underspecified (see `DESIGN.md`).
pub fn select_boundary_query<'a>(
    candidates: &'a [BoundaryQuery],
    preferred_location: Option<&str>,
    requested_field_counts: &dyn Fn(&str) -> usize,
) -> Option<&'a BoundaryQuery> {
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return Some(&candidates[0]);
    }

    let mut graph: DiGraph<(), u32> = DiGraph::new();
    let origin: NodeIndex = graph.add_node(());
    let mut nodes = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let node = graph.add_node(());
        let preferred = preferred_location == Some(candidate.location.as_str());
        let served = requested_field_counts(&candidate.location);
        // Lower weight wins: a preferred-location match dominates everything else, then more
        // served fields, then (implicitly, via stable ordering) alphabetical location name.
        let weight = if preferred { 0 } else { 1000u32.saturating_sub(served as u32).max(1) };
        graph.add_edge(origin, node, weight);
        nodes.push(node);
    }

    let costs = dijkstra(&graph, origin, None, |e| *e.weight());

    let mut best_idx = 0;
    let mut best_cost = u32::MAX;
    for (i, node) in nodes.iter().enumerate() {
        if let Some(&cost) = costs.get(node) {
            let tie_break_better = cost < best_cost
                || (cost == best_cost && candidates[i].location < candidates[best_idx].location);
            if tie_break_better {
                best_cost = cost;
                best_idx = i;
            }
        }
    }
    Some(&candidates[best_idx])
}
