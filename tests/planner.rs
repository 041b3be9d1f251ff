//! Planner integration tests (§4.2, §8): plan determinism and variable scoping against SDL-built
//! supergraphs, complementing the unit tests living alongside `src/planner`.

use std::sync::Arc;

use serde_json::json;

use crate::common::{compose_with, StaticExecutor, SPROCKETS_SDL, WIDGETS_SDL};
use graphql_stitch::location::RequestContext;
use graphql_stitch::{plan, Request};

fn two_location_supergraph() -> graphql_stitch::Supergraph {
    compose_with(
        vec![("widgets", WIDGETS_SDL), ("sprockets", SPROCKETS_SDL)],
        vec![
            ("widgets", Arc::new(StaticExecutor { body: json!({}) })),
            ("sprockets", Arc::new(StaticExecutor { body: json!({}) })),
        ],
    )
}

#[test]
fn planning_the_same_request_twice_produces_the_same_plan() {
    let supergraph = two_location_supergraph();
    let query = "{ a:widget{id} b:sprocket{id} c:widget{id} }";
    let request1 = Request::prepare(query, None, serde_json::Map::new(), RequestContext::new()).unwrap();
    let request2 = Request::prepare(query, None, serde_json::Map::new(), RequestContext::new()).unwrap();

    let plan1 = plan(&supergraph, &request1).unwrap();
    let plan2 = plan(&supergraph, &request2).unwrap();

    assert_eq!(plan1.operations.len(), plan2.operations.len());
    for (a, b) in plan1.operations.iter().zip(plan2.operations.iter()) {
        assert_eq!(a.location, b.location);
        assert_eq!(a.selection_set, b.selection_set);
        assert_eq!(a.after, b.after);
    }
}

#[test]
fn operation_variables_are_a_subset_of_declared_and_referenced_variables() {
    let supergraph = two_location_supergraph();
    let query = "query Q($unused: ID) { widget { id } }";
    let request = Request::prepare(query, None, serde_json::Map::new(), RequestContext::new()).unwrap();
    let built = plan(&supergraph, &request).unwrap();

    for op in &built.operations {
        for var in &op.variables {
            assert!(request.variable_definitions.iter().any(|d| &d.name == var));
        }
    }
    let widgets_op = built.operations.iter().find(|op| op.location == "widgets").unwrap();
    assert!(widgets_op.variables.is_empty(), "`$unused` is declared but never referenced");
}
