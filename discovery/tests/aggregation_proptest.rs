//! Property tests for aggregation decoding.
//!
//! Generates nested aggregation trees and bucket lists and checks that the
//! decoded tree keeps shape, order and keys exactly as the service sent them.

use discovery::{Aggregation, AggregationDecoder, UnknownKindPolicy};
use proptest::prelude::*;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct Tree {
    expression: String,
    matching: u64,
    children: Vec<Tree>,
}

fn tree_strategy() -> impl Strategy<Value = Tree> {
    let leaf = ("[a-z]{1,8}:[a-z0-9]{1,8}", 0u64..10_000).prop_map(|(expression, matching)| Tree {
        expression,
        matching,
        children: Vec::new(),
    });
    leaf.prop_recursive(5, 48, 4, |inner| {
        (
            "[a-z]{1,8}:[a-z0-9]{1,8}",
            0u64..10_000,
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(expression, matching, children)| Tree {
                expression,
                matching,
                children,
            })
    })
}

/// JSON number literals: plain integers, integers wider than `u64`,
/// decimals with trailing zeros and exponent forms (in the `e+N` / `e-N`
/// spelling the parser keeps).
fn number_text() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<i64>().prop_map(|n| n.to_string()),
        "-?[1-9][0-9]{20,30}",
        "-?(0|[1-9][0-9]{0,6})\\.[0-9]{1,8}",
        "-?[1-9](\\.[0-9]{1,6})?e[+-][0-9]{1,2}",
    ]
}

fn to_json(tree: &Tree) -> Value {
    let mut node = json!({
        "type": "filter",
        "match": tree.expression,
        "matching_results": tree.matching,
    });
    if !tree.children.is_empty() {
        node["aggregations"] = Value::Array(tree.children.iter().map(to_json).collect());
    }
    node
}

fn assert_same(decoded: &Aggregation, tree: &Tree) {
    let Aggregation::Filter(filter) = decoded else {
        panic!("expected filter, got {:?}", decoded);
    };
    assert_eq!(filter.match_expression, tree.expression);
    assert_eq!(filter.matching_results, Some(tree.matching));

    let children = decoded.children().unwrap_or_default();
    assert_eq!(children.len(), tree.children.len());
    for (child, expected) in children.iter().zip(&tree.children) {
        assert_same(child, expected);
    }
}

fn depth(tree: &Tree) -> usize {
    1 + tree.children.iter().map(depth).max().unwrap_or(0)
}

fn decoded_depth(agg: &Aggregation) -> usize {
    1 + agg
        .children()
        .unwrap_or_default()
        .iter()
        .map(decoded_depth)
        .max()
        .unwrap_or(0)
}

proptest! {
    #[test]
    fn prop_filter_trees_keep_shape(trees in prop::collection::vec(tree_strategy(), 1..4)) {
        let nodes: Vec<Value> = trees.iter().map(to_json).collect();
        let decoded = AggregationDecoder::default().decode_all(&nodes).unwrap();

        prop_assert_eq!(decoded.len(), trees.len());
        for (agg, tree) in decoded.iter().zip(&trees) {
            assert_same(agg, tree);
            prop_assert_eq!(decoded_depth(agg), depth(tree));
        }
    }

    #[test]
    fn prop_histogram_keys_verbatim(
        interval in 1i64..1_000_000,
        keys in prop::collection::vec(number_text(), 0..16),
    ) {
        // built as text so the keys reach the decoder exactly as written
        let results: Vec<String> = keys
            .iter()
            .map(|k| format!(r#"{{"key": {}, "matching_results": 1}}"#, k))
            .collect();
        let body = format!(
            r#"{{"type": "histogram", "field": "product.price", "interval": {}, "results": [{}]}}"#,
            interval,
            results.join(", ")
        );
        let node: Value = serde_json::from_str(&body).unwrap();

        let Aggregation::Histogram(histogram) = AggregationDecoder::default().decode(&node).unwrap() else {
            panic!("expected histogram");
        };
        prop_assert_eq!(histogram.interval, interval);
        let decoded: Vec<String> = histogram
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|b| b.key)
            .collect();
        prop_assert_eq!(decoded, keys);
    }

    #[test]
    fn prop_term_keys_verbatim(keys in prop::collection::vec("\\PC{0,12}", 0..16)) {
        let results: Vec<Value> = keys.iter().map(|k| json!({"key": k})).collect();
        let node = json!({"type": "term", "field": "author", "results": results});

        let Aggregation::Term(term) = AggregationDecoder::default().decode(&node).unwrap() else {
            panic!("expected term");
        };
        let decoded: Vec<String> = term
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|b| b.key)
            .collect();
        prop_assert_eq!(decoded, keys);
    }

    #[test]
    fn prop_skip_keeps_known_in_order(
        layout in prop::collection::vec(any::<bool>(), 0..12),
    ) {
        // true = known `sum`, false = an unknown literal
        let nodes: Vec<Value> = layout
            .iter()
            .enumerate()
            .map(|(i, known)| {
                if *known {
                    json!({"type": "sum", "field": format!("f{}", i), "value": i as f64})
                } else {
                    json!({"type": "percentiles", "field": format!("f{}", i)})
                }
            })
            .collect();

        let decoded = AggregationDecoder::new(UnknownKindPolicy::Skip)
            .decode_all(&nodes)
            .unwrap();
        let values: Vec<f64> = decoded.iter().filter_map(Aggregation::value).collect();
        let expected: Vec<f64> = layout
            .iter()
            .enumerate()
            .filter(|(_, known)| **known)
            .map(|(i, _)| i as f64)
            .collect();
        prop_assert_eq!(values, expected);

        let strict = AggregationDecoder::default().decode_all(&nodes);
        prop_assert_eq!(strict.is_ok(), layout.iter().all(|k| *k));
    }
}
