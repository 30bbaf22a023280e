use rust_decimal::Decimal;

use rust_data_tools::processing::{
    average_cells, max_cells, min_max_cells, reduce_cells, sum_cells, ArrayNode, MinMax, ReduceOp,
};
use rust_data_tools::types::{DataType, Value};
use rust_data_tools::DataToolsError;

fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().copied().map(Value::Int32).collect()
}

#[test]
fn jagged_rows_flatten_in_order_and_skip_null_rows() {
    let arr = ArrayNode::jagged(vec![Some(ints(&[1, 2, 3])), None, Some(ints(&[4, 5]))]);
    let flat: Vec<Value> = arr.leaves().cloned().collect();
    assert_eq!(flat, ints(&[1, 2, 3, 4, 5]));
    assert_eq!(sum_cells::<i32, _>(arr.leaves()).unwrap(), 15);
    assert_eq!(arr.element_type(), Some(DataType::Int32));
}

#[test]
fn every_leaf_is_visited_exactly_once_at_any_rank() {
    let cube = ArrayNode::rectangular(vec![2, 3, 4], (0..24).map(Value::Int64)).unwrap();
    assert_eq!(cube.rank(), 3);
    let flat: Vec<i64> = cube
        .leaves()
        .map(|v| match v {
            Value::Int64(i) => *i,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(flat, (0..24).collect::<Vec<_>>());
    assert_eq!(cube.get(&[1, 2, 3]), Some(&ArrayNode::Leaf(Value::Int64(23))));

    assert!(matches!(
        ArrayNode::rectangular(vec![2, 2], ints(&[1, 2, 3])),
        Err(DataToolsError::ShapeMismatch { .. })
    ));
}

#[test]
fn nested_jagged_arrays_of_mixed_depth() {
    let arr = ArrayNode::vector(vec![
        ArrayNode::from(Value::Int32(1)),
        ArrayNode::from(vec![ArrayNode::from(vec![Value::Int32(2), Value::Null]), ArrayNode::Null]),
        ArrayNode::vector(Vec::<Value>::new()),
        ArrayNode::from(vec![Value::Int32(3)]),
    ]);
    assert_eq!(arr.depth(), 3);
    assert_eq!(arr.leaf_count(), 4);
    // Null leaves are cells; null sub-arrays are not.
    assert_eq!(reduce_cells(arr.leaves(), ReduceOp::Count, false).unwrap(), Value::Int64(4));
    assert_eq!(reduce_cells(arr.leaves(), ReduceOp::Count, true).unwrap(), Value::Int64(3));
    assert_eq!(
        average_cells::<Decimal, _>(arr.leaves(), false).unwrap(),
        Decimal::new(15, 1)
    );
}

#[test]
fn flattened_leaves_feed_min_max() {
    let arr = ArrayNode::jagged(vec![
        Some(vec![Value::Float64(2.5), Value::Float64(-1.0)]),
        None,
        Some(vec![Value::Null, Value::Float64(7.25)]),
    ]);
    let skipping = min_max_cells::<f64, _>(arr.leaves(), true).unwrap();
    assert_eq!(skipping, MinMax::new(-1.0, 7.25));
    assert_eq!(max_cells::<f64, _>(arr.leaves(), false).unwrap(), 7.25);

    let empty = ArrayNode::jagged(vec![None::<Vec<Value>>, None]);
    assert!(!min_max_cells::<f64, _>(empty.leaves(), true).unwrap().has_value());
    assert_eq!(reduce_cells(empty.leaves(), ReduceOp::Sum, true).unwrap(), Value::Null);
}
