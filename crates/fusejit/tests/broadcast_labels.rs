//! Properties of the numpy-style shape merge, label propagation in
//! particular: any grouping order of a three-way merge must agree.

use fusejit::{merge_shapes, BroadcastRule, DimLabel, Dimension, PartialShape};

fn shapes_under_test() -> Vec<PartialShape> {
    let dims: Vec<Dimension> = vec![
        Dimension::fixed(1),
        Dimension::fixed(1).with_label(DimLabel(1)),
        Dimension::fixed(4),
        Dimension::fixed(4).with_label(DimLabel(2)),
        Dimension::fixed(4).with_label(DimLabel(3)),
        Dimension::interval(1, 9),
        Dimension::interval(1, 9).with_label(DimLabel(4)),
        Dimension::interval(2, 8).with_label(DimLabel(5)),
        // Incompatible with fixed(4), so error paths are exercised too.
        Dimension::interval(2, 3).with_label(DimLabel(7)),
        Dimension::at_least(5).with_label(DimLabel(8)),
        Dimension::dynamic(),
        Dimension::dynamic().with_label(DimLabel(6)),
    ];
    dims.into_iter()
        .map(|d| PartialShape::from_dims(vec![d]))
        .collect()
}

fn merge_pair(a: &PartialShape, b: &PartialShape) -> Option<PartialShape> {
    merge_shapes(&[a.clone(), b.clone()], BroadcastRule::Numpy).ok()
}

#[test]
fn three_way_merge_is_grouping_independent() {
    let shapes = shapes_under_test();
    for a in &shapes {
        for b in &shapes {
            for c in &shapes {
                let flat =
                    merge_shapes(&[a.clone(), b.clone(), c.clone()], BroadcastRule::Numpy).ok();
                let left = merge_pair(a, b).and_then(|ab| merge_pair(&ab, c));
                let right = merge_pair(b, c).and_then(|bc| merge_pair(a, &bc));
                assert_eq!(flat, left, "((a,b),c) differs for {a} {b} {c}");
                assert_eq!(flat, right, "(a,(b,c)) differs for {a} {b} {c}");
            }
        }
    }
}

#[test]
fn merge_is_idempotent() {
    for shape in shapes_under_test() {
        let merged = merge_shapes(
            &[shape.clone(), shape.clone()],
            BroadcastRule::Numpy,
        )
        .unwrap();
        assert_eq!(merged, shape, "self-merge changed {shape}");
    }
}

#[test]
fn max_dimension_rule_for_static_shapes() {
    for a in [1usize, 2, 3, 8] {
        for b in [1usize, 2, 3, 8] {
            let merged = merge_shapes(
                &[PartialShape::from_static([a]), PartialShape::from_static([b])],
                BroadcastRule::Numpy,
            );
            if a == b || a == 1 || b == 1 {
                let shape = merged.unwrap();
                assert_eq!(shape, PartialShape::from_static([a.max(b)]));
            } else {
                assert!(merged.is_err(), "{a} vs {b} should not broadcast");
            }
        }
    }
}

#[test]
fn determined_side_contributes_value_and_label() {
    let loose = PartialShape::from_dims(vec![Dimension::interval(1, 6)]);
    let rigid = PartialShape::from_dims(vec![Dimension::fixed(5).with_label(DimLabel(9))]);
    let merged = merge_shapes(&[loose, rigid], BroadcastRule::Numpy).unwrap();
    assert_eq!(merged.labels(), Some(vec![Some(DimLabel(9))]));
    assert_eq!(merged.dims().unwrap()[0].as_static(), Some(5));
}

#[test]
fn ambiguous_interval_merge_takes_enclosing_bounds() {
    let a = PartialShape::from_dims(vec![Dimension::interval(1, 10).with_label(DimLabel(1))]);
    let b = PartialShape::from_dims(vec![Dimension::interval(1, 11)]);
    let merged = merge_shapes(&[a, b], BroadcastRule::Numpy).unwrap();
    let dim = merged.dims().unwrap()[0];
    assert_eq!((dim.lo(), dim.hi()), (1, Some(11)));
    // The accumulated label survives an unlabeled ambiguous merge.
    assert_eq!(dim.label(), Some(DimLabel(1)));
}
